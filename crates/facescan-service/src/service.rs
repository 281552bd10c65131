//! Enroll, recognize and unregister, serialized over the single engine.
//!
//! Every operation holds the [`EngineGuard`] from start to finish. Inputs are
//! staged in locals whose `Drop` releases them (exchange file, decoded and
//! normalized buffers), so every return path, `?` included, cleans up before
//! the guard is released.

use crate::config::{Config, EnginePayloads};
use crate::guard::EngineGuard;
use crate::lifecycle::{EngineLifecycle, EngineNotReady, EngineState, InitError};
use facescan_core::image::normalize;
use facescan_core::{
    BoundingBox, DetectedFace, EngineImage, EngineStatus, ImageCodec, ImageError,
    RecognitionEngine, RecognizedFace, Registration, TempExchangeFile,
};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

const PHOTO_PREFIX: &str = "face";
const PHOTO_SUFFIX: &str = ".jpg";

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error(transparent)]
    NotReady(#[from] EngineNotReady),
    #[error("exchange file error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("no face detected")]
    NoFaceDetected,
    #[error("engine rejected the registration (status {0})")]
    RegistrationFailed(EngineStatus),
}

#[derive(Error, Debug)]
pub enum FindError {
    #[error(transparent)]
    NotReady(#[from] EngineNotReady),
    #[error("exchange file error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("engine matched a face to non-UUID identity {identity:?}")]
    InvalidIdentity {
        identity: String,
        #[source]
        source: uuid::Error,
    },
}

#[derive(Error, Debug)]
pub enum UnregisterError {
    #[error(transparent)]
    NotReady(#[from] EngineNotReady),
    #[error("engine failed to delete the identity (status {0})")]
    UnregisterFailed(EngineStatus),
}

/// Photo staged for the engine. Fields drop in declaration order.
struct PreparedImage<I> {
    normalized: I,
    _original: I,
    _file: TempExchangeFile,
}

/// Face orchestration over one recognition engine.
///
/// `FaceService` is `Sync` when the engine is `Send` and the codec is `Sync`;
/// share it behind an `Arc` and call it from any thread.
pub struct FaceService<E: RecognitionEngine, C: ImageCodec> {
    guard: EngineGuard<E>,
    codec: C,
    exchange_dir: PathBuf,
}

impl<E, C> FaceService<E, C>
where
    E: RecognitionEngine,
    C: ImageCodec,
{
    /// `acquire_engine` is called once per successful `initialize` to obtain the
    /// engine instance; the service owns it from then on.
    pub fn new(
        acquire_engine: impl FnMut() -> E + Send + 'static,
        codec: C,
        exchange_dir: impl Into<PathBuf>,
    ) -> Self {
        let exchange_dir = exchange_dir.into();
        let lifecycle = EngineLifecycle::new(Box::new(acquire_engine), exchange_dir.clone());
        Self {
            guard: EngineGuard::new(lifecycle),
            codec,
            exchange_dir,
        }
    }

    pub fn from_config(
        acquire_engine: impl FnMut() -> E + Send + 'static,
        codec: C,
        config: &Config,
    ) -> Self {
        Self::new(acquire_engine, codec, config.exchange_dir.clone())
    }

    pub fn initialize(&self, payloads: &EnginePayloads) -> Result<(), InitError> {
        self.guard.enter().initialize(payloads)
    }

    /// Release the engine. Safe to call repeatedly or without a prior
    /// successful `initialize`; dropping the service does the same.
    pub fn teardown(&self) {
        self.guard.enter().teardown();
    }

    pub fn state(&self) -> EngineState {
        self.guard.enter().state()
    }

    /// Register the largest face in `photo` under `identity`.
    pub fn enroll(&self, identity: Uuid, photo: &[u8]) -> Result<(), EnrollError> {
        let mut lifecycle = self.guard.enter();
        let engine = lifecycle.engine_mut()?;

        let prepared = self.prepare::<EnrollError>(photo)?;
        let image = EngineImage::from_buffer(&prepared.normalized);

        let detection = engine.detect_faces(&image);
        tracing::debug!(%identity, count = detection.count, "enroll: faces detected");

        // Only an error count aborts here; zero faces falls through.
        if detection.count < 0 {
            tracing::warn!(%identity, count = detection.count, "no face detected");
            return Err(EnrollError::NoFaceDetected);
        }

        let reported = detection.boxes.iter().take(detection.count as usize);
        let best = select_best_face(reported).unwrap_or_else(|| {
            tracing::warn!(%identity, "engine reported zero faces; registering an empty box");
            BoundingBox::default()
        });

        tracing::info!(%identity, ?best, "registering face");
        let status = engine.register_face(&image, &best, &Registration::for_identity(identity));
        if status != 0 {
            tracing::warn!(%identity, status, "unable to register the face");
            return Err(EnrollError::RegistrationFailed(status));
        }

        Ok(())
    }

    /// Every face the engine finds in `image_bytes`, in engine order.
    pub fn find_all_in_image(&self, image_bytes: &[u8]) -> Result<Vec<DetectedFace>, FindError> {
        let mut lifecycle = self.guard.enter();
        let engine = lifecycle.engine_mut()?;

        let prepared = self.prepare::<FindError>(image_bytes)?;
        let image = EngineImage::from_buffer(&prepared.normalized);

        let recognition = engine.recognize_faces(&image);
        if recognition.count <= 0 {
            tracing::debug!(count = recognition.count, "no face detected in the image");
            return Ok(Vec::new());
        }

        let faces = recognition
            .faces
            .iter()
            .take(recognition.count as usize)
            .map(detected_face)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            faces = faces.len(),
            matched = faces.iter().filter(|f| f.identity.is_some()).count(),
            "recognition finished"
        );
        Ok(faces)
    }

    /// Delete every face registered under `identity`.
    pub fn unregister(&self, identity: Uuid) -> Result<(), UnregisterError> {
        let mut lifecycle = self.guard.enter();
        let engine = lifecycle.engine_mut()?;

        tracing::info!(%identity, "deleting identity");
        // The engine has been seen to return non-zero here even when the
        // identity was known; the status is surfaced as-is.
        let status = engine.delete_identity(&Registration::for_identity(identity));
        if status != 0 {
            tracing::warn!(%identity, status, "unable to unregister the identity");
            return Err(UnregisterError::UnregisterFailed(status));
        }

        tracing::info!(%identity, "identity deleted");
        Ok(())
    }

    /// Write `bytes` to an exchange file, decode it and normalize it.
    fn prepare<Err>(&self, bytes: &[u8]) -> Result<PreparedImage<C::Image>, Err>
    where
        Err: From<std::io::Error> + From<ImageError>,
    {
        let file = TempExchangeFile::write_in(&self.exchange_dir, PHOTO_PREFIX, PHOTO_SUFFIX, bytes)?;
        let original = self.codec.decode(file.path())?;
        let normalized = normalize(&self.codec, &original)?;
        Ok(PreparedImage {
            normalized,
            _original: original,
            _file: file,
        })
    }
}

/// Pick the box with the largest area.
///
/// Only a strictly larger area replaces the current best, so the first of
/// several equally large boxes wins.
pub fn select_best_face<'a, I>(boxes: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a BoundingBox>,
{
    let mut best: Option<(i64, BoundingBox)> = None;
    for bbox in boxes {
        let area = bbox.area();
        if best.map_or(true, |(max_area, _)| area > max_area) {
            best = Some((area, *bbox));
        }
    }
    best.map(|(_, bbox)| bbox)
}

fn detected_face(face: &RecognizedFace) -> Result<DetectedFace, FindError> {
    let identity = if face.is_match() {
        let id = Uuid::parse_str(&face.identity).map_err(|source| FindError::InvalidIdentity {
            identity: face.identity.clone(),
            source,
        })?;
        Some(id)
    } else {
        None
    };
    Ok(DetectedFace::new(&face.bbox, identity))
}
