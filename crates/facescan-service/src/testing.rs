//! Scripted engine and codec doubles for the service tests.
//!
//! Fake photos are five bytes: width and height as little-endian `u16`,
//! then a tag byte. The fake codec fills every pixel with the tag, and the
//! fake engine remembers registrations per tag, so "the same photo" means
//! "the same tag".

use crate::config::EnginePayloads;
use crate::lifecycle::AcquireEngine;
use facescan_core::{
    BoundingBox, EngineImage, EngineStatus, FaceDetection, FaceRecognition, ImageCodec,
    ImageError, PixelBuffer, RecognitionEngine, RecognizedFace, Registration,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn payloads() -> EnginePayloads {
    EnginePayloads {
        config: b"config".to_vec(),
        model: b"model".to_vec(),
        database: b"database".to_vec(),
    }
}

pub fn photo(width: u16, height: u16, tag: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(5);
    bytes.extend_from_slice(&width.to_le_bytes());
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes.push(tag);
    bytes
}

pub fn face(top: i32, bottom: i32, left: i32, right: i32) -> BoundingBox {
    BoundingBox {
        top,
        bottom,
        left,
        right,
    }
}

/// What the fake engine answers.
pub struct Script {
    pub config_status: EngineStatus,
    pub model_status: EngineStatus,
    pub reset_status: EngineStatus,
    pub load_status: EngineStatus,
    pub register_status: EngineStatus,
    pub delete_status: EngineStatus,
    pub faces: Vec<BoundingBox>,
    /// Overrides the count reported by detection.
    pub detect_count: Option<i32>,
    /// Overrides the count reported by recognition.
    pub recognize_count: Option<i32>,
    /// Replaces recognition output entirely.
    pub recognition: Option<FaceRecognition>,
    pub call_delay: Option<Duration>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            config_status: 0,
            model_status: 0,
            reset_status: 0,
            load_status: 0,
            register_status: 0,
            delete_status: 0,
            faces: vec![face(10, 30, 10, 30)],
            detect_count: None,
            recognize_count: None,
            recognition: None,
            call_delay: None,
        }
    }
}

/// Shared observation point for every engine the test acquires.
#[derive(Default)]
pub struct Probe {
    pub script: Mutex<Script>,
    calls: Mutex<Vec<&'static str>>,
    registrations: Mutex<Vec<(BoundingBox, Registration)>>,
    deletions: Mutex<Vec<Registration>>,
    database_path: Mutex<Option<PathBuf>>,
    image_sizes: Mutex<Vec<(u32, u32, u8)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub uninitialized: AtomicUsize,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn registrations(&self) -> Vec<(BoundingBox, Registration)> {
        self.registrations.lock().clone()
    }

    pub fn deletions(&self) -> Vec<Registration> {
        self.deletions.lock().clone()
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path.lock().clone()
    }

    pub fn image_sizes(&self) -> Vec<(u32, u32, u8)> {
        self.image_sizes.lock().clone()
    }
}

pub struct FakeEngine {
    probe: Arc<Probe>,
    /// Image tag -> registered identity.
    registry: HashMap<u8, String>,
}

impl FakeEngine {
    pub fn acquirer(probe: &Arc<Probe>) -> AcquireEngine<FakeEngine> {
        let probe = Arc::clone(probe);
        Box::new(move || {
            probe.acquired.fetch_add(1, Ordering::SeqCst);
            FakeEngine {
                probe: Arc::clone(&probe),
                registry: HashMap::new(),
            }
        })
    }

    fn enter(&self, call: &'static str) -> InFlight {
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.probe.calls.lock().push(call);
        let delay = self.probe.script.lock().call_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        InFlight(Arc::clone(&self.probe))
    }

    fn observe(&self, image: &EngineImage<'_>) -> u8 {
        self.probe
            .image_sizes
            .lock()
            .push((image.width, image.height, image.channels));
        image.data.first().copied().unwrap_or(0)
    }
}

impl fmt::Debug for FakeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeEngine")
            .field("registry", &self.registry)
            .finish()
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.probe.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct InFlight(Arc<Probe>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RecognitionEngine for FakeEngine {
    fn load_config(&mut self, _config: &[u8]) -> EngineStatus {
        let _call = self.enter("load_config");
        self.probe.script.lock().config_status
    }

    fn load_model(&mut self, _model: &[u8]) -> EngineStatus {
        let _call = self.enter("load_model");
        self.probe.script.lock().model_status
    }

    fn create_reset_database(&mut self, path: &Path) -> EngineStatus {
        let _call = self.enter("create_reset_database");
        *self.probe.database_path.lock() = Some(path.to_path_buf());
        self.probe.script.lock().reset_status
    }

    fn load_database(&mut self, _path: &Path) -> EngineStatus {
        let _call = self.enter("load_database");
        self.probe.script.lock().load_status
    }

    fn detect_faces(&mut self, image: &EngineImage<'_>) -> FaceDetection {
        let _call = self.enter("detect_faces");
        self.observe(image);
        let script = self.probe.script.lock();
        FaceDetection {
            count: script.detect_count.unwrap_or(script.faces.len() as i32),
            boxes: script.faces.clone(),
        }
    }

    fn register_face(
        &mut self,
        image: &EngineImage<'_>,
        face: &BoundingBox,
        registration: &Registration,
    ) -> EngineStatus {
        let _call = self.enter("register_face");
        let tag = self.observe(image);
        self.probe
            .registrations
            .lock()
            .push((*face, registration.clone()));
        let status = self.probe.script.lock().register_status;
        if status == 0 {
            self.registry.insert(tag, registration.identity.clone());
        }
        status
    }

    fn recognize_faces(&mut self, image: &EngineImage<'_>) -> FaceRecognition {
        let _call = self.enter("recognize_faces");
        let tag = self.observe(image);
        let script = self.probe.script.lock();
        if let Some(recognition) = &script.recognition {
            return recognition.clone();
        }

        let faces: Vec<RecognizedFace> = script
            .faces
            .iter()
            .map(|bbox| match self.registry.get(&tag) {
                Some(identity) => RecognizedFace {
                    bbox: *bbox,
                    decision: 0,
                    identity: identity.clone(),
                },
                None => RecognizedFace {
                    bbox: *bbox,
                    decision: 1,
                    identity: String::new(),
                },
            })
            .collect();
        FaceRecognition {
            count: script.recognize_count.unwrap_or(faces.len() as i32),
            faces,
        }
    }

    fn delete_identity(&mut self, registration: &Registration) -> EngineStatus {
        let _call = self.enter("delete_identity");
        self.probe.deletions.lock().push(registration.clone());
        self.registry.retain(|_, identity| *identity != registration.identity);
        self.probe.script.lock().delete_status
    }

    fn uninitialize(&mut self) {
        let _call = self.enter("uninitialize");
        self.probe.uninitialized.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pixel buffer that counts itself while alive.
pub struct FakeImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    live: Arc<AtomicUsize>,
}

impl FakeImage {
    fn new(width: u32, height: u32, tag: u8, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            data: vec![tag; width as usize * height as usize * 3],
            width,
            height,
            live: Arc::clone(live),
        }
    }
}

impl Drop for FakeImage {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PixelBuffer for FakeImage {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn channels(&self) -> u8 {
        3
    }
}

#[derive(Default)]
pub struct FakeCodec {
    pub live: Arc<AtomicUsize>,
    pub fail_decode: AtomicBool,
    pub fail_resize: AtomicBool,
}

impl ImageCodec for FakeCodec {
    type Image = FakeImage;

    fn decode(&self, path: &Path) -> Result<FakeImage, ImageError> {
        if self.fail_decode.load(Ordering::SeqCst) {
            return Err(ImageError::Decode("injected decode failure".into()));
        }
        let bytes = std::fs::read(path).map_err(|e| ImageError::Decode(e.to_string()))?;
        let [w0, w1, h0, h1, tag] = bytes.as_slice() else {
            return Err(ImageError::Decode(format!("{} is not a fake photo", path.display())));
        };
        let width = u32::from(u16::from_le_bytes([*w0, *w1]));
        let height = u32::from(u16::from_le_bytes([*h0, *h1]));
        Ok(FakeImage::new(width, height, *tag, &self.live))
    }

    fn resize(&self, image: &FakeImage, width: u32, height: u32) -> Result<FakeImage, ImageError> {
        if self.fail_resize.load(Ordering::SeqCst) {
            return Err(ImageError::Resize("injected resize failure".into()));
        }
        let tag = image.data.first().copied().unwrap_or(0);
        Ok(FakeImage::new(width, height, tag, &self.live))
    }
}
