//! Contract of the external recognition engine.
//!
//! The engine is a stateful native component that tolerates exactly one call
//! in flight. Every method takes `&mut self`, so holding the engine behind a
//! single lock is enough to serialize all access to it.

use crate::image::PixelBuffer;
use crate::types::{BoundingBox, FaceDetection, FaceRecognition, Registration};
use std::path::Path;

/// Status code returned by engine calls. `0` is success.
pub type EngineStatus = i32;

/// Borrowed pixel view handed to the engine.
///
/// Mirrors the engine's native image descriptor: it does not own the pixels,
/// so it can never outlive the buffer it was built from.
#[derive(Debug, Clone, Copy)]
pub struct EngineImage<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl<'a> EngineImage<'a> {
    pub fn from_buffer<B: PixelBuffer + ?Sized>(buffer: &'a B) -> Self {
        Self {
            data: buffer.data(),
            width: buffer.width(),
            height: buffer.height(),
            channels: buffer.channels(),
        }
    }
}

/// External face recognition engine.
///
/// Status-returning methods use the engine's wire convention (`0` = success)
/// rather than `Result`, because the meaning of non-zero codes is owned by the
/// engine and callers decide per call whether a code is fatal.
pub trait RecognitionEngine: Send {
    fn load_config(&mut self, config: &[u8]) -> EngineStatus;

    fn load_model(&mut self, model: &[u8]) -> EngineStatus;

    /// Create the database file at `path`, or reset it if it already exists.
    fn create_reset_database(&mut self, path: &Path) -> EngineStatus;

    fn load_database(&mut self, path: &Path) -> EngineStatus;

    fn detect_faces(&mut self, image: &EngineImage<'_>) -> FaceDetection;

    fn register_face(
        &mut self,
        image: &EngineImage<'_>,
        face: &BoundingBox,
        registration: &Registration,
    ) -> EngineStatus;

    fn recognize_faces(&mut self, image: &EngineImage<'_>) -> FaceRecognition;

    fn delete_identity(&mut self, registration: &Registration) -> EngineStatus;

    /// Undo `load_model`. Called once, right before the handle is released.
    fn uninitialize(&mut self);
}
