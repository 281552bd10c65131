//! facescan-core — building blocks shared by the facescan service.
//!
//! Defines the contract of the external recognition engine, the image codec
//! seam with its input normalization, and the temp files used to hand payloads
//! to the engine.

pub mod engine;
pub mod exchange;
pub mod image;
pub mod types;

pub use self::engine::{EngineImage, EngineStatus, RecognitionEngine};
pub use self::exchange::TempExchangeFile;
pub use self::image::{DecodedImage, ImageCodec, ImageError, ImageRsCodec, PixelBuffer};
pub use self::types::{
    BoundingBox, DetectedFace, FaceDetection, FaceRecognition, RecognizedFace, Registration,
    FACE_DATABASE_NAME,
};
