//! facescan-service — enroll, recognize and unregister faces through a single
//! non-thread-safe recognition engine.
//!
//! [`FaceService`] owns the engine handle behind one lock, drives its
//! initialization state machine, and stages every photo through scoped
//! exchange files and image buffers that are released on all exit paths.
//! Hosts supply the engine (`RecognitionEngine`) and the image codec, and
//! install their own `tracing` subscriber.

pub mod config;
pub mod guard;
pub mod lifecycle;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError, EnginePayloads};
pub use lifecycle::{EngineNotReady, EngineState, InitError};
pub use service::{select_best_face, EnrollError, FaceService, FindError, UnregisterError};
