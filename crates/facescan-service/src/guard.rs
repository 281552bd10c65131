use crate::lifecycle::EngineLifecycle;
use facescan_core::RecognitionEngine;
use parking_lot::{Mutex, MutexGuard};

/// The one lock every engine-touching call goes through.
///
/// The lifecycle, and with it the engine handle, lives inside the mutex, so
/// holding the guard is the only way to reach the engine. Acquisition blocks
/// without timeout; there is no reentrancy.
pub struct EngineGuard<E: RecognitionEngine> {
    lifecycle: Mutex<EngineLifecycle<E>>,
}

impl<E: RecognitionEngine> EngineGuard<E> {
    pub fn new(lifecycle: EngineLifecycle<E>) -> Self {
        Self {
            lifecycle: Mutex::new(lifecycle),
        }
    }

    /// Block until the engine is free and enter the critical section.
    pub fn enter(&self) -> MutexGuard<'_, EngineLifecycle<E>> {
        self.lifecycle.lock()
    }
}
