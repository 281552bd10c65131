//! Engine handle ownership and the initialization state machine.

use crate::config::EnginePayloads;
use facescan_core::{EngineStatus, RecognitionEngine, TempExchangeFile, FACE_DATABASE_NAME};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Host-supplied function producing the process's engine instance.
pub type AcquireEngine<E> = Box<dyn FnMut() -> E + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
    /// Initialization failed. Terminal: the engine is never retried.
    Failed,
}

#[derive(Error, Debug)]
pub enum InitError {
    #[error("engine is already initialized")]
    AlreadyInitialized,
    #[error("engine initialization failed earlier; it cannot be retried")]
    PreviouslyFailed,
    #[error("engine rejected the model (status {0})")]
    ModelLoad(EngineStatus),
    #[error("failed to write face database file: {0}")]
    DatabaseFile(#[source] std::io::Error),
    #[error("engine failed to reset the face database (status {0})")]
    DatabaseReset(EngineStatus),
    #[error("engine failed to load the face database (status {0})")]
    DatabaseLoad(EngineStatus),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("recognition engine is not ready")]
pub struct EngineNotReady;

/// Owns the single engine handle and the database file it works on.
///
/// The handle exists only between a successful `initialize` and `teardown`;
/// `engine_mut` is the only way to reach it.
pub struct EngineLifecycle<E: RecognitionEngine> {
    state: EngineState,
    engine: Option<E>,
    /// Live copy of the face database. The engine persists registrations
    /// into it, so it stays on disk for as long as the engine is Ready.
    database: Option<TempExchangeFile>,
    acquire: AcquireEngine<E>,
    exchange_dir: PathBuf,
}

impl<E: RecognitionEngine> EngineLifecycle<E> {
    pub fn new(acquire: AcquireEngine<E>, exchange_dir: PathBuf) -> Self {
        Self {
            state: EngineState::Uninitialized,
            engine: None,
            database: None,
            acquire,
            exchange_dir,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Load config, model and database into a freshly acquired engine.
    ///
    /// Any failure leaves the lifecycle in [`EngineState::Failed`] with the
    /// handle already released.
    pub fn initialize(&mut self, payloads: &EnginePayloads) -> Result<(), InitError> {
        match self.state {
            EngineState::Uninitialized => {}
            EngineState::Ready => return Err(InitError::AlreadyInitialized),
            EngineState::Failed => return Err(InitError::PreviouslyFailed),
        }

        let mut engine = (self.acquire)();

        let status = engine.load_config(&payloads.config);
        if status != 0 {
            tracing::warn!(status, "engine reported an error loading its configuration");
        }

        let status = engine.load_model(&payloads.model);
        if status != 0 {
            tracing::error!(status, "unable to initialize the recognition engine");
            self.state = EngineState::Failed;
            return Err(InitError::ModelLoad(status));
        }

        let database = match open_database(&mut engine, &self.exchange_dir, &payloads.database) {
            Ok(database) => database,
            Err(err) => {
                tracing::error!(error = %err, "unable to open the face database");
                engine.uninitialize();
                self.state = EngineState::Failed;
                return Err(err);
            }
        };

        tracing::info!(database = %database.path().display(), "recognition engine ready");
        self.engine = Some(engine);
        self.database = Some(database);
        self.state = EngineState::Ready;
        Ok(())
    }

    /// The engine, if and only if the lifecycle is Ready.
    pub fn engine_mut(&mut self) -> Result<&mut E, EngineNotReady> {
        match (self.state, self.engine.as_mut()) {
            (EngineState::Ready, Some(engine)) => Ok(engine),
            _ => Err(EngineNotReady),
        }
    }

    /// Uninitialize and release the engine. No-op unless Ready.
    pub fn teardown(&mut self) {
        if self.state != EngineState::Ready {
            tracing::debug!(state = ?self.state, "teardown skipped");
            return;
        }

        if let Some(mut engine) = self.engine.take() {
            engine.uninitialize();
        }
        // Released after the engine that had it open.
        self.database = None;
        self.state = EngineState::Uninitialized;
        tracing::info!("recognition engine released");
    }
}

impl<E: RecognitionEngine> Drop for EngineLifecycle<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn open_database<E: RecognitionEngine>(
    engine: &mut E,
    dir: &Path,
    bytes: &[u8],
) -> Result<TempExchangeFile, InitError> {
    let database = TempExchangeFile::write_in(dir, FACE_DATABASE_NAME, ".db", bytes)
        .map_err(InitError::DatabaseFile)?;

    let status = engine.create_reset_database(database.path());
    if status != 0 {
        return Err(InitError::DatabaseReset(status));
    }

    let status = engine.load_database(database.path());
    if status != 0 {
        return Err(InitError::DatabaseLoad(status));
    }

    Ok(database)
}
