use thiserror::Error;
use tracing::{error, warn};

use crate::model::{RegistryError, WindowHandle};
use crate::sys::process::SpawnError;
use crate::sys::signal::SignalError;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Window not managed: {0:?}")]
    WindowNotFound(WindowHandle),
    #[error("Registry rejected the operation: {0}")]
    Registry(#[from] RegistryError),
    #[error("Spawn failed: {0}")]
    Spawn(#[from] SpawnError),
    #[error("Could not signal the block scheduler: {0}")]
    Signal(#[from] SignalError),
}

impl ReactorError {
    /// Spawn failures are errors; everything else only means an event could
    /// not be applied.
    pub(super) fn log(&self) {
        match self {
            ReactorError::Spawn(_) => error!("{self}"),
            _ => warn!("{self}"),
        }
    }
}
