//! Agent startup errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::controller::ControllerError;
use crate::metadata::MetadataError;
use crate::watcher::{PatternError, WatcherError};

/// Errors that stop the agent. Failures inside a running loop are logged
/// instead.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Instance metadata unavailable: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Controller client error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Invalid log pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),
}
