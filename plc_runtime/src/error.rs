//! Error types for runtime controller operations.

use plc_common::state::RuntimeState;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to bind a control program module.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// No image is installed.
    #[error("no control image installed")]
    NotInstalled,

    /// A module is already bound.
    #[error("a control program is already loaded from {path:?}")]
    AlreadyLoaded {
        /// Path of the bound module
        path: PathBuf,
    },

    /// The module file could not be opened.
    #[error("failed to open module {path:?}: {reason}")]
    Open {
        /// Module path
        path: PathBuf,
        /// Loader message
        reason: String,
    },

    /// A required entry point is not exported.
    #[error("module {path:?} does not export `{symbol}`")]
    MissingSymbol {
        /// Module path
        path: PathBuf,
        /// Entry point name
        symbol: &'static str,
    },
}

/// Errors raised by runtime controller operations.
///
/// Every variant is recovered by the controller; none is process-fatal.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Module open or symbol resolution failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The module loaded but its start entry point reported failure.
    #[error("control program start returned {code}")]
    StartFailure {
        /// Status code returned by the module
        code: i32,
    },

    /// Filesystem failure while writing the image or its auxiliary files.
    #[error("install failed writing {path:?}: {source}")]
    InstallIo {
        /// File being written
        path: PathBuf,
        /// Source IO error
        #[source]
        source: std::io::Error,
    },

    /// Image hash or auxiliary file name is unusable as a file name.
    #[error("invalid image file name: {0:?}")]
    InvalidImageName(String),

    /// Argument handed to the control program contains a NUL byte.
    #[error("invalid program argument: {0:?}")]
    InvalidArgument(String),

    /// Operation not permitted in the current state.
    #[error("{operation} not allowed while {state}")]
    InvalidState {
        /// Rejected operation
        operation: &'static str,
        /// State at the time of the request
        state: RuntimeState,
    },

    /// Process re-exec could not be scheduled or performed.
    #[error("reload failed: {0}")]
    Relaunch(String),
}

/// Result type for runtime controller operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
