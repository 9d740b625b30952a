//! Prelude module for common re-exports.
//!
//! # Usage
//!
//! ```rust
//! use plc_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, DirtyDetection, RuntimeConfig, RuntimeSection, SharedConfig,
};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{AUX_MANIFEST_FILE, HASH_MARKER_FILE, MODULE_SUFFIX, TICK_SUSPENDED};

// ─── Runtime types ──────────────────────────────────────────────────
pub use crate::debug::{DebugType, DebugValue};
pub use crate::state::RuntimeState;
