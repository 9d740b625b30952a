//! # PLC Runtime Library
//!
//! On-device runtime controller for dynamically deployed, compiled
//! control programs (IEC 61131-3 PLC images).
//!
//! The controller installs new images, loads and unloads them, drives
//! their start/stop lifecycle and samples live debug variables while the
//! program runs its own real-time loop.
//!
//! # Module Structure
//!
//! - [`controller`] - `RuntimeController`, the externally exposed operations
//! - [`lifecycle`] - Runtime state machine
//! - [`image_store`] - On-disk image, hash marker and auxiliary files
//! - [`loader`] - Module binding and dirty unload detection
//! - [`sampler`] - Tick-synchronized debug sampling
//! - [`program`] - `ControlProgram` trait (module entry points)
//! - [`native`] - Native modules bound with `libloading`
//! - [`inspect`] - Residual dependency inspection
//! - [`process`] - Process re-exec recovery
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      RuntimeController                           │──► ProcessControl
//! │  ┌──────────────┐   ┌───────────────────┐                        │
//! │  │  ImageStore  │◄──│LifecycleController│                        │
//! │  └──────────────┘   └─────────┬─────────┘                        │
//! │                               │                                  │
//! │                               ▼                                  │
//! │  ┌──────────────┐   ┌───────────────────┐   ┌─────────────────┐  │
//! │  │ DebugSampler │──►│   ModuleLoader    │──►│ ControlProgram  │  │
//! │  └──────────────┘   └───────────────────┘   │  (trait object) │  │
//! │                                             └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod controller;
pub mod error;
pub mod image_store;
pub mod inspect;
pub mod lifecycle;
pub mod loader;
pub mod native;
pub mod process;
pub mod program;
pub mod sampler;

// Re-export key types for convenience
pub use crate::controller::RuntimeController;
pub use crate::error::{LoadError, RuntimeError, RuntimeResult};
pub use crate::image_store::AuxFile;
pub use crate::process::{ExecRelauncher, ProcessControl};
pub use crate::program::{ControlProgram, DebugEntry, ProgramOpener};
pub use crate::sampler::Sample;
