//! Control program interface.
//!
//! This module defines:
//! - `ControlProgram` trait - The entry points of a loaded control program
//! - `ProgramOpener` trait - Binds a module file into a `ControlProgram`
//! - `DebugEntry` struct - One value yielded by the per-tick debug iterator
//!
//! The native implementation lives in [`crate::native`]. Keeping the seam
//! at a trait lets the controller run against in-process programs.

use crate::error::LoadError;
use plc_common::debug::DebugValue;
use std::ffi::CString;
use std::path::Path;

/// One debug value offered by the control program for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugEntry {
    /// Variable index reported by the program.
    pub index: i32,
    /// IEC type name reported by the program, if any.
    pub type_name: Option<String>,
    /// Decoded value, `None` when the type is unknown or not decodable.
    pub value: Option<DebugValue>,
}

/// Entry points of a loaded control program.
///
/// # Lifecycle
///
/// 1. `start()` - Once after binding; 0 means the execution loop runs
/// 2. debug entry points - Any time while started
/// 3. `stop()` - Once per successful or failed start
///
/// # Debug protocol
///
/// `wait_debug_data()` blocks until the next tick and returns its number,
/// or a negative value once debugging is suspended. Suspension is the only
/// way to release a blocked waiter; stopping the program does not.
/// After a tick, `next_debug_entry()` is called once per registered
/// variable, in registration order, then `free_debug_data()` exactly once.
pub trait ControlProgram: Send + Sync {
    /// Start the execution loop. Returns 0 on success.
    fn start(&self, argv: &[CString]) -> i32;

    /// Stop the execution loop.
    fn stop(&self);

    /// Clear the registered debug variables.
    fn reset_debug_variables(&self);

    /// Append one variable index to the registered set.
    fn register_debug_variable(&self, index: i32);

    /// Pull the next debug value of the current tick.
    fn next_debug_entry(&self) -> DebugEntry;

    /// Release the current tick's buffers.
    fn free_debug_data(&self);

    /// Block until the next tick.
    fn wait_debug_data(&self) -> i32;

    /// Pause tick production.
    fn suspend_debug(&self);

    /// Resume tick production.
    fn resume_debug(&self);
}

/// Opens module files into callable control programs.
pub trait ProgramOpener: Send + Sync {
    /// Bind the module at `path`, resolving every entry point.
    ///
    /// # Errors
    /// Returns `LoadError::Open` or `LoadError::MissingSymbol`.
    fn open(&self, path: &Path) -> Result<Box<dyn ControlProgram>, LoadError>;
}
