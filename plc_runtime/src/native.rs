//! Native control program modules.
//!
//! Binds a compiled PLC shared library with `libloading` and resolves its
//! fixed C ABI into a typed function table:
//!
//! | Symbol                  | Signature                                         |
//! |-------------------------|---------------------------------------------------|
//! | `startPLC`              | `int (int argc, char **argv)`                     |
//! | `stopPLC`               | `void (void)`                                     |
//! | `ResetDebugVariables`   | `void (void)`                                     |
//! | `RegisterDebugVariable` | `void (int idx)`                                  |
//! | `IterDebugData`         | `void *(int *idx, const char **type_name)`        |
//! | `FreeDebugData`         | `void (void)`                                     |
//! | `WaitDebugData`         | `int (void)`                                      |
//! | `suspendDebug`          | `void (void)`                                     |
//! | `resumeDebug`           | `void (void)`                                     |

use crate::error::LoadError;
use crate::program::{ControlProgram, DebugEntry, ProgramOpener};
use libloading::{Library, Symbol};
use plc_common::debug::DebugType;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, error, info};

/// Start status reported when the module could not be called at all.
const START_REJECTED: i32 = -1;

type StartFn = unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int;
type VoidFn = unsafe extern "C" fn();
type RegisterFn = unsafe extern "C" fn(c_int);
type IterFn = unsafe extern "C" fn(*mut c_int, *mut *const c_char) -> *const c_void;
type WaitFn = unsafe extern "C" fn() -> c_int;

/// Entry points resolved from a loaded module.
#[derive(Clone, Copy)]
struct FunctionTable {
    start: StartFn,
    stop: VoidFn,
    reset_debug_variables: VoidFn,
    register_debug_variable: RegisterFn,
    iter_debug_data: IterFn,
    free_debug_data: VoidFn,
    wait_debug_data: WaitFn,
    suspend_debug: VoidFn,
    resume_debug: VoidFn,
}

impl FunctionTable {
    fn resolve(lib: &Library, path: &Path) -> Result<Self, LoadError> {
        Ok(Self {
            start: symbol(lib, path, "startPLC")?,
            stop: symbol(lib, path, "stopPLC")?,
            reset_debug_variables: symbol(lib, path, "ResetDebugVariables")?,
            register_debug_variable: symbol(lib, path, "RegisterDebugVariable")?,
            iter_debug_data: symbol(lib, path, "IterDebugData")?,
            free_debug_data: symbol(lib, path, "FreeDebugData")?,
            wait_debug_data: symbol(lib, path, "WaitDebugData")?,
            suspend_debug: symbol(lib, path, "suspendDebug")?,
            resume_debug: symbol(lib, path, "resumeDebug")?,
        })
    }
}

fn symbol<T: Copy>(lib: &Library, path: &Path, name: &'static str) -> Result<T, LoadError> {
    // SAFETY: Symbol type matches the control program ABI; the pointer is
    // only used while `lib` is kept alive by the owning `NativeModule`.
    let sym: Symbol<T> = unsafe { lib.get(name.as_bytes()) }.map_err(|_| {
        LoadError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: name,
        }
    })?;
    Ok(*sym)
}

/// A control program module bound into process memory.
pub struct NativeModule {
    path: PathBuf,
    table: FunctionTable,
    // Dropped last: the table points into this library.
    _lib: Library,
}

impl NativeModule {
    /// Open the module at `path` and resolve every entry point.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        // SAFETY: Loading a foreign module runs its initialisers; the
        // module is a compiled control image installed by the operator.
        let lib = unsafe { Library::new(path) }.map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let table = FunctionTable::resolve(&lib, path)?;
        info!("Bound control program {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            table,
            _lib: lib,
        })
    }
}

impl Drop for NativeModule {
    fn drop(&mut self) {
        debug!("Releasing control program {}", self.path.display());
    }
}

impl ControlProgram for NativeModule {
    fn start(&self, argv: &[CString]) -> i32 {
        let Some(count) = argc(argv.len()) else {
            error!("Too many program arguments ({})", argv.len());
            return START_REJECTED;
        };
        let mut ptrs: Vec<*mut c_char> = argv.iter().map(|a| a.as_ptr().cast_mut()).collect();
        ptrs.push(ptr::null_mut());
        // SAFETY: `ptrs` holds `count` valid NUL-terminated strings followed by
        // a null terminator, all alive for the duration of the call.
        unsafe { (self.table.start)(count, ptrs.as_mut_ptr()) }
    }

    fn stop(&self) {
        // SAFETY: ABI entry point without arguments.
        unsafe { (self.table.stop)() }
    }

    fn reset_debug_variables(&self) {
        // SAFETY: ABI entry point without arguments.
        unsafe { (self.table.reset_debug_variables)() }
    }

    fn register_debug_variable(&self, index: i32) {
        // SAFETY: ABI entry point taking a plain integer.
        unsafe { (self.table.register_debug_variable)(index) }
    }

    fn next_debug_entry(&self) -> DebugEntry {
        let mut index: c_int = -1;
        let mut type_name: *const c_char = ptr::null();
        // SAFETY: Both out-pointers reference live locals.
        let raw = unsafe { (self.table.iter_debug_data)(&mut index, &mut type_name) };

        let type_name = if type_name.is_null() {
            None
        } else {
            // SAFETY: The module reports type names as static C strings.
            Some(unsafe { CStr::from_ptr(type_name) }.to_string_lossy().into_owned())
        };

        let value = type_name
            .as_deref()
            .and_then(DebugType::from_type_name)
            .and_then(|ty| {
                let width = ty.width()?;
                if raw.is_null() {
                    return None;
                }
                // SAFETY: The module guarantees `raw` points to a value of the
                // reported type, valid until `FreeDebugData`.
                let bytes = unsafe { std::slice::from_raw_parts(raw.cast::<u8>(), width) };
                ty.decode(bytes)
            });

        DebugEntry {
            index,
            type_name,
            value,
        }
    }

    fn free_debug_data(&self) {
        // SAFETY: ABI entry point without arguments.
        unsafe { (self.table.free_debug_data)() }
    }

    fn wait_debug_data(&self) -> i32 {
        // SAFETY: ABI entry point without arguments.
        unsafe { (self.table.wait_debug_data)() }
    }

    fn suspend_debug(&self) {
        // SAFETY: ABI entry point without arguments.
        unsafe { (self.table.suspend_debug)() }
    }

    fn resume_debug(&self) {
        // SAFETY: ABI entry point without arguments.
        unsafe { (self.table.resume_debug)() }
    }
}

/// Argument count as passed to `startPLC`, if it fits a C `int`.
fn argc(len: usize) -> Option<c_int> {
    c_int::try_from(len).ok()
}

/// Opens modules from disk with the platform dynamic loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeOpener;

impl ProgramOpener for NativeOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ControlProgram>, LoadError> {
        Ok(Box::new(NativeModule::open(path)?))
    }
}
