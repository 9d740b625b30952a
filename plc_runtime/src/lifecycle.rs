//! LEVEL 1: RuntimeState transitions.
//!
//! ```text
//! Empty ──install──► Stopped ──start──► Started
//!                      ▲  ▲               │
//!                      │  └──stop(clean)──┤
//! Dirty ──install──────┘                  │
//!   ▲                                     │
//!   └────────────stop(dirty)──────────────┘
//! ```
//!
//! A failed start unloads the module again and leaves the state where the
//! unload puts it. Install is refused while `Started`.

use crate::error::{LoadError, RuntimeError, RuntimeResult};
use crate::image_store::{AuxFile, ImageStore};
use crate::loader::ModuleLoader;
use crate::sampler::DebugSampler;
use parking_lot::RwLock;
use plc_common::state::RuntimeState;
use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared view of the runtime state.
///
/// Readers never wait on a lifecycle operation in progress; they see the
/// last state the controller published.
pub type StateHandle = Arc<RwLock<RuntimeState>>;

/// Owns the runtime state and sequences install, load, start, stop and unload.
pub struct LifecycleController {
    state: StateHandle,
    store: ImageStore,
    loader: Arc<ModuleLoader>,
    sampler: Arc<DebugSampler>,
    argv: Vec<CString>,
}

impl LifecycleController {
    /// Create a controller over an opened image store.
    ///
    /// The initial state is `Stopped` when the store already holds an
    /// image, `Empty` otherwise.
    ///
    /// # Errors
    /// Returns `RuntimeError::InvalidArgument` if an argument for the
    /// control program contains a NUL byte.
    pub fn new(
        store: ImageStore,
        loader: Arc<ModuleLoader>,
        sampler: Arc<DebugSampler>,
        program_args: &[String],
    ) -> RuntimeResult<Self> {
        let argv = program_argv(store.working_dir(), program_args)?;
        let state = if store.has_image() {
            RuntimeState::Stopped
        } else {
            RuntimeState::Empty
        };
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            store,
            loader,
            sampler,
            argv,
        })
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> RuntimeState {
        *self.state.read()
    }

    /// Handle for reading the state without holding the controller.
    pub fn state_handle(&self) -> StateHandle {
        Arc::clone(&self.state)
    }

    /// Image store.
    #[inline]
    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Install a new control image.
    ///
    /// # Errors
    /// - `RuntimeError::InvalidState` while `Started`
    /// - the store's error if the install fails; the state is unchanged
    pub fn install(&mut self, hash: &str, image: &[u8], aux_files: &[AuxFile]) -> RuntimeResult<()> {
        if !self.state().accepts_install() {
            return Err(self.rejected("install"));
        }
        info!("Installing control image {}", hash);
        self.store.install(hash, image, aux_files)?;
        self.set_state(RuntimeState::Stopped);
        Ok(())
    }

    /// Load the current image and start its execution loop.
    ///
    /// With `debug` set, tick production is resumed before the state
    /// becomes `Started`.
    ///
    /// # Errors
    /// - `RuntimeError::InvalidState` unless `Stopped`
    /// - `RuntimeError::Load` if the module cannot be bound; state unchanged
    /// - `RuntimeError::StartFailure` if the module refuses to start; the
    ///   module is stopped and unloaded again
    pub fn start(&mut self, debug: bool) -> RuntimeResult<()> {
        if self.state() != RuntimeState::Stopped {
            return Err(self.rejected("start"));
        }
        let path = self
            .store
            .current_image_path()
            .ok_or(LoadError::NotInstalled)?;

        self.loader.load(&path)?;
        let code = self
            .loader
            .with_program(|program| program.start(&self.argv))
            .unwrap_or(-1);
        if code != 0 {
            error!("Control program start returned {}", code);
            self.stop_and_unload();
            return Err(RuntimeError::StartFailure { code });
        }

        if debug {
            self.sampler.resume();
        }
        self.set_state(RuntimeState::Started);
        info!("Control program started from {}", path.display());
        Ok(())
    }

    /// Stop the running program and unload it.
    ///
    /// Returns the resulting state: `Stopped`, or `Dirty` when the unload
    /// left residual dependencies behind.
    ///
    /// # Errors
    /// Returns `RuntimeError::InvalidState` unless `Started`.
    pub fn stop(&mut self) -> RuntimeResult<RuntimeState> {
        if self.state() != RuntimeState::Started {
            return Err(self.rejected("stop"));
        }
        Ok(self.stop_and_unload())
    }

    fn stop_and_unload(&mut self) -> RuntimeState {
        // Suspending releases a sampler blocked on the next tick, which in
        // turn releases the binding for the unload below.
        self.loader.with_program(|program| {
            program.suspend_debug();
            program.stop();
        });
        let dirty = self.loader.unload();
        let state = if dirty {
            warn!("Unload left residual libraries; install a new image to recover");
            RuntimeState::Dirty
        } else {
            RuntimeState::Stopped
        };
        self.set_state(state);
        info!("Control program stopped ({})", state);
        state
    }

    fn set_state(&self, state: RuntimeState) {
        *self.state.write() = state;
    }

    fn rejected(&self, operation: &'static str) -> RuntimeError {
        RuntimeError::InvalidState {
            operation,
            state: self.state(),
        }
    }
}

/// Argument vector for the control program: working directory as argv[0].
fn program_argv(working_dir: &Path, args: &[String]) -> RuntimeResult<Vec<CString>> {
    std::iter::once(working_dir.to_string_lossy().into_owned())
        .chain(args.iter().cloned())
        .map(|arg| CString::new(arg.clone()).map_err(|_| RuntimeError::InvalidArgument(arg)))
        .collect()
}
