//! Runtime controller.
//!
//! Composes the image store, module loader, lifecycle state machine and
//! debug sampler, and exposes the operations consumed by a remote
//! transport. Every operation reports success or a degraded result; no
//! failure is fatal to the controller.
//!
//! Only install, start and stop take the lifecycle lock. Status, hash
//! matching and forced reloads stay available while one of those is in
//! progress, so a wedged stop can still be recovered with a reload.

use crate::error::{RuntimeError, RuntimeResult};
use crate::image_store::{self, AuxFile, ImageStore};
use crate::inspect::{DependencyInspector, inspector_for};
use crate::lifecycle::{LifecycleController, StateHandle};
use crate::loader::ModuleLoader;
use crate::native::NativeOpener;
use crate::process::{self, ProcessControl};
use crate::program::ProgramOpener;
use crate::sampler::{DebugSampler, Sample};
use parking_lot::Mutex;
use plc_common::config::RuntimeSection;
use plc_common::state::RuntimeState;
use static_assertions::assert_impl_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// The runtime controller.
///
/// Lifecycle operations are serialised; sampling and observed-set changes
/// run alongside them, so a caller blocked in [`sample`](Self::sample)
/// never holds up another caller's [`stop`](Self::stop).
pub struct RuntimeController {
    lifecycle: Mutex<LifecycleController>,
    state: StateHandle,
    sampler: Arc<DebugSampler>,
    process: Arc<dyn ProcessControl>,
    reload_delay: Duration,
    working_dir: PathBuf,
}

assert_impl_all!(RuntimeController: Send, Sync);

impl RuntimeController {
    /// Create a controller loading native modules from the configured
    /// working directory.
    ///
    /// # Errors
    /// Returns `RuntimeError::InvalidArgument` for unusable program arguments.
    pub fn new(section: &RuntimeSection, process: Arc<dyn ProcessControl>) -> RuntimeResult<Self> {
        Self::with_backends(
            section,
            Box::new(NativeOpener),
            inspector_for(section.dirty_detection),
            process,
        )
    }

    /// Create a controller with explicit module and inspection backends.
    pub fn with_backends(
        section: &RuntimeSection,
        opener: Box<dyn ProgramOpener>,
        inspector: Box<dyn DependencyInspector>,
        process: Arc<dyn ProcessControl>,
    ) -> RuntimeResult<Self> {
        let loader = Arc::new(ModuleLoader::new(
            opener,
            inspector,
            section.dirty_prefixes.clone(),
        ));
        let sampler = Arc::new(DebugSampler::new(Arc::clone(&loader)));
        let store = ImageStore::open(&section.working_dir);
        let lifecycle = LifecycleController::new(
            store,
            loader,
            Arc::clone(&sampler),
            &section.program_args,
        )?;
        info!("Runtime controller ready ({})", lifecycle.state());
        Ok(Self {
            state: lifecycle.state_handle(),
            lifecycle: Mutex::new(lifecycle),
            sampler,
            process,
            reload_delay: section.reload_delay(),
            working_dir: section.working_dir.clone(),
        })
    }

    /// Install a new control image with its auxiliary files.
    pub fn install(&self, hash: &str, image: &[u8], aux_files: &[AuxFile]) -> bool {
        report("install", self.lifecycle.lock().install(hash, image, aux_files))
    }

    /// Load and start the current image.
    pub fn start(&self, debug: bool) -> bool {
        report("start", self.lifecycle.lock().start(debug))
    }

    /// Stop and unload the running image.
    pub fn stop(&self) -> bool {
        report("stop", self.lifecycle.lock().stop())
    }

    /// Current lifecycle state.
    pub fn status(&self) -> RuntimeState {
        *self.state.read()
    }

    /// Whether `hash` names the current image.
    pub fn match_hash(&self, hash: &str) -> bool {
        image_store::hash_matches(&self.working_dir, hash)
    }

    /// Replace the set of observed debug variables.
    pub fn set_observed_indices(&self, indices: &[i32]) {
        self.sampler.set_observed_indices(indices);
    }

    /// Block for the next tick and return the observed values.
    pub fn sample(&self) -> Sample {
        self.sampler.sample()
    }

    /// Schedule a re-exec of the whole process.
    pub fn force_reload(&self) -> bool {
        report(
            "force reload",
            process::schedule_reload(Arc::clone(&self.process), self.reload_delay),
        )
    }
}

fn report<T>(operation: &str, result: Result<T, RuntimeError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            error!("{} failed: {}", operation, e);
            false
        }
    }
}
