//! Module loader.
//!
//! Owns the binding between the runtime and the control program module.
//! The binding is an explicit tagged state: while `Unbound`, every entry
//! point query reports inactivity instead of calling into a module.

use crate::error::LoadError;
use crate::inspect::{DependencyInspector, find_dirty_dependency};
use crate::program::{ControlProgram, ProgramOpener};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A module bound into process memory.
pub struct LoadedModule {
    path: PathBuf,
    program: Box<dyn ControlProgram>,
}

impl LoadedModule {
    /// Path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Binding state of the loader.
#[derive(Default)]
pub enum ModuleBinding {
    /// No module loaded.
    #[default]
    Unbound,
    /// A module is loaded and its entry points resolved.
    Bound(LoadedModule),
}

/// Binds control program modules and detects dirty unloads.
///
/// Sampling and debug registration take shared access to the binding;
/// load and unload take exclusive access.
pub struct ModuleLoader {
    binding: RwLock<ModuleBinding>,
    opener: Box<dyn ProgramOpener>,
    inspector: Box<dyn DependencyInspector>,
    dirty_prefixes: Vec<String>,
}

impl ModuleLoader {
    /// Create an unbound loader.
    pub fn new(
        opener: Box<dyn ProgramOpener>,
        inspector: Box<dyn DependencyInspector>,
        dirty_prefixes: Vec<String>,
    ) -> Self {
        Self {
            binding: RwLock::new(ModuleBinding::Unbound),
            opener,
            inspector,
            dirty_prefixes,
        }
    }

    /// Bind the module at `path`.
    ///
    /// # Errors
    /// Returns `LoadError::AlreadyLoaded` if a module is bound, or the
    /// opener's error if the module cannot be bound.
    pub fn load(&self, path: &Path) -> Result<(), LoadError> {
        let mut binding = self.binding.write();
        if let ModuleBinding::Bound(loaded) = &*binding {
            return Err(LoadError::AlreadyLoaded {
                path: loaded.path.clone(),
            });
        }

        info!("Loading control program {}", path.display());
        let program = self.opener.open(path)?;
        *binding = ModuleBinding::Bound(LoadedModule {
            path: path.to_path_buf(),
            program,
        });
        Ok(())
    }

    /// Release the bound module.
    ///
    /// Returns `true` when residual dependencies make the unload dirty.
    /// Unloading an unbound loader is a clean no-op.
    pub fn unload(&self) -> bool {
        let previous = std::mem::take(&mut *self.binding.write());
        let ModuleBinding::Bound(loaded) = previous else {
            return false;
        };

        let LoadedModule { path, program } = loaded;
        info!("Unloading control program {}", path.display());
        drop(program);

        let dependencies = self.inspector.list_loaded_dependencies(&path);
        match find_dirty_dependency(&dependencies, self.dirty_prefixes.as_slice()) {
            Some(lib) => {
                warn!("Dirty lib detected: {}", lib);
                true
            }
            None => false,
        }
    }

    /// Whether a module is currently bound.
    pub fn is_bound(&self) -> bool {
        matches!(&*self.binding.read(), ModuleBinding::Bound(_))
    }

    /// Path of the bound module, if any.
    pub fn bound_path(&self) -> Option<PathBuf> {
        match &*self.binding.read() {
            ModuleBinding::Bound(loaded) => Some(loaded.path.clone()),
            ModuleBinding::Unbound => None,
        }
    }

    /// Run `f` against the bound program under shared access.
    ///
    /// Returns `None` without calling `f` while unbound.
    pub fn with_program<R>(&self, f: impl FnOnce(&dyn ControlProgram) -> R) -> Option<R> {
        match &*self.binding.read() {
            ModuleBinding::Bound(loaded) => Some(f(loaded.program.as_ref())),
            ModuleBinding::Unbound => None,
        }
    }
}
