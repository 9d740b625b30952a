//! Process re-exec recovery.
//!
//! A wedged foreign-library state that an ordinary unload cannot clear is
//! recovered by replacing the process image with a fresh copy of itself.
//! The capability is injected into the controller so tests can observe
//! a reload without losing the test process.

use crate::error::{RuntimeError, RuntimeResult};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// Hook invoked to close the remote transport before a re-exec.
pub type TransportShutdown = Box<dyn Fn() + Send + Sync>;

/// Process-level operations used by a forced reload.
pub trait ProcessControl: Send + Sync {
    /// Shut the remote transport down cleanly.
    fn shutdown_transport(&self);

    /// Replace the process with a fresh instance started with the
    /// original arguments.
    ///
    /// Does not return on success.
    fn relaunch(&self) -> RuntimeResult<()>;
}

/// Schedule a re-exec of the process after `delay`.
///
/// The transport is shut down first so the new instance can bind it.
/// Returns once the reload thread is running, so the caller's response can
/// still be delivered.
///
/// # Errors
/// Returns `RuntimeError::Relaunch` if the reload thread cannot be spawned.
pub fn schedule_reload(process: Arc<dyn ProcessControl>, delay: Duration) -> RuntimeResult<()> {
    info!("Process reload scheduled in {:?}", delay);
    thread::Builder::new()
        .name("plc-reload".to_string())
        .spawn(move || {
            thread::sleep(delay);
            process.shutdown_transport();
            if let Err(e) = process.relaunch() {
                error!("Process reload failed: {}", e);
            }
        })
        .map(|_| ())
        .map_err(|e| RuntimeError::Relaunch(e.to_string()))
}

/// Re-executes the current binary with its original arguments.
pub struct ExecRelauncher {
    program: PathBuf,
    args: Vec<OsString>,
    transport_shutdown: Option<TransportShutdown>,
}

impl ExecRelauncher {
    /// Capture the running executable and its argument vector.
    pub fn from_env() -> std::io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: std::env::args_os().collect(),
            transport_shutdown: None,
        })
    }

    /// Install the hook that closes the remote transport.
    pub fn with_transport_shutdown(mut self, hook: TransportShutdown) -> Self {
        self.transport_shutdown = Some(hook);
        self
    }

    /// Arguments the process will be relaunched with (argv[0] included).
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl ProcessControl for ExecRelauncher {
    fn shutdown_transport(&self) {
        if let Some(hook) = &self.transport_shutdown {
            info!("Shutting down remote transport");
            hook();
        }
    }

    #[cfg(unix)]
    fn relaunch(&self) -> RuntimeResult<()> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let to_cstring = |s: &std::ffi::OsStr| {
            CString::new(s.as_bytes()).map_err(|e| RuntimeError::Relaunch(e.to_string()))
        };
        let program = to_cstring(self.program.as_os_str())?;
        let args = self
            .args
            .iter()
            .map(|a| to_cstring(a.as_os_str()))
            .collect::<RuntimeResult<Vec<_>>>()?;

        info!("Re-executing {}", self.program.display());
        match nix::unistd::execv(&program, &args) {
            Ok(never) => match never {},
            Err(errno) => Err(RuntimeError::Relaunch(errno.to_string())),
        }
    }

    #[cfg(not(unix))]
    fn relaunch(&self) -> RuntimeResult<()> {
        info!("Respawning {}", self.program.display());
        std::process::Command::new(&self.program)
            .args(self.args.iter().skip(1))
            .spawn()
            .map_err(|e| RuntimeError::Relaunch(e.to_string()))?;
        std::process::exit(0);
    }
}
