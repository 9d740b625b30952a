//! Dirty unload detection.
//!
//! After a module is released, some of its dependencies may stay mapped
//! because something else in the process holds them (typically a UI
//! toolkit linked by the host). Such a process must not be trusted to
//! reload cleanly. Detection is best-effort and platform-dependent.

use plc_common::config::DirtyDetection;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Lists the shared libraries relevant to a module.
pub trait DependencyInspector: Send + Sync {
    /// Names (or paths) of loaded shared dependencies.
    fn list_loaded_dependencies(&self, module: &Path) -> Vec<String>;
}

/// Returns the first dependency whose file name starts with a denylisted prefix.
pub fn find_dirty_dependency<'a, S: AsRef<str>>(
    dependencies: &'a [String],
    prefixes: &[S],
) -> Option<&'a str> {
    dependencies.iter().map(String::as_str).find(|dep| {
        let file_name = Path::new(dep)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(*dep);
        prefixes.iter().any(|p| file_name.starts_with(p.as_ref()))
    })
}

/// Lists the module's transitive dependencies with `ldd`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LddInspector;

impl DependencyInspector for LddInspector {
    fn list_loaded_dependencies(&self, module: &Path) -> Vec<String> {
        match Command::new("ldd").arg(module).output() {
            Ok(output) => parse_ldd_output(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                warn!("ldd unavailable, skipping dirty library check: {}", e);
                Vec::new()
            }
        }
    }
}

/// First token of every `ldd` output line.
fn parse_ldd_output(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Lists the shared objects currently mapped into this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcMapsInspector;

impl DependencyInspector for ProcMapsInspector {
    fn list_loaded_dependencies(&self, _module: &Path) -> Vec<String> {
        match std::fs::read_to_string("/proc/self/maps") {
            Ok(maps) => parse_proc_maps(&maps),
            Err(e) => {
                debug!("/proc/self/maps unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

/// Distinct shared object paths from a `/proc/<pid>/maps` listing.
fn parse_proc_maps(maps: &str) -> Vec<String> {
    maps.lines()
        .filter_map(|line| line.split_whitespace().nth(5))
        .filter(|path| path.starts_with('/') && path.contains(".so"))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Never reports any dependency.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInspector;

impl DependencyInspector for NoInspector {
    fn list_loaded_dependencies(&self, _module: &Path) -> Vec<String> {
        Vec::new()
    }
}

/// Inspector for the configured detection backend on this platform.
pub fn inspector_for(detection: DirtyDetection) -> Box<dyn DependencyInspector> {
    match detection {
        DirtyDetection::Ldd if cfg!(unix) => Box::new(LddInspector),
        DirtyDetection::ProcMaps if cfg!(target_os = "linux") => Box::new(ProcMapsInspector),
        _ => Box::new(NoInspector),
    }
}
