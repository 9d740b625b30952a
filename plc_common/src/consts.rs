//! Workspace-wide constants for the PLC runtime.
//!
//! Single source of truth for persisted file names and runtime defaults.

/// Marker file holding the hash of the current control image.
pub const HASH_MARKER_FILE: &str = "lasttransferedPLC.md5";

/// Manifest listing auxiliary files installed alongside the image.
pub const AUX_MANIFEST_FILE: &str = "extra_files.txt";

/// File name suffix of a loadable module on this platform.
pub const MODULE_SUFFIX: &str = std::env::consts::DLL_SUFFIX;

/// Delay before a requested process re-exec, in milliseconds.
pub const DEFAULT_RELOAD_DELAY_MS: u64 = 100;

/// Default service name used for logging.
pub const DEFAULT_SERVICE_NAME: &str = "plc-runtime";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/plc_runtime/runtime.toml";

/// Library name prefixes whose presence after unload marks the process dirty.
///
/// These are UI/graphics toolkits that cannot be cleanly released once
/// something in the process has pulled them in.
pub const DEFAULT_DIRTY_PREFIXES: &[&str] = &[
    "libwx_", "libwxs", "libgtk", "libgdk", "libatk", "libpan", "libX11",
];

/// Tick value reported by the module when no data is available.
pub const TICK_SUSPENDED: i32 = -1;
