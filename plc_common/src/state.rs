//! Runtime lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the runtime controller.
///
/// Exactly one value holds at any time. `Dirty` is only left through a
/// fresh install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuntimeState {
    /// No image has ever been installed.
    #[default]
    Empty,
    /// An image is installed but not loaded.
    Stopped,
    /// The image is loaded and its execution loop is running.
    Started,
    /// Unload left foreign library state behind; reload is not trusted.
    Dirty,
}

impl RuntimeState {
    /// States from which a new image may be installed.
    #[inline]
    pub const fn accepts_install(self) -> bool {
        matches!(self, Self::Empty | Self::Stopped | Self::Dirty)
    }

    /// Wire name of the state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Stopped => "Stopped",
            Self::Started => "Started",
            Self::Dirty => "Dirty",
        }
    }
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
