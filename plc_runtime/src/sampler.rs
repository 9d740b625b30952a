//! Tick-synchronized debug variable sampling.
//!
//! The control program publishes the registered debug variables once per
//! execution tick. A sample blocks for the next tick, pulls one value per
//! observed index in registration order, then releases the tick's buffer.
//!
//! Changing the observed set is always bracketed by `suspendDebug` /
//! `resumeDebug`, so the program never produces a tick against a
//! half-registered set.

use crate::loader::ModuleLoader;
use parking_lot::Mutex;
use plc_common::consts::TICK_SUSPENDED;
use plc_common::debug::DebugValue;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one sampling call.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// A tick with one slot per observed index; `None` marks an unavailable value.
    Tick {
        /// Tick number reported by the program.
        tick: i32,
        /// Values in observed-set order.
        values: Vec<Option<DebugValue>>,
    },
    /// No data: debugging suspended, program stopped or not loaded.
    Suspended,
}

impl Sample {
    /// Tick number, or -1 when suspended.
    pub fn tick(&self) -> i32 {
        match self {
            Self::Tick { tick, .. } => *tick,
            Self::Suspended => TICK_SUSPENDED,
        }
    }

    /// Split into the `(tick, values)` pair exposed to remote callers.
    pub fn into_parts(self) -> (i32, Option<Vec<Option<DebugValue>>>) {
        match self {
            Self::Tick { tick, values } => (tick, Some(values)),
            Self::Suspended => (TICK_SUSPENDED, None),
        }
    }
}

/// Owns the observed set and drives the debug protocol.
pub struct DebugSampler {
    loader: Arc<ModuleLoader>,
    observed: Mutex<Vec<i32>>,
}

impl DebugSampler {
    /// Create a sampler with an empty observed set.
    pub fn new(loader: Arc<ModuleLoader>) -> Self {
        Self {
            loader,
            observed: Mutex::new(Vec::new()),
        }
    }

    /// Current observed indices.
    pub fn observed_indices(&self) -> Vec<i32> {
        self.observed.lock().clone()
    }

    /// Replace the observed set and re-register it with the program.
    ///
    /// While no program is loaded only the observed set is replaced.
    pub fn set_observed_indices(&self, indices: &[i32]) {
        let registered = self.loader.with_program(|program| {
            program.suspend_debug();
            self.replace_observed(indices);
            program.reset_debug_variables();
            for &index in indices {
                program.register_debug_variable(index);
            }
            program.resume_debug();
        });
        if registered.is_none() {
            self.replace_observed(indices);
        }
        debug!("Observing {} debug variable(s)", indices.len());
    }

    /// Resume tick production after a debug start.
    pub fn resume(&self) {
        self.loader.with_program(|program| program.resume_debug());
    }

    /// Block for the next tick and decode the observed values.
    pub fn sample(&self) -> Sample {
        self.loader
            .with_program(|program| {
                let tick = program.wait_debug_data();
                if tick < 0 {
                    return Sample::Suspended;
                }

                let observed = self.observed_indices();
                let mut values = Vec::with_capacity(observed.len());
                for expected in observed {
                    let entry = program.next_debug_entry();
                    match entry.value {
                        Some(value) if entry.index == expected => values.push(Some(value)),
                        _ => {
                            warn!(
                                "Debug value unavailable at tick {}: expected index {}, got {} ({})",
                                tick,
                                expected,
                                entry.index,
                                entry.type_name.as_deref().unwrap_or("<none>")
                            );
                            values.push(None);
                        }
                    }
                }
                program.free_debug_data();

                Sample::Tick { tick, values }
            })
            .unwrap_or(Sample::Suspended)
    }

    fn replace_observed(&self, indices: &[i32]) {
        *self.observed.lock() = indices.to_vec();
    }
}
