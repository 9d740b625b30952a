//! In-process control program and backend doubles shared by the
//! integration tests.

#![allow(dead_code)]

use parking_lot::{Condvar, Mutex};
use plc_common::debug::DebugValue;
use plc_runtime::error::LoadError;
use plc_runtime::inspect::DependencyInspector;
use plc_runtime::{ControlProgram, DebugEntry, ProcessControl, ProgramOpener, RuntimeResult};
use std::collections::VecDeque;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One scripted tick: the number `wait_debug_data` returns and the entries
/// the iterator yields afterwards.
struct ScriptedTick {
    tick: i32,
    entries: Vec<DebugEntry>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<&'static str>,
    argv: Vec<CString>,
    registered: Vec<i32>,
    pending: VecDeque<ScriptedTick>,
    current: VecDeque<DebugEntry>,
    suspended: bool,
    ignores_suspend: bool,
    waiters: usize,
    start_code: i32,
}

/// Control program whose ticks are scripted by the test.
///
/// Like a real module, a blocked `wait_debug_data` returns on the next
/// tick or on suspension only; stopping the program does not wake it.
#[derive(Default)]
pub struct FakeProgram {
    state: Mutex<FakeState>,
    ticks: Condvar,
}

impl FakeProgram {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A program whose blocked waits never return, even on suspension.
    pub fn unresponsive() -> Arc<Self> {
        let program = Self::default();
        program.state.lock().ignores_suspend = true;
        Arc::new(program)
    }

    /// Make the next `start` calls return `code`.
    pub fn set_start_code(&self, code: i32) {
        self.state.lock().start_code = code;
    }

    /// Queue a tick whose entries match the given indices and values.
    pub fn push_tick(&self, tick: i32, entries: &[(i32, DebugValue)]) {
        let entries = entries
            .iter()
            .map(|(index, value)| DebugEntry {
                index: *index,
                type_name: Some(type_name(value).to_string()),
                value: Some(*value),
            })
            .collect();
        self.push_raw_tick(tick, entries);
    }

    /// Queue a tick with arbitrary entries.
    pub fn push_raw_tick(&self, tick: i32, entries: Vec<DebugEntry>) {
        self.state.lock().pending.push_back(ScriptedTick { tick, entries });
        self.ticks.notify_all();
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn registered(&self) -> Vec<i32> {
        self.state.lock().registered.clone()
    }

    pub fn argv(&self) -> Vec<CString> {
        self.state.lock().argv.clone()
    }

    /// Poll until a caller is blocked in `wait_debug_data`.
    pub fn wait_until_blocked(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.state.lock().waiters > 0 {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn record(&self, call: &'static str) {
        self.state.lock().calls.push(call);
    }
}

impl ControlProgram for FakeProgram {
    fn start(&self, argv: &[CString]) -> i32 {
        let mut state = self.state.lock();
        state.calls.push("start");
        state.argv = argv.to_vec();
        state.start_code
    }

    fn stop(&self) {
        self.record("stop");
    }

    fn reset_debug_variables(&self) {
        let mut state = self.state.lock();
        state.calls.push("reset");
        state.registered.clear();
    }

    fn register_debug_variable(&self, index: i32) {
        let mut state = self.state.lock();
        state.calls.push("register");
        state.registered.push(index);
    }

    fn next_debug_entry(&self) -> DebugEntry {
        self.state.lock().current.pop_front().unwrap_or(DebugEntry {
            index: -1,
            type_name: None,
            value: None,
        })
    }

    fn free_debug_data(&self) {
        let mut state = self.state.lock();
        state.calls.push("free");
        state.current.clear();
    }

    fn wait_debug_data(&self) -> i32 {
        let mut state = self.state.lock();
        loop {
            if state.suspended {
                return -1;
            }
            if let Some(next) = state.pending.pop_front() {
                state.current = next.entries.into();
                return next.tick;
            }
            state.waiters += 1;
            self.ticks.wait(&mut state);
            state.waiters -= 1;
        }
    }

    fn suspend_debug(&self) {
        let mut state = self.state.lock();
        state.calls.push("suspend");
        if !state.ignores_suspend {
            state.suspended = true;
            drop(state);
            self.ticks.notify_all();
        }
    }

    fn resume_debug(&self) {
        let mut state = self.state.lock();
        state.calls.push("resume");
        state.suspended = false;
    }
}

/// Delegates to a `FakeProgram` the test keeps a handle on.
struct SharedProgram(Arc<FakeProgram>);

impl ControlProgram for SharedProgram {
    fn start(&self, argv: &[CString]) -> i32 {
        self.0.start(argv)
    }
    fn stop(&self) {
        self.0.stop()
    }
    fn reset_debug_variables(&self) {
        self.0.reset_debug_variables()
    }
    fn register_debug_variable(&self, index: i32) {
        self.0.register_debug_variable(index)
    }
    fn next_debug_entry(&self) -> DebugEntry {
        self.0.next_debug_entry()
    }
    fn free_debug_data(&self) {
        self.0.free_debug_data()
    }
    fn wait_debug_data(&self) -> i32 {
        self.0.wait_debug_data()
    }
    fn suspend_debug(&self) {
        self.0.suspend_debug()
    }
    fn resume_debug(&self) {
        self.0.resume_debug()
    }
}

/// Opens every module path as the same fake program.
pub struct FakeOpener {
    program: Option<Arc<FakeProgram>>,
}

impl FakeOpener {
    pub fn new(program: &Arc<FakeProgram>) -> Box<Self> {
        Box::new(Self {
            program: Some(Arc::clone(program)),
        })
    }

    /// An opener that fails as if `startPLC` were missing.
    pub fn failing() -> Box<Self> {
        Box::new(Self { program: None })
    }
}

impl ProgramOpener for FakeOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ControlProgram>, LoadError> {
        match &self.program {
            Some(program) => Ok(Box::new(SharedProgram(Arc::clone(program)))),
            None => Err(LoadError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: "startPLC",
            }),
        }
    }
}

/// Reports a fixed dependency list.
pub struct StaticInspector(Vec<String>);

impl StaticInspector {
    pub fn clean() -> Box<Self> {
        Self::with(&["/lib/x86_64-linux-gnu/libc.so.6"])
    }

    pub fn with(libs: &[&str]) -> Box<Self> {
        Box::new(Self(libs.iter().map(|l| l.to_string()).collect()))
    }
}

impl DependencyInspector for StaticInspector {
    fn list_loaded_dependencies(&self, _module: &Path) -> Vec<String> {
        self.0.clone()
    }
}

/// Records process-level calls instead of acting on them.
#[derive(Default)]
pub struct RecordingProcess {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingProcess {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    /// Poll until `count` events were recorded or `timeout` elapses.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<&'static str> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.events.lock().len() >= count {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.events()
    }
}

impl ProcessControl for RecordingProcess {
    fn shutdown_transport(&self) {
        self.events.lock().push("shutdown_transport");
    }

    fn relaunch(&self) -> RuntimeResult<()> {
        self.events.lock().push("relaunch");
        Ok(())
    }
}

/// Path a module would be loaded from inside `dir`.
pub fn module_path(dir: &Path, hash: &str) -> PathBuf {
    dir.join(format!("{hash}{}", std::env::consts::DLL_SUFFIX))
}

fn type_name(value: &DebugValue) -> &'static str {
    match value {
        DebugValue::Bit(_) => "BOOL",
        DebugValue::I8(_) => "SINT",
        DebugValue::U8(_) => "USINT",
        DebugValue::I16(_) => "INT",
        DebugValue::U16(_) => "UINT",
        DebugValue::I32(_) => "DINT",
        DebugValue::U32(_) => "UDINT",
        DebugValue::I64(_) => "LINT",
        DebugValue::U64(_) => "ULINT",
        DebugValue::F32(_) => "REAL",
        DebugValue::F64(_) => "LREAL",
    }
}
