//! Headless backend for dw-core.
//!
//! Implements the Toolkit trait without a display. Windows and timers are
//! plain handles, and every call the engine makes is written to a journal
//! so hosts and tests can inspect what the engine asked for.

mod journal;
mod timers;

pub use journal::ToolkitCall;

use crate::toolkit::Toolkit;
use crate::types::{ExposeRect, WindowHandle};
use journal::Journal;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use timers::TimerTable;

/// First handle value handed out; small values stay free for hosts.
const FIRST_HANDLE: u64 = 0x1000;

/// Display-less toolkit.
pub struct HeadlessToolkit {
    next_handle: AtomicU64,
    windows: RwLock<HashSet<u64>>,
    /// Wrapped references: alias handle -> underlying window.
    aliases: RwLock<HashMap<u64, u64>>,
    timers: TimerTable,
    journal: Journal,
}

impl HeadlessToolkit {
    /// Create a new headless toolkit instance.
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(FIRST_HANDLE),
            windows: RwLock::new(HashSet::new()),
            aliases: RwLock::new(HashMap::new()),
            timers: TimerTable::new(),
            journal: Journal::new(),
        }
    }

    fn next_handle(&self) -> WindowHandle {
        WindowHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a window.
    pub fn create_window(&self) -> WindowHandle {
        let window = self.next_handle();
        if let Ok(mut guard) = self.windows.write() {
            guard.insert(window.0);
        }
        debug!("Created headless window {}", window);
        window
    }

    /// Hand out a second handle for an existing window, the way hosts with
    /// indirect references produce distinct handle values per callback.
    pub fn alias(&self, window: WindowHandle) -> WindowHandle {
        let alias = self.next_handle();
        if let Ok(mut guard) = self.aliases.write() {
            guard.insert(alias.0, self.resolve(window).0);
        }
        alias
    }

    /// Map an alias back to its underlying window.
    pub fn resolve(&self, handle: WindowHandle) -> WindowHandle {
        self.aliases
            .read()
            .ok()
            .and_then(|guard| guard.get(&handle.0).copied())
            .map(WindowHandle)
            .unwrap_or(handle)
    }

    /// Whether a window exists and has not been destroyed.
    pub fn is_alive(&self, window: WindowHandle) -> bool {
        let window = self.resolve(window);
        self.windows
            .read()
            .map(|guard| guard.contains(&window.0))
            .unwrap_or(false)
    }

    /// Timers that are currently running with their intervals.
    pub fn active_timers(&self) -> Vec<(WindowHandle, Duration)> {
        self.timers.active()
    }

    /// Snapshot of every call made so far.
    pub fn calls(&self) -> Vec<ToolkitCall> {
        self.journal.snapshot()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&ToolkitCall) -> bool) -> usize {
        self.journal.count(pred)
    }
}

impl Default for HeadlessToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolkit for HeadlessToolkit {
    fn name(&self) -> &str {
        "headless"
    }

    fn same_window(&self, a: WindowHandle, b: WindowHandle) -> bool {
        self.resolve(a) == self.resolve(b)
    }

    fn destroy_window(&self, window: WindowHandle) {
        let window = self.resolve(window);
        let existed = self
            .windows
            .write()
            .map(|mut guard| guard.remove(&window.0))
            .unwrap_or(false);
        if existed {
            info!("Destroyed headless window {}", window);
        }
        self.journal.record(ToolkitCall::DestroyWindow(window));
    }

    fn start_timer(&self, interval: Duration) -> WindowHandle {
        let timer = self.next_handle();
        self.timers.start(timer, interval);
        self.journal.record(ToolkitCall::StartTimer(timer, interval));
        timer
    }

    fn cancel_timer(&self, timer: WindowHandle) {
        self.timers.cancel(timer);
        self.journal.record(ToolkitCall::CancelTimer(timer));
    }

    fn begin_safe_draw(&self, window: WindowHandle, area: &ExposeRect) {
        self.journal
            .record(ToolkitCall::BeginSafeDraw(self.resolve(window), *area));
    }

    fn finish_safe_draw(&self, window: WindowHandle, area: &ExposeRect) {
        self.journal
            .record(ToolkitCall::FinishSafeDraw(self.resolve(window), *area));
    }

    fn pump_for(&self, duration: Duration) {
        self.journal.record(ToolkitCall::PumpFor(duration));
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}
