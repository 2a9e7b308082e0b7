//! Timer bookkeeping for the headless backend.

use crate::types::WindowHandle;
use log::debug;
use std::sync::Mutex;
use std::time::Duration;

/// Running timers in start order.
pub(crate) struct TimerTable {
    timers: Mutex<Vec<(WindowHandle, Duration)>>,
}

impl TimerTable {
    pub(crate) fn new() -> Self {
        Self {
            timers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn start(&self, timer: WindowHandle, interval: Duration) {
        debug!("Starting headless timer {} every {:?}", timer, interval);
        if let Ok(mut guard) = self.timers.lock() {
            guard.push((timer, interval));
        }
    }

    pub(crate) fn cancel(&self, timer: WindowHandle) {
        if let Ok(mut guard) = self.timers.lock() {
            guard.retain(|(t, _)| *t != timer);
        }
    }

    pub(crate) fn active(&self) -> Vec<(WindowHandle, Duration)> {
        self.timers
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
