//! Call journal for the headless backend.

use crate::types::{ExposeRect, WindowHandle};
use std::sync::Mutex;
use std::time::Duration;

/// A toolkit operation the engine requested.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolkitCall {
    DestroyWindow(WindowHandle),
    StartTimer(WindowHandle, Duration),
    CancelTimer(WindowHandle),
    BeginSafeDraw(WindowHandle, ExposeRect),
    FinishSafeDraw(WindowHandle, ExposeRect),
    PumpFor(Duration),
}

pub(crate) struct Journal {
    calls: Mutex<Vec<ToolkitCall>>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn record(&self, call: ToolkitCall) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<ToolkitCall> {
        self.calls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, pred: impl Fn(&ToolkitCall) -> bool) -> usize {
        self.calls
            .lock()
            .map(|guard| guard.iter().filter(|c| pred(c)).count())
            .unwrap_or(0)
    }
}
