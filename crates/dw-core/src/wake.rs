//! Process-wide wake event shared by the queues and the main loop.

use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;

/// Auto-coalescing wake signal.
///
/// Backed by a one-slot channel: any number of `signal` calls before a
/// `wait` collapse into a single wake-up.
#[derive(Clone)]
pub struct WakeEvent {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl WakeEvent {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self { tx, rx }
    }

    /// Wake any waiter. Never blocks.
    #[inline]
    pub fn signal(&self) {
        // Full means a wake-up is already pending.
        let _ = self.tx.try_send(());
    }

    /// Clear a pending signal.
    #[inline]
    pub fn reset(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Block until signalled or `timeout` elapses.
    /// Returns true if woken by a signal.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }

    /// True if a signal is pending.
    pub fn is_signalled(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl Default for WakeEvent {
    fn default() -> Self {
        Self::new()
    }
}
