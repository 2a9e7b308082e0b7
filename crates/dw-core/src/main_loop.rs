//! Main loop: drains the queues on the UI thread and dispatches each record.
//!
//! The first thread to enter the loop (or to call
//! [`MainLoop::claim_ui_thread`]) becomes the UI thread. Calls from any other
//! thread are handed to the toolkit's own event pump instead.

use crate::dispatch::Dispatcher;
use crate::queue::EventQueues;
use crate::toolkit::Toolkit;
use crate::types::EventRecord;
use crate::wake::WakeEvent;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How a pump orders the two queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainPolicy {
    /// Drain high to empty, then low to empty. A steady stream of high
    /// priority events starves the low queue; drawing tolerates this since
    /// a later expose supersedes a missed one.
    StrictPriority,
    /// Drain high to empty before every low record.
    RecheckHigh,
}

pub const DEFAULT_DRAIN_POLICY: DrainPolicy = DrainPolicy::StrictPriority;

/// Observable loop state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Waiting = 3,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoopState::Running,
            2 => LoopState::Draining,
            3 => LoopState::Waiting,
            _ => LoopState::Idle,
        }
    }
}

pub struct MainLoop {
    queues: Arc<EventQueues>,
    dispatcher: Arc<Dispatcher>,
    toolkit: Arc<dyn Toolkit>,
    wake: WakeEvent,
    active: AtomicBool,
    ui_thread: Mutex<Option<ThreadId>>,
    state: AtomicU8,
    poll_interval: Duration,
    policy: DrainPolicy,
}

impl MainLoop {
    pub fn new(
        queues: Arc<EventQueues>,
        dispatcher: Arc<Dispatcher>,
        toolkit: Arc<dyn Toolkit>,
        wake: WakeEvent,
        poll_interval: Duration,
        policy: DrainPolicy,
    ) -> Self {
        Self {
            queues,
            dispatcher,
            toolkit,
            wake,
            active: AtomicBool::new(true),
            ui_thread: Mutex::new(None),
            state: AtomicU8::new(LoopState::Idle as u8),
            poll_interval,
            policy,
        }
    }

    /// Record the calling thread as the UI thread if none is recorded yet.
    /// Returns true if the calling thread is the UI thread.
    pub fn claim_ui_thread(&self) -> bool {
        let current = thread::current().id();
        match self.ui_thread.lock() {
            Ok(mut guard) => *guard.get_or_insert(current) == current,
            Err(_) => false,
        }
    }

    /// True if the calling thread is the recorded UI thread.
    pub fn is_ui_thread(&self) -> bool {
        let current = thread::current().id();
        self.ui_thread
            .lock()
            .map(|guard| *guard == Some(current))
            .unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LoopState) -> LoopState {
        LoopState::from_u8(self.state.swap(state as u8, Ordering::AcqRel))
    }

    /// Run until [`MainLoop::quit`] is called.
    pub fn run_forever(&self) {
        if !self.claim_ui_thread() {
            warn!("Main loop entered from a foreign thread, using the toolkit pump");
            while self.is_active() {
                self.toolkit.pump_for(self.poll_interval);
            }
            return;
        }

        info!("Main loop running");
        let previous = self.set_state(LoopState::Running);

        while self.is_active() {
            self.wake.reset();
            self.drain();
            if !self.is_active() {
                break;
            }
            self.set_state(LoopState::Waiting);
            self.wake.wait(self.poll_interval);
            self.set_state(LoopState::Running);
        }

        self.set_state(previous);
        info!("Main loop stopped");
    }

    /// Run for `duration`, or until quit, whichever comes first.
    pub fn run_for(&self, duration: Duration) {
        if !self.claim_ui_thread() {
            self.toolkit.pump_for(duration);
            return;
        }

        let start = Instant::now();
        let previous = self.set_state(LoopState::Running);

        while self.is_active() {
            self.wake.reset();
            self.drain();

            let elapsed = start.elapsed();
            if elapsed >= duration || !self.is_active() {
                break;
            }
            self.set_state(LoopState::Waiting);
            self.wake.wait(duration - elapsed);
            self.set_state(LoopState::Running);
        }

        self.set_state(previous);
    }

    /// Dispatch at most one record, high queue first.
    /// Returns true if a record was dispatched.
    pub fn run_one_iteration(&self) -> bool {
        if !self.claim_ui_thread() {
            self.run_for(Duration::ZERO);
            return false;
        }

        match self.queues.dequeue_any() {
            Some(record) => {
                self.dispatcher.dispatch_record(record);
                true
            }
            None => false,
        }
    }

    /// Stop every running loop. Safe from any thread and from callbacks.
    pub fn quit(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            debug!("Main loop quit requested");
        }
        self.wake.signal();
    }

    /// One pump of both queues under the configured policy.
    /// Returns the number of records dispatched.
    fn drain(&self) -> usize {
        let previous = self.set_state(LoopState::Draining);
        let mut dispatched = 0;

        match self.policy {
            DrainPolicy::StrictPriority => {
                dispatched += self.drain_queue(|q| q.high.dequeue());
                dispatched += self.drain_queue(|q| q.low.dequeue());
            }
            DrainPolicy::RecheckHigh => {
                dispatched += self.drain_queue(|q| q.dequeue_any());
            }
        }

        self.set_state(previous);
        dispatched
    }

    fn drain_queue(&self, next: impl Fn(&EventQueues) -> Option<EventRecord>) -> usize {
        let mut dispatched = 0;
        while self.is_active() {
            let Some(record) = next(&self.queues) else {
                break;
            };
            self.dispatcher.dispatch_record(record);
            dispatched += 1;
        }
        dispatched
    }
}
