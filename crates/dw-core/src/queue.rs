//! Fixed-capacity event queues.
//!
//! Each queue is a ring buffer of `EventRecord`s behind its own lock.
//! Producers never wait on a full queue: the record is dropped instead.
//! The single consumer (the UI thread) pops and signals the shared wake
//! event so blocked producers and waiters make progress.

use crate::types::EventRecord;
use crate::wake::WakeEvent;
use log::debug;
use std::sync::{Mutex, TryLockError};
use std::thread;

/// Default number of records each queue holds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Default number of `try_lock` attempts before `enqueue` blocks on the lock.
pub const DEFAULT_SPIN_LIMIT: u32 = 64;

/// Which queue a record goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Input and state changes.
    High,
    /// Deferred drawing.
    Low,
}

/// Ring storage. `head`/`tail` are both `None` when empty.
struct Ring {
    slots: Vec<Option<EventRecord>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: None,
            tail: None,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        match (self.head, self.tail) {
            (Some(head), Some(tail)) => (tail + self.capacity() - head) % self.capacity() + 1,
            _ => 0,
        }
    }

    fn push(&mut self, record: EventRecord) -> Result<(), EventRecord> {
        if self.capacity() == 0 {
            return Err(record);
        }

        let new_tail = match (self.head, self.tail) {
            (Some(head), Some(tail)) => {
                let next = (tail + 1) % self.capacity();
                if next == head {
                    return Err(record);
                }
                next
            }
            _ => {
                self.head = Some(0);
                0
            }
        };

        self.slots[new_tail] = Some(record);
        self.tail = Some(new_tail);
        Ok(())
    }

    fn pop(&mut self) -> Option<EventRecord> {
        let head = self.head?;
        let record = self.slots[head].take();

        if self.tail == Some(head) {
            self.head = None;
            self.tail = None;
        } else {
            self.head = Some((head + 1) % self.capacity());
        }

        record
    }
}

/// Bounded FIFO of event records.
pub struct EventQueue {
    name: &'static str,
    ring: Mutex<Ring>,
    wake: WakeEvent,
    spin_limit: u32,
}

impl EventQueue {
    pub fn new(name: &'static str, capacity: usize, spin_limit: u32, wake: WakeEvent) -> Self {
        Self {
            name,
            ring: Mutex::new(Ring::new(capacity)),
            wake,
            spin_limit,
        }
    }

    /// Copy `record` into the queue.
    ///
    /// Returns false if the queue is full (the record is dropped) or the
    /// lock is poisoned. The lock is taken with a short `try_lock`/yield
    /// spin so a producer never parks behind the UI thread.
    pub fn enqueue(&self, record: EventRecord) -> bool {
        let mut attempts = 0;
        let mut ring = loop {
            match self.ring.try_lock() {
                Ok(guard) => break guard,
                Err(TryLockError::WouldBlock) if attempts < self.spin_limit => {
                    attempts += 1;
                    thread::yield_now();
                }
                Err(TryLockError::WouldBlock) => match self.ring.lock() {
                    Ok(guard) => break guard,
                    Err(_) => return false,
                },
                Err(TryLockError::Poisoned(_)) => return false,
            }
        };

        match ring.push(record) {
            Ok(()) => true,
            Err(dropped) => {
                debug!(
                    "{} queue full ({} records), dropping {} event",
                    self.name,
                    ring.capacity(),
                    dropped.kind()
                );
                false
            }
        }
    }

    /// Pop the oldest record. Signals the wake event on success.
    pub fn dequeue(&self) -> Option<EventRecord> {
        let record = self.ring.lock().ok()?.pop();
        if record.is_some() {
            self.wake.signal();
        }
        record
    }

    pub fn len(&self) -> usize {
        self.ring.lock().map(|ring| ring.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().map(|ring| ring.capacity()).unwrap_or(0)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The high and low priority queues, built together with their wake event.
pub struct EventQueues {
    pub high: EventQueue,
    pub low: EventQueue,
}

impl EventQueues {
    pub fn new(capacity: usize, spin_limit: u32, wake: &WakeEvent) -> Self {
        Self {
            high: EventQueue::new("high", capacity, spin_limit, wake.clone()),
            low: EventQueue::new("low", capacity, spin_limit, wake.clone()),
        }
    }

    #[inline]
    pub fn get(&self, priority: Priority) -> &EventQueue {
        match priority {
            Priority::High => &self.high,
            Priority::Low => &self.low,
        }
    }

    /// Pop from high if it has anything, otherwise from low.
    pub fn dequeue_any(&self) -> Option<EventRecord> {
        self.high.dequeue().or_else(|| self.low.dequeue())
    }
}
