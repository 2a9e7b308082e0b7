//! Producer front-end: the entry point native toolkit callbacks call into.
//!
//! Runs on whatever thread the toolkit delivers callbacks on. Decides per
//! event whether to queue it for the UI thread or, for expose events outside
//! render-safe mode, to dispatch right away on the calling thread.

use crate::dispatch::{DISPATCH_UNHANDLED, Dispatcher};
use crate::queue::{EventQueues, Priority};
use crate::registry::HandlerRegistry;
use crate::types::{Event, EventKind, EventRecord, RawParams, WindowHandle};
use log::{debug, warn};
use std::sync::Arc;

/// Value returned to the toolkit for events that were queued.
pub const QUEUED: i32 = 0;

/// Where an event goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Dispatch on the calling thread.
    Direct,
    Queue(Priority),
}

/// Route for an event of `kind`.
pub fn route(kind: EventKind, render_safe: bool) -> Route {
    match kind {
        EventKind::Expose if render_safe => Route::Queue(Priority::Low),
        EventKind::Expose => Route::Direct,
        _ => Route::Queue(Priority::High),
    }
}

/// Handle that native callback threads feed events through.
#[derive(Clone)]
pub struct Producer {
    registry: Arc<HandlerRegistry>,
    queues: Arc<EventQueues>,
    dispatcher: Arc<Dispatcher>,
}

impl Producer {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        queues: Arc<EventQueues>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            registry,
            queues,
            dispatcher,
        }
    }

    /// Deliver a native event for `window`.
    ///
    /// Returns the callback's result for events dispatched in place and
    /// [`QUEUED`] for everything else.
    pub fn on_native_event(&self, window: WindowHandle, event: Event) -> i32 {
        let kind = event.kind();

        if self.registry.find(window, kind).is_none() {
            if kind == EventKind::Delete {
                self.dispatcher.unhandled_delete(window);
            }
            return QUEUED;
        }

        let record = EventRecord::new(window, event);
        match route(kind, self.dispatcher.render_safe()) {
            Route::Direct => self.dispatcher.dispatch_record(record),
            Route::Queue(priority) => {
                if !self.queues.get(priority).enqueue(record) {
                    warn!("Dropped {} event for {}: {:?} queue full", kind, window, priority);
                }
                QUEUED
            }
        }
    }

    /// Deliver a native event given as a wire code and generic slots.
    /// Unknown codes are ignored.
    pub fn on_raw_event(&self, window: WindowHandle, code: i32, raw: RawParams) -> i32 {
        match Event::decode(code, raw) {
            Some(event) => self.on_native_event(window, event),
            None => {
                debug!("Ignoring unknown event code {} for {}", code, window);
                DISPATCH_UNHANDLED
            }
        }
    }
}
