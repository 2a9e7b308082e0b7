//! Dispatcher: turns an event record plus its handler into a typed call.

use crate::registry::{Handler, HandlerEntry, HandlerRegistry};
use crate::toolkit::Toolkit;
use crate::types::{Event, EventKind, EventRecord, WindowHandle};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Returned when nothing was invoked for a record.
pub const DISPATCH_UNHANDLED: i32 = -1;

/// Invokes application callbacks on behalf of the main loop and producers.
pub struct Dispatcher {
    toolkit: Arc<dyn Toolkit>,
    registry: Arc<HandlerRegistry>,
    render_safe: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        toolkit: Arc<dyn Toolkit>,
        registry: Arc<HandlerRegistry>,
        render_safe: Arc<AtomicBool>,
    ) -> Self {
        Self {
            toolkit,
            registry,
            render_safe,
        }
    }

    /// Look up the current handler for `record` and dispatch to it.
    /// Records whose handler has gone away since they were queued are dropped.
    pub fn dispatch_record(&self, record: EventRecord) -> i32 {
        match self.registry.find(record.window, record.kind()) {
            Some(entry) => self.dispatch(record, &entry),
            None => {
                debug!(
                    "No {} handler left for {}, dropping",
                    record.kind(),
                    record.window
                );
                DISPATCH_UNHANDLED
            }
        }
    }

    /// Invoke `entry` for `record` and apply the per-kind post-processing.
    ///
    /// The record is consumed; any text it carries is released here.
    pub fn dispatch(&self, record: EventRecord, entry: &HandlerEntry) -> i32 {
        let EventRecord { window, event } = record;
        let data = &entry.data;

        match (&event, &entry.handler) {
            (Event::Timer, Handler::Timer(f)) => {
                let retval = f(data);
                if retval == 0 {
                    debug!("Timer {} returned 0, cancelling", window);
                    cancel_timer(self.toolkit.as_ref(), &self.registry, window);
                }
                retval
            }
            (Event::Configure { width, height }, Handler::Configure(f)) => {
                if *width <= 0 || *height <= 0 {
                    return 0;
                }
                f(window, *width, *height, data)
            }
            (Event::KeyPress(key), Handler::KeyPress(f)) => f(window, key, data),
            (Event::ButtonPress(p), Handler::ButtonPress(f))
            | (Event::ButtonRelease(p), Handler::ButtonRelease(f))
            | (Event::Motion(p), Handler::Motion(f)) => f(window, p, data),
            (Event::Delete, Handler::Delete(f)) => {
                let retval = f(window, data);
                if retval < 1 {
                    destroy_window(self.toolkit.as_ref(), &self.registry, window);
                }
                retval
            }
            (Event::Expose(area), Handler::Expose(f)) => {
                if self.render_safe.load(Ordering::Acquire) {
                    self.toolkit.begin_safe_draw(window, area);
                    let retval = f(window, area, data);
                    self.toolkit.finish_safe_draw(window, area);
                    retval
                } else {
                    f(window, area, data)
                }
            }
            (Event::Clicked, Handler::Clicked(f)) | (Event::SetFocus, Handler::SetFocus(f)) => {
                f(window, data)
            }
            (Event::ItemEnter { text, item_data }, Handler::ItemEnter(f)) => {
                f(window, text.as_deref(), data, item_data)
            }
            (
                Event::ItemContext {
                    text,
                    x,
                    y,
                    item_data,
                },
                Handler::ItemContext(f),
            ) => f(window, text.as_deref(), *x, *y, data, item_data),
            (
                Event::TreeSelect {
                    item,
                    text,
                    item_data,
                },
                Handler::TreeSelect(f),
            ) => f(window, *item, text.as_deref(), data, item_data),
            (Event::ListSelect { index }, Handler::ListSelect(f)) => f(window, *index, data),
            (Event::ValueChanged { position }, Handler::ValueChanged(f)) => {
                f(window, *position, data)
            }
            (Event::SwitchPage { page_id }, Handler::SwitchPage(f)) => f(window, *page_id, data),
            (Event::ColumnClick { column }, Handler::ColumnClick(f)) => f(window, *column, data),
            (Event::TreeExpand { item }, Handler::TreeExpand(f)) => f(window, *item, data),
            (
                Event::HtmlResult {
                    status,
                    result,
                    script_data,
                },
                Handler::HtmlResult(f),
            ) => f(window, *status, result.as_deref(), script_data, data),
            (Event::HtmlChanged { status, url }, Handler::HtmlChanged(f)) => {
                f(window, *status, url.as_deref(), data)
            }
            (Event::HtmlMessage { name, message }, Handler::HtmlMessage(f)) => {
                f(window, name.as_deref(), message.as_deref(), data)
            }
            (event, handler) => {
                warn!(
                    "Ignoring {} event for {}: handler {} expects {}",
                    event.kind(),
                    window,
                    entry.id,
                    handler.kind()
                );
                DISPATCH_UNHANDLED
            }
        }
    }

    /// Whether expose events currently go through the backing-bitmap path.
    pub fn render_safe(&self) -> bool {
        self.render_safe.load(Ordering::Acquire)
    }

    /// Default action for a close request nobody handled.
    pub fn unhandled_delete(&self, window: WindowHandle) {
        debug!("Unhandled {} for {}, destroying", EventKind::Delete, window);
        destroy_window(self.toolkit.as_ref(), &self.registry, window);
    }
}

/// Tear down a native window and every handler attached to it.
pub(crate) fn destroy_window(
    toolkit: &dyn Toolkit,
    registry: &HandlerRegistry,
    window: WindowHandle,
) {
    registry.disconnect_by_window(window);
    toolkit.destroy_window(window);
}

/// Stop a timer and drop its handler.
pub(crate) fn cancel_timer(toolkit: &dyn Toolkit, registry: &HandlerRegistry, timer: WindowHandle) {
    registry.disconnect_by_window(timer);
    toolkit.cancel_timer(timer);
}
