//! Handler registry.
//!
//! Maps (event kind, window) to the application callback registered for it.
//! Registration is an upsert on (kind, window, callback): connecting the same
//! callback again only replaces its user data.

use crate::toolkit::Toolkit;
use crate::types::{EventKind, ExposeRect, KeyEvent, PointerEvent, UserData, WindowHandle};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub type TimerFn = Arc<dyn Fn(&UserData) -> i32 + Send + Sync>;
pub type ConfigureFn = Arc<dyn Fn(WindowHandle, i32, i32, &UserData) -> i32 + Send + Sync>;
pub type KeyPressFn = Arc<dyn Fn(WindowHandle, &KeyEvent, &UserData) -> i32 + Send + Sync>;
pub type PointerFn = Arc<dyn Fn(WindowHandle, &PointerEvent, &UserData) -> i32 + Send + Sync>;
pub type ExposeFn = Arc<dyn Fn(WindowHandle, &ExposeRect, &UserData) -> i32 + Send + Sync>;
/// Callbacks that only take the window (delete, clicked, set-focus).
pub type WindowFn = Arc<dyn Fn(WindowHandle, &UserData) -> i32 + Send + Sync>;
/// Callbacks taking a single integer (list index, slider position, column).
pub type IntFn = Arc<dyn Fn(WindowHandle, i32, &UserData) -> i32 + Send + Sync>;
/// (window, text, data, item data)
pub type ItemEnterFn =
    Arc<dyn Fn(WindowHandle, Option<&str>, &UserData, &UserData) -> i32 + Send + Sync>;
/// (window, text, x, y, data, item data)
pub type ItemContextFn = Arc<
    dyn Fn(WindowHandle, Option<&str>, i32, i32, &UserData, &UserData) -> i32 + Send + Sync,
>;
/// (window, item, text, data, item data)
pub type TreeSelectFn = Arc<
    dyn Fn(WindowHandle, WindowHandle, Option<&str>, &UserData, &UserData) -> i32 + Send + Sync,
>;
pub type SwitchPageFn = Arc<dyn Fn(WindowHandle, u64, &UserData) -> i32 + Send + Sync>;
pub type TreeExpandFn = Arc<dyn Fn(WindowHandle, WindowHandle, &UserData) -> i32 + Send + Sync>;
/// (window, status, result, script data, data)
pub type HtmlResultFn =
    Arc<dyn Fn(WindowHandle, i32, Option<&str>, &UserData, &UserData) -> i32 + Send + Sync>;
/// (window, status, url, data)
pub type HtmlChangedFn =
    Arc<dyn Fn(WindowHandle, i32, Option<&str>, &UserData) -> i32 + Send + Sync>;
/// (window, name, message, data)
pub type HtmlMessageFn =
    Arc<dyn Fn(WindowHandle, Option<&str>, Option<&str>, &UserData) -> i32 + Send + Sync>;

/// Called with (window, data) when a handler is disconnected.
pub type DisconnectFn = Arc<dyn Fn(WindowHandle, &UserData) + Send + Sync>;

/// A typed application callback, one variant per event kind.
#[derive(Clone)]
pub enum Handler {
    Timer(TimerFn),
    Configure(ConfigureFn),
    KeyPress(KeyPressFn),
    ButtonPress(PointerFn),
    ButtonRelease(PointerFn),
    Motion(PointerFn),
    Delete(WindowFn),
    Expose(ExposeFn),
    Clicked(WindowFn),
    ItemEnter(ItemEnterFn),
    ItemContext(ItemContextFn),
    TreeSelect(TreeSelectFn),
    ListSelect(IntFn),
    SetFocus(WindowFn),
    ValueChanged(IntFn),
    SwitchPage(SwitchPageFn),
    ColumnClick(IntFn),
    TreeExpand(TreeExpandFn),
    HtmlResult(HtmlResultFn),
    HtmlChanged(HtmlChangedFn),
    HtmlMessage(HtmlMessageFn),
}

impl Handler {
    pub fn timer<F>(f: F) -> Self
    where
        F: Fn(&UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::Timer(Arc::new(f))
    }

    pub fn configure<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, i32, i32, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::Configure(Arc::new(f))
    }

    pub fn key_press<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &KeyEvent, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::KeyPress(Arc::new(f))
    }

    pub fn button_press<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &PointerEvent, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::ButtonPress(Arc::new(f))
    }

    pub fn button_release<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &PointerEvent, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::ButtonRelease(Arc::new(f))
    }

    pub fn motion<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &PointerEvent, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::Motion(Arc::new(f))
    }

    pub fn delete<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::Delete(Arc::new(f))
    }

    pub fn expose<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &ExposeRect, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::Expose(Arc::new(f))
    }

    pub fn clicked<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::Clicked(Arc::new(f))
    }

    pub fn item_enter<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, Option<&str>, &UserData, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::ItemEnter(Arc::new(f))
    }

    pub fn item_context<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, Option<&str>, i32, i32, &UserData, &UserData) -> i32
            + Send
            + Sync
            + 'static,
    {
        Handler::ItemContext(Arc::new(f))
    }

    pub fn tree_select<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, WindowHandle, Option<&str>, &UserData, &UserData) -> i32
            + Send
            + Sync
            + 'static,
    {
        Handler::TreeSelect(Arc::new(f))
    }

    pub fn list_select<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, i32, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::ListSelect(Arc::new(f))
    }

    pub fn set_focus<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::SetFocus(Arc::new(f))
    }

    pub fn value_changed<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, i32, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::ValueChanged(Arc::new(f))
    }

    pub fn switch_page<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, u64, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::SwitchPage(Arc::new(f))
    }

    pub fn column_click<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, i32, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::ColumnClick(Arc::new(f))
    }

    pub fn tree_expand<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, WindowHandle, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::TreeExpand(Arc::new(f))
    }

    pub fn html_result<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, i32, Option<&str>, &UserData, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::HtmlResult(Arc::new(f))
    }

    pub fn html_changed<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, i32, Option<&str>, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::HtmlChanged(Arc::new(f))
    }

    pub fn html_message<F>(f: F) -> Self
    where
        F: Fn(WindowHandle, Option<&str>, Option<&str>, &UserData) -> i32 + Send + Sync + 'static,
    {
        Handler::HtmlMessage(Arc::new(f))
    }

    /// The event kind this callback accepts.
    pub fn kind(&self) -> EventKind {
        match self {
            Handler::Timer(_) => EventKind::Timer,
            Handler::Configure(_) => EventKind::Configure,
            Handler::KeyPress(_) => EventKind::KeyPress,
            Handler::ButtonPress(_) => EventKind::ButtonPress,
            Handler::ButtonRelease(_) => EventKind::ButtonRelease,
            Handler::Motion(_) => EventKind::Motion,
            Handler::Delete(_) => EventKind::Delete,
            Handler::Expose(_) => EventKind::Expose,
            Handler::Clicked(_) => EventKind::Clicked,
            Handler::ItemEnter(_) => EventKind::ItemEnter,
            Handler::ItemContext(_) => EventKind::ItemContext,
            Handler::TreeSelect(_) => EventKind::TreeSelect,
            Handler::ListSelect(_) => EventKind::ListSelect,
            Handler::SetFocus(_) => EventKind::SetFocus,
            Handler::ValueChanged(_) => EventKind::ValueChanged,
            Handler::SwitchPage(_) => EventKind::SwitchPage,
            Handler::ColumnClick(_) => EventKind::ColumnClick,
            Handler::TreeExpand(_) => EventKind::TreeExpand,
            Handler::HtmlResult(_) => EventKind::HtmlResult,
            Handler::HtmlChanged(_) => EventKind::HtmlChanged,
            Handler::HtmlMessage(_) => EventKind::HtmlMessage,
        }
    }

    /// Address of the callback allocation; this is the callback's identity.
    fn callback_addr(&self) -> *const () {
        match self {
            Handler::Timer(f) => addr(f),
            Handler::Configure(f) => addr(f),
            Handler::KeyPress(f) => addr(f),
            Handler::ButtonPress(f) | Handler::ButtonRelease(f) | Handler::Motion(f) => addr(f),
            Handler::Delete(f) | Handler::Clicked(f) | Handler::SetFocus(f) => addr(f),
            Handler::Expose(f) => addr(f),
            Handler::ItemEnter(f) => addr(f),
            Handler::ItemContext(f) => addr(f),
            Handler::TreeSelect(f) => addr(f),
            Handler::ListSelect(f) | Handler::ValueChanged(f) | Handler::ColumnClick(f) => addr(f),
            Handler::SwitchPage(f) => addr(f),
            Handler::TreeExpand(f) => addr(f),
            Handler::HtmlResult(f) => addr(f),
            Handler::HtmlChanged(f) => addr(f),
            Handler::HtmlMessage(f) => addr(f),
        }
    }

    /// True if both are the same callback registered for the same kind.
    pub fn same_callback(&self, other: &Handler) -> bool {
        self.kind() == other.kind() && self.callback_addr() == other.callback_addr()
    }
}

#[inline]
fn addr<T: ?Sized>(f: &Arc<T>) -> *const () {
    Arc::as_ptr(f).cast::<()>()
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler::{:?}({:p})", self.kind(), self.callback_addr())
    }
}

/// One registered callback.
#[derive(Clone)]
pub struct HandlerEntry {
    pub id: u64,
    pub kind: EventKind,
    pub window: WindowHandle,
    pub handler: Handler,
    pub disconnect: Option<DisconnectFn>,
    pub data: UserData,
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("window", &self.window)
            .field("handler", &self.handler)
            .field("has_disconnect", &self.disconnect.is_some())
            .field("data", &self.data)
            .finish()
    }
}

/// All registered handlers, grouped by kind.
///
/// Lookups from producer threads take the read side of the lock;
/// registration and removal take the write side. Disconnect callbacks run
/// after the lock is released.
pub struct HandlerRegistry {
    toolkit: Arc<dyn Toolkit>,
    next_id: AtomicU64,
    entries: RwLock<HashMap<EventKind, Vec<HandlerEntry>>>,
}

impl HandlerRegistry {
    pub fn new(toolkit: Arc<dyn Toolkit>) -> Self {
        Self {
            toolkit,
            next_id: AtomicU64::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register `handler` for `window`, or update the data of an identical
    /// registration. Returns the entry id, or None if the lock is poisoned.
    pub fn connect(
        &self,
        window: WindowHandle,
        handler: Handler,
        disconnect: Option<DisconnectFn>,
        data: UserData,
    ) -> Option<u64> {
        let kind = handler.kind();
        let mut guard = self.entries.write().ok()?;
        let list = guard.entry(kind).or_default();

        if let Some(existing) = list.iter_mut().find(|e| {
            self.toolkit.same_window(e.window, window) && e.handler.same_callback(&handler)
        }) {
            debug!("Updating {} handler {} for {}", kind, existing.id, window);
            existing.data = data;
            return Some(existing.id);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("Connecting {} handler {} for {}", kind, id, window);
        list.push(HandlerEntry {
            id,
            kind,
            window,
            handler,
            disconnect,
            data,
        });
        Some(id)
    }

    /// First handler registered for (window, kind).
    pub fn find(&self, window: WindowHandle, kind: EventKind) -> Option<HandlerEntry> {
        let guard = self.entries.read().ok()?;
        guard
            .get(&kind)?
            .iter()
            .find(|e| self.toolkit.same_window(e.window, window))
            .cloned()
    }

    /// Remove every handler of `kind` on `window`.
    pub fn disconnect_by_name(&self, window: WindowHandle, kind: EventKind) -> usize {
        self.remove_where(|e| e.kind == kind && self.toolkit.same_window(e.window, window))
    }

    /// Remove every handler on `window`.
    pub fn disconnect_by_window(&self, window: WindowHandle) -> usize {
        self.remove_where(|e| self.toolkit.same_window(e.window, window))
    }

    /// Remove every handler on `window` whose data is `data`.
    pub fn disconnect_by_data(&self, window: WindowHandle, data: &UserData) -> usize {
        self.remove_where(|e| self.toolkit.same_window(e.window, window) && e.data.same_as(data))
    }

    fn remove_where(&self, pred: impl Fn(&HandlerEntry) -> bool) -> usize {
        let mut removed = Vec::new();
        if let Ok(mut guard) = self.entries.write() {
            for list in guard.values_mut() {
                let mut i = 0;
                while i < list.len() {
                    if pred(&list[i]) {
                        removed.push(list.remove(i));
                    } else {
                        i += 1;
                    }
                }
            }
            guard.retain(|_, list| !list.is_empty());
        }

        for entry in &removed {
            debug!(
                "Disconnected {} handler {} for {}",
                entry.kind, entry.id, entry.window
            );
            if let Some(disconnect) = &entry.disconnect {
                disconnect(entry.window, &entry.data);
            }
        }

        removed.len()
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|guard| guard.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handlers registered for (window, kind).
    pub fn count(&self, window: WindowHandle, kind: EventKind) -> usize {
        self.entries
            .read()
            .ok()
            .and_then(|guard| {
                guard.get(&kind).map(|list| {
                    list.iter()
                        .filter(|e| self.toolkit.same_window(e.window, window))
                        .count()
                })
            })
            .unwrap_or(0)
    }
}
