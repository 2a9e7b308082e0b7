//! Core types shared by the queue, registry and dispatcher.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque handle to a native window, widget, tree item or timer.
///
/// Two handles that compare unequal may still refer to the same native
/// object; use [`crate::Toolkit::same_window`] for identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Opaque application value attached to a handler or carried by an event.
///
/// Compared by allocation identity, never by value.
#[derive(Clone, Default)]
pub struct UserData(Option<Arc<dyn Any + Send + Sync>>);

impl UserData {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(Some(value))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    /// True if both refer to the same allocation (or are both empty).
    pub fn same_as(&self, other: &UserData) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "UserData({:p})", Arc::as_ptr(v)),
            None => write!(f, "UserData(None)"),
        }
    }
}

/// Signal kinds understood by the engine.
///
/// The discriminants are the integer codes native hosts use on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventKind {
    Timer = 0,
    Configure = 1,
    KeyPress = 2,
    ButtonPress = 3,
    ButtonRelease = 4,
    Motion = 5,
    Delete = 6,
    Expose = 7,
    Clicked = 8,
    ItemEnter = 9,
    ItemContext = 10,
    TreeSelect = 11,
    ListSelect = 12,
    SetFocus = 13,
    ValueChanged = 14,
    SwitchPage = 15,
    ColumnClick = 16,
    TreeExpand = 17,
    HtmlResult = 18,
    HtmlChanged = 19,
    HtmlMessage = 20,
}

/// Signal names accepted by `connect`, matched case-insensitively.
/// The first name listed for a kind is its canonical name.
const SIGNAL_NAMES: &[(&str, EventKind)] = &[
    ("timer", EventKind::Timer),
    ("configure_event", EventKind::Configure),
    ("configure", EventKind::Configure),
    ("key_press_event", EventKind::KeyPress),
    ("key-press", EventKind::KeyPress),
    ("button_press_event", EventKind::ButtonPress),
    ("button-press", EventKind::ButtonPress),
    ("button_release_event", EventKind::ButtonRelease),
    ("button-release", EventKind::ButtonRelease),
    ("motion_notify_event", EventKind::Motion),
    ("motion", EventKind::Motion),
    ("delete_event", EventKind::Delete),
    ("delete", EventKind::Delete),
    ("expose_event", EventKind::Expose),
    ("expose", EventKind::Expose),
    ("clicked", EventKind::Clicked),
    ("container-select", EventKind::ItemEnter),
    ("container-context", EventKind::ItemContext),
    ("tree-select", EventKind::TreeSelect),
    ("item-select", EventKind::ListSelect),
    ("set-focus", EventKind::SetFocus),
    ("value_changed", EventKind::ValueChanged),
    ("switch-page", EventKind::SwitchPage),
    ("click-column", EventKind::ColumnClick),
    ("tree-expand", EventKind::TreeExpand),
    ("html-result", EventKind::HtmlResult),
    ("html-changed", EventKind::HtmlChanged),
    ("html-message", EventKind::HtmlMessage),
];

impl EventKind {
    pub const ALL: [EventKind; 21] = [
        EventKind::Timer,
        EventKind::Configure,
        EventKind::KeyPress,
        EventKind::ButtonPress,
        EventKind::ButtonRelease,
        EventKind::Motion,
        EventKind::Delete,
        EventKind::Expose,
        EventKind::Clicked,
        EventKind::ItemEnter,
        EventKind::ItemContext,
        EventKind::TreeSelect,
        EventKind::ListSelect,
        EventKind::SetFocus,
        EventKind::ValueChanged,
        EventKind::SwitchPage,
        EventKind::ColumnClick,
        EventKind::TreeExpand,
        EventKind::HtmlResult,
        EventKind::HtmlChanged,
        EventKind::HtmlMessage,
    ];

    /// Look up a kind by signal name (case-insensitive).
    pub fn from_name(name: &str) -> Option<EventKind> {
        SIGNAL_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    /// Look up a kind by its wire code.
    pub fn from_code(code: i32) -> Option<EventKind> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Canonical signal name.
    pub fn name(self) -> &'static str {
        SIGNAL_NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key press payload.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct KeyEvent {
    /// Character produced by the key, `'\0'` if none.
    pub ch: char,
    /// Virtual key code.
    pub vk: i32,
    /// Modifier state mask.
    pub state: i32,
    /// UTF-8 text produced by the key press.
    pub utf8: String,
}

/// Button press/release and motion payload.
/// For motion events `button` holds the held-button mask.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PointerEvent {
    pub x: i32,
    pub y: i32,
    pub button: i32,
}

/// Area to redraw.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ExposeRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A native event with typed fields, one variant per [`EventKind`].
#[derive(Clone, Debug)]
pub enum Event {
    Timer,
    Configure {
        width: i32,
        height: i32,
    },
    KeyPress(KeyEvent),
    ButtonPress(PointerEvent),
    ButtonRelease(PointerEvent),
    Motion(PointerEvent),
    Delete,
    Expose(ExposeRect),
    Clicked,
    ItemEnter {
        text: Option<String>,
        item_data: UserData,
    },
    ItemContext {
        text: Option<String>,
        x: i32,
        y: i32,
        item_data: UserData,
    },
    TreeSelect {
        item: WindowHandle,
        text: Option<String>,
        item_data: UserData,
    },
    ListSelect {
        index: i32,
    },
    SetFocus,
    ValueChanged {
        position: i32,
    },
    SwitchPage {
        page_id: u64,
    },
    ColumnClick {
        column: i32,
    },
    TreeExpand {
        item: WindowHandle,
    },
    HtmlResult {
        status: i32,
        result: Option<String>,
        script_data: UserData,
    },
    HtmlChanged {
        status: i32,
        url: Option<String>,
    },
    HtmlMessage {
        name: Option<String>,
        message: Option<String>,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Timer => EventKind::Timer,
            Event::Configure { .. } => EventKind::Configure,
            Event::KeyPress(_) => EventKind::KeyPress,
            Event::ButtonPress(_) => EventKind::ButtonPress,
            Event::ButtonRelease(_) => EventKind::ButtonRelease,
            Event::Motion(_) => EventKind::Motion,
            Event::Delete => EventKind::Delete,
            Event::Expose(_) => EventKind::Expose,
            Event::Clicked => EventKind::Clicked,
            Event::ItemEnter { .. } => EventKind::ItemEnter,
            Event::ItemContext { .. } => EventKind::ItemContext,
            Event::TreeSelect { .. } => EventKind::TreeSelect,
            Event::ListSelect { .. } => EventKind::ListSelect,
            Event::SetFocus => EventKind::SetFocus,
            Event::ValueChanged { .. } => EventKind::ValueChanged,
            Event::SwitchPage { .. } => EventKind::SwitchPage,
            Event::ColumnClick { .. } => EventKind::ColumnClick,
            Event::TreeExpand { .. } => EventKind::TreeExpand,
            Event::HtmlResult { .. } => EventKind::HtmlResult,
            Event::HtmlChanged { .. } => EventKind::HtmlChanged,
            Event::HtmlMessage { .. } => EventKind::HtmlMessage,
        }
    }

    /// Build a typed event from the generic slots a native host delivers.
    /// Returns `None` for codes the engine does not know.
    pub fn decode(code: i32, raw: RawParams) -> Option<Event> {
        let RawParams {
            item,
            item_data,
            text: [text1, text2],
            ints: [a, b, c, d],
        } = raw;
        let item = WindowHandle(item);

        let event = match EventKind::from_code(code)? {
            EventKind::Timer => Event::Timer,
            EventKind::Configure => Event::Configure {
                width: a as i32,
                height: b as i32,
            },
            EventKind::KeyPress => Event::KeyPress(KeyEvent {
                ch: u32::try_from(a).ok().and_then(char::from_u32).unwrap_or('\0'),
                vk: b as i32,
                state: c as i32,
                utf8: text1.unwrap_or_default(),
            }),
            EventKind::ButtonPress => Event::ButtonPress(pointer(a, b, c)),
            EventKind::ButtonRelease => Event::ButtonRelease(pointer(a, b, c)),
            EventKind::Motion => Event::Motion(pointer(a, b, c)),
            EventKind::Delete => Event::Delete,
            EventKind::Expose => Event::Expose(ExposeRect {
                x: a as i32,
                y: b as i32,
                width: c as i32,
                height: d as i32,
            }),
            EventKind::Clicked => Event::Clicked,
            EventKind::ItemEnter => Event::ItemEnter {
                text: text1,
                item_data,
            },
            EventKind::ItemContext => Event::ItemContext {
                text: text1,
                x: a as i32,
                y: b as i32,
                item_data,
            },
            EventKind::TreeSelect => Event::TreeSelect {
                item,
                text: text1,
                item_data,
            },
            EventKind::ListSelect => Event::ListSelect { index: a as i32 },
            EventKind::SetFocus => Event::SetFocus,
            EventKind::ValueChanged => Event::ValueChanged { position: a as i32 },
            EventKind::SwitchPage => Event::SwitchPage { page_id: a as u64 },
            EventKind::ColumnClick => Event::ColumnClick { column: a as i32 },
            EventKind::TreeExpand => Event::TreeExpand { item },
            EventKind::HtmlResult => Event::HtmlResult {
                status: a as i32,
                result: text1,
                script_data: item_data,
            },
            EventKind::HtmlChanged => Event::HtmlChanged {
                status: a as i32,
                url: text1,
            },
            EventKind::HtmlMessage => Event::HtmlMessage {
                name: text1,
                message: text2,
            },
        };

        Some(event)
    }
}

#[inline]
fn pointer(x: i64, y: i64, button: i64) -> PointerEvent {
    PointerEvent {
        x: x as i32,
        y: y as i32,
        button: button as i32,
    }
}

/// Generic argument slots as delivered by a native callback.
#[derive(Clone, Debug, Default)]
pub struct RawParams {
    /// Secondary object handle (tree item).
    pub item: u64,
    /// Secondary user value (item data, script data).
    pub item_data: UserData,
    pub text: [Option<String>; 2],
    pub ints: [i64; 4],
}

/// What travels through a queue: the target window and its event.
/// The handler is resolved again on the UI thread at dispatch time.
#[derive(Clone, Debug)]
pub struct EventRecord {
    pub window: WindowHandle,
    pub event: Event,
}

impl EventRecord {
    pub fn new(window: WindowHandle, event: Event) -> Self {
        Self { window, event }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
