use crate::types::{ExposeRect, WindowHandle};
use std::time::Duration;

/// Trait that all native toolkit backends must implement.
/// This is everything the engine needs from the host toolkit; widget
/// construction and drawing stay on the toolkit side.
pub trait Toolkit: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// True if both handles refer to the same native object.
    /// Hosts whose handles are wrapped references must override this.
    fn same_window(&self, a: WindowHandle, b: WindowHandle) -> bool {
        a == b
    }

    /// Destroy a native window.
    fn destroy_window(&self, window: WindowHandle);

    /// Start a recurring native timer and return its handle.
    fn start_timer(&self, interval: Duration) -> WindowHandle;

    /// Stop a native timer.
    fn cancel_timer(&self, timer: WindowHandle);

    /// Create the backing bitmap for a render-safe draw.
    fn begin_safe_draw(&self, window: WindowHandle, area: &ExposeRect);

    /// Flush a render-safe draw to the screen.
    fn finish_safe_draw(&self, window: WindowHandle, area: &ExposeRect);

    /// Run the toolkit's own event pump for `duration`.
    /// Used when the main loop is entered from a thread other than the UI thread.
    fn pump_for(&self, duration: Duration);
}

