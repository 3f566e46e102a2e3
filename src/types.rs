/*
 * Platform-agnostic identifiers, window classification enums, and the
 * request/result structures exchanged with the embedding application. These
 * types compile on every platform so application logic (and tests) that only
 * manipulates them never needs the Win32 toolchain.
 */
use crate::geometry::LogicalSize;
use crate::positioner::WindowPositioner;

/// Identifies the content view hosted by a window. Allocated by the
/// controller when a window is created and stable until the window is
/// destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub i64);

impl ViewId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> i64 {
        self.0
    }
}

/// Identity of a native top-level window, usable as a registry key. This is
/// the integer value of the native handle; it never owns the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub(crate) isize);

impl WindowHandle {
    pub(crate) const INVALID: WindowHandle = WindowHandle(0);

    pub(crate) const fn is_invalid(&self) -> bool {
        self.0 == 0
    }
}

/// Fixed role of a window, decided at creation and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowArchetype {
    /// Independent top-level window.
    Regular,
    /// Transient window owned by another window and placed relative to it.
    Popup,
}

/// The show state of a regular window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Restored,
    Maximized,
    Minimized,
}

/// Parameters for creating a host window.
#[derive(Debug, Clone)]
pub struct WindowCreationSettings {
    pub archetype: WindowArchetype,
    /// Requested size of the client area, in logical coordinates.
    pub size: LogicalSize,
    /// Optional client-area size bounds, in logical coordinates. Non-finite
    /// components are treated as "no bound".
    pub min_size: Option<LogicalSize>,
    pub max_size: Option<LogicalSize>,
    pub title: Option<String>,
    /// Initial state; meaningful for regular windows only.
    pub state: Option<WindowState>,
    /// View of the owning window. Required for popups, forbidden for regular
    /// windows.
    pub owner: Option<ViewId>,
    /// Placement rule relative to the owner. Required for popups, forbidden
    /// for regular windows.
    pub positioner: Option<WindowPositioner>,
}

impl Default for WindowCreationSettings {
    fn default() -> Self {
        Self {
            archetype: WindowArchetype::Regular,
            size: LogicalSize::new(800.0, 600.0),
            min_size: None,
            max_size: None,
            title: None,
            state: None,
            owner: None,
            positioner: None,
        }
    }
}

/// Parameters for modifying an existing window. Unset fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct WindowModificationSettings {
    pub size: Option<LogicalSize>,
    pub title: Option<String>,
    pub state: Option<WindowState>,
}

/// Result of a successful window creation.
#[derive(Debug, Clone)]
pub struct WindowMetadata {
    pub view_id: ViewId,
    pub archetype: WindowArchetype,
    /// Client-area size actually requested, in logical coordinates.
    pub size: LogicalSize,
    /// View of the owner, when the window is owned.
    pub parent_id: Option<ViewId>,
    /// Initial state, for regular windows.
    pub state: Option<WindowState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_creation_settings_describe_a_plain_regular_window() {
        let settings = WindowCreationSettings::default();
        assert_eq!(settings.archetype, WindowArchetype::Regular);
        assert!(settings.owner.is_none());
        assert!(settings.positioner.is_none());
        assert!(settings.state.is_none());
    }

    #[test]
    fn window_handle_invalid_is_zero() {
        assert!(WindowHandle::INVALID.is_invalid());
        assert!(!WindowHandle(0x1234).is_invalid());
    }
}
