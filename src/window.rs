/*
 * The platform-agnostic core of a host window entity: archetype, ownership
 * links, size bounds, and the visibility/state latches. All cross-window
 * links are registry keys (`WindowHandle`), never owning references; the
 * controller's registry is the only owner of entities.
 *
 * Everything here is pure bookkeeping so the ownership state machine can be
 * exercised without a native window. The Win32 side lives in `host_window`.
 */
use std::collections::BTreeSet;

use crate::error::{PlatformError, Result as PlatformResult};
use crate::geometry::{LogicalSize, Point, Size};
use crate::types::{ViewId, WindowArchetype, WindowHandle, WindowState};

/// Show command derived from a window's recorded state when the deferred
/// first show finally happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShowCommand {
    Show,
    ShowMaximized,
    ShowMinimized,
    /// Plain show for windows without a persisted state (popups).
    ShowNormal,
}

/// The flavor of a native resize notification, used to mirror the native
/// state back into the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResizeKind {
    Restored,
    Maximized,
    Minimized,
    Other,
}

/// One native top-level window and its bookkeeping state.
#[derive(Debug)]
pub(crate) struct HostWindow {
    handle: WindowHandle,
    view_id: ViewId,
    archetype: WindowArchetype,
    owner: Option<WindowHandle>,
    owned_windows: BTreeSet<WindowHandle>,
    num_owned_popups: usize,
    min_size: Option<Size>,
    max_size: Option<Size>,
    state: Option<WindowState>,
    pending_show: bool,
    suppress_inactive_frame: bool,
    child_content: WindowHandle,
    offset_from_owner: Point,
}

impl HostWindow {
    pub(crate) fn new(
        view_id: ViewId,
        archetype: WindowArchetype,
        owner: Option<WindowHandle>,
        min_size: Option<Size>,
        max_size: Option<Size>,
        state: Option<WindowState>,
    ) -> Self {
        Self {
            handle: WindowHandle::INVALID,
            view_id,
            archetype,
            owner,
            owned_windows: BTreeSet::new(),
            num_owned_popups: 0,
            min_size,
            max_size,
            state,
            pending_show: true,
            suppress_inactive_frame: false,
            child_content: WindowHandle::INVALID,
            offset_from_owner: Point::new(0, 0),
        }
    }

    pub(crate) fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: WindowHandle) {
        self.handle = handle;
    }

    pub(crate) fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub(crate) fn archetype(&self) -> WindowArchetype {
        self.archetype
    }

    pub(crate) fn owner(&self) -> Option<WindowHandle> {
        self.owner
    }

    pub(crate) fn owned_windows(&self) -> &BTreeSet<WindowHandle> {
        &self.owned_windows
    }

    pub(crate) fn num_owned_popups(&self) -> usize {
        self.num_owned_popups
    }

    pub(crate) fn min_size(&self) -> Option<Size> {
        self.min_size
    }

    pub(crate) fn max_size(&self) -> Option<Size> {
        self.max_size
    }

    pub(crate) fn state(&self) -> Option<WindowState> {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: WindowState) {
        self.state = Some(state);
    }

    pub(crate) fn child_content(&self) -> WindowHandle {
        self.child_content
    }

    pub(crate) fn set_child_content(&mut self, content: WindowHandle) {
        self.child_content = content;
    }

    pub(crate) fn offset_from_owner(&self) -> Point {
        self.offset_from_owner
    }

    pub(crate) fn set_offset_from_owner(&mut self, offset: Point) {
        self.offset_from_owner = offset;
    }

    /// Links a freshly created window into this entity's owned set.
    pub(crate) fn register_owned(&mut self, owned: WindowHandle, archetype: WindowArchetype) {
        self.owned_windows.insert(owned);
        if archetype == WindowArchetype::Popup {
            self.num_owned_popups += 1;
        }
    }

    /// Detaches `owned` from the owned set without touching the popup count.
    /// Used while a popup close is in flight: the set must not report the
    /// popup anymore, but the count keeps the title bar forced active until
    /// the destroy notification lands.
    pub(crate) fn detach_owned(&mut self, owned: WindowHandle) {
        self.owned_windows.remove(&owned);
    }

    /// Final unlink when an owned popup's destroy notification arrives.
    /// Decrements the popup count exactly once; an underflow means the
    /// ownership bookkeeping is broken and is not recoverable.
    pub(crate) fn on_owned_popup_destroyed(&mut self, owned: WindowHandle) {
        self.owned_windows.remove(&owned);
        assert!(
            self.num_owned_popups > 0,
            "owned popup count underflow for window {:?}",
            self.handle
        );
        self.num_owned_popups -= 1;
    }

    pub(crate) fn set_suppress_inactive_frame(&mut self, suppress: bool) {
        self.suppress_inactive_frame = suppress;
    }

    /// Whether the non-client area must be drawn with active colors even
    /// when the system reports the window inactive: true while this window
    /// owns live popups or while one of them is being closed.
    pub(crate) fn forces_active_frame(&self) -> bool {
        self.suppress_inactive_frame || self.num_owned_popups > 0
    }

    /// Consumes the first-show latch. Returns the show command to apply, or
    /// None when the latch was already cleared.
    pub(crate) fn take_pending_show(&mut self) -> Option<ShowCommand> {
        if !self.pending_show {
            return None;
        }
        self.pending_show = false;
        let command = match self.archetype {
            WindowArchetype::Regular => {
                // Regular windows always record a state at construction.
                match self.state.expect("regular window without a state") {
                    WindowState::Restored => ShowCommand::Show,
                    WindowState::Maximized => ShowCommand::ShowMaximized,
                    WindowState::Minimized => ShowCommand::ShowMinimized,
                }
            }
            WindowArchetype::Popup => ShowCommand::ShowNormal,
        };
        Some(command)
    }

    /// Mirrors a native restore/maximize/minimize notification back into the
    /// recorded state so queries keep answering from the entity.
    pub(crate) fn mirror_resize_state(&mut self, kind: ResizeKind) {
        if self.archetype != WindowArchetype::Regular {
            return;
        }
        let mirrored = match kind {
            ResizeKind::Restored => WindowState::Restored,
            ResizeKind::Maximized => WindowState::Maximized,
            ResizeKind::Minimized => WindowState::Minimized,
            ResizeKind::Other => return,
        };
        self.state = Some(mirrored);
    }
}

/// Checks the archetype/owner/positioner combination of a creation request.
pub(crate) fn validate_archetype(
    archetype: WindowArchetype,
    has_owner: bool,
    has_positioner: bool,
) -> PlatformResult<()> {
    match archetype {
        WindowArchetype::Regular => {
            if has_owner {
                return Err(PlatformError::InvalidConfiguration(
                    "a regular window cannot have an owner".to_string(),
                ));
            }
            if has_positioner {
                return Err(PlatformError::InvalidConfiguration(
                    "a regular window cannot have a positioner".to_string(),
                ));
            }
        }
        WindowArchetype::Popup => {
            if !has_owner {
                return Err(PlatformError::InvalidConfiguration(
                    "a popup window must have an owner".to_string(),
                ));
            }
            if !has_positioner {
                return Err(PlatformError::InvalidConfiguration(
                    "a popup window requires a positioner".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Discards non-finite bounds and validates that the minimum does not exceed
/// the maximum component-wise.
pub(crate) fn sanitize_size_bounds(
    min_size: Option<LogicalSize>,
    max_size: Option<LogicalSize>,
) -> PlatformResult<(Option<LogicalSize>, Option<LogicalSize>)> {
    if let (Some(min), Some(max)) = (min_size, max_size)
        && (min.width > max.width || min.height > max.height)
    {
        return Err(PlatformError::InvalidConfiguration(format!(
            "minimum size {}x{} exceeds maximum size {}x{}",
            min.width, min.height, max.width, max.height
        )));
    }

    let finite =
        |size: Option<LogicalSize>| size.filter(|s| s.width.is_finite() && s.height.is_finite());
    Ok((finite(min_size), finite(max_size)))
}
