/*
 * The window controller: process-wide registry of host window entities,
 * keyed by native handle, plus the bridge that forwards native messages to
 * the embedding application. The registry is the sole owner of every
 * entity; everything else refers to windows through handles or view ids.
 *
 * Everything runs on the thread that owns the native message pump. The
 * forwarding callback executes synchronously and may re-enter the
 * controller (create or destroy windows before returning), so no registry
 * borrow is ever held while it runs.
 */
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    DestroyWindow, GetClientRect, GetWindowInfo, GetWindowPlacement, SW_MAXIMIZE, SW_MINIMIZE,
    SW_RESTORE, SW_SHOW, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOZORDER, SetWindowPlacement,
    SetWindowPos, SetWindowTextW, ShowWindow, WINDOWINFO, WINDOWPLACEMENT, WM_NCDESTROY,
};
use windows::core::HSTRING;

use crate::dispatch::MessageDispatcher;
use crate::dpi;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::geometry::{LogicalPoint, LogicalSize};
use crate::host_window::{self, classify_message};
use crate::types::{
    ViewId, WindowCreationSettings, WindowHandle, WindowMetadata, WindowModificationSettings,
    WindowState,
};
use crate::window::HostWindow;

/// Structured message handed to the embedding application. The handler may
/// fill in `result` and set `handled` before returning; a handled message's
/// result is returned to the native message pump verbatim.
#[derive(Debug)]
pub struct HostMessage {
    pub view_id: ViewId,
    pub hwnd: HWND,
    pub message: u32,
    pub wparam: WPARAM,
    pub lparam: LPARAM,
    pub result: LRESULT,
    pub handled: bool,
}

/*
 * Shared controller state. Reached from the public `HostWindowController`
 * handle and, through the per-window creation context, from the window
 * procedure.
 */
pub(crate) struct ControllerState {
    windows: RefCell<HashMap<WindowHandle, HostWindow>>,
    views: RefCell<HashMap<ViewId, WindowHandle>>,
    dispatcher: MessageDispatcher<HostMessage>,
    next_view_id: Cell<i64>,
}

impl ControllerState {
    pub(crate) fn new() -> Self {
        Self {
            windows: RefCell::new(HashMap::new()),
            views: RefCell::new(HashMap::new()),
            dispatcher: MessageDispatcher::new(),
            next_view_id: Cell::new(1),
        }
    }

    pub(crate) fn windows(&self) -> Ref<'_, HashMap<WindowHandle, HostWindow>> {
        self.windows.borrow()
    }

    pub(crate) fn windows_mut(&self) -> RefMut<'_, HashMap<WindowHandle, HostWindow>> {
        self.windows.borrow_mut()
    }

    /// Handle of the live window hosting `view_id`, if any.
    pub(crate) fn handle_for_view(&self, view_id: ViewId) -> Option<WindowHandle> {
        self.views
            .borrow()
            .get(&view_id)
            .copied()
            .filter(|handle| !handle.is_invalid())
    }

    /// Whether the view id is known at all, including a window still being
    /// created.
    fn view_known(&self, view_id: ViewId) -> bool {
        self.views.borrow().contains_key(&view_id)
    }

    fn allocate_view_id(&self) -> ViewId {
        let id = self.next_view_id.get();
        self.next_view_id.set(id + 1);
        ViewId::new(id)
    }

    /*
     * Single entry point for every native message of every host window.
     * Order matters: final-teardown bookkeeping first (so re-entrant
     * lookups see the window as gone), then forwarding to the application,
     * then the entity's own state machine for anything left unhandled.
     */
    pub(crate) fn handle_message(
        &self,
        hwnd: HWND,
        context_view: ViewId,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> Option<LRESULT> {
        let key = WindowHandle::from_hwnd(hwnd);

        let removed = if msg == WM_NCDESTROY {
            let removed = self.windows.borrow_mut().remove(&key);
            if let Some(entity) = removed.as_ref() {
                self.views.borrow_mut().remove(&entity.view_id());
                log::debug!(
                    "Platform: window {key:?} unregistered (view {:?}).",
                    entity.view_id()
                );
            }
            removed
        } else {
            None
        };

        let view_id = removed
            .as_ref()
            .map(|entity| entity.view_id())
            .or_else(|| self.windows.borrow().get(&key).map(|w| w.view_id()))
            .or_else(|| self.view_known(context_view).then_some(context_view));
        let Some(view_id) = view_id else {
            log::warn!("Platform: dropping message {msg:#06x} for {hwnd:?}: no associated view.");
            return None;
        };

        let outgoing = HostMessage {
            view_id,
            hwnd,
            message: msg,
            wparam,
            lparam,
            result: LRESULT(0),
            handled: false,
        };
        if let Some(answered) = self.dispatcher.dispatch(outgoing)
            && answered.handled
        {
            return Some(answered.result);
        }

        host_window::handle_window_event(self, hwnd, classify_message(msg, wparam, lparam))
    }
}

/// Owns the registry of host windows and exposes the embedding API: window
/// creation and modification, the message-forwarding callback, and engine
/// shutdown.
pub struct HostWindowController {
    state: Rc<ControllerState>,
}

impl HostWindowController {
    /// Registers the native window classes and sets up an empty registry.
    pub fn new() -> PlatformResult<Self> {
        host_window::register_window_classes()?;
        Ok(Self {
            state: Rc::new(ControllerState::new()),
        })
    }

    /// Installs the message-forwarding callback. Messages that arrived
    /// before this call are replayed to the callback in their original
    /// order; everything after is forwarded immediately. Only the first
    /// call has any effect.
    pub fn initialize(&self, handler: impl Fn(&mut HostMessage) + 'static) {
        if !self.state.dispatcher.initialize(Rc::new(handler)) {
            log::warn!("Platform: initialize called more than once; keeping the first callback.");
        }
    }

    /// Creates a host window (and its content surface) from `settings`.
    pub fn create_window(
        &self,
        settings: &WindowCreationSettings,
    ) -> PlatformResult<WindowMetadata> {
        let view_id = self.state.allocate_view_id();
        // Messages arriving while the native window is still inside
        // CreateWindowExW resolve their view through this placeholder.
        self.state
            .views
            .borrow_mut()
            .insert(view_id, WindowHandle::INVALID);

        match host_window::create_host_window(&self.state, view_id, settings) {
            Ok(entity) => {
                let key = entity.handle();
                let metadata = WindowMetadata {
                    view_id,
                    archetype: settings.archetype,
                    size: settings.size,
                    parent_id: settings.owner,
                    state: entity.state(),
                };
                self.state.views.borrow_mut().insert(view_id, key);
                self.state.windows.borrow_mut().insert(key, entity);
                Ok(metadata)
            }
            Err(err) => {
                self.state.views.borrow_mut().remove(&view_id);
                log::error!("Platform: window creation failed: {err}");
                Err(err)
            }
        }
    }

    /// Requests native destruction of the window hosting `view_id`. The
    /// destroy notifications re-enter the controller and unregister the
    /// entity.
    pub fn destroy_window(&self, view_id: ViewId) -> PlatformResult<()> {
        let hwnd = self.require_window(view_id)?;
        unsafe { DestroyWindow(hwnd) }
            .map_err(|err| PlatformError::OperationFailed(err.to_string()))
    }

    /// Shows the window. The first show applies the state recorded at
    /// creation.
    pub fn show_window(&self, view_id: ViewId) -> PlatformResult<()> {
        let hwnd = self.require_window(view_id)?;
        unsafe {
            _ = ShowWindow(hwnd, SW_SHOW);
        }
        Ok(())
    }

    /// Applies the requested size/title/state changes to a live window.
    pub fn modify_window(
        &self,
        view_id: ViewId,
        settings: &WindowModificationSettings,
    ) -> PlatformResult<()> {
        let hwnd = self.require_window(view_id)?;
        if let Some(size) = settings.size {
            self.set_client_size(hwnd, size)?;
        }
        if let Some(title) = &settings.title {
            unsafe { SetWindowTextW(hwnd, &HSTRING::from(title.as_str())) }
                .map_err(|err| PlatformError::OperationFailed(err.to_string()))?;
        }
        if let Some(state) = settings.state {
            self.set_window_state(hwnd, state);
        }
        Ok(())
    }

    /// Closes every popup owned by the window hosting `view_id`; returns
    /// how far its popup count dropped during the call.
    pub fn close_owned_popups(&self, view_id: ViewId) -> usize {
        match self.state.handle_for_view(view_id) {
            Some(key) => host_window::close_owned_popups(&self.state, key),
            None => 0,
        }
    }

    /// The recorded state of a regular window; None for popups and unknown
    /// views.
    pub fn window_state(&self, view_id: ViewId) -> Option<WindowState> {
        let key = self.state.handle_for_view(view_id)?;
        self.state.windows().get(&key).and_then(HostWindow::state)
    }

    /// Current client-area size in logical coordinates.
    pub fn logical_client_size(&self, view_id: ViewId) -> Option<LogicalSize> {
        let hwnd = self.window_handle_for_view(view_id)?;
        let mut client = RECT::default();
        unsafe {
            _ = GetClientRect(hwnd, &mut client);
        }
        let scale = dpi::scale_factor_for_dpi(dpi::dpi_for_window(Some(hwnd)));
        Some(LogicalSize::new(
            client.right as f64 / scale,
            client.bottom as f64 / scale,
        ))
    }

    /// Offset of an owned window from its owner, in the owner's logical
    /// coordinates.
    pub fn relative_position(&self, view_id: ViewId) -> Option<LogicalPoint> {
        let key = self.state.handle_for_view(view_id)?;
        let (owner, offset) = {
            let windows = self.state.windows();
            let window = windows.get(&key)?;
            (window.owner()?, window.offset_from_owner())
        };
        let scale = dpi::scale_factor_for_dpi(dpi::dpi_for_window(Some(owner.as_hwnd())));
        Some(LogicalPoint::new(
            offset.x as f64 / scale,
            offset.y as f64 / scale,
        ))
    }

    /// Native handle of the window hosting `view_id`.
    pub fn window_handle_for_view(&self, view_id: ViewId) -> Option<HWND> {
        self.state.handle_for_view(view_id).map(WindowHandle::as_hwnd)
    }

    /// Tears down every live window and stops forwarding messages. Each
    /// destruction re-enters the message handler and self-unregisters, so
    /// the registry is only iterated through a snapshot of handles.
    pub fn shutdown(&self) {
        self.state.dispatcher.close();
        let handles: Vec<WindowHandle> = self.state.windows().keys().copied().collect();
        if !handles.is_empty() {
            log::debug!("Platform: shutdown; destroying {} window(s).", handles.len());
        }
        for handle in handles {
            if let Err(err) = unsafe { DestroyWindow(handle.as_hwnd()) } {
                log::debug!("Platform: DestroyWindow failed for {handle:?}: {err:?}");
            }
        }
    }

    fn require_window(&self, view_id: ViewId) -> PlatformResult<HWND> {
        self.window_handle_for_view(view_id).ok_or_else(|| {
            PlatformError::InvalidHandle(format!("no live window for view {view_id:?}"))
        })
    }

    fn set_client_size(&self, hwnd: HWND, size: LogicalSize) -> PlatformResult<()> {
        let mut info = WINDOWINFO {
            cbSize: std::mem::size_of::<WINDOWINFO>() as u32,
            ..Default::default()
        };
        unsafe { GetWindowInfo(hwnd, &mut info) }?;
        let window_size = dpi::window_size_for_client_size(
            size,
            None,
            None,
            info.dwStyle,
            info.dwExStyle,
            Some(hwnd),
        )?;
        unsafe {
            SetWindowPos(
                hwnd,
                None,
                0,
                0,
                window_size.width,
                window_size.height,
                SWP_NOMOVE | SWP_NOZORDER | SWP_NOACTIVATE,
            )
        }?;
        Ok(())
    }

    fn set_window_state(&self, hwnd: HWND, state: WindowState) {
        // Record first; the native transition mirrors through WM_SIZE as
        // well, which keeps the entity authoritative either way.
        let key = WindowHandle::from_hwnd(hwnd);
        if let Some(window) = self.state.windows_mut().get_mut(&key) {
            window.set_state(state);
        }

        let show_cmd = match state {
            WindowState::Restored => SW_RESTORE,
            WindowState::Maximized => SW_MAXIMIZE,
            WindowState::Minimized => SW_MINIMIZE,
        };
        let mut placement = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        unsafe {
            _ = GetWindowPlacement(hwnd, &mut placement);
            placement.showCmd = show_cmd;
            _ = SetWindowPlacement(hwnd, &placement);
        }
    }
}

impl Drop for HostWindowController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LogicalSize;
    use crate::positioner::WindowPositioner;
    use crate::types::WindowArchetype;
    use std::ffi::c_void;

    use windows::Win32::UI::WindowsAndMessaging::WM_DESTROY;

    const WM_PROBE_A: u32 = 0x0401;
    const WM_PROBE_B: u32 = 0x0402;
    const WM_PROBE_C: u32 = 0x0403;

    fn fake_hwnd(raw: isize) -> HWND {
        HWND(raw as *mut c_void)
    }

    /// Registers a synthetic entity so messages for `hwnd` resolve to
    /// `view`. No native window is involved.
    fn register_entity(
        state: &ControllerState,
        hwnd: HWND,
        view: ViewId,
        archetype: WindowArchetype,
        owner: Option<WindowHandle>,
    ) -> WindowHandle {
        let mut entity = HostWindow::new(
            view,
            archetype,
            owner,
            None,
            None,
            match archetype {
                WindowArchetype::Regular => Some(WindowState::Restored),
                WindowArchetype::Popup => None,
            },
        );
        let key = WindowHandle::from_hwnd(hwnd);
        entity.set_handle(key);
        // A content handle marks the entity as fully constructed.
        entity.set_child_content(WindowHandle(key.0 + 1));
        state.views.borrow_mut().insert(view, key);
        state.windows.borrow_mut().insert(key, entity);
        key
    }

    #[test]
    fn messages_before_initialize_replay_in_arrival_order() {
        // Arrange
        let state = Rc::new(ControllerState::new());
        let hwnd = fake_hwnd(0x10);
        register_entity(&state, hwnd, ViewId::new(1), WindowArchetype::Regular, None);

        // Act: messages arrive before the application layer is ready.
        state.handle_message(hwnd, ViewId::new(1), WM_PROBE_A, WPARAM(0), LPARAM(0));
        state.handle_message(hwnd, ViewId::new(1), WM_PROBE_B, WPARAM(0), LPARAM(0));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        assert!(state.dispatcher.initialize(Rc::new(move |m: &mut HostMessage| {
            sink.borrow_mut().push(m.message);
        })));

        // Assert: replayed once, in order, then live forwarding.
        assert_eq!(*seen.borrow(), vec![WM_PROBE_A, WM_PROBE_B]);
        state.handle_message(hwnd, ViewId::new(1), WM_PROBE_C, WPARAM(0), LPARAM(0));
        assert_eq!(*seen.borrow(), vec![WM_PROBE_A, WM_PROBE_B, WM_PROBE_C]);
    }

    #[test]
    fn handled_messages_return_the_callback_result() {
        let state = Rc::new(ControllerState::new());
        let hwnd = fake_hwnd(0x10);
        register_entity(&state, hwnd, ViewId::new(1), WindowArchetype::Regular, None);

        state.dispatcher.initialize(Rc::new(|m: &mut HostMessage| {
            if m.message == WM_PROBE_A {
                m.result = LRESULT(42);
                m.handled = true;
            }
        }));

        let handled = state.handle_message(hwnd, ViewId::new(1), WM_PROBE_A, WPARAM(0), LPARAM(0));
        assert_eq!(handled, Some(LRESULT(42)));

        // Unhandled probe messages fall through to default handling.
        let unhandled =
            state.handle_message(hwnd, ViewId::new(1), WM_PROBE_B, WPARAM(0), LPARAM(0));
        assert_eq!(unhandled, None);
    }

    #[test]
    fn messages_without_a_view_are_dropped() {
        let state = Rc::new(ControllerState::new());
        let seen = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&seen);
        state
            .dispatcher
            .initialize(Rc::new(move |_: &mut HostMessage| *sink.borrow_mut() += 1));

        let result =
            state.handle_message(fake_hwnd(0x99), ViewId::new(7), WM_PROBE_A, WPARAM(0), LPARAM(0));

        assert_eq!(result, None);
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn final_teardown_unregisters_before_the_callback_runs() {
        let state = Rc::new(ControllerState::new());
        let hwnd = fake_hwnd(0x10);
        let key = register_entity(&state, hwnd, ViewId::new(1), WindowArchetype::Regular, None);

        let observed_registered = Rc::new(Cell::new(true));
        let observed = Rc::clone(&observed_registered);
        let probe_state = Rc::clone(&state);
        state.dispatcher.initialize(Rc::new(move |m: &mut HostMessage| {
            if m.message == WM_NCDESTROY {
                observed.set(probe_state.windows().contains_key(&key));
            }
        }));

        state.handle_message(hwnd, ViewId::new(1), WM_NCDESTROY, WPARAM(0), LPARAM(0));

        // Re-entrant lookups during teardown already see the window gone.
        assert!(!observed_registered.get());
        assert!(state.windows().is_empty());
        assert!(state.views.borrow().is_empty());
    }

    #[test]
    fn popup_destroy_notifications_unlink_one_popup_at_a_time() {
        let state = Rc::new(ControllerState::new());
        let owner_hwnd = fake_hwnd(0x10);
        let owner_key =
            register_entity(&state, owner_hwnd, ViewId::new(1), WindowArchetype::Regular, None);
        let popup_a = fake_hwnd(0x20);
        let popup_b = fake_hwnd(0x30);
        let key_a = register_entity(
            &state,
            popup_a,
            ViewId::new(2),
            WindowArchetype::Popup,
            Some(owner_key),
        );
        let key_b = register_entity(
            &state,
            popup_b,
            ViewId::new(3),
            WindowArchetype::Popup,
            Some(owner_key),
        );
        {
            let mut windows = state.windows_mut();
            let owner = windows.get_mut(&owner_key).unwrap();
            owner.register_owned(key_a, WindowArchetype::Popup);
            owner.register_owned(key_b, WindowArchetype::Popup);
        }

        state.handle_message(popup_a, ViewId::new(2), WM_DESTROY, WPARAM(0), LPARAM(0));
        state.handle_message(popup_a, ViewId::new(2), WM_NCDESTROY, WPARAM(0), LPARAM(0));

        {
            let windows = state.windows();
            let owner = windows.get(&owner_key).unwrap();
            assert_eq!(owner.num_owned_popups(), 1);
            assert!(!owner.owned_windows().contains(&key_a));
            assert!(owner.owned_windows().contains(&key_b));
            // The title bar stays forced active until the last popup dies.
            assert!(owner.forces_active_frame());
        }
        assert!(!state.windows().contains_key(&key_a));

        state.handle_message(popup_b, ViewId::new(3), WM_DESTROY, WPARAM(0), LPARAM(0));
        state.handle_message(popup_b, ViewId::new(3), WM_NCDESTROY, WPARAM(0), LPARAM(0));

        let windows = state.windows();
        let owner = windows.get(&owner_key).unwrap();
        assert_eq!(owner.num_owned_popups(), 0);
        assert!(owner.owned_windows().is_empty());
        assert!(!owner.forces_active_frame());
    }

    #[test]
    fn close_owned_popups_is_a_no_op_without_popups() {
        let state = Rc::new(ControllerState::new());
        let owner_key = register_entity(
            &state,
            fake_hwnd(0x10),
            ViewId::new(1),
            WindowArchetype::Regular,
            None,
        );

        assert_eq!(host_window::close_owned_popups(&state, owner_key), 0);
        // Unknown windows are equally inert.
        assert_eq!(
            host_window::close_owned_popups(&state, WindowHandle(0xDEAD)),
            0
        );
    }

    #[test]
    fn close_owned_popups_detaches_immediately_but_keeps_the_count() {
        let state = Rc::new(ControllerState::new());
        let owner_key = register_entity(
            &state,
            fake_hwnd(0x10),
            ViewId::new(1),
            WindowArchetype::Regular,
            None,
        );
        let popup_key = register_entity(
            &state,
            fake_hwnd(0x20),
            ViewId::new(2),
            WindowArchetype::Popup,
            Some(owner_key),
        );
        state
            .windows_mut()
            .get_mut(&owner_key)
            .unwrap()
            .register_owned(popup_key, WindowArchetype::Popup);

        // The close request is asynchronous: the set is pruned right away,
        // the count only drops once the destroy notification arrives.
        host_window::close_owned_popups(&state, owner_key);
        {
            let windows = state.windows();
            let owner = windows.get(&owner_key).unwrap();
            assert!(owner.owned_windows().is_empty());
            assert_eq!(owner.num_owned_popups(), 1);
            assert!(owner.forces_active_frame());
        }

        state.handle_message(fake_hwnd(0x20), ViewId::new(2), WM_DESTROY, WPARAM(0), LPARAM(0));
        let windows = state.windows();
        assert_eq!(windows.get(&owner_key).unwrap().num_owned_popups(), 0);
    }

    #[test]
    fn creation_preconditions_fail_before_anything_native_exists() {
        let state = Rc::new(ControllerState::new());

        // A regular window with a positioner is rejected outright.
        let settings = WindowCreationSettings {
            positioner: Some(WindowPositioner::default()),
            ..Default::default()
        };
        let result = host_window::create_host_window(&state, ViewId::new(1), &settings);
        assert!(matches!(
            result,
            Err(PlatformError::InvalidConfiguration(_))
        ));
        assert!(state.windows().is_empty());

        // Popups without an owner are rejected as well.
        let settings = WindowCreationSettings {
            archetype: WindowArchetype::Popup,
            positioner: Some(WindowPositioner::default()),
            ..Default::default()
        };
        let result = host_window::create_host_window(&state, ViewId::new(2), &settings);
        assert!(matches!(
            result,
            Err(PlatformError::InvalidConfiguration(_))
        ));

        // Contradictory size bounds never reach the native layer either.
        let settings = WindowCreationSettings {
            min_size: Some(LogicalSize::new(500.0, 500.0)),
            max_size: Some(LogicalSize::new(100.0, 100.0)),
            ..Default::default()
        };
        let result = host_window::create_host_window(&state, ViewId::new(3), &settings);
        assert!(matches!(
            result,
            Err(PlatformError::InvalidConfiguration(_))
        ));
    }
}
