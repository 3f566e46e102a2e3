/*
 * Win32 side of the host window entity: window class registration, native
 * window and content-surface creation, the window procedure, and the
 * per-window message state machine. Native messages are classified into
 * named events (`WindowEvent`) before they are handled so the transitions
 * stay explicit instead of being buried in a flat message switch.
 *
 * All cross-window bookkeeping goes through the controller's registry; an
 * entity never holds more than registry keys for its owner and owned
 * windows. No registry borrow is ever held across a native call that can
 * re-enter the window procedure.
 */
use std::ffi::c_void;
use std::rc::Rc;

use windows::Win32::{
    Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM},
    Graphics::Dwm::{DWMWA_USE_IMMERSIVE_DARK_MODE, DwmSetWindowAttribute},
    System::LibraryLoader::GetModuleHandleW,
    System::Registry::{HKEY_CURRENT_USER, REG_VALUE_TYPE, RRF_RT_REG_DWORD, RegGetValueW},
    UI::HiDpi::EnableNonClientDpiScaling,
    UI::Input::KeyboardAndMouse::SetFocus,
    UI::WindowsAndMessaging::{
        CREATESTRUCTW, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, CreateWindowExW, DefWindowProcW,
        DestroyWindow, GWLP_USERDATA, GetClassInfoExW, GetClientRect, GetWindowLongPtrW,
        GetWindowPlacement, GetWindowRect, IDC_ARROW, IDI_APPLICATION, LoadCursorW, LoadIconW,
        MINMAXINFO, MoveWindow, PostMessageW, RegisterClassExW, SIZE_MAXIMIZED, SIZE_MINIMIZED,
        SIZE_RESTORED, SW_SHOW, SW_SHOWMAXIMIZED, SW_SHOWMINIMIZED, SW_SHOWNORMAL,
        SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
        SetWindowLongPtrW, SetWindowPlacement, SetWindowPos, WA_INACTIVE, WINDOW_EX_STYLE,
        WINDOWPLACEMENT, WM_ACTIVATE, WM_CLOSE, WM_DESTROY, WM_DPICHANGED,
        WM_DWMCOLORIZATIONCOLORCHANGED, WM_GETMINMAXINFO, WM_NCACTIVATE, WM_NCCREATE,
        WM_NCDESTROY, WM_SHOWWINDOW, WM_SIZE, WNDCLASSEXW, WS_CHILD, WS_CLIPCHILDREN,
        WS_OVERLAPPEDWINDOW, WS_POPUP, WS_VISIBLE,
    },
};
use windows::core::{BOOL, HSTRING, PCWSTR, w};

use crate::controller::ControllerState;
use crate::dpi;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::geometry::{Point, Rect, Size};
use crate::placement::{PlacementRequest, place_window};
use crate::types::{ViewId, WindowArchetype, WindowCreationSettings, WindowHandle, WindowState};
use crate::window::{HostWindow, ResizeKind, ShowCommand, sanitize_size_bounds, validate_archetype};

const HOST_WINDOW_CLASS: PCWSTR = w!("WINHOST_HostWindowClass");
const CONTENT_WINDOW_CLASS: PCWSTR = w!("WINHOST_ContentWindowClass");

impl WindowHandle {
    pub(crate) fn from_hwnd(hwnd: HWND) -> Self {
        Self(hwnd.0 as isize)
    }

    pub(crate) fn as_hwnd(self) -> HWND {
        HWND(self.0 as *mut c_void)
    }
}

/*
 * Passed to the window procedure through `lpCreateParams` and stored in the
 * window's user data. Keeps the controller reachable from the procedure and
 * carries the view id so messages arriving while `CreateWindowExW` is still
 * executing can be attributed to the right view.
 */
struct WindowCreationContext {
    state: Rc<ControllerState>,
    view_id: ViewId,
}

/// Named categories for the native messages the entity handles. Everything
/// else is `Unclassified` and falls through to default handling.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WindowEvent {
    /// The native window is being destroyed (`WM_DESTROY`).
    Destroyed,
    /// The system moved the window to a display with a different DPI and
    /// suggests a new rectangle (`WM_DPICHANGED`).
    DpiChanged { suggested: RECT },
    /// Visibility is changing (`WM_SHOWWINDOW`). `from_show_call` is true
    /// when triggered by an explicit show request rather than a system
    /// status change.
    VisibilityChanged { shown: bool, from_show_call: bool },
    /// The system asks for tracking size bounds (`WM_GETMINMAXINFO`).
    SizeConstraintsQuery { info: *mut MINMAXINFO },
    /// The client area was resized (`WM_SIZE`).
    Resized { kind: ResizeKind },
    /// Activation changed (`WM_ACTIVATE`).
    Activated { active: bool },
    /// The non-client area is about to be redrawn to reflect an activation
    /// change (`WM_NCACTIVATE`).
    NonClientActivated { active: bool },
    /// The system color scheme changed (`WM_DWMCOLORIZATIONCOLORCHANGED`).
    ThemeChanged,
    Unclassified,
}

pub(crate) fn classify_message(msg: u32, wparam: WPARAM, lparam: LPARAM) -> WindowEvent {
    match msg {
        WM_DESTROY => WindowEvent::Destroyed,
        WM_DPICHANGED => {
            if lparam.0 == 0 {
                return WindowEvent::Unclassified;
            }
            let suggested = unsafe { *(lparam.0 as *const RECT) };
            WindowEvent::DpiChanged { suggested }
        }
        WM_SHOWWINDOW => WindowEvent::VisibilityChanged {
            shown: wparam.0 != 0,
            from_show_call: lparam.0 == 0,
        },
        WM_GETMINMAXINFO => WindowEvent::SizeConstraintsQuery {
            info: lparam.0 as *mut MINMAXINFO,
        },
        WM_SIZE => WindowEvent::Resized {
            kind: match wparam.0 as u32 {
                SIZE_RESTORED => ResizeKind::Restored,
                SIZE_MAXIMIZED => ResizeKind::Maximized,
                SIZE_MINIMIZED => ResizeKind::Minimized,
                _ => ResizeKind::Other,
            },
        },
        WM_ACTIVATE => WindowEvent::Activated {
            active: (wparam.0 & 0xFFFF) as u32 != WA_INACTIVE,
        },
        WM_NCACTIVATE => WindowEvent::NonClientActivated {
            active: wparam.0 != 0,
        },
        WM_DWMCOLORIZATIONCOLORCHANGED => WindowEvent::ThemeChanged,
        _ => WindowEvent::Unclassified,
    }
}

/*
 * Registers the host and content window classes once per process. Must run
 * before any window is created.
 */
pub(crate) fn register_window_classes() -> PlatformResult<()> {
    let hinstance = unsafe { GetModuleHandleW(None) }.map_err(|err| {
        PlatformError::InitializationFailed(format!("GetModuleHandleW failed: {err:?}"))
    })?;

    unsafe {
        let mut existing = WNDCLASSEXW::default();
        if GetClassInfoExW(Some(hinstance.into()), HOST_WINDOW_CLASS, &mut existing).is_ok() {
            return Ok(());
        }

        let host_class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(host_wnd_proc),
            hInstance: hinstance.into(),
            hIcon: LoadIconW(None, IDI_APPLICATION)?,
            hCursor: LoadCursorW(None, IDC_ARROW)?,
            lpszClassName: HOST_WINDOW_CLASS,
            ..Default::default()
        };
        if RegisterClassExW(&host_class) == 0 {
            return Err(PlatformError::InitializationFailed(
                "RegisterClassExW failed for the host window class".to_string(),
            ));
        }

        let content_class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(content_wnd_proc),
            hInstance: hinstance.into(),
            hCursor: LoadCursorW(None, IDC_ARROW)?,
            lpszClassName: CONTENT_WINDOW_CLASS,
            ..Default::default()
        };
        if RegisterClassExW(&content_class) == 0 {
            return Err(PlatformError::InitializationFailed(
                "RegisterClassExW failed for the content window class".to_string(),
            ));
        }
    }

    log::debug!("Platform: host and content window classes registered.");
    Ok(())
}

/*
 * Window procedure for host windows. Routes every message through the
 * controller; the boxed creation context is installed at WM_NCCREATE and
 * reclaimed at WM_NCDESTROY.
 */
unsafe extern "system" fn host_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_NCCREATE {
        let create_struct = unsafe { &*(lparam.0 as *const CREATESTRUCTW) };
        let context_ptr = create_struct.lpCreateParams as *mut WindowCreationContext;
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, context_ptr as isize);
            _ = EnableNonClientDpiScaling(hwnd);
        }
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    let context_ptr =
        unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut WindowCreationContext;
    if context_ptr.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    let result = {
        let context = unsafe { &*context_ptr };
        context
            .state
            .handle_message(hwnd, context.view_id, msg, wparam, lparam)
    };

    if msg == WM_NCDESTROY {
        drop(unsafe { Box::from_raw(context_ptr) });
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
        }
    }

    result.unwrap_or_else(|| unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) })
}

/// Window procedure for the content surface; the surface has no behavior of
/// its own.
unsafe extern "system" fn content_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/*
 * Creates the native window plus its content surface for a creation request
 * and returns the fully linked entity. Precondition violations fail before
 * anything native exists; native failures tear down whatever was created so
 * no partial window stays reachable.
 */
pub(crate) fn create_host_window(
    state: &Rc<ControllerState>,
    view_id: ViewId,
    settings: &WindowCreationSettings,
) -> PlatformResult<HostWindow> {
    validate_archetype(
        settings.archetype,
        settings.owner.is_some(),
        settings.positioner.is_some(),
    )?;
    let (min_logical, max_logical) = sanitize_size_bounds(settings.min_size, settings.max_size)?;

    let owner_hwnd = match settings.owner {
        Some(owner_view) => {
            let handle = state.handle_for_view(owner_view).ok_or_else(|| {
                PlatformError::InvalidHandle(format!(
                    "owner view {owner_view:?} has no live window"
                ))
            })?;
            Some(handle.as_hwnd())
        }
        None => None,
    };

    let (style, extended_style) = match settings.archetype {
        WindowArchetype::Regular => (WS_OVERLAPPEDWINDOW | WS_CLIPCHILDREN, WINDOW_EX_STYLE(0)),
        WindowArchetype::Popup => (WS_POPUP | WS_CLIPCHILDREN, WINDOW_EX_STYLE(0)),
    };

    let dpi = dpi::dpi_for_window(owner_hwnd);
    let scale = dpi::scale_factor_for_dpi(dpi);
    let min_physical = min_logical.map(|size| dpi::logical_to_physical_size(size, dpi));
    let max_physical = max_logical.map(|size| dpi::logical_to_physical_size(size, dpi));

    let window_size = match dpi::window_size_for_client_size(
        settings.size,
        min_logical,
        max_logical,
        style,
        extended_style,
        owner_hwnd,
    ) {
        Ok(size) => Some(size),
        Err(err) => {
            log::error!("Platform: failed to compute the window size: {err}");
            None
        }
    };

    // Resolve the initial window rectangle: positioner-driven for owned
    // windows, system default placement otherwise.
    let (mut x, mut y) = (CW_USEDEFAULT, CW_USEDEFAULT);
    let (mut width, mut height) = match window_size {
        Some(size) => (size.width, size.height),
        None => (CW_USEDEFAULT, CW_USEDEFAULT),
    };
    if let (Some(owner), Some(positioner), Some(size)) =
        (owner_hwnd, settings.positioner.as_ref(), window_size)
    {
        let frame_size = dpi::frame_size_for_window_size(size, style, extended_style, Some(owner));
        let owner_client = dpi::client_rect_in_screen_space(owner);
        let owner_frame = dpi::extended_frame_bounds(owner).unwrap_or(owner_client);

        // A positioner-supplied anchor is in the owner's logical space:
        // scale by the owner's DPI and translate to the owner's client
        // origin on screen.
        let anchor_rect = positioner.anchor_rect.map(|logical| {
            let origin = logical.origin.to_physical(scale);
            Rect::new(
                Point::new(owner_client.left() + origin.x, owner_client.top() + origin.y),
                logical.size.to_physical(scale),
            )
        });
        let output_rect = dpi::work_area_for_rect(anchor_rect.unwrap_or(owner_frame));

        let placed = place_window(&PlacementRequest {
            anchor_rect,
            owner_rect: if anchor_rect.is_some() {
                owner_client
            } else {
                owner_frame
            },
            output_rect,
            frame_size,
            parent_anchor: positioner.parent_anchor,
            child_anchor: positioner.child_anchor,
            offset: positioner.offset.to_physical(scale),
            constraint_adjustment: positioner.constraint_adjustment,
        });

        // The solver works on the visible frame; grow back to the full
        // window rectangle, which includes the drop-shadow margins.
        x = placed.left();
        y = placed.top();
        width = placed.width() + size.width - frame_size.width;
        height = placed.height() + size.height - frame_size.height;
    }

    let hinstance = unsafe { GetModuleHandleW(None) }.map_err(|err| {
        PlatformError::WindowCreationFailed(format!("GetModuleHandleW failed: {err:?}"))
    })?;
    let context = Box::new(WindowCreationContext {
        state: Rc::clone(state),
        view_id,
    });
    let hwnd = unsafe {
        CreateWindowExW(
            extended_style,
            HOST_WINDOW_CLASS,
            &HSTRING::from(settings.title.as_deref().unwrap_or("")),
            style,
            x,
            y,
            width,
            height,
            owner_hwnd,
            None,
            Some(hinstance.into()),
            Some(Box::into_raw(context) as *const c_void),
        )
    }
    .map_err(|err| {
        log::error!("Platform: CreateWindowExW failed: {err:?}");
        PlatformError::WindowCreationFailed(err.to_string())
    })?;

    // Align the origin with the visible frame rather than the raw window
    // rectangle, which includes the drop shadow. The frame margins are only
    // queryable on a realized window.
    if let Some(frame) = dpi::extended_frame_bounds(hwnd) {
        let mut window_rect = RECT::default();
        unsafe {
            _ = GetWindowRect(hwnd, &mut window_rect);
        }
        let left_shadow = frame.left() - window_rect.left;
        let top_shadow = window_rect.top - frame.top();
        unsafe {
            _ = SetWindowPos(
                hwnd,
                None,
                window_rect.left - left_shadow,
                window_rect.top - top_shadow,
                0,
                0,
                SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            );
        }
    }

    let initial_state = match settings.archetype {
        WindowArchetype::Regular => Some(settings.state.unwrap_or(WindowState::Restored)),
        WindowArchetype::Popup => None,
    };
    let mut entity = HostWindow::new(
        view_id,
        settings.archetype,
        owner_hwnd.map(WindowHandle::from_hwnd),
        min_physical,
        max_physical,
        initial_state,
    );
    entity.set_handle(WindowHandle::from_hwnd(hwnd));

    if let Some(owner) = owner_hwnd {
        let mut owner_rect = RECT::default();
        let mut window_rect = RECT::default();
        unsafe {
            _ = GetWindowRect(owner, &mut owner_rect);
            _ = GetWindowRect(hwnd, &mut window_rect);
        }
        entity.set_offset_from_owner(Point::new(
            window_rect.left - owner_rect.left,
            window_rect.top - owner_rect.top,
        ));
    }

    update_theme(hwnd);

    let content = match create_content_window(hwnd, hinstance.into()) {
        Ok(content) => content,
        Err(err) => {
            log::error!("Platform: failed to create the content surface: {err}");
            unsafe {
                _ = DestroyWindow(hwnd);
            }
            return Err(err);
        }
    };
    entity.set_child_content(WindowHandle::from_hwnd(content));

    // Link into the owner's owned set last, once nothing can fail anymore.
    if let Some(owner) = owner_hwnd {
        let owner_key = WindowHandle::from_hwnd(owner);
        if let Some(owner_entity) = state.windows_mut().get_mut(&owner_key) {
            owner_entity.register_owned(entity.handle(), settings.archetype);
        }
    }

    log::debug!(
        "Platform: created {:?} window {hwnd:?} for view {view_id:?}.",
        settings.archetype
    );
    Ok(entity)
}

/// Creates the rendering-surface window filling the host's client area.
fn create_content_window(
    parent: HWND,
    hinstance: windows::Win32::Foundation::HINSTANCE,
) -> PlatformResult<HWND> {
    let mut client = RECT::default();
    unsafe {
        _ = GetClientRect(parent, &mut client);
    }
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            CONTENT_WINDOW_CLASS,
            &HSTRING::new(),
            WS_CHILD | WS_VISIBLE,
            client.left,
            client.top,
            client.right - client.left,
            client.bottom - client.top,
            Some(parent),
            None,
            Some(hinstance),
            None,
        )
    }
    .map_err(|err| PlatformError::WindowCreationFailed(err.to_string()))?;
    Ok(hwnd)
}

/*
 * The per-window message state machine. The entity is the single authority
 * for its local behavior; the controller only adds cross-window bookkeeping
 * around it. Returns None for events that should fall through to default
 * platform handling.
 *
 * Each arm reads or updates entity state under a short registry borrow and
 * performs native calls only after the borrow is dropped, because several of
 * them (SetWindowPos, SetFocus, SetWindowPlacement) re-enter the window
 * procedure synchronously.
 */
pub(crate) fn handle_window_event(
    state: &ControllerState,
    hwnd: HWND,
    event: WindowEvent,
) -> Option<LRESULT> {
    let key = WindowHandle::from_hwnd(hwnd);

    // Windows that have not finished constructing answer minimally instead
    // of acting on half-built state; unregistered windows get default
    // handling.
    let has_content = state.windows().get(&key).map(|w| !w.child_content().is_invalid())?;
    if !has_content {
        return Some(LRESULT(0));
    }

    match event {
        WindowEvent::Destroyed => {
            // Owner teardown: close the whole owned popup subtree first.
            close_owned_popups(state, key);

            let mut focus_target: Option<HWND> = None;
            {
                let mut windows = state.windows_mut();
                let link = windows.get(&key).map(|w| (w.archetype(), w.owner()));
                if let Some((WindowArchetype::Popup, Some(owner_key))) = link
                    && let Some(owner) = windows.get_mut(&owner_key)
                {
                    owner.on_owned_popup_destroyed(key);
                    // Focus goes back to the owner's content once its last
                    // popup is gone.
                    if owner.num_owned_popups() == 0 && !owner.child_content().is_invalid() {
                        focus_target = Some(owner.child_content().as_hwnd());
                    }
                }
            }
            if let Some(target) = focus_target {
                unsafe {
                    _ = SetFocus(Some(target));
                }
            }
            None
        }

        WindowEvent::DpiChanged { suggested } => {
            // The system-suggested rectangle is taken verbatim.
            unsafe {
                _ = SetWindowPos(
                    hwnd,
                    None,
                    suggested.left,
                    suggested.top,
                    suggested.right - suggested.left,
                    suggested.bottom - suggested.top,
                    SWP_NOZORDER | SWP_NOACTIVATE,
                );
            }
            Some(LRESULT(0))
        }

        WindowEvent::VisibilityChanged {
            shown,
            from_show_call,
        } => {
            if shown && from_show_call {
                let command = state
                    .windows_mut()
                    .get_mut(&key)
                    .and_then(HostWindow::take_pending_show);
                if let Some(command) = command {
                    let show_cmd = match command {
                        ShowCommand::Show => SW_SHOW,
                        ShowCommand::ShowMaximized => SW_SHOWMAXIMIZED,
                        ShowCommand::ShowMinimized => SW_SHOWMINIMIZED,
                        ShowCommand::ShowNormal => SW_SHOWNORMAL,
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
            Some(LRESULT(0))
        }

        WindowEvent::SizeConstraintsQuery { info } => {
            if info.is_null() {
                return Some(LRESULT(0));
            }
            let (min_size, max_size) = state
                .windows()
                .get(&key)
                .map(|w| (w.min_size(), w.max_size()))
                .unwrap_or((None, None));

            let mut window_rect = RECT::default();
            let mut client_rect = RECT::default();
            unsafe {
                _ = GetWindowRect(hwnd, &mut window_rect);
                _ = GetClientRect(hwnd, &mut client_rect);
            }
            let non_client_width = (window_rect.right - window_rect.left)
                - (client_rect.right - client_rect.left);
            let non_client_height = (window_rect.bottom - window_rect.top)
                - (client_rect.bottom - client_rect.top);

            let info = unsafe { &mut *info };
            if let Some(min) = min_size {
                let bound = dpi::clamp_to_virtual_screen(Size::new(
                    min.width + non_client_width,
                    min.height + non_client_height,
                ));
                info.ptMinTrackSize.x = bound.width;
                info.ptMinTrackSize.y = bound.height;
            }
            if let Some(max) = max_size {
                let bound = dpi::clamp_to_virtual_screen(Size::new(
                    max.width + non_client_width,
                    max.height + non_client_height,
                ));
                info.ptMaxTrackSize.x = bound.width;
                info.ptMaxTrackSize.y = bound.height;
            }
            Some(LRESULT(0))
        }

        WindowEvent::Resized { kind } => {
            let content = {
                let mut windows = state.windows_mut();
                match windows.get_mut(&key) {
                    Some(window) => {
                        window.mirror_resize_state(kind);
                        window.child_content()
                    }
                    None => WindowHandle::INVALID,
                }
            };
            if !content.is_invalid() {
                let mut client = RECT::default();
                unsafe {
                    _ = GetClientRect(hwnd, &mut client);
                    _ = MoveWindow(
                        content.as_hwnd(),
                        client.left,
                        client.top,
                        client.right - client.left,
                        client.bottom - client.top,
                        true,
                    );
                }
            }
            Some(LRESULT(0))
        }

        WindowEvent::Activated { active } => {
            if active {
                let content = state
                    .windows()
                    .get(&key)
                    .map(|w| w.child_content())
                    .unwrap_or(WindowHandle::INVALID);
                if !content.is_invalid() {
                    unsafe {
                        _ = SetFocus(Some(content.as_hwnd()));
                    }
                }
            }
            Some(LRESULT(0))
        }

        WindowEvent::NonClientActivated { active } => {
            if !active {
                // A window that owns live popups keeps its title bar in the
                // active colors; drawing it inactive mid-close flickers.
                let force = state
                    .windows()
                    .get(&key)
                    .map(|w| w.archetype() != WindowArchetype::Popup && w.forces_active_frame())
                    .unwrap_or(false);
                if force {
                    return Some(LRESULT(1));
                }
            }
            None
        }

        WindowEvent::ThemeChanged => {
            update_theme(hwnd);
            Some(LRESULT(0))
        }

        WindowEvent::Unclassified => None,
    }
}

/*
 * Closes every popup owned by `owner_key`. The owned set is pruned up front
 * so queries running while the closes are in flight no longer see the
 * popups; each popup's owner keeps its popup count (and with it the forced
 * active title bar) until the popup's own destroy notification arrives.
 * Returns how far the owner's popup count dropped during the call.
 */
pub(crate) fn close_owned_popups(state: &ControllerState, owner_key: WindowHandle) -> usize {
    let (popups, count_before) = {
        let mut windows = state.windows_mut();
        let Some(owner) = windows.get(&owner_key) else {
            return 0;
        };
        let count_before = owner.num_owned_popups();
        if count_before == 0 {
            return 0;
        }
        let popups: Vec<WindowHandle> = owner
            .owned_windows()
            .iter()
            .copied()
            .filter(|handle| {
                windows
                    .get(handle)
                    .is_some_and(|w| w.archetype() == WindowArchetype::Popup)
            })
            .collect();
        if let Some(owner) = windows.get_mut(&owner_key) {
            for handle in &popups {
                owner.detach_owned(*handle);
            }
        }
        (popups, count_before)
    };

    log::debug!(
        "Platform: closing {} owned popup(s) of window {owner_key:?}.",
        popups.len()
    );

    for popup_key in popups {
        // Re-resolve the popup's owner; for nested subtrees it may differ
        // from the window this operation was invoked on.
        let popup_owner = state.windows().get(&popup_key).and_then(HostWindow::owner);
        let Some(popup_owner) = popup_owner else {
            continue;
        };

        // The owner is painted with active colors while it owns popups.
        // Closing the popup may redraw it as inactive before it is redrawn
        // as active again; suppress that intermediate repaint.
        if let Some(owner) = state.windows_mut().get_mut(&popup_owner) {
            owner.set_suppress_inactive_frame(true);
        }
        unsafe {
            _ = PostMessageW(Some(popup_key.as_hwnd()), WM_CLOSE, WPARAM(0), LPARAM(0));
        }
        let repaint_owner = {
            let mut windows = state.windows_mut();
            match windows.get_mut(&popup_owner) {
                Some(owner) => {
                    owner.set_suppress_inactive_frame(false);
                    owner.num_owned_popups() == 0
                }
                None => false,
            }
        };
        // Once the count reaches zero the title bar must reflect the true
        // activation state again.
        if repaint_owner {
            unsafe {
                _ = SetWindowPos(
                    popup_owner.as_hwnd(),
                    None,
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_FRAMECHANGED,
                );
            }
        }
    }

    let count_after = state
        .windows()
        .get(&owner_key)
        .map(HostWindow::num_owned_popups)
        .unwrap_or(0);
    count_before - count_after
}

/// Applies the system dark/light preference to the window frame.
pub(crate) fn update_theme(hwnd: HWND) {
    const PERSONALIZE_KEY: PCWSTR =
        w!("Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize");
    const LIGHT_THEME_VALUE: PCWSTR = w!("AppsUseLightTheme");

    // Zero means apps should use dark mode; missing or non-zero means light.
    let mut light_mode: u32 = 1;
    let mut data_size = std::mem::size_of::<u32>() as u32;
    let mut value_type = REG_VALUE_TYPE::default();
    let status = unsafe {
        RegGetValueW(
            HKEY_CURRENT_USER,
            PERSONALIZE_KEY,
            LIGHT_THEME_VALUE,
            RRF_RT_REG_DWORD,
            Some(&mut value_type),
            Some(&mut light_mode as *mut u32 as *mut c_void),
            Some(&mut data_size),
        )
    };
    if status.is_ok() {
        let enable_dark = BOOL::from(light_mode == 0);
        unsafe {
            _ = DwmSetWindowAttribute(
                hwnd,
                DWMWA_USE_IMMERSIVE_DARK_MODE,
                &enable_dark as *const BOOL as *const c_void,
                std::mem::size_of::<BOOL>() as u32,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_handle_round_trips_through_hwnd() {
        let hwnd = HWND(0x4242 as *mut c_void);
        let handle = WindowHandle::from_hwnd(hwnd);
        assert_eq!(handle.as_hwnd(), hwnd);
        assert!(!handle.is_invalid());
        assert!(WindowHandle::from_hwnd(HWND(std::ptr::null_mut())).is_invalid());
    }

    #[test]
    fn messages_classify_into_named_events() {
        assert!(matches!(
            classify_message(WM_DESTROY, WPARAM(0), LPARAM(0)),
            WindowEvent::Destroyed
        ));
        assert!(matches!(
            classify_message(WM_SIZE, WPARAM(SIZE_MAXIMIZED as usize), LPARAM(0)),
            WindowEvent::Resized {
                kind: ResizeKind::Maximized
            }
        ));
        assert!(matches!(
            classify_message(WM_SIZE, WPARAM(7), LPARAM(0)),
            WindowEvent::Resized {
                kind: ResizeKind::Other
            }
        ));
        assert!(matches!(
            classify_message(WM_ACTIVATE, WPARAM(WA_INACTIVE as usize), LPARAM(0)),
            WindowEvent::Activated { active: false }
        ));
        assert!(matches!(
            classify_message(WM_NCACTIVATE, WPARAM(0), LPARAM(0)),
            WindowEvent::NonClientActivated { active: false }
        ));
        assert!(matches!(
            classify_message(WM_SHOWWINDOW, WPARAM(1), LPARAM(0)),
            WindowEvent::VisibilityChanged {
                shown: true,
                from_show_call: true
            }
        ));
        assert!(matches!(
            classify_message(0x9999, WPARAM(0), LPARAM(0)),
            WindowEvent::Unclassified
        ));
    }
}
