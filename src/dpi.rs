/*
 * Geometry/DPI adapter: conversions between logical and physical sizes, and
 * the frame-size queries needed to position windows before they exist. These
 * are stateless utility calls over the Win32 DPI and DWM APIs; every
 * function either succeeds or reports the failure, nothing here keeps state.
 */
use std::ffi::c_void;

use windows::Win32::{
    Foundation::{HWND, LPARAM, LRESULT, POINT, RECT, WPARAM},
    Graphics::Dwm::{DWMWA_EXTENDED_FRAME_BOUNDS, DwmGetWindowAttribute},
    Graphics::Gdi::{
        ClientToScreen, GetMonitorInfoW, MONITOR_DEFAULTTONEAREST, MONITORINFO, MonitorFromRect,
    },
    System::LibraryLoader::GetModuleHandleW,
    UI::HiDpi::{GetDpiForSystem, GetDpiForWindow},
    UI::WindowsAndMessaging::{
        AdjustWindowRectExForDpi, CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DestroyWindow,
        GetClassInfoExW, GetClientRect, GetSystemMetrics, RegisterClassExW, SM_CXVIRTUALSCREEN,
        SM_CYVIRTUALSCREEN, WINDOW_EX_STYLE, WINDOW_STYLE, WNDCLASSEXW, WS_VISIBLE,
    },
};
use windows::core::{HSTRING, PCWSTR, w};

use crate::error::Result as PlatformResult;
use crate::geometry::{LogicalSize, Rect, Size};

/// The DPI logical coordinates are defined against.
pub(crate) const USER_DEFAULT_SCREEN_DPI: u32 = 96;

/// Window class used for the invisible probe window that measures frame
/// bounds for a not-yet-created window.
const FRAME_PROBE_CLASS: PCWSTR = w!("WINHOST_FrameProbeClass");

pub(crate) fn rect_from_native(rect: RECT) -> Rect {
    Rect::from_ltrb(rect.left, rect.top, rect.right, rect.bottom)
}

pub(crate) fn rect_to_native(rect: Rect) -> RECT {
    RECT {
        left: rect.left(),
        top: rect.top(),
        right: rect.right(),
        bottom: rect.bottom(),
    }
}

/// DPI of the display the window lives on; the system DPI when no window is
/// given or the query fails.
pub(crate) fn dpi_for_window(hwnd: Option<HWND>) -> u32 {
    if let Some(hwnd) = hwnd
        && !hwnd.is_invalid()
    {
        let dpi = unsafe { GetDpiForWindow(hwnd) };
        if dpi != 0 {
            return dpi;
        }
    }
    unsafe { GetDpiForSystem() }
}

pub(crate) fn scale_factor_for_dpi(dpi: u32) -> f64 {
    dpi as f64 / USER_DEFAULT_SCREEN_DPI as f64
}

/// Scales a logical size into physical pixels under the given DPI.
pub(crate) fn logical_to_physical_size(size: LogicalSize, dpi: u32) -> Size {
    size.to_physical(scale_factor_for_dpi(dpi))
}

/// Clamps a physical size to the bounding box of all attached displays so
/// size constraints never report unbounded or negative extents.
pub(crate) fn clamp_to_virtual_screen(size: Size) -> Size {
    let virtual_width = unsafe { GetSystemMetrics(SM_CXVIRTUALSCREEN) };
    let virtual_height = unsafe { GetSystemMetrics(SM_CYVIRTUALSCREEN) };
    Size::new(
        size.width.clamp(0, virtual_width),
        size.height.clamp(0, virtual_height),
    )
}

/// Computes the window size (including non-client areas) needed for the
/// given logical client size under the owner's DPI, honoring the optional
/// logical min/max client bounds.
pub(crate) fn window_size_for_client_size(
    client_size: LogicalSize,
    min_size: Option<LogicalSize>,
    max_size: Option<LogicalSize>,
    style: WINDOW_STYLE,
    extended_style: WINDOW_EX_STYLE,
    owner: Option<HWND>,
) -> PlatformResult<Size> {
    let dpi = dpi_for_window(owner);
    let client = logical_to_physical_size(client_size, dpi);

    let mut rect = RECT {
        left: 0,
        top: 0,
        right: client.width,
        bottom: client.height,
    };
    unsafe { AdjustWindowRectExForDpi(&mut rect, style, false, extended_style, dpi)? };

    let mut width = rect.right - rect.left;
    let mut height = rect.bottom - rect.top;
    let non_client_width = width - client.width;
    let non_client_height = height - client.height;

    if let Some(min) = min_size {
        let min_physical = logical_to_physical_size(min, dpi);
        let bound = clamp_to_virtual_screen(Size::new(
            min_physical.width + non_client_width,
            min_physical.height + non_client_height,
        ));
        width = width.max(bound.width);
        height = height.max(bound.height);
    }
    if let Some(max) = max_size {
        let max_physical = logical_to_physical_size(max, dpi);
        let bound = clamp_to_virtual_screen(Size::new(
            max_physical.width + non_client_width,
            max_physical.height + non_client_height,
        ));
        width = width.min(bound.width);
        height = height.min(bound.height);
    }

    Ok(Size::new(width, height))
}

unsafe extern "system" fn probe_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

fn ensure_probe_class_registered() -> bool {
    let hinstance = match unsafe { GetModuleHandleW(None) } {
        Ok(module) => module,
        Err(err) => {
            log::error!("Platform: GetModuleHandleW failed for frame probe: {err:?}");
            return false;
        }
    };

    unsafe {
        let mut existing = WNDCLASSEXW::default();
        if GetClassInfoExW(Some(hinstance.into()), FRAME_PROBE_CLASS, &mut existing).is_ok() {
            return true;
        }

        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(probe_wnd_proc),
            hInstance: hinstance.into(),
            lpszClassName: FRAME_PROBE_CLASS,
            ..Default::default()
        };
        if RegisterClassExW(&class) == 0 {
            log::error!("Platform: failed to register the frame probe window class.");
            return false;
        }
    }
    true
}

/// Measures the visible frame size (excluding the drop shadow) a window of
/// `window_size` would have under the given styles, by realizing an
/// invisible probe window and querying its extended frame bounds. Falls back
/// to `window_size` when the probe cannot be created.
pub(crate) fn frame_size_for_window_size(
    window_size: Size,
    style: WINDOW_STYLE,
    extended_style: WINDOW_EX_STYLE,
    owner: Option<HWND>,
) -> Size {
    if !ensure_probe_class_registered() {
        return window_size;
    }
    let hinstance = match unsafe { GetModuleHandleW(None) } {
        Ok(module) => module,
        Err(_) => return window_size,
    };

    let hidden_style = WINDOW_STYLE(style.0 & !WS_VISIBLE.0);
    let probe = unsafe {
        CreateWindowExW(
            extended_style,
            FRAME_PROBE_CLASS,
            &HSTRING::new(),
            hidden_style,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            window_size.width,
            window_size.height,
            owner,
            None,
            Some(hinstance.into()),
            None,
        )
    };

    match probe {
        Ok(hwnd) => {
            let frame = extended_frame_bounds(hwnd)
                .map(|bounds| bounds.size)
                .unwrap_or(window_size);
            unsafe {
                _ = DestroyWindow(hwnd);
            }
            frame
        }
        Err(err) => {
            log::warn!("Platform: frame probe window creation failed: {err:?}");
            window_size
        }
    }
}

/// The window's visible frame (excluding the drop shadow), in screen space.
pub(crate) fn extended_frame_bounds(hwnd: HWND) -> Option<Rect> {
    let mut frame = RECT::default();
    let queried = unsafe {
        DwmGetWindowAttribute(
            hwnd,
            DWMWA_EXTENDED_FRAME_BOUNDS,
            &mut frame as *mut RECT as *mut c_void,
            std::mem::size_of::<RECT>() as u32,
        )
    };
    queried.ok().map(|_| rect_from_native(frame))
}

/// The window's client area translated into screen space.
pub(crate) fn client_rect_in_screen_space(hwnd: HWND) -> Rect {
    let mut client = RECT::default();
    unsafe {
        _ = GetClientRect(hwnd, &mut client);
    }
    let mut top_left = POINT { x: 0, y: 0 };
    let mut bottom_right = POINT {
        x: client.right,
        y: client.bottom,
    };
    unsafe {
        _ = ClientToScreen(hwnd, &mut top_left);
        _ = ClientToScreen(hwnd, &mut bottom_right);
    }
    Rect::from_ltrb(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
}

/// Work area of the display with the greatest intersection with `rect`
/// (nearest display when they do not intersect at all).
pub(crate) fn work_area_for_rect(rect: Rect) -> Rect {
    let native = rect_to_native(rect);
    let monitor = unsafe { MonitorFromRect(&native, MONITOR_DEFAULTTONEAREST) };
    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        rect_from_native(info.rcWork)
    } else {
        log::warn!("Platform: GetMonitorInfoW failed; using an empty work area.");
        Rect::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_rect_conversion_round_trips() {
        let rect = Rect::from_ltrb(-100, 50, 300, 250);
        assert_eq!(rect_from_native(rect_to_native(rect)), rect);
    }

    #[test]
    fn scale_factor_is_relative_to_96_dpi() {
        assert_eq!(scale_factor_for_dpi(96), 1.0);
        assert_eq!(scale_factor_for_dpi(144), 1.5);
        assert_eq!(scale_factor_for_dpi(192), 2.0);
    }
}
