//! Top-level window enumeration and state changes through user32.

use std::ffi::c_void;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use tracing::debug;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    IsIconic, IsWindow, IsWindowVisible, IsZoomed, SetForegroundWindow, ShowWindow, SW_MINIMIZE,
    SW_RESTORE,
};

use crate::capture::BackendKind;
use crate::error::CaptureError;
use crate::window::{WindowDescriptor, WindowHandle, WindowSystem};

pub(crate) fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn to_handle(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

/// Fails with `InvalidWindowHandle` unless the handle names a live window.
pub(crate) fn live_hwnd(handle: WindowHandle) -> Result<HWND, CaptureError> {
    let hwnd = to_hwnd(handle);
    if unsafe { IsWindow(hwnd) }.as_bool() {
        Ok(hwnd)
    } else {
        Err(CaptureError::InvalidWindowHandle { handle })
    }
}

/// Current outer rectangle as (left, top, width, height).
pub(crate) fn window_rect(hwnd: HWND) -> Result<(i32, i32, i32, i32), CaptureError> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect) }.map_err(|_| CaptureError::InvalidWindowHandle {
        handle: to_handle(hwnd),
    })?;
    Ok((
        rect.left,
        rect.top,
        rect.right - rect.left,
        rect.bottom - rect.top,
    ))
}

fn window_title(hwnd: HWND) -> String {
    unsafe {
        let title_len = GetWindowTextLengthW(hwnd);
        if title_len <= 0 {
            return String::new();
        }
        let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
        let copied = GetWindowTextW(hwnd, &mut title_buf).max(0) as usize;
        OsString::from_wide(&title_buf[..copied.min(title_len as usize)])
            .to_string_lossy()
            .to_string()
    }
}

fn snapshot(hwnd: HWND, title: String) -> Option<WindowDescriptor> {
    let (left, top, width, height) = window_rect(hwnd).ok()?;
    let foreground = unsafe { GetForegroundWindow() };
    unsafe {
        Some(WindowDescriptor {
            handle: to_handle(hwnd),
            title,
            left,
            top,
            width,
            height,
            is_active: foreground == hwnd,
            is_visible: IsWindowVisible(hwnd).as_bool(),
            is_minimized: IsIconic(hwnd).as_bool(),
            is_maximized: IsZoomed(hwnd).as_bool(),
        })
    }
}

/// The live desktop. Holds no state: every call asks user32.
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32WindowSystem;

impl WindowSystem for Win32WindowSystem {
    fn list_windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError> {
        unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
            unsafe {
                let windows = &mut *(lparam.0 as *mut Vec<WindowDescriptor>);

                if !IsWindowVisible(hwnd).as_bool() {
                    return TRUE;
                }

                // Untitled windows are tool windows and popups, never targets
                let title = window_title(hwnd);
                if title.is_empty() {
                    return TRUE;
                }

                if let Some(descriptor) = snapshot(hwnd, title) {
                    windows.push(descriptor);
                }
                TRUE
            }
        }

        let mut windows: Vec<WindowDescriptor> = Vec::new();
        unsafe {
            // The callback never stops early, so a FALSE here carries no information
            let _ = EnumWindows(Some(enum_callback), LPARAM(&mut windows as *mut _ as isize));
        }
        debug!("Enumerated {} visible titled windows", windows.len());
        Ok(windows)
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        unsafe { IsWindow(to_hwnd(handle)) }.as_bool()
    }

    fn describe(&self, handle: WindowHandle) -> Result<WindowDescriptor, CaptureError> {
        let hwnd = live_hwnd(handle)?;
        snapshot(hwnd, window_title(hwnd)).ok_or(CaptureError::InvalidWindowHandle { handle })
    }

    fn restore(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        let hwnd = live_hwnd(handle)?;
        // Return value is the previous visibility, not success
        let _ = unsafe { ShowWindow(hwnd, SW_RESTORE) };
        Ok(())
    }

    fn minimize(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        let hwnd = live_hwnd(handle)?;
        let _ = unsafe { ShowWindow(hwnd, SW_MINIMIZE) };
        Ok(())
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            None
        } else {
            Some(to_handle(hwnd))
        }
    }

    fn activate(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        let hwnd = live_hwnd(handle)?;
        if unsafe { SetForegroundWindow(hwnd) }.as_bool() {
            Ok(())
        } else {
            Err(CaptureError::backend(
                BackendKind::Activation,
                format!("SetForegroundWindow refused for window {}", handle),
            ))
        }
    }
}

#[cfg(all(test, windows))]
mod tests {
    use super::*;

    const DEAD: WindowHandle = WindowHandle(0x7fff_fff1);

    #[test]
    fn test_dead_handle_rejected() {
        let system = Win32WindowSystem;

        assert!(!system.is_window(DEAD));
        assert_eq!(
            system.describe(DEAD).unwrap_err(),
            CaptureError::InvalidWindowHandle { handle: DEAD }
        );
        assert_eq!(
            system.activate(DEAD).unwrap_err(),
            CaptureError::InvalidWindowHandle { handle: DEAD }
        );
    }

    #[test]
    fn test_listed_windows_are_visible_and_titled() {
        let windows = Win32WindowSystem.list_windows().unwrap();
        assert!(windows.iter().all(|w| w.is_visible && !w.title.is_empty()));
    }
}
