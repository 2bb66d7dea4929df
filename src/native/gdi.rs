//! GDI capture paths: PrintWindow, window DC blit and screen blit.
//!
//! Every handle acquired here lives in a guard so it is released on all exit
//! paths, in reverse order of acquisition.

use std::ffi::c_void;
use std::mem::size_of;

use tracing::debug;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    GetWindowDC, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, CAPTUREBLT,
    DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, ROP_CODE, SRCCOPY,
};
use windows::Win32::Storage::Xps::{PrintWindow, PRINT_WINDOW_FLAGS};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

use super::window::{live_hwnd, window_rect};
use crate::bitmap::{Bitmap, PixelFormat};
use crate::capture::{BackendKind, CaptureBackend, ScreenBounds, ScreenGrabber};
use crate::error::CaptureError;
use crate::window::WindowDescriptor;

/// Asks DWM for the full composed content, including DirectX surfaces.
const PW_RENDERFULLCONTENT: PRINT_WINDOW_FLAGS = PRINT_WINDOW_FLAGS(2);

/// Device context obtained with `GetDC`/`GetWindowDC`.
struct SourceDc {
    hwnd: HWND,
    hdc: HDC,
}

impl SourceDc {
    fn window(hwnd: HWND) -> Option<Self> {
        let hdc = unsafe { GetWindowDC(hwnd) };
        (!hdc.is_invalid()).then_some(Self { hwnd, hdc })
    }

    fn screen() -> Option<Self> {
        let hwnd = HWND::default();
        let hdc = unsafe { GetDC(hwnd) };
        (!hdc.is_invalid()).then_some(Self { hwnd, hdc })
    }
}

impl Drop for SourceDc {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(self.hwnd, self.hdc);
        }
    }
}

struct MemoryDc(HDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct OwnedBitmap(HBITMAP);

impl Drop for OwnedBitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(HGDIOBJ(self.0 .0));
        }
    }
}

/// Puts the previous object back into the DC when dropped.
struct Selection {
    hdc: HDC,
    previous: HGDIOBJ,
}

impl Drop for Selection {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.hdc, self.previous);
        }
    }
}

/// Draws into an off-screen bitmap compatible with `source` and reads the
/// pixels back as top-down BGRA.
fn render_offscreen(
    kind: BackendKind,
    source: HDC,
    width: i32,
    height: i32,
    draw: impl FnOnce(HDC) -> Result<(), String>,
) -> Result<Bitmap, CaptureError> {
    if width <= 0 || height <= 0 {
        return Err(CaptureError::InvalidDimensions { width, height });
    }

    let memory = MemoryDc(unsafe { CreateCompatibleDC(source) });
    if memory.0.is_invalid() {
        return Err(CaptureError::backend(kind, "CreateCompatibleDC failed"));
    }
    let bitmap = OwnedBitmap(unsafe { CreateCompatibleBitmap(source, width, height) });
    if bitmap.0.is_invalid() {
        return Err(CaptureError::backend(kind, "CreateCompatibleBitmap failed"));
    }

    {
        let previous = unsafe { SelectObject(memory.0, HGDIOBJ(bitmap.0 .0)) };
        if previous.is_invalid() {
            return Err(CaptureError::backend(kind, "SelectObject failed"));
        }
        let _selection = Selection {
            hdc: memory.0,
            previous,
        };
        draw(memory.0).map_err(|reason| CaptureError::backend(kind, reason))?;
    }

    // GetDIBits wants the bitmap deselected, which the block above ensures
    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            // Negative height asks for top-down rows
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut bytes = vec![0u8; width as usize * height as usize * 4];
    let lines = unsafe {
        GetDIBits(
            memory.0,
            bitmap.0,
            0,
            height as u32,
            Some(bytes.as_mut_ptr() as *mut c_void),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines != height {
        return Err(CaptureError::backend(
            kind,
            format!("GetDIBits returned {} of {} rows", lines, height),
        ));
    }

    // GDI leaves alpha at zero
    for px in bytes.chunks_exact_mut(4) {
        px[3] = 255;
    }
    Bitmap::new(width as u32, height as u32, PixelFormat::Bgra8, bytes)
}

/// PrintWindow answers some GPU-rendered windows with a solid black frame.
fn reject_blank(kind: BackendKind, bitmap: Bitmap) -> Result<Bitmap, CaptureError> {
    let blank = bitmap
        .bytes
        .chunks_exact(4)
        .all(|px| px[0] == 0 && px[1] == 0 && px[2] == 0);
    if blank {
        Err(CaptureError::backend(kind, "captured frame is entirely black"))
    } else {
        Ok(bitmap)
    }
}

fn blit(dest: HDC, width: i32, height: i32, source: HDC, x: i32, y: i32) -> Result<(), String> {
    unsafe {
        BitBlt(
            dest,
            0,
            0,
            width,
            height,
            source,
            x,
            y,
            ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
        )
    }
    .map_err(|e| format!("BitBlt failed: {}", e))
}

/// `PrintWindow` with full-content rendering. Works for occluded and
/// off-screen windows without touching focus.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompositorBackend;

impl CaptureBackend for CompositorBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Compositor
    }

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        let hwnd = live_hwnd(window.handle)?;
        let (_, _, width, height) = window_rect(hwnd)?;
        let dc = SourceDc::window(hwnd)
            .ok_or_else(|| CaptureError::backend(self.kind(), "GetWindowDC failed"))?;

        let bitmap = render_offscreen(self.kind(), dc.hdc, width, height, |memory| {
            if unsafe { PrintWindow(hwnd, memory, PW_RENDERFULLCONTENT) }.as_bool() {
                Ok(())
            } else {
                Err("PrintWindow failed".to_string())
            }
        })?;
        reject_blank(self.kind(), bitmap)
    }
}

/// Copies from the window's own device context.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowDcBackend;

impl CaptureBackend for WindowDcBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::WindowDc
    }

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        let hwnd = live_hwnd(window.handle)?;
        let (_, _, width, height) = window_rect(hwnd)?;
        let dc = SourceDc::window(hwnd)
            .ok_or_else(|| CaptureError::backend(self.kind(), "GetWindowDC failed"))?;

        // Occluded windows can come back stale or black; that still counts
        render_offscreen(self.kind(), dc.hdc, width, height, |memory| {
            blit(memory, width, height, dc.hdc, 0, 0)
        })
    }
}

/// Copies the window's rectangle off the screen. Whatever overlaps the
/// window ends up in the image too.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScreenRegionBackend;

impl CaptureBackend for ScreenRegionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ScreenRegion
    }

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        live_hwnd(window.handle)?;
        grab_screen(
            self.kind(),
            window.left,
            window.top,
            window.width,
            window.height,
        )
    }
}

fn grab_screen(
    kind: BackendKind,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
) -> Result<Bitmap, CaptureError> {
    let dc = SourceDc::screen().ok_or_else(|| CaptureError::backend(kind, "GetDC failed"))?;
    debug!("Screen blit of ({}, {}) {}x{}", left, top, width, height);
    render_offscreen(kind, dc.hdc, width, height, |memory| {
        blit(memory, width, height, dc.hdc, left, top)
    })
}

/// The primary monitor, whose top-left is always (0, 0) in screen space.
#[derive(Clone, Copy, Debug, Default)]
pub struct GdiScreen;

impl ScreenGrabber for GdiScreen {
    fn screen_bounds(&self) -> ScreenBounds {
        unsafe {
            ScreenBounds {
                left: 0,
                top: 0,
                width: GetSystemMetrics(SM_CXSCREEN),
                height: GetSystemMetrics(SM_CYSCREEN),
            }
        }
    }

    fn capture_screen(&self) -> Result<Bitmap, CaptureError> {
        let bounds = self.screen_bounds();
        self.capture_region(bounds.left, bounds.top, bounds.width, bounds.height)
    }

    fn capture_region(
        &self,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
    ) -> Result<Bitmap, CaptureError> {
        grab_screen(BackendKind::ScreenRegion, left, top, width, height)
    }
}

// Runs against the live desktop, so only on Windows
#[cfg(all(test, windows))]
mod tests {
    use super::*;
    use crate::testing::window;

    // Never handed out by user32: real handles are multiples of 2
    const DEAD: isize = 0x7fff_fff1;

    fn solid(width: u32, height: u32, px: [u8; 4]) -> Bitmap {
        let bytes = px.repeat(width as usize * height as usize);
        Bitmap::new(width, height, PixelFormat::Bgra8, bytes).unwrap()
    }

    #[test]
    fn test_black_frame_rejected() {
        let err = reject_blank(BackendKind::Compositor, solid(4, 4, [0, 0, 0, 255])).unwrap_err();
        assert_eq!(
            err,
            CaptureError::backend(BackendKind::Compositor, "captured frame is entirely black")
        );
    }

    #[test]
    fn test_frame_with_content_accepted() {
        let mut bitmap = solid(4, 4, [0, 0, 0, 255]);
        bitmap.bytes[20] = 1;
        assert!(reject_blank(BackendKind::Compositor, bitmap).is_ok());
    }

    #[test]
    fn test_zero_sized_render_rejected() {
        let err = render_offscreen(BackendKind::WindowDc, HDC::default(), 0, 10, |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, CaptureError::InvalidDimensions { width: 0, height: 10 });
    }

    #[test]
    fn test_dead_handle_is_invalid_for_window_backends() {
        let gone = window(DEAD, "Gone", 0, 0, 100, 100);
        let backends: [&dyn CaptureBackend; 3] =
            [&CompositorBackend, &WindowDcBackend, &ScreenRegionBackend];

        for backend in backends {
            let err = backend.attempt_capture(&gone).unwrap_err();
            assert_eq!(err, CaptureError::InvalidWindowHandle { handle: gone.handle });
        }
    }

    #[test]
    fn test_screen_region_is_bgra() {
        let bitmap = GdiScreen.capture_region(0, 0, 8, 4).unwrap();

        assert_eq!(bitmap.dimensions(), (8, 4));
        assert_eq!(bitmap.format, PixelFormat::Bgra8);
        assert_eq!(bitmap.bytes.len(), 128);
        assert!(bitmap.bytes.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_primary_screen_starts_at_origin() {
        let bounds = GdiScreen.screen_bounds();
        assert_eq!(bounds.offset(), (0, 0));
        assert!(bounds.width > 0 && bounds.height > 0);
    }
}
