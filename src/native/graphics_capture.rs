//! Window capture through the Windows Graphics Capture API.

use std::ffi::c_void;
use std::mem::size_of;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::debug;
use windows::core::Interface;
use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{
    Direct3D11CaptureFramePool, GraphicsCaptureItem, GraphicsCaptureSession,
};
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_EXTENDED_FRAME_BOUNDS};
use windows::Win32::System::WinRT::Direct3D11::{
    CreateDirect3D11DeviceFromDXGIDevice, IDirect3DDxgiInterfaceAccess,
};
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;

use super::window::{live_hwnd, window_rect};
use crate::bitmap::{Bitmap, PixelFormat};
use crate::capture::{BackendKind, CaptureBackend};
use crate::error::CaptureError;
use crate::window::WindowDescriptor;

/// Grabs one frame of the window through a free-threaded frame pool.
///
/// Sees hardware-accelerated content that GDI cannot, but draws a capture
/// border on some Windows builds, so it is opt-in.
#[derive(Clone, Copy, Debug)]
pub struct GraphicsCaptureBackend {
    frame_timeout: Duration,
}

impl GraphicsCaptureBackend {
    pub fn new(frame_timeout: Duration) -> Self {
        Self { frame_timeout }
    }

    fn capture(&self, hwnd: HWND) -> Result<Bitmap> {
        let (device, context) = create_d3d11_device()?;
        let item = create_capture_item(hwnd)?;
        let size = item.Size()?;
        debug!("Capture item size: {}x{}", size.Width, size.Height);

        let d3d_device = create_direct3d_device(&device)?;
        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            1,
            size,
        )?;
        let session = frame_pool.CreateCaptureSession(&item)?;

        let result = self.read_frame(&frame_pool, &session, &device, &context);

        // Close even when the frame could not be read
        let _ = session.Close();
        let _ = frame_pool.Close();
        align_to_window_rect(hwnd, result?)
    }

    fn read_frame(
        &self,
        frame_pool: &Direct3D11CaptureFramePool,
        session: &GraphicsCaptureSession,
        device: &ID3D11Device,
        context: &ID3D11DeviceContext,
    ) -> Result<Bitmap> {
        let frame_arrived = Arc::new(AtomicBool::new(false));
        let frame_arrived_clone = frame_arrived.clone();

        frame_pool.FrameArrived(&TypedEventHandler::new(
            move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
                frame_arrived_clone.store(true, Ordering::SeqCst);
                Ok(())
            },
        ))?;

        session.StartCapture()?;

        let start = Instant::now();
        while !frame_arrived.load(Ordering::SeqCst) {
            if start.elapsed() > self.frame_timeout {
                return Err(anyhow!(
                    "no frame within {} ms",
                    self.frame_timeout.as_millis()
                ));
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        let frame = frame_pool.TryGetNextFrame()?;
        let surface = frame.Surface()?;
        let access: IDirect3DDxgiInterfaceAccess = surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };

        let staging_texture = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            device.CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("Failed to create staging texture"))?
        };
        let staging_resource = staging_texture.cast::<ID3D11Resource>()?;

        unsafe {
            context.CopyResource(&staging_resource, &texture.cast::<ID3D11Resource>()?);
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            context.Map(&staging_resource, 0, D3D11_MAP_READ, 0, Some(&mut mapped))?;
            mapped
        };

        let row_pitch = mapped.RowPitch as usize;
        let src = unsafe {
            std::slice::from_raw_parts(
                mapped.pData as *const u8,
                row_pitch * desc.Height as usize,
            )
        };
        let bitmap = Bitmap::from_pitched(
            desc.Width,
            desc.Height,
            PixelFormat::Bgra8,
            src,
            row_pitch,
        );

        unsafe {
            context.Unmap(&staging_resource, 0);
        }

        Ok(bitmap?)
    }
}

impl CaptureBackend for GraphicsCaptureBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::GraphicsCapture
    }

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        let hwnd = live_hwnd(window.handle)?;
        self.capture(hwnd)
            .map_err(|e| CaptureError::backend(self.kind(), format!("{:#}", e)))
    }
}

/// Puts the frame where it sits inside the `GetWindowRect` area.
///
/// The frame only covers the DWM extended frame bounds, which leave out the
/// invisible resize borders, while OCR boxes are offset by the window rect.
fn align_to_window_rect(hwnd: HWND, frame: Bitmap) -> Result<Bitmap> {
    let (left, top, width, height) = window_rect(hwnd)?;
    if width <= 0 || height <= 0 {
        return Err(CaptureError::InvalidDimensions { width, height }.into());
    }

    let mut bounds = RECT::default();
    unsafe {
        DwmGetWindowAttribute(
            hwnd,
            DWMWA_EXTENDED_FRAME_BOUNDS,
            &mut bounds as *mut RECT as *mut c_void,
            size_of::<RECT>() as u32,
        )
    }
    .context("DwmGetWindowAttribute(DWMWA_EXTENDED_FRAME_BOUNDS) failed")?;

    let (x, y) = (bounds.left - left, bounds.top - top);
    debug!(
        "Frame {}x{} at ({}, {}) inside {}x{} window rect",
        frame.width, frame.height, x, y, width, height
    );
    Ok(frame.placed_on(width as u32, height as u32, x, y)?)
}

fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("Failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("Failed to create D3D11 context"))?,
    ))
}

/// WinRT device wrapper the frame pool requires.
fn create_direct3d_device(
    device: &ID3D11Device,
) -> Result<windows::Graphics::DirectX::Direct3D11::IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("Failed to cast to IDirect3DDevice")
}

fn create_capture_item(hwnd: HWND) -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("Failed to get IGraphicsCaptureItemInterop")?
    };
    unsafe {
        interop
            .CreateForWindow(hwnd)
            .context("Failed to create capture item for window")
    }
}
