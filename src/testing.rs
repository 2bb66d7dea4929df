//! In-memory stand-ins for the window manager, the screen, capture backends
//! and OCR. Test builds only.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use image::RgbaImage;

use crate::bitmap::{Bitmap, PixelFormat};
use crate::capture::{ActivationTiming, BackendKind, CaptureBackend, ScreenBounds, ScreenGrabber};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::ocr::{OcrBox, OcrEngine};
use crate::window::{WindowDescriptor, WindowHandle, WindowSystem};

pub fn window(id: isize, title: &str, left: i32, top: i32, width: i32, height: i32) -> WindowDescriptor {
    WindowDescriptor {
        handle: WindowHandle(id),
        title: title.to_string(),
        left,
        top,
        width,
        height,
        is_active: false,
        is_visible: true,
        is_minimized: false,
        is_maximized: false,
    }
}

pub fn ocr_box(left: f64, top: f64, width: f64, height: f64, text: &str) -> OcrBox {
    OcrBox::from_rect(left, top, width, height, text.to_string(), 0.9)
}

pub fn instant_timing() -> ActivationTiming {
    ActivationTiming {
        retries: 3,
        settle: Duration::ZERO,
        restore_settle: Duration::ZERO,
        backoff: Duration::ZERO,
    }
}

/// Defaults with every delay set to zero.
pub fn instant_config() -> CaptureConfig {
    CaptureConfig {
        restore_settle_ms: 0,
        activation_settle_ms: 0,
        restore_previous_settle_ms: 0,
        activation_backoff_ms: 0,
        ..CaptureConfig::default()
    }
}

fn solid_bitmap(width: u32, height: u32) -> Bitmap {
    let bytes = [30u8, 60, 90, 255].repeat(width as usize * height as usize);
    Bitmap {
        width,
        height,
        format: PixelFormat::Bgra8,
        bytes,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowCall {
    Restore(WindowHandle),
    Minimize(WindowHandle),
    Activate(WindowHandle),
}

pub struct FakeWindowSystem {
    windows: RefCell<Vec<WindowDescriptor>>,
    closed: RefCell<HashSet<WindowHandle>>,
    restored_geometry: RefCell<HashMap<WindowHandle, (i32, i32, i32, i32)>>,
    foreground: Cell<Option<WindowHandle>>,
    failing_activations: Cell<u32>,
    calls: RefCell<Vec<WindowCall>>,
}

impl FakeWindowSystem {
    pub fn new(windows: Vec<WindowDescriptor>) -> Self {
        Self {
            windows: RefCell::new(windows),
            closed: RefCell::new(HashSet::new()),
            restored_geometry: RefCell::new(HashMap::new()),
            foreground: Cell::new(None),
            failing_activations: Cell::new(0),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn close(&self, handle: WindowHandle) {
        self.closed.borrow_mut().insert(handle);
    }

    /// Geometry the window takes when restored: (left, top, width, height).
    pub fn set_restored_geometry(&self, handle: WindowHandle, rect: (i32, i32, i32, i32)) {
        self.restored_geometry.borrow_mut().insert(handle, rect);
    }

    pub fn set_foreground(&self, handle: Option<WindowHandle>) {
        self.foreground.set(handle);
    }

    pub fn fail_next_activations(&self, count: u32) {
        self.failing_activations.set(count);
    }

    /// Restore, minimize and activate calls in the order they happened.
    pub fn state_changes(&self) -> Vec<WindowCall> {
        self.calls.borrow().clone()
    }

    pub fn current(&self, handle: WindowHandle) -> Option<WindowDescriptor> {
        if self.closed.borrow().contains(&handle) {
            return None;
        }
        let foreground = self.foreground.get();
        self.windows
            .borrow()
            .iter()
            .find(|w| w.handle == handle)
            .cloned()
            .map(|mut w| {
                w.is_active = foreground == Some(handle);
                w
            })
    }

    fn update(&self, handle: WindowHandle, f: impl FnOnce(&mut WindowDescriptor)) -> Result<(), CaptureError> {
        if self.closed.borrow().contains(&handle) {
            return Err(CaptureError::InvalidWindowHandle { handle });
        }
        let mut windows = self.windows.borrow_mut();
        let w = windows
            .iter_mut()
            .find(|w| w.handle == handle)
            .ok_or(CaptureError::InvalidWindowHandle { handle })?;
        f(w);
        Ok(())
    }
}

impl WindowSystem for FakeWindowSystem {
    fn list_windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError> {
        let handles: Vec<_> = self.windows.borrow().iter().map(|w| w.handle).collect();
        Ok(handles.into_iter().filter_map(|h| self.current(h)).collect())
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        self.current(handle).is_some()
    }

    fn describe(&self, handle: WindowHandle) -> Result<WindowDescriptor, CaptureError> {
        self.current(handle)
            .ok_or(CaptureError::InvalidWindowHandle { handle })
    }

    fn restore(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        self.calls.borrow_mut().push(WindowCall::Restore(handle));
        let geometry = self.restored_geometry.borrow().get(&handle).copied();
        self.update(handle, |w| {
            w.is_minimized = false;
            if let Some((left, top, width, height)) = geometry {
                w.left = left;
                w.top = top;
                w.width = width;
                w.height = height;
            }
        })
    }

    fn minimize(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        self.calls.borrow_mut().push(WindowCall::Minimize(handle));
        self.update(handle, |w| w.is_minimized = true)
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        self.foreground.get()
    }

    fn activate(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        self.calls.borrow_mut().push(WindowCall::Activate(handle));
        let failing = self.failing_activations.get();
        if failing > 0 {
            self.failing_activations.set(failing - 1);
            return Err(CaptureError::backend(
                BackendKind::Activation,
                "SetForegroundWindow refused",
            ));
        }
        if !self.is_window(handle) {
            return Err(CaptureError::InvalidWindowHandle { handle });
        }
        self.foreground.set(Some(handle));
        Ok(())
    }
}

pub struct FakeScreen {
    bounds: ScreenBounds,
    regions: RefCell<Vec<(i32, i32, i32, i32)>>,
}

impl FakeScreen {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            bounds: ScreenBounds {
                left: 0,
                top: 0,
                width,
                height,
            },
            regions: RefCell::new(Vec::new()),
        }
    }

    /// Reports bounds whose top-left is not at the origin.
    pub fn with_origin(mut self, left: i32, top: i32) -> Self {
        self.bounds.left = left;
        self.bounds.top = top;
        self
    }

    /// Rectangles passed to `capture_region`, in call order.
    pub fn regions(&self) -> Vec<(i32, i32, i32, i32)> {
        self.regions.borrow().clone()
    }
}

impl ScreenGrabber for FakeScreen {
    fn screen_bounds(&self) -> ScreenBounds {
        self.bounds
    }

    fn capture_screen(&self) -> Result<Bitmap, CaptureError> {
        Ok(solid_bitmap(self.bounds.width as u32, self.bounds.height as u32))
    }

    fn capture_region(&self, left: i32, top: i32, width: i32, height: i32) -> Result<Bitmap, CaptureError> {
        if width <= 0 || height <= 0 {
            return Err(CaptureError::InvalidDimensions { width, height });
        }
        self.regions.borrow_mut().push((left, top, width, height));
        Ok(solid_bitmap(width as u32, height as u32))
    }
}

enum Script {
    Ok(u32, u32),
    Fail(String),
    Closed,
}

/// Backend with a fixed outcome that counts how often it ran.
pub struct ScriptedBackend {
    kind: BackendKind,
    script: Script,
    calls: Rc<Cell<u32>>,
}

impl ScriptedBackend {
    pub fn ok(kind: BackendKind, width: u32, height: u32) -> Self {
        Self::with_script(kind, Script::Ok(width, height))
    }

    pub fn failing(kind: BackendKind, reason: &str) -> Self {
        Self::with_script(kind, Script::Fail(reason.to_string()))
    }

    /// Behaves as if the window closed just before capture.
    pub fn closed_window(kind: BackendKind) -> Self {
        Self::with_script(kind, Script::Closed)
    }

    fn with_script(kind: BackendKind, script: Script) -> Self {
        Self {
            kind,
            script,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn calls(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.calls)
    }
}

impl CaptureBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        self.calls.set(self.calls.get() + 1);
        match &self.script {
            Script::Ok(w, h) => Ok(solid_bitmap(*w, *h)),
            Script::Fail(reason) => Err(CaptureError::backend(self.kind, reason)),
            Script::Closed => Err(CaptureError::InvalidWindowHandle {
                handle: window.handle,
            }),
        }
    }
}

/// OCR engine returning canned boxes, recording the image sizes it was given.
pub struct FixedOcr {
    result: Result<Vec<OcrBox>, String>,
    seen: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl FixedOcr {
    pub fn new(boxes: Vec<OcrBox>) -> Self {
        Self {
            result: Ok(boxes),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen_sizes(&self) -> Arc<Mutex<Vec<(u32, u32)>>> {
        Arc::clone(&self.seen)
    }
}

impl OcrEngine for FixedOcr {
    fn recognize(&self, img: &RgbaImage) -> anyhow::Result<Vec<OcrBox>> {
        self.seen.lock().unwrap().push(img.dimensions());
        match &self.result {
            Ok(boxes) => Ok(boxes.clone()),
            Err(message) => Err(anyhow!("{}", message)),
        }
    }
}
