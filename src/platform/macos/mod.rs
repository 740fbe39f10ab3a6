//! macOS platform backend.
//!
//! Enumeration and capture: ScreenCaptureKit (`SCShareableContent`,
//! `SCScreenshotManager`, macOS 14+ for single-frame capture).
//! Encoding: ImageIO. Screen registry: AppKit `NSScreen`.
//! Trust: `AXIsProcessTrustedWithOptions`.
//!
//! ScreenCaptureKit delivers its completion handlers on its own queues, but
//! parts of the first-run permission flow are serviced by the main run loop,
//! so `pump` runs the calling thread's CFRunLoop rather than sleeping.
//!
//! Required permission: Screen Recording (System Settings > Privacy &
//! Security > Screen Recording), granted to the helper's own bundle.

mod foundation;
mod png;
mod screencapture;
mod screens;
mod trust;

use std::ffi::c_void;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use screencapture::{CapturedImage, DisplayCache};

use super::{
    Completion, EventPump, PermissionService, PlatformDisplay, PlatformError, ScreenScale,
    ScreenService, WriteFailure,
};
use crate::capture::CaptureConfig;

// ---------------------------------------------------------------------------
// Raw FFI
// ---------------------------------------------------------------------------

type CFStringRef = *const c_void;

/// `kCFRunLoopRunFinished`: the run loop has no sources or timers.
const RUN_LOOP_FINISHED: i32 = 1;

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    /// Runs the current thread's run loop for at most `seconds`.
    fn CFRunLoopRunInMode(mode: CFStringRef, seconds: f64, return_after_source_handled: u8) -> i32;

    static kCFRunLoopDefaultMode: CFStringRef;
}

// ---------------------------------------------------------------------------
// SystemPlatform
// ---------------------------------------------------------------------------

pub struct SystemPlatform {
    displays: DisplayCache,
}

impl SystemPlatform {
    pub fn new() -> Self {
        Self {
            displays: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl EventPump for SystemPlatform {
    fn pump(&self, slice: Duration) {
        let result = unsafe { CFRunLoopRunInMode(kCFRunLoopDefaultMode, slice.as_secs_f64(), 0) };
        // An empty run loop returns immediately; avoid spinning.
        if result == RUN_LOOP_FINISHED {
            thread::sleep(slice);
        }
    }
}

impl ScreenService for SystemPlatform {
    type Frame = CapturedImage;

    fn shareable_displays(&self, done: Completion<Vec<PlatformDisplay>>) {
        screencapture::shareable_displays(&self.displays, done);
    }

    fn screen_scales(&self) -> Vec<ScreenScale> {
        screens::screen_scales()
    }

    fn capture_frame(
        &self,
        display: &PlatformDisplay,
        config: &CaptureConfig,
        done: Completion<CapturedImage>,
    ) {
        log::debug!(
            "platform: capturing display {} at {}x{}",
            display.id,
            config.width,
            config.height
        );
        screencapture::capture_frame(&self.displays, display, config, done);
    }

    fn write_png(&self, frame: CapturedImage, path: &Path) -> Result<(), WriteFailure> {
        png::write_png(&frame, path)
    }
}

impl PermissionService for SystemPlatform {
    fn accessibility_trusted(&self, prompt: bool) -> bool {
        trust::accessibility_trusted(prompt)
    }

    fn open_settings(&self, url: &str) -> Result<(), PlatformError> {
        trust::open_settings(url)
    }

    fn os_at_least(&self, major: u32, minor: u32) -> bool {
        trust::os_at_least(major, minor)
    }
}
