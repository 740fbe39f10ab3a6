//! Backend for targets without ScreenCaptureKit.
//!
//! Every asynchronous call completes at once with a `PlatformError`, so
//! commands fail fast with a clear message instead of waiting out a timeout.
//! Permission checks report "not granted". Argument validation and the
//! automation pass-through work as on macOS.

use std::path::Path;
use std::thread;
use std::time::Duration;

use super::{
    Completion, EventPump, PermissionService, PlatformDisplay, PlatformError, ScreenScale,
    ScreenService, WriteFailure,
};
use crate::capture::CaptureConfig;

const UNAVAILABLE: &str = "Screen capture requires macOS with ScreenCaptureKit (12.3 or later)";

pub struct SystemPlatform;

impl SystemPlatform {
    pub fn new() -> Self {
        SystemPlatform
    }
}

/// There is no callback mechanism to service; waiting is plain sleeping.
impl EventPump for SystemPlatform {
    fn pump(&self, slice: Duration) {
        thread::sleep(slice);
    }
}

impl ScreenService for SystemPlatform {
    type Frame = ();

    fn shareable_displays(&self, done: Completion<Vec<PlatformDisplay>>) {
        done(Err(PlatformError::new(UNAVAILABLE)));
    }

    fn screen_scales(&self) -> Vec<ScreenScale> {
        Vec::new()
    }

    fn capture_frame(
        &self,
        _display: &PlatformDisplay,
        _config: &CaptureConfig,
        done: Completion<()>,
    ) {
        done(Err(PlatformError::new(UNAVAILABLE)));
    }

    fn write_png(&self, _frame: (), path: &Path) -> Result<(), WriteFailure> {
        log::warn!("platform: cannot encode {} on this target", path.display());
        Err(WriteFailure::Create)
    }
}

impl PermissionService for SystemPlatform {
    fn accessibility_trusted(&self, _prompt: bool) -> bool {
        false
    }

    fn open_settings(&self, url: &str) -> Result<(), PlatformError> {
        Err(PlatformError::new(format!(
            "cannot open {url}: System Settings is only available on macOS"
        )))
    }

    fn os_at_least(&self, _major: u32, _minor: u32) -> bool {
        false
    }
}
