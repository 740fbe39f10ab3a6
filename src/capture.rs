//! Single-frame screen capture.
//!
//! `CaptureExecutor::capture` validates the output path, resolves the target
//! display and its scale, builds a `CaptureConfig`, runs the platform's
//! asynchronous capture under one overall deadline, and encodes the frame as
//! PNG. A platform call that never calls back is reported as
//! `PermissionTimeout`, since that is how a missing Screen Recording grant
//! usually manifests.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::display::{DisplayDescriptor, DisplayResolver};
use crate::error::{HelperError, HelperResult};
use crate::platform::{ScreenService, WriteFailure};
use crate::waiter::{Deadline, Waiter};

/// Default bound on the whole capture, enumeration included.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A crop rectangle in logical points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FromStr for Region {
    type Err = String;

    /// Parses `x,y,w,h`. All four components must be present and numeric.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| "-R requires x,y,w,h format".to_string())?;
        match parts[..] {
            [x, y, width, height] => Ok(Self {
                x,
                y,
                width,
                height,
            }),
            _ => Err("-R requires x,y,w,h format".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    /// 1-based display selector; `None` picks the first enumerated display.
    pub display: Option<usize>,
    pub region: Option<Region>,
    pub output: PathBuf,
}

/// What the platform is asked to capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConfig {
    /// Output width in device pixels.
    pub width: u32,
    /// Output height in device pixels.
    pub height: u32,
    /// Source rectangle in points; `None` captures the whole display.
    pub source_rect: Option<Region>,
    pub shows_cursor: bool,
    pub captures_audio: bool,
}

impl CaptureConfig {
    /// Full display at `scale`, or `region` at `scale` when cropping.
    ///
    /// Fractional point sizes are truncated before scaling.
    pub fn new(display: &DisplayDescriptor, scale: u32, region: Option<Region>) -> Self {
        let (width, height) = match region {
            Some(r) => (r.width as u32, r.height as u32),
            None => (display.width(), display.height()),
        };
        Self {
            width: width.saturating_mul(scale),
            height: height.saturating_mul(scale),
            source_rect: region,
            shows_cursor: false,
            captures_audio: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct CaptureExecutor<'a, S: ScreenService> {
    service: &'a S,
    waiter: &'a Waiter<'a>,
    timeout: Duration,
}

impl<'a, S: ScreenService> CaptureExecutor<'a, S> {
    pub fn new(service: &'a S, waiter: &'a Waiter<'a>, timeout: Duration) -> Self {
        Self {
            service,
            waiter,
            timeout,
        }
    }

    /// Captures one frame per `request` and writes it as PNG.
    pub fn capture(&self, request: &CaptureRequest) -> HelperResult<()> {
        check_output_dir(&request.output)?;

        let deadline = Deadline::after(self.timeout);
        let resolver = DisplayResolver::new(self.service, self.waiter, deadline);
        let display = resolver.resolve(request.display)?;
        let scale = resolver.scale_for(&display);
        let config = CaptureConfig::new(&display, scale, request.region);
        log::debug!(
            "capture: display #{} at {}x, {}x{} px, source {:?}",
            display.index,
            scale,
            config.width,
            config.height,
            config.source_rect
        );

        let frame = match self.waiter.call(deadline.instant(), |done| {
            self.service.capture_frame(&display.platform, &config, done)
        }) {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                log::debug!("capture: platform error: {:?}", err);
                return Err(err.into());
            }
            None => {
                return Err(HelperError::PermissionTimeout {
                    secs: deadline.budget_secs(),
                })
            }
        };

        self.service
            .write_png(frame, &request.output)
            .map_err(|failure| {
                let path = request.output.clone();
                match failure {
                    WriteFailure::Create => HelperError::WriteCreate { path },
                    WriteFailure::Finalize => HelperError::WriteFinalize { path },
                }
            })?;
        log::info!("capture: wrote {}", request.output.display());
        Ok(())
    }
}

/// Fails with `InvalidPath` unless the parent directory of `output` exists.
///
/// A bare file name has an empty parent and refers to the working directory.
pub fn check_output_dir(output: &Path) -> HelperResult<()> {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
            Err(HelperError::InvalidPath {
                dir: dir.to_path_buf(),
            })
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
