//! Platform abstraction layer.
//!
//! Defines the `ScreenService` and `PermissionService` traits for the
//! operating-system services the helper consumes as black boxes: the
//! shareable-content enumeration, single-frame capture, image encoding, the
//! physical-screen registry, the accessibility trust-state API and the
//! settings-URL opener.
//!
//! `SystemPlatform` is the backend for the current target: ScreenCaptureKit
//! and friends on macOS, and a backend that reports every service as
//! unavailable elsewhere.

#[cfg(test)]
pub mod fake;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod unsupported;

#[cfg(target_os = "macos")]
pub use macos::SystemPlatform;
#[cfg(not(target_os = "macos"))]
pub use unsupported::SystemPlatform;

use std::path::Path;
use std::time::Duration;

use crate::capture::CaptureConfig;

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

/// A failure reported by a platform service.
///
/// `domain` and `code` are filled in when the platform delivers a structured
/// error (an `NSError` on macOS); `message` is its localized description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
    pub domain: Option<String>,
    pub code: Option<i64>,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            domain: None,
            code: None,
        }
    }

    pub fn with_code(domain: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            domain: Some(domain.into()),
            code: Some(code),
        }
    }
}

/// A display as reported by the shareable-content service, in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDisplay {
    /// Opaque platform display identifier (`CGDirectDisplayID` on macOS).
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// One entry of the physical-screen registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenScale {
    pub id: u32,
    pub backing_scale: f64,
}

/// Why a frame could not be encoded to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// The destination could not be created (bad path or permissions).
    Create,
    /// The encoder could not finish writing (disk full, I/O failure).
    Finalize,
}

/// Callback invoked exactly once when an asynchronous platform call finishes.
///
/// May be invoked on any thread, including before the initiating call returns.
pub type Completion<T> = Box<dyn FnOnce(Result<T, PlatformError>) + Send + 'static>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The platform callback/event mechanism the waiting thread must keep serviced.
pub trait EventPump {
    /// Services pending callbacks for at most `slice`, then returns.
    fn pump(&self, slice: Duration);
}

/// Display enumeration, capture and encoding.
pub trait ScreenService: EventPump {
    /// A captured still frame, owned until it is written.
    type Frame: Send + 'static;

    /// Starts enumerating capturable displays, in platform order.
    fn shareable_displays(&self, done: Completion<Vec<PlatformDisplay>>);

    /// Reads the physical-screen registry. Synchronous.
    fn screen_scales(&self) -> Vec<ScreenScale>;

    /// Starts a single-frame capture of `display` with `config`.
    ///
    /// `display` must come from the most recent `shareable_displays` result.
    fn capture_frame(
        &self,
        display: &PlatformDisplay,
        config: &CaptureConfig,
        done: Completion<Self::Frame>,
    );

    /// Encodes `frame` as PNG at `path`.
    fn write_png(&self, frame: Self::Frame, path: &Path) -> Result<(), WriteFailure>;
}

/// Accessibility trust state and the settings opener.
pub trait PermissionService {
    /// Queries the accessibility trust state; `prompt` asks the OS to show
    /// its consent dialog when access is missing.
    fn accessibility_trusted(&self, prompt: bool) -> bool;

    /// Opens a settings deep link.
    fn open_settings(&self, url: &str) -> Result<(), PlatformError>;

    /// True if the running OS version is at least `major.minor`.
    fn os_at_least(&self, major: u32, minor: u32) -> bool;
}
