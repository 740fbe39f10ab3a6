//! Display enumeration and single-frame capture via ScreenCaptureKit.
//!
//! Both calls are asynchronous: ScreenCaptureKit invokes the completion block
//! on one of its own queues. The block takes the `Completion` out of a mutex
//! so a second invocation, which the framework does not promise never
//! happens, is ignored.
//!
//! Enumeration keeps a retained reference to every `SCDisplay` it returned,
//! keyed by display ID, so a later `capture_frame` can build its content
//! filter without enumerating again.
//!
//! Required permission: Screen Recording. When it is missing the completion
//! either carries `SCStreamErrorUserDeclined` or never fires at all.

use std::ffi::c_void;
use std::sync::{Arc, Mutex};

use block::ConcreteBlock;
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use objc::runtime::{Class, BOOL, NO, YES};
use objc::{class, msg_send, sel, sel_impl};

use super::foundation::{class_named, platform_error, AutoreleasePool, Id, Retained};
use crate::capture::CaptureConfig;
use crate::platform::{Completion, PlatformDisplay, PlatformError};

#[link(name = "ScreenCaptureKit", kind = "framework")]
extern "C" {}

// ---------------------------------------------------------------------------
// Raw FFI
// ---------------------------------------------------------------------------

type CGImageRef = *mut c_void;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGImageRetain(image: CGImageRef) -> CGImageRef;
    fn CGImageRelease(image: CGImageRef);
    fn CGImageGetWidth(image: CGImageRef) -> usize;
    fn CGImageGetHeight(image: CGImageRef) -> usize;
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// SCDisplay objects from the latest enumeration, by display ID.
pub type DisplayCache = Arc<Mutex<Vec<(u32, Retained)>>>;

/// A captured frame; owns one reference to the `CGImage`.
pub struct CapturedImage(CGImageRef);

/// CGImage is immutable and documented as safe to use from any thread.
unsafe impl Send for CapturedImage {}

impl CapturedImage {
    unsafe fn retain(image: CGImageRef) -> Self {
        CapturedImage(CGImageRetain(image))
    }

    pub fn as_ptr(&self) -> CGImageRef {
        self.0
    }

    pub fn size(&self) -> (usize, usize) {
        unsafe { (CGImageGetWidth(self.0), CGImageGetHeight(self.0)) }
    }
}

impl Drop for CapturedImage {
    fn drop(&mut self) {
        unsafe { CGImageRelease(self.0) };
    }
}

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}

fn objc_bool(value: bool) -> BOOL {
    if value {
        YES
    } else {
        NO
    }
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

/// `+[SCShareableContent getShareableContentExcludingDesktopWindows:onScreenWindowsOnly:completionHandler:]`
pub fn shareable_displays(cache: &DisplayCache, done: Completion<Vec<PlatformDisplay>>) {
    let _pool = AutoreleasePool::new();
    let content_class = match class_named("SCShareableContent") {
        Ok(cls) => cls,
        Err(err) => return done(Err(err)),
    };

    let cache = Arc::clone(cache);
    let done = Mutex::new(Some(done));
    let handler = ConcreteBlock::new(move |content: Id, error: Id| {
        let Some(done) = take(&done) else {
            return;
        };
        if !error.is_null() {
            done(Err(unsafe { platform_error(error) }));
            return;
        }

        let found = unsafe { read_displays(content) };
        let displays = found.iter().map(|(display, _)| *display).collect();
        if let Ok(mut slot) = cache.lock() {
            *slot = found
                .into_iter()
                .map(|(display, object)| (display.id, object))
                .collect();
        }
        done(Ok(displays));
    });
    let handler = handler.copy();

    unsafe {
        let _: () = msg_send![content_class,
            getShareableContentExcludingDesktopWindows: NO
            onScreenWindowsOnly: YES
            completionHandler: &*handler];
    }
}

unsafe fn read_displays(content: Id) -> Vec<(PlatformDisplay, Retained)> {
    if content.is_null() {
        return Vec::new();
    }
    let displays: Id = msg_send![content, displays];
    if displays.is_null() {
        return Vec::new();
    }
    let count: usize = msg_send![displays, count];
    (0..count)
        .map(|i| {
            let display: Id = msg_send![displays, objectAtIndex: i];
            let id: u32 = msg_send![display, displayID];
            let width: isize = msg_send![display, width];
            let height: isize = msg_send![display, height];
            let info = PlatformDisplay {
                id,
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            };
            (info, Retained::retain(display))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// `+[SCScreenshotManager captureImageWithFilter:configuration:completionHandler:]`
pub fn capture_frame(
    cache: &DisplayCache,
    display: &PlatformDisplay,
    config: &CaptureConfig,
    done: Completion<CapturedImage>,
) {
    let _pool = AutoreleasePool::new();

    let target = cache.lock().ok().and_then(|cached| {
        cached
            .iter()
            .find(|(id, _)| *id == display.id)
            .map(|(_, object)| unsafe { Retained::retain(object.as_ptr()) })
    });
    let Some(target) = target else {
        return done(Err(PlatformError::new(format!(
            "Display {} is no longer available",
            display.id
        ))));
    };

    let (manager, filter, stream_config) = match unsafe { build_request(&target, config) } {
        Ok(parts) => parts,
        Err(err) => return done(Err(err)),
    };

    let done = Mutex::new(Some(done));
    let handler = ConcreteBlock::new(move |image: CGImageRef, error: Id| {
        let Some(done) = take(&done) else {
            return;
        };
        let result = if !error.is_null() {
            Err(unsafe { platform_error(error) })
        } else if image.is_null() {
            Err(PlatformError::new("Screen capture returned no image"))
        } else {
            Ok(unsafe { CapturedImage::retain(image) })
        };
        done(result);
    });
    let handler = handler.copy();

    unsafe {
        let _: () = msg_send![manager,
            captureImageWithFilter: filter.as_ptr()
            configuration: stream_config.as_ptr()
            completionHandler: &*handler];
    }
}

/// Builds the content filter and stream configuration for one capture.
unsafe fn build_request(
    display: &Retained,
    config: &CaptureConfig,
) -> Result<(&'static Class, Retained, Retained), PlatformError> {
    let manager = class_named("SCScreenshotManager").map_err(|_| {
        PlatformError::new("Single-frame capture requires macOS 14 or later (SCScreenshotManager)")
    })?;
    let filter_class = class_named("SCContentFilter")?;
    let config_class = class_named("SCStreamConfiguration")?;

    let no_windows: Id = msg_send![class!(NSArray), array];
    let filter: Id = msg_send![filter_class, alloc];
    let filter: Id = msg_send![filter, initWithDisplay: display.as_ptr() excludingWindows: no_windows];
    if filter.is_null() {
        return Err(PlatformError::new("Could not create a content filter for the display"));
    }
    let filter = Retained::from_owned(filter);

    let stream: Id = msg_send![config_class, new];
    if stream.is_null() {
        return Err(PlatformError::new("Could not create a stream configuration"));
    }
    let stream = Retained::from_owned(stream);
    let s = stream.as_ptr();
    let _: () = msg_send![s, setWidth: config.width as usize];
    let _: () = msg_send![s, setHeight: config.height as usize];
    let _: () = msg_send![s, setShowsCursor: objc_bool(config.shows_cursor)];
    // capturesAudio only exists from macOS 13.
    let has_audio: BOOL = msg_send![s, respondsToSelector: sel!(setCapturesAudio:)];
    if has_audio != NO {
        let _: () = msg_send![s, setCapturesAudio: objc_bool(config.captures_audio)];
    }
    if let Some(region) = config.source_rect {
        let rect = CGRect::new(
            &CGPoint::new(region.x, region.y),
            &CGSize::new(region.width, region.height),
        );
        let _: () = msg_send![s, setSourceRect: rect];
    }

    Ok((manager, filter, stream))
}
