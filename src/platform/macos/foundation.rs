//! Objective-C plumbing shared by the macOS backend.

use std::ffi::{c_char, CStr, CString};

use objc::runtime::{Class, Object};
use objc::{class, msg_send, sel, sel_impl};

use crate::platform::PlatformError;

pub type Id = *mut Object;

/// Looks up an Objective-C class, failing if this OS release lacks it.
pub fn class_named(name: &str) -> Result<&'static Class, PlatformError> {
    Class::get(name)
        .ok_or_else(|| PlatformError::new(format!("{name} is not available on this system")))
}

/// Creates an autoreleased `NSString`. Strings with interior NULs become empty.
pub unsafe fn ns_string(s: &str) -> Id {
    let c = CString::new(s).unwrap_or_default();
    msg_send![class!(NSString), stringWithUTF8String: c.as_ptr()]
}

/// Copies an `NSString` into a Rust `String`; null yields an empty string.
pub unsafe fn rust_string(s: Id) -> String {
    if s.is_null() {
        return String::new();
    }
    let utf8: *const c_char = msg_send![s, UTF8String];
    if utf8.is_null() {
        return String::new();
    }
    CStr::from_ptr(utf8).to_string_lossy().into_owned()
}

/// Converts an `NSError` into a `PlatformError`, keeping domain and code.
pub unsafe fn platform_error(error: Id) -> PlatformError {
    let domain: Id = msg_send![error, domain];
    let code: isize = msg_send![error, code];
    let description: Id = msg_send![error, localizedDescription];
    PlatformError::with_code(rust_string(domain), code as i64, rust_string(description))
}

// ---------------------------------------------------------------------------
// Ownership wrappers
// ---------------------------------------------------------------------------

/// A +1 reference to an Objective-C object, released on drop.
///
/// The objects held here (SCDisplay, SCContentFilter, SCStreamConfiguration)
/// are immutable once handed to ScreenCaptureKit and may be sent between the
/// calling thread and completion-handler queues.
pub struct Retained(Id);
unsafe impl Send for Retained {}

impl Retained {
    /// Takes an additional reference to `obj`.
    pub unsafe fn retain(obj: Id) -> Self {
        let obj: Id = msg_send![obj, retain];
        Retained(obj)
    }

    /// Adopts a reference the caller already owns (from `new`, `alloc`/`init`).
    pub unsafe fn from_owned(obj: Id) -> Self {
        Retained(obj)
    }

    pub fn as_ptr(&self) -> Id {
        self.0
    }
}

impl Drop for Retained {
    fn drop(&mut self) {
        unsafe {
            let _: () = msg_send![self.0, release];
        }
    }
}

/// Drains autoreleased objects created while it is alive.
pub struct AutoreleasePool(Id);

impl AutoreleasePool {
    pub fn new() -> Self {
        let pool: Id = unsafe { msg_send![class!(NSAutoreleasePool), new] };
        AutoreleasePool(pool)
    }
}

impl Drop for AutoreleasePool {
    fn drop(&mut self) {
        unsafe {
            let _: () = msg_send![self.0, drain];
        }
    }
}
