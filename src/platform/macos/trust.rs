//! Accessibility trust, the settings opener and the OS version check.

use core_foundation::base::TCFType;
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::{CFString, CFStringRef};
use objc::runtime::{BOOL, NO};
use objc::{msg_send, sel, sel_impl};

use super::foundation::{class_named, ns_string, AutoreleasePool, Id};
use crate::platform::PlatformError;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    /// Returns true if this process is trusted for Accessibility. With the
    /// prompt option set, macOS shows its consent dialog when it is not.
    fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;

    static kAXTrustedCheckOptionPrompt: CFStringRef;
}

pub fn accessibility_trusted(prompt: bool) -> bool {
    unsafe {
        let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
        let options = CFDictionary::from_CFType_pairs(&[(key, CFBoolean::from(prompt))]);
        AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef())
    }
}

/// `-[NSWorkspace openURL:]`
pub fn open_settings(url: &str) -> Result<(), PlatformError> {
    let _pool = AutoreleasePool::new();
    let workspace_class = class_named("NSWorkspace")?;
    let url_class = class_named("NSURL")?;

    unsafe {
        let workspace: Id = msg_send![workspace_class, sharedWorkspace];
        let target: Id = msg_send![url_class, URLWithString: ns_string(url)];
        if target.is_null() {
            return Err(PlatformError::new(format!("invalid settings URL: {url}")));
        }
        let opened: BOOL = msg_send![workspace, openURL: target];
        if opened == NO {
            return Err(PlatformError::new(format!("System Settings did not open {url}")));
        }
    }
    Ok(())
}

#[repr(C)]
struct NSOperatingSystemVersion {
    major: isize,
    minor: isize,
    patch: isize,
}

/// `-[NSProcessInfo isOperatingSystemAtLeastVersion:]`
pub fn os_at_least(major: u32, minor: u32) -> bool {
    let Ok(info_class) = class_named("NSProcessInfo") else {
        return false;
    };
    let version = NSOperatingSystemVersion {
        major: major as isize,
        minor: minor as isize,
        patch: 0,
    };
    unsafe {
        let info: Id = msg_send![info_class, processInfo];
        let at_least: BOOL = msg_send![info, isOperatingSystemAtLeastVersion: version];
        at_least != NO
    }
}
