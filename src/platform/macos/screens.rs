//! Physical-screen registry via `NSScreen`.

use objc::{msg_send, sel, sel_impl};

use super::foundation::{class_named, ns_string, AutoreleasePool, Id};
use crate::platform::ScreenScale;

#[link(name = "AppKit", kind = "framework")]
extern "C" {}

/// Key in `-[NSScreen deviceDescription]` holding the `CGDirectDisplayID`.
const SCREEN_NUMBER_KEY: &str = "NSScreenNumber";

/// Returns `(display id, backingScaleFactor)` for every attached screen.
pub fn screen_scales() -> Vec<ScreenScale> {
    let _pool = AutoreleasePool::new();
    let Ok(screen_class) = class_named("NSScreen") else {
        return Vec::new();
    };

    unsafe {
        let screens: Id = msg_send![screen_class, screens];
        if screens.is_null() {
            return Vec::new();
        }
        let key = ns_string(SCREEN_NUMBER_KEY);
        let count: usize = msg_send![screens, count];
        (0..count)
            .filter_map(|i| {
                let screen: Id = msg_send![screens, objectAtIndex: i];
                let description: Id = msg_send![screen, deviceDescription];
                let number: Id = msg_send![description, objectForKey: key];
                if number.is_null() {
                    return None;
                }
                let id: u32 = msg_send![number, unsignedIntValue];
                let backing_scale: f64 = msg_send![screen, backingScaleFactor];
                Some(ScreenScale { id, backing_scale })
            })
            .collect()
    }
}
