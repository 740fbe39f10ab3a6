//! PNG encoding through ImageIO.

use std::ffi::c_void;
use std::path::Path;
use std::ptr;

use core_foundation::base::{CFRelease, TCFType};
use core_foundation::dictionary::CFDictionaryRef;
use core_foundation::string::{CFString, CFStringRef};
use core_foundation::url::{CFURLRef, CFURL};

use super::screencapture::CapturedImage;
use crate::platform::WriteFailure;

/// Uniform type identifier for PNG.
const PNG_TYPE: &str = "public.png";

type CGImageDestinationRef = *mut c_void;

#[link(name = "ImageIO", kind = "framework")]
extern "C" {
    /// Returns null if the destination cannot be created for `url`.
    fn CGImageDestinationCreateWithURL(
        url: CFURLRef,
        type_identifier: CFStringRef,
        count: usize,
        options: CFDictionaryRef,
    ) -> CGImageDestinationRef;

    fn CGImageDestinationAddImage(
        dest: CGImageDestinationRef,
        image: *mut c_void,
        properties: CFDictionaryRef,
    );

    /// Writes the image data; false on I/O failure.
    fn CGImageDestinationFinalize(dest: CGImageDestinationRef) -> bool;
}

pub fn write_png(image: &CapturedImage, path: &Path) -> Result<(), WriteFailure> {
    let Some(url) = CFURL::from_path(path, false) else {
        log::debug!("platform: cannot form a file URL for {}", path.display());
        return Err(WriteFailure::Create);
    };
    let png = CFString::from_static_string(PNG_TYPE);

    let (width, height) = image.size();
    log::debug!(
        "platform: encoding {}x{} frame to {}",
        width,
        height,
        path.display()
    );

    unsafe {
        let dest = CGImageDestinationCreateWithURL(
            url.as_concrete_TypeRef(),
            png.as_concrete_TypeRef(),
            1,
            ptr::null(),
        );
        if dest.is_null() {
            return Err(WriteFailure::Create);
        }
        CGImageDestinationAddImage(dest, image.as_ptr(), ptr::null());
        let finished = CGImageDestinationFinalize(dest);
        CFRelease(dest as *const c_void);
        if finished {
            Ok(())
        } else {
            Err(WriteFailure::Finalize)
        }
    }
}
