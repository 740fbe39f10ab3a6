//! Screen Recording and Accessibility permission checks.
//!
//! There is no direct "is granted" query for Screen Recording, so it is probed
//! by enumerating shareable displays under a short bound: at least one display
//! within the bound means granted. This conflates "denied" with "no display
//! attached"; both report as not granted.
//!
//! Accessibility is a direct, synchronous trust-state query.

use std::io::{self, Write};
use std::time::Duration;

use crate::error::Guidance;
use crate::platform::{PermissionService, ScreenService};
use crate::waiter::{Deadline, Waiter};

/// Default bound on the Screen Recording probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Screen Recording deep link, available on macOS 13 and later.
pub const SCREEN_CAPTURE_SETTINGS_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_ScreenCapture";

/// General Security & Privacy pane for older releases.
pub const SECURITY_SETTINGS_URL: &str = "x-apple.systempreferences:com.apple.preference.security";

/// Both permissions, evaluated fresh on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionState {
    pub screen_capture: bool,
    pub accessibility: bool,
}

impl PermissionState {
    pub fn all_granted(&self) -> bool {
        self.screen_capture && self.accessibility
    }
}

pub struct PermissionOracle<'a, P> {
    platform: &'a P,
    waiter: &'a Waiter<'a>,
    probe_timeout: Duration,
}

impl<'a, P: ScreenService + PermissionService> PermissionOracle<'a, P> {
    pub fn new(platform: &'a P, waiter: &'a Waiter<'a>, probe_timeout: Duration) -> Self {
        Self {
            platform,
            waiter,
            probe_timeout,
        }
    }

    /// Reads both permissions without prompting.
    pub fn check(&self) -> PermissionState {
        let state = PermissionState {
            screen_capture: self.screen_capture_granted(),
            accessibility: self.platform.accessibility_trusted(false),
        };
        log::debug!("permissions: {:?}", state);
        state
    }

    fn screen_capture_granted(&self) -> bool {
        let deadline = Deadline::after(self.probe_timeout);
        match self
            .waiter
            .call(deadline.instant(), |done| self.platform.shareable_displays(done))
        {
            Some(Ok(displays)) => !displays.is_empty(),
            Some(Err(err)) => {
                log::debug!("permissions: enumeration failed: {err}");
                false
            }
            None => {
                log::debug!("permissions: enumeration timed out");
                false
            }
        }
    }

    /// Opens the privacy settings and triggers the accessibility prompt.
    ///
    /// Best effort: returns without waiting for the user's choice.
    pub fn request(&self) {
        let url = if self.platform.os_at_least(13, 0) {
            SCREEN_CAPTURE_SETTINGS_URL
        } else {
            SECURITY_SETTINGS_URL
        };
        if let Err(err) = self.platform.open_settings(url) {
            log::warn!("permissions: could not open {url}: {err}");
        }
        let trusted = self.platform.accessibility_trusted(true);
        log::debug!("permissions: accessibility trusted after prompt: {trusted}");
    }
}

/// Prints one line per permission and, if anything is missing, how to fix it.
pub fn write_report(
    out: &mut dyn Write,
    state: &PermissionState,
    guidance: &Guidance,
) -> io::Result<()> {
    for (name, granted) in [
        ("Screen Recording", state.screen_capture),
        ("Accessibility", state.accessibility),
    ] {
        if granted {
            writeln!(out, "✅ {name} permission granted")?;
        } else {
            writeln!(out, "❌ {name} permission NOT granted")?;
        }
    }

    if !state.all_granted() {
        writeln!(out)?;
        writeln!(out, "To grant permissions:")?;
        writeln!(
            out,
            "  System Settings → Privacy & Security → Screen Recording/Accessibility"
        )?;
        writeln!(out, "  Enable: {}", guidance.app_name)?;
        writeln!(out)?;
        writeln!(out, "Or run: {} request-permission", guidance.program)?;
    }
    Ok(())
}

/// Prints the steps the user has to take once settings open.
pub fn write_request_instructions(out: &mut dyn Write, guidance: &Guidance) -> io::Result<()> {
    writeln!(out, "Opening System Settings to grant permissions...")?;
    writeln!(out)?;
    writeln!(out, "Please enable:")?;
    writeln!(
        out,
        "  1. Privacy & Security → Screen Recording → {}",
        guidance.app_name
    )?;
    writeln!(
        out,
        "  2. Privacy & Security → Accessibility → {}",
        guidance.app_name
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "Then run `{} check-permissions` to confirm.",
        guidance.program
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakePlatform, Outcome};
    use crate::platform::PlatformError;
    use std::time::Instant;

    fn guidance() -> Guidance {
        Guidance {
            app_name: "DesktopControlHelper".into(),
            program: "helper".into(),
        }
    }

    #[test]
    fn both_granted() {
        let fake = FakePlatform::with_displays(1);
        let waiter = fake.waiter();
        let oracle = PermissionOracle::new(&fake, &waiter, PROBE_TIMEOUT);
        let state = oracle.check();
        assert!(state.all_granted());
        // Checking never prompts.
        assert_eq!(fake.prompts(), vec![false]);
        assert!(fake.opened().is_empty());
    }

    #[test]
    fn no_displays_reads_as_not_granted() {
        let fake = FakePlatform::with_displays(0);
        let waiter = fake.waiter();
        let oracle = PermissionOracle::new(&fake, &waiter, PROBE_TIMEOUT);
        assert!(!oracle.check().screen_capture);
    }

    #[test]
    fn enumeration_error_reads_as_not_granted() {
        let mut fake = FakePlatform::with_displays(1);
        fake.enumeration = Outcome::Ready(Err(PlatformError::new("declined")));
        let waiter = fake.waiter();
        let oracle = PermissionOracle::new(&fake, &waiter, PROBE_TIMEOUT);
        assert!(!oracle.check().screen_capture);
    }

    #[test]
    fn silent_enumeration_reads_as_not_granted_after_the_bound() {
        let mut fake = FakePlatform::with_displays(1);
        fake.enumeration = Outcome::Never;
        let waiter = fake.waiter();
        let bound = Duration::from_millis(150);
        let oracle = PermissionOracle::new(&fake, &waiter, bound);

        let started = Instant::now();
        let state = oracle.check();
        assert!(!state.screen_capture);
        assert!(state.accessibility);
        assert!(started.elapsed() >= bound);
    }

    #[test]
    fn default_probe_timeout_is_five_seconds() {
        assert_eq!(PROBE_TIMEOUT, Duration::from_secs(5));
    }

    #[test]
    fn request_uses_deep_link_on_newer_systems() {
        let fake = FakePlatform::with_displays(1);
        let waiter = fake.waiter();
        PermissionOracle::new(&fake, &waiter, PROBE_TIMEOUT).request();
        assert_eq!(fake.opened(), vec![SCREEN_CAPTURE_SETTINGS_URL.to_string()]);
        assert_eq!(fake.prompts(), vec![true]);
    }

    #[test]
    fn request_falls_back_to_security_pane() {
        let mut fake = FakePlatform::with_displays(1);
        fake.os_version = (12, 6);
        let waiter = fake.waiter();
        PermissionOracle::new(&fake, &waiter, PROBE_TIMEOUT).request();
        assert_eq!(fake.opened(), vec![SECURITY_SETTINGS_URL.to_string()]);
    }

    #[test]
    fn report_all_granted_has_no_guidance() {
        let mut out = Vec::new();
        let state = PermissionState {
            screen_capture: true,
            accessibility: true,
        };
        write_report(&mut out, &state, &guidance()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("granted").count(), 2);
        assert!(!text.contains("NOT"));
        assert!(!text.contains("To grant permissions"));
    }

    #[test]
    fn report_missing_permission_prints_guidance() {
        let mut out = Vec::new();
        let state = PermissionState {
            screen_capture: true,
            accessibility: false,
        };
        write_report(&mut out, &state, &guidance()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("✅ Screen Recording permission granted"));
        assert!(text.contains("❌ Accessibility permission NOT granted"));
        assert!(text.contains("Enable: DesktopControlHelper"));
        assert!(text.contains("Or run: helper request-permission"));
    }
}
