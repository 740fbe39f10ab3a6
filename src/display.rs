//! Display resolution and scale-factor lookup.
//!
//! Displays are re-enumerated on every invocation through the shareable-content
//! service. The "primary" display is the first one enumerated; the platform
//! data has no explicit primary flag.

use crate::error::{HelperError, HelperResult};
use crate::platform::{PlatformDisplay, ScreenService};
use crate::waiter::{Deadline, Waiter};

/// Scale used when a display has no entry in the physical-screen registry.
pub const FALLBACK_SCALE: u32 = 2;

/// A capturable display, as enumerated for this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayDescriptor {
    /// 1-based position in enumeration order.
    pub index: usize,
    pub platform: PlatformDisplay,
}

impl DisplayDescriptor {
    pub fn id(&self) -> u32 {
        self.platform.id
    }

    /// Logical width in points.
    pub fn width(&self) -> u32 {
        self.platform.width
    }

    /// Logical height in points.
    pub fn height(&self) -> u32 {
        self.platform.height
    }
}

/// Enumerates displays and picks one by 1-based selector.
pub struct DisplayResolver<'a, S: ScreenService> {
    service: &'a S,
    waiter: &'a Waiter<'a>,
    deadline: Deadline,
}

impl<'a, S: ScreenService> DisplayResolver<'a, S> {
    /// Enumeration waits no later than `deadline`.
    pub fn new(service: &'a S, waiter: &'a Waiter<'a>, deadline: Deadline) -> Self {
        Self {
            service,
            waiter,
            deadline,
        }
    }

    /// Enumerates the displays currently known to the platform.
    ///
    /// Fails with `PermissionTimeout` if the platform never calls back, which is
    /// how a missing Screen Recording grant usually shows up, and with
    /// `NoDisplays` if the enumeration succeeds but is empty.
    pub fn displays(&self) -> HelperResult<Vec<DisplayDescriptor>> {
        let listed = self
            .waiter
            .call(self.deadline.instant(), |done| self.service.shareable_displays(done));

        let displays = match listed {
            Some(Ok(displays)) => displays,
            Some(Err(err)) => {
                log::debug!("display: enumeration failed: {err}");
                return Err(err.into());
            }
            None => {
                return Err(HelperError::PermissionTimeout {
                    secs: self.deadline.budget_secs(),
                })
            }
        };

        log::debug!("display: enumerated {} display(s)", displays.len());
        if displays.is_empty() {
            return Err(HelperError::NoDisplays);
        }
        Ok(displays
            .into_iter()
            .enumerate()
            .map(|(i, platform)| DisplayDescriptor {
                index: i + 1,
                platform,
            })
            .collect())
    }

    /// Enumerates displays and returns the selected one.
    pub fn resolve(&self, selector: Option<usize>) -> HelperResult<DisplayDescriptor> {
        let displays = self.displays()?;
        let display = select(&displays, selector)?;
        log::debug!(
            "display: selected #{} (id {}, {}x{} pt)",
            display.index,
            display.id(),
            display.width(),
            display.height()
        );
        Ok(display)
    }

    /// Backing scale of `display`; see [`scale_for`].
    pub fn scale_for(&self, display: &DisplayDescriptor) -> u32 {
        scale_for(self.service, display)
    }
}

/// Picks a display by 1-based `selector`, or the first one when `None`.
pub fn select(
    displays: &[DisplayDescriptor],
    selector: Option<usize>,
) -> HelperResult<DisplayDescriptor> {
    let Some(first) = displays.first() else {
        return Err(HelperError::NoDisplays);
    };
    match selector {
        None => Ok(*first),
        Some(n) if (1..=displays.len()).contains(&n) => Ok(displays[n - 1]),
        Some(n) => Err(HelperError::DisplayNotFound {
            requested: n,
            available: displays.len(),
        }),
    }
}

/// Device-pixel multiplier for `display`, matched by platform identifier
/// against the physical-screen registry.
///
/// Returns `FALLBACK_SCALE` when the registry has no matching entry.
pub fn scale_for<S: ScreenService>(service: &S, display: &DisplayDescriptor) -> u32 {
    let registry = service.screen_scales();
    match registry.iter().find(|screen| screen.id == display.id()) {
        Some(screen) => {
            let scale = (screen.backing_scale as u32).clamp(1, 3);
            log::debug!("display: id {} has backing scale {}", display.id(), scale);
            scale
        }
        None => {
            log::debug!(
                "display: id {} not in screen registry ({} entries), using {}",
                display.id(),
                registry.len(),
                FALLBACK_SCALE
            );
            FALLBACK_SCALE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
