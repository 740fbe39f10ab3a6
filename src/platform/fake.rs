//! Scripted in-memory platform for tests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use super::{
    Completion, EventPump, PermissionService, PlatformDisplay, PlatformError, ScreenScale,
    ScreenService, WriteFailure,
};
use crate::capture::CaptureConfig;
use crate::waiter::Waiter;

/// How a scripted asynchronous call completes.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Completes before the initiating call returns.
    Ready(Result<T, PlatformError>),
    /// Completes from another thread after a delay.
    Delayed(Duration, Result<T, PlatformError>),
    /// Never completes; the completion is kept alive so the waiter times out.
    Never,
    /// Drops the completion without calling it.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeFrame {
    pub width: u32,
    pub height: u32,
}

pub struct FakePlatform {
    pub enumeration: Outcome<Vec<PlatformDisplay>>,
    pub scales: Vec<ScreenScale>,
    pub capture: Outcome<()>,
    pub write: Result<(), WriteFailure>,
    pub accessibility: bool,
    pub os_version: (u32, u32),

    enumerations: Cell<usize>,
    captures: Cell<usize>,
    pumps: Cell<usize>,
    last_config: Cell<Option<CaptureConfig>>,
    written: RefCell<Vec<PathBuf>>,
    prompts: RefCell<Vec<bool>>,
    opened: RefCell<Vec<String>>,
    parked: RefCell<Vec<Box<dyn Any + Send>>>,
}

impl FakePlatform {
    /// `count` displays, all Retina, every call succeeding immediately.
    pub fn with_displays(count: u32) -> Self {
        let displays: Vec<PlatformDisplay> = (0..count)
            .map(|i| PlatformDisplay {
                id: 100 + i,
                width: 1440 + 100 * i,
                height: 900,
            })
            .collect();
        let scales = displays
            .iter()
            .map(|d| ScreenScale {
                id: d.id,
                backing_scale: 2.0,
            })
            .collect();
        Self {
            enumeration: Outcome::Ready(Ok(displays)),
            scales,
            capture: Outcome::Ready(Ok(())),
            write: Ok(()),
            accessibility: true,
            os_version: (14, 0),
            enumerations: Cell::new(0),
            captures: Cell::new(0),
            pumps: Cell::new(0),
            last_config: Cell::new(None),
            written: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
            opened: RefCell::new(Vec::new()),
            parked: RefCell::new(Vec::new()),
        }
    }

    /// The `i`-th (0-based) scripted display.
    pub fn display(&self, i: usize) -> PlatformDisplay {
        match &self.enumeration {
            Outcome::Ready(Ok(list)) | Outcome::Delayed(_, Ok(list)) => list[i],
            _ => panic!("enumeration is not scripted to succeed"),
        }
    }

    pub fn waiter(&self) -> Waiter<'_> {
        Waiter::new(self, Duration::from_millis(5))
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.get()
    }

    pub fn captures(&self) -> usize {
        self.captures.get()
    }

    pub fn pumps(&self) -> usize {
        self.pumps.get()
    }

    pub fn last_config(&self) -> Option<CaptureConfig> {
        self.last_config.get()
    }

    pub fn written(&self) -> Vec<PathBuf> {
        self.written.borrow().clone()
    }

    pub fn prompts(&self) -> Vec<bool> {
        self.prompts.borrow().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }

    fn complete<T: Send + 'static>(&self, outcome: Outcome<T>, done: Completion<T>) {
        match outcome {
            Outcome::Ready(result) => done(result),
            Outcome::Delayed(delay, result) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    done(result);
                });
            }
            Outcome::Never => self.parked.borrow_mut().push(Box::new(done)),
            Outcome::Dropped => drop(done),
        }
    }
}

impl EventPump for FakePlatform {
    fn pump(&self, slice: Duration) {
        self.pumps.set(self.pumps.get() + 1);
        thread::sleep(slice);
    }
}

impl ScreenService for FakePlatform {
    type Frame = FakeFrame;

    fn shareable_displays(&self, done: Completion<Vec<PlatformDisplay>>) {
        self.enumerations.set(self.enumerations.get() + 1);
        self.complete(self.enumeration.clone(), done);
    }

    fn screen_scales(&self) -> Vec<ScreenScale> {
        self.scales.clone()
    }

    fn capture_frame(
        &self,
        _display: &PlatformDisplay,
        config: &CaptureConfig,
        done: Completion<FakeFrame>,
    ) {
        self.captures.set(self.captures.get() + 1);
        self.last_config.set(Some(*config));
        let frame = FakeFrame {
            width: config.width,
            height: config.height,
        };
        let outcome = match self.capture.clone() {
            Outcome::Ready(r) => Outcome::Ready(r.map(|()| frame)),
            Outcome::Delayed(d, r) => Outcome::Delayed(d, r.map(|()| frame)),
            Outcome::Never => Outcome::Never,
            Outcome::Dropped => Outcome::Dropped,
        };
        self.complete(outcome, done);
    }

    fn write_png(&self, _frame: FakeFrame, path: &Path) -> Result<(), WriteFailure> {
        self.write?;
        self.written.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

impl PermissionService for FakePlatform {
    fn accessibility_trusted(&self, prompt: bool) -> bool {
        self.prompts.borrow_mut().push(prompt);
        self.accessibility
    }

    fn open_settings(&self, url: &str) -> Result<(), PlatformError> {
        self.opened.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn os_at_least(&self, major: u32, minor: u32) -> bool {
        self.os_version >= (major, minor)
    }
}
