//! Command router.
//!
//! Parses the command keyword and its arguments, hands the work to the matching
//! component, and turns the outcome into report lines and a process exit code:
//! 0 on success, 1 on any failure, or the delegate's own code for `automate`.
//! Output goes through the writers passed to `run` so tests can capture it.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::automation::{self, Locator};
use crate::capture::{CaptureExecutor, CaptureRequest, Region};
use crate::config::Config;
use crate::display::{self, DisplayResolver, FALLBACK_SCALE};
use crate::error::{Guidance, HelperError};
use crate::permissions::{self, PermissionOracle};
use crate::platform::{PermissionService, ScreenService};
use crate::waiter::{Deadline, Waiter};

const ABOUT: &str = "Desktop Control Helper - TCC-privileged wrapper for desktop automation";

#[derive(Parser, Debug)]
#[command(
    name = "desktop-control-helper",
    about = ABOUT,
    version,
    disable_help_flag = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture the screen using ScreenCaptureKit (native)
    #[command(visible_alias = "screencapture", args_override_self = true)]
    Capture(CaptureArgs),

    /// Execute the automation binary with the given arguments
    #[command(visible_alias = "cliclick", disable_help_flag = true)]
    Automate {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Verify Screen Recording and Accessibility permissions
    CheckPermissions,

    /// Open System Settings to grant permissions
    RequestPermission,

    /// Print the display's backing scale factor (1, 2, or 3); -D <n> picks a display
    #[command(disable_help_flag = true)]
    GetScaleFactor {
        #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Show this help message
    #[command(short_flag = 'h', long_flag = "help")]
    Help,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Silent mode (always on; accepted for compatibility)
    #[arg(short = 'x')]
    silent: bool,

    /// Capture a specific display (1-based index)
    #[arg(short = 'D', value_name = "display")]
    display: Option<usize>,

    /// Capture a specific region, in points
    #[arg(short = 'R', value_name = "x,y,w,h", allow_hyphen_values = true)]
    region: Option<Region>,

    /// Output file path; the last one given wins
    #[arg(value_name = "output.png")]
    output: Vec<PathBuf>,
}

/// Runs one command and returns the process exit code.
pub fn run<I, P>(
    args: I,
    platform: &P,
    config: &Config,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32
where
    I: IntoIterator<Item = OsString>,
    P: ScreenService + PermissionService,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let program = args
        .first()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "desktop-control-helper".into());
    let router = Router {
        platform,
        config,
        guidance: Guidance {
            app_name: config.app_name.clone(),
            program,
        },
    };

    let code = match Cli::try_parse_from(&args) {
        Ok(cli) => router.dispatch(cli.command, out, err),
        Err(e) => router.parse_failure(&e, &args, out, err),
    };
    let _ = out.flush();
    let _ = err.flush();
    code
}

/// The display named by the last well-formed `-D <n>` pair.
///
/// Anything else is ignored so that `get-scale-factor` never fails on its
/// arguments.
fn scale_selector(args: &[OsString]) -> Option<usize> {
    args.windows(2)
        .filter(|pair| pair[0] == "-D")
        .filter_map(|pair| pair[1].to_str()?.trim().parse::<usize>().ok())
        .last()
}

struct Router<'a, P> {
    platform: &'a P,
    config: &'a Config,
    guidance: Guidance,
}

impl<'a, P: ScreenService + PermissionService> Router<'a, P> {
    fn dispatch(&self, command: Option<Command>, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        let waiter = Waiter::new(self.platform, self.config.poll_interval());

        match command {
            None => {
                let _ = write!(out, "{}", self.usage());
                1
            }
            Some(Command::Help) => {
                let _ = write!(out, "{}", self.usage());
                0
            }
            Some(Command::Capture(args)) => self.capture(&waiter, args, err),
            Some(Command::Automate { args }) => self.automate(&args, err),
            Some(Command::CheckPermissions) => {
                let oracle =
                    PermissionOracle::new(self.platform, &waiter, self.config.probe_timeout());
                let state = oracle.check();
                let _ = permissions::write_report(out, &state, &self.guidance);
                if state.all_granted() {
                    0
                } else {
                    1
                }
            }
            Some(Command::RequestPermission) => {
                let _ = permissions::write_request_instructions(out, &self.guidance);
                let _ = out.flush();
                PermissionOracle::new(self.platform, &waiter, self.config.probe_timeout())
                    .request();
                0
            }
            Some(Command::GetScaleFactor { args }) => {
                let selector = scale_selector(&args);
                log::debug!("cli: scale factor for {:?} from {:?}", selector, args);
                let _ = writeln!(out, "{}", self.scale_factor(&waiter, selector));
                0
            }
        }
    }

    fn capture(&self, waiter: &Waiter<'_>, args: CaptureArgs, err: &mut dyn Write) -> i32 {
        if args.silent {
            log::debug!("cli: -x accepted; capture is always silent");
        }
        let Some(output) = args.output.last().cloned() else {
            let code = self.report(
                &HelperError::invalid_argument("No output file path specified"),
                err,
            );
            let _ = writeln!(
                err,
                "Usage: {} capture [-x] [-D display] [-R x,y,w,h] <output.png>",
                self.guidance.program
            );
            return code;
        };

        let request = CaptureRequest {
            display: args.display,
            region: args.region,
            output,
        };
        let executor = CaptureExecutor::new(self.platform, waiter, self.config.capture_timeout());
        match executor.capture(&request) {
            Ok(()) => 0,
            Err(e) => self.report(&e, err),
        }
    }

    fn automate(&self, args: &[OsString], err: &mut dyn Write) -> i32 {
        let settings = &self.config.automation;
        let result = Locator::from_env(settings)
            .require()
            .and_then(|path| automation::run(&settings.binary, &path, args));
        match result {
            Ok(()) => 0,
            // The delegate has already reported its own failure.
            Err(HelperError::AutomationExit { code }) => code,
            Err(e) => self.report(&e, err),
        }
    }

    /// Scale of the selected display; never fails.
    ///
    /// An out-of-range selector falls back to the first display, and any
    /// enumeration failure or timeout yields `FALLBACK_SCALE`.
    fn scale_factor(&self, waiter: &Waiter<'_>, selector: Option<usize>) -> u32 {
        let deadline = Deadline::after(self.config.probe_timeout());
        let resolver = DisplayResolver::new(self.platform, waiter, deadline);
        let displays = match resolver.displays() {
            Ok(displays) => displays,
            Err(e) => {
                log::debug!("cli: scale factor unavailable ({e}), using {FALLBACK_SCALE}");
                return FALLBACK_SCALE;
            }
        };
        let target = display::select(&displays, selector)
            .or_else(|_| display::select(&displays, None))
            .ok();
        match target {
            Some(display) => resolver.scale_for(&display),
            None => FALLBACK_SCALE,
        }
    }

    fn parse_failure(
        &self,
        e: &clap::Error,
        args: &[OsString],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> i32 {
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = write!(out, "{}", e.render());
                0
            }
            ErrorKind::InvalidSubcommand => {
                let name = args
                    .get(1)
                    .map(|a| a.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let _ = writeln!(err, "Error: Unknown command '{name}'");
                let _ = write!(out, "{}", self.usage());
                1
            }
            _ => {
                let _ = write!(err, "{}", e.render());
                1
            }
        }
    }

    /// Prints an error and its remediation; returns the exit code.
    fn report(&self, e: &HelperError, err: &mut dyn Write) -> i32 {
        if let HelperError::PermissionDenied { detail } = e {
            log::debug!("cli: platform said: {detail}");
        }
        let _ = writeln!(err, "Error: {e}");
        for line in e.remediation(&self.guidance) {
            let _ = writeln!(err, "{line}");
        }
        e.exit_code()
    }

    fn usage(&self) -> String {
        let program = &self.guidance.program;
        let examples = format!(
            "Capture options:\n  \
             -x                  Silent mode (default, no-op)\n  \
             -D <display>        Capture specific display (1-based index)\n  \
             -R <x,y,w,h>        Capture specific region\n  \
             <output.png>        Output file path\n\n\
             Examples:\n  \
             {program} capture -x /tmp/screen.png\n  \
             {program} capture -D 1 /tmp/screen.png\n  \
             {program} capture -R 0,0,800,600 /tmp/region.png\n  \
             {program} automate c:500,300\n  \
             {program} check-permissions\n  \
             {program} get-scale-factor\n"
        );
        Cli::command()
            .bin_name(program.as_str())
            .after_help(examples)
            .render_help()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
