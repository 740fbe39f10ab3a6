//! Error taxonomy for the helper.
//!
//! Every failure is terminal for the current invocation. Components return a
//! classified `HelperError` to the command router, which prints the message,
//! any remediation lines, and exits with `exit_code()`.

use std::path::PathBuf;

use crate::platform::PlatformError;

/// ScreenCaptureKit's error domain.
const SC_STREAM_ERROR_DOMAIN: &str = "com.apple.ScreenCaptureKit.SCStreamErrorDomain";

/// `SCStreamErrorUserDeclined`: the user has not granted Screen Recording.
const SC_STREAM_ERROR_USER_DECLINED: i64 = -3801;

/// Substrings that mark a free-text platform error as a permission failure.
/// Only consulted when the error carries no structured code we recognise.
const PERMISSION_MARKERS: &[&str] = &["permission", "not authorized"];

/// Names used when printing remediation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guidance {
    /// Entry the user must enable in System Settings.
    pub app_name: String,
    /// How this executable was invoked (argv[0]).
    pub program: String,
}

/// Top-level error type for helper commands.
#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("Directory does not exist: {}", dir.display())]
    InvalidPath { dir: PathBuf },

    #[error(
        "No displays detected. If you are using a headless Mac, connect a display \
         or use a virtual display adapter."
    )]
    NoDisplays,

    #[error(
        "Display {requested} not found. You have {available} display(s). \
         Use -D 1 through -D {available}."
    )]
    DisplayNotFound { requested: usize, available: usize },

    #[error("Screen capture timed out after {secs} seconds.")]
    PermissionTimeout { secs: f64 },

    #[error("Screen Recording permission is not granted.")]
    PermissionDenied { detail: String },

    /// Any other platform failure; the platform's own text is surfaced as-is.
    #[error("{message}")]
    Platform { message: String },

    #[error("Could not create image file at {}.", path.display())]
    WriteCreate { path: PathBuf },

    #[error("Failed to write screenshot to {}.", path.display())]
    WriteFinalize { path: PathBuf },

    #[error("{binary} not found.")]
    AutomationBinaryNotFound {
        binary: String,
        install_hint: String,
    },

    #[error("Error running {binary} at {}: {source}", path.display())]
    AutomationSpawn {
        binary: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("automation binary exited with status {code}")]
    AutomationExit { code: i32 },

    #[error("Invalid config file {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

/// Result type alias using HelperError.
pub type HelperResult<T> = Result<T, HelperError>;

impl HelperError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    /// Process exit code for this failure.
    ///
    /// Everything maps to 1 except a failed delegate, whose own code is mirrored.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AutomationExit { code } => *code,
            _ => 1,
        }
    }

    /// Extra lines printed after the `Error:` line.
    pub fn remediation(&self, guidance: &Guidance) -> Vec<String> {
        let fix = format!(
            "Fix: Open System Settings > Privacy & Security > Screen Recording > Enable {}",
            guidance.app_name
        );
        let or_run = format!("Or run: {} request-permission", guidance.program);

        match self {
            Self::InvalidPath { .. } => {
                vec!["Create it first or choose a different output path.".into()]
            }
            Self::PermissionTimeout { .. } => vec![
                "This usually means Screen Recording permission is not granted.".into(),
                fix,
                or_run,
            ],
            Self::PermissionDenied { .. } => vec![fix, or_run],
            Self::Platform { .. } | Self::NoDisplays | Self::DisplayNotFound { .. } => {
                vec![or_run]
            }
            Self::WriteCreate { .. } => vec![
                "Check that the directory exists and you have write permission.".into(),
            ],
            Self::WriteFinalize { .. } => {
                vec!["The disk may be full or the path may not be writable.".into()]
            }
            Self::AutomationBinaryNotFound {
                binary,
                install_hint,
            } => vec![
                format!("{binary} is required for mouse and keyboard control."),
                format!("Install with: {install_hint}"),
            ],
            _ => Vec::new(),
        }
    }
}

impl From<PlatformError> for HelperError {
    /// Classifies a platform failure as a permission denial or a raw error.
    ///
    /// The structured domain/code is checked first. Free-text matching is the
    /// fallback for errors that carry no code we recognise; it depends on the
    /// wording of the platform's localized description.
    fn from(err: PlatformError) -> Self {
        if is_permission_failure(&err) {
            log::debug!("classify: permission failure: {:?}", err);
            Self::PermissionDenied {
                detail: err.message,
            }
        } else {
            Self::Platform {
                message: err.message,
            }
        }
    }
}

fn is_permission_failure(err: &PlatformError) -> bool {
    if err.domain.as_deref() == Some(SC_STREAM_ERROR_DOMAIN)
        && err.code == Some(SC_STREAM_ERROR_USER_DECLINED)
    {
        return true;
    }
    let text = err.message.to_lowercase();
    PERMISSION_MARKERS.iter().any(|marker| text.contains(marker))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn guidance() -> Guidance {
        Guidance {
            app_name: "DesktopControlHelper".into(),
            program: "helper".into(),
        }
    }

    #[test]
    fn user_declined_code_is_permission_denied() {
        let err = PlatformError::with_code(
            SC_STREAM_ERROR_DOMAIN,
            SC_STREAM_ERROR_USER_DECLINED,
            "The user declined TCCs for application, window, display capture",
        );
        assert!(matches!(
            HelperError::from(err),
            HelperError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn permission_text_is_permission_denied() {
        let err = PlatformError::new("The operation couldn't be completed: not authorized");
        assert!(matches!(
            HelperError::from(err),
            HelperError::PermissionDenied { .. }
        ));
        let err = PlatformError::new("Missing Permission to capture");
        assert!(matches!(
            HelperError::from(err),
            HelperError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn other_errors_keep_platform_text() {
        let err = PlatformError::with_code("NSOSStatusErrorDomain", -50, "Invalid parameter");
        match HelperError::from(err) {
            HelperError::Platform { message } => assert_eq!(message, "Invalid parameter"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn permission_errors_name_the_settings_pane() {
        let g = guidance();
        for err in [
            HelperError::PermissionTimeout { secs: 10.0 },
            HelperError::PermissionDenied {
                detail: String::new(),
            },
        ] {
            let lines = err.remediation(&g);
            assert!(lines.iter().any(|l| l.contains(
                "System Settings > Privacy & Security > Screen Recording > Enable DesktopControlHelper"
            )));
            assert!(lines
                .iter()
                .any(|l| l == "Or run: helper request-permission"));
        }
    }

    #[test]
    fn write_errors_have_distinct_remediation() {
        let g = guidance();
        let create = HelperError::WriteCreate {
            path: "/x.png".into(),
        }
        .remediation(&g);
        let finalize = HelperError::WriteFinalize {
            path: "/x.png".into(),
        }
        .remediation(&g);
        assert_ne!(create, finalize);
        assert!(finalize[0].contains("disk may be full"));
    }

    #[test]
    fn display_not_found_cites_count() {
        let err = HelperError::DisplayNotFound {
            requested: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Display 3 not found. You have 2 display(s). Use -D 1 through -D 2."
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(HelperError::NoDisplays.exit_code(), 1);
        assert_eq!(HelperError::AutomationExit { code: 7 }.exit_code(), 7);
    }
}
