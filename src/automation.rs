//! Pass-through to the external pointer/keyboard automation binary.
//!
//! The binary is not reimplemented, only located and run with the caller's
//! arguments. Running it from this process makes the Accessibility check apply
//! to this helper rather than to the calling terminal.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::AutomationConfig;
use crate::error::{HelperError, HelperResult};

/// Finds the automation binary.
///
/// Search order: `<home>/<bundled_dir>/<binary>`, then `PATH`, then each of the
/// configured fallback directories.
pub struct Locator<'a> {
    config: &'a AutomationConfig,
    home: Option<PathBuf>,
    search_path: Option<OsString>,
}

impl<'a> Locator<'a> {
    /// Uses the real home directory and `PATH`.
    pub fn from_env(config: &'a AutomationConfig) -> Self {
        Self::new(config, dirs::home_dir(), std::env::var_os("PATH"))
    }

    pub fn new(
        config: &'a AutomationConfig,
        home: Option<PathBuf>,
        search_path: Option<OsString>,
    ) -> Self {
        Self {
            config,
            home,
            search_path,
        }
    }

    pub fn locate(&self) -> Option<PathBuf> {
        let binary = &self.config.binary;

        if let Some(home) = &self.home {
            let bundled = home.join(&self.config.bundled_dir).join(binary);
            if bundled.is_file() {
                log::debug!("automation: using bundled {}", bundled.display());
                return Some(bundled);
            }
        }

        if let Some(search_path) = &self.search_path {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
            if let Ok(found) = which::which_in(binary, Some(search_path), cwd) {
                log::debug!("automation: found {} on PATH", found.display());
                return Some(found);
            }
        }

        let found = self
            .config
            .fallback_paths
            .iter()
            .map(|dir| dir.join(binary))
            .find(|candidate| candidate.is_file());
        match &found {
            Some(path) => log::debug!("automation: using fallback {}", path.display()),
            None => log::debug!("automation: {binary} not found"),
        }
        found
    }

    /// Locates the binary or fails with install guidance.
    pub fn require(&self) -> HelperResult<PathBuf> {
        self.locate()
            .ok_or_else(|| HelperError::AutomationBinaryNotFound {
                binary: self.config.binary.clone(),
                install_hint: self.config.install_hint.clone(),
            })
    }
}

/// Runs `path` with `args`, inheriting stdio, and mirrors its exit status.
///
/// A child killed by a signal has no exit code and counts as status 1.
pub fn run<S: AsRef<OsStr>>(binary: &str, path: &Path, args: &[S]) -> HelperResult<()> {
    log::debug!("automation: running {} with {} arg(s)", path.display(), args.len());
    let status = Command::new(path)
        .args(args)
        .status()
        .map_err(|source| HelperError::AutomationSpawn {
            binary: binary.to_string(),
            path: path.to_path_buf(),
            source,
        })?;

    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(HelperError::AutomationExit { code }),
        None => {
            log::warn!("automation: {} terminated without an exit code", binary);
            Err(HelperError::AutomationExit { code: 1 })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// A scratch directory unique to one test.
    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dch-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config(binary: &str, fallback: Vec<PathBuf>) -> AutomationConfig {
        AutomationConfig {
            binary: binary.into(),
            bundled_dir: PathBuf::from(".tools/bin"),
            fallback_paths: fallback,
            install_hint: "brew install tool".into(),
        }
    }

    #[test]
    fn bundled_copy_wins() {
        let home = scratch("home");
        let bundled = home.join(".tools/bin");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("dch-tool"), b"").unwrap();
        let fallback = scratch("fallback-a");
        fs::write(fallback.join("dch-tool"), b"").unwrap();

        let cfg = config("dch-tool", vec![fallback]);
        let locator = Locator::new(&cfg, Some(home.clone()), None);
        assert_eq!(locator.locate(), Some(bundled.join("dch-tool")));
    }

    #[test]
    fn fallback_used_when_nothing_else_matches() {
        let empty_home = scratch("empty-home");
        let first = scratch("fallback-b1");
        let second = scratch("fallback-b2");
        fs::write(second.join("dch-tool"), b"").unwrap();

        let cfg = config("dch-tool", vec![first, second.clone()]);
        let locator = Locator::new(&cfg, Some(empty_home), Some(OsString::new()));
        assert_eq!(locator.locate(), Some(second.join("dch-tool")));
    }

    #[cfg(unix)]
    #[test]
    fn path_lookup_precedes_fallbacks() {
        use std::os::unix::fs::PermissionsExt;

        let on_path = scratch("on-path");
        let exe = on_path.join("dch-tool");
        fs::write(&exe, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        let fallback = scratch("fallback-c");
        fs::write(fallback.join("dch-tool"), b"").unwrap();

        let cfg = config("dch-tool", vec![fallback]);
        let locator = Locator::new(&cfg, None, Some(on_path.clone().into_os_string()));
        assert_eq!(locator.locate(), Some(exe));
    }

    #[test]
    fn missing_binary_reports_install_hint() {
        let cfg = config("dch-definitely-not-installed", Vec::new());
        let locator = Locator::new(&cfg, None, Some(OsString::new()));
        let err = locator.require().unwrap_err();
        assert_eq!(err.to_string(), "dch-definitely-not-installed not found.");
        assert!(matches!(
            err,
            HelperError::AutomationBinaryNotFound { ref install_hint, .. } if install_hint == "brew install tool"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_is_mirrored() {
        let sh = Path::new("/bin/sh");
        assert!(run("sh", sh, &["-c", "exit 0"]).is_ok());
        let err = run("sh", sh, &["-c", "exit 3"]).unwrap_err();
        assert!(matches!(err, HelperError::AutomationExit { code: 3 }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn spawn_failure_is_reported() {
        let missing = std::env::temp_dir().join("dch-no-such-binary");
        let err = run("tool", &missing, &["x"]).unwrap_err();
        assert!(matches!(err, HelperError::AutomationSpawn { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
