//! Optional TOML configuration.
//!
//! Looked up at `$DESKTOP_HELPER_CONFIG`, else
//! `<config dir>/desktop-control-helper/config.toml`. Every key is optional.
//! A missing file means defaults; a broken one is reported as a warning and
//! also falls back to defaults, so no command's exit contract depends on it.
//!
//! ```toml
//! capture_timeout_secs = 10.0
//! probe_timeout_secs = 5.0
//! poll_interval_ms = 50
//! app_name = "DesktopControlHelper"
//!
//! [automation]
//! binary = "cliclick"
//! bundled_dir = ".openclaw/bin"
//! fallback_paths = ["/opt/homebrew/bin", "/usr/local/bin"]
//! install_hint = "brew install cliclick"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::capture::CAPTURE_TIMEOUT;
use crate::error::{HelperError, HelperResult};
use crate::permissions::PROBE_TIMEOUT;
use crate::waiter::{DEFAULT_POLL_INTERVAL, MAX_WAIT};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DESKTOP_HELPER_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub capture_timeout_secs: f64,
    pub probe_timeout_secs: f64,
    pub poll_interval_ms: u64,
    /// Entry name shown in System Settings.
    pub app_name: String,
    pub automation: AutomationConfig,
}

/// Where to look for the pointer/keyboard automation binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutomationConfig {
    pub binary: String,
    /// Directory under the home directory checked first.
    pub bundled_dir: PathBuf,
    /// Directories checked after the `PATH` lookup.
    pub fallback_paths: Vec<PathBuf>,
    pub install_hint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_timeout_secs: CAPTURE_TIMEOUT.as_secs_f64(),
            probe_timeout_secs: PROBE_TIMEOUT.as_secs_f64(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            app_name: "DesktopControlHelper".into(),
            automation: AutomationConfig::default(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            binary: "cliclick".into(),
            bundled_dir: PathBuf::from(".openclaw/bin"),
            fallback_paths: vec![
                PathBuf::from("/opt/homebrew/bin"),
                PathBuf::from("/usr/local/bin"),
            ],
            install_hint: "brew install cliclick".into(),
        }
    }
}

impl Config {
    /// Loads the config file if there is one; never fails.
    pub fn load() -> Self {
        let Some(path) = default_path() else {
            log::debug!("config: no config directory, using defaults");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(Some(config)) => {
                log::debug!("config: loaded {}", path.display());
                config
            }
            Ok(None) => Self::default(),
            Err(err) => {
                log::warn!("config: {err}; using defaults");
                Self::default()
            }
        }
    }

    /// Reads `path`. `Ok(None)` if the file does not exist.
    pub fn load_from(path: &Path) -> HelperResult<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(HelperError::Config {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                })
            }
        };
        Self::parse(&text)
            .map(Some)
            .map_err(|message| HelperError::Config {
                path: path.to_path_buf(),
                message,
            })
    }

    /// Parses and validates TOML text.
    pub fn parse(text: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        for (key, secs) in [
            ("capture_timeout_secs", self.capture_timeout_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
        ] {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(format!("{key} must be a positive number of seconds"));
            }
            if secs > MAX_WAIT.as_secs_f64() {
                return Err(format!(
                    "{key} must be at most {} seconds",
                    MAX_WAIT.as_secs()
                ));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be at least 1".into());
        }
        if self.automation.binary.trim().is_empty() {
            return Err("automation.binary must not be empty".into());
        }
        Ok(())
    }

    pub fn capture_timeout(&self) -> Duration {
        seconds(self.capture_timeout_secs, CAPTURE_TIMEOUT)
    }

    pub fn probe_timeout(&self) -> Duration {
        seconds(self.probe_timeout_secs, PROBE_TIMEOUT)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `secs` as a `Duration` capped at `MAX_WAIT`; `fallback` if unrepresentable.
fn seconds(secs: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(secs)
        .map(|d| d.min(MAX_WAIT))
        .unwrap_or(fallback)
}

/// The config file location, if one can be determined.
pub fn default_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::config_dir().map(|dir| dir.join("desktop-control-helper").join("config.toml"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn defaults_match_the_design_values() {
        let config = Config::default();
        assert_eq!(config.capture_timeout(), Duration::from_secs(10));
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.automation.binary, "cliclick");
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let config = Config::parse(
            r#"
            capture_timeout_secs = 2.5
            app_name = "MyHelper"

            [automation]
            fallback_paths = ["/opt/bin"]
            "#,
        )
        .unwrap();
        assert_eq!(config.capture_timeout(), Duration::from_millis(2500));
        assert_eq!(config.app_name, "MyHelper");
        assert_eq!(config.automation.fallback_paths, vec![PathBuf::from("/opt/bin")]);
        assert_eq!(config.automation.binary, "cliclick");
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse("capture_timeout = 3").unwrap_err();
        assert!(err.contains("capture_timeout"), "{err}");
    }

    #[test]
    fn non_positive_timeouts_are_rejected() {
        assert!(Config::parse("probe_timeout_secs = 0").is_err());
        assert!(Config::parse("capture_timeout_secs = -1.0").is_err());
        assert!(Config::parse("poll_interval_ms = 0").is_err());
    }

    #[test]
    fn oversized_timeouts_are_rejected() {
        let err = Config::parse("probe_timeout_secs = 1e20").unwrap_err();
        assert!(err.contains("probe_timeout_secs"), "{err}");
        assert!(Config::parse("capture_timeout_secs = 3601").is_err());
        assert!(Config::parse("capture_timeout_secs = 3600").is_ok());
    }

    #[test]
    fn accessors_never_panic_on_unvalidated_values() {
        let config = Config {
            capture_timeout_secs: 1e6,
            probe_timeout_secs: f64::NAN,
            ..Config::default()
        };
        assert_eq!(config.capture_timeout(), MAX_WAIT);
        assert_eq!(config.probe_timeout(), PROBE_TIMEOUT);
    }

    #[test]
    fn missing_file_is_none() {
        let path = std::env::temp_dir().join("dch-config-does-not-exist.toml");
        assert!(Config::load_from(&path).unwrap().is_none());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let path = std::env::temp_dir().join(format!("dch-config-{}.toml", std::process::id()));
        std::fs::write(&path, "app_name = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, HelperError::Config { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
