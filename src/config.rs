//! Configuration System using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (`EetimeConfig::default()`)
//! 2. A TOML file (explicit path, else `eetime.toml`, else `<config dir>/eetime/eetime.toml`)
//! 3. Environment variables prefixed with `EETIME__`, using `__` to separate sections
//!    (e.g. `EETIME__COLLECT__INTERVAL_SECS=1.5`)
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Example
//! ```no_run
//! use eetime::config::EetimeConfig;
//!
//! let config = EetimeConfig::load(None)?;
//! println!("Sampling every {} sec", config.collect.interval_secs);
//! # Ok::<(), eetime::error::EetimeError>(())
//! ```

use crate::error::{AppResult, EetimeError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default configuration file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "eetime.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "EETIME__";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EetimeConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// External programmer settings
    pub programmer: ProgrammerConfig,
    /// Sampling loop defaults
    pub collect: CollectConfig,
    /// Offline analysis settings
    pub analysis: AnalysisConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
        }
    }
}

/// Programmer (device driver) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgrammerConfig {
    /// Path to the `minipro` executable
    pub path: PathBuf,
    /// Default device name, see `minipro -l`
    pub device: Option<String>,
    /// Ignore ID mismatches (`minipro -y`)
    pub force: bool,
}

impl Default for ProgrammerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("minipro"),
            device: None,
            force: false,
        }
    }
}

/// Sampling loop defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Minimum seconds between device reads
    pub interval_secs: f64,
    /// Percent of the elapsed run that must read erased, contiguously at the end
    pub erased_threshold: f64,
    /// Per-pass timeout in seconds; values below 1.0 disable the timeout
    pub timeout_secs: f64,
    /// Number of program/erase cycles
    pub passes: u32,
    /// Snapshot the device into the header before sampling
    pub read_init: bool,
    /// Zero the device before every pass
    pub write_init: bool,
    /// Root directory for dated run directories
    pub log_root: PathBuf,
    /// Default operator recorded in headers
    pub user: Option<String>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3.0,
            erased_threshold: 20.0,
            timeout_secs: 60.0 * 60.0,
            passes: 1,
            read_init: true,
            write_init: false,
            log_root: PathBuf::from("log"),
            user: None,
        }
    }
}

impl CollectConfig {
    /// Timeout as an option; sub-second values mean "no timeout".
    pub fn timeout(&self) -> Option<f64> {
        (self.timeout_secs >= 1.0).then_some(self.timeout_secs)
    }
}

/// Offline analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Abort table generation on the first bad entry instead of warning
    pub strict: bool,
    /// Substring every normalized run's eraser must contain (fixture the scalars are calibrated for)
    pub reference_eraser: Option<String>,
    /// Bulb id to intensity scalar applied to raw T50/T100
    pub bulb_scalars: BTreeMap<String, f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        // Bulb 2 measured ~0.9x the erase time of bulb 3 on the same parts
        let bulb_scalars = [("1", 1.0), ("2", 0.90), ("3", 1.0), ("4", 1.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            strict: true,
            reference_eraser: None,
            bulb_scalars,
        }
    }
}

impl EetimeConfig {
    /// Load configuration from defaults, a TOML file and environment variables.
    ///
    /// When `path` is `None`, `eetime.toml` in the working directory is used if present,
    /// then the per-user configuration directory. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let file = path.map(Path::to_path_buf).or_else(default_config_path);
        let mut figment = Figment::from(Serialized::defaults(EetimeConfig::default()));
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(file));
        }
        let config: EetimeConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(EetimeError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.as_str()) {
            return Err(EetimeError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        let interval = self.collect.interval_secs;
        if !(interval > 0.0) || std::time::Duration::try_from_secs_f64(interval).is_err() {
            return Err(EetimeError::Configuration(format!(
                "Invalid interval_secs {interval}. Must be a finite number of seconds > 0"
            )));
        }

        let threshold = self.collect.erased_threshold;
        if !(threshold > 0.0 && threshold <= 100.0) {
            return Err(EetimeError::Configuration(format!(
                "Invalid erased_threshold {threshold}. Must be in (0, 100]"
            )));
        }

        if self.collect.passes == 0 {
            return Err(EetimeError::Configuration(
                "passes must be at least 1".to_string(),
            ));
        }

        for (bulb, scalar) in &self.analysis.bulb_scalars {
            if !(*scalar > 0.0) {
                return Err(EetimeError::Configuration(format!(
                    "Invalid scalar {scalar} for bulb '{bulb}'. Must be > 0"
                )));
            }
        }

        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EetimeError::Configuration(format!("Failed to render config: {e}")))
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("eetime").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let config = EetimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.collect.interval_secs, 3.0);
        assert_eq!(config.collect.erased_threshold, 20.0);
        assert_eq!(config.collect.timeout(), Some(3600.0));
        assert_eq!(config.analysis.bulb_scalars.get("2"), Some(&0.90));
    }

    #[test]
    fn sub_second_timeout_disables_it() {
        let collect = CollectConfig {
            timeout_secs: 0.5,
            ..Default::default()
        };
        assert_eq!(collect.timeout(), None);
    }

    #[test]
    fn file_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [collect]
                interval_secs = 1.5
                passes = 3
                write_init = true

                [analysis.bulb_scalars]
                7 = 0.5
                "#,
            )?;
            jail.set_env("EETIME__COLLECT__ERASED_THRESHOLD", "25.0");
            jail.set_env("EETIME__PROGRAMMER__DEVICE", "M27C256B@DIP28");

            let config = EetimeConfig::load(Some(Path::new("custom.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.collect.interval_secs, 1.5);
            assert_eq!(config.collect.passes, 3);
            assert!(config.collect.write_init);
            assert_eq!(config.collect.erased_threshold, 25.0);
            assert_eq!(config.programmer.device.as_deref(), Some("M27C256B@DIP28"));
            assert_eq!(config.analysis.bulb_scalars.get("7"), Some(&0.5));
            // Untouched sections keep their defaults
            assert_eq!(config.application.log_level, "info");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = EetimeConfig::default();
        config.application.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_threshold() {
        let mut config = EetimeConfig::default();
        config.collect.erased_threshold = 0.0;
        assert!(config.validate().is_err());
        config.collect.erased_threshold = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_interval() {
        for interval in [f64::INFINITY, f64::NAN, 1e30, -1.0] {
            let mut config = EetimeConfig::default();
            config.collect.interval_secs = interval;
            assert!(config.validate().is_err(), "interval {interval} accepted");
        }
    }

    #[test]
    fn test_invalid_bulb_scalar() {
        let mut config = EetimeConfig::default();
        config.analysis.bulb_scalars.insert("9".to_string(), 0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn renders_as_toml() {
        let rendered = EetimeConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[collect]"));
        assert!(rendered.contains("erased_threshold = 20.0"));
    }
}
