//! Configuration loading
//!
//! Layers, lowest to highest precedence: built-in defaults, the TOML file,
//! environment variables, command-line flags.

use autosnap_engine::{RetentionPolicy, RunOptions};
use autosnap_zfs::{Mode, ModeSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "AUTOSNAP_CONFIG";

/// Largest accepted per-frequency retention count
pub const MAX_RETENTION_COUNT: u32 = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(ConfigError::Invalid {
                key: "log_level",
                message: format!("'{}' (expected info or debug)", other),
            }),
        }
    }
}

/// Log output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid {
                key: "log_format",
                message: format!("'{}' (expected text or json)", other),
            }),
        }
    }
}

/// Chroot mode paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChrootConfig {
    /// Host root mounted into the container (default: /host)
    pub host_path: String,
    /// Directory holding zfs and zpool inside the host root (default: /usr/local/sbin)
    pub bin_path: String,
}

impl Default for ChrootConfig {
    fn default() -> Self {
        let settings = ModeSettings::default();
        Self {
            host_path: settings.chroot_host_path,
            bin_path: settings.chroot_bin_path,
        }
    }
}

/// Fixture mode settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    /// Directory with zfs_list_pools.json and friends (default: test)
    pub fixture_dir: PathBuf,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            fixture_dir: ModeSettings::default().fixture_dir,
        }
    }
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub mode: Mode,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    /// Also write a daily rolling log file here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub max_deletions_per_run: usize,
    pub lock_enabled: bool,
    pub lock_file: PathBuf,
    pub snapshot_prefix: String,
    pub pool_whitelist: Vec<String>,
    pub filesystem_whitelist: Vec<String>,
    pub scrub_age_threshold_days: u32,
    pub retention: RetentionPolicy,
    pub chroot: ChrootConfig,
    pub test: TestConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Direct,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            log_dir: None,
            dry_run: false,
            max_deletions_per_run: 100,
            lock_enabled: true,
            lock_file: PathBuf::from("/tmp/autosnap.lock"),
            snapshot_prefix: "autosnap".to_string(),
            pool_whitelist: Vec::new(),
            filesystem_whitelist: Vec::new(),
            scrub_age_threshold_days: 90,
            retention: RetentionPolicy::default(),
            chroot: ChrootConfig::default(),
            test: TestConfig::default(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub mode: Option<Mode>,
    pub log_level: Option<LogLevel>,
    pub log_format: Option<LogFormat>,
    pub dry_run: bool,
    pub no_lock: bool,
}

/// A loaded configuration plus what happened while loading it
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    /// File the config was read from, if any
    pub source: Option<PathBuf>,
    /// Ignored environment values; logged once logging is up
    pub warnings: Vec<String>,
}

impl Config {
    /// Build the effective configuration
    ///
    /// `env` looks up environment variables; tests pass a map instead of
    /// the process environment.
    pub fn load<F>(overrides: &Overrides, env: F) -> Result<Loaded, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = resolve_path(overrides.config.as_deref(), &env)?;
        let mut config = match &source {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let warnings = config.apply_env(&env);
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(Loaded {
            config,
            source,
            warnings,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply environment variables; returns a warning per rejected value
    pub fn apply_env<F>(&mut self, env: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        macro_rules! parsed {
            ($name:expr, $parse:expr, $expected:expr, $target:expr) => {
                if let Some(raw) = lookup($name) {
                    match $parse(raw.trim()) {
                        Some(value) => $target = value,
                        None => warnings.push(format!(
                            "Ignoring invalid {}={:?} (expected {})",
                            $name, raw, $expected
                        )),
                    }
                }
            };
        }

        let count = |s: &str| s.parse::<u32>().ok();
        parsed!("LOG_LEVEL", |s: &str| s.parse::<LogLevel>().ok(), "info or debug", self.log_level);
        parsed!("DRY_RUN", parse_bool, "a boolean", self.dry_run);
        parsed!(
            "MAX_DELETIONS_PER_RUN",
            |s: &str| s.parse::<usize>().ok(),
            "a non-negative integer",
            self.max_deletions_per_run
        );
        parsed!("MAX_HOURLY_SNAPSHOTS", count, "a non-negative integer", self.retention.hourly);
        parsed!("MAX_DAILY_SNAPSHOTS", count, "a non-negative integer", self.retention.daily);
        parsed!("MAX_WEEKLY_SNAPSHOTS", count, "a non-negative integer", self.retention.weekly);
        parsed!("MAX_MONTHLY_SNAPSHOTS", count, "a non-negative integer", self.retention.monthly);
        parsed!("MAX_YEARLY_SNAPSHOTS", count, "a non-negative integer", self.retention.yearly);
        parsed!(
            "MAX_FREQUENTLY_SNAPSHOTS",
            |s: &str| count(s).map(Some),
            "a non-negative integer",
            self.retention.frequently
        );
        parsed!(
            "SCRUB_AGE_THRESHOLD_DAYS",
            count,
            "a non-negative integer",
            self.scrub_age_threshold_days
        );

        let mut lock_disabled = !self.lock_enabled;
        parsed!("LOCK_DISABLED", parse_bool, "a boolean", lock_disabled);
        self.lock_enabled = !lock_disabled;

        if let Some(path) = lookup("LOCK_FILE_PATH") {
            self.lock_file = PathBuf::from(path.trim());
        }
        if let Some(prefix) = lookup("SNAPSHOT_PREFIX") {
            self.snapshot_prefix = prefix.trim().to_string();
        }
        if let Some(list) = lookup("POOL_WHITELIST") {
            self.pool_whitelist = parse_list(&list);
        }
        if let Some(list) = lookup("FILESYSTEM_WHITELIST") {
            self.filesystem_whitelist = parse_list(&list);
        }
        if let Some(path) = lookup("CHROOT_HOST_PATH") {
            self.chroot.host_path = path.trim().to_string();
        }
        if let Some(path) = lookup("CHROOT_BIN_PATH") {
            self.chroot.bin_path = path.trim().to_string();
        }

        warnings
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
        if overrides.dry_run {
            self.dry_run = true;
        }
        if overrides.no_lock {
            self.lock_enabled = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.snapshot_prefix;
        if prefix.is_empty() {
            return Err(ConfigError::Invalid {
                key: "snapshot_prefix",
                message: "must not be empty".to_string(),
            });
        }
        if prefix.contains(['@', '/']) || prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                key: "snapshot_prefix",
                message: format!("'{}' must not contain '@', '/' or whitespace", prefix),
            });
        }

        let counts = [
            ("retention.frequently", self.retention.frequently.unwrap_or(0)),
            ("retention.hourly", self.retention.hourly),
            ("retention.daily", self.retention.daily),
            ("retention.weekly", self.retention.weekly),
            ("retention.monthly", self.retention.monthly),
            ("retention.yearly", self.retention.yearly),
        ];
        for (key, value) in counts {
            if value > MAX_RETENTION_COUNT {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("{} exceeds the maximum of {}", value, MAX_RETENTION_COUNT),
                });
            }
        }

        if self.lock_enabled && self.lock_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "lock_file",
                message: "must not be empty while locking is enabled".to_string(),
            });
        }

        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            max_deletions_per_run: self.max_deletions_per_run,
            snapshot_prefix: self.snapshot_prefix.clone(),
            pool_whitelist: self.pool_whitelist.clone(),
            filesystem_whitelist: self.filesystem_whitelist.clone(),
            scrub_age_threshold: chrono::Duration::days(i64::from(self.scrub_age_threshold_days)),
        }
    }

    pub fn mode_settings(&self) -> ModeSettings {
        ModeSettings {
            chroot_host_path: self.chroot.host_path.clone(),
            chroot_bin_path: self.chroot.bin_path.clone(),
            fixture_dir: self.test.fixture_dir.clone(),
        }
    }
}

/// Default config location under the user's config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("autosnap").join("config.toml"))
}

/// Pick the config file: flag, then `$AUTOSNAP_CONFIG`, then the default
/// location if it exists. Explicitly named files must exist.
fn resolve_path<F>(flag: Option<&Path>, env: &F) -> Result<Option<PathBuf>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = flag
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_ENV).filter(|v| !v.trim().is_empty()).map(PathBuf::from));

    match explicit {
        Some(path) if path.exists() => Ok(Some(path)),
        Some(path) => Err(ConfigError::NotFound(path)),
        None => Ok(default_config_path().filter(|p| p.exists())),
    }
}

/// Boolean spellings accepted in environment variables
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "yes" | "on" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Comma-separated list; blanks are dropped
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# autosnap configuration
#
# Precedence: defaults < this file < environment < command-line flags.

# How zfs/zpool are reached: "direct", "chroot" or "test" (fixture files)
mode = "direct"

# "info" or "debug"; RUST_LOG overrides when set
log_level = "info"

# "text" or "json" (written to stderr)
log_format = "text"

# Also write a daily rolling log file into this directory
# log_dir = "/var/log/autosnap"

# Log decisions without creating or destroying anything
dry_run = false

# Upper bound on deletions per run, across all filesystems
max_deletions_per_run = 100

# Refuse to run while another instance holds the lock
lock_enabled = true
lock_file = "/tmp/autosnap.lock"

# Managed snapshots are named <prefix>_<YYYY-MM-DD_HH:MM:SS>_<frequency>.
# Snapshots without this prefix are never touched.
snapshot_prefix = "autosnap"

# Limit processing to these pools / filesystems (empty = all)
pool_whitelist = []
filesystem_whitelist = []

# Warn when the last scrub is older than this
scrub_age_threshold_days = 90

[retention]
# Number of periods to keep per frequency. 0 removes all snapshots of
# that frequency. "frequently" (15 minutes) is off unless set.
# frequently = 8
hourly = 24
daily = 7
weekly = 4
monthly = 12
yearly = 3

[chroot]
host_path = "/host"
bin_path = "/usr/local/sbin"

[test]
fixture_dir = "test"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn no_env() -> impl Fn(&str) -> Option<String> {
        |_| None
    }

    #[test]
    fn test_example_matches_defaults() {
        let config = Config::from_toml(example_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.retention.frequently = Some(4);
        config.log_dir = Some(PathBuf::from("/var/log/autosnap"));
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::from_toml("max_snapshots = 3").is_err());
        assert!(Config::from_toml("[retention]\nfortnightly = 2").is_err());
        assert!(Config::from_toml("mode = \"kubernetes\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "dry_run = false\n[retention]\ndaily = 14\nhourly = 48\n").unwrap();

        let overrides = Overrides {
            config: Some(path.clone()),
            ..Default::default()
        };
        let env = env_of(&[
            ("MAX_DAILY_SNAPSHOTS", "30"),
            ("DRY_RUN", "true"),
            ("POOL_WHITELIST", " tank, ,backup "),
        ]);
        let loaded = Config::load(&overrides, env).unwrap();

        assert_eq!(loaded.source, Some(path));
        assert_eq!(loaded.config.retention.daily, 30);
        assert_eq!(loaded.config.retention.hourly, 48);
        assert!(loaded.config.dry_run);
        assert_eq!(loaded.config.pool_whitelist, vec!["tank", "backup"]);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_flags_override_env() {
        let overrides = Overrides {
            mode: Some(Mode::Test),
            log_level: Some(LogLevel::Debug),
            no_lock: true,
            dry_run: true,
            ..Default::default()
        };
        let env = env_of(&[("LOG_LEVEL", "info"), ("DRY_RUN", "false")]);
        let loaded = Config::load(&overrides, env).unwrap();
        assert_eq!(loaded.config.mode, Mode::Test);
        assert_eq!(loaded.config.log_level, LogLevel::Debug);
        assert!(loaded.config.dry_run);
        assert!(!loaded.config.lock_enabled);
    }

    #[test]
    fn test_invalid_env_keeps_previous_value() {
        let mut config = Config::default();
        let warnings = config.apply_env(env_of(&[
            ("MAX_HOURLY_SNAPSHOTS", "lots"),
            ("DRY_RUN", "maybe"),
            ("MAX_DELETIONS_PER_RUN", "-1"),
        ]));
        assert_eq!(warnings.len(), 3);
        assert_eq!(config.retention.hourly, 24);
        assert!(!config.dry_run);
        assert_eq!(config.max_deletions_per_run, 100);
    }

    #[test]
    fn test_env_additions() {
        let mut config = Config::default();
        let warnings = config.apply_env(env_of(&[
            ("MAX_FREQUENTLY_SNAPSHOTS", "8"),
            ("SNAPSHOT_PREFIX", "nightly"),
            ("LOCK_DISABLED", "1"),
            ("LOCK_FILE_PATH", "/run/autosnap.lock"),
            ("CHROOT_HOST_PATH", "/rootfs"),
            ("SCRUB_AGE_THRESHOLD_DAYS", "30"),
            ("FILESYSTEM_WHITELIST", "tank/data"),
        ]));
        assert!(warnings.is_empty());
        assert_eq!(config.retention.frequently, Some(8));
        assert_eq!(config.snapshot_prefix, "nightly");
        assert!(!config.lock_enabled);
        assert_eq!(config.lock_file, PathBuf::from("/run/autosnap.lock"));
        assert_eq!(config.chroot.host_path, "/rootfs");
        assert_eq!(config.run_options().scrub_age_threshold, chrono::Duration::days(30));
        assert_eq!(config.filesystem_whitelist, vec!["tank/data"]);
    }

    #[test]
    fn test_empty_env_values_are_unset() {
        let mut config = Config::default();
        let warnings = config.apply_env(env_of(&[("MAX_DAILY_SNAPSHOTS", ""), ("POOL_WHITELIST", "  ")]));
        assert!(warnings.is_empty());
        assert_eq!(config.retention.daily, 7);
        assert!(config.pool_whitelist.is_empty());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        for bad in ["", "auto snap", "auto@snap", "auto/snap"] {
            config.snapshot_prefix = bad.to_string();
            assert!(config.validate().is_err(), "prefix {:?} should be rejected", bad);
        }

        let mut config = Config::default();
        config.retention.daily = MAX_RETENTION_COUNT + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "retention.daily", .. })
        ));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let overrides = Overrides {
            config: Some(PathBuf::from("/nonexistent/autosnap.toml")),
            ..Default::default()
        };
        assert!(matches!(
            Config::load(&overrides, no_env()),
            Err(ConfigError::NotFound(_))
        ));

        let env = env_of(&[(CONFIG_ENV, "/nonexistent/from-env.toml")]);
        assert!(matches!(
            Config::load(&Overrides::default(), env),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_mode_settings() {
        let mut config = Config::default();
        config.test.fixture_dir = PathBuf::from("/srv/fixtures");
        let settings = config.mode_settings();
        assert_eq!(settings.fixture_dir, PathBuf::from("/srv/fixtures"));
        assert_eq!(settings.chroot_host_path, "/host");
    }
}
