//! Engine configuration
//!
//! [`EngineConfig`] is a plain serde struct with builder-style setters. It can
//! be loaded from TOML; every field has a default so partial files are fine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default proposal time-to-live (5 minutes)
pub const DEFAULT_PROPOSAL_TTL: Duration = Duration::from_secs(5 * 60);

/// Default reaper sweep interval (60 seconds)
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of unchanged lines shown around each diff hunk
pub const DEFAULT_DIFF_CONTEXT_LINES: usize = 3;

/// Default maximum size of a file that can be proposed against (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime of a pending proposal in milliseconds
    pub proposal_ttl_ms: u64,
    /// Reaper sweep interval in milliseconds
    pub reap_interval_ms: u64,
    /// Whether to run the background reaper
    pub reaper_enabled: bool,
    /// Context lines around each diff hunk
    pub diff_context_lines: usize,
    /// Largest file (bytes) accepted by propose and apply
    pub max_file_size: u64,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With proposal TTL
    #[inline]
    #[must_use]
    pub fn with_proposal_ttl(mut self, ttl: Duration) -> Self {
        self.proposal_ttl_ms = duration_to_ms(ttl);
        self
    }

    /// With reaper interval
    #[inline]
    #[must_use]
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval_ms = duration_to_ms(interval);
        self
    }

    /// Enable or disable the background reaper
    #[inline]
    #[must_use]
    pub fn with_reaper_enabled(mut self, enabled: bool) -> Self {
        self.reaper_enabled = enabled;
        self
    }

    /// With diff context lines
    #[inline]
    #[must_use]
    pub fn with_diff_context_lines(mut self, lines: usize) -> Self {
        self.diff_context_lines = lines;
        self
    }

    /// With maximum file size
    #[inline]
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Proposal TTL as a `Duration`
    #[inline]
    #[must_use]
    pub fn proposal_ttl(&self) -> Duration {
        Duration::from_millis(self.proposal_ttl_ms)
    }

    /// Reaper interval as a `Duration`
    #[inline]
    #[must_use]
    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    /// Proposal TTL as a chrono duration, for timestamp arithmetic
    ///
    /// # Errors
    /// Returns error if the TTL does not fit chrono's range
    pub fn proposal_ttl_chrono(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::from_std(self.proposal_ttl()).map_err(|_| ConfigError::OutOfRange {
            field: "proposal_ttl_ms",
            value: self.proposal_ttl_ms,
        })
    }

    /// Check invariants
    ///
    /// # Errors
    /// Returns error if a duration is zero or out of range, the TTL would push
    /// an expiry past the representable calendar, or the size limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proposal_ttl_ms == 0 {
            return Err(ConfigError::Zero("proposal_ttl_ms"));
        }
        if self.reaper_enabled && self.reap_interval_ms == 0 {
            return Err(ConfigError::Zero("reap_interval_ms"));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::Zero("max_file_size"));
        }
        let ttl = self.proposal_ttl_chrono()?;
        if chrono::Utc::now().checked_add_signed(ttl).is_none() {
            return Err(ConfigError::OutOfRange {
                field: "proposal_ttl_ms",
                value: self.proposal_ttl_ms,
            });
        }
        Ok(())
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or the result fails validation
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proposal_ttl_ms: duration_to_ms(DEFAULT_PROPOSAL_TTL),
            reap_interval_ms: duration_to_ms(DEFAULT_REAP_INTERVAL),
            reaper_enabled: true,
            diff_context_lines: DEFAULT_DIFF_CONTEXT_LINES,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Field must be non-zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// Value does not fit the supported range
    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: u64 },

    /// TOML parse error
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file could not be read
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.proposal_ttl(), Duration::from_secs(300));
        assert_eq!(config.reap_interval(), Duration::from_secs(60));
        assert_eq!(config.diff_context_lines, 3);
        assert!(config.reaper_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_setters() {
        let config = EngineConfig::new()
            .with_proposal_ttl(Duration::from_millis(250))
            .with_reap_interval(Duration::from_millis(20))
            .with_diff_context_lines(1)
            .with_max_file_size(1024)
            .with_reaper_enabled(false);

        assert_eq!(config.proposal_ttl_ms, 250);
        assert_eq!(config.reap_interval_ms, 20);
        assert_eq!(config.diff_context_lines, 1);
        assert_eq!(config.max_file_size, 1024);
        assert!(!config.reaper_enabled);
    }

    #[test]
    fn zero_ttl_rejected() {
        let config = EngineConfig::new().with_proposal_ttl(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero("proposal_ttl_ms"))
        ));
    }

    #[test]
    fn zero_interval_allowed_when_reaper_disabled() {
        let config = EngineConfig::new()
            .with_reap_interval(Duration::ZERO)
            .with_reaper_enabled(false);
        assert!(config.validate().is_ok());

        let enabled = config.with_reaper_enabled(true);
        assert!(enabled.validate().is_err());
    }

    #[test]
    fn huge_ttl_out_of_range() {
        let config = EngineConfig {
            proposal_ttl_ms: u64::MAX,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn ttl_overflowing_the_calendar_rejected() {
        let config =
            EngineConfig::new().with_proposal_ttl(Duration::from_millis(100_000_000_000_000_000));
        assert!(chrono::Duration::from_std(config.proposal_ttl()).is_ok());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "proposal_ttl_ms",
                ..
            })
        ));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("proposal_ttl_ms = 1000\n").unwrap();
        assert_eq!(config.proposal_ttl_ms, 1000);
        assert_eq!(config.reap_interval_ms, 60_000);
    }

    #[test]
    fn invalid_toml_reported() {
        let result = EngineConfig::from_toml_str("proposal_ttl_ms = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editgate.toml");
        std::fs::write(&path, "diff_context_lines = 5\nreaper_enabled = false\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.diff_context_lines, 5);
        assert!(!config.reaper_enabled);
    }

    #[test]
    fn from_missing_file_errors() {
        let result = EngineConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
