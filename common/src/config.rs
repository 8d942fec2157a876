use crate::error::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deepest `max_depth` accepted. Resolution recurses once per level, so this keeps a
/// maximal chain well inside a default 2 MiB thread stack.
pub const MAX_DEPTH: usize = 1024;

/// Widest `time_tolerance_secs` accepted: one year.
pub const MAX_TIME_TOLERANCE_SECS: i64 = 365 * 24 * 60 * 60;

/// Settings for building updates. Every field has a default, so a config file only needs
/// the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Half-width, in seconds, of the window opened around the current time before
    /// time-constrained nodes narrow it. At most [`MAX_TIME_TOLERANCE_SECS`], never negative.
    pub time_tolerance_secs: i64,

    /// Deepest chain of requirements the resolver will follow, from 1 up to [`MAX_DEPTH`].
    /// A config built in code with a larger value is clamped to [`MAX_DEPTH`].
    pub max_depth: usize,

    /// Whether fulfilling a root also creates a fulfillment record attesting it.
    pub emit_fulfillment_record: bool,

    /// One claim directive per node kind, rather than a single composite directive. With a
    /// single directive, the contract of another kind only runs when a state of that kind is
    /// consumed or created.
    pub per_type_claims: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_tolerance_secs: 120,
            max_depth: 256,
            emit_fulfillment_record: true,
            per_type_claims: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_TIME_TOLERANCE_SECS).contains(&self.time_tolerance_secs) {
            return Err(ConfigError::Invalid(format!(
                "time_tolerance_secs must be between 0 and {}, got {}",
                MAX_TIME_TOLERANCE_SECS, self.time_tolerance_secs
            )));
        }
        if !(1..=MAX_DEPTH).contains(&self.max_depth) {
            return Err(ConfigError::Invalid(format!(
                "max_depth must be between 1 and {}, got {}",
                MAX_DEPTH, self.max_depth
            )));
        }
        Ok(())
    }

    /// `None` when the tolerance does not fit in a [`TimeDelta`].
    pub fn time_tolerance(&self) -> Option<TimeDelta> {
        TimeDelta::try_seconds(self.time_tolerance_secs)
    }

    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = EngineConfig::from_toml_str("max_depth = 16").unwrap();
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.time_tolerance_secs, 120);
        assert!(config.emit_fulfillment_record);
        assert!(config.per_type_claims);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "time_tolerance_secs = 30").unwrap();
        writeln!(file, "per_type_claims = false").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.time_tolerance(), Some(TimeDelta::seconds(30)));
        assert!(!config.per_type_claims);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_depth = \"deep\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::load("/nonexistent/engine.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for source in [
            "time_tolerance_secs = 9000000000000",
            "time_tolerance_secs = -1",
            "max_depth = 0",
            "max_depth = 1000000000",
        ] {
            assert!(
                matches!(EngineConfig::from_toml_str(source), Err(ConfigError::Invalid(_))),
                "{source} should be rejected"
            );
        }

        let widest = format!("time_tolerance_secs = {}", MAX_TIME_TOLERANCE_SECS);
        assert!(EngineConfig::from_toml_str(&widest).is_ok());
        let deepest = format!("max_depth = {}", MAX_DEPTH);
        assert!(EngineConfig::from_toml_str(&deepest).is_ok());
    }

    #[test]
    fn test_unrepresentable_tolerance() {
        let config = EngineConfig {
            time_tolerance_secs: i64::MAX,
            max_depth: usize::MAX,
            ..Default::default()
        };
        assert_eq!(config.time_tolerance(), None);
        assert_eq!(config.effective_max_depth(), MAX_DEPTH);
    }
}
