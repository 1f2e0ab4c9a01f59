//! Conflict engine configuration.
//!
//! Provides the `EngineConfig` struct used by the detector and aggregator,
//! loaded from an optional JSON file plus environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Assumed length of an event with a start time but no end time
pub const DEFAULT_DURATION_MINUTES: u32 = 120;
/// Speed used to turn a distance into a travel time estimate
pub const DEFAULT_AVERAGE_SPEED_MPH: f64 = 30.0;

const DURATION_ENV: &str = "ENCORE_DEFAULT_DURATION_MINUTES";
const SPEED_ENV: &str = "ENCORE_AVERAGE_SPEED_MPH";

/// Tunables for conflict detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub default_duration_minutes: u32,
    pub average_speed_mph: f64,
    /// Enquiry statuses that take an enquiry out of detection (case-insensitive)
    pub excluded_enquiry_statuses: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            average_speed_mph: DEFAULT_AVERAGE_SPEED_MPH,
            excluded_enquiry_statuses: vec!["withdrawn".to_string(), "declined".to_string()],
        }
    }
}

impl EngineConfig {
    /// Parse a config from a raw JSON payload and validate it.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid engine config JSON: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given (defaults otherwise), then apply env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_json(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `ENCORE_*` overrides using `lookup` to read variables.
    ///
    /// Taking the lookup as a closure keeps this testable without touching
    /// the process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = normalize_text_option(lookup(DURATION_ENV)) {
            self.default_duration_minutes = value
                .parse()
                .map_err(|_| Error::Config(format!("{DURATION_ENV} must be a whole number")))?;
        }
        if let Some(value) = normalize_text_option(lookup(SPEED_ENV)) {
            self.average_speed_mph = value
                .parse()
                .map_err(|_| Error::Config(format!("{SPEED_ENV} must be a number")))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.default_duration_minutes == 0 {
            return Err(Error::Config(
                "default_duration_minutes must be greater than zero".to_string(),
            ));
        }
        if !self.average_speed_mph.is_finite() || self.average_speed_mph <= 0.0 {
            return Err(Error::Config(
                "average_speed_mph must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.default_duration_minutes, 120);
        assert!(config
            .excluded_enquiry_statuses
            .contains(&"declined".to_string()));
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let config = EngineConfig::from_json(r#"{ "default_duration_minutes": 90 }"#).unwrap();
        assert_eq!(config.default_duration_minutes, 90);
        assert!((config.average_speed_mph - DEFAULT_AVERAGE_SPEED_MPH).abs() < f64::EPSILON);
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let error = EngineConfig::from_json(r#"{ "timezone": "UTC" }"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn from_json_rejects_zero_duration() {
        assert!(EngineConfig::from_json(r#"{ "default_duration_minutes": 0 }"#).is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let vars = HashMap::from([
            (DURATION_ENV, "45".to_string()),
            (SPEED_ENV, " 50 ".to_string()),
        ]);
        let config = EngineConfig::default()
            .with_overrides(|name| vars.get(name).cloned())
            .unwrap();
        assert_eq!(config.default_duration_minutes, 45);
        assert!((config.average_speed_mph - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_override_is_reported() {
        let error = EngineConfig::default()
            .with_overrides(|name| (name == SPEED_ENV).then(|| "fast".to_string()))
            .unwrap_err();
        assert!(error.to_string().contains(SPEED_ENV));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "excluded_enquiry_statuses": ["lost"] }"#).unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.excluded_enquiry_statuses, vec!["lost".to_string()]);
    }
}
