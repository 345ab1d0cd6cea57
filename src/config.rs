//! Engine configuration.
//!
//! Every field has a default, so an empty document is a valid config.
//!
//! # Example Config
//!
//! ```toml
//! epoch = "2024-01-01"
//! return_lead_days = 3
//! normal_return_lead_duties = 3
//! scan_laps = 2
//! exclusive_substitutes = true
//! exclusive_substitute_categories = ["special", "weekend", "semi", "normal"]
//! reinsertion_categories = ["special", "weekend", "semi", "normal"]
//! semi_cross_month_search = true
//! normal_next_month_search = true
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::DutyCategory;

/// Tunables for a calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed origin for the epoch-based seed position.
    pub epoch: NaiveDate,
    /// Calendar days after a missing period ends before a Special,
    /// Weekend or Semi reinsertion target.
    pub return_lead_days: i64,
    /// Normal duty days after the return date before a Normal
    /// reinsertion target.
    pub normal_return_lead_duties: usize,
    /// Upper bound for forward roster scans, in roster lengths.
    pub scan_laps: usize,
    /// Prefer substitutes not yet used for another absence in the run.
    pub exclusive_substitutes: bool,
    /// Categories where `exclusive_substitutes` applies.
    pub exclusive_substitute_categories: Vec<DutyCategory>,
    /// Categories that run return-from-absence reinsertion.
    pub reinsertion_categories: Vec<DutyCategory>,
    /// Let Semi conflict resolution search other months as a last resort.
    pub semi_cross_month_search: bool,
    /// Let Normal conflict resolution try the same weekday next month.
    pub normal_next_month_search: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epoch: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            return_lead_days: 3,
            normal_return_lead_duties: 3,
            scan_laps: 2,
            exclusive_substitutes: true,
            exclusive_substitute_categories: DutyCategory::ALL.to_vec(),
            reinsertion_categories: DutyCategory::ALL.to_vec(),
            semi_cross_month_search: true,
            normal_next_month_search: true,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_laps == 0 {
            return Err(ConfigError::Invalid("scan_laps must be at least 1".into()));
        }
        if self.return_lead_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "return_lead_days must not be negative, got {}",
                self.return_lead_days
            )));
        }
        Ok(())
    }

    /// Sets the epoch date.
    pub fn with_epoch(mut self, epoch: NaiveDate) -> Self {
        self.epoch = epoch;
        self
    }

    /// Sets the reinsertion lead in calendar days.
    pub fn with_return_lead_days(mut self, days: i64) -> Self {
        self.return_lead_days = days;
        self
    }

    /// Sets the Normal reinsertion lead in duty days.
    pub fn with_normal_return_lead_duties(mut self, duties: usize) -> Self {
        self.normal_return_lead_duties = duties;
        self
    }

    /// Enables or disables exclusive substitutes.
    pub fn with_exclusive_substitutes(mut self, enabled: bool) -> Self {
        self.exclusive_substitutes = enabled;
        self
    }

    /// Sets the categories that run reinsertion.
    pub fn with_reinsertion_categories(mut self, categories: Vec<DutyCategory>) -> Self {
        self.reinsertion_categories = categories;
        self
    }

    /// Whether substitutes must be exclusive for `category`.
    pub fn substitutes_exclusive(&self, category: DutyCategory) -> bool {
        self.exclusive_substitutes && self.exclusive_substitute_categories.contains(&category)
    }

    /// Whether reinsertion runs for `category`.
    pub fn reinserts(&self, category: DutyCategory) -> bool {
        self.reinsertion_categories.contains(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.return_lead_days, 3);
        assert!(config.reinserts(DutyCategory::Special));
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            epoch = "2020-06-01"
            reinsertion_categories = ["weekend", "semi", "normal"]
            exclusive_substitute_categories = ["special", "weekend"]
            "#,
        )
        .unwrap();
        assert_eq!(config.epoch, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
        assert!(!config.reinserts(DutyCategory::Special));
        assert!(config.substitutes_exclusive(DutyCategory::Weekend));
        assert!(!config.substitutes_exclusive(DutyCategory::Normal));
        assert_eq!(config.scan_laps, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("scan_laps = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("return_lead_days = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_return_lead_days(5)
            .with_exclusive_substitutes(false);
        assert_eq!(config.return_lead_days, 5);
        assert!(!config.substitutes_exclusive(DutyCategory::Weekend));
    }
}
