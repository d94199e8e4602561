//! Analysis configuration.
//!
//! [`TrendConfig`] collects the knobs of the read path: how union labels are
//! built, which year counts as "current" for the z-score, and how aggressive
//! keyword suggestions are.

/// Default number of characters kept in a union label before the ellipsis.
pub const DEFAULT_UNION_LABEL_BUDGET: usize = 50;

/// Default separator between the words of a union label.
pub const DEFAULT_UNION_SEPARATOR: &str = ", ";

/// Default number of suggestions attached to an unknown keyword error.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 3;

/// Default minimum Jaro-Winkler similarity for a suggestion.
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.85;

/// Configuration for keyword aggregation and queries.
///
/// # Examples
///
/// ```
/// use keytrend::TrendConfig;
///
/// let mut config = TrendConfig::new();
/// config.set_union_label_budget(30).set_reference_year(Some(2024));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.reference_year(), 2024);
/// ```
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Characters kept in a union label
    pub(crate) union_label_budget: usize,
    /// Separator between the words of a union label
    pub(crate) union_separator: String,
    /// Year treated as current; `None` means the local calendar year
    pub(crate) reference_year: Option<i32>,
    /// Maximum number of suggestions for an unknown keyword
    pub(crate) suggestion_limit: usize,
    /// Minimum similarity for a suggestion
    pub(crate) suggestion_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendConfig {
    /// Creates a new configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            union_label_budget: DEFAULT_UNION_LABEL_BUDGET,
            union_separator: DEFAULT_UNION_SEPARATOR.to_string(),
            reference_year: None,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
        }
    }

    /// Pins the reference year, builder style
    #[must_use]
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// Sets the number of characters kept in a union label
    pub fn set_union_label_budget(&mut self, budget: usize) -> &mut Self {
        self.union_label_budget = budget;
        self
    }

    /// Sets the separator between the words of a union label
    pub fn set_union_separator(&mut self, separator: &str) -> &mut Self {
        self.union_separator = separator.to_string();
        self
    }

    /// Sets the reference year, or `None` to follow the calendar
    pub fn set_reference_year(&mut self, year: Option<i32>) -> &mut Self {
        self.reference_year = year;
        self
    }

    /// Sets the maximum number of keyword suggestions
    pub fn set_suggestion_limit(&mut self, limit: usize) -> &mut Self {
        self.suggestion_limit = limit;
        self
    }

    /// Sets the minimum similarity (0 to 1) for a keyword suggestion
    pub fn set_suggestion_threshold(&mut self, threshold: f64) -> &mut Self {
        self.suggestion_threshold = threshold;
        self
    }

    /// The year treated as current
    pub fn reference_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(crate::utils::current_year)
    }

    pub fn union_label_budget(&self) -> usize {
        self.union_label_budget
    }

    pub fn union_separator(&self) -> &str {
        &self.union_separator
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.union_label_budget == 0 {
            return Err("Union label budget must be at least 1".to_string());
        }
        if self.union_separator.is_empty() {
            return Err("Union separator cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.suggestion_threshold) {
            return Err(format!(
                "Suggestion threshold {} is outside 0..=1",
                self.suggestion_threshold
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = TrendConfig::new();
        assert_eq!(config.union_label_budget, 50);
        assert_eq!(config.union_separator, ", ");
        assert!(config.reference_year.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reference_year_defaults_to_calendar() {
        let config = TrendConfig::new();
        assert_eq!(config.reference_year(), crate::utils::current_year());
        assert_eq!(config.with_reference_year(1999).reference_year(), 1999);
    }

    #[test]
    fn test_validate_zero_budget() {
        let mut config = TrendConfig::new();
        config.set_union_label_budget(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_separator() {
        let mut config = TrendConfig::new();
        config.set_union_separator("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = TrendConfig::new();
        config.set_suggestion_threshold(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_chaining() {
        let mut config = TrendConfig::new();
        config
            .set_union_label_budget(10)
            .set_union_separator(" | ")
            .set_reference_year(Some(2020))
            .set_suggestion_limit(5)
            .set_suggestion_threshold(0.5);

        assert_eq!(config.union_label_budget, 10);
        assert_eq!(config.union_separator, " | ");
        assert_eq!(config.reference_year(), 2020);
        assert_eq!(config.suggestion_limit, 5);
        assert_eq!(config.suggestion_threshold, 0.5);
    }
}
