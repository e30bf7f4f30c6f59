use crate::error::Result;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Approximation ratios used by the coefficient engine. They stand in for
/// balance-sheet sub-lines that the supported forms do not break out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoefficientRatios {
    #[schemars(description = "Share of total liabilities treated as short-term")]
    pub short_term_liabilities: f64,

    #[schemars(description = "Share of assets treated as cash")]
    pub cash: f64,

    #[schemars(description = "Share of assets treated as short-term financial investments")]
    pub financial_investments: f64,

    #[schemars(description = "Share of total liabilities that is not overdue")]
    pub non_overdue_liabilities: f64,
}

impl Default for CoefficientRatios {
    fn default() -> Self {
        Self {
            short_term_liabilities: 0.3,
            cash: 0.1,
            financial_investments: 0.05,
            non_overdue_liabilities: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyticsConfig {
    #[schemars(
        description = "Cell or input texts meaning 'no data'. Compared case-insensitively after trimming. An empty input always means 'no data'."
    )]
    #[serde(default = "default_absent_markers")]
    pub absent_markers: Vec<String>,

    #[schemars(description = "Ratios used when approximating coefficient inputs")]
    #[serde(default)]
    pub coefficient_ratios: CoefficientRatios,
}

fn default_absent_markers() -> Vec<String> {
    vec!["N/A".to_string(), "н/д".to_string(), "-".to_string()]
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            absent_markers: default_absent_markers(),
            coefficient_ratios: CoefficientRatios::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        debug!("Loaded analytics configuration from {}", path.display());
        Ok(config)
    }

    pub fn is_absent_marker(&self, text: &str) -> bool {
        let text = text.trim();
        text.is_empty()
            || self
                .absent_markers
                .iter()
                .any(|marker| marker.trim().to_lowercase() == text.to_lowercase())
    }

    /// Marker used when rendering an undefined value.
    pub fn display_marker(&self) -> &str {
        self.absent_markers.first().map(String::as_str).unwrap_or("N/A")
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyticsConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_ratios() {
        let ratios = CoefficientRatios::default();
        assert_eq!(ratios.short_term_liabilities, 0.3);
        assert_eq!(ratios.cash, 0.1);
        assert_eq!(ratios.financial_investments, 0.05);
        assert_eq!(ratios.non_overdue_liabilities, 0.8);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AnalyticsConfig::from_json_str(r#"{"absent_markers": ["нет"]}"#).unwrap();
        assert_eq!(config.absent_markers, vec!["нет".to_string()]);
        assert_eq!(config.coefficient_ratios, CoefficientRatios::default());
        assert_eq!(config.display_marker(), "нет");
    }

    #[test]
    fn test_absent_marker_matching() {
        let config = AnalyticsConfig::default();
        assert!(config.is_absent_marker("  n/a "));
        assert!(config.is_absent_marker("Н/Д"));
        assert!(config.is_absent_marker(""));
        assert!(!config.is_absent_marker("0"));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"coefficient_ratios": {{"short_term_liabilities": 0.5, "cash": 0.2, "financial_investments": 0.1, "non_overdue_liabilities": 0.9}}}}"#
        )
        .unwrap();

        let config = AnalyticsConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.coefficient_ratios.short_term_liabilities, 0.5);
        assert_eq!(config.absent_markers, default_absent_markers());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = AnalyticsConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("absent_markers"));
        assert!(schema_json.contains("coefficient_ratios"));
        assert!(schema_json.contains("non_overdue_liabilities"));
    }
}
