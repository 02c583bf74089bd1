use crate::domain::model::{OutlierPolicy, RiskThresholds};
use crate::domain::ports::Thresholds;
use crate::utils::error::{AnalyticsError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File-based configuration for deployments where the regulatory thresholds
/// are managed alongside the data drop rather than typed on the command
/// line. Every value is optional and falls back to the same defaults the CLI
/// flags use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub analysis: AnalysisConfig,
    pub thresholds: Option<ThresholdConfig>,
    pub outliers: Option<OutlierConfig>,
    pub normalize: Option<NormalizeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub star_cutoff: Option<f64>,
    pub staffing_benchmark_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierConfig {
    pub iqr_multiplier: Option<f64>,
    pub min_sample: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    pub strict: Option<bool>,
    pub small_breakpoint: Option<u32>,
    pub medium_breakpoint: Option<u32>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AnalyticsError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 先替換 ${VAR} 形式的環境變數
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AnalyticsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Thresholds for TomlConfig {
    fn risk(&self) -> RiskThresholds {
        let defaults = RiskThresholds::default();
        let section = self.thresholds.as_ref();
        RiskThresholds {
            star_cutoff: section
                .and_then(|t| t.star_cutoff)
                .unwrap_or(defaults.star_cutoff),
            staffing_benchmark_pct: section
                .and_then(|t| t.staffing_benchmark_pct)
                .unwrap_or(defaults.staffing_benchmark_pct),
        }
    }

    fn outliers(&self) -> OutlierPolicy {
        let defaults = OutlierPolicy::default();
        let section = self.outliers.as_ref();
        OutlierPolicy {
            iqr_multiplier: section
                .and_then(|o| o.iqr_multiplier)
                .unwrap_or(defaults.iqr_multiplier),
            min_sample: section
                .and_then(|o| o.min_sample)
                .unwrap_or(defaults.min_sample),
        }
    }

    fn size_breakpoints(&self) -> (u32, u32) {
        let section = self.normalize.as_ref();
        (
            section.and_then(|n| n.small_breakpoint).unwrap_or(30),
            section.and_then(|n| n.medium_breakpoint).unwrap_or(60),
        )
    }

    fn strict(&self) -> bool {
        self.normalize
            .as_ref()
            .and_then(|n| n.strict)
            .unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("analysis.name", &self.analysis.name)?;

        let risk = self.risk();
        validation::validate_range("thresholds.star_cutoff", risk.star_cutoff, 1.0, 5.0)?;
        validation::validate_range(
            "thresholds.staffing_benchmark_pct",
            risk.staffing_benchmark_pct,
            0.0,
            200.0,
        )?;

        let outliers = self.outliers();
        validation::validate_range("outliers.iqr_multiplier", outliers.iqr_multiplier, 0.1, 10.0)?;
        validation::validate_positive_number("outliers.min_sample", outliers.min_sample, 1)?;

        let (small, medium) = self.size_breakpoints();
        validation::validate_range("normalize.small_breakpoint", small, 1, medium)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_config() {
        let toml_content = r#"
[analysis]
name = "february-2025"
description = "Quarterly extract analysis"

[thresholds]
star_cutoff = 2.0
staffing_benchmark_pct = 90.0

[outliers]
min_sample = 8
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.analysis.name, "february-2025");
        assert_eq!(config.risk().staffing_benchmark_pct, 90.0);
        assert_eq!(config.outliers().min_sample, 8);
        // Unset values fall back to defaults.
        assert_eq!(config.outliers().iqr_multiplier, 1.5);
        assert_eq!(config.size_breakpoints(), (30, 60));
        assert!(!config.strict());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_ANALYSIS_NAME", "env-run");

        let toml_content = r#"
[analysis]
name = "${TEST_ANALYSIS_NAME}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.analysis.name, "env-run");

        std::env::remove_var("TEST_ANALYSIS_NAME");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[analysis]
name = "bad"

[thresholds]
star_cutoff = 9.0
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[analysis]
name = "file-test"

[normalize]
strict = true
small_breakpoint = 25
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.analysis.name, "file-test");
        assert!(config.strict());
        assert_eq!(config.size_breakpoints(), (25, 60));
    }
}
