pub mod cli;
pub mod toml_config;

pub use toml_config::TomlConfig;

use crate::core::filter::FilterSelection;
use crate::domain::model::{OutlierPolicy, Remoteness, RiskThresholds, ServiceSize};
use crate::domain::ports::Thresholds;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Parser)]
#[command(name = "care-metrics")]
#[command(about = "Analytics over the Star Ratings quarterly data extract")]
pub struct CliConfig {
    /// Path to the quarterly extract (.xlsx)
    #[arg(long)]
    pub input: String,

    /// Optional TOML file overriding the threshold flags below
    #[arg(long)]
    pub config: Option<String>,

    /// Restrict to these states/territories (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub states: Vec<String>,

    /// Restrict to one provider (id or name)
    #[arg(long)]
    pub provider: Option<String>,

    /// Restrict to these size buckets: small, medium, large
    #[arg(long, value_delimiter = ',')]
    pub sizes: Vec<String>,

    /// Restrict to these MMM remoteness codes (1-7)
    #[arg(long, value_delimiter = ',')]
    pub mmm: Vec<u8>,

    /// Star ratings at or below this value raise a concern
    #[arg(long, default_value = "2.0")]
    pub star_cutoff: f64,

    /// Care-minute compliance % below this value is a shortfall
    #[arg(long, default_value = "85.0")]
    pub staffing_benchmark: f64,

    /// IQR fence multiplier for outlier detection
    #[arg(long, default_value = "1.5")]
    pub iqr_multiplier: f64,

    /// Minimum observed values before outliers are reported
    #[arg(long, default_value = "5")]
    pub outlier_min_sample: usize,

    /// Places below this count make a service small
    #[arg(long, default_value = "30")]
    pub small_breakpoint: u32,

    /// Places above this count make a service large
    #[arg(long, default_value = "60")]
    pub medium_breakpoint: u32,

    /// Fail the load on structurally invalid rows instead of skipping them
    #[arg(long)]
    pub strict: bool,

    /// Emit the full analysis report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Directory to write concerns.csv / outliers.csv into
    #[arg(long)]
    pub export_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// The filter predicate set selected on the command line. Empty axes
    /// mean ANY.
    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            states: non_empty(self.states.iter().cloned().collect()),
            provider: self.provider.clone(),
            sizes: non_empty(self.sizes.iter().map(|s| ServiceSize::parse(s)).collect()),
            remoteness: non_empty(
                self.mmm
                    .iter()
                    .map(|code| Remoteness::from_mmm(*code))
                    .collect(),
            ),
        }
    }
}

fn non_empty<T: Ord>(set: BTreeSet<T>) -> Option<BTreeSet<T>> {
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

impl Thresholds for CliConfig {
    fn risk(&self) -> RiskThresholds {
        RiskThresholds {
            star_cutoff: self.star_cutoff,
            staffing_benchmark_pct: self.staffing_benchmark,
        }
    }

    fn outliers(&self) -> OutlierPolicy {
        OutlierPolicy {
            iqr_multiplier: self.iqr_multiplier,
            min_sample: self.outlier_min_sample,
        }
    }

    fn size_breakpoints(&self) -> (u32, u32) {
        (self.small_breakpoint, self.medium_breakpoint)
    }

    fn strict(&self) -> bool {
        self.strict
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_range("star_cutoff", self.star_cutoff, 1.0, 5.0)?;
        validation::validate_range("staffing_benchmark", self.staffing_benchmark, 0.0, 200.0)?;
        validation::validate_range("iqr_multiplier", self.iqr_multiplier, 0.1, 10.0)?;
        validation::validate_positive_number("outlier_min_sample", self.outlier_min_sample, 1)?;
        validation::validate_range(
            "small_breakpoint",
            self.small_breakpoint,
            1,
            self.medium_breakpoint,
        )?;

        for size in &self.sizes {
            if ServiceSize::parse(size) == ServiceSize::Unknown {
                return Err(crate::utils::error::AnalyticsError::InvalidConfigValueError {
                    field: "sizes".to_string(),
                    value: size.clone(),
                    reason: "Expected one of: small, medium, large".to_string(),
                });
            }
        }
        for code in &self.mmm {
            validation::validate_range("mmm", *code as usize, 1, 7)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CliConfig {
        CliConfig {
            input: "extract.xlsx".to_string(),
            config: None,
            states: vec![],
            provider: None,
            sizes: vec![],
            mmm: vec![],
            star_cutoff: 2.0,
            staffing_benchmark: 85.0,
            iqr_multiplier: 1.5,
            outlier_min_sample: 5,
            small_breakpoint: 30,
            medium_breakpoint: 60,
            strict: false,
            json: false,
            export_path: None,
            verbose: false,
        }
    }

    #[test]
    fn test_default_selection_is_unrestricted() {
        assert!(base().selection().is_unrestricted());
    }

    #[test]
    fn test_selection_maps_sizes_and_mmm() {
        let mut config = base();
        config.sizes = vec!["small".to_string(), "Large".to_string()];
        config.mmm = vec![1, 6];

        let selection = config.selection();
        let sizes = selection.sizes.unwrap();
        assert!(sizes.contains(&ServiceSize::Small));
        assert!(sizes.contains(&ServiceSize::Large));
        let remoteness = selection.remoteness.unwrap();
        assert!(remoteness.contains(&Remoteness::Metropolitan));
        assert!(remoteness.contains(&Remoteness::Remote));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = base();
        config.star_cutoff = 7.0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.sizes = vec!["gigantic".to_string()];
        assert!(config.validate().is_err());

        let mut config = base();
        config.mmm = vec![9];
        assert!(config.validate().is_err());

        assert!(base().validate().is_ok());
    }
}
