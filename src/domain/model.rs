use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Service size bucket as published in the extract, or derived from the
/// residential places count when the `Size` column is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ServiceSize {
    Small,
    Medium,
    Large,
    Unknown,
}

impl ServiceSize {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "small" => ServiceSize::Small,
            "medium" => ServiceSize::Medium,
            "large" => ServiceSize::Large,
            _ => ServiceSize::Unknown,
        }
    }

    /// Bucket a places count with the configured breakpoints
    /// (small < low ≤ medium ≤ high < large).
    pub fn from_places(places: u32, breakpoints: (u32, u32)) -> Self {
        let (low, high) = breakpoints;
        if places < low {
            ServiceSize::Small
        } else if places <= high {
            ServiceSize::Medium
        } else {
            ServiceSize::Large
        }
    }
}

impl fmt::Display for ServiceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceSize::Small => "Small",
            ServiceSize::Medium => "Medium",
            ServiceSize::Large => "Large",
            ServiceSize::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Modified Monash Model remoteness bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Remoteness {
    Metropolitan,
    RegionalCentre,
    Rural,
    Remote,
    VeryRemote,
    Unknown,
}

impl Remoteness {
    pub fn from_mmm(code: u8) -> Self {
        match code {
            1 => Remoteness::Metropolitan,
            2 => Remoteness::RegionalCentre,
            3..=5 => Remoteness::Rural,
            6 => Remoteness::Remote,
            7 => Remoteness::VeryRemote,
            _ => Remoteness::Unknown,
        }
    }
}

impl fmt::Display for Remoteness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Remoteness::Metropolitan => "Metropolitan",
            Remoteness::RegionalCentre => "Regional centre",
            Remoteness::Rural => "Rural",
            Remoteness::Remote => "Remote",
            Remoteness::VeryRemote => "Very remote",
            Remoteness::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// A regulatory compliance decision recorded against a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAction {
    pub decision_type: String,
    pub applied: Option<NaiveDate>,
    pub ends: Option<NaiveDate>,
}

/// One row of the extract: a residential aged-care service at assessment
/// time. Missing analytic fields stay `None` and are excluded from means and
/// SEM, never treated as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service_id: String,
    pub service_name: String,
    pub provider_id: String,
    pub provider_name: String,
    pub state: String,
    pub suburb: String,
    pub mmm_code: Option<u8>,
    pub remoteness: Remoteness,
    pub places: Option<u32>,
    pub size: ServiceSize,
    pub overall_rating: Option<f64>,
    pub compliance_rating: Option<f64>,
    pub staffing_rating: Option<f64>,
    pub quality_rating: Option<f64>,
    pub experience_rating: Option<f64>,
    pub rn_compliance_pct: Option<f64>,
    pub total_care_compliance_pct: Option<f64>,
    /// Named quality-measure rates; a measure with no value is simply absent.
    pub quality_measures: BTreeMap<String, f64>,
    pub compliance_action: Option<ComplianceAction>,
}

/// Pseudo-indicator names accepted by [`ServiceRecord::indicator`] in
/// addition to the `[QM]` columns, so rating and staffing metrics can go
/// through the same summary/outlier machinery as quality measures.
pub const OVERALL_STAR_RATING: &str = "Overall Star Rating";
pub const RN_CARE_COMPLIANCE: &str = "RN Care Compliance %";
pub const TOTAL_CARE_COMPLIANCE: &str = "Total Care Compliance %";

impl ServiceRecord {
    /// Value of a named indicator for this service, missing when not
    /// recorded.
    pub fn indicator(&self, name: &str) -> Option<f64> {
        match name {
            OVERALL_STAR_RATING => self.overall_rating,
            RN_CARE_COMPLIANCE => self.rn_compliance_pct,
            TOTAL_CARE_COMPLIANCE => self.total_care_compliance_pct,
            _ => self.quality_measures.get(name).copied(),
        }
    }

    /// Names of all quality measures present across a record set, sorted.
    pub fn measure_names(records: &[ServiceRecord]) -> BTreeSet<String> {
        records
            .iter()
            .flat_map(|r| r.quality_measures.keys().cloned())
            .collect()
    }
}

/// Row-level data-quality notice collected while normalizing. These ride
/// alongside the valid rows so a caller can surface them without blocking
/// the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityWarning {
    /// Zero-based data row within the "Detailed data" sheet.
    pub row: usize,
    pub service_id: Option<String>,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SizeCounts {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
    pub unknown: usize,
}

impl SizeCounts {
    pub fn add(&mut self, size: ServiceSize) {
        match size {
            ServiceSize::Small => self.small += 1,
            ServiceSize::Medium => self.medium += 1,
            ServiceSize::Large => self.large += 1,
            ServiceSize::Unknown => self.unknown += 1,
        }
    }
}

/// Per-provider aggregate, rebuilt from the current filtered subset on every
/// selection change. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub provider_name: String,
    pub services: usize,
    pub distinct_suburbs: usize,
    pub size_counts: SizeCounts,
    pub mean_overall_rating: Option<f64>,
    pub mean_rn_compliance_pct: Option<f64>,
    pub mean_total_care_compliance_pct: Option<f64>,
    pub records: Vec<ServiceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub service_id: String,
    pub value: f64,
    pub outlier: bool,
}

/// Summary statistics for one indicator over the filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSummary {
    pub indicator: String,
    pub mean: Option<f64>,
    /// Standard error of the mean; missing (not zero) when fewer than two
    /// values were observed.
    pub sem: Option<f64>,
    pub count: usize,
    pub points: Vec<IndicatorPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConcernReason {
    LowOverallRating,
    ActiveComplianceAction,
    StaffingBenchmarkShortfall,
    NonCompliantRating,
    LowStaffingRating,
    LowQualityRating,
    LowExperienceRating,
}

impl fmt::Display for ConcernReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConcernReason::LowOverallRating => "low star rating",
            ConcernReason::ActiveComplianceAction => "active compliance action",
            ConcernReason::StaffingBenchmarkShortfall => "staffing benchmark shortfall",
            ConcernReason::NonCompliantRating => "non-compliance rating",
            ConcernReason::LowStaffingRating => "low staffing rating",
            ConcernReason::LowQualityRating => "low quality measures rating",
            ConcernReason::LowExperienceRating => "low residents' experience rating",
        };
        f.write_str(label)
    }
}

/// A service that met one or more serious-concern rules, with every matching
/// reason retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcernFlag {
    pub service_id: String,
    pub service_name: String,
    pub provider_name: String,
    pub reasons: Vec<ConcernReason>,
}

/// Regulatory thresholds driving the risk classifier. These change between
/// reporting periods, so they are configuration, not constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Star ratings at or below this value are a concern.
    pub star_cutoff: f64,
    /// Care-minute compliance percentages below this value are a shortfall.
    pub staffing_benchmark_pct: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            star_cutoff: 2.0,
            staffing_benchmark_pct: 85.0,
        }
    }
}

/// IQR-rule parameters for the outlier detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierPolicy {
    pub iqr_multiplier: f64,
    /// Below this many observed values no outliers are reported at all.
    pub min_sample: usize,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
            min_sample: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bucket_breakpoints() {
        let bp = (30, 60);
        assert_eq!(ServiceSize::from_places(0, bp), ServiceSize::Small);
        assert_eq!(ServiceSize::from_places(29, bp), ServiceSize::Small);
        assert_eq!(ServiceSize::from_places(30, bp), ServiceSize::Medium);
        assert_eq!(ServiceSize::from_places(60, bp), ServiceSize::Medium);
        assert_eq!(ServiceSize::from_places(61, bp), ServiceSize::Large);
    }

    #[test]
    fn test_size_parse_is_case_insensitive() {
        assert_eq!(ServiceSize::parse("small"), ServiceSize::Small);
        assert_eq!(ServiceSize::parse("LARGE"), ServiceSize::Large);
        assert_eq!(ServiceSize::parse("??"), ServiceSize::Unknown);
    }

    #[test]
    fn test_remoteness_from_mmm() {
        assert_eq!(Remoteness::from_mmm(1), Remoteness::Metropolitan);
        assert_eq!(Remoteness::from_mmm(2), Remoteness::RegionalCentre);
        assert_eq!(Remoteness::from_mmm(4), Remoteness::Rural);
        assert_eq!(Remoteness::from_mmm(7), Remoteness::VeryRemote);
        assert_eq!(Remoteness::from_mmm(0), Remoteness::Unknown);
        assert_eq!(Remoteness::from_mmm(9), Remoteness::Unknown);
    }
}
