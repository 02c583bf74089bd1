use crate::domain::model::{
    OutlierPolicy, ServiceRecord, OVERALL_STAR_RATING, RN_CARE_COMPLIANCE, TOTAL_CARE_COMPLIANCE,
};
use crate::utils::stats;
use serde::Serialize;

/// The interquartile fences for one distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFences {
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Fences over the non-missing values handed in. The caller decides the
/// scope: passing the filtered subset makes the outlier definition relative
/// to the active filter, which is the intended behavior.
pub fn fences(values: &[f64], iqr_multiplier: f64) -> Option<IqrFences> {
    let sorted = stats::sorted(values);
    let q1 = stats::quantile(&sorted, 0.25)?;
    let q3 = stats::quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some(IqrFences {
        q1,
        q3,
        lower: q1 - iqr_multiplier * iqr,
        upper: q3 + iqr_multiplier * iqr,
    })
}

/// Per-value outlier flags, aligned with the input. Below the policy's
/// minimum sample size everything is reported in-range; with an IQR of zero
/// the fences collapse onto the data and nothing strictly exceeds them.
pub fn flag_outliers(values: &[f64], policy: &OutlierPolicy) -> Vec<bool> {
    if values.len() < policy.min_sample {
        return vec![false; values.len()];
    }
    match fences(values, policy.iqr_multiplier) {
        Some(f) => values.iter().map(|v| f.is_outlier(*v)).collect(),
        None => vec![false; values.len()],
    }
}

/// Which tail of a metric's distribution is the worrying one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConcernDirection {
    LowIsConcern,
    HighIsConcern,
}

/// The metrics the anomaly scan watches, with the concerning tail for each.
/// Low ratings and low staffing compliance are bad; high adverse-event rates
/// are bad.
pub fn default_watchlist() -> Vec<(String, ConcernDirection)> {
    vec![
        (OVERALL_STAR_RATING.to_string(), ConcernDirection::LowIsConcern),
        (RN_CARE_COMPLIANCE.to_string(), ConcernDirection::LowIsConcern),
        (TOTAL_CARE_COMPLIANCE.to_string(), ConcernDirection::LowIsConcern),
        ("[QM] Pressure injuries*".to_string(), ConcernDirection::HighIsConcern),
        ("[QM] Restrictive practices".to_string(), ConcernDirection::HighIsConcern),
        (
            "[QM] Falls and major injury - falls*".to_string(),
            ConcernDirection::HighIsConcern,
        ),
        (
            "[QM] Medication management - antipsychotic".to_string(),
            ConcernDirection::HighIsConcern,
        ),
    ]
}

/// One service sitting beyond an IQR fence on a watched metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierFinding {
    pub provider_name: String,
    pub service_id: String,
    pub service_name: String,
    pub metric: String,
    pub value: f64,
    pub direction: ConcernDirection,
    pub fences: IqrFences,
}

/// Direction-aware IQR scan across the watched metrics of the current
/// filtered set. Metrics with fewer observed values than the policy minimum
/// are skipped entirely.
pub fn scan_metrics(
    records: &[ServiceRecord],
    watchlist: &[(String, ConcernDirection)],
    policy: &OutlierPolicy,
) -> Vec<OutlierFinding> {
    let mut findings = Vec::new();

    for (metric, direction) in watchlist {
        let observed: Vec<(&ServiceRecord, f64)> = records
            .iter()
            .filter_map(|r| r.indicator(metric).map(|v| (r, v)))
            .collect();

        if observed.len() < policy.min_sample {
            continue;
        }

        let values: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
        let Some(f) = fences(&values, policy.iqr_multiplier) else {
            continue;
        };

        for (record, value) in observed {
            let concerning = match direction {
                ConcernDirection::LowIsConcern => value < f.lower,
                ConcernDirection::HighIsConcern => value > f.upper,
            };
            if concerning {
                findings.push(OutlierFinding {
                    provider_name: record.provider_name.clone(),
                    service_id: record.service_id.clone(),
                    service_name: record.service_name.clone(),
                    metric: metric.clone(),
                    value,
                    direction: *direction,
                    fences: f,
                });
            }
        }
    }

    if !findings.is_empty() {
        tracing::info!("Anomaly scan found {} outlier(s)", findings.len());
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Remoteness, ServiceSize};
    use std::collections::BTreeMap;

    fn record(id: &str, rating: Option<f64>) -> ServiceRecord {
        ServiceRecord {
            service_id: id.to_string(),
            service_name: format!("Service {}", id),
            provider_id: "P1".to_string(),
            provider_name: "Harbour Care".to_string(),
            state: "NSW".to_string(),
            suburb: "Unknown".to_string(),
            mmm_code: None,
            remoteness: Remoteness::Unknown,
            places: None,
            size: ServiceSize::Unknown,
            overall_rating: rating,
            compliance_rating: None,
            staffing_rating: None,
            quality_rating: None,
            experience_rating: None,
            rn_compliance_pct: None,
            total_care_compliance_pct: None,
            quality_measures: BTreeMap::new(),
            compliance_action: None,
        }
    }

    #[test]
    fn test_equal_values_produce_no_outliers() {
        let values = [4.0; 8];
        let policy = OutlierPolicy::default();
        assert!(flag_outliers(&values, &policy).iter().all(|o| !o));
    }

    #[test]
    fn test_extreme_value_is_flagged() {
        let values = [10.0, 11.0, 10.5, 9.5, 10.2, 10.8, 50.0];
        let policy = OutlierPolicy::default();
        let flags = flag_outliers(&values, &policy);
        assert!(flags[6]);
        assert_eq!(flags.iter().filter(|f| **f).count(), 1);
    }

    #[test]
    fn test_small_samples_are_never_flagged() {
        let values = [1.0, 100.0];
        let policy = OutlierPolicy::default();
        assert_eq!(flag_outliers(&values, &policy), vec![false, false]);
    }

    #[test]
    fn test_scan_respects_direction() {
        // One dramatic low rating among an otherwise tight cluster.
        let mut records: Vec<ServiceRecord> = (0..7)
            .map(|i| record(&format!("S{}", i), Some(4.0 + 0.1 * (i % 3) as f64)))
            .collect();
        records.push(record("S-low", Some(1.0)));

        let watchlist = vec![(
            OVERALL_STAR_RATING.to_string(),
            ConcernDirection::LowIsConcern,
        )];
        let findings = scan_metrics(&records, &watchlist, &OutlierPolicy::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].service_id, "S-low");

        // The same data scanned for the high tail reports nothing.
        let watchlist = vec![(
            OVERALL_STAR_RATING.to_string(),
            ConcernDirection::HighIsConcern,
        )];
        assert!(scan_metrics(&records, &watchlist, &OutlierPolicy::default()).is_empty());
    }

    #[test]
    fn test_scan_skips_underpopulated_metrics() {
        let records = vec![record("S1", Some(1.0)), record("S2", Some(5.0))];
        let watchlist = default_watchlist();
        assert!(scan_metrics(&records, &watchlist, &OutlierPolicy::default()).is_empty());
    }

    #[test]
    fn test_missing_values_are_excluded_from_the_distribution() {
        let mut records: Vec<ServiceRecord> = (0..6)
            .map(|i| record(&format!("S{}", i), Some(3.0)))
            .collect();
        records.push(record("S-missing", None));

        let watchlist = vec![(
            OVERALL_STAR_RATING.to_string(),
            ConcernDirection::LowIsConcern,
        )];
        // Six observed equal values: IQR 0, nothing flagged, no panic on the
        // missing row.
        assert!(scan_metrics(&records, &watchlist, &OutlierPolicy::default()).is_empty());
    }
}
