use crate::core::outlier;
use crate::domain::model::{
    IndicatorPoint, IndicatorSummary, OutlierPolicy, ProviderProfile, ServiceRecord, SizeCounts,
};
use crate::utils::stats;
use std::collections::BTreeSet;

/// Builds the per-provider aggregate from the current filtered subset.
/// With no matching services every count is zero and every mean is missing,
/// which downstream renders as an explicit empty state.
pub fn provider_profile(records: &[ServiceRecord], provider: &str) -> ProviderProfile {
    let own: Vec<ServiceRecord> = records
        .iter()
        .filter(|r| r.provider_id == provider || r.provider_name == provider)
        .cloned()
        .collect();

    let mut size_counts = SizeCounts::default();
    let mut suburbs: BTreeSet<&str> = BTreeSet::new();
    for r in &own {
        size_counts.add(r.size);
        suburbs.insert(r.suburb.as_str());
    }

    let ratings = collect(&own, |r| r.overall_rating);
    let rn = collect(&own, |r| r.rn_compliance_pct);
    let total = collect(&own, |r| r.total_care_compliance_pct);

    ProviderProfile {
        provider_id: own
            .first()
            .map(|r| r.provider_id.clone())
            .unwrap_or_else(|| provider.to_string()),
        provider_name: own
            .first()
            .map(|r| r.provider_name.clone())
            .unwrap_or_else(|| provider.to_string()),
        services: own.len(),
        distinct_suburbs: suburbs.len(),
        size_counts,
        mean_overall_rating: stats::mean(&ratings),
        mean_rn_compliance_pct: stats::mean(&rn),
        mean_total_care_compliance_pct: stats::mean(&total),
        records: own,
    }
}

/// Mean, SEM and per-service outlier flags for one indicator over the
/// filtered subset. Missing values are excluded from every statistic; SEM is
/// missing (not zero) below two observations.
pub fn indicator_summary(
    records: &[ServiceRecord],
    indicator: &str,
    policy: &OutlierPolicy,
) -> IndicatorSummary {
    let observed: Vec<(&ServiceRecord, f64)> = records
        .iter()
        .filter_map(|r| r.indicator(indicator).map(|v| (r, v)))
        .collect();

    let values: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
    let flags = outlier::flag_outliers(&values, policy);

    let points = observed
        .iter()
        .zip(flags)
        .map(|((record, value), outlier)| IndicatorPoint {
            service_id: record.service_id.clone(),
            value: *value,
            outlier,
        })
        .collect();

    IndicatorSummary {
        indicator: indicator.to_string(),
        mean: stats::mean(&values),
        sem: stats::sem(&values),
        count: values.len(),
        points,
    }
}

fn collect<F>(records: &[ServiceRecord], get: F) -> Vec<f64>
where
    F: Fn(&ServiceRecord) -> Option<f64>,
{
    records.iter().filter_map(get).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Remoteness, ServiceSize, OVERALL_STAR_RATING};
    use std::collections::BTreeMap;

    fn record(
        id: &str,
        provider: &str,
        suburb: &str,
        size: ServiceSize,
        rating: Option<f64>,
        rn_pct: Option<f64>,
    ) -> ServiceRecord {
        ServiceRecord {
            service_id: id.to_string(),
            service_name: format!("Service {}", id),
            provider_id: provider.to_string(),
            provider_name: format!("{} Care", provider),
            state: "NSW".to_string(),
            suburb: suburb.to_string(),
            mmm_code: None,
            remoteness: Remoteness::Unknown,
            places: None,
            size,
            overall_rating: rating,
            compliance_rating: None,
            staffing_rating: None,
            quality_rating: None,
            experience_rating: None,
            rn_compliance_pct: rn_pct,
            total_care_compliance_pct: None,
            quality_measures: BTreeMap::new(),
            compliance_action: None,
        }
    }

    #[test]
    fn test_profile_counts_and_means() {
        let records = vec![
            record("S1", "P1", "Newtown", ServiceSize::Small, Some(1.0), Some(70.0)),
            record("S2", "P1", "Marrickville", ServiceSize::Large, Some(4.0), Some(95.0)),
            record("S3", "P2", "Newtown", ServiceSize::Small, Some(5.0), Some(99.0)),
        ];

        let profile = provider_profile(&records, "P1");
        assert_eq!(profile.services, 2);
        assert_eq!(profile.distinct_suburbs, 2);
        assert_eq!(profile.size_counts.small, 1);
        assert_eq!(profile.size_counts.large, 1);
        assert_eq!(profile.mean_overall_rating, Some(2.5));
        assert_eq!(profile.mean_rn_compliance_pct, Some(82.5));
    }

    #[test]
    fn test_profile_with_no_matching_services_is_empty_state() {
        let records = vec![record(
            "S1",
            "P1",
            "Newtown",
            ServiceSize::Small,
            Some(3.0),
            None,
        )];
        let profile = provider_profile(&records, "P9");
        assert_eq!(profile.services, 0);
        assert_eq!(profile.distinct_suburbs, 0);
        assert_eq!(profile.mean_overall_rating, None);
        assert!(profile.records.is_empty());
    }

    #[test]
    fn test_missing_values_excluded_from_mean_but_counted_as_services() {
        let records = vec![
            record("S1", "P1", "A", ServiceSize::Small, Some(2.0), None),
            record("S2", "P1", "B", ServiceSize::Small, None, None),
            record("S3", "P1", "C", ServiceSize::Small, Some(4.0), None),
        ];

        let profile = provider_profile(&records, "P1");
        assert_eq!(profile.services, 3);
        assert_eq!(profile.mean_overall_rating, Some(3.0));

        let summary = indicator_summary(&records, OVERALL_STAR_RATING, &OutlierPolicy::default());
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, Some(3.0));
    }

    #[test]
    fn test_indicator_summary_sem_missing_below_two() {
        let records = vec![record(
            "S1",
            "P1",
            "A",
            ServiceSize::Small,
            Some(3.0),
            None,
        )];
        let summary = indicator_summary(&records, OVERALL_STAR_RATING, &OutlierPolicy::default());
        assert_eq!(summary.count, 1);
        assert_eq!(summary.mean, Some(3.0));
        assert_eq!(summary.sem, None);
    }

    #[test]
    fn test_indicator_summary_mean_within_bounds() {
        let records: Vec<ServiceRecord> = [1.0, 2.0, 5.0, 4.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                record(
                    &format!("S{}", i),
                    "P1",
                    "A",
                    ServiceSize::Small,
                    Some(*v),
                    None,
                )
            })
            .collect();

        let summary = indicator_summary(&records, OVERALL_STAR_RATING, &OutlierPolicy::default());
        let mean = summary.mean.unwrap();
        assert!(mean >= 1.0 && mean <= 5.0);
        assert_eq!(summary.points.len(), 5);
    }

    #[test]
    fn test_indicator_summary_on_empty_subset() {
        let summary = indicator_summary(&[], OVERALL_STAR_RATING, &OutlierPolicy::default());
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.sem, None);
        assert!(summary.points.is_empty());
    }
}
