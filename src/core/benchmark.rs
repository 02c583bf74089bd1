use crate::domain::model::{
    ServiceRecord, OVERALL_STAR_RATING, RN_CARE_COMPLIANCE, TOTAL_CARE_COMPLIANCE,
};
use crate::utils::stats;
use serde::Serialize;

/// The measures the provider comparison reports on by default.
pub const CORE_MEASURES: [&str; 3] = [
    OVERALL_STAR_RATING,
    RN_CARE_COMPLIANCE,
    TOTAL_CARE_COMPLIANCE,
];

/// Median / 75th / 90th percentile of one measure across a peer set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorBenchmark {
    pub measure: String,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
}

/// Sector benchmarks per measure over the given records (usually the
/// filtered sector minus the provider under comparison). Measures with no
/// observed values report missing across the board.
pub fn sector_benchmarks(records: &[ServiceRecord], measures: &[&str]) -> Vec<SectorBenchmark> {
    measures
        .iter()
        .map(|measure| {
            let sorted = stats::sorted(&observed(records, measure));
            SectorBenchmark {
                measure: measure.to_string(),
                median: stats::quantile(&sorted, 0.5),
                p75: stats::quantile(&sorted, 0.75),
                p90: stats::quantile(&sorted, 0.9),
            }
        })
        .collect()
}

/// One row of the provider-vs-sector comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderComparison {
    pub measure: String,
    pub provider_mean: Option<f64>,
    pub sector_median: Option<f64>,
    pub sector_p75: Option<f64>,
    pub sector_p90: Option<f64>,
    /// Weak percentile rank of the provider's mean within the peer
    /// distribution: the share of peer values at or below it.
    pub percentile_rank: Option<f64>,
}

/// Compares one provider's mean on each measure against the rest of the
/// filtered sector. The provider's own services are excluded from the peer
/// set so it is never benchmarked against itself.
pub fn compare_provider(
    records: &[ServiceRecord],
    provider: &str,
    measures: &[&str],
) -> Vec<ProviderComparison> {
    let (own, peers): (Vec<&ServiceRecord>, Vec<&ServiceRecord>) = records
        .iter()
        .partition(|r| r.provider_id == provider || r.provider_name == provider);

    measures
        .iter()
        .map(|measure| {
            let own_values: Vec<f64> = own.iter().filter_map(|r| r.indicator(measure)).collect();
            let peer_values: Vec<f64> =
                peers.iter().filter_map(|r| r.indicator(measure)).collect();
            let sorted_peers = stats::sorted(&peer_values);

            let provider_mean = stats::mean(&own_values);
            ProviderComparison {
                measure: measure.to_string(),
                provider_mean,
                sector_median: stats::quantile(&sorted_peers, 0.5),
                sector_p75: stats::quantile(&sorted_peers, 0.75),
                sector_p90: stats::quantile(&sorted_peers, 0.9),
                percentile_rank: provider_mean
                    .and_then(|m| stats::percentile_rank(&peer_values, m)),
            }
        })
        .collect()
}

fn observed(records: &[ServiceRecord], measure: &str) -> Vec<f64> {
    records.iter().filter_map(|r| r.indicator(measure)).collect()
}
