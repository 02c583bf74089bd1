use crate::core::benchmark::ProviderComparison;
use crate::core::filter::FilterSelection;
use crate::core::outlier::{ConcernDirection, OutlierFinding};
use crate::domain::model::{
    ConcernFlag, IndicatorSummary, ProviderProfile, QualityWarning, ServiceRecord,
};
use crate::utils::error::Result;
use crate::utils::stats;
use serde::Serialize;
use std::io::Write;

/// Presentation-time rounding. Internal computation keeps full precision;
/// only rendered numbers are rounded, and only here.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Renders an optional statistic for display: one decimal place, "N/A" for
/// missing.
pub fn fmt1(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => "N/A".to_string(),
    }
}

/// Headline metrics over the filtered sector. An empty subset renders as an
/// explicit empty state: zero counts, missing means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorOverview {
    pub services: usize,
    pub mean_rn_compliance_pct: Option<f64>,
    pub mean_total_care_compliance_pct: Option<f64>,
    pub non_compliant_services: usize,
}

pub fn sector_overview(records: &[ServiceRecord]) -> SectorOverview {
    let rn: Vec<f64> = records.iter().filter_map(|r| r.rn_compliance_pct).collect();
    let total: Vec<f64> = records
        .iter()
        .filter_map(|r| r.total_care_compliance_pct)
        .collect();

    SectorOverview {
        services: records.len(),
        mean_rn_compliance_pct: stats::mean(&rn),
        mean_total_care_compliance_pct: stats::mean(&total),
        non_compliant_services: records
            .iter()
            .filter(|r| r.compliance_rating == Some(1.0))
            .count(),
    }
}

/// Everything the rendering layer needs from one analysis cycle, in one
/// serializable bundle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub source: String,
    pub selection: FilterSelection,
    pub overview: SectorOverview,
    pub provider: Option<ProviderProfile>,
    pub comparisons: Vec<ProviderComparison>,
    pub indicators: Vec<IndicatorSummary>,
    pub findings: Vec<OutlierFinding>,
    pub concerns: Vec<ConcernFlag>,
    pub warnings: Vec<QualityWarning>,
}

/// Concern flags as a CSV table, one row per flagged service.
pub fn write_concerns_csv<W: Write>(writer: W, concerns: &[ConcernFlag]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Service ID", "Service Name", "Provider Name", "Reasons"])?;
    for flag in concerns {
        let reasons = flag
            .reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        csv.write_record([
            flag.service_id.as_str(),
            flag.service_name.as_str(),
            flag.provider_name.as_str(),
            reasons.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Outlier findings as a CSV table mirroring the anomaly report: metric,
/// value, which fence was crossed and the quartile range it came from.
pub fn write_findings_csv<W: Write>(writer: W, findings: &[OutlierFinding]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Provider Name",
        "Service ID",
        "Service Name",
        "Metric",
        "Value",
        "Reason",
        "IQR Range",
    ])?;
    for f in findings {
        let reason = match f.direction {
            ConcernDirection::LowIsConcern => {
                format!("Low outlier (< {})", fmt1(Some(f.fences.lower)))
            }
            ConcernDirection::HighIsConcern => {
                format!("High outlier (> {})", fmt1(Some(f.fences.upper)))
            }
        };
        let range = format!("[{} - {}]", fmt1(Some(f.fences.q1)), fmt1(Some(f.fences.q3)));
        csv.write_record([
            f.provider_name.as_str(),
            f.service_id.as_str(),
            f.service_name.as_str(),
            f.metric.as_str(),
            fmt1(Some(f.value)).as_str(),
            reason.as_str(),
            range.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}
