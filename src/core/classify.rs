use crate::domain::model::{ConcernFlag, ConcernReason, RiskThresholds, ServiceRecord};

/// One serious-concern rule: an independent predicate mapped to its reason.
/// Rules are evaluated in order against the immutable record and every match
/// is kept; an earlier hit never suppresses a later rule. Missing inputs do
/// not trigger.
type Rule = (
    ConcernReason,
    fn(&ServiceRecord, &RiskThresholds) -> bool,
);

const RULES: [Rule; 7] = [
    (ConcernReason::LowOverallRating, |r, t| {
        at_or_below(r.overall_rating, t.star_cutoff)
    }),
    (ConcernReason::ActiveComplianceAction, |r, _| {
        r.compliance_action.is_some()
    }),
    (ConcernReason::StaffingBenchmarkShortfall, |r, t| {
        below(r.rn_compliance_pct, t.staffing_benchmark_pct)
            || below(r.total_care_compliance_pct, t.staffing_benchmark_pct)
    }),
    (ConcernReason::NonCompliantRating, |r, _| {
        r.compliance_rating == Some(1.0)
    }),
    (ConcernReason::LowStaffingRating, |r, t| {
        at_or_below(r.staffing_rating, t.star_cutoff)
    }),
    (ConcernReason::LowQualityRating, |r, t| {
        at_or_below(r.quality_rating, t.star_cutoff)
    }),
    (ConcernReason::LowExperienceRating, |r, t| {
        at_or_below(r.experience_rating, t.star_cutoff)
    }),
];

fn at_or_below(value: Option<f64>, cutoff: f64) -> bool {
    value.is_some_and(|v| v <= cutoff)
}

fn below(value: Option<f64>, cutoff: f64) -> bool {
    value.is_some_and(|v| v < cutoff)
}

/// Evaluates the full rule set over one service. `None` when nothing
/// triggered.
pub fn classify(record: &ServiceRecord, thresholds: &RiskThresholds) -> Option<ConcernFlag> {
    let reasons: Vec<ConcernReason> = RULES
        .iter()
        .filter(|(_, predicate)| predicate(record, thresholds))
        .map(|(reason, _)| *reason)
        .collect();

    if reasons.is_empty() {
        return None;
    }

    Some(ConcernFlag {
        service_id: record.service_id.clone(),
        service_name: record.service_name.clone(),
        provider_name: record.provider_name.clone(),
        reasons,
    })
}

/// Concern flags for every service in the filtered subset, in input order.
pub fn classify_all(records: &[ServiceRecord], thresholds: &RiskThresholds) -> Vec<ConcernFlag> {
    let flags: Vec<ConcernFlag> = records
        .iter()
        .filter_map(|r| classify(r, thresholds))
        .collect();

    if !flags.is_empty() {
        tracing::info!(
            "{} of {} services met serious-concern criteria",
            flags.len(),
            records.len()
        );
    }

    flags
}
