use crate::core::loader::{columns, RawTable};
use crate::domain::model::{
    ComplianceAction, QualityWarning, Remoteness, ServiceRecord, ServiceSize,
};
use crate::domain::ports::Thresholds;
use crate::utils::error::{AnalyticsError, Result};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// In strict mode a structurally impossible row fails the whole load;
    /// otherwise the row is dropped and reported as a warning.
    pub strict: bool,
    /// (small upper bound, medium upper bound) in residential places.
    pub size_breakpoints: (u32, u32),
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            size_breakpoints: (30, 60),
        }
    }
}

impl NormalizeOptions {
    pub fn from_thresholds<T: Thresholds + ?Sized>(thresholds: &T) -> Self {
        Self {
            strict: thresholds.strict(),
            size_breakpoints: thresholds.size_breakpoints(),
        }
    }
}

/// The normalizer's output: every structurally valid row as a
/// [`ServiceRecord`], plus the data-quality notices gathered along the way.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<ServiceRecord>,
    pub warnings: Vec<QualityWarning>,
}

struct WarningSink {
    warnings: Vec<QualityWarning>,
}

impl WarningSink {
    fn push(&mut self, row: usize, service_id: Option<&str>, field: &str, message: String) {
        self.warnings.push(QualityWarning {
            row,
            service_id: service_id.map(str::to_string),
            field: field.to_string(),
            message,
        });
    }
}

/// Turns the loaded table into service records. One bad field degrades to
/// missing and never drops the row; only a structurally impossible row
/// (blank identifier, duplicate identifier, negative place count) is dropped,
/// or fails the load in strict mode.
pub fn normalize(table: &RawTable, opts: &NormalizeOptions) -> Result<Normalized> {
    let mut records = Vec::with_capacity(table.row_count());
    let mut sink = WarningSink {
        warnings: Vec::new(),
    };
    let mut seen_ids: HashSet<String> = HashSet::new();

    for row in 0..table.row_count() {
        match normalize_row(table, row, opts, &mut sink, &mut seen_ids)? {
            Some(record) => records.push(record),
            None => continue,
        }
    }

    tracing::debug!(
        "Normalized {} of {} rows ({} warnings)",
        records.len(),
        table.row_count(),
        sink.warnings.len()
    );

    Ok(Normalized {
        records,
        warnings: sink.warnings,
    })
}

fn normalize_row(
    table: &RawTable,
    row: usize,
    opts: &NormalizeOptions,
    sink: &mut WarningSink,
    seen_ids: &mut HashSet<String>,
) -> Result<Option<ServiceRecord>> {
    // 服務編號是整個模型的主鍵，缺少就只能放棄該列
    let service_id = match table.text(row, columns::SERVICE_ID) {
        Some(id) => id,
        None => {
            let reason = "blank service identifier".to_string();
            if opts.strict {
                return Err(AnalyticsError::Normalization { row, reason });
            }
            sink.push(row, None, columns::SERVICE_ID, reason);
            return Ok(None);
        }
    };

    if !seen_ids.insert(service_id.clone()) {
        let reason = format!("duplicate service identifier '{}'", service_id);
        if opts.strict {
            return Err(AnalyticsError::Normalization { row, reason });
        }
        sink.push(row, Some(&service_id), columns::SERVICE_ID, reason);
        return Ok(None);
    }

    let places = match table.number(row, columns::PLACES) {
        Some(p) if p < 0.0 => {
            // 負數容量在結構上不可能成立
            let reason = format!("negative residential places count ({})", p);
            if opts.strict {
                return Err(AnalyticsError::Normalization { row, reason });
            }
            sink.push(row, Some(&service_id), columns::PLACES, reason);
            return Ok(None);
        }
        Some(p) => Some(p.round() as u32),
        None => None,
    };

    // Prefer the published Size column; derive from places when absent.
    let size = match table.text(row, columns::SIZE) {
        Some(text) => {
            let parsed = ServiceSize::parse(&text);
            if parsed == ServiceSize::Unknown {
                sink.push(
                    row,
                    Some(&service_id),
                    columns::SIZE,
                    format!("unrecognized size bucket '{}'", text),
                );
            }
            parsed
        }
        None => places
            .map(|p| ServiceSize::from_places(p, opts.size_breakpoints))
            .unwrap_or(ServiceSize::Unknown),
    };

    let mmm_code = table
        .number(row, columns::MMM_CODE)
        .map(|m| m.round() as u8);
    let remoteness = mmm_code.map(Remoteness::from_mmm).unwrap_or(Remoteness::Unknown);

    let mut rating = |column: &str| star_rating(table, row, &service_id, column, sink);
    let overall_rating = rating(columns::OVERALL_RATING);
    let compliance_rating = rating(columns::COMPLIANCE_RATING);
    let staffing_rating = rating(columns::STAFFING_RATING);
    let quality_rating = rating(columns::QUALITY_RATING);
    let experience_rating = rating(columns::EXPERIENCE_RATING);

    let rn_compliance_pct = compliance_pct(
        table.number(row, columns::RN_MINUTES_ACTUAL),
        table.number(row, columns::RN_MINUTES_TARGET),
    );
    let total_care_compliance_pct = compliance_pct(
        table.number(row, columns::TOTAL_MINUTES_ACTUAL),
        table.number(row, columns::TOTAL_MINUTES_TARGET),
    );

    let mut quality_measures = BTreeMap::new();
    for qm in columns::QM_FIELDS {
        if let Some(value) = table.number(row, qm) {
            quality_measures.insert(qm.to_string(), value);
        }
    }

    let compliance_action = table
        .text(row, columns::DECISION_TYPE)
        .map(|decision_type| ComplianceAction {
            decision_type,
            applied: table.date(row, columns::DECISION_APPLIED),
            ends: table.date(row, columns::DECISION_ENDS),
        });

    Ok(Some(ServiceRecord {
        service_name: table
            .text(row, columns::SERVICE_NAME)
            .unwrap_or_else(|| service_id.clone()),
        provider_id: table
            .text(row, columns::PROVIDER_ID)
            .unwrap_or_else(|| "Unknown".to_string()),
        provider_name: table
            .text(row, columns::PROVIDER_NAME)
            .unwrap_or_else(|| "Unknown".to_string()),
        state: table
            .text(row, columns::STATE)
            .unwrap_or_else(|| "Unknown".to_string()),
        suburb: table
            .text(row, columns::SUBURB)
            .unwrap_or_else(|| "Unknown".to_string()),
        service_id,
        mmm_code,
        remoteness,
        places,
        size,
        overall_rating,
        compliance_rating,
        staffing_rating,
        quality_rating,
        experience_rating,
        rn_compliance_pct,
        total_care_compliance_pct,
        quality_measures,
        compliance_action,
    }))
}

/// Star ratings live on a 1–5 scale; anything outside degrades to missing
/// with a warning rather than poisoning downstream means.
fn star_rating(
    table: &RawTable,
    row: usize,
    service_id: &str,
    column: &str,
    sink: &mut WarningSink,
) -> Option<f64> {
    let value = table.number(row, column)?;
    if (1.0..=5.0).contains(&value) {
        Some(value)
    } else {
        sink.push(
            row,
            Some(service_id),
            column,
            format!("star rating {} outside the 1-5 scale", value),
        );
        None
    }
}

/// actual / target × 100. A zero or missing target means the percentage is
/// undefined, not 0 and not infinite.
fn compliance_pct(actual: Option<f64>, target: Option<f64>) -> Option<f64> {
    let actual = actual?;
    let target = target?;
    if target == 0.0 {
        return None;
    }
    let pct = actual / target * 100.0;
    pct.is_finite().then_some(pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::table_from_range;
    use calamine::{Data, Range};

    const HEADERS: [&str; 12] = [
        columns::SERVICE_ID,
        columns::SERVICE_NAME,
        columns::PROVIDER_ID,
        columns::PROVIDER_NAME,
        columns::STATE,
        columns::MMM_CODE,
        columns::PLACES,
        columns::OVERALL_RATING,
        columns::RN_MINUTES_ACTUAL,
        columns::RN_MINUTES_TARGET,
        columns::DECISION_TYPE,
        "[QM] Pressure injuries*",
    ];

    fn table(rows: Vec<Vec<Data>>) -> RawTable {
        let mut range = Range::new((0, 0), (rows.len() as u32, (HEADERS.len() - 1) as u32));
        for (c, h) in HEADERS.iter().enumerate() {
            range.set_value((0, c as u32), Data::String(h.to_string()));
        }
        for (r, row) in rows.into_iter().enumerate() {
            for (c, v) in row.into_iter().enumerate() {
                range.set_value(((r + 1) as u32, c as u32), v);
            }
        }
        table_from_range(&range).unwrap()
    }

    fn row(service_id: &str, rating: Data, places: Data) -> Vec<Data> {
        vec![
            Data::String(service_id.into()),
            Data::String(format!("Service {}", service_id)),
            Data::String("P1".into()),
            Data::String("Harbour Care".into()),
            Data::String("NSW".into()),
            Data::Int(2),
            places,
            rating,
            Data::Float(180.0),
            Data::Float(200.0),
            Data::Empty,
            Data::Float(1.2),
        ]
    }

    #[test]
    fn test_fields_derive_and_clean() {
        let out = normalize(
            &table(vec![row("S1", Data::Float(4.0), Data::Int(45))]),
            &NormalizeOptions::default(),
        )
        .unwrap();

        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.size, ServiceSize::Medium);
        assert_eq!(r.remoteness, Remoteness::RegionalCentre);
        assert_eq!(r.overall_rating, Some(4.0));
        assert_eq!(r.rn_compliance_pct, Some(90.0));
        assert_eq!(r.quality_measures.get("[QM] Pressure injuries*"), Some(&1.2));
        assert!(r.compliance_action.is_none());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_non_numeric_rating_becomes_missing_but_row_survives() {
        let out = normalize(
            &table(vec![row("S1", Data::String("N/A".into()), Data::Int(20))]),
            &NormalizeOptions::default(),
        )
        .unwrap();

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].overall_rating, None);
        assert_eq!(out.records[0].size, ServiceSize::Small);
    }

    #[test]
    fn test_out_of_scale_rating_is_missing_with_warning() {
        let out = normalize(
            &table(vec![row("S1", Data::Float(8.0), Data::Int(70))]),
            &NormalizeOptions::default(),
        )
        .unwrap();

        assert_eq!(out.records[0].overall_rating, None);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].field, columns::OVERALL_RATING);
    }

    #[test]
    fn test_negative_places_drops_row_unless_strict() {
        let rows = vec![
            row("S1", Data::Float(3.0), Data::Int(-4)),
            row("S2", Data::Float(3.0), Data::Int(50)),
        ];

        let lenient = normalize(&table(rows.clone()), &NormalizeOptions::default()).unwrap();
        assert_eq!(lenient.records.len(), 1);
        assert_eq!(lenient.records[0].service_id, "S2");
        assert_eq!(lenient.warnings.len(), 1);

        let strict = NormalizeOptions {
            strict: true,
            ..NormalizeOptions::default()
        };
        assert!(normalize(&table(rows), &strict).is_err());
    }

    #[test]
    fn test_duplicate_service_id_keeps_first() {
        let out = normalize(
            &table(vec![
                row("S1", Data::Float(3.0), Data::Int(10)),
                row("S1", Data::Float(5.0), Data::Int(10)),
            ]),
            &NormalizeOptions::default(),
        )
        .unwrap();

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].overall_rating, Some(3.0));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_zero_target_compliance_is_undefined() {
        assert_eq!(compliance_pct(Some(100.0), Some(0.0)), None);
        assert_eq!(compliance_pct(Some(100.0), None), None);
        assert_eq!(compliance_pct(None, Some(200.0)), None);
        assert_eq!(compliance_pct(Some(170.0), Some(200.0)), Some(85.0));
    }

    #[test]
    fn test_decision_type_builds_compliance_action() {
        let mut r = row("S1", Data::Float(3.0), Data::Int(10));
        r[10] = Data::String("Notice to Agree".into());
        let out = normalize(&table(vec![r]), &NormalizeOptions::default()).unwrap();
        let action = out.records[0].compliance_action.as_ref().unwrap();
        assert_eq!(action.decision_type, "Notice to Agree");
    }
}
