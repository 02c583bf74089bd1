use crate::core::filter::{self, FilterSelection};
use crate::core::loader;
use crate::core::normalize::{self, NormalizeOptions};
use crate::domain::model::{QualityWarning, ServiceRecord};
use crate::utils::error::Result;
use std::collections::BTreeSet;

/// The analysis context for one loaded extract. Owns the normalized records
/// exclusively: downstream components borrow them read-only and build new
/// derived collections. A new upload replaces the whole session; nothing is
/// mutated field-by-field.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    source: String,
    records: Vec<ServiceRecord>,
    warnings: Vec<QualityWarning>,
}

impl AnalysisSession {
    /// Loads and normalizes an extract from raw workbook bytes. Schema
    /// failures abort here; row-level issues surface as warnings on the
    /// returned session.
    pub fn from_bytes(source: &str, bytes: &[u8], opts: &NormalizeOptions) -> Result<Self> {
        tracing::info!("Loading extract '{}' ({} bytes)", source, bytes.len());
        let table = loader::load_workbook(bytes)?;
        let normalized = normalize::normalize(&table, opts)?;

        tracing::info!(
            "Session ready: {} services, {} data-quality warning(s)",
            normalized.records.len(),
            normalized.warnings.len()
        );

        Ok(Self {
            source: source.to_string(),
            records: normalized.records,
            warnings: normalized.warnings,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn warnings(&self) -> &[QualityWarning] {
        &self.warnings
    }

    /// A new collection holding the services matching the selection.
    pub fn filtered(&self, selection: &FilterSelection) -> Vec<ServiceRecord> {
        filter::apply(&self.records, selection)
    }

    /// Distinct states present in the load, for populating filter options.
    pub fn states(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.state.clone()).collect()
    }

    /// Distinct (provider id, provider name) pairs present in the load.
    pub fn providers(&self) -> BTreeSet<(String, String)> {
        self.records
            .iter()
            .map(|r| (r.provider_id.clone(), r.provider_name.clone()))
            .collect()
    }
}
