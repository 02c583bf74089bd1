use crate::domain::model::{Remoteness, ServiceRecord, ServiceSize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User-selected predicate set. `None` on an axis means ANY; the axes
/// compose with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub states: Option<BTreeSet<String>>,
    /// Matches either the provider identifier or the published name.
    pub provider: Option<String>,
    pub sizes: Option<BTreeSet<ServiceSize>>,
    pub remoteness: Option<BTreeSet<Remoteness>>,
}

impl FilterSelection {
    pub fn is_unrestricted(&self) -> bool {
        self.states.is_none()
            && self.provider.is_none()
            && self.sizes.is_none()
            && self.remoteness.is_none()
    }

    fn matches(&self, record: &ServiceRecord) -> bool {
        if let Some(states) = &self.states {
            if !states.contains(&record.state) {
                return false;
            }
        }
        if let Some(provider) = &self.provider {
            if record.provider_id != *provider && record.provider_name != *provider {
                return false;
            }
        }
        if let Some(sizes) = &self.sizes {
            if !sizes.contains(&record.size) {
                return false;
            }
        }
        if let Some(remoteness) = &self.remoteness {
            if !remoteness.contains(&record.remoteness) {
                return false;
            }
        }
        true
    }
}

/// Pure filter: collection in, new collection out. An empty result is a
/// valid outcome, and downstream aggregates render it as "no data".
pub fn apply(records: &[ServiceRecord], selection: &FilterSelection) -> Vec<ServiceRecord> {
    let subset: Vec<ServiceRecord> = records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect();

    tracing::debug!(
        "Filter kept {} of {} services",
        subset.len(),
        records.len()
    );

    subset
}
