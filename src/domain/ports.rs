use crate::domain::model::{OutlierPolicy, RiskThresholds};
use crate::utils::error::Result;

/// Byte-level access to the filesystem (or whatever stands in for it).
/// Synchronous on purpose: one load-filter-aggregate cycle runs to
/// completion before anything is rendered.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// Externally configured regulatory values. Both the CLI flags and the TOML
/// file provide these, so thresholds can change without touching the core.
pub trait Thresholds: Send + Sync {
    fn risk(&self) -> RiskThresholds;
    fn outliers(&self) -> OutlierPolicy;
    /// (small upper bound, medium upper bound) in residential places.
    fn size_breakpoints(&self) -> (u32, u32);
    /// Strict mode turns structurally invalid rows into load failures
    /// instead of collected warnings.
    fn strict(&self) -> bool;
}
