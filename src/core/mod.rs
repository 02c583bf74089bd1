pub mod aggregate;
pub mod benchmark;
pub mod classify;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod outlier;
pub mod report;
pub mod session;

pub use crate::domain::model::{
    ConcernFlag, ConcernReason, IndicatorSummary, OutlierPolicy, ProviderProfile, QualityWarning,
    RiskThresholds, ServiceRecord,
};
pub use crate::domain::ports::{Storage, Thresholds};
pub use crate::utils::error::Result;
