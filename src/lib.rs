pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, CliConfig, TomlConfig};
pub use core::filter::FilterSelection;
pub use core::session::AnalysisSession;
pub use utils::error::{AnalyticsError, Result};
