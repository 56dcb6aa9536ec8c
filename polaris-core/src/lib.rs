pub mod config;
pub mod core_polaris;
pub mod logging;
pub mod metrics;
pub mod test_utils;

pub use config::Config;
pub use core_polaris::{PolarisDatabase, PolarisError, PolarisResult, StoreLifecycle};
pub use logging::{init_logging, LogLevel};
