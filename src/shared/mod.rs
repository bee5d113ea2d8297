pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::AppConfig;
pub use error::{AppError, Result};
