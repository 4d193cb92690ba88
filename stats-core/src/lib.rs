pub mod config;
pub mod error;
pub mod error_utils;
pub mod retry;
pub mod source;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use retry::{RetryConfig, RetryExecutor, RetryMetrics, RetryStrategy};
pub use source::*;
pub use types::*;
