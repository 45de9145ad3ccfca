pub mod articles;
pub mod error;
pub mod health;
pub mod jobs;
pub mod processed;
pub mod retry;
pub mod sources;
pub mod store;

pub use error::{Result, StoreError};
pub use health::HealthMonitor;
pub use jobs::ClaimedJob;
pub use retry::{with_retry, RetryPolicy};
pub use store::Store;
