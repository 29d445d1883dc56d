//! Business logic between the command layer and the stores.

pub mod contacts;
pub mod metrics;
pub mod pipeline;
pub mod stage;

pub use metrics::MetricsService;
pub use stage::{change_stage, StageChange};
