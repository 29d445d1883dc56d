// Metrics service: dashboard figures loaded from seed data.

use std::time::Duration;

use parking_lot::Mutex;

use crate::error::CrmError;
use crate::types::{LatencyConfig, Metrics};

pub struct MetricsService {
    metrics: Metrics,
    latency: LatencyConfig,
    fault: Mutex<Option<String>>,
}

impl MetricsService {
    pub fn new(metrics: Metrics, latency: LatencyConfig) -> Self {
        Self {
            metrics,
            latency,
            fault: Mutex::new(None),
        }
    }

    /// Make the next `get_metrics` call fail with `CrmError::TransientIo`.
    pub fn inject_failure(&self, message: impl Into<String>) {
        *self.fault.lock() = Some(message.into());
    }

    /// A copy of the dashboard figures, after the simulated delay.
    pub async fn get_metrics(&self) -> Result<Metrics, CrmError> {
        if self.latency.enabled && self.latency.metrics_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency.metrics_ms)).await;
        }
        if let Some(message) = self.fault.lock().take() {
            log::warn!("Metrics: injected failure");
            return Err(CrmError::TransientIo(message));
        }
        Ok(self.metrics.clone())
    }
}
