//! Data services for contacts and deals.
//!
//! `DataService` is the CRUD contract every view and engine talks to. Two
//! implementations exist: `MemoryStore` (seeded from the mock JSON, used by
//! default and in tests) and `db::SqliteStore` (persistent). Stores hand out
//! copies only, so nothing outside a store can alias its records.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entity::EntityKind;
use crate::error::CrmError;
use crate::types::LatencyConfig;

pub mod memory;
mod records;

pub use memory::MemoryStore;
pub use records::next_stage_stamp;

/// CRUD contract shared by the contact and deal stores.
#[async_trait]
pub trait DataService<T: Record>: Send + Sync {
    /// Full snapshot, in insertion order.
    async fn get_all(&self) -> Result<Vec<T>, CrmError>;

    async fn get_by_id(&self, id: u64) -> Result<T, CrmError>;

    /// Assign a fresh id, stamp creation metadata, append.
    async fn create(&self, draft: T::Draft) -> Result<T, CrmError>;

    /// Shallow-merge `patch` onto the stored record and return the result.
    /// On error the stored record is unchanged.
    async fn update(&self, id: u64, patch: T::Patch) -> Result<T, CrmError>;

    async fn delete(&self, id: u64) -> Result<bool, CrmError>;
}

/// A record type a store can hold.
pub trait Record: Clone + Send + Sync + 'static {
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    const KIND: EntityKind;

    fn id(&self) -> u64;

    /// Build a new record from caller-supplied fields.
    fn from_draft(id: u64, draft: Self::Draft, now: DateTime<Utc>) -> Result<Self, CrmError>;

    /// Validate then merge. Must not touch `self` when returning `Err`.
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> Result<(), CrmError>;
}

/// Store operation, used for latency lookup and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetAll,
    GetById,
    Create,
    Update,
    Delete,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::GetAll => "get_all",
            StoreOp::GetById => "get_by_id",
            StoreOp::Create => "create",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
        }
    }
}

impl LatencyConfig {
    pub fn delay_for(&self, op: StoreOp) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        let ms = match op {
            StoreOp::GetAll => self.get_all_ms,
            StoreOp::GetById => self.get_by_id_ms,
            StoreOp::Create => self.create_ms,
            StoreOp::Update => self.update_ms,
            StoreOp::Delete => self.delete_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Sleep for the configured simulated latency. Always called before a store
/// lock is taken so no guard is held across the await.
pub(crate) async fn simulate_latency(latency: &LatencyConfig, op: StoreOp) {
    let delay = latency.delay_for(op);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
