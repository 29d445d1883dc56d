//! In-memory store seeded from the mock JSON data.
//!
//! Records live in a `Vec` behind a `parking_lot::Mutex`; every
//! read-modify-write happens under that one lock, so concurrent `create`
//! calls can never hand out the same id.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{simulate_latency, DataService, Record, StoreOp};
use crate::error::CrmError;
use crate::types::LatencyConfig;

struct Inner<T> {
    records: Vec<T>,
    /// Next id to hand out. Only ever grows; deleted ids are not reused.
    next_id: u64,
}

pub struct MemoryStore<T: Record> {
    inner: Mutex<Inner<T>>,
    latency: LatencyConfig,
    /// Queued transient failures, consumed by the first matching call.
    faults: Mutex<VecDeque<(StoreOp, String)>>,
}

impl<T: Record> MemoryStore<T> {
    /// Build a store over `seed`. The id counter starts at the highest seed
    /// id plus one (1 for an empty seed).
    pub fn new(seed: Vec<T>, latency: LatencyConfig) -> Self {
        let next_id = seed.iter().map(|r| r.id()).max().unwrap_or(0) + 1;
        log::debug!(
            "{} store seeded with {} records, next id {}",
            T::KIND.label(),
            seed.len(),
            next_id
        );
        Self {
            inner: Mutex::new(Inner {
                records: seed,
                next_id,
            }),
            latency,
            faults: Mutex::new(VecDeque::new()),
        }
    }

    pub fn empty(latency: LatencyConfig) -> Self {
        Self::new(Vec::new(), latency)
    }

    /// Make the next `op` call fail with `CrmError::TransientIo`. The failure
    /// fires after the simulated latency and before any state is touched.
    pub fn inject_failure(&self, op: StoreOp, message: impl Into<String>) {
        self.faults.lock().push_back((op, message.into()));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_fault(&self, op: StoreOp) -> Result<(), CrmError> {
        let mut faults = self.faults.lock();
        if let Some(pos) = faults.iter().position(|(queued, _)| *queued == op) {
            if let Some((_, message)) = faults.remove(pos) {
                log::warn!("{} {}: injected failure", T::KIND.label(), op.as_str());
                return Err(CrmError::TransientIo(message));
            }
        }
        Ok(())
    }

    /// Common prologue: latency, then any queued fault.
    async fn begin(&self, op: StoreOp) -> Result<(), CrmError> {
        simulate_latency(&self.latency, op).await;
        self.take_fault(op)
    }
}

#[async_trait]
impl<T: Record> DataService<T> for MemoryStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, CrmError> {
        self.begin(StoreOp::GetAll).await?;
        let snapshot = { self.inner.lock().records.clone() };
        Ok(snapshot)
    }

    async fn get_by_id(&self, id: u64) -> Result<T, CrmError> {
        self.begin(StoreOp::GetById).await?;
        let found = {
            let inner = self.inner.lock();
            inner.records.iter().find(|r| r.id() == id).cloned()
        };
        found.ok_or_else(|| CrmError::not_found(T::KIND, id))
    }

    async fn create(&self, draft: T::Draft) -> Result<T, CrmError> {
        self.begin(StoreOp::Create).await?;
        let created = {
            let mut inner = self.inner.lock();
            let record = T::from_draft(inner.next_id, draft, Utc::now())?;
            inner.next_id += 1;
            inner.records.push(record.clone());
            record
        };
        log::info!("Created {} {}", T::KIND.as_str(), created.id());
        Ok(created)
    }

    async fn update(&self, id: u64, patch: T::Patch) -> Result<T, CrmError> {
        self.begin(StoreOp::Update).await?;
        let merged = {
            let mut inner = self.inner.lock();
            let slot = inner
                .records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| CrmError::not_found(T::KIND, id))?;
            // Merge on a copy so a rejected patch never half-applies.
            let mut merged = slot.clone();
            merged.apply_patch(patch, Utc::now())?;
            *slot = merged.clone();
            merged
        };
        Ok(merged)
    }

    async fn delete(&self, id: u64) -> Result<bool, CrmError> {
        self.begin(StoreOp::Delete).await?;
        {
            let mut inner = self.inner.lock();
            let pos = inner
                .records
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| CrmError::not_found(T::KIND, id))?;
            inner.records.remove(pos);
        }
        log::info!("Deleted {} {}", T::KIND.as_str(), id);
        Ok(true)
    }
}
