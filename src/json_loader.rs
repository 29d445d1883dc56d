//! Seed data loader.
//!
//! The mock contacts, deals and dashboard metrics ship inside the binary. A
//! `dataDir` in the config may point at a directory holding any of
//! `contacts.json`, `deals.json` and `metrics.json`; files found there win
//! over the embedded copies, missing ones fall back to them.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::types::{Contact, Deal, Metrics};

const CONTACTS_JSON: &str = include_str!("../data/contacts.json");
const DEALS_JSON: &str = include_str!("../data/deals.json");
const METRICS_JSON: &str = include_str!("../data/metrics.json");

#[derive(Debug, Clone)]
pub struct SeedData {
    pub contacts: Vec<Contact>,
    pub deals: Vec<Deal>,
    pub metrics: Metrics,
}

/// Load one seed file, preferring `data_dir/<file_name>` when it exists.
fn load_or_embedded<T: DeserializeOwned>(
    data_dir: Option<&Path>,
    file_name: &str,
    embedded: &str,
) -> Result<T, String> {
    if let Some(dir) = data_dir {
        let path = dir.join(file_name);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            log::info!("Loaded seed data from {}", path.display());
            return serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e));
        }
        log::debug!("{} not found in {}, using built-in data", file_name, dir.display());
    }
    serde_json::from_str(embedded)
        .map_err(|e| format!("Failed to parse built-in {}: {}", file_name, e))
}

fn check_unique_ids(file_name: &str, ids: impl Iterator<Item = u64>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in ids {
        if id == 0 {
            return Err(format!("{}: ids must be positive", file_name));
        }
        if !seen.insert(id) {
            return Err(format!("{}: duplicate Id {}", file_name, id));
        }
    }
    Ok(())
}

fn check_deals(deals: &[Deal]) -> Result<(), String> {
    check_unique_ids("deals.json", deals.iter().map(|d| d.id))?;
    for deal in deals {
        if !deal.value.is_finite() || deal.value < 0.0 {
            return Err(format!("deals.json: deal {} has invalid value {}", deal.id, deal.value));
        }
        if deal.probability > 100 {
            return Err(format!(
                "deals.json: deal {} has probability {} (max 100)",
                deal.id, deal.probability
            ));
        }
    }
    Ok(())
}

pub fn load_seed(data_dir: Option<&Path>) -> Result<SeedData, String> {
    let contacts: Vec<Contact> = load_or_embedded(data_dir, "contacts.json", CONTACTS_JSON)?;
    check_unique_ids("contacts.json", contacts.iter().map(|c| c.id))?;

    let deals: Vec<Deal> = load_or_embedded(data_dir, "deals.json", DEALS_JSON)?;
    check_deals(&deals)?;

    let metrics: Metrics = load_or_embedded(data_dir, "metrics.json", METRICS_JSON)?;

    Ok(SeedData {
        contacts,
        deals,
        metrics,
    })
}
