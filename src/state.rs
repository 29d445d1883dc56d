use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::db::SqliteStore;
use crate::json_loader::{load_seed, SeedData};
use crate::services::MetricsService;
use crate::store::{DataService, MemoryStore};
use crate::types::{Config, Contact, Deal, LatencyConfig, StoreBackend};

/// Set to `1` (or `true`) to turn simulated latency off.
pub const NO_LATENCY_ENV: &str = "DEALDESK_NO_LATENCY";

/// Application state shared by every command.
///
/// Stores are trait objects so the command layer never knows which backend
/// it is talking to.
pub struct AppState {
    pub config: Config,
    pub deals: Arc<dyn DataService<Deal>>,
    pub contacts: Arc<dyn DataService<Contact>>,
    pub metrics: MetricsService,
}

impl AppState {
    /// Build state from `~/.dealdesk/config.json` (defaults when absent).
    pub fn new() -> Result<Self, String> {
        let mut config = load_config()?;
        apply_env_overrides(&mut config, std::env::var(NO_LATENCY_ENV).ok().as_deref());
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, String> {
        let seed = load_seed(config.data_dir.as_deref().map(Path::new))?;
        let SeedData {
            contacts,
            deals,
            metrics,
        } = seed;
        let latency = config.latency;

        let (deal_store, contact_store) = match config.backend {
            StoreBackend::Sqlite => match open_sqlite(&config, &contacts, &deals) {
                Ok(store) => {
                    let store = Arc::new(store);
                    let deal_store: Arc<dyn DataService<Deal>> = store.clone();
                    let contact_store: Arc<dyn DataService<Contact>> = store;
                    (deal_store, contact_store)
                }
                Err(e) => {
                    log::warn!("Failed to open database: {e}. Using in-memory store.");
                    memory_stores(contacts, deals, &latency)
                }
            },
            StoreBackend::Memory => memory_stores(contacts, deals, &latency),
        };

        Ok(Self {
            metrics: MetricsService::new(metrics, latency),
            config,
            deals: deal_store,
            contacts: contact_store,
        })
    }

    /// Assemble state around existing stores.
    pub fn with_stores(
        config: Config,
        deals: Arc<dyn DataService<Deal>>,
        contacts: Arc<dyn DataService<Contact>>,
        metrics: MetricsService,
    ) -> Self {
        Self {
            config,
            deals,
            contacts,
            metrics,
        }
    }
}

fn memory_stores(
    contacts: Vec<Contact>,
    deals: Vec<Deal>,
    latency: &LatencyConfig,
) -> (Arc<dyn DataService<Deal>>, Arc<dyn DataService<Contact>>) {
    (
        Arc::new(MemoryStore::new(deals, *latency)),
        Arc::new(MemoryStore::new(contacts, *latency)),
    )
}

fn open_sqlite(
    config: &Config,
    contacts: &[Contact],
    deals: &[Deal],
) -> Result<SqliteStore, crate::db::DbError> {
    let store = match &config.database_path {
        Some(path) => SqliteStore::open_at(PathBuf::from(path), config.latency)?,
        None => SqliteStore::open(config.latency)?,
    };
    store.seed_if_empty(contacts, deals)?;
    Ok(store)
}

pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".dealdesk").join("config.json"))
}

/// Load config from the default location. A missing file means defaults.
pub fn load_config() -> Result<Config, String> {
    let path = config_path()?;
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    if let Some(dir) = &config.data_dir {
        if !Path::new(dir).is_dir() {
            return Err(format!("Data directory does not exist: {}", dir));
        }
    }
    Ok(config)
}

/// Apply environment overrides. `no_latency` is the raw value of
/// `DEALDESK_NO_LATENCY`.
pub fn apply_env_overrides(config: &mut Config, no_latency: Option<&str>) {
    if matches!(no_latency, Some("1") | Some("true")) {
        log::info!("{} set, simulated latency disabled", NO_LATENCY_ENV);
        config.latency.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> Config {
        Config {
            latency: LatencyConfig::none(),
            ..Config::default()
        }
    }

    #[test]
    fn test_env_override_disables_latency() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, Some("0"));
        assert!(config.latency.enabled);
        apply_env_overrides(&mut config, None);
        assert!(config.latency.enabled);
        apply_env_overrides(&mut config, Some("1"));
        assert!(!config.latency.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"backend": "sqlite", "databasePath": "/tmp/x.db", "latency": {"enabled": false}}"#,
        )
        .expect("write config");

        let config = load_config_from(&path).expect("config");
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.database_path.as_deref(), Some("/tmp/x.db"));
        assert!(!config.latency.enabled);
        assert_eq!(config.latency.update_ms, 350);
    }

    #[test]
    fn test_missing_data_dir_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"dataDir": "/definitely/not/here"}"#).expect("write config");
        assert!(load_config_from(&path).is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_serves_seed() {
        let state = AppState::from_config(quiet_config()).expect("state");
        let deals = state.deals.get_all().await.expect("deals");
        let contacts = state.contacts.get_all().await.expect("contacts");
        assert!(!deals.is_empty());
        assert_eq!(contacts.len(), 5);
    }

    #[tokio::test]
    async fn test_sqlite_backend_shares_one_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("dealdesk.db");
        let config = Config {
            backend: StoreBackend::Sqlite,
            database_path: Some(db_path.to_string_lossy().into_owned()),
            ..quiet_config()
        };

        let state = AppState::from_config(config).expect("state");
        assert!(db_path.exists());
        let contacts = state.contacts.get_all().await.expect("contacts");
        assert_eq!(contacts.len(), 5);
        let deal = state.deals.get_by_id(3).await.expect("deal 3");
        assert_eq!(deal.contact_id, 3);
    }
}
