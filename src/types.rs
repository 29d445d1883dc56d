use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Configuration stored in ~/.dealdesk/config.json
///
/// Every field is optional on disk; a missing file means defaults
/// (in-memory stores seeded from the embedded mock data).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite file for the `sqlite` backend. Defaults to ~/.dealdesk/dealdesk.db
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    /// Directory holding contacts.json / deals.json / metrics.json that
    /// replace the embedded seed data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub latency: LatencyConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Simulated network latency per store operation, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_get_all_ms")]
    pub get_all_ms: u64,
    #[serde(default = "default_get_by_id_ms")]
    pub get_by_id_ms: u64,
    #[serde(default = "default_create_ms")]
    pub create_ms: u64,
    #[serde(default = "default_update_ms")]
    pub update_ms: u64,
    #[serde(default = "default_delete_ms")]
    pub delete_ms: u64,
    #[serde(default = "default_metrics_ms")]
    pub metrics_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_get_all_ms() -> u64 {
    300
}
fn default_get_by_id_ms() -> u64 {
    200
}
fn default_create_ms() -> u64 {
    400
}
fn default_update_ms() -> u64 {
    350
}
fn default_delete_ms() -> u64 {
    300
}
fn default_metrics_ms() -> u64 {
    250
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            get_all_ms: default_get_all_ms(),
            get_by_id_ms: default_get_by_id_ms(),
            create_ms: default_create_ms(),
            update_ms: default_update_ms(),
            delete_ms: default_delete_ms(),
            metrics_ms: default_metrics_ms(),
        }
    }
}

impl LatencyConfig {
    /// No artificial delay at all. Used by tests and `DEALDESK_NO_LATENCY`.
    pub fn none() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

// =============================================================================
// Pipeline stages and contact statuses
// =============================================================================

/// Pipeline stage of a deal.
///
/// Declaration order is the column order of the kanban board. No linear
/// progression is enforced: a deal may move between any two stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStage {
    Connected,
    Locked,
    #[serde(rename = "Meeting Booked")]
    MeetingBooked,
    #[serde(rename = "Meeting Done")]
    MeetingDone,
    Negotiation,
    Closed,
    Lost,
}

impl DealStage {
    pub const ALL: [DealStage; 7] = [
        DealStage::Connected,
        DealStage::Locked,
        DealStage::MeetingBooked,
        DealStage::MeetingDone,
        DealStage::Negotiation,
        DealStage::Closed,
        DealStage::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Connected => "Connected",
            DealStage::Locked => "Locked",
            DealStage::MeetingBooked => "Meeting Booked",
            DealStage::MeetingDone => "Meeting Done",
            DealStage::Negotiation => "Negotiation",
            DealStage::Closed => "Closed",
            DealStage::Lost => "Lost",
        }
    }

    /// Closed and Lost deals no longer count toward the active pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStage::Closed | DealStage::Lost)
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DealStage {
    type Err = String;

    /// Exact labels only. Drop targets send the column id verbatim, so
    /// anything else is a caller bug rather than a spelling variant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DealStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("Unknown deal stage: {:?}", s))
    }
}

/// Lead status of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Working,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 5] = [
        ContactStatus::New,
        ContactStatus::Contacted,
        ContactStatus::Qualified,
        ContactStatus::Unqualified,
        ContactStatus::Working,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "New",
            ContactStatus::Contacted => "Contacted",
            ContactStatus::Qualified => "Qualified",
            ContactStatus::Unqualified => "Unqualified",
            ContactStatus::Working => "Working",
        }
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContactStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown contact status: {:?}", s))
    }
}

// =============================================================================
// Records
// =============================================================================

/// A contact (lead) as stored and as sent to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "Id")]
    pub id: u64,
    pub name: String,
    pub company: String,
    pub email: String,
    pub status: ContactStatus,
    pub assigned_rep: String,
    pub last_activity: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A deal in the sales pipeline.
///
/// `expected_close_date` is the only persisted timeline field. The estimated
/// start of the bar is always derived from it (see `timeline`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(rename = "Id")]
    pub id: u64,
    /// Weak reference: deleting the contact leaves the deal in place.
    pub contact_id: u64,
    pub value: f64,
    pub stage: DealStage,
    pub stage_entered_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_close_date")]
    pub expected_close_date: NaiveDate,
    pub probability: u8,
    pub assigned_rep: String,
    #[serde(default)]
    pub notes: String,
}

/// Fields supplied when creating a contact. The store assigns the id and
/// stamps `createdAt` / `lastActivity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub company: String,
    pub email: String,
    #[serde(default = "default_contact_status")]
    pub status: ContactStatus,
    #[serde(default)]
    pub assigned_rep: String,
}

fn default_contact_status() -> ContactStatus {
    ContactStatus::New
}

/// Fields supplied when creating a deal. The store assigns the id and
/// stamps `stageEnteredAt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub contact_id: u64,
    pub value: f64,
    #[serde(default = "default_deal_stage")]
    pub stage: DealStage,
    #[serde(deserialize_with = "deserialize_close_date")]
    pub expected_close_date: NaiveDate,
    #[serde(default)]
    pub probability: u8,
    #[serde(default)]
    pub assigned_rep: String,
    #[serde(default)]
    pub notes: String,
}

fn default_deal_stage() -> DealStage {
    DealStage::Connected
}

/// Partial contact update. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub status: Option<ContactStatus>,
    pub assigned_rep: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Partial deal update. `None` leaves the field as it is.
///
/// There is deliberately no `stage_entered_at` field: the stamp is owned by
/// the merge and moves only when `stage` actually changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DealPatch {
    pub contact_id: Option<u64>,
    pub value: Option<f64>,
    pub stage: Option<DealStage>,
    #[serde(deserialize_with = "deserialize_optional_close_date")]
    pub expected_close_date: Option<NaiveDate>,
    pub probability: Option<u8>,
    pub assigned_rep: Option<String>,
    pub notes: Option<String>,
}

impl DealPatch {
    pub fn stage(stage: DealStage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn expected_close(date: NaiveDate) -> Self {
        Self {
            expected_close_date: Some(date),
            ..Self::default()
        }
    }
}

/// Summary counters for the dashboard metric cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_leads: u64,
    pub meetings_booked: u64,
    pub weekly_meetings: u64,
    pub deals_closed_count: u64,
    pub deals_closed_value: f64,
    pub conversion_rate: f64,
}

// =============================================================================
// Close-date parsing
// =============================================================================

/// Parse an expected-close date.
///
/// Seed files carry `YYYY-MM-DD`; timeline edits coming back from a browser
/// carry full ISO timestamps. Both collapse to the UTC calendar date.
pub fn parse_close_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| format!("Invalid expected close date: {:?}", raw))
}

fn deserialize_close_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_close_date(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_optional_close_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_close_date(&s).map_err(serde::de::Error::custom))
        .transpose()
}
