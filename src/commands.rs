//! Command facade for the frontend.
//!
//! Reads return a tagged `ReadResult` (`success` / `empty` / `error`) whose
//! error notice offers a retry unless the input itself was rejected.
//! Mutations return `Result<_, ErrorNotice>` and
//! are never retried from the notice.

use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::error::{CrmError, ErrorNotice};
use crate::labels::{stage_color, stage_style, StageStyle};
use crate::services::contacts::{apply_query, to_rows, ContactQuery, ContactRow};
use crate::services::pipeline::{
    build_board, deal_card, is_same_column_drop, summarize, DealCard, PipelineBoard,
    PipelineSummary,
};
use crate::services::{change_stage, StageChange};
use crate::state::AppState;
use crate::store::DataService;
use crate::timeline::{
    apply_drag, apply_resize, compute_position, months, MonthCell, ResizeEdge, TimelineEdit,
    TimelinePosition,
};
use crate::types::{
    Contact, ContactPatch, Deal, DealPatch, DealStage, Metrics, NewContact, NewDeal,
};

/// Result type for read commands
#[derive(Debug, Serialize)]
#[allow(clippy::large_enum_variant)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ReadResult<T> {
    Success { data: T },
    Empty { message: String },
    Error { error: ErrorNotice },
}

impl<T> ReadResult<T> {
    fn failed(err: CrmError) -> Self {
        log::warn!("Read failed: {}", err);
        ReadResult::Error {
            error: ErrorNotice::for_read(&err),
        }
    }
}

fn mutation_error(err: CrmError) -> ErrorNotice {
    log::warn!("Mutation failed: {}", err);
    ErrorNotice::for_mutation(&err)
}

// =============================================================================
// Pipeline
// =============================================================================

pub async fn get_pipeline(state: &AppState) -> ReadResult<PipelineBoard> {
    let (deals, contacts) = tokio::join!(state.deals.get_all(), state.contacts.get_all());
    let (deals, contacts) = match (deals, contacts) {
        (Ok(d), Ok(c)) => (d, c),
        (Err(e), _) | (_, Err(e)) => return ReadResult::failed(e),
    };
    if deals.is_empty() {
        return ReadResult::Empty {
            message: "No deals in the pipeline yet".to_string(),
        };
    }
    ReadResult::Success {
        data: build_board(deals, &contacts, Utc::now()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDetail {
    pub card: DealCard,
    pub style: StageStyle,
    pub position: TimelinePosition,
}

pub async fn get_deal(state: &AppState, deal_id: u64) -> ReadResult<DealDetail> {
    let deal = match state.deals.get_by_id(deal_id).await {
        Ok(deal) => deal,
        Err(e) => return ReadResult::failed(e),
    };
    // A missing contact is shown as a placeholder, not an error.
    let contact = state.contacts.get_by_id(deal.contact_id).await.ok();
    let style = stage_style(deal.stage);
    let position = compute_position(&deal);
    ReadResult::Success {
        data: DealDetail {
            card: deal_card(deal, contact.as_ref(), Utc::now()),
            style,
            position,
        },
    }
}

pub async fn create_deal(state: &AppState, draft: NewDeal) -> Result<Deal, ErrorNotice> {
    state.deals.create(draft).await.map_err(mutation_error)
}

pub async fn update_deal(
    state: &AppState,
    deal_id: u64,
    patch: DealPatch,
) -> Result<Deal, ErrorNotice> {
    state
        .deals
        .update(deal_id, patch)
        .await
        .map_err(mutation_error)
}

pub async fn delete_deal(state: &AppState, deal_id: u64) -> Result<bool, ErrorNotice> {
    state.deals.delete(deal_id).await.map_err(mutation_error)
}

/// Handle a kanban drop. Dropping back onto the source column does nothing
/// and returns `Ok(None)`.
pub async fn move_deal_stage(
    state: &AppState,
    deal_id: u64,
    source_column: &str,
    target_column: &str,
) -> Result<Option<StageChange>, ErrorNotice> {
    if is_same_column_drop(source_column, target_column) {
        return Ok(None);
    }
    change_stage(&*state.deals, deal_id, target_column)
        .await
        .map(Some)
        .map_err(mutation_error)
}

// =============================================================================
// Timeline
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub deal_id: u64,
    pub contact_name: String,
    pub company: String,
    pub value: f64,
    pub stage: DealStage,
    pub bar_color: &'static str,
    pub position: TimelinePosition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView {
    pub year: i32,
    pub months: Vec<MonthCell>,
    pub rows: Vec<TimelineRow>,
}

/// Timeline rows ordered by expected close. `year` picks the header months
/// and defaults to the current year.
pub async fn get_timeline(state: &AppState, year: Option<i32>) -> ReadResult<TimelineView> {
    let (deals, contacts) = tokio::join!(state.deals.get_all(), state.contacts.get_all());
    let (mut deals, contacts) = match (deals, contacts) {
        (Ok(d), Ok(c)) => (d, c),
        (Err(e), _) | (_, Err(e)) => return ReadResult::failed(e),
    };
    if deals.is_empty() {
        return ReadResult::Empty {
            message: "No deals to show on the timeline".to_string(),
        };
    }
    deals.sort_by_key(|d| (d.expected_close_date, d.id));

    let now = Utc::now();
    let rows = deals
        .into_iter()
        .map(|deal| {
            let position = compute_position(&deal);
            let stage = deal.stage;
            let contact = contacts.iter().find(|c| c.id == deal.contact_id);
            let card = deal_card(deal, contact, now);
            TimelineRow {
                deal_id: card.deal.id,
                contact_name: card.contact_name,
                company: card.company,
                value: card.deal.value,
                stage,
                bar_color: stage_color(stage),
                position,
            }
        })
        .collect();

    let year = year.unwrap_or_else(|| now.year());
    ReadResult::Success {
        data: TimelineView {
            year,
            months: months(year),
            rows,
        },
    }
}

async fn persist_close(state: &AppState, deal_id: u64, edit: &TimelineEdit) -> Result<(), CrmError> {
    state
        .deals
        .update(deal_id, DealPatch::expected_close(edit.expected_close))
        .await?;
    log::info!(
        "Deal {} expected close moved to {}",
        deal_id,
        edit.expected_close
    );
    Ok(())
}

async fn drag_and_persist(
    state: &AppState,
    deal_id: u64,
    new_left: f64,
) -> Result<TimelineEdit, CrmError> {
    let deal = state.deals.get_by_id(deal_id).await?;
    let edit = apply_drag(&deal, new_left)?;
    persist_close(state, deal_id, &edit).await?;
    Ok(edit)
}

async fn resize_and_persist(
    state: &AppState,
    deal_id: u64,
    new_width: f64,
    edge: ResizeEdge,
) -> Result<Option<TimelineEdit>, CrmError> {
    let deal = state.deals.get_by_id(deal_id).await?;
    let Some(edit) = apply_resize(&deal, new_width, edge)? else {
        return Ok(None);
    };
    persist_close(state, deal_id, &edit).await?;
    Ok(Some(edit))
}

pub async fn drag_timeline_bar(
    state: &AppState,
    deal_id: u64,
    new_left: f64,
) -> Result<TimelineEdit, ErrorNotice> {
    drag_and_persist(state, deal_id, new_left)
        .await
        .map_err(mutation_error)
}

/// Resize a bar. A leading-edge resize returns `Ok(None)` and writes nothing.
pub async fn resize_timeline_bar(
    state: &AppState,
    deal_id: u64,
    new_width: f64,
    edge: ResizeEdge,
) -> Result<Option<TimelineEdit>, ErrorNotice> {
    resize_and_persist(state, deal_id, new_width, edge)
        .await
        .map_err(mutation_error)
}

// =============================================================================
// Contacts
// =============================================================================

pub async fn get_contacts(state: &AppState) -> ReadResult<Vec<ContactRow>> {
    match state.contacts.get_all().await {
        Ok(contacts) if contacts.is_empty() => ReadResult::Empty {
            message: "No contacts yet".to_string(),
        },
        Ok(contacts) => ReadResult::Success {
            data: to_rows(contacts),
        },
        Err(e) => ReadResult::failed(e),
    }
}

pub async fn search_contacts(state: &AppState, query: ContactQuery) -> ReadResult<Vec<ContactRow>> {
    let contacts = match state.contacts.get_all().await {
        Ok(contacts) => contacts,
        Err(e) => return ReadResult::failed(e),
    };
    match apply_query(contacts, &query) {
        Ok(found) if found.is_empty() => ReadResult::Empty {
            message: "No contacts match your search".to_string(),
        },
        Ok(found) => ReadResult::Success {
            data: to_rows(found),
        },
        Err(e) => ReadResult::failed(e),
    }
}

pub async fn create_contact(state: &AppState, draft: NewContact) -> Result<Contact, ErrorNotice> {
    state.contacts.create(draft).await.map_err(mutation_error)
}

pub async fn update_contact(
    state: &AppState,
    contact_id: u64,
    patch: ContactPatch,
) -> Result<Contact, ErrorNotice> {
    state
        .contacts
        .update(contact_id, patch)
        .await
        .map_err(mutation_error)
}

/// Deals pointing at the contact are left as they are.
pub async fn delete_contact(state: &AppState, contact_id: u64) -> Result<bool, ErrorNotice> {
    state
        .contacts
        .delete(contact_id)
        .await
        .map_err(mutation_error)
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub pipeline: PipelineSummary,
}

pub async fn get_dashboard_metrics(state: &AppState) -> ReadResult<DashboardMetrics> {
    let (metrics, deals) = tokio::join!(state.metrics.get_metrics(), state.deals.get_all());
    match (metrics, deals) {
        (Ok(metrics), Ok(deals)) => ReadResult::Success {
            data: DashboardMetrics {
                metrics,
                pipeline: summarize(&deals),
            },
        },
        (Err(e), _) | (_, Err(e)) => ReadResult::failed(e),
    }
}
