//! Display styles for deal stages and contact statuses.
//!
//! Every view payload takes its badge variant and bar colour from here so
//! the kanban board, the timeline and the contacts table never disagree.

use serde::Serialize;

use crate::types::{ContactStatus, DealStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Default,
    Info,
    Primary,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStyle {
    pub badge: BadgeVariant,
    pub bar_color: &'static str,
}

pub fn stage_badge(stage: DealStage) -> BadgeVariant {
    match stage {
        DealStage::Connected => BadgeVariant::Info,
        DealStage::Locked => BadgeVariant::Primary,
        DealStage::MeetingBooked => BadgeVariant::Warning,
        DealStage::MeetingDone => BadgeVariant::Success,
        DealStage::Negotiation => BadgeVariant::Warning,
        DealStage::Closed => BadgeVariant::Success,
        DealStage::Lost => BadgeVariant::Error,
    }
}

/// Timeline bar colour class.
pub fn stage_color(stage: DealStage) -> &'static str {
    match stage {
        DealStage::Connected => "bg-info",
        DealStage::Locked => "bg-primary",
        DealStage::MeetingBooked => "bg-warning",
        DealStage::MeetingDone => "bg-accent",
        DealStage::Negotiation => "bg-success",
        DealStage::Closed => "bg-green-600",
        DealStage::Lost => "bg-error",
    }
}

pub fn stage_style(stage: DealStage) -> StageStyle {
    StageStyle {
        badge: stage_badge(stage),
        bar_color: stage_color(stage),
    }
}

pub fn status_badge(status: ContactStatus) -> BadgeVariant {
    match status {
        ContactStatus::New => BadgeVariant::Info,
        ContactStatus::Contacted => BadgeVariant::Primary,
        ContactStatus::Qualified => BadgeVariant::Success,
        ContactStatus::Unqualified => BadgeVariant::Error,
        ContactStatus::Working => BadgeVariant::Warning,
    }
}
