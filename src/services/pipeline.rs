// Pipeline service: kanban board and summary figures.
// Pure functions over store snapshots; nothing here writes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::labels::{stage_style, StageStyle};
use crate::types::{Contact, Deal, DealStage};

pub const UNKNOWN_CONTACT: &str = "Unknown Contact";
pub const NO_COMPANY: &str = "No Company";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealCard {
    #[serde(flatten)]
    pub deal: Deal,
    pub contact_name: String,
    pub company: String,
    pub days_in_stage: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageColumn {
    pub stage: DealStage,
    pub style: StageStyle,
    pub deals: Vec<DealCard>,
    pub count: usize,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_value: f64,
    /// Deals not yet Closed or Lost.
    pub active_deals: usize,
    pub average_deal_size: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineBoard {
    pub columns: Vec<StageColumn>,
    pub summary: PipelineSummary,
}

/// Whole days since the deal entered its current stage. Never negative.
pub fn days_in_stage(deal: &Deal, now: DateTime<Utc>) -> i64 {
    (now - deal.stage_entered_at).num_days().max(0)
}

pub fn summarize(deals: &[Deal]) -> PipelineSummary {
    let total_value: f64 = deals.iter().map(|d| d.value).sum();
    let active_deals = deals.iter().filter(|d| !d.stage.is_terminal()).count();
    let average_deal_size = if deals.is_empty() {
        0.0
    } else {
        total_value / deals.len() as f64
    };
    PipelineSummary {
        total_value,
        active_deals,
        average_deal_size,
    }
}

/// Attach contact details to a deal. A dangling contact id gets the
/// placeholder name and company.
pub fn deal_card(deal: Deal, contact: Option<&Contact>, now: DateTime<Utc>) -> DealCard {
    let contact_name = contact
        .map(|c| c.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_CONTACT.to_string());
    let company = contact
        .map(|c| c.company.clone())
        .filter(|company| !company.is_empty())
        .unwrap_or_else(|| NO_COMPANY.to_string());
    let days_in_stage = days_in_stage(&deal, now);
    DealCard {
        deal,
        contact_name,
        company,
        days_in_stage,
    }
}

/// One column per stage, in stage order, even when empty.
pub fn build_board(deals: Vec<Deal>, contacts: &[Contact], now: DateTime<Utc>) -> PipelineBoard {
    let summary = summarize(&deals);
    let by_id: HashMap<u64, &Contact> = contacts.iter().map(|c| (c.id, c)).collect();

    let mut buckets: HashMap<DealStage, Vec<DealCard>> = HashMap::new();
    for deal in deals {
        let contact = by_id.get(&deal.contact_id).copied();
        let stage = deal.stage;
        buckets
            .entry(stage)
            .or_default()
            .push(deal_card(deal, contact, now));
    }

    let columns = DealStage::ALL
        .iter()
        .map(|stage| {
            let cards = buckets.remove(stage).unwrap_or_default();
            StageColumn {
                stage: *stage,
                style: stage_style(*stage),
                count: cards.len(),
                total_value: cards.iter().map(|c| c.deal.value).sum(),
                deals: cards,
            }
        })
        .collect();

    PipelineBoard { columns, summary }
}

/// A drop onto the column the card was picked up from is not a move.
pub fn is_same_column_drop(source_column: &str, target_column: &str) -> bool {
    source_column == target_column
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContactStatus;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn deal(id: u64, contact_id: u64, stage: DealStage, value: f64) -> Deal {
        Deal {
            id,
            contact_id,
            value,
            stage,
            stage_entered_at: now() - Duration::hours(60),
            expected_close_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            probability: 30,
            assigned_rep: "Lee".to_string(),
            notes: String::new(),
        }
    }

    fn contact(id: u64, name: &str, company: &str) -> Contact {
        Contact {
            id,
            name: name.to_string(),
            company: company.to_string(),
            email: String::new(),
            status: ContactStatus::Working,
            assigned_rep: "Lee".to_string(),
            last_activity: now(),
            created_at: None,
        }
    }

    #[test]
    fn test_days_in_stage_floors() {
        let d = deal(1, 1, DealStage::Locked, 1.0);
        assert_eq!(days_in_stage(&d, now()), 2);
    }

    #[test]
    fn test_days_in_stage_clamps_future_stamp() {
        let mut d = deal(1, 1, DealStage::Locked, 1.0);
        d.stage_entered_at = now() + Duration::days(3);
        assert_eq!(days_in_stage(&d, now()), 0);
    }

    #[test]
    fn test_summary_counts_active_and_averages() {
        let deals = vec![
            deal(1, 1, DealStage::Connected, 10_000.0),
            deal(2, 1, DealStage::Closed, 30_000.0),
            deal(3, 2, DealStage::Lost, 5_000.0),
            deal(4, 2, DealStage::Negotiation, 15_000.0),
        ];
        let summary = summarize(&deals);
        assert_eq!(summary.total_value, 60_000.0);
        assert_eq!(summary.active_deals, 2);
        assert_eq!(summary.average_deal_size, 15_000.0);
    }

    #[test]
    fn test_empty_summary_has_zero_average() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_value, 0.0);
        assert_eq!(summary.active_deals, 0);
        assert_eq!(summary.average_deal_size, 0.0);
    }

    #[test]
    fn test_board_has_every_stage_in_order() {
        let deals = vec![
            deal(1, 1, DealStage::Negotiation, 8_000.0),
            deal(2, 2, DealStage::Negotiation, 2_000.0),
            deal(3, 1, DealStage::Connected, 1_000.0),
        ];
        let contacts = vec![contact(1, "Ada Park", "Northwind")];
        let board = build_board(deals, &contacts, now());

        let stages: Vec<DealStage> = board.columns.iter().map(|c| c.stage).collect();
        assert_eq!(stages, DealStage::ALL.to_vec());

        let negotiation = &board.columns[4];
        assert_eq!(negotiation.count, 2);
        assert_eq!(negotiation.total_value, 10_000.0);
        assert_eq!(board.columns[1].count, 0);
        assert_eq!(board.summary.total_value, 11_000.0);
    }

    #[test]
    fn test_dangling_contact_gets_placeholders() {
        let contacts = vec![contact(1, "Ada Park", "")];
        let board = build_board(
            vec![
                deal(1, 1, DealStage::Connected, 1.0),
                deal(2, 42, DealStage::Connected, 1.0),
            ],
            &contacts,
            now(),
        );
        let cards = &board.columns[0].deals;
        assert_eq!(cards[0].contact_name, "Ada Park");
        assert_eq!(cards[0].company, NO_COMPANY);
        assert_eq!(cards[1].contact_name, UNKNOWN_CONTACT);
        assert_eq!(cards[1].company, NO_COMPANY);
    }

    #[test]
    fn test_same_column_drop() {
        let d = deal(1, 1, DealStage::MeetingBooked, 1.0);
        assert!(is_same_column_drop(d.stage.as_str(), "Meeting Booked"));
        assert!(!is_same_column_drop(d.stage.as_str(), "Meeting Done"));
    }
}
