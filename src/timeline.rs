//! Timeline band geometry for deals.
//!
//! A deal is drawn as a bar inside a one-year band: the bar ends on the
//! expected close date and starts a fixed sales cycle earlier. Only the close
//! date is ever stored; start, left and width are re-derived every time.
//!
//! Drag and resize gestures come back as percentages of the band and are
//! mapped to a new close date. When that date lands in another year the
//! returned position is computed against the new year's band.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::CrmError;
use crate::types::Deal;

/// Assumed length of a sales cycle, ending on the expected close date.
pub const CYCLE_DAYS: i64 = 60;

/// Bars never render narrower than this, whatever their percentage.
pub const MIN_BAR_WIDTH_PX: u32 = 80;

/// Where a deal's bar sits in its year band. Percentages are 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePosition {
    pub expected_close: NaiveDate,
    pub estimated_start: NaiveDate,
    pub year_start: NaiveDate,
    pub year_end: NaiveDate,
    pub total_days: i64,
    pub left: f64,
    /// Visible width: the part of the cycle that falls inside the band.
    /// `left + width` always encodes the close date.
    pub width: f64,
    /// Full cycle width, unclipped. Equal to `width` unless the estimated
    /// start falls in the previous year.
    pub span: f64,
    pub min_width_px: u32,
}

/// Which handle of a bar was dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeEdge {
    Leading,
    Trailing,
}

/// Outcome of a gesture: the close date to persist and the settled position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEdit {
    pub expected_close: NaiveDate,
    pub position: TimelinePosition,
}

/// A month column in the band header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCell {
    /// "Jan"
    pub short_name: String,
    /// "January 2024"
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Jan 1 and Dec 31 of `year`.
fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

pub fn compute_position(deal: &Deal) -> TimelinePosition {
    position_for(deal.expected_close_date)
}

/// Position of a bar closing on `expected_close`.
pub fn position_for(expected_close: NaiveDate) -> TimelinePosition {
    let estimated_start = expected_close
        .checked_sub_signed(Duration::days(CYCLE_DAYS))
        .unwrap_or(NaiveDate::MIN);
    let (year_start, year_end) = year_bounds(expected_close.year())
        .unwrap_or((expected_close, expected_close));
    let total_days = (year_end - year_start).num_days().max(1);
    let total = total_days as f64;

    let start_days = (estimated_start - year_start).num_days() as f64;
    let end_days = (expected_close - year_start).num_days() as f64;

    let left = clamp_unit(start_days / total) * 100.0;
    let width = clamp_unit(end_days / total) * 100.0 - left;
    let span = clamp_unit(CYCLE_DAYS as f64 / total) * 100.0;

    TimelinePosition {
        expected_close,
        estimated_start,
        year_start,
        year_end,
        total_days,
        left,
        width,
        span,
        min_width_px: MIN_BAR_WIDTH_PX,
    }
}

/// Map a right-edge percentage of `position`'s band back to a date,
/// rounded to the nearest day.
fn date_at(position: &TimelinePosition, end_percent: f64) -> Result<NaiveDate, CrmError> {
    let end_days = (end_percent / 100.0 * position.total_days as f64).round() as i64;
    Duration::try_days(end_days)
        .and_then(|offset| position.year_start.checked_add_signed(offset))
        .ok_or_else(|| {
            CrmError::Validation(format!("Timeline offset {}% is out of range", end_percent))
        })
}

fn require_finite(name: &str, value: f64) -> Result<(), CrmError> {
    if !value.is_finite() {
        return Err(CrmError::Validation(format!(
            "{} must be a finite percentage, got {}",
            name, value
        )));
    }
    Ok(())
}

fn settle(expected_close: NaiveDate) -> TimelineEdit {
    TimelineEdit {
        expected_close,
        position: position_for(expected_close),
    }
}

/// Move the whole bar so its left edge sits at `new_left`.
pub fn apply_drag(deal: &Deal, new_left: f64) -> Result<TimelineEdit, CrmError> {
    require_finite("Bar position", new_left)?;
    let current = compute_position(deal);
    let expected_close = date_at(&current, new_left + current.span)?;
    Ok(settle(expected_close))
}

/// Stretch or shrink the bar to `new_width`.
///
/// Only the trailing edge maps to a stored date. The start is derived from
/// the close date, so a leading-edge resize has nothing to persist and
/// returns `Ok(None)`.
pub fn apply_resize(
    deal: &Deal,
    new_width: f64,
    edge: ResizeEdge,
) -> Result<Option<TimelineEdit>, CrmError> {
    if edge == ResizeEdge::Leading {
        log::debug!("Ignoring leading-edge resize on deal {}", deal.id);
        return Ok(None);
    }
    require_finite("Bar width", new_width)?;
    if new_width < 0.0 {
        return Err(CrmError::Validation(format!(
            "Bar width cannot be negative, got {}",
            new_width
        )));
    }
    let current = compute_position(deal);
    let expected_close = date_at(&current, current.left + new_width)?;
    Ok(Some(settle(expected_close)))
}

/// Header cells for the twelve months of `year`.
pub fn months(year: i32) -> Vec<MonthCell> {
    (1..=12)
        .filter_map(|month| {
            let start = NaiveDate::from_ymd_opt(year, month, 1)?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)?
            };
            Some(MonthCell {
                short_name: start.format("%b").to_string(),
                label: start.format("%B %Y").to_string(),
                start,
                end: next - Duration::days(1),
            })
        })
        .collect()
}
