// Stage service: moves deals between pipeline stages.
// The one write path for stage changes; the store merge stamps stageEnteredAt.

use serde::Serialize;

use crate::error::CrmError;
use crate::store::DataService;
use crate::types::{Deal, DealPatch, DealStage};

/// Result of a stage move.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChange {
    pub deal: Deal,
    pub previous_stage: DealStage,
    /// False when the deal was already in the requested stage.
    pub changed: bool,
}

/// Move `deal_id` to the stage named `new_stage`.
///
/// The label is checked before the deal is looked up. Moving a deal to the
/// stage it is already in writes nothing and keeps its stage timestamp.
/// Store errors are returned as they are; retrying is the caller's call.
pub async fn change_stage(
    store: &dyn DataService<Deal>,
    deal_id: u64,
    new_stage: &str,
) -> Result<StageChange, CrmError> {
    let target: DealStage = new_stage.parse().map_err(CrmError::Validation)?;

    let current = store.get_by_id(deal_id).await?;
    let previous_stage = current.stage;
    if previous_stage == target {
        log::debug!("Deal {} already in {}", deal_id, target);
        return Ok(StageChange {
            deal: current,
            previous_stage,
            changed: false,
        });
    }

    let deal = store.update(deal_id, DealPatch::stage(target)).await?;
    log::info!("Deal {} moved {} -> {}", deal_id, previous_stage, deal.stage);
    Ok(StageChange {
        deal,
        previous_stage,
        changed: true,
    })
}
