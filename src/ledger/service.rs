//! Ledger operations over an explicit store.
//!
//! Every function takes the store as a parameter; nothing here owns a
//! connection or a clock. Mutations are logged as structured events and are
//! expected to run inside one storage transaction (see `db::run_db_writer`).

use super::metrics::{self, MetricsSummary};
use super::{NewPick, Outcome, Pick, PickEdit, PickStatus};
use crate::db::{ListFilter, MetricsFilter, PickStore};
use crate::errors::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize)]
pub struct PickPage {
    pub picks: Vec<Pick>,
    pub total: u64,
}

pub fn create_pick<S: PickStore>(
    store: &S,
    user_id: &str,
    input: NewPick,
    placed_at: DateTime<Utc>,
) -> LedgerResult<Pick> {
    require_user(user_id)?;
    input.validate()?;

    let pick = Pick::new(user_id, input, placed_at);
    store.insert_pick(&pick)?;

    tracing::info!(
        pick_id = %pick.id,
        user_id,
        stake = pick.stake_units,
        odds = pick.odds_decimal,
        "pick created"
    );
    Ok(pick)
}

pub fn get_pick<S: PickStore>(store: &S, user_id: &str, pick_id: &str) -> LedgerResult<Pick> {
    store
        .find_pick(user_id, pick_id)?
        .ok_or_else(|| LedgerError::NotFound(pick_id.to_string()))
}

pub fn list_picks<S: PickStore>(store: &S, user_id: &str, filter: &ListFilter) -> LedgerResult<PickPage> {
    let picks = store.list_picks(user_id, filter)?;
    let total = store.count_picks(user_id, filter.status)?;
    Ok(PickPage { picks, total })
}

pub fn edit_pending<S: PickStore>(
    store: &S,
    user_id: &str,
    pick_id: &str,
    edit: PickEdit,
) -> LedgerResult<Pick> {
    let mut pick = get_pick(store, user_id, pick_id)?;
    let note_before = pick.note.clone();

    pick.apply_edit(edit)?;
    store.update_pick(&pick)?;

    tracing::info!(
        pick_id,
        user_id,
        selection = %pick.selection_text,
        line = ?pick.line,
        note_before = ?note_before,
        note_after = ?pick.note,
        "pending pick edited"
    );
    Ok(pick)
}

/// Remove a pick that has not been settled. Returns the deleted record.
pub fn delete_pending<S: PickStore>(store: &S, user_id: &str, pick_id: &str) -> LedgerResult<Pick> {
    let pick = get_pick(store, user_id, pick_id)?;
    pick.require_pending("delete")?;
    store.delete_pick(user_id, pick_id)?;

    tracing::info!(pick_id, user_id, "pending pick deleted");
    Ok(pick)
}

pub fn settle_pick<S: PickStore>(
    store: &S,
    user_id: &str,
    pick_id: &str,
    outcome: Outcome,
    custom_profit: Option<f64>,
    settled_at: DateTime<Utc>,
) -> LedgerResult<Pick> {
    let mut pick = get_pick(store, user_id, pick_id)?;
    let profit = pick.settle(outcome, custom_profit, settled_at)?;
    store.update_pick(&pick)?;

    tracing::info!(
        pick_id,
        user_id,
        status = %pick.status,
        profit,
        "pick settled"
    );
    Ok(pick)
}

/// Return a settled pick to `PENDING`. Yields the updated pick and the
/// outcome that was undone.
pub fn reverse_pick<S: PickStore>(
    store: &S,
    user_id: &str,
    pick_id: &str,
) -> LedgerResult<(Pick, Outcome)> {
    let mut pick = get_pick(store, user_id, pick_id)?;
    let profit_before = pick.profit_units;
    let previous = pick.reverse_settlement()?;
    store.update_pick(&pick)?;

    tracing::info!(
        pick_id,
        user_id,
        previous_status = %PickStatus::from(previous),
        profit_before = ?profit_before,
        "settlement reversed"
    );
    Ok((pick, previous))
}

pub fn summarize_for<S: PickStore>(
    store: &S,
    user_id: &str,
    filter: &MetricsFilter,
) -> LedgerResult<MetricsSummary> {
    let picks = store.query_picks(user_id, filter)?;
    Ok(metrics::summarize(&picks))
}

fn require_user(user_id: &str) -> LedgerResult<()> {
    if user_id.trim().is_empty() {
        return Err(LedgerError::Validation("userId is required".into()));
    }
    Ok(())
}
