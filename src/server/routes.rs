use crate::db::{ListFilter, MetricsFilter};
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{service, MarketType, NewPick, Outcome, PickEdit, PickStatus};
use crate::state::{AppState, DbCommand, WsMessage};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::NaiveDate;
use portable_atomic::Ordering::Relaxed;
use rusqlite::Connection;
use std::sync::{Arc, MutexGuard};

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: String,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub user_id: String,
    pub sport_id: Option<String>,
    pub league_id: Option<String>,
    pub market_type: Option<MarketType>,
    pub book_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleBody {
    pub status: PickStatus,
    #[serde(default)]
    pub profit_units: Option<f64>,
}

fn read_conn(state: &AppState) -> LedgerResult<MutexGuard<'_, Connection>> {
    state
        .db
        .lock()
        .map_err(|e| LedgerError::Database(format!("lock: {e}")))
}

/// GET /api/picks -- one page of the user's picks, newest first (cold path)
pub async fn list_picks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> LedgerResult<Json<service::PickPage>> {
    let status = match params.status.as_deref() {
        None | Some("ALL") | Some("all") => None,
        Some(s) => Some(s.parse::<PickStatus>()?),
    };
    let filter = ListFilter {
        status,
        limit: state.config.page_limit(params.limit),
        offset: params.offset.unwrap_or(0),
    };
    let conn = read_conn(&state)?;
    let page = service::list_picks(&*conn, &params.user_id, &filter)?;
    Ok(Json(page))
}

/// POST /api/picks -- register a new pending pick
pub async fn create_pick(
    State(state): State<Arc<AppState>>,
    Query(user): Query<UserQuery>,
    Json(input): Json<NewPick>,
) -> LedgerResult<impl IntoResponse> {
    let pick = state
        .submit(|reply| DbCommand::CreatePick {
            user_id: user.user_id,
            input,
            reply,
        })
        .await?;

    state.counters.picks_created.fetch_add(1, Relaxed);
    state.broadcast(WsMessage::PickCreated { pick: pick.clone() });
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "pick": pick }))))
}

/// GET /api/picks/{id}
pub async fn get_pick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(user): Query<UserQuery>,
) -> LedgerResult<Json<serde_json::Value>> {
    let conn = read_conn(&state)?;
    let pick = service::get_pick(&*conn, &user.user_id, &id)?;
    Ok(Json(serde_json::json!({ "pick": pick })))
}

/// PATCH /api/picks/{id} -- edit a pending pick
pub async fn edit_pick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(user): Query<UserQuery>,
    Json(edit): Json<PickEdit>,
) -> LedgerResult<Json<serde_json::Value>> {
    let pick = state
        .submit(|reply| DbCommand::EditPick {
            user_id: user.user_id,
            pick_id: id,
            edit,
            reply,
        })
        .await?;

    state.broadcast(WsMessage::PickUpdated { pick: pick.clone() });
    Ok(Json(serde_json::json!({ "pick": pick })))
}

/// DELETE /api/picks/{id} -- remove a pending pick
pub async fn delete_pick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(user): Query<UserQuery>,
) -> LedgerResult<Json<serde_json::Value>> {
    let pick = state
        .submit(|reply| DbCommand::DeletePick {
            user_id: user.user_id,
            pick_id: id,
            reply,
        })
        .await?;

    state.broadcast(WsMessage::PickDeleted {
        pick_id: pick.id.clone(),
        user_id: pick.user_id,
    });
    Ok(Json(serde_json::json!({ "deleted": pick.id })))
}

/// POST /api/picks/{id}/settle -- settle a pending pick
pub async fn settle_pick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(user): Query<UserQuery>,
    Json(body): Json<SettleBody>,
) -> LedgerResult<Json<serde_json::Value>> {
    let outcome = Outcome::try_from(body.status)?;
    let pick = state
        .submit(|reply| DbCommand::SettlePick {
            user_id: user.user_id,
            pick_id: id,
            outcome,
            custom_profit: body.profit_units,
            reply,
        })
        .await?;

    state.counters.picks_settled.fetch_add(1, Relaxed);
    if let (Some(profit_units), Some(settled_at)) = (pick.profit_units, pick.settled_at) {
        state.broadcast(WsMessage::PickSettled {
            pick_id: pick.id.clone(),
            user_id: pick.user_id.clone(),
            status: pick.status,
            profit_units,
            settled_at,
        });
    }
    Ok(Json(serde_json::json!({ "pick": pick })))
}

/// POST /api/picks/{id}/reverse -- return a settled pick to pending
pub async fn reverse_pick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(user): Query<UserQuery>,
) -> LedgerResult<Json<serde_json::Value>> {
    let (pick, previous) = state
        .submit(|reply| DbCommand::ReverseSettlement {
            user_id: user.user_id,
            pick_id: id,
            reply,
        })
        .await?;

    state.counters.settlements_reversed.fetch_add(1, Relaxed);
    state.broadcast(WsMessage::SettlementReversed {
        pick_id: pick.id.clone(),
        user_id: pick.user_id.clone(),
        previous_status: previous.into(),
    });
    Ok(Json(serde_json::json!({
        "pick": pick,
        "previousStatus": PickStatus::from(previous),
    })))
}

/// GET /api/metrics -- performance summary over the filtered picks
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetricsQuery>,
) -> LedgerResult<Json<serde_json::Value>> {
    let filter = MetricsFilter {
        sport_id: params.sport_id,
        league_id: params.league_id,
        market_type: params.market_type,
        book_id: params.book_id,
        start_date: params.start_date,
        end_date: params.end_date,
    };
    let conn = read_conn(&state)?;
    let metrics = service::summarize_for(&*conn, &params.user_id, &filter)?;
    state.counters.summaries_computed.fetch_add(1, Relaxed);
    Ok(Json(serde_json::json!({ "metrics": metrics })))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "picksCreated": state.counters.picks_created.load(Relaxed),
        "picksSettled": state.counters.picks_settled.load(Relaxed),
        "settlementsReversed": state.counters.settlements_reversed.load(Relaxed),
        "writesRejected": state.counters.writes_rejected.load(Relaxed),
        "summariesComputed": state.counters.summaries_computed.load(Relaxed),
        "wsMessagesSent": state.counters.ws_messages_sent.load(Relaxed),
    }))
}
