use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{NewPick, Outcome, Pick, PickEdit, PickStatus};
use chrono::{DateTime, Utc};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

// ── Messages OUT to WebSocket clients ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "pick_created", rename_all = "camelCase")]
    PickCreated { pick: Pick },

    #[serde(rename = "pick_updated", rename_all = "camelCase")]
    PickUpdated { pick: Pick },

    #[serde(rename = "pick_deleted", rename_all = "camelCase")]
    PickDeleted { pick_id: String, user_id: String },

    #[serde(rename = "pick_settled", rename_all = "camelCase")]
    PickSettled {
        pick_id: String,
        user_id: String,
        status: PickStatus,
        profit_units: f64,
        settled_at: DateTime<Utc>,
    },

    #[serde(rename = "settlement_reversed", rename_all = "camelCase")]
    SettlementReversed {
        pick_id: String,
        user_id: String,
        previous_status: PickStatus,
    },
}

// ── DB Commands (sent to writer task via bounded channel) ──

pub type Reply<T> = oneshot::Sender<LedgerResult<T>>;

#[derive(Debug)]
pub enum DbCommand {
    CreatePick {
        user_id: String,
        input: NewPick,
        reply: Reply<Pick>,
    },
    EditPick {
        user_id: String,
        pick_id: String,
        edit: PickEdit,
        reply: Reply<Pick>,
    },
    DeletePick {
        user_id: String,
        pick_id: String,
        reply: Reply<Pick>,
    },
    SettlePick {
        user_id: String,
        pick_id: String,
        outcome: Outcome,
        custom_profit: Option<f64>,
        reply: Reply<Pick>,
    },
    ReverseSettlement {
        user_id: String,
        pick_id: String,
        reply: Reply<(Pick, Outcome)>,
    },
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub picks_created: AtomicU64,
    pub picks_settled: AtomicU64,
    pub settlements_reversed: AtomicU64,
    pub writes_rejected: AtomicU64,
    pub summaries_computed: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            picks_created: AtomicU64::new(0),
            picks_settled: AtomicU64::new(0),
            settlements_reversed: AtomicU64::new(0),
            writes_rejected: AtomicU64::new(0),
            summaries_computed: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,

    // Writer -> Dashboard: event stream (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    // Handlers -> DB Writer: bounded command channel
    pub db_tx: mpsc::Sender<DbCommand>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, db_tx: mpsc::Sender<DbCommand>) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(2048);

        Arc::new(Self {
            config,
            db,
            ws_tx,
            db_tx,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }

    /// Hand a command to the writer task and wait for its reply.
    pub async fn submit<T>(&self, build: impl FnOnce(Reply<T>) -> DbCommand) -> LedgerResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.db_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| LedgerError::ChannelClosed("db writer".into()))?;
        let result = reply_rx
            .await
            .map_err(|_| LedgerError::ChannelClosed("db writer reply".into()))?;

        if result.is_err() {
            self.counters.writes_rejected.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}
