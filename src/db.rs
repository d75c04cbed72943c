use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{service, MarketType, Pick, PickStatus};
use crate::state::DbCommand;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = include_str!("../migrations/001_init.sql");

const PICK_COLUMNS: &str = "id, user_id, sport_id, league_id, event_id, market_type, selection_text, line, odds_decimal, stake_units, book_id, note, status, profit_units, placed_at, settled_at";

pub fn init_db(data_dir: &Path) -> LedgerResult<DbPool> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| LedgerError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("pickbook.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-64000;")?;
    conn.execute_batch(SCHEMA)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

#[cfg(test)]
pub fn open_in_memory() -> LedgerResult<DbPool> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Dedicated DB writer task. Reads commands from bounded channel, executes SQL.
/// Every pick mutation goes through here, one command at a time, so a
/// pending-check and the update it guards never interleave.
pub async fn run_db_writer(db: DbPool, mut rx: mpsc::Receiver<DbCommand>) {
    tracing::info!("db writer task started");

    while let Some(cmd) = rx.recv().await {
        execute_command(&db, cmd);
    }

    tracing::info!("db writer task shutting down");
}

fn execute_command(db: &DbPool, cmd: DbCommand) {
    match cmd {
        DbCommand::CreatePick { user_id, input, reply } => {
            let result = write_txn(db, |conn| {
                service::create_pick(conn, &user_id, input, Utc::now())
            });
            log_failure("create", &result);
            let _ = reply.send(result);
        }
        DbCommand::EditPick { user_id, pick_id, edit, reply } => {
            let result = write_txn(db, |conn| service::edit_pending(conn, &user_id, &pick_id, edit));
            log_failure("edit", &result);
            let _ = reply.send(result);
        }
        DbCommand::DeletePick { user_id, pick_id, reply } => {
            let result = write_txn(db, |conn| service::delete_pending(conn, &user_id, &pick_id));
            log_failure("delete", &result);
            let _ = reply.send(result);
        }
        DbCommand::SettlePick { user_id, pick_id, outcome, custom_profit, reply } => {
            let result = write_txn(db, |conn| {
                service::settle_pick(conn, &user_id, &pick_id, outcome, custom_profit, Utc::now())
            });
            log_failure("settle", &result);
            let _ = reply.send(result);
        }
        DbCommand::ReverseSettlement { user_id, pick_id, reply } => {
            let result = write_txn(db, |conn| service::reverse_pick(conn, &user_id, &pick_id));
            log_failure("reverse", &result);
            let _ = reply.send(result);
        }
    }
}

/// Run `f` inside one transaction. Dropping the transaction on error rolls it back.
fn write_txn<T>(db: &DbPool, f: impl FnOnce(&Connection) -> LedgerResult<T>) -> LedgerResult<T> {
    let mut conn = db
        .lock()
        .map_err(|e| LedgerError::Database(format!("lock poisoned: {e}")))?;
    let tx = conn.transaction()?;
    let out = f(&*tx)?;
    tx.commit()?;
    Ok(out)
}

fn log_failure<T>(op: &'static str, result: &LedgerResult<T>) {
    if let Err(e) = result {
        if e.status_code().is_server_error() {
            tracing::error!(op, error = %e, "db write error");
        } else {
            tracing::warn!(op, error = %e, "write rejected");
        }
    }
}

// ── Repository ──

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<PickStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// Subset selection for metrics. Dates bound `placed_at` and are inclusive
/// whole UTC days.
#[derive(Debug, Clone, Default)]
pub struct MetricsFilter {
    pub sport_id: Option<String>,
    pub league_id: Option<String>,
    pub market_type: Option<MarketType>,
    pub book_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Storage seam for the ledger service. Every lookup is scoped to the owning user.
pub trait PickStore {
    fn insert_pick(&self, pick: &Pick) -> LedgerResult<()>;
    fn find_pick(&self, user_id: &str, pick_id: &str) -> LedgerResult<Option<Pick>>;
    /// Newest `placed_at` first.
    fn list_picks(&self, user_id: &str, filter: &ListFilter) -> LedgerResult<Vec<Pick>>;
    fn count_picks(&self, user_id: &str, status: Option<PickStatus>) -> LedgerResult<u64>;
    /// Insertion order, which is the tie-break the aggregator relies on.
    fn query_picks(&self, user_id: &str, filter: &MetricsFilter) -> LedgerResult<Vec<Pick>>;
    /// Persist the mutable fields of an existing pick.
    fn update_pick(&self, pick: &Pick) -> LedgerResult<()>;
    fn delete_pick(&self, user_id: &str, pick_id: &str) -> LedgerResult<()>;
}

impl PickStore for Connection {
    fn insert_pick(&self, pick: &Pick) -> LedgerResult<()> {
        self.execute(
            "INSERT INTO picks (id, user_id, sport_id, league_id, event_id, market_type, selection_text, line, odds_decimal, stake_units, book_id, note, status, profit_units, placed_at, settled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            rusqlite::params![
                pick.id, pick.user_id, pick.sport_id, pick.league_id, pick.event_id,
                pick.market_type, pick.selection_text, pick.line, pick.odds_decimal,
                pick.stake_units, pick.book_id, pick.note, pick.status, pick.profit_units,
                pick.placed_at, pick.settled_at
            ],
        )?;
        Ok(())
    }

    fn find_pick(&self, user_id: &str, pick_id: &str) -> LedgerResult<Option<Pick>> {
        let sql = format!("SELECT {PICK_COLUMNS} FROM picks WHERE id = ?1 AND user_id = ?2");
        let mut stmt = self.prepare(&sql)?;
        let mut rows = stmt.query_map(rusqlite::params![pick_id, user_id], pick_from_row)?;
        Ok(rows.next().transpose()?)
    }

    fn list_picks(&self, user_id: &str, filter: &ListFilter) -> LedgerResult<Vec<Pick>> {
        let (sql, params): (String, Vec<Box<dyn ToSql>>) = match filter.status {
            Some(status) => (
                format!("SELECT {PICK_COLUMNS} FROM picks WHERE user_id = ?1 AND status = ?2 ORDER BY placed_at DESC, seq DESC LIMIT ?3 OFFSET ?4"),
                vec![
                    Box::new(user_id.to_string()),
                    Box::new(status),
                    Box::new(filter.limit as i64),
                    Box::new(filter.offset as i64),
                ],
            ),
            None => (
                format!("SELECT {PICK_COLUMNS} FROM picks WHERE user_id = ?1 ORDER BY placed_at DESC, seq DESC LIMIT ?2 OFFSET ?3"),
                vec![
                    Box::new(user_id.to_string()),
                    Box::new(filter.limit as i64),
                    Box::new(filter.offset as i64),
                ],
            ),
        };
        let mut stmt = self.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), pick_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_picks(&self, user_id: &str, status: Option<PickStatus>) -> LedgerResult<u64> {
        let total: i64 = match status {
            Some(status) => self.query_row(
                "SELECT COUNT(*) FROM picks WHERE user_id = ?1 AND status = ?2",
                rusqlite::params![user_id, status],
                |row| row.get(0),
            )?,
            None => self.query_row(
                "SELECT COUNT(*) FROM picks WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| row.get(0),
            )?,
        };
        Ok(total as u64)
    }

    fn query_picks(&self, user_id: &str, filter: &MetricsFilter) -> LedgerResult<Vec<Pick>> {
        let mut clauses = vec!["user_id = ?".to_string()];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(v) = &filter.sport_id {
            clauses.push("sport_id = ?".into());
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &filter.league_id {
            clauses.push("league_id = ?".into());
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = filter.market_type {
            clauses.push("market_type = ?".into());
            params.push(Box::new(v));
        }
        if let Some(v) = &filter.book_id {
            clauses.push("book_id = ?".into());
            params.push(Box::new(v.clone()));
        }
        if let Some(start) = filter.start_date {
            clauses.push("placed_at >= ?".into());
            params.push(Box::new(day_start(start)));
        }
        if let Some(next) = filter.end_date.and_then(|d| d.succ_opt()) {
            clauses.push("placed_at < ?".into());
            params.push(Box::new(day_start(next)));
        }

        let sql = format!(
            "SELECT {PICK_COLUMNS} FROM picks WHERE {} ORDER BY seq ASC",
            clauses.join(" AND ")
        );
        let mut stmt = self.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), pick_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn update_pick(&self, pick: &Pick) -> LedgerResult<()> {
        let changed = self.execute(
            "UPDATE picks SET selection_text = ?1, line = ?2, odds_decimal = ?3, stake_units = ?4, book_id = ?5, note = ?6, status = ?7, profit_units = ?8, settled_at = ?9
             WHERE id = ?10 AND user_id = ?11",
            rusqlite::params![
                pick.selection_text, pick.line, pick.odds_decimal, pick.stake_units,
                pick.book_id, pick.note, pick.status, pick.profit_units, pick.settled_at,
                pick.id, pick.user_id
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound(pick.id.clone()));
        }
        Ok(())
    }

    fn delete_pick(&self, user_id: &str, pick_id: &str) -> LedgerResult<()> {
        let changed = self.execute(
            "DELETE FROM picks WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![pick_id, user_id],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound(pick_id.to_string()));
        }
        Ok(())
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn pick_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pick> {
    Ok(Pick {
        id: row.get(0)?,
        user_id: row.get(1)?,
        sport_id: row.get(2)?,
        league_id: row.get(3)?,
        event_id: row.get(4)?,
        market_type: row.get(5)?,
        selection_text: row.get(6)?,
        line: row.get(7)?,
        odds_decimal: row.get(8)?,
        stake_units: row.get(9)?,
        book_id: row.get(10)?,
        note: row.get(11)?,
        status: row.get(12)?,
        profit_units: row.get(13)?,
        placed_at: row.get(14)?,
        settled_at: row.get(15)?,
    })
}

// ── Column codecs ──

impl ToSql for PickStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PickStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: LedgerError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for MarketType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MarketType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: LedgerError| FromSqlError::Other(Box::new(e)))
    }
}
