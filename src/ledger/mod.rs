pub mod metrics;
pub mod service;
pub mod settlement;

use crate::errors::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use std::str::FromStr;

pub const MIN_ODDS_DECIMAL: f64 = 1.01;
pub const MIN_STAKE_UNITS: f64 = 0.01;

// ── Pick lifecycle ──

/// Wire form is the upper-case name; parsing accepts any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum PickStatus {
    Pending,
    Won,
    Lost,
    Push,
    Void,
    Cashout,
}

impl PickStatus {
    pub const ALL: [PickStatus; 6] = [
        Self::Pending,
        Self::Won,
        Self::Lost,
        Self::Push,
        Self::Void,
        Self::Cashout,
    ];

    #[inline]
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Won => "WON",
            Self::Lost => "LOST",
            Self::Push => "PUSH",
            Self::Void => "VOID",
            Self::Cashout => "CASHOUT",
        }
    }
}

impl std::fmt::Display for PickStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PickStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LedgerError::Validation(format!("unknown pick status: {s}")))
    }
}

impl TryFrom<String> for PickStatus {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Terminal settlement outcome. `PENDING` is not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    Push,
    Void,
    Cashout,
}

impl From<Outcome> for PickStatus {
    fn from(o: Outcome) -> Self {
        match o {
            Outcome::Won => PickStatus::Won,
            Outcome::Lost => PickStatus::Lost,
            Outcome::Push => PickStatus::Push,
            Outcome::Void => PickStatus::Void,
            Outcome::Cashout => PickStatus::Cashout,
        }
    }
}

impl TryFrom<PickStatus> for Outcome {
    type Error = LedgerError;

    fn try_from(status: PickStatus) -> Result<Self, Self::Error> {
        match status {
            PickStatus::Won => Ok(Outcome::Won),
            PickStatus::Lost => Ok(Outcome::Lost),
            PickStatus::Push => Ok(Outcome::Push),
            PickStatus::Void => Ok(Outcome::Void),
            PickStatus::Cashout => Ok(Outcome::Cashout),
            PickStatus::Pending => Err(LedgerError::Validation(
                "PENDING is not a settlement outcome".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum MarketType {
    Moneyline,
    Spread,
    Total,
    Prop,
    Other,
}

impl MarketType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Moneyline => "MONEYLINE",
            Self::Spread => "SPREAD",
            Self::Total => "TOTAL",
            Self::Prop => "PROP",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for MarketType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Moneyline, Self::Spread, Self::Total, Self::Prop, Self::Other]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LedgerError::Validation(format!("unknown market type: {s}")))
    }
}

impl TryFrom<String> for MarketType {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ── Pick record ──

/// A single wagered selection.
///
/// `profit_units` and `settled_at` are `Some` exactly when `status` is terminal.
/// Only the settlement operations in [`settlement`] move a pick between states.
/// `stake_units` and `odds_decimal` are fixed when the pick is created.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    pub id: String,
    pub user_id: String,
    pub sport_id: String,
    pub league_id: String,
    pub event_id: Option<String>,
    pub market_type: MarketType,
    pub selection_text: String,
    pub line: Option<f64>,
    pub odds_decimal: f64,
    pub stake_units: f64,
    pub book_id: Option<String>,
    pub note: Option<String>,
    pub status: PickStatus,
    pub profit_units: Option<f64>,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Pick {
    /// Build a fresh `PENDING` pick. Input must already be validated.
    pub fn new(user_id: &str, input: NewPick, placed_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            sport_id: input.sport_id,
            league_id: input.league_id,
            event_id: input.event_id,
            market_type: input.market_type,
            selection_text: input.selection_text,
            line: input.line,
            odds_decimal: input.odds_decimal,
            stake_units: input.stake_units,
            book_id: input.book_id,
            note: input.note,
            status: PickStatus::Pending,
            profit_units: None,
            placed_at,
            settled_at: None,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == PickStatus::Pending
    }

    /// Apply an edit to the descriptive fields. Only pending picks may change.
    pub fn apply_edit(&mut self, edit: PickEdit) -> LedgerResult<()> {
        self.require_pending("edit")?;
        edit.validate()?;

        if let Some(text) = edit.selection_text {
            self.selection_text = text;
        }
        if edit.line.is_some() {
            self.line = edit.line;
        }
        if edit.book_id.is_some() {
            self.book_id = edit.book_id;
        }
        if edit.note.is_some() {
            self.note = edit.note;
        }
        Ok(())
    }

    pub(crate) fn require_pending(&self, action: &'static str) -> LedgerResult<()> {
        if self.is_pending() {
            return Ok(());
        }
        Err(LedgerError::WrongState {
            action,
            required: "pending",
            status: self.status,
        })
    }
}

// ── Inputs ──

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPick {
    pub sport_id: String,
    pub league_id: String,
    #[serde(default)]
    pub event_id: Option<String>,
    pub market_type: MarketType,
    pub selection_text: String,
    #[serde(default)]
    pub line: Option<f64>,
    pub odds_decimal: f64,
    pub stake_units: f64,
    #[serde(default)]
    pub book_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewPick {
    pub fn validate(&self) -> LedgerResult<()> {
        require_non_empty("sportId", &self.sport_id)?;
        require_non_empty("leagueId", &self.league_id)?;
        require_non_empty("selectionText", &self.selection_text)?;
        validate_odds(self.odds_decimal)?;
        validate_stake(self.stake_units)?;
        if let Some(line) = self.line {
            validate_line(line)?;
        }
        Ok(())
    }
}

/// Partial update for a pending pick. Stake and odds are not editable;
/// a body naming them is rejected at deserialization.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PickEdit {
    pub selection_text: Option<String>,
    pub line: Option<f64>,
    pub book_id: Option<String>,
    pub note: Option<String>,
}

impl PickEdit {
    pub fn validate(&self) -> LedgerResult<()> {
        if let Some(text) = &self.selection_text {
            require_non_empty("selectionText", text)?;
        }
        if let Some(line) = self.line {
            validate_line(line)?;
        }
        Ok(())
    }
}

pub fn validate_odds(odds: f64) -> LedgerResult<()> {
    if !odds.is_finite() || odds < MIN_ODDS_DECIMAL {
        return Err(LedgerError::Validation(format!(
            "oddsDecimal must be at least {MIN_ODDS_DECIMAL}, got {odds}"
        )));
    }
    Ok(())
}

pub fn validate_stake(stake: f64) -> LedgerResult<()> {
    if !stake.is_finite() || stake < MIN_STAKE_UNITS {
        return Err(LedgerError::Validation(format!(
            "stakeUnits must be at least {MIN_STAKE_UNITS}, got {stake}"
        )));
    }
    Ok(())
}

fn validate_line(line: f64) -> LedgerResult<()> {
    if !line.is_finite() {
        return Err(LedgerError::Validation("line must be finite".into()));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{field} is required")));
    }
    Ok(())
}
