//! Pick settlement state machine.
//!
//!   PENDING --settle--> WON | LOST | PUSH | VOID | CASHOUT
//!   terminal --reverse_settlement--> PENDING
//!
//! Profit is a pure function of stake, odds and outcome. Only CASHOUT
//! accepts a caller-priced profit; every other outcome ignores it.

use super::{Outcome, Pick, PickStatus};
use crate::errors::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};

/// Realized profit in units for a settlement outcome. Pure function.
#[inline]
pub fn calculate_profit(
    outcome: Outcome,
    stake_units: f64,
    odds_decimal: f64,
    custom_profit: Option<f64>,
) -> f64 {
    match outcome {
        Outcome::Won => stake_units * (odds_decimal - 1.0),
        Outcome::Lost => -stake_units,
        Outcome::Push | Outcome::Void => 0.0,
        Outcome::Cashout => custom_profit.unwrap_or(0.0),
    }
}

impl Pick {
    /// Settle a pending pick. Status, profit and settlement time are
    /// assigned together; on error the pick is untouched.
    pub fn settle(
        &mut self,
        outcome: Outcome,
        custom_profit: Option<f64>,
        settled_at: DateTime<Utc>,
    ) -> LedgerResult<f64> {
        if !self.is_pending() {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                to: outcome.into(),
            });
        }
        if outcome == Outcome::Cashout {
            if let Some(p) = custom_profit {
                if !p.is_finite() {
                    return Err(LedgerError::Validation(format!(
                        "cashout profit must be finite, got {p}"
                    )));
                }
            }
        }

        let profit = calculate_profit(outcome, self.stake_units, self.odds_decimal, custom_profit);

        self.status = outcome.into();
        self.profit_units = Some(profit);
        self.settled_at = Some(settled_at);
        Ok(profit)
    }

    /// Undo a settlement, returning the pick to `PENDING`.
    /// Returns the outcome that was removed.
    pub fn reverse_settlement(&mut self) -> LedgerResult<Outcome> {
        let previous = Outcome::try_from(self.status).map_err(|_| LedgerError::WrongState {
            action: "reverse",
            required: "settled",
            status: self.status,
        })?;

        self.status = PickStatus::Pending;
        self.profit_units = None;
        self.settled_at = None;
        Ok(previous)
    }
}
