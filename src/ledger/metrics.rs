//! Performance metrics over a pick collection.
//! All functions are pure and total -- an empty slice yields zeroed output.
//!
//! Time-ordered statistics sort by `settled_at` with a stable sort, so picks
//! settled at the same instant keep their order in the input slice.

use super::{Pick, PickStatus};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakType {
    Win,
    Loss,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct CurrentStreak {
    pub length: usize,
    #[serde(rename = "type")]
    pub kind: StreakType,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_picks: usize,
    pub settled_picks: usize,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    pub voids: usize,
    pub cashouts: usize,
    pub total_staked: f64,
    pub net_units: f64,
    pub roi: f64,
    pub win_rate: f64,
    pub avg_odds: f64,
    pub current_streak: CurrentStreak,
    pub best_win_streak: usize,
    pub worst_loss_streak: usize,
    pub max_drawdown: f64,
    pub equity_curve: Vec<EquityPoint>,
}

/// Compute the full summary. Pure function.
pub fn summarize(picks: &[Pick]) -> MetricsSummary {
    let count = |status: PickStatus| picks.iter().filter(|p| p.status == status).count();
    let (best_win_streak, worst_loss_streak) = best_worst_streaks(picks);

    MetricsSummary {
        total_picks: picks.len(),
        settled_picks: picks.iter().filter(|p| p.status.is_terminal()).count(),
        wins: count(PickStatus::Won),
        losses: count(PickStatus::Lost),
        pushes: count(PickStatus::Push),
        voids: count(PickStatus::Void),
        cashouts: count(PickStatus::Cashout),
        total_staked: total_staked(picks),
        net_units: net_units(picks),
        roi: roi(picks),
        win_rate: win_rate(picks),
        avg_odds: avg_odds(picks),
        current_streak: current_streak(picks),
        best_win_streak,
        worst_loss_streak,
        max_drawdown: max_drawdown(picks),
        equity_curve: equity_curve(picks),
    }
}

/// Stake at risk. VOID picks are excluded; pending picks count.
pub fn total_staked(picks: &[Pick]) -> f64 {
    picks
        .iter()
        .filter(|p| p.status != PickStatus::Void)
        .map(|p| p.stake_units)
        .sum()
}

/// Sum of realized profit. Unset profit counts as zero.
pub fn net_units(picks: &[Pick]) -> f64 {
    picks.iter().map(|p| p.profit_units.unwrap_or(0.0)).sum()
}

/// Net units as a percentage of total staked, 0 when nothing is staked.
pub fn roi(picks: &[Pick]) -> f64 {
    let staked = total_staked(picks);
    if staked == 0.0 {
        return 0.0;
    }
    net_units(picks) / staked * 100.0
}

/// Wins over decided (WON/LOST) picks, as a percentage.
pub fn win_rate(picks: &[Pick]) -> f64 {
    let wins = picks.iter().filter(|p| p.status == PickStatus::Won).count();
    let losses = picks.iter().filter(|p| p.status == PickStatus::Lost).count();
    let decided = wins + losses;
    if decided == 0 {
        return 0.0;
    }
    wins as f64 / decided as f64 * 100.0
}

pub fn avg_odds(picks: &[Pick]) -> f64 {
    let (sum, n) = picks
        .iter()
        .filter(|p| p.status != PickStatus::Void)
        .fold((0.0, 0usize), |(s, n), p| (s + p.odds_decimal, n + 1));
    if n == 0 {
        return 0.0;
    }
    sum / n as f64
}

/// Run of identical outcomes ending at the most recently settled WON/LOST pick.
pub fn current_streak(picks: &[Pick]) -> CurrentStreak {
    let decided = settled_ascending(picks, is_decided);

    let mut newest_first = decided.iter().rev();
    let Some(last) = newest_first.next() else {
        return CurrentStreak::default();
    };

    let length = 1 + newest_first.take_while(|p| p.status == last.status).count();
    let kind = if last.status == PickStatus::Won {
        StreakType::Win
    } else {
        StreakType::Loss
    };
    CurrentStreak { length, kind }
}

/// Longest win run and longest loss run over settled WON/LOST picks.
pub fn best_worst_streaks(picks: &[Pick]) -> (usize, usize) {
    let mut best_win = 0usize;
    let mut worst_loss = 0usize;
    let mut win_run = 0usize;
    let mut loss_run = 0usize;

    for pick in settled_ascending(picks, is_decided) {
        if pick.status == PickStatus::Won {
            win_run += 1;
            loss_run = 0;
            best_win = best_win.max(win_run);
        } else {
            loss_run += 1;
            win_run = 0;
            worst_loss = worst_loss.max(loss_run);
        }
    }

    (best_win, worst_loss)
}

/// Largest peak-to-trough decline of cumulative profit. Peak starts at 0.
pub fn max_drawdown(picks: &[Pick]) -> f64 {
    let mut peak = 0.0_f64;
    let mut cumulative = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for pick in settled_ascending(picks, |_| true) {
        cumulative += pick.profit_units.unwrap_or(0.0);
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = peak - cumulative;
        if dd > max_dd {
            max_dd = dd;
        }
    }

    max_dd
}

/// Cumulative profit after each settled pick, one point per pick.
/// Dates are UTC calendar days; same-day points are not merged.
pub fn equity_curve(picks: &[Pick]) -> Vec<EquityPoint> {
    let settled = settled_ascending(picks, |_| true);
    let mut curve = Vec::with_capacity(settled.len());
    let mut cumulative = 0.0;

    for pick in settled {
        cumulative += pick.profit_units.unwrap_or(0.0);
        if let Some(at) = pick.settled_at {
            curve.push(EquityPoint {
                date: at.date_naive(),
                value: cumulative,
            });
        }
    }

    curve
}

#[inline]
fn is_decided(pick: &Pick) -> bool {
    matches!(pick.status, PickStatus::Won | PickStatus::Lost)
}

/// Picks with a settlement time, oldest first. Stable on ties.
fn settled_ascending(picks: &[Pick], keep: impl Fn(&Pick) -> bool) -> Vec<&Pick> {
    let mut out: Vec<&Pick> = picks
        .iter()
        .filter(|p| p.settled_at.is_some() && keep(p))
        .collect();
    out.sort_by_key(|p| p.settled_at);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::*;
    use crate::ledger::Outcome;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn won(profit: f64, day: u32, hour: u32) -> Pick {
        settled(PickStatus::Won, 1.0, 1.0 + profit, profit, ts(day, hour))
    }

    fn lost(day: u32, hour: u32) -> Pick {
        settled(PickStatus::Lost, 1.0, 1.9, -1.0, ts(day, hour))
    }

    /// Sample data: three picks settled at the same instant plus one pending.
    fn seed_picks() -> Vec<Pick> {
        vec![
            settled(PickStatus::Won, 2.0, 1.85, 1.7, ts(15, 20)),
            settled(PickStatus::Won, 1.5, 1.9, 1.35, ts(15, 20)),
            settled(PickStatus::Lost, 1.0, 1.95, -1.0, ts(15, 20)),
            pending(2.0, 2.1),
        ]
    }

    #[test]
    fn test_empty_summary_is_zeroed() {
        let s = summarize(&[]);
        assert_eq!(s, MetricsSummary::default());
        assert_eq!(s.current_streak, CurrentStreak { length: 0, kind: StreakType::None });
        assert!(s.equity_curve.is_empty());
    }

    #[test]
    fn test_seed_scenario() {
        let s = summarize(&seed_picks());
        assert_eq!(s.total_picks, 4);
        assert_eq!(s.settled_picks, 3);
        assert_eq!((s.wins, s.losses, s.pushes, s.voids), (2, 1, 0, 0));
        assert!(approx(s.total_staked, 6.5));
        assert!(approx(s.net_units, 2.05));
        assert!(approx(s.roi, 2.05 / 6.5 * 100.0));
        assert!((s.win_rate - 66.666_666).abs() < 1e-3);
        assert!(approx(s.avg_odds, (1.85 + 1.9 + 1.95 + 2.1) / 4.0));
        assert_eq!(s.current_streak, CurrentStreak { length: 1, kind: StreakType::Loss });
        assert_eq!((s.best_win_streak, s.worst_loss_streak), (2, 1));
        // Cumulative 1.7 -> 3.05 -> 2.05: the loss gives back one unit from the peak.
        assert!(approx(s.max_drawdown, 1.0));
        assert_eq!(s.equity_curve.len(), 3);
        assert!(s.equity_curve.iter().all(|p| p.date == ts(15, 0).date_naive()));
    }

    #[test]
    fn test_void_excluded_from_stake_and_odds() {
        let picks = vec![
            settled(PickStatus::Void, 5.0, 4.0, 0.0, ts(15, 1)),
            settled(PickStatus::Won, 1.0, 2.0, 1.0, ts(15, 2)),
        ];
        assert!(approx(total_staked(&picks), 1.0));
        assert!(approx(avg_odds(&picks), 2.0));
        assert!(approx(roi(&picks), 100.0));
    }

    #[test]
    fn test_roi_zero_when_nothing_staked() {
        let picks = vec![settled(PickStatus::Void, 5.0, 4.0, 0.0, ts(15, 1))];
        assert_eq!(roi(&picks), 0.0);
        assert_eq!(avg_odds(&picks), 0.0);
    }

    #[test]
    fn test_roi_scale_invariant() {
        let base = seed_picks();
        let scaled: Vec<Pick> = base
            .iter()
            .cloned()
            .map(|mut p| {
                p.stake_units *= 7.5;
                p.profit_units = p.profit_units.map(|x| x * 7.5);
                p
            })
            .collect();
        assert!((roi(&base) - roi(&scaled)).abs() < 1e-9);
    }

    #[test]
    fn test_win_rate_ignores_non_decided() {
        let mut picks = Vec::new();
        for h in 0..3 {
            picks.push(won(1.0, 15, h));
        }
        for h in 3..5 {
            picks.push(lost(15, h));
        }
        for h in 5..10 {
            picks.push(settled(PickStatus::Push, 1.0, 2.0, 0.0, ts(15, h)));
        }
        picks.push(pending(1.0, 2.0));
        picks.push(settled(PickStatus::Cashout, 1.0, 2.0, 0.4, ts(15, 11)));
        assert!(approx(win_rate(&picks), 60.0));
        assert_eq!(win_rate(&[pending(1.0, 2.0)]), 0.0);
    }

    #[test]
    fn test_current_streak_uses_settlement_order_not_input_order() {
        // Input deliberately shuffled relative to settlement time.
        let picks = vec![lost(16, 9), won(1.0, 15, 9), won(1.0, 17, 9), won(1.0, 18, 9)];
        assert_eq!(current_streak(&picks), CurrentStreak { length: 2, kind: StreakType::Win });
    }

    #[test]
    fn test_current_streak_skips_push_and_pending() {
        let picks = vec![
            lost(15, 1),
            lost(15, 2),
            settled(PickStatus::Push, 1.0, 2.0, 0.0, ts(15, 3)),
            lost(15, 4),
            pending(1.0, 2.0),
        ];
        assert_eq!(current_streak(&picks), CurrentStreak { length: 3, kind: StreakType::Loss });
    }

    #[test]
    fn test_best_worst_streaks() {
        let picks = vec![
            won(1.0, 15, 1),
            won(1.0, 15, 2),
            lost(15, 3),
            lost(15, 4),
            lost(15, 5),
            won(1.0, 15, 6),
            won(1.0, 15, 7),
            won(1.0, 15, 8),
            won(1.0, 15, 9),
            lost(15, 10),
        ];
        assert_eq!(best_worst_streaks(&picks), (4, 3));
        assert_eq!(best_worst_streaks(&[]), (0, 0));
    }

    #[test]
    fn test_drawdown_zero_when_monotonic() {
        let picks = vec![
            won(0.5, 15, 1),
            settled(PickStatus::Push, 1.0, 2.0, 0.0, ts(15, 2)),
            won(1.2, 15, 3),
        ];
        assert_eq!(max_drawdown(&picks), 0.0);
    }

    #[test]
    fn test_drawdown_from_zero_peak() {
        // Losing from the start counts against the initial zero peak.
        let picks = vec![lost(15, 1), lost(15, 2), won(0.5, 15, 3)];
        assert!(approx(max_drawdown(&picks), 2.0));
    }

    #[test]
    fn test_drawdown_includes_cashout_and_pending_ignored() {
        let mut cashed = pending(4.0, 2.0);
        cashed.settle(Outcome::Cashout, Some(-1.5), ts(15, 2)).unwrap();
        let picks = vec![won(3.0, 15, 1), cashed, pending(10.0, 3.0)];
        assert!(approx(max_drawdown(&picks), 1.5));
        assert!(max_drawdown(&picks) >= 0.0);
    }

    #[test]
    fn test_summary_counts_cashouts() {
        let mut up = pending(4.0, 2.0);
        up.settle(Outcome::Cashout, Some(1.25), ts(15, 2)).unwrap();
        let mut down = pending(2.0, 3.0);
        down.settle(Outcome::Cashout, Some(-0.5), ts(15, 3)).unwrap();
        let picks = vec![won(1.0, 15, 1), up, down, pending(1.0, 2.0)];

        let s = summarize(&picks);
        assert_eq!(s.cashouts, 2);
        assert_eq!(s.settled_picks, 3);
        assert_eq!((s.wins, s.losses), (1, 0));
        assert!(approx(s.net_units, 1.75));
        assert_eq!(serde_json::to_value(&s).unwrap()["cashouts"], 2);
    }

    #[test]
    fn test_equity_curve_ascending_and_ends_at_net() {
        let picks = vec![won(2.0, 17, 9), lost(15, 9), won(0.5, 15, 18), pending(1.0, 2.0)];
        let curve = equity_curve(&picks);
        assert_eq!(curve.len(), 3);
        let dates: Vec<_> = curve.iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-12-15", "2024-12-15", "2024-12-17"]);
        assert!(approx(curve[0].value, -1.0));
        assert!(approx(curve[1].value, -0.5));
        assert!(approx(curve[2].value, 1.5));

        let settled_only: Vec<Pick> = picks.into_iter().filter(|p| p.settled_at.is_some()).collect();
        assert!(approx(curve[2].value, net_units(&settled_only)));
    }

    #[test]
    fn test_summary_serializes_with_api_keys() {
        let json = serde_json::to_value(summarize(&seed_picks())).unwrap();
        assert_eq!(json["totalPicks"], 4);
        assert_eq!(json["currentStreak"]["type"], "loss");
        assert_eq!(json["currentStreak"]["length"], 1);
        assert_eq!(json["equityCurve"][0]["date"], "2024-12-15");
        assert!(json.get("bestWinStreak").is_some());
    }
}
