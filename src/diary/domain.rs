// Domain types and calculations - pure, no I/O
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::db::models::Diary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiaryError {
    #[error("Pair is required")]
    MissingPair,

    #[error("Direction must be LONG or SHORT")]
    InvalidDirection,

    #[error("{0} must be a positive number")]
    InvalidPrice(&'static str),

    #[error("Pips must be a finite number")]
    InvalidPips,

    #[error("Date must be YYYY-MM-DD or RFC 3339")]
    InvalidDate,
}

impl FromStr for Direction {
    type Err = DiaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Direction::Long),
            "SHORT" | "SELL" => Ok(Direction::Short),
            _ => Err(DiaryError::InvalidDirection),
        }
    }
}

pub fn normalize_pair(raw: &str) -> Result<String, DiaryError> {
    let pair = raw.trim().to_ascii_uppercase();
    if pair.is_empty() {
        return Err(DiaryError::MissingPair);
    }
    Ok(pair)
}

pub fn validate_price(value: Option<f64>, field: &'static str) -> Result<Option<f64>, DiaryError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(DiaryError::InvalidPrice(field)),
        other => Ok(other),
    }
}

pub fn validate_pips(value: Option<f64>) -> Result<Option<f64>, DiaryError> {
    match value {
        Some(v) if !v.is_finite() => Err(DiaryError::InvalidPips),
        other => Ok(other),
    }
}

/// Conventional pip size: yen crosses quote to two decimals, everything else to four.
pub fn pip_size(pair: &str) -> f64 {
    if pair.to_ascii_uppercase().contains("JPY") {
        0.01
    } else {
        0.0001
    }
}

/// Signed pips won (positive) or lost (negative), rounded to one decimal.
pub fn compute_pips(pair: &str, direction: Direction, entry: f64, exit: f64) -> f64 {
    let diff = match direction {
        Direction::Long => exit - entry,
        Direction::Short => entry - exit,
    };
    round_to(diff / pip_size(pair), 1)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp; stores the calendar date.
pub fn parse_trade_date(raw: &str) -> Result<NaiveDate, DiaryError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| DiaryError::InvalidDate)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn win_rate(wins: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(wins as f64 / total as f64 * 100.0, 2)
}

// -- Statistics --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairStats {
    pub pair: String,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_pips: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRef {
    pub id: String,
    pub pair: String,
    pub pips: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub total_pips: f64,
    pub average_pips: f64,
    pub best_trade: Option<TradeRef>,
    pub worst_trade: Option<TradeRef>,
    pub by_pair: Vec<PairStats>,
}

#[derive(Default)]
struct PairAccumulator {
    trades: usize,
    wins: usize,
    losses: usize,
    pips: f64,
}

/// Aggregate a user's trades. Unknown pips count as breakeven and contribute zero.
pub fn compute_stats(entries: &[Diary]) -> DiaryStats {
    let mut wins = 0;
    let mut losses = 0;
    let mut total_pips = 0.0;
    let mut best: Option<&Diary> = None;
    let mut worst: Option<&Diary> = None;
    let mut pairs: BTreeMap<&str, PairAccumulator> = BTreeMap::new();

    for entry in entries {
        let pips = entry.pips.unwrap_or(0.0);
        let acc = pairs.entry(entry.pair.as_str()).or_default();
        acc.trades += 1;
        acc.pips += pips;

        if pips > 0.0 {
            wins += 1;
            acc.wins += 1;
        } else if pips < 0.0 {
            losses += 1;
            acc.losses += 1;
        }
        total_pips += pips;

        if entry.pips.is_some() {
            if best.map_or(true, |b| pips > b.pips.unwrap_or(0.0)) {
                best = Some(entry);
            }
            if worst.map_or(true, |w| pips < w.pips.unwrap_or(0.0)) {
                worst = Some(entry);
            }
        }
    }

    let total = entries.len();
    let to_ref = |d: &Diary| TradeRef {
        id: d.id.clone(),
        pair: d.pair.clone(),
        pips: d.pips.unwrap_or(0.0),
        date: d.date.clone(),
    };

    DiaryStats {
        total_trades: total,
        wins,
        losses,
        breakeven: total - wins - losses,
        win_rate: win_rate(wins, total),
        total_pips: round_to(total_pips, 1),
        average_pips: if total == 0 {
            0.0
        } else {
            round_to(total_pips / total as f64, 2)
        },
        best_trade: best.map(to_ref),
        worst_trade: worst.map(to_ref),
        by_pair: pairs
            .into_iter()
            .map(|(pair, acc)| PairStats {
                pair: pair.to_string(),
                trades: acc.trades,
                wins: acc.wins,
                losses: acc.losses,
                total_pips: round_to(acc.pips, 1),
                win_rate: win_rate(acc.wins, acc.trades),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(id: &str, pair: &str, pips: Option<f64>) -> Diary {
        Diary {
            id: id.to_string(),
            user_id: "u1".to_string(),
            pair: pair.to_string(),
            direction: "LONG".to_string(),
            entry_price: None,
            exit_price: None,
            pips,
            notes: None,
            image: None,
            date: "2024-03-01".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("long".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!(" SHORT ".parse::<Direction>().unwrap(), Direction::Short);
        assert_eq!("buy".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!("Sell".parse::<Direction>().unwrap(), Direction::Short);
        assert_eq!(
            "flat".parse::<Direction>(),
            Err(DiaryError::InvalidDirection)
        );
    }

    #[test]
    fn pair_is_normalized() {
        assert_eq!(normalize_pair(" eurusd ").unwrap(), "EURUSD");
        assert_eq!(normalize_pair("  "), Err(DiaryError::MissingPair));
    }

    #[test]
    fn prices_must_be_positive_and_finite() {
        assert_eq!(validate_price(None, "Entry price"), Ok(None));
        assert_eq!(validate_price(Some(1.1), "Entry price"), Ok(Some(1.1)));
        assert!(validate_price(Some(0.0), "Entry price").is_err());
        assert!(validate_price(Some(-2.0), "Exit price").is_err());
        assert!(validate_price(Some(f64::NAN), "Exit price").is_err());
        assert!(validate_pips(Some(f64::INFINITY)).is_err());
        assert_eq!(validate_pips(Some(-12.5)), Ok(Some(-12.5)));
    }

    #[test]
    fn pips_for_major_pairs() {
        assert_eq!(compute_pips("EURUSD", Direction::Long, 1.0850, 1.0900), 50.0);
        assert_eq!(compute_pips("EURUSD", Direction::Short, 1.0850, 1.0900), -50.0);
        assert_eq!(compute_pips("GBPUSD", Direction::Short, 1.2700, 1.2655), 45.0);
    }

    #[test]
    fn pips_for_yen_pairs() {
        assert_eq!(pip_size("usdjpy"), 0.01);
        assert_eq!(compute_pips("USDJPY", Direction::Long, 150.00, 150.255), 25.5);
    }

    #[test]
    fn trade_dates() {
        assert_eq!(
            parse_trade_date("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            parse_trade_date("2024-03-01T23:30:00-03:00").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert_eq!(parse_trade_date("yesterday"), Err(DiaryError::InvalidDate));
    }

    #[test]
    fn empty_stats() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.average_pips, 0.0);
        assert!(stats.best_trade.is_none());
        assert!(stats.by_pair.is_empty());
    }

    #[test]
    fn stats_sum_pips_and_group_by_pair() {
        let entries = vec![
            trade("1", "EURUSD", Some(50.0)),
            trade("2", "EURUSD", Some(-20.0)),
            trade("3", "USDJPY", Some(30.5)),
            trade("4", "GBPUSD", None),
            trade("5", "EURUSD", Some(0.0)),
        ];
        let stats = compute_stats(&entries);

        assert_eq!(stats.total_trades, 5);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.breakeven, 2);
        assert_eq!(stats.win_rate, 40.0);
        assert_eq!(stats.total_pips, 60.5);
        assert_eq!(stats.average_pips, 12.1);
        assert_eq!(stats.best_trade.as_ref().unwrap().id, "1");
        assert_eq!(stats.worst_trade.as_ref().unwrap().id, "2");

        let pairs: Vec<&str> = stats.by_pair.iter().map(|p| p.pair.as_str()).collect();
        assert_eq!(pairs, vec!["EURUSD", "GBPUSD", "USDJPY"]);

        let eur = &stats.by_pair[0];
        assert_eq!(eur.trades, 3);
        assert_eq!(eur.wins, 1);
        assert_eq!(eur.losses, 1);
        assert_eq!(eur.total_pips, 30.0);
        assert_eq!(eur.win_rate, 33.33);
    }

    #[test]
    fn direction_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Direction::Short).unwrap(), "SHORT");
        assert_eq!(Direction::Long.to_string(), "LONG");
    }
}
