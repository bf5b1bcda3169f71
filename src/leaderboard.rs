//! Leaderboard: ranks the user against other players.
//!
//! The user's row comes from real desk state. Rival players are simulated
//! demo data generated from an RNG; their numbers mean nothing beyond giving
//! the ranking something to sort.

use std::cmp::Ordering;
use std::fmt;

use chrono::Duration;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::desk::TradingDesk;
use crate::history::BalanceHistory;
use crate::ledger::TransactionKind;
use crate::ranking::{heap_sort_by, mean};
use crate::types::Timestamp;

/// Names given to simulated rivals.
pub const RIVAL_NAMES: [&str; 25] = [
    "Warren Buffett",
    "Cathie Wood",
    "Ray Dalio",
    "Michael Burry",
    "Paul Tudor Jones",
    "Stanley Druckenmiller",
    "David Tepper",
    "Bill Ackman",
    "Carl Icahn",
    "George Soros",
    "John Bogle",
    "Peter Lynch",
    "Benjamin Graham",
    "Philip Fisher",
    "John Templeton",
    "Jesse Livermore",
    "John Neff",
    "Thomas Rowe Price",
    "Julian Robertson",
    "Ken Griffin",
    "Steven Cohen",
    "David Einhorn",
    "Chamath Palihapitiya",
    "Chase Coleman",
    "Jim Simons",
];

/// Strategies assigned to simulated rivals.
pub const STRATEGIES: [&str; 6] = [
    "Value Investing",
    "Growth Investing",
    "Day Trading",
    "Swing Trading",
    "Arbitrage",
    "Quantitative",
];

/// Id of the user's row.
pub const USER_ID: &str = "user";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Divisor for the risk-adjusted metric.
    pub fn score(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.0,
        }
    }

    /// Classify by the fraction of total value held in stocks:
    /// under 30% low, under 70% medium, otherwise high.
    pub fn from_stock_share(share: f64) -> Self {
        let pct = share * 100.0;
        if pct < 30.0 {
            RiskLevel::Low
        } else if pct < 70.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    /// Total value (cents)
    pub portfolio_value: i64,
    /// Percent change over the last day
    pub daily_change: f64,
    /// Gain over the starting value (cents)
    pub total_gain: i64,
    pub trades: usize,
    pub risk_level: RiskLevel,
    pub strategy: Option<String>,
}

impl Player {
    /// The user's row built from desk state.
    pub fn from_desk(desk: &TradingDesk) -> Self {
        let value = desk.total_value();
        let share = if value > 0 {
            desk.market_value() as f64 / value as f64
        } else {
            0.0
        };
        Self {
            id: USER_ID.to_string(),
            name: "You".to_string(),
            portfolio_value: value,
            daily_change: daily_change(desk.history(), desk.now()),
            total_gain: value - desk.config().initial_cash,
            trades: desk
                .ledger()
                .entries()
                .iter()
                .filter(|tx| tx.kind != TransactionKind::Undo)
                .count(),
            risk_level: RiskLevel::from_stock_share(share),
            strategy: None,
        }
    }

    /// `daily_change / risk score`.
    pub fn risk_adjusted(&self) -> f64 {
        self.daily_change / self.risk_level.score()
    }

    fn matches(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(term)
            || self
                .strategy
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(term))
    }
}

/// Percent change from the oldest sample in the last 24 hours to the newest.
/// Zero with fewer than two such samples.
pub fn daily_change(history: &BalanceHistory, now: Timestamp) -> f64 {
    let since = now - Duration::days(1);
    let window: Vec<i64> = history
        .samples()
        .into_iter()
        .filter(|s| s.time >= since)
        .map(|s| s.value)
        .collect();
    match (window.first(), window.last()) {
        (Some(&first), Some(&last)) if window.len() >= 2 && first != 0 => {
            (last - first) as f64 / first as f64 * 100.0
        }
        _ => 0.0,
    }
}

/// Ranking criteria. Every metric ranks highest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RankMetric {
    #[default]
    TotalValue,
    DailyGain,
    TotalGain,
    TradingVolume,
    RiskAdjusted,
}

impl RankMetric {
    /// Ordering that puts the better player first.
    pub fn compare(self, a: &Player, b: &Player) -> Ordering {
        match self {
            RankMetric::TotalValue => b.portfolio_value.cmp(&a.portfolio_value),
            RankMetric::DailyGain => b.daily_change.total_cmp(&a.daily_change),
            RankMetric::TotalGain => b.total_gain.cmp(&a.total_gain),
            RankMetric::TradingVolume => b.trades.cmp(&a.trades),
            RankMetric::RiskAdjusted => b.risk_adjusted().total_cmp(&a.risk_adjusted()),
        }
    }
}

/// Aggregate figures over a ranked view.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardStats {
    pub players: usize,
    /// Mean portfolio value (cents)
    pub average_value: f64,
    /// Mean portfolio value of the top 10% by value, rounded up (cents)
    pub top_decile_average: f64,
    /// Share of players the user ranks at or above, by value; `None` if the
    /// user is not in the view
    pub user_percentile: Option<f64>,
}

/// The user plus any number of other players.
#[derive(Clone, Debug)]
pub struct Leaderboard {
    players: Vec<Player>,
}

impl Leaderboard {
    pub fn new(user: Player) -> Self {
        Self {
            players: vec![user],
        }
    }

    /// The user plus one simulated rival per name in [`RIVAL_NAMES`].
    pub fn with_simulated_rivals<R: Rng>(user: Player, rng: &mut R) -> Self {
        let mut board = Self::new(user);
        for (i, name) in RIVAL_NAMES.iter().enumerate() {
            board.players.push(simulated_rival(i, name, rng));
        }
        board
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    /// Replace the user's row, e.g. after a trade.
    pub fn update_user(&mut self, user: Player) {
        match self.players.iter_mut().find(|p| p.id == user.id) {
            Some(slot) => *slot = user,
            None => self.players.push(user),
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn user(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.id == USER_ID)
    }

    /// Players ranked by `metric`, optionally restricted to one risk level.
    pub fn rank(&self, metric: RankMetric, risk: Option<RiskLevel>) -> Vec<&Player> {
        let mut view: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| risk.is_none_or(|r| p.risk_level == r))
            .collect();
        heap_sort_by(&mut view, |a, b| metric.compare(a, b));
        view
    }

    /// Players whose name or strategy contains `term`, case-insensitively.
    /// An empty term matches everyone.
    pub fn search(&self, term: &str) -> Vec<&Player> {
        let term = term.trim().to_lowercase();
        self.players.iter().filter(|p| p.matches(&term)).collect()
    }

    /// Move every simulated rival by a small random step, skewed slightly upward.
    pub fn simulate_market_movements<R: Rng>(&mut self, rng: &mut R) {
        for player in self.players.iter_mut().filter(|p| p.id != USER_ID) {
            let movement = (rng.r#gen::<f64>() - 0.45) * 0.02;
            let old = player.portfolio_value;
            player.portfolio_value = (old as f64 * (1.0 + movement)).round() as i64;
            player.total_gain += player.portfolio_value - old;
            player.daily_change = movement * 100.0;
            if rng.gen_bool(0.1) {
                player.trades += rng.gen_range(0..3);
            }
        }
    }
}

/// 1-based position of player `id` in a ranked view.
pub fn position_of(ranked: &[&Player], id: &str) -> Option<usize> {
    ranked.iter().position(|p| p.id == id).map(|i| i + 1)
}

pub fn stats(view: &[&Player]) -> LeaderboardStats {
    let mut by_value: Vec<&Player> = view.to_vec();
    heap_sort_by(&mut by_value, |a, b| RankMetric::TotalValue.compare(a, b));

    let values: Vec<f64> = by_value.iter().map(|p| p.portfolio_value as f64).collect();
    let n = values.len();
    let top = n.div_ceil(10);

    LeaderboardStats {
        players: n,
        average_value: mean(&values).unwrap_or(0.0),
        top_decile_average: mean(&values[..top]).unwrap_or(0.0),
        user_percentile: position_of(&by_value, USER_ID)
            .map(|pos| (n - (pos - 1)) as f64 / n as f64 * 100.0),
    }
}

fn simulated_rival<R: Rng>(index: usize, name: &str, rng: &mut R) -> Player {
    let value = rng.gen_range(50_000_00.0..2_050_000_00.0_f64);
    let levels = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
    Player {
        id: format!("ai_{index}"),
        name: name.to_string(),
        portfolio_value: value.round() as i64,
        daily_change: rng.gen_range(-5.0..5.0),
        total_gain: (value * rng.gen_range(-0.2..1.8)).round() as i64,
        trades: rng.gen_range(50..550),
        risk_level: levels.choose(rng).copied().unwrap_or(RiskLevel::Medium),
        strategy: STRATEGIES.choose(rng).map(|s| s.to_string()),
    }
}
