//! Portfolio analytics derived from desk state.
//!
//! Everything here is computed from the real portfolio, ledger and balance
//! history. The figures are simple heuristics for display (a return/volatility
//! ratio, a one-period VaR, 0-100 risk scores) rather than rigorous risk
//! measures. Correlations, beta and benchmark comparisons are not computed.

use std::fmt;

use chrono::{Datelike, Duration, Weekday};

use crate::desk::TradingDesk;
use crate::history::BalanceHistory;
use crate::ledger::{Transaction, TransactionKind, TransactionLedger};
use crate::portfolio::Portfolio;
use crate::ranking::{heap_sort_by, herfindahl, mode, simple_returns, volatility, win_rate};
use crate::types::{Price, Symbol, Timestamp};

/// z-score for a one-sided 95% confidence level.
const Z_95: f64 = 1.645;

/// Coarse volatility bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
}

impl VolatilityLevel {
    /// Below 0.02 is low, below 0.05 medium, anything else high.
    pub fn from_volatility(vol: f64) -> Self {
        if vol < 0.02 {
            VolatilityLevel::Low
        } else if vol < 0.05 {
            VolatilityLevel::Medium
        } else {
            VolatilityLevel::High
        }
    }
}

impl fmt::Display for VolatilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VolatilityLevel::Low => "Low",
            VolatilityLevel::Medium => "Medium",
            VolatilityLevel::High => "High",
        })
    }
}

/// Headline performance figures.
#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceSummary {
    /// Cash plus market value (cents)
    pub total_value: i64,
    /// Return over the starting cash, in percent (5.0 = +5%)
    pub total_return_pct: f64,
    /// Population std dev of balance-history returns
    pub volatility: f64,
    pub volatility_level: VolatilityLevel,
    /// `total_return_pct / (volatility * 100)`; the denominator is 1 when volatility is zero
    pub return_to_risk: f64,
    /// One-period 95% value at risk (cents)
    pub value_at_risk: f64,
    /// Heuristic score in `[0, 100]`
    pub efficiency: f64,
}

/// Compute headline figures.
pub fn performance(total_value: i64, initial_cash: i64, history: &BalanceHistory) -> PerformanceSummary {
    let total_return_pct = if initial_cash > 0 {
        (total_value - initial_cash) as f64 / initial_cash as f64 * 100.0
    } else {
        0.0
    };
    let vol = history_volatility(history);
    let denom = if vol == 0.0 { 1.0 } else { vol * 100.0 };
    PerformanceSummary {
        total_value,
        total_return_pct,
        volatility: vol,
        volatility_level: VolatilityLevel::from_volatility(vol),
        return_to_risk: total_return_pct / denom,
        value_at_risk: total_value as f64 * vol * Z_95,
        efficiency: (70.0 + total_return_pct * 2.0 - (vol * 1000.0).abs()).clamp(0.0, 100.0),
    }
}

/// Volatility of the period returns across the balance history.
pub fn history_volatility(history: &BalanceHistory) -> f64 {
    volatility(&simple_returns(&history.values()))
}

/// Exposure scores in `[0, 100]`, derived from the stock/cash split and
/// concentration.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskProfile {
    /// Stock value as a fraction of total value
    pub stock_share: f64,
    /// Herfindahl index of holdings by market value
    pub concentration: f64,
    pub market: f64,
    pub specific: f64,
    pub liquidity: f64,
    pub currency: f64,
    pub interest_rate: f64,
    pub inflation: f64,
}

pub fn risk_profile(portfolio: &Portfolio, price: impl Fn(&Symbol) -> Price) -> RiskProfile {
    let values: Vec<f64> = portfolio
        .market_values(&price)
        .into_iter()
        .map(|(_, v)| v as f64)
        .collect();
    let stock: f64 = values.iter().sum();
    let total = portfolio.cash() as f64 + stock;
    let s = if total > 0.0 { stock / total } else { 0.0 };
    let concentration = herfindahl(&values);

    RiskProfile {
        stock_share: s,
        concentration,
        market: (40.0 + s * 60.0).min(100.0),
        specific: (20.0 + concentration * 80.0).min(100.0),
        liquidity: (10.0 + (1.0 - s) * 40.0).min(100.0),
        currency: 5.0,
        interest_rate: (30.0 + s * 30.0).min(100.0),
        inflation: (25.0 + s * 45.0).min(100.0),
    }
}

/// One holding's performance.
#[derive(Clone, Debug, PartialEq)]
pub struct Performer {
    pub symbol: Symbol,
    /// Market value (cents)
    pub current_value: i64,
    /// Current price over average cost, in percent
    pub return_pct: f64,
    /// Share of total portfolio value, in percent
    pub contribution_pct: f64,
}

/// Holdings ranked by return, best first.
pub fn best_performers(portfolio: &Portfolio, price: impl Fn(&Symbol) -> Price) -> Vec<Performer> {
    let total = portfolio.total_value(&price) as f64;
    let mut performers: Vec<Performer> = portfolio
        .holdings()
        .map(|h| {
            let p = price(&h.symbol);
            let value = h.market_value(p);
            Performer {
                symbol: h.symbol,
                current_value: value,
                return_pct: h.return_pct(p),
                contribution_pct: if total > 0.0 { value as f64 / total * 100.0 } else { 0.0 },
            }
        })
        .collect();
    heap_sort_by(&mut performers, |a, b| {
        b.return_pct
            .total_cmp(&a.return_pct)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    performers
}

/// Behavioral statistics over executed buys and sells. Undo records are not
/// counted as trades.
#[derive(Clone, Debug, PartialEq)]
pub struct TradingPatterns {
    pub trades: usize,
    /// Weekday with the most trades; ties go to the earliest trade's day
    pub most_active_day: Option<Weekday>,
    /// Mean trade notional (cents)
    pub average_trade_size: f64,
    /// Percentage of sells above their cost basis
    pub win_rate_pct: f64,
    /// Sell notional over buy notional; 1 when there were no buys
    pub profit_factor: f64,
}

pub fn trading_patterns(ledger: &TransactionLedger) -> TradingPatterns {
    let trades: Vec<&Transaction> = ledger.filter(|tx| tx.kind != TransactionKind::Undo);
    let notional = |kind| -> i64 {
        trades
            .iter()
            .filter(|tx| tx.kind == kind)
            .map(|tx| tx.amount())
            .fold(0, i64::saturating_add)
    };
    let sells: Vec<&Transaction> = trades
        .iter()
        .copied()
        .filter(|tx| tx.kind == TransactionKind::Sell)
        .collect();

    let bought = notional(TransactionKind::Buy);
    let sold = notional(TransactionKind::Sell);

    TradingPatterns {
        trades: trades.len(),
        most_active_day: mode(trades.iter().map(|tx| tx.timestamp.weekday())),
        average_trade_size: if trades.is_empty() {
            0.0
        } else {
            (bought + sold) as f64 / trades.len() as f64
        },
        win_rate_pct: win_rate(&sells, |tx| tx.is_profitable_sell() == Some(true)) * 100.0,
        profit_factor: if bought > 0 { sold as f64 / bought as f64 } else { 1.0 },
    }
}

/// Suggested action for the portfolio.
#[derive(Clone, Debug, PartialEq)]
pub enum Recommendation {
    /// Less than 20% of value in stocks
    IncreaseStockAllocation { stock_pct: f64 },
    /// More than 80% of value in stocks
    ReduceEquityConcentration { stock_pct: f64 },
    /// Herfindahl index above 0.5
    Diversify,
    /// More than 10 trades in the last 7 days
    HighTradingFrequency { trades: usize },
    /// Balance-history volatility above 0.05
    HighVolatility,
    PortfolioLooksGood,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::IncreaseStockAllocation { stock_pct } => write!(
                f,
                "Increase stock allocation: {stock_pct:.1}% in stocks; consider more equity exposure"
            ),
            Recommendation::ReduceEquityConcentration { stock_pct } => write!(
                f,
                "High equity concentration: {stock_pct:.1}% in stocks; consider holding more cash"
            ),
            Recommendation::Diversify => {
                f.write_str("Diversification opportunity: holdings are concentrated in few stocks")
            }
            Recommendation::HighTradingFrequency { trades } => write!(
                f,
                "High trading frequency: {trades} trades this week; consider a longer horizon"
            ),
            Recommendation::HighVolatility => {
                f.write_str("High portfolio volatility: consider more stable holdings")
            }
            Recommendation::PortfolioLooksGood => f.write_str("Portfolio looks good"),
        }
    }
}

pub fn recommendations(
    risk: &RiskProfile,
    vol: f64,
    ledger: &TransactionLedger,
    now: Timestamp,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let stock_pct = risk.stock_share * 100.0;
    if stock_pct < 20.0 {
        out.push(Recommendation::IncreaseStockAllocation { stock_pct });
    } else if stock_pct > 80.0 {
        out.push(Recommendation::ReduceEquityConcentration { stock_pct });
    }
    if risk.concentration > 0.5 {
        out.push(Recommendation::Diversify);
    }
    let week_ago = now - Duration::days(7);
    let recent = ledger.filter(|tx| tx.timestamp > week_ago).len();
    if recent > 10 {
        out.push(Recommendation::HighTradingFrequency { trades: recent });
    }
    if vol > 0.05 {
        out.push(Recommendation::HighVolatility);
    }
    if out.is_empty() {
        out.push(Recommendation::PortfolioLooksGood);
    }
    out
}

/// All analytics for one desk state.
#[derive(Clone, Debug, PartialEq)]
pub struct Insights {
    pub performance: PerformanceSummary,
    pub risk: RiskProfile,
    pub performers: Vec<Performer>,
    pub patterns: TradingPatterns,
    pub recommendations: Vec<Recommendation>,
}

impl Insights {
    pub fn compute(desk: &TradingDesk) -> Self {
        let price = desk.feed().lookup();
        let portfolio = desk.portfolio();
        let performance = performance(
            portfolio.total_value(&price),
            desk.config().initial_cash,
            desk.history(),
        );
        let risk = risk_profile(portfolio, &price);
        let recommendations =
            recommendations(&risk, performance.volatility, desk.ledger(), desk.now());
        Self {
            performers: best_performers(portfolio, &price),
            patterns: trading_patterns(desk.ledger()),
            performance,
            risk,
            recommendations,
        }
    }
}

impl fmt::Display for Insights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.performance;
        writeln!(f, "Performance")?;
        writeln!(f, "  Total value:     {:>12}", Price(p.total_value).to_string())?;
        writeln!(f, "  Total return:    {:>11.2}%", p.total_return_pct)?;
        writeln!(f, "  Volatility:      {:>12}", p.volatility_level.to_string())?;
        writeln!(f, "  Return/risk:     {:>12.2}", p.return_to_risk)?;
        writeln!(
            f,
            "  VaR (95%):       {:>12}",
            Price(-(p.value_at_risk.abs().round() as i64)).to_string()
        )?;
        writeln!(f, "  Efficiency:      {:>11.0}%", p.efficiency)?;

        let r = &self.risk;
        writeln!(f, "Risk profile")?;
        for (name, score) in [
            ("Market", r.market),
            ("Specific", r.specific),
            ("Liquidity", r.liquidity),
            ("Currency", r.currency),
            ("Interest rate", r.interest_rate),
            ("Inflation", r.inflation),
        ] {
            writeln!(f, "  {name:<16} {score:>12.0}")?;
        }

        if !self.performers.is_empty() {
            writeln!(f, "Best performers")?;
            for perf in &self.performers {
                writeln!(
                    f,
                    "  {:<8} {:>12} {:>+8.2}% {:>6.1}%",
                    perf.symbol.as_str(),
                    Price(perf.current_value).to_string(),
                    perf.return_pct,
                    perf.contribution_pct
                )?;
            }
        }

        let t = &self.patterns;
        writeln!(f, "Trading patterns")?;
        match t.most_active_day {
            Some(day) => writeln!(f, "  Most active day: {:>12}", day.to_string())?,
            None => writeln!(f, "  Most active day: {:>12}", "-")?,
        }
        writeln!(
            f,
            "  Avg trade size:  {:>12}",
            Price(t.average_trade_size.round() as i64).to_string()
        )?;
        writeln!(f, "  Win rate:        {:>11.1}%", t.win_rate_pct)?;
        writeln!(f, "  Profit factor:   {:>12.2}", t.profit_factor)?;

        writeln!(f, "Recommendations")?;
        for rec in &self.recommendations {
            writeln!(f, "  - {rec}")?;
        }
        Ok(())
    }
}
