//! Parsing of terminal input lines into commands.
//!
//! Commands are whitespace-separated words. Views take optional `key=value`
//! arguments in any order:
//!
//! ```text
//! buy AAPL 10
//! history symbol=aapl type=sell range=week sort=amount page=2
//! export trades.csv type=buy
//! leaderboard by=gain risk=low search=momentum
//! ```

use std::path::PathBuf;

use stocksim::{
    DateRange, DeskError, Quantity, RankMetric, RiskLevel, Side, SortKey, Symbol,
    TransactionFilter, TransactionKind,
};

use crate::error::{Error, Result};

/// Parsed terminal command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Trade {
        side: Side,
        symbol: Symbol,
        quantity: Quantity,
    },
    Undo,
    Portfolio,
    Orders,
    History(HistoryQuery),
    Export {
        path: PathBuf,
        query: HistoryQuery,
    },
    Insights,
    Leaderboard(LeaderboardQuery),
    Prices,
    Tick,
    Help,
    Quit,
}

/// Filter, sort order and page for the history view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryQuery {
    pub filter: TransactionFilter,
    pub sort: SortKey,
    /// 1-based
    pub page: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            filter: TransactionFilter::default(),
            sort: SortKey::default(),
            page: 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeaderboardQuery {
    pub metric: RankMetric,
    pub risk: Option<RiskLevel>,
    pub search: Option<String>,
    /// 1-based
    pub page: usize,
}

pub const HELP: &str = "\
Commands:
  buy SYMBOL QTY            quote and confirm a purchase
  sell SYMBOL QTY           quote and confirm a sale
  undo                      reverse the most recent trade
  portfolio                 cash, holdings and recent activity
  orders                    pending orders
  history [options]         transaction history
      symbol=TEXT type=buy|sell|undo range=all|today|week|month
      sort=date|oldest|symbol|type|amount page=N
  export PATH [options]     write filtered history as CSV
  insights                  performance, risk and trading patterns
  leaderboard [options]     rankings
      by=value|daily|gain|trades|risk risk=low|medium|high search=TEXT page=N
  prices                    current quotes
  tick                      advance prices one step
  help                      this text
  quit                      save and exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let cmd = match head.to_ascii_lowercase().as_str() {
        "buy" | "b" => parse_trade(Side::Buy, &args)?,
        "sell" | "s" => parse_trade(Side::Sell, &args)?,
        "undo" | "u" => no_args(Command::Undo, head, &args)?,
        "portfolio" | "p" | "dashboard" => no_args(Command::Portfolio, head, &args)?,
        "orders" | "queue" => no_args(Command::Orders, head, &args)?,
        "history" | "h" => Command::History(parse_history(&args)?),
        "export" => {
            let (path, rest) = args
                .split_first()
                .ok_or_else(|| usage("export PATH [options]"))?;
            Command::Export {
                path: PathBuf::from(path),
                query: parse_history(rest)?,
            }
        }
        "insights" | "i" => no_args(Command::Insights, head, &args)?,
        "leaderboard" | "l" => Command::Leaderboard(parse_leaderboard(&args)?),
        "prices" => no_args(Command::Prices, head, &args)?,
        "tick" => no_args(Command::Tick, head, &args)?,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => {
            return Err(Error::Command(format!(
                "unknown command '{other}' (type 'help')"
            )));
        }
    };
    Ok(Some(cmd))
}

fn usage(text: &str) -> Error {
    Error::Command(format!("usage: {text}"))
}

fn no_args(cmd: Command, head: &str, args: &[&str]) -> Result<Command> {
    if args.is_empty() {
        Ok(cmd)
    } else {
        Err(Error::Command(format!("'{head}' takes no arguments")))
    }
}

fn parse_trade(side: Side, args: &[&str]) -> Result<Command> {
    let verb = side.to_string().to_ascii_lowercase();
    let [symbol, quantity] = args else {
        return Err(usage(&format!("{verb} SYMBOL QTY")));
    };
    let symbol = Symbol::parse(symbol).map_err(DeskError::from)?;
    let quantity = quantity
        .parse::<Quantity>()
        .map_err(|_| Error::Command(format!("quantity must be a whole number, got '{quantity}'")))?;
    Ok(Command::Trade {
        side,
        symbol,
        quantity,
    })
}

fn options<'a>(args: &[&'a str]) -> Result<Vec<(String, &'a str)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .ok_or_else(|| Error::Command(format!("expected key=value, got '{arg}'")))
        })
        .collect()
}

fn parse_page(value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::Command(format!("page must be a positive number, got '{value}'"))),
    }
}

fn bad_value(key: &str, value: &str) -> Error {
    Error::Command(format!("invalid {key} '{value}'"))
}

fn parse_history(args: &[&str]) -> Result<HistoryQuery> {
    let mut query = HistoryQuery::default();
    for (key, value) in options(args)? {
        match key.as_str() {
            "symbol" => query.filter.symbol = Some(value.to_string()),
            "type" => {
                query.filter.kind = match value.to_ascii_lowercase().as_str() {
                    "all" => None,
                    _ => Some(TransactionKind::parse(value).ok_or_else(|| bad_value(&key, value))?),
                }
            }
            "range" => {
                query.filter.range = match value.to_ascii_lowercase().as_str() {
                    "all" => DateRange::All,
                    "today" => DateRange::Today,
                    "week" => DateRange::Week,
                    "month" => DateRange::Month,
                    _ => return Err(bad_value(&key, value)),
                }
            }
            "sort" => {
                query.sort = match value.to_ascii_lowercase().as_str() {
                    "date" | "newest" => SortKey::DateDesc,
                    "oldest" => SortKey::DateAsc,
                    "symbol" => SortKey::Symbol,
                    "type" => SortKey::Type,
                    "amount" => SortKey::AmountDesc,
                    _ => return Err(bad_value(&key, value)),
                }
            }
            "page" => query.page = parse_page(value)?,
            _ => return Err(Error::Command(format!("unknown history option '{key}'"))),
        }
    }
    Ok(query)
}

fn parse_leaderboard(args: &[&str]) -> Result<LeaderboardQuery> {
    let mut query = LeaderboardQuery {
        page: 1,
        ..Default::default()
    };
    for (key, value) in options(args)? {
        match key.as_str() {
            "by" => {
                query.metric = match value.to_ascii_lowercase().as_str() {
                    "value" => RankMetric::TotalValue,
                    "daily" => RankMetric::DailyGain,
                    "gain" => RankMetric::TotalGain,
                    "trades" => RankMetric::TradingVolume,
                    "risk" => RankMetric::RiskAdjusted,
                    _ => return Err(bad_value(&key, value)),
                }
            }
            "risk" => {
                query.risk = match value.to_ascii_lowercase().as_str() {
                    "all" => None,
                    _ => Some(RiskLevel::parse(value).ok_or_else(|| bad_value(&key, value))?),
                }
            }
            "search" => query.search = Some(value.to_string()),
            "page" => query.page = parse_page(value)?,
            _ => return Err(Error::Command(format!("unknown leaderboard option '{key}'"))),
        }
    }
    Ok(query)
}
