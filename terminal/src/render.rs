//! Text views of desk state.
//!
//! Each view borrows what it shows and renders through `Display`, so it can
//! be built inside [`DeskService::read`](stocksim::DeskService::read) and
//! returned as a `String`.

use std::fmt;

use stocksim::ledger::{ledger_stats, page, page_count, sort_transactions};
use stocksim::leaderboard::{position_of, stats, USER_ID};
use stocksim::{OrderRequest, Player, Price, PriceFeed, Transaction, TradingDesk};

use crate::commands::{HistoryQuery, LeaderboardQuery};

pub const HISTORY_PAGE_SIZE: usize = 10;
pub const LEADERBOARD_PAGE_SIZE: usize = 15;
pub const RECENT_TRANSACTIONS: usize = 5;

fn money(cents: f64) -> String {
    Price(cents.round() as i64).to_string()
}

/// One-line description of a quoted order, used in the confirmation prompt.
pub fn describe_request(request: &OrderRequest) -> String {
    format!(
        "{} {} {} @ {} = {}",
        request.side,
        request.quantity,
        request.symbol,
        request.price,
        Price(request.notional())
    )
}

/// One-line description of a ledger entry.
pub fn describe_transaction(tx: &Transaction) -> String {
    match tx.reverses {
        Some(side) => format!(
            "UNDO {side} {} {} @ {}",
            tx.quantity, tx.symbol, tx.price
        ),
        None => format!(
            "{} {} {} @ {} = {}",
            tx.kind,
            tx.quantity,
            tx.symbol,
            tx.price,
            Price(tx.amount())
        ),
    }
}

fn transaction_row(f: &mut fmt::Formatter<'_>, tx: &Transaction) -> fmt::Result {
    writeln!(
        f,
        "  {:<19} {:<5} {:<6} {:>6} {:>10} {:>12}",
        tx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        tx.kind.as_str(),
        tx.symbol.as_str(),
        tx.quantity,
        tx.price.to_string(),
        Price(tx.amount()).to_string(),
    )
}

fn transaction_header(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
        f,
        "  {:<19} {:<5} {:<6} {:>6} {:>10} {:>12}",
        "Time", "Type", "Symbol", "Qty", "Price", "Amount"
    )
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

/// Account summary, holdings table and the most recent transactions.
pub struct PortfolioView<'a>(pub &'a TradingDesk);

impl fmt::Display for PortfolioView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desk = self.0;
        let portfolio = desk.portfolio();
        let price = desk.feed().lookup();

        writeln!(f, "ACCOUNT")?;
        writeln!(f, "  Cash:            {:>12}", Price(portfolio.cash()).to_string())?;
        if desk.available_cash() != portfolio.cash() {
            writeln!(f, "  Available:       {:>12}", Price(desk.available_cash()).to_string())?;
        }
        writeln!(f, "  Stock value:     {:>12}", Price(desk.market_value()).to_string())?;
        writeln!(f, "  Total value:     {:>12}", Price(desk.total_value()).to_string())?;

        if portfolio.is_empty() {
            writeln!(f, "\nNo holdings.")?;
        } else {
            writeln!(f, "\nHOLDINGS")?;
            writeln!(
                f,
                "  {:<6} {:>6} {:>10} {:>10} {:>12} {:>12} {:>8}",
                "Symbol", "Qty", "Avg cost", "Price", "Value", "P&L", "Return"
            )?;
            for holding in portfolio.sorted_holdings() {
                let current = price(&holding.symbol);
                writeln!(
                    f,
                    "  {:<6} {:>6} {:>10} {:>10} {:>12} {:>12} {:>+7.2}%",
                    holding.symbol.as_str(),
                    holding.quantity,
                    money(holding.avg_cost),
                    current.to_string(),
                    Price(holding.market_value(current)).to_string(),
                    money(holding.unrealized_pnl(current)),
                    holding.return_pct(current),
                )?;
            }
        }

        let recent = desk.ledger().recent(RECENT_TRANSACTIONS);
        if !recent.is_empty() {
            writeln!(f, "\nRECENT")?;
            for tx in recent {
                writeln!(f, "  {}", describe_transaction(tx))?;
            }
        }
        Ok(())
    }
}

/// Orders confirmed but not yet executed.
pub struct OrdersView<'a>(pub &'a TradingDesk);

impl fmt::Display for OrdersView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = self.0.queue().pending().peekable();
        if pending.peek().is_none() {
            return writeln!(f, "No pending orders.");
        }
        writeln!(f, "PENDING ORDERS")?;
        for order in pending {
            writeln!(
                f,
                "  {:<5} {:<4} {:>6} {:<6} @ {:>10}  {}",
                order.id.to_string(),
                order.side.to_string(),
                order.quantity,
                order.symbol.as_str(),
                order.price.to_string(),
                order.submitted_at.format("%H:%M:%S"),
            )?;
        }
        Ok(())
    }
}

/// Quotes for every symbol the feed carries.
pub struct PricesView<'a>(pub &'a PriceFeed);

impl fmt::Display for PricesView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let feed = self.0;
        for symbol in feed.symbols() {
            if let Some(record) = feed.record(&symbol) {
                writeln!(
                    f,
                    "  {:<6} {:<20} {:>10}",
                    symbol.as_str(),
                    record.name,
                    record.quote().to_string()
                )?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One page of the filtered, sorted transaction history with summary counts.
pub struct HistoryView<'a> {
    pub desk: &'a TradingDesk,
    pub query: &'a HistoryQuery,
}

impl fmt::Display for HistoryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let matched = self.desk.ledger().query(&self.query.filter, self.desk.now());
        if matched.is_empty() {
            return writeln!(f, "No transactions found.");
        }
        let sorted = sort_transactions(&matched, self.query.sort);
        let pages = page_count(sorted.len(), HISTORY_PAGE_SIZE);

        transaction_header(f)?;
        for tx in page(&sorted, self.query.page, HISTORY_PAGE_SIZE) {
            transaction_row(f, tx)?;
        }

        let s = ledger_stats(&matched);
        writeln!(f, "\nPage {} of {}", self.query.page, pages)?;
        writeln!(
            f,
            "{} transactions: {} buys, {} sells, {} undos, {} shares",
            s.total, s.buys, s.sells, s.undos, s.total_volume
        )?;
        if let Some(sym) = s.most_traded {
            writeln!(f, "Most traded: {sym}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// A ranked, optionally searched page of players with aggregate stats.
pub struct LeaderboardView<'a> {
    pub ranked: Vec<&'a Player>,
    pub query: &'a LeaderboardQuery,
}

impl<'a> LeaderboardView<'a> {
    /// Rank `players` per `query`, then apply its search term.
    pub fn new(board: &'a stocksim::Leaderboard, query: &'a LeaderboardQuery) -> Self {
        let mut ranked = board.rank(query.metric, query.risk);
        if let Some(term) = &query.search {
            let hits = board.search(term);
            ranked.retain(|p| hits.iter().any(|h| h.id == p.id));
        }
        Self { ranked, query }
    }
}

impl fmt::Display for LeaderboardView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranked.is_empty() {
            return writeln!(f, "No players found.");
        }
        let start = (self.query.page.max(1) - 1) * LEADERBOARD_PAGE_SIZE;
        writeln!(
            f,
            "  {:>4}  {:<20} {:>15} {:>8} {:>15} {:>6} {:<6}",
            "Rank", "Player", "Value", "Daily", "Total gain", "Trades", "Risk"
        )?;
        for (i, p) in page(&self.ranked, self.query.page, LEADERBOARD_PAGE_SIZE)
            .iter()
            .enumerate()
        {
            let marker = if p.id == USER_ID { "*" } else { " " };
            writeln!(
                f,
                "{marker} {:>4}  {:<20} {:>15} {:>+7.2}% {:>15} {:>6} {:<6}",
                start + i + 1,
                p.name,
                Price(p.portfolio_value).to_string(),
                p.daily_change,
                Price(p.total_gain).to_string(),
                p.trades,
                p.risk_level.to_string(),
            )?;
        }

        let s = stats(&self.ranked);
        writeln!(
            f,
            "\nPage {} of {}",
            self.query.page,
            page_count(self.ranked.len(), LEADERBOARD_PAGE_SIZE)
        )?;
        writeln!(f, "Players:          {:>15}", s.players)?;
        writeln!(f, "Average value:    {:>15}", money(s.average_value))?;
        writeln!(f, "Top 10% average:  {:>15}", money(s.top_decile_average))?;
        if let Some(pos) = position_of(&self.ranked, USER_ID) {
            writeln!(f, "Your rank:        {:>15}", format!("#{pos}"))?;
        }
        if let Some(pct) = s.user_percentile {
            writeln!(f, "Your percentile:  {:>14.1}%", pct)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocksim::{DeskConfig, Leaderboard, RankMetric, RiskLevel, Side, Symbol};

    fn desk() -> TradingDesk {
        let mut feed = PriceFeed::default_universe();
        feed.set_price(&Symbol::new("AAPL"), Price(180_00)).unwrap();
        TradingDesk::new(DeskConfig::default(), feed)
    }

    fn player(id: &str, name: &str, value: i64) -> Player {
        Player {
            id: id.into(),
            name: name.into(),
            portfolio_value: value,
            daily_change: 0.0,
            total_gain: 0,
            trades: 0,
            risk_level: RiskLevel::Medium,
            strategy: Some("Value Investing".into()),
        }
    }

    #[test]
    fn describe_quote() {
        let d = desk();
        let req = d.quote(Side::Buy, Symbol::new("AAPL"), 10).unwrap();
        assert_eq!(describe_request(&req), "BUY 10 AAPL @ $180.00 = $1800.00");
    }

    #[test]
    fn portfolio_view_lists_holdings_and_recent() {
        let mut d = desk();
        d.confirm(Side::Buy, Symbol::new("AAPL"), 10).unwrap();
        d.execute_all().unwrap();
        let text = PortfolioView(&d).to_string();
        assert!(text.contains("$8200.00"));
        assert!(text.contains("HOLDINGS"));
        assert!(text.contains("AAPL"));
        assert!(text.contains("BUY 10 AAPL @ $180.00 = $1800.00"));
    }

    #[test]
    fn portfolio_view_shows_reserved_cash() {
        let mut d = desk();
        d.confirm(Side::Buy, Symbol::new("AAPL"), 10).unwrap();
        let text = PortfolioView(&d).to_string();
        assert!(text.contains("Available"));
        assert!(text.contains("No holdings."));
        assert!(OrdersView(&d).to_string().contains("O1"));
    }

    #[test]
    fn empty_views() {
        let d = desk();
        assert_eq!(OrdersView(&d).to_string(), "No pending orders.\n");
        let q = HistoryQuery::default();
        assert_eq!(
            HistoryView { desk: &d, query: &q }.to_string(),
            "No transactions found.\n"
        );
    }

    #[test]
    fn history_view_pages() {
        let mut d = desk();
        for _ in 0..12 {
            d.confirm(Side::Buy, Symbol::new("AAPL"), 1).unwrap();
        }
        d.execute_all().unwrap();

        let q = HistoryQuery {
            page: 2,
            ..Default::default()
        };
        let text = HistoryView { desk: &d, query: &q }.to_string();
        assert!(text.contains("Page 2 of 2"));
        assert!(text.contains("12 transactions: 12 buys"));
        assert_eq!(text.lines().filter(|l| l.contains(" BUY ")).count(), 2);
    }

    #[test]
    fn prices_view_lists_universe() {
        let d = desk();
        let text = PricesView(d.feed()).to_string();
        assert_eq!(text.lines().count(), 8);
        assert!(text.contains("Apple Inc."));
    }

    #[test]
    fn leaderboard_view_marks_user() {
        let mut board = Leaderboard::new(player(USER_ID, "You", 10_000_00));
        board.add_player(player("ai_0", "Warren Buffett", 50_000_00));
        let q = LeaderboardQuery {
            metric: RankMetric::TotalValue,
            page: 1,
            ..Default::default()
        };
        let view = LeaderboardView::new(&board, &q);
        assert_eq!(view.ranked[0].id, "ai_0");
        let text = view.to_string();
        assert!(text.contains("*    2  You"));
        assert!(text.contains("Your rank:"));
    }

    #[test]
    fn leaderboard_search_narrows_ranking() {
        let mut board = Leaderboard::new(player(USER_ID, "You", 10_000_00));
        board.add_player(player("ai_0", "Warren Buffett", 50_000_00));
        let q = LeaderboardQuery {
            search: Some("buffett".into()),
            page: 1,
            ..Default::default()
        };
        let view = LeaderboardView::new(&board, &q);
        assert_eq!(view.ranked.len(), 1);
        assert!(!view.to_string().contains("Your rank"));
    }
}
