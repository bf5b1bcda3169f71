//! One interactive session: dispatches parsed commands to a running
//! [`DeskService`] and renders the result.

use std::fs::File;
use std::path::Path;

use rand::rngs::StdRng;
use stocksim::ledger::{sort_transactions, write_csv};
use stocksim::{DeskService, Insights, Leaderboard, Player, Transaction};

use crate::commands::{Command, HELP, HistoryQuery};
use crate::error::Result;
use crate::render::{
    HistoryView, LeaderboardView, OrdersView, PortfolioView, PricesView, describe_request,
    describe_transaction,
};

/// What the loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Print the text and read the next command.
    Continue(String),
    Quit,
}

pub struct Session {
    service: DeskService,
    leaderboard: Leaderboard,
    rng: StdRng,
}

impl Session {
    /// Build the leaderboard around the current desk state.
    pub async fn start(service: DeskService, simulated_rivals: bool, mut rng: StdRng) -> Result<Self> {
        let user = service.read(Player::from_desk).await?;
        let leaderboard = if simulated_rivals {
            Leaderboard::with_simulated_rivals(user, &mut rng)
        } else {
            Leaderboard::new(user)
        };
        Ok(Self {
            service,
            leaderboard,
            rng,
        })
    }

    pub fn service(&self) -> &DeskService {
        &self.service
    }

    /// Run one command. Trades are submitted only if `confirm` approves the
    /// quoted order.
    pub async fn handle(
        &mut self,
        cmd: Command,
        mut confirm: impl FnMut(&str) -> Result<bool>,
    ) -> Result<Outcome> {
        let text = match cmd {
            Command::Trade {
                side,
                symbol,
                quantity,
            } => {
                let request = self.service.quote(side, symbol, quantity).await?;
                let summary = describe_request(&request);
                if !confirm(&summary)? {
                    return Ok(Outcome::Continue("Cancelled.".into()));
                }
                let id = self.service.submit(request).await?;
                format!("Order {id} confirmed: {summary}")
            }
            Command::Undo => {
                let tx = self.service.undo().await?;
                format!("Reversed: {}", describe_transaction(&tx))
            }
            Command::Portfolio => {
                self.service
                    .read(|d| PortfolioView(d).to_string())
                    .await?
            }
            Command::Orders => self.service.read(|d| OrdersView(d).to_string()).await?,
            Command::History(query) => {
                self.service
                    .read(move |d| HistoryView { desk: d, query: &query }.to_string())
                    .await?
            }
            Command::Export { path, query } => {
                let rows = self.matching(query).await?;
                export(&path, &rows)?;
                format!("Exported {} transactions to {}", rows.len(), path.display())
            }
            Command::Insights => {
                self.service
                    .read(|d| Insights::compute(d).to_string())
                    .await?
            }
            Command::Leaderboard(query) => {
                let user = self.service.read(Player::from_desk).await?;
                self.leaderboard.update_user(user);
                self.leaderboard.simulate_market_movements(&mut self.rng);
                LeaderboardView::new(&self.leaderboard, &query).to_string()
            }
            Command::Prices => self.service.read(|d| PricesView(d.feed()).to_string()).await?,
            Command::Tick => {
                self.service.tick_prices().await?;
                self.service.read(|d| PricesView(d.feed()).to_string()).await?
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Continue(text))
    }

    /// Wait for confirmed orders to execute.
    pub async fn shutdown(self) -> Result<()> {
        self.service.flush().await?;
        Ok(())
    }

    async fn matching(&self, query: HistoryQuery) -> Result<Vec<Transaction>> {
        let rows = self
            .service
            .read(move |d| {
                let matched = d.ledger().query(&query.filter, d.now());
                sort_transactions(&matched, query.sort)
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await?;
        Ok(rows)
    }
}

fn export(path: &Path, rows: &[Transaction]) -> Result<()> {
    let refs: Vec<&Transaction> = rows.iter().collect();
    write_csv(File::create(path)?, &refs)?;
    Ok(())
}
