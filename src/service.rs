//! Deferred, serialized order execution on tokio.
//!
//! [`DeskService::spawn`] moves a [`TradingDesk`] into an owner task that is
//! the only code touching it. Callers talk to the owner through a cloneable
//! handle; every call is a command on an `mpsc` channel answered over a
//! `oneshot`.
//!
//! A second task, the executor, models processing latency. Each confirmed
//! order is handed to it in confirmation order; it sleeps for the configured
//! `execution_latency`, then asks the owner to execute that order and waits
//! for the result before taking the next one. Two orders therefore never
//! interleave, and undo or balance commands arriving meanwhile are applied
//! between executions, never inside one.

use std::time::Duration;

use log::{debug, error};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::desk::{OrderRequest, TradingDesk};
use crate::error::{DeskError, Result};
use crate::history::BalanceSample;
use crate::ledger::Transaction;
use crate::side::Side;
use crate::types::{OrderId, Quantity, Symbol};

type Reply<T> = oneshot::Sender<Result<T>>;
type ReadFn = Box<dyn FnOnce(&TradingDesk) + Send>;

enum Command {
    Quote {
        side: Side,
        symbol: Symbol,
        quantity: Quantity,
        reply: Reply<OrderRequest>,
    },
    Submit {
        request: OrderRequest,
        reply: Reply<OrderId>,
    },
    Undo {
        reply: Reply<Transaction>,
    },
    RecordBalance {
        reply: Reply<BalanceSample>,
    },
    TickPrices {
        reply: Reply<()>,
    },
    Read(ReadFn),
}

enum Job {
    Execute(OrderId),
    Flush(oneshot::Sender<()>),
}

type Execution = (OrderId, Reply<Transaction>);

/// Handle to a running desk. Cheap to clone.
#[derive(Clone, Debug)]
pub struct DeskService {
    commands: mpsc::Sender<Command>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl DeskService {
    /// Start the owner and executor tasks. Prices tick from an entropy-seeded RNG.
    pub fn spawn(desk: TradingDesk) -> (Self, JoinHandle<()>) {
        Self::spawn_with_rng(desk, StdRng::from_entropy())
    }

    /// Start the service with a caller-supplied RNG for price ticks.
    ///
    /// The returned handle completes once every `DeskService` clone has been
    /// dropped. Orders still waiting for the executor at that point are not
    /// executed; call [`flush`](Self::flush) first.
    pub fn spawn_with_rng(desk: TradingDesk, rng: StdRng) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel::<Command>(256);
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel::<Job>();
        let (exec_tx, exec_rx) = mpsc::channel::<Execution>(1);
        let latency = desk.config().execution_latency;

        tokio::spawn(run_executor(jobs_rx, exec_tx, latency));
        let owner = tokio::spawn(run_owner(desk, rng, commands_rx, exec_rx, jobs_tx.clone()));

        (
            Self {
                commands: commands_tx,
                jobs: jobs_tx,
            },
            owner,
        )
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| DeskError::ServiceClosed)?;
        rx.await.map_err(|_| DeskError::ServiceClosed)?
    }

    /// Validate a trade intent and price it. See [`TradingDesk::quote`].
    pub async fn quote(&self, side: Side, symbol: Symbol, quantity: Quantity) -> Result<OrderRequest> {
        self.request(|reply| Command::Quote {
            side,
            symbol,
            quantity,
            reply,
        })
        .await
    }

    /// Confirm a quoted request. Returns once the order is `Pending`;
    /// execution follows after the configured latency.
    pub async fn submit(&self, request: OrderRequest) -> Result<OrderId> {
        self.request(|reply| Command::Submit { request, reply }).await
    }

    /// Quote and submit in one call.
    pub async fn confirm(&self, side: Side, symbol: Symbol, quantity: Quantity) -> Result<OrderId> {
        let request = self.quote(side, symbol, quantity).await?;
        self.submit(request).await
    }

    /// Reverse the most recent executed trade.
    pub async fn undo(&self) -> Result<Transaction> {
        self.request(|reply| Command::Undo { reply }).await
    }

    pub async fn record_balance(&self) -> Result<BalanceSample> {
        self.request(|reply| Command::RecordBalance { reply }).await
    }

    /// Advance the price feed one step.
    pub async fn tick_prices(&self) -> Result<()> {
        self.request(|reply| Command::TickPrices { reply }).await
    }

    /// Run `f` against the desk and return its result.
    ///
    /// The closure runs on the owner task between commands, so it sees a
    /// consistent state.
    pub async fn read<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&TradingDesk) -> R + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let read: ReadFn = Box::new(move |desk| {
            let _ = reply.send(f(desk));
        });
        self.commands
            .send(Command::Read(read))
            .await
            .map_err(|_| DeskError::ServiceClosed)?;
        rx.await.map_err(|_| DeskError::ServiceClosed)
    }

    /// Wait until every order confirmed before this call has executed.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(Job::Flush(tx))
            .map_err(|_| DeskError::ServiceClosed)?;
        rx.await.map_err(|_| DeskError::ServiceClosed)
    }
}

async fn run_owner(
    mut desk: TradingDesk,
    mut rng: StdRng,
    mut commands: mpsc::Receiver<Command>,
    mut executions: mpsc::Receiver<Execution>,
    jobs: mpsc::UnboundedSender<Job>,
) {
    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { break };
                handle_command(&mut desk, &mut rng, &jobs, cmd);
            }
            Some((id, reply)) = executions.recv() => {
                let _ = reply.send(desk.execute(id));
            }
        }
    }
    debug!("desk service stopped");
}

fn handle_command(
    desk: &mut TradingDesk,
    rng: &mut StdRng,
    jobs: &mpsc::UnboundedSender<Job>,
    cmd: Command,
) {
    match cmd {
        Command::Quote {
            side,
            symbol,
            quantity,
            reply,
        } => {
            let _ = reply.send(desk.quote(side, symbol, quantity));
        }
        Command::Submit { request, reply } => {
            let result = desk.submit(request).and_then(|id| {
                jobs.send(Job::Execute(id))
                    .map_err(|_| DeskError::ServiceClosed)?;
                Ok(id)
            });
            let _ = reply.send(result);
        }
        Command::Undo { reply } => {
            let _ = reply.send(desk.undo());
        }
        Command::RecordBalance { reply } => {
            let _ = reply.send(Ok(desk.record_balance()));
        }
        Command::TickPrices { reply } => {
            desk.tick_prices(rng);
            let _ = reply.send(Ok(()));
        }
        Command::Read(read) => read(desk),
    }
}

async fn run_executor(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    executions: mpsc::Sender<Execution>,
    latency: Duration,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Execute(id) => {
                tokio::time::sleep(latency).await;
                let (reply, rx) = oneshot::channel();
                if executions.send((id, reply)).await.is_err() {
                    break;
                }
                match rx.await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!("order {id} failed to execute: {e}"),
                    Err(_) => break,
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::DeskConfig;
    use crate::price_feed::PriceFeed;
    use crate::types::Price;

    fn service() -> (DeskService, JoinHandle<()>) {
        let desk = TradingDesk::new(DeskConfig::default(), PriceFeed::default_universe());
        DeskService::spawn_with_rng(desk, StdRng::seed_from_u64(1))
    }

    #[tokio::test(start_paused = true)]
    async fn orders_execute_after_flush() {
        let (svc, _task) = service();
        let aapl = Symbol::new("AAPL");
        let id = svc.confirm(Side::Buy, aapl, 10).await.unwrap();
        assert_eq!(id, OrderId(1));

        let pending = svc.read(|d| d.queue().pending().count()).await.unwrap();
        assert_eq!(pending, 1);

        svc.flush().await.unwrap();
        let (qty, cash) = svc
            .read(move |d| (d.portfolio().quantity(&aapl), d.portfolio().cash()))
            .await
            .unwrap();
        assert_eq!(qty, 10);
        assert_eq!(cash, 10_000_00 - 10 * 182_63);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_surfaces_to_caller() {
        let (svc, _task) = service();
        let err = svc
            .confirm(Side::Buy, Symbol::new("NFLX"), 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::InsufficientFunds { .. }));
        assert_eq!(svc.undo().await, Err(DeskError::NothingToUndo));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_and_record_balance() {
        let (svc, _task) = service();
        svc.tick_prices().await.unwrap();
        let sample = svc.record_balance().await.unwrap();
        assert_eq!(sample.value, 10_000_00);
        let price = svc
            .read(|d| d.feed().price(&Symbol::new("AAPL")))
            .await
            .unwrap();
        assert_ne!(price, Some(Price(182_63)));
    }

    #[tokio::test]
    async fn dropped_handle_stops_owner() {
        let (svc, task) = service();
        drop(svc);
        task.await.unwrap();
    }
}
