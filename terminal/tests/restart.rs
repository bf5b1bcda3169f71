// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! A session's trades survive a restart through the snapshot file.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use stocksim::{DeskService, JsonFileStore, Price, PriceFeed, Symbol, TradingDesk};
use stocksim_terminal::commands::parse;
use stocksim_terminal::config::Config;
use stocksim_terminal::session::{Outcome, Session};

fn open(config: &Config, path: &Path) -> TradingDesk {
    let mut feed = PriceFeed::default_universe();
    feed.set_price(&Symbol::new("AAPL"), Price(180_00)).unwrap();
    TradingDesk::open(
        config.desk_config(),
        feed,
        Box::new(JsonFileStore::new(path)),
    )
    .unwrap()
}

async fn run(session: &mut Session, line: &str) -> Outcome {
    let cmd = parse(line).unwrap().unwrap();
    session.handle(cmd, |_| Ok(true)).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn trades_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("account.json");
    let config = Config::parse("[desk]\nexecution_latency_ms = 500\n").unwrap();

    let (service, owner) =
        DeskService::spawn_with_rng(open(&config, &path), StdRng::seed_from_u64(1));
    let mut session = Session::start(service, false, StdRng::seed_from_u64(1))
        .await
        .unwrap();
    run(&mut session, "buy AAPL 10").await;
    // shares are sellable only once the buy has executed
    session.service().flush().await.unwrap();
    run(&mut session, "sell AAPL 4").await;
    assert_eq!(run(&mut session, "quit").await, Outcome::Quit);
    session.shutdown().await.unwrap();
    owner.await.unwrap();

    let desk = open(&config, &path);
    let aapl = Symbol::new("AAPL");
    assert_eq!(desk.portfolio().quantity(&aapl), 6);
    assert_eq!(desk.portfolio().cash(), 10_000_00 - 10 * 180_00 + 4 * 180_00);
    assert_eq!(desk.ledger().len(), 2);
    // startup sample, two executions, startup sample on reopen
    assert_eq!(desk.history().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn history_view_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("account.json");
    let config = Config::default();

    let (service, owner) =
        DeskService::spawn_with_rng(open(&config, &path), StdRng::seed_from_u64(2));
    let mut session = Session::start(service, false, StdRng::seed_from_u64(2))
        .await
        .unwrap();
    run(&mut session, "buy AAPL 1").await;
    session.shutdown().await.unwrap();
    owner.await.unwrap();

    let (service, _owner) =
        DeskService::spawn_with_rng(open(&config, &path), StdRng::seed_from_u64(3));
    let mut session = Session::start(service, false, StdRng::seed_from_u64(3))
        .await
        .unwrap();
    let Outcome::Continue(text) = run(&mut session, "history type=buy").await else {
        panic!("expected output");
    };
    assert!(text.contains("1 transactions: 1 buys"));
}
