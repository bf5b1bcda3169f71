//! CLI entry point for the stocksim trading terminal.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stocksim::{DeskService, JsonFileStore, PriceFeed, TradingDesk};

use stocksim_terminal::commands;
use stocksim_terminal::config::Config;
use stocksim_terminal::error::Error;
use stocksim_terminal::session::{Outcome, Session};

#[derive(Parser)]
#[command(name = "stocksim")]
#[command(about = "Simulated stock-trading terminal")]
#[command(version)]
struct Cli {
    /// Path to stocksim.toml (defaults apply if it does not exist)
    #[arg(long, default_value = "stocksim.toml")]
    config: PathBuf,

    /// Account snapshot file; overrides [storage] snapshot_path
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Skip trade confirmation prompts
    #[arg(long)]
    yes: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.filter.as_str()),
    )
    .format_timestamp_secs()
    .init();

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let _guard = runtime.enter();

    let snapshot_path = cli
        .snapshot
        .unwrap_or_else(|| config.storage.snapshot_path.clone());
    let desk = TradingDesk::open(
        config.desk_config(),
        PriceFeed::default_universe(),
        Box::new(JsonFileStore::new(&snapshot_path)),
    )
    .with_context(|| format!("failed to open account at {}", snapshot_path.display()))?;
    info!("account loaded from {}", snapshot_path.display());

    let mut rng = match config.feed.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (service, owner) = DeskService::spawn_with_rng(desk, StdRng::seed_from_u64(rng.r#gen()));

    let ticker = config.tick_interval().map(|every| {
        let service = service.clone();
        runtime.spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                if service.tick_prices().await.is_err() {
                    break;
                }
            }
        })
    });

    let mut session = runtime.block_on(Session::start(
        service,
        config.leaderboard.simulated_rivals,
        rng,
    ))?;

    println!(
        "stocksim {}: type 'help' for commands",
        env!("CARGO_PKG_VERSION")
    );
    repl(&runtime, &mut session, cli.yes)?;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    runtime
        .block_on(session.shutdown())
        .context("failed to finish pending orders")?;
    runtime.block_on(owner).context("desk service panicked")?;
    debug!("shutdown complete");
    Ok(())
}

fn repl(runtime: &tokio::runtime::Runtime, session: &mut Session, assume_yes: bool) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }

        let cmd = match commands::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match runtime.block_on(session.handle(cmd, |prompt| confirm(prompt, assume_yes))) {
            Ok(Outcome::Continue(text)) => println!("{}", text.trim_end()),
            Ok(Outcome::Quit) => return Ok(()),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool, Error> {
    if assume_yes {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(format!("{prompt}. Execute?"))
        .default(false)
        .interact()
        .map_err(|e| Error::Command(format!("confirmation prompt failed: {e}")))
}
