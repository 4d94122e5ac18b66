//! enrollq - Check admission and waitlist positions on the enrollment board
//!
//! Looks up exam numbers given on the command line, or prompts for them until
//! `exit`, answering from a snapshot that is refreshed when it gets old.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enrollq::cache::SnapshotStore;
use enrollq::cli::{Cli, EngineConfig, InputCommand};
use enrollq::engine::{Clock, QueryEngine, SystemClock};
use enrollq::fetch::PortalFetcher;
use enrollq::report::{render_results, render_snapshot_age};

const PROMPT: &str = "Enter an exam number to query (or 'exit' to quit): ";

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`)
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

type Engine = QueryEngine<PortalFetcher, SystemClock>;

async fn query_and_print(engine: &mut Engine, exam_number: &str) {
    let results = engine.query_status(exam_number).await;
    print!("{}", render_results(exam_number, &results));
}

/// Prompts for exam numbers until `exit`, EOF or Ctrl-C
async fn interactive(engine: &mut Engine) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting the program.");
                break;
            }
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match InputCommand::parse(&line) {
            Ok(InputCommand::Exit) => break,
            Ok(InputCommand::Empty) => continue,
            Ok(InputCommand::Query(exam_number)) => {
                tokio::select! {
                    _ = query_and_print(engine, &exam_number) => {}
                    _ = tokio::signal::ctrl_c() => {
                        println!("\nExiting the program.");
                        break;
                    }
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    println!("Thank you for using enrollq.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    let config = match EngineConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let store = config
        .cache_dir
        .clone()
        .map(SnapshotStore::with_dir)
        .or_else(SnapshotStore::new);
    if store.is_none() {
        warn!("no cache directory available, snapshot will not be saved");
    }

    let fetcher = PortalFetcher::new(config.portal)?;
    let clock = SystemClock;
    let mut engine = QueryEngine::open(store, fetcher, clock, config.policy);
    println!("Snapshot: {}", render_snapshot_age(engine.snapshot(), clock.now()));

    if config.force_refresh {
        match engine.refresh().await {
            Ok(summary) => println!(
                "Refreshed {} departments ({} failed)",
                summary.refreshed,
                summary.failed.len()
            ),
            Err(e) => eprintln!("Refresh failed: {}", e),
        }
    }

    if config.exam_numbers.is_empty() {
        interactive(&mut engine).await?;
    } else {
        for exam_number in &config.exam_numbers {
            query_and_print(&mut engine, exam_number).await;
        }
    }

    Ok(())
}
