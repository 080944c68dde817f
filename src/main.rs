//! Engine binary: loads the configuration, seeds the book, starts the
//! gateways, dispatcher and simulator, and shuts everything down on
//! Ctrl-C.

use clap::Parser;
use exchange_sim::server::{market_data, session};
use exchange_sim::{EngineConfig, SharedState, sim};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// A continuous double-auction matching engine with an attached market
/// simulator and public market-data feed.
#[derive(Debug, Parser)]
#[command(name = "exchange-sim", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "etc/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match EngineConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, path = %args.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };

    let simulate = config.book.simulate;
    let state = Arc::new(SharedState::new(config));

    if simulate {
        let mut engine = state.engine.lock().await;
        let instrument = state.config.book.instrument.clone();
        if let Some(book) = engine.book_mut(&instrument) {
            sim::seed_book(book, &state.config.book);
        }
    }

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(market_data::dispatch_market_data(Arc::clone(
        &state,
    ))));
    tasks.push(tokio::spawn(session::accept_order_entry_clients(
        Arc::clone(&state),
    )));
    tasks.push(tokio::spawn(market_data::accept_market_data_clients(
        Arc::clone(&state),
    )));
    if simulate {
        tasks.extend(sim::spawn_generators(&state));
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    state.stop();

    for task in tasks {
        let _ = task.await;
    }
    info!("system shutdown complete");
}
