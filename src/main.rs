use chatledger::args::Args;
use chatledger::dispatch::Dispatcher;
use chatledger::http;
use chatledger::ledger::Ledger;
use chatledger::pairing::PairingSlot;
use chatledger::store::{GoogleStore, MemoryStore, Store};
use chatledger::transport::bridge::{Bridge, Event};
use chatledger::{Config, Credentials, Mode, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    let config = Config::from_args(&args);

    // This allows for testing the program without hitting the Google APIs.
    // When CHATLEDGER_IN_TEST_MODE is set and non-zero in length the mode
    // will be Mode::Memory, otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let pairing = PairingSlot::default();
    tokio::spawn({
        let pairing = pairing.clone();
        let port = config.port();
        async move {
            if let Err(e) = http::serve(port, pairing).await {
                error!("Liveness server failed: {e:#}");
            }
        }
    });

    let store: Box<dyn Store> = match mode {
        Mode::Google => {
            let credentials = Credentials::load(config.credentials_path()).await?;
            Box::new(GoogleStore::new(config.sheet_id(), credentials))
        }
        Mode::Memory => {
            warn!("Running against the in-memory store, nothing will be persisted");
            Box::new(MemoryStore::default())
        }
    };

    let mut bridge = Bridge::spawn(config.bridge_path())?;
    let mut dispatcher = Dispatcher::new(config.group_name(), Ledger::new(store), bridge.handle());

    info!("Waiting for chat events");
    while let Some(event) = bridge.next_event().await {
        match event {
            Event::PairingCode(code) => {
                info!("New pairing code issued, scan it at /qr");
                pairing.set(code).await;
            }
            Event::Ready => info!("Chat session is ready"),
            Event::Message(message) => {
                // No per-message failure is fatal; log it and keep listening.
                if let Err(e) = dispatcher.handle(&message).await {
                    error!("Error processing message: {e:#}");
                }
            }
        }
    }
    warn!("The bridge closed its event stream, shutting down");
    Ok(())
}

/// Initializes the tracing subscriber.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
