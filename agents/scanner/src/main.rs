//! TICKET SCANNER
//!
//! Door agent for event staff
//! - Scan ticket QR payloads (one per line on stdin)
//! - Verify and claim single tickets
//! - Inspect a ticket's ledger state

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ticket_scanner::config::ScannerConfig;
use ticket_scanner::event::display_event_date;
use ticket_scanner::ledger::{fetch_ticket_details, JsonRpcLedger, Ledger};
use ticket_scanner::metadata::EventRef;
use ticket_scanner::notify::{ChannelNotifier, Notifier};
use ticket_scanner::window::{Clock, SystemClock, WindowCheck};
use ticket_scanner::{ScanSession, SecretKey, TicketVerifier};

// ============== CLI ==============

#[derive(Parser)]
#[command(name = "ticket-scanner")]
#[command(about = "Ticket Scanner - verify and claim event tickets at the door")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Network to use instead of the configured one (testnet, mainnet)
    #[arg(long)]
    network: Option<String>,

    /// RPC node URL override
    #[arg(long)]
    node_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan ticket codes from stdin, one decoded QR payload per line
    Scan {
        /// Event being scanned, as `<publisher>:<eventId>`
        #[arg(short, long)]
        event: String,
    },
    /// Verify a single ticket secret and wait for its claim
    Verify {
        secret: String,
        #[arg(short, long)]
        event: String,
    },
    /// Show a ticket's ledger state
    Ticket { secret: String },
    /// Show RPC node status
    Status,
    /// Initialize config
    Init,
}

// ============== MAIN ==============

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ScannerConfig::load(&cli.config)?;
    if let Some(network) = &cli.network {
        config = config.with_network(network);
    }
    if let Some(node_url) = &cli.node_url {
        config.node_url = node_url.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Scan { event } => scan(&config, &event).await?,
        Commands::Verify { secret, event } => verify(&config, &secret, &event).await?,
        Commands::Ticket { secret } => show_ticket(&config, &secret).await?,
        Commands::Status => show_status(&config).await?,
        Commands::Init => config.write(&cli.config)?,
    }

    Ok(())
}

// ============== COMMANDS ==============

async fn scan(config: &ScannerConfig, event: &str) -> anyhow::Result<()> {
    let event = EventRef::parse(event);
    let ledger = Arc::new(config.ledger());

    if let Some(publisher) = event.publisher() {
        show_event_banner(&ledger, publisher, &event.event_id).await;
    }

    let (notifier, mut toasts) = ChannelNotifier::new();
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);
    let printer = tokio::spawn(async move {
        while let Some(toast) = toasts.recv().await {
            println!("{toast}");
        }
    });

    let verifier = TicketVerifier::new(Arc::clone(&ledger), config.key_store(), config.claim_target())
        .with_notifier(Arc::clone(&notifier));
    let mut session = ScanSession::connect(verifier, event, Arc::clone(&notifier), config.debounce())
        .await
        .context("cannot start scanning session")?;

    info!("Ready. Scan tickets (one code per line, Ctrl-D to finish)");
    let summary = session
        .run(tokio::io::BufReader::new(tokio::io::stdin()))
        .await;

    drop(session);
    drop(notifier);
    printer.await?;

    println!(
        "\nAdmitted: {}  Rejected: {}  Debounced: {}",
        summary.admitted, summary.rejected, summary.debounced
    );
    Ok(())
}

async fn show_event_banner(ledger: &JsonRpcLedger, publisher: &str, event_id: &str) {
    let funder = match ledger.funder_information(publisher).await {
        Ok(Some(funder)) => funder,
        Ok(None) => {
            warn!("Publisher {} has no events", publisher);
            return;
        }
        Err(e) => {
            warn!("Failed to load event {}: {}", event_id, e);
            return;
        }
    };

    match funder.find_event(event_id) {
        Ok(Some(event)) => {
            let offset = *Local::now().fixed_offset().offset();
            println!("=== {} ===", event.name);
            println!("{}", display_event_date(&event.date, offset));
            if !event.location.is_empty() {
                println!("{}", event.location);
            }
        }
        Ok(None) => warn!("Event {} not found for {}", event_id, publisher),
        Err(e) => warn!("Malformed event metadata for {}: {}", publisher, e),
    }
}

async fn verify(config: &ScannerConfig, secret: &str, event: &str) -> anyhow::Result<()> {
    let event = EventRef::parse(event);
    let ledger = Arc::new(config.ledger());
    ledger.status().await.context("ledger is unavailable")?;

    let verifier = TicketVerifier::new(ledger, config.key_store(), config.claim_target());
    let verification = verifier.verify(secret, &event.event_id).await;
    println!(
        "{} {}",
        if verification.is_verified() { "VERIFIED" } else { "REJECTED" },
        verification
    );

    verifier.wait_for_claims().await;
    Ok(())
}

async fn show_ticket(config: &ScannerConfig, secret: &str) -> anyhow::Result<()> {
    let secret = SecretKey::parse(secret)?;
    let ledger = config.ledger();
    let details = fetch_ticket_details(&ledger, &secret)
        .await
        .context("failed to load ticket information")?;

    let now = SystemClock.now();
    println!("=== TICKET ===");
    println!("Public key: {}", details.public_key);
    println!("Title: {}", details.title());
    println!("Drop: {}", details.drop.drop_id);
    println!("Event: {}", details.extra.event_id);
    println!("Uses remaining: {}", details.uses_remaining());
    println!("Already scanned: {}", details.key.has_been_used());
    if let Some(window) = &details.extra.pass_valid_through {
        println!("Pass valid: {}", window.describe(*now.offset()));
        println!("Admission now: {}", window.evaluate(now, WindowCheck::Admission));
        let over = !window.evaluate(now, WindowCheck::EventOver).is_open();
        println!("Event over: {}", over);
    }
    println!("On sale: {}", details.extra.is_purchasable(now));

    if let Some(funder) = ledger.funder_information(&details.drop.funder_id).await? {
        if let Some(event) = funder.find_event(&details.extra.event_id)? {
            println!("\n=== EVENT ===");
            println!("{} ({})", event.name, details.drop.funder_id);
            println!("{}", display_event_date(&event.date, *now.offset()));
        }
    }
    Ok(())
}

async fn show_status(config: &ScannerConfig) -> anyhow::Result<()> {
    let status = config.ledger().status().await?;
    println!("Network: {}", config.network_id);
    println!("Node: {}", config.node_url);
    println!("Chain: {}", status.chain_id);
    println!("Latest block: {}", status.latest_block_height);
    println!("Events contract: {}", config.events_contract_id);
    Ok(())
}
