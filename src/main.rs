use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use invoice_recon::application::engine::ReconciliationEngine;
use invoice_recon::application::side_effects::SideEffects;
use invoice_recon::config::EngineConfig;
use invoice_recon::domain::ports::LedgerStoreBox;
use invoice_recon::infrastructure::gateway::SimulatedGateway;
use invoice_recon::infrastructure::in_memory::InMemoryLedger;
#[cfg(feature = "storage-rocksdb")]
use invoice_recon::infrastructure::rocksdb::RocksDbLedger;
use invoice_recon::interfaces::csv::invoice_writer::InvoiceWriter;
use invoice_recon::interfaces::csv::payment_reader::PaymentReader;
use invoice_recon::interfaces::seed::LedgerSeed;
use invoice_recon::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "RECON_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// JSON file of customers and invoices loaded before the command runs
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Probability that the simulated gateway approves a charge
    #[arg(
        long,
        env = "RECON_APPROVAL_RATE",
        default_value_t = SimulatedGateway::DEFAULT_APPROVAL_RATE,
        global = true
    )]
    approval_rate: f64,

    /// Gateway call timeout in milliseconds
    #[arg(long, env = "RECON_GATEWAY_TIMEOUT_MS", default_value_t = 30_000, global = true)]
    gateway_timeout_ms: u64,

    /// How long a payment waits for notification, analytics and dunning
    #[arg(
        long,
        env = "RECON_SIDE_EFFECT_TIMEOUT_MS",
        default_value_t = 5_000,
        global = true
    )]
    side_effect_timeout_ms: u64,

    /// Prefix of generated receipt numbers
    #[arg(
        long,
        env = "RECON_RECEIPT_PREFIX",
        default_value = EngineConfig::DEFAULT_RECEIPT_PREFIX,
        global = true
    )]
    receipt_prefix: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a CSV batch of payments (invoice, amount, method)
    Process { payments: PathBuf },
    /// List a customer's invoices that still have a balance
    Outstanding {
        #[arg(long)]
        customer: Uuid,
    },
    /// Summarize a customer's payment behaviour as JSON
    Trends {
        #[arg(long)]
        customer: Uuid,
    },
    /// Print the receipt of a completed payment as JSON
    Receipt {
        #[arg(long)]
        payment: Uuid,
    },
    /// Mark unpaid invoices due before the given date as overdue
    MarkOverdue {
        #[arg(long)]
        as_of: NaiveDate,
    },
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDbLedger::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryLedger::new()))
        }
        None => Ok(Box::new(InMemoryLedger::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing("warn");
    let cli = Cli::parse();

    let gateway = SimulatedGateway::new(cli.approval_rate).into_diagnostic()?;
    let ledger = open_ledger(cli.db_path)?;
    if let Some(path) = cli.ledger {
        let seed = LedgerSeed::from_reader(File::open(path).into_diagnostic()?).into_diagnostic()?;
        let inserted = seed.apply(ledger.as_ref(), Utc::now()).await.into_diagnostic()?;
        tracing::info!(inserted, "ledger seeded");
    }

    let config = EngineConfig::default()
        .with_gateway_timeout(Duration::from_millis(cli.gateway_timeout_ms))
        .with_side_effect_timeout(Duration::from_millis(cli.side_effect_timeout_ms))
        .with_receipt_prefix(cli.receipt_prefix);
    let engine = ReconciliationEngine::new(ledger, Box::new(gateway), SideEffects::default())
        .with_config(config);

    let stdout = io::stdout();
    match cli.command {
        Command::Process { payments } => {
            let file = File::open(payments).into_diagnostic()?;
            let mut touched: Vec<Uuid> = Vec::new();
            for request in PaymentReader::new(file).requests() {
                let request = match request {
                    Ok(request) => request,
                    Err(e) => {
                        eprintln!("Error reading payment: {}", e);
                        continue;
                    }
                };
                let invoice_id = request.invoice_id;
                match engine.process_payment(request).await {
                    Ok(result) => {
                        eprintln!(
                            "payment {} on invoice {}: {}",
                            result.reference, invoice_id, result.message
                        );
                        if !touched.contains(&invoice_id) {
                            touched.push(invoice_id);
                        }
                    }
                    Err(e) => eprintln!("Error processing payment: {}", e),
                }
            }

            let mut balances = Vec::with_capacity(touched.len());
            for invoice_id in touched {
                balances.push(engine.get_invoice_balance(invoice_id).await.into_diagnostic()?);
            }
            InvoiceWriter::new(stdout.lock())
                .write_balances(&balances)
                .into_diagnostic()?;
        }
        Command::Outstanding { customer } => {
            let invoices = engine
                .get_outstanding_invoices(customer)
                .await
                .into_diagnostic()?;
            InvoiceWriter::new(stdout.lock())
                .write_invoices(&invoices)
                .into_diagnostic()?;
        }
        Command::Trends { customer } => {
            let trends = engine
                .analyze_payment_patterns(customer)
                .await
                .into_diagnostic()?;
            serde_json::to_writer_pretty(stdout.lock(), &trends).into_diagnostic()?;
            println!();
        }
        Command::Receipt { payment } => {
            let receipt = engine.generate_receipt(payment).await.into_diagnostic()?;
            serde_json::to_writer_pretty(stdout.lock(), &receipt).into_diagnostic()?;
            println!();
        }
        Command::MarkOverdue { as_of } => {
            let invoices = engine.mark_overdue_invoices(as_of).await.into_diagnostic()?;
            InvoiceWriter::new(stdout.lock())
                .write_invoices(&invoices)
                .into_diagnostic()?;
        }
    }

    Ok(())
}
