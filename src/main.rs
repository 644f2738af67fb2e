use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use razorpay_checkout::application::reconciler::OrderReconciler;
use razorpay_checkout::config::{self, CONFIG_PATH_ENABLED, EnvConfig, GatewaySettings};
use razorpay_checkout::domain::ports::{OrderStoreBox, SessionStore, SessionStoreFactory};
use razorpay_checkout::infrastructure::http::HttpGateway;
use razorpay_checkout::infrastructure::in_memory::{InMemoryOrderStore, InMemorySessions};
use razorpay_checkout::interfaces::csv::order_reader::OrderReader;
use razorpay_checkout::interfaces::csv::payload_writer::PayloadWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input orders CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Base URL of the gateway's REST API
    #[arg(long, default_value = config::BASE_URL)]
    base_url: String,
}

fn in_memory_stores() -> (OrderStoreBox, SessionStoreFactory) {
    (
        Box::new(InMemoryOrderStore::new()) as OrderStoreBox,
        InMemorySessions::new().factory(),
    )
}

#[cfg(feature = "storage-rocksdb")]
fn stores(db_path: Option<PathBuf>) -> Result<(OrderStoreBox, SessionStoreFactory)> {
    use razorpay_checkout::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(db_path) => {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            let sessions = store.session_factory();
            Ok((Box::new(store) as OrderStoreBox, sessions))
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn stores(db_path: Option<PathBuf>) -> Result<(OrderStoreBox, SessionStoreFactory)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let env = EnvConfig;
    if !config::is_enabled(&env) {
        return Err(miette!(
            "Razorpay payments are disabled ({} is not set)",
            CONFIG_PATH_ENABLED
        ));
    }
    let settings = GatewaySettings::load(&env)
        .into_diagnostic()?
        .with_base_url(cli.base_url);

    let gateway = HttpGateway::new(&settings).into_diagnostic()?;
    let (order_store, sessions) = stores(cli.db_path)?;
    let reconciler =
        OrderReconciler::new(Box::new(gateway), order_store).with_currency(settings.currency);

    // Each order is its own checkout session
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OrderReader::new(file);
    let mut payloads = Vec::new();
    for order_result in reader.orders() {
        match order_result {
            Ok(mut order) => {
                let session = sessions(&order.real_order_id);
                let seen = session.errors().await.into_diagnostic()?.len();
                match reconciler.ensure_remote_order(session.as_ref(), &mut order).await {
                    Ok(payload) => payloads.push(payload),
                    Err(e) => {
                        let messages = session.errors().await.into_diagnostic()?;
                        if messages.len() <= seen {
                            eprintln!("Error processing order {}: {}", order.real_order_id, e);
                        }
                        for message in messages.iter().skip(seen) {
                            eprintln!(
                                "Error processing order {}: {}",
                                order.real_order_id, message
                            );
                        }
                    }
                }
            }
            Err(e) => {
                eprintln!("Error reading order: {}", e);
            }
        }
    }

    let stdout = io::stdout();
    let mut writer = PayloadWriter::new(stdout.lock());
    writer.write_payloads(payloads).into_diagnostic()?;

    Ok(())
}
