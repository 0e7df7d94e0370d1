use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use orderpay::application::scheduler::Scheduler;
use orderpay::application::{Adapters, Services};
use orderpay::config::AppConfig;
use orderpay::domain::catalog::Catalog;
use orderpay::domain::ports::{NotifierRef, PaymentGatewayRef, RecordStoreRef};
use orderpay::infrastructure::audit_log::FileAuditLog;
use orderpay::infrastructure::file_store::FileRecordStore;
use orderpay::infrastructure::mailgun::MailgunNotifier;
#[cfg(feature = "storage-rocksdb")]
use orderpay::infrastructure::rocksdb::RocksDBStore;
use orderpay::infrastructure::sandbox::{LogNotifier, SandboxGateway};
use orderpay::infrastructure::stripe::StripeGateway;
use orderpay::interfaces::csv::catalog_reader::CatalogReader;
use orderpay::interfaces::dispatch::{Dispatcher, Method, Request};
use orderpay::telemetry;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory for records and audit logs (overrides ORDERPAY_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Menu CSV with an `id,name,price` header (overrides ORDERPAY_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the settlement and log rotation loops until Ctrl-C
    Run,
    /// Run a single settlement cycle
    Settle,
    /// Archive and truncate every non-empty audit log
    RotateLogs,
    /// Dispatch one request and print the status and JSON body
    Call {
        method: String,
        path: String,
        #[arg(long)]
        token: Option<String>,
        /// Query parameter as `key=value`; may be repeated
        #[arg(long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::standard());
    };
    let file = File::open(path).into_diagnostic()?;
    let catalog = CatalogReader::new(file).into_catalog().into_diagnostic()?;
    tracing::info!(path = %path.display(), items = catalog.items().count(), "Catalog loaded");
    Ok(catalog)
}

async fn open_store(db_path: Option<PathBuf>, config: &AppConfig) -> Result<RecordStoreRef> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        return Ok(Arc::new(RocksDBStore::open(db_path).into_diagnostic()?));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to file storage."
        );
    }

    let store = FileRecordStore::open(config.records_dir())
        .await
        .into_diagnostic()?;
    Ok(Arc::new(store))
}

fn providers(config: &AppConfig) -> Result<(PaymentGatewayRef, NotifierRef)> {
    let gateway: PaymentGatewayRef = match &config.stripe {
        Some(stripe) => Arc::new(StripeGateway::new(stripe).into_diagnostic()?),
        None => {
            tracing::info!("No payment provider configured, using the sandbox gateway");
            Arc::new(SandboxGateway)
        }
    };
    let notifier: NotifierRef = match &config.mailgun {
        Some(mailgun) => Arc::new(MailgunNotifier::new(mailgun).into_diagnostic()?),
        None => {
            tracing::info!("No mail provider configured, notifications are only logged");
            Arc::new(LogNotifier)
        }
    };
    Ok((gateway, notifier))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().into_diagnostic()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(catalog) = cli.catalog {
        config.catalog_path = Some(catalog);
    }
    telemetry::init(config.log_json);

    let catalog = load_catalog(config.catalog_path.as_deref())?;
    let store = open_store(cli.db_path, &config).await?;
    let audit = FileAuditLog::open(config.audit_dir()).await.into_diagnostic()?;
    let (gateway, notifier) = providers(&config)?;

    let services = Services::new(
        Adapters {
            store,
            audit: Arc::new(audit),
            gateway,
            notifier,
        },
        catalog,
        config.hashing_secret.clone(),
    );

    match cli.command {
        Command::Run => {
            let mut scheduler = Scheduler::new();
            let settlement = services.settlement.clone();
            scheduler.spawn_periodic("settlement", config.settle_interval, move || {
                let settlement = settlement.clone();
                async move {
                    if let Err(e) = settlement.run_cycle().await {
                        tracing::error!(error = %e, "Settlement cycle failed");
                    }
                }
            });
            let rotation = services.rotation.clone();
            scheduler.spawn_periodic("log_rotation", config.rotate_interval, move || {
                let rotation = rotation.clone();
                async move {
                    if let Err(e) = rotation.rotate_all().await {
                        tracing::error!(error = %e, "Log rotation failed");
                    }
                }
            });

            tracing::info!(environment = ?config.environment, "Workers started, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await.into_diagnostic()?;
            scheduler.shutdown().await;
        }
        Command::Settle => {
            let report = services.settlement.run_cycle().await.into_diagnostic()?;
            for (order_id, outcome) in &report.outcomes {
                println!("{order_id} {outcome}");
            }
            for (order_id, error) in &report.failures {
                println!("{order_id} error: {error}");
            }
        }
        Command::RotateLogs => {
            let report = services.rotation.rotate_all().await.into_diagnostic()?;
            for (log_id, archive_id) in &report.rotated {
                println!("{log_id} -> {archive_id}");
            }
            for (log_id, error) in &report.failures {
                println!("{log_id} error: {error}");
            }
        }
        Command::Call {
            method,
            path,
            token,
            query,
            body,
        } => {
            let method: Method = method.parse().into_diagnostic()?;
            let mut request = Request::new(method, path);
            request.token = token;
            request.query = query.into_iter().collect();
            if let Some(body) = body {
                request.body = serde_json::from_str(&body).into_diagnostic()?;
            }

            let dispatcher = Dispatcher::new(services);
            let response = dispatcher.handle(request).await;
            println!("{}", response.status);
            println!(
                "{}",
                serde_json::to_string_pretty(&response.body).into_diagnostic()?
            );
        }
    }

    Ok(())
}
