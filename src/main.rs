use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use loyalty_intel::customer::{self, CustomerRecord};
use loyalty_intel::{Config, LoyaltyPipeline, StageEvent, llm, signals};

#[derive(Parser)]
#[command(
    name = "loyalty-intel",
    version,
    about = "Behavioral signals, life-event diagnosis and loyalty strategy for retail customers"
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one customer record.
    Analyze {
        /// Path to a customer record JSON file.
        file: PathBuf,

        /// Per-call text-generation timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the report on a single line.
        #[arg(long)]
        compact: bool,
    },

    /// Compute behavioral signals only (no text generator needed).
    Signals {
        /// Path to a customer record JSON file.
        file: PathBuf,
    },

    /// List customer records in a directory.
    List {
        #[arg(long, default_value = "data/customers")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("loyalty_intel=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!cli.json_logs).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        }))
        .init();

    match cli.command {
        Commands::List { dir } => {
            let files = customer::list_customer_files(&dir)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", dir.display(), e))?;
            if files.is_empty() {
                println!("No customer records found in {}", dir.display());
                return Ok(());
            }
            println!("Customer records in {}:\n", dir.display());
            for path in files {
                match CustomerRecord::load(&path) {
                    Ok(record) => println!(
                        "  {:<12} {:<10} {}",
                        record.customer_id,
                        record.profile.loyalty_tier,
                        path.display()
                    ),
                    Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
                }
            }
            println!();
        }
        Commands::Signals { file } => {
            let record = CustomerRecord::load(&file)?;
            let signals = signals::analyze(&record.purchase_history);
            println!("{}", serde_json::to_string_pretty(&signals)?);
        }
        Commands::Analyze {
            file,
            timeout_secs,
            compact,
        } => {
            let record = CustomerRecord::load(&file)?;

            let mut config = Config::from_env().map_err(|e| {
                anyhow::anyhow!(
                    "Failed to load config: {}. Make sure .env is configured.",
                    e
                )
            })?;
            if let Some(t) = timeout_secs {
                if t == 0 {
                    anyhow::bail!("--timeout-secs must be greater than zero");
                }
                config.llm.generation.timeout = std::time::Duration::from_secs(t);
            }

            let generator = llm::create_text_generator(&config.llm)?;
            let pipeline = LoyaltyPipeline::new(generator).with_observer(Arc::new(
                |event: StageEvent| match event {
                    StageEvent::Started(stage) => eprintln!("→ {} ...", stage),
                    StageEvent::Completed(stage) => eprintln!("✓ {}", stage),
                },
            ));

            for line in record.context_lines() {
                eprintln!("{}", line);
            }
            eprintln!();

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, cancelling the run");
                    on_interrupt.cancel();
                }
            });

            let report = pipeline.run_with_cancel(&record, &cancel).await?;
            let output = if compact {
                serde_json::to_string(&report)?
            } else {
                serde_json::to_string_pretty(&report)?
            };
            println!("{}", output);
        }
    }

    Ok(())
}
