use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use retrovault::config::{default_config_path, Config};
use retrovault::insights::InsightGenerator;
use retrovault::models::{Id, UserInfo};
use retrovault::seed::SeedingOrchestrator;
use retrovault::server::{self, AppState};
use retrovault::sources::{MockSource, NessieSource, SampleSource, SeedSource};
use retrovault::store::{DocumentStore, JsonFileStore};

#[derive(Parser)]
#[command(name = "retrovault")]
#[command(about = "Demo-bank data seeding service")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Seed one user from the command line
    Seed {
        user_id: String,
        /// Re-fetch even if existing data is fresh
        #[arg(long)]
        force: bool,
        /// Display name for a newly created profile
        #[arg(long)]
        name: Option<String>,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)?;
    let config_dir = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let data_dir = config.resolve_data_dir(&config_dir);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = build_state(&config, &data_dir)?;
            let listener = tokio::net::TcpListener::bind(&config.listen_addr)
                .await
                .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
            server::serve(state, listener).await
        }
        Command::Seed {
            user_id,
            force,
            name,
        } => {
            let state = build_state(&config, &data_dir)?;
            let user_id = Id::from_string_checked(user_id)?;
            let info = UserInfo {
                display_name: name,
                ..Default::default()
            };
            let result = state.orchestrator.seed(&user_id, &info, force).await?;
            if result.is_existing_data {
                println!("Existing data is fresh ({})", result.data_source);
            } else {
                println!(
                    "Seeded from {}: {} account(s), {} transaction(s)",
                    result.data_source, result.accounts_count, result.transactions_count
                );
            }
            println!(
                "Income {} / expenses {} / savings {}",
                result.summary.total_income,
                result.summary.total_expenses,
                result.summary.total_savings
            );
            Ok(())
        }
        Command::Config => {
            println!("Config file: {}", config_path.display());
            println!("Data directory: {}", data_dir.display());
            println!("Listen address: {}", config.listen_addr);
            println!(
                "Nessie: {}",
                if config.nessie_api_key().is_some() {
                    "configured"
                } else {
                    "not configured (sample/mock fallback)"
                }
            );
            println!(
                "LLM insights: {}",
                if config.llm_api_key().is_some() {
                    "configured"
                } else {
                    "not configured (template fallback)"
                }
            );
            Ok(())
        }
    }
}

/// Wire the store, source chain, orchestrator, and insight generator.
///
/// The chain order is fixed: remote sandbox, then curated samples, then the
/// procedural generator. Each source decides for itself whether it can run.
fn build_state(config: &Config, data_dir: &PathBuf) -> Result<AppState> {
    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(data_dir.clone()));

    let mut nessie = NessieSource::new(config.nessie_api_key())
        .with_timeout(Duration::from_secs(config.seed.remote_timeout_secs));
    if let Some(customer_id) = &config.nessie.customer_id {
        nessie = nessie.with_customer_id(customer_id.clone());
    }

    let sources: Vec<Arc<dyn SeedSource>> = vec![
        Arc::new(nessie),
        Arc::new(SampleSource::new()),
        Arc::new(MockSource::new()),
    ];

    let orchestrator = SeedingOrchestrator::new(store.clone(), sources).with_freshness_window(
        chrono::Duration::seconds(config.seed.freshness_window_secs),
    );

    let insights = InsightGenerator::new(config.llm_api_key(), config.llm.model.clone());

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        store,
        insights: Arc::new(insights),
    })
}
