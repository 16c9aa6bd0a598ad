mod config_commands;
mod simulate;

use std::{path::Path, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tokio::sync::mpsc,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    aula_channels::{ChatTransport, Directory, DirectoryState},
    aula_config::AulaConfig,
    aula_engine::{Collaborators, Engine, SystemClock},
    aula_store::FileStore,
};

/// Capacity of the gateway → engine event queue.
const EVENT_QUEUE: usize = 256;

#[derive(Parser)]
#[command(name = "aula", about = "Aula, classroom assistant for Discord")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./aula.toml and ~/.config/aula/).
    #[arg(long, global = true, env = "AULA_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve the class (default when no subcommand is provided).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Drive the bot offline from a script of messages and reactions.
    Simulate(simulate::SimulateArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the explicit config file, or discover one.
pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<AulaConfig> {
    match path {
        Some(path) => aula_config::load_config(path),
        None => Ok(aula_config::discover_and_load()),
    }
}

async fn run_bot(config: AulaConfig) -> anyhow::Result<()> {
    let tz = config
        .bot
        .tz()
        .with_context(|| format!("unknown timezone: {}", config.bot.timezone))?;
    let store_path = aula_config::storage_path(&config);
    let store = Arc::new(FileStore::new(store_path.clone()));
    let directory = Arc::new(DirectoryState::new());
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);

    let connection =
        aula_discord::connect(&config.discord, Arc::clone(&directory), events_tx).await?;
    let cancel = connection.cancel.clone();

    let mut engine = Engine::new(Arc::new(config), Collaborators {
        transport: connection.transport as Arc<dyn ChatTransport>,
        directory: directory as Arc<dyn Directory>,
        store,
        clock: Arc::new(SystemClock::new(tz)),
    });
    info!(store = %store_path.display(), timezone = %tz, "serving class");

    tokio::select! {
        () = engine.run(events_rx) => {
            warn!("gateway connection closed");
        },
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutting down");
            cancel.cancel();
            engine.shutdown().await;
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "aula starting");

    let config_path = cli.config.as_deref();
    match cli.command {
        None | Some(Commands::Run) => run_bot(load(config_path)?).await,
        Some(Commands::Config { action }) => config_commands::handle_config(action, config_path),
        Some(Commands::Simulate(args)) => simulate::run(load(config_path)?, args).await,
    }
}
