// ptg-chat - command-line client for the Pro Traders Group assistant
//
// Architecture:
// - config: environment registry + resolution, endpoints, ambient config,
//   health probing
// - store: persisted key/value state (session token, preferences)
// - api: typed REST client over reqwest with a closed error taxonomy
// - chat: session orchestrator, history pager, debounced search, toasts
// - repl: interactive chat loop; cli: one-shot subcommands

mod api;
mod chat;
mod cli;
mod config;
mod repl;
mod store;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};
use config::Config;
use store::StateStore;

#[tokio::main]
async fn main() -> Result<()> {
    Config::ensure_config_exists();
    let config = Config::from_env();

    // guard must outlive main or buffered log lines are lost
    let _log_guard = init_logging(&config);

    let store = StateStore::open_default()?;

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);
    cli::run(command, &config, &store).await
}

/// Initialize tracing: RUST_LOG beats the configured level, and logs go to
/// a daily-rotated JSON file so stdout stays clean for the chat itself.
/// Returns the appender guard, which must be held for the process lifetime.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if !config.logging.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(
        &config.logging.file_dir,
        format!("{}.log", config.logging.file_prefix),
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}
