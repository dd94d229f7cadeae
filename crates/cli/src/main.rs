use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "libris", version, about = "Library book tracking service")]
struct Cli {
    /// Environment to load (local, staging, production). Overrides LIBRIS_ENV.
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C
    Serve,
    /// Load configuration and connect to the configured store
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_with(cli.env.as_deref())
        .context("failed to load libris settings")?;

    match cli.command {
        Command::Serve => libris_app::run(settings, libris_app::shutdown_signal()).await,
        Command::Check => check(settings).await,
    }
}

async fn check(settings: Settings) -> anyhow::Result<()> {
    libris_telemetry::init(&settings.telemetry)?;

    let stores = libris_db::connect(&settings.database)
        .await
        .context("failed to open the configured store")?;
    let registry = libris_app::build_registry(&settings, &stores)?;

    tracing::info!(
        env = ?settings.environment,
        modules = registry.module_count(),
        backend = ?settings.database.backend,
        "configuration and store look good"
    );
    println!("ok");
    Ok(())
}
