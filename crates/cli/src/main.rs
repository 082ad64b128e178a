use std::{io::IsTerminal, path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    nextcal_caldav::{CalendarService, CalendarToolHandler, LazySession, LibDavTransport},
    nextcal_config::NextcalConfig,
    nextcal_mcp::{McpServer, ServerInfo},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "nextcal", about = "nextcal: calendar tools over MCP for CalDAV servers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (overrides discovery of nextcal.{toml,yaml,yml,json}).
    #[arg(long, global = true, env = "NEXTCAL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Serve the calendar tools over stdio (default when no subcommand is provided).
    Serve,
    /// Connect once and print the account's calendars as JSON.
    Calendars,
}

/// Initialise tracing. Logs always go to stderr; stdout carries protocol
/// traffic only.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the explicit config file or discover one, then apply env overrides.
fn resolve_config(path: Option<&PathBuf>) -> anyhow::Result<NextcalConfig> {
    let mut config = match path {
        Some(path) => nextcal_config::load_config(path)?,
        None => nextcal_config::discover_and_load(),
    };
    nextcal_config::apply_env_overrides(&mut config);
    Ok(config)
}

async fn serve(config: NextcalConfig) -> anyhow::Result<()> {
    let missing = config.caldav.missing_keys();
    if !missing.is_empty() {
        warn!(
            missing = %missing.join(", "),
            "CalDAV account is incomplete; calendar tools will fail until it is configured"
        );
    }

    let session = LazySession::from_config(config.caldav);
    let handler = CalendarToolHandler::new(CalendarService::new(Arc::new(session)));

    McpServer::new(Arc::new(handler), ServerInfo {
        name: config.server.name,
        version: env!("CARGO_PKG_VERSION").into(),
    })
    .with_instructions(config.server.instructions)
    .serve_stdio()
    .await?;

    Ok(())
}

async fn print_calendars(config: NextcalConfig) -> anyhow::Result<()> {
    let transport = LibDavTransport::from_config(&config.caldav).await?;
    let calendars = CalendarService::new(Arc::new(transport))
        .list_calendars()
        .await?;
    println!("{}", serde_json::to_string_pretty(&calendars)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "nextcal starting");

    let config = resolve_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Calendars => print_calendars(config).await,
    }
}
