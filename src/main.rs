use std::io::{self, Write};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use exeat_engine::admin::AdminCommandHandler;
use exeat_engine::api::{AppState, create_router};
use exeat_engine::config::{ConfigLoader, Settings};
use exeat_engine::eligibility::{EligibilityEngine, InboundMessage};
use exeat_engine::error::EngineResult;
use exeat_engine::models::Channel;
use exeat_engine::notify::LogNotifier;
use exeat_engine::parsing::parse;
use exeat_engine::store::{InMemoryPolicyStore, PolicyStore, SqlitePolicyStore};
use exeat_engine::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "exeat-engine",
    about = "Decide boarding-house leave requests and run housemaster commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Show what the parser extracts from a message
    Parse {
        /// Reference time (YYYY-MM-DDTHH:MM:SS, defaults to now)
        #[arg(long, value_parser = parse_datetime)]
        now: Option<NaiveDateTime>,
        /// Message text
        text: String,
    },
    /// Decide a guardian message against the configured roster
    Request {
        /// Phone number or email address of the guardian
        #[arg(long)]
        sender: String,
        /// Channel the message arrived on (whatsapp or email)
        #[arg(long, default_value = "whatsapp")]
        channel: Channel,
        /// Reference time (YYYY-MM-DDTHH:MM:SS, defaults to now)
        #[arg(long, value_parser = parse_datetime)]
        now: Option<NaiveDateTime>,
        /// Message text
        text: String,
    },
    /// Run a housemaster command against the configured roster
    Command {
        /// Phone number or email address of the administrator
        #[arg(long)]
        sender: String,
        /// Reference time (YYYY-MM-DDTHH:MM:SS, defaults to now)
        #[arg(long, value_parser = parse_datetime)]
        now: Option<NaiveDateTime>,
        /// Command text
        text: String,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> EngineResult<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Parse { now, text } => print_json(&parse(&text, now_or_local(now))),
        Command::Request {
            sender,
            channel,
            now,
            text,
        } => {
            let store = open_store(&Settings::load()?)?;
            let engine = EligibilityEngine::new(store, Arc::new(LogNotifier));
            let message = InboundMessage {
                text,
                sender,
                channel,
            };
            print_json(&engine.process(&message, now_or_local(now)))
        }
        Command::Command { sender, now, text } => {
            let store = open_store(&Settings::load()?)?;
            let handler = AdminCommandHandler::new(store);
            print_json(&handler.execute(&sender, &text, now_or_local(now)))
        }
    }
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM:SS ({err})"))
}

fn now_or_local(now: Option<NaiveDateTime>) -> NaiveDateTime {
    now.unwrap_or_else(|| Local::now().naive_local())
}

fn print_json<T: Serialize>(value: &T) -> EngineResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}

/// SQLite when a database path is configured, otherwise an in-memory
/// store seeded from the roster.
fn open_store(settings: &Settings) -> EngineResult<Arc<dyn PolicyStore>> {
    let config = ConfigLoader::load(&settings.config_dir)?;
    let store: Arc<dyn PolicyStore> = match settings.database_path.as_deref() {
        Some(path) => Arc::new(SqlitePolicyStore::from_config(Some(path), &config)?),
        None => Arc::new(InMemoryPolicyStore::from_config(&config)),
    };
    Ok(store)
}

async fn run_server(mut args: ServeArgs) -> EngineResult<()> {
    let mut settings = Settings::load()?;

    if let Some(host) = args.host.take() {
        settings.server.host = host;
    }
    if let Some(port) = args.port.take() {
        settings.server.port = port;
    }

    telemetry::init(&settings.telemetry)?;

    let store = open_store(&settings)?;
    let app = create_router(AppState::new(store, Arc::new(LogNotifier)));

    let addr = settings.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        environment = ?settings.environment,
        %addr,
        durable = settings.database_path.is_some(),
        "exeat engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
