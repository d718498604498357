use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use agora_core::api::ContentClient;
use agora_core::catalog::{PersonaCatalog, TopicCatalog};
use agora_core::config::{ContentConfig, SessionConfig};
use agora_core::session::SessionRuntime;

mod routes;

#[derive(Parser)]
#[command(name = "agora-server")]
#[command(about = "Agora — live AI debate with public participation")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    address: String,

    /// Session uptime budget in seconds (default 5h55m)
    #[arg(long)]
    max_uptime: Option<u64>,

    /// Path to a persona catalog JSON (builtin set when omitted)
    #[arg(long)]
    personas: Option<PathBuf>,

    /// Path to a topic catalog JSON (builtin set when omitted)
    #[arg(long)]
    topics: Option<PathBuf>,

    /// Seed for the session RNG, for deterministic replays
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "agora_core={},agora_server={}",
            log_level, log_level
        ))
        .init();

    let api_key = std::env::var("GROQ_API_KEY")
        .map_err(|_| anyhow::anyhow!("GROQ_API_KEY must be set (see console.groq.com/keys)"))?;

    let mut config = SessionConfig::default();
    if let Some(secs) = args.max_uptime {
        config.max_uptime = Duration::from_secs(secs);
    }
    config.seed = args.seed;

    let personas = PersonaCatalog::load(args.personas.as_deref())?;
    let topics = TopicCatalog::load(args.topics.as_deref())?;

    let content_config = ContentConfig::new(api_key);
    let content = ContentClient::from_config(&content_config, config.max_words);

    info!(
        model = %content_config.primary_model,
        ai_gap = ?config.ai_gap,
        per_topic = %format!("{}-{}", config.min_per_topic, config.max_per_topic),
        max_uptime = ?config.max_uptime,
        "starting Agora session"
    );

    let runtime = SessionRuntime::build(config, &personas, topics, content);
    let cancel = CancellationToken::new();
    let (handle, engine_task) = runtime.spawn(cancel.clone());

    let addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, routes::router(handle))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            warn!("received ctrl-c, shutting down gracefully");
            shutdown_cancel.cancel();
        })
        .await?;

    cancel.cancel();
    let _ = engine_task.await;
    info!("server shut down");
    Ok(())
}
