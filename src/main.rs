use clap::Parser;
use desktop_app_bridge::bootstrap::{RetryPolicy, TcpEndpoint, expose_with_retry};
use desktop_app_bridge::config::{Config, load_dotenv};
use desktop_app_bridge::entity::{EntityHost, LoggingSink, load_prior, save_prior};
use desktop_app_bridge::http::{AppState, build_router};
use desktop_app_bridge::instance_lock::InstanceLock;
use desktop_app_bridge::storage::JsonFileStore;
use desktop_app_bridge::Hub;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "desktop-app-bridge")]
#[command(about = "Registration and sensor webhook bridge for desktop clients")]
struct Cli {
    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding the snapshot and entity state files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Bearer token required for registration
    #[arg(long)]
    access_token: Option<String>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // Before the runtime starts any threads
    load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(host) = cli.host {
        config.http.host = host;
    }
    if let Some(port) = cli.port {
        config.http.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(token) = cli.access_token {
        config.http.access_token = Some(token);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    if let Err(e) = runtime.block_on(run(config)) {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Desktop App Bridge");
    info!("  Data dir: {:?}", config.storage.data_dir);
    info!("  Base path: {:?}", config.base_path());
    info!(
        "  Registration auth: {}",
        if config.http.access_token.is_some() { "bearer token" } else { "disabled" }
    );

    let _lock = InstanceLock::acquire(&config.storage.data_dir)?;

    let hub = Arc::new(Hub::load(JsonFileStore::new(config.storage.snapshot_path()))?);
    let prior = load_prior(&config.storage.entity_state_path());
    let entities = EntityHost::start(Arc::clone(&hub), Arc::new(LoggingSink), prior);

    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port).parse()?;
    let shutdown = CancellationToken::new();
    let state = AppState::new(Arc::clone(&hub), config.http.access_token.clone());
    let endpoint = Arc::new(TcpEndpoint::new(
        addr,
        build_router(state, &config.base_path()),
        shutdown.clone(),
    ));

    let host_ready = Arc::new(Notify::new());
    let policy = RetryPolicy::from(&config.startup);
    let expose_task = {
        let endpoint = Arc::clone(&endpoint);
        let host_ready = Arc::clone(&host_ready);
        tokio::spawn(async move {
            if let Err(e) = expose_with_retry(endpoint.as_ref(), &policy, &host_ready).await {
                warn!("[Bootstrap] Running without an HTTP endpoint: {}", e);
            }
        })
    };
    // Everything the endpoint depends on is up
    host_ready.notify_one();

    info!("Desktop App Bridge is running. Press Ctrl+C to exit");
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    shutdown.cancel();
    expose_task.abort();
    endpoint.wait().await;

    if let Err(e) = save_prior(&config.storage.entity_state_path(), &entities.remembered()) {
        error!("[Entity] Failed to remember entity states: {}", e);
    }
    entities.shutdown();

    info!("Desktop App Bridge stopped");
    Ok(())
}
