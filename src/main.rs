//! apimock - CLI entry point

use anyhow::Result;
use apimock::config::ServerConfig;
use apimock::fakedata::FakeProvider;
use apimock::notify::HttpNotifier;
use apimock::persist::{EngineRegistry, EntityActions, FileEngine, MemoryEngine, PersistEngine};
use apimock::server::Dispatcher;
use apimock::vars::VarsProcessor;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "apimock",
    about = "Programmable HTTP mock server - request stubbing, templated responses, and persisted state",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "apimock.yaml")]
    config: PathBuf,

    /// Listen address override (e.g. "127.0.0.1:8083")
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = if args.config.exists() {
        info!(path = ?args.config, "loading configuration");
        ServerConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("configuration file not found: {:?}", args.config);
    } else {
        info!("using default configuration (no mocks)");
        ServerConfig::default()
    };

    // Validate and exit if requested
    if args.validate {
        config.validate()?;
        println!("configuration is valid ({} mocks defined)", config.mocks.len());
        return Ok(());
    }

    let addr = match args.listen {
        Some(addr) => addr,
        None => SocketAddr::new(config.listen.ip.parse::<IpAddr>()?, config.listen.port),
    };

    // Persistence engines: memory is always registered, the file engine only
    // when a root directory is configured
    let mut engines: Vec<Arc<dyn PersistEngine>> = vec![Arc::new(MemoryEngine::new("memory"))];
    if let Some(root) = &config.persist.path {
        info!(path = ?root, "registering file persistence engine");
        engines.push(Arc::new(FileEngine::new("file", root)?));
    }
    let default_engine = engines
        .iter()
        .find(|engine| engine.name() == config.persist.default_engine)
        .cloned()
        .unwrap_or_else(|| Arc::clone(&engines[0]));
    let mut registry = EngineRegistry::new(default_engine);
    for engine in engines {
        registry.register(engine);
    }
    let registry = Arc::new(registry);

    let processor = VarsProcessor::new(
        Arc::new(FakeProvider::standard()),
        Arc::clone(&registry),
    );
    let actions = EntityActions::new(Arc::clone(&registry));

    info!(mocks = config.mocks.len(), "starting mock server");
    let dispatcher = Dispatcher::new(config, processor, actions, Arc::new(HttpNotifier::new()))?;
    Arc::new(dispatcher).serve(addr).await
}
