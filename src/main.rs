use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use clap::Parser;
use missionlens::api::{AppContext, MissionApi};
use missionlens::blob::s3::S3BlobStore;
use missionlens::config::Config;
use missionlens::kv::dynamodb::DynamoStore;
use missionlens::metrics::Metrics;
use missionlens::proxy::MissionLensProxy;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use std::path::PathBuf;
use std::sync::Arc;

/// MissionLens - read-only mission metadata and imagery gateway built with Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "missionlens")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (environment variables are used when it does not exist)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Upgrade workers gracefully
    #[arg(long)]
    upgrade: bool,
}

/// Resolve AWS credentials and region, then build both store clients
fn build_context(config: Config) -> anyhow::Result<AppContext> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start AWS bootstrap runtime")?;

    let sdk_config = runtime.block_on(async {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.store.region {
            loader = loader.region(Region::new(region.clone()));
        }
        loader.load().await
    });

    let endpoint = config.store.endpoint.as_deref();
    let kv = DynamoStore::from_sdk_config(&sdk_config, endpoint);
    let blobs = S3BlobStore::from_sdk_config(&sdk_config, endpoint);

    Ok(AppContext {
        kv: Arc::new(kv),
        blobs: Arc::new(blobs),
        config: Arc::new(config),
        metrics: Arc::new(Metrics::new()),
    })
}

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration from file, or from the environment if there is none
    let config = Config::load(&args.config)
        .and_then(|config| config.validate().map(|_| config))
        .unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        });

    missionlens::logging::init_subscriber(&config.logging)
        .expect("Failed to initialize logging subsystem");

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        table = %config.store.table,
        bucket = %config.store.bucket,
        "Configuration loaded successfully"
    );

    let listen_addr = config.server.listen_addr();
    let threads = config.server.threads;

    let ctx = build_context(config).unwrap_or_else(|e| {
        eprintln!("Failed to initialize store clients: {:#}", e);
        std::process::exit(1);
    });

    // Build Pingora server options
    let opt = Opt {
        daemon: args.daemon,
        test: args.test,
        upgrade: args.upgrade,
        ..Default::default()
    };

    // Create Pingora server
    let mut server = Server::new(Some(opt)).expect("Failed to create Pingora server");
    server.bootstrap();

    let proxy = MissionLensProxy::new(Arc::new(MissionApi::new(ctx)));

    // Create HTTP service
    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);
    proxy_service.threads = Some(threads);
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(address = %listen_addr, threads = threads, "Starting MissionLens");

    server.add_service(proxy_service);

    // Run server forever (blocks until shutdown)
    server.run_forever();
}
