//! bifrostd — completion gateway daemon.
//!
//! Serves one shared [`CompletionService`](bifrost::CompletionService)
//! over HTTP (`POST /completion`) and gRPC
//! (`bifrost.v1.Completion/Complete`) simultaneously.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bifrost::server::config::{Config, Secrets};
use bifrost::server::proto::completion_server::CompletionServer;
use bifrost::server::{CompletionGrpc, http};
use bifrost::{
    BifrostError, CacheService, CompletionService, MemoryStore, ServiceConfig, UpstreamClient,
    UpstreamConfig,
};

/// Bifrost completion gateway daemon.
#[derive(Parser)]
#[command(name = "bifrostd")]
#[command(version = bifrost::PKG_VERSION)]
#[command(about = "Bifrost completion gateway daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let api_key = secrets.upstream_api_key().ok_or_else(|| {
        BifrostError::Configuration(
            "no upstream API key. Set it in secrets.toml or BIFROST_API_KEY".to_string(),
        )
    })?;

    let service = Arc::new(build_service(&config, api_key)?);

    info!(
        version = bifrost::version_string(),
        http = %config.server.http_address,
        grpc = %config.server.grpc_address,
        "bifrostd starting"
    );

    let http_listener = tokio::net::TcpListener::bind(&config.server.http_address).await?;
    let http_server = axum::serve(http_listener, http::router(service.clone()))
        .with_graceful_shutdown(shutdown_signal());

    let grpc_addr: SocketAddr = config
        .server
        .grpc_address
        .parse()
        .map_err(|e| BifrostError::Configuration(format!("invalid gRPC address: {e}")))?;
    let grpc_server = tonic::transport::Server::builder()
        .add_service(CompletionServer::new(CompletionGrpc::new(service)))
        .serve_with_shutdown(grpc_addr, shutdown_signal());

    tokio::try_join!(
        async { http_server.await.map_err(|e| Box::new(e) as Box<dyn std::error::Error>) },
        async { grpc_server.await.map_err(|e| Box::new(e) as Box<dyn std::error::Error>) },
    )?;

    info!("bifrostd stopped");
    Ok(())
}

/// Wire the pipeline from configuration.
fn build_service(config: &Config, api_key: String) -> Result<CompletionService, BifrostError> {
    let upstream = UpstreamClient::new(
        UpstreamConfig::new(config.upstream.endpoint.as_str(), api_key)
            .rate(config.upstream.rate_per_second, config.upstream.rate_burst)
            .timeout(config.upstream_timeout()),
    )?;

    let cache = CacheService::new(Arc::new(MemoryStore::new(config.cache.max_entries)));

    let service_config = ServiceConfig::new()
        .user_limit(config.limits.user_requests, config.user_window())
        .cache_ttl(config.cache_ttl());

    Ok(CompletionService::new(
        Arc::new(upstream),
        cache,
        service_config,
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
