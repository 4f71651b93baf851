mod auth;
mod config;
mod service;

use auth::ApiKeyGuard;
use config::ServerConfig;
use lapse_core::{ExpiringStore, OtpStore, TokenBlacklist};
use lapse_proto::lapse_server::LapseServer;
use service::{LapseService, Stores};
use tonic::transport::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lapse_server=info,tonic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let stores = Stores {
        cache: ExpiringStore::new(),
        otp: OtpStore::with_config(config.otp.clone()),
        blacklist: TokenBlacklist::new(),
    };
    let guard = ApiKeyGuard::new(config.api_key.clone());

    tracing::info!("Lapse gRPC server listening on {}", config.addr);
    tracing::info!(
        "   OTP lifetime: {}s, code length: {}",
        config.otp.ttl.as_secs(),
        config.otp.code_length
    );
    if !guard.is_enabled() {
        tracing::warn!("LAPSE_API_KEY is not set; requests are not authenticated");
    }

    Server::builder()
        .add_service(LapseServer::with_interceptor(
            LapseService::new(stores),
            guard,
        ))
        .serve(config.addr)
        .await?;

    Ok(())
}
