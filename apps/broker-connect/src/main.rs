//! Broker Connect Binary
//!
//! Starts the TradePort broker link service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin broker-connect
//! ```
//!
//! # Environment Variables
//!
//! - `BROKER_CONNECT_CONFIG`: Path to the YAML config file (default: config.yaml)
//! - `BROKER_MASTER_KEY`: Base64 sealing key, referenced from config.yaml
//! - `RUST_LOG`: Log filter override (default: observability.log_directive)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use broker_connect::application::ports::{CredentialStore, PortalUser};
use broker_connect::config::{Config, IdentityConfig, load_config};
use broker_connect::domain::credential::UserId;
use broker_connect::infrastructure::broker::kite::{KiteConfig, KiteConnectAdapter};
use broker_connect::infrastructure::http::{AppState, PortalLinks, create_router};
use broker_connect::infrastructure::identity::StaticTokenIdentity;
use broker_connect::infrastructure::persistence::{InMemoryCredentialStore, TursoCredentialStore};
use broker_connect::infrastructure::sealing::{CodecError, SecretCodec};
use broker_connect::observability::{MetricsConfig, init_metrics, init_tracing};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config_path = std::env::var("BROKER_CONNECT_CONFIG").ok();
    let config = load_config(config_path.as_deref())?;

    init_tracing(&config.observability.log_directive);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting TradePort Broker Connect"
    );
    log_config(&config);

    let metrics_addr: SocketAddr = config.observability.metrics_addr.parse()?;
    init_metrics(&MetricsConfig::with_addr(metrics_addr))?;

    let codec = create_codec(&config)?;

    if config.persistence.is_durable() {
        let store = TursoCredentialStore::open(&config.persistence.db_path, codec).await?;
        serve(Arc::new(store), &config).await
    } else {
        let store = InMemoryCredentialStore::new(codec);
        serve(Arc::new(store), &config).await
    }
}

/// Log the effective configuration. Secrets never appear here.
fn log_config(config: &Config) {
    tracing::info!(
        bind_address = %config.server.bind_address,
        http_port = config.server.http_port,
        backend = %config.persistence.backend,
        broker_api = %config.broker.api_base,
        metrics_addr = %config.observability.metrics_addr,
        portal_tokens = config.identity.tokens.len(),
        "Configuration loaded"
    );
}

/// Build the at-rest sealing codec from configuration.
///
/// Without a master key the codec uses a random per-process key. Config
/// validation already rejects that combination for the durable backend.
fn create_codec(config: &Config) -> Result<SecretCodec, CodecError> {
    if config.sealing.is_ephemeral() {
        tracing::warn!("sealing.master_key not set, sealed fields will not survive a restart");
        SecretCodec::ephemeral()
    } else {
        SecretCodec::from_base64_key(&config.sealing.master_key)
    }
}

/// Build the static token identity adapter from configuration.
fn create_identity(config: &IdentityConfig) -> StaticTokenIdentity {
    if config.tokens.is_empty() {
        tracing::warn!("no portal tokens configured, every portal request will be rejected");
    }

    let entries = config.tokens.iter().map(|entry| {
        let user_id = UserId::new(entry.user_id.clone());
        let user = if entry.read_only {
            PortalUser::read_only(user_id)
        } else {
            PortalUser::full(user_id)
        };
        (entry.token.clone(), user)
    });

    let identity = StaticTokenIdentity::new(entries);
    tracing::info!(
        tokens = config.tokens.len(),
        "Static portal identity initialized"
    );
    identity
}

/// Run the HTTP server over a concrete credential store.
async fn serve<S>(store: Arc<S>, config: &Config) -> anyhow::Result<()>
where
    S: CredentialStore + 'static,
{
    let kite_config = KiteConfig::new(
        config.broker.api_base.clone(),
        config.broker.login_base.clone(),
    )
    .with_timeout(Duration::from_millis(config.broker.timeout_ms));
    let broker = Arc::new(KiteConnectAdapter::new(kite_config)?);
    tracing::info!(api_base = %config.broker.api_base, "Kite Connect adapter initialized");

    let identity = Arc::new(create_identity(&config.identity));

    // Every known portal user gets a credential row up front, so reads
    // never race a first-write.
    for user_id in identity.users() {
        store.enroll(user_id).await?;
    }

    let links = PortalLinks {
        redirect_uri: config.portal.redirect_uri.clone(),
        success_url: config.portal.success_url.clone(),
        error_url: config.portal.error_url.clone(),
    };

    let state = AppState::new(store, broker, identity, links);
    let app = create_router(state);

    let addr: SocketAddr =
        format!("{}:{}", config.server.bind_address, config.server.http_port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/broker/configure");
    tracing::info!("  POST /api/broker/quick-refresh");
    tracing::info!("  GET  /api/broker/callback");
    tracing::info!("  POST /api/broker/test-connection");
    tracing::info!("  GET  /api/broker/positions");
    tracing::info!("  POST /api/broker/disconnect");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Broker Connect stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; without them the process
/// could not shut down cleanly.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
