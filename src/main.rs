//! Entry point: load config, mount the bridge, and run the dev host.

use std::sync::Arc;

use axum::routing::get_service;
use tex_bridge::auth::{FileConfigSource, HttpConfigSource, LocalConfigSource, SessionResolver};
use tex_bridge::config::Config;
use tex_bridge::services::{global, BridgeInitializer, ContextResolver};
use tex_bridge::{create_app, AppState, TexViewContainer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let allowed_origins = config.allowed_origins.clone();
    let namespace = global().install_tex_with(|| allowed_origins);
    let mode = config.mode();

    let mut resolver = SessionResolver::new();
    if let Some(base) = &config.api_base_url {
        resolver = resolver.with_api_base(base.clone());
    }
    let config_source: Arc<dyn LocalConfigSource> = match &config.local_config_url {
        Some(url) => Arc::new(HttpConfigSource::new(url.clone())),
        None => Arc::new(FileConfigSource::new(&config.local_config_path)),
    };
    let initializer = BridgeInitializer::new(namespace.clone(), mode)
        .with_resolver(resolver)
        .with_config_source(config_source)
        .with_handshake_timeout(config.handshake_timeout);
    let context = ContextResolver::for_mode(mode, config.location, &namespace, &config.query);
    let view = Arc::new(TexViewContainer::from_parts(initializer, context));

    let mounting = view.clone();
    tokio::spawn(async move {
        match mounting.mount().await {
            Ok(providers) => tracing::info!(
                location = %providers.location(),
                base_url = %providers.session().http_client().base_url(),
                "widget mounted"
            ),
            Err(e) => tracing::error!(error = %e, "widget failed to mount"),
        }
    });

    let state = AppState::new(namespace, view);
    let app = create_app(state)
        .route_service(
            "/.tex/tex.config.json",
            get_service(tower_http::services::ServeFile::new(
                &config.local_config_path,
            )),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!(addr = %config.server_addr, mode = ?mode, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
