use hong3::{api, hub, AppState, Hub, ServerMessage, Settings};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hong3=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    info!(?settings, "Starting Hong San game server");

    let hub = Hub::spawn(settings.hub_config());
    tokio::spawn(hub::log_events(hub.subscribe()));

    let app_state = AppState::new(hub.clone(), settings.connection_config());
    let app = api::router(app_state);

    let listener = match tokio::net::TcpListener::bind(settings.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind_addr = %settings.bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!("Server running on http://{}", settings.bind_addr);

    let shutdown_hub = hub.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown requested");
            let _ = shutdown_hub.broadcast_all(ServerMessage::notice("Server is shutting down"));
        })
        .await;

    if let Err(e) = served {
        error!(error = %e, "Server error");
    }
}
