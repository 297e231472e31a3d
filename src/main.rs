mod config;
mod routes;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration invalid");
            std::process::exit(1);
        }
    };

    tracing::info!(
        endpoint = %config.client.graphql_endpoint,
        region = %config.client.region,
        auth = %config.client.auth.auth_type(),
        "graphql endpoint configured"
    );
    if config.client.identity.is_none() {
        tracing::warn!("hosted UI not configured; sign-in disabled");
    }

    let port = config.port;
    let state = state::AppState::new(config.client);

    let app = match routes::leptos_app(state) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "leptos setup failed");
            std::process::exit(1);
        }
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "eventboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
