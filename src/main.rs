mod config;
mod frame;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let config = config::Config::from_env();
    let port = config.port;
    tracing::info!(
        history_capacity = config.history_capacity,
        client_channel_capacity = config.client_channel_capacity,
        replay_on_join = config.replay_on_join,
        "whiteboard config loaded"
    );

    let state = state::AppState::new(config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "whiteboard listening");
    axum::serve(listener, app).await
}
