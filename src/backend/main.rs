/**
 * TaskCollab Server Entry Point
 *
 * Loads configuration, initialises tracing and serves the collaboration
 * socket plus its small HTTP API.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use taskcollab::shared::RealtimeConfig;

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = RealtimeConfig::load()?;
    if config.uses_default_secret() {
        tracing::warn!("[Server] JWT_SECRET is not set, using the development default");
    }
    let addr = config.bind_address();

    let app = taskcollab::backend::server::init::create_app(config).await;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("[Server] Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin taskcollab-server --features ssr");
    std::process::exit(1);
}
