use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toplytics::api;
use toplytics::auth::AuthService;
use toplytics::config::Config;
use toplytics::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage and the analytics client
    let context = AppContext::from_config(&config).await?;

    match context.profiles().selected().await? {
        Some(profile) => info!("📊 Serving rankings for {}", profile.info),
        None => info!("⚠ No view selected yet - run `toplytics-admin views` and `select`"),
    }

    // Initialize authentication
    let auth_service = Arc::new(AuthService::new(&config.auth));
    if auth_service.is_enabled() {
        info!("🔐 Refresh endpoint requires an API key");
    } else {
        info!("🔓 Refresh endpoint is open - set API_KEYS to protect it");
    }

    // Create API router
    let router = api::create_api_router(Arc::clone(context.cache()), auth_service);

    // Start API server
    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Toplytics listening on http://{}", addr);
    info!("   - Rankings available at http://{}/api/rankings/{{window}}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
