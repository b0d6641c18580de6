use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kasih::infrastructure::AppState;
use kasih::{config, db, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kasih=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = config::Config::from_env();

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");

    match &config.gateway {
        Some(gw) => tracing::info!(
            "Payment gateway: ToyyibPay ({})",
            if gw.sandbox { "sandbox" } else { "live" }
        ),
        None => tracing::warn!("Payment gateway not configured; checkout and refresh are disabled"),
    }

    let state = AppState::new(db, config);

    if let Err(e) = server::serve(state).await {
        tracing::error!("HTTP server error: {}", e);
        std::process::exit(1);
    }
}
