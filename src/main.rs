//! Kurta Orders - order lifecycle service

use std::sync::Arc;
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kurta_orders::api::{self, AppState};
use kurta_orders::config::Config;
use kurta_orders::gateway::{RazorpayClient, SignatureVerifier};
use kurta_orders::notify::{NatsNotifier, Notifier, TracingNotifier};
use kurta_orders::service::LifecyclePolicy;
use kurta_orders::store::{PgCarts, PgCatalog, PgOrders};
use kurta_orders::OrderLifecycleManager;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsNotifier::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, notifications will only be logged");
                Arc::new(TracingNotifier)
            }
        },
        None => Arc::new(TracingNotifier),
    };

    let razorpay = RazorpayClient::new(&config.razorpay);
    let key_id = razorpay.key_id().to_string();
    let lifecycle = OrderLifecycleManager::new(
        Arc::new(PgOrders::new(db.clone())),
        Arc::new(PgCarts::new(db.clone())),
        Arc::new(PgCatalog::new(db)),
        Arc::new(razorpay),
        SignatureVerifier::new(config.razorpay.key_secret.clone()),
        notifier,
        LifecyclePolicy::from(&config),
    );
    let app = api::router(AppState::new(lifecycle, key_id));

    tracing::info!("Kurta orders listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
