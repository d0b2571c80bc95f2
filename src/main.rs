use std::sync::Arc;

use anyhow::{Context, Result};
use creator_settlement::{
    api::{
        catalog::CatalogClient, notifications::NotificationClient, razorpay::RazorpayClient,
        uploads::UploadClient,
    },
    app,
    app_state::AppState,
    bootstrap, config,
    consumers::settlement::{self, FulfilmentContext},
    db,
    queue::{TaskHandler, WorkerPool},
    services::{BookingService, Collaborators, Repositories, Services},
    store::PgStore,
};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    let pool = db::create_pool(&config.database).await?;
    let repos = Repositories::postgres(PgStore::new(pool));

    let http = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let collaborators = Collaborators {
        catalog: Arc::new(CatalogClient::new(http.clone(), &config.services)),
        gateway: Arc::new(RazorpayClient::new(http.clone(), &config.razorpay)),
        storage: Arc::new(UploadClient::new(http.clone(), &config.services)),
        email: Arc::new(NotificationClient::new(http, &config.services)),
    };

    let fulfilment = Arc::new(FulfilmentContext {
        catalog: collaborators.catalog.clone(),
        storage: collaborators.storage.clone(),
        email: collaborators.email.clone(),
        bookings: BookingService::new(repos.bookings.clone(), collaborators.catalog.clone()),
        subscribers: repos.subscribers.clone(),
    });
    let handler: TaskHandler = Arc::new(move |task| settlement::dispatch(task, fulfilment.clone()));
    let (task_pool, workers) =
        WorkerPool::start(config.workers.workers, config.workers.queue_capacity, handler);

    let services = Services::new(
        &repos,
        &collaborators,
        Arc::new(task_pool),
        config.payouts.min_withdrawal,
    );
    let state = AppState {
        services,
        gateway: collaborators.gateway.clone(),
        webhook_secret: Arc::from(config.razorpay.webhook_secret.as_str()),
    };

    bootstrap::serve("CreatorSettlement", app(state), config.server.port).await?;

    // The router (and every sender it held) is gone, so the workers drain and stop.
    workers.shutdown().await;
    Ok(())
}
