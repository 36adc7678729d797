use anyhow::Context;
use innkeep_api::{app, AppState};
use innkeep_catalog::{PricingConfig, PricingEngine};
use innkeep_core::payment::PaymentGateway;
use innkeep_core::{BookingRepository, CatalogRepository};
use innkeep_notify::{
    DispatchSettings, HttpWebhookPublisher, LogFailureSink, LogMailer, NotificationDispatcher,
    RetryPolicy, TextReceiptRenderer, WebhookPublisher,
};
use innkeep_reservation::{MockPaymentGateway, PaymentOrchestrator, ReservationEngine, RetentionSweeper};
use innkeep_store::app_config::{Config, RetryConfig};
use innkeep_store::{DbClient, PgBookingRepository, PgCatalogRepository, StripeGateway};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "innkeep_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Innkeep API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let catalog: Arc<dyn CatalogRepository> = Arc::new(PgCatalogRepository::new(db.pool.clone()));
    let bookings: Arc<dyn BookingRepository> = Arc::new(PgBookingRepository::new(db.pool.clone()));

    let rules = &config.business_rules;
    let pricing = PricingEngine::new(
        catalog.clone(),
        PricingConfig {
            tax_rate: rules.tax_rate,
            service_fee_minor: rules.service_fee_minor,
            currency: rules.currency.clone(),
        },
    );

    let notifications = &config.notifications;
    let receipts = Arc::new(TextReceiptRenderer::new(rules.currency.clone()));
    let webhook = HttpWebhookPublisher::from_config(
        notifications.webhook_url.as_deref(),
        Duration::from_secs(notifications.webhook_timeout_seconds),
    )
    .context("Failed to build webhook client")?
    .map(|publisher| Arc::new(publisher) as Arc<dyn WebhookPublisher>);

    let dispatcher = NotificationDispatcher::new(
        receipts.clone(),
        Arc::new(LogMailer),
        webhook,
        Arc::new(LogFailureSink),
        retry_policy(&notifications.retry),
        DispatchSettings {
            hotel_name: notifications.hotel_name.clone(),
            email_from: notifications.email_from.clone(),
            currency: rules.currency.clone(),
        },
    );

    let engine = Arc::new(ReservationEngine::new(
        catalog,
        bookings.clone(),
        pricing,
        Arc::new(dispatcher),
    ));

    let gateway: Arc<dyn PaymentGateway> = if config.payment.secret_key.trim().is_empty() {
        tracing::warn!("No payment secret key configured, using the mock gateway");
        Arc::new(MockPaymentGateway::new())
    } else {
        Arc::new(StripeGateway::new(&config.payment)?)
    };
    let payments = Arc::new(
        PaymentOrchestrator::new(
            gateway,
            engine.clone(),
            config.payment.webhook_secret.clone(),
            config.payment.signature_tolerance_seconds,
        )
        .context("Invalid payment configuration")?,
    );

    let sweeper = Arc::new(
        RetentionSweeper::new(
            bookings,
            config.retention.window_days,
            Duration::from_secs(config.retention.sweep_interval_seconds),
        )
        .context("Invalid retention configuration")?,
    )
    .spawn();

    let app_state = AppState {
        engine,
        payments,
        receipts,
        hotel_name: notifications.hotel_name.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    sweeper.shutdown().await;
    Ok(())
}

fn retry_policy(retry: &RetryConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: retry.max_attempts,
        initial_delay: Duration::from_millis(retry.initial_delay_ms),
        max_delay: Duration::from_millis(retry.max_delay_ms),
        multiplier: retry.multiplier,
    }
}
