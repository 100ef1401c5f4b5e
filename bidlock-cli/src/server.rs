use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::Notify;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;

use bidlock_core::coordinator::AuctionCoordinator;
use bidlock_core::error::AuctionError;
use bidlock_core::fanout::Subscription;
use bidlock_core::wire::Notification;

use crate::handlers::*;
use crate::storage::{blocking, open_coordinator};
use crate::AuctionArgs;

/// Requests served at once; each may hold a blocking worker while it waits on the lock.
const MAX_IN_FLIGHT: usize = 64;

/// Pause between closing the auction and exiting, so the final notification gets out.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub struct ServerState {
    coordinator: Arc<AuctionCoordinator>,
    product_id: String,
    shutdown: Notify,
    store_failed: AtomicBool,
}

pub type AppState = Arc<ServerState>;

impl ServerState {
    /// Store failures are fatal: stop serving and let the supervisor restart us.
    fn record_failure(&self, error: &AuctionError) {
        if error.is_fatal() {
            tracing::error!(error = %error, "Store failure, shutting down");
            self.store_failed.store(true, Ordering::SeqCst);
            self.shutdown.notify_one();
        }
    }
}

pub async fn run(
    host: &str,
    port: u16,
    auction: AuctionArgs,
    description: String,
    duration: Duration,
) -> anyhow::Result<()> {
    let coordinator = Arc::new(open_coordinator(&auction)?);
    let state: AppState = Arc::new(ServerState {
        coordinator: coordinator.clone(),
        product_id: auction.product_id.clone(),
        shutdown: Notify::new(),
        store_failed: AtomicBool::new(false),
    });

    tokio::spawn(log_notifications(coordinator.subscribe()));

    // Another server sharing the store may already have opened it
    let product = auction.product_id.clone();
    match blocking(&coordinator, move |c| c.open(&product, &description)).await {
        Ok(record) => tracing::info!(item_id = %record.item_id, "🔨 Auction started"),
        Err(e) if e.is_fatal() => return Err(e).context("Failed to open auction"),
        Err(e) => tracing::warn!(error = %e, "Auction not started by this server"),
    }

    tokio::spawn(close_when_due(state.clone(), duration));
    tokio::spawn(evict_periodically(state.clone(), auction.lock_options().ttl));

    let app = Router::new()
        .route("/health", get(health))
        .route("/commands", post(post_command))
        .route("/auctions/{id}", get(get_auction))
        .route("/evict", post(evict_expired))
        .layer(ConcurrencyLimitLayer::new(MAX_IN_FLIGHT))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let addr = format!("{}:{}", host, port);
    tracing::info!(
        product_id = %auction.product_id,
        duration_secs = duration.as_secs(),
        "🔒 bidlock server starting on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let signal_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal_state.shutdown.notified() => {}
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
            }
        })
        .await
        .context("Server error")?;

    if state.store_failed.load(Ordering::SeqCst) {
        anyhow::bail!("Stopped after a store failure");
    }
    Ok(())
}

// ─── Background Tasks ───────────────────────────────────────────────────────

async fn log_notifications(mut events: Subscription) {
    while let Some(event) = events.recv().await {
        let notification = Notification::from(&event);
        tracing::info!(
            payload = %notification.to_json(),
            "[NOTIFICAÇÃO] {}",
            notification.mensagem()
        );
    }
}

async fn close_when_due(state: AppState, duration: Duration) {
    tokio::time::sleep(duration).await;
    tracing::info!("⏰ Auction time is up, closing");

    let item_id = state.product_id.clone();
    match blocking(&state.coordinator, move |c| c.close(&item_id)).await {
        Ok(Some(record)) => tracing::info!(
            winner = record.current_winner.as_deref().unwrap_or("none"),
            final_bid = record.current_bid,
            "Auction finished"
        ),
        Ok(None) => tracing::info!("Auction was already closed"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to close auction");
            state.record_failure(&e);
        }
    }

    tokio::time::sleep(SHUTDOWN_GRACE).await;
    state.shutdown.notify_one();
}

async fn evict_periodically(state: AppState, every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
    loop {
        ticker.tick().await;
        let coordinator = state.coordinator.clone();
        match tokio::task::spawn_blocking(move || coordinator.locks().evict_expired()).await {
            Ok(Ok(0)) => {}
            Ok(Ok(evicted)) => tracing::info!(evicted, "Expired locks evicted"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Lock eviction failed"),
            Err(e) => tracing::warn!(error = %e, "Lock eviction task failed"),
        }
    }
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        product_id: state.product_id.clone(),
        subscribers: state.coordinator.fanout().subscriber_count(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Body is an inbound wire command; a missing `productId` means this server's product.
async fn post_command(
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, Json<ApiResponse<CommandResponse>>) {
    let fallback = state.product_id.clone();
    let result = blocking(&state.coordinator, move |c| {
        c.handle_message(&body, Some(&fallback))
    })
    .await;

    match result {
        Ok(Some(reply)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(CommandResponse::from(&reply))),
        ),
        Ok(None) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::ok(CommandResponse::ignored())),
        ),
        Err(e) => {
            state.record_failure(&e);
            (status_for(&e), Json(ApiResponse::from_error(&e)))
        }
    }
}

async fn get_auction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse<AuctionView>>) {
    let lookup = id.clone();
    match blocking(&state.coordinator, move |c| c.snapshot(&lookup)).await {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(AuctionView::from(&record))),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!("Auction '{}' not found", id))),
        ),
        Err(e) => {
            state.record_failure(&e);
            (status_for(&e), Json(ApiResponse::from_error(&e)))
        }
    }
}

async fn evict_expired(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<EvictResponse>>) {
    let evicted = blocking(&state.coordinator, |c| Ok(c.locks().evict_expired()?)).await;
    match evicted {
        Ok(evicted) => {
            tracing::info!(evicted, "Expired locks evicted");
            (StatusCode::OK, Json(ApiResponse::ok(EvictResponse { evicted })))
        }
        Err(e) => {
            state.record_failure(&e);
            (status_for(&e), Json(ApiResponse::from_error(&e)))
        }
    }
}
