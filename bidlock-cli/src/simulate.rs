use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinSet;

use bidlock_core::coordinator::AuctionCoordinator;
use bidlock_core::fanout::Subscription;
use bidlock_core::types::{Amount, AuctionEvent, BidCommand, DEFAULT_DESCRIPTION};
use bidlock_core::wire::Notification;

use crate::storage::{blocking, open_coordinator};
use crate::AuctionArgs;

pub async fn run(
    auction: AuctionArgs,
    bidders: usize,
    interval: Duration,
    duration: Duration,
) -> anyhow::Result<()> {
    anyhow::ensure!(bidders > 0, "At least one bidder is required");

    let coordinator = Arc::new(open_coordinator(&auction)?);
    let product_id = auction.product_id.clone();
    let mut final_events = coordinator.subscribe();
    let (stop_tx, stop_rx) = watch::channel(false);

    // Bidders subscribe before the auction opens so every one sees `inicio`
    let mut tasks = JoinSet::new();
    for i in 1..=bidders {
        tasks.spawn(bid_loop(
            coordinator.clone(),
            coordinator.subscribe(),
            product_id.clone(),
            format!("cliente_{}", i),
            interval,
            stop_rx.clone(),
        ));
    }

    let item = product_id.clone();
    blocking(&coordinator, move |c| c.open(&item, DEFAULT_DESCRIPTION))
        .await
        .context("Failed to open auction")?;
    tracing::info!(product_id = %product_id, bidders, "🔨 Simulation started");

    tokio::time::sleep(duration).await;
    let _ = stop_tx.send(true);

    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failure = Some(e),
            Err(e) => failure = Some(anyhow::anyhow!("Bidder task failed: {}", e)),
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    let item = product_id.clone();
    blocking(&coordinator, move |c| c.close(&item))
        .await
        .context("Failed to close auction")?;

    let closed = final_events
        .drain()
        .into_iter()
        .find(|event| matches!(event, AuctionEvent::Closed { .. }));
    match closed {
        Some(event) => println!("{}", Notification::from(&event).to_json()),
        None => tracing::warn!("Auction closed without a final notification"),
    }
    Ok(())
}

/// One simulated bidder: follows the current bid from notifications and
/// outbids it by a random increment on every tick.
async fn bid_loop(
    coordinator: Arc<AuctionCoordinator>,
    mut events: Subscription,
    product_id: String,
    name: String,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut current: Amount = 0.0;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = stop.changed() => return Ok(()),
            event = events.recv() => match event {
                Some(AuctionEvent::Started { current_bid, .. }) => current = current_bid,
                Some(AuctionEvent::BidAccepted { amount, .. }) => current = amount,
                Some(_) => {}
                None => return Ok(()),
            },
            _ = ticker.tick() => {
                let amount = current + Amount::from(fastrand::u32(1..=100));
                let bid = BidCommand::new(product_id.as_str(), name.as_str(), amount);
                match blocking(&coordinator, move |c| c.submit_bid(&bid)).await {
                    Ok(_) => tracing::info!(bidder = %name, amount, "Bid placed"),
                    Err(e) if e.is_fatal() => return Err(e).context("Bidder stopped"),
                    Err(e) => tracing::debug!(bidder = %name, amount, error = %e, "Bid not taken"),
                }
            }
        }
    }
}
