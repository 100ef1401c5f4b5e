use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncReadExt;

use bidlock_core::wire::Notification;

use crate::handlers::{ApiResponse, CommandResponse};
use crate::storage::{blocking, open_coordinator};
use crate::AuctionArgs;

/// Applies one command from stdin. Notifications it produced go to stdout one
/// per line, followed by the command's reply.
pub async fn run(auction: AuctionArgs) -> anyhow::Result<()> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("Failed to read command from stdin")?;

    let coordinator = Arc::new(open_coordinator(&auction)?);
    let mut events = coordinator.subscribe();

    let fallback = auction.product_id.clone();
    let result = blocking(&coordinator, move |c| {
        c.handle_message(raw.trim(), Some(&fallback))
    })
    .await;

    for event in events.drain() {
        println!("{}", Notification::from(&event).to_json());
    }

    let (response, failure) = match result {
        Ok(Some(reply)) => (ApiResponse::ok(CommandResponse::from(&reply)), None),
        Ok(None) => (ApiResponse::ok(CommandResponse::ignored()), None),
        Err(e) => (ApiResponse::from_error(&e), Some(e)),
    };
    println!("{}", serde_json::to_string(&response)?);

    match failure {
        Some(e) => Err(e).context("Command failed"),
        None => Ok(()),
    }
}
