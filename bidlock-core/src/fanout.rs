//! Best-effort broadcast of [`AuctionEvent`]s.
//!
//! Every subscriber reads from a bounded mailbox with overflow enabled: when a
//! slow subscriber falls `capacity` events behind, the oldest events are
//! dropped instead of blocking the publisher.

use async_broadcast::{InactiveReceiver, Receiver, RecvError, Sender, TryRecvError, TrySendError};
use tracing::{debug, trace, warn};

use crate::types::AuctionEvent;

pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct Fanout {
    sender: Sender<AuctionEvent>,
    // Keeps the channel open while nobody is subscribed
    _idle: InactiveReceiver<AuctionEvent>,
}

impl Fanout {
    pub fn new(capacity: usize) -> Self {
        let (mut sender, receiver) = async_broadcast::broadcast(capacity.max(1));
        sender.set_overflow(true);
        Self {
            sender,
            _idle: receiver.deactivate(),
        }
    }

    /// A subscription that sees every event published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.new_receiver(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Never blocks and never fails the caller.
    pub fn publish(&self, event: AuctionEvent) {
        match self.sender.try_broadcast(event) {
            Ok(None) => {}
            Ok(Some(dropped)) => {
                debug!(item_id = %dropped.item_id(), "Mailbox full, dropped oldest event");
            }
            Err(TrySendError::Inactive(event)) => {
                trace!(item_id = %event.item_id(), "No subscribers, event dropped");
            }
            Err(TrySendError::Full(event)) => {
                debug!(item_id = %event.item_id(), "Mailbox full, event dropped");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(item_id = %event.item_id(), "Fanout closed, event dropped");
            }
        }
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

pub struct Subscription {
    receiver: Receiver<AuctionEvent>,
}

impl Subscription {
    /// Waits for the next event. `None` once the fanout is gone.
    pub async fn recv(&mut self) -> Option<AuctionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Overflowed(skipped)) => {
                    debug!(skipped, "Subscriber lagged, events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The next queued event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<AuctionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Overflowed(skipped)) => {
                    debug!(skipped, "Subscriber lagged, events skipped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Everything queued right now.
    pub fn drain(&mut self) -> Vec<AuctionEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
