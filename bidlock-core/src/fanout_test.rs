#[cfg(test)]
mod tests {
    use crate::fanout::Fanout;
    use crate::types::AuctionEvent;

    fn bid(amount: f64) -> AuctionEvent {
        AuctionEvent::BidAccepted {
            item_id: "item1".to_string(),
            bidder_id: "alice".to_string(),
            amount,
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_a_noop() {
        let fanout = Fanout::new(4);
        assert_eq!(fanout.subscriber_count(), 0);
        fanout.publish(bid(1.0));

        // A late subscriber only sees what comes after it
        let mut late = fanout.subscribe();
        assert_eq!(late.try_recv(), None);
        fanout.publish(bid(2.0));
        assert_eq!(late.try_recv(), Some(bid(2.0)));
    }

    #[test]
    fn test_every_subscriber_gets_every_event() {
        let fanout = Fanout::new(8);
        let mut first = fanout.subscribe();
        let mut second = fanout.subscribe();
        assert_eq!(fanout.subscriber_count(), 2);

        fanout.publish(bid(1.0));
        fanout.publish(bid(2.0));

        assert_eq!(first.drain(), vec![bid(1.0), bid(2.0)]);
        assert_eq!(second.drain(), vec![bid(1.0), bid(2.0)]);
    }

    #[test]
    fn test_slow_subscriber_loses_oldest_events() {
        let fanout = Fanout::new(2);
        let mut slow = fanout.subscribe();

        // Publishing past capacity never blocks
        for amount in 1..=5u32 {
            fanout.publish(bid(f64::from(amount)));
        }

        assert_eq!(slow.drain(), vec![bid(4.0), bid(5.0)]);
    }

    #[test]
    fn test_dropped_subscriber_does_not_block_others() {
        let fanout = Fanout::new(1);
        let gone = fanout.subscribe();
        let mut live = fanout.subscribe();
        drop(gone);
        assert_eq!(fanout.subscriber_count(), 1);

        fanout.publish(bid(1.0));
        fanout.publish(bid(2.0));
        assert_eq!(live.drain(), vec![bid(2.0)]);
    }

    #[test]
    fn test_clones_share_one_channel() {
        let fanout = Fanout::default();
        let publisher = fanout.clone();
        let mut sub = fanout.subscribe();

        publisher.publish(bid(3.0));
        assert_eq!(sub.try_recv(), Some(bid(3.0)));
    }
}
