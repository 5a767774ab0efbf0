use std::sync::Arc;

use tokio::sync::broadcast;

use podium_types::events::GatewayEvent;

/// Capacity of the fan-out buffer. A receiver that falls this far behind
/// starts lagging (it skips events; it is never allowed to block a sender).
const BROADCAST_CAPACITY: usize = 1024;

/// The live-update hub. Cloned handles share one broadcast channel; the
/// write path calls [`Dispatcher::broadcast`] fire-and-forget, and each
/// WebSocket connection holds a receiver from [`Dispatcher::subscribe`].
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GatewayEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to live events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all currently connected subscribers.
    /// Never fails and never blocks: with no subscribers the event is
    /// simply dropped.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let dispatcher = Dispatcher::new();
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();

        dispatcher.broadcast(GatewayEvent::UsersChanged);

        assert!(matches!(rx1.recv().await, Ok(GatewayEvent::UsersChanged)));
        assert!(matches!(rx2.recv().await, Ok(GatewayEvent::UsersChanged)));
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.subscriber_count(), 0);
        // Must not panic or error.
        dispatcher.broadcast(GatewayEvent::UsersChanged);
    }

    #[tokio::test]
    async fn late_subscriber_sees_only_later_events() {
        let dispatcher = Dispatcher::new();
        let mut early = dispatcher.subscribe();

        dispatcher.broadcast(GatewayEvent::UsersChanged);
        let mut late = dispatcher.subscribe();
        dispatcher.broadcast(GatewayEvent::LeaderboardUpdate { entries: vec![] });

        assert!(matches!(early.recv().await, Ok(GatewayEvent::UsersChanged)));
        assert!(matches!(
            late.recv().await,
            Ok(GatewayEvent::LeaderboardUpdate { .. })
        ));
    }
}
