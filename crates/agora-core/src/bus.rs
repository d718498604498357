use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{error, trace};

use crate::events::{AgoraEvent, EventFrame};

pub type ListenerId = u64;

/// Ordered fan-out of engine events to dynamically joining and leaving
/// listeners. `publish` serializes once and never blocks: a listener whose
/// bounded inbox is full is dropped after the publish pass, without
/// affecting delivery to anyone else.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
    capacity: usize,
}

struct BusInner {
    listeners: HashMap<ListenerId, mpsc::Sender<Arc<EventFrame>>>,
    next_id: ListenerId,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                listeners: HashMap::new(),
                next_id: 0,
            })),
            capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> EventListener {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, tx);
            id
        };
        trace!(listener = id, "bus subscribe");
        EventListener {
            id,
            rx,
            bus: self.clone(),
        }
    }

    /// Idempotent: unknown or already-removed ids are a no-op.
    pub fn unsubscribe(&self, id: ListenerId) {
        let removed = self.lock().listeners.remove(&id).is_some();
        if removed {
            trace!(listener = id, "bus unsubscribe");
        }
    }

    pub fn viewers(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn publish(&self, event: &AgoraEvent) {
        let frame = match event.to_frame() {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                error!(event = event.name(), error = %e, "failed to serialize event");
                return;
            }
        };

        let mut inner = self.lock();
        let mut dead = Vec::new();
        for (&id, tx) in &inner.listeners {
            match tx.try_send(Arc::clone(&frame)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => dead.push(id),
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(id),
            }
        }
        for id in dead {
            inner.listeners.remove(&id);
            trace!(listener = id, event = event.name(), "dropped stalled listener");
        }
    }
}

/// Listener handle backed by a bounded inbox. Dropping it unsubscribes.
pub struct EventListener {
    id: ListenerId,
    rx: mpsc::Receiver<Arc<EventFrame>>,
    bus: EventBus,
}

impl EventListener {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Next frame in publish order; `None` once this listener has been
    /// removed from the bus and its inbox is drained.
    pub async fn recv(&mut self) -> Option<Arc<EventFrame>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<EventFrame>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WordToken;

    fn word_event(i: usize) -> AgoraEvent {
        AgoraEvent::Word(WordToken {
            w: format!("w{i}"),
            i,
            of: 100,
        })
    }

    #[tokio::test]
    async fn listeners_receive_events_in_publish_order() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        for i in 0..5 {
            bus.publish(&word_event(i));
        }

        for listener in [&mut first, &mut second] {
            for i in 0..5 {
                let frame = listener.recv().await.unwrap();
                assert_eq!(frame.data, format!(r#"{{"w":"w{i}","i":{i},"of":100}}"#));
            }
        }
    }

    #[tokio::test]
    async fn stalled_listener_is_dropped_without_affecting_others() {
        let bus = EventBus::new(2);
        let mut healthy = bus.subscribe();
        let stalled = bus.subscribe();
        assert_eq!(bus.viewers(), 2);

        // The healthy listener drains its inbox; the stalled one never reads.
        bus.publish(&word_event(0));
        bus.publish(&word_event(1));
        assert!(healthy.recv().await.unwrap().data.contains("w0"));
        assert!(healthy.recv().await.unwrap().data.contains("w1"));

        // Third publish finds the stalled inbox full and removes it.
        bus.publish(&word_event(2));
        assert_eq!(bus.viewers(), 1);
        assert!(healthy.recv().await.unwrap().data.contains("w2"));

        // Delivery continues to the survivor.
        bus.publish(&word_event(3));
        assert!(healthy.recv().await.unwrap().data.contains("w3"));
        drop(stalled);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let bus = EventBus::new(4);
        let listener = bus.subscribe();
        let id = listener.id();
        assert_eq!(bus.viewers(), 1);

        bus.unsubscribe(id);
        bus.unsubscribe(id);
        assert_eq!(bus.viewers(), 0);
    }

    #[tokio::test]
    async fn dropping_listener_unsubscribes() {
        let bus = EventBus::new(4);
        let listener = bus.subscribe();
        assert_eq!(bus.viewers(), 1);
        drop(listener);
        assert_eq!(bus.viewers(), 0);
    }
}
