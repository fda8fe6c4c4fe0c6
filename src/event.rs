use crate::frame::Frame;
use log::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Notification delivered to subscribers.
#[derive(Debug, Clone)]
pub enum Event {
    Init,
    Connected,
    Disconnected,
    Exit,
    Frame(Arc<Frame>),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Init => EventKind::Init,
            Event::Connected => EventKind::Connected,
            Event::Disconnected => EventKind::Disconnected,
            Event::Exit => EventKind::Exit,
            Event::Frame(_) => EventKind::Frame,
        }
    }

    pub fn frame(&self) -> Option<&Arc<Frame>> {
        match self {
            Event::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    Connected,
    Disconnected,
    Exit,
    Frame,
}

pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Per-controller publish/subscribe registry. Delivery is synchronous and
/// in registration order; there is no queuing, an event with no subscribers
/// is simply discarded.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<(EventKind, Handler)>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        EventDispatcher {
            listeners: Vec::new(),
        }
    }

    /// Registers a handler for one event kind. Registering the same handler
    /// (by identity) for the same kind twice is a no-op.
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) {
        let already_registered = self
            .listeners
            .iter()
            .any(|(registered_kind, registered)| {
                *registered_kind == kind && Arc::ptr_eq(registered, &handler)
            });
        if !already_registered {
            self.listeners.push((kind, handler));
        }
    }

    /// Removes every registration matching the pair. Unknown pairs are a
    /// no-op.
    pub fn unsubscribe(&mut self, kind: EventKind, handler: &Handler) {
        self.listeners.retain(|(registered_kind, registered)| {
            *registered_kind != kind || !Arc::ptr_eq(registered, handler)
        });
    }

    /// Delivers the event to every matching handler. A panicking handler is
    /// logged and does not stop delivery to the handlers after it.
    pub fn publish(&self, event: &Event) {
        let kind = event.kind();
        for (registered_kind, handler) in &self.listeners {
            if *registered_kind != kind {
                continue;
            }
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                warn!(
                    "event handler panicked during {:?} delivery: {}",
                    kind,
                    panic_message(&payload)
                );
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting_handler(counter: Arc<AtomicUsize>) -> Handler {
        Arc::new(move |_event: &Event| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for label in 1..=3 {
            let order = order.clone();
            dispatcher.subscribe(
                EventKind::Connected,
                Arc::new(move |_event: &Event| order.lock().unwrap().push(label)),
            );
        }
        dispatcher.publish(&Event::Connected);
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_subscribe_is_noop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter.clone());
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(EventKind::Init, handler.clone());
        dispatcher.subscribe(EventKind::Init, handler.clone());
        assert_eq!(dispatcher.subscriber_count(), 1);
        // same handler under a different kind is a distinct registration
        dispatcher.subscribe(EventKind::Exit, handler);
        assert_eq!(dispatcher.subscriber_count(), 2);
        dispatcher.publish(&Event::Init);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter.clone());
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(EventKind::Disconnected, handler.clone());
        dispatcher.unsubscribe(EventKind::Disconnected, &handler);
        // removing again is a no-op, not an error
        dispatcher.unsubscribe(EventKind::Disconnected, &handler);
        dispatcher.publish(&Event::Disconnected);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_only_matching_kind_is_delivered() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(EventKind::Exit, counting_handler(counter.clone()));
        dispatcher.publish(&Event::Connected);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        dispatcher.publish(&Event::Exit);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_delivery() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(
            EventKind::Frame,
            Arc::new(|_event: &Event| panic!("handler failure")),
        );
        dispatcher.subscribe(EventKind::Frame, counting_handler(counter.clone()));
        dispatcher.publish(&Event::Frame(Arc::new(Frame::invalid())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
