use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::trace;

use crate::error::ExtractorError;
use crate::reactive::subscription::{Listeners, Subscription};

/// Named extractor events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Complete,
    Error,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
        }
    }
}

/// An event together with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorEvent {
    Ready,
    Complete,
    Error(ExtractorError),
}

impl ExtractorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ExtractorEvent::Ready => EventKind::Ready,
            ExtractorEvent::Complete => EventKind::Complete,
            ExtractorEvent::Error(_) => EventKind::Error,
        }
    }
}

pub type EventListener = Arc<dyn Fn(&ExtractorEvent) + Send + Sync>;

type Registry = Listeners<dyn Fn(&ExtractorEvent) + Send + Sync>;

/// Listener registry for the three extractor events
///
/// Deliveries are serialized: an event emitted from one thread is fully delivered before
/// an event emitted from another thread starts, so listeners observe events in emission
/// order. A listener may emit, subscribe, or unsubscribe re-entrantly.
pub struct EventEmitter {
    ready: Arc<Registry>,
    complete: Arc<Registry>,
    error: Arc<Registry>,
    delivery: ReentrantMutex<()>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            ready: Listeners::new(),
            complete: Listeners::new(),
            error: Listeners::new(),
            delivery: ReentrantMutex::new(()),
        }
    }

    fn registry(&self, kind: EventKind) -> &Arc<Registry> {
        match kind {
            EventKind::Ready => &self.ready,
            EventKind::Complete => &self.complete,
            EventKind::Error => &self.error,
        }
    }

    pub fn add_listener(&self, kind: EventKind, listener: EventListener) -> Subscription {
        self.registry(kind).add(listener)
    }

    /// Deliver `event` to every listener registered for its kind
    pub fn emit(&self, event: ExtractorEvent) {
        let _delivery = self.delivery.lock();
        let listeners = self.registry(event.kind()).snapshot();
        trace!("Emitting '{}' to {} listener(s)", event.kind().name(), listeners.len());
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry(kind).len()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_events_reach_matching_listeners_only() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _ready = emitter.add_listener(
            EventKind::Ready,
            Arc::new(move |event| sink.lock().push(event.kind())),
        );

        emitter.emit(ExtractorEvent::Ready);
        emitter.emit(ExtractorEvent::Complete);

        assert_eq!(*seen.lock(), vec![EventKind::Ready]);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_delivery() {
        let emitter = Arc::new(EventEmitter::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let (slot_in, calls_in) = (slot.clone(), calls.clone());
        let subscription = emitter.add_listener(
            EventKind::Complete,
            Arc::new(move |_| {
                *calls_in.lock() += 1;
                slot_in.lock().take();
            }),
        );
        *slot.lock() = Some(subscription);

        emitter.emit(ExtractorEvent::Complete);
        emitter.emit(ExtractorEvent::Complete);

        assert_eq!(*calls.lock(), 1);
        assert_eq!(emitter.listener_count(EventKind::Complete), 0);
    }

    #[test]
    fn test_error_payload_is_delivered() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let _error = emitter.add_listener(
            EventKind::Error,
            Arc::new(move |event| {
                if let ExtractorEvent::Error(error) = event {
                    *sink.lock() = Some(error.clone());
                }
            }),
        );

        emitter.emit(ExtractorEvent::Error(ExtractorError::Disposed));
        assert_eq!(*seen.lock(), Some(ExtractorError::Disposed));
    }
}
