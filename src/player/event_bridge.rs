use std::sync::Arc;

use tracing::debug;

use super::lifecycle::ManagedExtractor;
use crate::extractor::{EventKind, ExtractorEvent};
use crate::reactive::Subscription;

/// Event subscriptions scoped to one extractor
///
/// Listeners stay attached for as long as the bridge lives. The player keeps one bridge
/// per live extractor and drops it before that extractor is disposed, so events from a
/// retired extractor never reach the player.
pub struct EventBridge {
    extractor: Arc<ManagedExtractor>,
    subscriptions: Vec<Subscription>,
}

impl EventBridge {
    pub fn new(extractor: &Arc<ManagedExtractor>) -> Self {
        Self {
            extractor: extractor.clone(),
            subscriptions: Vec::with_capacity(3),
        }
    }

    /// Attach `listener` to events of `kind`
    pub fn listen<F>(&mut self, kind: EventKind, listener: F) -> &mut Self
    where
        F: Fn(&ExtractorEvent) + Send + Sync + 'static,
    {
        let subscription = self.extractor.listen(
            kind,
            Arc::new(move |event: &ExtractorEvent| {
                if event.kind() == kind {
                    listener(event);
                }
            }),
        );
        self.subscriptions.push(subscription);
        self
    }

    /// Generation of the extractor this bridge listens to
    pub fn generation(&self) -> u64 {
        self.extractor.generation()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Detach every listener now
    pub fn release(&mut self) {
        if !self.subscriptions.is_empty() {
            debug!(
                "Detaching {} listener(s) from extractor #{}",
                self.subscriptions.len(),
                self.extractor.generation()
            );
            self.subscriptions.clear();
        }
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.release();
    }
}
