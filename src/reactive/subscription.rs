use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// RAII token for a registered listener
///
/// The listener stays registered for as long as the token is alive. Dropping the token,
/// or calling [`Subscription::unsubscribe`], removes it.
#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a token that runs `release` exactly once when dropped
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { release: Some(Box::new(release)) }
    }

    /// A token that is not attached to anything
    pub fn detached() -> Self {
        Self { release: None }
    }

    /// Remove the listener now
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.release.is_some())
            .finish()
    }
}

/// Registry of listeners shared by values and event emitters
///
/// Listeners are handed out as a snapshot so a listener may unsubscribe itself, or
/// register new listeners, while a notification is in progress.
pub(crate) struct Listeners<F: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Arc<F>)>>,
}

impl<F: ?Sized + Send + Sync + 'static> Listeners<F> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn add(self: &Arc<Self>, listener: Arc<F>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, listener));

        let registry = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })
    }

    fn remove(&self, id: u64) {
        self.entries.lock().retain(|(entry_id, _)| *entry_id != id);
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries.lock().iter().map(|(_, listener)| listener.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_drop_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(subscription);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_removed_on_unsubscribe() {
        let listeners: Arc<Listeners<dyn Fn() + Send + Sync>> = Listeners::new();
        let first = listeners.add(Arc::new(|| {}));
        let _second = listeners.add(Arc::new(|| {}));
        assert_eq!(listeners.len(), 2);

        first.unsubscribe();
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_token_outliving_registry_is_harmless() {
        let listeners: Arc<Listeners<dyn Fn() + Send + Sync>> = Listeners::new();
        let subscription = listeners.add(Arc::new(|| {}));
        drop(listeners);
        drop(subscription);
    }
}
