use std::sync::Arc;

use parking_lot::RwLock;

use super::subscription::{Listeners, Subscription};
use super::{ChangeNotifier, Observable};

type ValueListener<T> = dyn Fn(&T) + Send + Sync;

/// An externally mutable value whose assignments notify subscribers
///
/// Cloning the handle shares the same underlying value. Listeners run synchronously on
/// the thread that assigned the value, after the write lock has been released, so a
/// listener may freely read the value again.
pub struct SharedValue<T> {
    inner: Arc<SharedInner<T>>,
}

struct SharedInner<T> {
    value: RwLock<T>,
    listeners: Arc<Listeners<ValueListener<T>>>,
}

impl<T> Clone for SharedValue<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone + Send + Sync + 'static> SharedValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                value: RwLock::new(value),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Replace the value and notify every subscriber
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.notify();
    }

    /// Mutate the value in place and notify every subscriber
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.write());
        self.notify();
    }

    /// Replace the value without notifying anyone
    ///
    /// Lets an owner update the value while holding its own locks and call
    /// [`notify`](Self::notify) once they are released.
    pub fn replace_quietly(&self, value: T) -> T {
        std::mem::replace(&mut *self.inner.value.write(), value)
    }

    /// Call `listener` with the new value after every assignment
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(listener))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Whether both handles point at the same value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run every subscriber against the current value
    pub fn notify(&self) {
        let listeners = self.inner.listeners.snapshot();
        if listeners.is_empty() {
            return;
        }
        let value = self.get();
        for listener in listeners {
            listener(&value);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable for SharedValue<T> {
    fn observe(&self, listener: ChangeNotifier) -> Subscription {
        self.subscribe(move |_| listener())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SharedValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedValue").field(&*self.inner.value.read()).finish()
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for SharedValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
