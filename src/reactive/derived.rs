use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::shared::SharedValue;
use super::subscription::Subscription;
use super::{ChangeNotifier, Observable};

/// A value recomputed whenever one of its dependencies changes
///
/// The value is computed once on creation and then again on every dependency
/// notification, on the notifying thread. Notifications that arrive while a recompute is
/// already running are coalesced: the running recompute simply goes around once more and
/// reads the latest inputs, so stale inputs are never queued up behind it.
pub struct DerivedValue<T> {
    core: Arc<DeriveCore<T>>,
}

struct DeriveCore<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    output: SharedValue<T>,
    dirty: AtomicBool,
    running: AtomicBool,
    recomputes: AtomicU64,
    dependencies: Mutex<Vec<Subscription>>,
}

impl<T> Clone for DerivedValue<T> {
    fn clone(&self) -> Self {
        Self { core: self.core.clone() }
    }
}

impl<T: Clone + Send + Sync + 'static> DerivedValue<T> {
    /// Compute the value now and keep it current with `dependencies`
    pub fn new<F>(compute: F, dependencies: &[&dyn Observable]) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let initial = compute();
        let core = Arc::new(DeriveCore {
            compute: Box::new(compute),
            output: SharedValue::new(initial),
            dirty: AtomicBool::new(false),
            running: AtomicBool::new(false),
            recomputes: AtomicU64::new(1),
            dependencies: Mutex::new(Vec::with_capacity(dependencies.len())),
        });

        let subscriptions: Vec<Subscription> = dependencies
            .iter()
            .map(|dependency| {
                let core = Arc::downgrade(&core);
                dependency.observe(Arc::new(move || {
                    if let Some(core) = core.upgrade() {
                        core.invalidate();
                    }
                }))
            })
            .collect();
        *core.dependencies.lock() = subscriptions;

        Self { core }
    }

    /// Latest computed value
    ///
    /// A `set` on a dependency returns early if another thread is already recomputing,
    /// so right after that call this can still hold the value from before the write.
    pub fn get(&self) -> T {
        self.core.output.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.core.output.with(f)
    }

    /// Force a recompute as if a dependency had changed
    pub fn invalidate(&self) {
        self.core.invalidate();
    }

    /// Called with every freshly computed value
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.core.output.subscribe(listener)
    }

    /// Number of times the value has been computed, including the initial computation
    pub fn compute_count(&self) -> u64 {
        self.core.recomputes.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + Sync + 'static> DeriveCore<T> {
    fn invalidate(&self) {
        self.dirty.store(true, Ordering::SeqCst);

        loop {
            if self
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                // The thread that owns the recompute will observe `dirty`
                return;
            }

            {
                let _running = RunningGuard(&self.running);
                while self.dirty.swap(false, Ordering::SeqCst) {
                    let value = (self.compute)();
                    self.recomputes.fetch_add(1, Ordering::SeqCst);
                    self.output.set(value);
                }
            }

            // A notifier may have marked us dirty between the last swap and the release
            if !self.dirty.load(Ordering::SeqCst) {
                return;
            }
        }
    }
}

/// Clears the running flag even if `compute` unwinds.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<T: Clone + Send + Sync + 'static> Observable for DerivedValue<T> {
    fn observe(&self, listener: ChangeNotifier) -> Subscription {
        self.core.output.observe(listener)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for DerivedValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedValue")
            .field("value", &self.core.output)
            .field("recomputes", &self.core.recomputes.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_recomputes_on_each_dependency() {
        let time = SharedValue::new(1000.0_f64);
        let scale = SharedValue::new(1.0_f64);
        let (t, s) = (time.clone(), scale.clone());
        let derived = DerivedValue::new(move || t.get() * s.get(), &[&time, &scale]);

        assert_eq!(derived.get(), 1000.0);
        time.set(2000.0);
        assert_eq!(derived.get(), 2000.0);
        scale.set(0.5);
        assert_eq!(derived.get(), 1000.0);
        assert_eq!(derived.compute_count(), 3);
    }

    #[test]
    fn test_chained_derived_values() {
        let base = SharedValue::new(2);
        let b = base.clone();
        let doubled = DerivedValue::new(move || b.get() * 2, &[&base]);
        let d = doubled.clone();
        let plus_one = DerivedValue::new(move || d.get() + 1, &[&doubled]);

        base.set(10);
        assert_eq!(plus_one.get(), 21);
    }

    #[test]
    fn test_dropping_derived_unsubscribes() {
        let base = SharedValue::new(0);
        let b = base.clone();
        let derived = DerivedValue::new(move || b.get(), &[&base]);
        assert_eq!(base.subscriber_count(), 1);

        drop(derived);
        assert_eq!(base.subscriber_count(), 0);
    }

    #[test]
    fn test_panicking_compute_does_not_wedge() {
        let base = SharedValue::new(0);
        let b = base.clone();
        let derived = DerivedValue::new(
            move || {
                let v = b.get();
                if v == 1 {
                    panic!("boom");
                }
                v
            },
            &[&base],
        );

        let setter = base.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| setter.set(1)));
        assert!(result.is_err());

        base.set(2);
        assert_eq!(derived.get(), 2);
    }

    #[test]
    fn test_concurrent_notifications_settle_on_latest() {
        let base = SharedValue::new(0_u64);
        let b = base.clone();
        let derived = DerivedValue::new(move || b.get(), &[&base]);

        let writers: Vec<_> = (1..=4)
            .map(|n| {
                let base = base.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        base.set(n * 1000 + i);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        base.set(42);
        assert_eq!(derived.get(), 42);
        // Coalescing never runs more computations than there were notifications
        assert!(derived.compute_count() <= 1 + 1000 + 1);
    }
}
