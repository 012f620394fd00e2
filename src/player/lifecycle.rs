use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::composition::{CompositionRef, FrameSet};
use crate::extractor::{EventKind, EventListener, ExtractorFactory, FramesExtractor};
use crate::reactive::Subscription;
use crate::scheduler::RenderScheduler;

/// An extractor owned by the player, with a disposal guard
///
/// Every use of the underlying extractor goes through a lease that counts in-flight
/// calls. Once [`dispose`](Self::dispose) has been requested no new lease is granted,
/// and the collaborator's own `dispose` runs exactly once, as soon as the last in-flight
/// call returns. A render pass that races with disposal therefore either finishes
/// against a still-live extractor or sees an empty frame set; it never reads from a
/// disposed one.
pub struct ManagedExtractor {
    generation: u64,
    composition: CompositionRef,
    inner: Arc<dyn FramesExtractor>,
    in_flight: AtomicUsize,
    disposing: AtomicBool,
    released: AtomicBool,
    prepared: AtomicBool,
}

/// Decrements the in-flight count and completes a deferred disposal.
struct Lease<'a>(&'a ManagedExtractor);

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 && self.0.disposing.load(Ordering::SeqCst) {
            self.0.release();
        }
    }
}

impl ManagedExtractor {
    pub(crate) fn new(generation: u64, composition: CompositionRef, inner: Arc<dyn FramesExtractor>) -> Self {
        Self {
            generation,
            composition,
            inner,
            in_flight: AtomicUsize::new(0),
            disposing: AtomicBool::new(false),
            released: AtomicBool::new(false),
            prepared: AtomicBool::new(false),
        }
    }

    /// Monotonic creation counter; unique per player
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn composition(&self) -> &CompositionRef {
        &self.composition
    }

    /// Whether disposal has been requested
    pub fn is_disposed(&self) -> bool {
        self.disposing.load(Ordering::SeqCst)
    }

    fn lease(&self) -> Option<Lease<'_>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let lease = Lease(self);
        if self.disposing.load(Ordering::SeqCst) {
            return None;
        }
        Some(lease)
    }

    /// Run `f` against the extractor unless it has been disposed
    pub(crate) fn with_live<R>(&self, f: impl FnOnce(&dyn FramesExtractor) -> R) -> Option<R> {
        let _lease = self.lease()?;
        Some(f(self.inner.as_ref()))
    }

    /// Frames at the extractor's current position; empty once disposed
    pub fn decode_frames(&self) -> FrameSet {
        self.with_live(|extractor| extractor.decode_composition_frames())
            .unwrap_or_default()
    }

    /// Issue the one-time `prepare` call
    pub(crate) fn prepare(&self) {
        if self.prepared.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.with_live(|extractor| extractor.prepare()) {
            Some(()) => debug!("Prepared extractor #{}", self.generation),
            None => debug!("Skipped preparing extractor #{}: already disposed", self.generation),
        }
    }

    pub(crate) fn listen(&self, kind: EventKind, listener: EventListener) -> Subscription {
        self.inner.add_listener(kind, listener)
    }

    /// Request disposal; returns `false` if it had already been requested
    pub(crate) fn dispose(&self) -> bool {
        if self.disposing.swap(true, Ordering::SeqCst) {
            return false;
        }
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            self.release();
        } else {
            trace!("Deferring disposal of extractor #{} until in-flight calls return", self.generation);
        }
        true
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.inner.dispose();
            info!("Disposed extractor #{}", self.generation);
        }
    }
}

impl std::fmt::Debug for ManagedExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedExtractor")
            .field("generation", &self.generation)
            .field("composition", &self.composition)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Hand `extractor` to the render context for its one-time preparation
pub(crate) fn dispatch_prepare(extractor: &Arc<ManagedExtractor>, scheduler: &dyn RenderScheduler) {
    debug!("Dispatching preparation of extractor #{}", extractor.generation());
    let extractor = extractor.clone();
    scheduler.dispatch(Box::new(move || extractor.prepare()));
}

/// Single-slot cache of the live extractor, keyed by `(composition, suspended)`
///
/// Observing the same key again reuses the cached extractor. Any other key disposes the
/// cached one first and then creates the replacement, so two live extractors never
/// coexist. A missing composition or a suspended player maps to an empty slot.
pub struct ExtractorSlot {
    factory: Arc<dyn ExtractorFactory>,
    entry: Option<SlotEntry>,
    next_generation: u64,
}

struct SlotEntry {
    composition: Option<CompositionRef>,
    suspended: bool,
    extractor: Option<Arc<ManagedExtractor>>,
}

impl ExtractorSlot {
    pub fn new(factory: Arc<dyn ExtractorFactory>) -> Self {
        Self {
            factory,
            entry: None,
            next_generation: 1,
        }
    }

    /// Whether the cached entry was built for this key
    pub fn is_current(&self, composition: Option<&CompositionRef>, suspended: bool) -> bool {
        self.entry
            .as_ref()
            .map(|entry| entry.suspended == suspended && entry.composition.as_ref() == composition)
            .unwrap_or(false)
    }

    /// Dispose the cached extractor and build the one for the new key
    ///
    /// `attach` sees a newly created extractor before anything else can use it.
    pub fn replace(
        &mut self,
        composition: Option<&CompositionRef>,
        suspended: bool,
        attach: impl FnOnce(&Arc<ManagedExtractor>),
    ) -> Option<Arc<ManagedExtractor>> {
        self.retire();

        let extractor = match composition {
            Some(composition) if !suspended => {
                let generation = self.next_generation;
                self.next_generation += 1;

                let extractor = Arc::new(ManagedExtractor::new(
                    generation,
                    composition.clone(),
                    self.factory.create(composition),
                ));
                info!("Created extractor #{} for composition {:?}", generation, composition);
                attach(&extractor);
                Some(extractor)
            }
            _ => {
                debug!("No extractor: composition present={}, suspended={}", composition.is_some(), suspended);
                None
            }
        };

        self.entry = Some(SlotEntry {
            composition: composition.cloned(),
            suspended,
            extractor: extractor.clone(),
        });
        extractor
    }

    /// Dispose whatever the slot holds and forget its key
    pub fn retire(&mut self) {
        if let Some(extractor) = self.entry.take().and_then(|entry| entry.extractor) {
            extractor.dispose();
        }
    }

    pub fn current(&self) -> Option<&Arc<ManagedExtractor>> {
        self.entry.as_ref().and_then(|entry| entry.extractor.as_ref())
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.current().map(|extractor| extractor.generation())
    }
}

impl Drop for ExtractorSlot {
    fn drop(&mut self) {
        self.retire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::VideoComposition;
    use crate::testing::{MockExtractor, MockFactory};

    fn composition() -> CompositionRef {
        VideoComposition::new(2.0).into()
    }

    #[test]
    fn test_same_key_reuses_extractor() {
        let factory = MockFactory::new();
        let mut slot = ExtractorSlot::new(factory.clone());
        let comp = composition();

        let first = slot.replace(Some(&comp), false, |_| {}).unwrap();
        assert!(slot.is_current(Some(&comp), false));
        assert!(!slot.is_current(Some(&composition()), false));
        assert!(!slot.is_current(Some(&comp), true));
        assert_eq!(slot.current_generation(), Some(first.generation()));
        assert_eq!(factory.created().len(), 1);
    }

    #[test]
    fn test_replace_disposes_previous_exactly_once() {
        let factory = MockFactory::new();
        let mut slot = ExtractorSlot::new(factory.clone());

        slot.replace(Some(&composition()), false, |_| {});
        slot.replace(Some(&composition()), false, |_| {});
        slot.replace(None, false, |_| {});
        slot.retire();

        let created = factory.created();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|mock| mock.dispose_count() == 1));
    }

    #[test]
    fn test_suspended_key_creates_nothing() {
        let factory = MockFactory::new();
        let mut slot = ExtractorSlot::new(factory.clone());

        assert!(slot.replace(Some(&composition()), true, |_| {}).is_none());
        assert!(factory.created().is_empty());
    }

    #[test]
    fn test_disposal_deferred_while_leased() {
        let mock = Arc::new(MockExtractor::new());
        let managed = Arc::new(ManagedExtractor::new(1, composition(), mock.clone()));

        let inner = managed.clone();
        let decoded = managed.with_live(move |_| {
            assert!(inner.dispose());
            inner.decode_frames()
        });

        assert!(decoded.unwrap().is_empty());
        assert_eq!(mock.dispose_count(), 1);
        assert!(!mock.decoded_after_dispose());
        assert!(!managed.dispose());
        assert_eq!(mock.dispose_count(), 1);
    }

    #[test]
    fn test_prepare_is_one_time_and_skipped_after_dispose() {
        let mock = Arc::new(MockExtractor::new());
        let managed = ManagedExtractor::new(1, composition(), mock.clone());
        managed.prepare();
        managed.prepare();
        assert_eq!(mock.prepare_count(), 1);

        let other = Arc::new(MockExtractor::new());
        let managed = ManagedExtractor::new(2, composition(), other.clone());
        managed.dispose();
        managed.prepare();
        assert_eq!(other.prepare_count(), 0);
    }
}
