// Scripted extractor doubles shared by the unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::composition::{CompositionRef, FrameSet, VideoComposition, VideoFrame};
use crate::extractor::{EventEmitter, EventKind, EventListener, ExtractorEvent, ExtractorFactory, FramesExtractor};
use crate::reactive::Subscription;

/// Records every call and emits events only when told to
pub(crate) struct MockExtractor {
    composition: VideoComposition,
    events: EventEmitter,
    time_ms: Mutex<f64>,
    looping: AtomicBool,
    playing: AtomicBool,
    disposed: AtomicBool,
    misuse: AtomicBool,
    prepare_response: Mutex<Option<ExtractorEvent>>,
    prepares: AtomicUsize,
    disposals: AtomicUsize,
    plays: AtomicUsize,
    decodes: AtomicUsize,
}

impl MockExtractor {
    pub(crate) fn new() -> Self {
        Self::with_composition(VideoComposition::new(10.0))
    }

    pub(crate) fn with_composition(composition: VideoComposition) -> Self {
        Self {
            composition,
            events: EventEmitter::new(),
            time_ms: Mutex::new(0.0),
            looping: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            misuse: AtomicBool::new(false),
            prepare_response: Mutex::new(None),
            prepares: AtomicUsize::new(0),
            disposals: AtomicUsize::new(0),
            plays: AtomicUsize::new(0),
            decodes: AtomicUsize::new(0),
        }
    }

    /// Emit `event` synchronously from inside `prepare`
    pub(crate) fn respond_to_prepare(&self, event: Option<ExtractorEvent>) {
        *self.prepare_response.lock() = event;
    }

    pub(crate) fn emit(&self, event: ExtractorEvent) {
        self.events.emit(event);
    }

    pub(crate) fn set_time(&self, time_ms: f64) {
        *self.time_ms.lock() = time_ms;
    }

    pub(crate) fn prepare_count(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub(crate) fn dispose_count(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    pub(crate) fn play_count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub(crate) fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub(crate) fn is_looping_flag(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    /// Whether anything touched the extractor after `dispose`
    pub(crate) fn decoded_after_dispose(&self) -> bool {
        self.misuse.load(Ordering::SeqCst)
    }

    pub(crate) fn listener_count(&self, kind: EventKind) -> usize {
        self.events.listener_count(kind)
    }

    fn touch(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            self.misuse.store(true, Ordering::SeqCst);
        }
    }
}

impl FramesExtractor for MockExtractor {
    fn prepare(&self) {
        self.touch();
        self.prepares.fetch_add(1, Ordering::SeqCst);
        let response = self.prepare_response.lock().clone();
        if let Some(event) = response {
            self.events.emit(event);
        }
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.disposals.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    fn set_looping(&self, looping: bool) {
        self.touch();
        self.looping.store(looping, Ordering::SeqCst);
    }

    fn play(&self) {
        self.touch();
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.touch();
        self.playing.store(false, Ordering::SeqCst);
    }

    fn seek_to(&self, time_ms: f64) {
        self.touch();
        self.set_time(time_ms);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn current_time(&self) -> f64 {
        *self.time_ms.lock()
    }

    fn decode_composition_frames(&self) -> FrameSet {
        self.touch();
        self.decodes.fetch_add(1, Ordering::SeqCst);
        let time = *self.time_ms.lock() / 1000.0;
        self.composition
            .items_at(time)
            .map(|item| {
                let shade = (item.source_time_at(time) * 10.0) as u8;
                (item.id.clone(), VideoFrame::solid(item.id.clone(), item.source_time_at(time), 2, 2, [shade, 0, 0, 255]))
            })
            .collect()
    }

    fn add_listener(&self, kind: EventKind, listener: EventListener) -> Subscription {
        self.events.add_listener(kind, listener)
    }
}

/// Hands out [`MockExtractor`]s and keeps them for inspection
pub(crate) struct MockFactory {
    created: Mutex<Vec<Arc<MockExtractor>>>,
    prepare_response: Mutex<Option<ExtractorEvent>>,
}

impl MockFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            prepare_response: Mutex::new(None),
        })
    }

    /// Every extractor created from now on emits `event` while preparing
    pub(crate) fn respond_to_prepare(&self, event: Option<ExtractorEvent>) {
        *self.prepare_response.lock() = event;
    }

    pub(crate) fn created(&self) -> Vec<Arc<MockExtractor>> {
        self.created.lock().clone()
    }

    pub(crate) fn last(&self) -> Option<Arc<MockExtractor>> {
        self.created.lock().last().cloned()
    }

    /// Extractors that have not been disposed
    pub(crate) fn live_count(&self) -> usize {
        self.created.lock().iter().filter(|mock| mock.dispose_count() == 0).count()
    }
}

impl ExtractorFactory for MockFactory {
    fn create(&self, composition: &CompositionRef) -> Arc<dyn FramesExtractor> {
        let mock = Arc::new(MockExtractor::with_composition((**composition).clone()));
        mock.respond_to_prepare(self.prepare_response.lock().clone());
        self.created.lock().push(mock.clone());
        mock
    }
}
