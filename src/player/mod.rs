//! # Composition Player
//!
//! Binds a reactive video composition to a frame extractor and exposes a continuously
//! updated drawing of the current frames.
//!
//! The player owns at most one live extractor. It is created when a composition is
//! present and no error is pending, disposed before any replacement is created, and
//! torn down with the player. The scene is a [`DerivedValue`] over the live extractor,
//! the shared playback time and the target size, so any of those changing redraws it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use composition_player::extractor::SoftwareExtractorFactory;
//! use composition_player::picture::{Rect, Size};
//! use composition_player::player::{draw_fn, CompositionPlayer, PlayerOptions};
//! use composition_player::reactive::SharedValue;
//! use composition_player::scheduler::InlineScheduler;
//!
//! let time = SharedValue::new(0.0);
//! let size = SharedValue::new(Size::new(640.0, 360.0));
//! let drawer = draw_fn(|canvas, info| {
//!     for frame in info.frames.values() {
//!         canvas.draw_frame(frame, Rect::new(0.0, 0.0, info.width, info.height));
//!     }
//! });
//!
//! let player = CompositionPlayer::new(
//!     PlayerOptions::new(drawer, size, time.clone()).auto_play(true),
//!     Arc::new(SoftwareExtractorFactory::default()),
//!     Arc::new(InlineScheduler),
//! );
//! time.set(1000.0);
//! let picture = player.current_scene().get();
//! # let _ = picture;
//! ```

pub mod event_bridge;
pub mod lifecycle;
pub mod recovery;
pub mod render;
pub mod transport;

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

pub use event_bridge::EventBridge;
pub use lifecycle::{ExtractorSlot, ManagedExtractor};
pub use recovery::{ErrorRecovery, RecoveryState, RecoveryTarget, RetryHandle};
pub use render::{draw_fn, DrawFrameInfo, FrameDrawer, HookedDrawer, SceneRenderer};
pub use transport::PlayerController;

use crate::composition::CompositionRef;
use crate::config::PlaybackIntent;
use crate::error::ExtractorError;
use crate::extractor::{EventKind, ExtractorEvent, ExtractorFactory};
use crate::picture::{Picture, Size};
use crate::reactive::{DerivedValue, SharedValue};
use crate::scheduler::RenderScheduler;
use transport::{TransportCommand, TransportSync};

type EventCallback = dyn Fn() + Send + Sync;
type ErrorCallback = dyn Fn(&ExtractorError, RetryHandle) + Send + Sync;

/// Optional lifecycle callbacks
///
/// Callbacks run on whichever thread the extractor emitted from and never while the
/// player holds its state lock, so they may call back into the player.
#[derive(Clone, Default)]
pub struct PlayerCallbacks {
    pub on_ready_to_play: Option<Arc<EventCallback>>,
    pub on_complete: Option<Arc<EventCallback>>,
    pub on_error: Option<Arc<ErrorCallback>>,
}

impl std::fmt::Debug for PlayerCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerCallbacks")
            .field("on_ready_to_play", &self.on_ready_to_play.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Everything needed to build a [`CompositionPlayer`]
pub struct PlayerOptions<D> {
    composition: Option<CompositionRef>,
    drawer: D,
    size: SharedValue<Size>,
    current_time: SharedValue<f64>,
    intent: PlaybackIntent,
    callbacks: PlayerCallbacks,
}

impl<D: FrameDrawer> PlayerOptions<D> {
    /// `current_time` is the shared playback position in milliseconds
    pub fn new(drawer: D, size: SharedValue<Size>, current_time: SharedValue<f64>) -> Self {
        Self {
            composition: None,
            drawer,
            size,
            current_time,
            intent: PlaybackIntent::default(),
            callbacks: PlayerCallbacks::default(),
        }
    }

    pub fn composition(mut self, composition: Option<CompositionRef>) -> Self {
        self.composition = composition;
        self
    }

    pub fn intent(mut self, intent: PlaybackIntent) -> Self {
        self.intent = intent;
        self
    }

    pub fn auto_play(mut self, auto_play: bool) -> Self {
        self.intent.auto_play = auto_play;
        self
    }

    pub fn looping(mut self, is_looping: bool) -> Self {
        self.intent.is_looping = is_looping;
        self
    }

    pub fn on_ready_to_play<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_ready_to_play = Some(Arc::new(callback));
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_complete = Some(Arc::new(callback));
        self
    }

    /// Called once per failed extractor with a handle that leaves the suspended state
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ExtractorError, RetryHandle) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(callback));
        self
    }
}

struct PlayerState {
    composition: Option<CompositionRef>,
    intent: PlaybackIntent,
    recovery: ErrorRecovery,
    slot: ExtractorSlot,
    bridge: Option<EventBridge>,
    transport: TransportSync,
    torn_down: bool,
}

/// Side effects of a state change, run after the state lock is released
#[derive(Default)]
struct Effects {
    prepare: Option<Arc<ManagedExtractor>>,
    transport: Vec<TransportCommand>,
    publish: bool,
}

struct PlayerInner {
    self_ref: Weak<PlayerInner>,
    state: Mutex<PlayerState>,
    active: SharedValue<Option<Arc<ManagedExtractor>>>,
    scheduler: Arc<dyn RenderScheduler>,
    callbacks: PlayerCallbacks,
}

impl PlayerInner {
    /// Apply `mutate`, bring the extractor in line with the new state, then run effects
    ///
    /// Effects run after the state lock is released, so callbacks and listeners they
    /// trigger may commit again. Effects aimed at an extractor that was replaced in the
    /// meantime are no-ops.
    fn commit(&self, mutate: impl FnOnce(&mut PlayerState)) {
        let effects = {
            let mut state = self.state.lock();
            mutate(&mut state);
            self.reconcile(&mut state)
        };
        self.apply(effects);
    }

    fn reconcile(&self, state: &mut PlayerState) -> Effects {
        let mut effects = Effects::default();

        if state.torn_down {
            state.bridge = None;
            if state.slot.current().is_some() {
                state.slot.retire();
                self.active.replace_quietly(None);
                effects.publish = true;
            }
            return effects;
        }

        let suspended = state.recovery.is_suspended();
        if !state.slot.is_current(state.composition.as_ref(), suspended) {
            // Listeners go first so the retiring extractor cannot reach the player
            state.bridge = None;

            let mut bridge = None;
            let created = state.slot.replace(state.composition.as_ref(), suspended, |extractor| {
                bridge = Some(self.bind_events(extractor));
            });
            state.bridge = bridge;

            self.active.replace_quietly(created.clone());
            effects.prepare = created;
            effects.publish = true;
        }

        effects.transport = state.transport.sync(state.slot.current(), state.intent);
        effects
    }

    fn apply(&self, effects: Effects) {
        if let Some(extractor) = &effects.prepare {
            lifecycle::dispatch_prepare(extractor, self.scheduler.as_ref());
        }
        for command in effects.transport {
            command.run();
        }
        if effects.publish {
            self.active.notify();
        }
    }

    fn bind_events(&self, extractor: &Arc<ManagedExtractor>) -> EventBridge {
        let generation = extractor.generation();
        let (ready, complete, failed) = (self.self_ref.clone(), self.self_ref.clone(), self.self_ref.clone());

        let mut bridge = EventBridge::new(extractor);
        bridge
            .listen(EventKind::Ready, move |_| {
                if let Some(inner) = ready.upgrade() {
                    inner.handle_ready(generation);
                }
            })
            .listen(EventKind::Complete, move |_| {
                if let Some(inner) = complete.upgrade() {
                    inner.handle_complete(generation);
                }
            })
            .listen(EventKind::Error, move |event| {
                if let (Some(inner), ExtractorEvent::Error(error)) = (failed.upgrade(), event) {
                    inner.handle_error(generation, error.clone());
                }
            });
        bridge
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().slot.current_generation() == Some(generation)
    }

    fn handle_ready(&self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        info!("Extractor #{} ready to play", generation);
        if let Some(callback) = &self.callbacks.on_ready_to_play {
            callback();
        }
    }

    fn handle_complete(&self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        debug!("Extractor #{} reached the end of the composition", generation);
        if let Some(callback) = &self.callbacks.on_complete {
            callback();
        }
    }

    fn handle_error(&self, generation: u64, error: ExtractorError) {
        if !self.is_current(generation) {
            debug!("Ignoring error from retired extractor #{}: {}", generation, error);
            return;
        }

        let epoch = self.state.lock().recovery.retry_epoch();
        if let Some(callback) = &self.callbacks.on_error {
            callback(&error, self.retry_handle());
        }

        let mut retried = false;
        self.commit(|state| {
            if state.slot.current_generation() == Some(generation) {
                state.recovery.suspend(error);
                retried = state.recovery.retry_epoch() != epoch;
            }
        });

        // Retry requested before the suspension landed: recreate right away
        if retried {
            debug!("Retry for extractor #{} arrived before suspension", generation);
            self.commit(|state| {
                state.recovery.resume();
            });
        }
    }

    fn retry_handle(&self) -> RetryHandle {
        let target: Weak<dyn RecoveryTarget> = self.self_ref.clone();
        RetryHandle::new(target)
    }
}

impl RecoveryTarget for PlayerInner {
    fn reset_error(&self) {
        self.commit(|state| {
            state.recovery.request_retry();
        });
    }
}

/// Reactive playback of a [`VideoComposition`](crate::composition::VideoComposition)
///
/// Dropping the player disposes its extractor and detaches every retry handle.
pub struct CompositionPlayer {
    inner: Arc<PlayerInner>,
    scene: DerivedValue<Picture>,
}

impl CompositionPlayer {
    pub fn new<D: FrameDrawer>(
        options: PlayerOptions<D>,
        factory: Arc<dyn ExtractorFactory>,
        scheduler: Arc<dyn RenderScheduler>,
    ) -> Self {
        let PlayerOptions {
            composition,
            drawer,
            size,
            current_time,
            intent,
            callbacks,
        } = options;

        let inner = Arc::new_cyclic(|self_ref| PlayerInner {
            self_ref: self_ref.clone(),
            state: Mutex::new(PlayerState {
                composition,
                intent,
                recovery: ErrorRecovery::new(),
                slot: ExtractorSlot::new(factory),
                bridge: None,
                transport: TransportSync::default(),
                torn_down: false,
            }),
            active: SharedValue::new(None),
            scheduler,
            callbacks,
        });

        let renderer = SceneRenderer::new(drawer);
        let (active, time, target) = (inner.active.clone(), current_time.clone(), size.clone());
        let scene = DerivedValue::new(
            move || {
                let extractor = active.get();
                renderer.render(extractor.as_deref(), time.get(), target.get())
            },
            &[&inner.active, &current_time, &size],
        );

        inner.commit(|_| {});
        Self { inner, scene }
    }

    /// The picture for the current extractor, time and size
    pub fn current_scene(&self) -> DerivedValue<Picture> {
        self.scene.clone()
    }

    /// Transport controls of the live extractor, `None` while there is none
    pub fn player(&self) -> Option<PlayerController> {
        self.inner
            .state
            .lock()
            .slot
            .current()
            .cloned()
            .map(PlayerController::new)
    }

    pub fn composition(&self) -> Option<CompositionRef> {
        self.inner.state.lock().composition.clone()
    }

    /// Swap the composition; a different one recreates the extractor
    pub fn set_composition(&self, composition: Option<CompositionRef>) {
        self.inner.commit(|state| state.composition = composition);
    }

    pub fn intent(&self) -> PlaybackIntent {
        self.inner.state.lock().intent
    }

    pub fn set_looping(&self, is_looping: bool) {
        self.inner.commit(|state| state.intent.is_looping = is_looping);
    }

    pub fn set_auto_play(&self, auto_play: bool) {
        self.inner.commit(|state| state.intent.auto_play = auto_play);
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.state.lock().recovery.is_suspended()
    }

    pub fn last_error(&self) -> Option<ExtractorError> {
        self.inner.state.lock().recovery.last_error().cloned()
    }

    /// Same action as the handle passed to `on_error`
    pub fn retry_handle(&self) -> RetryHandle {
        self.inner.retry_handle()
    }
}

impl Drop for CompositionPlayer {
    fn drop(&mut self) {
        debug!("Tearing down composition player");
        self.inner.commit(|state| state.torn_down = true);
    }
}

impl std::fmt::Debug for CompositionPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CompositionPlayer")
            .field("composition", &state.composition)
            .field("intent", &state.intent)
            .field("recovery", &state.recovery.state())
            .field("extractor", &state.slot.current_generation())
            .finish()
    }
}
