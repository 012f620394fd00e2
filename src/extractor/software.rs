use std::sync::Arc;
use std::time::Instant;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::events::{EventEmitter, EventKind, EventListener, ExtractorEvent};
use super::{ExtractorFactory, FramesExtractor};
use crate::composition::{CompositionRef, FrameSet, VideoCompositionItem, VideoFrame};
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::reactive::Subscription;

/// Extractor that synthesizes test-pattern frames instead of decoding media
///
/// Every item active at the current position yields one frame: a solid color derived
/// from the item id with a progress bar showing how far into the item playback is. The
/// output depends only on the position, so repeated decodes at the same time are
/// identical. The playback clock runs on wall time while playing.
pub struct SoftwareExtractor {
    composition: CompositionRef,
    config: ExtractorConfig,
    clock: Mutex<Clock>,
    events: EventEmitter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Ready,
    Failed,
    Disposed,
}

#[derive(Debug)]
struct Clock {
    phase: Phase,
    looping: bool,
    playing: bool,
    /// Position when the clock was last started, stopped, or moved
    base_ms: f64,
    started_at: Option<Instant>,
    completed: bool,
}

impl Clock {
    fn position(&self, now: Instant, duration_ms: f64) -> f64 {
        let elapsed = self
            .started_at
            .map(|started| now.duration_since(started).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        let position = self.base_ms + elapsed;

        if self.looping && duration_ms > 0.0 {
            position % duration_ms
        } else {
            position.min(duration_ms)
        }
    }

    /// Fold the running time into `base_ms`
    fn rebase(&mut self, now: Instant, duration_ms: f64) {
        self.base_ms = self.position(now, duration_ms);
        self.started_at = if self.playing { Some(now) } else { None };
    }
}

impl SoftwareExtractor {
    pub fn new(composition: CompositionRef, config: ExtractorConfig) -> Self {
        Self {
            composition,
            config,
            clock: Mutex::new(Clock {
                phase: Phase::Created,
                looping: false,
                playing: false,
                base_ms: 0.0,
                started_at: None,
                completed: false,
            }),
            events: EventEmitter::new(),
        }
    }

    fn duration_ms(&self) -> f64 {
        self.composition.duration * 1000.0
    }

    /// Current position, stopping the clock and emitting `complete` at the end
    fn tick(&self) -> f64 {
        let duration_ms = self.duration_ms();
        let (position, finished) = {
            let mut clock = self.clock.lock();
            let now = Instant::now();
            let position = clock.position(now, duration_ms);
            let finished = clock.playing && !clock.looping && position >= duration_ms;
            if finished {
                clock.playing = false;
                clock.completed = true;
                clock.base_ms = duration_ms;
                clock.started_at = None;
            }
            (position, finished)
        };

        if finished {
            debug!("Software extractor reached the end at {:.0}ms", position);
            self.events.emit(ExtractorEvent::Complete);
        }
        position
    }

    fn check_sources(&self) -> Result<(), ExtractorError> {
        self.composition
            .validate()
            .map_err(|e| ExtractorError::InvalidComposition { reason: e.to_string() })?;

        if let Some(item) = self.composition.items.iter().find(|item| item.path.trim().is_empty()) {
            return Err(ExtractorError::PreparationFailed {
                reason: format!("item '{}' has no source path", item.id),
            });
        }
        Ok(())
    }

    fn pattern_frame(&self, item: &VideoCompositionItem, time: f64) -> Result<VideoFrame, ExtractorError> {
        let (width, height) = item
            .resolution
            .unwrap_or((self.config.frame_width, self.config.frame_height));
        if width == 0 || height == 0 {
            return Err(ExtractorError::DecodeFailed {
                time_ms: time * 1000.0,
                reason: format!("item '{}' has an empty {}x{} frame", item.id, width, height),
            });
        }
        let base = item_color(&item.id);
        let progress = if item.duration > 0.0 {
            ((time - item.composition_start_time) / item.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let bar_width = (progress * width as f64).round() as u32;
        let bar_top = height.saturating_sub((height / 10).max(1));

        let image = RgbaImage::from_fn(width, height, |x, y| {
            if y >= bar_top && x < bar_width {
                Rgba([255, 255, 255, 255])
            } else {
                base
            }
        });
        Ok(VideoFrame::new(item.id.clone(), item.source_time_at(time), image))
    }
}

/// Stable color for an item id (FNV-1a over the id bytes)
fn item_color(id: &str) -> Rgba<u8> {
    let hash = id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3));
    Rgba([(hash >> 16) as u8, (hash >> 8) as u8, hash as u8, 255])
}

impl FramesExtractor for SoftwareExtractor {
    fn prepare(&self) {
        {
            let clock = self.clock.lock();
            if clock.phase != Phase::Created {
                return;
            }
        }

        let outcome = self.check_sources();
        let event = {
            let mut clock = self.clock.lock();
            if clock.phase != Phase::Created {
                // Disposed while checking
                return;
            }
            match outcome {
                Ok(()) => {
                    clock.phase = Phase::Ready;
                    ExtractorEvent::Ready
                }
                Err(error) => {
                    clock.phase = Phase::Failed;
                    clock.playing = false;
                    clock.started_at = None;
                    ExtractorEvent::Error(error)
                }
            }
        };

        match &event {
            ExtractorEvent::Error(error) => warn!("Software extractor failed to prepare: {}", error),
            _ => info!(
                "Software extractor ready: {:.2}s, {} items",
                self.composition.duration,
                self.composition.items.len()
            ),
        }
        self.events.emit(event);
    }

    fn dispose(&self) {
        let mut clock = self.clock.lock();
        clock.phase = Phase::Disposed;
        clock.playing = false;
        clock.started_at = None;
    }

    fn is_looping(&self) -> bool {
        self.clock.lock().looping
    }

    fn set_looping(&self, looping: bool) {
        let duration_ms = self.duration_ms();
        let mut clock = self.clock.lock();
        if clock.looping != looping {
            clock.rebase(Instant::now(), duration_ms);
            clock.looping = looping;
        }
    }

    fn play(&self) {
        let mut clock = self.clock.lock();
        if matches!(clock.phase, Phase::Disposed | Phase::Failed) || clock.playing {
            return;
        }
        if clock.completed {
            clock.completed = false;
            clock.base_ms = 0.0;
        }
        clock.playing = true;
        clock.started_at = Some(Instant::now());
    }

    fn pause(&self) {
        let duration_ms = self.duration_ms();
        let mut clock = self.clock.lock();
        if clock.playing {
            clock.rebase(Instant::now(), duration_ms);
            clock.playing = false;
            clock.started_at = None;
        }
    }

    fn seek_to(&self, time_ms: f64) {
        let duration_ms = self.duration_ms();
        let mut clock = self.clock.lock();
        if clock.phase == Phase::Disposed {
            return;
        }
        clock.base_ms = time_ms.clamp(0.0, duration_ms);
        clock.completed = false;
        clock.started_at = if clock.playing { Some(Instant::now()) } else { None };
    }

    fn is_playing(&self) -> bool {
        self.tick();
        self.clock.lock().playing
    }

    fn current_time(&self) -> f64 {
        self.tick()
    }

    fn decode_composition_frames(&self) -> FrameSet {
        if self.clock.lock().phase != Phase::Ready {
            return FrameSet::new();
        }

        let time = self.tick() / 1000.0;
        let mut frames = FrameSet::new();
        let mut failures = Vec::new();
        for item in self.composition.items_at(time) {
            match self.pattern_frame(item, time) {
                Ok(frame) => {
                    frames.insert(item.id.clone(), frame);
                }
                Err(error) => failures.push(error),
            }
        }

        for error in failures {
            warn!("Software extractor failed to decode: {}", error);
            self.events.emit(ExtractorEvent::Error(error));
        }
        frames
    }

    fn add_listener(&self, kind: EventKind, listener: EventListener) -> Subscription {
        self.events.add_listener(kind, listener)
    }
}

/// Creates [`SoftwareExtractor`]s sharing one configuration
#[derive(Debug, Clone, Default)]
pub struct SoftwareExtractorFactory {
    config: ExtractorConfig,
}

impl SoftwareExtractorFactory {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }
}

impl ExtractorFactory for SoftwareExtractorFactory {
    fn create(&self, composition: &CompositionRef) -> Arc<dyn FramesExtractor> {
        Arc::new(SoftwareExtractor::new(composition.clone(), self.config.clone()))
    }
}
