//! # Frames Extractors
//!
//! The collaborator that decodes a composition's frames and owns the playback clock.
//! The player only talks to it through [`FramesExtractor`] and creates instances through
//! an [`ExtractorFactory`], so native decoders, the bundled [`SoftwareExtractor`], and
//! test doubles are interchangeable.
//!
//! Extractors report progress asynchronously through three named events: `ready` once
//! preparation succeeded, `complete` when non-looping playback reaches the end, and
//! `error` when preparation or decoding failed.

pub mod events;
pub mod software;

pub use events::{EventEmitter, EventKind, EventListener, ExtractorEvent};
pub use software::{SoftwareExtractor, SoftwareExtractorFactory};

use std::sync::Arc;

use crate::composition::{CompositionRef, FrameSet};
use crate::reactive::Subscription;

/// A frame-extraction resource bound to one composition
///
/// Every method takes `&self`: an extractor is shared between the orchestration side,
/// which commands transport and disposes it, and the render side, which decodes frames.
/// Implementations are expected to tolerate `dispose` being called while other calls are
/// in progress and to treat calls after disposal as no-ops.
pub trait FramesExtractor: Send + Sync {
    /// Start asynchronous preparation; completion is signalled with `ready` or `error`
    fn prepare(&self);

    /// Release decoding resources
    fn dispose(&self);

    fn is_looping(&self) -> bool;

    fn set_looping(&self, looping: bool);

    fn play(&self);

    fn pause(&self);

    /// Move the playback position, in milliseconds
    fn seek_to(&self, time_ms: f64);

    fn is_playing(&self) -> bool;

    /// Playback position, in milliseconds
    fn current_time(&self) -> f64;

    /// Frames valid at the extractor's current position
    fn decode_composition_frames(&self) -> FrameSet;

    /// Register `listener` for events of `kind` until the token is dropped
    fn add_listener(&self, kind: EventKind, listener: EventListener) -> Subscription;
}

/// Creates extractors for compositions
pub trait ExtractorFactory: Send + Sync {
    /// Construct a new, unprepared extractor
    ///
    /// Must not fail synchronously; problems surface later through the `error` event.
    fn create(&self, composition: &CompositionRef) -> Arc<dyn FramesExtractor>;
}

impl<F> ExtractorFactory for F
where
    F: Fn(&CompositionRef) -> Arc<dyn FramesExtractor> + Send + Sync,
{
    fn create(&self, composition: &CompositionRef) -> Arc<dyn FramesExtractor> {
        self(composition)
    }
}
