use std::sync::Arc;

use tracing::debug;

use super::lifecycle::ManagedExtractor;
use crate::config::PlaybackIntent;

/// Transport controls of the live extractor
///
/// A thin pass-through: every call goes straight to the extractor. Once that extractor
/// has been disposed (composition swapped, error, teardown) commands are ignored and
/// queries report a stopped clock, so a controller that outlived its extractor is inert
/// rather than dangerous. Fetch a fresh one from the player after any change.
#[derive(Debug, Clone)]
pub struct PlayerController {
    extractor: Arc<ManagedExtractor>,
}

impl PlayerController {
    pub(crate) fn new(extractor: Arc<ManagedExtractor>) -> Self {
        Self { extractor }
    }

    pub fn play(&self) {
        self.extractor.with_live(|extractor| extractor.play());
    }

    pub fn pause(&self) {
        self.extractor.with_live(|extractor| extractor.pause());
    }

    /// Move the playback position, in milliseconds
    pub fn seek_to(&self, time_ms: f64) {
        self.extractor.with_live(|extractor| extractor.seek_to(time_ms));
    }

    pub fn is_playing(&self) -> bool {
        self.extractor
            .with_live(|extractor| extractor.is_playing())
            .unwrap_or(false)
    }

    /// Playback position in milliseconds; `0.0` once the extractor is gone
    pub fn current_time(&self) -> f64 {
        self.extractor
            .with_live(|extractor| extractor.current_time())
            .unwrap_or(0.0)
    }

    pub fn is_looping(&self) -> bool {
        self.extractor
            .with_live(|extractor| extractor.is_looping())
            .unwrap_or(false)
    }

    /// Whether the extractor behind this controller is still the live one
    pub fn is_active(&self) -> bool {
        !self.extractor.is_disposed()
    }

    pub fn generation(&self) -> u64 {
        self.extractor.generation()
    }
}

/// A transport command derived from intent, executed outside the player's locks
#[derive(Debug)]
pub(crate) enum TransportCommand {
    SetLooping(Arc<ManagedExtractor>, bool),
    Play(Arc<ManagedExtractor>),
}

impl TransportCommand {
    pub(crate) fn run(self) {
        match self {
            TransportCommand::SetLooping(extractor, looping) => {
                debug!("Setting looping={} on extractor #{}", looping, extractor.generation());
                extractor.with_live(|e| e.set_looping(looping));
            }
            TransportCommand::Play(extractor) => {
                debug!("Autoplaying extractor #{}", extractor.generation());
                extractor.with_live(|e| e.play());
            }
        }
    }
}

/// Tracks which intent has already been pushed onto which extractor
///
/// Looping is live: it is pushed again whenever the extractor or the intent changes.
/// Autoplay fires once per extractor while the intent stays on; switching the intent
/// off and on again re-arms it for the current extractor.
#[derive(Debug, Default)]
pub(crate) struct TransportSync {
    looping_applied: Option<(u64, bool)>,
    autoplay_applied: Option<u64>,
}

impl TransportSync {
    pub(crate) fn sync(
        &mut self,
        extractor: Option<&Arc<ManagedExtractor>>,
        intent: PlaybackIntent,
    ) -> Vec<TransportCommand> {
        let mut commands = Vec::new();

        if !intent.auto_play {
            self.autoplay_applied = None;
        }

        let Some(extractor) = extractor else {
            self.looping_applied = None;
            return commands;
        };
        let generation = extractor.generation();

        if self.looping_applied != Some((generation, intent.is_looping)) {
            self.looping_applied = Some((generation, intent.is_looping));
            commands.push(TransportCommand::SetLooping(extractor.clone(), intent.is_looping));
        }

        if intent.auto_play && self.autoplay_applied != Some(generation) {
            self.autoplay_applied = Some(generation);
            commands.push(TransportCommand::Play(extractor.clone()));
        }

        commands
    }
}
