//! # Composition Player
//!
//! Reactive playback of multi-clip video compositions.
//!
//! A [`CompositionPlayer`] binds a [`VideoComposition`](composition::VideoComposition) to a
//! frame extractor and keeps a [`Picture`](picture::Picture) of the current frames up to
//! date as the composition, the shared playback time or the output size change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use composition_player::{
//!     composition::VideoComposition,
//!     config::PlayerConfig,
//!     extractor::SoftwareExtractorFactory,
//!     picture::Rect,
//!     player::{draw_fn, CompositionPlayer, PlayerOptions},
//!     reactive::SharedValue,
//!     scheduler::InlineScheduler,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = PlayerConfig::default();
//! let composition = VideoComposition::load("composition.toml").await?;
//!
//! let time = SharedValue::new(0.0);
//! let size = SharedValue::new(config.render.size());
//! let drawer = draw_fn(|canvas, info| {
//!     for frame in info.frames.values() {
//!         canvas.draw_frame(frame, Rect::new(0.0, 0.0, info.width, info.height));
//!     }
//! });
//!
//! let player = CompositionPlayer::new(
//!     PlayerOptions::new(drawer, size, time.clone())
//!         .composition(Some(composition.into()))
//!         .intent(config.playback),
//!     Arc::new(SoftwareExtractorFactory::new(config.extractor.clone())),
//!     Arc::new(InlineScheduler),
//! );
//!
//! time.set(1500.0);
//! player.current_scene().get().save_png("frame.png", 1280, 720, config.render.background)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`player`] - Extractor lifecycle, error recovery, transport and scene rendering
//! - [`extractor`] - Frame extractor traits, events and a software test-pattern extractor
//! - [`reactive`] - Shared and derived values the player observes and publishes
//! - [`picture`] - Recorded drawing commands and rasterization
//! - [`composition`] - Composition model and decoded frames
//! - [`scheduler`] - Render context for extractor preparation
//! - [`config`] - Configuration management

pub mod composition;
pub mod config;
pub mod error;
pub mod extractor;
pub mod picture;
pub mod player;
pub mod reactive;
pub mod scheduler;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{CompositionRef, VideoComposition, VideoCompositionItem},
    config::{PlaybackIntent, PlayerConfig},
    error::{PlayerError, Result},
    player::{CompositionPlayer, PlayerController, PlayerOptions, RetryHandle},
};
