//! # Compositions
//!
//! The composition description handed to the player, identity-compared references to
//! it, and the decoded frames an extractor reports for it.

pub mod frame;
pub mod model;

pub use frame::{FrameSet, VideoFrame};
pub use model::{CompositionRef, VideoComposition, VideoCompositionItem};
