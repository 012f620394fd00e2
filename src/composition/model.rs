use std::collections::HashSet;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompositionError, Result};

/// Declarative description of how media sources combine into a timeline
///
/// All times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoComposition {
    /// Total length of the composition
    pub duration: f64,

    /// Sources placed on the timeline
    #[serde(default)]
    pub items: Vec<VideoCompositionItem>,
}

/// One source placed on the composition timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCompositionItem {
    /// Key under which this item's frame is reported in a [`FrameSet`](super::FrameSet)
    pub id: String,

    /// Location of the media source
    pub path: String,

    /// Where on the composition timeline the item begins
    pub composition_start_time: f64,

    /// Offset into the source media where playback of the item begins
    #[serde(default)]
    pub start_time: f64,

    /// How long the item stays on the timeline
    pub duration: f64,

    /// Native resolution of the source, when known
    #[serde(default)]
    pub resolution: Option<(u32, u32)>,
}

impl VideoCompositionItem {
    /// Whether the item is on screen at composition time `time`
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.composition_start_time && time < self.composition_start_time + self.duration
    }

    /// Position inside the source media that corresponds to composition time `time`
    pub fn source_time_at(&self, time: f64) -> f64 {
        self.start_time + (time - self.composition_start_time).clamp(0.0, self.duration)
    }
}

impl VideoComposition {
    pub fn new(duration: f64) -> Self {
        Self { duration, items: Vec::new() }
    }

    pub fn with_item(mut self, item: VideoCompositionItem) -> Self {
        self.items.push(item);
        self
    }

    /// Parse a composition from TOML text
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            CompositionError::ParseFailed {
                path: origin.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Load a composition from a TOML file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading composition from: {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let composition = Self::from_toml_str(&content, &path.display().to_string())?;
        debug!("Loaded composition: {:.2}s, {} items", composition.duration, composition.items.len());
        Ok(composition)
    }

    /// Items on screen at composition time `time`
    pub fn items_at(&self, time: f64) -> impl Iterator<Item = &VideoCompositionItem> {
        self.items.iter().filter(move |item| item.is_active_at(time))
    }

    /// Check timing and identifiers
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(CompositionError::InvalidDuration { duration: self.duration }.into());
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if item.id.is_empty() {
                return Err(CompositionError::EmptyItemId.into());
            }
            if !seen.insert(item.id.as_str()) {
                return Err(CompositionError::DuplicateItemId { id: item.id.clone() }.into());
            }

            let timings = [item.composition_start_time, item.start_time, item.duration];
            if timings.iter().any(|t| !t.is_finite() || *t < 0.0) {
                return Err(CompositionError::InvalidTiming {
                    id: item.id.clone(),
                    details: format!(
                        "start={} offset={} duration={}",
                        item.composition_start_time, item.start_time, item.duration
                    ),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Shared handle to a composition, compared by identity
///
/// Two refs are equal only if they point at the same allocation. Handing the player a
/// structurally identical but separately allocated composition counts as a new composition.
#[derive(Clone)]
pub struct CompositionRef(Arc<VideoComposition>);

impl CompositionRef {
    pub fn new(composition: VideoComposition) -> Self {
        Self(Arc::new(composition))
    }

    /// Address of the shared allocation, for logging
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Deref for CompositionRef {
    type Target = VideoComposition;

    fn deref(&self) -> &VideoComposition {
        &self.0
    }
}

impl PartialEq for CompositionRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CompositionRef {}

impl From<VideoComposition> for CompositionRef {
    fn from(composition: VideoComposition) -> Self {
        Self::new(composition)
    }
}

impl std::fmt::Debug for CompositionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionRef")
            .field("identity", &format_args!("{:#x}", self.identity()))
            .field("duration", &self.0.duration)
            .field("items", &self.0.items.len())
            .finish()
    }
}
