use std::collections::BTreeMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

/// Decoded frames valid at one instant, keyed by composition item id
///
/// Ordered so that draw routines iterating it produce the same commands every time.
pub type FrameSet = BTreeMap<String, VideoFrame>;

/// A decoded frame of one composition item
#[derive(Debug, Clone)]
pub struct VideoFrame {
    item_id: String,
    timestamp: f64,
    image: Arc<RgbaImage>,
}

impl VideoFrame {
    pub fn new<S: Into<String>>(item_id: S, timestamp: f64, image: RgbaImage) -> Self {
        Self {
            item_id: item_id.into(),
            timestamp,
            image: Arc::new(image),
        }
    }

    /// A frame filled with a single color
    pub fn solid<S: Into<String>>(item_id: S, timestamp: f64, width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::new(item_id, timestamp, RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    /// Id of the composition item this frame belongs to
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Position inside the source media, in seconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl PartialEq for VideoFrame {
    fn eq(&self, other: &Self) -> bool {
        self.item_id == other.item_id
            && self.timestamp == other.timestamp
            && (Arc::ptr_eq(&self.image, &other.image) || self.image == other.image)
    }
}
