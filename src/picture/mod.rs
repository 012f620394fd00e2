//! # Pictures
//!
//! Immutable recordings of drawing commands. A [`Picture`] is produced by running a
//! recording closure against a [`Canvas`]; two pictures compare equal when they hold the
//! same command sequence, which is what makes scene recomputation testable.
//!
//! ```rust
//! use composition_player::picture::{Picture, Rect};
//!
//! let picture = Picture::record(|canvas| {
//!     canvas.clear([0, 0, 0, 255]);
//!     canvas.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), [255, 0, 0, 255]);
//! });
//! assert_eq!(picture.len(), 2);
//! ```

pub mod canvas;
mod raster;

pub use canvas::Canvas;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::composition::VideoFrame;
use crate::error::{RenderError, Result};

/// RGBA color
pub type Color = [u8; 4];

/// Output dimensions of a rendered scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering `size`
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }
}

/// A single recorded drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    FillRect { rect: Rect, color: Color },
    DrawFrame { frame: VideoFrame, dst: Rect },
    Save,
    Restore,
    Translate { dx: f32, dy: f32 },
}

/// Immutable, cheaply cloneable sequence of drawing commands
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    commands: Arc<[DrawCommand]>,
}

impl Picture {
    /// Record the commands issued by `draw`
    pub fn record(draw: impl FnOnce(&mut Canvas)) -> Self {
        let mut canvas = Canvas::new();
        draw(&mut canvas);
        canvas.finish()
    }

    /// A picture with no commands
    pub fn empty() -> Self {
        Self { commands: Arc::from(Vec::new()) }
    }

    pub(crate) fn from_commands(commands: Vec<DrawCommand>) -> Self {
        Self { commands: Arc::from(commands) }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Frames referenced by this picture, in drawing order
    pub fn frames(&self) -> impl Iterator<Item = &VideoFrame> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::DrawFrame { frame, .. } => Some(frame),
            _ => None,
        })
    }

    /// Replay the commands into an RGBA image
    pub fn rasterize(&self, width: u32, height: u32, background: Color) -> Result<image::RgbaImage> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height }.into());
        }
        Ok(raster::replay(self.commands(), width, height, background))
    }

    /// Rasterize and write the picture as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P, width: u32, height: u32, background: Color) -> Result<()> {
        let path = path.as_ref();
        let image = self.rasterize(width, height, background)?;
        image.save(path).map_err(|e| RenderError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl Default for Picture {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_recordings_are_equal() {
        let draw = |canvas: &mut Canvas| {
            canvas.save();
            canvas.translate(4.0, 2.0);
            canvas.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), [1, 2, 3, 255]);
            canvas.restore();
        };
        assert_eq!(Picture::record(draw), Picture::record(draw));
        assert_ne!(Picture::record(draw), Picture::empty());
    }

    #[test]
    fn test_rasterize_rejects_zero_size() {
        assert!(Picture::empty().rasterize(0, 10, [0, 0, 0, 255]).is_err());
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.png");
        let picture = Picture::record(|canvas| canvas.clear([10, 20, 30, 255]));

        picture.save_png(&path, 8, 8, [0, 0, 0, 255]).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.get_pixel(3, 3).0, [10, 20, 30, 255]);
    }
}
