use super::{Color, DrawCommand, Picture, Rect};
use crate::composition::VideoFrame;

/// Recording surface handed to draw routines
///
/// Nothing is rasterized while recording; every call appends a [`DrawCommand`].
#[derive(Debug, Default)]
pub struct Canvas {
    commands: Vec<DrawCommand>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    /// Draw `frame` scaled into `dst`
    pub fn draw_frame(&mut self, frame: &VideoFrame, dst: Rect) {
        self.commands.push(DrawCommand::DrawFrame { frame: frame.clone(), dst });
    }

    pub fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    pub fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.commands.push(DrawCommand::Translate { dx, dy });
    }

    /// Commands recorded so far
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn finish(self) -> Picture {
        Picture::from_commands(self.commands)
    }
}
