use tracing::trace;

use super::lifecycle::ManagedExtractor;
use crate::composition::{FrameSet, VideoComposition};
use crate::picture::{Canvas, Picture, Size};

/// Everything a draw routine gets for one frame
pub struct DrawFrameInfo<'a, C> {
    /// Value produced by [`FrameDrawer::before_draw_frame`] for this frame
    pub context: &'a mut C,

    /// Composition being played
    pub composition: &'a VideoComposition,

    /// Playback position in seconds
    pub current_time: f64,

    /// Frames valid at the extractor's position, keyed by item id
    pub frames: &'a FrameSet,

    /// Target width
    pub width: f32,

    /// Target height
    pub height: f32,
}

/// Caller-supplied drawing of composition frames
///
/// `before_draw_frame` creates a per-frame context, `draw_frame` records the scene, and
/// `after_draw_frame` receives the context back for cleanup. The cleanup hook runs on
/// every recompute, including when `draw_frame` panics.
pub trait FrameDrawer: Send + Sync + 'static {
    type Context;

    fn before_draw_frame(&self) -> Self::Context;

    fn draw_frame(&self, canvas: &mut Canvas, frame: DrawFrameInfo<'_, Self::Context>);

    fn after_draw_frame(&self, _context: Self::Context) {}
}

impl<F> FrameDrawer for F
where
    F: Fn(&mut Canvas, DrawFrameInfo<'_, ()>) + Send + Sync + 'static,
{
    type Context = ();

    fn before_draw_frame(&self) -> Self::Context {}

    fn draw_frame(&self, canvas: &mut Canvas, frame: DrawFrameInfo<'_, ()>) {
        self(canvas, frame)
    }
}

/// Pin down the argument types of a context-free draw closure
pub fn draw_fn<F>(draw: F) -> F
where
    F: Fn(&mut Canvas, DrawFrameInfo<'_, ()>) + Send + Sync + 'static,
{
    draw
}

/// A [`FrameDrawer`] assembled from three closures
pub struct HookedDrawer<B, D, A> {
    before: B,
    draw: D,
    after: A,
}

impl<C, B, D, A> HookedDrawer<B, D, A>
where
    B: Fn() -> C + Send + Sync + 'static,
    D: Fn(&mut Canvas, DrawFrameInfo<'_, C>) + Send + Sync + 'static,
    A: Fn(C) + Send + Sync + 'static,
{
    pub fn new(before: B, draw: D, after: A) -> Self {
        Self { before, draw, after }
    }
}

impl<C, B, D, A> FrameDrawer for HookedDrawer<B, D, A>
where
    B: Fn() -> C + Send + Sync + 'static,
    D: Fn(&mut Canvas, DrawFrameInfo<'_, C>) + Send + Sync + 'static,
    A: Fn(C) + Send + Sync + 'static,
{
    type Context = C;

    fn before_draw_frame(&self) -> C {
        (self.before)()
    }

    fn draw_frame(&self, canvas: &mut Canvas, frame: DrawFrameInfo<'_, C>) {
        (self.draw)(canvas, frame)
    }

    fn after_draw_frame(&self, context: C) {
        (self.after)(context)
    }
}

/// Hands the context to `after_draw_frame` when dropped, unwinding included.
struct AfterDraw<'a, D: FrameDrawer> {
    drawer: &'a D,
    context: Option<D::Context>,
}

impl<D: FrameDrawer> Drop for AfterDraw<'_, D> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.drawer.after_draw_frame(context);
        }
    }
}

/// Produces the picture for one `(extractor, time, size)` observation
///
/// The renderer never picks frames itself: it asks the extractor for the frames at the
/// extractor's own position and hands them, with the shared time converted to seconds,
/// to the draw routine.
pub struct SceneRenderer<D> {
    drawer: D,
}

impl<D: FrameDrawer> SceneRenderer<D> {
    pub fn new(drawer: D) -> Self {
        Self { drawer }
    }

    pub fn render(&self, extractor: Option<&ManagedExtractor>, time_ms: f64, size: Size) -> Picture {
        let Some(extractor) = extractor else {
            return Picture::empty();
        };

        Picture::record(|canvas| {
            let mut cleanup = AfterDraw {
                drawer: &self.drawer,
                context: Some(self.drawer.before_draw_frame()),
            };

            let frames = extractor.decode_frames();
            trace!(
                "Drawing {} frame(s) from extractor #{} at {:.0}ms",
                frames.len(),
                extractor.generation(),
                time_ms
            );

            if let Some(context) = cleanup.context.as_mut() {
                self.drawer.draw_frame(
                    canvas,
                    DrawFrameInfo {
                        context,
                        composition: extractor.composition(),
                        current_time: time_ms / 1000.0,
                        frames: &frames,
                        width: size.width,
                        height: size.height,
                    },
                );
            }
        })
    }
}
