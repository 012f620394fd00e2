// Software replay of recorded commands, used for PNG output

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::{Color, DrawCommand, Rect};

pub(super) fn replay(commands: &[DrawCommand], width: u32, height: u32, background: Color) -> RgbaImage {
    let mut target = RgbaImage::from_pixel(width, height, Rgba(background));
    let mut offset = (0.0_f32, 0.0_f32);
    let mut saved = Vec::new();

    for command in commands {
        match command {
            DrawCommand::Clear(color) => {
                for pixel in target.pixels_mut() {
                    *pixel = Rgba(*color);
                }
            }
            DrawCommand::FillRect { rect, color } => {
                fill(&mut target, translated(rect, offset), *color);
            }
            DrawCommand::DrawFrame { frame, dst } => {
                let dst = translated(dst, offset);
                let (w, h) = (dst.width.round() as u32, dst.height.round() as u32);
                if w == 0 || h == 0 {
                    continue;
                }
                let scaled = imageops::resize(frame.image(), w, h, FilterType::Nearest);
                imageops::overlay(&mut target, &scaled, dst.x.round() as i64, dst.y.round() as i64);
            }
            DrawCommand::Save => saved.push(offset),
            DrawCommand::Restore => {
                if let Some(previous) = saved.pop() {
                    offset = previous;
                }
            }
            DrawCommand::Translate { dx, dy } => {
                offset.0 += dx;
                offset.1 += dy;
            }
        }
    }

    target
}

fn translated(rect: &Rect, offset: (f32, f32)) -> Rect {
    Rect::new(rect.x + offset.0, rect.y + offset.1, rect.width, rect.height)
}

fn fill(target: &mut RgbaImage, rect: Rect, color: Color) {
    let x0 = rect.x.max(0.0).round() as u32;
    let y0 = rect.y.max(0.0).round() as u32;
    let x1 = ((rect.x + rect.width).round().max(0.0) as u32).min(target.width());
    let y1 = ((rect.y + rect.height).round().max(0.0) as u32).min(target.height());

    for y in y0..y1 {
        for x in x0..x1 {
            target.put_pixel(x, y, Rgba(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_respects_translation_and_restore() {
        let commands = vec![
            DrawCommand::Save,
            DrawCommand::Translate { dx: 2.0, dy: 2.0 },
            DrawCommand::FillRect { rect: Rect::new(0.0, 0.0, 1.0, 1.0), color: [255, 0, 0, 255] },
            DrawCommand::Restore,
            DrawCommand::FillRect { rect: Rect::new(0.0, 0.0, 1.0, 1.0), color: [0, 255, 0, 255] },
        ];
        let image = replay(&commands, 4, 4, [0, 0, 0, 255]);

        assert_eq!(image.get_pixel(2, 2).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert_eq!(image.get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_fill_clips_to_target() {
        let commands = vec![DrawCommand::FillRect {
            rect: Rect::new(-5.0, -5.0, 100.0, 100.0),
            color: [9, 9, 9, 255],
        }];
        let image = replay(&commands, 3, 3, [0, 0, 0, 255]);
        assert!(image.pixels().all(|p| p.0 == [9, 9, 9, 255]));
    }
}
