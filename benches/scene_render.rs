//! Benchmarks for scene recomputation on playback ticks.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use composition_player::{
    composition::{VideoComposition, VideoCompositionItem},
    config::ExtractorConfig,
    extractor::SoftwareExtractorFactory,
    picture::{Rect, Size},
    player::{draw_fn, CompositionPlayer, PlayerOptions},
    reactive::SharedValue,
    scheduler::InlineScheduler,
};

fn composition(clips: usize) -> VideoComposition {
    (0..clips).fold(VideoComposition::new(10.0), |composition, index| {
        composition.with_item(VideoCompositionItem {
            id: format!("clip-{}", index),
            path: format!("clip-{}.mp4", index),
            composition_start_time: 0.0,
            start_time: 0.0,
            duration: 10.0,
            resolution: None,
        })
    })
}

fn benchmark_scene_recompute(criterion: &mut Criterion) {
    for clips in [1, 4] {
        let time = SharedValue::new(0.0);
        let size = SharedValue::new(Size::new(1280.0, 720.0));
        let drawer = draw_fn(|canvas, info| {
            for frame in info.frames.values() {
                canvas.draw_frame(frame, Rect::new(0.0, 0.0, info.width, info.height));
            }
        });
        let config = ExtractorConfig {
            frame_width: 160,
            frame_height: 90,
            render_thread: false,
        };
        let player = CompositionPlayer::new(
            PlayerOptions::new(drawer, size, time.clone()).composition(Some(composition(clips).into())),
            Arc::new(SoftwareExtractorFactory::new(config)),
            Arc::new(InlineScheduler),
        );
        let scene = player.current_scene();

        let mut tick = 0.0;
        criterion.bench_function(&format!("recompute scene ({} clip(s))", clips), |bencher| {
            bencher.iter(|| {
                tick += 33.0;
                time.set(tick % 10_000.0);
                scene.get()
            });
        });
    }
}

fn benchmark_rasterize(criterion: &mut Criterion) {
    let time = SharedValue::new(1000.0);
    let size = SharedValue::new(Size::new(640.0, 360.0));
    let drawer = draw_fn(|canvas, info| {
        for frame in info.frames.values() {
            canvas.draw_frame(frame, Rect::new(0.0, 0.0, info.width, info.height));
        }
    });
    let player = CompositionPlayer::new(
        PlayerOptions::new(drawer, size, time).composition(Some(composition(2).into())),
        Arc::new(SoftwareExtractorFactory::default()),
        Arc::new(InlineScheduler),
    );
    let picture = player.current_scene().get();

    criterion.bench_function("rasterize 640x360 scene", |bencher| {
        bencher.iter(|| picture.rasterize(640, 360, [0, 0, 0, 255]));
    });
}

criterion_group!(benches, benchmark_scene_recompute, benchmark_rasterize);
criterion_main!(benches);
