use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use composition_player::{
    composition::VideoComposition,
    config::PlayerConfig,
    error::PlayerError,
    extractor::SoftwareExtractorFactory,
    picture::Rect,
    player::{draw_fn, CompositionPlayer, PlayerOptions},
    reactive::SharedValue,
    scheduler::{InlineScheduler, RenderScheduler, RenderThread},
};

/// Delay before an errored extractor is recreated
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(
    name = "composition-player",
    version,
    about = "Play a video composition and render its frames to PNG files",
    long_about = "Composition-Player loads a multi-clip video composition, drives it with a software frame extractor, and writes the drawn scene at the configured frame rate."
)]
struct Cli {
    /// Composition file (TOML)
    #[arg(short = 'i', long)]
    composition: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the rendered frames
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Number of frames to render
    #[arg(short, long, default_value_t = 90)]
    frames: u32,

    /// Loop the composition
    #[arg(long = "loop")]
    looping: bool,

    /// Start playing as soon as the extractor is created
    #[arg(long)]
    autoplay: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Composition-Player v{}", env!("CARGO_PKG_VERSION"));
    info!("Composition: {:?}", cli.composition);
    info!("Output: {:?}", cli.output);

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            PlayerConfig::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            PlayerConfig::default()
        }
    };
    config.playback.auto_play |= cli.autoplay;
    config.playback.is_looping |= cli.looping;
    config.validate()?;

    let composition = VideoComposition::load(&cli.composition).await?;
    composition.validate()?;
    info!(
        "Composition: {:.2}s, {} item(s)",
        composition.duration,
        composition.items.len()
    );

    tokio::fs::create_dir_all(&cli.output).await?;

    let scheduler: Arc<dyn RenderScheduler> = if config.extractor.render_thread {
        Arc::new(RenderThread::spawn("render")?)
    } else {
        Arc::new(InlineScheduler)
    };

    let time = SharedValue::new(0.0);
    let size = SharedValue::new(config.render.size());
    let background = config.render.background;

    // Lay the visible clips out side by side
    let drawer = draw_fn(move |canvas, info| {
        canvas.clear(background);
        let count = info.frames.len().max(1) as f32;
        let cell_width = info.width / count;
        for (index, frame) in info.frames.values().enumerate() {
            canvas.draw_frame(frame, Rect::new(index as f32 * cell_width, 0.0, cell_width, info.height));
        }
    });

    let completed = Arc::new(AtomicBool::new(false));
    let completed_flag = completed.clone();
    let runtime = tokio::runtime::Handle::current();

    let options = PlayerOptions::new(drawer, size, time.clone())
        .composition(Some(composition.into()))
        .intent(config.playback)
        .on_ready_to_play(|| info!("Ready to play"))
        .on_complete(move || {
            info!("Playback complete");
            completed_flag.store(true, Ordering::SeqCst);
        })
        .on_error(move |err, retry| {
            let failure = PlayerError::from(err.clone());
            error!("{}", failure.user_message());
            if !failure.is_recoverable() {
                warn!("Not retrying: {}", failure);
                return;
            }
            runtime.spawn(async move {
                tokio::time::sleep(RETRY_DELAY).await;
                if !retry.retry() {
                    warn!("Player gone, retry skipped");
                }
            });
        });

    let player = CompositionPlayer::new(
        options,
        Arc::new(SoftwareExtractorFactory::new(config.extractor.clone())),
        scheduler.clone(),
    );
    let scene = player.current_scene();

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / config.render.fps));
    let (width, height) = (config.render.width, config.render.height);
    let mut rendered = 0;
    for index in 0..cli.frames {
        ticker.tick().await;

        // Frames are read in the render context, where extractors were prepared
        let outcome = Arc::new(Mutex::new(None));
        let job = {
            let (outcome, controller, time, scene) = (outcome.clone(), player.player(), time.clone(), scene.clone());
            let path = cli.output.join(format!("frame_{:05}.png", index));
            move || {
                if let Some(controller) = controller {
                    time.set(controller.current_time());
                }
                *outcome.lock() = Some(scene.get().save_png(&path, width, height, background));
            }
        };
        scheduler.dispatch(Box::new(job));
        tokio::task::block_in_place(|| scheduler.flush());

        if let Some(result) = outcome.lock().take() {
            result?;
            rendered += 1;
        }

        if completed.load(Ordering::SeqCst) && !config.playback.is_looping {
            break;
        }
    }

    drop(player);
    scheduler.flush();

    info!("Rendered {} frame(s) to {:?}", rendered, cli.output);
    Ok(())
}
