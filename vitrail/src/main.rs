use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::file_utils::{ARTWORK_EXTENSIONS, PHOTO_EXTENSIONS};
use common::log_setup::setup_logging;

use vitrail::queue::{FileQueue, Job, Worker};
use vitrail::stages::{load_rgb, save_rgb, DewarpJob, DewarpPipeline, WrapContext, WrapJob};
use vitrail::AppConfig;

static STOP: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "vitrail", about = "Scan rectification and window compositing")]
struct Cli {
    /// JSON application config; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Watch the photo inbox and write rectified artwork
    Dewarp {
        /// Process the current inbox once and exit
        #[arg(long)]
        once: bool,
    },
    /// Watch the artwork inbox and write window composites
    Wrap {
        /// Process the current inbox once and exit
        #[arg(long)]
        once: bool,
    },
    /// Rectify a single photograph
    Rectify { photo: PathBuf, out: PathBuf },
    /// Composite a single artwork image
    Compose { artwork: PathBuf, out: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    setup_logging(&config.log_level, &config.log_dir);

    match cli.command {
        Cmd::Dewarp { once } => {
            let pipeline = DewarpPipeline::new(config.detection.clone(), config.rectify.clone());
            let job = DewarpJob::new(pipeline, &config.dewarp.outbox);
            let queue = FileQueue::new(config.dewarp.dirs(), PHOTO_EXTENSIONS);
            run_worker(Worker::new(queue, job, config.worker.clone()), once)
        }
        Cmd::Wrap { once } => {
            let context = wrap_context(&config)?;
            let job = WrapJob::new(
                context,
                &config.wrap.outbox,
                config.wrap.extra_output_root.clone(),
            );
            let queue = FileQueue::new(config.wrap.dirs(), ARTWORK_EXTENSIONS);
            run_worker(Worker::new(queue, job, config.worker.clone()), once)
        }
        Cmd::Rectify { photo, out } => {
            let pipeline = DewarpPipeline::new(config.detection.clone(), config.rectify.clone());
            let scan = pipeline
                .run(&load_rgb(&photo)?)
                .with_context(|| format!("rectifying '{}'", photo.display()))?;
            save_rgb(&scan.image, &out)?;
            tracing::info!("pattern {} -> '{}'", scan.pattern, out.display());
            Ok(())
        }
        Cmd::Compose { artwork, out } => {
            let context = wrap_context(&config)?;
            let composite = context.composite(&load_rgb(&artwork)?);
            save_rgb(&composite, &out)?;
            tracing::info!("composite -> '{}'", out.display());
            Ok(())
        }
    }
}

fn wrap_context(config: &AppConfig) -> Result<WrapContext> {
    WrapContext::load(&config.mapping_path, config.overlay_path.as_deref())
        .with_context(|| format!("loading mapping '{}'", config.mapping_path.display()))
}

fn run_worker<J: Job>(worker: Worker<J>, once: bool) -> Result<()> {
    if once {
        worker.queue().ensure_dirs()?;
        let summary = worker.run_once(&STOP)?;
        tracing::info!(
            "{}: {} ok, {} failed, {} crashed",
            worker.job().name(),
            summary.processed,
            summary.failed,
            summary.crashed
        );
        return Ok(());
    }
    worker.run(&STOP)?;
    Ok(())
}
