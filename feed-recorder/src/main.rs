mod config;
mod recorder;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use common::listing::list_recordings;
use common::source::{FeedSource, HttpFeedSource};
use common::types::run_type_name;

use config::RecorderConfig;
use recorder::SessionRecorder;

/// Captures a live race feed at a fixed cadence for later replay.
#[derive(Parser, Debug)]
#[command(name = "feed-recorder")]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = "recordings")]
    output: PathBuf,

    /// Capture interval in seconds
    #[arg(short, long, default_value_t = 1.0)]
    interval: f64,

    /// Recording duration in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Maximum number of frames to record
    #[arg(short = 'f', long)]
    frames: Option<u64>,

    /// Save uncompressed JSON
    #[arg(long)]
    no_compress: bool,

    /// List existing recordings and exit
    #[arg(long)]
    list: bool,

    /// Feed base URL (defaults to the live NASCAR API)
    #[arg(long)]
    source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    if args.list {
        print_listing(&args.output);
        return Ok(());
    }

    if !(args.interval.is_finite() && args.interval > 0.0) {
        bail!("interval must be positive, got {}", args.interval);
    }

    info!("🏁 Feed recorder starting...");

    let source: Arc<dyn FeedSource> = Arc::new(match &args.source {
        Some(base) => HttpFeedSource::new(base.clone()),
        None => HttpFeedSource::live(),
    });

    let config = RecorderConfig {
        output_dir: args.output.clone(),
        interval: Duration::from_secs_f64(args.interval),
        duration: args.duration.map(Duration::from_secs_f64),
        max_frames: args.frames,
        compress: !args.no_compress,
        ..RecorderConfig::default()
    };

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("⏹ Ctrl-C received, stopping recorder");
            trigger.cancel();
        }
    });

    let mut recorder = SessionRecorder::new(source, config);
    recorder.run(shutdown).await?;

    if recorder.frame_count() == 0 {
        warn!("No frames captured, nothing to save");
        return Ok(());
    }

    let recording = recorder.finalize()?;
    let path = recorder.persist(&recording).await?;

    info!("✅ Recording complete");
    info!("   File:     {}", path.display());
    info!("   Frames:   {}", recording.metadata.total_frames);
    info!("   Duration: {:.1}s", recording.metadata.total_duration_sec);

    Ok(())
}

fn print_listing(dir: &PathBuf) {
    let recordings = list_recordings(dir);
    if recordings.is_empty() {
        println!("No recordings found in {:?}", dir);
        return;
    }

    println!("\nAvailable recordings in {:?}:\n", dir);
    for rec in &recordings {
        let meta = &rec.metadata;
        println!(" {}", rec.file_name);
        println!(
            "   Session: {} ({})",
            meta.run_name,
            run_type_name(meta.run_type)
        );
        println!("   Track:   {}", meta.track_name);
        println!("   Date:    {}", meta.start_time.format("%Y-%m-%d %H:%M:%S"));
        println!(
            "   Frames:  {} ({:.1}s)",
            meta.total_frames, meta.total_duration_sec
        );
        println!(
            "   Size:    {:.2} MB\n",
            rec.file_size_bytes as f64 / 1024.0 / 1024.0
        );
    }
}
