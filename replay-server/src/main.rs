mod http;
mod playback;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use common::clock::SystemClock;
use common::codec;
use common::listing::list_recordings;
use common::types::run_type_name;

use state::ReplayState;

/// Serves a recorded race feed back through the live API surface, with
/// play/pause/seek/speed/loop controls.
#[derive(Parser, Debug)]
#[command(name = "replay-server")]
struct Args {
    /// Recording file to replay
    recording: Option<PathBuf>,

    /// Server port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Server host
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Initial playback speed
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Do not auto-start playback
    #[arg(long)]
    no_autoplay: bool,

    /// Do not loop at the end of the recording
    #[arg(long)]
    no_loop: bool,

    /// List available recordings and exit
    #[arg(long)]
    list: bool,

    /// Recordings directory
    #[arg(short, long, default_value = "recordings")]
    directory: PathBuf,
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
        print_listing(&args.directory);
        return Ok(());
    }

    let Some(recording_arg) = args.recording.clone() else {
        bail!("recording file required (or use --list)");
    };
    let path = resolve_recording_path(recording_arg, &args.directory)?;

    info!("📼 Loading recording: {}", path.display());
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let recording = codec::decode(&bytes)?;
    if recording.is_empty() {
        bail!("recording contains no frames");
    }

    let meta = &recording.metadata;
    info!("✓ Loaded {} frames", recording.len());
    info!(
        "  Session:  {} ({})",
        meta.run_name,
        run_type_name(meta.run_type)
    );
    info!("  Track:    {}", meta.track_name);
    info!("  Duration: {:.1}s", meta.total_duration_sec);

    let state = Arc::new(ReplayState::new(Arc::new(recording), Arc::new(SystemClock)));
    {
        let mut engine = state.engine();
        engine.set_looping(!args.no_loop);
        engine.set_speed(args.speed)?;
        if !args.no_autoplay {
            engine.play()?;
            info!("▶ Autoplay at {:.2}x", args.speed);
        }
    }

    let app = http::create_router(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("✅ Replay server ready on http://{}", addr);
    info!("   Point the ticker at http://localhost:{}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("⏹ Shutting down");
        })
        .await?;

    Ok(())
}

/// Tries the path as given, then under the recordings directory.
fn resolve_recording_path(recording: PathBuf, directory: &PathBuf) -> Result<PathBuf> {
    if recording.exists() {
        return Ok(recording);
    }
    let alt = directory.join(&recording);
    if alt.exists() {
        return Ok(alt);
    }
    bail!("recording not found: {}", recording.display());
}

fn print_listing(dir: &PathBuf) {
    let recordings = list_recordings(dir);
    if recordings.is_empty() {
        println!("No recordings found in {:?}", dir);
        return;
    }

    println!("\nAvailable recordings in {:?}:\n", dir);
    for (i, rec) in recordings.iter().enumerate() {
        println!(" {}. {}", i + 1, rec.file_name);
        println!(
            "    {} @ {} ({} frames, {:.1}s)",
            rec.metadata.run_name,
            rec.metadata.track_name,
            rec.metadata.total_frames,
            rec.metadata.total_duration_sec
        );
    }
    println!();
}
