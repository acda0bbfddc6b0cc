//! Headless clip playback driver.
//!
//! Opens a clip, runs the decode loop at simulated ticks and prints
//! playback statistics. Useful for smoke-testing container and decoder
//! support without a window.

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use reel_core::clip::{ClipSettings, VideoClip};
use reel_core::registry::open_clip;

struct PlayOptions {
    input: PathBuf,
    /// Loop passes to play before stopping.
    loops: u32,
    pot_stride: bool,
}

struct PlayStats {
    decoded_frames: u64,
    dropped_frames: u64,
    loops: u32,
    duration_ms: u128,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("reel=info")
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args)?;

    tracing::info!("reel-play v{}", reel_core::VERSION);

    let file = File::open(&options.input)?;
    let settings = ClipSettings {
        power_of_two_stride: options.pot_stride,
        ..Default::default()
    };

    let clip = open_clip(Box::new(file), settings)
        .map_err(|e| anyhow::anyhow!("failed to open {:?}: {}", options.input, e))?;

    tracing::info!(
        "clip: {}x{} @ {:.3} fps, {} frames, {:.2}s",
        clip.width(),
        clip.height(),
        clip.fps(),
        clip.num_frames(),
        clip.duration()
    );

    let stats = run(clip, options.loops);
    tracing::info!(
        "playback complete: decoded_frames={}, dropped_frames={}, loops={}, duration_ms={}",
        stats.decoded_frames,
        stats.dropped_frames,
        stats.loops,
        stats.duration_ms
    );
    Ok(())
}

/// Drive the clip through `loops` passes at one simulated tick per
/// frame period.
fn run(mut clip: VideoClip, loops: u32) -> PlayStats {
    let queue = clip.frame_queue();
    let timer = clip.timer();
    let tick = clip.metadata().frame_duration;
    let started = Instant::now();

    let mut decoded = 0u64;
    let mut completed_loops = 0u32;

    timer.play();
    while completed_loops < loops {
        if clip.seek_pending() {
            clip.do_seek();
        }
        if clip.should_restart() && queue.ready_count() == 0 {
            clip.restart();
            timer.seek(0.0);
            completed_loops += 1;
            if completed_loops >= loops {
                break;
            }
        } else if clip.end_of_stream() && !clip.should_restart() && queue.ready_count() == 0 {
            // Stream ended short of its declared frame count
            tracing::warn!("stream drained before its declared frame count");
            break;
        }

        clip.decode_next_frame();
        clip.decoded_audio_check();
        timer.update(tick);
        if let Some(frame) = queue.pop_due(timer.time()) {
            decoded += 1;
            queue.recycle(frame);
        }
    }

    PlayStats {
        decoded_frames: decoded,
        dropped_frames: queue.stats().dropped,
        loops: completed_loops,
        duration_ms: started.elapsed().as_millis(),
    }
}

fn parse_args(args: &[String]) -> Result<PlayOptions> {
    let mut input: Option<PathBuf> = None;
    let mut loops = 1u32;
    let mut pot_stride = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --input"))?;
                input = Some(PathBuf::from(value));
                i += 2;
            }
            "--loops" | "-l" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --loops"))?;
                loops = value
                    .parse::<u32>()
                    .map_err(|e| anyhow::anyhow!("Invalid loop count {}: {}", value, e))?;
                i += 2;
            }
            "--pot-stride" => {
                pot_stride = true;
                i += 1;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let input = input.ok_or_else(|| {
        print_usage();
        anyhow::anyhow!("Missing required --input")
    })?;

    Ok(PlayOptions {
        input,
        loops: loops.max(1),
        pot_stride,
    })
}

fn print_usage() {
    eprintln!("Usage: reel-play --input <clip.ivf> [--loops N] [--pot-stride]");
}
