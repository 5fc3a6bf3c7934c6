use anyhow::Context;
use clap::Parser;
use courser::{
    camera::{Camera, Replay},
    config::{self, FollowParams},
    image::Frame,
    overlay::{annotate, FrameSink},
    tracker::Tracker,
};
use image::ImageReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long)]
    target: PathBuf,

    #[arg(long)]
    frames: PathBuf,

    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long)]
    trace_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let params = match &args.params {
        Some(path) => config::load(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => FollowParams::default(),
    };

    let image = ImageReader::open(&args.target)
        .with_context(|| format!("opening {}", args.target.display()))?
        .decode()
        .context("decoding the target image")?
        .into_luma8();
    let template = Frame::from_luma8(image);

    let mut camera = Replay::from_dir(&args.frames)
        .with_context(|| format!("opening frame directory {}", args.frames.display()))?;

    // The constructor consumes the first frame for its initial cycle.
    let first = camera.capture().context("capturing the first frame")?;
    let mut tracker = Tracker::new(template, &first, params.tracker, rand::rng())
        .context("initializing the tracker")?;

    let mut sink = match &args.trace_dir {
        Some(dir) => Some(FrameSink::new(dir).context("creating the trace directory")?),
        None => None,
    };

    // Write header.
    println!("frame,outcome,row,col,confidence");

    let mut locked = 0usize;
    let mut index = 0usize;
    report(index, &tracker);
    locked += tracker.center().is_some() as usize;
    if let Some(sink) = sink.as_mut() {
        sink.record(&annotate(&first, &tracker))
            .context("writing an annotated frame")?;
    }

    while camera.remaining() > 0 {
        let frame = camera.capture().context("capturing a frame")?;
        index += 1;

        tracker.track(&frame);
        report(index, &tracker);
        locked += tracker.center().is_some() as usize;

        if let Some(sink) = sink.as_mut() {
            sink.record(&annotate(&frame, &tracker))
                .context("writing an annotated frame")?;
        }
    }

    let frames = index + 1;
    info!(frames, locked, lost = frames - locked, "replay finished");

    Ok(())
}

fn report<R>(index: usize, tracker: &Tracker<R>) {
    match tracker.center() {
        Some(center) => println!(
            "{},locked,{},{},{:.4}",
            index,
            center.row(),
            center.col(),
            tracker.confidence()
        ),
        None => println!("{},lost,,,{:.4}", index, tracker.confidence()),
    }
}
