use anyhow::{bail, Context};
use clap::Parser;
use courser::{
    camera::{Camera, Replay},
    config::{self, FollowParams},
    drive::Drive,
    image::Frame,
    overlay::{annotate, FrameSink},
    pursuit::{CycleReport, Pursuit},
    sim::{ConsoleBus, Scene},
    tracker::Tracker,
};
use image::ImageReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long)]
    target: Option<PathBuf>,

    #[arg(long)]
    frames: Option<PathBuf>,

    #[arg(long)]
    synthetic: bool,

    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long)]
    speed: Option<i16>,

    #[arg(long)]
    trace_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut params = match &args.params {
        Some(path) => config::load(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => FollowParams::default(),
    };
    if let Some(speed) = args.speed {
        params.pursuit.speed = speed;
    }

    match (&args.frames, args.synthetic) {
        (Some(dir), false) => {
            let target = args
                .target
                .as_ref()
                .context("--target is required with --frames")?;
            let template = load_template(target)?;
            let mut camera = Replay::from_dir(dir)
                .with_context(|| format!("opening frame directory {}", dir.display()))?;
            let first = camera.capture().context("capturing the first frame")?;
            let cycles = camera.remaining();
            pursue(
                camera,
                first,
                cycles,
                template,
                params,
                args.trace_dir.as_deref(),
            )
        }
        (None, true) => {
            let (mut camera, template) = demo_scene();
            let first = camera.capture().context("rendering the first frame")?;
            let cycles = camera.remaining();
            pursue(
                camera,
                first,
                cycles,
                template,
                params,
                args.trace_dir.as_deref(),
            )
        }
        _ => bail!("choose exactly one frame source, --frames DIR or --synthetic"),
    }
}

fn pursue<C: Camera>(
    camera: C,
    first: Frame,
    cycles: usize,
    template: Frame,
    params: FollowParams,
    trace_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let tracker = Tracker::new(template, &first, params.tracker, rand::rng())
        .context("initializing the tracker")?;
    let drive = Drive::new(ConsoleBus, params.drive).context("initializing the drive")?;
    let mut pursuit = Pursuit::new(camera, drive, tracker, params.pursuit);

    let mut sink = match trace_dir {
        Some(dir) => Some(FrameSink::new(dir).context("creating the trace directory")?),
        None => None,
    };

    let mut driven = 0usize;
    let mut searches = 0usize;
    for _ in 0..cycles {
        match pursuit.cycle().context("running a pursuit cycle")? {
            CycleReport::Drove { .. } => driven += 1,
            CycleReport::Paused { .. } => {}
            CycleReport::Searched => searches += 1,
        }

        if let (Some(sink), Some(frame)) = (sink.as_mut(), pursuit.last_frame()) {
            sink.record(&annotate(frame, pursuit.tracker()))
                .context("writing an annotated frame")?;
        }
    }

    pursuit.shutdown().context("releasing the motors")?;
    info!(cycles, driven, searches, "pursuit finished");

    Ok(())
}

fn load_template(path: &Path) -> anyhow::Result<Frame> {
    let image = ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .decode()
        .context("decoding the target image")?
        .into_luma8();

    Ok(Frame::from_luma8(image))
}

/// A bright block drifting across a dark field, briefly leaving the frame
/// so the search behavior shows up in the logs.
fn demo_scene() -> (Scene, Frame) {
    let target = Frame::filled(20, 20, 230);

    let mut path: Vec<(i32, i32)> = (0..30).map(|step| (60, 18 + 4 * step)).collect();
    path.extend(std::iter::repeat((-200, -200)).take(6));
    path.extend((0..12).map(|step| (60, 130 - 4 * step)));

    (Scene::new(120, 160, 30, target.clone(), path), target)
}
