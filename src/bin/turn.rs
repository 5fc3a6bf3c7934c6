use anyhow::Context;
use clap::Parser;
use courser::{
    config::{self, FollowParams},
    drive::Drive,
    sim::ConsoleBus,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Spins the rover in place by `angle` radians, positive to the right.
///
/// Commands are printed rather than sent to hardware, which makes this a
/// dry run for checking the seconds-per-radian calibration.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    angle: f64,

    #[arg(long)]
    params: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let params = match &args.params {
        Some(path) => config::load(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => FollowParams::default(),
    };

    let mut drive = Drive::new(ConsoleBus, params.drive).context("initializing the drive")?;
    drive.turn(args.angle).context("turning")?;
    drive.shutdown().context("releasing the motors")?;

    Ok(())
}
