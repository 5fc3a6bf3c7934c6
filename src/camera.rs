use crate::{error::Error, image::Frame};
use image::ImageReader;
use std::fs;
use std::path::{Path, PathBuf};

/// Frame acquisition boundary.
///
/// Implementations own the sensor handle. `capture` blocks until a frame is
/// available, and a capture failure is fatal to the control loop.
pub trait Camera {
    fn capture(&mut self) -> Result<Frame, Error>;
}

/// Replays stored frames in filename order.
///
/// Stands in for live acquisition when tuning the tracker against a
/// recorded run. Capture fails once the directory is exhausted.
pub struct Replay {
    frames: Vec<PathBuf>,
    cursor: usize,
}

impl Replay {
    /// Collects every file in `dir`, sorted by filename.
    pub fn from_dir(dir: &Path) -> Result<Self, Error> {
        let entries = fs::read_dir(dir).map_err(|err| Error::Capture {
            reason: format!("{}: {err}", dir.display()),
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        frames.sort();

        Ok(Self { frames, cursor: 0 })
    }

    /// Returns how many frames are left to capture.
    pub fn remaining(&self) -> usize {
        self.frames.len() - self.cursor
    }
}

impl Camera for Replay {
    fn capture(&mut self) -> Result<Frame, Error> {
        let path = self.frames.get(self.cursor).ok_or(Error::Capture {
            reason: "replay exhausted".into(),
        })?;
        self.cursor += 1;

        let image = ImageReader::open(path)
            .map_err(|err| Error::Capture {
                reason: format!("{}: {err}", path.display()),
            })?
            .decode()
            .map_err(|err| Error::Capture {
                reason: format!("{}: {err}", path.display()),
            })?
            .into_luma8();

        Ok(Frame::from_luma8(image))
    }
}
