use crate::{error::Error, image::Frame, tracker::Tracker};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::PathBuf;

const PARTICLE_COLOR: Rgb<u8> = Rgb([255, 210, 0]);
const BOX_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Paints tracking state over `frame` for diagnosis.
///
/// Hypotheses render as small dots and a locked center as a template sized
/// box. The overlay is a side channel; pursuit never reads it back.
pub fn annotate<R>(frame: &Frame, tracker: &Tracker<R>) -> RgbImage {
    let mut canvas = RgbImage::from_fn(frame.cols() as u32, frame.rows() as u32, |x, y| {
        let value = frame.get(y as usize, x as usize).unwrap_or(0);
        Rgb([value, value, value])
    });

    for particle in tracker.particles().particles() {
        for row_offset in -1..=1 {
            for col_offset in -1..=1 {
                put(
                    &mut canvas,
                    particle.row() + row_offset,
                    particle.col() + col_offset,
                    PARTICLE_COLOR,
                );
            }
        }
    }

    if let Some(center) = tracker.center() {
        let rows = tracker.template().rows() as i32;
        let cols = tracker.template().cols() as i32;
        let top = center.row() as i32 - rows / 2;
        let left = center.col() as i32 - cols / 2;

        for row_offset in 0..rows {
            put(&mut canvas, top + row_offset, left, BOX_COLOR);
            put(&mut canvas, top + row_offset, left + cols - 1, BOX_COLOR);
        }
        for col_offset in 0..cols {
            put(&mut canvas, top, left + col_offset, BOX_COLOR);
            put(&mut canvas, top + rows - 1, left + col_offset, BOX_COLOR);
        }
    }

    canvas
}

/// Sets a pixel if (`row`, `col`) is on the canvas.
fn put(canvas: &mut RgbImage, row: i32, col: i32, color: Rgb<u8>) {
    if row >= 0 && col >= 0 && (col as u32) < canvas.width() && (row as u32) < canvas.height() {
        canvas.put_pixel(col as u32, row as u32, color);
    }
}

/// Writes numbered annotated frames plus a rolling `latest.png`.
///
/// Write failures surface as errors but the caller is free to treat them as
/// non-fatal; the sink never gates the control loop.
pub struct FrameSink {
    dir: PathBuf,
    index: usize,
}

impl FrameSink {
    /// Creates the sink directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| Error::Sink {
            reason: format!("{}: {err}", dir.display()),
        })?;

        Ok(Self { dir, index: 0 })
    }

    /// Saves `image` as the next numbered frame and refreshes `latest.png`.
    pub fn record(&mut self, image: &RgbImage) -> Result<(), Error> {
        let numbered = self.dir.join(format!("{:05}.png", self.index));
        image.save(&numbered).map_err(|err| Error::Sink {
            reason: format!("{}: {err}", numbered.display()),
        })?;

        let latest = self.dir.join("latest.png");
        image.save(&latest).map_err(|err| Error::Sink {
            reason: format!("{}: {err}", latest.display()),
        })?;
        self.index += 1;

        Ok(())
    }
}
