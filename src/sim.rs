use crate::{
    camera::Camera,
    drive::{Direction, MotorBus},
    error::Error,
    image::Frame,
};
use rand::Rng;
use tracing::info;

/// A synthetic scene for exercising the control loop without hardware.
///
/// The target patch is pasted over a flat backdrop at scripted positions,
/// one position per captured frame. Whatever falls outside the frame is
/// clipped, so an off screen position renders a target-free frame.
pub struct Scene {
    rows: usize,
    cols: usize,
    backdrop: u8,
    target: Frame,
    path: Vec<(i32, i32)>,
    cursor: usize,
}

impl Scene {
    /// Creates a scene that shows `target` centered at each (row, col) of
    /// `path` in turn.
    pub fn new(rows: usize, cols: usize, backdrop: u8, target: Frame, path: Vec<(i32, i32)>) -> Self {
        Self {
            rows,
            cols,
            backdrop,
            target,
            path,
            cursor: 0,
        }
    }

    /// Renders one frame with the target centered at (`row`, `col`).
    pub fn render_at(&self, row: i32, col: i32) -> Frame {
        let mut pixels = vec![self.backdrop; self.rows * self.cols];
        let top = row - (self.target.rows() / 2) as i32;
        let left = col - (self.target.cols() / 2) as i32;

        for target_row in 0..self.target.rows() {
            for target_col in 0..self.target.cols() {
                let frame_row = top + target_row as i32;
                let frame_col = left + target_col as i32;
                if (0..self.rows as i32).contains(&frame_row)
                    && (0..self.cols as i32).contains(&frame_col)
                {
                    pixels[frame_row as usize * self.cols + frame_col as usize] = self
                        .target
                        .get(target_row, target_col)
                        .expect("coordinate is inside the target");
                }
            }
        }

        Frame::from_pixels(self.rows, self.cols, pixels).expect("buffer matches dimensions")
    }

    /// Returns how many scripted positions are left to capture.
    pub fn remaining(&self) -> usize {
        self.path.len() - self.cursor
    }
}

impl Camera for Scene {
    fn capture(&mut self) -> Result<Frame, Error> {
        let (row, col) = *self.path.get(self.cursor).ok_or(Error::Capture {
            reason: "scene path exhausted".into(),
        })?;
        self.cursor += 1;

        Ok(self.render_at(row, col))
    }
}

/// Renders a frame of uniform random intensities.
pub fn noise_frame<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Frame {
    let pixels = (0..rows * cols).map(|_| rng.random()).collect();
    Frame::from_pixels(rows, cols, pixels).expect("buffer matches dimensions")
}

/// A motor command as seen by [`RecordingBus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Power {
        channel: u8,
        magnitude: u8,
        direction: Direction,
    },
    ReleaseAll,
}

/// Records every command for later assertion.
///
/// Tracks per channel state alongside the raw event log so tests can check
/// both the end state and the exact command sequence.
#[derive(Debug, Default)]
pub struct RecordingBus {
    events: Vec<BusEvent>,
    channels: [Option<(u8, Direction)>; 8],
    releases: usize,
}

impl RecordingBus {
    pub fn events(&self) -> &[BusEvent] {
        self.events.as_slice()
    }

    /// Returns the magnitude currently applied to `channel`. Released or
    /// untouched channels read zero.
    pub fn power(&self, channel: u8) -> u8 {
        self.channels
            .get(channel as usize)
            .and_then(|state| *state)
            .map(|(magnitude, _)| magnitude)
            .unwrap_or(0)
    }

    pub fn direction(&self, channel: u8) -> Option<Direction> {
        self.channels
            .get(channel as usize)
            .and_then(|state| *state)
            .map(|(_, direction)| direction)
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    /// Counts in place turns by their counter-rotation command pairs.
    ///
    /// Straight driving powers both wheels in the same direction and halts
    /// power at zero magnitude, so two adjacent powered commands with
    /// opposite directions can only come from a turn. A script that flips
    /// between forward and reverse cruising would also match; assert on the
    /// raw events in that case.
    pub fn turns(&self) -> usize {
        self.events
            .windows(2)
            .filter(|pair| match pair {
                [
                    BusEvent::Power {
                        magnitude: a,
                        direction: first,
                        ..
                    },
                    BusEvent::Power {
                        magnitude: b,
                        direction: second,
                        ..
                    },
                ] => *a > 0 && *b > 0 && first != second,
                _ => false,
            })
            .count()
    }
}

impl MotorBus for RecordingBus {
    fn set_wheel_power(
        &mut self,
        channel: u8,
        magnitude: u8,
        direction: Direction,
    ) -> Result<(), Error> {
        self.events.push(BusEvent::Power {
            channel,
            magnitude,
            direction,
        });
        if let Some(state) = self.channels.get_mut(channel as usize) {
            *state = Some((magnitude, direction));
        }

        Ok(())
    }

    fn release_all(&mut self) -> Result<(), Error> {
        self.events.push(BusEvent::ReleaseAll);
        self.channels = [None; 8];
        self.releases += 1;

        Ok(())
    }
}

/// Accepts halts but rejects every powered command.
///
/// A controller built over this bus constructs cleanly and faults on its
/// first motion, which exercises the fatal shutdown path.
#[derive(Debug, Default)]
pub struct FailingBus {
    releases: usize,
}

impl FailingBus {
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl MotorBus for FailingBus {
    fn set_wheel_power(
        &mut self,
        channel: u8,
        magnitude: u8,
        _direction: Direction,
    ) -> Result<(), Error> {
        match magnitude {
            0 => Ok(()),
            _ => Err(Error::Motor {
                channel,
                reason: "bus fault".into(),
            }),
        }
    }

    fn release_all(&mut self) -> Result<(), Error> {
        self.releases += 1;

        Ok(())
    }
}

/// Logs commands instead of driving hardware.
///
/// Lets the composed binaries run on a bench with no motor controller
/// attached.
#[derive(Debug, Default)]
pub struct ConsoleBus;

impl MotorBus for ConsoleBus {
    fn set_wheel_power(
        &mut self,
        channel: u8,
        magnitude: u8,
        direction: Direction,
    ) -> Result<(), Error> {
        info!(channel, magnitude, ?direction, "wheel power");

        Ok(())
    }

    fn release_all(&mut self) -> Result<(), Error> {
        info!("all motor channels released");

        Ok(())
    }
}
