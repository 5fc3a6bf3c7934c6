use crate::{
    camera::Camera,
    config::PursuitParams,
    drive::{Drive, MotorBus},
    error::Error,
    image::{Frame, PixelCoordinate},
    tracker::{TrackOutcome, Tracker},
};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// What one control cycle did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleReport {
    /// The target is locked and the rover is driving toward it.
    Drove {
        center: PixelCoordinate,
        steering: f64,
    },

    /// The target is lost but under the retry threshold; holding still.
    Paused { losses: u32 },

    /// Consecutive losses reached the threshold; one search turn executed.
    Searched,
}

/// The closed pursuit loop: capture, track, actuate.
///
/// While the target is locked, steering follows the estimate's horizontal
/// offset from frame center, proportional only. Column zero maps to a full
/// left turn and the last column to a full right turn.
///
/// Losses are tolerated quietly at first. The rover halts and waits for the
/// tracker to reacquire, and only after the configured number of
/// consecutive losses does it sweep in place to search, resetting the
/// count. A hardware fault ends the loop; losing sight of the target never
/// does.
pub struct Pursuit<C, B: MotorBus, R> {
    camera: C,
    drive: Drive<B>,
    tracker: Tracker<R>,
    params: PursuitParams,
    losses: u32,
    last_frame: Option<Frame>,
}

impl<C, B: MotorBus, R> Pursuit<C, B, R> {
    pub fn new(camera: C, drive: Drive<B>, tracker: Tracker<R>, params: PursuitParams) -> Self {
        Self {
            camera,
            drive,
            tracker,
            params,
            losses: 0,
            last_frame: None,
        }
    }

    pub fn tracker(&self) -> &Tracker<R> {
        &self.tracker
    }

    pub fn drive(&self) -> &Drive<B> {
        &self.drive
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Returns the running count of consecutive losses.
    pub fn losses(&self) -> u32 {
        self.losses
    }

    /// Returns the frame consumed by the most recent cycle.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Releases the motors. The release happens at most once no matter how
    /// often this is called.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        self.drive.shutdown()
    }
}

impl<C: Camera, B: MotorBus, R: Rng> Pursuit<C, B, R> {
    /// Runs one capture, track, actuate cycle.
    pub fn cycle(&mut self) -> Result<CycleReport, Error> {
        let frame = self.camera.capture()?;

        let report = match self.tracker.track(&frame) {
            TrackOutcome::Lost => {
                self.drive.stop()?;
                self.losses += 1;
                if self.losses < self.params.retry_threshold {
                    debug!(
                        losses = self.losses,
                        confidence = self.tracker.confidence(),
                        "target lost, holding"
                    );
                    CycleReport::Paused {
                        losses: self.losses,
                    }
                } else {
                    info!(
                        losses = self.losses,
                        turn = self.params.search_turn,
                        "target lost, searching"
                    );
                    self.drive.turn(self.params.search_turn)?;
                    self.losses = 0;
                    CycleReport::Searched
                }
            }
            TrackOutcome::Locked(center) => {
                self.losses = 0;
                let steering = 2.0 * center.col() as f64 / frame.cols() as f64 - 1.0;
                debug!(
                    row = center.row(),
                    col = center.col(),
                    steering,
                    confidence = self.tracker.confidence(),
                    "target locked, driving"
                );
                self.drive.drive(self.params.speed, steering)?;
                CycleReport::Drove { center, steering }
            }
        };

        self.last_frame = Some(frame);
        Ok(report)
    }

    /// Cycles until `cancel` is set or a hardware fault surfaces.
    ///
    /// The motors are released on every exit path; a capture or motor
    /// failure is returned after the release attempt.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<(), Error> {
        let outcome = loop {
            if cancel.load(Ordering::Relaxed) {
                break Ok(());
            }
            if let Err(err) = self.cycle() {
                break Err(err);
            }
        };

        let shutdown = self.drive.shutdown();
        outcome.and(shutdown)
    }
}
