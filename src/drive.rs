use crate::{config::DriveParams, error::Error};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Rotation sense of a motor channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Hardware boundary for sustained wheel power.
///
/// Channels are the fixed small integers of the motor controller board.
/// Implementations own the bus handle; no other component issues hardware
/// commands.
pub trait MotorBus {
    /// Applies sustained power to `channel` until the next command.
    fn set_wheel_power(
        &mut self,
        channel: u8,
        magnitude: u8,
        direction: Direction,
    ) -> Result<(), Error>;

    /// Releases every output channel, powered or not.
    fn release_all(&mut self) -> Result<(), Error>;
}

/// The last issued drive command.
///
/// Kept for diagnostics only. Reset to zero on stop and shutdown.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelCommand {
    pub speed: i16,
    pub steering: f64,
}

/// Skid-steer controller over a pair of wheel channels.
///
/// Exclusively owns its motor bus. Every exit path releases the motors:
/// [`shutdown`](Drive::shutdown) runs the release at most once, and dropping
/// an un-shutdown controller releases as a last resort.
pub struct Drive<B: MotorBus> {
    bus: B,
    params: DriveParams,
    command: WheelCommand,
    released: bool,
}

impl<B: MotorBus> Drive<B> {
    /// Takes ownership of `bus` and brings both wheels to a halt.
    pub fn new(bus: B, params: DriveParams) -> Result<Self, Error> {
        let mut drive = Self {
            bus,
            params,
            command: WheelCommand::default(),
            released: false,
        };
        drive.stop()?;

        Ok(drive)
    }

    /// Puts the rover into sustained motion.
    ///
    /// `speed` is clamped to [-255, 255] and its sign selects forward or
    /// backward travel; zero stops. `steering` is clamped to [-1, 1] with
    /// negative values turning left. The outer wheel always runs at
    /// `|speed|` and the inner wheel is throttled in proportion to how
    /// sharp the turn is.
    pub fn drive(&mut self, speed: i16, steering: f64) -> Result<(), Error> {
        let speed = speed.clamp(-255, 255);
        let steering = steering.clamp(-1.0, 1.0);
        if speed == 0 {
            return self.stop();
        }

        let direction = match speed > 0 {
            true => Direction::Forward,
            false => Direction::Backward,
        };
        let outer = speed.unsigned_abs() as u8;
        let inner = ((1.0 - steering.abs()) * f64::from(outer)).round() as u8;
        let (left, right) = match steering >= 0.0 {
            true => (outer, inner),
            false => (inner, outer),
        };

        self.bus
            .set_wheel_power(self.params.left_channel, left, direction)?;
        self.bus
            .set_wheel_power(self.params.right_channel, right, direction)?;
        self.command = WheelCommand { speed, steering };
        debug!(speed, steering, left, right, "drive");

        Ok(())
    }

    /// Rotates in place by roughly `angle` radians. Positive turns right.
    ///
    /// Open loop: both wheels counter-rotate at the configured turn
    /// magnitude for a hold proportional to `|angle|`, then halt. The
    /// seconds-per-radian calibration is hardware specific and supplied
    /// through [`DriveParams`].
    pub fn turn(&mut self, angle: f64) -> Result<(), Error> {
        self.stop()?;
        if angle == 0.0 {
            return Ok(());
        }

        let (left, right) = match angle > 0.0 {
            true => (Direction::Forward, Direction::Backward),
            false => (Direction::Backward, Direction::Forward),
        };
        let magnitude = self.params.turn_magnitude;

        self.bus
            .set_wheel_power(self.params.left_channel, magnitude, left)?;
        self.bus
            .set_wheel_power(self.params.right_channel, magnitude, right)?;
        debug!(angle, magnitude, "turning in place");

        self.hold(self.params.secs_per_radian * angle.abs());
        self.stop()
    }

    /// Drives straight for roughly `distance` centimeters, then halts.
    ///
    /// Negative distances back up. Open loop, with the same calibration
    /// caveats as [`turn`](Drive::turn).
    pub fn advance(&mut self, distance: f64) -> Result<(), Error> {
        if distance == 0.0 {
            return Ok(());
        }

        let magnitude = i16::from(self.params.advance_magnitude);
        let speed = match distance > 0.0 {
            true => magnitude,
            false => -magnitude,
        };

        self.drive(speed, 0.0)?;
        self.hold(self.params.secs_per_cm * distance.abs());
        self.stop()
    }

    /// Zeroes both wheels. Idempotent.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.bus
            .set_wheel_power(self.params.left_channel, 0, Direction::Forward)?;
        self.bus
            .set_wheel_power(self.params.right_channel, 0, Direction::Forward)?;
        self.command = WheelCommand::default();

        Ok(())
    }

    /// Releases every motor output.
    ///
    /// Runs the release at most once; later calls are no-ops. Dropping the
    /// controller covers control paths that never reach here.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        if self.released {
            return Ok(());
        }

        self.bus.release_all()?;
        self.released = true;
        self.command = WheelCommand::default();
        debug!("motor outputs released");

        Ok(())
    }

    /// Returns the last issued drive command.
    pub fn command(&self) -> WheelCommand {
        self.command
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn hold(&self, secs: f64) {
        if secs > 0.0 {
            thread::sleep(Duration::from_secs_f64(secs));
        }
    }
}

impl<B: MotorBus> Drop for Drive<B> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.bus.release_all();
        }
    }
}
