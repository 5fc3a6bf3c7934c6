//! Visual target pursuit for small differential drive rovers.
//!
//! A particle filter follows a target template across grayscale camera
//! frames while a skid steer controller turns each position estimate into
//! wheel commands. When the target drops out of sight the loop holds
//! still, then sweeps in place to reacquire it.
//!
//! The moving parts are deliberately separable. [`tracker::Tracker`] only
//! needs frames, [`drive::Drive`] only needs a [`drive::MotorBus`], and
//! [`pursuit::Pursuit`] closes the loop over any [`camera::Camera`]. The
//! [`sim`] module provides scripted scenes and recording buses so the
//! whole loop runs off the rover.

pub mod camera;
pub mod config;
pub mod drive;
pub mod error;
pub mod image;
pub mod overlay;
pub mod particle;
pub mod pursuit;
pub mod sim;
pub mod tracker;
