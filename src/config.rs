use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Particle filter tuning.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Number of position hypotheses.
    pub particles: usize,

    /// Width of the Gaussian similarity kernel in intensity units.
    pub sigma: f64,

    /// Raw score below which the target counts as lost.
    pub confidence_floor: f64,

    /// Maximum per axis displacement of a resampled hypothesis, in pixels.
    pub jitter: i32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            particles: 100,
            sigma: 10.0,
            confidence_floor: 0.1,
            jitter: 10,
        }
    }
}

/// Motor layout and open loop timing calibration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveParams {
    /// Controller channel of the left wheel pair.
    pub left_channel: u8,

    /// Controller channel of the right wheel pair.
    pub right_channel: u8,

    /// Wheel power used for in place turns.
    pub turn_magnitude: u8,

    /// Seconds of turning per radian at `turn_magnitude`.
    pub secs_per_radian: f64,

    /// Wheel power used for straight advances.
    pub advance_magnitude: u8,

    /// Seconds of driving per centimeter at `advance_magnitude`.
    pub secs_per_cm: f64,
}

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            left_channel: 1,
            right_channel: 2,
            turn_magnitude: 128,
            secs_per_radian: 0.63,
            advance_magnitude: 128,
            secs_per_cm: 0.011,
        }
    }
}

/// Control loop policy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuitParams {
    /// Cruise speed handed to the drive while the target is locked.
    pub speed: i16,

    /// Consecutive losses tolerated before searching.
    pub retry_threshold: u32,

    /// Search turn size in radians. Positive turns right.
    pub search_turn: f64,
}

impl Default for PursuitParams {
    fn default() -> Self {
        Self {
            speed: 50,
            retry_threshold: 5,
            search_turn: 0.5,
        }
    }
}

/// Complete parameter document for a pursuit run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowParams {
    pub tracker: TrackerParams,
    pub drive: DriveParams,
    pub pursuit: PursuitParams,
}

/// Reads a parameter document from a JSON file.
///
/// Missing fields take their defaults, so a file may override only the
/// values being tuned.
pub fn load(path: &Path) -> Result<FollowParams, Error> {
    let serialized = fs::read_to_string(path).map_err(|err| Error::Params {
        reason: format!("{}: {err}", path.display()),
    })?;

    serde_json::from_str(&serialized).map_err(|err| Error::Params {
        reason: format!("{}: {err}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    #[test]
    fn partial_document_keeps_defaults() {
        let params: FollowParams =
            serde_json::from_str(r#"{ "pursuit": { "speed": 80 } }"#).unwrap();

        assert_eq!(params.pursuit.speed, 80);
        assert_eq!(params.pursuit.retry_threshold, 5);
        assert_eq!(params.tracker.particles, 100);
        assert_eq!(params.drive.left_channel, 1);
        assert_relative_eq!(params.drive.secs_per_radian, 0.63);
    }

    #[test]
    fn document_roundtrip() {
        let mut params = FollowParams::default();
        params.tracker.jitter = 4;
        params.drive.turn_magnitude = 200;

        let serialized = serde_json::to_string(&params).unwrap();
        let decoded: FollowParams = serde_json::from_str(&serialized).unwrap();

        assert_eq!(decoded.tracker.jitter, 4);
        assert_eq!(decoded.drive.turn_magnitude, 200);
        assert_eq!(decoded.pursuit.speed, 50);
    }

    #[test]
    fn load_reads_overrides_from_disk() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{ "tracker": { "particles": 250 } }"#).unwrap();

        let params = load(file.path()).unwrap();
        assert_eq!(params.tracker.particles, 250);
        assert_relative_eq!(params.tracker.sigma, 10.0);
    }

    #[test]
    fn load_rejects_malformed_documents() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "{ not json").unwrap();

        assert!(matches!(load(file.path()), Err(Error::Params { .. })));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(load(&path), Err(Error::Params { .. })));
    }
}
