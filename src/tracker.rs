use crate::{
    config::TrackerParams,
    error::Error,
    image::{Frame, PixelCoordinate},
    particle::ParticleSet,
};
use rand::Rng;
use tracing::debug;

/// Outcome of one tracking cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The target was located at the contained frame coordinate.
    Locked(PixelCoordinate),

    /// No hypothesis cleared the confidence floor this cycle.
    Lost,
}

impl TrackOutcome {
    /// Returns the locked coordinate, or None for a lost target.
    pub fn locked(&self) -> Option<PixelCoordinate> {
        match self {
            TrackOutcome::Locked(center) => Some(*center),
            TrackOutcome::Lost => None,
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, TrackOutcome::Lost)
    }
}

/// Follows a target's position across a stream of frames.
///
/// The target is described only by its appearance, a small template patch.
/// Each cycle weighs a set of position hypotheses against the template,
/// resamples the survivors with diffusion noise, and reads the estimate off
/// the weighted mean. On a lock the tracker re-adopts the patch under the
/// estimate as the new template, so gradual appearance changes do not
/// stale it out of a lock.
///
/// When no hypothesis scores above the confidence floor the target is
/// reported [`Lost`](TrackOutcome::Lost) and the set is rescattered across
/// the whole frame to begin the search again.
pub struct Tracker<R> {
    template: Frame,
    particles: ParticleSet,
    center: Option<PixelCoordinate>,
    confidence: f64,
    params: TrackerParams,
    rng: R,
}

impl<R> Tracker<R> {
    /// Returns the maximum raw hypothesis score of the last cycle.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the last locked position, or None if the target is lost.
    pub fn center(&self) -> Option<PixelCoordinate> {
        self.center
    }

    /// Returns the target's current appearance.
    pub fn template(&self) -> &Frame {
        &self.template
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }
}

impl<R: Rng> Tracker<R> {
    /// Creates a tracker for the target described by `template`.
    ///
    /// The hypothesis set is scattered over `frame` and one tracking cycle
    /// runs immediately, so a caller may read an initial center right after
    /// construction.
    ///
    /// Returns an error if `template` has no pixels or does not fit inside
    /// `frame`.
    pub fn new(
        template: Frame,
        frame: &Frame,
        params: TrackerParams,
        mut rng: R,
    ) -> Result<Self, Error> {
        if template.rows() == 0 || template.cols() == 0 {
            return Err(Error::EmptyTemplate);
        }
        if template.rows() > frame.rows() || template.cols() > frame.cols() {
            return Err(Error::TemplateTooLarge {
                template_rows: template.rows(),
                template_cols: template.cols(),
                frame_rows: frame.rows(),
                frame_cols: frame.cols(),
            });
        }

        let particles = ParticleSet::scatter(params.particles, frame.rows(), frame.cols(), &mut rng);
        let mut tracker = Self {
            template,
            particles,
            center: None,
            confidence: 0.0,
            params,
            rng,
        };
        tracker.track(frame);

        Ok(tracker)
    }

    /// Runs one tracking cycle against `frame`.
    ///
    /// Frames are expected to share the camera's fixed dimensions.
    pub fn track(&mut self, frame: &Frame) -> TrackOutcome {
        self.confidence = self.particles.weigh(&self.template, frame, self.params.sigma);
        if self.confidence < self.params.confidence_floor {
            // Nothing resembles the target anywhere near the set. Restart
            // the search from a fresh uniform scatter.
            self.particles = ParticleSet::scatter(
                self.params.particles,
                frame.rows(),
                frame.cols(),
                &mut self.rng,
            );
            self.center = None;
            debug!(confidence = self.confidence, "target lost, rescattered");
            return TrackOutcome::Lost;
        }

        self.particles.resample(self.params.jitter, &mut self.rng);

        // The jitter moved every hypothesis, so the scores must be
        // refreshed before the mean is read.
        self.confidence = self.particles.weigh(&self.template, frame, self.params.sigma);
        if self.confidence < self.params.confidence_floor {
            // The set stays put. It is still concentrated near the last
            // good estimate, which is the best place to recover from.
            self.center = None;
            debug!(confidence = self.confidence, "target faded after resampling");
            return TrackOutcome::Lost;
        }

        let mean = self.particles.mean();
        let row = (mean.x.round() as i64).clamp(0, frame.rows() as i64 - 1) as usize;
        let col = (mean.y.round() as i64).clamp(0, frame.cols() as i64 - 1) as usize;
        let center = PixelCoordinate::new(row, col);

        // Adopt the target's current appearance when the whole patch under
        // the estimate is visible.
        if let Some(appearance) = frame.patch(
            row as i32,
            col as i32,
            self.template.rows(),
            self.template.cols(),
        ) {
            self.template = appearance;
        }

        self.center = Some(center);
        debug!(row, col, confidence = self.confidence, "target locked");
        TrackOutcome::Locked(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn params() -> TrackerParams {
        TrackerParams {
            particles: 100,
            sigma: 10.0,
            confidence_floor: 0.1,
            jitter: 2,
        }
    }

    /// Paints a white block with its top left corner at (`top`, `left`)
    /// onto a zeroed frame.
    fn frame_with_block(rows: usize, cols: usize, top: usize, left: usize, size: usize) -> Frame {
        let mut pixels = vec![0u8; rows * cols];
        for row in top..top + size {
            for col in left..left + size {
                pixels[row * cols + col] = 255;
            }
        }
        Frame::from_pixels(rows, cols, pixels).unwrap()
    }

    #[test]
    fn rejects_template_larger_than_frame() {
        let rng = StdRng::seed_from_u64(0);
        let result = Tracker::new(
            Frame::filled(10, 10, 0),
            &Frame::filled(8, 8, 0),
            params(),
            rng,
        );

        assert!(matches!(result, Err(Error::TemplateTooLarge { .. })));
    }

    #[test]
    fn rejects_empty_template() {
        let rng = StdRng::seed_from_u64(0);
        let result = Tracker::new(
            Frame::filled(0, 4, 0),
            &Frame::filled(8, 8, 0),
            params(),
            rng,
        );

        assert!(matches!(result, Err(Error::EmptyTemplate)));
    }

    #[test]
    fn locks_immediately_on_an_unmistakable_scene() {
        // Template matches the frame everywhere, so every hypothesis scores
        // a perfect match and the first cycle already locks.
        let frame = Frame::filled(24, 24, 40);
        let rng = StdRng::seed_from_u64(5);
        let tracker = Tracker::new(Frame::filled(4, 4, 40), &frame, params(), rng).unwrap();

        assert!(tracker.confidence() > 0.99);
        assert!(tracker.center().is_some());
    }

    #[test]
    fn locks_onto_distinct_target() {
        // White block of 8 at rows 12..20, cols 12..20, centered at (16, 16).
        let frame = frame_with_block(32, 32, 12, 12, 8);
        let template = Frame::filled(6, 6, 255);

        let rng = StdRng::seed_from_u64(11);
        let mut tracker = Tracker::new(template, &frame, params(), rng).unwrap();

        for _ in 0..50 {
            if let TrackOutcome::Locked(center) = tracker.track(&frame) {
                assert!(center.row().abs_diff(16) <= 3, "row {} off center", center.row());
                assert!(center.col().abs_diff(16) <= 3, "col {} off center", center.col());
                assert!(tracker.confidence() >= 0.1);
                return;
            }
        }

        panic!("tracker never locked onto the block");
    }

    #[test]
    fn reseeds_when_no_hypothesis_scores() {
        let frame = frame_with_block(32, 32, 12, 12, 8);
        let template = Frame::filled(6, 6, 255);
        let rng = StdRng::seed_from_u64(11);
        let mut tracker = Tracker::new(template, &frame, params(), rng).unwrap();

        // A flat frame resembles the white template nowhere.
        let empty = Frame::filled(32, 32, 0);
        let outcome = tracker.track(&empty);

        assert!(outcome.is_lost());
        assert!(tracker.center().is_none());
        assert_eq!(tracker.particles().len(), 100);
        assert!(tracker
            .particles()
            .particles()
            .iter()
            .all(|p| (0..32).contains(&p.row()) && (0..32).contains(&p.col())));
    }

    #[test]
    fn keeps_jittered_set_when_lock_fades() {
        // A tiny target and a huge jitter: the first weighing finds the
        // block, but resampling flings the survivors so wide that the
        // second weighing comes up empty. That loss must keep the jittered
        // set instead of rescattering, which shows up as hypotheses pushed
        // beyond the frame edge.
        let frame = frame_with_block(16, 16, 6, 6, 5);
        let template = Frame::filled(5, 5, 255);
        let params = TrackerParams {
            particles: 100,
            sigma: 10.0,
            confidence_floor: 0.1,
            jitter: 50,
        };

        let rng = StdRng::seed_from_u64(21);
        let mut tracker = Tracker::new(template, &frame, params, rng).unwrap();

        for _ in 0..200 {
            let outcome = tracker.track(&frame);
            let out_of_frame = tracker
                .particles()
                .particles()
                .iter()
                .any(|p| !(0..16).contains(&p.row()) || !(0..16).contains(&p.col()));

            if outcome.is_lost() && out_of_frame {
                assert!(tracker.center().is_none());
                assert_eq!(tracker.particles().len(), 100);
                return;
            }
        }

        panic!("lock never faded after resampling");
    }

    #[test]
    fn adopts_the_current_appearance() {
        let bright = frame_with_block(32, 32, 12, 12, 8);
        let template = Frame::filled(6, 6, 255);

        let rng = StdRng::seed_from_u64(11);
        let mut tracker = Tracker::new(template, &bright, params(), rng).unwrap();

        let mut locked = false;
        for _ in 0..50 {
            if !tracker.track(&bright).is_lost() {
                locked = true;
                break;
            }
        }
        assert!(locked, "tracker never locked onto the block");

        // The target dims slightly. The lock must survive and the template
        // must follow the new appearance.
        let mut dimmed = vec![0u8; 32 * 32];
        for row in 12..20 {
            for col in 12..20 {
                dimmed[row * 32 + col] = 250;
            }
        }
        let dimmed = Frame::from_pixels(32, 32, dimmed).unwrap();

        let outcome = tracker.track(&dimmed);
        assert!(!outcome.is_lost());
        assert!(tracker.template().as_bytes().iter().all(|&p| p == 250));
    }

    #[test]
    fn hypothesis_count_is_invariant() {
        let frame = frame_with_block(32, 32, 12, 12, 8);
        let empty = Frame::filled(32, 32, 0);
        let template = Frame::filled(6, 6, 255);

        let rng = StdRng::seed_from_u64(31);
        let mut tracker = Tracker::new(template, &frame, params(), rng).unwrap();

        for cycle in 0..30 {
            match cycle % 3 {
                0 | 1 => tracker.track(&frame),
                _ => tracker.track(&empty),
            };
            assert_eq!(tracker.particles().len(), 100);
        }
    }
}
