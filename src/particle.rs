use crate::image::{similarity, Frame};
use nalgebra::Vector2;
use rand::Rng;
use rayon::prelude::*;

/// A single position hypothesis in frame coordinates.
///
/// Coordinates are signed because diffusion noise may push a hypothesis past
/// the frame edge. Such a hypothesis weighs zero until resampling pulls it
/// back toward the survivors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Particle {
    row: i32,
    col: i32,
}

impl Particle {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn col(&self) -> i32 {
        self.col
    }
}

/// A weighted set of position hypotheses over a frame.
///
/// The weights always sum to one. Weighing scores every hypothesis against
/// the current template, and resampling redraws the set in proportion to
/// those scores.
#[derive(Clone, Debug)]
pub struct ParticleSet {
    particles: Vec<Particle>,
    weights: Vec<f64>,
}

impl ParticleSet {
    /// Draws `count` hypotheses uniformly over a `rows` by `cols` frame.
    ///
    /// Panics if `count` is zero or the frame has no pixels.
    pub fn scatter<R: Rng>(count: usize, rows: usize, cols: usize, rng: &mut R) -> Self {
        if count == 0 {
            panic!("particle count must be greater than zero");
        }
        if rows == 0 || cols == 0 {
            panic!("scatter region must have pixels");
        }

        let particles = (0..count)
            .map(|_| {
                Particle::new(
                    rng.random_range(0..rows as i32),
                    rng.random_range(0..cols as i32),
                )
            })
            .collect();

        Self {
            particles,
            weights: vec![1.0 / count as f64; count],
        }
    }

    /// Creates a set from known hypotheses with uniform weights.
    ///
    /// Panics if `particles` is empty.
    pub fn from_particles(particles: Vec<Particle>) -> Self {
        if particles.is_empty() {
            panic!("particle count must be greater than zero");
        }

        let weights = vec![1.0 / particles.len() as f64; particles.len()];
        Self { particles, weights }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    pub fn weights(&self) -> &[f64] {
        self.weights.as_slice()
    }

    /// Scores every hypothesis against `template` and renormalizes.
    ///
    /// Each hypothesis is scored by extracting the template sized patch
    /// centered on it and comparing that patch to the template. Hypotheses
    /// whose patch falls outside the frame score zero. Returns the maximum
    /// raw score before normalization, which is the filter's confidence
    /// that any hypothesis still sits on the target.
    pub fn weigh(&mut self, template: &Frame, frame: &Frame, sigma: f64) -> f64 {
        let (rows, cols) = template.dimensions();
        self.weights = self
            .particles
            .par_iter()
            .map(|particle| {
                frame
                    .patch(particle.row, particle.col, rows, cols)
                    .map(|patch| {
                        // The patch has the template's dimensions by construction.
                        similarity(&patch, template, sigma).expect("dimensions match")
                    })
                    .unwrap_or(0.0)
            })
            .collect();

        let max = self.weights.iter().copied().fold(0.0, f64::max);
        normalize(&mut self.weights);
        max
    }

    /// Redraws the set in proportion to the current weights, then perturbs
    /// every draw by up to `jitter` pixels per axis.
    ///
    /// Uses the resampling wheel: starting from a random index, each draw
    /// advances a running budget by a uniform step in [0, 2 * max weight)
    /// and walks the wheel until the budget is spent. Heavy hypotheses are
    /// drawn more often; the jitter keeps the survivors from collapsing
    /// onto a single coordinate.
    ///
    /// The weights are left untouched and no longer describe the perturbed
    /// positions, so the set must be weighed again before its weights or
    /// mean are read.
    pub fn resample<R: Rng>(&mut self, jitter: i32, rng: &mut R) {
        let jitter = jitter.abs();
        let count = self.particles.len();
        let max = self.weights.iter().copied().fold(0.0, f64::max);

        let mut index = rng.random_range(0..count);
        let mut beta = 0.0;
        let mut drawn = Vec::with_capacity(count);
        for _ in 0..count {
            beta += rng.random_range(0.0..2.0 * max);
            while beta > self.weights[index] {
                beta -= self.weights[index];
                index = (index + 1) % count;
            }

            let parent = self.particles[index];
            drawn.push(Particle::new(
                parent.row + rng.random_range(-jitter..=jitter),
                parent.col + rng.random_range(-jitter..=jitter),
            ));
        }

        self.particles = drawn;
    }

    /// Returns the weighted mean of the hypothesis coordinates as
    /// (row, col).
    pub fn mean(&self) -> Vector2<f64> {
        self.particles
            .iter()
            .zip(self.weights.iter())
            .fold(Vector2::zeros(), |acc, (particle, weight)| {
                acc + Vector2::new(particle.row as f64, particle.col as f64) * *weight
            })
    }
}

/// Scales `weights` to sum to one.
///
/// A set where every hypothesis scored zero carries no information, so it
/// degenerates to uniform rather than dividing by zero.
fn normalize(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for weight in weights.iter_mut() {
            *weight /= total;
        }
    } else {
        let uniform = 1.0 / weights.len() as f64;
        weights.fill(uniform);
    }
}
