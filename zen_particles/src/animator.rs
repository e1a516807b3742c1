//! Per-frame particle animation.
//!
//! The animator owns the live position buffer the renderer draws.  Every
//! frame each coordinate moves a fraction of the way toward its target,
//! scaled by the current expansion and shaken by a little jitter, so the
//! cloud flows between shapes and never fully settles.

use std::f32::consts::TAU;

use hand_gesture::GestureSample;
use particle_shapes::{uniform_cube, PointBuffer};
use rand::Rng;

// ════════════════════════════════════════════════════════════════════════════
// Tuning constants
// ════════════════════════════════════════════════════════════════════════════

/// Interpolation rate; the per-frame factor is `LERP_RATE × delta`.
pub const LERP_RATE: f32 = 3.0;
/// Rigid spin (rad/s) while no hand is in view.
pub const IDLE_SPIN: f32 = 0.1;
/// Rigid spin (rad/s) while a hand is steering the cloud.
pub const ACTIVE_SPIN: f32 = 0.02;
/// Half-extent of the scattered cube particles start from.
pub const EXPLODED_HALF_EXTENT: f32 = 5.0;

// ════════════════════════════════════════════════════════════════════════════
// Motion: the global modifiers for one frame
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// Scale applied to every target coordinate.
    pub expansion:       f32,
    /// Full width of the uniform per-axis jitter.
    pub noise_amplitude: f32,
}

impl Motion {
    /// Unscaled and jitter-free.
    pub const STILL: Motion = Motion { expansion: 1.0, noise_amplitude: 0.0 };

    /// Hand openness drives the scale; without a hand the cloud breathes.
    pub fn from_gesture(gesture: GestureSample, elapsed: f32) -> Self {
        if gesture.detected {
            Motion {
                expansion:       0.5 + gesture.distance * 3.5,
                noise_amplitude: 0.02 + gesture.distance * 0.1,
            }
        } else {
            Motion {
                expansion:       1.0 + (elapsed * 0.8).sin() * 0.2,
                noise_amplitude: 0.05,
            }
        }
    }
}

/// Clock and gesture inputs for one tick.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    /// Seconds since the animation started.
    pub elapsed: f32,
    /// Seconds since the previous tick.
    pub delta:   f32,
    pub gesture: GestureSample,
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleAnimator
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ParticleAnimator {
    live:       PointBuffer,
    /// Rigid rotation about +Y, applied at draw time, in `[0, 2π)`.
    rotation_y: f32,
    frames:     u64,
}

impl ParticleAnimator {
    /// Start with `point_count` particles scattered through a wide cube.
    pub fn new<R: Rng>(point_count: usize, rng: &mut R) -> Self {
        ParticleAnimator {
            live:       uniform_cube(rng, point_count, EXPLODED_HALF_EXTENT),
            rotation_y: 0.0,
            frames:     0,
        }
    }

    /// Start from explicit positions.
    pub fn with_positions(live: PointBuffer) -> Self {
        ParticleAnimator { live, rotation_y: 0.0, frames: 0 }
    }

    pub fn live(&self)       -> &PointBuffer { &self.live }
    pub fn rotation_y(&self) -> f32          { self.rotation_y }
    pub fn frames(&self)     -> u64          { self.frames }

    /// Advance one rendered frame.  Returns the modifiers that were applied.
    pub fn tick<R: Rng>(&mut self, target: &PointBuffer, input: FrameInput, rng: &mut R) -> Motion {
        let motion = Motion::from_gesture(input.gesture, input.elapsed);
        self.step(target, motion, input.delta, rng);
        self.spin(input.gesture.detected, input.delta);
        motion
    }

    /// Move every live coordinate toward `target × expansion + jitter`.
    ///
    /// A target with a different point count re-scatters the live buffer
    /// first, so a point-count change flies in like a fresh start.
    pub fn step<R: Rng>(&mut self, target: &PointBuffer, motion: Motion, delta: f32, rng: &mut R) {
        if self.live.point_count() != target.point_count() {
            log::debug!(
                "particle count {} → {}, re-scattering",
                self.live.point_count(), target.point_count()
            );
            self.live = uniform_cube(rng, target.point_count(), EXPLODED_HALF_EXTENT);
        }

        let lerp = LERP_RATE * delta;
        let Motion { expansion, noise_amplitude } = motion;

        for (live, &t) in self.live.as_mut_slice().iter_mut().zip(target.as_slice()) {
            let jitter = (rng.gen::<f32>() - 0.5) * noise_amplitude;
            *live += (t * expansion + jitter - *live) * lerp;
        }
        self.frames += 1;
    }

    fn spin(&mut self, steering: bool, delta: f32) {
        let rate = if steering { ACTIVE_SPIN } else { IDLE_SPIN };
        self.rotation_y = (self.rotation_y + rate * delta).rem_euclid(TAU);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
