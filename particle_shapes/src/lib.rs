//! # particle_shapes
//!
//! Procedural point clouds for the particle visualizer.  Every shape is a
//! flat [`PointBuffer`] of `3·N` coordinates, sampled point-by-point from a
//! caller-supplied random source.
//!
//! | Archetype | Rule |
//! |---|---|
//! | Heart | classic `16 sin³t / 13 cos t − …` curve, scaled ×0.1, shallow depth |
//! | Flower | 5-petal rose curve `cos 5θ + 2` with a cup-shaped profile |
//! | Saturn | 60 % flat ring (r ∈ [2.5, 4)), 40 % solid sphere (r ≤ 1.5) |
//! | MeditationFigure | head sphere, ellipsoid body, flattened annulus base |
//! | Fireworks | solid sphere, r ≤ 4 |
//! | AiGenerated | external point set repeated cyclically |
//! | DefaultCube | every coordinate uniform in [−2, 2) |
//!
//! The random source is any [`rand::Rng`]; pass a seeded
//! [`rand::rngs::StdRng`] for reproducible output.
//!
//! ```rust
//! use particle_shapes::{generate, ShapeArchetype};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let heart = generate(ShapeArchetype::Heart, 6000, None, &mut rng);
//! assert_eq!(heart.as_slice().len(), 18_000);
//! ```

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    /// A flat coordinate list whose length is not a multiple of three.
    #[error("coordinate buffer of length {len} is not a whole number of (x, y, z) triples")]
    RaggedBuffer { len: usize },

    #[error("unknown shape archetype \"{0}\"")]
    UnknownArchetype(String),
}

// ════════════════════════════════════════════════════════════════════════════
// ShapeArchetype
// ════════════════════════════════════════════════════════════════════════════

/// A named procedural shape family, or one of the two non-parametric sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeArchetype {
    Heart,
    Flower,
    Saturn,
    MeditationFigure,
    Fireworks,
    /// Points supplied by the generative service.
    AiGenerated,
    /// Uniform cube; also the fallback when no AI points are available.
    DefaultCube,
}

impl ShapeArchetype {
    /// Every archetype, in menu order.
    pub fn all() -> [ShapeArchetype; 7] {
        use ShapeArchetype::*;
        [Heart, Flower, Saturn, MeditationFigure, Fireworks, AiGenerated, DefaultCube]
    }

    /// The five parametric shapes a user can pick directly.
    pub fn procedural() -> [ShapeArchetype; 5] {
        use ShapeArchetype::*;
        [Heart, Flower, Saturn, MeditationFigure, Fireworks]
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ShapeArchetype::Heart            => "Heart",
            ShapeArchetype::Flower           => "Flower",
            ShapeArchetype::Saturn           => "Saturn",
            ShapeArchetype::MeditationFigure => "Meditation",
            ShapeArchetype::Fireworks        => "Fireworks",
            ShapeArchetype::AiGenerated      => "AI Generated",
            ShapeArchetype::DefaultCube      => "Cube",
        }
    }

    /// Sample a single point of this archetype.
    ///
    /// `AiGenerated` has no procedural rule and samples the cube; use
    /// [`generate`] to repeat an AI point set instead.
    pub fn sample_point<R: Rng>(self, rng: &mut R) -> [f32; 3] {
        match self {
            ShapeArchetype::Heart            => heart(rng),
            ShapeArchetype::Flower           => flower(rng),
            ShapeArchetype::Saturn           => saturn(rng),
            ShapeArchetype::MeditationFigure => meditation(rng),
            ShapeArchetype::Fireworks        => fireworks(rng),
            ShapeArchetype::AiGenerated
            | ShapeArchetype::DefaultCube    => cube(rng, DEFAULT_CUBE_HALF_EXTENT),
        }
    }
}

impl fmt::Display for ShapeArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeArchetype {
    type Err = ShapeError;

    /// Case-insensitive; accepts the display name or a short alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.trim().to_ascii_lowercase().chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "heart"                                  => Ok(ShapeArchetype::Heart),
            "flower" | "rose"                        => Ok(ShapeArchetype::Flower),
            "saturn" | "planet"                      => Ok(ShapeArchetype::Saturn),
            "meditation" | "meditationfigure"        => Ok(ShapeArchetype::MeditationFigure),
            "fireworks" | "firework"                 => Ok(ShapeArchetype::Fireworks),
            "ai" | "aigenerated"                     => Ok(ShapeArchetype::AiGenerated),
            "cube" | "default" | "defaultcube"       => Ok(ShapeArchetype::DefaultCube),
            _ => Err(ShapeError::UnknownArchetype(s.to_string())),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PointBuffer
// ════════════════════════════════════════════════════════════════════════════

/// A flat, contiguous `[x0, y0, z0, x1, y1, z1, …]` coordinate buffer.
///
/// The length is always a multiple of three; every constructor upholds it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointBuffer {
    coords: Vec<f32>,
}

impl PointBuffer {
    /// `point_count` points at the origin.
    pub fn zeroed(point_count: usize) -> Self {
        PointBuffer { coords: vec![0.0; point_count * 3] }
    }

    /// Wrap a flat coordinate list, rejecting a trailing partial triple.
    pub fn from_coords(coords: Vec<f32>) -> Result<Self, ShapeError> {
        if coords.len() % 3 != 0 {
            return Err(ShapeError::RaggedBuffer { len: coords.len() });
        }
        Ok(PointBuffer { coords })
    }

    /// Build from whole points.
    pub fn from_points<I: IntoIterator<Item = [f32; 3]>>(points: I) -> Self {
        let coords = points.into_iter().flatten().collect();
        PointBuffer { coords }
    }

    pub fn point_count(&self) -> usize { self.coords.len() / 3 }
    pub fn is_empty(&self)    -> bool  { self.coords.is_empty() }
    pub fn as_slice(&self)    -> &[f32] { &self.coords }

    /// Mutable coordinate access; the length cannot change through a slice.
    pub fn as_mut_slice(&mut self) -> &mut [f32] { &mut self.coords }

    pub fn into_coords(self) -> Vec<f32> { self.coords }

    /// Point `i` as `[x, y, z]`.  Panics if `i >= point_count()`.
    pub fn point(&self, i: usize) -> [f32; 3] {
        let i3 = i * 3;
        [self.coords[i3], self.coords[i3 + 1], self.coords[i3 + 2]]
    }

    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.coords.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// Axis-aligned `(min, max)` corners, or `None` for an empty buffer.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut it = self.points();
        let first = it.next()?;
        Some(it.fold((first, first), |(mut lo, mut hi), p| {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
            (lo, hi)
        }))
    }

    /// Mean position, or `None` for an empty buffer.
    pub fn centroid(&self) -> Option<[f32; 3]> {
        let n = self.point_count();
        if n == 0 { return None; }
        let sum = self.points().fold([0.0f64; 3], |mut acc, p| {
            for k in 0..3 { acc[k] += p[k] as f64; }
            acc
        });
        Some([
            (sum[0] / n as f64) as f32,
            (sum[1] / n as f64) as f32,
            (sum[2] / n as f64) as f32,
        ])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// generate: the public entry point
// ════════════════════════════════════════════════════════════════════════════

/// Half-width of the [`ShapeArchetype::DefaultCube`] volume.
pub const DEFAULT_CUBE_HALF_EXTENT: f32 = 2.0;

/// Generate `point_count` points of `archetype`.
///
/// For [`ShapeArchetype::AiGenerated`] with a non-empty `ai_points`, the
/// source points are repeated cyclically (`out[i] = ai[i mod M]`); with no
/// (or empty) AI points the cube rule applies.
pub fn generate<R: Rng>(
    archetype:   ShapeArchetype,
    point_count: usize,
    ai_points:   Option<&PointBuffer>,
    rng:         &mut R,
) -> PointBuffer {
    if archetype == ShapeArchetype::AiGenerated {
        if let Some(ai) = ai_points.filter(|ai| !ai.is_empty()) {
            return repeat_cyclic(ai, point_count);
        }
        log::debug!("no AI points available, generating default cube");
    }

    let mut coords = Vec::with_capacity(point_count * 3);
    for _ in 0..point_count {
        coords.extend_from_slice(&archetype.sample_point(rng));
    }
    PointBuffer { coords }
}

/// [`generate`] with the thread-local random source.
pub fn generate_shape(
    archetype:   ShapeArchetype,
    point_count: usize,
    ai_points:   Option<&PointBuffer>,
) -> PointBuffer {
    generate(archetype, point_count, ai_points, &mut rand::thread_rng())
}

/// `point_count` points with every coordinate uniform in
/// `[−half_extent, half_extent)`.
pub fn uniform_cube<R: Rng>(rng: &mut R, point_count: usize, half_extent: f32) -> PointBuffer {
    let coords = (0..point_count * 3)
        .map(|_| (rng.gen::<f32>() - 0.5) * 2.0 * half_extent)
        .collect();
    PointBuffer { coords }
}

/// Fill `point_count` points by cycling through `source`.
fn repeat_cyclic(source: &PointBuffer, point_count: usize) -> PointBuffer {
    let src = source.as_slice();
    let m   = source.point_count();
    let mut coords = Vec::with_capacity(point_count * 3);
    for i in 0..point_count {
        let s3 = (i % m) * 3;
        coords.extend_from_slice(&src[s3..s3 + 3]);
    }
    PointBuffer { coords }
}

// ════════════════════════════════════════════════════════════════════════════
// Per-archetype sampling rules
// ════════════════════════════════════════════════════════════════════════════

/// Uniform angular density on the sphere: `(θ, φ)` with `φ = acos(2u − 1)`.
fn sphere_angles<R: Rng>(rng: &mut R) -> (f32, f32) {
    let theta = rng.gen_range(0.0..TAU);
    let phi   = (2.0 * rng.gen::<f32>() - 1.0).acos();
    (theta, phi)
}

/// A point inside a ball of `radius`, uniform by volume (cube-root radius).
fn solid_sphere<R: Rng>(rng: &mut R, radius: f32) -> [f32; 3] {
    let r = radius * rng.gen::<f32>().cbrt();
    let (theta, phi) = sphere_angles(rng);
    [
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    ]
}

/// Unscaled heart outline at parameter `t`.  `y` spans about `[−17, 11.9]`,
/// bottoming out at `t = π` and peaking on the lobes near `t ≈ ±1`.
fn heart_curve(t: f32) -> (f32, f32) {
    let x = 16.0 * t.sin().powi(3);
    let y = 13.0 * t.cos()
          -  5.0 * (2.0 * t).cos()
          -  2.0 * (3.0 * t).cos()
          -        (4.0 * t).cos();
    (x, y)
}

fn heart<R: Rng>(rng: &mut R) -> [f32; 3] {
    let t = rng.gen_range(0.0..TAU);
    // Depth is concentrated near the plane.
    let r = rng.gen::<f32>().sqrt();
    let u = rng.gen::<f32>();

    let (x, y) = heart_curve(t);
    let z = (u - 0.5) * 10.0 * r;

    [x * 0.1, y * 0.1, z * 0.1]
}

fn saturn<R: Rng>(rng: &mut R) -> [f32; 3] {
    if rng.gen::<f32>() < 0.6 {
        let angle  = rng.gen_range(0.0..TAU);
        let radius = rng.gen_range(2.5..4.0);
        let y      = rng.gen_range(-0.1..0.1);
        [angle.cos() * radius, y, angle.sin() * radius]
    } else {
        solid_sphere(rng, 1.5)
    }
}

fn flower<R: Rng>(rng: &mut R) -> [f32; 3] {
    const PETALS: f32 = 5.0;
    let (theta, phi) = sphere_angles(rng);
    let r = ((PETALS * theta).cos() + 2.0) * rng.gen::<f32>();
    [
        r * theta.cos() * phi.sin(),
        ((2.0 * phi).cos() + 1.0) * 0.5,
        r * theta.sin() * phi.sin(),
    ]
}

fn meditation<R: Rng>(rng: &mut R) -> [f32; 3] {
    let part = rng.gen::<f32>();
    if part < 0.2 {
        // Head
        let [x, y, z] = solid_sphere(rng, 0.6);
        [x, y + 2.2, z]
    } else if part < 0.6 {
        // Body
        let [x, y, z] = solid_sphere(rng, 1.0);
        [x * 1.2, y * 1.5 + 0.5, z * 0.8]
    } else {
        // Crossed legs: a flattened annulus
        let angle  = rng.gen_range(0.0..TAU);
        let radius = rng.gen_range(1.5..2.5);
        let y      = (rng.gen::<f32>() - 0.5) * 0.8 - 1.0;
        [radius * angle.cos(), y, radius * angle.sin()]
    }
}

fn fireworks<R: Rng>(rng: &mut R) -> [f32; 3] {
    solid_sphere(rng, 4.0)
}

fn cube<R: Rng>(rng: &mut R, half_extent: f32) -> [f32; 3] {
    let mut c = || (rng.gen::<f32>() - 0.5) * 2.0 * half_extent;
    [c(), c(), c()]
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::f32::consts::PI;

    const EPS: f32 = 1e-4;

    fn rng() -> StdRng { StdRng::seed_from_u64(0x5eed) }

    fn norm(p: [f32; 3]) -> f32 { (p[0]*p[0] + p[1]*p[1] + p[2]*p[2]).sqrt() }

    #[test]
    fn lengths_match_point_count() {
        let mut r = rng();
        for a in ShapeArchetype::all() {
            let b = generate(a, 123, None, &mut r);
            assert_eq!(b.as_slice().len(), 369, "{} buffer length", a);
            assert_eq!(b.point_count(), 123);
        }
    }

    #[test]
    fn zero_points_is_empty() {
        let b = generate(ShapeArchetype::Saturn, 0, None, &mut rng());
        assert!(b.is_empty());
        assert!(b.bounds().is_none());
    }

    #[test]
    fn same_seed_same_content() {
        for a in ShapeArchetype::procedural() {
            let b1 = generate(a, 500, None, &mut StdRng::seed_from_u64(42));
            let b2 = generate(a, 500, None, &mut StdRng::seed_from_u64(42));
            assert_eq!(b1, b2, "{} should be reproducible", a);
        }
    }

    #[test]
    fn heart_bounds() {
        let b = generate(ShapeArchetype::Heart, 6000, None, &mut rng());
        assert_eq!(b.as_slice().len(), 18_000);
        for [x, y, z] in b.points() {
            assert!(x.abs() <= 1.6 + EPS, "x = {}", x);
            assert!((-1.7 - EPS..=1.2 + EPS).contains(&y), "y = {}", y);
            assert!(z.abs() <= 0.5 + EPS, "z = {}", z);
        }
    }

    #[test]
    fn heart_y_extremes() {
        let (_, bottom) = heart_curve(PI);
        assert!((bottom * 0.1 + 1.7).abs() < 1e-4, "bottom {}", bottom);

        // lobes sit well above the cusp at t = 0
        let (_, lobe) = heart_curve(1.0);
        assert!((lobe * 0.1 - 1.1738).abs() < 1e-3, "lobe {}", lobe);
        let (_, cusp) = heart_curve(0.0);
        assert!((cusp * 0.1 - 0.5).abs() < 1e-4, "cusp {}", cusp);

        let peak = (0..=10_000)
            .map(|i| heart_curve(i as f32 * TAU / 10_000.0).1 * 0.1)
            .fold(f32::MIN, f32::max);
        assert!((1.19..=1.2).contains(&peak), "peak {}", peak);
    }

    #[test]
    fn saturn_ring_and_core() {
        let b = generate(ShapeArchetype::Saturn, 5000, None, &mut rng());
        let mut ring = 0usize;
        for p in b.points() {
            let planar = (p[0]*p[0] + p[2]*p[2]).sqrt();
            if planar >= 2.5 - EPS {
                ring += 1;
                assert!(planar < 4.0 + EPS, "ring radius {}", planar);
                assert!(p[1].abs() <= 0.1, "ring y {}", p[1]);
            } else {
                assert!(norm(p) <= 1.5 + EPS, "core point {:?}", p);
            }
        }
        // 60 % ring, loosely
        let share = ring as f32 / 5000.0;
        assert!((0.55..0.65).contains(&share), "ring share {}", share);
    }

    #[test]
    fn fireworks_inside_radius_four() {
        let b = generate(ShapeArchetype::Fireworks, 4000, None, &mut rng());
        for p in b.points() {
            assert!(norm(p) <= 4.0 + EPS);
        }
    }

    #[test]
    fn flower_cup_profile() {
        let b = generate(ShapeArchetype::Flower, 4000, None, &mut rng());
        for [x, y, z] in b.points() {
            assert!((0.0 - EPS..=1.0 + EPS).contains(&y), "y = {}", y);
            assert!((x*x + z*z).sqrt() <= 3.0 + EPS);
        }
    }

    #[test]
    fn meditation_parts() {
        let b = generate(ShapeArchetype::MeditationFigure, 4000, None, &mut rng());
        for p @ [x, y, z] in b.points() {
            let head = norm([x, y - 2.2, z]) <= 0.6 + EPS;
            let body = {
                let (bx, by, bz) = (x / 1.2, (y - 0.5) / 1.5, z / 0.8);
                (bx*bx + by*by + bz*bz).sqrt() <= 1.0 + EPS
            };
            let base = {
                let planar = (x*x + z*z).sqrt();
                (1.5 - EPS..2.5 + EPS).contains(&planar)
                    && (-1.4 - EPS..=-0.6 + EPS).contains(&y)
            };
            assert!(head || body || base, "stray point {:?}", p);
        }
    }

    #[test]
    fn default_cube_bounds() {
        let b = generate(ShapeArchetype::DefaultCube, 2000, None, &mut rng());
        for c in b.as_slice() {
            assert!((-2.0..2.0).contains(c));
        }
    }

    #[test]
    fn ai_points_repeat_cyclically() {
        let src = PointBuffer::from_coords(vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0,
        ]).unwrap();
        let b = generate(ShapeArchetype::AiGenerated, 10, Some(&src), &mut rng());
        assert_eq!(b.as_slice().len(), 30);
        for i in 0..10 {
            assert_eq!(b.point(i), src.point(i % 3));
        }
    }

    #[test]
    fn ai_without_points_falls_back_to_cube() {
        let empty = PointBuffer::default();
        for ai in [None, Some(&empty)] {
            let b = generate(ShapeArchetype::AiGenerated, 100, ai, &mut rng());
            assert_eq!(b.point_count(), 100);
            assert!(b.as_slice().iter().all(|c| (-2.0..2.0).contains(c)));
        }
    }

    #[test]
    fn ragged_buffer_rejected() {
        assert_eq!(
            PointBuffer::from_coords(vec![1.0, 2.0]),
            Err(ShapeError::RaggedBuffer { len: 2 }),
        );
    }

    #[test]
    fn uniform_cube_half_extent() {
        let b = uniform_cube(&mut rng(), 300, 1.5);
        assert_eq!(b.as_slice().len(), 900);
        assert!(b.as_slice().iter().all(|c| (-1.5..=1.5).contains(c)));
    }

    #[test]
    fn parse_archetype_names() {
        assert_eq!("heart".parse(), Ok(ShapeArchetype::Heart));
        assert_eq!("Meditation Figure".parse(), Ok(ShapeArchetype::MeditationFigure));
        assert_eq!("AI_GENERATED".parse(), Ok(ShapeArchetype::AiGenerated));
        assert!("teapot".parse::<ShapeArchetype>().is_err());
        for a in ShapeArchetype::all() {
            assert_eq!(a.name().parse(), Ok(a));
        }
    }

    #[test]
    fn bounds_and_centroid() {
        let b = PointBuffer::from_points([[-1.0, 0.0, 2.0], [3.0, -2.0, 0.0]]);
        assert_eq!(b.bounds(), Some(([-1.0, -2.0, 0.0], [3.0, 0.0, 2.0])));
        assert_eq!(b.centroid(), Some([1.0, -1.0, 1.0]));
    }
}
