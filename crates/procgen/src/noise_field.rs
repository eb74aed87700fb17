//! Hash-based value noise and ridged fractal sums.
//!
//! Everything here is a pure function of its inputs: no permutation tables, no
//! hidden state, so any float coordinate can be evaluated in any order and the
//! same point always yields the same value.

use glam::{Vec2, Vec3, Vec3Swizzles};

const HASH_SCALE: f32 = 0.1031;

/// Parameters of a ridged fractal sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    /// Number of octaves summed.
    pub octaves: u32,
    /// Base frequency scale applied to the input point.
    pub size: f32,
    /// Offset added to both input axes after scaling.
    pub seed: f32,
    /// Vertical scale applied by height-field builders.
    pub depth: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 6,
            size: 4.0,
            seed: 0.0,
            depth: 50.0,
        }
    }
}

/// Floor-based fractional part, so negative inputs wrap into [0, 1).
#[inline]
fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Hash a 2D point to a pseudo-random value in [0, 1).
#[inline]
pub fn hash12(p: Vec2) -> f32 {
    let scaled = Vec3::new(p.x, p.y, p.x) * HASH_SCALE;
    let mut p3 = scaled - scaled.floor();
    p3 += p3.dot(p3.yzx() + Vec3::splat(19.19));
    fract((p3.x + p3.y) * p3.z)
}

#[inline]
fn smooth(f: f32) -> f32 {
    f * f * (3.0 - 2.0 * f)
}

#[inline]
fn mix(x: f32, y: f32, a: f32) -> f32 {
    x * (1.0 - a) + y * a
}

/// Value noise in [0, 1], smoothly interpolated between hashed lattice corners.
pub fn noise2d(st: Vec2) -> f32 {
    let i = st.floor();
    let f = st - i;

    let a = hash12(i);
    let b = hash12(i + Vec2::new(1.0, 0.0));
    let c = hash12(i + Vec2::new(0.0, 1.0));
    let d = hash12(i + Vec2::new(1.0, 1.0));

    let u = Vec2::new(smooth(f.x), smooth(f.y));
    mix(a, b, u.x) + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.x * u.y
}

/// Ridged fractal Brownian motion.
///
/// Each octave folds the noise into sharp crests with `(1 - |2n - 1|)^4`,
/// doubling frequency and halving amplitude as it goes.
pub fn fbm(st: Vec2, octaves: u32, size: f32, seed: f32) -> f32 {
    let mut pos = st * size + Vec2::splat(seed);
    let mut amplitude = 0.5;
    let mut value = 0.0;
    for _ in 0..octaves {
        let n = 1.0 - (noise2d(pos) * 2.0 - 1.0).abs();
        value += amplitude * n.powi(4);
        pos *= 2.0;
        amplitude *= 0.5;
    }
    value
}

impl NoiseParams {
    /// Ridged fbm using these parameters.
    pub fn fbm(&self, st: Vec2) -> f32 {
        fbm(st, self.octaves, self.size, self.seed)
    }
}
