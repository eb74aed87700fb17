//! Procedural stand-in textures.
//!
//! Used when an image asset is missing on disk so the scene still renders with
//! plausible detail instead of the flat placeholder.

use glam::Vec3;
use noise::{NoiseFn, Perlin};

/// Tightly packed RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let count = (width * height) as usize;
        let mut rgba = Vec::with_capacity(count * 4);
        for _ in 0..count {
            rgba.extend_from_slice(&pixel);
        }
        Self { width, height, rgba }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y % self.height) * self.width + (x % self.width)) as usize * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    fn set(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        let i = (y * self.width + x) as usize * 4;
        self.rgba[i..i + 4].copy_from_slice(&pixel);
    }
}

fn encode_normal(n: Vec3) -> [u8; 4] {
    let c = (n * 0.5 + Vec3::splat(0.5)).clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
    [c.x.round() as u8, c.y.round() as u8, c.z.round() as u8, 255]
}

/// Tileable tangent-space normal map of rippled water.
///
/// Heights are Perlin noise sampled on a torus so the map wraps seamlessly;
/// normals come from wrapped central differences.
pub fn water_normal_map(size: u32, seed: u32, strength: f32) -> TextureData {
    let size = size.max(2);
    let perlin = Perlin::new(seed);
    let tau = std::f64::consts::TAU;
    let radius = 1.5;

    let mut heights = vec![0.0f32; (size * size) as usize];
    for y in 0..size {
        for x in 0..size {
            let u = x as f64 / size as f64 * tau;
            let v = y as f64 / size as f64 * tau;
            let p = [radius * u.cos(), radius * u.sin(), radius * v.cos(), radius * v.sin()];
            let coarse = perlin.get(p);
            let fine = perlin.get([p[0] * 3.0, p[1] * 3.0, p[2] * 3.0, p[3] * 3.0]) * 0.35;
            heights[(y * size + x) as usize] = (coarse + fine) as f32;
        }
    }

    let at = |x: i64, y: i64| -> f32 {
        let s = size as i64;
        heights[(y.rem_euclid(s) * s + x.rem_euclid(s)) as usize]
    };

    let mut out = TextureData::filled(size, size, [128, 128, 255, 255]);
    for y in 0..size {
        for x in 0..size {
            let (xi, yi) = (x as i64, y as i64);
            let dx = at(xi + 1, yi) - at(xi - 1, yi);
            let dy = at(xi, yi + 1) - at(xi, yi - 1);
            let n = Vec3::new(-dx * strength, -dy * strength, 1.0).normalize();
            out.set(x, y, encode_normal(n));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_has_expected_size() {
        let t = TextureData::filled(3, 2, [1, 2, 3, 4]);
        assert_eq!(t.rgba.len(), 24);
        assert_eq!(t.pixel(2, 1), [1, 2, 3, 4]);
    }

    /// Normals point out of the surface (blue channel dominant) and the map is reproducible.
    #[test]
    fn water_normals_face_out_and_repeat() {
        let a = water_normal_map(32, 9, 4.0);
        let b = water_normal_map(32, 9, 4.0);
        assert_eq!(a, b);
        for y in 0..32 {
            for x in 0..32 {
                assert!(a.pixel(x, y)[2] >= 128);
            }
        }
    }

    /// The seam between the last and first column is about as smooth as the interior column pairs.
    #[test]
    fn water_normals_tile() {
        let t = water_normal_map(64, 2, 4.0);
        let column_gap = |a: u32, b: u32| -> f32 {
            let mut sum = 0.0;
            for y in 0..64 {
                let (p, q) = (t.pixel(a, y), t.pixel(b, y));
                for c in 0..3 {
                    sum += (p[c] as f32 - q[c] as f32).abs();
                }
            }
            sum / 64.0
        };
        let seam = column_gap(63, 0);
        let interior = (0..63).map(|x| column_gap(x, x + 1)).sum::<f32>() / 63.0;
        assert!(seam <= interior * 2.0 + 2.0, "seam {} interior mean {}", seam, interior);
    }
}
