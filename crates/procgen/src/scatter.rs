//! Scatter sets: copies of one template mesh planted on host terrain vertices.
//!
//! All copies are baked into a single merged mesh so the renderer issues one
//! draw per set. The vertex colour alpha carries a per-vertex sway weight read
//! by the foliage shader.

use glam::{Quat, Vec3};
use rand::Rng;

use crate::heightfield::{HeightField, MeshBuffers, TerrainVertex};

/// Shortest-arc rotation taking direction `from` onto direction `to`.
pub fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    let from = from.normalize_or_zero();
    let to = to.normalize_or_zero();
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let axis = from.cross(to);
    let dot = from.dot(to).clamp(-1.0, 1.0);
    if axis.length_squared() < 1e-12 {
        if dot > 0.0 {
            return Quat::IDENTITY;
        }
        return Quat::from_axis_angle(from.any_orthonormal_vector(), std::f32::consts::PI);
    }
    Quat::from_axis_angle(axis.normalize(), dot.acos())
}

/// How each copy is oriented on its host vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScatterMode {
    /// Template +Y leans toward the host normal. `tilt` 1.0 aligns fully, 0.0 stays upright.
    NormalAligned { tilt: f32 },
    /// Template is turned by the global wind rotation. The host normal only decides placement:
    /// copies whose lifted reference point drops below `min_height` are skipped.
    WindAligned {
        wind_from: Vec3,
        wind_to: Vec3,
        reference_height: f32,
        min_height: f32,
        tilt: f32,
    },
}

impl ScatterMode {
    /// Ribbon placement used by the dune scene.
    pub fn wind_default() -> Self {
        ScatterMode::WindAligned {
            wind_from: Vec3::X,
            wind_to: Vec3::new(1.0, 0.0, 1.0),
            reference_height: 13.0,
            min_height: 12.5,
            tilt: 1.0,
        }
    }
}

/// One merged scatter mesh plus the host vertices that received a copy.
#[derive(Debug, Clone, Default)]
pub struct ScatterSet {
    pub mesh: MeshBuffers,
    pub placed: Vec<usize>,
}

fn lean(normal: Vec3, tilt: f32) -> Quat {
    let target = Vec3::Y.lerp(normal, tilt.clamp(0.0, 1.0));
    rotation_between(Vec3::Y, target)
}

impl ScatterSet {
    /// Plant `template` on each host vertex listed in `indices`. Out-of-range indices are skipped.
    pub fn build(template: &MeshBuffers, host: &HeightField, indices: &[usize], mode: ScatterMode) -> Self {
        let mut set = ScatterSet::default();
        let wind = match mode {
            ScatterMode::WindAligned { wind_from, wind_to, .. } => rotation_between(wind_from, wind_to),
            ScatterMode::NormalAligned { .. } => Quat::IDENTITY,
        };

        for &index in indices {
            let Some((position, normal)) = host.vertex(index) else {
                log::warn!("Scatter index {} outside host mesh ({} vertices)", index, host.vertices().len());
                continue;
            };

            let base = set.mesh.vertices.len() as u32;
            match mode {
                ScatterMode::NormalAligned { tilt } => {
                    let rotation = lean(normal, tilt);
                    for v in &template.vertices {
                        let local = rotation * Vec3::from_array(v.position);
                        let n = (rotation * Vec3::from_array(v.normal)).normalize_or_zero();
                        let mut out = TerrainVertex::new(local + position, n, v.uv.into());
                        out.color[3] = (local.y + 2.0) / 14.0;
                        set.mesh.vertices.push(out);
                    }
                }
                ScatterMode::WindAligned { reference_height, min_height, tilt, .. } => {
                    let lift = lean(normal, tilt) * Vec3::new(0.0, reference_height, 0.0);
                    if lift.y < min_height {
                        continue;
                    }
                    let origin = position + lift;
                    for v in &template.vertices {
                        let raw = Vec3::from_array(v.position);
                        let n = (wind * Vec3::from_array(v.normal)).normalize_or_zero();
                        let mut out = TerrainVertex::new(wind * raw + origin, n, v.uv.into());
                        out.color[3] = -raw.x / 30.0;
                        set.mesh.vertices.push(out);
                    }
                }
            }
            set.mesh.indices.extend(template.indices.iter().map(|i| i + base));
            set.placed.push(index);
        }

        log::info!(
            "Scatter set: {} of {} copies placed ({} vertices)",
            set.placed.len(),
            indices.len(),
            set.mesh.vertices.len()
        );
        set
    }
}

/// Pick `count` host vertex indices uniformly (with repeats) from `0..vertex_count`.
pub fn random_indices<R: Rng>(count: usize, vertex_count: usize, rng: &mut R) -> Vec<usize> {
    if vertex_count == 0 {
        return Vec::new();
    }
    (0..count).map(|_| rng.gen_range(0..vertex_count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightfield::{FlatPatch, HeightFieldConfig};
    use crate::noise_field::NoiseParams;
    use glam::Vec2;
    use rand::{rngs::StdRng, SeedableRng};

    fn spike() -> MeshBuffers {
        MeshBuffers {
            vertices: vec![
                TerrainVertex::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::Z, Vec2::ZERO),
                TerrainVertex::new(Vec3::new(1.0, 0.0, 0.0), Vec3::Z, Vec2::X),
                TerrainVertex::new(Vec3::new(0.0, 12.0, 0.0), Vec3::Z, Vec2::Y),
            ],
            indices: vec![0, 1, 2],
        }
    }

    fn flat_host() -> HeightField {
        HeightField::generate(HeightFieldConfig {
            width: 20.0,
            height: 20.0,
            segments_x: 4,
            segments_y: 4,
            noise: NoiseParams { depth: 10.0, ..Default::default() },
            flat_patch: Some(FlatPatch::centered(1000.0)),
        })
    }

    #[test]
    fn rotation_maps_from_onto_to() {
        let from = Vec3::Y;
        let to = Vec3::new(0.3, 0.8, -0.2).normalize();
        let r = rotation_between(from, to);
        assert!((r * from - to).length() < 1e-5);
    }

    #[test]
    fn rotation_handles_parallel_and_opposite() {
        assert_eq!(rotation_between(Vec3::Y, Vec3::Y * 0.1), Quat::IDENTITY);
        let flip = rotation_between(Vec3::Y, -Vec3::Y);
        assert!((flip * Vec3::Y + Vec3::Y).length() < 1e-5);
    }

    /// On flat ground a normal-aligned copy is a pure translation.
    #[test]
    fn normal_aligned_translates_on_flat_ground() {
        let host = flat_host();
        let set = ScatterSet::build(&spike(), &host, &[0, 12], ScatterMode::NormalAligned { tilt: 1.0 });
        assert_eq!(set.placed, vec![0, 12]);
        assert_eq!(set.mesh.vertices.len(), 6);
        assert_eq!(set.mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        let (anchor, _) = host.vertex(12).unwrap();
        let tip = Vec3::from_array(set.mesh.vertices[5].position);
        assert!((tip - (anchor + Vec3::new(0.0, 12.0, 0.0))).length() < 1e-4);
        assert!((set.mesh.vertices[5].color[3] - 1.0).abs() < 1e-6);
    }

    /// Wind copies on flat ground clear the height threshold and get turned 45 degrees.
    #[test]
    fn wind_aligned_rotates_template() {
        let host = flat_host();
        let set = ScatterSet::build(&spike(), &host, &[3], ScatterMode::wind_default());
        assert_eq!(set.placed, vec![3]);
        let (anchor, _) = host.vertex(3).unwrap();
        let right = Vec3::from_array(set.mesh.vertices[1].position) - (anchor + Vec3::new(0.0, 13.0, 0.0));
        let expected = Vec3::new(1.0, 0.0, 1.0).normalize();
        assert!((right.normalize() - expected).length() < 1e-4, "got {:?}", right);
        assert!((set.mesh.vertices[0].color[3] - 1.0 / 30.0).abs() < 1e-6);
    }

    /// Steep host normals drop the lifted reference point below the threshold.
    #[test]
    fn wind_aligned_skips_steep_vertices() {
        let host = HeightField::generate(HeightFieldConfig {
            width: 40.0,
            height: 40.0,
            segments_x: 8,
            segments_y: 8,
            noise: NoiseParams { octaves: 6, size: 4.0, seed: 1.0, depth: 400.0 },
            flat_patch: None,
        });
        let all: Vec<usize> = (0..host.vertices().len()).collect();
        let set = ScatterSet::build(&spike(), &host, &all, ScatterMode::wind_default());
        for &i in &set.placed {
            let (_, n) = host.vertex(i).unwrap();
            assert!(n.y * 13.0 >= 12.5 - 1e-3);
        }
        let skipped = all.len() - set.placed.len();
        let steep = host.vertices().iter().filter(|v| v.normal[1] * 13.0 < 12.5).count();
        assert_eq!(skipped, steep);
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let set = ScatterSet::build(&spike(), &flat_host(), &[10_000], ScatterMode::NormalAligned { tilt: 1.0 });
        assert!(set.placed.is_empty());
        assert!(set.mesh.indices.is_empty());
    }

    #[test]
    fn random_indices_respect_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let picks = random_indices(100, 25, &mut rng);
        assert_eq!(picks.len(), 100);
        assert!(picks.iter().all(|&i| i < 25));
        assert!(random_indices(5, 0, &mut rng).is_empty());
    }
}
