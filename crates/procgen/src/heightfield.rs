//! Noise-driven height-field meshes.
//!
//! The grid is centred on the origin in XZ. Heights come from the ridged fbm in
//! [`crate::noise_field`]; normals come from central differences of the same field so
//! they stay smooth regardless of the triangulation. A rectangular flat patch can
//! be carved out to seat structures on level ground. Its border is a hard step,
//! not a blend.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::noise_field::NoiseParams;

/// Vertex shared by every procedural mesh in this crate.
/// Layout matches the renderer's standard vertex (position, normal, uv, color).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl TerrainVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            color: [1.0; 4],
        }
    }
}

/// CPU-side mesh produced by the generators in this crate.
#[derive(Debug, Clone, Default)]
pub struct MeshBuffers {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Iterate triangles as vertex position triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [
                Vec3::from_array(self.vertices[tri[0] as usize].position),
                Vec3::from_array(self.vertices[tri[1] as usize].position),
                Vec3::from_array(self.vertices[tri[2] as usize].position),
            ]
        })
    }
}

/// Axis-aligned region (absolute world X/Z bounds, exclusive) forced to a flat plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatPatch {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl FlatPatch {
    /// Square patch of side `size` centred on the origin.
    pub fn centered(size: f32) -> Self {
        let half = size * 0.5;
        Self {
            min_x: -half,
            max_x: half,
            min_z: -half,
            max_z: half,
        }
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x > self.min_x && x < self.max_x && z > self.min_z && z < self.max_z
    }
}

/// Configuration for a height-field grid.
#[derive(Debug, Clone)]
pub struct HeightFieldConfig {
    /// Extent along X in world units.
    pub width: f32,
    /// Extent along Z in world units.
    pub height: f32,
    /// Cell count along X.
    pub segments_x: u32,
    /// Cell count along Z.
    pub segments_y: u32,
    pub noise: NoiseParams,
    pub flat_patch: Option<FlatPatch>,
}

impl Default for HeightFieldConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            segments_x: 300,
            segments_y: 300,
            noise: NoiseParams {
                octaves: 6,
                size: 0.25,
                seed: 3.0,
                depth: 400.0,
            },
            flat_patch: None,
        }
    }
}

/// A generated height field and its mesh.
#[derive(Debug, Clone)]
pub struct HeightField {
    pub config: HeightFieldConfig,
    pub mesh: MeshBuffers,
}

impl HeightField {
    /// Build the grid mesh. Zero extents or segment counts are promoted to 1.
    pub fn generate(config: HeightFieldConfig) -> Self {
        let width = if config.width > 0.0 { config.width } else { 1.0 };
        let height = if config.height > 0.0 { config.height } else { 1.0 };
        let grid_x = config.segments_x.max(1);
        let grid_y = config.segments_y.max(1);
        let grid_x1 = grid_x + 1;
        let grid_y1 = grid_y + 1;
        let segment_w = width / grid_x as f32;
        let segment_h = height / grid_y as f32;

        let mut field = Self {
            config,
            mesh: MeshBuffers::default(),
        };

        let mut vertices = Vec::with_capacity((grid_x1 * grid_y1) as usize);
        for iy in 0..grid_y1 {
            let y = iy as f32 * segment_h - height * 0.5;
            for ix in 0..grid_x1 {
                let x = ix as f32 * segment_w - width * 0.5;
                let z = -y;
                let uv = Vec2::new(ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32);
                vertices.push(TerrainVertex::new(
                    Vec3::new(x, field.height_at(x, z), z),
                    field.normal_at(x, z),
                    uv,
                ));
            }
        }

        let indices = grid_indices(grid_x, grid_y);

        log::debug!(
            "Height field {}x{} ({} vertices, {} indices)",
            grid_x,
            grid_y,
            vertices.len(),
            indices.len()
        );

        field.mesh = MeshBuffers { vertices, indices };
        field
    }

    /// Raw fbm value at grid-plane coordinate `(x, y)` (y runs opposite to world Z).
    fn field(config: &HeightFieldConfig, x: f32, y: f32) -> f32 {
        let sx = config.segments_x.max(1) as f32;
        let sy = config.segments_y.max(1) as f32;
        config.noise.fbm(Vec2::new(x / sx, y / sy))
    }

    fn sample_height(config: &HeightFieldConfig, x: f32, y: f32) -> f32 {
        let depth = config.noise.depth;
        Self::field(config, x, y) * depth - depth * 0.5
    }

    /// Central-difference normal one grid step either side of `(x, y)`.
    fn sample_normal(config: &HeightFieldConfig, x: f32, y: f32) -> Vec3 {
        let off = config.width / config.segments_x.max(1) as f32;
        let h_l = Self::field(config, x - off, y);
        let h_r = Self::field(config, x + off, y);
        let h_d = Self::field(config, x, y - off);
        let h_u = Self::field(config, x, y + off);
        let depth = config.noise.depth;
        Vec3::new((h_l - h_r) * depth, 2.0, (h_d - h_u) * depth).normalize()
    }

    /// Height at world `(x, z)`, honouring the flat patch. Valid outside the mesh bounds too.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        match self.config.flat_patch {
            Some(patch) if patch.contains(x, z) => -self.config.noise.depth * 0.5,
            _ => Self::sample_height(&self.config, x, -z),
        }
    }

    /// Surface normal at world `(x, z)`, honouring the flat patch.
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        match self.config.flat_patch {
            Some(patch) if patch.contains(x, z) => Vec3::Y,
            _ => Self::sample_normal(&self.config, x, -z),
        }
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.mesh.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    /// Position and normal of vertex `index`, if it exists.
    pub fn vertex(&self, index: usize) -> Option<(Vec3, Vec3)> {
        self.mesh
            .vertices
            .get(index)
            .map(|v| (Vec3::from_array(v.position), Vec3::from_array(v.normal)))
    }
}

/// Two counter-clockwise (seen from +Y) triangles per cell of a `(gx+1) x (gy+1)` vertex grid
/// laid out row by row with rows advancing toward -Z.
pub fn grid_indices(grid_x: u32, grid_y: u32) -> Vec<u32> {
    let grid_x1 = grid_x + 1;
    let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + grid_x1 * iy;
            let b = ix + grid_x1 * (iy + 1);
            let c = (ix + 1) + grid_x1 * (iy + 1);
            let d = (ix + 1) + grid_x1 * iy;
            indices.extend_from_slice(&[a, d, b]);
            indices.extend_from_slice(&[b, d, c]);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_config(sx: u32, sy: u32) -> HeightFieldConfig {
        HeightFieldConfig {
            width: 40.0,
            height: 30.0,
            segments_x: sx,
            segments_y: sy,
            noise: NoiseParams { octaves: 4, size: 0.25, seed: 3.0, depth: 20.0 },
            flat_patch: Some(FlatPatch::centered(1.0e6)),
        }
    }

    /// Index and vertex counts follow the segment counts for every grid shape.
    #[test]
    fn counts_match_segments() {
        for &(sx, sy) in &[(1, 1), (2, 3), (7, 5), (16, 16)] {
            let field = HeightField::generate(HeightFieldConfig {
                segments_x: sx,
                segments_y: sy,
                ..flat_config(sx, sy)
            });
            assert_eq!(field.mesh.index_count(), (sx * sy * 6) as usize);
            assert_eq!(field.mesh.vertex_count(), ((sx + 1) * (sy + 1)) as usize);
        }
    }

    /// On the flat case every triangle faces up.
    #[test]
    fn winding_faces_up_when_flat() {
        let field = HeightField::generate(flat_config(6, 4));
        for [p0, p1, p2] in field.mesh.triangles() {
            let n = (p1 - p0).cross(p2 - p0);
            assert!(n.dot(Vec3::Y) > 0.0, "triangle {:?} {:?} {:?} faces down", p0, p1, p2);
        }
    }

    #[test]
    fn indices_stay_in_bounds() {
        let field = HeightField::generate(HeightFieldConfig {
            segments_x: 9,
            segments_y: 4,
            flat_patch: None,
            ..flat_config(9, 4)
        });
        let n = field.mesh.vertex_count() as u32;
        assert!(field.indices().iter().all(|&i| i < n));
    }

    /// Vertices inside the patch sit at -depth/2 with an up normal; outside they follow the noise.
    #[test]
    fn flat_patch_overrides_noise() {
        let config = HeightFieldConfig {
            width: 100.0,
            height: 100.0,
            segments_x: 20,
            segments_y: 20,
            noise: NoiseParams { octaves: 6, size: 0.25, seed: 3.0, depth: 400.0 },
            flat_patch: Some(FlatPatch::centered(30.0)),
        };
        let field = HeightField::generate(config);
        let mut inside = 0;
        let mut outside_varies = false;
        for v in field.vertices() {
            let [x, y, z] = v.position;
            if x.abs() < 15.0 && z.abs() < 15.0 {
                inside += 1;
                assert_eq!(y, -200.0);
                assert_eq!(v.normal, [0.0, 1.0, 0.0]);
            } else if y != -200.0 {
                outside_varies = true;
            }
        }
        assert!(inside > 0);
        assert!(outside_varies);
    }

    /// Patch bounds are exclusive: a vertex exactly on the edge keeps its noise height.
    #[test]
    fn flat_patch_edge_is_exclusive() {
        let patch = FlatPatch::centered(10.0);
        assert!(patch.contains(4.99, -4.99));
        assert!(!patch.contains(5.0, 0.0));
        assert!(!patch.contains(0.0, -5.0));
    }

    #[test]
    fn normals_are_unit_length() {
        let field = HeightField::generate(HeightFieldConfig {
            width: 50.0,
            height: 50.0,
            segments_x: 10,
            segments_y: 10,
            flat_patch: None,
            ..Default::default()
        });
        for v in field.vertices() {
            let len = Vec3::from_array(v.normal).length();
            assert!((len - 1.0).abs() < 1e-4);
            assert!(v.normal[1] > 0.0);
        }
    }

    /// CPU-side queries agree with the baked vertices.
    #[test]
    fn height_at_matches_vertices() {
        let field = HeightField::generate(HeightFieldConfig {
            width: 60.0,
            height: 60.0,
            segments_x: 12,
            segments_y: 12,
            flat_patch: None,
            ..Default::default()
        });
        for v in field.vertices().iter().step_by(7) {
            let [x, y, z] = v.position;
            assert!((field.height_at(x, z) - y).abs() < 1e-3);
            let n = field.normal_at(x, z).to_array();
            assert!((n[0] - v.normal[0]).abs() < 1e-5);
        }
    }

    #[test]
    fn uvs_span_unit_square() {
        let field = HeightField::generate(flat_config(4, 4));
        let first = field.vertices()[0].uv;
        let last = field.vertices()[field.mesh.vertex_count() - 1].uv;
        assert_eq!(first, [0.0, 1.0]);
        assert_eq!(last, [1.0, 0.0]);
    }

    #[test]
    fn generation_is_deterministic() {
        let config = HeightFieldConfig {
            width: 64.0,
            height: 64.0,
            segments_x: 16,
            segments_y: 16,
            flat_patch: None,
            ..Default::default()
        };
        let a = HeightField::generate(config.clone());
        let b = HeightField::generate(config);
        assert_eq!(a.vertices(), b.vertices());
    }
}
