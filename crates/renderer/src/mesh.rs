//! GPU meshes, primitive shapes, and glTF import.

use std::path::Path;

use glam::{Vec2, Vec3};
use procgen::MeshBuffers;
use wgpu::util::DeviceExt;

use crate::error::AssetError;
use crate::vertex::Vertex;

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Upload any Pod vertex slice plus u32 indices.
    pub fn new<V: bytemuck::Pod>(device: &wgpu::Device, label: &str, vertices: &[V], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }

    pub fn from_buffers(device: &wgpu::Device, label: &str, buffers: &MeshBuffers) -> Self {
        Self::new(device, label, &buffers.vertices, &buffers.indices)
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.num_indices, 0, 0..1);
    }

    /// Same geometry repeated `instances` times; per-instance data comes from elsewhere (storage buffers).
    pub fn draw_instanced(&self, pass: &mut wgpu::RenderPass<'_>, instances: u32) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.num_indices, 0, 0..instances);
    }
}

/// Inward-facing cube centered at origin with half-extent `half`, for the sky box.
pub fn sky_box(half: f32) -> MeshBuffers {
    let corners = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ];
    let vertices = corners
        .iter()
        .map(|&c| Vertex::new(c * half, -c.normalize(), Vec2::ZERO))
        .collect();

    // Wound clockwise as seen from outside, so the faces point at a viewer inside.
    #[rustfmt::skip]
    let indices = vec![
        0, 1, 2, 0, 2, 3, // back (-z)
        4, 6, 5, 4, 7, 6, // front (+z)
        0, 7, 4, 0, 3, 7, // left
        1, 6, 2, 1, 5, 6, // right
        3, 6, 7, 3, 2, 6, // top
        0, 5, 1, 0, 4, 5, // bottom
    ];
    MeshBuffers { vertices, indices }
}

/// UV sphere, outward-facing.
pub fn sphere(radius: f32, segments: u32, rings: u32) -> MeshBuffers {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        for segment in 0..=segments {
            let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            let uv = Vec2::new(segment as f32 / segments as f32, ring as f32 / rings as f32);
            vertices.push(Vertex::new(normal * radius, normal, uv));
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let current = ring * (segments + 1) + segment;
            let next = current + segments + 1;
            indices.extend_from_slice(&[current, current + 1, next, current + 1, next + 1, next]);
        }
    }

    MeshBuffers { vertices, indices }
}

/// Import every triangle primitive of a glTF file into one mesh.
///
/// Missing normals default to +Y and missing texture coordinates to zero.
pub fn load_gltf(path: impl AsRef<Path>) -> Result<MeshBuffers, AssetError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let (doc, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: display.clone(),
        source,
    })?;

    let mut out = MeshBuffers::default();
    for mesh in doc.meshes() {
        for prim in mesh.primitives() {
            if prim.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            let reader = prim.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

            let base = out.vertices.len() as u32;
            for (i, p) in positions.iter().enumerate() {
                let n = normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]);
                let uv = uvs.get(i).copied().unwrap_or([0.0, 0.0]);
                out.vertices.push(Vertex::new(Vec3::from_array(*p), Vec3::from_array(n), Vec2::from_array(uv)));
            }
            match reader.read_indices() {
                Some(indices) => out.indices.extend(indices.into_u32().map(|i| i + base)),
                None => out.indices.extend(base..base + positions.len() as u32),
            }
        }
    }

    if out.vertices.is_empty() || out.indices.is_empty() {
        return Err(AssetError::EmptyMesh { path: display });
    }
    log::info!("Loaded {} ({} vertices, {} triangles)", display, out.vertex_count(), out.index_count() / 3);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_box_faces_inward() {
        let cube = sky_box(10.0);
        for [a, b, c] in cube.triangles() {
            let normal = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(normal.dot(center) < 0.0, "face at {:?} points outward", center);
        }
    }

    #[test]
    fn sphere_faces_outward() {
        let s = sphere(40.0, 16, 8);
        assert_eq!(s.vertex_count(), 17 * 9);
        for [a, b, c] in s.triangles() {
            let normal = (b - a).cross(c - a);
            if normal.length_squared() < 1e-8 {
                continue; // degenerate pole triangles
            }
            assert!(normal.dot(a + b + c) > 0.0);
        }
        assert!(s.vertices.iter().all(|v| (Vec3::from_array(v.position).length() - 40.0).abs() < 1e-3));
    }

    #[test]
    fn missing_gltf_is_an_error() {
        let err = load_gltf("does/not/exist.glb").unwrap_err();
        assert!(matches!(err, AssetError::Gltf { .. }));
    }
}
