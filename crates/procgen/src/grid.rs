//! The shared unit quad (particle billboards, water sheet).

use glam::{Vec2, Vec3};

use crate::heightfield::{MeshBuffers, TerrainVertex};

/// Unit quad in the XY plane facing +Z, used for billboards and the water sheet.
pub fn unit_quad() -> MeshBuffers {
    let n = Vec3::Z;
    MeshBuffers {
        vertices: vec![
            TerrainVertex::new(Vec3::new(-1.0, -1.0, 0.0), n, Vec2::new(0.0, 0.0)),
            TerrainVertex::new(Vec3::new(1.0, -1.0, 0.0), n, Vec2::new(1.0, 0.0)),
            TerrainVertex::new(Vec3::new(1.0, 1.0, 0.0), n, Vec2::new(1.0, 1.0)),
            TerrainVertex::new(Vec3::new(-1.0, 1.0, 0.0), n, Vec2::new(0.0, 1.0)),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_faces_forward() {
        let quad = unit_quad();
        for [a, b, c] in quad.triangles() {
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }
}
