//! Planar water reflection: mirror math and the reflected sky render.

use glam::{Mat4, Vec3, Vec4};

use crate::camera::{CameraRig, CameraUniform};
use crate::pipeline::Layouts;
use crate::renderer::{CameraBinding, RenderContext};
use crate::sky::SkyPass;
use crate::texture::{Texture, HDR_FORMAT};

/// Resolution of the reflection target.
pub const REFLECTION_SIZE: u32 = 512;
/// The mirror sits slightly under the water surface so the shoreline does not shimmer.
pub const MIRROR_CLEARANCE: f32 = 0.05;

/// Plane `normal · p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }
}

/// Householder reflection across `plane`: `I - 2nnᵀ` with translation `-2dn`.
pub fn reflection_matrix(plane: &Plane) -> Mat4 {
    let n = plane.normal;
    let d = plane.distance;
    Mat4::from_cols(
        Vec4::new(1.0 - 2.0 * n.x * n.x, -2.0 * n.y * n.x, -2.0 * n.z * n.x, 0.0),
        Vec4::new(-2.0 * n.x * n.y, 1.0 - 2.0 * n.y * n.y, -2.0 * n.z * n.y, 0.0),
        Vec4::new(-2.0 * n.x * n.z, -2.0 * n.y * n.z, 1.0 - 2.0 * n.z * n.z, 0.0),
        Vec4::new(-2.0 * d * n.x, -2.0 * d * n.y, -2.0 * d * n.z, 1.0),
    )
}

/// Water shading knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterSettings {
    /// Normal map tiling.
    pub size: f32,
    pub distortion_scale: f32,
}

impl Default for WaterSettings {
    fn default() -> Self {
        Self {
            size: 0.8,
            distortion_scale: 3.7,
        }
    }
}

/// The water sheet: a unit quad laid flat, scaled to `extent`, shifted by `offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterSurface {
    pub extent: f32,
    /// Applied in quad space before the quad is laid flat, so `z` becomes height.
    pub offset: Vec3,
}

impl WaterSurface {
    pub fn new(extent: f32, offset: Vec3) -> Self {
        Self { extent, offset }
    }

    pub fn model(&self) -> Mat4 {
        let half = self.extent * 0.5;
        // Quad x stays x, quad y runs along -z, quad z becomes height.
        let lay_flat = Mat4::from_cols(Vec4::X, Vec4::NEG_Z, Vec4::Y, Vec4::W);
        Mat4::from_scale(Vec3::new(half, 1.0, half)) * lay_flat * Mat4::from_translation(self.offset)
    }

    /// World height of the water sheet.
    pub fn height(&self) -> f32 {
        self.model().transform_point3(Vec3::ZERO).y
    }

    pub fn mirror_plane(&self) -> Plane {
        Plane::from_point_normal(Vec3::new(0.0, self.height() - MIRROR_CLEARANCE, 0.0), Vec3::NEG_Y)
    }

    /// Camera view composed with the mirror.
    pub fn reflected_view(&self, view: Mat4) -> Mat4 {
        view * reflection_matrix(&self.mirror_plane())
    }

    /// Projection times the mirrored view; the water draw uses it to find its reflection texel.
    pub fn reflection_view_proj(&self, camera: &CameraRig) -> Mat4 {
        camera.projection_matrix() * self.reflected_view(camera.view_matrix())
    }
}

/// Renders the sky as seen from under the mirror into a small offscreen target.
pub struct ReflectionPass {
    target: Texture,
    camera: CameraBinding,
}

impl ReflectionPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        Self {
            target: Texture::render_target(device, REFLECTION_SIZE, REFLECTION_SIZE, HDR_FORMAT, "Water Reflection"),
            camera: CameraBinding::new(device, &layouts.camera, "Reflection Camera"),
        }
    }

    pub fn run(
        &self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        sky: &SkyPass,
        camera: &CameraRig,
        water: &WaterSurface,
        time: f32,
    ) {
        let mut uniform = CameraUniform::new();
        uniform.update_with_view(camera, water.reflected_view(camera.view_matrix()), time);
        self.camera.write(&ctx.queue, &uniform);
        sky.render(encoder, "Reflection Sky Pass", &self.camera.bind_group, &ctx.sky_box, &self.target.view);
    }

    pub fn target(&self) -> &Texture {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_distance(plane: &Plane, point: Vec3) -> f32 {
        plane.normal.dot(point) + plane.distance
    }

    fn tilted_plane() -> Plane {
        Plane::from_point_normal(Vec3::new(1.0, 2.0, -3.0), Vec3::new(0.3, -1.0, 0.2))
    }

    #[test]
    fn reflecting_twice_returns_the_point() {
        let r = reflection_matrix(&tilted_plane());
        for p in [Vec3::ZERO, Vec3::new(5.0, -7.0, 2.5), Vec3::new(-100.0, 40.0, 3000.0)] {
            let back = r.transform_point3(r.transform_point3(p));
            assert!((back - p).length() < 1e-2 * (1.0 + p.length() * 1e-3), "{:?} -> {:?}", p, back);
        }
    }

    #[test]
    fn points_on_the_plane_stay_put() {
        let plane = tilted_plane();
        let r = reflection_matrix(&plane);
        let on_plane = Vec3::new(1.0, 2.0, -3.0);
        assert!(signed_distance(&plane, on_plane).abs() < 1e-5);
        assert!((r.transform_point3(on_plane) - on_plane).length() < 1e-4);
    }

    #[test]
    fn horizontal_mirror_flips_height() {
        let plane = Plane::from_point_normal(Vec3::new(0.0, -1.0, 0.0), Vec3::NEG_Y);
        let r = reflection_matrix(&plane);
        let p = r.transform_point3(Vec3::new(3.0, 5.0, 4.0));
        assert!((p - Vec3::new(3.0, -7.0, 4.0)).length() < 1e-5);
    }

    #[test]
    fn water_sheet_lies_flat_at_offset_depth() {
        let water = WaterSurface::new(10000.0, Vec3::new(0.0, 0.0, -1.0));
        assert!((water.height() + 1.0).abs() < 1e-5);
        let model = water.model();
        let corner = model.transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!((corner - Vec3::new(5000.0, -1.0, -5000.0)).length() < 1e-2);
        assert_eq!(model.transform_vector3(Vec3::Z), Vec3::Y);
        assert!((signed_distance(&water.mirror_plane(), Vec3::new(0.0, -1.05, 0.0))).abs() < 1e-5);
    }
}
