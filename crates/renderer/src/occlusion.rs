//! Light-shaft occlusion mask: the sun proxy in white, occluders in black,
//! seen from the scene camera.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::draw::{DrawUniform, Drawable};
use crate::pipeline::{clear_attachment, create_mesh_pipeline, create_shader, DepthMode, Layouts, MeshPipelineDesc};
use crate::renderer::RenderContext;
use crate::texture::HDR_FORMAT;

pub const LIGHT_PROXY_RADIUS: f32 = 40.0;
/// Where the sun proxy sits before the god-ray offset is applied.
pub const LIGHT_PROXY_POSITION: Vec3 = Vec3::new(0.0, 280.0, -6000.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionSettings {
    /// Added to [`LIGHT_PROXY_POSITION`].
    pub offset: Vec3,
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self { offset: Vec3::ZERO }
    }
}

impl OcclusionSettings {
    pub fn proxy_center(&self) -> Vec3 {
        LIGHT_PROXY_POSITION + self.offset
    }
}

/// Project a world point to `[0, 1]` screen space (y up, as the god-ray shader expects).
/// `None` when the point is behind the camera.
pub fn light_screen_position(world: Vec3, view_proj: Mat4) -> Option<Vec2> {
    let clip = view_proj * world.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = Vec2::new(clip.x, clip.y) / clip.w;
    Some((ndc + Vec2::ONE) * 0.5)
}

pub struct OcclusionPass {
    pipeline: wgpu::RenderPipeline,
}

impl OcclusionPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let shader = create_shader(device, "Occlusion Shader", include_str!("shaders/occlusion.wgsl"));
        let pipeline = create_mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Occlusion Pipeline",
                shader: &shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                bind_group_layouts: &[&layouts.camera, &layouts.draw],
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth: DepthMode::None,
                cull_mode: Some(wgpu::Face::Back),
            },
        );
        Self { pipeline }
    }

    /// Draw the proxy first, then every occluder over it. No depth test: draw order is the mask.
    pub fn run(
        &self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        settings: &OcclusionSettings,
        occluders: &[&Drawable],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Occlusion Pass"),
            color_attachments: &[clear_attachment(&ctx.targets.occlusion.view)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);

        let proxy = DrawUniform::flat(Mat4::from_translation(settings.proxy_center()), Vec4::ONE);
        let Some(offset) = ctx.arena.push(&ctx.queue, &proxy) else {
            return;
        };
        pass.set_bind_group(1, ctx.arena.bind_group(), &[offset]);
        ctx.light_proxy.draw(&mut pass);

        for occluder in occluders {
            let uniform = DrawUniform::flat(occluder.model, Vec4::new(0.0, 0.0, 0.0, 1.0));
            let Some(offset) = ctx.arena.push(&ctx.queue, &uniform) else {
                return;
            };
            pass.set_bind_group(1, ctx.arena.bind_group(), &[offset]);
            occluder.mesh.draw(&mut pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ahead_maps_to_screen_center() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 1000.0);
        let p = light_screen_position(Vec3::new(0.0, 0.0, -50.0), proj * view).unwrap();
        assert!((p - Vec2::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn frustum_corner_maps_to_unit_square_corner() {
        let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 1000.0);
        let p = light_screen_position(Vec3::new(10.0, 10.0, -10.0), proj).unwrap();
        assert!((p - Vec2::ONE).length() < 1e-4);
        let q = light_screen_position(Vec3::new(-10.0, -10.0, -10.0), proj).unwrap();
        assert!(q.length() < 1e-4);
    }

    #[test]
    fn behind_camera_has_no_screen_position() {
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 1000.0);
        assert_eq!(light_screen_position(Vec3::new(0.0, 0.0, 10.0), proj), None);
    }

    #[test]
    fn offset_moves_proxy() {
        let settings = OcclusionSettings {
            offset: Vec3::new(10.0, -5.0, 0.0),
        };
        assert_eq!(settings.proxy_center(), Vec3::new(10.0, 275.0, -6000.0));
    }
}
