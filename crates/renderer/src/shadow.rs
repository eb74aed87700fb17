//! Directional light shadow map.
//!
//! The light is static, so the map is baked once and only re-baked when the
//! light position (shadow mover control) or the window aspect changes.

use glam::{Mat4, Vec3};

use crate::camera::CameraUniform;
use crate::draw::{DrawUniform, Drawable};
use crate::pipeline::{create_mesh_pipeline, create_shader, DepthMode, Layouts, MeshPipelineDesc};
use crate::renderer::{CameraBinding, RenderContext};
use crate::texture::Texture;

pub const SHADOW_MAP_SIZE: u32 = 1024;
/// Light position with the mover at rest.
pub const SHADOW_LIGHT_BASE: Vec3 = Vec3::new(0.0, 400.0, -300.0);
/// Mover value that leaves the light at [`SHADOW_LIGHT_BASE`].
pub const SHADOW_MOVER_REST: f32 = -350.0;
pub const SHADOW_HALF_WIDTH: f32 = 200.0;
pub const SHADOW_NEAR: f32 = 0.1;
pub const SHADOW_FAR: f32 = 5000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    /// Slides the light along z.
    pub mover: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            mover: SHADOW_MOVER_REST,
        }
    }
}

impl ShadowSettings {
    pub fn light_position(&self) -> Vec3 {
        SHADOW_LIGHT_BASE + Vec3::new(0.0, 0.0, self.mover - SHADOW_MOVER_REST)
    }
}

/// Orthographic light frustum looking at the origin, depth mapped to `[0, 1]`.
pub fn light_view_proj(light: Vec3, aspect: f32) -> Mat4 {
    light_projection(aspect) * light_view(light)
}

fn light_view(light: Vec3) -> Mat4 {
    Mat4::look_at_rh(light, Vec3::ZERO, Vec3::Y)
}

fn light_projection(aspect: f32) -> Mat4 {
    let half_height = SHADOW_HALF_WIDTH / aspect.max(1e-3);
    Mat4::orthographic_rh(
        -SHADOW_HALF_WIDTH,
        SHADOW_HALF_WIDTH,
        -half_height,
        half_height,
        SHADOW_NEAR,
        SHADOW_FAR,
    )
}

/// What the current map was baked for.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BakeKey {
    light: Vec3,
    aspect: f32,
}

fn needs_bake(baked_for: Option<BakeKey>, key: BakeKey) -> bool {
    baked_for != Some(key)
}

pub struct ShadowPass {
    map: Texture,
    light_camera: CameraBinding,
    pipeline: wgpu::RenderPipeline,
    light_view_proj: Mat4,
    baked_for: Option<BakeKey>,
}

impl ShadowPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let shader = create_shader(device, "Shadow Shader", include_str!("shaders/shadow.wgsl"));
        let pipeline = create_mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Shadow Pipeline",
                shader: &shader,
                vs_entry: "vs_main",
                fs_entry: None,
                bind_group_layouts: &[&layouts.camera, &layouts.draw],
                targets: &[],
                depth: DepthMode::ReadWrite,
                cull_mode: None,
            },
        );
        Self {
            map: Texture::create_depth_texture(device, SHADOW_MAP_SIZE, SHADOW_MAP_SIZE, "Shadow Map"),
            light_camera: CameraBinding::new(device, &layouts.camera, "Shadow Light Camera"),
            pipeline,
            light_view_proj: Mat4::IDENTITY,
            baked_for: None,
        }
    }

    /// Re-bake the map if the light or aspect changed. Returns whether it rendered.
    pub fn update(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        settings: &ShadowSettings,
        aspect: f32,
        casters: &[&Drawable],
    ) -> bool {
        let key = BakeKey {
            light: settings.light_position(),
            aspect,
        };
        if !needs_bake(self.baked_for, key) {
            return false;
        }

        let view = light_view(key.light);
        let proj = light_projection(aspect);
        self.light_view_proj = proj * view;
        self.light_camera
            .write(&ctx.queue, &CameraUniform::from_matrices(view, proj, key.light));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.light_camera.bind_group, &[]);
        for caster in casters {
            let Some(offset) = ctx.arena.push(&ctx.queue, &DrawUniform::new(caster.model)) else {
                break;
            };
            pass.set_bind_group(1, ctx.arena.bind_group(), &[offset]);
            caster.mesh.draw(&mut pass);
        }
        drop(pass);

        log::info!("Shadow map baked from {:?} ({} casters)", key.light, casters.len());
        self.baked_for = Some(key);
        true
    }

    /// Light view-projection of the current bake.
    pub fn light_view_proj(&self) -> Mat4 {
        self.light_view_proj
    }

    pub fn map(&self) -> &Texture {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mover_at_rest_keeps_base_light() {
        assert_eq!(ShadowSettings::default().light_position(), SHADOW_LIGHT_BASE);
        let moved = ShadowSettings { mover: -300.0 };
        assert_eq!(moved.light_position(), Vec3::new(0.0, 400.0, -250.0));
    }

    /// The origin sits on the light axis, so it lands in the middle of the map.
    #[test]
    fn origin_projects_to_map_center() {
        let m = light_view_proj(SHADOW_LIGHT_BASE, 16.0 / 9.0);
        let p = m.project_point3(Vec3::ZERO);
        assert!(p.x.abs() < 1e-4 && p.y.abs() < 1e-4);
        let distance = SHADOW_LIGHT_BASE.length();
        let expected = (distance - SHADOW_NEAR) / (SHADOW_FAR - SHADOW_NEAR);
        assert!((p.z - expected).abs() < 1e-4);
    }

    #[test]
    fn frustum_edges_follow_aspect() {
        let aspect = 2.0;
        let m = light_projection(aspect);
        let right = m.project_point3(Vec3::new(SHADOW_HALF_WIDTH, 0.0, -10.0));
        let top = m.project_point3(Vec3::new(0.0, SHADOW_HALF_WIDTH / aspect, -10.0));
        assert!((right.x - 1.0).abs() < 1e-5);
        assert!((top.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bake_only_when_key_changes() {
        let key = BakeKey {
            light: SHADOW_LIGHT_BASE,
            aspect: 1.5,
        };
        assert!(needs_bake(None, key));
        assert!(!needs_bake(Some(key), key));
        assert!(needs_bake(Some(key), BakeKey { aspect: 1.6, ..key }));
    }
}
