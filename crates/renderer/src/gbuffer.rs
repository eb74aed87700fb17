//! Geometry buffer fill.
//!
//! Every submission carries its own [`Material`], and the material tag travels
//! in that draw's uniform slot. There is no "current material" state shared
//! between draws.

use glam::{Mat4, Vec3};

use crate::draw::{DrawUniform, Drawable};
use crate::pipeline::{create_mesh_pipeline, create_shader, gbuffer_targets, DepthMode, Layouts, MeshPipelineDesc};
use crate::renderer::RenderContext;
use crate::texture::{Texture, TextureId, GBUFFER_FORMAT, HDR_FORMAT};

/// Shading branch selected by the resolve pass, written into G-buffer target 0 alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialTag {
    /// Nothing drawn; the resolve shows the sky.
    Empty,
    Terrain,
    Standard,
    /// Standard lighting with vertex sway.
    Foliage,
    Water,
}

impl MaterialTag {
    /// Value stored in the float G-buffer. resolve.wgsl decodes with the same thresholds as [`MaterialTag::decode`].
    pub const fn encoded(self) -> f32 {
        match self {
            MaterialTag::Empty => 0.0,
            MaterialTag::Terrain => 26.0,
            MaterialTag::Standard => 51.0,
            MaterialTag::Foliage => 76.0,
            MaterialTag::Water => 101.0,
        }
    }

    pub fn decode(value: f32) -> Self {
        if value < 13.0 {
            MaterialTag::Empty
        } else if value < 38.0 {
            MaterialTag::Terrain
        } else if value < 63.0 {
            MaterialTag::Standard
        } else if value < 88.0 {
            MaterialTag::Foliage
        } else {
            MaterialTag::Water
        }
    }
}

/// Surface description shared by every drawable in a submission.
#[derive(Debug, Clone)]
pub struct Material {
    pub tag: MaterialTag,
    pub diffuse: Vec3,
    /// Written into the G-buffer; highlight colour and shininess are global lighting settings.
    pub specular_strength: f32,
    /// Terrain: sand edge, sand steep, flow edge, flow speed.
    /// Foliage: ribbon edge, amount, amount2, amount3.
    /// Water: size, distortion scale.
    pub params: [f32; 4],
    /// World units per terrain texture tile.
    pub grid_size: f32,
    /// Diffuse map; the white placeholder is bound while it loads or when `None`.
    pub texture: Option<TextureId>,
}

impl Material {
    pub fn new(tag: MaterialTag) -> Self {
        Self {
            tag,
            diffuse: Vec3::ONE,
            specular_strength: 1.0,
            params: [0.0; 4],
            grid_size: 1.0,
            texture: None,
        }
    }

    pub fn with_diffuse(mut self, diffuse: Vec3) -> Self {
        self.diffuse = diffuse;
        self
    }

    pub fn with_specular(mut self, strength: f32) -> Self {
        self.specular_strength = strength;
        self
    }

    pub fn with_params(mut self, params: [f32; 4]) -> Self {
        self.params = params;
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_grid_size(mut self, grid_size: f32) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// The uniform slot contents for one draw of this material.
    pub fn draw_uniform(&self, model: Mat4, time: f32) -> DrawUniform {
        DrawUniform {
            color: self.diffuse.extend(1.0).to_array(),
            params: self.params,
            material: [self.tag.encoded(), self.specular_strength, time, self.grid_size],
            ..DrawUniform::new(model)
        }
    }
}

/// Two half-float attachments and one full-float position slot, plus scene depth.
pub struct GBufferTargets {
    /// xyz = world normal, w = material tag.
    pub normal_tag: Texture,
    /// rgb = albedo, a = specular strength. Water stores its reflection uv in xy.
    pub albedo_spec: Texture,
    /// xyz = world position, w = view depth.
    pub position_depth: Texture,
    pub depth: Texture,
}

impl GBufferTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self {
            normal_tag: Texture::render_target(device, width, height, HDR_FORMAT, "GBuffer Normal/Tag"),
            albedo_spec: Texture::render_target(device, width, height, HDR_FORMAT, "GBuffer Albedo/Spec"),
            position_depth: Texture::render_target(device, width, height, GBUFFER_FORMAT, "GBuffer Position/Depth"),
            depth: Texture::create_depth_texture(device, width, height, "GBuffer Depth"),
        }
    }

    fn attachments(&self, load: wgpu::LoadOp<wgpu::Color>) -> [Option<wgpu::RenderPassColorAttachment<'_>>; 3] {
        [&self.normal_tag, &self.albedo_spec, &self.position_depth].map(|target| {
            Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })
        })
    }

    fn depth_attachment(&self, load: wgpu::LoadOp<f32>) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
        Some(wgpu::RenderPassDepthStencilAttachment {
            view: &self.depth.view,
            depth_ops: Some(wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        })
    }
}

/// One material and the drawables that use it.
pub struct GBufferSubmission<'a> {
    pub material: &'a Material,
    pub drawables: &'a [&'a Drawable],
}

/// The reflective water plane, drawn after every submission.
pub struct WaterDraw<'a> {
    pub drawable: &'a Drawable,
    pub material: &'a Material,
    pub reflection_view_proj: Mat4,
}

pub struct GBufferPass {
    terrain: wgpu::RenderPipeline,
    standard: wgpu::RenderPipeline,
    foliage: wgpu::RenderPipeline,
    water: wgpu::RenderPipeline,
}

impl GBufferPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let shader = create_shader(device, "GBuffer Shader", include_str!("shaders/gbuffer.wgsl"));
        let targets = gbuffer_targets();
        let bind_group_layouts = [&layouts.camera, &layouts.draw, &layouts.material];
        let build = |label: &str, vs_entry: &str, fs_entry: &str, cull_mode| {
            create_mesh_pipeline(
                device,
                &MeshPipelineDesc {
                    label,
                    shader: &shader,
                    vs_entry,
                    fs_entry: Some(fs_entry),
                    bind_group_layouts: &bind_group_layouts,
                    targets: &targets,
                    depth: DepthMode::ReadWrite,
                    cull_mode,
                },
            )
        };
        Self {
            terrain: build("GBuffer Terrain Pipeline", "vs_main", "fs_terrain", Some(wgpu::Face::Back)),
            standard: build("GBuffer Standard Pipeline", "vs_main", "fs_standard", Some(wgpu::Face::Back)),
            foliage: build("GBuffer Foliage Pipeline", "vs_foliage", "fs_foliage", None),
            water: build("GBuffer Water Pipeline", "vs_main", "fs_water", None),
        }
    }

    fn pipeline(&self, tag: MaterialTag) -> Option<&wgpu::RenderPipeline> {
        match tag {
            MaterialTag::Empty => None,
            MaterialTag::Terrain => Some(&self.terrain),
            MaterialTag::Standard => Some(&self.standard),
            MaterialTag::Foliage => Some(&self.foliage),
            MaterialTag::Water => Some(&self.water),
        }
    }

    /// Wipe every attachment: tag 0 (sky) everywhere, far depth.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder, targets: &GBufferTargets) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GBuffer Clear"),
            color_attachments: &targets.attachments(wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)),
            depth_stencil_attachment: targets.depth_attachment(wgpu::LoadOp::Clear(1.0)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    /// Draw every submission, then the water plane. Expects [`GBufferPass::clear`] earlier in the frame.
    pub fn run(
        &self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        submissions: &[GBufferSubmission],
        water: Option<&WaterDraw>,
        time: f32,
    ) {
        let targets = &ctx.targets.gbuffer;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GBuffer Pass"),
            color_attachments: &targets.attachments(wgpu::LoadOp::Load),
            depth_stencil_attachment: targets.depth_attachment(wgpu::LoadOp::Load),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);

        for submission in submissions {
            let Some(pipeline) = self.pipeline(submission.material.tag) else {
                log::debug!("Skipping submission with empty material tag");
                continue;
            };
            pass.set_pipeline(pipeline);
            let material_group = ctx.material_bind_group(submission.material.texture);
            pass.set_bind_group(2, &material_group, &[]);
            for drawable in submission.drawables {
                let uniform = submission.material.draw_uniform(drawable.model, time);
                let Some(offset) = ctx.arena.push(&ctx.queue, &uniform) else {
                    return;
                };
                pass.set_bind_group(1, ctx.arena.bind_group(), &[offset]);
                drawable.mesh.draw(&mut pass);
            }
        }

        if let Some(water) = water {
            let mut uniform = water.material.draw_uniform(water.drawable.model, time);
            uniform.material[0] = MaterialTag::Water.encoded();
            uniform.reflection_view_proj = water.reflection_view_proj.to_cols_array_2d();
            let Some(offset) = ctx.arena.push(&ctx.queue, &uniform) else {
                return;
            };
            pass.set_pipeline(&self.water);
            let material_group = ctx.material_bind_group(water.material.texture);
            pass.set_bind_group(1, ctx.arena.bind_group(), &[offset]);
            pass.set_bind_group(2, &material_group, &[]);
            water.drawable.mesh.draw(&mut pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_float_storage() {
        for tag in [
            MaterialTag::Empty,
            MaterialTag::Terrain,
            MaterialTag::Standard,
            MaterialTag::Foliage,
            MaterialTag::Water,
        ] {
            assert_eq!(MaterialTag::decode(tag.encoded()), tag);
        }
        // Standard and water keep their historic values.
        assert_eq!(MaterialTag::Standard.encoded(), 51.0);
        assert_eq!(MaterialTag::Water.encoded(), 101.0);
    }

    /// The tag goes with the draw, not with whatever was drawn before.
    #[test]
    fn draw_uniform_carries_the_material_tag() {
        let sand = Material::new(MaterialTag::Terrain)
            .with_params([3.0, 0.2, 0.2, 0.05])
            .with_specular(0.4);
        let rock = Material::new(MaterialTag::Standard).with_diffuse(Vec3::new(0.3, 0.2, 0.1));
        let a = sand.draw_uniform(Mat4::IDENTITY, 1.5);
        let b = rock.draw_uniform(Mat4::IDENTITY, 1.5);
        assert_eq!(a.material[0], 26.0);
        assert_eq!(a.material[1], 0.4);
        assert_eq!(a.material[2], 1.5);
        assert_eq!(a.params, [3.0, 0.2, 0.2, 0.05]);
        assert_eq!(b.material[0], 51.0);
        assert_eq!(b.material[1], 1.0);
        assert_eq!(b.color, [0.3, 0.2, 0.1, 1.0]);
    }
}
