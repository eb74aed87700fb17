//! Deferred lighting resolve.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::camera::CameraMode;
use crate::pipeline::{
    clear_attachment, create_fullscreen_pipeline, create_shader, depth_texture_entry, sampler_entry, texture_entry,
    uniform_entry,
};
use crate::post::PostProcessType;
use crate::renderer::RenderContext;
use crate::settings::RenderSettings;
use crate::texture::{Texture, TextureId, HDR_FORMAT};

/// Blend from `y` (inclination 0) to `x` (inclination 0.5).
pub fn palette_lerp(x: Vec3, y: Vec3, a: f32) -> Vec3 {
    let b = a / 0.5;
    y * (1.0 - b) + x * b
}

/// Where the lit frame goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveTarget {
    /// Straight to the display.
    Surface,
    /// Display-format copy for the demo fade.
    FadeSource,
    /// Float target feeding the post chain.
    Original,
}

impl ResolveTarget {
    pub fn select(mode: CameraMode, post_type: PostProcessType) -> Self {
        match (post_type, mode) {
            (PostProcessType::None, CameraMode::Interactive) => Self::Surface,
            (PostProcessType::None, CameraMode::Demo) => Self::FadeSource,
            (PostProcessType::Default, _) => Self::Original,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingSettings {
    pub light_color: Vec3,
    pub sunset_light_color: Vec3,
    pub brightness: f32,
    pub ambient: f32,
    pub roughness: f32,
    /// Scales direct light.
    pub level: f32,
    pub specular: f32,
    pub shininess: f32,
    pub sand_specular: Vec3,
    /// Water fresnel sharpness.
    pub edge_pow: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            light_color: Vec3::new(251.0, 197.0, 255.0) / 255.0,
            sunset_light_color: Vec3::new(236.0, 220.0, 255.0) / 255.0,
            brightness: 3.1,
            ambient: 0.15,
            roughness: 0.2,
            level: 0.6,
            specular: 1.0,
            shininess: 20.0,
            sand_specular: Vec3::new(255.0, 225.0, 155.0) / 255.0,
            edge_pow: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogSettings {
    pub density: f32,
    pub color: Vec3,
    pub sunset_color: Vec3,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            density: 0.0005,
            color: Vec3::new(25.0, 52.0, 82.0) / 255.0,
            sunset_color: Vec3::new(255.0, 237.0, 222.0) / 255.0,
        }
    }
}

/// Cloud shadows drifting over the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudShadowSettings {
    pub edge: f32,
    pub size: f32,
    pub speed: f32,
    pub speed2: f32,
    pub noise: f32,
    pub strength: f32,
    /// Light left under a full cloud.
    pub light: f32,
}

impl Default for CloudShadowSettings {
    fn default() -> Self {
        Self {
            edge: 0.8,
            size: 0.35,
            speed: 0.1,
            speed2: 0.2,
            noise: 300.0,
            strength: 2.4,
            light: 0.5,
        }
    }
}

/// Per-frame values the resolve needs besides the settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveFrame {
    pub light_view_proj: Mat4,
    /// The demo eye while a demo plays, so water highlights follow the script.
    pub eye: Vec3,
    pub time: f32,
    pub width: u32,
    pub height: u32,
}

/// Must match `Resolve` in resolve.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ResolveUniform {
    pub light_view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub sun: [f32; 4],
    pub light: [f32; 4],
    pub fog: [f32; 4],
    pub sand_specular: [f32; 4],
    pub material: [f32; 4],
    pub water: [f32; 4],
    pub clouds: [f32; 4],
    pub clouds2: [f32; 4],
    pub screen: [f32; 4],
}

impl ResolveUniform {
    pub fn new(settings: &RenderSettings, frame: &ResolveFrame) -> Self {
        let lighting = &settings.lighting;
        let fog = &settings.fog;
        let clouds = &settings.clouds;
        let inclination = settings.sky.inclination;
        let width = frame.width.max(1) as f32;
        let height = frame.height.max(1) as f32;
        Self {
            light_view_proj: frame.light_view_proj.to_cols_array_2d(),
            eye: frame.eye.extend(frame.time).to_array(),
            sun: settings.sky.sun_direction().extend(inclination).to_array(),
            light: palette_lerp(lighting.light_color, lighting.sunset_light_color, inclination)
                .extend(lighting.brightness)
                .to_array(),
            fog: palette_lerp(fog.color, fog.sunset_color, inclination)
                .extend(fog.density)
                .to_array(),
            sand_specular: lighting.sand_specular.extend(lighting.shininess).to_array(),
            material: [lighting.ambient, lighting.roughness, lighting.level, lighting.specular],
            water: [
                settings.water.size,
                settings.water.distortion_scale,
                lighting.edge_pow,
                0.0,
            ],
            clouds: [clouds.edge, clouds.size, clouds.speed, clouds.strength],
            clouds2: [clouds.light, clouds.noise, clouds.speed2, 0.0],
            screen: [width, height, 1.0 / width, 1.0 / height],
        }
    }
}

/// Side inputs owned by other passes.
pub struct ResolveInputs<'a> {
    pub shadow_map: &'a Texture,
    pub reflection: &'a Texture,
    /// Falls back to the placeholder until the image arrives.
    pub water_normal: Option<TextureId>,
}

fn view_entry(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}

pub struct ResolvePass {
    layout: wgpu::BindGroupLayout,
    hdr: wgpu::RenderPipeline,
    ldr: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    clamp_sampler: wgpu::Sampler,
    repeat_sampler: wgpu::Sampler,
}

impl ResolvePass {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let fragment = wgpu::ShaderStages::FRAGMENT;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Resolve Bind Group Layout"),
            entries: &[
                uniform_entry(0, fragment),
                texture_entry(1, fragment, false),
                texture_entry(2, fragment, false),
                texture_entry(3, fragment, false),
                depth_texture_entry(4, fragment),
                sampler_entry(5, fragment, wgpu::SamplerBindingType::Comparison),
                texture_entry(6, fragment, true),
                texture_entry(7, fragment, true),
                texture_entry(8, fragment, true),
                texture_entry(9, fragment, true),
                sampler_entry(10, fragment, wgpu::SamplerBindingType::Filtering),
                sampler_entry(11, fragment, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let shader = create_shader(device, "Resolve Shader", include_str!("shaders/resolve.wgsl"));
        let hdr = create_fullscreen_pipeline(
            device,
            "Resolve HDR Pipeline",
            &shader,
            "fs_resolve_hdr",
            &[&layout],
            HDR_FORMAT,
            None,
        );
        let ldr = create_fullscreen_pipeline(
            device,
            "Resolve Display Pipeline",
            &shader,
            "fs_resolve_ldr",
            &[&layout],
            surface_format,
            None,
        );
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Resolve Uniform Buffer"),
            contents: bytemuck::bytes_of(&ResolveUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = |label, address_mode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            })
        };
        Self {
            layout,
            hdr,
            ldr,
            uniform_buffer,
            clamp_sampler: sampler("Resolve Clamp Sampler", wgpu::AddressMode::ClampToEdge),
            repeat_sampler: sampler("Resolve Repeat Sampler", wgpu::AddressMode::Repeat),
        }
    }

    pub fn prepare(&self, queue: &wgpu::Queue, uniform: &ResolveUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Light the G-buffer into `target`. `surface` is only written when the target is [`ResolveTarget::Surface`].
    pub fn run(
        &self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        inputs: &ResolveInputs,
        target: ResolveTarget,
        surface: &wgpu::TextureView,
    ) {
        let gbuffer = &ctx.targets.gbuffer;
        let water_normal = match inputs.water_normal {
            Some(id) => ctx.textures.get(id),
            None => ctx.textures.placeholder(),
        };
        // Rebuilt every frame so a texture that just finished loading is picked up.
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Resolve Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                view_entry(1, &gbuffer.normal_tag.view),
                view_entry(2, &gbuffer.albedo_spec.view),
                view_entry(3, &gbuffer.position_depth.view),
                view_entry(4, &inputs.shadow_map.view),
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&inputs.shadow_map.sampler),
                },
                view_entry(6, &ctx.targets.sky.view),
                view_entry(7, &inputs.reflection.view),
                view_entry(8, &water_normal.view),
                view_entry(9, &ctx.targets.particles.view),
                wgpu::BindGroupEntry {
                    binding: 10,
                    resource: wgpu::BindingResource::Sampler(&self.clamp_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 11,
                    resource: wgpu::BindingResource::Sampler(&self.repeat_sampler),
                },
            ],
        });

        let (output, pipeline) = match target {
            ResolveTarget::Surface => (surface, &self.ldr),
            ResolveTarget::FadeSource => (&ctx.targets.fade_source.view, &self.ldr),
            ResolveTarget::Original => (&ctx.targets.original.view, &self.hdr),
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Resolve Pass"),
            color_attachments: &[clear_attachment(output)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_endpoints_and_midpoint() {
        let day = Vec3::new(1.0, 0.5, 0.0);
        let sunset = Vec3::new(0.0, 0.5, 1.0);
        assert_eq!(palette_lerp(day, sunset, 0.0), sunset);
        assert_eq!(palette_lerp(day, sunset, 0.5), day);
        assert!((palette_lerp(day, sunset, 0.25) - Vec3::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn resolve_target_follows_mode_and_post_type() {
        use CameraMode::*;
        assert_eq!(ResolveTarget::select(Interactive, PostProcessType::None), ResolveTarget::Surface);
        assert_eq!(ResolveTarget::select(Demo, PostProcessType::None), ResolveTarget::FadeSource);
        assert_eq!(ResolveTarget::select(Interactive, PostProcessType::Default), ResolveTarget::Original);
        assert_eq!(ResolveTarget::select(Demo, PostProcessType::Default), ResolveTarget::Original);
    }

    #[test]
    fn uniform_blends_palettes_by_inclination() {
        let mut settings = RenderSettings::default();
        settings.sky.inclination = 0.0;
        let frame = ResolveFrame {
            light_view_proj: Mat4::IDENTITY,
            eye: Vec3::new(1.0, 2.0, 3.0),
            time: 7.5,
            width: 640,
            height: 480,
        };
        let sunset = ResolveUniform::new(&settings, &frame);
        assert_eq!(&sunset.fog[..3], &settings.fog.sunset_color.to_array()[..]);
        assert_eq!(sunset.fog[3], 0.0005);
        assert_eq!(sunset.eye, [1.0, 2.0, 3.0, 7.5]);
        assert_eq!(sunset.light[3], 3.1);

        settings.sky.inclination = 0.5;
        let day = ResolveUniform::new(&settings, &frame);
        assert_eq!(&day.light[..3], &settings.lighting.light_color.to_array()[..]);
    }

    #[test]
    fn uniform_sun_is_unit_length() {
        let settings = RenderSettings::default();
        let frame = ResolveFrame {
            light_view_proj: Mat4::IDENTITY,
            eye: Vec3::ZERO,
            time: 0.0,
            width: 0,
            height: 0,
        };
        let uniform = ResolveUniform::new(&settings, &frame);
        let sun = Vec3::new(uniform.sun[0], uniform.sun[1], uniform.sun[2]);
        assert!((sun.length() - 1.0).abs() < 1e-5);
        assert_eq!(uniform.screen[0], 1.0);
    }
}
