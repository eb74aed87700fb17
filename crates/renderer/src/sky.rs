//! Skybox: sun placement, scattering and cloud uniforms, and the sky draw
//! shared by the main camera and the mirrored water camera.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::mesh::Mesh;
use crate::pipeline::{
    clear_attachment, create_mesh_pipeline, create_shader, create_uniform_bind_group_layout, DepthMode, Layouts,
    MeshPipelineDesc,
};
use crate::resolve::palette_lerp;
use crate::texture::HDR_FORMAT;

/// Sun position on a sphere of radius `distance`.
///
/// With the default azimuth, `inclination` 0.5 puts the sun on the horizon and 0 overhead.
pub fn sun_position(inclination: f32, azimuth: f32, distance: f32) -> Vec3 {
    let theta = std::f32::consts::PI * (inclination - 0.5);
    let phi = std::f32::consts::TAU * (azimuth - 0.5);
    Vec3::new(
        distance * phi.cos(),
        distance * phi.sin() * theta.sin(),
        distance * phi.sin() * theta.cos(),
    )
}

/// Cloud layer drawn into the sky.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCloudSettings {
    pub edge: f32,
    pub size: f32,
    pub noise: f32,
    pub strength: f32,
    pub amount: f32,
    /// Lifts the projection plane so clouds thin out near the horizon.
    pub horizon: f32,
    pub softness: f32,
}

impl Default for SkyCloudSettings {
    fn default() -> Self {
        Self {
            edge: 0.66,
            size: 0.5,
            noise: 1.3,
            strength: 1.0,
            amount: 0.6,
            horizon: 0.25,
            softness: 0.33,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkySettings {
    /// 0 (sunset palette) to 0.5 (day palette).
    pub inclination: f32,
    pub azimuth: f32,
    pub distance: f32,
    pub luminance: f32,
    pub turbidity: f32,
    pub rayleigh: f32,
    pub mie_coefficient: f32,
    pub mie_directional_g: f32,
    pub clouds: SkyCloudSettings,
    pub cloud_speed: f32,
    pub cloud_speed2: f32,
    pub day_color: Vec3,
    pub sunset_color: Vec3,
}

impl Default for SkySettings {
    fn default() -> Self {
        Self {
            inclination: 0.484,
            azimuth: 0.25,
            distance: 400.0,
            luminance: 1.0,
            turbidity: 6.0,
            rayleigh: 2.0,
            mie_coefficient: 0.005,
            mie_directional_g: 0.8,
            clouds: SkyCloudSettings::default(),
            cloud_speed: 0.1,
            cloud_speed2: 0.2,
            day_color: Vec3::new(243.0, 162.0, 255.0) / 255.0,
            sunset_color: Vec3::new(253.0, 242.0, 255.0) / 255.0,
        }
    }
}

impl SkySettings {
    pub fn sun_position(&self) -> Vec3 {
        sun_position(self.inclination, self.azimuth, self.distance)
    }

    /// Unit vector toward the sun, used for lighting and water highlights.
    pub fn sun_direction(&self) -> Vec3 {
        let p = self.sun_position();
        if p.length_squared() > 0.0 {
            p.normalize()
        } else {
            Vec3::Y
        }
    }

    pub fn tint(&self) -> Vec3 {
        palette_lerp(self.day_color, self.sunset_color, self.inclination)
    }
}

/// Sky uniform (must match `Sky` in sky.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyUniform {
    pub sun: [f32; 4],
    pub scattering: [f32; 4],
    pub clouds: [f32; 4],
    pub clouds2: [f32; 4],
    pub motion: [f32; 4],
    pub tint: [f32; 4],
}

impl SkyUniform {
    pub fn new(settings: &SkySettings, time: f32) -> Self {
        let c = &settings.clouds;
        Self {
            sun: settings.sun_position().extend(settings.luminance).to_array(),
            scattering: [
                settings.turbidity,
                settings.rayleigh,
                settings.mie_coefficient,
                settings.mie_directional_g,
            ],
            clouds: [c.edge, c.size, c.noise, c.strength],
            clouds2: [c.amount, c.horizon, c.softness, time],
            motion: [settings.cloud_speed, settings.cloud_speed2, 0.0, 0.0],
            tint: settings.tint().extend(1.0).to_array(),
        }
    }
}

pub struct SkyPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl SkyPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let layout = create_uniform_bind_group_layout(
            device,
            "Sky Bind Group Layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            false,
        );
        let shader = create_shader(device, "Sky Shader", include_str!("shaders/sky.wgsl"));
        let pipeline = create_mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Sky Pipeline",
                shader: &shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                bind_group_layouts: &[&layouts.camera, &layout],
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth: DepthMode::None,
                // Mirrored cameras flip winding; the cube is drawn from inside either way.
                cull_mode: None,
            },
        );
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Uniform Buffer"),
            contents: bytemuck::bytes_of(&SkyUniform::new(&SkySettings::default(), 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Self {
            pipeline,
            uniform_buffer,
            bind_group,
        }
    }

    /// Upload this frame's sky parameters (call once, before either sky draw).
    pub fn prepare(&self, queue: &wgpu::Queue, settings: &SkySettings, time: f32) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&SkyUniform::new(settings, time)));
    }

    /// Draw the sky cube into `target` as seen by `camera`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        camera: &wgpu::BindGroup,
        sky_box: &Mesh,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[clear_attachment(target)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        sky_box.draw(&mut pass);
    }
}
