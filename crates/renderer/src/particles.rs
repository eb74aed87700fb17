//! GPU particles: a compute pass advances generation `n` into the other
//! storage buffer, then the freshly written buffer is drawn as camera-facing
//! billboards with additive blending.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::pipeline::{
    clear_attachment, create_mesh_pipeline, create_shader, storage_entry, uniform_entry, DepthMode, Layouts,
    MeshPipelineDesc,
};
use crate::renderer::RenderContext;
use crate::texture::HDR_FORMAT;

pub const PARTICLE_COUNT: u32 = 100_000;
pub const PARTICLE_WORKGROUP_SIZE: u32 = 64;
/// Billboard half-size in world units before the size control is applied.
pub const BILLBOARD_SCALE: f32 = 0.15;
/// Every particle starts here with zero velocity and an expired lifetime, so the first step respawns it.
pub const PARTICLE_ORIGIN: Vec3 = Vec3::new(0.0, 0.8, 0.0);

/// One particle (must match `Particle` in particle_sim.wgsl and particle_draw.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleRecord {
    /// xyz = position, w = age.
    pub position: [f32; 4],
    /// xyz = velocity, w = lifetime.
    pub velocity: [f32; 4],
    pub color: [f32; 4],
    /// x = stable id.
    pub id: [f32; 4],
}

impl ParticleRecord {
    pub fn initial(id: u32) -> Self {
        Self {
            position: PARTICLE_ORIGIN.extend(0.0).to_array(),
            velocity: [0.0; 4],
            color: [0.0; 4],
            id: [id as f32, 0.0, 0.0, 0.0],
        }
    }
}

pub fn initial_particles(count: u32) -> Vec<ParticleRecord> {
    (0..count).map(ParticleRecord::initial).collect()
}

/// Which of the two buffers holds the latest generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingPong {
    current: usize,
}

impl PingPong {
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffer the last simulation step wrote (and the draw reads).
    pub fn current(&self) -> usize {
        self.current
    }

    /// The buffer the next simulation step writes.
    pub fn next(&self) -> usize {
        1 - self.current
    }

    pub fn flip(&mut self) {
        self.current = self.next();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSettings {
    /// Added to 1 and multiplied into the billboard scale.
    pub size: f32,
    /// Falloff exponent across the billboard.
    pub edge: f32,
    pub color: Vec3,
    /// Flow-field scale; larger values give broader gusts.
    pub noise: f32,
    pub speed: f32,
    pub speed2: f32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            size: -0.1,
            edge: 2.5,
            color: Vec3::new(255.0, 225.0, 172.0) / 255.0,
            noise: 300.0,
            speed: 0.1,
            speed2: 0.2,
        }
    }
}

/// Simulation and billboard uniform (must match `Sim` in the particle shaders).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ParticleUniform {
    /// time, dt, edge, size
    pub params: [f32; 4],
    /// noise scale, speed, speed2, unused
    pub flow: [f32; 4],
    /// rgb = tint, a = billboard scale
    pub color: [f32; 4],
}

impl ParticleUniform {
    pub fn new(settings: &ParticleSettings, time: f32, dt: f32) -> Self {
        Self {
            params: [time, dt, settings.edge, settings.size],
            flow: [settings.noise, settings.speed, settings.speed2, 0.0],
            color: settings.color.extend(BILLBOARD_SCALE).to_array(),
        }
    }
}

pub struct ParticleSystem {
    count: u32,
    ping: PingPong,
    uniform_buffer: wgpu::Buffer,
    /// Indexed by the buffer being read: `sim_groups[i]` reads buffer `i`, writes the other.
    sim_groups: [wgpu::BindGroup; 2],
    /// `draw_groups[i]` reads buffer `i`.
    draw_groups: [wgpu::BindGroup; 2],
    sim_pipeline: wgpu::ComputePipeline,
    draw_pipeline: wgpu::RenderPipeline,
}

impl ParticleSystem {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, count: u32) -> Self {
        let records = initial_particles(count.max(1));
        let buffers = [0, 1].map(|i| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Particle Buffer {i}")),
                contents: bytemuck::cast_slice(&records),
                usage: wgpu::BufferUsages::STORAGE,
            })
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Uniform Buffer"),
            contents: bytemuck::bytes_of(&ParticleUniform::new(&ParticleSettings::default(), 0.0, 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sim_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Sim Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, wgpu::ShaderStages::COMPUTE, true),
                storage_entry(2, wgpu::ShaderStages::COMPUTE, false),
            ],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Draw Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                storage_entry(1, wgpu::ShaderStages::VERTEX, true),
            ],
        });

        let sim_groups = [0usize, 1].map(|read| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Particle Sim {read} -> {}", 1 - read)),
                layout: &sim_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers[read].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffers[1 - read].as_entire_binding(),
                    },
                ],
            })
        });
        let draw_groups = [0usize, 1].map(|read| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Particle Draw {read}")),
                layout: &draw_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers[read].as_entire_binding(),
                    },
                ],
            })
        });

        let sim_shader = create_shader(device, "Particle Sim Shader", include_str!("shaders/particle_sim.wgsl"));
        let sim_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Sim Pipeline Layout"),
            bind_group_layouts: &[&sim_layout],
            push_constant_ranges: &[],
        });
        let sim_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Sim Pipeline"),
            layout: Some(&sim_pipeline_layout),
            module: &sim_shader,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let draw_shader = create_shader(device, "Particle Draw Shader", include_str!("shaders/particle_draw.wgsl"));
        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };
        let draw_pipeline = create_mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Particle Draw Pipeline",
                shader: &draw_shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                bind_group_layouts: &[&layouts.camera, &draw_layout],
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth: DepthMode::None,
                cull_mode: None,
            },
        );

        log::info!("Particle system ready ({} particles)", records.len());
        Self {
            count: records.len() as u32,
            ping: PingPong::new(),
            uniform_buffer,
            sim_groups,
            draw_groups,
            sim_pipeline,
            draw_pipeline,
        }
    }

    /// Advance one generation, then make it current. The draw recorded after this reads what the compute pass wrote.
    pub fn simulate(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &ParticleSettings,
        time: f32,
        dt: f32,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&ParticleUniform::new(settings, time, dt)));
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle Sim Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.sim_pipeline);
        pass.set_bind_group(0, &self.sim_groups[self.ping.current()], &[]);
        pass.dispatch_workgroups(self.count.div_ceil(PARTICLE_WORKGROUP_SIZE), 1, 1);
        drop(pass);
        self.ping.flip();
    }

    /// Additive billboards into the particle target, cleared first.
    pub fn draw(&self, ctx: &RenderContext, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Particle Draw Pass"),
            color_attachments: &[clear_attachment(&ctx.targets.particles.view)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.draw_pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.draw_groups[self.ping.current()], &[]);
        ctx.quad.draw_instanced(&mut pass, self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_pong_alternates_each_cycle() {
        let mut ping = PingPong::new();
        let start = ping.current();
        ping.flip();
        assert_ne!(ping.current(), start);
        ping.flip();
        assert_eq!(ping.current(), start);
    }

    /// The step reads the current buffer and writes the other; after the flip the draw reads what was written.
    #[test]
    fn draw_reads_the_buffer_just_written() {
        let mut ping = PingPong::new();
        for _ in 0..3 {
            let written = ping.next();
            assert_ne!(written, ping.current());
            ping.flip();
            assert_eq!(ping.current(), written);
        }
    }

    #[test]
    fn initial_particles_start_expired_at_origin() {
        let records = initial_particles(4);
        assert_eq!(records.len(), 4);
        for (i, p) in records.iter().enumerate() {
            assert_eq!(p.position, [0.0, 0.8, 0.0, 0.0]);
            assert_eq!(p.velocity, [0.0; 4]);
            assert_eq!(p.id[0], i as f32);
        }
        assert_eq!(std::mem::size_of::<ParticleRecord>(), 64);
    }

    #[test]
    fn uniform_packs_controls() {
        let u = ParticleUniform::new(&ParticleSettings::default(), 2.0, 0.016);
        assert_eq!(u.params, [2.0, 0.016, 2.5, -0.1]);
        assert_eq!(u.color[3], BILLBOARD_SCALE);
    }
}
