//! GPU setup, the shared render context, and the per-size frame targets.

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::CameraUniform;
use crate::draw::DrawArena;
use crate::error::RenderError;
use crate::gbuffer::{GBufferPass, GBufferTargets};
use crate::mesh::{sky_box, sphere, Mesh};
use crate::occlusion::{OcclusionPass, LIGHT_PROXY_RADIUS};
use crate::particles::ParticleSystem;
use crate::pipeline::Layouts;
use crate::post::PostPass;
use crate::reflection::ReflectionPass;
use crate::resolve::ResolvePass;
use crate::shadow::ShadowPass;
use crate::sky::SkyPass;
use crate::texture::{PendingTextures, Texture, TextureId, GBUFFER_FORMAT, HDR_FORMAT};

/// A camera uniform buffer with its group(0) bind group.
pub struct CameraBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[CameraUniform::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &CameraUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }
}

/// Every offscreen target sized to the window. Rebuilt on resize.
pub struct FrameTargets {
    pub width: u32,
    pub height: u32,
    pub gbuffer: GBufferTargets,
    /// Skybox as seen by the main camera.
    pub sky: Texture,
    /// Additive particle billboards.
    pub particles: Texture,
    /// Light proxy over black occluders; god-ray input.
    pub occlusion: Texture,
    /// Resolved scene when a post chain follows.
    pub original: Texture,
    pub ping: [Texture; 2],
    pub scratch: Texture,
    /// Display-format frame the fade pass reads in demo mode.
    pub fade_source: Texture,
}

impl FrameTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, surface_format: wgpu::TextureFormat) -> Self {
        let hdr = |label: &str| Texture::render_target(device, width, height, HDR_FORMAT, label);
        Self {
            width,
            height,
            gbuffer: GBufferTargets::new(device, width, height),
            sky: hdr("Sky Target"),
            particles: hdr("Particle Target"),
            occlusion: hdr("Occlusion Target"),
            original: hdr("Original Scene Target"),
            ping: [hdr("Post Ping A"), hdr("Post Ping B")],
            scratch: hdr("Post Scratch"),
            fade_source: Texture::render_target(device, width, height, surface_format, "Fade Source"),
        }
    }
}

/// Device, shared layouts and per-frame resources every pass borrows.
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub layouts: Layouts,
    pub surface_format: wgpu::TextureFormat,
    pub targets: FrameTargets,
    /// Main camera, written once per frame.
    pub camera: CameraBinding,
    pub arena: DrawArena,
    pub textures: PendingTextures,
    pub sky_box: Mesh,
    /// Billboard quad for particles.
    pub quad: Mesh,
    pub light_proxy: Mesh,
}

impl RenderContext {
    /// Diffuse texture group for one draw. Unset or unfinished textures bind the white placeholder.
    pub fn material_bind_group(&self, texture: Option<TextureId>) -> wgpu::BindGroup {
        let texture = match texture {
            Some(id) => self.textures.get(id),
            None => self.textures.placeholder(),
        };
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.layouts.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.targets = FrameTargets::new(&self.device, width, height, self.surface_format);
    }

    pub fn aspect(&self) -> f32 {
        self.targets.width.max(1) as f32 / self.targets.height.max(1) as f32
    }
}

/// Owns the window surface, the context and one instance of every pass.
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pub window: Arc<Window>,
    pub ctx: RenderContext,
    pub gbuffer: GBufferPass,
    pub shadow: ShadowPass,
    pub occlusion: OcclusionPass,
    pub sky: SkyPass,
    pub reflection: ReflectionPass,
    pub particles: ParticleSystem,
    pub resolve: ResolvePass,
    pub post: PostPass,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, particle_count: u32) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using GPU: {:?}", adapter.get_info());

        for format in [HDR_FORMAT, GBUFFER_FORMAT] {
            let usages = adapter.get_texture_format_features(format).allowed_usages;
            if !usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING) {
                return Err(RenderError::UnsupportedFormat(format));
            }
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::SurfaceUnsupported)?;
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
            wgpu::PresentMode::Mailbox
        } else {
            wgpu::PresentMode::AutoVsync
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface {}x{} {:?} ({:?})",
            config.width,
            config.height,
            surface_format,
            present_mode
        );

        // Shader or layout mistakes surface here as one error instead of a panic on first use.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let layouts = Layouts::new(&device);
        let gbuffer = GBufferPass::new(&device, &layouts);
        let shadow = ShadowPass::new(&device, &layouts);
        let occlusion = OcclusionPass::new(&device, &layouts);
        let sky = SkyPass::new(&device, &layouts);
        let reflection = ReflectionPass::new(&device, &layouts);
        let particles = ParticleSystem::new(&device, &layouts, particle_count);
        let resolve = ResolvePass::new(&device, surface_format);
        let post = PostPass::new(&device, &layouts, surface_format);
        if let Some(err) = device.pop_error_scope().await {
            return Err(RenderError::Shader(err.to_string()));
        }

        let ctx = RenderContext {
            targets: FrameTargets::new(&device, config.width, config.height, surface_format),
            camera: CameraBinding::new(&device, &layouts.camera, "Main Camera"),
            arena: DrawArena::new(&device, &layouts.draw),
            textures: PendingTextures::new(&device, &queue),
            sky_box: Mesh::from_buffers(&device, "Sky Box", &sky_box(1.0)),
            quad: Mesh::from_buffers(&device, "Billboard Quad", &procgen::unit_quad()),
            light_proxy: Mesh::from_buffers(&device, "Light Proxy", &sphere(LIGHT_PROXY_RADIUS, 24, 16)),
            layouts,
            surface_format,
            device,
            queue,
        };

        Ok(Self {
            surface,
            config,
            window,
            ctx,
            gbuffer,
            shadow,
            occlusion,
            sky,
            reflection,
            particles,
            resolve,
            post,
        })
    }

    /// Reconfigure the surface and rebuild every window-sized target. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.ctx.device, &self.config);
        self.ctx.resize(width, height);
    }

    /// Configure the surface again at its current size (after `Lost`/`Outdated`).
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.ctx.device, &self.config);
    }

    /// Acquire the next surface texture and open the frame's encoder.
    ///
    /// Also resets the draw arena and uploads any textures that finished decoding.
    pub fn begin_frame(&mut self) -> Result<(wgpu::SurfaceTexture, wgpu::CommandEncoder), wgpu::SurfaceError> {
        self.ctx.arena.reset();
        self.ctx.textures.poll(&self.ctx.device, &self.ctx.queue);
        let output = self.surface.get_current_texture()?;
        let encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        Ok((output, encoder))
    }

    pub fn end_frame(&self, output: wgpu::SurfaceTexture, encoder: wgpu::CommandEncoder) {
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn aspect(&self) -> f32 {
        self.ctx.aspect()
    }
}
