//! Bind group layouts and render/compute pipeline builders.

use crate::texture::{DEPTH_FORMAT, GBUFFER_FORMAT, HDR_FORMAT};
use crate::vertex::{Vertex, VertexLayout};

/// Texture slots in the post layout. Single-input effects bind the same view twice.
pub const POST_INPUTS: u32 = 2;

/// Every layout the passes share, created once at startup.
pub struct Layouts {
    /// group(0) of every mesh pipeline: `CameraUniform`.
    pub camera: wgpu::BindGroupLayout,
    /// group(1) of every mesh pipeline: `DrawUniform` with a dynamic offset.
    pub draw: wgpu::BindGroupLayout,
    /// group(2) of G-buffer pipelines: diffuse texture + sampler.
    pub material: wgpu::BindGroupLayout,
    /// Every post effect: two inputs, a sampler and the post uniform.
    pub post: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            camera: create_uniform_bind_group_layout(
                device,
                "Camera Bind Group Layout",
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                false,
            ),
            draw: create_uniform_bind_group_layout(
                device,
                "Draw Bind Group Layout",
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                true,
            ),
            material: create_texture_bind_group_layout(device),
            post: create_post_bind_group_layout(device, POST_INPUTS),
        }
    }
}

pub fn create_uniform_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
    dynamic: bool,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: None,
            },
            ..uniform_entry(0, visibility)
        }],
    })
}

pub fn create_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Texture Bind Group Layout"),
        entries: &[
            texture_entry(0, wgpu::ShaderStages::FRAGMENT, true),
            sampler_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
        ],
    })
}

/// `inputs` filterable textures at bindings `0..inputs`, then a sampler, then the uniform.
pub fn create_post_bind_group_layout(device: &wgpu::Device, inputs: u32) -> wgpu::BindGroupLayout {
    let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..inputs)
        .map(|i| texture_entry(i, wgpu::ShaderStages::FRAGMENT, true))
        .collect();
    entries.push(sampler_entry(inputs, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering));
    entries.push(uniform_entry(inputs + 1, wgpu::ShaderStages::FRAGMENT));
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Post Bind Group Layout"),
        entries: &entries,
    })
}

pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn texture_entry(binding: u32, visibility: wgpu::ShaderStages, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub fn depth_texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub fn sampler_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    kind: wgpu::SamplerBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(kind),
        count: None,
    }
}

pub fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Depth state for mesh pipelines.
#[derive(Debug, Clone, Copy)]
pub enum DepthMode {
    None,
    /// Test and write with `Less`.
    ReadWrite,
}

/// Everything a mesh pipeline needs beyond the shader.
pub struct MeshPipelineDesc<'a> {
    pub label: &'a str,
    pub shader: &'a wgpu::ShaderModule,
    pub vs_entry: &'a str,
    /// `None` for depth-only pipelines.
    pub fs_entry: Option<&'a str>,
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth: DepthMode,
    pub cull_mode: Option<wgpu::Face>,
}

/// Triangle-list pipeline over the shared [`Vertex`] layout.
pub fn create_mesh_pipeline(device: &wgpu::Device, desc: &MeshPipelineDesc) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.bind_group_layouts,
        push_constant_ranges: &[],
    });

    let depth_stencil = match desc.depth {
        DepthMode::None => None,
        DepthMode::ReadWrite => Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: desc.shader,
            entry_point: Some(desc.vs_entry),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: desc.fs_entry.map(|entry| wgpu::FragmentState {
            module: desc.shader,
            entry_point: Some(entry),
            targets: desc.targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// The three G-buffer color targets, no blending.
pub fn gbuffer_targets() -> [Option<wgpu::ColorTargetState>; 3] {
    [HDR_FORMAT, HDR_FORMAT, GBUFFER_FORMAT].map(|format| {
        Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })
    })
}

/// Full-screen triangle pipeline; the vertex shader must be `vs_fullscreen` in the same module.
pub fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    fs_entry: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

pub fn create_shader(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

/// Clear-to-black color attachment.
pub fn clear_attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        },
    })
}
