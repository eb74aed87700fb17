//! Drawables and the per-frame draw uniform arena.

use std::cell::Cell;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::mesh::Mesh;

/// Byte distance between consecutive draw slots (wgpu's default dynamic offset alignment).
pub const DRAW_UNIFORM_STRIDE: u64 = 256;
/// Draw slots available per frame.
pub const MAX_DRAWS_PER_FRAME: u32 = 256;

/// A mesh placed in the world.
pub struct Drawable {
    pub mesh: Mesh,
    pub model: Mat4,
}

impl Drawable {
    pub fn new(mesh: Mesh, model: Mat4) -> Self {
        Self { mesh, model }
    }
}

/// Per-draw uniform (must match `Draw` in gbuffer.wgsl, shadow.wgsl, occlusion.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    /// Camera projection times the mirrored view; only the water draw reads it.
    pub reflection_view_proj: [[f32; 4]; 4],
    /// rgb = diffuse (or flat output color), a = 1.
    pub color: [f32; 4],
    /// Material-specific knobs.
    pub params: [f32; 4],
    /// x = encoded material tag, y = specular strength, z = time, w = grid size.
    pub material: [f32; 4],
}

impl DrawUniform {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            reflection_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
            params: [0.0; 4],
            material: [0.0; 4],
        }
    }

    /// Flat color draw (occlusion mask).
    pub fn flat(model: Mat4, color: Vec4) -> Self {
        Self {
            color: color.to_array(),
            ..Self::new(model)
        }
    }
}

/// Hands out unique slot indices until the frame's capacity is used up.
#[derive(Debug)]
pub struct SlotCursor {
    next: Cell<u32>,
    capacity: u32,
}

impl SlotCursor {
    pub fn new(capacity: u32) -> Self {
        Self {
            next: Cell::new(0),
            capacity,
        }
    }

    pub fn claim(&self) -> Option<u32> {
        let slot = self.next.get();
        if slot >= self.capacity {
            return None;
        }
        self.next.set(slot + 1);
        Some(slot)
    }

    pub fn reset(&self) {
        self.next.set(0);
    }

    pub fn used(&self) -> u32 {
        self.next.get()
    }
}

/// One uniform buffer holding every draw's [`DrawUniform`] for the frame.
///
/// Each draw claims its own 256-byte slot and binds it by dynamic offset, so
/// `queue.write_buffer` calls issued while recording never overwrite a slot an
/// earlier draw in the same submission still reads. Reset once per frame.
pub struct DrawArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    cursor: SlotCursor,
    overflow_logged: Cell<bool>,
}

impl DrawArena {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Arena"),
            size: DRAW_UNIFORM_STRIDE * MAX_DRAWS_PER_FRAME as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            cursor: SlotCursor::new(MAX_DRAWS_PER_FRAME),
            overflow_logged: Cell::new(false),
        }
    }

    /// Start a new frame.
    pub fn reset(&self) {
        self.cursor.reset();
        self.overflow_logged.set(false);
    }

    /// Write `uniform` into a fresh slot and return its dynamic offset.
    /// `None` once the frame is full; the caller skips that draw.
    pub fn push(&self, queue: &wgpu::Queue, uniform: &DrawUniform) -> Option<u32> {
        let Some(slot) = self.cursor.claim() else {
            if !self.overflow_logged.replace(true) {
                log::warn!("Draw arena full ({} draws); skipping the rest of this frame", MAX_DRAWS_PER_FRAME);
            }
            return None;
        };
        let offset = slot as u64 * DRAW_UNIFORM_STRIDE;
        queue.write_buffer(&self.buffer, offset, bytemuck::bytes_of(uniform));
        Some(offset as u32)
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn used(&self) -> u32 {
        self.cursor.used()
    }
}
