//! Vertex layouts shared by every mesh pipeline.

/// The renderer draws the same vertex format procgen produces: position, normal, uv, color.
/// Color alpha carries the foliage sway weight.
pub use procgen::TerrainVertex as Vertex;

/// Types that describe their own vertex buffer layout.
pub trait VertexLayout {
    fn layout() -> wgpu::VertexBufferLayout<'static>;
}

impl VertexLayout for Vertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x3, // position
            1 => Float32x3, // normal
            2 => Float32x2, // uv
            3 => Float32x4, // color
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride as usize, size_of::<Vertex>());
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(
            offsets,
            vec![
                offset_of!(Vertex, position) as u64,
                offset_of!(Vertex, normal) as u64,
                offset_of!(Vertex, uv) as u64,
                offset_of!(Vertex, color) as u64,
            ]
        );
    }
}
