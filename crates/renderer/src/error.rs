//! Renderer error types.

use thiserror::Error;

/// Fatal setup failures. Nothing here is recoverable once the renderer is running.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("surface reports no supported formats for this adapter")]
    SurfaceUnsupported,
    #[error("GPU cannot render to {0:?} targets")]
    UnsupportedFormat(wgpu::TextureFormat),
    #[error("shader validation failed: {0}")]
    Shader(String),
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Failures while loading an image or mesh from disk.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to import glTF {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("{path} contains no triangle mesh")]
    EmptyMesh { path: String },
}
