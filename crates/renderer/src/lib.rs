//! Deferred wgpu renderer for a procedural dune landscape.
//!
//! One frame runs the passes in a fixed order: shadow bake (only when the light
//! moved), G-buffer fill, skybox, water reflection, particles, light occlusion,
//! deferred resolve, then the post chain selected by [`PostProcessType`].

pub mod camera;
pub mod draw;
pub mod error;
pub mod gbuffer;
pub mod mesh;
pub mod occlusion;
pub mod particles;
pub mod pipeline;
pub mod post;
pub mod reflection;
pub mod renderer;
pub mod resolve;
pub mod settings;
pub mod shadow;
pub mod sky;
pub mod texture;
pub mod vertex;

pub use camera::*;
pub use draw::*;
pub use error::*;
pub use gbuffer::*;
pub use mesh::*;
pub use occlusion::*;
pub use particles::*;
pub use post::*;
pub use reflection::*;
pub use renderer::*;
pub use resolve::*;
pub use settings::*;
pub use shadow::*;
pub use sky::*;
pub use texture::*;
pub use vertex::*;
