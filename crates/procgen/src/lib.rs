//! Procedural geometry for the dune scene: ridged noise, height fields, scatter sets.

pub mod grid;
pub mod heightfield;
pub mod noise_field;
pub mod scatter;
pub mod textures;

pub use grid::*;
pub use heightfield::*;
pub use noise_field::*;
pub use scatter::*;
pub use textures::*;
