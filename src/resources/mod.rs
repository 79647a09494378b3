//! Resource management
//!
//! Mesh assets, materials, shaders and render targets the renderer consumes.

pub mod material;
pub mod material_instance;
pub mod mesh;
pub mod shader;
pub mod texture;

pub use material::*;
pub use material_instance::MaterialInstance;
pub use mesh::*;
pub use shader::*;
pub use texture::*;
