//! Per-frame rendering: transform state, frustum culling, draw dispatch and
//! the shader/texture loaders feeding it.

pub mod culling;
pub mod draw;
pub mod programs;
pub mod state;
pub mod textures;

pub use culling::{Frustum, is_visible};
pub use draw::{Shading, resolve_shading};
pub use programs::{ProgramRegistry, load_program, read_shaders};
pub use state::RenderState;
pub use textures::{load_image_into_texture, load_texture};
