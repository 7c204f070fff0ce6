//! Graphics capability seam.
//!
//! The viewer never owns a graphics context. Everything that touches the GPU
//! goes through [`GraphicsContext`], which an embedding window layer
//! implements on top of its API of choice. [`recording::RecordingContext`] is
//! the headless implementation used by the binary and the tests.

pub mod mirror;
pub mod recording;

use std::ops::{Deref, DerefMut};

use glam::{Mat3, Mat4, Vec3};

pub use mirror::GpuMirror;
pub use recording::RecordingContext;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// "Not yet created or already destroyed".
            pub const NONE: $name = $name(0);

            pub fn is_allocated(self) -> bool {
                self.0 != 0
            }
        }
    };
}

gpu_handle!(
    /// Vertex or index buffer object.
    BufferHandle
);
gpu_handle!(
    /// Vertex array object recording attribute bindings.
    VertexArrayHandle
);
gpu_handle!(
    /// 2-D texture object. Meshes hold these as weak references.
    TextureHandle
);
gpu_handle!(
    /// Linked shader program.
    ProgramHandle
);

/// Buffer binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

/// Primitive topology of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Lines,
}

/// Fixed vertex attribute slots shared by every shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribLocation {
    Position,
    Normal,
    Color,
    TexCoord,
    Tangent,
}

impl AttribLocation {
    pub fn index(self) -> u32 {
        match self {
            AttribLocation::Position => 0,
            AttribLocation::Normal => 1,
            AttribLocation::Color => 2,
            AttribLocation::TexCoord => 3,
            AttribLocation::Tangent => 4,
        }
    }
}

/// Value uploaded to a named shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Mat4(Mat4),
    Mat3(Mat3),
    Vec3(Vec3),
    Bool(bool),
    Int(i32),
}

/// Capability set supplied by the owner of the graphics context.
///
/// Handles returned as `NONE` signal failure; implementations must never hand
/// out zero for a live object.
pub trait GraphicsContext {
    fn make_current(&mut self);
    fn done_current(&mut self);

    /// Generate a buffer, bind it to `target` and upload `data`.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferHandle;
    /// Size in bytes the implementation actually stored for `buffer`.
    fn buffer_size(&mut self, target: BufferTarget, buffer: BufferHandle) -> usize;
    /// Overwrite part of an existing buffer in place.
    fn update_buffer(&mut self, target: BufferTarget, buffer: BufferHandle, offset: usize, data: &[u8]);
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle);
    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_vertex_array(&mut self) -> VertexArrayHandle;
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Source `location` from the currently bound vertex buffer, `components` floats per vertex.
    fn vertex_attrib_pointer(&mut self, location: AttribLocation, components: u8);
    fn enable_vertex_attrib(&mut self, location: AttribLocation);
    fn disable_vertex_attrib(&mut self, location: AttribLocation);
    /// Constant value used while the attribute array is disabled.
    fn vertex_attrib_constant(&mut self, location: AttribLocation, value: Vec3);

    /// Compile and link a program from GLSL sources; `NONE` on failure.
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramHandle;
    fn use_program(&mut self, program: ProgramHandle);
    fn delete_program(&mut self, program: ProgramHandle);
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: Uniform);

    /// Upload tightly packed RGBA8 pixels; `NONE` on failure.
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureHandle;
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Indexed draw of `count` indices from the bound vertex array.
    fn draw_elements(&mut self, mode: Primitive, count: usize);
    fn draw_arrays(&mut self, mode: Primitive, first: usize, count: usize);
}

/// Makes the context current for its lifetime.
///
/// GPU resources created or destroyed outside the per-frame draw path go
/// through a guard so the context is released on every exit path, early
/// returns and panics included.
pub struct ContextGuard<'a> {
    ctx: &'a mut dyn GraphicsContext,
}

impl<'a> ContextGuard<'a> {
    pub fn acquire(ctx: &'a mut dyn GraphicsContext) -> Self {
        ctx.make_current();
        Self { ctx }
    }
}

impl<'a> Deref for ContextGuard<'a> {
    type Target = dyn GraphicsContext + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.ctx
    }
}

impl<'a> DerefMut for ContextGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.ctx
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.ctx.done_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ViewerError};

    #[test]
    fn handle_sentinel() {
        assert!(!BufferHandle::NONE.is_allocated());
        assert!(!BufferHandle::default().is_allocated());
        assert!(BufferHandle(7).is_allocated());
        assert!(!TextureHandle::NONE.is_allocated());
        assert!(ProgramHandle(1).is_allocated());
    }

    #[test]
    fn attrib_locations_are_distinct() {
        let all = [
            AttribLocation::Position,
            AttribLocation::Normal,
            AttribLocation::Color,
            AttribLocation::TexCoord,
            AttribLocation::Tangent,
        ];
        for (i, a) in all.iter().enumerate() {
            assert_eq!(a.index(), i as u32);
        }
        assert_eq!(AttribLocation::Color.index(), 2);
    }

    #[test]
    fn guard_releases_on_scope_exit() {
        let mut ctx = RecordingContext::new();
        {
            let mut gl = ContextGuard::acquire(&mut ctx);
            let vao = gl.create_vertex_array();
            gl.delete_vertex_array(vao);
        }
        assert!(!ctx.is_current());
        assert_eq!(ctx.current_depth(), 0);
    }

    #[test]
    fn guard_releases_on_early_error_return() {
        fn fallible(ctx: &mut dyn GraphicsContext) -> Result<()> {
            let mut gl = ContextGuard::acquire(ctx);
            let _vao = gl.create_vertex_array();
            Err(ViewerError::Gpu("simulated failure".into()))
        }

        let mut ctx = RecordingContext::new();
        assert!(fallible(&mut ctx).is_err());
        assert!(!ctx.is_current());
    }
}
