use glam::{Vec2, Vec3};
use tracing::{debug, warn};

use super::{AttribLocation, BufferHandle, BufferTarget, GraphicsContext, VertexArrayHandle};
use crate::error::{Result, ViewerError};

/// Length of the normal-visualization line segments, in mesh units.
pub const NORMAL_LINE_LENGTH: f32 = 0.1;

/// Unit cube centred at the origin; the wireframe is scaled to the mesh box at draw time.
const BOX_VERTICES: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
];

/// The 12 cube edges as line-list index pairs.
pub const BOX_LINE_INDICES: [u32; 24] = [
    0, 1, 1, 3, 3, 2, 2, 0, // back face
    4, 5, 5, 7, 7, 6, 6, 4, // front face
    0, 4, 1, 5, 2, 6, 3, 7, // connecting edges
];

/// Borrowed CPU arrays a mirror is built from.
#[derive(Debug, Clone, Copy)]
pub struct MirrorSource<'a> {
    pub vertices: &'a [Vec3],
    pub triangles: &'a [[u32; 3]],
    pub normals: &'a [Vec3],
    pub colors: &'a [Vec3],
    pub tex_coords: &'a [Vec2],
    pub tangents: &'a [Vec3],
}

/// GPU-side buffer set mirroring one mesh.
///
/// Every handle is either `NONE` or owned exclusively by this mirror.
/// [`GpuMirror::create`] refuses to run over live handles; callers release first.
#[derive(Debug, Default)]
pub struct GpuMirror {
    vertex_array: VertexArrayHandle,
    indices: BufferHandle,
    positions: BufferHandle,
    normals: BufferHandle,
    colors: BufferHandle,
    tex_coords: BufferHandle,
    tangents: BufferHandle,
    box_vertex_array: VertexArrayHandle,
    box_vertices: BufferHandle,
    box_indices: BufferHandle,
    normal_vertex_array: VertexArrayHandle,
    normal_lines: BufferHandle,
    normal_line_vertices: usize,
}

impl GpuMirror {
    /// Whether any handle is live.
    pub fn is_allocated(&self) -> bool {
        self.buffers().iter().any(|b| b.is_allocated())
            || self.vertex_arrays().iter().any(|v| v.is_allocated())
    }

    /// Whether the primary geometry can be drawn.
    pub fn has_geometry(&self) -> bool {
        self.vertex_array.is_allocated() && self.positions.is_allocated() && self.indices.is_allocated()
    }

    pub fn vertex_array(&self) -> VertexArrayHandle {
        self.vertex_array
    }

    pub fn box_vertex_array(&self) -> VertexArrayHandle {
        self.box_vertex_array
    }

    pub fn normal_vertex_array(&self) -> VertexArrayHandle {
        self.normal_vertex_array
    }

    /// Number of vertices in the normal line list (two per mesh vertex).
    pub fn normal_line_vertices(&self) -> usize {
        self.normal_line_vertices
    }

    pub fn normal_buffer(&self) -> BufferHandle {
        self.normals
    }

    pub fn color_buffer(&self) -> BufferHandle {
        self.colors
    }

    pub fn tex_coord_buffer(&self) -> BufferHandle {
        self.tex_coords
    }

    pub fn tangent_buffer(&self) -> BufferHandle {
        self.tangents
    }

    fn buffers(&self) -> [BufferHandle; 9] {
        [
            self.indices,
            self.positions,
            self.normals,
            self.colors,
            self.tex_coords,
            self.tangents,
            self.box_vertices,
            self.box_indices,
            self.normal_lines,
        ]
    }

    fn vertex_arrays(&self) -> [VertexArrayHandle; 3] {
        [
            self.vertex_array,
            self.box_vertex_array,
            self.normal_vertex_array,
        ]
    }

    /// Upload every present attribute plus the bounding-box and normal-line helpers.
    pub fn create(&mut self, ctx: &mut dyn GraphicsContext, src: &MirrorSource<'_>) -> Result<()> {
        if self.is_allocated() {
            return Err(ViewerError::Gpu(
                "GPU mirror already allocated; release it before recreating".into(),
            ));
        }

        let vertex_count = src.vertices.len();
        let present = |len: usize| len > 0 && len == vertex_count;

        self.vertex_array = ctx.create_vertex_array();
        self.indices = create_buffer(ctx, BufferTarget::Index, bytemuck::cast_slice(src.triangles));
        self.positions = create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(src.vertices));
        if present(src.normals.len()) {
            self.normals = create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(src.normals));
        }
        if present(src.colors.len()) {
            self.colors = create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(src.colors));
        }
        if present(src.tex_coords.len()) {
            self.tex_coords =
                create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(src.tex_coords));
        }
        if present(src.tangents.len()) {
            self.tangents = create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(src.tangents));
        }

        // The vertex array captures the index binding and every attribute pointer.
        ctx.bind_vertex_array(self.vertex_array);
        ctx.bind_buffer(BufferTarget::Index, self.indices);
        let attributes = [
            (self.positions, AttribLocation::Position, 3),
            (self.normals, AttribLocation::Normal, 3),
            (self.colors, AttribLocation::Color, 3),
            (self.tex_coords, AttribLocation::TexCoord, 2),
            (self.tangents, AttribLocation::Tangent, 3),
        ];
        for (buffer, location, components) in attributes {
            if buffer.is_allocated() {
                ctx.bind_buffer(BufferTarget::Vertex, buffer);
                ctx.vertex_attrib_pointer(location, components);
                ctx.enable_vertex_attrib(location);
            }
        }
        ctx.bind_vertex_array(VertexArrayHandle::NONE);
        ctx.bind_buffer(BufferTarget::Vertex, BufferHandle::NONE);

        self.create_box_helper(ctx);
        if present(src.normals.len()) {
            self.create_normal_helper(ctx, src.vertices, src.normals);
        }

        debug!(
            vertex_array = self.vertex_array.0,
            vertices = vertex_count,
            triangles = src.triangles.len(),
            "Created GPU mirror"
        );
        Ok(())
    }

    fn create_box_helper(&mut self, ctx: &mut dyn GraphicsContext) {
        self.box_vertex_array = ctx.create_vertex_array();
        self.box_vertices = create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(&BOX_VERTICES));
        self.box_indices = create_buffer(ctx, BufferTarget::Index, bytemuck::cast_slice(&BOX_LINE_INDICES));

        ctx.bind_vertex_array(self.box_vertex_array);
        ctx.bind_buffer(BufferTarget::Vertex, self.box_vertices);
        ctx.vertex_attrib_pointer(AttribLocation::Position, 3);
        ctx.bind_buffer(BufferTarget::Index, self.box_indices);
        ctx.enable_vertex_attrib(AttribLocation::Position);
        ctx.bind_vertex_array(VertexArrayHandle::NONE);
        ctx.bind_buffer(BufferTarget::Vertex, BufferHandle::NONE);
    }

    fn create_normal_helper(&mut self, ctx: &mut dyn GraphicsContext, vertices: &[Vec3], normals: &[Vec3]) {
        let lines: Vec<Vec3> = vertices
            .iter()
            .zip(normals)
            .flat_map(|(&v, &n)| [v, v + NORMAL_LINE_LENGTH * n])
            .collect();

        self.normal_vertex_array = ctx.create_vertex_array();
        self.normal_lines = create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(&lines));
        self.normal_line_vertices = if self.normal_lines.is_allocated() { lines.len() } else { 0 };

        ctx.bind_vertex_array(self.normal_vertex_array);
        ctx.bind_buffer(BufferTarget::Vertex, self.normal_lines);
        ctx.enable_vertex_attrib(AttribLocation::Position);
        ctx.vertex_attrib_pointer(AttribLocation::Position, 3);
        ctx.bind_vertex_array(VertexArrayHandle::NONE);
        ctx.bind_buffer(BufferTarget::Vertex, BufferHandle::NONE);
    }

    /// Overwrite the normal buffer in place. Returns `false` when there is none.
    pub fn update_normals(&mut self, ctx: &mut dyn GraphicsContext, normals: &[Vec3]) -> bool {
        if !self.normals.is_allocated() {
            return false;
        }
        ctx.bind_buffer(BufferTarget::Vertex, self.normals);
        ctx.update_buffer(BufferTarget::Vertex, self.normals, 0, bytemuck::cast_slice(normals));
        ctx.bind_buffer(BufferTarget::Vertex, BufferHandle::NONE);
        true
    }

    /// Delete every live handle and reset to `NONE`. Idempotent.
    pub fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        for vertex_array in self.vertex_arrays() {
            if vertex_array.is_allocated() {
                ctx.delete_vertex_array(vertex_array);
            }
        }
        for buffer in self.buffers() {
            if buffer.is_allocated() {
                ctx.delete_buffer(buffer);
            }
        }
        self.vertex_array = VertexArrayHandle::NONE;
        self.box_vertex_array = VertexArrayHandle::NONE;
        self.normal_vertex_array = VertexArrayHandle::NONE;
        self.indices = BufferHandle::NONE;
        self.positions = BufferHandle::NONE;
        self.normals = BufferHandle::NONE;
        self.colors = BufferHandle::NONE;
        self.tex_coords = BufferHandle::NONE;
        self.tangents = BufferHandle::NONE;
        self.box_vertices = BufferHandle::NONE;
        self.box_indices = BufferHandle::NONE;
        self.normal_lines = BufferHandle::NONE;
        self.normal_line_vertices = 0;
    }
}

impl Drop for GpuMirror {
    fn drop(&mut self) {
        if self.is_allocated() {
            warn!(
                vertex_array = self.vertex_array.0,
                "GPU mirror dropped while allocated; handles leaked"
            );
        }
    }
}

/// Create a buffer and verify the stored size matches the upload.
///
/// On mismatch the partial buffer is deleted and `NONE` returned.
pub fn create_buffer(ctx: &mut dyn GraphicsContext, target: BufferTarget, data: &[u8]) -> BufferHandle {
    let buffer = ctx.create_buffer(target, data);
    if !buffer.is_allocated() {
        warn!(bytes = data.len(), "Buffer creation failed");
        return BufferHandle::NONE;
    }
    let stored = ctx.buffer_size(target, buffer);
    ctx.bind_buffer(target, BufferHandle::NONE);
    if stored != data.len() {
        ctx.delete_buffer(buffer);
        warn!(
            requested = data.len(),
            stored,
            "Buffer size mismatch; discarding buffer"
        );
        return BufferHandle::NONE;
    }
    buffer
}
