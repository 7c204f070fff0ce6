use std::collections::{HashMap, HashSet};

use glam::Vec3;
use tracing::trace;

use super::{
    AttribLocation, BufferHandle, BufferTarget, GraphicsContext, Primitive, ProgramHandle,
    TextureHandle, Uniform, VertexArrayHandle,
};

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    MakeCurrent,
    DoneCurrent,
    CreateBuffer { buffer: BufferHandle, target: BufferTarget, bytes: usize },
    UpdateBuffer { buffer: BufferHandle, offset: usize, bytes: usize },
    BindBuffer { target: BufferTarget, buffer: BufferHandle },
    DeleteBuffer(BufferHandle),
    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(VertexArrayHandle),
    DeleteVertexArray(VertexArrayHandle),
    AttribPointer { location: AttribLocation, components: u8 },
    EnableAttrib(AttribLocation),
    DisableAttrib(AttribLocation),
    AttribConstant { location: AttribLocation, value: Vec3 },
    CompileProgram(ProgramHandle),
    UseProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    SetUniform { program: ProgramHandle, name: String, value: Uniform },
    CreateTexture { texture: TextureHandle, width: u32, height: u32 },
    BindTexture { unit: u32, texture: TextureHandle },
    DeleteTexture(TextureHandle),
    DrawElements { mode: Primitive, count: usize },
    DrawArrays { mode: Primitive, first: usize, count: usize },
}

/// Headless [`GraphicsContext`].
///
/// Hands out increasing non-zero handles, keeps byte contents of every live
/// buffer so uploads can be inspected, and logs each call in order. The call
/// log grows with every call; long runs use [`RecordingContext::without_call_log`].
#[derive(Debug, Default)]
pub struct RecordingContext {
    next_id: u32,
    current_depth: usize,
    upload_limit: Option<usize>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    vertex_arrays: HashSet<VertexArrayHandle>,
    textures: HashSet<TextureHandle>,
    programs: HashSet<ProgramHandle>,
    log_calls: bool,
    calls: Vec<GlCall>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self {
            log_calls: true,
            ..Self::default()
        }
    }

    /// Resource accounting only; no call is kept.
    pub fn without_call_log() -> Self {
        Self::default()
    }

    pub fn logs_calls(&self) -> bool {
        self.log_calls
    }

    /// Silently truncate every buffer upload to `bytes`, the way a driver
    /// running out of memory would.
    pub fn with_upload_limit(bytes: usize) -> Self {
        Self {
            upload_limit: Some(bytes),
            ..Self::new()
        }
    }

    fn next_handle(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, call: GlCall) {
        if !self.log_calls {
            return;
        }
        trace!(?call, "gl");
        self.calls.push(call);
    }

    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn is_current(&self) -> bool {
        self.current_depth > 0
    }

    pub fn current_depth(&self) -> usize {
        self.current_depth
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Uniform writes recorded so far, in order.
    pub fn uniforms(&self) -> impl Iterator<Item = (ProgramHandle, &str, &Uniform)> {
        self.calls.iter().filter_map(|c| match c {
            GlCall::SetUniform {
                program,
                name,
                value,
            } => Some((*program, name.as_str(), value)),
            _ => None,
        })
    }

    /// Bytes currently stored in `buffer`, if it is alive.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Indexed and array draws recorded so far.
    pub fn draw_calls(&self) -> impl Iterator<Item = &GlCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, GlCall::DrawElements { .. } | GlCall::DrawArrays { .. }))
    }
}

impl GraphicsContext for RecordingContext {
    fn make_current(&mut self) {
        self.current_depth += 1;
        self.record(GlCall::MakeCurrent);
    }

    fn done_current(&mut self) {
        self.current_depth = self.current_depth.saturating_sub(1);
        self.record(GlCall::DoneCurrent);
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferHandle {
        let buffer = BufferHandle(self.next_handle());
        let stored = match self.upload_limit {
            Some(limit) if data.len() > limit => &data[..limit],
            _ => data,
        };
        self.buffers.insert(buffer, stored.to_vec());
        self.record(GlCall::CreateBuffer {
            buffer,
            target,
            bytes: data.len(),
        });
        buffer
    }

    fn buffer_size(&mut self, _target: BufferTarget, buffer: BufferHandle) -> usize {
        self.buffers.get(&buffer).map_or(0, Vec::len)
    }

    fn update_buffer(&mut self, _target: BufferTarget, buffer: BufferHandle, offset: usize, data: &[u8]) {
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            let end = (offset + data.len()).min(contents.len());
            if offset < end {
                contents[offset..end].copy_from_slice(&data[..end - offset]);
            }
        }
        self.record(GlCall::UpdateBuffer {
            buffer,
            offset,
            bytes: data.len(),
        });
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle) {
        self.record(GlCall::BindBuffer { target, buffer });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.record(GlCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&mut self) -> VertexArrayHandle {
        let vertex_array = VertexArrayHandle(self.next_handle());
        self.vertex_arrays.insert(vertex_array);
        self.record(GlCall::CreateVertexArray(vertex_array));
        vertex_array
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.record(GlCall::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array);
        self.record(GlCall::DeleteVertexArray(vertex_array));
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, components: u8) {
        self.record(GlCall::AttribPointer {
            location,
            components,
        });
    }

    fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        self.record(GlCall::EnableAttrib(location));
    }

    fn disable_vertex_attrib(&mut self, location: AttribLocation) {
        self.record(GlCall::DisableAttrib(location));
    }

    fn vertex_attrib_constant(&mut self, location: AttribLocation, value: Vec3) {
        self.record(GlCall::AttribConstant { location, value });
    }

    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramHandle {
        if vertex_source.trim().is_empty() || fragment_source.trim().is_empty() {
            self.record(GlCall::CompileProgram(ProgramHandle::NONE));
            return ProgramHandle::NONE;
        }
        let program = ProgramHandle(self.next_handle());
        self.programs.insert(program);
        self.record(GlCall::CompileProgram(program));
        program
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.record(GlCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.record(GlCall::DeleteProgram(program));
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: Uniform) {
        if !self.log_calls {
            return;
        }
        self.record(GlCall::SetUniform {
            program,
            name: name.to_owned(),
            value,
        });
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureHandle {
        if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
            return TextureHandle::NONE;
        }
        let texture = TextureHandle(self.next_handle());
        self.textures.insert(texture);
        self.record(GlCall::CreateTexture {
            texture,
            width,
            height,
        });
        texture
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.record(GlCall::BindTexture { unit, texture });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.record(GlCall::DeleteTexture(texture));
    }

    fn draw_elements(&mut self, mode: Primitive, count: usize) {
        self.record(GlCall::DrawElements { mode, count });
    }

    fn draw_arrays(&mut self, mode: Primitive, first: usize, count: usize) {
        self.record(GlCall::DrawArrays { mode, first, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_nonzero_and_unique() {
        let mut ctx = RecordingContext::new();
        let a = ctx.create_buffer(BufferTarget::Vertex, &[0; 12]);
        let b = ctx.create_buffer(BufferTarget::Index, &[0; 12]);
        let vao = ctx.create_vertex_array();
        assert!(a.is_allocated() && b.is_allocated() && vao.is_allocated());
        assert_ne!(a, b);
        assert_eq!(ctx.live_buffers(), 2);
        assert_eq!(ctx.live_vertex_arrays(), 1);
    }

    #[test]
    fn upload_limit_truncates_stored_size() {
        let mut ctx = RecordingContext::with_upload_limit(8);
        let buf = ctx.create_buffer(BufferTarget::Vertex, &[1; 12]);
        assert_eq!(ctx.buffer_size(BufferTarget::Vertex, buf), 8);

        let small = ctx.create_buffer(BufferTarget::Vertex, &[1; 4]);
        assert_eq!(ctx.buffer_size(BufferTarget::Vertex, small), 4);
    }

    #[test]
    fn accounting_without_call_log() {
        let mut ctx = RecordingContext::without_call_log();
        assert!(!ctx.logs_calls());
        let buf = ctx.create_buffer(BufferTarget::Vertex, &[1; 12]);
        let vao = ctx.create_vertex_array();
        for _ in 0..1000 {
            ctx.bind_vertex_array(vao);
            ctx.set_uniform(ProgramHandle(1), "modelView", Uniform::Bool(true));
            ctx.draw_elements(Primitive::Triangles, 3);
        }
        assert!(ctx.calls().is_empty());
        assert_eq!(ctx.live_buffers(), 1);
        assert_eq!(ctx.buffer_contents(buf), Some(&[1; 12][..]));

        ctx.delete_buffer(buf);
        ctx.delete_vertex_array(vao);
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
    }

    #[test]
    fn update_buffer_overwrites_in_place() {
        let mut ctx = RecordingContext::new();
        let buf = ctx.create_buffer(BufferTarget::Vertex, &[0, 0, 0, 0]);
        ctx.update_buffer(BufferTarget::Vertex, buf, 1, &[9, 9]);
        assert_eq!(ctx.buffer_contents(buf), Some(&[0, 9, 9, 0][..]));
    }

    #[test]
    fn delete_releases_accounting() {
        let mut ctx = RecordingContext::new();
        let buf = ctx.create_buffer(BufferTarget::Vertex, &[0; 4]);
        let tex = ctx.create_texture(1, 1, &[255; 4]);
        ctx.delete_buffer(buf);
        ctx.delete_texture(tex);
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_textures(), 0);
        assert!(ctx.buffer_contents(buf).is_none());
    }

    #[test]
    fn compile_rejects_empty_sources() {
        let mut ctx = RecordingContext::new();
        assert_eq!(ctx.compile_program("", "void main() {}"), ProgramHandle::NONE);
        let program = ctx.compile_program("void main() {}", "void main() {}");
        assert!(program.is_allocated());
        assert_eq!(ctx.live_programs(), 1);
        ctx.delete_program(program);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn texture_rejects_mismatched_pixels() {
        let mut ctx = RecordingContext::new();
        assert_eq!(ctx.create_texture(2, 2, &[0; 4]), TextureHandle::NONE);
        assert_eq!(ctx.create_texture(0, 0, &[]), TextureHandle::NONE);
    }
}
