use glam::Vec3;

use super::culling;
use super::state::{RenderState, uniforms};
use crate::gpu::{AttribLocation, GraphicsContext, Primitive, Uniform};
use crate::gpu::mirror::BOX_LINE_INDICES;
use crate::types::{ColoringMode, TriangleMesh};

/// Texture units used by the bump-mapping program.
pub const DIFFUSE_UNIT: u32 = 0;
pub const NORMAL_UNIT: u32 = 1;
pub const DISPLACEMENT_UNIT: u32 = 3;

/// Color of the bounding-box and normal-line overlays.
const DECORATION_COLOR: Vec3 = Vec3::ONE;

/// Shading actually applied to a draw, after fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    Texture,
    ColorArray,
    StaticColor,
    Bump,
}

impl Shading {
    /// Candidates for `mode`, most preferred first. The last entry is always usable.
    pub fn fallback_chain(mode: ColoringMode) -> &'static [Shading] {
        match mode {
            ColoringMode::Texture => &[Shading::Texture, Shading::ColorArray, Shading::StaticColor],
            ColoringMode::ColorArray => &[Shading::ColorArray, Shading::StaticColor],
            ColoringMode::StaticColor => &[Shading::StaticColor],
            ColoringMode::BumpMapping => &[Shading::Bump],
        }
    }

    fn is_available(self, mesh: &TriangleMesh) -> bool {
        match self {
            Shading::Texture => mesh.textures().diffuse.is_allocated(),
            Shading::ColorArray => mesh.gpu().color_buffer().is_allocated(),
            Shading::StaticColor | Shading::Bump => true,
        }
    }
}

/// First usable shading in the mesh's fallback chain.
pub fn resolve_shading(mesh: &TriangleMesh) -> Shading {
    Shading::fallback_chain(mesh.coloring_mode())
        .iter()
        .copied()
        .find(|s| s.is_available(mesh))
        .unwrap_or(Shading::StaticColor)
}

impl TriangleMesh {
    /// Draw under the current model-view; returns the triangles drawn.
    ///
    /// Returns 0 without touching the context when the bounding box is
    /// outside the view frustum, and 0 when nothing is uploaded. A stale
    /// mirror is rebuilt first. Decorations are drawn with the standard
    /// program; the previously active program is restored afterwards.
    pub fn draw(&mut self, state: &mut RenderState, ctx: &mut dyn GraphicsContext) -> usize {
        if !culling::is_visible(self.bounds(), &state.projection(), &state.model_view()) {
            return 0;
        }
        self.sync_gpu(ctx);
        if !self.gpu().has_geometry() {
            return 0;
        }

        if self.decorations().any() {
            let former = state.current_program();
            state.switch_to_standard_program(ctx);
            if self.decorations().bounding_box {
                self.draw_bounding_box(state, ctx);
            }
            if self.decorations().normals {
                self.draw_normals(state, ctx);
            }
            state.set_current_program(ctx, former);
        }

        self.draw_primary(state, ctx);
        self.triangle_count()
    }

    fn draw_primary(&self, state: &RenderState, ctx: &mut dyn GraphicsContext) {
        let program = state.current_program();
        ctx.bind_vertex_array(self.gpu().vertex_array());
        state.upload_model_view(ctx);
        state.upload_normal_matrix(ctx);

        match resolve_shading(self) {
            Shading::Texture => {
                ctx.set_uniform(program, uniforms::USE_TEXTURE, Uniform::Bool(true));
                ctx.disable_vertex_attrib(AttribLocation::Color);
                ctx.bind_texture(DIFFUSE_UNIT, self.textures().diffuse);
                ctx.set_uniform(program, uniforms::TEXTURE, Uniform::Int(DIFFUSE_UNIT as i32));
            }
            Shading::ColorArray => {
                ctx.set_uniform(program, uniforms::USE_TEXTURE, Uniform::Bool(false));
                ctx.enable_vertex_attrib(AttribLocation::Color);
            }
            Shading::StaticColor => {
                ctx.set_uniform(program, uniforms::USE_TEXTURE, Uniform::Bool(false));
                ctx.disable_vertex_attrib(AttribLocation::Color);
                ctx.vertex_attrib_constant(AttribLocation::Color, self.static_color());
            }
            Shading::Bump => self.bind_bump_inputs(state, ctx),
        }

        ctx.draw_elements(Primitive::Triangles, 3 * self.triangle_count());
    }

    fn bind_bump_inputs(&self, state: &RenderState, ctx: &mut dyn GraphicsContext) {
        let program = state.current_program();
        let toggles = self.bump_toggles();
        let textures = self.textures();

        ctx.disable_vertex_attrib(AttribLocation::Color);
        ctx.vertex_attrib_constant(AttribLocation::Color, self.static_color());

        ctx.set_uniform(program, uniforms::USE_DIFFUSE, Uniform::Bool(toggles.diffuse));
        ctx.set_uniform(program, uniforms::USE_NORMAL, Uniform::Bool(toggles.normal_mapping));
        ctx.set_uniform(
            program,
            uniforms::USE_DISPLACEMENT,
            Uniform::Bool(toggles.displacement_mapping),
        );

        let bindings = [
            (uniforms::DIFFUSE_TEXTURE, DIFFUSE_UNIT, textures.diffuse),
            (uniforms::NORMAL_TEXTURE, NORMAL_UNIT, textures.normal),
            (uniforms::DISPLACEMENT_TEXTURE, DISPLACEMENT_UNIT, textures.displacement),
        ];
        for (name, unit, texture) in bindings {
            ctx.set_uniform(program, name, Uniform::Int(unit as i32));
            ctx.bind_texture(unit, texture);
        }
    }

    fn draw_bounding_box(&self, state: &mut RenderState, ctx: &mut dyn GraphicsContext) {
        ctx.bind_vertex_array(self.gpu().box_vertex_array());
        state.push_model_view();
        state.translate(self.bounds().mid());
        state.scale(self.bounds().size());
        state.upload_model_view(ctx);
        ctx.vertex_attrib_constant(AttribLocation::Color, DECORATION_COLOR);
        ctx.draw_elements(Primitive::Lines, BOX_LINE_INDICES.len());
        state.pop_model_view();
    }

    fn draw_normals(&self, state: &RenderState, ctx: &mut dyn GraphicsContext) {
        if !self.gpu().normal_vertex_array().is_allocated() {
            return;
        }
        ctx.bind_vertex_array(self.gpu().normal_vertex_array());
        state.upload_model_view(ctx);
        ctx.vertex_attrib_constant(AttribLocation::Color, DECORATION_COLOR);
        ctx.draw_arrays(Primitive::Lines, 0, self.gpu().normal_line_vertices());
    }
}
