use glam::{Mat3, Mat4, Vec3};
use tracing::warn;

use crate::gpu::{GraphicsContext, ProgramHandle, Uniform};

/// Uniform names shared by every shader program.
pub mod uniforms {
    pub const PROJECTION: &str = "projection";
    pub const MODEL_VIEW: &str = "modelView";
    pub const NORMAL_MATRIX: &str = "normalMatrix";
    pub const LIGHT_POSITION: &str = "lightPos";
    pub const USE_TEXTURE: &str = "useTexture";
    pub const TEXTURE: &str = "tex";
    pub const USE_DIFFUSE: &str = "useDiffuse";
    pub const USE_NORMAL: &str = "useNormal";
    pub const USE_DISPLACEMENT: &str = "useDisplacement";
    pub const DIFFUSE_TEXTURE: &str = "diffuseTexture";
    pub const NORMAL_TEXTURE: &str = "normalTexture";
    pub const DISPLACEMENT_TEXTURE: &str = "displacementTexture";
}

/// Per-frame transform and program state handed to every draw.
///
/// The model-view stack always holds at least one matrix; the last entry is
/// the current one.
#[derive(Debug, Clone)]
pub struct RenderState {
    projection: Mat4,
    model_view: Vec<Mat4>,
    current_program: ProgramHandle,
    standard_program: ProgramHandle,
    light_position: Vec3,
}

impl Default for RenderState {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderState {
    pub fn new() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            model_view: vec![Mat4::IDENTITY],
            current_program: ProgramHandle::NONE,
            standard_program: ProgramHandle::NONE,
            light_position: Vec3::ZERO,
        }
    }

    // --- projection ------------------------------------------------------

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Right-handed perspective with OpenGL clip depth; `fov_y` in degrees.
    pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective_rh_gl(fov_y.to_radians(), aspect, near, far);
    }

    // --- model-view stack ------------------------------------------------

    pub fn model_view(&self) -> Mat4 {
        self.model_view.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn model_view_mut(&mut self) -> &mut Mat4 {
        if self.model_view.is_empty() {
            self.model_view.push(Mat4::IDENTITY);
        }
        let top = self.model_view.len() - 1;
        &mut self.model_view[top]
    }

    /// Drop every pushed matrix and reset the base to identity.
    pub fn load_identity_model_view(&mut self) {
        self.model_view.clear();
        self.model_view.push(Mat4::IDENTITY);
    }

    pub fn push_model_view(&mut self) {
        let top = self.model_view();
        self.model_view.push(top);
    }

    pub fn pop_model_view(&mut self) {
        if self.model_view.len() > 1 {
            self.model_view.pop();
        } else {
            warn!("Model-view stack underflow");
        }
    }

    /// Number of matrices on the stack, base included.
    pub fn model_view_depth(&self) -> usize {
        self.model_view.len()
    }

    /// Post-multiply the current matrix.
    pub fn multiply(&mut self, m: Mat4) {
        let top = self.model_view_mut();
        *top *= m;
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.multiply(Mat4::from_translation(offset));
    }

    pub fn scale(&mut self, factors: Vec3) {
        self.multiply(Mat4::from_scale(factors));
    }

    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.multiply(Mat4::look_at_rh(eye, target, up));
    }

    /// Inverse transpose of the upper 3×3 of the current model-view.
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.model_view()).inverse().transpose()
    }

    // --- programs --------------------------------------------------------

    pub fn current_program(&self) -> ProgramHandle {
        self.current_program
    }

    pub fn standard_program(&self) -> ProgramHandle {
        self.standard_program
    }

    /// The constant-color program used for helper geometry.
    pub fn set_standard_program(&mut self, program: ProgramHandle) {
        self.standard_program = program;
    }

    pub fn set_current_program(&mut self, ctx: &mut dyn GraphicsContext, program: ProgramHandle) {
        self.current_program = program;
        ctx.use_program(program);
    }

    pub fn switch_to_standard_program(&mut self, ctx: &mut dyn GraphicsContext) {
        let program = self.standard_program;
        self.set_current_program(ctx, program);
    }

    // --- light -----------------------------------------------------------

    pub fn light_position(&self) -> Vec3 {
        self.light_position
    }

    pub fn light_position_mut(&mut self) -> &mut Vec3 {
        &mut self.light_position
    }

    // --- uniform uploads -------------------------------------------------

    pub fn upload_projection(&self, ctx: &mut dyn GraphicsContext) {
        ctx.set_uniform(self.current_program, uniforms::PROJECTION, Uniform::Mat4(self.projection));
    }

    pub fn upload_model_view(&self, ctx: &mut dyn GraphicsContext) {
        ctx.set_uniform(self.current_program, uniforms::MODEL_VIEW, Uniform::Mat4(self.model_view()));
    }

    pub fn upload_normal_matrix(&self, ctx: &mut dyn GraphicsContext) {
        ctx.set_uniform(
            self.current_program,
            uniforms::NORMAL_MATRIX,
            Uniform::Mat3(self.normal_matrix()),
        );
    }

    /// Light position transformed into view space by the current model-view.
    pub fn upload_light(&self, ctx: &mut dyn GraphicsContext) {
        let view_space = self.model_view().transform_point3(self.light_position);
        ctx.set_uniform(self.current_program, uniforms::LIGHT_POSITION, Uniform::Vec3(view_space));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingContext;
    use crate::gpu::recording::GlCall;
    use approx::assert_relative_eq;

    #[test]
    fn push_pop_restores_matrix() {
        let mut state = RenderState::new();
        state.translate(Vec3::X);
        let before = state.model_view();
        state.push_model_view();
        state.scale(Vec3::splat(2.0));
        assert_ne!(state.model_view(), before);
        state.pop_model_view();
        assert_eq!(state.model_view(), before);
        assert_eq!(state.model_view_depth(), 1);
    }

    #[test]
    fn pop_never_empties_stack() {
        let mut state = RenderState::new();
        state.pop_model_view();
        state.pop_model_view();
        assert_eq!(state.model_view_depth(), 1);
        assert_eq!(state.model_view(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_post_multiplies() {
        let mut state = RenderState::new();
        state.translate(Vec3::new(1.0, 2.0, 3.0));
        state.scale(Vec3::splat(2.0));
        let p = state.model_view().transform_point3(Vec3::ONE);
        assert_eq!(p, Vec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let mut state = RenderState::new();
        state.scale(Vec3::new(2.0, 1.0, 1.0));
        let n = state.normal_matrix() * Vec3::X;
        assert_relative_eq!(n.x, 0.5);
        assert_relative_eq!(n.y, 0.0);
    }

    #[test]
    fn switching_programs_issues_use() {
        let mut ctx = RecordingContext::new();
        let mut state = RenderState::new();
        state.set_standard_program(ProgramHandle(4));
        state.set_current_program(&mut ctx, ProgramHandle(9));
        state.switch_to_standard_program(&mut ctx);
        assert_eq!(state.current_program(), ProgramHandle(4));
        assert_eq!(
            ctx.calls(),
            &[GlCall::UseProgram(ProgramHandle(9)), GlCall::UseProgram(ProgramHandle(4))]
        );
    }

    #[test]
    fn light_uploaded_in_view_space() {
        let mut ctx = RecordingContext::new();
        let mut state = RenderState::new();
        *state.light_position_mut() = Vec3::new(0.0, 5.0, 20.0);
        state.translate(Vec3::new(0.0, 0.0, -20.0));
        state.upload_light(&mut ctx);
        let (_, name, value) = ctx.uniforms().next().unwrap();
        assert_eq!(name, uniforms::LIGHT_POSITION);
        assert_eq!(*value, Uniform::Vec3(Vec3::new(0.0, 5.0, 0.0)));
    }
}
