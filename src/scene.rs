//! The viewer: scene setup, per-frame drawing and runtime controls.

use std::time::{Duration, Instant};

use glam::{Mat3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::gpu::mirror::create_buffer;
use crate::gpu::{
    AttribLocation, BufferHandle, BufferTarget, ContextGuard, GraphicsContext, Primitive,
    ProgramHandle, TextureHandle, VertexArrayHandle,
};
use crate::render::{ProgramRegistry, RenderState, load_image_into_texture, read_shaders};
use crate::types::{ColoringMode, TriangleMesh};

/// Model instances drawn per grid unit.
pub const INSTANCES_PER_GRID_UNIT: u32 = 5;
/// Instances are scattered uniformly in `[-EXTENT, EXTENT)` on every axis.
pub const INSTANCE_EXTENT: f32 = 10.0;
/// Offset of the bump-mapped sphere from the origin.
pub const BUMP_SPHERE_OFFSET: Vec3 = Vec3::new(0.0, 5.0, 0.0);

const AXIS_LENGTH: f32 = 5.0;

/// Counts for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub triangles: usize,
    pub objects_drawn: usize,
    pub objects_culled: usize,
}

/// Totals over a run, written out as JSON on request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub total_triangles: u64,
    pub total_objects_drawn: u64,
    pub total_objects_culled: u64,
    pub last_frame: FrameStats,
    pub elapsed_secs: f64,
    pub frames_per_second: f64,
}

impl RunSummary {
    pub fn record(&mut self, stats: &FrameStats) {
        self.frames += 1;
        self.total_triangles += stats.triangles as u64;
        self.total_objects_drawn += stats.objects_drawn as u64;
        self.total_objects_culled += stats.objects_culled as u64;
        self.last_frame = *stats;
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed_secs = elapsed.as_secs_f64();
        self.frames_per_second = if self.elapsed_secs > 0.0 {
            self.frames as f64 / self.elapsed_secs
        } else {
            0.0
        };
    }
}

/// First-person camera: position plus a view direction built from two angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    /// Heading in degrees, wrapped to (-360, 360).
    angle_x: f32,
    /// Pitch in degrees, clamped to [-70, 70].
    angle_y: f32,
}

impl Camera {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction: direction.normalize_or(Vec3::NEG_Z),
            angle_x: 0.0,
            angle_y: 0.0,
        }
    }

    /// Move along the camera's right, up and forward axes.
    pub fn translate(&mut self, right: f32, up: f32, forward: f32) {
        let ortho = Vec3::new(-self.direction.z, 0.0, self.direction.x);
        let up_axis = self.direction.cross(ortho).normalize_or_zero();
        self.position += right * ortho + up * up_axis + forward * self.direction;
    }

    /// Turn by `dx` degrees of heading and `dy` degrees of pitch.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.angle_x = (self.angle_x + dx) % 360.0;
        self.angle_y = (self.angle_y + dy).clamp(-70.0, 70.0);
        let (ax, ay) = (self.angle_x.to_radians(), self.angle_y.to_radians());
        self.direction = Vec3::new(ax.sin() * ay.cos(), ay.sin(), -ax.cos() * ay.cos());
    }

    pub fn apply(&self, state: &mut RenderState) {
        state.look_at(self.position, self.position + self.direction, Vec3::Y);
    }
}

/// Three colored lines along +X, +Y and +Z, owned by the viewer.
#[derive(Debug, Default)]
pub struct AxisGizmo {
    vertex_array: VertexArrayHandle,
    positions: BufferHandle,
    colors: BufferHandle,
}

impl AxisGizmo {
    pub fn create(ctx: &mut dyn GraphicsContext) -> Self {
        let positions = [
            Vec3::ZERO,
            Vec3::X * AXIS_LENGTH,
            Vec3::ZERO,
            Vec3::Y * AXIS_LENGTH,
            Vec3::ZERO,
            Vec3::Z * AXIS_LENGTH,
        ];
        let colors = [Vec3::X, Vec3::X, Vec3::Y, Vec3::Y, Vec3::Z, Vec3::Z];

        let gizmo = Self {
            vertex_array: ctx.create_vertex_array(),
            positions: create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(&positions)),
            colors: create_buffer(ctx, BufferTarget::Vertex, bytemuck::cast_slice(&colors)),
        };

        ctx.bind_vertex_array(gizmo.vertex_array);
        for (buffer, location) in [
            (gizmo.positions, AttribLocation::Position),
            (gizmo.colors, AttribLocation::Color),
        ] {
            if buffer.is_allocated() {
                ctx.bind_buffer(BufferTarget::Vertex, buffer);
                ctx.vertex_attrib_pointer(location, 3);
                ctx.enable_vertex_attrib(location);
            }
        }
        ctx.bind_buffer(BufferTarget::Vertex, BufferHandle::NONE);
        ctx.bind_vertex_array(VertexArrayHandle::NONE);
        gizmo
    }

    pub fn is_allocated(&self) -> bool {
        self.vertex_array.is_allocated() || self.positions.is_allocated() || self.colors.is_allocated()
    }

    pub fn draw(&self, state: &RenderState, ctx: &mut dyn GraphicsContext) {
        if !self.vertex_array.is_allocated() || !self.positions.is_allocated() {
            return;
        }
        state.upload_model_view(ctx);
        ctx.bind_vertex_array(self.vertex_array);
        ctx.draw_arrays(Primitive::Lines, 0, 6);
        ctx.bind_vertex_array(VertexArrayHandle::NONE);
    }

    pub fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        if self.vertex_array.is_allocated() {
            ctx.delete_vertex_array(self.vertex_array);
        }
        for buffer in [self.positions, self.colors] {
            if buffer.is_allocated() {
                ctx.delete_buffer(buffer);
            }
        }
        self.vertex_array = VertexArrayHandle::NONE;
        self.positions = BufferHandle::NONE;
        self.colors = BufferHandle::NONE;
    }
}

impl Drop for AxisGizmo {
    fn drop(&mut self) {
        if self.is_allocated() {
            warn!(vertex_array = self.vertex_array.0, "Axis gizmo dropped while allocated");
        }
    }
}

/// Owns every mesh, program and texture of the scene.
pub struct Viewer {
    config: ViewerConfig,
    state: RenderState,
    camera: Camera,
    model: TriangleMesh,
    terrain: TriangleMesh,
    light_sphere: TriangleMesh,
    bump_sphere: TriangleMesh,
    gizmo: AxisGizmo,
    programs: ProgramRegistry,
    current_program: ProgramHandle,
    bump_program: ProgramHandle,
    textures: Vec<TextureHandle>,
    instance_positions: Vec<Vec3>,
    rng: StdRng,
    grid_size: u32,
    light_moves: bool,
    triangles_last_frame: usize,
}

impl Viewer {
    /// Load assets, generate procedural meshes, compile programs and apply
    /// the display settings. Missing assets are logged and leave the
    /// corresponding mesh, texture or program absent.
    pub fn initialize(config: ViewerConfig, ctx: &mut dyn GraphicsContext) -> Result<Self> {
        let mut gl = ContextGuard::acquire(ctx);
        let assets = config.assets.clone();
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let test_texture = load_image_into_texture(&mut *gl, &assets.test_texture, false);
        let diffuse = load_image_into_texture(&mut *gl, &assets.bump_diffuse, true);
        let normal = load_image_into_texture(&mut *gl, &assets.bump_normal, true);
        let displacement = load_image_into_texture(&mut *gl, &assets.bump_displacement, true);
        let textures: Vec<TextureHandle> = [test_texture, diffuse, normal, displacement]
            .into_iter()
            .filter(|t| t.is_allocated())
            .collect();

        let mut light_sphere = TriangleMesh::new();
        light_sphere.load_from_file(&assets.light_sphere, Some(&mut *gl));
        light_sphere.set_static_color(Vec3::new(1.0, 1.0, 0.0));

        let mut model = TriangleMesh::new();
        model.load_from_file(&assets.model, Some(&mut *gl));
        model.set_static_color(Vec3::new(0.0, 1.0, 0.0));
        model.set_texture(test_texture);
        model.set_coloring_mode(ColoringMode::Texture);

        let mut terrain = TriangleMesh::new();
        let t = &config.terrain;
        terrain.generate_terrain(t.width, t.height, t.iterations, &t.params, &mut rng, Some(&mut *gl));
        terrain.set_static_color(Vec3::new(1.0, 1.0, 0.0));
        terrain.set_coloring_mode(ColoringMode::ColorArray);

        let mut bump_sphere = TriangleMesh::new();
        let s = &config.sphere;
        bump_sphere.generate_sphere(s.longitude_divisions, s.latitude_divisions, Some(&mut *gl));
        bump_sphere.set_static_color(Vec3::splat(0.8));
        bump_sphere.set_coloring_mode(ColoringMode::BumpMapping);
        bump_sphere.set_texture(diffuse);
        bump_sphere.set_normal_texture(normal);
        bump_sphere.set_displacement_texture(displacement);

        let gizmo = AxisGizmo::create(&mut *gl);

        let mut state = RenderState::new();
        *state.light_position_mut() = config.light.position;
        let mut programs = ProgramRegistry::new();
        let standard = read_shaders(&mut *gl, &assets.mvp_vertex_shader, &assets.constant_color_shader);
        if programs.add(standard).is_some() {
            state.set_standard_program(standard);
        }
        let lambert = read_shaders(&mut *gl, &assets.mvp_vertex_shader, &assets.lambert_shader);
        programs.add(lambert);
        let bump_program = read_shaders(&mut *gl, &assets.bump_vertex_shader, &assets.bump_fragment_shader);
        info!(programs = programs.len(), textures = textures.len(), "Scene assets loaded");

        let camera = Camera::new(config.camera.position, config.camera.direction);
        let grid_size = config.grid_size;
        let light_moves = config.light.moves;
        drop(gl);

        let mut viewer = Self {
            config,
            state,
            camera,
            model,
            terrain,
            light_sphere,
            bump_sphere,
            gizmo,
            programs,
            current_program: standard,
            bump_program,
            textures,
            instance_positions: Vec::new(),
            rng,
            grid_size,
            light_moves,
            triangles_last_frame: 0,
        };
        if let Err(e) = viewer.apply_display_config(ctx) {
            viewer.release(ctx);
            return Err(e);
        }

        for (name, mesh) in viewer.named_meshes() {
            debug!(mesh = name, "\n{}", mesh.describe());
        }
        Ok(viewer)
    }

    fn apply_display_config(&mut self, ctx: &mut dyn GraphicsContext) -> Result<()> {
        let display = self.config.display;
        if let Some(mode) = display.coloring {
            self.change_coloring_mode(mode);
        }
        self.toggle_bounding_box(display.bounding_boxes);
        self.toggle_normals(display.normals);
        self.toggle_diffuse(display.diffuse);
        self.toggle_normal_mapping(display.normal_mapping);
        self.toggle_displacement_mapping(display.displacement_mapping);

        if display.shader < self.programs.len() {
            self.change_shader(ctx, display.shader);
        } else if display.shader != 0 {
            return Err(ViewerError::Config(format!(
                "Shader index {} requested but only {} programs compiled",
                display.shader,
                self.programs.len()
            )));
        }
        Ok(())
    }

    fn named_meshes(&self) -> [(&'static str, &TriangleMesh); 4] {
        [
            ("model", &self.model),
            ("terrain", &self.terrain),
            ("light", &self.light_sphere),
            ("bump sphere", &self.bump_sphere),
        ]
    }

    // --- accessors -------------------------------------------------------

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn model(&self) -> &TriangleMesh {
        &self.model
    }

    pub fn terrain(&self) -> &TriangleMesh {
        &self.terrain
    }

    pub fn light_sphere(&self) -> &TriangleMesh {
        &self.light_sphere
    }

    pub fn bump_sphere(&self) -> &TriangleMesh {
        &self.bump_sphere
    }

    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    pub fn current_program(&self) -> ProgramHandle {
        self.current_program
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn instance_count(&self) -> usize {
        self.grid_size as usize * INSTANCES_PER_GRID_UNIT as usize
    }

    pub fn instance_positions(&self) -> &[Vec3] {
        &self.instance_positions
    }

    pub fn light_position(&self) -> Vec3 {
        self.state.light_position()
    }

    /// Triangles held by the meshes drawn each frame, one model instance counted.
    pub fn triangle_count(&self) -> usize {
        self.named_meshes().iter().map(|(_, m)| m.triangle_count()).sum()
    }

    // --- frame loop ------------------------------------------------------

    /// New projection for a `width × height` viewport, pushed to every program.
    pub fn resize(&mut self, ctx: &mut dyn GraphicsContext, width: u32, height: u32) {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let camera = self.config.camera;
        self.state.set_perspective(camera.fov_y, aspect, camera.near, camera.far);

        let mut targets: Vec<ProgramHandle> = vec![self.state.standard_program(), self.bump_program];
        targets.extend(self.programs.iter());
        targets.sort_unstable();
        targets.dedup();
        for program in targets.into_iter().filter(|p| p.is_allocated()) {
            self.state.set_current_program(ctx, program);
            self.state.upload_projection(ctx);
        }
        let current = self.current_program;
        self.state.set_current_program(ctx, current);
        debug!(width, height, aspect, "Viewport resized");
    }

    /// Draw one frame, advancing the light by `delta` when it moves.
    pub fn render_frame(&mut self, ctx: &mut dyn GraphicsContext, delta: Duration) -> FrameStats {
        let mut stats = FrameStats::default();
        let count = self.instance_count();
        let state = &mut self.state;

        state.load_identity_model_view();
        self.camera.apply(state);
        state.switch_to_standard_program(ctx);
        self.gizmo.draw(state, ctx);

        if self.light_moves {
            let degrees = self.config.light.speed * delta.as_secs_f32();
            let light = state.light_position_mut();
            *light = Mat3::from_rotation_y(degrees.to_radians()) * *light;
        }

        let light = state.light_position();
        state.push_model_view();
        state.translate(light);
        self.light_sphere.draw(state, ctx);
        state.pop_model_view();

        state.set_current_program(ctx, self.bump_program);
        state.push_model_view();
        state.upload_light(ctx);
        state.translate(BUMP_SPHERE_OFFSET);
        stats.triangles += self.bump_sphere.draw(state, ctx);
        state.pop_model_view();

        state.set_current_program(ctx, self.current_program);
        state.upload_light(ctx);

        while self.instance_positions.len() < count {
            let position = Vec3::new(
                self.rng.random_range(-INSTANCE_EXTENT..INSTANCE_EXTENT),
                self.rng.random_range(-INSTANCE_EXTENT..INSTANCE_EXTENT),
                self.rng.random_range(-INSTANCE_EXTENT..INSTANCE_EXTENT),
            );
            self.instance_positions.push(position);
        }
        for &position in &self.instance_positions[..count] {
            state.push_model_view();
            state.translate(position);
            let drawn = self.model.draw(state, ctx);
            state.pop_model_view();
            if drawn == 0 {
                stats.objects_culled += 1;
            } else {
                stats.objects_drawn += 1;
            }
            stats.triangles += drawn;
        }

        stats.triangles += self.terrain.draw(state, ctx);

        if stats.triangles != self.triangles_last_frame {
            self.triangles_last_frame = stats.triangles;
            info!(triangles = stats.triangles, "Triangle count changed");
        }
        debug!(
            drawn = stats.objects_drawn,
            culled = stats.objects_culled,
            "Frame rendered"
        );
        stats
    }

    // --- controls --------------------------------------------------------

    pub fn set_grid_size(&mut self, grid_size: u32) {
        self.grid_size = grid_size;
    }

    pub fn trigger_light_movement(&mut self, moves: bool) {
        self.light_moves = moves;
    }

    pub fn camera_moves(&mut self, right: f32, up: f32, forward: f32) {
        self.camera.translate(right, up, forward);
    }

    pub fn camera_rotates(&mut self, dx: f32, dy: f32) {
        self.camera.rotate(dx, dy);
    }

    /// Make registered program `index` the shading program.
    ///
    /// # Panics
    ///
    /// When no program was registered at `index`.
    pub fn change_shader(&mut self, ctx: &mut dyn GraphicsContext, index: usize) {
        let mut gl = ContextGuard::acquire(ctx);
        self.current_program = self.programs.select(index);
        self.state.set_current_program(&mut *gl, self.current_program);
    }

    /// Compile and register a program; returns its index.
    pub fn compile_shader(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        vertex_path: &std::path::Path,
        fragment_path: &std::path::Path,
    ) -> Option<usize> {
        let mut gl = ContextGuard::acquire(ctx);
        let program = read_shaders(&mut *gl, vertex_path, fragment_path);
        let index = self.programs.add(program)?;
        self.state.set_current_program(&mut *gl, program);
        self.state.upload_projection(&mut *gl);
        self.state.set_current_program(&mut *gl, self.current_program);
        info!(index, program = program.0, "Shader compiled");
        Some(index)
    }

    pub fn change_coloring_mode(&mut self, mode: ColoringMode) {
        self.model.set_coloring_mode(mode);
        self.terrain.set_coloring_mode(mode);
    }

    pub fn toggle_bounding_box(&mut self, enable: bool) {
        self.model.toggle_bounding_box(enable);
        self.terrain.toggle_bounding_box(enable);
        self.bump_sphere.toggle_bounding_box(enable);
    }

    pub fn toggle_normals(&mut self, enable: bool) {
        self.model.toggle_normals(enable);
        self.terrain.toggle_normals(enable);
        self.bump_sphere.toggle_normals(enable);
    }

    pub fn toggle_diffuse(&mut self, enable: bool) {
        self.bump_sphere.toggle_diffuse(enable);
    }

    pub fn toggle_normal_mapping(&mut self, enable: bool) {
        self.bump_sphere.toggle_normal_mapping(enable);
    }

    pub fn toggle_displacement_mapping(&mut self, enable: bool) {
        self.bump_sphere.toggle_displacement_mapping(enable);
    }

    /// Regenerate the terrain, keeping its coloring mode, color and decorations.
    pub fn recreate_terrain(&mut self, ctx: &mut dyn GraphicsContext) {
        let mut gl = ContextGuard::acquire(ctx);
        let mode = self.terrain.coloring_mode();
        let decorations = *self.terrain.decorations();

        self.terrain.clear(Some(&mut *gl));
        let t = &self.config.terrain;
        self.terrain
            .generate_terrain(t.width, t.height, t.iterations, &t.params, &mut self.rng, Some(&mut *gl));
        self.terrain.set_coloring_mode(mode);
        self.terrain.toggle_bounding_box(decorations.bounding_box);
        self.terrain.toggle_normals(decorations.normals);
        info!(triangles = self.terrain.triangle_count(), "Terrain regenerated");
    }

    /// Delete every GPU resource the viewer owns.
    pub fn release(self, ctx: &mut dyn GraphicsContext) {
        let mut gl = ContextGuard::acquire(ctx);
        let Viewer {
            model,
            terrain,
            light_sphere,
            bump_sphere,
            mut gizmo,
            mut programs,
            bump_program,
            textures,
            ..
        } = self;

        for mesh in [model, terrain, light_sphere, bump_sphere] {
            mesh.destroy(&mut *gl);
        }
        gizmo.release(&mut *gl);
        programs.release(&mut *gl);
        if bump_program.is_allocated() {
            gl.delete_program(bump_program);
        }
        for texture in textures {
            gl.delete_texture(texture);
        }
        debug!("Viewer released");
    }
}

/// Render `config.frames` frames into `ctx` and return the totals.
///
/// Logs frames per second once per elapsed wall-clock second and writes the
/// summary as JSON when `config.stats_output` is set.
pub fn run_headless(config: &ViewerConfig, ctx: &mut dyn GraphicsContext) -> Result<RunSummary> {
    let start = Instant::now();
    info!(
        frames = config.frames,
        grid_size = config.grid_size,
        assets = %config.assets.model.display(),
        "Starting headless run"
    );

    let delta = Duration::try_from_secs_f32(config.frame_time).map_err(|e| {
        ViewerError::Config(format!("Frame time {} s is not a duration: {e}", config.frame_time))
    })?;
    let mut viewer = Viewer::initialize(config.clone(), ctx)?;
    let (width, height) = config.viewport;
    viewer.resize(ctx, width, height);

    let mut summary = RunSummary::default();
    let mut second_start = Instant::now();
    let mut frames_this_second = 0u32;
    for _ in 0..config.frames {
        let stats = viewer.render_frame(ctx, delta);
        summary.record(&stats);
        frames_this_second += 1;
        if second_start.elapsed() >= Duration::from_secs(1) {
            info!(fps = frames_this_second, "Frames per second");
            frames_this_second = 0;
            second_start = Instant::now();
        }
    }
    viewer.release(ctx);
    summary.finish(start.elapsed());

    if let Some(path) = &config.stats_output {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &summary).map_err(std::io::Error::from)?;
        info!(path = %path.display(), "Wrote run summary");
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingContext;
    use approx::assert_relative_eq;

    fn headless_config() -> ViewerConfig {
        let mut config = ViewerConfig {
            seed: Some(3),
            ..ViewerConfig::default()
        };
        config.assets = crate::config::AssetPaths::under(std::path::Path::new("/nonexistent"));
        config.terrain.width = 8;
        config.terrain.height = 8;
        config.sphere.longitude_divisions = 8;
        config.sphere.latitude_divisions = 4;
        config
    }

    #[test]
    fn camera_rotation_clamps_pitch() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z);
        camera.rotate(90.0, 0.0);
        assert_relative_eq!(camera.direction.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(camera.direction.z, 0.0, epsilon = 1e-6);
        camera.rotate(0.0, 500.0);
        assert_relative_eq!(camera.direction.y, 70f32.to_radians().sin(), epsilon = 1e-6);
    }

    #[test]
    fn camera_translates_along_view_axes() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z);
        camera.translate(0.0, 0.0, 2.0);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, -2.0));
        camera.translate(1.0, 0.0, 0.0);
        assert_relative_eq!(camera.position.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn gizmo_create_draw_release() {
        let mut ctx = RecordingContext::new();
        let mut gizmo = AxisGizmo::create(&mut ctx);
        assert!(gizmo.is_allocated());
        assert_eq!(ctx.live_buffers(), 2);
        gizmo.draw(&RenderState::new(), &mut ctx);
        assert_eq!(ctx.draw_calls().count(), 1);
        gizmo.release(&mut ctx);
        assert!(!gizmo.is_allocated());
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
    }

    #[test]
    fn summary_accumulates() {
        let mut summary = RunSummary::default();
        let frame = FrameStats {
            triangles: 10,
            objects_drawn: 2,
            objects_culled: 1,
        };
        summary.record(&frame);
        summary.record(&frame);
        summary.finish(Duration::from_secs(2));
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.total_triangles, 20);
        assert_eq!(summary.total_objects_culled, 2);
        assert_relative_eq!(summary.frames_per_second, 1.0);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["last_frame"]["objects_drawn"], 2);
    }

    #[test]
    fn missing_assets_still_render() {
        let mut ctx = RecordingContext::new();
        let mut viewer = Viewer::initialize(headless_config(), &mut ctx).unwrap();
        assert!(!ctx.is_current());
        assert!(viewer.model().is_empty());
        assert!(!viewer.terrain().is_empty());
        assert!(viewer.programs().is_empty());

        viewer.resize(&mut ctx, 800, 600);
        let stats = viewer.render_frame(&mut ctx, Duration::from_millis(16));
        assert_eq!(stats.objects_drawn + stats.objects_culled, 15);
        assert_eq!(viewer.instance_positions().len(), 15);

        viewer.release(&mut ctx);
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
    }

    #[test]
    fn instances_grow_with_grid_size() {
        let mut ctx = RecordingContext::new();
        let mut viewer = Viewer::initialize(headless_config(), &mut ctx).unwrap();
        viewer.set_grid_size(150);
        let stats = viewer.render_frame(&mut ctx, Duration::ZERO);
        assert_eq!(stats.objects_drawn + stats.objects_culled, 750);
        assert!(
            viewer
                .instance_positions()
                .iter()
                .all(|p| p.abs().max_element() <= INSTANCE_EXTENT)
        );
        viewer.release(&mut ctx);
    }

    #[test]
    fn light_orbits_about_y() {
        let mut ctx = RecordingContext::new();
        let mut viewer = Viewer::initialize(headless_config(), &mut ctx).unwrap();
        viewer.trigger_light_movement(true);
        let before = viewer.light_position();
        viewer.render_frame(&mut ctx, Duration::from_secs(9));
        let after = viewer.light_position();
        // 10 degrees per second for 9 seconds.
        assert_relative_eq!(after.y, before.y, epsilon = 1e-4);
        assert_relative_eq!(after.length(), before.length(), epsilon = 1e-3);
        assert_relative_eq!(after.x, 20.0 * 90f32.to_radians().sin(), epsilon = 1e-3);
        viewer.release(&mut ctx);
    }

    #[test]
    fn recreate_terrain_keeps_mode_and_does_not_leak() {
        let mut ctx = RecordingContext::new();
        let mut viewer = Viewer::initialize(headless_config(), &mut ctx).unwrap();
        viewer.toggle_bounding_box(true);
        let buffers = ctx.live_buffers();

        viewer.recreate_terrain(&mut ctx);
        assert_eq!(ctx.live_buffers(), buffers);
        assert_eq!(viewer.terrain().coloring_mode(), ColoringMode::ColorArray);
        assert!(viewer.terrain().decorations().bounding_box);
        assert!(!ctx.is_current());
        viewer.release(&mut ctx);
    }

    #[test]
    fn unknown_shader_in_config_is_config_error() {
        let mut config = headless_config();
        config.display.shader = 4;
        let mut ctx = RecordingContext::new();
        let err = Viewer::initialize(config, &mut ctx).err().unwrap();
        assert!(err.to_string().starts_with("Config error"));
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
        assert_eq!(ctx.live_textures(), 0);
        assert_eq!(ctx.live_programs(), 0);
        assert!(!ctx.is_current());
    }

    #[test]
    fn headless_run_rejects_unrepresentable_frame_time() {
        let mut config = headless_config();
        config.frame_time = 1e20;
        let mut ctx = RecordingContext::new();
        let err = run_headless(&config, &mut ctx).unwrap_err();
        assert!(err.to_string().starts_with("Config error"));
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn headless_run_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = headless_config();
        config.frames = 4;
        config.stats_output = Some(dir.path().join("stats.json"));
        let mut ctx = RecordingContext::new();
        let summary = run_headless(&config, &mut ctx).unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(ctx.live_buffers(), 0);

        let text = std::fs::read_to_string(dir.path().join("stats.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["frames"], 4);
    }

    #[test]
    #[should_panic(expected = "tried to select shader program 1")]
    fn change_shader_out_of_range_panics() {
        let mut ctx = RecordingContext::new();
        let mut viewer = Viewer::initialize(headless_config(), &mut ctx).unwrap();
        viewer.change_shader(&mut ctx, 1);
    }
}
