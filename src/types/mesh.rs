use std::fmt::{self, Write as _};

use glam::{Vec2, Vec3};
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, ViewerError};
use crate::geometry::{self, DiamondSquareParams};
use crate::gpu::mirror::MirrorSource;
use crate::gpu::{GpuMirror, GraphicsContext, TextureHandle};
use crate::types::BoundingBox;

/// Per-mesh shading strategy selected at draw time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColoringMode {
    #[default]
    StaticColor,
    ColorArray,
    Texture,
    BumpMapping,
}

impl fmt::Display for ColoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColoringMode::StaticColor => write!(f, "static color"),
            ColoringMode::ColorArray => write!(f, "color array"),
            ColoringMode::Texture => write!(f, "texture"),
            ColoringMode::BumpMapping => write!(f, "bump mapping"),
        }
    }
}

/// Auxiliary overlays drawn with the constant-color program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decorations {
    pub bounding_box: bool,
    pub normals: bool,
}

impl Decorations {
    pub fn any(&self) -> bool {
        self.bounding_box || self.normals
    }
}

/// Switches forwarded to the bump-mapping shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BumpToggles {
    pub diffuse: bool,
    pub normal_mapping: bool,
    pub displacement_mapping: bool,
}

impl Default for BumpToggles {
    fn default() -> Self {
        Self {
            diffuse: true,
            normal_mapping: true,
            displacement_mapping: true,
        }
    }
}

/// Externally owned textures a mesh samples from. Never deleted by the mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshTextures {
    pub diffuse: TextureHandle,
    pub normal: TextureHandle,
    pub displacement: TextureHandle,
}

/// Raw CPU-side arrays of a triangle mesh.
///
/// Attribute arrays are either empty or exactly one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub tangents: Vec<Vec3>,
}

impl MeshGeometry {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Check index bounds and attribute lengths.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        if let Some(tri) = self.triangles.iter().find(|t| t.iter().any(|&i| i as usize >= n)) {
            return Err(ViewerError::Input(format!(
                "triangle {tri:?} references a vertex outside 0..{n}"
            )));
        }
        let attributes = [
            ("normals", self.normals.len()),
            ("colors", self.colors.len()),
            ("tex_coords", self.tex_coords.len()),
            ("tangents", self.tangents.len()),
        ];
        for (name, len) in attributes {
            if len != 0 && len != n {
                return Err(ViewerError::Input(format!(
                    "{name} has {len} entries for {n} vertices"
                )));
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
        self.normals.clear();
        self.colors.clear();
        self.tex_coords.clear();
        self.tangents.clear();
    }

    pub(crate) fn mirror_source(&self) -> MirrorSource<'_> {
        MirrorSource {
            vertices: &self.vertices,
            triangles: &self.triangles,
            normals: &self.normals,
            colors: &self.colors,
            tex_coords: &self.tex_coords,
            tangents: &self.tangents,
        }
    }
}

/// A triangle mesh: geometry, derived bounds, draw state and its GPU mirror.
///
/// Operations that change data take `gpu: Option<&mut dyn GraphicsContext>`.
/// With a context the mirror is rebuilt (or released) immediately; without
/// one an existing mirror is marked stale and rebuilt on the next draw.
#[derive(Debug)]
pub struct TriangleMesh {
    geometry: MeshGeometry,
    bounds: BoundingBox,
    coloring: ColoringMode,
    static_color: Vec3,
    textures: MeshTextures,
    decorations: Decorations,
    bump: BumpToggles,
    gpu: GpuMirror,
    gpu_stale: bool,
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self {
            geometry: MeshGeometry::default(),
            bounds: BoundingBox::EMPTY,
            coloring: ColoringMode::StaticColor,
            static_color: Vec3::ONE,
            textures: MeshTextures::default(),
            decorations: Decorations::default(),
            bump: BumpToggles::default(),
            gpu: GpuMirror::default(),
            gpu_stale: false,
        }
    }

    // --- accessors -------------------------------------------------------

    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.geometry.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.geometry.triangles
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.geometry.normals
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.geometry.colors
    }

    pub fn tex_coords(&self) -> &[Vec2] {
        &self.geometry.tex_coords
    }

    pub fn tangents(&self) -> &[Vec3] {
        &self.geometry.tangents
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.geometry.triangle_count()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn gpu(&self) -> &GpuMirror {
        &self.gpu
    }

    /// Whether the GPU mirror no longer matches the CPU arrays.
    pub fn is_gpu_stale(&self) -> bool {
        self.gpu_stale
    }

    pub fn coloring_mode(&self) -> ColoringMode {
        self.coloring
    }

    pub fn set_coloring_mode(&mut self, mode: ColoringMode) {
        self.coloring = mode;
    }

    pub fn static_color(&self) -> Vec3 {
        self.static_color
    }

    pub fn set_static_color(&mut self, color: Vec3) {
        self.static_color = color;
    }

    pub fn textures(&self) -> &MeshTextures {
        &self.textures
    }

    pub fn set_texture(&mut self, texture: TextureHandle) {
        self.textures.diffuse = texture;
    }

    pub fn set_normal_texture(&mut self, texture: TextureHandle) {
        self.textures.normal = texture;
    }

    pub fn set_displacement_texture(&mut self, texture: TextureHandle) {
        self.textures.displacement = texture;
    }

    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }

    pub fn toggle_bounding_box(&mut self, enable: bool) {
        self.decorations.bounding_box = enable;
    }

    pub fn toggle_normals(&mut self, enable: bool) {
        self.decorations.normals = enable;
    }

    pub fn bump_toggles(&self) -> &BumpToggles {
        &self.bump
    }

    pub fn toggle_diffuse(&mut self, enable: bool) {
        self.bump.diffuse = enable;
    }

    pub fn toggle_normal_mapping(&mut self, enable: bool) {
        self.bump.normal_mapping = enable;
    }

    pub fn toggle_displacement_mapping(&mut self, enable: bool) {
        self.bump.displacement_mapping = enable;
    }

    // --- lifecycle -------------------------------------------------------

    /// Empty every array, reset bounds and draw state, release the mirror. Idempotent.
    pub fn clear(&mut self, gpu: Option<&mut dyn GraphicsContext>) {
        self.reset_cpu();
        match gpu {
            Some(ctx) => {
                self.gpu.release(ctx);
                self.gpu_stale = false;
            }
            None => self.invalidate_gpu(),
        }
    }

    fn reset_cpu(&mut self) {
        self.geometry.clear();
        self.bounds = BoundingBox::EMPTY;
        self.coloring = ColoringMode::StaticColor;
        self.decorations = Decorations::default();
        self.textures = MeshTextures::default();
    }

    /// Replace all arrays at once. Bounds are computed unless given.
    pub fn set_geometry(
        &mut self,
        geometry: MeshGeometry,
        bounds: Option<BoundingBox>,
        gpu: Option<&mut dyn GraphicsContext>,
    ) -> Result<()> {
        geometry.validate()?;
        self.bounds = bounds.unwrap_or_else(|| geometry::bounding_box(&geometry.vertices));
        self.geometry = geometry;
        self.refresh_gpu(gpu);
        Ok(())
    }

    /// Release GPU resources, then the CPU arrays.
    pub fn destroy(mut self, ctx: &mut dyn GraphicsContext) {
        self.gpu.release(ctx);
        self.gpu_stale = false;
    }

    // --- derived attributes ----------------------------------------------

    /// Overwrite normals with area-weighted vertex normals.
    pub fn calculate_normals_by_area(&mut self) {
        self.geometry.normals =
            geometry::area_weighted_normals(&self.geometry.vertices, &self.geometry.triangles);
    }

    /// Overwrite texture coordinates with a central projection around the box midpoint.
    pub fn calculate_tex_coords_sphere_mapping(&mut self) {
        self.geometry.tex_coords =
            geometry::sphere_map_tex_coords(&self.geometry.vertices, self.bounds.mid());
    }

    /// Recompute the bounding box from vertex positions.
    pub fn calculate_bb(&mut self) {
        self.bounds = geometry::bounding_box(&self.geometry.vertices);
    }

    // --- transforms ------------------------------------------------------

    /// Shift every vertex so the box midpoint lands on `new_mid`. Size is unchanged.
    pub fn translate_to_center(&mut self, new_mid: Vec3, gpu: Option<&mut dyn GraphicsContext>) {
        if self.is_empty() {
            debug!("translate_to_center on empty mesh ignored");
            return;
        }
        let offset = new_mid - self.bounds.mid();
        for v in &mut self.geometry.vertices {
            *v += offset;
        }
        self.bounds = self.bounds.translated(offset);
        self.refresh_gpu(gpu);
    }

    /// Uniformly scale so the largest box edge becomes `new_length`.
    ///
    /// A zero-size box cannot be scaled; the mesh is left untouched.
    pub fn scale_to_length(&mut self, new_length: f32, gpu: Option<&mut dyn GraphicsContext>) {
        let length = self.bounds.max_extent();
        if self.is_empty() || length <= 0.0 {
            warn!(length, "Cannot scale a mesh with zero extent; skipping");
            return;
        }
        let scale = new_length / length;
        for v in &mut self.geometry.vertices {
            *v *= scale;
        }
        self.bounds = self.bounds.scaled(scale);
        self.refresh_gpu(gpu);
    }

    /// Negate every normal.
    ///
    /// With a context only the normal buffer is rewritten in place; the rest of
    /// the mirror is left as is.
    pub fn flip_normals(&mut self, gpu: Option<&mut dyn GraphicsContext>) {
        for n in &mut self.geometry.normals {
            *n = -*n;
        }
        match gpu {
            Some(ctx) if !self.gpu_stale => {
                self.gpu.update_normals(ctx, &self.geometry.normals);
            }
            Some(_) => {}
            None => self.invalidate_gpu(),
        }
    }

    // --- generators ------------------------------------------------------

    /// Replace the mesh with a unit UV sphere.
    pub fn generate_sphere(
        &mut self,
        longitude_divisions: u32,
        latitude_divisions: u32,
        gpu: Option<&mut dyn GraphicsContext>,
    ) {
        // The mirror is released by the rebuild below.
        self.reset_cpu();
        let sphere = geometry::uv_sphere(longitude_divisions, latitude_divisions);
        self.geometry = MeshGeometry {
            vertices: sphere.vertices,
            triangles: sphere.triangles,
            normals: sphere.normals,
            colors: Vec::new(),
            tex_coords: sphere.tex_coords,
            tangents: sphere.tangents,
        };
        self.bounds = sphere.bounds;
        self.refresh_gpu(gpu);
    }

    /// Replace the mesh with diamond-square terrain on a `width × height` grid.
    ///
    /// `iterations` is accepted for callers that pass one; the refinement depth
    /// is fixed by the grid size.
    pub fn generate_terrain<R: Rng + ?Sized>(
        &mut self,
        width: u32,
        height: u32,
        iterations: u32,
        params: &DiamondSquareParams,
        rng: &mut R,
        gpu: Option<&mut dyn GraphicsContext>,
    ) {
        self.reset_cpu();
        debug!(width, height, iterations, "Generating diamond-square terrain");
        let map = geometry::diamond_square(width, height, params, rng);
        let terrain = geometry::build_terrain(&map);
        self.geometry = MeshGeometry {
            vertices: terrain.vertices,
            triangles: terrain.triangles,
            normals: terrain.normals,
            colors: terrain.colors,
            tex_coords: Vec::new(),
            tangents: Vec::new(),
        };
        self.bounds = terrain.bounds;
        self.refresh_gpu(gpu);
    }

    // --- GPU mirror ------------------------------------------------------

    /// Create the GPU mirror. Fails if one is already allocated.
    pub fn upload(&mut self, ctx: &mut dyn GraphicsContext) -> Result<()> {
        self.gpu.create(ctx, &self.geometry.mirror_source())?;
        self.gpu_stale = false;
        Ok(())
    }

    /// Tear down and recreate the whole mirror.
    pub fn rebuild_gpu(&mut self, ctx: &mut dyn GraphicsContext) {
        self.gpu.release(ctx);
        self.gpu_stale = false;
        if self.is_empty() {
            return;
        }
        if let Err(e) = self.upload(ctx) {
            warn!(%e, "GPU mirror rebuild failed");
        }
    }

    /// Rebuild a stale mirror; no-op otherwise.
    pub fn sync_gpu(&mut self, ctx: &mut dyn GraphicsContext) {
        if self.gpu_stale {
            self.rebuild_gpu(ctx);
        }
    }

    /// Delete the mirror, keeping CPU data.
    pub fn release_gpu(&mut self, ctx: &mut dyn GraphicsContext) {
        self.gpu.release(ctx);
        self.gpu_stale = false;
    }

    fn invalidate_gpu(&mut self) {
        if self.gpu.is_allocated() {
            self.gpu_stale = true;
        }
    }

    /// Bring the mirror in line with the CPU arrays: rebuilt now given a
    /// context, marked stale otherwise.
    pub fn refresh_gpu(&mut self, gpu: Option<&mut dyn GraphicsContext>) {
        match gpu {
            Some(ctx) => self.rebuild_gpu(ctx),
            None => self.invalidate_gpu(),
        }
    }

    /// Multi-line summary of counts, bounds, handles and coloring mode.
    pub fn describe(&self) -> String {
        let g = &self.geometry;
        let mut out = String::new();
        let _ = writeln!(out, "triangles: {}", g.triangles.len());
        let _ = writeln!(out, "vertices:  {}", g.vertices.len());
        let _ = writeln!(out, "normals:   {}", g.normals.len());
        let _ = writeln!(out, "colors:    {}", g.colors.len());
        let _ = writeln!(out, "texCoords: {}", g.tex_coords.len());
        let _ = writeln!(out, "tangents:  {}", g.tangents.len());
        if self.bounds.is_empty() {
            let _ = writeln!(out, "bounds:    empty");
        } else {
            let _ = writeln!(
                out,
                "bounds:    {} - {} (mid {}, size {})",
                self.bounds.min,
                self.bounds.max,
                self.bounds.mid(),
                self.bounds.size()
            );
        }
        let _ = writeln!(
            out,
            "gpu:       vao={} normals={} colors={} texcoords={} tangents={}{}",
            self.gpu.vertex_array().0,
            self.gpu.normal_buffer().0,
            self.gpu.color_buffer().0,
            self.gpu.tex_coord_buffer().0,
            self.gpu.tangent_buffer().0,
            if self.gpu_stale { " (stale)" } else { "" }
        );
        let _ = write!(out, "coloring:  {}", self.coloring);
        out
    }
}
