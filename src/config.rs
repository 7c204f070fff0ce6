use std::path::{Path, PathBuf};

use clap::Parser;
use glam::Vec3;

use crate::error::{Result, ViewerError};
use crate::geometry::DiamondSquareParams;
use crate::types::ColoringMode;

/// Largest accepted grid size.
pub const MAX_GRID_SIZE: u32 = 10_000;
/// Largest accepted terrain width or height, in cells.
pub const MAX_TERRAIN_SIZE: u32 = 4096;
/// Largest accepted sphere subdivision count.
pub const MAX_SPHERE_DIVISIONS: u32 = 4096;
/// Longest accepted simulated frame, in seconds.
pub const MAX_FRAME_TIME: f32 = 3600.0;

/// Coloring mode selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColoringArg {
    #[value(name = "static")]
    Static,
    #[value(name = "colors")]
    Colors,
    #[value(name = "texture")]
    Texture,
    #[value(name = "bump")]
    Bump,
}

impl std::fmt::Display for ColoringArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColoringArg::Static => write!(f, "static"),
            ColoringArg::Colors => write!(f, "colors"),
            ColoringArg::Texture => write!(f, "texture"),
            ColoringArg::Bump => write!(f, "bump"),
        }
    }
}

impl From<ColoringArg> for ColoringMode {
    fn from(arg: ColoringArg) -> Self {
        match arg {
            ColoringArg::Static => ColoringMode::StaticColor,
            ColoringArg::Colors => ColoringMode::ColorArray,
            ColoringArg::Texture => ColoringMode::Texture,
            ColoringArg::Bump => ColoringMode::BumpMapping,
        }
    }
}

/// Locations of every model, texture and shader the viewer loads.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPaths {
    pub model: PathBuf,
    pub light_sphere: PathBuf,
    pub test_texture: PathBuf,
    pub bump_diffuse: PathBuf,
    pub bump_normal: PathBuf,
    pub bump_displacement: PathBuf,
    pub mvp_vertex_shader: PathBuf,
    pub constant_color_shader: PathBuf,
    pub lambert_shader: PathBuf,
    pub bump_vertex_shader: PathBuf,
    pub bump_fragment_shader: PathBuf,
}

impl AssetPaths {
    /// Standard `Models/`, `Textures/` and `Shader/` layout below `root`.
    pub fn under(root: &Path) -> Self {
        let models = root.join("Models");
        let textures = root.join("Textures");
        let shaders = root.join("Shader");
        Self {
            model: models.join("doppeldecker.off"),
            light_sphere: models.join("sphere.off"),
            test_texture: textures.join("TEST_GRID.bmp"),
            bump_diffuse: textures.join("rough_block_wall_diff_1k.jpg"),
            bump_normal: textures.join("rough_block_wall_nor_1k.jpg"),
            bump_displacement: textures.join("rough_block_wall_disp_1k.jpg"),
            mvp_vertex_shader: shaders.join("only_mvp.vert"),
            constant_color_shader: shaders.join("constant_color.frag"),
            lambert_shader: shaders.join("lambert.frag"),
            bump_vertex_shader: shaders.join("bump.vert"),
            bump_fragment_shader: shaders.join("bump.frag"),
        }
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::under(Path::new(".."))
    }
}

/// Procedural terrain parameters.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    pub width: u32,
    pub height: u32,
    /// Passed through to the generator; refinement depth follows the grid size.
    pub iterations: u32,
    pub params: DiamondSquareParams,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            iterations: 4000,
            params: DiamondSquareParams::default(),
        }
    }
}

/// Bump-mapped sphere tessellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SphereConfig {
    pub longitude_divisions: u32,
    pub latitude_divisions: u32,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            longitude_divisions: 200,
            latitude_divisions: 100,
        }
    }
}

/// Initial camera pose and projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: Vec3,
    pub direction: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -3.0),
            direction: Vec3::NEG_Z,
            fov_y: 65.0,
            near: 0.5,
            far: 10_000.0,
        }
    }
}

/// Light source placement and motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub position: Vec3,
    /// Orbit speed about the Y axis, degrees per second.
    pub speed: f32,
    pub moves: bool,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 20.0),
            speed: 10.0,
            moves: false,
        }
    }
}

/// Display toggles applied after scene setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    pub coloring: Option<ColoringMode>,
    pub bounding_boxes: bool,
    pub normals: bool,
    pub diffuse: bool,
    pub normal_mapping: bool,
    pub displacement_mapping: bool,
    /// Index into the compiled shading programs.
    pub shader: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            coloring: None,
            bounding_boxes: false,
            normals: false,
            diffuse: true,
            normal_mapping: true,
            displacement_mapping: true,
            shader: 0,
        }
    }
}

/// Fully resolved viewer configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub assets: AssetPaths,
    pub terrain: TerrainConfig,
    pub sphere: SphereConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub display: DisplayConfig,
    /// Instances of the primary model drawn are `grid_size * 5`.
    pub grid_size: u32,
    pub viewport: (u32, u32),
    pub frames: u32,
    /// Seconds simulated per frame.
    pub frame_time: f32,
    pub seed: Option<u64>,
    pub stats_output: Option<PathBuf>,
    pub verbose: bool,
    pub threads: Option<usize>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            terrain: TerrainConfig::default(),
            sphere: SphereConfig::default(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            display: DisplayConfig::default(),
            grid_size: 3,
            viewport: (800, 600),
            frames: 60,
            frame_time: 1.0 / 60.0,
            seed: None,
            stats_output: None,
            verbose: false,
            threads: None,
        }
    }
}

impl ViewerConfig {
    /// Reject settings no frame could be rendered with.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.viewport;
        if w == 0 || h == 0 {
            return Err(ViewerError::Config(format!("Viewport must be non-empty, got {w}x{h}")));
        }
        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(ViewerError::Config(format!(
                "Clip planes must satisfy 0 < near < far, got near={} far={}",
                camera.near, camera.far
            )));
        }
        if !(camera.fov_y > 0.0 && camera.fov_y < 180.0) {
            return Err(ViewerError::Config(format!(
                "Field of view must be in (0, 180) degrees, got {}",
                camera.fov_y
            )));
        }
        let range = &self.terrain.params.sample_range;
        if range.is_empty() || !range.start.is_finite() || !range.end.is_finite() {
            return Err(ViewerError::Config(format!(
                "Terrain sample range {range:?} is empty"
            )));
        }
        if !(self.frame_time > 0.0 && self.frame_time <= MAX_FRAME_TIME) {
            return Err(ViewerError::Config(format!(
                "Frame time must be in (0, {MAX_FRAME_TIME}] seconds, got {} (is --fps positive?)",
                self.frame_time
            )));
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(ViewerError::Config(format!(
                "Grid size must be at most {MAX_GRID_SIZE}, got {}",
                self.grid_size
            )));
        }
        let terrain = &self.terrain;
        if terrain.width > MAX_TERRAIN_SIZE || terrain.height > MAX_TERRAIN_SIZE {
            return Err(ViewerError::Config(format!(
                "Terrain must be at most {MAX_TERRAIN_SIZE}x{MAX_TERRAIN_SIZE} cells, got {}x{}",
                terrain.width, terrain.height
            )));
        }
        let sphere = &self.sphere;
        if sphere.longitude_divisions > MAX_SPHERE_DIVISIONS || sphere.latitude_divisions > MAX_SPHERE_DIVISIONS {
            return Err(ViewerError::Config(format!(
                "Sphere divisions must be at most {MAX_SPHERE_DIVISIONS}, got {}x{}",
                sphere.longitude_divisions, sphere.latitude_divisions
            )));
        }
        Ok(())
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "mesh-viewer",
    about = "Headless triangle-mesh viewer: terrain, spheres, OFF models and frustum culling",
    version
)]
pub struct CliArgs {
    /// Root directory holding Models/, Textures/ and Shader/
    #[arg(long, default_value = "..")]
    pub assets: PathBuf,

    /// Number of frames to render
    #[arg(short = 'n', long, default_value_t = 60)]
    pub frames: u32,

    /// Simulated frames per second (drives light motion)
    #[arg(long, default_value_t = 60.0, allow_negative_numbers = true)]
    pub fps: f32,

    /// Grid size; five model instances are drawn per unit
    #[arg(short = 'g', long, default_value_t = 3)]
    pub grid_size: u32,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Terrain grid cells along X
    #[arg(long, default_value_t = 50)]
    pub terrain_width: u32,

    /// Terrain grid cells along Z
    #[arg(long, default_value_t = 50)]
    pub terrain_height: u32,

    /// Terrain iteration count (advisory)
    #[arg(long, default_value_t = 4000)]
    pub terrain_iterations: u32,

    /// Initial diamond-square roughness
    #[arg(long, default_value_t = 3.0)]
    pub roughness: f32,

    /// Override the coloring mode of the model and terrain
    #[arg(long, value_enum)]
    pub coloring: Option<ColoringArg>,

    /// Shading program index (0 = constant color, 1 = lambert)
    #[arg(long, default_value_t = 0)]
    pub shader: usize,

    /// Draw bounding boxes
    #[arg(long)]
    pub bounding_boxes: bool,

    /// Draw vertex normals
    #[arg(long)]
    pub normals: bool,

    /// Disable the bump sphere's diffuse texture
    #[arg(long)]
    pub no_diffuse: bool,

    /// Disable normal mapping on the bump sphere
    #[arg(long)]
    pub no_normal_mapping: bool,

    /// Disable displacement mapping on the bump sphere
    #[arg(long)]
    pub no_displacement_mapping: bool,

    /// Orbit the light about the Y axis
    #[arg(long)]
    pub light_moves: bool,

    /// Light orbit speed in degrees per second
    #[arg(long, default_value_t = 10.0)]
    pub light_speed: f32,

    /// Seed for terrain and instance placement (default: random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    pub stats_output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl From<CliArgs> for ViewerConfig {
    fn from(args: CliArgs) -> Self {
        let defaults = ViewerConfig::default();
        let frame_time = 1.0 / args.fps;

        ViewerConfig {
            assets: AssetPaths::under(&args.assets),
            terrain: TerrainConfig {
                width: args.terrain_width,
                height: args.terrain_height,
                iterations: args.terrain_iterations,
                params: DiamondSquareParams {
                    initial_roughness: args.roughness,
                    ..DiamondSquareParams::default()
                },
            },
            sphere: defaults.sphere,
            camera: defaults.camera,
            light: LightConfig {
                speed: args.light_speed,
                moves: args.light_moves,
                ..defaults.light
            },
            display: DisplayConfig {
                coloring: args.coloring.map(ColoringMode::from),
                bounding_boxes: args.bounding_boxes,
                normals: args.normals,
                diffuse: !args.no_diffuse,
                normal_mapping: !args.no_normal_mapping,
                displacement_mapping: !args.no_displacement_mapping,
                shader: args.shader,
            },
            grid_size: args.grid_size,
            viewport: (args.width, args.height),
            frames: args.frames,
            frame_time,
            seed: args.seed,
            stats_output: args.stats_output,
            verbose: args.verbose,
            threads: args.threads,
        }
    }
}
