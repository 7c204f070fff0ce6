pub mod attributes;
pub mod sphere;
pub mod terrain;

pub use attributes::{area_weighted_normals, bounding_box, sphere_map_tex_coords};
pub use sphere::{SphereGeometry, uv_sphere};
pub use terrain::{DiamondSquareParams, Heightmap, TerrainGeometry, build_terrain, diamond_square};
