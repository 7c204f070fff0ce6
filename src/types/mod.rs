pub mod bounds;
pub mod mesh;

pub use bounds::BoundingBox;
pub use mesh::{BumpToggles, ColoringMode, Decorations, MeshGeometry, MeshTextures, TriangleMesh};
