pub mod off_loader;

use std::path::Path;

use glam::Vec3;
use tracing::{info, warn};

use crate::error::Result;
use crate::gpu::GraphicsContext;
use crate::types::{MeshGeometry, TriangleMesh};

pub use off_loader::{OffMesh, parse_off, read_off};

impl TriangleMesh {
    /// Replace the mesh with the contents of an OFF / NOFF file.
    ///
    /// Normals are derived when the file carries none and texture coordinates
    /// are always sphere-mapped. On any failure the mesh is left empty and
    /// `false` is returned.
    pub fn load_from_file(&mut self, path: &Path, gpu: Option<&mut dyn GraphicsContext>) -> bool {
        match read_off(path).and_then(|off| self.install_off(off)) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    vertices = self.vertex_count(),
                    triangles = self.triangle_count(),
                    "Loaded OFF mesh"
                );
                self.refresh_gpu(gpu);
                true
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to load mesh: {e}");
                self.clear(gpu);
                false
            }
        }
    }

    /// Load, scale the longest box edge to `length`, then move the box midpoint to `center`.
    ///
    /// Scaling is about the origin, so it runs first for `center` to hold.
    pub fn load_from_file_fitted(
        &mut self,
        path: &Path,
        center: Vec3,
        length: f32,
        gpu: Option<&mut dyn GraphicsContext>,
    ) -> bool {
        let loaded = self.load_from_file(path, None);
        if loaded {
            self.scale_to_length(length, None);
            self.translate_to_center(center, None);
        }
        self.refresh_gpu(gpu);
        loaded
    }

    fn install_off(&mut self, off: OffMesh) -> Result<()> {
        self.clear(None);
        let has_normals = off.normals.is_some();
        let geometry = MeshGeometry {
            vertices: off.vertices,
            triangles: off.triangles,
            normals: off.normals.unwrap_or_default(),
            ..Default::default()
        };
        self.set_geometry(geometry, None, None)?;
        if !has_normals {
            self.calculate_normals_by_area();
        }
        self.calculate_tex_coords_sphere_mapping();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingContext;
    use crate::types::ColoringMode;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn off_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    const TETRA: &str = "OFF\n4 4 6\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n3 0 2 1\n3 0 1 3\n3 0 3 2\n3 1 2 3\n";

    #[test]
    fn load_derives_normals_and_tex_coords() {
        let file = off_file(TETRA);
        let mut mesh = TriangleMesh::new();
        assert!(mesh.load_from_file(file.path(), None));
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.normals().len(), 4);
        assert_eq!(mesh.tex_coords().len(), 4);
        assert!(mesh.normals().iter().all(|n| (n.length() - 1.0).abs() < 1e-5));
        assert_eq!(mesh.bounds().size(), Vec3::ONE);
    }

    #[test]
    fn noff_normals_are_kept() {
        let file = off_file("NOFF\n3 1 0\n0 0 0 1 0 0\n1 0 0 1 0 0\n0 1 0 1 0 0\n3 0 1 2\n");
        let mut mesh = TriangleMesh::new();
        assert!(mesh.load_from_file(file.path(), None));
        assert!(mesh.normals().iter().all(|n| *n == Vec3::X));
    }

    #[test]
    fn failed_load_leaves_mesh_empty() {
        let good = off_file(TETRA);
        let bad = off_file("OFF\n4 1 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n");
        let mut mesh = TriangleMesh::new();
        assert!(mesh.load_from_file(good.path(), None));
        mesh.set_coloring_mode(ColoringMode::Texture);

        assert!(!mesh.load_from_file(bad.path(), None));
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_empty());
        assert_eq!(mesh.coloring_mode(), ColoringMode::StaticColor);

        assert!(!mesh.load_from_file(Path::new("/nonexistent/model.off"), None));
        assert!(mesh.is_empty());
    }

    #[test]
    fn oversized_header_leaves_mesh_empty() {
        let huge = off_file("OFF\n900000000000 1 0\n0 0 0\n");
        let mut ctx = RecordingContext::new();
        let mut mesh = TriangleMesh::new();
        assert!(!mesh.load_from_file(huge.path(), Some(&mut ctx)));
        assert!(mesh.is_empty());
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn fitted_load_centers_and_scales() {
        let file = off_file(TETRA);
        let mut ctx = RecordingContext::new();
        let mut mesh = TriangleMesh::new();
        let center = Vec3::new(0.0, 0.0, -2.0);
        assert!(mesh.load_from_file_fitted(file.path(), center, 4.0, Some(&mut ctx)));

        let mid = mesh.bounds().mid();
        assert_relative_eq!(mid.x, center.x, epsilon = 1e-5);
        assert_relative_eq!(mid.y, center.y, epsilon = 1e-5);
        assert_relative_eq!(mid.z, center.z, epsilon = 1e-5);
        assert_relative_eq!(mesh.bounds().max_extent(), 4.0, epsilon = 1e-5);
        assert!(mesh.gpu().has_geometry());
        assert!(!mesh.is_gpu_stale());
        mesh.destroy(&mut ctx);
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn failed_load_releases_existing_mirror() {
        let good = off_file(TETRA);
        let mut ctx = RecordingContext::new();
        let mut mesh = TriangleMesh::new();
        assert!(mesh.load_from_file(good.path(), Some(&mut ctx)));
        assert!(ctx.live_buffers() > 0);

        assert!(!mesh.load_from_file(Path::new("/nonexistent/model.off"), Some(&mut ctx)));
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
    }
}
