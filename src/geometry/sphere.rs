use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::types::BoundingBox;

/// Smallest longitude subdivision that still encloses volume.
pub const MIN_LONGITUDE_DIVISIONS: u32 = 4;
/// Smallest latitude subdivision that still encloses volume.
pub const MIN_LATITUDE_DIVISIONS: u32 = 2;

/// Raw output of the UV sphere generator.
#[derive(Debug, Clone, Default)]
pub struct SphereGeometry {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub tangents: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub bounds: BoundingBox,
}

/// Unit-radius UV sphere centred at the origin.
///
/// Vertices run latitude-major from the south pole (latitude 0) to the north
/// pole (latitude π), each ring holding `longitude_divisions + 1` vertices so
/// the texture seam gets its own column. Normals equal positions, tangents are
/// `up × position` (zero at the poles). Triangles wind counter-clockwise seen
/// from outside. Divisions below the minimums are raised to them.
pub fn uv_sphere(longitude_divisions: u32, latitude_divisions: u32) -> SphereGeometry {
    let longdiv = longitude_divisions.max(MIN_LONGITUDE_DIVISIONS);
    let latdiv = latitude_divisions.max(MIN_LATITUDE_DIVISIONS);
    let ring = longdiv + 1;
    let vertex_count = ((latdiv + 1) * ring) as usize;

    let mut geometry = SphereGeometry {
        vertices: Vec::with_capacity(vertex_count),
        normals: Vec::with_capacity(vertex_count),
        tex_coords: Vec::with_capacity(vertex_count),
        tangents: Vec::with_capacity(vertex_count),
        triangles: Vec::with_capacity((latdiv * longdiv * 2) as usize),
        bounds: BoundingBox::UNIT_CUBE,
    };

    for latitude in 0..=latdiv {
        let v = latitude as f32 / latdiv as f32;
        let lat_angle = v * PI;
        let extent = lat_angle.sin();
        let y = -lat_angle.cos();

        for longitude in 0..=longdiv {
            let u = longitude as f32 / longdiv as f32;
            let long_angle = u * 2.0 * PI;
            let pos = Vec3::new(long_angle.cos() * extent, y, long_angle.sin() * extent);

            geometry.vertices.push(pos);
            geometry.normals.push(pos);
            geometry.tex_coords.push(Vec2::new(2.0 - 2.0 * u, v));
            geometry.tangents.push(Vec3::Y.cross(pos));
        }
    }

    for latitude in 0..latdiv {
        let bottom = latitude * ring;
        let top = (latitude + 1) * ring;
        for longitude in 0..longdiv {
            let bottom_current = bottom + longitude;
            let bottom_next = bottom_current + 1;
            let top_current = top + longitude;
            let top_next = top_current + 1;
            geometry.triangles.push([bottom_current, top_next, bottom_next]);
            geometry.triangles.push([bottom_current, top_current, top_next]);
        }
    }

    geometry
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn counts_follow_divisions() {
        let s = uv_sphere(8, 4);
        assert_eq!(s.vertices.len(), 9 * 5);
        assert_eq!(s.triangles.len(), 8 * 4 * 2);
        assert_eq!(s.normals.len(), s.vertices.len());
        assert_eq!(s.tex_coords.len(), s.vertices.len());
        assert_eq!(s.tangents.len(), s.vertices.len());
    }

    #[test]
    fn divisions_are_clamped_to_minimum() {
        let s = uv_sphere(1, 0);
        assert_eq!(s.vertices.len(), 5 * 3);
        assert_eq!(s.triangles.len(), 4 * 2 * 2);
    }

    #[test]
    fn vertices_lie_on_unit_sphere() {
        let s = uv_sphere(16, 8);
        for (v, n) in s.vertices.iter().zip(&s.normals) {
            assert_relative_eq!(v.length(), 1.0, epsilon = 1e-5);
            assert_eq!(v, n);
        }
        assert_relative_eq!(s.vertices[0].y, -1.0);
        assert_relative_eq!(s.vertices.last().unwrap().y, 1.0);
    }

    #[test]
    fn every_index_in_range() {
        let s = uv_sphere(12, 6);
        let n = s.vertices.len() as u32;
        assert!(s.triangles.iter().flatten().all(|&i| i < n));
    }

    #[test]
    fn winding_faces_outward() {
        let s = uv_sphere(24, 12);
        for &[a, b, c] in &s.triangles {
            let (p0, p1, p2) = (
                s.vertices[a as usize],
                s.vertices[b as usize],
                s.vertices[c as usize],
            );
            let face = (p1 - p0).cross(p2 - p0);
            let centroid = (p0 + p1 + p2) / 3.0;
            // Pole fans contain zero-area triangles; those dot to ~0.
            assert!(face.dot(centroid) >= -1e-6);
        }
    }

    #[test]
    fn tangent_is_perpendicular_to_normal() {
        let s = uv_sphere(16, 8);
        for (t, n) in s.tangents.iter().zip(&s.normals) {
            assert_relative_eq!(t.dot(*n), 0.0, epsilon = 1e-6);
        }
        // Degenerate at the poles.
        assert_relative_eq!(s.tangents[0].length(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn bounds_are_fixed_unit_cube() {
        let s = uv_sphere(4, 2);
        assert_eq!(s.bounds, BoundingBox::UNIT_CUBE);
        assert_eq!(s.bounds.size(), Vec3::splat(2.0));
    }
}
