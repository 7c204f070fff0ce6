use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::types::BoundingBox;

/// Per-vertex normals weighted by adjacent triangle area.
///
/// Each triangle adds its un-normalized edge cross product (twice its area)
/// to all three of its vertices; the sums are normalized at the end.
/// Vertices referenced by no triangle (or only by degenerate ones) get a zero
/// normal.
pub fn area_weighted_normals(vertices: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for &[i0, i1, i2] in triangles {
        let (i0, i1, i2) = (i0 as usize, i1 as usize, i2 as usize);
        let edge1 = vertices[i1] - vertices[i0];
        let edge2 = vertices[i2] - vertices[i0];
        let normal = edge1.cross(edge2);
        normals[i0] += normal;
        normals[i1] += normal;
        normals[i2] += normal;
    }
    normals.par_iter_mut().for_each(|n| *n = n.normalize_or_zero());
    normals
}

/// Texture coordinates by central projection onto a sphere around `center`.
///
/// `u = atan2(x, z) / 2π + 0.5`, `v = asin(y / |d|) / π`. A vertex exactly at
/// `center` has no direction and yields a NaN `v`, which is passed through.
pub fn sphere_map_tex_coords(vertices: &[Vec3], center: Vec3) -> Vec<Vec2> {
    vertices
        .par_iter()
        .map(|&vertex| {
            let d = vertex - center;
            let u = d.x.atan2(d.z) / (2.0 * PI) + 0.5;
            let v = (d.y / d.length()).asin() / PI;
            Vec2::new(u, v)
        })
        .collect()
}

/// Axis-aligned bounds of `vertices`.
pub fn bounding_box(vertices: &[Vec3]) -> BoundingBox {
    BoundingBox::from_points(vertices)
}
