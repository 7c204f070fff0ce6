use glam::{Mat4, Vec3, Vec4};

use crate::types::BoundingBox;

/// Six clip planes `(normal, d)` with normals pointing into the view volume.
///
/// Order: right, left, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract the planes of `clip = projection * model_view`.
    ///
    /// Planes are normalized by the length of their normal so distances are
    /// in model units.
    pub fn from_matrix(clip: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (clip.row(0), clip.row(1), clip.row(2), clip.row(3));
        let planes = [r3 - r0, r3 + r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2].map(normalize_plane);
        Self { planes }
    }

    pub fn from_projection_model_view(projection: &Mat4, model_view: &Mat4) -> Self {
        Self::from_matrix(&(*projection * *model_view))
    }

    fn distance(plane: Vec4, point: Vec3) -> f32 {
        plane.truncate().dot(point) + plane.w
    }

    /// Conservative box test.
    ///
    /// A box is rejected only when all 8 corners lie outside a single plane;
    /// boxes straddling a plane, or lying outside only a frustum corner
    /// region, count as visible. Empty boxes are never visible.
    pub fn is_box_visible(&self, bounds: &BoundingBox) -> bool {
        if bounds.is_empty() {
            return false;
        }
        let corners = bounds.corners();
        self.planes
            .iter()
            .all(|&plane| corners.iter().any(|&c| Self::distance(plane, c) >= 0.0))
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length > 0.0 { plane / length } else { plane }
}

/// Whether `bounds`, in model space, can appear on screen under the given transforms.
pub fn is_visible(bounds: &BoundingBox, projection: &Mat4, model_view: &Mat4) -> bool {
    Frustum::from_projection_model_view(projection, model_view).is_box_visible(bounds)
}
