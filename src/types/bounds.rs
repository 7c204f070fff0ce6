use glam::Vec3;

/// Axis-aligned bounding box in 3-D.
///
/// An inverted box (`min > max`) is the sentinel for "no geometry"; see
/// [`BoundingBox::EMPTY`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Inverted box that any point will grow.
    pub const EMPTY: BoundingBox = BoundingBox {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
    };

    /// The fixed box of a unit-radius sphere centred at the origin.
    pub const UNIT_CUBE: BoundingBox = BoundingBox {
        min: Vec3::splat(-1.0),
        max: Vec3::splat(1.0),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Single pass componentwise min/max. Empty input yields [`BoundingBox::EMPTY`].
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |mut bb, &p| {
            bb.grow(p);
            bb
        })
    }

    /// Extend the box to contain `p`.
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Whether this is the "no geometry" sentinel.
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Centre point of the box; the origin for an empty box.
    pub fn mid(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        0.5 * self.min + 0.5 * self.max
    }

    /// Edge lengths along each axis; zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        self.max - self.min
    }

    /// Largest edge length.
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    /// The eight corners, x varying fastest, then y, then z.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Uniform scale about the origin.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    /// Whether a point lies inside (or on the boundary of) the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn empty_is_inverted_sentinel() {
        let bb = BoundingBox::default();
        assert!(bb.is_empty());
        assert!(bb.min.x > bb.max.x);
        assert_eq!(bb.mid(), Vec3::ZERO);
        assert_eq!(bb.size(), Vec3::ZERO);
        assert_eq!(BoundingBox::from_points(&[]), BoundingBox::EMPTY);
    }

    #[test]
    fn mid_and_size() {
        let bb = BoundingBox::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 1.0, 2.0));
        assert_eq!(bb.mid(), Vec3::new(1.0, 0.5, 2.0));
        assert_eq!(bb.size(), Vec3::new(4.0, 1.0, 0.0));
        assert_relative_eq!(bb.max_extent(), 4.0);
        assert!(!bb.is_empty());
    }

    #[test]
    fn from_points_tracks_extremes() {
        let bb = BoundingBox::from_points(&[
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-3.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 7.0),
        ]);
        assert_eq!(bb.min, Vec3::new(-3.0, -2.0, 0.0));
        assert_eq!(bb.max, Vec3::new(1.0, 4.0, 7.0));
    }

    #[test]
    fn single_point_has_zero_size() {
        let bb = BoundingBox::from_points(&[Vec3::splat(2.0)]);
        assert!(!bb.is_empty());
        assert_eq!(bb.size(), Vec3::ZERO);
        assert_eq!(bb.mid(), Vec3::splat(2.0));
    }

    #[test]
    fn corners_cover_every_combination() {
        let corners = unit_box().corners();
        assert_eq!(corners[0], Vec3::ZERO);
        assert_eq!(corners[7], Vec3::ONE);
        for (i, c) in corners.iter().enumerate() {
            assert_eq!(c.x, (i & 1) as f32);
            assert_eq!(c.y, ((i >> 1) & 1) as f32);
            assert_eq!(c.z, ((i >> 2) & 1) as f32);
        }
    }

    #[test]
    fn translate_and_scale() {
        let bb = unit_box().translated(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bb.min, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bb.size(), Vec3::ONE);

        let bb = unit_box().scaled(4.0);
        assert_eq!(bb.max, Vec3::splat(4.0));
        assert_eq!(bb.mid(), Vec3::splat(2.0));
    }

    #[test]
    fn contains_point() {
        let bb = unit_box();
        assert!(bb.contains_point(Vec3::splat(0.5)));
        assert!(bb.contains_point(Vec3::ZERO)); // boundary
        assert!(bb.contains_point(Vec3::ONE)); // boundary
        assert!(!bb.contains_point(Vec3::new(1.1, 0.5, 0.5)));
        assert!(!BoundingBox::EMPTY.contains_point(Vec3::ZERO));
    }
}
