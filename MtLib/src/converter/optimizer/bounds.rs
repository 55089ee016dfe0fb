//! Model bounds and vertex-space normalization

use glam::{Mat4, Vec3};

/// Axis-aligned bounds of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Bounds of `points`, or `None` for an empty set.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |b, p| Self {
            min: b.min.min(p),
            max: b.max.max(p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Distance from the center to the max corner.
    pub fn radius(&self) -> f32 {
        self.center().distance(self.max)
    }

    /// Matrix mapping the bounds into the unit range used by 16-bit positions.
    ///
    /// Positions are offset by `-min` and scaled by one uniform factor,
    /// `1 / (max(max) - min(min))`.
    pub fn normalization_matrix(&self) -> Mat4 {
        let extent = self.max.max_element() - self.min.min_element();
        let scale = if extent > f32::EPSILON { 1.0 / extent } else { 1.0 };
        Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(-self.min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let b = Bounds::from_points([
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, -2.0, 0.0),
            Vec3::new(0.0, 4.0, 1.0),
        ])
        .unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(3.0, 4.0, 2.0));
        assert_eq!(b.center(), Vec3::new(1.0, 1.0, 1.0));
        assert!((b.radius() - Vec3::new(2.0, 3.0, 1.0).length()).abs() < 1e-6);
        assert!(Bounds::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_normalization_maps_into_unit_range() {
        let b = Bounds::from_points([Vec3::new(-1.0, -2.0, 0.0), Vec3::new(3.0, 4.0, 2.0)]).unwrap();
        let m = b.normalization_matrix();
        let lo = m.transform_point3(b.min);
        let hi = m.transform_point3(b.max);
        assert!(lo.abs().max_element() < 1e-6);
        assert!(hi.max_element() <= 1.0 + 1e-6);
        // uniform scale: extent is 4 - (-2) = 6
        assert!((hi.x - 4.0 / 6.0).abs() < 1e-6);
    }
}
