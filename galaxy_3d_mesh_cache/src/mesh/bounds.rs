/// Local and world bounds used for culling and picking.
///
/// Boxes are stored in local space per submesh; an asset keeps one bounding
/// sphere for the union of its boxes, and each instance carries that sphere
/// transformed into world space.

use glam::{Mat4, Vec3};

// ===== AABB =====

/// Axis-aligned bounding box in local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl BoundingBox {
    /// Inverted box, the identity for `union`
    pub const EMPTY: Self = Self { min: Vec3::MAX, max: Vec3::MIN };

    /// Create a box from its corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |acc, &p| Self::new(acc.min.min(p), acc.max.max(p)))
    }

    /// Whether the box contains no point at all
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half size along each axis
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        BoundingBox::new(self.min.min(other.min), self.max.max(other.max))
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ===== SPHERE =====

/// Bounding sphere (local or world space)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere circumscribing a box, None for an empty box
    pub fn from_box(bounds: &BoundingBox) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }
        Some(Self {
            center: bounds.center(),
            radius: bounds.extents().length(),
        })
    }

    /// Transform a local sphere by a model matrix.
    ///
    /// The radius is scaled by the longest basis vector of the upper 3x3, which
    /// over-approximates under non-uniform scale but never shrinks the sphere.
    pub fn transformed(&self, model: &Mat4) -> BoundingSphere {
        BoundingSphere {
            center: model.transform_point3(self.center),
            radius: self.radius * max_axis_scale(model),
        }
    }

    /// Whether a point lies inside or on the sphere
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }
}

/// `max(|col0|, |col1|, |col2|)` of the upper 3x3 of `model`
pub fn max_axis_scale(model: &Mat4) -> f32 {
    let x = model.x_axis.truncate().length();
    let y = model.y_axis.truncate().length();
    let z = model.z_axis.truncate().length();
    x.max(y).max(z)
}

#[cfg(test)]
#[path = "bounds_tests.rs"]
mod tests;
