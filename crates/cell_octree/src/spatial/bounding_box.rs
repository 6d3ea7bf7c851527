//! Axis-aligned bounding boxes
//!
//! Boxes are closed: two boxes that only share a face, edge or corner
//! overlap. A box can also be *empty*, the uninitialized state a box is in
//! before any point has been added to it. An empty box is different from a
//! zero-volume box collapsed onto a single point.

use std::fmt;

use crate::error::OctreeError;
use crate::foundation::math::{component_max, component_min, vec3_from_coords, Vec3, AXES};

/// Axis-Aligned Bounding Box of an indexed item or of an octant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl BoundingBox {
    /// Create the empty box
    ///
    /// Extending it by a point or a box yields exactly that point or box.
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f64::INFINITY),
            max: Vec3::repeat(f64::NEG_INFINITY),
        }
    }

    /// Create a box spanning two opposite corners
    ///
    /// The corners may be given in any order; they are normalized so that
    /// `min <= max` on every axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: component_min(&a, &b),
            max: component_max(&a, &b),
        }
    }

    /// Create the cube `[origin, origin + edge_length]` on every axis
    pub fn cube(origin: Vec3, edge_length: f64) -> Self {
        Self::new(origin, origin + Vec3::repeat(edge_length))
    }

    /// Create a box from lower-left and upper-right coordinate slices
    ///
    /// Accepts 2D or 3D coordinates; planar boxes are placed at `z = 0`.
    pub fn from_coords(lower: &[f64], upper: &[f64]) -> Result<Self, OctreeError> {
        if lower.len() != upper.len() {
            return Err(OctreeError::DimensionMismatch {
                min: lower.len(),
                max: upper.len(),
            });
        }
        let unsupported = || OctreeError::UnsupportedDimension { found: lower.len() };
        let min = vec3_from_coords(lower).ok_or_else(unsupported)?;
        let max = vec3_from_coords(upper).ok_or_else(unsupported)?;
        Ok(Self::new(min, max))
    }

    /// Smallest box containing every point, empty if there are none
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut bbox = Self::empty();
        for point in points {
            bbox.extend(&point);
        }
        bbox
    }

    /// Check whether this is the empty box
    pub fn is_empty(&self) -> bool {
        (0..AXES).any(|axis| self.min[axis] > self.max[axis])
    }

    /// Check if this box overlaps another one
    ///
    /// Touching boxes overlap. The empty box overlaps nothing.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (0..AXES).all(|axis| {
                self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis]
            })
    }

    /// Grow this box to also contain `point`
    pub fn extend(&mut self, point: &Vec3) {
        self.min = component_min(&self.min, point);
        self.max = component_max(&self.max, point);
    }

    /// Grow this box to also contain `other`
    pub fn extend_box(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.min = component_min(&self.min, &other.min);
        self.max = component_max(&self.max, &other.max);
    }

    /// Common part of both boxes, empty if they are disjoint
    pub fn intersection(&self, other: &BoundingBox) -> BoundingBox {
        let result = Self {
            min: component_max(&self.min, &other.min),
            max: component_min(&self.max, &other.max),
        };
        if result.is_empty() {
            Self::empty()
        } else {
            result
        }
    }

    /// Smallest box containing both boxes
    pub fn merged(&self, other: &BoundingBox) -> BoundingBox {
        let mut result = *self;
        result.extend_box(other);
        result
    }

    /// Check if this box contains a point (boundary included)
    pub fn contains_point(&self, point: &Vec3) -> bool {
        (0..AXES).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }

    /// Check if `other` lies entirely inside this box (boundary included)
    ///
    /// Unlike [`overlaps`](Self::overlaps), a box that sticks out on any side
    /// is not contained.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        !other.is_empty() && self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Side lengths, `max - min`; zero for the empty box
    pub fn sizes(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        self.max - self.min
    }

    /// Midpoint, `(min + max) / 2`; the origin for the empty box
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        (self.min + self.max) * 0.5
    }

    /// Enclosed volume; zero for the empty box
    pub fn volume(&self) -> f64 {
        self.sizes().iter().product()
    }

    /// Corner by position: 0 is the minimum corner, 1 the maximum corner
    pub fn corner(&self, index: usize) -> Result<Vec3, OctreeError> {
        match index {
            0 => Ok(self.min),
            1 => Ok(self.max),
            _ => Err(OctreeError::IndexOutOfRange { index, len: 2 }),
        }
    }

    /// `(min, max)` along one axis (0 = x, 1 = y, 2 = z)
    pub fn axis_range(&self, axis: usize) -> Result<(f64, f64), OctreeError> {
        if axis >= AXES {
            return Err(OctreeError::IndexOutOfRange { index: axis, len: AXES });
        }
        Ok((self.min[axis], self.max[axis]))
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<&[Vec3]> for BoundingBox {
    type Error = OctreeError;

    fn try_from(corners: &[Vec3]) -> Result<Self, Self::Error> {
        match corners {
            [a, b] => Ok(Self::new(*a, *b)),
            _ => Err(OctreeError::InvalidCornerCount { found: corners.len() }),
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "BBox [empty]");
        }
        write!(
            f,
            "BBox [({}, {}, {})-({}, {}, {})]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
