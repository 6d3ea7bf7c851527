//! Math utilities and types
//!
//! Mesh and field coordinates are kept in double precision.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// Number of spatial axes handled by the index
pub const AXES: usize = 3;

/// Build a vector from a `[x, y, z]` row of a vertex array
#[inline]
pub fn vec3_from_row(row: &[f64; 3]) -> Vec3 {
    Vec3::new(row[0], row[1], row[2])
}

/// Build a vector from a 2D or 3D coordinate slice
///
/// Planar coordinates get a zero `z`. Returns `None` for any other length.
pub fn vec3_from_coords(coords: &[f64]) -> Option<Vec3> {
    match *coords {
        [x, y] => Some(Vec3::new(x, y, 0.0)),
        [x, y, z] => Some(Vec3::new(x, y, z)),
        _ => None,
    }
}

/// Component-wise minimum
#[inline]
pub fn component_min(a: &Vec3, b: &Vec3) -> Vec3 {
    a.zip_map(b, f64::min)
}

/// Component-wise maximum
#[inline]
pub fn component_max(a: &Vec3, b: &Vec3) -> Vec3 {
    a.zip_map(b, f64::max)
}
