//! Spatial partitioning data structures
//!
//! Provides the octree used to localize mesh cells and field entities by
//! their bounding boxes, plus the bulk cell loader feeding it.

mod bounding_box;
pub mod cell_loader;
mod localizer;
mod octree;

#[cfg(test)]
mod tests;

pub use bounding_box::BoundingBox;
pub use cell_loader::{CellGeometryType, CellRecords};
pub use localizer::{LinearLocalizer, Localizer};
pub use octree::{
    octant_index, octant_offsets, GeometrySource, ItemId, ItemRecord, Octree, OctreeConfig,
    OctreeNode, DEFAULT_MAX_DEPTH, DEFAULT_REFINE_LIMIT,
};
