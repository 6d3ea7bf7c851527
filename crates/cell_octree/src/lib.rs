//! # Cell Octree
//!
//! Hierarchical spatial index over the bounding boxes of mesh cells and
//! field entities, answering "which items overlap this box?".
//!
//! ## Features
//!
//! - **Octree**: eager subdivision of a fixed cubic domain into octants
//! - **Bounding boxes**: closed axis-aligned boxes with an explicit empty state
//! - **Bulk loading**: cells read straight from a typed cell stream and vertex array
//! - **Configurable refinement**: refinement limit, depth and size guards from TOML or RON
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashSet;
//! use cell_octree::prelude::*;
//!
//! let mut octree = Octree::new(Vec3::zeros(), 100.0, OctreeConfig::default())?;
//! octree.insert(0, BoundingBox::new(Vec3::repeat(10.0), Vec3::repeat(20.0)))?;
//!
//! let mut found = HashSet::new();
//! octree.query(&mut found, &BoundingBox::new(Vec3::repeat(15.0), Vec3::repeat(16.0)));
//! assert!(found.contains(&0));
//! # Ok::<(), OctreeError>(())
//! ```

pub mod foundation;
pub mod config;
pub mod error;
pub mod spatial;

pub use error::{ErrorKind, OctreeError};

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        error::{ErrorKind, OctreeError},
        foundation::math::Vec3,
        spatial::{
            BoundingBox, CellGeometryType, CellRecords, GeometrySource, ItemId, ItemRecord,
            LinearLocalizer, Localizer, Octree, OctreeConfig, OctreeNode,
        },
    };
}
