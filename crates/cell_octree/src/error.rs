//! Error types for bounding boxes, the octree and bulk cell loading

use thiserror::Error;

use crate::spatial::ItemId;

/// Broad category of an [`OctreeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input rejected before any state was touched
    Validation,
    /// Unknown cell type code in a bulk cell stream
    UnsupportedType,
    /// Operation not allowed in the node's current state
    StateInvariant,
    /// Positional access out of range
    Index,
}

/// Errors raised by the spatial index
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OctreeError {
    /// An empty (uninitialized) bounding box where a concrete one is required
    #[error("bounding box is empty")]
    EmptyBoundingBox,

    /// Box construction from a corner collection of the wrong size
    #[error("bounding box needs exactly 2 corner points, found {found}")]
    InvalidCornerCount {
        /// Number of corners supplied
        found: usize,
    },

    /// Corner coordinates of different dimension
    #[error("min/max corners must have the same dimension (not {min}/{max})")]
    DimensionMismatch {
        /// Dimension of the minimum corner
        min: usize,
        /// Dimension of the maximum corner
        max: usize,
    },

    /// Corner coordinates that are neither 2D nor 3D
    #[error("coordinate dimension must be 2 or 3 (not {found})")]
    UnsupportedDimension {
        /// Dimension supplied
        found: usize,
    },

    /// Root edge length that is not a positive finite number
    #[error("octree edge length must be positive and finite, got {edge_length}")]
    InvalidExtent {
        /// Offending edge length
        edge_length: f64,
    },

    /// Octree settings rejected by validation
    #[error("invalid octree configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the settings
        reason: String,
    },

    /// Item inserted without a box while no geometry source is installed
    #[error("no bounding box given for item {item} and no geometry source installed")]
    MissingGeometrySource {
        /// Item handle being inserted
        item: ItemId,
    },

    /// Cell record whose vertex indices run past the end of the stream
    #[error("cell {cell_id} at offset {offset} needs {expected} vertex indices, only {available} left")]
    TruncatedCell {
        /// Sequential id of the cell
        cell_id: ItemId,
        /// Element offset of the record's type code within the chunk
        offset: usize,
        /// Vertex indices required by the cell type
        expected: usize,
        /// Vertex indices remaining in the stream
        available: usize,
    },

    /// Unrecognized cell type code in a bulk cell stream
    #[error("unsupported cell type code {code} for cell {cell_id} at offset {offset}")]
    UnsupportedCellType {
        /// Type code read from the stream
        code: i64,
        /// Sequential id of the cell
        cell_id: ItemId,
        /// Element offset of the type code within the chunk
        offset: usize,
    },

    /// `divide()` called on an internal node
    #[error("cannot divide non-terminal octant")]
    AlreadyDivided,

    /// Positional access on a bounding box out of range
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of valid positions
        len: usize,
    },

    /// Cell referencing a vertex that does not exist
    #[error("cell {cell_id} references vertex {vertex}, but only {count} vertices exist")]
    VertexOutOfRange {
        /// Sequential id of the cell
        cell_id: ItemId,
        /// Vertex index read from the stream
        vertex: i64,
        /// Length of the vertex array
        count: usize,
    },
}

impl OctreeError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyBoundingBox
            | Self::InvalidCornerCount { .. }
            | Self::DimensionMismatch { .. }
            | Self::UnsupportedDimension { .. }
            | Self::InvalidExtent { .. }
            | Self::InvalidConfig { .. }
            | Self::MissingGeometrySource { .. }
            | Self::TruncatedCell { .. } => ErrorKind::Validation,
            Self::UnsupportedCellType { .. } => ErrorKind::UnsupportedType,
            Self::AlreadyDivided => ErrorKind::StateInvariant,
            Self::IndexOutOfRange { .. } | Self::VertexOutOfRange { .. } => ErrorKind::Index,
        }
    }
}
