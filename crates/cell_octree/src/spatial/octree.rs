//! Octree spatial partitioning structure
//!
//! Divides a cubic region into hierarchical octants holding the bounding
//! boxes of external items (mesh cells, field entities). A terminal octant
//! divides into 8 children as soon as it holds more records than the
//! refinement limit. An item whose box straddles octant boundaries is stored
//! in every octant its box overlaps, so queries collect ids into a set.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::error::OctreeError;
use crate::foundation::math::Vec3;
use crate::spatial::cell_loader::load_cell_array_chunk;
use crate::spatial::BoundingBox;

/// Opaque handle of an indexed item, owned and interpreted by the caller
pub type ItemId = usize;

/// Default number of records a terminal octant holds before dividing
pub const DEFAULT_REFINE_LIMIT: usize = 400;

/// Default maximum subdivision depth
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Configuration for octree refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Maximum records per terminal octant before subdivision
    pub refine_limit: usize,

    /// Maximum subdivision depth (root is depth 0)
    pub max_depth: u32,

    /// Children smaller than this edge length are never created
    pub min_edge_length: f64,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            refine_limit: DEFAULT_REFINE_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
            min_edge_length: 0.0,
        }
    }
}

impl Config for OctreeConfig {}

impl OctreeConfig {
    /// Check that the settings describe a usable refinement policy
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refine_limit == 0 {
            return Err(ConfigError::Invalid("refine_limit must be at least 1".to_string()));
        }
        if !self.min_edge_length.is_finite() || self.min_edge_length < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_edge_length must be finite and non-negative, got {}",
                self.min_edge_length
            )));
        }
        Ok(())
    }
}

/// Item handle stored together with its bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRecord {
    /// Caller-defined handle
    pub id: ItemId,
    /// Bounding box of the item
    pub bbox: BoundingBox,
}

/// Host capability resolving an item handle to its bounding box
///
/// Used when items are inserted without an explicit box.
pub trait GeometrySource {
    /// Bounding box of `item`
    fn bounding_box(&self, item: ItemId) -> BoundingBox;
}

impl<F> GeometrySource for F
where
    F: Fn(ItemId) -> BoundingBox,
{
    fn bounding_box(&self, item: ItemId) -> BoundingBox {
        self(item)
    }
}

/// Slot of the child at offsets `(i, j, k)` in the children array
///
/// Octant layout:
/// 0: -X, -Y, -Z    4: -X, -Y, +Z
/// 1: +X, -Y, -Z    5: +X, -Y, +Z
/// 2: -X, +Y, -Z    6: -X, +Y, +Z
/// 3: +X, +Y, -Z    7: +X, +Y, +Z
#[inline]
pub fn octant_index(i: usize, j: usize, k: usize) -> usize {
    (k << 2) | (j << 1) | i
}

/// Inverse of [`octant_index`]
#[inline]
pub fn octant_offsets(octant: usize) -> (usize, usize, usize) {
    (octant & 1, (octant >> 1) & 1, (octant >> 2) & 1)
}

/// Single node in the octree hierarchy
///
/// A node is either terminal (no children, holds records) or internal
/// (exactly 8 children, no records). Terminal nodes become internal once;
/// there is no way back.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space extent of this node
    bounds: BoundingBox,

    /// Minimum corner of the extent
    origin: Vec3,

    /// Edge length of the cubic extent
    edge_length: f64,

    /// Depth in the tree (0 = root)
    depth: u32,

    /// Records stored here (terminal nodes only)
    items: Vec<ItemRecord>,

    /// Child nodes (8 octants), None if this is a terminal node
    children: Option<Box<[OctreeNode; 8]>>,

    /// Set once a refinement was refused by a guard
    refinement_blocked: bool,

    /// Record count at which a refused refinement is reconsidered
    refine_retry_at: usize,
}

impl OctreeNode {
    /// Create a terminal, empty root node over the cube `[origin, origin + edge_length]`
    pub fn new(origin: Vec3, edge_length: f64) -> Self {
        Self::with_depth(origin, edge_length, 0)
    }

    fn with_depth(origin: Vec3, edge_length: f64, depth: u32) -> Self {
        Self {
            bounds: BoundingBox::cube(origin, edge_length),
            origin,
            edge_length,
            depth,
            items: Vec::new(),
            children: None,
            refinement_blocked: false,
            refine_retry_at: 0,
        }
    }

    /// Extent of this node
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Minimum corner of this node's extent
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Edge length of this node's cube
    pub fn edge_length(&self) -> f64 {
        self.edge_length
    }

    /// Depth in the tree (0 = root)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Records held by this node; always empty for internal nodes
    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    /// All 8 children, None for a terminal node
    pub fn children(&self) -> Option<&[OctreeNode; 8]> {
        self.children.as_deref()
    }

    /// Child at offsets `(i, j, k)`, each 0 or 1
    pub fn child(&self, i: usize, j: usize, k: usize) -> Option<&OctreeNode> {
        if i > 1 || j > 1 || k > 1 {
            return None;
        }
        self.children
            .as_ref()
            .map(|children| &children[octant_index(i, j, k)])
    }

    /// Check if this node is terminal (has no children)
    pub fn is_terminal(&self) -> bool {
        self.children.is_none()
    }

    /// Check if this node's extent overlaps `bbox`
    ///
    /// This is the pruning test for insertion, removal and queries alike.
    pub fn overlaps_extent(&self, bbox: &BoundingBox) -> bool {
        self.bounds.overlaps(bbox)
    }

    fn can_refine(&self, config: &OctreeConfig) -> bool {
        self.depth < config.max_depth && self.edge_length * 0.5 >= config.min_edge_length
    }

    fn child_origin(&self, octant: usize) -> Vec3 {
        let half = self.edge_length * 0.5;
        let step = |offset: usize| if offset == 0 { 0.0 } else { half };
        let (i, j, k) = octant_offsets(octant);
        self.origin + Vec3::new(step(i), step(j), step(k))
    }

    /// Check whether dividing would spread the stored records out
    ///
    /// A split fails to separate when some child would receive every record
    /// while records also get copied into siblings. Dividing then only
    /// multiplies records without making any octant smaller.
    fn split_separates_records(&self) -> bool {
        let half = self.edge_length * 0.5;
        let mut fullest = 0;
        let mut total = 0;
        for octant in 0..8 {
            let child_bounds = BoundingBox::cube(self.child_origin(octant), half);
            let count = self
                .items
                .iter()
                .filter(|record| record.bbox.overlaps(&child_bounds))
                .count();
            fullest = fullest.max(count);
            total += count;
        }
        fullest < self.items.len() || total == self.items.len()
    }

    fn block_refinement(&mut self, reason: &str, retry_at: usize, config: &OctreeConfig) {
        self.refine_retry_at = retry_at;
        if !self.refinement_blocked {
            log::warn!(
                "Octant at depth {} (edge {}) exceeds {} records but is not divided: {}",
                self.depth,
                self.edge_length,
                config.refine_limit,
                reason
            );
            self.refinement_blocked = true;
        }
    }

    /// Subdivide this node into 8 children
    ///
    /// Every stored record is handed to each child whose extent overlaps its
    /// box, so a record crossing a child boundary ends up in several
    /// children. A child receiving more than `refine_limit` records divides
    /// in turn, subject to the refinement guards.
    pub fn divide(&mut self, config: &OctreeConfig) -> Result<(), OctreeError> {
        if !self.is_terminal() {
            return Err(OctreeError::AlreadyDivided);
        }

        let half = self.edge_length * 0.5;
        let depth = self.depth + 1;

        let mut children: Box<[OctreeNode; 8]> = Box::new(std::array::from_fn(|octant| {
            OctreeNode::with_depth(self.child_origin(octant), half, depth)
        }));

        let records = std::mem::take(&mut self.items);
        log::debug!(
            "Dividing octant at depth {} (edge {}) holding {} records",
            self.depth,
            self.edge_length,
            records.len()
        );

        for child in children.iter_mut() {
            for record in &records {
                child.insert_record(*record, config)?;
            }
        }

        self.children = Some(children);
        Ok(())
    }

    /// Insert an item with its bounding box
    ///
    /// Does nothing when the box misses this node. Fails if the box is empty.
    pub fn insert(
        &mut self,
        id: ItemId,
        bbox: BoundingBox,
        config: &OctreeConfig,
    ) -> Result<(), OctreeError> {
        self.insert_record(ItemRecord { id, bbox }, config)
    }

    fn insert_record(&mut self, record: ItemRecord, config: &OctreeConfig) -> Result<(), OctreeError> {
        if record.bbox.is_empty() {
            return Err(OctreeError::EmptyBoundingBox);
        }
        if !self.overlaps_extent(&record.bbox) {
            return Ok(());
        }

        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                child.insert_record(record, config)?;
            }
            return Ok(());
        }

        log::trace!("Storing item {} at depth {}", record.id, self.depth);
        self.items.push(record);

        let count = self.items.len();
        if count > config.refine_limit && count >= self.refine_retry_at {
            if !self.can_refine(config) {
                self.block_refinement("depth or edge length limit reached", usize::MAX, config);
            } else if !self.split_separates_records() {
                // Later records may be separable; look again once the count doubles
                self.block_refinement("records overlap every octant they reach", count * 2, config);
            } else {
                self.divide(config)?;
            }
        }
        Ok(())
    }

    /// Remove every record of `id` from the terminal nodes `bbox` reaches
    ///
    /// Returns true if anything was removed. Emptied children are kept.
    /// Fails if the box is empty.
    pub fn remove(&mut self, id: ItemId, bbox: &BoundingBox) -> Result<bool, OctreeError> {
        if bbox.is_empty() {
            return Err(OctreeError::EmptyBoundingBox);
        }
        Ok(self.remove_records(id, bbox))
    }

    fn remove_records(&mut self, id: ItemId, bbox: &BoundingBox) -> bool {
        if !self.overlaps_extent(bbox) {
            return false;
        }

        if let Some(children) = self.children.as_mut() {
            let mut removed = false;
            for child in children.iter_mut() {
                removed |= child.remove_records(id, bbox);
            }
            return removed;
        }

        let before = self.items.len();
        self.items.retain(|record| record.id != id);
        self.items.len() != before
    }

    /// Add the ids of all items whose box overlaps `bbox` to `results`
    pub fn query(&self, results: &mut HashSet<ItemId>, bbox: &BoundingBox) {
        self.for_each_match(bbox, &mut |id| {
            results.insert(id);
        });
    }

    /// Like [`query`](Self::query) but appends to a list
    ///
    /// Items stored in several octants appear once per octant.
    pub fn query_list(&self, results: &mut Vec<ItemId>, bbox: &BoundingBox) {
        self.for_each_match(bbox, &mut |id| results.push(id));
    }

    fn for_each_match(&self, bbox: &BoundingBox, on_match: &mut dyn FnMut(ItemId)) {
        self.visit(bbox, &mut |record: &ItemRecord| {
            if record.bbox.overlaps(bbox) {
                on_match(record.id);
            }
        });
    }

    /// Call `visitor` on every record of every terminal node overlapping `bbox`
    ///
    /// Records are not filtered by their own box, and duplicated records
    /// are visited once per octant holding them.
    pub fn visit<F>(&self, bbox: &BoundingBox, visitor: &mut F)
    where
        F: FnMut(&ItemRecord),
    {
        if !self.overlaps_extent(bbox) {
            return;
        }

        match self.children.as_ref() {
            Some(children) => {
                for child in children.iter() {
                    child.visit(bbox, visitor);
                }
            }
            None => self.items.iter().for_each(|record| visitor(record)),
        }
    }

    /// Number of levels below this node (0 for a terminal node)
    pub fn height(&self) -> u32 {
        self.children.as_ref().map_or(0, |children| {
            1 + children.iter().map(OctreeNode::height).max().unwrap_or(0)
        })
    }

    /// Count this node and all its descendants
    pub fn count_nodes(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |children| children.iter().map(OctreeNode::count_nodes).sum())
    }

    /// Count stored records in this node and all children, duplicates included
    pub fn count_records(&self) -> usize {
        let mut count = self.items.len();

        if let Some(ref children) = self.children {
            for child in children.iter() {
                count += child.count_records();
            }
        }

        count
    }

    /// Get all terminal nodes
    pub fn get_all_leaves<'a>(&'a self, leaves: &mut Vec<&'a OctreeNode>) {
        if self.is_terminal() {
            leaves.push(self);
        } else if let Some(ref children) = self.children {
            for child in children.iter() {
                child.get_all_leaves(leaves);
            }
        }
    }

    /// Get all nodes at a specific depth
    pub fn get_nodes_at_depth<'a>(&'a self, target_depth: u32, nodes: &mut Vec<&'a OctreeNode>) {
        if self.depth == target_depth {
            nodes.push(self);
        } else if let Some(ref children) = self.children {
            for child in children.iter() {
                child.get_nodes_at_depth(target_depth, nodes);
            }
        }
    }
}

/// Octree over a fixed cubic extent
///
/// Owns the root node, the refinement settings and, optionally, the host's
/// [`GeometrySource`] for items inserted by handle alone.
pub struct Octree {
    /// Root node covering the whole domain
    root: OctreeNode,

    /// Configuration
    config: OctreeConfig,

    /// Resolves item handles to boxes for [`Octree::insert_item`]
    geometry: Option<Box<dyn GeometrySource>>,
}

impl fmt::Debug for Octree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Octree")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("geometry", &self.geometry.is_some())
            .finish()
    }
}

impl Octree {
    /// Create an octree over the cube `[origin, origin + edge_length]`
    pub fn new(origin: Vec3, edge_length: f64, config: OctreeConfig) -> Result<Self, OctreeError> {
        if !edge_length.is_finite() || edge_length <= 0.0 {
            return Err(OctreeError::InvalidExtent { edge_length });
        }
        config
            .validate()
            .map_err(|e| OctreeError::InvalidConfig { reason: e.to_string() })?;

        log::info!(
            "Creating octree at ({}, {}, {}) with edge {} (refine limit {}, max depth {})",
            origin.x,
            origin.y,
            origin.z,
            edge_length,
            config.refine_limit,
            config.max_depth
        );

        Ok(Self {
            root: OctreeNode::new(origin, edge_length),
            config,
            geometry: None,
        })
    }

    /// Create an octree whose root cube encloses a domain's bounding box
    ///
    /// The cube starts at the box's minimum corner and its edge is the box's
    /// largest side.
    pub fn enclosing(domain: &BoundingBox, config: OctreeConfig) -> Result<Self, OctreeError> {
        if domain.is_empty() {
            return Err(OctreeError::EmptyBoundingBox);
        }
        let edge_length = domain.sizes().max();
        Self::new(domain.min, edge_length, config)
    }

    /// Install the host capability used by [`insert_item`](Self::insert_item)
    #[must_use]
    pub fn with_geometry_source<G>(mut self, source: G) -> Self
    where
        G: GeometrySource + 'static,
    {
        self.geometry = Some(Box::new(source));
        self
    }

    /// Root node
    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Mutable root node
    pub fn root_mut(&mut self) -> &mut OctreeNode {
        &mut self.root
    }

    /// Refinement settings
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Extent of the whole tree
    pub fn bounds(&self) -> &BoundingBox {
        self.root.bounds()
    }

    /// Insert an item with an explicit bounding box
    pub fn insert(&mut self, id: ItemId, bbox: BoundingBox) -> Result<(), OctreeError> {
        self.root.insert(id, bbox, &self.config)
    }

    fn resolve_bbox(&self, id: ItemId) -> Result<BoundingBox, OctreeError> {
        self.geometry
            .as_ref()
            .map(|source| source.bounding_box(id))
            .ok_or(OctreeError::MissingGeometrySource { item: id })
    }

    /// Insert an item, asking the geometry source for its box
    pub fn insert_item(&mut self, id: ItemId) -> Result<(), OctreeError> {
        let bbox = self.resolve_bbox(id)?;
        self.insert(id, bbox)
    }

    /// Insert the cells of one bulk chunk, numbering them from `id_offset`
    ///
    /// See [`load_cell_array_chunk`]. Returns the number of cells inserted;
    /// on error, the cells before the failing record remain in the tree.
    pub fn insert_cell_array_chunk(
        &mut self,
        vertices: &[[f64; 3]],
        cells: &[i64],
        id_offset: ItemId,
    ) -> Result<usize, OctreeError> {
        load_cell_array_chunk(&mut self.root, &self.config, vertices, cells, id_offset)
    }

    /// Remove an item previously inserted with `bbox`
    pub fn remove(&mut self, id: ItemId, bbox: &BoundingBox) -> Result<bool, OctreeError> {
        self.root.remove(id, bbox)
    }

    /// Remove an item, asking the geometry source for its box
    pub fn remove_item(&mut self, id: ItemId) -> Result<bool, OctreeError> {
        let bbox = self.resolve_bbox(id)?;
        self.remove(id, &bbox)
    }

    /// Add ids of items overlapping `bbox` to a caller-owned set
    pub fn query(&self, results: &mut HashSet<ItemId>, bbox: &BoundingBox) {
        self.root.query(results, bbox);
    }

    /// Ids of items overlapping `bbox`
    pub fn items_in_bbox(&self, bbox: &BoundingBox) -> HashSet<ItemId> {
        let mut results = HashSet::new();
        self.query(&mut results, bbox);
        results
    }

    /// Append ids of items overlapping `bbox`, once per octant holding them
    pub fn query_list(&self, results: &mut Vec<ItemId>, bbox: &BoundingBox) {
        self.root.query_list(results, bbox);
    }

    /// Visit every record in terminal nodes overlapping `bbox`
    pub fn visit<F>(&self, bbox: &BoundingBox, mut visitor: F)
    where
        F: FnMut(&ItemRecord),
    {
        self.root.visit(bbox, &mut visitor);
    }

    /// Number of subdivision levels below the root
    pub fn depth(&self) -> u32 {
        self.root.height()
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    /// Number of terminal nodes
    pub fn leaf_count(&self) -> usize {
        self.get_all_leaves().len()
    }

    /// Stored records, counting duplicates across octants
    pub fn record_count(&self) -> usize {
        self.root.count_records()
    }

    /// Get all terminal nodes
    pub fn get_all_leaves(&self) -> Vec<&OctreeNode> {
        let mut leaves = Vec::new();
        self.root.get_all_leaves(&mut leaves);
        leaves
    }

    /// Get all nodes at a specific depth
    pub fn get_nodes_at_depth(&self, depth: u32) -> Vec<&OctreeNode> {
        let mut nodes = Vec::new();
        self.root.get_nodes_at_depth(depth, &mut nodes);
        nodes
    }

    /// Drop every record and node, keeping the root extent
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.origin(), self.root.edge_length());
    }
}
