//! Abstract localizer interface
//!
//! A localizer partitions space so that items overlapping a region can be
//! found without testing every item. Owning domains talk to this trait, which
//! lets them swap the octree for another scheme.

use std::collections::HashSet;

use crate::error::OctreeError;
use crate::spatial::{BoundingBox, ItemId, ItemRecord, Octree};

/// Spatial lookup of items by bounding box
pub trait Localizer {
    /// Insert an item with its bounding box
    fn insert(&mut self, item: ItemId, bbox: BoundingBox) -> Result<(), OctreeError>;

    /// Remove an item inserted with `bbox`; returns whether it was found
    ///
    /// Fails on an empty box, like `insert`.
    fn remove(&mut self, item: ItemId, bbox: &BoundingBox) -> Result<bool, OctreeError>;

    /// Add ids of items whose box overlaps `bbox` to `results`
    fn query(&self, results: &mut HashSet<ItemId>, bbox: &BoundingBox);

    /// Call `visitor` on candidate records near `bbox`
    ///
    /// Candidates may include items whose own box misses `bbox`; the
    /// visitor does the exact test.
    fn evaluate(&self, bbox: &BoundingBox, visitor: &mut dyn FnMut(&ItemRecord));

    /// Ids of items whose box overlaps `bbox`
    fn items_in_bbox(&self, bbox: &BoundingBox) -> HashSet<ItemId> {
        let mut results = HashSet::new();
        self.query(&mut results, bbox);
        results
    }
}

impl Localizer for Octree {
    fn insert(&mut self, item: ItemId, bbox: BoundingBox) -> Result<(), OctreeError> {
        Octree::insert(self, item, bbox)
    }

    fn remove(&mut self, item: ItemId, bbox: &BoundingBox) -> Result<bool, OctreeError> {
        Octree::remove(self, item, bbox)
    }

    fn query(&self, results: &mut HashSet<ItemId>, bbox: &BoundingBox) {
        Octree::query(self, results, bbox);
    }

    fn evaluate(&self, bbox: &BoundingBox, visitor: &mut dyn FnMut(&ItemRecord)) {
        self.visit(bbox, visitor);
    }
}

/// Localizer testing every stored record
///
/// Useful for small item sets and as a reference for the octree.
#[derive(Debug, Clone, Default)]
pub struct LinearLocalizer {
    records: Vec<ItemRecord>,
}

impl LinearLocalizer {
    /// Create an empty localizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Localizer for LinearLocalizer {
    fn insert(&mut self, item: ItemId, bbox: BoundingBox) -> Result<(), OctreeError> {
        if bbox.is_empty() {
            return Err(OctreeError::EmptyBoundingBox);
        }
        self.records.push(ItemRecord { id: item, bbox });
        Ok(())
    }

    fn remove(&mut self, item: ItemId, bbox: &BoundingBox) -> Result<bool, OctreeError> {
        if bbox.is_empty() {
            return Err(OctreeError::EmptyBoundingBox);
        }
        let before = self.records.len();
        self.records.retain(|record| record.id != item);
        Ok(self.records.len() != before)
    }

    fn query(&self, results: &mut HashSet<ItemId>, bbox: &BoundingBox) {
        results.extend(
            self.records
                .iter()
                .filter(|record| record.bbox.overlaps(bbox))
                .map(|record| record.id),
        );
    }

    fn evaluate(&self, bbox: &BoundingBox, visitor: &mut dyn FnMut(&ItemRecord)) {
        self.records
            .iter()
            .filter(|record| record.bbox.overlaps(bbox))
            .for_each(visitor);
    }
}
