//! End-to-end scenarios for the octree, checked against a linear scan

use std::collections::HashSet;

use crate::error::{ErrorKind, OctreeError};
use crate::foundation::logging;
use crate::foundation::math::Vec3;
use crate::spatial::{
    BoundingBox, ItemId, LinearLocalizer, Localizer, Octree, OctreeConfig, DEFAULT_REFINE_LIMIT,
};

/// Small deterministic generator so scenarios are reproducible
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_box(&mut self, domain: f64, max_size: f64) -> BoundingBox {
        let min = Vec3::new(
            self.next_f64() * domain,
            self.next_f64() * domain,
            self.next_f64() * domain,
        );
        let size = Vec3::new(
            self.next_f64() * max_size,
            self.next_f64() * max_size,
            self.next_f64() * max_size,
        );
        BoundingBox::new(min, min + size)
    }
}

fn bbox(min: [f64; 3], max: [f64; 3]) -> BoundingBox {
    BoundingBox::new(Vec3::from(min), Vec3::from(max))
}

fn populated(count: usize, seed: u64) -> (Octree, LinearLocalizer, Vec<BoundingBox>) {
    logging::init();
    let mut rng = Lcg(seed);
    let mut octree = Octree::new(Vec3::zeros(), 100.0, OctreeConfig::default()).unwrap();
    let mut linear = LinearLocalizer::new();
    let mut boxes = Vec::with_capacity(count);
    for id in 0..count {
        let item_box = rng.next_box(95.0, 5.0);
        octree.insert(id, item_box).unwrap();
        Localizer::insert(&mut linear, id, item_box).unwrap();
        boxes.push(item_box);
    }
    (octree, linear, boxes)
}

#[test]
fn test_every_item_found_by_its_own_box() {
    let (octree, _, boxes) = populated(3000, 7);
    assert!(octree.depth() >= 1);

    for (id, item_box) in boxes.iter().enumerate() {
        let hits = octree.items_in_bbox(item_box);
        assert!(hits.contains(&id), "item {id} missing from query by its own box");
    }
}

#[test]
fn test_queries_match_linear_scan() {
    let (octree, linear, _) = populated(2500, 42);
    let mut rng = Lcg(1234);

    for _ in 0..200 {
        let query = rng.next_box(100.0, 20.0);
        assert_eq!(octree.items_in_bbox(&query), linear.items_in_bbox(&query));
    }
}

#[test]
fn test_disjoint_query_is_empty() {
    let (octree, _, _) = populated(1000, 3);
    // Items live in [0, 100]^3; this box is far outside
    let far = bbox([200.0, 200.0, 200.0], [210.0, 210.0, 210.0]);
    assert!(octree.items_in_bbox(&far).is_empty());

    // Inside the root extent but away from every item
    let mut octree = Octree::new(Vec3::zeros(), 100.0, OctreeConfig::default()).unwrap();
    for id in 0..(2 * DEFAULT_REFINE_LIMIT) {
        let x = (id % 40) as f64;
        octree.insert(id, bbox([x, 0.0, 0.0], [x + 0.5, 1.0, 1.0])).unwrap();
    }
    assert!(octree.items_in_bbox(&bbox([60.0, 60.0, 60.0], [90.0, 90.0, 90.0])).is_empty());
}

#[test]
fn test_shared_face_counts_as_overlap_in_queries() {
    let mut octree = Octree::new(Vec3::zeros(), 100.0, OctreeConfig::default()).unwrap();
    octree.insert(4, bbox([10.0, 10.0, 10.0], [20.0, 20.0, 20.0])).unwrap();

    let touching = bbox([20.0, 12.0, 12.0], [30.0, 18.0, 18.0]);
    assert_eq!(octree.items_in_bbox(&touching), HashSet::from([4]));
}

#[test]
fn test_removal_matches_linear_scan() {
    let (mut octree, mut linear, boxes) = populated(1500, 99);
    for id in (0..boxes.len()).step_by(3) {
        assert!(octree.remove(id, &boxes[id]).unwrap());
        assert!(Localizer::remove(&mut linear, id, &boxes[id]).unwrap());
    }

    let mut rng = Lcg(5);
    for _ in 0..100 {
        let query = rng.next_box(100.0, 25.0);
        let found = octree.items_in_bbox(&query);
        assert!(found.iter().all(|id| id % 3 != 0));
        assert_eq!(found, linear.items_in_bbox(&query));
    }
}

#[test]
fn test_bulk_load_failure_leaves_prefix() {
    logging::init();
    let vertices = [
        [10.0, 10.0, 10.0],
        [12.0, 10.0, 10.0],
        [10.0, 12.0, 10.0],
        [10.0, 10.0, 12.0],
    ];
    // triangle, tetrahedron, then an unknown code at element offset 9
    let cells = [5, 0, 1, 2, 10, 0, 1, 2, 3, 77, 0, 1, 2];
    let id_offset: ItemId = 100;

    let mut octree = Octree::new(Vec3::zeros(), 100.0, OctreeConfig::default()).unwrap();
    let err = octree.insert_cell_array_chunk(&vertices, &cells, id_offset).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    assert_eq!(
        err,
        OctreeError::UnsupportedCellType { code: 77, cell_id: id_offset + 2, offset: 9 }
    );
    let hits = octree.items_in_bbox(&bbox([10.0, 10.0, 10.0], [11.0, 11.0, 11.0]));
    assert_eq!(hits, HashSet::from([100, 101]));
}
