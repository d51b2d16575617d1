//! Spatial indexing for connectivity range queries
//!
//! One R-tree per query category, bulk-loaded from the board. The index only
//! stores object references and envelopes, so flag changes on the board
//! during a scan never invalidate it.

use super::data::Board;
use super::types::{BoundingBox, ObjectRef, Side};
use rstar::{RTree, RTreeObject, AABB};

/// Which family of objects a range query visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexCategory {
    Lines(usize),
    Arcs(usize),
    Polygons(usize),
    Pads(Side),
    PinsVias,
    Rats,
}

/// Range-query collaborator of the connectivity engine
pub trait SpatialIndex: Sync {
    /// Invoke `visitor` once per object of `category` whose bounding box
    /// overlaps `bounds`
    fn range_query(
        &self,
        category: IndexCategory,
        bounds: &BoundingBox,
        visitor: &mut dyn FnMut(ObjectRef),
    );
}

/// Object wrapper for R-tree spatial indexing
#[derive(Clone, Debug)]
pub struct IndexEntry {
    pub object: ObjectRef,
    pub envelope: AABB<[f64; 2]>,
}

impl IndexEntry {
    pub fn new(object: ObjectRef, bbox: BoundingBox) -> Self {
        let envelope = AABB::from_corners(
            [bbox.x1 as f64, bbox.y1 as f64],
            [bbox.x2 as f64, bbox.y2 as f64],
        );
        Self { object, envelope }
    }
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree index over every searchable object of a board
#[derive(Default)]
pub struct BoardIndex {
    lines: Vec<RTree<IndexEntry>>,
    arcs: Vec<RTree<IndexEntry>>,
    polygons: Vec<RTree<IndexEntry>>,
    pads: [RTree<IndexEntry>; 2],
    pins_vias: RTree<IndexEntry>,
    rats: RTree<IndexEntry>,
}

impl BoardIndex {
    pub fn build(board: &Board) -> Self {
        let start = std::time::Instant::now();
        let entries = |refs: Vec<ObjectRef>| -> RTree<IndexEntry> {
            let items: Vec<IndexEntry> = refs
                .into_iter()
                .filter_map(|object| {
                    board
                        .shape(object)
                        .map(|shape| IndexEntry::new(object, shape.bounding_box()))
                })
                .collect();
            RTree::bulk_load(items)
        };

        let mut lines = Vec::with_capacity(board.layers.len());
        let mut arcs = Vec::with_capacity(board.layers.len());
        let mut polygons = Vec::with_capacity(board.layers.len());
        for (layer, data) in board.layers.iter().enumerate() {
            lines.push(entries(
                (0..data.lines.len()).map(|index| ObjectRef::Line { layer, index }).collect(),
            ));
            arcs.push(entries(
                (0..data.arcs.len()).map(|index| ObjectRef::Arc { layer, index }).collect(),
            ));
            polygons.push(entries(
                (0..data.polygons.len()).map(|index| ObjectRef::Polygon { layer, index }).collect(),
            ));
        }
        let pads = Side::ALL.map(|side| entries(board.pads_on(side).map(ObjectRef::from).collect()));
        let pins_vias = entries(board.pins_and_vias().map(ObjectRef::from).collect());
        let rats = entries((0..board.rats.len()).map(ObjectRef::Rat).collect());

        let index = Self { lines, arcs, polygons, pads, pins_vias, rats };
        tracing::debug!(
            "[Index] Built spatial index for '{}': {} entries in {:.2?}",
            board.name,
            index.len(),
            start.elapsed()
        );
        index
    }

    fn tree(&self, category: IndexCategory) -> Option<&RTree<IndexEntry>> {
        match category {
            IndexCategory::Lines(layer) => self.lines.get(layer),
            IndexCategory::Arcs(layer) => self.arcs.get(layer),
            IndexCategory::Polygons(layer) => self.polygons.get(layer),
            IndexCategory::Pads(side) => Some(&self.pads[side.index()]),
            IndexCategory::PinsVias => Some(&self.pins_vias),
            IndexCategory::Rats => Some(&self.rats),
        }
    }

    /// Total number of indexed objects
    pub fn len(&self) -> usize {
        self.lines
            .iter()
            .chain(&self.arcs)
            .chain(&self.polygons)
            .chain(&self.pads)
            .map(|tree| tree.size())
            .sum::<usize>()
            + self.pins_vias.size()
            + self.rats.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpatialIndex for BoardIndex {
    fn range_query(
        &self,
        category: IndexCategory,
        bounds: &BoundingBox,
        visitor: &mut dyn FnMut(ObjectRef),
    ) {
        let Some(tree) = self.tree(category) else {
            tracing::error!("[Index] No tree for {:?}", category);
            return;
        };
        let search = AABB::from_corners(
            [bounds.x1 as f64, bounds.y1 as f64],
            [bounds.x2 as f64, bounds.y2 as f64],
        );
        for entry in tree.locate_in_envelope_intersecting(&search) {
            visitor(entry.object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{LayerStack, Line, Point, Via};

    #[test]
    fn test_range_query_per_layer() {
        let mut board = Board::new("index", LayerStack::two_layer());
        let top = board
            .add_line(0, Line::new(Point::new(0, 0), Point::new(100, 0), 10, 0))
            .unwrap();
        board
            .add_line(1, Line::new(Point::new(0, 0), Point::new(100, 0), 10, 0))
            .unwrap();
        let via = board.add_via(Via::new(Point::new(5000, 5000), 100, 10, 50)).unwrap();
        let index = BoardIndex::build(&board);
        assert_eq!(index.len(), 3);

        let mut hits = Vec::new();
        index.range_query(IndexCategory::Lines(0), &BoundingBox::new(50, -1, 60, 1), &mut |o| {
            hits.push(o)
        });
        assert_eq!(hits, vec![top]);

        hits.clear();
        index.range_query(IndexCategory::PinsVias, &BoundingBox::around(Point::new(5000, 5000), 1), &mut |o| {
            hits.push(o)
        });
        assert_eq!(hits, vec![via]);

        hits.clear();
        index.range_query(IndexCategory::Lines(7), &BoundingBox::new(0, 0, 1, 1), &mut |o| hits.push(o));
        assert!(hits.is_empty());
    }
}
