/// Spatial index: uniform-grid broad phase over tagged static obstacles.
///
/// Every obstacle is bucketed into each grid cell its bounds touch.
/// A query walks only the cells covered by the candidate shape, so the
/// cost depends on the size of the mover, not on the size of the tower.
/// The obstacle set is static within an attempt; there is no rebalancing.

use std::collections::HashMap;

use super::geom::{Contact, Rect, Shape, Vec2};
use super::tile::{TagSet, Terrain};

pub type ObstacleId = usize;

/// Which map layer an obstacle was read from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Layer {
    Floor,
    Walls,
    Invisible,
    Decoration,
    Entities,
}

#[derive(Clone, Debug)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub shape: Shape,
    pub tags: TagSet,
    pub layer: Layer,
}

impl Obstacle {
    pub fn has(&self, t: Terrain) -> bool {
        self.tags.contains(t)
    }

    pub fn primary(&self) -> Option<Terrain> {
        self.tags.primary()
    }
}

pub struct SpatialIndex {
    cell: f64,
    buckets: HashMap<(i32, i32), Vec<ObstacleId>>,
    obstacles: Vec<Option<Obstacle>>,
    live: usize,
}

impl SpatialIndex {
    pub fn new(cell_size: f64) -> Self {
        SpatialIndex {
            cell: cell_size.max(1.0),
            buckets: HashMap::new(),
            obstacles: Vec::new(),
            live: 0,
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn insert(&mut self, shape: Shape, tags: TagSet, layer: Layer) -> ObstacleId {
        let id = self.obstacles.len();
        for key in self.cells_of(&shape.bounds()) {
            self.buckets.entry(key).or_default().push(id);
        }
        self.obstacles.push(Some(Obstacle { id, shape, tags, layer }));
        self.live += 1;
        id
    }

    /// Remove an obstacle. Ids are never reused.
    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let ob = self.obstacles.get_mut(id)?.take()?;
        for key in self.cells_of(&ob.shape.bounds()) {
            if let Some(ids) = self.buckets.get_mut(&key) {
                ids.retain(|&i| i != id);
            }
        }
        self.live -= 1;
        Some(ob)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.obstacles.clear();
        self.live = 0;
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id).and_then(|o| o.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter().flatten()
    }

    /// Broad phase: obstacles sharing a cell with `shape` moved by
    /// `(dx, dy)`, restricted to `filter`. Ascending id, no duplicates.
    pub fn candidates(&self, shape: &Shape, dx: f64, dy: f64, filter: TagSet) -> Vec<&Obstacle> {
        let bounds = shape.translated(dx, dy).bounds();
        let mut ids: Vec<ObstacleId> = self.cells_of(&bounds)
            .filter_map(|key| self.buckets.get(&key))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter()
            .filter_map(|id| self.get(id))
            .filter(|o| filter.matches(o.tags))
            .collect()
    }

    /// Narrow phase: obstacles that `shape` would overlap after moving by
    /// `(dx, dy)`, with the contact for each.
    pub fn query(&self, shape: &Shape, dx: f64, dy: f64, filter: TagSet) -> Vec<(&Obstacle, Contact)> {
        self.candidates(shape, dx, dy, filter)
            .into_iter()
            .filter_map(|o| shape.intersect(dx, dy, &o.shape).map(|c| (o, c)))
            .collect()
    }

    /// Obstacles whose shape contains the point (renderer lookups).
    pub fn obstacles_at(&self, p: Vec2) -> impl Iterator<Item = &Obstacle> {
        let key = self.cell_key(p.x, p.y);
        self.buckets.get(&key)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.get(id))
            .filter(move |o| o.shape.contains_point(p))
    }

    // ── Internal ──

    fn cell_key(&self, x: f64, y: f64) -> (i32, i32) {
        ((x / self.cell).floor() as i32, (y / self.cell).floor() as i32)
    }

    fn cells_of(&self, r: &Rect) -> impl Iterator<Item = (i32, i32)> {
        let (x0, y0) = self.cell_key(r.x, r.y);
        let (x1, y1) = self.cell_key(r.right(), r.bottom());
        (y0..=y1).flat_map(move |cy| (x0..=x1).map(move |cx| (cx, cy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(space: &mut SpatialIndex, col: i32, row: i32, t: Terrain) -> ObstacleId {
        space.insert(
            Shape::rect(col as f64 * 16.0, row as f64 * 16.0, 16.0, 16.0),
            TagSet::of(&[t]),
            Layer::Floor,
        )
    }

    #[test]
    fn query_respects_displacement_and_filter() {
        let mut s = SpatialIndex::new(16.0);
        let wall = tile(&mut s, 1, 0, Terrain::Wall);
        tile(&mut s, 0, 1, Terrain::Chasm);

        let actor = Shape::rect(4.0, 4.0, 8.0, 8.0);
        assert!(s.query(&actor, 0.0, 0.0, TagSet::EMPTY).is_empty());

        let hits = s.query(&actor, 6.0, 0.0, TagSet::of(&[Terrain::Wall]));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, wall);

        // moving down hits the chasm, but not through a wall-only filter
        assert!(s.query(&actor, 0.0, 6.0, TagSet::of(&[Terrain::Wall])).is_empty());
        assert_eq!(s.query(&actor, 0.0, 6.0, TagSet::EMPTY).len(), 1);
    }

    #[test]
    fn obstacles_spanning_cells_are_reported_once() {
        let mut s = SpatialIndex::new(16.0);
        let big = s.insert(
            Shape::rect(0.0, 0.0, 64.0, 64.0),
            TagSet::of(&[Terrain::Wall]),
            Layer::Walls,
        );
        let actor = Shape::rect(10.0, 10.0, 30.0, 30.0);
        let hits = s.query(&actor, 0.0, 0.0, TagSet::EMPTY);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, big);
    }

    #[test]
    fn zero_size_shapes_never_hit() {
        let mut s = SpatialIndex::new(16.0);
        tile(&mut s, 0, 0, Terrain::Wall);
        s.insert(Shape::rect(4.0, 4.0, 0.0, 0.0), TagSet::of(&[Terrain::Finish]), Layer::Entities);
        s.insert(Shape::Marker(Vec2::new(6.0, 6.0)), TagSet::of(&[Terrain::Finish]), Layer::Entities);

        let actor = Shape::rect(2.0, 2.0, 8.0, 8.0);
        let hits = s.query(&actor, 0.0, 0.0, TagSet::EMPTY);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].0.has(Terrain::Wall));

        let nothing = Shape::rect(2.0, 2.0, 0.0, 0.0);
        assert!(s.query(&nothing, 0.0, 0.0, TagSet::EMPTY).is_empty());
        // the broad phase still sees the markers
        assert_eq!(s.candidates(&actor, 0.0, 0.0, TagSet::of(&[Terrain::Finish])).len(), 2);
    }

    #[test]
    fn remove_drops_from_queries() {
        let mut s = SpatialIndex::new(16.0);
        let id = tile(&mut s, 0, 0, Terrain::Wall);
        assert_eq!(s.len(), 1);
        assert!(s.remove(id).is_some());
        assert!(s.remove(id).is_none());
        assert_eq!(s.len(), 0);
        let actor = Shape::rect(0.0, 0.0, 8.0, 8.0);
        assert!(s.query(&actor, 0.0, 0.0, TagSet::EMPTY).is_empty());
    }

    #[test]
    fn point_lookup_finds_the_tile() {
        let mut s = SpatialIndex::new(16.0);
        tile(&mut s, 2, 3, Terrain::Slippery);
        let found: Vec<_> = s.obstacles_at(Vec2::new(40.0, 50.0)).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].primary(), Some(Terrain::Slippery));
        assert_eq!(s.obstacles_at(Vec2::new(10.0, 10.0)).count(), 0);
    }
}
