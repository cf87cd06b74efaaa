// Region-partitioned spatial index.
//
// The grid is divided into `region_size × region_size` blocks, each holding
// an unordered list of the entities currently inside it. Nearby-entity
// queries only touch the regions a view radius can reach, sorted by
// distance to their closest edge, so the scan can stop as soon as the best
// hit so far is provably closer than anything a later region could hold.
//
// Membership bookkeeping is centralized in one place: the map owns a
// `BTreeMap<EntityId, Slot>` recording each member's (region, index). Removal
// is swap-with-last, and the displaced entry's slot is fixed up inside the
// same operation — the invariant "slot always matches actual position" can
// only be maintained or broken here, nowhere else.
//
// The index is generic over "anything with a stable id and a coordinate":
// it stores `(EntityId, Coord)` pairs and takes the visibility test as a
// closure, so it knows nothing about animals or plants.
//
// See also: `environment.rs` which owns the two instances (fauna, flora),
// `types.rs` for `Coord`/`EntityId`.

use crate::types::{Coord, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entity's entry in a region's collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    pub id: EntityId,
    pub coord: Coord,
}

/// Where an entity currently lives inside the index.
#[derive(Clone, Copy, Debug)]
struct Slot {
    region: usize,
    index: usize,
}

/// A fixed block of tiles and the entities inside it.
#[derive(Clone, Debug)]
struct Region {
    /// World-space centre, cached for distance-to-edge pruning.
    centre: [f32; 2],
    entries: Vec<MapEntry>,
}

/// A candidate region for a radius query, with its pruning key.
#[derive(Clone, Copy, Debug)]
struct RegionInView {
    region: usize,
    sqr_dst_to_closest_edge: f32,
}

/// Region-partitioned spatial index over one entity category.
#[derive(Clone, Debug)]
pub struct SpatialMap {
    region_size: usize,
    num_regions: usize,
    regions: Vec<Region>,
    slots: BTreeMap<EntityId, Slot>,
}

impl SpatialMap {
    /// Build an empty index covering a `size × size` tile grid.
    ///
    /// `size` and `region_size` must be positive; the environment validates
    /// its configuration before constructing the maps, so violating this is
    /// a programmer error.
    pub fn new(size: usize, region_size: usize) -> Self {
        assert!(size > 0 && region_size > 0, "SpatialMap: degenerate grid");
        let num_regions = size.div_ceil(region_size);
        let mut regions = Vec::with_capacity(num_regions * num_regions);
        for ry in 0..num_regions {
            for rx in 0..num_regions {
                let bottom_left = [(rx * region_size) as f32, (ry * region_size) as f32];
                let top_right = [
                    ((rx + 1) * region_size) as f32,
                    ((ry + 1) * region_size) as f32,
                ];
                regions.push(Region {
                    centre: [
                        (bottom_left[0] + top_right[0]) / 2.0,
                        (bottom_left[1] + top_right[1]) / 2.0,
                    ],
                    entries: Vec::new(),
                });
            }
        }
        Self {
            region_size,
            num_regions,
            regions,
            slots: BTreeMap::new(),
        }
    }

    /// Number of entities currently registered.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn region_index(&self, coord: Coord) -> usize {
        let rx = coord.x as usize / self.region_size;
        let ry = coord.y as usize / self.region_size;
        rx + ry * self.num_regions
    }

    /// Register an entity at `coord`.
    pub fn add(&mut self, id: EntityId, coord: Coord) {
        debug_assert!(
            !self.slots.contains_key(&id),
            "entity {id} added to spatial map twice"
        );
        let region = self.region_index(coord);
        let entries = &mut self.regions[region].entries;
        let index = entries.len();
        entries.push(MapEntry { id, coord });
        self.slots.insert(id, Slot { region, index });
    }

    /// Deregister an entity. O(1): swap-with-last, then fix up the slot of
    /// whichever entry was moved into the vacated position.
    pub fn remove(&mut self, id: EntityId, coord: Coord) {
        let Some(slot) = self.slots.remove(&id) else {
            debug_assert!(false, "entity {id} removed but not present");
            return;
        };
        debug_assert_eq!(slot.region, self.region_index(coord));
        let entries = &mut self.regions[slot.region].entries;
        entries.swap_remove(slot.index);
        if let Some(moved) = entries.get(slot.index) {
            // The former last entry now lives at slot.index.
            self.slots
                .get_mut(&moved.id)
                .expect("moved entry must have a slot")
                .index = slot.index;
        }
    }

    /// Relocate an entity that has arrived at a new tile.
    pub fn move_entity(&mut self, id: EntityId, from: Coord, to: Coord) {
        self.remove(id, from);
        self.add(id, to);
    }

    /// Nearest registered entity within `view_distance` of `origin` that
    /// passes the visibility test, or `None`.
    ///
    /// Candidate regions are scanned nearest-edge-first; the loop exits once
    /// the best squared distance found is no larger than the next region's
    /// closest possible edge distance. `origin` must be inside the grid.
    pub fn closest_entity(
        &self,
        origin: Coord,
        view_distance: f32,
        mut visible: impl FnMut(Coord, Coord) -> bool,
    ) -> Option<MapEntry> {
        let in_view = self.regions_in_view(origin, view_distance);
        let mut closest: Option<MapEntry> = None;
        let mut closest_sqr = view_distance * view_distance + 0.01;

        for info in in_view {
            // Regions are sorted by edge distance: nothing beyond this point
            // can beat the current best.
            if closest_sqr <= info.sqr_dst_to_closest_edge {
                break;
            }
            for entry in &self.regions[info.region].entries {
                let sqr = Coord::sqr_distance(entry.coord, origin);
                if sqr < closest_sqr && visible(origin, entry.coord) {
                    closest_sqr = sqr;
                    closest = Some(*entry);
                }
            }
        }

        closest
    }

    /// All regions whose closest edge lies within `view_distance` of
    /// `origin`, sorted nearest-edge-first.
    fn regions_in_view(&self, origin: Coord, view_distance: f32) -> Vec<RegionInView> {
        let origin_rx = origin.x / self.region_size as i32;
        let origin_ry = origin.y / self.region_size as i32;
        let sqr_view = view_distance * view_distance;
        // Measure from the origin tile's centre.
        let view_centre = [origin.x as f32 + 0.5, origin.y as f32 + 0.5];
        let half_extent = self.region_size as f32 / 2.0;

        let search_num = ((view_distance / self.region_size as f32).ceil() as i32).max(1);
        let mut in_view = Vec::new();
        for offset_y in -search_num..=search_num {
            for offset_x in -search_num..=search_num {
                let rx = origin_rx + offset_x;
                let ry = origin_ry + offset_y;
                if rx < 0
                    || ry < 0
                    || rx >= self.num_regions as i32
                    || ry >= self.num_regions as i32
                {
                    continue;
                }
                let region = rx as usize + ry as usize * self.num_regions;
                let centre = self.regions[region].centre;
                // Clamp the offset from the view centre to the region's
                // half-extent: zero when inside, edge distance otherwise.
                let ox = ((view_centre[0] - centre[0]).abs() - half_extent).max(0.0);
                let oy = ((view_centre[1] - centre[1]).abs() - half_extent).max(0.0);
                let sqr_dst = ox * ox + oy * oy;
                if sqr_dst <= sqr_view {
                    in_view.push(RegionInView {
                        region,
                        sqr_dst_to_closest_edge: sqr_dst,
                    });
                }
            }
        }

        // Stable sort keeps scan order deterministic between equal keys.
        in_view.sort_by(|a, b| {
            a.sqr_dst_to_closest_edge
                .total_cmp(&b.sqr_dst_to_closest_edge)
        });
        in_view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savanna_prng::GameRng;

    /// Check the structural invariant: every slot points at an entry with
    /// the matching id, and every entry has a slot.
    fn assert_consistent(map: &SpatialMap) {
        let mut entry_count = 0;
        for (region_idx, region) in map.regions.iter().enumerate() {
            for (index, entry) in region.entries.iter().enumerate() {
                entry_count += 1;
                let slot = map.slots.get(&entry.id).expect("entry without slot");
                assert_eq!(slot.region, region_idx, "region mismatch for {}", entry.id);
                assert_eq!(slot.index, index, "stale index for {}", entry.id);
                assert_eq!(
                    map.region_index(entry.coord),
                    region_idx,
                    "entry in wrong region for its coord"
                );
            }
        }
        assert_eq!(entry_count, map.slots.len(), "slot/entry count mismatch");
    }

    #[test]
    fn add_then_remove_round_trip() {
        let mut map = SpatialMap::new(30, 10);
        let id = EntityId(1);
        map.add(id, Coord::new(15, 22));
        assert_eq!(map.len(), 1);
        assert_consistent(&map);
        map.remove(id, Coord::new(15, 22));
        assert!(map.is_empty());
        assert_consistent(&map);
    }

    #[test]
    fn remove_of_non_last_fixes_displaced_slot() {
        let mut map = SpatialMap::new(30, 10);
        // Three entities in the same region.
        map.add(EntityId(1), Coord::new(1, 1));
        map.add(EntityId(2), Coord::new(2, 2));
        map.add(EntityId(3), Coord::new(3, 3));
        // Removing the first slot swaps EntityId(3) into its place.
        map.remove(EntityId(1), Coord::new(1, 1));
        assert_consistent(&map);
        // The displaced entity must still be findable at its coordinate.
        let found = map
            .closest_entity(Coord::new(3, 3), 1.0, |_, _| true)
            .unwrap();
        assert_eq!(found.id, EntityId(3));
    }

    #[test]
    fn move_relocates_between_regions() {
        let mut map = SpatialMap::new(30, 10);
        let id = EntityId(7);
        map.add(id, Coord::new(9, 9));
        map.move_entity(id, Coord::new(9, 9), Coord::new(10, 9));
        assert_consistent(&map);
        let found = map
            .closest_entity(Coord::new(10, 9), 0.5, |_, _| true)
            .unwrap();
        assert_eq!(found.coord, Coord::new(10, 9));
    }

    #[test]
    fn invariant_holds_under_random_operation_sequences() {
        let mut rng = GameRng::new(99);
        let size = 40;
        let mut map = SpatialMap::new(size, 7);
        // live[id] = current coord
        let mut live: Vec<Option<Coord>> = vec![None; 64];

        for _ in 0..2000 {
            let id = rng.range_usize(0, live.len());
            let coord = Coord::new(
                rng.range_usize(0, size) as i32,
                rng.range_usize(0, size) as i32,
            );
            match live[id] {
                None => {
                    map.add(EntityId(id as u64), coord);
                    live[id] = Some(coord);
                }
                Some(current) => {
                    if rng.random_bool(0.5) {
                        map.move_entity(EntityId(id as u64), current, coord);
                        live[id] = Some(coord);
                    } else {
                        map.remove(EntityId(id as u64), current);
                        live[id] = None;
                    }
                }
            }
            assert_consistent(&map);
        }
        assert_eq!(map.len(), live.iter().flatten().count());
    }

    #[test]
    fn closest_entity_matches_brute_force_oracle() {
        let mut rng = GameRng::new(4242);
        let size = 50;
        let view = 12.0;

        for round in 0..50 {
            let mut map = SpatialMap::new(size, 10);
            let n = rng.range_usize(1, 40);
            let mut placed = Vec::new();
            for i in 0..n {
                let coord = Coord::new(
                    rng.range_usize(0, size) as i32,
                    rng.range_usize(0, size) as i32,
                );
                map.add(EntityId(i as u64), coord);
                placed.push(coord);
            }
            let origin = Coord::new(
                rng.range_usize(0, size) as i32,
                rng.range_usize(0, size) as i32,
            );

            // Visibility blocks the left half of the grid; arbitrary but
            // deterministic, to exercise the filter path.
            let visible = |_from: Coord, to: Coord| to.x >= 10;

            let got = map.closest_entity(origin, view, visible);

            let oracle = placed
                .iter()
                .enumerate()
                .filter(|&(_, &c)| visible(origin, c))
                .map(|(i, &c)| (Coord::sqr_distance(c, origin), i, c))
                .filter(|&(sqr, _, _)| sqr <= view * view + 0.01)
                .min_by(|a, b| a.0.total_cmp(&b.0));

            match (got, oracle) {
                (None, None) => {}
                (Some(entry), Some((best_sqr, _, _))) => {
                    // Distances must agree; with ties, either entity is a
                    // valid nearest, so compare the metric not the id.
                    assert_eq!(
                        Coord::sqr_distance(entry.coord, origin),
                        best_sqr,
                        "round {round}: wrong nearest distance"
                    );
                }
                (got, oracle) => {
                    panic!("round {round}: index={got:?} oracle={oracle:?}")
                }
            }
        }
    }

    #[test]
    fn entities_outside_radius_are_not_returned() {
        let mut map = SpatialMap::new(100, 10);
        map.add(EntityId(1), Coord::new(90, 90));
        assert!(
            map.closest_entity(Coord::new(5, 5), 10.0, |_, _| true)
                .is_none()
        );
    }

    #[test]
    fn invisible_entities_are_skipped() {
        let mut map = SpatialMap::new(20, 10);
        map.add(EntityId(1), Coord::new(5, 5));
        map.add(EntityId(2), Coord::new(8, 8));
        // Only the farther entity is visible.
        let found = map
            .closest_entity(Coord::new(4, 4), 10.0, |_, to| to == Coord::new(8, 8))
            .unwrap();
        assert_eq!(found.id, EntityId(2));
    }

    #[test]
    fn empty_map_returns_none() {
        let map = SpatialMap::new(20, 10);
        assert!(
            map.closest_entity(Coord::new(10, 10), 5.0, |_, _| true)
                .is_none()
        );
    }
}
