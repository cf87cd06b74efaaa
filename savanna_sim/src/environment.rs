// Environment coordinator.
//
// Owns everything the agents share: the walkable grid (terrain walkability
// with scenery stamped in at init), the derived lookup tables, and the two
// spatial indexes (fauna for animals, flora for plants). Built once from
// `TerrainData` and a config; the tables never change afterward, only the
// index contents do.
//
// Two tables make per-tick sensing cheap:
//   - `walkable_neighbours`: the walkable 8-neighbours of every tile,
//     precomputed so the random walks never re-test bounds or walkability.
//   - `closest_visible_water`: for every tile, the nearest shoreline tile
//     within the maximum view radius that has line of sight, or the invalid
//     sentinel. Built by scanning a single ascending-distance offset list so
//     the first hit is the nearest; tiles are independent, so the build is
//     parallelized with rayon.
//
// `sense` is the agents' whole perception: nearest visible plant from the
// flora index plus the water table entry for the current tile.
//
// See also: `map.rs` for the index, `pathfinding.rs` for the path/LOS
// primitives this wraps, `animal.rs` for the consumer.
//
// **Critical constraint: determinism.** Scenery placement draws from the
// caller's seeded rng in fixed tile order; the water-table build is
// parallel but writes are per-tile pure functions of the static grids.

use crate::config::{SimConfig, WanderParams};
use crate::map::{MapEntry, SpatialMap};
use crate::pathfinding;
use crate::terrain::TerrainData;
use crate::types::{Coord, EntityId, Species};
use rayon::prelude::*;
use savanna_prng::GameRng;
use smallvec::SmallVec;
use thiserror::Error;

/// Errors raised while building the environment. Setup aborts on these;
/// there is no degraded mode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("region size must be at least 1")]
    InvalidRegionSize,
    #[error("terrain has no walkable tiles after scenery placement")]
    NoWalkableTiles,
}

/// What an agent perceives from its tile. Recomputed on every decision,
/// never stored.
#[derive(Clone, Copy, Debug)]
pub struct Surroundings {
    /// Nearest visible plant within view, if any.
    pub food: Option<MapEntry>,
    /// Nearest visible shoreline tile, or `Coord::INVALID`.
    pub water: Coord,
}

#[derive(Debug)]
pub struct Environment {
    size: usize,
    walkable: Vec<bool>,
    tile_centres: Vec<[f32; 3]>,
    walkable_neighbours: Vec<SmallVec<[Coord; 8]>>,
    closest_visible_water: Vec<Coord>,
    /// Every walkable tile, in scan order. Spawn placement draws from this.
    walkable_tiles: Vec<Coord>,
    fauna: SpatialMap,
    flora: SpatialMap,
}

impl Environment {
    /// Build the environment from terrain grids: stamp scenery, derive the
    /// lookup tables, and construct the spatial indexes.
    pub fn new(
        terrain: TerrainData,
        config: &SimConfig,
        rng: &mut GameRng,
    ) -> Result<Self, EnvironmentError> {
        if config.region_size == 0 {
            return Err(EnvironmentError::InvalidRegionSize);
        }

        let size = terrain.size;
        let mut walkable = terrain.walkable;

        // Scenery permanently blocks tiles. Fixed scan order keeps the rng
        // stream reproducible.
        if config.scenery_probability > 0.0 {
            for tile in walkable.iter_mut() {
                if *tile && rng.random_bool(config.scenery_probability) {
                    *tile = false;
                }
            }
        }

        let mut walkable_tiles = Vec::new();
        for y in 0..size {
            for x in 0..size {
                if walkable[x + y * size] {
                    walkable_tiles.push(Coord::new(x as i32, y as i32));
                }
            }
        }
        if walkable_tiles.is_empty() {
            return Err(EnvironmentError::NoWalkableTiles);
        }

        let walkable_neighbours = build_neighbour_table(size, &walkable);
        let closest_visible_water = build_water_table(
            size,
            &walkable,
            &terrain.shore,
            config.max_view_distance(),
        );

        log::info!(
            "environment ready: {size}x{size} grid, {} walkable tiles, {} shore tiles",
            walkable_tiles.len(),
            terrain.shore.iter().filter(|&&s| s).count()
        );

        Ok(Self {
            size,
            walkable,
            tile_centres: terrain.tile_centres,
            walkable_neighbours,
            closest_visible_water,
            walkable_tiles,
            fauna: SpatialMap::new(size, config.region_size),
            flora: SpatialMap::new(size, config.region_size),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn walkable_tiles(&self) -> &[Coord] {
        &self.walkable_tiles
    }

    pub fn is_walkable(&self, coord: Coord) -> bool {
        self.in_bounds(coord) && self.walkable[self.index(coord)]
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.size
            && (coord.y as usize) < self.size
    }

    /// World-space centre of an in-bounds tile.
    pub fn tile_centre(&self, coord: Coord) -> [f32; 3] {
        self.tile_centres[self.index(coord)]
    }

    fn index(&self, coord: Coord) -> usize {
        debug_assert!(self.in_bounds(coord));
        coord.x as usize + coord.y as usize * self.size
    }

    // -----------------------------------------------------------------------
    // Entity registration
    // -----------------------------------------------------------------------

    pub fn register_spawn(&mut self, id: EntityId, species: Species, coord: Coord) {
        if species.is_fauna() {
            self.fauna.add(id, coord);
        } else {
            self.flora.add(id, coord);
        }
    }

    /// An animal finished a tile hop.
    pub fn register_move(&mut self, id: EntityId, from: Coord, to: Coord) {
        self.fauna.move_entity(id, from, to);
    }

    /// An animal died. Its body lingers (decay), but it leaves the index
    /// immediately so nothing can sense it.
    pub fn register_death(&mut self, id: EntityId, coord: Coord) {
        self.fauna.remove(id, coord);
    }

    /// A plant was consumed to exhaustion. Removed immediately so no later
    /// food search this tick can target it.
    pub fn register_plant_death(&mut self, id: EntityId, coord: Coord) {
        self.flora.remove(id, coord);
    }

    #[cfg(test)]
    pub(crate) fn fauna_len(&self) -> usize {
        self.fauna.len()
    }

    // -----------------------------------------------------------------------
    // Sensing
    // -----------------------------------------------------------------------

    /// Perceive the surroundings of `coord`: nearest visible plant within
    /// `view_distance`, and the precomputed nearest visible water (an O(1)
    /// table lookup).
    pub fn sense(&self, coord: Coord, view_distance: f32) -> Surroundings {
        let food = self.flora.closest_entity(coord, view_distance, |from, to| {
            pathfinding::tile_is_visible(self.size, &self.walkable, from, to)
        });
        Surroundings {
            food,
            water: self.closest_visible_water[self.index(coord)],
        }
    }

    pub fn tile_is_visible(&self, from: Coord, to: Coord) -> bool {
        pathfinding::tile_is_visible(self.size, &self.walkable, from, to)
    }

    pub fn find_path(&self, from: Coord, to: Coord) -> Option<Vec<Coord>> {
        pathfinding::find_path(self.size, &self.walkable, from, to)
    }

    // -----------------------------------------------------------------------
    // Random walks
    // -----------------------------------------------------------------------

    /// Uniform choice among the walkable neighbours of `coord`. An isolated
    /// tile returns `coord` itself.
    pub fn next_tile_random(&self, coord: Coord, rng: &mut GameRng) -> Coord {
        let neighbours = &self.walkable_neighbours[self.index(coord)];
        if neighbours.is_empty() {
            return coord;
        }
        *rng.pick(neighbours)
    }

    /// Forward-biased random walk step.
    ///
    /// With no heading (`previous == coord`) this is the uniform walk. With
    /// a heading, the mirrored forward tile is taken outright with the
    /// configured probability when it is in-bounds and walkable; otherwise
    /// a handful of uniform candidate draws are scored by alignment with
    /// the heading and the best one wins.
    pub fn next_tile_weighted(
        &self,
        coord: Coord,
        previous: Coord,
        params: &WanderParams,
        rng: &mut GameRng,
    ) -> Coord {
        if previous == coord {
            return self.next_tile_random(coord, rng);
        }

        let forward = coord - previous;
        let forward_tile = coord + forward;
        if self.in_bounds(forward_tile)
            && self.walkable[self.index(forward_tile)]
            && rng.random_bool(params.forward_probability)
        {
            return forward_tile;
        }

        let neighbours = &self.walkable_neighbours[self.index(coord)];
        if neighbours.is_empty() {
            return coord;
        }

        let forward_len = ((forward.x * forward.x + forward.y * forward.y) as f32).sqrt();
        let forward_dir = [forward.x as f32 / forward_len, forward.y as f32 / forward_len];

        let mut best = coord;
        let mut best_score = f32::MIN;
        for _ in 0..params.weighting_iterations {
            let candidate = *rng.pick(neighbours);
            let offset = candidate - coord;
            let len = ((offset.x * offset.x + offset.y * offset.y) as f32).sqrt();
            // Alignment with the heading: +1 straight ahead, -1 straight back.
            let score =
                (offset.x as f32 / len) * forward_dir[0] + (offset.y as f32 / len) * forward_dir[1];
            if score > best_score {
                best_score = score;
                best = candidate;
            }
        }
        best
    }
}

/// Walkable 8-neighbours of every tile, in fixed offset order.
fn build_neighbour_table(size: usize, walkable: &[bool]) -> Vec<SmallVec<[Coord; 8]>> {
    let mut table = Vec::with_capacity(size * size);
    for y in 0..size as i32 {
        for x in 0..size as i32 {
            let coord = Coord::new(x, y);
            let mut neighbours = SmallVec::new();
            for offset in pathfinding::NEIGHBOUR_OFFSETS {
                let n = coord + offset;
                if n.x >= 0
                    && n.y >= 0
                    && (n.x as usize) < size
                    && (n.y as usize) < size
                    && walkable[n.x as usize + n.y as usize * size]
                {
                    neighbours.push(n);
                }
            }
            table.push(neighbours);
        }
    }
    table
}

/// Nearest visible shoreline tile per tile, or `Coord::INVALID`.
///
/// Offsets within the view radius are sorted ascending by squared distance
/// once, so the per-tile scan can stop at the first shore hit. Each tile's
/// entry depends only on the static grids, so tiles are computed in
/// parallel.
fn build_water_table(
    size: usize,
    walkable: &[bool],
    shore: &[bool],
    max_view_distance: i32,
) -> Vec<Coord> {
    let view = max_view_distance.max(0);
    let sqr_view = view * view;
    let mut offsets: Vec<Coord> = Vec::new();
    for oy in -view..=view {
        for ox in -view..=view {
            if ox * ox + oy * oy <= sqr_view {
                offsets.push(Coord::new(ox, oy));
            }
        }
    }
    // Ties break on (y, x) so the table is independent of build order.
    offsets.sort_by_key(|o| (o.x * o.x + o.y * o.y, o.y, o.x));

    (0..size * size)
        .into_par_iter()
        .map(|idx| {
            let tile = Coord::new((idx % size) as i32, (idx / size) as i32);
            for &offset in &offsets {
                let candidate = tile + offset;
                if candidate.x < 0
                    || candidate.y < 0
                    || candidate.x as usize >= size
                    || candidate.y as usize >= size
                {
                    continue;
                }
                let cidx = candidate.x as usize + candidate.y as usize * size;
                if shore[cidx] && pathfinding::tile_is_visible(size, walkable, tile, candidate) {
                    return candidate;
                }
            }
            Coord::INVALID
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::terrain::TerrainData;

    fn env_with(terrain: TerrainData, config: &SimConfig) -> Environment {
        let mut rng = GameRng::new(1);
        Environment::new(terrain, config, &mut rng).unwrap()
    }

    fn flat_env(size: usize) -> Environment {
        env_with(TerrainData::flat(size).unwrap(), &SimConfig::default())
    }

    #[test]
    fn zero_region_size_aborts_setup() {
        let mut config = SimConfig::default();
        config.region_size = 0;
        let mut rng = GameRng::new(1);
        assert_eq!(
            Environment::new(TerrainData::flat(10).unwrap(), &config, &mut rng).unwrap_err(),
            EnvironmentError::InvalidRegionSize
        );
    }

    #[test]
    fn full_scenery_leaves_no_walkable_tiles() {
        let mut config = SimConfig::default();
        config.scenery_probability = 1.0;
        let mut rng = GameRng::new(1);
        assert_eq!(
            Environment::new(TerrainData::flat(10).unwrap(), &config, &mut rng).unwrap_err(),
            EnvironmentError::NoWalkableTiles
        );
    }

    #[test]
    fn corner_tile_has_three_walkable_neighbours() {
        let env = flat_env(8);
        assert_eq!(env.walkable_neighbours[0].len(), 3);
        // Interior tile has all eight.
        assert_eq!(env.walkable_neighbours[3 + 3 * 8].len(), 8);
    }

    #[test]
    fn random_walk_returns_adjacent_walkable_tile() {
        let env = flat_env(8);
        let mut rng = GameRng::new(7);
        for _ in 0..50 {
            let next = env.next_tile_random(Coord::new(4, 4), &mut rng);
            assert!(Coord::are_neighbours(Coord::new(4, 4), next));
            assert_ne!(next, Coord::new(4, 4));
            assert!(env.is_walkable(next));
        }
    }

    #[test]
    fn isolated_tile_walks_to_itself() {
        // A 3x3 pool with a dry island in the middle.
        let mut terrain = TerrainData::flat(9).unwrap();
        terrain.carve_pool(3, 3, 5, 5);
        terrain.walkable[4 + 4 * 9] = true;
        let env = env_with(terrain, &SimConfig::default());
        let mut rng = GameRng::new(7);
        assert_eq!(env.next_tile_random(Coord::new(4, 4), &mut rng), Coord::new(4, 4));
        assert_eq!(
            env.next_tile_weighted(
                Coord::new(4, 4),
                Coord::new(4, 4),
                &SimConfig::default().wander,
                &mut rng
            ),
            Coord::new(4, 4)
        );
    }

    #[test]
    fn weighted_walk_takes_forward_tile_when_certain() {
        let env = flat_env(10);
        let params = WanderParams {
            forward_probability: 1.0,
            weighting_iterations: 3,
        };
        let mut rng = GameRng::new(7);
        // Heading east from (4,5) to (5,5): forward tile is (6,5).
        let next = env.next_tile_weighted(Coord::new(5, 5), Coord::new(4, 5), &params, &mut rng);
        assert_eq!(next, Coord::new(6, 5));
    }

    #[test]
    fn weighted_walk_scores_candidates_toward_heading() {
        let env = flat_env(10);
        let params = WanderParams {
            forward_probability: 0.0,
            weighting_iterations: 8,
        };
        let mut rng = GameRng::new(3);
        // With many draws, the winner should never point straight back.
        for _ in 0..20 {
            let next =
                env.next_tile_weighted(Coord::new(5, 5), Coord::new(4, 5), &params, &mut rng);
            assert!(Coord::are_neighbours(Coord::new(5, 5), next));
            assert_ne!(next, Coord::new(4, 5), "walked straight backwards");
        }
    }

    #[test]
    fn water_table_points_to_nearest_shore() {
        let mut terrain = TerrainData::flat(20).unwrap();
        terrain.carve_pool(8, 8, 11, 11);
        let env = env_with(terrain, &SimConfig::default());

        // A tile just west of the pool sees the pool's west rim.
        let water = env.sense(Coord::new(6, 9), 10.0).water;
        assert_eq!(water, Coord::new(8, 9));
    }

    #[test]
    fn water_table_sentinel_beyond_view_radius() {
        let mut config = SimConfig::default();
        for data in config.species.values_mut() {
            data.max_view_distance = 4;
        }
        let mut terrain = TerrainData::flat(30).unwrap();
        terrain.carve_pool(0, 0, 1, 1);
        let env = env_with(terrain, &config);

        assert!(env.sense(Coord::new(2, 2), 4.0).water.is_valid());
        assert!(!env.sense(Coord::new(25, 25), 4.0).water.is_valid());
    }

    #[test]
    fn sense_finds_nearest_plant() {
        let mut env = flat_env(20);
        env.register_spawn(EntityId(1), Species::Plant, Coord::new(3, 3));
        env.register_spawn(EntityId(2), Species::Plant, Coord::new(10, 10));

        let surroundings = env.sense(Coord::new(4, 4), 10.0);
        assert_eq!(surroundings.food.unwrap().id, EntityId(1));
        assert!(!surroundings.water.is_valid());
    }

    #[test]
    fn dead_plant_disappears_from_sensing() {
        let mut env = flat_env(20);
        env.register_spawn(EntityId(1), Species::Plant, Coord::new(3, 3));
        assert!(env.sense(Coord::new(4, 4), 10.0).food.is_some());
        env.register_plant_death(EntityId(1), Coord::new(3, 3));
        assert!(env.sense(Coord::new(4, 4), 10.0).food.is_none());
    }

    #[test]
    fn animals_are_not_food() {
        let mut env = flat_env(20);
        env.register_spawn(EntityId(1), Species::Rabbit, Coord::new(3, 3));
        assert!(env.sense(Coord::new(4, 4), 10.0).food.is_none());
        assert_eq!(env.fauna_len(), 1);
    }

    #[test]
    fn scenery_blocks_line_of_sight_to_water() {
        // A wall of scenery between the tile and the pool.
        let mut terrain = TerrainData::flat(12).unwrap();
        terrain.carve_pool(0, 0, 0, 11); // west edge is water
        for y in 0..12 {
            terrain.walkable[3 + y * 12] = false; // wall at x = 3
        }
        let env = env_with(terrain, &SimConfig::default());
        assert!(!env.sense(Coord::new(6, 6), 10.0).water.is_valid());
    }
}
