// Terrain input grids.
//
// `TerrainData` is the hand-off from terrain generation: a square walkable
// grid, a shoreline grid (water tiles bordering land — the tiles animals
// drink from), and a world-space centre position per tile. The core consumes
// it once at environment construction and never mutates it afterward, except
// that scenery placement clears walkable flags before the derived tables
// are built (see `environment.rs`).
//
// Grids are stored flat, indexed `x + y * size`, the same dense layout as
// the rest of the caches. Construction validates dimensions up front:
// proceeding with mismatched grid sizes would make every later array access
// undefined, so malformed input is a hard error here and nowhere else.
//
// The `flat` builder plus `carve_pool` produce small deterministic worlds
// for tests and benches, standing in for the real generator.

use crate::types::Coord;
use thiserror::Error;

/// Errors raised while validating terrain input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerrainError {
    #[error("terrain size must be at least 1, got {0}")]
    EmptyGrid(usize),
    #[error("{field} grid has {got} entries, expected {expected} for size {size}")]
    GridSizeMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
        size: usize,
    },
}

/// Static terrain grids, produced externally and consumed once at init.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainData {
    /// Side length of the square grid, in tiles.
    pub size: usize,
    /// Walkable flag per tile. Water and void tiles are unwalkable.
    pub walkable: Vec<bool>,
    /// Shoreline flag per tile: water tiles with at least one walkable
    /// 8-neighbour. These are the drink targets.
    pub shore: Vec<bool>,
    /// World-space centre position per tile.
    pub tile_centres: Vec<[f32; 3]>,
}

impl TerrainData {
    /// Wrap pre-built grids, validating that every grid covers `size²` tiles.
    pub fn from_grids(
        size: usize,
        walkable: Vec<bool>,
        shore: Vec<bool>,
        tile_centres: Vec<[f32; 3]>,
    ) -> Result<Self, TerrainError> {
        if size == 0 {
            return Err(TerrainError::EmptyGrid(size));
        }
        let expected = size * size;
        for (field, got) in [
            ("walkable", walkable.len()),
            ("shore", shore.len()),
            ("tile_centres", tile_centres.len()),
        ] {
            if got != expected {
                return Err(TerrainError::GridSizeMismatch {
                    field,
                    expected,
                    got,
                    size,
                });
            }
        }
        Ok(Self {
            size,
            walkable,
            shore,
            tile_centres,
        })
    }

    /// A fully walkable `size × size` grid with no water. Tile centres sit
    /// at integer world positions on the ground plane.
    pub fn flat(size: usize) -> Result<Self, TerrainError> {
        if size == 0 {
            return Err(TerrainError::EmptyGrid(size));
        }
        let mut tile_centres = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                tile_centres.push([x as f32, 0.0, y as f32]);
            }
        }
        Ok(Self {
            size,
            walkable: vec![true; size * size],
            shore: vec![false; size * size],
            tile_centres,
        })
    }

    /// Turn the rectangle `[x0..=x1] × [y0..=y1]` (clipped to the grid) into
    /// water, then recompute shoreline flags for the whole grid.
    pub fn carve_pool(&mut self, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..=y1.min(self.size - 1) {
            for x in x0..=x1.min(self.size - 1) {
                self.walkable[x + y * self.size] = false;
            }
        }
        self.recompute_shore();
    }

    /// Shore = unwalkable tile with at least one walkable 8-neighbour.
    fn recompute_shore(&mut self) {
        let size = self.size as i32;
        for y in 0..size {
            for x in 0..size {
                let idx = (x + y * size) as usize;
                if self.walkable[idx] {
                    self.shore[idx] = false;
                    continue;
                }
                let mut next_to_land = false;
                for oy in -1..=1 {
                    for ox in -1..=1 {
                        if ox == 0 && oy == 0 {
                            continue;
                        }
                        let (nx, ny) = (x + ox, y + oy);
                        if nx >= 0
                            && nx < size
                            && ny >= 0
                            && ny < size
                            && self.walkable[(nx + ny * size) as usize]
                        {
                            next_to_land = true;
                        }
                    }
                }
                self.shore[idx] = next_to_land;
            }
        }
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.size
            && (coord.y as usize) < self.size
    }

    /// Flat index of an in-bounds coordinate.
    pub fn index(&self, coord: Coord) -> usize {
        debug_assert!(self.in_bounds(coord));
        coord.x as usize + coord.y as usize * self.size
    }
}
