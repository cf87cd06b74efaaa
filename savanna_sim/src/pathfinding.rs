// A* pathfinding and line-of-sight over the walkable grid.
//
// Implements standard A* using a `BinaryHeap` (min-heap via reversed
// ordering). Node scores and came-from data are stored in `Vec`s indexed by
// flat tile index for O(1) access and deterministic behavior (no `HashMap`).
//
// Movement is 8-directional: orthogonal hops cost 1, diagonal hops √2. The
// heuristic is octile distance, which is admissible for those costs.
//
// The goal tile may be unwalkable — that is how drink targets work, since
// shoreline tiles are water. In that case the search succeeds on reaching
// any walkable 8-neighbour of the goal, and the returned path ends there.
// Returned paths always start at `start`, so a follower's cursor satisfies
// `path[cursor] == current coordinate` at every step.
//
// See also: `environment.rs` which owns the walkable grid and calls both
// functions, `animal.rs` for how paths are consumed and invalidated.
//
// **Critical constraint: determinism.** Search is a pure function of the
// grid and the endpoints. Ties in f-score break on flat tile index.

use crate::types::Coord;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// The 8 neighbour offsets, in fixed scan order.
pub const NEIGHBOUR_OFFSETS: [Coord; 8] = [
    Coord::new(-1, -1),
    Coord::new(0, -1),
    Coord::new(1, -1),
    Coord::new(-1, 0),
    Coord::new(1, 0),
    Coord::new(-1, 1),
    Coord::new(0, 1),
    Coord::new(1, 1),
];

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    idx: usize,
    f_score: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score.total_cmp(&other.f_score) == Ordering::Equal && self.idx == other.idx
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score is "greatest".
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

fn in_bounds(size: usize, coord: Coord) -> bool {
    coord.x >= 0 && coord.y >= 0 && (coord.x as usize) < size && (coord.y as usize) < size
}

fn flat(size: usize, coord: Coord) -> usize {
    coord.x as usize + coord.y as usize * size
}

/// Octile distance: exact path length on an empty 8-connected grid.
fn heuristic(from: Coord, to: Coord) -> f32 {
    let dx = (from.x - to.x).abs() as f32;
    let dy = (from.y - to.y).abs() as f32;
    let (long, short) = if dx > dy { (dx, dy) } else { (dy, dx) };
    (long - short) + short * SQRT_2
}

/// Find the shortest walkable path from `start` to `goal`.
///
/// The returned path includes both endpoints. If `goal` is unwalkable the
/// path instead ends on a walkable 8-neighbour of `goal` (the nearest one
/// the search reaches). Returns `None` when the goal is out of bounds or
/// unreachable. `start` must be in bounds and walkable.
pub fn find_path(size: usize, walkable: &[bool], start: Coord, goal: Coord) -> Option<Vec<Coord>> {
    debug_assert_eq!(walkable.len(), size * size);
    debug_assert!(in_bounds(size, start) && walkable[flat(size, start)]);
    if !in_bounds(size, goal) {
        return None;
    }

    // With an unwalkable goal, arrival means standing next to it.
    let goal_walkable = walkable[flat(size, goal)];
    let arrived =
        |coord: Coord| -> bool { coord == goal || (!goal_walkable && Coord::are_neighbours(coord, goal)) };

    if arrived(start) {
        return Some(vec![start]);
    }

    let n = size * size;
    // g_score[idx] = cost of cheapest known path from start to idx.
    let mut g_score = vec![f32::INFINITY; n];
    let mut came_from: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];

    let start_idx = flat(size, start);
    g_score[start_idx] = 0.0;

    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        idx: start_idx,
        f_score: heuristic(start, goal),
    });

    while let Some(current) = open.pop() {
        let ci = current.idx;
        let current_coord = Coord::new((ci % size) as i32, (ci / size) as i32);

        if arrived(current_coord) {
            return Some(reconstruct_path(&came_from, size, start_idx, ci));
        }

        if closed[ci] {
            continue;
        }
        closed[ci] = true;

        let current_g = g_score[ci];

        for offset in NEIGHBOUR_OFFSETS {
            let neighbour = current_coord + offset;
            if !in_bounds(size, neighbour) {
                continue;
            }
            let ni = flat(size, neighbour);
            if !walkable[ni] || closed[ni] {
                continue;
            }

            let step_cost = if offset.x != 0 && offset.y != 0 {
                SQRT_2
            } else {
                1.0
            };
            let tentative_g = current_g + step_cost;

            if tentative_g < g_score[ni] {
                g_score[ni] = tentative_g;
                came_from[ni] = Some(ci);
                open.push(OpenEntry {
                    idx: ni,
                    f_score: tentative_g + heuristic(neighbour, goal),
                });
            }
        }
    }

    None // No path found.
}

/// Reconstruct the coordinate path from came_from data.
fn reconstruct_path(
    came_from: &[Option<usize>],
    size: usize,
    start_idx: usize,
    end_idx: usize,
) -> Vec<Coord> {
    let mut path = Vec::new();
    let mut current = end_idx;

    loop {
        path.push(Coord::new((current % size) as i32, (current / size) as i32));
        if current == start_idx {
            break;
        }
        match came_from[current] {
            Some(prev) => current = prev,
            None => break,
        }
    }

    path.reverse();
    path
}

/// Line-of-sight test between two tiles.
///
/// Walks the Bresenham line from `from` to `to`; sight is blocked when any
/// intermediate tile is unwalkable. The endpoints themselves are exempt, so
/// a water tile is visible from land even though it is unwalkable.
pub fn tile_is_visible(size: usize, walkable: &[bool], from: Coord, to: Coord) -> bool {
    debug_assert_eq!(walkable.len(), size * size);
    debug_assert!(in_bounds(size, from) && in_bounds(size, to));

    let (mut x, mut y) = (from.x, from.y);
    let w = to.x - from.x;
    let h = to.y - from.y;

    let dx1 = w.signum();
    let dy1 = h.signum();
    let mut dx2 = dx1;
    let mut dy2 = 0;
    let mut longest = w.abs();
    let mut shortest = h.abs();
    if longest <= shortest {
        std::mem::swap(&mut longest, &mut shortest);
        dx2 = 0;
        dy2 = dy1;
    }

    let mut numerator = longest >> 1;
    for i in 0..=longest {
        // Endpoints are exempt.
        if i != 0 && i != longest && !walkable[(x + y * size as i32) as usize] {
            return false;
        }
        numerator += shortest;
        if numerator >= longest {
            numerator -= longest;
            x += dx1;
            y += dy1;
        } else {
            x += dx2;
            y += dy2;
        }
    }
    true
}
