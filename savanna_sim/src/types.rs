// Core types shared across the simulation.
//
// Defines the grid coordinate (`Coord`), the compact entity identifier, and
// the species/diet/death-cause enums. All types derive `Serialize` and
// `Deserialize` so simulation state can be snapshotted as JSON.
//
// `Coord` carries an optional third component for world-space use, but the
// grid is two-dimensional: equality and hashing consider `(x, y)` only.
// A reserved sentinel (`Coord::INVALID`) stands for "no coordinate", e.g.
// a tile with no visible water in range.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Sub};

// ---------------------------------------------------------------------------
// Grid coordinate
// ---------------------------------------------------------------------------

/// A position on the tile grid.
///
/// `z` exists for callers that want to carry a third component; it plays no
/// role in indexing or equality and is zero everywhere inside the sim.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    /// Sentinel for "no coordinate" — an invalid or absent result.
    pub const INVALID: Coord = Coord { x: -1, y: -1, z: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }

    /// `true` unless this is the `INVALID` sentinel.
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Squared Euclidean distance, component-wise over all three components.
    pub fn sqr_distance(a: Coord, b: Coord) -> f32 {
        let dx = (a.x - b.x) as f32;
        let dy = (a.y - b.y) as f32;
        let dz = (a.z - b.z) as f32;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance.
    pub fn distance(a: Coord, b: Coord) -> f32 {
        Self::sqr_distance(a, b).sqrt()
    }

    /// 8-neighbour adjacency test over the grid plane. A coordinate is a
    /// neighbour of itself under this definition, matching how the agents
    /// use it (an agent standing on its target is "close enough").
    pub fn are_neighbours(a: Coord, b: Coord) -> bool {
        (a.x - b.x).abs() <= 1 && (a.y - b.y).abs() <= 1
    }
}

// Equality and hashing are over (x, y) only; z is a passenger.
impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for Coord {}

impl Hash for Coord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        Coord {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Entity identity
// ---------------------------------------------------------------------------

/// Compact, stable identifier for a living entity.
///
/// Sequential integers allocated by `SimState`, never reused. Ordered so
/// entity registries can be `BTreeMap`s with deterministic iteration.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

/// The species of a living entity. Behavioral differences between animal
/// species come from `SpeciesData` in the config, not from code branches.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Species {
    Rabbit,
    Fox,
    Plant,
}

impl Species {
    /// Whether this species registers with the fauna spatial index (mobile)
    /// or the flora index (stationary).
    pub fn is_fauna(self) -> bool {
        !matches!(self, Species::Plant)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Species::Rabbit => "Rabbit",
            Species::Fox => "Fox",
            Species::Plant => "Plant",
        };
        write!(f, "{name}")
    }
}

/// Diet tag for animals. Declared for both; only herbivore foraging against
/// plants is modeled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diet {
    Herbivore,
    Carnivore,
}

/// Why an entity died. Reported to telemetry with the death event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Hunger,
    Thirst,
    /// A plant's resource was consumed down to zero.
    Depleted,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeathCause::Hunger => "Hunger",
            DeathCause::Thirst => "Thirst",
            DeathCause::Depleted => "Depleted",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_z() {
        let a = Coord { x: 3, y: 4, z: 0 };
        let b = Coord { x: 3, y: 4, z: 7 };
        assert_eq!(a, b);
    }

    #[test]
    fn hashing_ignores_z() {
        use std::collections::hash_map::DefaultHasher;
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        Coord { x: 3, y: 4, z: 0 }.hash(&mut ha);
        Coord { x: 3, y: 4, z: 9 }.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn invalid_sentinel() {
        assert!(!Coord::INVALID.is_valid());
        assert!(Coord::new(0, 0).is_valid());
        // (-1, -1) with any z is the sentinel, since equality ignores z.
        assert!(!(Coord { x: -1, y: -1, z: 3 }).is_valid());
    }

    #[test]
    fn arithmetic_is_component_wise() {
        let a = Coord::new(2, 3);
        let b = Coord::new(5, 1);
        assert_eq!(a + b, Coord::new(7, 4));
        assert_eq!(b - a, Coord::new(3, -2));
    }

    #[test]
    fn distances() {
        let a = Coord::new(0, 0);
        let b = Coord::new(3, 4);
        assert_eq!(Coord::sqr_distance(a, b), 25.0);
        assert_eq!(Coord::distance(a, b), 5.0);
    }

    #[test]
    fn neighbour_test_is_chebyshev() {
        let c = Coord::new(5, 5);
        assert!(Coord::are_neighbours(c, Coord::new(6, 6)));
        assert!(Coord::are_neighbours(c, Coord::new(4, 5)));
        assert!(Coord::are_neighbours(c, c));
        assert!(!Coord::are_neighbours(c, Coord::new(7, 5)));
        assert!(!Coord::are_neighbours(c, Coord::new(5, 3)));
    }

    #[test]
    fn entity_id_ordering() {
        assert!(EntityId(1) < EntityId(2));
    }

    #[test]
    fn species_category() {
        assert!(Species::Rabbit.is_fauna());
        assert!(Species::Fox.is_fauna());
        assert!(!Species::Plant.is_fauna());
    }
}
