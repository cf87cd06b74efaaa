// savanna_sim — tile-based ecosystem simulation library.
//
// A square tile grid hosts plants and need-driven animals: hunger and
// thirst clocks race against foraging and drinking, with movement animated
// between tile centres. The crate is headless — no rendering, no frame
// timing — and exposes everything through `SimState`.
//
// Module overview:
// - `sim.rs`:         Top-level SimState, tick loop, spawning, registry sweeps.
// - `environment.rs`: Shared world: walkable grid, derived lookup tables, spatial indexes.
// - `map.rs`:         Region-partitioned spatial index with nearest-entity queries.
// - `pathfinding.rs`: A* over the walkable grid + Bresenham line of sight.
// - `animal.rs`:      Agent state machine: needs, decisions, tile-hop movement.
// - `plant.rs`:       Plant resources and depletion.
// - `terrain.rs`:     Terrain input grids (walkable/shore/tile centres).
// - `config.rs`:      SimConfig — all tunable parameters, JSON-loadable.
// - `telemetry.rs`:   Event stream + per-species statistics.
// - `prng`:           Re-exported from `savanna_prng` — xoshiro256++ PRNG with SplitMix64 seeding.
// - `types.rs`:       Coord, entity ids, species/diet/death-cause enums.
//
// **Critical constraint: determinism.** A run is a pure function of
// `(terrain, config, seed)`. All randomness comes from the seeded
// xoshiro256++ PRNG. No `HashMap`, no system time, no OS entropy. Use
// `BTreeMap` for ordered collections.

pub mod animal;
pub mod config;
pub mod environment;
pub mod map;
pub mod pathfinding;
pub mod plant;
pub use savanna_prng as prng;
pub mod sim;
pub mod telemetry;
pub mod terrain;
pub mod types;

pub use animal::{Animal, CreatureAction};
pub use config::SimConfig;
pub use environment::{Environment, Surroundings};
pub use plant::Plant;
pub use sim::{SimState, StepResult};
pub use telemetry::{SimEvent, SimEventKind, StatsTracker};
pub use terrain::TerrainData;
pub use types::{Coord, DeathCause, Diet, EntityId, Species};
