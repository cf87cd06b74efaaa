// Top-level simulation state and the tick loop.
//
// `SimState` owns everything: the environment (grids, tables, spatial
// indexes), the animal and plant registries, the rng, the clock, and the
// telemetry. Construction builds the environment from terrain and spawns
// the configured initial populations on distinct walkable tiles, drawn
// without replacement from the seeded rng.
//
// `step(dt)` advances the world one tick:
//   1. advance the clock,
//   2. update every animal in ascending id order (ids are allocated
//      sequentially and never reused, so the order is reproducible),
//   3. sweep the registries: drop plants eaten to exhaustion this tick and
//      corpses whose decay countdown has elapsed,
//   4. drain the tick's events, fold them into the statistics, and hand
//      them to the caller.
//
// Registries are `BTreeMap`s and the rng is passed down the update chain,
// so two sims built from the same terrain, config, and seed produce
// identical event streams forever.
//
// An entity dying mid-tick leaves its spatial index immediately (see
// `animal.rs`), but its registry entry survives until the sweep — update
// code never deletes from a map it may still be iterated from.
//
// See also: `environment.rs`, `animal.rs`, `telemetry.rs`.

use crate::animal::{Animal, TickContext};
use crate::config::SimConfig;
use crate::environment::{Environment, EnvironmentError};
use crate::plant::Plant;
use crate::telemetry::{SimEvent, SimEventKind, StatsTracker};
use crate::terrain::TerrainData;
use crate::types::{Coord, EntityId, Species};
use savanna_prng::GameRng;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error("not enough walkable tiles to spawn {requested} entities ({available} available)")]
    NotEnoughRoom { requested: usize, available: usize },
}

/// What one `step` produced: the events of that tick, in emission order.
/// Spawns performed before the first step are delivered with it.
#[derive(Clone, Debug)]
pub struct StepResult {
    pub time: f32,
    pub events: Vec<SimEvent>,
}

#[derive(Debug)]
pub struct SimState {
    config: SimConfig,
    time: f32,
    rng: GameRng,
    environment: Environment,
    animals: BTreeMap<EntityId, Animal>,
    plants: BTreeMap<EntityId, Plant>,
    stats: StatsTracker,
    /// Event buffer for the tick in progress; drained by `step`.
    events: Vec<SimEvent>,
    next_entity_id: u64,
}

impl SimState {
    /// Build a simulation from terrain, config, and seed, and spawn the
    /// configured initial populations.
    pub fn new(terrain: TerrainData, config: SimConfig, seed: u64) -> Result<Self, SimError> {
        let mut rng = GameRng::new(seed);
        let environment = Environment::new(terrain, &config, &mut rng)?;

        let mut state = Self {
            config,
            time: 0.0,
            rng,
            environment,
            animals: BTreeMap::new(),
            plants: BTreeMap::new(),
            stats: StatsTracker::new(),
            events: Vec::new(),
            next_entity_id: 0,
        };
        state.spawn_initial_populations()?;
        Ok(state)
    }

    /// Place every configured population on distinct walkable tiles, drawn
    /// without replacement.
    fn spawn_initial_populations(&mut self) -> Result<(), SimError> {
        let mut pool = self.environment.walkable_tiles().to_vec();
        let requested: usize = self
            .config
            .populations
            .iter()
            .map(|p| p.count as usize)
            .sum();
        if requested > pool.len() {
            return Err(SimError::NotEnoughRoom {
                requested,
                available: pool.len(),
            });
        }

        let populations = self.config.populations.clone();
        for population in populations {
            for _ in 0..population.count {
                let coord = self.rng.swap_take(&mut pool);
                self.spawn(population.species, coord);
            }
        }
        Ok(())
    }

    /// Spawn one entity at `coord`. Ids are sequential and never reused.
    pub fn spawn(&mut self, species: Species, coord: Coord) -> EntityId {
        debug_assert!(self.environment.is_walkable(coord));
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;

        self.environment.register_spawn(id, species, coord);
        if species.is_fauna() {
            self.animals
                .insert(id, Animal::new(id, species, coord, &self.environment));
        } else {
            self.plants
                .insert(id, Plant::new(id, coord, &self.config.plant));
        }

        self.events.push(SimEvent {
            time: self.time,
            kind: SimEventKind::Spawned { id, species, coord },
        });
        id
    }

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> StepResult {
        self.time += dt;

        // Update animals in id order. Each animal is lifted out of the
        // registry for its update so the context can borrow the rest of
        // the world mutably.
        let ids: Vec<EntityId> = self.animals.keys().copied().collect();
        for id in ids {
            let Some(mut animal) = self.animals.remove(&id) else {
                continue;
            };
            let mut ctx = TickContext {
                env: &mut self.environment,
                plants: &mut self.plants,
                config: &self.config,
                rng: &mut self.rng,
                events: &mut self.events,
                time: self.time,
            };
            animal.update(dt, &mut ctx);
            self.animals.insert(id, animal);
        }

        // Sweep plants eaten to exhaustion this tick. They already left the
        // flora index at the moment of the final bite.
        self.plants.retain(|_, plant| !plant.is_exhausted());

        // Sweep corpses whose decay countdown elapsed.
        let decayed: Vec<(EntityId, Species)> = self
            .animals
            .values()
            .filter(|a| a.is_decayed())
            .map(|a| (a.id, a.species))
            .collect();
        for (id, species) in decayed {
            self.animals.remove(&id);
            self.events.push(SimEvent {
                time: self.time,
                kind: SimEventKind::Decayed { id, species },
            });
        }

        let events = std::mem::take(&mut self.events);
        for event in &events {
            self.stats.record(event);
        }
        StepResult {
            time: self.time,
            events,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Statistics folded from all events drained so far.
    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn animals(&self) -> impl Iterator<Item = &Animal> {
        self.animals.values()
    }

    pub fn plants(&self) -> impl Iterator<Item = &Plant> {
        self.plants.values()
    }
}
