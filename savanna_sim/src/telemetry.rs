// Telemetry: the event stream and per-species population statistics.
//
// Every observable state change in the sim is reported as a `SimEvent` —
// spawns, deaths, decays, and agent action changes. The step loop collects
// the tick's events into the `StepResult`, so an embedding UI can drive
// animation and HUD updates from them without polling entity state.
//
// `StatsTracker` folds the same events into per-species counters (spawned,
// currently alive, deaths by cause). Counters are kept in a `BTreeMap` keyed
// by species for deterministic iteration, same as every other registry.
//
// See also: `sim.rs` which emits events, `animal.rs`/`types.rs` for the
// payload types.

use crate::animal::CreatureAction;
use crate::types::{Coord, DeathCause, EntityId, Species};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One observable state change, stamped with the sim time it occurred.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub time: f32,
    pub kind: SimEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    Spawned {
        id: EntityId,
        species: Species,
        coord: Coord,
    },
    /// An animal committed to a new action during decision-making.
    ActionChanged {
        id: EntityId,
        action: CreatureAction,
    },
    Died {
        id: EntityId,
        species: Species,
        cause: DeathCause,
        coord: Coord,
    },
    /// A dead animal's decay timer elapsed and it was destroyed.
    Decayed { id: EntityId, species: Species },
}

/// Lifetime counters for one species.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesStats {
    pub spawned: u32,
    pub alive: u32,
    pub deaths_by_hunger: u32,
    pub deaths_by_thirst: u32,
    pub depleted: u32,
}

/// Folds the event stream into per-species statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsTracker {
    per_species: BTreeMap<Species, SpeciesStats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn species(&self, species: Species) -> SpeciesStats {
        self.per_species.get(&species).copied().unwrap_or_default()
    }

    pub fn alive_total(&self) -> u32 {
        self.per_species.values().map(|s| s.alive).sum()
    }

    /// Apply one event to the counters.
    pub fn record(&mut self, event: &SimEvent) {
        match &event.kind {
            SimEventKind::Spawned { id, species, coord } => {
                log::debug!("spawned {species} {id} at {coord}");
                let stats = self.per_species.entry(*species).or_default();
                stats.spawned += 1;
                stats.alive += 1;
            }
            SimEventKind::ActionChanged { id, action } => {
                log::trace!("{id} now {action:?}");
            }
            SimEventKind::Died {
                id,
                species,
                cause,
                coord,
            } => {
                log::debug!("{species} {id} died of {cause} at {coord}");
                let stats = self.per_species.entry(*species).or_default();
                stats.alive = stats.alive.saturating_sub(1);
                match cause {
                    DeathCause::Hunger => stats.deaths_by_hunger += 1,
                    DeathCause::Thirst => stats.deaths_by_thirst += 1,
                    DeathCause::Depleted => stats.depleted += 1,
                }
            }
            SimEventKind::Decayed { id, species } => {
                log::trace!("{species} {id} decayed");
            }
        }
    }
}
