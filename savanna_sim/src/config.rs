// Data-driven simulation configuration.
//
// All tunable parameters live in `SimConfig`, loaded from JSON at startup or
// taken from `Default`. The sim never uses magic numbers at the call site —
// it reads from the config, so balance iteration needs no recompile.
//
// Parameters are grouped into nested structs: `NeedParams` (hunger/thirst
// clocks and interaction rates), `MovementParams` (tile-hop animation),
// `WanderParams` (the forward-biased random walk). Species-specific behavior
// lives in `SpeciesData` entries keyed by `Species` — a single `Animal` type
// reads its numbers from the table at runtime, no code branching per species.
//
// The wander and critical-thirst constants are gameplay tunables with no
// derivation; the defaults are the reference values and nothing more.
//
// See also: `sim.rs` which owns the `SimConfig` as part of `SimState`,
// `animal.rs` for the state machine that reads `SpeciesData`.

use crate::types::{Diet, Species};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hunger/thirst clocks and consumption rates for one species.
///
/// Both needs are linear clocks normalized to a death threshold of 1.0:
/// hunger advances by `dt / time_to_death_by_hunger` per second, so an
/// animal that never eats dies of hunger after exactly that many seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeedParams {
    /// Seconds from zero hunger to death by hunger.
    pub time_to_death_by_hunger: f32,
    /// Seconds from zero thirst to death by thirst.
    pub time_to_death_by_thirst: f32,
    /// Seconds of continuous eating to clear one full hunger bar.
    pub eat_duration: f32,
    /// Seconds of continuous drinking to clear one full thirst bar.
    pub drink_duration: f32,
    /// Fraction of the thirst death threshold below which an animal will
    /// not interrupt a meal to go drink.
    pub critical_percent: f32,
}

/// Tile-hop movement animation parameters for one species.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MovementParams {
    /// Base animation speed: progress per second for an orthogonal hop.
    pub move_speed: f32,
    /// Peak height of the movement arc for an orthogonal hop.
    pub move_arc_height: f32,
    /// Seconds between periodic decision re-evaluations while not moving.
    pub time_between_action_choices: f32,
}

/// Forward-biased random-walk parameters (shared by all species).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WanderParams {
    /// Probability of continuing straight ahead when the mirrored forward
    /// tile is in-bounds and walkable.
    pub forward_probability: f64,
    /// Number of uniform candidate draws (with replacement) scored against
    /// the current heading when the forward shortcut does not fire.
    pub weighting_iterations: u32,
}

/// Plant resource parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlantParams {
    /// Resource amount a freshly spawned plant holds.
    pub initial_amount: f32,
    /// Depletion multiplier: consuming `x` reduces the plant's remaining
    /// resource by `x * amount_multiplier`. The asymmetry is deliberate —
    /// plants run out faster than they relieve hunger.
    pub amount_multiplier: f32,
}

/// Data-driven behavioral parameters for one animal species.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesData {
    pub diet: Diet,
    /// Sensing radius in tiles, for both food search and the precomputed
    /// nearest-visible-water lookup.
    pub max_view_distance: i32,
    pub needs: NeedParams,
    pub movement: MovementParams,
}

/// One entry of the initial population spawn list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Population {
    pub species: Species,
    pub count: u32,
}

/// Top-level simulation configuration. Loaded from JSON, never mutated at
/// runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Side length of a spatial-index region, in tiles.
    pub region_size: usize,

    /// Probability that a walkable tile is occupied by scenery at init,
    /// which permanently clears its walkable flag before the derived
    /// tables are built.
    pub scenery_probability: f64,

    /// Seconds a dead animal lingers before it is destroyed.
    pub decay_duration: f32,

    pub wander: WanderParams,

    pub plant: PlantParams,

    /// Per-species behavioral data. Keyed by `Species`; `Plant` carries no
    /// entry here (plant tuning is in `plant`).
    pub species: BTreeMap<Species, SpeciesData>,

    /// Initial populations spawned at startup.
    pub populations: Vec<Population>,
}

impl SimConfig {
    /// The largest view distance over all animal species — the radius the
    /// nearest-visible-water table is built to.
    pub fn max_view_distance(&self) -> i32 {
        self.species
            .values()
            .map(|s| s.max_view_distance)
            .max()
            .unwrap_or(0)
    }

    pub fn species_data(&self, species: Species) -> &SpeciesData {
        &self.species[&species]
    }
}

fn default_animal(diet: Diet) -> SpeciesData {
    SpeciesData {
        diet,
        max_view_distance: 10,
        needs: NeedParams {
            time_to_death_by_hunger: 120.0,
            time_to_death_by_thirst: 200.0,
            eat_duration: 10.0,
            drink_duration: 6.0,
            critical_percent: 0.7,
        },
        movement: MovementParams {
            move_speed: 1.5,
            move_arc_height: 0.2,
            time_between_action_choices: 1.0,
        },
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        let mut species = BTreeMap::new();
        species.insert(Species::Rabbit, default_animal(Diet::Herbivore));
        species.insert(Species::Fox, default_animal(Diet::Carnivore));

        Self {
            region_size: 10,
            scenery_probability: 0.0,
            decay_duration: 10.0,
            wander: WanderParams {
                forward_probability: 0.2,
                weighting_iterations: 3,
            },
            plant: PlantParams {
                initial_amount: 1.0,
                amount_multiplier: 10.0,
            },
            species,
            populations: vec![
                Population {
                    species: Species::Plant,
                    count: 60,
                },
                Population {
                    species: Species::Rabbit,
                    count: 12,
                },
                Population {
                    species: Species::Fox,
                    count: 4,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = SimConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.region_size, restored.region_size);
        assert_eq!(config.populations.len(), restored.populations.len());
        let rabbit = &restored.species[&Species::Rabbit];
        assert_eq!(rabbit.diet, Diet::Herbivore);
        assert_eq!(rabbit.needs.time_to_death_by_hunger, 120.0);
    }

    #[test]
    fn config_loads_from_json_string() {
        let json = r#"{
            "region_size": 5,
            "scenery_probability": 0.1,
            "decay_duration": 4.0,
            "wander": { "forward_probability": 0.3, "weighting_iterations": 5 },
            "plant": { "initial_amount": 1.0, "amount_multiplier": 8.0 },
            "species": {
                "Rabbit": {
                    "diet": "Herbivore",
                    "max_view_distance": 6,
                    "needs": {
                        "time_to_death_by_hunger": 60.0,
                        "time_to_death_by_thirst": 90.0,
                        "eat_duration": 5.0,
                        "drink_duration": 3.0,
                        "critical_percent": 0.7
                    },
                    "movement": {
                        "move_speed": 2.0,
                        "move_arc_height": 0.2,
                        "time_between_action_choices": 0.5
                    }
                }
            },
            "populations": [
                { "species": "Plant", "count": 10 },
                { "species": "Rabbit", "count": 3 }
            ]
        }"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.region_size, 5);
        assert_eq!(config.max_view_distance(), 6);
        assert_eq!(config.species[&Species::Rabbit].movement.move_speed, 2.0);
        assert_eq!(config.populations[1].count, 3);
    }

    #[test]
    fn max_view_distance_is_max_over_species() {
        let mut config = SimConfig::default();
        config
            .species
            .get_mut(&Species::Fox)
            .unwrap()
            .max_view_distance = 25;
        assert_eq!(config.max_view_distance(), 25);
    }
}
