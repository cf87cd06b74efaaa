// Animal agents: needs clocks, the decision state machine, and tile-hop
// movement.
//
// An animal is driven entirely by two linear clocks. Hunger and thirst grow
// every tick, normalized so 1.0 is death; the decision step compares them
// and commits to one goal at a time. All species share this one type —
// behavioral differences come from the `SpeciesData` table in the config.
//
// The update loop per tick:
//   1. advance the needs clocks; crossing a death threshold kills the
//      animal in the same tick, with no further processing,
//   2. if mid-hop, advance the movement animation (the grid coordinate
//      commits exactly once, when the hop completes),
//   3. otherwise process the current interaction (eating/drinking) and
//      re-decide once the decision interval has elapsed.
//
// Movement is animated between tile centres with a parabolic arc; diagonal
// hops scale speed by 1/√2 and arc height by √2 so ground speed and arc
// shape stay uniform. Paths are followed with a cursor that always sits on
// the animal's current tile, and a path is reused across decisions as long
// as its goal is unchanged and tiles remain.
//
// Death does not destroy the animal: it leaves the fauna index immediately
// (nothing can sense a corpse) but the body lingers for the configured
// decay duration before the registry drops it.
//
// See also: `environment.rs` for sensing and the random walks, `sim.rs`
// for the tick loop and the `TickContext` plumbing.

use crate::config::SimConfig;
use crate::environment::Environment;
use crate::map::MapEntry;
use crate::plant::Plant;
use crate::telemetry::{SimEvent, SimEventKind};
use crate::types::{Coord, DeathCause, Diet, EntityId, Species};
use savanna_prng::GameRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What an animal is currently doing. One goal at a time; switching goals
/// goes through the decision step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatureAction {
    Resting,
    Exploring,
    GoingToFood,
    GoingToWater,
    Eating,
    Drinking,
}

/// Shared mutable context for one animal update. The sim builds one per
/// agent per tick; everything an agent can touch goes through here.
pub struct TickContext<'a> {
    pub env: &'a mut Environment,
    pub plants: &'a mut BTreeMap<EntityId, Plant>,
    pub config: &'a SimConfig,
    pub rng: &'a mut GameRng,
    pub events: &'a mut Vec<SimEvent>,
    /// Absolute sim time at the end of this tick.
    pub time: f32,
}

impl TickContext<'_> {
    fn emit(&mut self, kind: SimEventKind) {
        self.events.push(SimEvent {
            time: self.time,
            kind,
        });
    }
}

/// In-flight tile hop.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct MoveState {
    from: Coord,
    to: Coord,
    start_pos: [f32; 3],
    target_pos: [f32; 3],
    /// Animation progress in [0, 1].
    progress: f32,
    /// 1/√2 for diagonal hops, 1 otherwise.
    speed_factor: f32,
    /// √2 for diagonal hops, 1 otherwise.
    arc_factor: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Animal {
    pub id: EntityId,
    pub species: Species,
    pub coord: Coord,
    /// Interpolated world position, including the hop arc.
    pub world_position: [f32; 3],

    /// Needs clocks in [0, ∞); 1.0 is the death threshold.
    pub hunger: f32,
    pub thirst: f32,

    action: CreatureAction,
    /// Tile occupied before the current one; the wander heading.
    move_from_coord: Coord,
    move_state: Option<MoveState>,

    food_target: Option<(EntityId, Coord)>,
    water_target: Coord,

    path: Vec<Coord>,
    path_index: usize,
    /// Goal the current path was built for; reuse key.
    path_goal: Coord,

    last_decision_time: Option<f32>,

    death_cause: Option<DeathCause>,
    decay_remaining: f32,
}

impl Animal {
    pub fn new(id: EntityId, species: Species, coord: Coord, env: &Environment) -> Self {
        Self {
            id,
            species,
            coord,
            world_position: env.tile_centre(coord),
            hunger: 0.0,
            thirst: 0.0,
            action: CreatureAction::Resting,
            move_from_coord: coord,
            move_state: None,
            food_target: None,
            water_target: Coord::INVALID,
            path: Vec::new(),
            path_index: 0,
            path_goal: Coord::INVALID,
            last_decision_time: None,
            death_cause: None,
            decay_remaining: 0.0,
        }
    }

    pub fn action(&self) -> CreatureAction {
        self.action
    }

    pub fn is_dead(&self) -> bool {
        self.death_cause.is_some()
    }

    /// Dead and past the decay countdown: ready for the registry sweep.
    pub fn is_decayed(&self) -> bool {
        self.is_dead() && self.decay_remaining <= 0.0
    }

    /// Advance the animal by `dt` seconds.
    pub fn update(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        if self.is_dead() {
            self.decay_remaining -= dt;
            return;
        }

        let data = ctx.config.species_data(self.species);

        self.hunger += dt / data.needs.time_to_death_by_hunger;
        self.thirst += dt / data.needs.time_to_death_by_thirst;

        // Crossing a threshold kills this tick, before any further action
        // processing.
        if self.hunger >= 1.0 {
            self.die(DeathCause::Hunger, ctx);
            return;
        } else if self.thirst >= 1.0 {
            self.die(DeathCause::Thirst, ctx);
            return;
        }

        if self.move_state.is_some() {
            self.animate_move(dt, ctx);
        } else {
            self.handle_interactions(dt, ctx);
            let due = match self.last_decision_time {
                None => true,
                Some(last) => ctx.time - last > data.movement.time_between_action_choices,
            };
            if due {
                self.choose_next_action(ctx);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Sense the surroundings, compare the needs and commit to a goal,
    /// then act on it.
    fn choose_next_action(&mut self, ctx: &mut TickContext<'_>) {
        let data = ctx.config.species_data(self.species);
        self.last_decision_time = Some(ctx.time);

        let surroundings = ctx.env.sense(self.coord, data.max_view_distance as f32);
        // Only plant foraging is modeled; a carnivore senses no food and
        // keeps exploring.
        let food = match data.diet {
            Diet::Herbivore => surroundings.food,
            Diet::Carnivore => None,
        };

        // A meal in progress is not abandoned for water unless thirst is
        // past the critical fraction.
        let currently_eating = self.action == CreatureAction::Eating
            && self.food_target.is_some()
            && self.hunger > 0.0;

        if self.hunger >= self.thirst
            || (currently_eating && self.thirst < data.needs.critical_percent)
        {
            self.find_food(food, ctx);
        } else {
            self.find_water(surroundings.water, ctx);
        }

        self.act(ctx);
    }

    fn find_food(&mut self, food: Option<MapEntry>, ctx: &mut TickContext<'_>) {
        match food {
            Some(entry) => {
                self.set_action(CreatureAction::GoingToFood, ctx);
                self.food_target = Some((entry.id, entry.coord));
                self.create_path(entry.coord, ctx);
            }
            None => self.set_action(CreatureAction::Exploring, ctx),
        }
    }

    fn find_water(&mut self, water: Coord, ctx: &mut TickContext<'_>) {
        if water.is_valid() {
            self.set_action(CreatureAction::GoingToWater, ctx);
            self.water_target = water;
            self.create_path(water, ctx);
        } else {
            self.set_action(CreatureAction::Exploring, ctx);
        }
    }

    fn set_action(&mut self, action: CreatureAction, ctx: &mut TickContext<'_>) {
        if self.action != action {
            self.action = action;
            ctx.emit(SimEventKind::ActionChanged {
                id: self.id,
                action,
            });
        }
    }

    /// Build a path to `goal`, unless the current path already leads there
    /// and still has tiles left.
    fn create_path(&mut self, goal: Coord, ctx: &mut TickContext<'_>) {
        // Reuse the cached path unless the goal changed, the cursor ran
        // past the end, or the path went stale relative to ground truth.
        let reusable = self.path_goal == goal
            && self.path_index + 1 < self.path.len()
            && self.path[self.path_index] == self.coord;
        if reusable {
            return;
        }
        match ctx.env.find_path(self.coord, goal) {
            Some(path) => {
                debug_assert_eq!(path[0], self.coord);
                self.path = path;
                self.path_index = 0;
                self.path_goal = goal;
            }
            None => {
                // Goal unreachable; wander instead.
                self.path.clear();
                self.path_goal = Coord::INVALID;
                self.set_action(CreatureAction::Exploring, ctx);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Acting
    // -----------------------------------------------------------------------

    fn act(&mut self, ctx: &mut TickContext<'_>) {
        match self.action {
            CreatureAction::Resting | CreatureAction::Eating | CreatureAction::Drinking => {}
            CreatureAction::Exploring => {
                let next = ctx.env.next_tile_weighted(
                    self.coord,
                    self.move_from_coord,
                    &ctx.config.wander,
                    ctx.rng,
                );
                if next != self.coord {
                    self.start_move(next, ctx.env);
                }
            }
            CreatureAction::GoingToFood => {
                let Some((_, food_coord)) = self.food_target else {
                    self.set_action(CreatureAction::Exploring, ctx);
                    return;
                };
                if Coord::are_neighbours(self.coord, food_coord) {
                    self.set_action(CreatureAction::Eating, ctx);
                } else {
                    self.follow_path(ctx);
                }
            }
            CreatureAction::GoingToWater => {
                if Coord::are_neighbours(self.coord, self.water_target) {
                    self.set_action(CreatureAction::Drinking, ctx);
                } else {
                    self.follow_path(ctx);
                }
            }
        }
    }

    /// Step one tile along the current path. The cursor sits on the current
    /// tile, so the next hop is `path[path_index + 1]`.
    fn follow_path(&mut self, ctx: &mut TickContext<'_>) {
        debug_assert!(
            self.path.is_empty() || self.path[self.path_index] == self.coord,
            "path cursor desynced from position"
        );
        if self.path_index + 1 < self.path.len() {
            self.path_index += 1;
            let next = self.path[self.path_index];
            self.start_move(next, ctx.env);
        } else {
            // Path exhausted without arriving (stale goal); re-sense later.
            self.path.clear();
            self.path_goal = Coord::INVALID;
            self.set_action(CreatureAction::Exploring, ctx);
        }
    }

    fn start_move(&mut self, target: Coord, env: &Environment) {
        debug_assert!(Coord::are_neighbours(self.coord, target) && target != self.coord);
        let offset = target - self.coord;
        let diagonal = offset.x != 0 && offset.y != 0;
        self.move_state = Some(MoveState {
            from: self.coord,
            to: target,
            start_pos: env.tile_centre(self.coord),
            target_pos: env.tile_centre(target),
            progress: 0.0,
            speed_factor: if diagonal {
                1.0 / std::f32::consts::SQRT_2
            } else {
                1.0
            },
            arc_factor: if diagonal {
                std::f32::consts::SQRT_2
            } else {
                1.0
            },
        });
    }

    fn animate_move(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        let data = ctx.config.species_data(self.species);
        let Some(mut ms) = self.move_state else {
            return;
        };

        ms.progress =
            (ms.progress + dt * data.movement.move_speed * ms.speed_factor).min(1.0);
        // Parabolic arc, zero at both endpoints, peak at the midpoint.
        let height = (1.0 - 4.0 * (ms.progress - 0.5) * (ms.progress - 0.5))
            * data.movement.move_arc_height
            * ms.arc_factor;
        self.world_position = [
            ms.start_pos[0] + (ms.target_pos[0] - ms.start_pos[0]) * ms.progress,
            ms.start_pos[1] + (ms.target_pos[1] - ms.start_pos[1]) * ms.progress + height,
            ms.start_pos[2] + (ms.target_pos[2] - ms.start_pos[2]) * ms.progress,
        ];

        if ms.progress >= 1.0 {
            // The coordinate commits exactly here, once per hop.
            ctx.env.register_move(self.id, ms.from, ms.to);
            self.move_from_coord = ms.from;
            self.coord = ms.to;
            self.world_position = ms.target_pos;
            self.move_state = None;
            // Arrived; think about what to do next.
            self.choose_next_action(ctx);
        } else {
            self.move_state = Some(ms);
        }
    }

    // -----------------------------------------------------------------------
    // Interactions
    // -----------------------------------------------------------------------

    fn handle_interactions(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        match self.action {
            CreatureAction::Eating => {
                let Some((target_id, target_coord)) = self.food_target else {
                    return;
                };
                let Some(plant) = ctx.plants.get_mut(&target_id) else {
                    // Someone else finished it; re-sense on the next decision.
                    self.food_target = None;
                    return;
                };
                let data = ctx.config.species_data(self.species);
                let bite = self.hunger.min(dt / data.needs.eat_duration);
                let was_exhausted = plant.is_exhausted();
                let obtained = plant.consume(bite);
                self.hunger -= obtained;

                if !was_exhausted && plant.is_exhausted() {
                    // The plant dies on the spot and leaves the index now,
                    // so no later search this tick can find it.
                    let plant_id = plant.id;
                    ctx.env.register_plant_death(plant_id, target_coord);
                    ctx.emit(SimEventKind::Died {
                        id: plant_id,
                        species: Species::Plant,
                        cause: DeathCause::Depleted,
                        coord: target_coord,
                    });
                    self.food_target = None;
                }
            }
            CreatureAction::Drinking => {
                if self.thirst > 0.0 {
                    let data = ctx.config.species_data(self.species);
                    self.thirst = (self.thirst - dt / data.needs.drink_duration).max(0.0);
                }
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Death
    // -----------------------------------------------------------------------

    fn die(&mut self, cause: DeathCause, ctx: &mut TickContext<'_>) {
        debug_assert!(!self.is_dead());
        self.death_cause = Some(cause);
        self.decay_remaining = ctx.config.decay_duration;
        self.move_state = None;
        // Corpses are invisible to sensing from this instant.
        ctx.env.register_death(self.id, self.coord);
        ctx.emit(SimEventKind::Died {
            id: self.id,
            species: self.species,
            cause,
            coord: self.coord,
        });
    }
}
