// Plant resources.
//
// A plant is a stationary food source on a single tile. It holds a resource
// amount that herbivores draw down while eating; depletion is asymmetric —
// consuming `x` units of nutrition removes `x * amount_multiplier` from the
// plant — so a plant feeds far less than its nominal amount suggests.
//
// A plant whose resource reaches zero is exhausted and dies the same tick.
// The caller (see `animal.rs`/`sim.rs`) deregisters it from the flora index
// immediately so no later food search in the same tick can target it.

use crate::config::PlantParams;
use crate::types::{Coord, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plant {
    pub id: EntityId,
    pub coord: Coord,
    amount_remaining: f32,
    amount_multiplier: f32,
}

impl Plant {
    pub fn new(id: EntityId, coord: Coord, params: &PlantParams) -> Self {
        Self {
            id,
            coord,
            amount_remaining: params.initial_amount,
            amount_multiplier: params.amount_multiplier,
        }
    }

    /// Draw nutrition from the plant. Returns the amount actually obtained,
    /// capped by what remains; the plant's resource drops by the requested
    /// amount times the depletion multiplier, clamped at zero.
    pub fn consume(&mut self, amount: f32) -> f32 {
        let obtained = amount.min(self.amount_remaining).max(0.0);
        self.amount_remaining =
            (self.amount_remaining - amount * self.amount_multiplier).max(0.0);
        obtained
    }

    pub fn amount_remaining(&self) -> f32 {
        self.amount_remaining
    }

    /// Exhausted plants die immediately; they must not remain queryable.
    pub fn is_exhausted(&self) -> bool {
        self.amount_remaining <= 0.0
    }
}
