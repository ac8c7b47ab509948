//! Greedy one-ply move choice for a warehouse agent.
//!
//! Not a search: it can stall or cycle, which keeps the opponent beatable.

use crate::grid::Direction;
use crate::warehouse::{Side, WarehouseState};

/// Weight of the box-to-target distance relative to the agent-to-box distance.
pub const BOX_WEIGHT: u32 = 10;

/// Lower is better.
#[must_use]
pub fn score(state: &WarehouseState, side: Side) -> u32 {
    let agent = state.agent(side);
    let boxed = state.box_pos(side);
    BOX_WEIGHT * boxed.manhattan(state.target(side)) + agent.manhattan(boxed)
}

/// Directions `side` could legally take from `state`, each with its resulting score.
#[must_use]
pub fn scored_moves(state: &WarehouseState, side: Side) -> Vec<(Direction, u32)> {
    Direction::ALL
        .into_iter()
        .filter_map(|direction| {
            let mut trial = state.clone();
            trial
                .move_agent(side, direction)
                .ok()
                .map(|_| (direction, score(&trial, side)))
        })
        .collect()
}

/// Lowest-scoring legal move; ties keep enumeration order and no legal move yields `Up`.
#[must_use]
pub fn best_move(state: &WarehouseState, side: Side) -> Direction {
    let mut best: Option<(Direction, u32)> = None;
    for (direction, value) in scored_moves(state, side) {
        if best.is_none_or(|(_, current)| value < current) {
            best = Some((direction, value));
        }
    }
    best.map_or(Direction::Up, |(direction, _)| direction)
}
