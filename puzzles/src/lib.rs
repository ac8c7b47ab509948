//! Puzzle generators and solvers.
//!
//! Every generator is synchronous, takes its randomness from the caller, and
//! returns a self-contained [`PuzzleInstance`] whose answer was computed here.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod grid;
pub mod ladder;
pub mod selector;
pub mod tower;
pub mod warehouse;

use duel_types::{Domain, PuzzleError, PuzzleInstance};
use rand::Rng;
use thiserror::Error;

pub use grid::{Direction, Pos};
pub use ladder::{LadderNetwork, LadderPuzzle};
pub use selector::best_move;
pub use tower::{Stability, Tower};
pub use warehouse::{MoveOutcome, MoveRejection, Side, WarehouseState, Winner};

/// Instances per batch when the caller does not say otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Height requested for batch towers.
const BATCH_TOWER_HEIGHT: usize = 7;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0} puzzles are not generated; supply them from a bank")]
    NoGenerator(Domain),
    #[error("generated an invalid puzzle: {0}")]
    Invalid(#[from] PuzzleError),
}

/// One fresh instance for `domain`.
pub fn generate_instance<R: Rng + ?Sized>(
    domain: Domain,
    rng: &mut R,
) -> Result<PuzzleInstance, GenerateError> {
    let instance = match domain {
        Domain::Wire => {
            // Requests sit below the floors on purpose; the generator raises them.
            let wires = rng.random_range(4..=6);
            let height = rng.random_range(6..=9);
            LadderPuzzle::generate(rng, wires, height).into_instance()?
        }
        Domain::Physics => {
            Tower::generate(rng, tower::DEFAULT_WIDTH, BATCH_TOWER_HEIGHT).into_instance()?
        }
        Domain::Agent => WarehouseState::generate(rng).into_instance()?,
        Domain::Riddle => return Err(GenerateError::NoGenerator(domain)),
    };
    Ok(instance)
}

/// `count` independent instances for `domain`.
pub fn generate_batch<R: Rng + ?Sized>(
    domain: Domain,
    count: usize,
    rng: &mut R,
) -> Result<Vec<PuzzleInstance>, GenerateError> {
    let batch = (0..count)
        .map(|_| generate_instance(domain, rng))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(%domain, count = batch.len(), "generated batch");
    Ok(batch)
}
