//! Core domain types for Puzzle Duel.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod answer;
mod model;
mod puzzle;
mod text;

pub use answer::{AnswerSource, HumanAnswer, OpponentAnswer, RoundOutcome, Scoreboard};
pub use model::{ApiKey, ModelName, ModelParseError, Provider, ProviderParseError};
pub use puzzle::{AnswerKey, Domain, PuzzleError, PuzzleInstance};
pub use text::{contains_accepted, matches_exactly, normalize_answer, truncate_with_ellipsis};
