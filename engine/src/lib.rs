//! Answer arbitration and session orchestration for Puzzle Duel.
//!
//! - [`Arbitrator`] runs the opponent strategy chain and always yields an answer.
//! - [`SpeculativeSlot`] starts that answer early and de-duplicates requests by
//!   [`Fingerprint`].
//! - [`Session`] owns one batch: the circular puzzle queue, scores, and settings.
//! - [`DuelConfig`] loads `~/.duel/config.toml`; [`bank`] loads driver-supplied
//!   puzzle banks.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod arbiter;
pub mod bank;
pub mod config;
pub mod local;
pub mod session;
pub mod speculative;

pub use arbiter::{Arbitrator, OpponentSettings, Strategy};
pub use bank::{BankError, load_bank, parse_bank};
pub use config::{
    AccuracyConfig, ApiKeys, ConfigError, DuelConfig, ModelsConfig, OpponentConfig, config_path,
    expand_env_vars,
};
pub use local::{AccuracyTable, LocalSimulator};
pub use session::{Session, SessionError};
pub use speculative::{Fingerprint, PendingAnswer, SpeculativeSlot};

pub use duel_providers;
pub use duel_puzzles;
pub use duel_types;
