//! Single- and double-elimination bracket engine.
//!
//! A bracket is built once from its entrants (`seeding` then `builder`),
//! then driven by match results (`advancer`). `BracketEngine` is the entry
//! point; `BracketRegistry` and `server` host many brackets at once.

pub mod advancer;
pub mod bracket;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod registry;
pub mod seeding;
pub mod server;
pub mod snapshot;
pub mod types;

pub use bracket::{Bracket, Feed, FeedKind, Match, Slot, SlotSource};
pub use engine::{BracketEngine, RoundView};
pub use error::{BracketError, BracketResult};
pub use registry::{BracketRegistry, RegistryError};
pub use snapshot::BracketSnapshot;
pub use types::*;
