//! Iterated Learning - populations transmitting composition rules
//!
//! Each generation learns its composition rule from the utterances of the
//! previous one:
//! - Generation 0 is seeded from sampled hypotheses, a fixed program, or
//!   random strings
//! - Parents are chosen by a softmax over communicative accuracy
//! - Children learn, may mutate, speak about fresh scenes and are scored
//! - Every child of a generation runs as its own blocking task, joined
//!   before the next selection
//!
//! A separate tradeoff analysis searches learned quantifier words for the
//! best balance of simplicity and communicative accuracy.
//!
//! # Example
//!
//! ```no_run
//! use iterated_learning::{Simulation, SimulationConfig};
//!
//! # async fn demo() -> iterated_learning::Result<()> {
//! let mut config = SimulationConfig::default();
//! config.population.generations = 3;
//! config.seed = Some(1);
//! let summary = Simulation::new(config)?.run().await?;
//! println!("{:?}", summary.fitness());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod persistence;
pub mod population;
pub mod selection;
pub mod tradeoff;
pub mod types;
pub mod worker;

// Re-export main types
pub use config::{OutputConfig, PopulationConfig, SeedStrategy, SimulationConfig};
pub use persistence::RunWriter;
pub use population::Simulation;
pub use selection::{select_parents, selection_weights};
pub use tradeoff::{RankedQuantifiers, TradeoffAnalysis, TradeoffSummary};
pub use types::*;
