//! Speech Agent - speakers, listeners and learners of composition rules
//!
//! Builds the communication layer on top of `semantics`:
//! - Type-directed utterance search, random and exhaustive
//! - A speaker trading informativity against utterance cost
//! - A listener marginalizing over hidden target flags
//! - Communicative accuracy as a proper scoring rule
//! - A hypothesis-space contract with a built-in program learner
//! - Learned quantifier words scored by communicative accuracy
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                  Agent<H>                  │
//! │     (learn → pick → mutate → produce)      │
//! └──────┬──────────────┬───────────────┬──────┘
//!        ▼              ▼               ▼
//! ┌─────────────┐ ┌───────────┐ ┌───────────────┐
//! │ Utterance   │ │ Speaker / │ │ Hypothesis    │
//! │ Search      │ │ Listener  │ │ Space (MCMC)  │
//! └─────────────┘ └───────────┘ └───────────────┘
//! ```

pub mod agent;
pub mod hypothesis;
pub mod listener;
pub mod search;
pub mod speaker;
pub mod types;

// Re-export main types for convenience
pub use agent::{seed_from_random_strings, Agent};
pub use hypothesis::program::{Program, ProgramGrammar, ProgramHypothesis};
pub use hypothesis::quantifier::{Definition, QuantifierGrammar, QuantifierHypothesis, QUANTIFIER_WORDS};
pub use hypothesis::space::{LearnerConfig, ProgramSpace};
pub use hypothesis::tradeoff::{TradeoffConfig, TradeoffSpace};
pub use hypothesis::{Hypothesis, HypothesisSpace, Posterior};
pub use listener::{communicative_accuracy, interpret};
pub use search::{Candidate, UtteranceSearch};
pub use speaker::{complexity, informativity, Production};
pub use types::*;
