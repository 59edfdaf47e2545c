//! Configuration for iterated-learning runs.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use semantics::{ContextGenerator, Lexicon, LexiconOptions, MAX_CONTEXT_SIZE};
use speech_agent::{LearnerConfig, SpeakerConfig, TradeoffConfig};

use crate::types::{Result, SimulationError};

/// Full configuration of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Population and transmission settings
    pub population: PopulationConfig,
    /// Speaker tuning shared by every agent
    pub speaker: SpeakerConfig,
    /// Hypothesis learner tuning
    pub learner: LearnerConfig,
    /// Word groups in the shared vocabulary
    pub lexicon: LexiconOptions,
    /// Quantifier tradeoff analysis
    pub tradeoff: TradeoffConfig,
    /// Run artifacts
    pub output: OutputConfig,
    /// Seed for the run RNG; drawn from entropy when absent
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Reject settings a run cannot start with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.population;
        if p.generations == 0 {
            return Err(SimulationError::InvalidConfig(
                "generations must be at least 1".to_string(),
            ));
        }
        if p.agents == 0 {
            return Err(SimulationError::InvalidConfig(
                "agents must be at least 1".to_string(),
            ));
        }
        if p.context_size == 0 {
            return Err(SimulationError::InvalidConfig(
                "context_size must be at least 1".to_string(),
            ));
        }
        if p.context_size > MAX_CONTEXT_SIZE {
            return Err(SimulationError::InvalidConfig(format!(
                "context_size {} exceeds the limit of {}",
                p.context_size, MAX_CONTEXT_SIZE
            )));
        }
        if Lexicon::with_options(&self.lexicon).is_empty() {
            return Err(SimulationError::InvalidConfig(
                "lexicon has no word groups enabled".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&p.reliability) {
            return Err(SimulationError::InvalidConfig(format!(
                "reliability {} is outside [0, 1]",
                p.reliability
            )));
        }
        if !(0.0..=1.0).contains(&p.mutation_probability) {
            return Err(SimulationError::InvalidConfig(format!(
                "mutation_probability {} is outside [0, 1]",
                p.mutation_probability
            )));
        }
        if p.selection_temperature <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "selection_temperature must be positive".to_string(),
            ));
        }

        let t = &self.tradeoff;
        if !(1..=MAX_CONTEXT_SIZE).contains(&t.context_size) {
            return Err(SimulationError::InvalidConfig(format!(
                "tradeoff context_size must be between 1 and {}",
                MAX_CONTEXT_SIZE
            )));
        }
        if !t.likelihood_weight.is_finite() || t.likelihood_weight < 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "likelihood_weight {} must be finite and non-negative",
                t.likelihood_weight
            )));
        }
        Ok(())
    }
}

/// How generation 0 gets its hypotheses and data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SeedStrategy {
    /// Sample hypotheses until one describes every context
    #[default]
    Hypothesis,
    /// Random untyped strings with no hypothesis behind them
    #[value(alias = "random_string")]
    RandomString,
    /// Every agent starts from `seed_program`
    Program,
}

/// Population and transmission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Generations, counting generation 0
    pub generations: usize,
    /// Agents per generation
    pub agents: usize,
    /// Data points each agent produces
    pub observations: usize,
    /// Entities per context
    pub context_size: usize,
    /// Reliability stamped on produced data (0.0 - 1.0)
    pub reliability: f64,
    /// Chance a child mutates its picked hypothesis
    pub mutation_probability: f64,
    /// Softmax temperature over parent fitness
    pub selection_temperature: f64,
    /// Generation 0 strategy
    pub seed_strategy: SeedStrategy,
    /// Program used by the `program` strategy
    pub seed_program: String,
    /// Hypotheses tried per agent when seeding from hypotheses
    pub seeding_attempts: usize,
    /// Depth of random strings when seeding from strings
    pub random_string_depth: usize,
    /// Re-picks from the posterior before a child's failure aborts the run
    pub production_retries: usize,
    /// Context generation
    pub contexts: ContextGenerator,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            generations: 5,
            agents: 10,
            observations: 100,
            context_size: 5,
            reliability: 0.9,
            mutation_probability: 0.0,
            selection_temperature: 1.0,
            seed_strategy: SeedStrategy::Hypothesis,
            seed_program: "( apply L R )".to_string(),
            seeding_attempts: 1000,
            random_string_depth: 4,
            production_retries: 3,
            contexts: ContextGenerator::default(),
        }
    }
}

/// Where run artifacts go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write artifacts at all
    pub enabled: bool,
    /// Root directory for runs
    pub directory: PathBuf,
    /// Extra path component under the run directory
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("./data"),
            suffix: String::new(),
        }
    }
}
