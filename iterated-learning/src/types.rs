//! Run records and error types.

use serde::{Deserialize, Serialize};

use speech_agent::{AgentError, Agent, Datum, Hypothesis};

/// Error types for simulation runs.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Invalid run configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A child could not describe one of its contexts
    #[error("Agent {agent} in generation {generation} produced no data: {reason}")]
    NoData {
        generation: usize,
        agent: usize,
        reason: String,
    },

    /// Agent operation failed
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Semantics layer error
    #[error("Semantics error: {0}")]
    Semantics(#[from] semantics::SemanticsError),

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// Writing run artifacts failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding run artifacts failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimulationError>;

/// Serializable view of one agent after its generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Hypothesis in use, if any
    pub hypothesis: Option<String>,
    /// Hypothesis before mutation
    pub original: Option<String>,
    /// Index of the parent in the previous generation
    pub parent: Option<usize>,
    /// Communicative accuracy on its own data
    pub fitness: f64,
    pub mutated: bool,
    /// Learned posterior, best first
    pub posterior: Vec<(String, f64)>,
    /// Data the agent produced
    pub data: Vec<Datum>,
}

impl AgentSummary {
    pub fn from_agent<H: Hypothesis>(
        agent: &Agent<H>,
        parent: Option<usize>,
        fitness: f64,
        data: Vec<Datum>,
    ) -> Self {
        Self {
            hypothesis: agent.hypothesis().map(ToString::to_string),
            original: agent.original().map(ToString::to_string),
            parent,
            fitness,
            mutated: agent.is_mutated(),
            posterior: agent
                .posterior()
                .map(|p| p.iter().map(|(h, s)| (h.to_string(), s)).collect())
                .unwrap_or_default(),
            data,
        }
    }
}

/// One generation of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub index: usize,
    pub agents: Vec<AgentSummary>,
}

impl GenerationRecord {
    pub fn fitness(&self) -> Vec<f64> {
        self.agents.iter().map(|a| a.fitness).collect()
    }

    pub fn data(&self) -> Vec<Vec<Datum>> {
        self.agents.iter().map(|a| a.data.clone()).collect()
    }
}

/// Everything a finished run returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub generations: Vec<GenerationRecord>,
}

impl RunSummary {
    /// Fitness indexed by `[generation][agent]`.
    pub fn fitness(&self) -> Vec<Vec<f64>> {
        self.generations.iter().map(GenerationRecord::fitness).collect()
    }

    /// Produced data indexed by `[generation][agent]`.
    pub fn data(&self) -> Vec<Vec<Vec<Datum>>> {
        self.generations.iter().map(GenerationRecord::data).collect()
    }

    pub fn last(&self) -> Option<&GenerationRecord> {
        self.generations.last()
    }
}
