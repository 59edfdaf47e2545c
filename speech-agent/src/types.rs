//! Core types for speakers, listeners and learners.

use serde::{Deserialize, Serialize};

use semantics::{Context, SemanticsError};

/// Error types for agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No hypothesis has been chosen yet
    #[error("Agent has no chosen hypothesis")]
    NoHypothesis,

    /// The agent has not learned anything yet
    #[error("Agent has no learned posterior")]
    NoPosterior,

    /// Learning produced no hypothesis with finite posterior
    #[error("Learned posterior is empty")]
    EmptyPosterior,

    /// The speaker found nothing true to say in a context
    #[error("No truthful utterance for context {context}")]
    NoTruthfulUtterance { context: String },

    /// Seeding gave up after repeated failures
    #[error("Seeding failed after {attempts} attempts")]
    SeedingFailed { attempts: usize },

    /// A composition program could not be parsed
    #[error("Program parse error: {0}")]
    ProgramParse(String),

    /// Semantics layer error
    #[error(transparent)]
    Semantics(#[from] SemanticsError),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// One observed communicative act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    /// Scene the utterance was produced in
    pub context: Context,
    /// Serialized composition tree
    pub utterance: String,
    /// Probability the utterance is true of the scene (0.0 - 1.0)
    pub reliability: f64,
}

impl Datum {
    pub fn new(context: Context, utterance: impl Into<String>, reliability: f64) -> Self {
        Self {
            context,
            utterance: utterance.into(),
            reliability,
        }
    }
}

/// Which flag assignments count as alternatives when measuring informativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InformativityBase {
    /// All `2^N` assignments, presupposition failures included
    #[default]
    AllAssignments,
    /// Only assignments where the sentence has a truth value
    DefinedAssignments,
}

/// Speaker tuning constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerConfig {
    /// Maximum depth of randomly generated utterances
    pub max_depth: usize,
    /// Probability of stopping at a leaf when not forced
    pub leaf_probability: f64,
    /// Softmax inverse temperature over utterance utility
    pub alpha: f64,
    /// Complexity cost per terminal
    pub size_scaling: f64,
    /// Random utterances drawn per production
    pub samples: usize,
    /// Depth for enumeration-based production
    pub enumeration_depth: usize,
    /// Alternatives used for informativity
    pub informativity_base: InformativityBase,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            leaf_probability: 0.6,
            alpha: 5.0,
            size_scaling: 0.0,
            samples: 5000,
            enumeration_depth: 2,
            informativity_base: InformativityBase::AllAssignments,
        }
    }
}

impl SpeakerConfig {
    /// Set the random search budget.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Set the complexity cost per terminal.
    pub fn with_size_scaling(mut self, size_scaling: f64) -> Self {
        self.size_scaling = size_scaling;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantics::Entity;

    #[test]
    fn test_speaker_defaults() {
        let config = SpeakerConfig::default();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.samples, 5000);
        assert_eq!(config.informativity_base, InformativityBase::AllAssignments);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: SpeakerConfig = serde_json::from_str(r#"{"alpha": 2.0}"#).unwrap();
        assert_eq!(config.alpha, 2.0);
        assert_eq!(config.enumeration_depth, 2);
    }

    #[test]
    fn test_datum_serialization() {
        let ctx = Context::new(vec![Entity::new(1, true)]).unwrap();
        let datum = Datum::new(ctx, "( something target )", 0.9);
        let json = serde_json::to_value(&datum).unwrap();
        assert_eq!(json["utterance"], "( something target )");
        assert_eq!(json["context"][0]["id"], 1);
    }
}
