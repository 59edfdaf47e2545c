//! Trading simplicity against communicative success.
//!
//! Quantifier hypotheses are scored without observed data. The likelihood
//! is the communicative accuracy a hypothesis reaches on a fixed batch of
//! scenes when it speaks by enumeration, scaled by `likelihood_weight`.
//! The prior rewards short definitions, so the weight sets how much
//! accuracy a more complex set of quantifiers has to buy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use semantics::{Context, ContextGenerator, Lexicon, LexiconOptions};

use crate::agent::Agent;
use crate::hypothesis::chain::learn_in_parallel;
use crate::hypothesis::quantifier::{QuantifierGrammar, QuantifierHypothesis};
use crate::hypothesis::space::LearnerConfig;
use crate::hypothesis::{HypothesisSpace, Posterior};
use crate::types::{Datum, Result, SpeakerConfig};

/// Tradeoff analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeoffConfig {
    /// Weight of communicative accuracy against the prior
    pub likelihood_weight: f64,
    /// Scenes each hypothesis is evaluated on
    pub observations: usize,
    /// Entities per scene
    pub context_size: usize,
    /// Scene generation
    pub contexts: ContextGenerator,
    /// Seed for the evaluation scenes and the speakers describing them
    pub evaluation_seed: u64,
    /// Depth bound of quantifier definitions
    pub max_depth: usize,
    /// Largest number literal in definitions
    pub max_number: usize,
    /// Fixed words the quantifiers are added to
    pub base_lexicon: LexiconOptions,
}

impl Default for TradeoffConfig {
    fn default() -> Self {
        Self {
            likelihood_weight: 1.0,
            observations: 20,
            context_size: 4,
            contexts: ContextGenerator::default(),
            evaluation_seed: 0,
            max_depth: 3,
            max_number: 3,
            base_lexicon: LexiconOptions {
                quantifiers: false,
                ..Default::default()
            },
        }
    }
}

/// Quantifier hypotheses scored by prior plus weighted accuracy.
#[derive(Debug, Clone)]
pub struct TradeoffSpace {
    base: Arc<Lexicon>,
    grammar: QuantifierGrammar,
    contexts: Vec<Context>,
    config: TradeoffConfig,
    learner: LearnerConfig,
    speaker: SpeakerConfig,
}

impl TradeoffSpace {
    /// Build the space and draw its evaluation scenes.
    pub fn new(config: TradeoffConfig, learner: LearnerConfig, speaker: SpeakerConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.evaluation_seed);
        let contexts = config
            .contexts
            .generate_many(config.context_size, config.observations, &mut rng)?;
        let grammar = QuantifierGrammar {
            max_depth: config.max_depth,
            max_number: config.max_number,
        };
        Ok(Self {
            base: Arc::new(Lexicon::with_options(&config.base_lexicon)),
            grammar,
            contexts,
            config,
            learner,
            speaker,
        })
    }

    pub fn config(&self) -> &TradeoffConfig {
        &self.config
    }

    /// Scenes every hypothesis is evaluated on.
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Parse definitions of `Q1..Q3` over this space's base lexicon.
    pub fn hypothesis(&self, definitions: [&str; 3]) -> Result<QuantifierHypothesis> {
        QuantifierHypothesis::parse(definitions, &self.base)
    }

    /// Communicative accuracy of the hypothesis speaking about the
    /// evaluation scenes by enumeration.
    pub fn communicative_accuracy(&self, hypothesis: &QuantifierHypothesis) -> Result<f64> {
        let mut rng = StdRng::seed_from_u64(self.config.evaluation_seed);
        let agent = Agent::new(self.speaker.clone()).with_hypothesis(hypothesis.clone());
        let data = agent.produce_data_from_enumeration(&self.contexts, 1.0, &mut rng)?;
        agent.communicative_accuracy(&data)
    }
}

impl HypothesisSpace for TradeoffSpace {
    type Hypothesis = QuantifierHypothesis;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> QuantifierHypothesis {
        let definitions = [
            self.grammar.generate(rng),
            self.grammar.generate(rng),
            self.grammar.generate(rng),
        ];
        QuantifierHypothesis::new(definitions, &self.base)
    }

    /// Redraw one of the three definitions from the grammar.
    fn propose<R: Rng + ?Sized>(
        &self,
        current: &QuantifierHypothesis,
        rng: &mut R,
    ) -> Option<(QuantifierHypothesis, f64)> {
        let slot = rng.gen_range(0..3);
        let mut definitions = current.definitions().clone();
        let old = self.grammar.log_prob(&definitions[slot]);
        definitions[slot] = self.grammar.generate(rng);
        let new = self.grammar.log_prob(&definitions[slot]);
        Some((QuantifierHypothesis::new(definitions, &self.base), new - old))
    }

    fn prior(&self, hypothesis: &QuantifierHypothesis) -> f64 {
        hypothesis
            .definitions()
            .iter()
            .map(|d| self.grammar.log_prob(d))
            .sum()
    }

    /// Observed data carry no weight here.
    fn score(&self, _hypothesis: &QuantifierHypothesis, _datum: &Datum) -> f64 {
        0.0
    }

    fn likelihood(&self, hypothesis: &QuantifierHypothesis, _data: &[Datum]) -> f64 {
        if self.config.likelihood_weight == 0.0 {
            return 0.0;
        }
        match self.communicative_accuracy(hypothesis) {
            Ok(accuracy) => self.config.likelihood_weight * accuracy,
            Err(e) => {
                debug!(hypothesis = %hypothesis, error = %e, "Hypothesis cannot describe every scene");
                f64::NEG_INFINITY
            }
        }
    }

    fn learn<R: Rng + ?Sized>(&self, data: &[Datum], rng: &mut R) -> Posterior<QuantifierHypothesis> {
        learn_in_parallel(
            self,
            data,
            self.learner.chains,
            self.learner.steps,
            self.learner.top_n,
            rng,
        )
    }
}
