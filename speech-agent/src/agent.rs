//! Agent - a speaker and listener holding one hypothesis at a time.
//!
//! An agent learns a posterior from observed data, commits to one
//! hypothesis from it, may mutate that choice, and then speaks about new
//! scenes with the chosen composition rule.

use rand::Rng;
use std::fmt;
use tracing::{debug, warn};

use semantics::{CompositionTree, Context, Lexicon};

use crate::hypothesis::{Hypothesis, HypothesisSpace, Posterior};
use crate::listener;
use crate::search::UtteranceSearch;
use crate::speaker::Production;
use crate::types::{AgentError, Datum, Result, SpeakerConfig};

/// A speaker-listener over hypotheses of type `H`.
#[derive(Clone)]
pub struct Agent<H: Hypothesis> {
    /// Tuning constants
    config: SpeakerConfig,
    /// Hypothesis in use
    hypothesis: Option<H>,
    /// Choice before mutation, when mutated
    original: Option<H>,
    /// Learned posterior
    posterior: Option<Posterior<H>>,
    /// Search derived from `hypothesis`
    search: Option<UtteranceSearch>,
}

impl<H: Hypothesis> Agent<H> {
    pub fn new(config: SpeakerConfig) -> Self {
        Self {
            config,
            hypothesis: None,
            original: None,
            posterior: None,
            search: None,
        }
    }

    /// Commit to a hypothesis.
    pub fn with_hypothesis(mut self, hypothesis: H) -> Self {
        self.set_hypothesis(hypothesis);
        self
    }

    fn set_hypothesis(&mut self, hypothesis: H) {
        self.search = Some(UtteranceSearch::for_hypothesis(&hypothesis));
        self.hypothesis = Some(hypothesis);
    }

    pub fn config(&self) -> &SpeakerConfig {
        &self.config
    }

    pub fn hypothesis(&self) -> Option<&H> {
        self.hypothesis.as_ref()
    }

    /// The hypothesis picked before mutation, if a mutation happened.
    pub fn original(&self) -> Option<&H> {
        self.original.as_ref()
    }

    pub fn is_mutated(&self) -> bool {
        self.original.is_some()
    }

    pub fn posterior(&self) -> Option<&Posterior<H>> {
        self.posterior.as_ref()
    }

    pub fn search(&self) -> Result<&UtteranceSearch> {
        self.search.as_ref().ok_or(AgentError::NoHypothesis)
    }

    /// Learn a posterior from `data`.
    pub fn learn<S, R>(&mut self, space: &S, data: &[Datum], rng: &mut R) -> Result<()>
    where
        S: HypothesisSpace<Hypothesis = H>,
        R: Rng + ?Sized,
    {
        let posterior = space.learn(data, rng);
        if posterior.is_empty() {
            return Err(AgentError::EmptyPosterior);
        }
        debug!(data = data.len(), kept = posterior.len(), "Agent learned");
        self.posterior = Some(posterior);
        Ok(())
    }

    /// Commit to a hypothesis drawn from the learned posterior.
    pub fn pick_hypothesis<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&H> {
        self.pick_hypothesis_except(&[], rng)
    }

    /// Commit to a posterior hypothesis not listed in `rejected`.
    ///
    /// Fails with [`AgentError::EmptyPosterior`] once every hypothesis has
    /// been rejected.
    pub fn pick_hypothesis_except<R: Rng + ?Sized>(
        &mut self,
        rejected: &[String],
        rng: &mut R,
    ) -> Result<&H> {
        let posterior = self.posterior.as_ref().ok_or(AgentError::NoPosterior)?;
        let picked = posterior
            .pick_except(rejected, rng)
            .ok_or(AgentError::EmptyPosterior)?
            .clone();
        self.original = None;
        self.set_hypothesis(picked);
        self.hypothesis.as_ref().ok_or(AgentError::NoHypothesis)
    }

    /// With probability `probability`, replace the hypothesis by a proposal
    /// from `space`. Returns whether a mutation happened.
    pub fn mutate<S, R>(&mut self, space: &S, probability: f64, rng: &mut R) -> Result<bool>
    where
        S: HypothesisSpace<Hypothesis = H>,
        R: Rng + ?Sized,
    {
        let current = self.hypothesis.as_ref().ok_or(AgentError::NoHypothesis)?;
        if !rng.gen_bool(probability.clamp(0.0, 1.0)) {
            return Ok(false);
        }
        let Some((proposal, _)) = space.propose(current, rng) else {
            return Ok(false);
        };
        debug!(from = %current, to = %proposal, "Hypothesis mutated");
        let before = current.clone();
        self.set_hypothesis(proposal);
        self.original = Some(before);
        Ok(true)
    }

    /// Distribution over truthful random utterances for `context`.
    ///
    /// `None` when nothing true was found.
    pub fn produce<R: Rng + ?Sized>(&self, context: &Context, rng: &mut R) -> Result<Option<Production>> {
        let candidates = self.search()?.truthful_random(context, &self.config, rng);
        Ok(Production::new(candidates, context, &self.config))
    }

    /// Sample one utterance for `context`.
    pub fn produce_utterance<R: Rng + ?Sized>(
        &self,
        context: &Context,
        rng: &mut R,
    ) -> Result<Option<String>> {
        Ok(self
            .produce(context, rng)?
            .map(|production| production.sample(rng).utterance()))
    }

    /// One datum per context, stamped with `reliability`.
    ///
    /// Fails if any context has no truthful utterance.
    pub fn produce_data<R: Rng + ?Sized>(
        &self,
        contexts: &[Context],
        reliability: f64,
        rng: &mut R,
    ) -> Result<Vec<Datum>> {
        contexts
            .iter()
            .map(|context| {
                let utterance = self.produce_utterance(context, rng)?.ok_or_else(|| {
                    AgentError::NoTruthfulUtterance {
                        context: context.to_string(),
                    }
                })?;
                Ok(Datum::new(context.clone(), utterance, reliability))
            })
            .collect()
    }

    /// Like [`Agent::produce_data`], choosing among every informative
    /// sentence up to the enumeration depth instead of random samples.
    pub fn produce_data_from_enumeration<R: Rng + ?Sized>(
        &self,
        contexts: &[Context],
        reliability: f64,
        rng: &mut R,
    ) -> Result<Vec<Datum>> {
        let search = self.search()?;
        let sentences = search.informative_sentences(self.config.enumeration_depth);
        contexts
            .iter()
            .map(|context| {
                let candidates = search.truthful_among(&sentences, context);
                let production = Production::new(candidates, context, &self.config).ok_or_else(|| {
                    AgentError::NoTruthfulUtterance {
                        context: context.to_string(),
                    }
                })?;
                let utterance = production.sample(rng).utterance();
                Ok(Datum::new(context.clone(), utterance, reliability))
            })
            .collect()
    }

    /// Listener beliefs for an utterance, `None` if it cannot be interpreted.
    pub fn interpret(&self, utterance: &str, context: &Context) -> Result<Option<Vec<f64>>> {
        let hypothesis = self.hypothesis.as_ref().ok_or(AgentError::NoHypothesis)?;
        let meaning = hypothesis.meaning_of(utterance)?;
        Ok(listener::interpret(&meaning, context))
    }

    /// Mean log score of this agent, as listener, over `data`.
    pub fn communicative_accuracy(&self, data: &[Datum]) -> Result<f64> {
        let hypothesis = self.hypothesis.as_ref().ok_or(AgentError::NoHypothesis)?;
        Ok(listener::communicative_accuracy(hypothesis, data))
    }

    /// Sample hypotheses from the prior until one can describe every context.
    ///
    /// Returns the agent with the data it produced. Gives up after
    /// `max_attempts` hypotheses.
    pub fn seed_from_hypothesis<S, R>(
        config: SpeakerConfig,
        space: &S,
        contexts: &[Context],
        reliability: f64,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<(Self, Vec<Datum>)>
    where
        S: HypothesisSpace<Hypothesis = H>,
        R: Rng + ?Sized,
    {
        for attempt in 1..=max_attempts {
            let agent = Self::new(config.clone()).with_hypothesis(space.sample(rng));
            match agent.produce_data(contexts, reliability, rng) {
                Ok(data) => {
                    if let Some(h) = agent.hypothesis() {
                        debug!(attempt, hypothesis = %h, "Seeded agent");
                    }
                    return Ok((agent, data));
                }
                Err(AgentError::NoTruthfulUtterance { context }) => {
                    debug!(attempt, %context, "Seed hypothesis could not describe a context");
                }
                Err(e) => return Err(e),
            }
        }
        warn!(attempts = max_attempts, "Seeding from hypothesis failed");
        Err(AgentError::SeedingFailed {
            attempts: max_attempts,
        })
    }
}

/// Random untyped utterances, one per context.
///
/// Yields no data for an empty lexicon.
pub fn seed_from_random_strings<R: Rng + ?Sized>(
    lexicon: &Lexicon,
    contexts: &[Context],
    reliability: f64,
    max_depth: usize,
    rng: &mut R,
) -> Vec<Datum> {
    let names = lexicon.names();
    contexts
        .iter()
        .filter_map(|context| {
            let utterance = CompositionTree::random_expression(&names, rng, max_depth)?;
            Some(Datum::new(context.clone(), utterance, reliability))
        })
        .collect()
}

impl<H: Hypothesis> fmt::Debug for Agent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("hypothesis", &self.hypothesis.as_ref().map(ToString::to_string))
            .field("mutated", &self.is_mutated())
            .field("posterior", &self.posterior.as_ref().map(Posterior::len))
            .finish()
    }
}
