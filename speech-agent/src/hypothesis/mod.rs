//! Hypotheses about the composition rule, and the spaces that learn them.
//!
//! A [`Hypothesis`] bundles a composition rule with a lexicon. A
//! [`HypothesisSpace`] samples, mutates and scores hypotheses and learns a
//! [`Posterior`] from observed data. Program spaces learn composition
//! rules; the tradeoff space learns quantifier words.

pub mod chain;
pub mod program;
pub mod quantifier;
pub mod space;
pub mod tradeoff;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::fmt;
use std::sync::Arc;

use semantics::{Cfg, CompositionTree, Composer, Lexicon, Meaning};

use crate::types::{Datum, Result};

/// A composition rule together with the vocabulary it composes.
pub trait Hypothesis: Clone + fmt::Display + Send + Sync + 'static {
    fn composer(&self) -> Arc<dyn Composer>;

    fn lexicon(&self) -> &Arc<Lexicon>;

    /// Grammar implied by the composition rule.
    fn grammar(&self) -> Cfg {
        Cfg::derive(self.composer().as_ref())
    }

    /// Parse and compose an utterance.
    fn meaning_of(&self, utterance: &str) -> Result<Meaning> {
        let tree = CompositionTree::parse(utterance, self.lexicon())?;
        Ok(tree.compose(self.composer().as_ref()))
    }
}

/// Sampling, proposal, scoring and learning over a family of hypotheses.
pub trait HypothesisSpace: Send + Sync {
    type Hypothesis: Hypothesis;

    /// Draw a hypothesis from the prior.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Hypothesis;

    /// Propose a mutation, returning it with its forward minus backward
    /// log proposal probability.
    fn propose<R: Rng + ?Sized>(
        &self,
        current: &Self::Hypothesis,
        rng: &mut R,
    ) -> Option<(Self::Hypothesis, f64)>;

    /// Log prior probability.
    fn prior(&self, hypothesis: &Self::Hypothesis) -> f64;

    /// Log likelihood of a single datum.
    fn score(&self, hypothesis: &Self::Hypothesis, datum: &Datum) -> f64;

    /// Log likelihood of a batch, stopping at the first impossible datum.
    fn likelihood(&self, hypothesis: &Self::Hypothesis, data: &[Datum]) -> f64 {
        let mut total = 0.0;
        for datum in data {
            total += self.score(hypothesis, datum);
            if total == f64::NEG_INFINITY {
                break;
            }
        }
        total
    }

    /// Unnormalized log posterior.
    fn log_posterior(&self, hypothesis: &Self::Hypothesis, data: &[Datum]) -> f64 {
        let prior = self.prior(hypothesis);
        if prior == f64::NEG_INFINITY {
            return prior;
        }
        prior + self.likelihood(hypothesis, data)
    }

    /// Learn from data, returning the best hypotheses found.
    fn learn<R: Rng + ?Sized>(&self, data: &[Datum], rng: &mut R) -> Posterior<Self::Hypothesis>;
}

/// Bounded set of the best distinct hypotheses by log posterior.
#[derive(Debug, Clone)]
pub struct Posterior<H> {
    capacity: usize,
    /// Sorted by descending score
    entries: Vec<(H, f64)>,
}

impl<H: Hypothesis> Posterior<H> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    /// Offer a hypothesis; kept if finite, new, and among the best.
    pub fn insert(&mut self, hypothesis: H, score: f64) -> bool {
        if !score.is_finite() || self.capacity == 0 {
            return false;
        }
        let key = hypothesis.to_string();
        if self.entries.iter().any(|(h, _)| h.to_string() == key) {
            return false;
        }
        if self.entries.len() >= self.capacity {
            match self.entries.last() {
                Some((_, worst)) if score > *worst => {
                    self.entries.pop();
                }
                _ => return false,
            }
        }
        let pos = self.entries.partition_point(|(_, s)| *s >= score);
        self.entries.insert(pos, (hypothesis, score));
        true
    }

    /// Fold another posterior into this one.
    pub fn merge(mut self, other: Posterior<H>) -> Self {
        for (hypothesis, score) in other.entries {
            self.insert(hypothesis, score);
        }
        self
    }

    /// Sample proportionally to `exp(score)`.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&H> {
        self.pick_except(&[], rng)
    }

    /// Like [`Posterior::pick`], never returning a hypothesis whose string
    /// form is in `rejected`. `None` once everything is rejected.
    pub fn pick_except<R: Rng + ?Sized>(&self, rejected: &[String], rng: &mut R) -> Option<&H> {
        let allowed: Vec<bool> = self
            .entries
            .iter()
            .map(|(h, _)| !rejected.contains(&h.to_string()))
            .collect();
        // Entries are sorted, so the first allowed one holds the maximum
        let max = self
            .entries
            .iter()
            .zip(&allowed)
            .find(|(_, ok)| **ok)
            .map(|((_, s), _)| *s)?;
        let weights = self
            .entries
            .iter()
            .zip(&allowed)
            .map(|((_, s), ok)| if *ok { (s - max).exp() } else { 0.0 });
        let distribution = WeightedIndex::new(weights).ok()?;
        self.entries.get(distribution.sample(rng)).map(|(h, _)| h)
    }

    /// The highest scoring hypothesis.
    pub fn best(&self) -> Option<&H> {
        self.entries.first().map(|(h, _)| h)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hypotheses with their log posterior, best first.
    pub fn iter(&self) -> impl Iterator<Item = (&H, f64)> + '_ {
        self.entries.iter().map(|(h, s)| (h, *s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use semantics::RightApplication;

    #[derive(Clone)]
    struct Named(&'static str, Arc<Lexicon>);

    impl fmt::Display for Named {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl Hypothesis for Named {
        fn composer(&self) -> Arc<dyn Composer> {
            Arc::new(RightApplication)
        }

        fn lexicon(&self) -> &Arc<Lexicon> {
            &self.1
        }
    }

    fn named(name: &'static str) -> Named {
        Named(name, Arc::new(Lexicon::standard()))
    }

    #[test]
    fn test_posterior_keeps_best_distinct() {
        let mut posterior = Posterior::new(2);
        assert!(posterior.insert(named("a"), -3.0));
        assert!(posterior.insert(named("b"), -1.0));
        assert!(!posterior.insert(named("b"), -0.5));
        assert!(!posterior.insert(named("c"), -4.0));
        assert!(posterior.insert(named("d"), -2.0));
        assert!(!posterior.insert(named("e"), f64::NEG_INFINITY));

        let order: Vec<String> = posterior.iter().map(|(h, _)| h.to_string()).collect();
        assert_eq!(order, vec!["b", "d"]);
        assert_eq!(posterior.best().unwrap().to_string(), "b");
    }

    #[test]
    fn test_posterior_merge() {
        let mut left = Posterior::new(3);
        left.insert(named("a"), -1.0);
        let mut right = Posterior::new(3);
        right.insert(named("a"), -1.0);
        right.insert(named("b"), -2.0);
        let merged = left.merge(right);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_pick_follows_weights() {
        let mut posterior = Posterior::new(2);
        posterior.insert(named("likely"), 0.0);
        posterior.insert(named("unlikely"), -50.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(posterior.pick(&mut rng).unwrap().to_string(), "likely");
        }
        assert!(Posterior::<Named>::new(2).pick(&mut rng).is_none());
    }

    #[test]
    fn test_pick_except_skips_rejected() {
        let mut posterior = Posterior::new(3);
        posterior.insert(named("likely"), 0.0);
        posterior.insert(named("unlikely"), -50.0);
        let mut rng = StdRng::seed_from_u64(3);

        let rejected = vec!["likely".to_string()];
        for _ in 0..10 {
            let picked = posterior.pick_except(&rejected, &mut rng).unwrap();
            assert_eq!(picked.to_string(), "unlikely");
        }

        let everything = vec!["likely".to_string(), "unlikely".to_string()];
        assert!(posterior.pick_except(&everything, &mut rng).is_none());
    }

    #[test]
    fn test_meaning_of_uses_rule() {
        let h = named("apply");
        let ctx = semantics::Context::new(vec![semantics::Entity::new(1, true)]).unwrap();
        let meaning = h.meaning_of("( something target )").unwrap();
        assert_eq!(meaning.truth_value(&ctx), Ok(Some(true)));
        assert!(h.meaning_of("( something blue )").is_err());
        assert_eq!(h.grammar(), Cfg::derive(&RightApplication));
    }
}
