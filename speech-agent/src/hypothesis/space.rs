//! Program hypothesis space, learned with parallel Metropolis-Hastings chains.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use semantics::Lexicon;

use crate::hypothesis::chain::learn_in_parallel;
use crate::hypothesis::program::{ProgramGrammar, ProgramHypothesis};
use crate::hypothesis::{Hypothesis, HypothesisSpace, Posterior};
use crate::types::Datum;

/// Learner tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Independent chains, run in parallel
    pub chains: usize,
    /// Steps per chain
    pub steps: usize,
    /// Size of the learned posterior
    pub top_n: usize,
    /// Depth bound of generated programs
    pub max_program_depth: usize,
    /// Largest `nth`/`card` index
    pub max_index: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            chains: 4,
            steps: 2000,
            top_n: 10,
            max_program_depth: 4,
            max_index: 2,
        }
    }
}

/// Composition programs over a fixed lexicon.
#[derive(Debug, Clone)]
pub struct ProgramSpace {
    lexicon: Arc<Lexicon>,
    grammar: ProgramGrammar,
    config: LearnerConfig,
}

impl ProgramSpace {
    pub fn new(lexicon: Arc<Lexicon>, config: LearnerConfig) -> Self {
        let grammar = ProgramGrammar {
            max_depth: config.max_program_depth,
            max_index: config.max_index,
        };
        Self {
            lexicon,
            grammar,
            config,
        }
    }

    pub fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Parse a program into a hypothesis over this space's lexicon.
    pub fn hypothesis(&self, program: &str) -> crate::types::Result<ProgramHypothesis> {
        ProgramHypothesis::parse(program, self.lexicon.clone())
    }
}

impl HypothesisSpace for ProgramSpace {
    type Hypothesis = ProgramHypothesis;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ProgramHypothesis {
        ProgramHypothesis::new(self.grammar.generate(rng), self.lexicon.clone())
    }

    fn propose<R: Rng + ?Sized>(
        &self,
        current: &ProgramHypothesis,
        rng: &mut R,
    ) -> Option<(ProgramHypothesis, f64)> {
        let program = current.program();
        let before = program.node_count();
        let index = rng.gen_range(0..before);
        let (proposal, old, new) = self.grammar.regenerate(program, index, rng)?;
        let after = proposal.node_count();

        let forward = new - (before as f64).ln();
        let backward = old - (after as f64).ln();
        Some((
            ProgramHypothesis::new(proposal, self.lexicon.clone()),
            forward - backward,
        ))
    }

    fn prior(&self, hypothesis: &ProgramHypothesis) -> f64 {
        self.grammar.log_prob(hypothesis.program())
    }

    fn score(&self, hypothesis: &ProgramHypothesis, datum: &Datum) -> f64 {
        let Ok(meaning) = hypothesis.meaning_of(&datum.utterance) else {
            return f64::NEG_INFINITY;
        };
        let r = datum.reliability;
        match meaning.truth_value(&datum.context) {
            Ok(Some(true)) => (r + (1.0 - r) / 2.0).ln(),
            Ok(Some(false)) => ((1.0 - r) / 2.0).ln(),
            Ok(None) | Err(_) => f64::NEG_INFINITY,
        }
    }

    fn learn<R: Rng + ?Sized>(&self, data: &[Datum], rng: &mut R) -> Posterior<ProgramHypothesis> {
        learn_in_parallel(
            self,
            data,
            self.config.chains,
            self.config.steps,
            self.config.top_n,
            rng,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use semantics::{Context, Entity};

    fn space(steps: usize) -> ProgramSpace {
        ProgramSpace::new(
            Arc::new(Lexicon::standard()),
            LearnerConfig {
                chains: 2,
                steps,
                top_n: 5,
                ..Default::default()
            },
        )
    }

    fn scene() -> Context {
        Context::new(vec![Entity::new(-2, false), Entity::new(3, true)]).unwrap()
    }

    #[test]
    fn test_score_follows_reliability() {
        let space = space(10);
        let h = space.hypothesis("( apply L R )").unwrap();

        let true_datum = Datum::new(scene(), "( ( the target ) positive )", 0.9);
        let expected = (0.9f64 + 0.05).ln();
        assert!((space.score(&h, &true_datum) - expected).abs() < 1e-12);

        let false_datum = Datum::new(scene(), "( ( the target ) negative )", 0.9);
        assert!((space.score(&h, &false_datum) - 0.05f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_score_rejects_impossible_data() {
        let space = space(10);
        let h = space.hypothesis("( apply L R )").unwrap();
        for utterance in [
            "( ( the 0 ) positive )",
            "( every target )",
            "( something purple )",
            "( ( the even ) positive",
        ] {
            let datum = Datum::new(scene(), utterance, 0.9);
            assert_eq!(space.score(&h, &datum), f64::NEG_INFINITY, "{}", utterance);
        }
    }

    #[test]
    fn test_propose_keeps_finite_prior() {
        let space = space(10);
        let mut rng = StdRng::seed_from_u64(4);
        let mut h = space.hypothesis("( apply L R )").unwrap();
        for _ in 0..100 {
            let (next, fb) = space.propose(&h, &mut rng).unwrap();
            assert!(fb.is_finite());
            assert!(space.prior(&next).is_finite());
            h = next;
        }
    }

    #[test]
    fn test_learn_finds_consistent_rules() {
        let space = space(1500);
        let data = vec![
            Datum::new(scene(), "( ( the target ) positive )", 0.9),
            Datum::new(scene(), "( something distractor )", 0.9),
            Datum::new(scene(), "( l_not ( ( every target ) negative ) )", 0.9),
        ];
        let mut rng = StdRng::seed_from_u64(21);
        let posterior = space.learn(&data, &mut rng);
        assert!(!posterior.is_empty());
        for (h, score) in posterior.iter() {
            assert!(score.is_finite());
            assert!(space.likelihood(h, &data).is_finite(), "{}", h);
        }
    }

    #[test]
    fn test_learn_is_reproducible() {
        let space = space(200);
        let data = vec![Datum::new(scene(), "( something target )", 0.9)];
        let a = space.learn(&data, &mut StdRng::seed_from_u64(8));
        let b = space.learn(&data, &mut StdRng::seed_from_u64(8));
        let names = |p: &Posterior<ProgramHypothesis>| {
            p.iter().map(|(h, _)| h.to_string()).collect::<Vec<_>>()
        };
        assert_eq!(names(&a), names(&b));
    }
}
