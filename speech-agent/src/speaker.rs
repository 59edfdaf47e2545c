//! Speaker model: choose among truthful utterances by informativity and cost.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use semantics::{CompositionTree, Context, Meaning};

use crate::search::Candidate;
use crate::types::{InformativityBase, SpeakerConfig};

/// Surprisal of a sentence staying true when target flags are reassigned.
///
/// Counts the flag assignments of `context` under which `meaning` is true.
/// Presupposition failures never count as true; whether they count among
/// the alternatives depends on `base`. Returns 0.0 if the sentence is never
/// true.
pub fn informativity(meaning: &Meaning, context: &Context, base: InformativityBase) -> f64 {
    let mut true_count = 0usize;
    let mut defined = 0usize;
    for variation in context.variations() {
        if let Ok(Some(value)) = meaning.truth_value(&variation) {
            defined += 1;
            if value {
                true_count += 1;
            }
        }
    }

    let alternatives = match base {
        InformativityBase::AllAssignments => context.assignment_count(),
        InformativityBase::DefinedAssignments => defined,
    };
    if true_count == 0 || alternatives == 0 {
        return 0.0;
    }
    -(true_count as f64 / alternatives as f64).ln()
}

/// Production cost of a tree.
pub fn complexity(tree: &CompositionTree, size_scaling: f64) -> f64 {
    tree.size() as f64 * size_scaling
}

/// A categorical distribution over truthful utterances for one context.
#[derive(Debug, Clone)]
pub struct Production {
    candidates: Vec<Candidate>,
    weights: Vec<f64>,
    distribution: WeightedIndex<f64>,
}

impl Production {
    /// Weigh candidates by `exp(alpha * (informativity - complexity))`.
    ///
    /// Weights are shifted by the best utility so the largest is 1. Returns
    /// `None` when there is nothing to say.
    pub fn new(candidates: Vec<Candidate>, context: &Context, config: &SpeakerConfig) -> Option<Self> {
        if candidates.is_empty() {
            return None;
        }
        let utilities: Vec<f64> = candidates
            .iter()
            .map(|c| {
                config.alpha
                    * (informativity(&c.meaning, context, config.informativity_base)
                        - complexity(&c.tree, config.size_scaling))
            })
            .collect();
        let best = utilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = utilities.iter().map(|u| (u - best).exp()).collect();
        let distribution = WeightedIndex::new(&weights).ok()?;
        Some(Self {
            candidates,
            weights,
            distribution,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &Candidate {
        &self.candidates[self.distribution.sample(rng)]
    }

    /// The most useful candidate.
    pub fn best(&self) -> &Candidate {
        let mut best = 0;
        for (i, weight) in self.weights.iter().enumerate() {
            if *weight > self.weights[best] {
                best = i;
            }
        }
        &self.candidates[best]
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates with their unnormalized weights.
    pub fn iter(&self) -> impl Iterator<Item = (&Candidate, f64)> + '_ {
        self.candidates.iter().zip(self.weights.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use semantics::{Entity, Lexicon, RightApplication};

    fn scene() -> Context {
        Context::new(vec![Entity::new(-5, false), Entity::new(3, true)]).unwrap()
    }

    fn candidate(utterance: &str) -> Candidate {
        let tree = CompositionTree::parse(utterance, &Lexicon::standard()).unwrap();
        let meaning = tree.compose(&RightApplication);
        Candidate { tree, meaning }
    }

    #[test]
    fn test_informativity_counts_assignments() {
        let ctx = scene();
        let all = InformativityBase::AllAssignments;

        // True in 3 of 4 assignments
        let weak = candidate("( something target )");
        assert!((informativity(&weak.meaning, &ctx, all) - (4.0f64 / 3.0).ln()).abs() < 1e-12);

        // True only when 3 is the single target
        let strong = candidate("( ( the target ) positive )");
        assert!((informativity(&strong.meaning, &ctx, all) - 4.0f64.ln()).abs() < 1e-12);

        // Context-free sentences say nothing about the flags
        let trivial = candidate("( something positive )");
        assert_eq!(informativity(&trivial.meaning, &ctx, all), 0.0);
    }

    #[test]
    fn test_defined_base_excludes_presupposition_failures() {
        let ctx = scene();
        let strong = candidate("( ( the target ) positive )");
        // Two assignments have exactly one target, one of them true
        let defined = informativity(&strong.meaning, &ctx, InformativityBase::DefinedAssignments);
        assert!((defined - 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_complexity_scales_with_size() {
        let c = candidate("( ( the target ) positive )");
        assert_eq!(complexity(&c.tree, 0.0), 0.0);
        assert_eq!(complexity(&c.tree, 0.5), 1.5);
    }

    #[test]
    fn test_production_prefers_informative() {
        let ctx = scene();
        let config = SpeakerConfig::default();
        let production = Production::new(
            vec![
                candidate("( something positive )"),
                candidate("( ( the target ) positive )"),
            ],
            &ctx,
            &config,
        )
        .unwrap();

        assert_eq!(production.len(), 2);
        assert_eq!(production.best().utterance(), "( ( the target ) positive )");
        let weights: Vec<f64> = production.iter().map(|(_, w)| w).collect();
        assert_eq!(weights[1], 1.0);
        assert!(weights[0] < 1e-3);

        let mut rng = StdRng::seed_from_u64(2);
        let informative = (0..100)
            .filter(|_| production.sample(&mut rng).utterance() == "( ( the target ) positive )")
            .count();
        assert!(informative > 90);
    }

    #[test]
    fn test_size_penalty_can_flip_preference() {
        let ctx = scene();
        let config = SpeakerConfig::default().with_size_scaling(1.0);
        let production = Production::new(
            vec![
                candidate("( something target )"),
                candidate("( l_not ( everything distractor ) )"),
            ],
            &ctx,
            &config,
        )
        .unwrap();
        // Both are true in the same three assignments; the shorter wins
        assert_eq!(production.best().utterance(), "( something target )");
    }

    #[test]
    fn test_no_candidates_means_no_production() {
        assert!(Production::new(Vec::new(), &scene(), &SpeakerConfig::default()).is_none());
    }
}
