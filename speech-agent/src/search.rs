//! Type-directed utterance search.
//!
//! Trees are built top-down from the sentence type using the grammar derived
//! from a composition rule and the lexicon's terminals per type. Random
//! generation draws a bounded number of trees; enumeration builds every
//! well-typed tree up to a depth.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use semantics::{Cfg, CompositionTree, Composer, Context, Lexicon, Meaning, TerminalsMap, TypeTag};

use crate::hypothesis::Hypothesis;
use crate::types::SpeakerConfig;

/// A tree that is true in some context, with its composed meaning.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub tree: CompositionTree,
    pub meaning: Meaning,
}

impl Candidate {
    pub fn utterance(&self) -> String {
        self.tree.to_string()
    }
}

/// Search state for one composition rule and lexicon.
#[derive(Clone)]
pub struct UtteranceSearch {
    composer: Arc<dyn Composer>,
    lexicon: Arc<Lexicon>,
    grammar: Cfg,
    terminals: TerminalsMap,
}

impl UtteranceSearch {
    pub fn new(composer: Arc<dyn Composer>, lexicon: Arc<Lexicon>) -> Self {
        let grammar = Cfg::derive(composer.as_ref());
        let terminals = lexicon.terminals();
        Self {
            composer,
            lexicon,
            grammar,
            terminals,
        }
    }

    pub fn for_hypothesis<H: Hypothesis>(hypothesis: &H) -> Self {
        Self::new(hypothesis.composer(), hypothesis.lexicon().clone())
    }

    pub fn grammar(&self) -> &Cfg {
        &self.grammar
    }

    pub fn terminals(&self) -> &TerminalsMap {
        &self.terminals
    }

    pub fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }

    /// Draw a random tree of type `tag` with at most `max_depth` levels of
    /// branching.
    ///
    /// A type with no terminals must branch; at the depth bound, or with no
    /// rule producing the type, it must be a leaf. Otherwise the node is a
    /// leaf with probability `leaf_probability`. Returns `None` when a forced
    /// branch has nowhere to go.
    pub fn generate_tree<R: Rng + ?Sized>(
        &self,
        tag: TypeTag,
        max_depth: usize,
        leaf_probability: f64,
        rng: &mut R,
    ) -> Option<CompositionTree> {
        let names = self.terminals.get(tag);
        let rules = self.grammar.productions(tag);
        if names.is_empty() && rules.is_empty() {
            return None;
        }

        let branch = if names.is_empty() {
            true
        } else if max_depth == 0 || rules.is_empty() {
            false
        } else {
            !rng.gen_bool(leaf_probability.clamp(0.0, 1.0))
        };

        if !branch {
            let name = names.choose(rng)?;
            return CompositionTree::terminal(name, &self.lexicon).ok();
        }
        if max_depth == 0 {
            return None;
        }

        let (left, right) = *rules.choose(rng)?;
        let left = self.generate_tree(left, max_depth - 1, leaf_probability, rng)?;
        let right = self.generate_tree(right, max_depth - 1, leaf_probability, rng)?;
        Some(CompositionTree::node(left, right))
    }

    /// Every well-typed tree of type `tag` up to `max_depth`, distinct by
    /// serialized form.
    pub fn enumerate(&self, tag: TypeTag, max_depth: usize) -> Vec<CompositionTree> {
        let mut memo = HashMap::new();
        self.enumerate_memo(tag, max_depth, &mut memo)
    }

    fn enumerate_memo(
        &self,
        tag: TypeTag,
        depth: usize,
        memo: &mut HashMap<(TypeTag, usize), Vec<CompositionTree>>,
    ) -> Vec<CompositionTree> {
        if let Some(trees) = memo.get(&(tag, depth)) {
            return trees.clone();
        }

        let mut seen = HashSet::new();
        let mut trees = Vec::new();
        for name in self.terminals.get(tag) {
            if let Ok(leaf) = CompositionTree::terminal(name, &self.lexicon) {
                if seen.insert(leaf.to_string()) {
                    trees.push(leaf);
                }
            }
        }

        if depth > 0 {
            for (left_tag, right_tag) in self.grammar.productions(tag) {
                let lefts = self.enumerate_memo(left_tag, depth - 1, memo);
                if lefts.is_empty() {
                    continue;
                }
                let rights = self.enumerate_memo(right_tag, depth - 1, memo);
                for left in &lefts {
                    for right in &rights {
                        let tree = CompositionTree::node(left.clone(), right.clone());
                        if seen.insert(tree.to_string()) {
                            trees.push(tree);
                        }
                    }
                }
            }
        }

        memo.insert((tag, depth), trees.clone());
        trees
    }

    /// Sentences up to `max_depth` that mention a context-dependent word.
    pub fn informative_sentences(&self, max_depth: usize) -> Vec<CompositionTree> {
        let dependent = self.lexicon.context_dependent_names();
        let sentences: Vec<CompositionTree> = self
            .enumerate(TypeTag::SENTENCE, max_depth)
            .into_iter()
            .filter(|tree| tree.contains_any(&dependent))
            .collect();
        trace!(depth = max_depth, sentences = sentences.len(), "Enumerated sentences");
        sentences
    }

    /// Distinct random sentences that are true in `context`.
    pub fn truthful_random<R: Rng + ?Sized>(
        &self,
        context: &Context,
        config: &SpeakerConfig,
        rng: &mut R,
    ) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for _ in 0..config.samples {
            let Some(tree) = self.generate_tree(
                TypeTag::SENTENCE,
                config.max_depth,
                config.leaf_probability,
                rng,
            ) else {
                continue;
            };
            if !seen.insert(tree.to_string()) {
                continue;
            }
            if let Some(candidate) = self.if_true(tree, context) {
                candidates.push(candidate);
            }
        }
        trace!(
            attempts = config.samples,
            distinct = seen.len(),
            truthful = candidates.len(),
            "Random utterance search"
        );
        candidates
    }

    /// The sentences among `sentences` that are true in `context`.
    pub fn truthful_among(&self, sentences: &[CompositionTree], context: &Context) -> Vec<Candidate> {
        sentences
            .iter()
            .filter_map(|tree| self.if_true(tree.clone(), context))
            .collect()
    }

    /// Compose a tree, keeping it only if it evaluates to true.
    ///
    /// Presupposition failures and non-truth meanings are discarded.
    fn if_true(&self, tree: CompositionTree, context: &Context) -> Option<Candidate> {
        let meaning = tree.compose(self.composer.as_ref());
        match meaning.truth_value(context) {
            Ok(Some(true)) => Some(Candidate { tree, meaning }),
            _ => None,
        }
    }
}

impl fmt::Debug for UtteranceSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UtteranceSearch")
            .field("rules", &self.grammar.len())
            .field("terminals", &self.lexicon.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use semantics::{Entity, RightApplication};

    fn search() -> UtteranceSearch {
        UtteranceSearch::new(Arc::new(RightApplication), Arc::new(Lexicon::standard()))
    }

    fn scene() -> Context {
        Context::new(vec![Entity::new(-5, false), Entity::new(3, true)]).unwrap()
    }

    #[test]
    fn test_generated_trees_are_sentences() {
        let search = search();
        let mut rng = StdRng::seed_from_u64(5);
        let mut built = 0;
        for _ in 0..200 {
            if let Some(tree) = search.generate_tree(TypeTag::SENTENCE, 4, 0.6, &mut rng) {
                built += 1;
                assert!(tree.depth() <= 4);
                assert_eq!(tree.compose(&RightApplication).tag(), TypeTag::Truth);
            }
        }
        assert!(built > 0);
    }

    #[test]
    fn test_generate_fails_without_room_to_branch() {
        // No sentence terminals exist, so depth 0 cannot produce one
        let search = search();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(search.generate_tree(TypeTag::SENTENCE, 0, 0.6, &mut rng).is_none());
        assert!(search.generate_tree(TypeTag::Entity, 3, 0.6, &mut rng).is_none());

        let leaf = search.generate_tree(TypeTag::Predicate, 0, 0.6, &mut rng).unwrap();
        assert_eq!(leaf.size(), 1);
    }

    #[test]
    fn test_enumeration_is_typed_and_distinct() {
        let search = search();
        let sentences = search.enumerate(TypeTag::SENTENCE, 1);
        // Two generalized quantifiers times twelve predicates
        assert_eq!(sentences.len(), 24);

        let deeper = search.enumerate(TypeTag::SENTENCE, 2);
        let mut names: Vec<String> = deeper.iter().map(|t| t.to_string()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(total > sentences.len());
        for tree in &deeper {
            assert!(tree.depth() <= 2);
            assert_eq!(tree.compose(&RightApplication).tag(), TypeTag::Truth);
        }
    }

    #[test]
    fn test_informative_sentences_mention_the_scene() {
        let search = search();
        let sentences = search.informative_sentences(2);
        assert!(!sentences.is_empty());
        assert!(sentences
            .iter()
            .all(|t| t.contains("target") || t.contains("distractor")));
    }

    #[test]
    fn test_truthful_random_candidates_are_true_and_distinct() {
        let search = search();
        let config = SpeakerConfig::default().with_samples(500);
        let mut rng = StdRng::seed_from_u64(9);
        let candidates = search.truthful_random(&scene(), &config, &mut rng);
        assert!(!candidates.is_empty());

        let mut seen = HashSet::new();
        for candidate in &candidates {
            assert!(seen.insert(candidate.utterance()));
            assert_eq!(candidate.meaning.truth_value(&scene()), Ok(Some(true)));
        }
    }

    #[test]
    fn test_presupposition_failures_are_excluded() {
        let search = search();
        let lexicon = Lexicon::standard();
        // Two positives, so "the positive" has no unique referent
        let ctx = Context::new(vec![Entity::new(4, true), Entity::new(3, false)]).unwrap();
        let sentences = vec![
            CompositionTree::parse("( ( the positive ) target )", &lexicon).unwrap(),
            CompositionTree::parse("( ( the target ) even )", &lexicon).unwrap(),
            CompositionTree::parse("( ( the target ) prime )", &lexicon).unwrap(),
        ];
        let kept: Vec<String> = search
            .truthful_among(&sentences, &ctx)
            .iter()
            .map(Candidate::utterance)
            .collect();
        assert_eq!(kept, vec!["( ( the target ) even )"]);
    }
}
