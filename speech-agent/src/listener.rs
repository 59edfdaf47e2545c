//! Listener model and communicative accuracy.
//!
//! The listener sees entity identities but not target flags. It considers
//! every flag assignment, keeps those under which the utterance is true,
//! and reports for each entity the share of kept assignments marking it as
//! a target.

use semantics::{Context, Meaning};

use crate::hypothesis::Hypothesis;
use crate::types::Datum;

/// Per-entity target probability, in id order.
///
/// Assignments raising a presupposition failure are skipped. Returns `None`
/// if the meaning is not a sentence or no assignment makes it true.
pub fn interpret(meaning: &Meaning, context: &Context) -> Option<Vec<f64>> {
    let mut counts = vec![0usize; context.len()];
    let mut true_count = 0usize;
    for variation in context.variations() {
        match meaning.truth_value(&variation) {
            Ok(Some(true)) => {
                true_count += 1;
                for (count, entity) in counts.iter_mut().zip(variation.iter()) {
                    if entity.is_target {
                        *count += 1;
                    }
                }
            }
            Ok(Some(false)) | Err(_) => {}
            Ok(None) => return None,
        }
    }
    if true_count == 0 {
        return None;
    }
    Some(
        counts
            .into_iter()
            .map(|count| count as f64 / true_count as f64)
            .collect(),
    )
}

/// Log probability of the true flags under a listener's beliefs.
pub fn log_score(beliefs: &[f64], context: &Context) -> f64 {
    context
        .iter()
        .zip(beliefs)
        .map(|(entity, p)| if entity.is_target { p.ln() } else { (1.0 - p).ln() })
        .sum()
}

/// Mean log score of a listener holding `hypothesis` over `data`.
///
/// A datum the listener cannot interpret scores as an uninformed listener
/// (probability 0.5 for every entity). Empty data scores 0.
pub fn communicative_accuracy<H: Hypothesis>(hypothesis: &H, data: &[Datum]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let total: f64 = data
        .iter()
        .map(|datum| {
            let beliefs = hypothesis
                .meaning_of(&datum.utterance)
                .ok()
                .and_then(|meaning| interpret(&meaning, &datum.context))
                .unwrap_or_else(|| vec![0.5; datum.context.len()]);
            log_score(&beliefs, &datum.context)
        })
        .sum();
    total / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantics::{CompositionTree, Composer, Entity, Lexicon, RightApplication};
    use std::sync::Arc;

    #[derive(Clone)]
    struct Apply(Arc<Lexicon>);

    impl std::fmt::Display for Apply {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("apply")
        }
    }

    impl Hypothesis for Apply {
        fn composer(&self) -> Arc<dyn Composer> {
            Arc::new(RightApplication)
        }

        fn lexicon(&self) -> &Arc<Lexicon> {
            &self.0
        }
    }

    fn meaning(utterance: &str) -> Meaning {
        CompositionTree::parse(utterance, &Lexicon::standard())
            .unwrap()
            .compose(&RightApplication)
    }

    fn scene() -> Context {
        Context::new(vec![Entity::new(3, true), Entity::new(-5, false)]).unwrap()
    }

    #[test]
    fn test_unique_target_is_identified() {
        // Entities are ordered by id: -5 then 3
        let beliefs = interpret(&meaning("( ( the target ) positive )"), &scene()).unwrap();
        assert_eq!(beliefs, vec![0.0, 1.0]);
    }

    #[test]
    fn test_marginalizes_over_true_assignments() {
        let beliefs = interpret(&meaning("( something target )"), &scene()).unwrap();
        for p in beliefs {
            assert!((p - 2.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_presupposition_failures_are_skipped() {
        // "the target" fails when there are zero or two targets
        let ctx = Context::new(vec![Entity::new(4, true), Entity::new(-1, false)]).unwrap();
        let beliefs = interpret(&meaning("( ( the target ) even )"), &ctx).unwrap();
        assert_eq!(beliefs, vec![0.0, 1.0]);

        // Every assignment fails or is false
        assert!(interpret(&meaning("( ( the 0 ) even )"), &ctx).is_none());
    }

    #[test]
    fn test_uninterpretable_meanings() {
        assert!(interpret(&meaning("( every target )"), &scene()).is_none());
        assert!(interpret(&meaning("( something ( l_not positive ) )"), &scene()).is_none());
        assert!(interpret(&meaning("( everything target )"), &scene()).is_some());
    }

    #[test]
    fn test_probabilities_are_bounded() {
        let ctx = Context::new(vec![
            Entity::new(-3, true),
            Entity::new(0, false),
            Entity::new(2, true),
            Entity::new(7, false),
        ])
        .unwrap();
        for utterance in [
            "( something target )",
            "( ( some target ) even )",
            "( ( every distractor ) positive )",
            "( l_not ( ( the target ) prime ) )",
        ] {
            if let Some(beliefs) = interpret(&meaning(utterance), &ctx) {
                assert_eq!(beliefs.len(), 4);
                assert!(beliefs.iter().all(|p| (0.0..=1.0).contains(p)), "{}", utterance);
            }
        }
    }

    #[test]
    fn test_perfect_listener_scores_zero() {
        let ctx = scene();
        assert_eq!(log_score(&[0.0, 1.0], &ctx), 0.0);
        assert_eq!(log_score(&[1.0, 1.0], &ctx), f64::NEG_INFINITY);
    }

    #[test]
    fn test_communicative_accuracy() {
        let h = Apply(Arc::new(Lexicon::standard()));
        let perfect = vec![Datum::new(scene(), "( ( the target ) positive )", 0.9)];
        assert_eq!(communicative_accuracy(&h, &perfect), 0.0);

        let vague = vec![
            Datum::new(scene(), "( ( the target ) positive )", 0.9),
            Datum::new(scene(), "( something target )", 0.9),
        ];
        let expected = ((2.0f64 / 3.0).ln() + (1.0f64 / 3.0).ln()) / 2.0;
        assert!((communicative_accuracy(&h, &vague) - expected).abs() < 1e-12);

        // Unknown words leave the listener uninformed
        let garbled = vec![Datum::new(scene(), "( something purple )", 0.9)];
        assert!((communicative_accuracy(&h, &garbled) - 2.0 * 0.5f64.ln()).abs() < 1e-12);

        assert_eq!(communicative_accuracy(&h, &[]), 0.0);
    }
}
