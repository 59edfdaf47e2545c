//! Composition operators and the pluggable composition rule.
//!
//! Every operator dispatches on the variant pair of its operands only, so
//! whether it yields `Empty` is fixed per tag pair. The content is never
//! inspected until the result is evaluated against a context.

use std::sync::Arc;

use crate::context::{Context, Entity};
use crate::meaning::Meaning;
use crate::types::*;

/// A rule combining two meanings into one, or into `Empty`.
pub trait Composer: Send + Sync {
    fn compose(&self, left: &Meaning, right: &Meaning) -> Meaning;
}

impl<F> Composer for F
where
    F: Fn(&Meaning, &Meaning) -> Meaning + Send + Sync,
{
    fn compose(&self, left: &Meaning, right: &Meaning) -> Meaning {
        self(left, right)
    }
}

/// Intensional right application: `c -> left(c)(right(c))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RightApplication;

impl Composer for RightApplication {
    fn compose(&self, left: &Meaning, right: &Meaning) -> Meaning {
        apply(left, right)
    }
}

/// Function application where the left operand's type takes the right's.
///
/// | left | right | result |
/// |------|-------|--------|
/// | uc | t | t |
/// | bc | t | uc |
/// | tc | t | bc |
/// | iv | e | t |
/// | dp | iv | t |
/// | tv | e | iv |
/// | q | iv | dp |
pub fn apply(left: &Meaning, right: &Meaning) -> Meaning {
    match (left, right) {
        (Meaning::Unary(f), Meaning::Truth(a)) => {
            let (f, a) = (f.clone(), a.clone());
            Meaning::Truth(Arc::new(move |c: &Context| Ok(f(c)?(a(c)?))))
        }
        (Meaning::Binary(f), Meaning::Truth(a)) => {
            let (f, a) = (f.clone(), a.clone());
            Meaning::Unary(Arc::new(move |c: &Context| Ok(f(c)?(a(c)?))))
        }
        (Meaning::Ternary(f), Meaning::Truth(a)) => {
            let (f, a) = (f.clone(), a.clone());
            Meaning::Binary(Arc::new(move |c: &Context| Ok(f(c)?(a(c)?))))
        }
        (Meaning::Predicate(f), Meaning::Entity(a)) => {
            let (f, a) = (f.clone(), a.clone());
            Meaning::Truth(Arc::new(move |c: &Context| Ok(f(c)?(&a(c)?))))
        }
        (Meaning::GeneralizedQuantifier(f), Meaning::Predicate(a)) => {
            let (f, a) = (f.clone(), a.clone());
            Meaning::Truth(Arc::new(move |c: &Context| f(c)?(&a(c)?)))
        }
        (Meaning::Relation(f), Meaning::Entity(a)) => {
            let (f, a) = (f.clone(), a.clone());
            Meaning::Predicate(Arc::new(move |c: &Context| Ok(f(c)?(&a(c)?))))
        }
        (Meaning::Quantifier(f), Meaning::Predicate(a)) => {
            let (f, a) = (f.clone(), a.clone());
            Meaning::GeneralizedQuantifier(Arc::new(move |c: &Context| Ok(f(c)?(&a(c)?))))
        }
        _ => Meaning::Empty,
    }
}

fn combine_predicates<F>(left: &Meaning, right: &Meaning, op: F) -> Meaning
where
    F: Fn(bool, bool) -> bool + Send + Sync + Copy + 'static,
{
    match (left, right) {
        (Meaning::Predicate(a), Meaning::Predicate(b)) => {
            let (a, b) = (a.clone(), b.clone());
            Meaning::Predicate(Arc::new(move |c: &Context| {
                let (p, q) = (a(c)?, b(c)?);
                Ok(Arc::new(move |e: &Entity| op(p(e), q(e))) as PredicateFn)
            }))
        }
        _ => Meaning::Empty,
    }
}

fn combine_truths<F>(left: &Meaning, right: &Meaning, op: F) -> Meaning
where
    F: Fn(bool, bool) -> bool + Send + Sync + 'static,
{
    match (left, right) {
        (Meaning::Truth(a), Meaning::Truth(b)) => {
            let (a, b) = (a.clone(), b.clone());
            Meaning::Truth(Arc::new(move |c: &Context| Ok(op(a(c)?, b(c)?))))
        }
        _ => Meaning::Empty,
    }
}

/// Entities satisfying both predicates.
pub fn intersection(left: &Meaning, right: &Meaning) -> Meaning {
    combine_predicates(left, right, |p, q| p && q)
}

/// Entities satisfying either predicate.
pub fn union(left: &Meaning, right: &Meaning) -> Meaning {
    combine_predicates(left, right, |p, q| p || q)
}

/// Entities satisfying the left predicate but not the right.
pub fn difference(left: &Meaning, right: &Meaning) -> Meaning {
    combine_predicates(left, right, |p, q| p && !q)
}

pub fn complement(meaning: &Meaning) -> Meaning {
    match meaning {
        Meaning::Predicate(a) => {
            let a = a.clone();
            Meaning::Predicate(Arc::new(move |c: &Context| {
                let p = a(c)?;
                Ok(Arc::new(move |e: &Entity| !p(e)) as PredicateFn)
            }))
        }
        _ => Meaning::Empty,
    }
}

pub fn negation(meaning: &Meaning) -> Meaning {
    match meaning {
        Meaning::Truth(a) => {
            let a = a.clone();
            Meaning::Truth(Arc::new(move |c: &Context| Ok(!a(c)?)))
        }
        _ => Meaning::Empty,
    }
}

pub fn conjunction(left: &Meaning, right: &Meaning) -> Meaning {
    combine_truths(left, right, |p, q| p && q)
}

pub fn disjunction(left: &Meaning, right: &Meaning) -> Meaning {
    combine_truths(left, right, |p, q| p || q)
}

/// Existential closure: some entity in the context satisfies the predicate.
pub fn exists(meaning: &Meaning) -> Meaning {
    match meaning {
        Meaning::Predicate(a) => {
            let a = a.clone();
            Meaning::Truth(Arc::new(move |c: &Context| {
                let p = a(c)?;
                Ok(c.iter().any(|e| p(e)))
            }))
        }
        _ => Meaning::Empty,
    }
}

/// The predicate true of exactly the given entity.
pub fn singleton(meaning: &Meaning) -> Meaning {
    match meaning {
        Meaning::Entity(a) => {
            let a = a.clone();
            Meaning::Predicate(Arc::new(move |c: &Context| {
                let id = a(c)?.id;
                Ok(Arc::new(move |e: &Entity| e.id == id) as PredicateFn)
            }))
        }
        _ => Meaning::Empty,
    }
}

/// The `n`-th satisfier (zero based, identity order).
///
/// Fails its presupposition when fewer than `n + 1` entities satisfy the
/// predicate.
pub fn nth_satisfier(n: usize, meaning: &Meaning) -> Meaning {
    match meaning {
        Meaning::Predicate(a) => {
            let a = a.clone();
            Meaning::Entity(Arc::new(move |c: &Context| {
                let p = a(c)?;
                c.iter()
                    .filter(|&e| p(e))
                    .nth(n)
                    .copied()
                    .ok_or(PresuppositionFailure)
            }))
        }
        _ => Meaning::Empty,
    }
}

/// Generalized quantifier true of predicates with exactly `n` satisfiers.
pub fn cardinality(n: usize) -> Meaning {
    Meaning::generalized_quantifier(move |ctx, scope| {
        Ok(ctx.iter().filter(|&e| scope(e)).count() == n)
    })
}

/// The first operand unless it is `Empty`.
pub fn otherwise(first: &Meaning, fallback: &Meaning) -> Meaning {
    if first.is_empty() {
        fallback.clone()
    } else {
        first.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn scene() -> Context {
        Context::new(vec![
            Entity::new(-4, false),
            Entity::new(1, true),
            Entity::new(3, true),
        ])
        .unwrap()
    }

    fn word(name: &str) -> Meaning {
        Lexicon::standard().get(name).unwrap().clone()
    }

    fn truth(m: &Meaning) -> Eval<Option<bool>> {
        m.truth_value(&scene())
    }

    #[test]
    fn test_apply_table() {
        let cases = [
            ("l_not", TypeTag::Truth, TypeTag::Truth),
            ("l_and", TypeTag::Truth, TypeTag::UnaryConnective),
            ("l_if_else", TypeTag::Truth, TypeTag::BinaryConnective),
            ("positive", TypeTag::Entity, TypeTag::Truth),
            ("something", TypeTag::Predicate, TypeTag::Truth),
            ("gt", TypeTag::Entity, TypeTag::Predicate),
            ("every", TypeTag::Predicate, TypeTag::GeneralizedQuantifier),
        ];
        for (name, arg, result) in cases {
            let composed = apply(&word(name), &Meaning::representative(arg));
            assert_eq!(composed.tag(), result, "{} applied to {}", name, arg);
        }
        assert!(apply(&word("positive"), &word("target")).is_empty());
        assert!(apply(&Meaning::Empty, &word("target")).is_empty());
    }

    #[test]
    fn test_quantified_sentences() {
        let every_target_positive = apply(&apply(&word("every"), &word("target")), &word("positive"));
        assert_eq!(truth(&every_target_positive), Ok(Some(true)));

        let the_target = apply(&word("the"), &word("target"));
        let the_target_positive = apply(&the_target, &word("positive"));
        assert_eq!(truth(&the_target_positive), Err(PresuppositionFailure));

        let something_negative = apply(&word("something"), &word("negative"));
        assert_eq!(truth(&something_negative), Ok(Some(true)));
    }

    #[test]
    fn test_connectives_compose() {
        let t = Meaning::constant(true);
        let f = Meaning::constant(false);
        let and_tf = apply(&apply(&word("l_and"), &t), &f);
        assert_eq!(truth(&and_tf), Ok(Some(false)));

        let if_else = apply(&apply(&apply(&word("l_if_else"), &f), &t), &f);
        assert_eq!(truth(&if_else), Ok(Some(false)));
        let if_else = apply(&apply(&apply(&word("l_if_else"), &t), &t), &f);
        assert_eq!(truth(&if_else), Ok(Some(true)));
    }

    #[test]
    fn test_set_operators() {
        let pos_targets = intersection(&word("positive"), &word("target"));
        let all_pos_targets = apply(&word("everything"), &union(&pos_targets, &word("distractor")));
        assert_eq!(truth(&all_pos_targets), Ok(Some(true)));

        let neg_not_target = difference(&word("negative"), &word("target"));
        assert_eq!(truth(&exists(&neg_not_target)), Ok(Some(true)));
        assert_eq!(truth(&exists(&complement(&word("prime")))), Ok(Some(true)));
        assert!(intersection(&word("positive"), &word("gt")).is_empty());
    }

    #[test]
    fn test_nth_satisfier() {
        let second_target = nth_satisfier(1, &word("target"));
        assert_eq!(second_target.tag(), TypeTag::Entity);
        let is_three = apply(&word("prime"), &second_target);
        assert_eq!(truth(&is_three), Ok(Some(true)));

        let third_target = nth_satisfier(2, &word("target"));
        assert!(third_target.evaluate(&scene()).is_err());

        let same = apply(&singleton(&second_target), &nth_satisfier(1, &word("positive")));
        assert_eq!(truth(&same), Ok(Some(true)));
    }

    #[test]
    fn test_cardinality_and_otherwise() {
        let two = apply(&cardinality(2), &word("target"));
        assert_eq!(truth(&two), Ok(Some(true)));
        let one = apply(&cardinality(1), &word("target"));
        assert_eq!(truth(&one), Ok(Some(false)));

        assert_eq!(otherwise(&Meaning::Empty, &word("even")).tag(), TypeTag::Predicate);
        assert_eq!(otherwise(&word("gt"), &word("even")).tag(), TypeTag::Relation);
    }

    #[test]
    fn test_truth_operators() {
        let t = Meaning::constant(true);
        let f = Meaning::constant(false);
        assert_eq!(truth(&negation(&f)), Ok(Some(true)));
        assert_eq!(truth(&conjunction(&t, &f)), Ok(Some(false)));
        assert_eq!(truth(&disjunction(&t, &f)), Ok(Some(true)));
        assert!(negation(&word("target")).is_empty());
    }

    #[test]
    fn test_closure_composer() {
        let flipped = |l: &Meaning, r: &Meaning| apply(r, l);
        let composed = flipped.compose(&word("target"), &word("something"));
        assert_eq!(composed.tag(), TypeTag::Truth);
        assert!(RightApplication.compose(&word("target"), &word("something")).is_empty());
    }
}
