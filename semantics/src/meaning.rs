//! Meanings: tagged functions from a context to an extension.
//!
//! A [`Meaning`] is an enum over the semantic categories, so its tag is
//! structural. Composition rules dispatch on the variant pair without ever
//! evaluating content, which keeps grammar derivation decidable.

use std::fmt;
use std::sync::Arc;

use crate::context::{Context, Entity};
use crate::types::*;

/// The value a meaning takes in one context.
#[derive(Clone)]
pub enum Extension {
    Entity(Entity),
    Truth(bool),
    Unary(UnaryFn),
    Binary(BinaryFn),
    Ternary(TernaryFn),
    Predicate(PredicateFn),
    GeneralizedQuantifier(GenQuantFn),
    Relation(RelationFn),
    Quantifier(QuantifierFn),
    Empty,
}

impl Extension {
    pub fn tag(&self) -> TypeTag {
        match self {
            Extension::Entity(_) => TypeTag::Entity,
            Extension::Truth(_) => TypeTag::Truth,
            Extension::Unary(_) => TypeTag::UnaryConnective,
            Extension::Binary(_) => TypeTag::BinaryConnective,
            Extension::Ternary(_) => TypeTag::TernaryConnective,
            Extension::Predicate(_) => TypeTag::Predicate,
            Extension::GeneralizedQuantifier(_) => TypeTag::GeneralizedQuantifier,
            Extension::Relation(_) => TypeTag::Relation,
            Extension::Quantifier(_) => TypeTag::Quantifier,
            Extension::Empty => TypeTag::Empty,
        }
    }

    pub fn as_truth(&self) -> Option<bool> {
        match self {
            Extension::Truth(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<Entity> {
        match self {
            Extension::Entity(entity) => Some(*entity),
            _ => None,
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Entity(e) => write!(f, "Entity({})", e),
            Extension::Truth(t) => write!(f, "Truth({})", t),
            other => write!(f, "Extension({})", other.tag()),
        }
    }
}

/// A context-indexed function into an extension of one fixed category.
#[derive(Clone)]
pub enum Meaning {
    Entity(Intension<Entity>),
    Truth(Intension<bool>),
    Unary(Intension<UnaryFn>),
    Binary(Intension<BinaryFn>),
    Ternary(Intension<TernaryFn>),
    Predicate(Intension<PredicateFn>),
    GeneralizedQuantifier(Intension<GenQuantFn>),
    Relation(Intension<RelationFn>),
    Quantifier(Intension<QuantifierFn>),
    Empty,
}

impl Meaning {
    /// The non-composable meaning.
    pub fn empty() -> Self {
        Meaning::Empty
    }

    pub fn entity<F>(f: F) -> Self
    where
        F: Fn(&Context) -> Eval<Entity> + Send + Sync + 'static,
    {
        Meaning::Entity(Arc::new(f))
    }

    pub fn truth<F>(f: F) -> Self
    where
        F: Fn(&Context) -> Eval<bool> + Send + Sync + 'static,
    {
        Meaning::Truth(Arc::new(f))
    }

    /// A context-independent truth value.
    pub fn constant(value: bool) -> Self {
        Meaning::truth(move |_| Ok(value))
    }

    /// A context-independent unary connective.
    pub fn unary<F>(f: F) -> Self
    where
        F: Fn(bool) -> bool + Send + Sync + 'static,
    {
        let op: UnaryFn = Arc::new(f);
        Meaning::Unary(Arc::new(move |_: &Context| Ok(op.clone())))
    }

    /// A context-independent binary connective, `f(x, y)` applied as `(op x) y`.
    pub fn binary<F>(f: F) -> Self
    where
        F: Fn(bool, bool) -> bool + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let op: BinaryFn = Arc::new(move |x: bool| {
            let f = f.clone();
            Arc::new(move |y: bool| f(x, y)) as UnaryFn
        });
        Meaning::Binary(Arc::new(move |_: &Context| Ok(op.clone())))
    }

    /// A context-independent ternary connective, `f(x, y, z)`.
    pub fn ternary<F>(f: F) -> Self
    where
        F: Fn(bool, bool, bool) -> bool + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let op: TernaryFn = Arc::new(move |x: bool| {
            let f = f.clone();
            Arc::new(move |y: bool| {
                let f = f.clone();
                Arc::new(move |z: bool| f(x, y, z)) as UnaryFn
            }) as BinaryFn
        });
        Meaning::Ternary(Arc::new(move |_: &Context| Ok(op.clone())))
    }

    /// A context-independent predicate over entities.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Entity) -> bool + Send + Sync + 'static,
    {
        let pred: PredicateFn = Arc::new(f);
        Meaning::Predicate(Arc::new(move |_: &Context| Ok(pred.clone())))
    }

    /// A context-independent relation, `f(x, y)` applied as `(rel y) x`.
    pub fn relation<F>(f: F) -> Self
    where
        F: Fn(&Entity, &Entity) -> bool + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let rel: RelationFn = Arc::new(move |y: &Entity| {
            let f = f.clone();
            let y = *y;
            Arc::new(move |x: &Entity| f(x, &y)) as PredicateFn
        });
        Meaning::Relation(Arc::new(move |_: &Context| Ok(rel.clone())))
    }

    /// A generalized quantifier reading the context's entities.
    pub fn generalized_quantifier<F>(f: F) -> Self
    where
        F: Fn(&Context, &PredicateFn) -> Eval<bool> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Meaning::GeneralizedQuantifier(Arc::new(move |ctx: &Context| {
            let f = f.clone();
            let ctx = ctx.clone();
            Ok(Arc::new(move |pred: &PredicateFn| f(&ctx, pred)) as GenQuantFn)
        }))
    }

    /// A determiner reading the context's entities, `f(ctx, restrictor, scope)`.
    pub fn quantifier<F>(f: F) -> Self
    where
        F: Fn(&Context, &PredicateFn, &PredicateFn) -> Eval<bool> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Meaning::Quantifier(Arc::new(move |ctx: &Context| {
            let f = f.clone();
            let ctx = ctx.clone();
            Ok(Arc::new(move |restrictor: &PredicateFn| {
                let f = f.clone();
                let ctx = ctx.clone();
                let restrictor = restrictor.clone();
                Arc::new(move |scope: &PredicateFn| f(&ctx, &restrictor, scope)) as GenQuantFn
            }) as QuantifierFn)
        }))
    }

    /// A zero-content meaning of the given category.
    ///
    /// Composition rules only look at tags, so these stand in for every
    /// meaning of their category when a rule is tried against them.
    pub fn representative(tag: TypeTag) -> Self {
        match tag {
            TypeTag::Entity => Meaning::entity(|_| Ok(Entity::new(0, false))),
            TypeTag::Truth => Meaning::constant(false),
            TypeTag::UnaryConnective => Meaning::unary(|x| x),
            TypeTag::BinaryConnective => Meaning::binary(|x, _| x),
            TypeTag::TernaryConnective => Meaning::ternary(|x, _, _| x),
            TypeTag::Predicate => Meaning::predicate(|_| false),
            TypeTag::GeneralizedQuantifier => Meaning::generalized_quantifier(|_, _| Ok(false)),
            TypeTag::Relation => Meaning::relation(|_, _| false),
            TypeTag::Quantifier => Meaning::quantifier(|_, _, _| Ok(false)),
            TypeTag::Empty => Meaning::Empty,
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Meaning::Entity(_) => TypeTag::Entity,
            Meaning::Truth(_) => TypeTag::Truth,
            Meaning::Unary(_) => TypeTag::UnaryConnective,
            Meaning::Binary(_) => TypeTag::BinaryConnective,
            Meaning::Ternary(_) => TypeTag::TernaryConnective,
            Meaning::Predicate(_) => TypeTag::Predicate,
            Meaning::GeneralizedQuantifier(_) => TypeTag::GeneralizedQuantifier,
            Meaning::Relation(_) => TypeTag::Relation,
            Meaning::Quantifier(_) => TypeTag::Quantifier,
            Meaning::Empty => TypeTag::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Meaning::Empty)
    }

    /// Evaluate against a context.
    pub fn evaluate(&self, ctx: &Context) -> Eval<Extension> {
        Ok(match self {
            Meaning::Entity(f) => Extension::Entity(f(ctx)?),
            Meaning::Truth(f) => Extension::Truth(f(ctx)?),
            Meaning::Unary(f) => Extension::Unary(f(ctx)?),
            Meaning::Binary(f) => Extension::Binary(f(ctx)?),
            Meaning::Ternary(f) => Extension::Ternary(f(ctx)?),
            Meaning::Predicate(f) => Extension::Predicate(f(ctx)?),
            Meaning::GeneralizedQuantifier(f) => Extension::GeneralizedQuantifier(f(ctx)?),
            Meaning::Relation(f) => Extension::Relation(f(ctx)?),
            Meaning::Quantifier(f) => Extension::Quantifier(f(ctx)?),
            Meaning::Empty => Extension::Empty,
        })
    }

    /// Truth value in a context, `None` if this is not a sentence meaning.
    pub fn truth_value(&self, ctx: &Context) -> Eval<Option<bool>> {
        match self {
            Meaning::Truth(f) => f(ctx).map(Some),
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for Meaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Meaning({})", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Context {
        Context::new(vec![Entity::new(1, true), Entity::new(2, false)]).unwrap()
    }

    #[test]
    fn test_representatives_have_their_tag() {
        for tag in TypeTag::ALL {
            assert_eq!(Meaning::representative(tag).tag(), tag);
        }
    }

    #[test]
    fn test_evaluate_matches_tag() {
        let ctx = scene();
        for tag in TypeTag::ALL {
            let ext = Meaning::representative(tag).evaluate(&ctx).unwrap();
            assert_eq!(ext.tag(), tag);
        }
    }

    #[test]
    fn test_curried_connectives() {
        let implies = Meaning::binary(|x, y| !x || y);
        let Meaning::Binary(f) = implies else {
            panic!("expected binary connective");
        };
        let op = f(&scene()).unwrap();
        assert!(!op(true)(false));
        assert!(op(false)(false));
    }

    #[test]
    fn test_truth_value_only_for_sentences() {
        let ctx = scene();
        assert_eq!(Meaning::constant(true).truth_value(&ctx), Ok(Some(true)));
        assert_eq!(Meaning::predicate(|_| true).truth_value(&ctx), Ok(None));
        assert_eq!(Meaning::Empty.truth_value(&ctx), Ok(None));
    }

    #[test]
    fn test_presupposition_propagates() {
        let failing = Meaning::truth(|_| Err(PresuppositionFailure));
        assert_eq!(failing.truth_value(&scene()), Err(PresuppositionFailure));
        assert!(failing.evaluate(&scene()).is_err());
    }
}
