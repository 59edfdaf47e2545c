//! Core types: semantic type tags, extension function shapes and errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::context::{Context, Entity};

/// Signal that a meaning's precondition does not hold in a context.
///
/// Raised, for example, by "the" when its restrictor has zero or several
/// satisfiers. Callers treat the context as inapplicable rather than false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Presupposition failure")]
pub struct PresuppositionFailure;

/// Result of evaluating anything against a context.
pub type Eval<T> = std::result::Result<T, PresuppositionFailure>;

/// A meaning: a function from a context to an extension of type `T`.
pub type Intension<T> = Arc<dyn Fn(&Context) -> Eval<T> + Send + Sync>;

/// `<t,t>`
pub type UnaryFn = Arc<dyn Fn(bool) -> bool + Send + Sync>;
/// `<t,<t,t>>`
pub type BinaryFn = Arc<dyn Fn(bool) -> UnaryFn + Send + Sync>;
/// `<t,<t,<t,t>>>`
pub type TernaryFn = Arc<dyn Fn(bool) -> BinaryFn + Send + Sync>;
/// `<e,t>`
pub type PredicateFn = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;
/// `<<e,t>,t>`
pub type GenQuantFn = Arc<dyn Fn(&PredicateFn) -> Eval<bool> + Send + Sync>;
/// `<e,<e,t>>`
pub type RelationFn = Arc<dyn Fn(&Entity) -> PredicateFn + Send + Sync>;
/// `<<e,t>,<<e,t>,t>>`
pub type QuantifierFn = Arc<dyn Fn(&PredicateFn) -> GenQuantFn + Send + Sync>;

/// The closed set of semantic categories.
///
/// Every meaning carries one of these tags structurally, so the tag of a
/// composed meaning is known without evaluating it in any context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// `<s,e>`
    Entity,
    /// `<s,t>`
    Truth,
    /// `<s,<t,t>>`
    UnaryConnective,
    /// `<s,<t,<t,t>>>`
    BinaryConnective,
    /// `<s,<t,<t,<t,t>>>>`
    TernaryConnective,
    /// `<s,<e,t>>`, intransitive predicates
    Predicate,
    /// `<s,<<e,t>,t>>`, quantified noun phrases
    GeneralizedQuantifier,
    /// `<s,<e,<e,t>>>`, transitive predicates
    Relation,
    /// `<s,<<e,t>,<<e,t>,t>>>`, determiners
    Quantifier,
    /// Non-composable
    Empty,
}

impl TypeTag {
    /// All tags, `Empty` included, in a fixed order.
    pub const ALL: [TypeTag; 10] = [
        TypeTag::Entity,
        TypeTag::Truth,
        TypeTag::UnaryConnective,
        TypeTag::BinaryConnective,
        TypeTag::TernaryConnective,
        TypeTag::Predicate,
        TypeTag::GeneralizedQuantifier,
        TypeTag::Relation,
        TypeTag::Quantifier,
        TypeTag::Empty,
    ];

    /// The type of complete sentences.
    pub const SENTENCE: TypeTag = TypeTag::Truth;

    /// Semantic type notation.
    pub fn notation(&self) -> &'static str {
        match self {
            TypeTag::Entity => "<s,e>",
            TypeTag::Truth => "<s,t>",
            TypeTag::UnaryConnective => "<s,<t,t>>",
            TypeTag::BinaryConnective => "<s,<t,<t,t>>>",
            TypeTag::TernaryConnective => "<s,<t,<t,<t,t>>>>",
            TypeTag::Predicate => "<s,<e,t>>",
            TypeTag::GeneralizedQuantifier => "<s,<<e,t>,t>>",
            TypeTag::Relation => "<s,<e,<e,t>>>",
            TypeTag::Quantifier => "<s,<<e,t>,<<e,t>,t>>>",
            TypeTag::Empty => "empty",
        }
    }

    /// Short name used in composition programs.
    pub fn short_name(&self) -> &'static str {
        match self {
            TypeTag::Entity => "e",
            TypeTag::Truth => "t",
            TypeTag::UnaryConnective => "uc",
            TypeTag::BinaryConnective => "bc",
            TypeTag::TernaryConnective => "tc",
            TypeTag::Predicate => "iv",
            TypeTag::GeneralizedQuantifier => "dp",
            TypeTag::Relation => "tv",
            TypeTag::Quantifier => "q",
            TypeTag::Empty => "empty",
        }
    }

    /// Whether this is the non-composable tag.
    pub fn is_empty(&self) -> bool {
        matches!(self, TypeTag::Empty)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.notation())
    }
}

impl FromStr for TypeTag {
    type Err = SemanticsError;

    fn from_str(s: &str) -> Result<Self> {
        TypeTag::ALL
            .iter()
            .find(|tag| tag.short_name() == s || tag.notation() == s)
            .copied()
            .ok_or_else(|| SemanticsError::UnknownType(s.to_string()))
    }
}

/// Error types for the semantics crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticsError {
    /// A token that is not in the lexicon
    #[error("Unknown terminal: {0}")]
    UnknownTerminal(String),

    /// Structurally invalid utterance string
    #[error("Malformed utterance: {0}")]
    MalformedUtterance(String),

    /// Two entities share an identity
    #[error("Duplicate entity identity: {0}")]
    DuplicateEntity(i32),

    /// Context generator cannot satisfy the request
    #[error("Invalid context request: {0}")]
    InvalidContext(String),

    /// More entities than flag assignments can be enumerated for
    #[error("Context of {size} entities exceeds the limit of {max}")]
    ContextTooLarge { size: usize, max: usize },

    /// Unrecognized type tag name
    #[error("Unknown type tag: {0}")]
    UnknownType(String),
}

pub type Result<T> = std::result::Result<T, SemanticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_roundtrip() {
        for tag in TypeTag::ALL {
            assert_eq!(tag.short_name().parse::<TypeTag>().unwrap(), tag);
            assert_eq!(tag.notation().parse::<TypeTag>().unwrap(), tag);
        }
        assert!("xyz".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_sentence_is_truth() {
        assert_eq!(TypeTag::SENTENCE.to_string(), "<s,t>");
        assert!(TypeTag::Empty.is_empty());
        assert!(!TypeTag::Truth.is_empty());
    }
}
