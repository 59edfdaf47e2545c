//! Typed intensional semantics for a toy compositional language.
//!
//! This crate is the symbolic core shared by speakers and listeners:
//!
//! - **Context model**: scenes of entities with an identity and a hidden target flag
//! - **Type system**: a closed set of semantic categories, each a function from a context
//! - **Lexicon**: a fixed name-to-meaning vocabulary
//! - **Composition**: pluggable rules that combine two meanings (or yield `Empty`)
//! - **Composition trees**: the binary syntax of utterances, parsed from and printed to S-expressions
//! - **Grammar derivation**: which type pairs compose into which type, tried against a rule
//!
//! # Example
//!
//! ```
//! use semantics::{CompositionTree, Context, Entity, Lexicon, RightApplication};
//!
//! let lexicon = Lexicon::standard();
//! let tree = CompositionTree::parse("( ( some target ) positive )", &lexicon).unwrap();
//! let meaning = tree.compose(&RightApplication);
//!
//! let context = Context::new(vec![Entity::new(3, true), Entity::new(-5, false)]).unwrap();
//! assert_eq!(meaning.truth_value(&context).unwrap(), Some(true));
//! ```

pub mod composition;
pub mod context;
pub mod grammar;
pub mod lexicon;
pub mod meaning;
pub mod tree;
pub mod types;

// Re-export main types
pub use composition::{Composer, RightApplication};
pub use context::{Context, ContextGenerator, Entity, MAX_CONTEXT_SIZE};
pub use grammar::{Cfg, TerminalsMap};
pub use lexicon::{Lexicon, LexiconOptions};
pub use meaning::{Extension, Meaning};
pub use tree::CompositionTree;
pub use types::*;
