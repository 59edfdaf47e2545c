//! Lexicon: the fixed vocabulary mapping names to meanings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::context::Context;
use crate::grammar::TerminalsMap;
use crate::meaning::Meaning;
use crate::types::*;

/// Names whose meaning reads the hidden target flag.
const CONTEXT_DEPENDENT: [&str; 2] = ["target", "distractor"];

/// Highest number word in the default vocabulary.
const MAX_NUMBER_WORD: i32 = 5;

/// Which word groups the default lexicon contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconOptions {
    /// `l_not`, `l_and`, `l_or`, `l_if_else`
    pub connectives: bool,
    /// `positive`, `negative`, `even`, `prime`, `target`, `distractor`
    pub predicates: bool,
    /// `gt`, `equal`, `divides` and the number words
    pub relations: bool,
    /// `something`, `everything`
    pub generalized_quantifiers: bool,
    /// `every`, `some`, `the`
    pub quantifiers: bool,
    /// `true`, `false`
    pub truth_constants: bool,
}

impl Default for LexiconOptions {
    fn default() -> Self {
        Self {
            connectives: true,
            predicates: true,
            relations: true,
            generalized_quantifiers: true,
            quantifiers: true,
            truth_constants: false,
        }
    }
}

/// Immutable name to meaning map, built once per run.
#[derive(Clone, Default)]
pub struct Lexicon {
    entries: BTreeMap<String, Meaning>,
}

impl Lexicon {
    /// An empty lexicon.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard vocabulary restricted to the enabled groups.
    pub fn with_options(options: &LexiconOptions) -> Self {
        let mut lexicon = Self::new();
        if options.truth_constants {
            lexicon.add_truth_constants();
        }
        if options.connectives {
            lexicon.add_connectives();
        }
        if options.predicates {
            lexicon.add_predicates();
        }
        if options.relations {
            lexicon.add_relations();
        }
        if options.generalized_quantifiers {
            lexicon.add_generalized_quantifiers();
        }
        if options.quantifiers {
            lexicon.add_quantifiers();
        }
        lexicon
    }

    /// The standard vocabulary with every default group.
    pub fn standard() -> Self {
        Self::with_options(&LexiconOptions::default())
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, meaning: Meaning) {
        self.entries.insert(name.into(), meaning);
    }

    /// Look up a name.
    pub fn get(&self, name: &str) -> Result<&Meaning> {
        self.entries
            .get(name)
            .ok_or_else(|| SemanticsError::UnknownTerminal(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Meaning)> + '_ {
        self.entries.iter()
    }

    /// Names grouped by the tag of their meaning.
    pub fn terminals(&self) -> TerminalsMap {
        let mut terminals = TerminalsMap::new();
        for (name, meaning) in &self.entries {
            terminals.insert(meaning.tag(), name.clone());
        }
        terminals
    }

    /// Entries whose meaning depends on target flags.
    pub fn context_dependent_names(&self) -> Vec<String> {
        CONTEXT_DEPENDENT
            .iter()
            .filter(|name| self.contains(name))
            .map(|name| name.to_string())
            .collect()
    }

    fn add_truth_constants(&mut self) {
        self.insert("true", Meaning::constant(true));
        self.insert("false", Meaning::constant(false));
    }

    fn add_connectives(&mut self) {
        self.insert("l_not", Meaning::unary(|x| !x));
        self.insert("l_and", Meaning::binary(|x, y| x && y));
        self.insert("l_or", Meaning::binary(|x, y| x || y));
        self.insert(
            "l_if_else",
            Meaning::ternary(|x, y, z| (x && y) || (!x && z)),
        );
    }

    fn add_predicates(&mut self) {
        self.insert("positive", Meaning::predicate(|e| e.id > 0));
        self.insert("negative", Meaning::predicate(|e| e.id < 0));
        self.insert("even", Meaning::predicate(|e| e.id % 2 == 0));
        self.insert("prime", Meaning::predicate(|e| is_prime(e.id)));
        self.insert("target", Meaning::predicate(|e| e.is_target));
        self.insert("distractor", Meaning::predicate(|e| !e.is_target));
    }

    fn add_relations(&mut self) {
        self.insert("gt", Meaning::relation(|x, y| x.id > y.id));
        self.insert("equal", Meaning::relation(|x, y| x.id == y.id));
        self.insert("divides", Meaning::relation(|x, y| divides(y.id, x.id)));
        for n in 0..=MAX_NUMBER_WORD {
            self.insert(n.to_string(), Meaning::predicate(move |e| e.id == n));
        }
    }

    fn add_generalized_quantifiers(&mut self) {
        self.insert(
            "something",
            Meaning::generalized_quantifier(|ctx, scope| Ok(ctx.iter().any(|e| scope(e)))),
        );
        self.insert(
            "everything",
            Meaning::generalized_quantifier(|ctx, scope| Ok(ctx.iter().all(|e| scope(e)))),
        );
    }

    fn add_quantifiers(&mut self) {
        self.insert(
            "every",
            Meaning::quantifier(|ctx, restrictor, scope| {
                Ok(ctx.iter().all(|e| !restrictor(e) || scope(e)))
            }),
        );
        self.insert(
            "some",
            Meaning::quantifier(|ctx, restrictor, scope| {
                Ok(ctx.iter().any(|e| restrictor(e) && scope(e)))
            }),
        );
        self.insert("the", Meaning::quantifier(definite));
    }
}

/// Exactly one restrictor satisfier must exist, and it must satisfy the scope.
fn definite(ctx: &Context, restrictor: &PredicateFn, scope: &PredicateFn) -> Eval<bool> {
    let mut satisfiers = ctx.iter().filter(|&e| restrictor(e));
    match (satisfiers.next(), satisfiers.next()) {
        (Some(unique), None) => Ok(scope(unique)),
        _ => Err(PresuppositionFailure),
    }
}

fn is_prime(n: i32) -> bool {
    if n <= 1 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

/// Whether `d` divides `n`. Zero divides only zero.
fn divides(d: i32, n: i32) -> bool {
    if d == 0 {
        return n == 0;
    }
    n.checked_rem(d).map(|r| r == 0).unwrap_or(false)
}

impl fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, m)| (name, m.tag())))
            .finish()
    }
}
