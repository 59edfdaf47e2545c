//! Grammar derivation: which type pairs a composition rule supports.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::trace;

use crate::composition::Composer;
use crate::meaning::Meaning;
use crate::types::TypeTag;

/// Result type to the `(left, right)` type pairs that compose into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cfg {
    rules: BTreeMap<TypeTag, BTreeSet<(TypeTag, TypeTag)>>,
}

impl Cfg {
    /// Try a rule on every ordered pair of type tags.
    ///
    /// Must be recomputed whenever the rule changes.
    pub fn derive<C: Composer + ?Sized>(composer: &C) -> Self {
        let representatives: Vec<Meaning> =
            TypeTag::ALL.iter().map(|tag| Meaning::representative(*tag)).collect();

        let mut rules: BTreeMap<TypeTag, BTreeSet<(TypeTag, TypeTag)>> = BTreeMap::new();
        for left in &representatives {
            for right in &representatives {
                let result = composer.compose(left, right).tag();
                if !result.is_empty() {
                    rules
                        .entry(result)
                        .or_default()
                        .insert((left.tag(), right.tag()));
                }
            }
        }
        let cfg = Self { rules };
        trace!(rules = cfg.len(), "Derived grammar from composition rule");
        cfg
    }

    /// Pairs producing `tag`, in a stable order.
    pub fn productions(&self, tag: TypeTag) -> Vec<(TypeTag, TypeTag)> {
        self.rules
            .get(&tag)
            .map(|pairs| pairs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether any pair produces `tag`.
    pub fn produces(&self, tag: TypeTag) -> bool {
        self.rules.get(&tag).is_some_and(|pairs| !pairs.is_empty())
    }

    /// The type `(left, right)` composes into, if any.
    pub fn result_of(&self, left: TypeTag, right: TypeTag) -> Option<TypeTag> {
        self.rules
            .iter()
            .find(|(_, pairs)| pairs.contains(&(left, right)))
            .map(|(result, _)| *result)
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.rules.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeTag, &BTreeSet<(TypeTag, TypeTag)>)> + '_ {
        self.rules.iter()
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (result, pairs) in &self.rules {
            for (left, right) in pairs {
                writeln!(f, "{} -> {} {}", result, left, right)?;
            }
        }
        Ok(())
    }
}

/// Lexicon names grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TerminalsMap {
    by_tag: BTreeMap<TypeTag, Vec<String>>,
}

impl TerminalsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: TypeTag, name: String) {
        let names = self.by_tag.entry(tag).or_default();
        if let Err(pos) = names.binary_search(&name) {
            names.insert(pos, name);
        }
    }

    /// Names of type `tag`, sorted; empty if there are none.
    pub fn get(&self, tag: TypeTag) -> &[String] {
        self.by_tag.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, tag: TypeTag) -> bool {
        !self.get(tag).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeTag, &Vec<String>)> + '_ {
        self.by_tag.iter()
    }
}

impl fmt::Display for TerminalsMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (tag, names) in &self.by_tag {
            writeln!(f, "{}: {}", tag, names.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{apply, otherwise, RightApplication};

    #[test]
    fn test_right_application_grammar() {
        let cfg = Cfg::derive(&RightApplication);
        assert_eq!(cfg.len(), 7);
        assert_eq!(
            cfg.productions(TypeTag::Truth),
            vec![
                (TypeTag::UnaryConnective, TypeTag::Truth),
                (TypeTag::Predicate, TypeTag::Entity),
                (TypeTag::GeneralizedQuantifier, TypeTag::Predicate),
            ]
        );
        assert_eq!(
            cfg.result_of(TypeTag::Quantifier, TypeTag::Predicate),
            Some(TypeTag::GeneralizedQuantifier)
        );
        assert!(!cfg.produces(TypeTag::Entity));
        assert!(cfg.productions(TypeTag::Empty).is_empty());
    }

    #[test]
    fn test_derived_rules_match_composer_exhaustively() {
        let composers: Vec<Box<dyn Composer>> = vec![
            Box::new(RightApplication),
            Box::new(|l: &Meaning, r: &Meaning| apply(r, l)),
            Box::new(|l: &Meaning, r: &Meaning| otherwise(&apply(l, r), &apply(r, l))),
            Box::new(|_: &Meaning, _: &Meaning| Meaning::Empty),
        ];
        for composer in &composers {
            let cfg = Cfg::derive(&**composer);
            for a in TypeTag::ALL {
                for b in TypeTag::ALL {
                    let expected = composer
                        .compose(&Meaning::representative(a), &Meaning::representative(b))
                        .tag();
                    let derived = cfg.result_of(a, b).unwrap_or(TypeTag::Empty);
                    assert_eq!(derived, expected, "pair ({}, {})", a, b);
                }
            }
        }
    }

    #[test]
    fn test_empty_rule_has_no_grammar() {
        let cfg = Cfg::derive(&|_: &Meaning, _: &Meaning| Meaning::Empty);
        assert!(cfg.is_empty());
        assert_eq!(cfg.to_string(), "");
    }

    #[test]
    fn test_display() {
        let cfg = Cfg::derive(&RightApplication);
        assert!(cfg.to_string().contains("<s,t> -> <s,<e,t>> <s,e>"));
    }

    #[test]
    fn test_terminals_map_sorted_unique() {
        let mut map = TerminalsMap::new();
        map.insert(TypeTag::Predicate, "target".to_string());
        map.insert(TypeTag::Predicate, "even".to_string());
        map.insert(TypeTag::Predicate, "target".to_string());
        assert_eq!(map.get(TypeTag::Predicate), ["even", "target"]);
        assert!(map.has(TypeTag::Predicate));
        assert!(!map.has(TypeTag::Entity));
        assert_eq!(map.to_string(), "<s,<e,t>>: even target\n");
    }
}
