//! Composition trees: the binary syntax of utterances.
//!
//! A tree is independent of any composition rule. The same tree can be
//! composed under different rules, and the resulting meaning evaluated in
//! any number of contexts.

use rand::Rng;
use std::fmt;
use std::fmt::Write as _;

use crate::composition::Composer;
use crate::lexicon::Lexicon;
use crate::meaning::Meaning;
use crate::types::*;

/// A binary tree whose leaves are lexicon entries.
#[derive(Clone)]
pub enum CompositionTree {
    Leaf { name: String, meaning: Meaning },
    Node {
        left: Box<CompositionTree>,
        right: Box<CompositionTree>,
    },
}

impl CompositionTree {
    pub fn leaf(name: impl Into<String>, meaning: Meaning) -> Self {
        CompositionTree::Leaf {
            name: name.into(),
            meaning,
        }
    }

    /// A leaf resolved against a lexicon.
    pub fn terminal(name: &str, lexicon: &Lexicon) -> Result<Self> {
        Ok(Self::leaf(name, lexicon.get(name)?.clone()))
    }

    pub fn node(left: CompositionTree, right: CompositionTree) -> Self {
        CompositionTree::Node {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Parse an S-expression such as `( ( the target ) positive )`.
    ///
    /// Every token must name a lexicon entry.
    pub fn parse(input: &str, lexicon: &Lexicon) -> Result<Self> {
        let spaced = input.replace('(', " ( ").replace(')', " ) ");
        let mut tokens = spaced.split_whitespace();
        let tree = Self::parse_tokens(&mut tokens, lexicon)?;
        if let Some(extra) = tokens.next() {
            return Err(SemanticsError::MalformedUtterance(format!(
                "unexpected trailing token '{}' in '{}'",
                extra, input
            )));
        }
        Ok(tree)
    }

    fn parse_tokens<'a, I>(tokens: &mut I, lexicon: &Lexicon) -> Result<Self>
    where
        I: Iterator<Item = &'a str>,
    {
        match tokens.next() {
            None => Err(SemanticsError::MalformedUtterance(
                "unexpected end of input".to_string(),
            )),
            Some("(") => {
                let left = Self::parse_tokens(tokens, lexicon)?;
                let right = Self::parse_tokens(tokens, lexicon)?;
                match tokens.next() {
                    Some(")") => Ok(Self::node(left, right)),
                    Some(other) => Err(SemanticsError::MalformedUtterance(format!(
                        "expected ')' but found '{}'",
                        other
                    ))),
                    None => Err(SemanticsError::MalformedUtterance(
                        "expected ')' but input ended".to_string(),
                    )),
                }
            }
            Some(")") => Err(SemanticsError::MalformedUtterance(
                "unexpected ')'".to_string(),
            )),
            Some(name) => Self::terminal(name, lexicon),
        }
    }

    /// Compose bottom-up under a rule.
    ///
    /// A leaf yields its stored meaning. An `Empty` child makes the node
    /// `Empty` without consulting the rule.
    pub fn compose<C: Composer + ?Sized>(&self, composer: &C) -> Meaning {
        match self {
            CompositionTree::Leaf { meaning, .. } => meaning.clone(),
            CompositionTree::Node { left, right } => {
                let left = left.compose(composer);
                if left.is_empty() {
                    return Meaning::Empty;
                }
                let right = right.compose(composer);
                if right.is_empty() {
                    return Meaning::Empty;
                }
                composer.compose(&left, &right)
            }
        }
    }

    /// Number of terminals.
    pub fn size(&self) -> usize {
        match self {
            CompositionTree::Leaf { .. } => 1,
            CompositionTree::Node { left, right } => left.size() + right.size(),
        }
    }

    /// Longest path to a leaf; a leaf has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            CompositionTree::Leaf { .. } => 0,
            CompositionTree::Node { left, right } => left.depth().max(right.depth()) + 1,
        }
    }

    /// Terminal names, left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_leaves(&mut names);
        names
    }

    fn collect_leaves<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            CompositionTree::Leaf { name, .. } => names.push(name),
            CompositionTree::Node { left, right } => {
                left.collect_leaves(names);
                right.collect_leaves(names);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            CompositionTree::Leaf { name: leaf, .. } => leaf == name,
            CompositionTree::Node { left, right } => left.contains(name) || right.contains(name),
        }
    }

    pub fn contains_any<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.contains(name.as_ref()))
    }

    /// Indented multi-line rendering with each leaf's type.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent * 2);
        match self {
            CompositionTree::Leaf { name, meaning } => {
                let _ = writeln!(out, "{}{} : {}", pad, name, meaning.tag());
            }
            CompositionTree::Node { left, right } => {
                let _ = writeln!(out, "{}(", pad);
                left.write_pretty(out, indent + 1);
                right.write_pretty(out, indent + 1);
                let _ = writeln!(out, "{})", pad);
            }
        }
    }

    /// An untyped random S-expression over `names`.
    ///
    /// Each node is a leaf or a branch by a fair coin until `max_depth`,
    /// where a leaf is forced. Returns `None` if `names` is empty.
    pub fn random_expression<R, S>(names: &[S], rng: &mut R, max_depth: usize) -> Option<String>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        if names.is_empty() {
            return None;
        }
        Some(random_expression_at(names, rng, 0, max_depth))
    }
}

fn random_expression_at<R, S>(names: &[S], rng: &mut R, depth: usize, max_depth: usize) -> String
where
    R: Rng + ?Sized,
    S: AsRef<str>,
{
    if depth >= max_depth || rng.gen_bool(0.5) {
        names[rng.gen_range(0..names.len())].as_ref().to_string()
    } else {
        let left = random_expression_at(names, rng, depth + 1, max_depth);
        let right = random_expression_at(names, rng, depth + 1, max_depth);
        format!("( {} {} )", left, right)
    }
}

impl fmt::Display for CompositionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionTree::Leaf { name, .. } => f.write_str(name),
            CompositionTree::Node { left, right } => write!(f, "( {} {} )", left, right),
        }
    }
}

impl fmt::Debug for CompositionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositionTree({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::RightApplication;
    use crate::context::{Context, Entity};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lexicon() -> Lexicon {
        Lexicon::standard()
    }

    #[test]
    fn test_parse_and_serialize() {
        let input = "( ( the target ) ( gt 2 ) )";
        let tree = CompositionTree::parse(input, &lexicon());
        // "2" is a predicate, so (gt 2) is ill-typed but still parses
        let tree = tree.unwrap();
        assert_eq!(tree.to_string(), input);
        assert_eq!(tree.size(), 4);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.leaves(), vec!["the", "target", "gt", "2"]);
    }

    #[test]
    fn test_parse_tolerates_tight_parens() {
        let tree = CompositionTree::parse("((some target) positive)", &lexicon()).unwrap();
        assert_eq!(tree.to_string(), "( ( some target ) positive )");
    }

    #[test]
    fn test_parse_errors() {
        let lex = lexicon();
        assert_eq!(
            CompositionTree::parse("( some blue )", &lex).unwrap_err(),
            SemanticsError::UnknownTerminal("blue".to_string())
        );
        assert!(matches!(
            CompositionTree::parse("( some target", &lex),
            Err(SemanticsError::MalformedUtterance(_))
        ));
        assert!(matches!(
            CompositionTree::parse("( some target positive )", &lex),
            Err(SemanticsError::MalformedUtterance(_))
        ));
        assert!(matches!(
            CompositionTree::parse("target positive", &lex),
            Err(SemanticsError::MalformedUtterance(_))
        ));
        assert!(matches!(
            CompositionTree::parse("", &lex),
            Err(SemanticsError::MalformedUtterance(_))
        ));
        assert!(matches!(
            CompositionTree::parse(")", &lex),
            Err(SemanticsError::MalformedUtterance(_))
        ));
    }

    #[test]
    fn test_roundtrip_evaluates_identically() {
        let lex = lexicon();
        let tree = CompositionTree::node(
            CompositionTree::node(
                CompositionTree::terminal("every", &lex).unwrap(),
                CompositionTree::terminal("target", &lex).unwrap(),
            ),
            CompositionTree::terminal("prime", &lex).unwrap(),
        );
        let reparsed = CompositionTree::parse(&tree.to_string(), &lex).unwrap();
        let original = tree.compose(&RightApplication);
        let roundtrip = reparsed.compose(&RightApplication);

        let ctx = Context::new(vec![
            Entity::new(-1, false),
            Entity::new(2, false),
            Entity::new(9, false),
        ])
        .unwrap();
        for variation in ctx.variations() {
            assert_eq!(
                original.truth_value(&variation),
                roundtrip.truth_value(&variation)
            );
        }
    }

    #[test]
    fn test_empty_is_infectious() {
        let lex = lexicon();
        let tree = CompositionTree::parse("( l_not ( positive target ) )", &lex).unwrap();
        assert!(tree.compose(&RightApplication).is_empty());

        let leaf = CompositionTree::terminal("target", &lex).unwrap();
        assert_eq!(leaf.compose(&RightApplication).tag(), TypeTag::Predicate);
    }

    #[test]
    fn test_contains() {
        let tree = CompositionTree::parse("( something ( l_not even ) )", &lexicon()).unwrap();
        assert!(tree.contains("even"));
        assert!(!tree.contains("target"));
        assert!(tree.contains_any(&["target", "even"]));
        assert!(!tree.contains_any::<&str>(&[]));
    }

    #[test]
    fn test_pretty_shows_types() {
        let tree = CompositionTree::parse("( something even )", &lexicon()).unwrap();
        let pretty = tree.pretty();
        assert!(pretty.contains("  something : <s,<<e,t>,t>>"));
        assert!(pretty.contains("  even : <s,<e,t>>"));
        assert!(pretty.starts_with("(\n"));
    }

    #[test]
    fn test_random_expression_parses() {
        let lex = lexicon();
        let names = lex.names();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let expr = CompositionTree::random_expression(&names, &mut rng, 3).unwrap();
            let tree = CompositionTree::parse(&expr, &lex).unwrap();
            assert!(tree.depth() <= 3);
            assert_eq!(tree.to_string(), expr);
        }
        assert!(CompositionTree::random_expression::<_, String>(&[], &mut rng, 3).is_none());
    }
}
