//! Learned quantifier words.
//!
//! A quantifier hypothesis defines the words `Q1`, `Q2` and `Q3` as
//! conditions on how a restrictor `A` and a scope `B` overlap in a context.
//! Every other word keeps its fixed meaning and composition is plain
//! right application.
//!
//! ```text
//! D := true | false | ( not D ) | ( and D D ) | ( or D D )
//!    | ( gt N N ) | ( eq N N )
//! N := both | left_only | right_only | left | right | 0 | 1 | 2 | ...
//! ```
//!
//! `both` counts `A ∩ B`, `left_only` counts `A \ B`, `right_only` counts
//! `B \ A`, `left` and `right` count `A` and `B`.

use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use semantics::{Composer, Context, Lexicon, Meaning, PredicateFn, RightApplication};

use crate::hypothesis::program::{choose, log_choice, Production};
use crate::hypothesis::Hypothesis;
use crate::types::{AgentError, Result};

/// Words a quantifier hypothesis defines, in order.
pub const QUANTIFIER_WORDS: [&str; 3] = ["Q1", "Q2", "Q3"];

/// A cardinality read off one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Both,
    LeftOnly,
    RightOnly,
    Left,
    Right,
    Number(usize),
}

/// Condition defining one quantifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    True,
    False,
    Not(Box<Definition>),
    And(Box<Definition>, Box<Definition>),
    Or(Box<Definition>, Box<Definition>),
    Greater(Count, Count),
    Equal(Count, Count),
}

/// Overlap of restrictor and scope in one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overlap {
    pub both: usize,
    pub left_only: usize,
    pub right_only: usize,
}

impl Overlap {
    pub fn of(context: &Context, restrictor: &PredicateFn, scope: &PredicateFn) -> Self {
        let mut overlap = Self::default();
        for entity in context.iter() {
            match (restrictor(entity), scope(entity)) {
                (true, true) => overlap.both += 1,
                (true, false) => overlap.left_only += 1,
                (false, true) => overlap.right_only += 1,
                (false, false) => {}
            }
        }
        overlap
    }
}

impl Count {
    fn value(&self, overlap: &Overlap) -> usize {
        match self {
            Count::Both => overlap.both,
            Count::LeftOnly => overlap.left_only,
            Count::RightOnly => overlap.right_only,
            Count::Left => overlap.both + overlap.left_only,
            Count::Right => overlap.both + overlap.right_only,
            Count::Number(n) => *n,
        }
    }

    fn shape(&self) -> CountShape {
        match self {
            Count::Both => CountShape::Both,
            Count::LeftOnly => CountShape::LeftOnly,
            Count::RightOnly => CountShape::RightOnly,
            Count::Left => CountShape::Left,
            Count::Right => CountShape::Right,
            Count::Number(_) => CountShape::Number,
        }
    }
}

impl Definition {
    pub fn holds(&self, overlap: &Overlap) -> bool {
        match self {
            Definition::True => true,
            Definition::False => false,
            Definition::Not(d) => !d.holds(overlap),
            Definition::And(a, b) => a.holds(overlap) && b.holds(overlap),
            Definition::Or(a, b) => a.holds(overlap) || b.holds(overlap),
            Definition::Greater(x, y) => x.value(overlap) > y.value(overlap),
            Definition::Equal(x, y) => x.value(overlap) == y.value(overlap),
        }
    }

    /// The quantifier meaning this condition defines.
    pub fn meaning(&self) -> Meaning {
        let definition = Arc::new(self.clone());
        Meaning::quantifier(move |ctx, restrictor, scope| {
            Ok(definition.holds(&Overlap::of(ctx, restrictor, scope)))
        })
    }

    fn shape(&self) -> DefinitionShape {
        match self {
            Definition::True => DefinitionShape::True,
            Definition::False => DefinitionShape::False,
            Definition::Not(_) => DefinitionShape::Not,
            Definition::And(_, _) => DefinitionShape::And,
            Definition::Or(_, _) => DefinitionShape::Or,
            Definition::Greater(_, _) => DefinitionShape::Greater,
            Definition::Equal(_, _) => DefinitionShape::Equal,
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Both => write!(f, "both"),
            Count::LeftOnly => write!(f, "left_only"),
            Count::RightOnly => write!(f, "right_only"),
            Count::Left => write!(f, "left"),
            Count::Right => write!(f, "right"),
            Count::Number(n) => write!(f, "{}", n),
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::True => write!(f, "true"),
            Definition::False => write!(f, "false"),
            Definition::Not(d) => write!(f, "( not {} )", d),
            Definition::And(a, b) => write!(f, "( and {} {} )", a, b),
            Definition::Or(a, b) => write!(f, "( or {} {} )", a, b),
            Definition::Greater(x, y) => write!(f, "( gt {} {} )", x, y),
            Definition::Equal(x, y) => write!(f, "( eq {} {} )", x, y),
        }
    }
}

impl FromStr for Definition {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        let spaced = s.replace('(', " ( ").replace(')', " ) ");
        let tokens: Vec<&str> = spaced.split_whitespace().collect();
        let mut pos = 0;
        let definition = parse_definition(&tokens, &mut pos)?;
        if pos != tokens.len() {
            return Err(parse_error("trailing input", pos));
        }
        Ok(definition)
    }
}

fn parse_error(message: &str, pos: usize) -> AgentError {
    AgentError::ProgramParse(format!("{} at token {}", message, pos))
}

fn next_token<'a>(tokens: &[&'a str], pos: &mut usize) -> Result<&'a str> {
    let token = tokens
        .get(*pos)
        .copied()
        .ok_or_else(|| parse_error("unexpected end of definition", *pos))?;
    *pos += 1;
    Ok(token)
}

fn parse_definition(tokens: &[&str], pos: &mut usize) -> Result<Definition> {
    match next_token(tokens, pos)? {
        "true" => Ok(Definition::True),
        "false" => Ok(Definition::False),
        "(" => {
            let definition = match next_token(tokens, pos)? {
                "not" => Definition::Not(Box::new(parse_definition(tokens, pos)?)),
                "and" => Definition::And(
                    Box::new(parse_definition(tokens, pos)?),
                    Box::new(parse_definition(tokens, pos)?),
                ),
                "or" => Definition::Or(
                    Box::new(parse_definition(tokens, pos)?),
                    Box::new(parse_definition(tokens, pos)?),
                ),
                "gt" => Definition::Greater(parse_count(tokens, pos)?, parse_count(tokens, pos)?),
                "eq" => Definition::Equal(parse_count(tokens, pos)?, parse_count(tokens, pos)?),
                other => return Err(parse_error(&format!("unknown condition '{}'", other), *pos)),
            };
            match next_token(tokens, pos)? {
                ")" => Ok(definition),
                _ => Err(parse_error("expected ')'", *pos)),
            }
        }
        other => Err(parse_error(&format!("unexpected '{}'", other), *pos)),
    }
}

fn parse_count(tokens: &[&str], pos: &mut usize) -> Result<Count> {
    match next_token(tokens, pos)? {
        "both" => Ok(Count::Both),
        "left_only" => Ok(Count::LeftOnly),
        "right_only" => Ok(Count::RightOnly),
        "left" => Ok(Count::Left),
        "right" => Ok(Count::Right),
        other => other
            .parse()
            .map(Count::Number)
            .map_err(|_| parse_error(&format!("expected count, found '{}'", other), *pos)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefinitionShape {
    True,
    False,
    Not,
    And,
    Or,
    Greater,
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountShape {
    Both,
    LeftOnly,
    RightOnly,
    Left,
    Right,
    Number,
}

const DEFINITION_PRODUCTIONS: [Production<DefinitionShape>; 7] = [
    (DefinitionShape::True, 1.0, true),
    (DefinitionShape::False, 1.0, true),
    (DefinitionShape::Not, 1.0, false),
    (DefinitionShape::And, 0.5, false),
    (DefinitionShape::Or, 0.5, false),
    (DefinitionShape::Greater, 2.0, true),
    (DefinitionShape::Equal, 2.0, true),
];

const COUNT_PRODUCTIONS: [Production<CountShape>; 6] = [
    (CountShape::Both, 1.0, true),
    (CountShape::LeftOnly, 1.0, true),
    (CountShape::RightOnly, 1.0, true),
    (CountShape::Left, 1.0, true),
    (CountShape::Right, 1.0, true),
    (CountShape::Number, 1.0, true),
];

/// Weighted generating grammar over quantifier definitions.
#[derive(Debug, Clone, Copy)]
pub struct QuantifierGrammar {
    /// Depth at which only childless conditions remain
    pub max_depth: usize,
    /// Largest number literal
    pub max_number: usize,
}

impl Default for QuantifierGrammar {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_number: 3,
        }
    }
}

impl QuantifierGrammar {
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Definition {
        self.gen_definition(0, rng)
    }

    /// Log probability of generating `definition`.
    pub fn log_prob(&self, definition: &Definition) -> f64 {
        self.log_definition(definition, 0)
    }

    fn gen_definition<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> Definition {
        let next = depth + 1;
        match choose(&DEFINITION_PRODUCTIONS, depth >= self.max_depth, rng) {
            DefinitionShape::True => Definition::True,
            DefinitionShape::False => Definition::False,
            DefinitionShape::Not => Definition::Not(Box::new(self.gen_definition(next, rng))),
            DefinitionShape::And => Definition::And(
                Box::new(self.gen_definition(next, rng)),
                Box::new(self.gen_definition(next, rng)),
            ),
            DefinitionShape::Or => Definition::Or(
                Box::new(self.gen_definition(next, rng)),
                Box::new(self.gen_definition(next, rng)),
            ),
            DefinitionShape::Greater => Definition::Greater(self.gen_count(rng), self.gen_count(rng)),
            DefinitionShape::Equal => Definition::Equal(self.gen_count(rng), self.gen_count(rng)),
        }
    }

    fn gen_count<R: Rng + ?Sized>(&self, rng: &mut R) -> Count {
        match choose(&COUNT_PRODUCTIONS, false, rng) {
            CountShape::Both => Count::Both,
            CountShape::LeftOnly => Count::LeftOnly,
            CountShape::RightOnly => Count::RightOnly,
            CountShape::Left => Count::Left,
            CountShape::Right => Count::Right,
            CountShape::Number => Count::Number(rng.gen_range(0..=self.max_number)),
        }
    }

    fn log_definition(&self, definition: &Definition, depth: usize) -> f64 {
        let own = log_choice(&DEFINITION_PRODUCTIONS, depth >= self.max_depth, definition.shape());
        if own == f64::NEG_INFINITY {
            return own;
        }
        let next = depth + 1;
        own + match definition {
            Definition::True | Definition::False => 0.0,
            Definition::Not(d) => self.log_definition(d, next),
            Definition::And(a, b) | Definition::Or(a, b) => {
                self.log_definition(a, next) + self.log_definition(b, next)
            }
            Definition::Greater(x, y) | Definition::Equal(x, y) => self.log_count(x) + self.log_count(y),
        }
    }

    fn log_count(&self, count: &Count) -> f64 {
        let own = log_choice(&COUNT_PRODUCTIONS, false, count.shape());
        match count {
            Count::Number(n) if *n > self.max_number => f64::NEG_INFINITY,
            Count::Number(_) => own - ((self.max_number + 1) as f64).ln(),
            _ => own,
        }
    }
}

/// Definitions of `Q1..Q3` with the lexicon they extend.
#[derive(Debug, Clone)]
pub struct QuantifierHypothesis {
    definitions: Arc<[Definition; 3]>,
    lexicon: Arc<Lexicon>,
}

impl QuantifierHypothesis {
    /// Extend `base` with the defined quantifier words.
    pub fn new(definitions: [Definition; 3], base: &Lexicon) -> Self {
        let mut lexicon = base.clone();
        for (word, definition) in QUANTIFIER_WORDS.iter().zip(definitions.iter()) {
            lexicon.insert(*word, definition.meaning());
        }
        Self {
            definitions: Arc::new(definitions),
            lexicon: Arc::new(lexicon),
        }
    }

    pub fn parse(definitions: [&str; 3], base: &Lexicon) -> Result<Self> {
        let [q1, q2, q3] = definitions;
        Ok(Self::new([q1.parse()?, q2.parse()?, q3.parse()?], base))
    }

    pub fn definitions(&self) -> &[Definition; 3] {
        &self.definitions
    }
}

impl Hypothesis for QuantifierHypothesis {
    fn composer(&self) -> Arc<dyn Composer> {
        Arc::new(RightApplication)
    }

    fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }
}

impl fmt::Display for QuantifierHypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (word, definition)) in QUANTIFIER_WORDS.iter().zip(self.definitions.iter()).enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} := {}", word, definition)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use semantics::{Entity, LexiconOptions, TypeTag};

    fn base() -> Lexicon {
        Lexicon::with_options(&LexiconOptions {
            quantifiers: false,
            ..Default::default()
        })
    }

    fn some_every_one() -> QuantifierHypothesis {
        QuantifierHypothesis::parse(
            ["( gt both 0 )", "( eq left_only 0 )", "( eq both 1 )"],
            &base(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_display_roundtrip() {
        for text in [
            "true",
            "( gt both 0 )",
            "( and ( eq left_only 0 ) ( gt left 0 ) )",
            "( not ( or false ( eq right_only 2 ) ) )",
        ] {
            let definition: Definition = text.parse().unwrap();
            assert_eq!(definition.to_string(), text);
        }
    }

    #[test]
    fn test_parse_errors() {
        for text in ["( gt both )", "( bigger both 0 )", "( gt both 0 ) true", "( eq both 1"] {
            assert!(text.parse::<Definition>().is_err(), "{}", text);
        }
    }

    #[test]
    fn test_defined_words_compose() {
        let h = some_every_one();
        let ctx = Context::new(vec![
            Entity::new(3, true),
            Entity::new(-5, false),
            Entity::new(4, false),
        ])
        .unwrap();

        let truth = |utterance: &str| h.meaning_of(utterance).unwrap().truth_value(&ctx).unwrap();
        assert_eq!(truth("( ( Q1 target ) positive )"), Some(true));
        assert_eq!(truth("( ( Q2 target ) positive )"), Some(true));
        assert_eq!(truth("( ( Q2 positive ) target )"), Some(false));
        assert_eq!(truth("( ( Q3 positive ) even )"), Some(true));
        assert_eq!(truth("( ( Q1 distractor ) prime )"), Some(false));
    }

    #[test]
    fn test_lexicon_replaces_builtin_quantifiers() {
        let h = some_every_one();
        for word in QUANTIFIER_WORDS {
            assert_eq!(h.lexicon().get(word).unwrap().tag(), TypeTag::Quantifier);
        }
        assert!(!h.lexicon().contains("every"));
        assert!(h.lexicon().contains("something"));
        assert_eq!(
            h.to_string(),
            "Q1 := ( gt both 0 ); Q2 := ( eq left_only 0 ); Q3 := ( eq both 1 )"
        );
    }

    #[test]
    fn test_generated_definitions_have_finite_prior() {
        let grammar = QuantifierGrammar::default();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            let definition = grammar.generate(&mut rng);
            assert!(grammar.log_prob(&definition).is_finite(), "{}", definition);
            let reparsed: Definition = definition.to_string().parse().unwrap();
            assert_eq!(reparsed, definition);
        }
    }

    #[test]
    fn test_prior_bounds() {
        let grammar = QuantifierGrammar {
            max_depth: 1,
            max_number: 3,
        };
        let log_prob = |text: &str| grammar.log_prob(&text.parse().unwrap());
        assert!(log_prob("( not true )").is_finite());
        assert_eq!(log_prob("( not ( not true ) )"), f64::NEG_INFINITY);
        assert_eq!(log_prob("( gt both 5 )"), f64::NEG_INFINITY);
        assert!(log_prob("true") > log_prob("( and true true )"));
    }
}
