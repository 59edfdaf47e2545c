//! Composition programs: a small language of composition rules.
//!
//! A program maps the operand pair `X = (L, R)` to a meaning. Programs only
//! branch on operand tags, so the `Empty` behaviour of every program is a
//! function of the tag pair alone.
//!
//! ```text
//! ARGS := X | ( flip ARGS ) | ( pair M M )
//! M    := L | R | ( left ARGS ) | ( right ARGS ) | ( apply M M ) | ( else M M )
//!       | ( if B M M ) | ( intersect M M ) | ( union M M ) | ( diff M M )
//!       | ( complement M ) | ( exists M ) | ( singleton M ) | ( nth N M )
//!       | ( card N ) | ( neg M ) | ( conj M M ) | ( disj M M )
//! B    := true | false | ( not B ) | ( and B B ) | ( or B B ) | ( is TAG M )
//! ```

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use semantics::composition::{
    apply, cardinality, complement, conjunction, difference, disjunction, exists, intersection,
    negation, nth_satisfier, otherwise, singleton, union,
};
use semantics::{Composer, Lexicon, Meaning, TypeTag};

use crate::hypothesis::Hypothesis;
use crate::types::{AgentError, Result};

/// Operand pair expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    Input,
    Flip(Box<Args>),
    Pair(Box<Expr>, Box<Expr>),
}

/// Meaning-valued expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Left,
    Right,
    First(Box<Args>),
    Second(Box<Args>),
    Apply(Box<Expr>, Box<Expr>),
    Else(Box<Expr>, Box<Expr>),
    If(Box<Cond>, Box<Expr>, Box<Expr>),
    Intersect(Box<Expr>, Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Diff(Box<Expr>, Box<Expr>),
    Complement(Box<Expr>),
    Exists(Box<Expr>),
    Singleton(Box<Expr>),
    Nth(usize, Box<Expr>),
    Card(usize),
    Negate(Box<Expr>),
    Conj(Box<Expr>, Box<Expr>),
    Disj(Box<Expr>, Box<Expr>),
}

/// Conditions over operand tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    True,
    False,
    Not(Box<Cond>),
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
    Is(TypeTag, Box<Expr>),
}

impl Args {
    fn eval(&self, l: &Meaning, r: &Meaning) -> (Meaning, Meaning) {
        match self {
            Args::Input => (l.clone(), r.clone()),
            Args::Flip(inner) => {
                let (a, b) = inner.eval(l, r);
                (b, a)
            }
            Args::Pair(a, b) => (a.eval(l, r), b.eval(l, r)),
        }
    }

    fn node_count(&self) -> usize {
        match self {
            Args::Input => 1,
            Args::Flip(inner) => 1 + inner.node_count(),
            Args::Pair(a, b) => 1 + a.node_count() + b.node_count(),
        }
    }
}

impl Expr {
    fn eval(&self, l: &Meaning, r: &Meaning) -> Meaning {
        match self {
            Expr::Left => l.clone(),
            Expr::Right => r.clone(),
            Expr::First(args) => args.eval(l, r).0,
            Expr::Second(args) => args.eval(l, r).1,
            Expr::Apply(a, b) => apply(&a.eval(l, r), &b.eval(l, r)),
            Expr::Else(a, b) => otherwise(&a.eval(l, r), &b.eval(l, r)),
            Expr::If(c, a, b) => {
                if c.eval(l, r) {
                    a.eval(l, r)
                } else {
                    b.eval(l, r)
                }
            }
            Expr::Intersect(a, b) => intersection(&a.eval(l, r), &b.eval(l, r)),
            Expr::Union(a, b) => union(&a.eval(l, r), &b.eval(l, r)),
            Expr::Diff(a, b) => difference(&a.eval(l, r), &b.eval(l, r)),
            Expr::Complement(a) => complement(&a.eval(l, r)),
            Expr::Exists(a) => exists(&a.eval(l, r)),
            Expr::Singleton(a) => singleton(&a.eval(l, r)),
            Expr::Nth(n, a) => nth_satisfier(*n, &a.eval(l, r)),
            Expr::Card(n) => cardinality(*n),
            Expr::Negate(a) => negation(&a.eval(l, r)),
            Expr::Conj(a, b) => conjunction(&a.eval(l, r), &b.eval(l, r)),
            Expr::Disj(a, b) => disjunction(&a.eval(l, r), &b.eval(l, r)),
        }
    }

    fn node_count(&self) -> usize {
        1 + match self {
            Expr::Left | Expr::Right | Expr::Card(_) => 0,
            Expr::First(args) | Expr::Second(args) => args.node_count(),
            Expr::Apply(a, b)
            | Expr::Else(a, b)
            | Expr::Intersect(a, b)
            | Expr::Union(a, b)
            | Expr::Diff(a, b)
            | Expr::Conj(a, b)
            | Expr::Disj(a, b) => a.node_count() + b.node_count(),
            Expr::If(c, a, b) => c.node_count() + a.node_count() + b.node_count(),
            Expr::Complement(a)
            | Expr::Exists(a)
            | Expr::Singleton(a)
            | Expr::Nth(_, a)
            | Expr::Negate(a) => a.node_count(),
        }
    }

    fn shape(&self) -> ExprShape {
        match self {
            Expr::Left => ExprShape::Left,
            Expr::Right => ExprShape::Right,
            Expr::First(_) => ExprShape::First,
            Expr::Second(_) => ExprShape::Second,
            Expr::Apply(..) => ExprShape::Apply,
            Expr::Else(..) => ExprShape::Else,
            Expr::If(..) => ExprShape::If,
            Expr::Intersect(..) => ExprShape::Intersect,
            Expr::Union(..) => ExprShape::Union,
            Expr::Diff(..) => ExprShape::Diff,
            Expr::Complement(_) => ExprShape::Complement,
            Expr::Exists(_) => ExprShape::Exists,
            Expr::Singleton(_) => ExprShape::Singleton,
            Expr::Nth(..) => ExprShape::Nth,
            Expr::Card(_) => ExprShape::Card,
            Expr::Negate(_) => ExprShape::Negate,
            Expr::Conj(..) => ExprShape::Conj,
            Expr::Disj(..) => ExprShape::Disj,
        }
    }
}

impl Cond {
    fn eval(&self, l: &Meaning, r: &Meaning) -> bool {
        match self {
            Cond::True => true,
            Cond::False => false,
            Cond::Not(c) => !c.eval(l, r),
            Cond::And(a, b) => a.eval(l, r) && b.eval(l, r),
            Cond::Or(a, b) => a.eval(l, r) || b.eval(l, r),
            Cond::Is(tag, m) => m.eval(l, r).tag() == *tag,
        }
    }

    fn node_count(&self) -> usize {
        1 + match self {
            Cond::True | Cond::False => 0,
            Cond::Not(c) => c.node_count(),
            Cond::And(a, b) | Cond::Or(a, b) => a.node_count() + b.node_count(),
            Cond::Is(_, m) => m.node_count(),
        }
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Args::Input => f.write_str("X"),
            Args::Flip(inner) => write!(f, "( flip {} )", inner),
            Args::Pair(a, b) => write!(f, "( pair {} {} )", a, b),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Left => f.write_str("L"),
            Expr::Right => f.write_str("R"),
            Expr::First(args) => write!(f, "( left {} )", args),
            Expr::Second(args) => write!(f, "( right {} )", args),
            Expr::Apply(a, b) => write!(f, "( apply {} {} )", a, b),
            Expr::Else(a, b) => write!(f, "( else {} {} )", a, b),
            Expr::If(c, a, b) => write!(f, "( if {} {} {} )", c, a, b),
            Expr::Intersect(a, b) => write!(f, "( intersect {} {} )", a, b),
            Expr::Union(a, b) => write!(f, "( union {} {} )", a, b),
            Expr::Diff(a, b) => write!(f, "( diff {} {} )", a, b),
            Expr::Complement(a) => write!(f, "( complement {} )", a),
            Expr::Exists(a) => write!(f, "( exists {} )", a),
            Expr::Singleton(a) => write!(f, "( singleton {} )", a),
            Expr::Nth(n, a) => write!(f, "( nth {} {} )", n, a),
            Expr::Card(n) => write!(f, "( card {} )", n),
            Expr::Negate(a) => write!(f, "( neg {} )", a),
            Expr::Conj(a, b) => write!(f, "( conj {} {} )", a, b),
            Expr::Disj(a, b) => write!(f, "( disj {} {} )", a, b),
        }
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::True => f.write_str("true"),
            Cond::False => f.write_str("false"),
            Cond::Not(c) => write!(f, "( not {} )", c),
            Cond::And(a, b) => write!(f, "( and {} {} )", a, b),
            Cond::Or(a, b) => write!(f, "( or {} {} )", a, b),
            Cond::Is(tag, m) => write!(f, "( is {} {} )", tag.short_name(), m),
        }
    }
}

/// A composition rule written in the program language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    root: Expr,
}

impl Program {
    pub fn new(root: Expr) -> Self {
        Self { root }
    }

    /// Plain right application, `( apply L R )`.
    pub fn right_application() -> Self {
        Self::new(Expr::Apply(Box::new(Expr::Left), Box::new(Expr::Right)))
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Number of `ARGS`, `M` and `B` nodes.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

impl Composer for Program {
    fn compose(&self, left: &Meaning, right: &Meaning) -> Meaning {
        self.root.eval(left, right)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

impl FromStr for Program {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        let spaced = s.replace('(', " ( ").replace(')', " ) ");
        let mut parser = Parser {
            tokens: spaced.split_whitespace().collect(),
            pos: 0,
        };
        let root = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(Self { root })
    }
}

struct Parser<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<&'a str> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error("unexpected end of program"))?;
        self.pos += 1;
        Ok(token)
    }

    fn error(&self, message: &str) -> AgentError {
        AgentError::ProgramParse(format!("{} at token {}", message, self.pos))
    }

    fn close(&mut self) -> Result<()> {
        match self.next()? {
            ")" => Ok(()),
            _ => Err(self.error("expected ')'")),
        }
    }

    fn index(&mut self) -> Result<usize> {
        let token = self.next()?;
        token
            .parse()
            .map_err(|_| self.error(&format!("expected index, found '{}'", token)))
    }

    fn args(&mut self) -> Result<Args> {
        match self.next()? {
            "X" => Ok(Args::Input),
            "(" => {
                let args = match self.next()? {
                    "flip" => Args::Flip(Box::new(self.args()?)),
                    "pair" => Args::Pair(Box::new(self.expr()?), Box::new(self.expr()?)),
                    other => return Err(self.error(&format!("unknown argument form '{}'", other))),
                };
                self.close()?;
                Ok(args)
            }
            other => Err(self.error(&format!("unexpected '{}' for arguments", other))),
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        match self.next()? {
            "L" => Ok(Expr::Left),
            "R" => Ok(Expr::Right),
            "(" => {
                let expr = match self.next()? {
                    "left" => Expr::First(Box::new(self.args()?)),
                    "right" => Expr::Second(Box::new(self.args()?)),
                    "apply" => Expr::Apply(Box::new(self.expr()?), Box::new(self.expr()?)),
                    "else" => Expr::Else(Box::new(self.expr()?), Box::new(self.expr()?)),
                    "if" => Expr::If(
                        Box::new(self.cond()?),
                        Box::new(self.expr()?),
                        Box::new(self.expr()?),
                    ),
                    "intersect" => Expr::Intersect(Box::new(self.expr()?), Box::new(self.expr()?)),
                    "union" => Expr::Union(Box::new(self.expr()?), Box::new(self.expr()?)),
                    "diff" => Expr::Diff(Box::new(self.expr()?), Box::new(self.expr()?)),
                    "complement" => Expr::Complement(Box::new(self.expr()?)),
                    "exists" => Expr::Exists(Box::new(self.expr()?)),
                    "singleton" => Expr::Singleton(Box::new(self.expr()?)),
                    "nth" => Expr::Nth(self.index()?, Box::new(self.expr()?)),
                    "card" => Expr::Card(self.index()?),
                    "neg" => Expr::Negate(Box::new(self.expr()?)),
                    "conj" => Expr::Conj(Box::new(self.expr()?), Box::new(self.expr()?)),
                    "disj" => Expr::Disj(Box::new(self.expr()?), Box::new(self.expr()?)),
                    other => return Err(self.error(&format!("unknown form '{}'", other))),
                };
                self.close()?;
                Ok(expr)
            }
            other => Err(self.error(&format!("unexpected '{}' for meaning", other))),
        }
    }

    fn cond(&mut self) -> Result<Cond> {
        match self.next()? {
            "true" => Ok(Cond::True),
            "false" => Ok(Cond::False),
            "(" => {
                let cond = match self.next()? {
                    "not" => Cond::Not(Box::new(self.cond()?)),
                    "and" => Cond::And(Box::new(self.cond()?), Box::new(self.cond()?)),
                    "or" => Cond::Or(Box::new(self.cond()?), Box::new(self.cond()?)),
                    "is" => {
                        let tag = self.next()?;
                        let tag = tag.parse::<TypeTag>().map_err(|_| {
                            self.error(&format!("unknown type tag '{}'", tag))
                        })?;
                        Cond::Is(tag, Box::new(self.expr()?))
                    }
                    other => return Err(self.error(&format!("unknown condition '{}'", other))),
                };
                self.close()?;
                Ok(cond)
            }
            other => Err(self.error(&format!("unexpected '{}' for condition", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgsShape {
    Input,
    Flip,
    Pair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprShape {
    Left,
    Right,
    First,
    Second,
    Apply,
    Else,
    If,
    Intersect,
    Union,
    Diff,
    Complement,
    Exists,
    Singleton,
    Nth,
    Card,
    Negate,
    Conj,
    Disj,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CondShape {
    True,
    False,
    Not,
    And,
    Or,
    Is,
}

/// (shape, weight, allowed at the depth bound)
pub(crate) type Production<S> = (S, f64, bool);

const ARGS_PRODUCTIONS: [Production<ArgsShape>; 3] = [
    (ArgsShape::Input, 4.0, true),
    (ArgsShape::Flip, 1.0, false),
    (ArgsShape::Pair, 1.0, false),
];

const EXPR_PRODUCTIONS: [Production<ExprShape>; 18] = [
    (ExprShape::Left, 4.0, true),
    (ExprShape::Right, 4.0, true),
    (ExprShape::First, 0.5, false),
    (ExprShape::Second, 0.5, false),
    (ExprShape::Apply, 4.0, false),
    (ExprShape::Else, 1.0, false),
    (ExprShape::If, 1.0, false),
    (ExprShape::Intersect, 0.5, false),
    (ExprShape::Union, 0.5, false),
    (ExprShape::Diff, 0.5, false),
    (ExprShape::Complement, 0.5, false),
    (ExprShape::Exists, 0.5, false),
    (ExprShape::Singleton, 0.5, false),
    (ExprShape::Nth, 0.5, false),
    (ExprShape::Card, 0.25, true),
    (ExprShape::Negate, 0.5, false),
    (ExprShape::Conj, 0.5, false),
    (ExprShape::Disj, 0.5, false),
];

const COND_PRODUCTIONS: [Production<CondShape>; 6] = [
    (CondShape::True, 1.0, true),
    (CondShape::False, 1.0, true),
    (CondShape::Not, 1.0, false),
    (CondShape::And, 0.5, false),
    (CondShape::Or, 0.5, false),
    (CondShape::Is, 3.0, false),
];

pub(crate) fn choose<S: Copy, R: Rng + ?Sized>(table: &[Production<S>], bounded: bool, rng: &mut R) -> S {
    let allowed: Vec<&Production<S>> = table
        .iter()
        .filter(|(_, _, terminal)| !bounded || *terminal)
        .collect();
    match WeightedIndex::new(allowed.iter().map(|(_, w, _)| *w)) {
        Ok(distribution) => allowed[distribution.sample(rng)].0,
        Err(_) => table[0].0,
    }
}

pub(crate) fn log_choice<S: Copy + PartialEq>(table: &[Production<S>], bounded: bool, shape: S) -> f64 {
    let allowed = || table.iter().filter(move |(_, _, terminal)| !bounded || *terminal);
    let total: f64 = allowed().map(|(_, w, _)| w).sum();
    allowed()
        .find(|(s, _, _)| *s == shape)
        .map(|(_, w, _)| (w / total).ln())
        .unwrap_or(f64::NEG_INFINITY)
}

/// The weighted generating grammar over programs.
///
/// Depth 0 is the root. At `max_depth` only childless productions remain,
/// so generated programs never exceed the bound.
#[derive(Debug, Clone, Copy)]
pub struct ProgramGrammar {
    pub max_depth: usize,
    /// Largest index for `nth` and `card`
    pub max_index: usize,
}

impl Default for ProgramGrammar {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_index: 2,
        }
    }
}

impl ProgramGrammar {
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Program {
        Program::new(self.gen_expr(0, rng))
    }

    /// Log probability of generating `program`.
    pub fn log_prob(&self, program: &Program) -> f64 {
        self.log_expr(&program.root, 0)
    }

    /// Regenerate the `index`-th node (pre-order), returning the new program
    /// with the log probabilities of the removed and inserted subtrees.
    pub fn regenerate<R: Rng + ?Sized>(
        &self,
        program: &Program,
        index: usize,
        rng: &mut R,
    ) -> Option<(Program, f64, f64)> {
        let mut root = program.root.clone();
        let mut k = index;
        let (old, new) = self.regen_expr(&mut root, &mut k, 0, rng)?;
        Some((Program::new(root), old, new))
    }

    fn log_index(&self) -> f64 {
        -((self.max_index + 1) as f64).ln()
    }

    fn gen_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..=self.max_index)
    }

    fn gen_args<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> Args {
        let next = depth + 1;
        match choose(&ARGS_PRODUCTIONS, depth >= self.max_depth, rng) {
            ArgsShape::Input => Args::Input,
            ArgsShape::Flip => Args::Flip(Box::new(self.gen_args(next, rng))),
            ArgsShape::Pair => Args::Pair(
                Box::new(self.gen_expr(next, rng)),
                Box::new(self.gen_expr(next, rng)),
            ),
        }
    }

    fn gen_expr<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> Expr {
        let next = depth + 1;
        match choose(&EXPR_PRODUCTIONS, depth >= self.max_depth, rng) {
            ExprShape::Left => Expr::Left,
            ExprShape::Right => Expr::Right,
            ExprShape::First => Expr::First(Box::new(self.gen_args(next, rng))),
            ExprShape::Second => Expr::Second(Box::new(self.gen_args(next, rng))),
            ExprShape::Apply => Expr::Apply(self.boxed(next, rng), self.boxed(next, rng)),
            ExprShape::Else => Expr::Else(self.boxed(next, rng), self.boxed(next, rng)),
            ExprShape::If => {
                let cond = Box::new(self.gen_cond(next, rng));
                Expr::If(cond, self.boxed(next, rng), self.boxed(next, rng))
            }
            ExprShape::Intersect => Expr::Intersect(self.boxed(next, rng), self.boxed(next, rng)),
            ExprShape::Union => Expr::Union(self.boxed(next, rng), self.boxed(next, rng)),
            ExprShape::Diff => Expr::Diff(self.boxed(next, rng), self.boxed(next, rng)),
            ExprShape::Complement => Expr::Complement(self.boxed(next, rng)),
            ExprShape::Exists => Expr::Exists(self.boxed(next, rng)),
            ExprShape::Singleton => Expr::Singleton(self.boxed(next, rng)),
            ExprShape::Nth => {
                let n = self.gen_index(rng);
                Expr::Nth(n, self.boxed(next, rng))
            }
            ExprShape::Card => Expr::Card(self.gen_index(rng)),
            ExprShape::Negate => Expr::Negate(self.boxed(next, rng)),
            ExprShape::Conj => Expr::Conj(self.boxed(next, rng), self.boxed(next, rng)),
            ExprShape::Disj => Expr::Disj(self.boxed(next, rng), self.boxed(next, rng)),
        }
    }

    fn boxed<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> Box<Expr> {
        Box::new(self.gen_expr(depth, rng))
    }

    fn gen_cond<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> Cond {
        let next = depth + 1;
        match choose(&COND_PRODUCTIONS, depth >= self.max_depth, rng) {
            CondShape::True => Cond::True,
            CondShape::False => Cond::False,
            CondShape::Not => Cond::Not(Box::new(self.gen_cond(next, rng))),
            CondShape::And => Cond::And(
                Box::new(self.gen_cond(next, rng)),
                Box::new(self.gen_cond(next, rng)),
            ),
            CondShape::Or => Cond::Or(
                Box::new(self.gen_cond(next, rng)),
                Box::new(self.gen_cond(next, rng)),
            ),
            CondShape::Is => {
                let tag = TypeTag::ALL[rng.gen_range(0..TypeTag::ALL.len())];
                Cond::Is(tag, Box::new(self.gen_expr(next, rng)))
            }
        }
    }

    fn log_args(&self, args: &Args, depth: usize) -> f64 {
        let bounded = depth >= self.max_depth;
        let next = depth + 1;
        match args {
            Args::Input => log_choice(&ARGS_PRODUCTIONS, bounded, ArgsShape::Input),
            Args::Flip(inner) => {
                log_choice(&ARGS_PRODUCTIONS, bounded, ArgsShape::Flip) + self.log_args(inner, next)
            }
            Args::Pair(a, b) => {
                log_choice(&ARGS_PRODUCTIONS, bounded, ArgsShape::Pair)
                    + self.log_expr(a, next)
                    + self.log_expr(b, next)
            }
        }
    }

    fn log_expr(&self, expr: &Expr, depth: usize) -> f64 {
        let bounded = depth >= self.max_depth;
        let next = depth + 1;
        let own = log_choice(&EXPR_PRODUCTIONS, bounded, expr.shape());
        if own == f64::NEG_INFINITY {
            return own;
        }
        own + match expr {
            Expr::Left | Expr::Right => 0.0,
            Expr::Card(_) => self.log_index(),
            Expr::First(args) | Expr::Second(args) => self.log_args(args, next),
            Expr::Apply(a, b)
            | Expr::Else(a, b)
            | Expr::Intersect(a, b)
            | Expr::Union(a, b)
            | Expr::Diff(a, b)
            | Expr::Conj(a, b)
            | Expr::Disj(a, b) => self.log_expr(a, next) + self.log_expr(b, next),
            Expr::If(c, a, b) => {
                self.log_cond(c, next) + self.log_expr(a, next) + self.log_expr(b, next)
            }
            Expr::Nth(_, a) => self.log_index() + self.log_expr(a, next),
            Expr::Complement(a) | Expr::Exists(a) | Expr::Singleton(a) | Expr::Negate(a) => {
                self.log_expr(a, next)
            }
        }
    }

    fn log_cond(&self, cond: &Cond, depth: usize) -> f64 {
        let bounded = depth >= self.max_depth;
        let next = depth + 1;
        match cond {
            Cond::True => log_choice(&COND_PRODUCTIONS, bounded, CondShape::True),
            Cond::False => log_choice(&COND_PRODUCTIONS, bounded, CondShape::False),
            Cond::Not(c) => {
                log_choice(&COND_PRODUCTIONS, bounded, CondShape::Not) + self.log_cond(c, next)
            }
            Cond::And(a, b) => {
                log_choice(&COND_PRODUCTIONS, bounded, CondShape::And)
                    + self.log_cond(a, next)
                    + self.log_cond(b, next)
            }
            Cond::Or(a, b) => {
                log_choice(&COND_PRODUCTIONS, bounded, CondShape::Or)
                    + self.log_cond(a, next)
                    + self.log_cond(b, next)
            }
            Cond::Is(_, m) => {
                log_choice(&COND_PRODUCTIONS, bounded, CondShape::Is)
                    - (TypeTag::ALL.len() as f64).ln()
                    + self.log_expr(m, next)
            }
        }
    }

    fn regen_args<R: Rng + ?Sized>(
        &self,
        node: &mut Args,
        k: &mut usize,
        depth: usize,
        rng: &mut R,
    ) -> Option<(f64, f64)> {
        if *k == 0 {
            let old = self.log_args(node, depth);
            *node = self.gen_args(depth, rng);
            return Some((old, self.log_args(node, depth)));
        }
        *k -= 1;
        let next = depth + 1;
        match node {
            Args::Input => None,
            Args::Flip(inner) => self.regen_args(inner, k, next, rng),
            Args::Pair(a, b) => self
                .regen_expr(a, k, next, rng)
                .or_else(|| self.regen_expr(b, k, next, rng)),
        }
    }

    fn regen_expr<R: Rng + ?Sized>(
        &self,
        node: &mut Expr,
        k: &mut usize,
        depth: usize,
        rng: &mut R,
    ) -> Option<(f64, f64)> {
        if *k == 0 {
            let old = self.log_expr(node, depth);
            *node = self.gen_expr(depth, rng);
            return Some((old, self.log_expr(node, depth)));
        }
        *k -= 1;
        let next = depth + 1;
        match node {
            Expr::Left | Expr::Right | Expr::Card(_) => None,
            Expr::First(args) | Expr::Second(args) => self.regen_args(args, k, next, rng),
            Expr::Apply(a, b)
            | Expr::Else(a, b)
            | Expr::Intersect(a, b)
            | Expr::Union(a, b)
            | Expr::Diff(a, b)
            | Expr::Conj(a, b)
            | Expr::Disj(a, b) => self
                .regen_expr(a, k, next, rng)
                .or_else(|| self.regen_expr(b, k, next, rng)),
            Expr::If(c, a, b) => self
                .regen_cond(c, k, next, rng)
                .or_else(|| self.regen_expr(a, k, next, rng))
                .or_else(|| self.regen_expr(b, k, next, rng)),
            Expr::Complement(a)
            | Expr::Exists(a)
            | Expr::Singleton(a)
            | Expr::Nth(_, a)
            | Expr::Negate(a) => self.regen_expr(a, k, next, rng),
        }
    }

    fn regen_cond<R: Rng + ?Sized>(
        &self,
        node: &mut Cond,
        k: &mut usize,
        depth: usize,
        rng: &mut R,
    ) -> Option<(f64, f64)> {
        if *k == 0 {
            let old = self.log_cond(node, depth);
            *node = self.gen_cond(depth, rng);
            return Some((old, self.log_cond(node, depth)));
        }
        *k -= 1;
        let next = depth + 1;
        match node {
            Cond::True | Cond::False => None,
            Cond::Not(c) => self.regen_cond(c, k, next, rng),
            Cond::And(a, b) | Cond::Or(a, b) => self
                .regen_cond(a, k, next, rng)
                .or_else(|| self.regen_cond(b, k, next, rng)),
            Cond::Is(_, m) => self.regen_expr(m, k, next, rng),
        }
    }
}

/// A program paired with the shared lexicon.
#[derive(Debug, Clone)]
pub struct ProgramHypothesis {
    program: Arc<Program>,
    lexicon: Arc<Lexicon>,
}

impl ProgramHypothesis {
    pub fn new(program: Program, lexicon: Arc<Lexicon>) -> Self {
        Self {
            program: Arc::new(program),
            lexicon,
        }
    }

    /// Parse a program against a lexicon.
    pub fn parse(program: &str, lexicon: Arc<Lexicon>) -> Result<Self> {
        Ok(Self::new(program.parse()?, lexicon))
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl Hypothesis for ProgramHypothesis {
    fn composer(&self) -> Arc<dyn Composer> {
        self.program.clone()
    }

    fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }
}

impl fmt::Display for ProgramHypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)
    }
}
