//! Context model: the scenes agents talk about.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Result, SemanticsError};

/// Largest context accepted. Speakers and listeners enumerate all `2^N`
/// flag assignments of a context.
pub const MAX_CONTEXT_SIZE: usize = 16;

/// An object in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    /// Identity, unique within a context
    pub id: i32,
    /// Hidden flag the speaker wants to convey
    pub is_target: bool,
}

impl Entity {
    pub fn new(id: i32, is_target: bool) -> Self {
        Self { id, is_target }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.id, self.is_target)
    }
}

/// A finite scene of entities, kept sorted by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Entity>", into = "Vec<Entity>")]
pub struct Context {
    entities: Vec<Entity>,
}

impl Context {
    /// Build a context, rejecting repeated identities and contexts larger
    /// than [`MAX_CONTEXT_SIZE`].
    pub fn new(mut entities: Vec<Entity>) -> Result<Self> {
        if entities.len() > MAX_CONTEXT_SIZE {
            return Err(SemanticsError::ContextTooLarge {
                size: entities.len(),
                max: MAX_CONTEXT_SIZE,
            });
        }
        entities.sort_by_key(|e| e.id);
        if let Some(pair) = entities.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(SemanticsError::DuplicateEntity(pair[0].id));
        }
        Ok(Self { entities })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Target flags in identity order.
    pub fn targets(&self) -> Vec<bool> {
        self.entities.iter().map(|e| e.is_target).collect()
    }

    /// Identities in order.
    pub fn ids(&self) -> Vec<i32> {
        self.entities.iter().map(|e| e.id).collect()
    }

    /// Number of flag assignments, `2^N`.
    pub fn assignment_count(&self) -> usize {
        1usize << self.entities.len()
    }

    /// Same identities, flags taken from the bits of `assignment`.
    ///
    /// Entity `j` (in identity order) is a target iff bit `j` is set.
    pub fn variation(&self, assignment: usize) -> Context {
        let entities = self
            .entities
            .iter()
            .enumerate()
            .map(|(j, e)| Entity::new(e.id, (assignment >> j) & 1 == 1))
            .collect();
        Context { entities }
    }

    /// All `2^N` flag assignments over this context's identities.
    pub fn variations(&self) -> impl Iterator<Item = Context> + '_ {
        (0..self.assignment_count()).map(move |i| self.variation(i))
    }
}

impl TryFrom<Vec<Entity>> for Context {
    type Error = SemanticsError;

    fn try_from(entities: Vec<Entity>) -> Result<Self> {
        Context::new(entities)
    }
}

impl From<Context> for Vec<Entity> {
    fn from(context: Context) -> Self {
        context.entities
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entity) in self.entities.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", entity)?;
        }
        write!(f, "}}")
    }
}

/// Draws random contexts with unique identities from a bounded range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextGenerator {
    /// Smallest identity (inclusive)
    pub min_id: i32,
    /// Largest identity (inclusive)
    pub max_id: i32,
    /// Probability that an entity is a target
    pub p_target: f64,
}

impl Default for ContextGenerator {
    fn default() -> Self {
        Self {
            min_id: -10,
            max_id: 10,
            p_target: 0.5,
        }
    }
}

impl ContextGenerator {
    /// Set the target probability.
    pub fn with_p_target(mut self, p_target: f64) -> Self {
        self.p_target = p_target;
        self
    }

    /// Set the identity range.
    pub fn with_id_range(mut self, min_id: i32, max_id: i32) -> Self {
        self.min_id = min_id;
        self.max_id = max_id;
        self
    }

    fn range_len(&self) -> usize {
        if self.max_id < self.min_id {
            0
        } else {
            (i64::from(self.max_id) - i64::from(self.min_id) + 1) as usize
        }
    }

    /// Generate one context of `size` entities.
    pub fn generate<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Result<Context> {
        let available = self.range_len();
        if size > available {
            return Err(SemanticsError::InvalidContext(format!(
                "{} entities requested but only {} identities in [{}, {}]",
                size, available, self.min_id, self.max_id
            )));
        }
        if !(0.0..=1.0).contains(&self.p_target) {
            return Err(SemanticsError::InvalidContext(format!(
                "target probability {} outside [0, 1]",
                self.p_target
            )));
        }

        let ids: Vec<i32> = index::sample(rng, available, size)
            .into_iter()
            .map(|offset| self.min_id + offset as i32)
            .collect();
        let entities = ids
            .into_iter()
            .map(|id| Entity::new(id, rng.gen_bool(self.p_target)))
            .collect();
        Context::new(entities)
    }

    /// Generate `count` independent contexts.
    pub fn generate_many<R: Rng + ?Sized>(
        &self,
        size: usize,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Context>> {
        (0..count).map(|_| self.generate(size, rng)).collect()
    }
}
