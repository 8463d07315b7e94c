//! Shared primitives for the automata learning workspace: alphabets, words
//! and the handful of marker types every other crate builds on.

pub mod alphabet;
pub mod word;

use std::fmt::Debug;
use std::hash::Hash;

/// The output side of a Mealy transition (or a membership query). Blanket
/// implemented, like [`alphabet::Symbol`], so any hashable, comparable type
/// can be used as an output without ceremony.
pub trait Output: Clone + Eq + Hash + Debug {}
impl<T: Clone + Eq + Hash + Debug> Output for T {}

/// Deterministic-iteration collection aliases, mirroring the teacher's own
/// `math` module: an [`indexmap::IndexSet`] preserves insertion order, which
/// the learners rely on for reproducible query ordering (spec §5).
pub mod math {
    pub type Set<T> = indexmap::IndexSet<T>;
    pub type Map<K, V> = indexmap::IndexMap<K, V>;
}
