use itertools::Itertools;

use crate::alphabet::Symbol;

/// A finite sequence of symbols. The empty word `ε` is `len() == 0`.
///
/// Implemented for `[S]`/`Vec<S>` so ordinary slices and owned vectors can be
/// passed wherever a word is expected; the learners never need a dedicated
/// `Word` wrapper type.
pub trait FiniteWord {
    type Symbol: Symbol;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn symbol(&self, position: usize) -> Option<&Self::Symbol>;

    fn symbols(&self) -> std::slice::Iter<'_, Self::Symbol>;

    fn to_vec(&self) -> Vec<Self::Symbol> {
        self.symbols().cloned().collect()
    }

    /// Returns every prefix of `self`, from the empty word up to and
    /// including `self`, in order of increasing length.
    fn prefixes(&self) -> Vec<Vec<Self::Symbol>> {
        (0..=self.len())
            .map(|i| self.symbols().take(i).cloned().collect())
            .collect()
    }
}

impl<S: Symbol> FiniteWord for [S] {
    type Symbol = S;

    fn len(&self) -> usize {
        <[S]>::len(self)
    }

    fn symbol(&self, position: usize) -> Option<&Self::Symbol> {
        self.get(position)
    }

    fn symbols(&self) -> std::slice::Iter<'_, Self::Symbol> {
        self.iter()
    }
}

impl<S: Symbol> FiniteWord for Vec<S> {
    type Symbol = S;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn symbol(&self, position: usize) -> Option<&Self::Symbol> {
        self.as_slice().get(position)
    }

    fn symbols(&self) -> std::slice::Iter<'_, Self::Symbol> {
        self.as_slice().iter()
    }
}

/// Concatenates two words into a fresh owned vector. Used pervasively by the
/// learners to build `s·a`, `access_seq·suffix`, and similar combinations.
pub fn concat<S: Symbol>(a: &[S], b: &[S]) -> Vec<S> {
    a.iter().cloned().chain(b.iter().cloned()).collect()
}

/// Renders a word the way the learners log it: `ε` for the empty word,
/// otherwise symbols joined by `·`.
pub fn show<S: Symbol + std::fmt::Display>(word: &[S]) -> String {
    if word.is_empty() {
        "ε".to_string()
    } else {
        word.iter().map(|s| s.to_string()).join("\u{b7}")
    }
}
