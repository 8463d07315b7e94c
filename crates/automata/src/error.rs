use automata_core::alphabet::Symbol;

use crate::StateId;

/// Errors that can occur while building or querying a [`crate::MealyMachine`].
///
/// Both variants are programming errors per spec §7 ("Duplicate edge
/// insertion... fatal") rather than conditions the caller is expected to
/// recover from; they are still returned as `Err` rather than panicking, so
/// that a learner driven by a misbehaving oracle can report the failure
/// instead of aborting the host process.
#[derive(Debug, thiserror::Error)]
pub enum MealyError<S: Symbol> {
    /// An edge was added whose `(source, symbol)` pair already has a
    /// transition with a different target or output.
    #[error("conflicting edge from state {source} on {symbol:?}: existing transition differs")]
    ConflictingEdge { source: StateId, symbol: S },
    /// A word was run through a machine that does not have a transition for
    /// some symbol along the way, violating the totality invariant (spec
    /// §3: "Every state has exactly one outgoing edge per alphabet symbol").
    #[error("machine is not complete: no transition from state {source} on {symbol:?}")]
    Incomplete { source: StateId, symbol: S },
    /// A state index was used that is out of range for this machine's arena.
    #[error("state {0} does not exist in this machine")]
    UnknownState(StateId),
}
