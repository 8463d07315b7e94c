use automata::MealyError;
use automata_core::alphabet::Symbol;

/// Errors a learner can report back to its caller (spec §7). Distinct from
/// [`MealyError`], which is about the hypothesis data type itself — this enum
/// is about the learning process failing to produce one.
#[derive(Debug, thiserror::Error)]
pub enum LearnerError<S: Symbol> {
    /// The observation table's rows did not line up while constructing a
    /// hypothesis — an access sequence's one-symbol extension had a row not
    /// seen among the table's representative states. Can only happen if the
    /// table was used while not closed, which is itself a bug in the learner.
    #[error("observation table row has no matching representative state")]
    RowOutOfRange,
    /// Building the hypothesis produced a conflicting or incomplete Mealy
    /// machine.
    #[error(transparent)]
    Mealy(#[from] MealyError<S>),
    /// The oracle reported a counterexample that the learner could not use to
    /// make progress (e.g. one on which the current hypothesis already
    /// agrees with the table). Surfacing this rather than looping forever.
    #[error("counterexample {0:?} did not refine the hypothesis")]
    StaleCounterexample(Vec<S>),
}
