use std::collections::HashMap;

use automata_core::alphabet::{Alphabet, SimpleAlphabet, Symbol};
use automata_core::word::FiniteWord;
use automata_core::Output;
use tracing::trace;

use crate::error::MealyError;

/// Identifies a state inside a [`MealyMachine`]'s arena. States are never
/// removed, so a `StateId` handed out by `add_state` stays valid for the
/// lifetime of the machine it came from.
pub type StateId = usize;

#[derive(Clone, Debug, Default)]
struct MealyState<S, O> {
    transitions: HashMap<S, (StateId, O)>,
}

/// A deterministic Mealy machine: states, a total transition function `δ`,
/// and an output function `λ` sharing the same domain (spec §3). States live
/// in an arena (`Vec<MealyState<_>>`) addressed by [`StateId`] rather than
/// behind `Rc`/`RefCell`, so cycles in the transition graph (which are the
/// norm, not the exception, for a learned hypothesis) need no special
/// handling — cloning a machine clones its whole arena, cycles included.
#[derive(Clone, Debug)]
pub struct MealyMachine<S: Symbol, O: Output> {
    alphabet: SimpleAlphabet<S>,
    states: Vec<MealyState<S, O>>,
    initial: StateId,
    current: StateId,
}

impl<S: Symbol, O: Output> MealyMachine<S, O> {
    /// Creates a machine over `alphabet` with a single state, which is both
    /// the initial and the current state.
    pub fn new(alphabet: SimpleAlphabet<S>) -> Self {
        Self {
            alphabet,
            states: vec![MealyState::default()],
            initial: 0,
            current: 0,
        }
    }

    /// Starts a [`MealyMachineBuilder`] for constructing a machine from a
    /// batch of `(source, symbol, target, output)` transitions, mirroring
    /// the builder ergonomics used throughout the rest of the workspace.
    pub fn builder(alphabet: SimpleAlphabet<S>) -> MealyMachineBuilder<S, O> {
        MealyMachineBuilder::new(alphabet)
    }

    /// Adds a fresh state with no outgoing transitions and returns its id.
    pub fn add_state(&mut self) -> StateId {
        self.states.push(MealyState::default());
        self.states.len() - 1
    }

    /// Returns the alphabet this machine is defined over.
    pub fn get_alphabet(&self) -> &SimpleAlphabet<S> {
        &self.alphabet
    }

    /// Returns every state id currently in the arena.
    pub fn get_states(&self) -> impl Iterator<Item = StateId> + '_ {
        0..self.states.len()
    }

    /// Number of states in the machine.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// The machine's initial state.
    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// Sets which state is initial. Does not move the current execution
    /// pointer; call [`Self::reset`] afterwards if that's desired.
    pub fn set_initial(&mut self, state: StateId) {
        self.initial = state;
    }

    /// Inserts `δ(source, symbol) = target`, `λ(source, symbol) = output`.
    /// Re-adding an identical edge is a no-op; adding a conflicting edge
    /// (same source and symbol, different target or output) is a
    /// programming error and returns [`MealyError::ConflictingEdge`] (spec
    /// §4.2: "conflicting edge is a programming error").
    ///
    /// # Example
    /// ```
    /// use automata::MealyMachine;
    /// use automata_core::alphabet::SimpleAlphabet;
    ///
    /// let mut mm: MealyMachine<char, u8> = MealyMachine::new(SimpleAlphabet::new(['a']));
    /// let q1 = mm.add_state();
    /// mm.add_edge(0, 'a', 1, q1).unwrap();
    /// // Re-adding the same edge is fine.
    /// mm.add_edge(0, 'a', 1, q1).unwrap();
    /// // A conflicting edge is rejected.
    /// assert!(mm.add_edge(0, 'a', 2, q1).is_err());
    /// ```
    pub fn add_edge(
        &mut self,
        source: StateId,
        symbol: S,
        output: O,
        target: StateId,
    ) -> Result<(), MealyError<S>> {
        self.insert_edge(source, symbol, output, target, false)
    }

    /// Like [`Self::add_edge`], but silently replaces an existing transition
    /// instead of erroring on conflict. Used by TTT's hypothesis
    /// construction, which repeatedly overwrites transitions as sifting
    /// discovers more states (spec §4.4).
    pub fn add_edge_override(
        &mut self,
        source: StateId,
        symbol: S,
        output: O,
        target: StateId,
    ) -> Result<(), MealyError<S>> {
        self.insert_edge(source, symbol, output, target, true)
    }

    fn insert_edge(
        &mut self,
        source: StateId,
        symbol: S,
        output: O,
        target: StateId,
        override_existing: bool,
    ) -> Result<(), MealyError<S>> {
        let state = self
            .states
            .get_mut(source)
            .ok_or(MealyError::UnknownState(source))?;
        match state.transitions.get(&symbol) {
            Some((existing_target, existing_output))
                if !override_existing
                    && (*existing_target != target || *existing_output != output) =>
            {
                return Err(MealyError::ConflictingEdge { source, symbol });
            }
            _ => {
                trace!(source, target, ?symbol, "inserting edge");
                state.transitions.insert(symbol, (target, output));
            }
        }
        Ok(())
    }

    /// The state reached from `source` on `symbol`, together with the
    /// output produced, if such a transition exists.
    pub fn edge(&self, source: StateId, symbol: &S) -> Option<(StateId, &O)> {
        self.states
            .get(source)?
            .transitions
            .get(symbol)
            .map(|(target, output)| (*target, output))
    }

    /// Whether every state has exactly one outgoing edge per symbol of the
    /// alphabet (spec §3's totality invariant).
    pub fn is_complete(&self) -> bool {
        self.states.iter().all(|state| {
            self.alphabet
                .universe()
                .all(|sym| state.transitions.contains_key(sym))
        })
    }

    /// Returns the current execution state (as left by [`Self::process_input`]).
    pub fn current(&self) -> StateId {
        self.current
    }

    /// Resets execution back to the initial state.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Runs `word` from the current state, advancing it, and returns the
    /// output word of the same length. Fails with [`MealyError::Incomplete`]
    /// if some step along the way has no transition.
    pub fn process_input<W>(&mut self, word: &W) -> Result<Vec<O>, MealyError<S>>
    where
        W: FiniteWord<Symbol = S> + ?Sized,
    {
        let mut output = Vec::with_capacity(word.len());
        for symbol in word.symbols() {
            let (target, o) = self
                .edge(self.current, symbol)
                .ok_or_else(|| MealyError::Incomplete {
                    source: self.current,
                    symbol: symbol.clone(),
                })?;
            output.push(o.clone());
            self.current = target;
        }
        Ok(output)
    }

    /// Runs `word` from the initial state without disturbing
    /// [`Self::current`], returning the output word. This is the read-only
    /// variant the oracles and equivalence checks use.
    pub fn transform<W>(&self, word: &W) -> Result<Vec<O>, MealyError<S>>
    where
        W: FiniteWord<Symbol = S> + ?Sized,
    {
        let mut state = self.initial;
        let mut output = Vec::with_capacity(word.len());
        for symbol in word.symbols() {
            let (target, o) = self
                .edge(state, symbol)
                .ok_or_else(|| MealyError::Incomplete {
                    source: state,
                    symbol: symbol.clone(),
                })?;
            output.push(o.clone());
            state = target;
        }
        Ok(output)
    }
}

/// Builds a [`MealyMachine`] from a batch of `(source, symbol, target,
/// output)` transitions, in the style of the transition-system builders used
/// elsewhere in the workspace.
pub struct MealyMachineBuilder<S: Symbol, O: Output> {
    alphabet: SimpleAlphabet<S>,
    transitions: Vec<(StateId, S, StateId, O)>,
    num_states: usize,
}

impl<S: Symbol, O: Output> MealyMachineBuilder<S, O> {
    pub fn new(alphabet: SimpleAlphabet<S>) -> Self {
        Self {
            alphabet,
            transitions: Vec::new(),
            num_states: 0,
        }
    }

    /// Registers a batch of transitions. State ids are taken to be dense:
    /// the machine will have `max(source, target) + 1` states.
    pub fn with_transitions(
        mut self,
        transitions: impl IntoIterator<Item = (StateId, S, StateId, O)>,
    ) -> Self {
        for (source, symbol, target, output) in transitions {
            self.num_states = self.num_states.max(source + 1).max(target + 1);
            self.transitions.push((source, symbol, target, output));
        }
        self
    }

    /// Consumes the builder, producing a [`MealyMachine`] with `initial` as
    /// its starting state.
    pub fn build(self, initial: StateId) -> Result<MealyMachine<S, O>, MealyError<S>> {
        let mut mm = MealyMachine::new(self.alphabet);
        let num_states = self.num_states.max(initial + 1);
        for _ in 1..num_states.max(1) {
            mm.add_state();
        }
        for (source, symbol, target, output) in self.transitions {
            mm.add_edge(source, symbol, output, target)?;
        }
        mm.set_initial(initial);
        mm.reset();
        Ok(mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_run_toggle() {
        let alphabet = SimpleAlphabet::new(['a']);
        let mm: MealyMachine<char, u8> = MealyMachine::builder(alphabet)
            .with_transitions([(0, 'a', 1, 1), (1, 'a', 0, 0)])
            .build(0)
            .unwrap();
        assert_eq!(mm.size(), 2);
        assert_eq!(mm.transform(&vec!['a', 'a', 'a']).unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn process_input_advances_and_reset_rewinds() {
        let alphabet = SimpleAlphabet::new(['a']);
        let mut mm: MealyMachine<char, u8> = MealyMachine::builder(alphabet)
            .with_transitions([(0, 'a', 1, 1), (1, 'a', 0, 0)])
            .build(0)
            .unwrap();
        assert_eq!(mm.process_input(&vec!['a']).unwrap(), vec![1]);
        assert_eq!(mm.current(), 1);
        mm.reset();
        assert_eq!(mm.current(), 0);
    }

    #[test_log::test]
    fn conflicting_edge_is_rejected_identical_is_noop() {
        let alphabet = SimpleAlphabet::new(['a']);
        let mut mm: MealyMachine<char, u8> = MealyMachine::new(alphabet);
        let q1 = mm.add_state();
        mm.add_edge(0, 'a', 1, q1).unwrap();
        assert!(mm.add_edge(0, 'a', 1, q1).is_ok());
        assert!(mm.add_edge(0, 'a', 2, q1).is_err());
    }

    #[test]
    fn incomplete_machine_rejects_missing_transition() {
        let alphabet = SimpleAlphabet::new(['a', 'b']);
        let mut mm: MealyMachine<char, u8> = MealyMachine::new(alphabet);
        mm.add_edge(0, 'a', 1, 0).unwrap();
        assert!(!mm.is_complete());
        assert!(mm.process_input(&vec!['b']).is_err());
    }
}
