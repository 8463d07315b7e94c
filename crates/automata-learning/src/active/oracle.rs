use std::collections::{HashSet, VecDeque};

use automata::MealyMachine;
use automata_core::Output;
use automata_core::alphabet::{Alphabet, SimpleAlphabet, Symbol};
use tracing::trace;

/// A minimally adequate teacher (MAT) for active learning, consumed by both
/// [`super::lstar::LStar`] and [`super::ttt::Ttt`] (spec §4.1). Wildly
/// different things can implement it — a simulated Mealy machine, a closure,
/// a live process talking to a real system under learning — the learners
/// only ever see this trait.
pub trait Oracle {
    type Symbol: Symbol;
    type Output: Output;

    /// The input alphabet, queried once at learner construction.
    fn alphabet(&self) -> &SimpleAlphabet<Self::Symbol>;

    /// Answers a membership query: the output word the SUL produces for
    /// `word`, of the same length as `word`. Must be total and
    /// deterministic — repeated identical queries return identical answers.
    fn membership_query(&self, word: &[Self::Symbol]) -> Vec<Self::Output>;

    /// Answers an equivalence query: `Ok(())` if `hypothesis` behaves like
    /// the SUL everywhere, otherwise `Err(counterexample)` with a non-empty
    /// word on which the two disagree.
    fn equivalence_query(
        &self,
        hypothesis: &MealyMachine<Self::Symbol, Self::Output>,
    ) -> Result<(), Vec<Self::Symbol>>;
}

/// An oracle backed by an in-memory [`MealyMachine`] standing in for the SUL.
/// Membership queries run the word through it; equivalence queries do an
/// exact breadth-first search over the product of SUL and hypothesis states,
/// which terminates because both are finite. This is the harness used by the
/// test suite and the demo binary — the real out-of-scope teacher would
/// instead drive an external system (spec §1).
#[derive(Clone, Debug)]
pub struct SimulationOracle<S: Symbol, O: Output> {
    sul: MealyMachine<S, O>,
}

impl<S: Symbol, O: Output> SimulationOracle<S, O> {
    /// Wraps `sul` as the system under learning. `sul` must be complete —
    /// every state must have an outgoing transition for every symbol of the
    /// alphabet — since an incomplete SUL cannot answer every membership
    /// query.
    pub fn new(sul: MealyMachine<S, O>) -> Self {
        debug_assert!(
            sul.is_complete(),
            "SimulationOracle requires a complete SUL"
        );
        Self { sul }
    }
}

impl<S: Symbol, O: Output> Oracle for SimulationOracle<S, O> {
    type Symbol = S;
    type Output = O;

    fn alphabet(&self) -> &SimpleAlphabet<S> {
        self.sul.get_alphabet()
    }

    fn membership_query(&self, word: &[S]) -> Vec<O> {
        self.sul
            .transform(word)
            .expect("SimulationOracle requires a complete SUL")
    }

    fn equivalence_query(&self, hypothesis: &MealyMachine<S, O>) -> Result<(), Vec<S>> {
        let mut visited = HashSet::new();
        let start = (self.sul.initial(), hypothesis.initial());
        visited.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back((start, Vec::<S>::new()));

        while let Some(((sul_state, hyp_state), prefix)) = queue.pop_front() {
            for sym in self.sul.get_alphabet().universe() {
                let Some((sul_next, sul_out)) = self.sul.edge(sul_state, sym) else {
                    continue;
                };
                let mut word = prefix.clone();
                word.push(sym.clone());

                let Some((hyp_next, hyp_out)) = hypothesis.edge(hyp_state, sym) else {
                    trace!(?word, "hypothesis incomplete, counterexample found");
                    return Err(word);
                };
                if sul_out != hyp_out {
                    trace!(?word, "outputs diverge, counterexample found");
                    return Err(word);
                }

                let next = (sul_next, hyp_next);
                if visited.insert(next) {
                    queue.push_back((next, word));
                }
            }
        }
        Ok(())
    }
}

/// Performs an exhaustive breadth-first search over the hypothesis' own
/// transitions, up to `max_depth` steps from the initial state, comparing
/// each discovered word's output against `membership`. Sound up to
/// `max_depth` — a fallback for oracles (such as [`FunctionOracle`]) that
/// have no internal state of their own to search a genuine product over.
pub fn bounded_equivalence_search<S: Symbol, O: Output>(
    hypothesis: &MealyMachine<S, O>,
    membership: impl Fn(&[S]) -> Vec<O>,
    max_depth: usize,
) -> Result<(), Vec<S>> {
    let mut queue = VecDeque::new();
    queue.push_back((hypothesis.initial(), Vec::<S>::new()));

    while let Some((state, word)) = queue.pop_front() {
        if word.len() >= max_depth {
            continue;
        }
        for sym in hypothesis.get_alphabet().universe() {
            let mut next_word = word.clone();
            next_word.push(sym.clone());

            let expected = membership(&next_word);
            let actual = hypothesis
                .transform(&next_word)
                .expect("hypothesis built by the learners is always complete");
            if expected != actual {
                return Err(next_word);
            }

            let (next_state, _) = hypothesis
                .edge(state, sym)
                .expect("hypothesis built by the learners is always complete");
            queue.push_back((next_state, next_word));
        }
    }
    Ok(())
}

/// An oracle built from a pair of closures, for systems under learning that
/// are more naturally expressed as a function than as a [`MealyMachine`]
/// (spec §8's mod-3 counter is the canonical example: `inc` just increments
/// a counter mod 3).
pub struct FunctionOracle<S, O, M, E>
where
    S: Symbol,
    O: Output,
    M: Fn(&[S]) -> Vec<O>,
    E: Fn(&MealyMachine<S, O>) -> Result<(), Vec<S>>,
{
    alphabet: SimpleAlphabet<S>,
    membership: M,
    equivalence: E,
}

impl<S, O, M, E> FunctionOracle<S, O, M, E>
where
    S: Symbol,
    O: Output,
    M: Fn(&[S]) -> Vec<O>,
    E: Fn(&MealyMachine<S, O>) -> Result<(), Vec<S>>,
{
    pub fn new(alphabet: SimpleAlphabet<S>, membership: M, equivalence: E) -> Self {
        Self {
            alphabet,
            membership,
            equivalence,
        }
    }
}

impl<S, O, M, E> Oracle for FunctionOracle<S, O, M, E>
where
    S: Symbol,
    O: Output,
    M: Fn(&[S]) -> Vec<O>,
    E: Fn(&MealyMachine<S, O>) -> Result<(), Vec<S>>,
{
    type Symbol = S;
    type Output = O;

    fn alphabet(&self) -> &SimpleAlphabet<S> {
        &self.alphabet
    }

    fn membership_query(&self, word: &[S]) -> Vec<O> {
        (self.membership)(word)
    }

    fn equivalence_query(&self, hypothesis: &MealyMachine<S, O>) -> Result<(), Vec<S>> {
        (self.equivalence)(hypothesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle() -> MealyMachine<char, u8> {
        MealyMachine::builder(SimpleAlphabet::new(['a']))
            .with_transitions([(0, 'a', 1, 1), (1, 'a', 0, 0)])
            .build(0)
            .unwrap()
    }

    #[test]
    fn simulation_oracle_agrees_with_itself() {
        let oracle = SimulationOracle::new(toggle());
        assert_eq!(oracle.equivalence_query(&toggle()), Ok(()));
    }

    #[test]
    fn simulation_oracle_finds_divergence() {
        let oracle = SimulationOracle::new(toggle());
        let wrong = MealyMachine::builder(SimpleAlphabet::new(['a']))
            .with_transitions([(0, 'a', 0, 1)])
            .build(0)
            .unwrap();
        assert!(oracle.equivalence_query(&wrong).is_err());
    }

    #[test]
    fn function_oracle_reports_mod3_counter() {
        let alphabet = SimpleAlphabet::new(['inc']);
        let oracle = FunctionOracle::new(
            alphabet,
            |word: &[&str]| (1..=word.len()).map(|n| ((n % 3) as u8)).collect(),
            |_hyp: &MealyMachine<&str, u8>| Ok(()),
        );
        assert_eq!(oracle.membership_query(&["inc", "inc", "inc"]), vec![1, 2, 0]);
    }
}
