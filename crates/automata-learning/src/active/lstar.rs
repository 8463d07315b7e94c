use std::cell::RefCell;
use std::collections::HashMap;

use automata::MealyMachine;
use automata_core::alphabet::{Alphabet, SimpleAlphabet};
use automata_core::math::Map;
use automata_core::word::concat;
use itertools::Itertools;
use tabled::builder::Builder;
use tracing::{debug, info, trace};

use crate::LearnerError;

use super::checkpoint::Checkpoint;
use super::oracle::Oracle;
use super::options::LearnerOptions;

/// A row of the observation table: for each suffix in `E`, the tail output
/// the SUL produces for that suffix after the row's access sequence (spec
/// §3). Two access sequences with equal rows are assumed to reach the same
/// state of the SUL.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
struct Row<O>(Vec<Vec<O>>);

type InconsistencyWitness<S> = (Vec<S>, Vec<S>, S, Vec<S>);

/// Angluin's L* for Mealy machines (spec §4.3): maintains an observation
/// table `(S, E, T)` over access sequences `S` (prefix-closed) and
/// distinguishing suffixes `E`, refining both until the table is closed and
/// consistent, then integrates counterexamples by adding every prefix of the
/// counterexample to `S` (the original Angluin strategy — spec's REDESIGN
/// FLAGS considered the Rivest/Schapire alternative and kept this one for
/// simplicity, at the cost of possibly more rows).
pub struct LStar<T: Oracle> {
    teacher: T,
    alphabet: SimpleAlphabet<T::Symbol>,
    s: Vec<Vec<T::Symbol>>,
    e: Vec<Vec<T::Symbol>>,
    cache: HashMap<Vec<T::Symbol>, Vec<T::Output>>,
    s_counter: u64,
    e_counter: u64,
    closed_cache: RefCell<Option<(u64, u64, Option<Vec<T::Symbol>>)>>,
    consistent_cache: RefCell<Option<(u64, u64, Option<InconsistencyWitness<T::Symbol>>)>>,
}

impl<T: Oracle> LStar<T> {
    /// Builds a learner over `teacher`, seeding `S = {ε}` and `E` with one
    /// singleton suffix per alphabet symbol — the minimal table from which
    /// closedness and consistency can be asked at all.
    pub fn new(teacher: T) -> Self {
        let alphabet = teacher.alphabet().clone();
        let e = alphabet.universe().map(|a| vec![a.clone()]).collect();
        Self {
            teacher,
            alphabet,
            s: vec![Vec::new()],
            e,
            cache: HashMap::new(),
            s_counter: 0,
            e_counter: 0,
            closed_cache: RefCell::new(None),
            consistent_cache: RefCell::new(None),
        }
    }

    /// The rows currently used as access sequences, in insertion order.
    pub fn access_sequences(&self) -> &[Vec<T::Symbol>] {
        &self.s
    }

    /// The distinguishing suffixes currently in use, in insertion order.
    pub fn suffixes(&self) -> &[Vec<T::Symbol>] {
        &self.e
    }

    fn query(&mut self, word: &[T::Symbol]) -> Vec<T::Output> {
        if let Some(answer) = self.cache.get(word) {
            return answer.clone();
        }
        let answer = self.teacher.membership_query(word);
        self.cache.insert(word.to_vec(), answer.clone());
        answer
    }

    /// `T(x, e)`: the output produced on `e`, after having read `x` — the
    /// last `|e|` symbols of the SUL's output on `x·e` (spec §3).
    fn tail(&mut self, x: &[T::Symbol], e: &[T::Symbol]) -> Vec<T::Output> {
        let full = self.query(&concat(x, e));
        full[full.len() - e.len()..].to_vec()
    }

    fn row(&mut self, x: &[T::Symbol]) -> Row<T::Output> {
        let suffixes = self.e.clone();
        Row(suffixes.iter().map(|e| self.tail(x, e)).collect())
    }

    fn symbols(&self) -> Vec<T::Symbol> {
        self.alphabet.universe().cloned().collect()
    }

    fn add_prefix(&mut self, x: Vec<T::Symbol>) {
        if !self.s.contains(&x) {
            trace!(?x, "extending S");
            self.s.push(x);
            self.s_counter += 1;
        }
    }

    fn add_suffix(&mut self, e: Vec<T::Symbol>) {
        if !self.e.contains(&e) {
            trace!(?e, "extending E");
            self.e.push(e);
            self.e_counter += 1;
        }
    }

    fn compute_closure_witness(&mut self) -> Option<Vec<T::Symbol>> {
        let s_list = self.s.clone();
        let s_rows: Vec<Row<T::Output>> = s_list.iter().map(|x| self.row(x)).collect();
        let symbols = self.symbols();
        for x in &s_list {
            for a in &symbols {
                let xa = concat(x, std::slice::from_ref(a));
                let row_xa = self.row(&xa);
                if !s_rows.contains(&row_xa) {
                    return Some(xa);
                }
            }
        }
        None
    }

    fn closure_witness(&mut self) -> Option<Vec<T::Symbol>> {
        if let Some((sc, ec, witness)) = self.closed_cache.borrow().clone() {
            if sc == self.s_counter && ec == self.e_counter {
                return witness;
            }
        }
        let witness = self.compute_closure_witness();
        *self.closed_cache.borrow_mut() = Some((self.s_counter, self.e_counter, witness.clone()));
        witness
    }

    /// Whether every row of `S·A` equals some row of `S` (spec §3).
    /// Memoized against the table's change counters.
    pub fn closed(&mut self) -> bool {
        self.closure_witness().is_none()
    }

    fn compute_consistency_witness(&mut self) -> Option<InconsistencyWitness<T::Symbol>> {
        let s_list = self.s.clone();
        let e_list = self.e.clone();
        let symbols = self.symbols();
        for (s1, s2) in s_list.into_iter().tuple_combinations() {
            if self.row(&s1) != self.row(&s2) {
                continue;
            }
            for a in &symbols {
                let s1a = concat(&s1, std::slice::from_ref(a));
                let s2a = concat(&s2, std::slice::from_ref(a));
                for e in &e_list {
                    if self.tail(&s1a, e) != self.tail(&s2a, e) {
                        return Some((s1, s2, a.clone(), e.clone()));
                    }
                }
            }
        }
        None
    }

    fn consistency_witness(&mut self) -> Option<InconsistencyWitness<T::Symbol>> {
        if let Some((sc, ec, witness)) = self.consistent_cache.borrow().clone() {
            if sc == self.s_counter && ec == self.e_counter {
                return witness;
            }
        }
        let witness = self.compute_consistency_witness();
        *self.consistent_cache.borrow_mut() =
            Some((self.s_counter, self.e_counter, witness.clone()));
        witness
    }

    /// Whether any two access sequences with equal rows still diverge on
    /// some `a·e` (spec §3). Memoized against the table's change counters.
    pub fn consistent(&mut self) -> bool {
        self.consistency_witness().is_none()
    }

    /// Advances the table by exactly one refinement: fixes the first
    /// inconsistency found, or — if the table is consistent but not closed —
    /// fixes the first missing row. A no-op if the table is already closed
    /// and consistent (spec §4.3: "at most one of the two branches need be
    /// taken per call").
    pub fn step(&mut self) {
        if let Some((_, _, a, e)) = self.consistency_witness() {
            let mut new_e = vec![a];
            new_e.extend(e);
            self.add_suffix(new_e);
            return;
        }
        if let Some(witness) = self.closure_witness() {
            self.add_prefix(witness);
        }
    }

    fn render_table(&mut self) -> String {
        let mut builder = Builder::default();
        let suffixes = self.e.clone();
        let mut header = vec![String::new()];
        header.extend(suffixes.iter().map(|e| format!("{e:?}")));
        builder.push_record(header);

        let s_list = self.s.clone();
        for x in &s_list {
            let mut row = vec![format!("{x:?}")];
            for e in &suffixes {
                row.push(format!("{:?}", self.tail(x, e)));
            }
            builder.push_record(row);
        }
        let symbols = self.symbols();
        for x in &s_list {
            for a in &symbols {
                let xa = concat(x, std::slice::from_ref(a));
                if s_list.contains(&xa) {
                    continue;
                }
                let mut row = vec![format!("{xa:?} (S\u{b7}A)")];
                for e in &suffixes {
                    row.push(format!("{:?}", self.tail(&xa, e)));
                }
                builder.push_record(row);
            }
        }
        builder.build().to_string()
    }

    /// Builds a hypothesis Mealy machine from the current table. Requires a
    /// closed and consistent table — callers never invoke this on a table
    /// that isn't, since [`Self::run`] always drives it to that state first.
    pub fn build_hypothesis(&mut self) -> Result<MealyMachine<T::Symbol, T::Output>, LearnerError<T::Symbol>> {
        assert!(
            self.closed() && self.consistent(),
            "build_hypothesis requires a closed, consistent observation table"
        );

        let s_list = self.s.clone();
        let mut state_of_row: Map<Row<T::Output>, usize> = Map::new();
        for x in &s_list {
            let row = self.row(x);
            if !state_of_row.contains_key(&row) {
                let id = state_of_row.len();
                state_of_row.insert(row, id);
            }
        }

        let initial_row = self.row(&Vec::new());
        let initial = *state_of_row
            .get(&initial_row)
            .ok_or(LearnerError::RowOutOfRange)?;

        let mut mm = MealyMachine::new(self.alphabet.clone());
        for _ in 1..state_of_row.len() {
            mm.add_state();
        }
        mm.set_initial(initial);
        mm.reset();

        let symbols = self.symbols();
        for x in &s_list {
            let row_x = self.row(x);
            let source = *state_of_row
                .get(&row_x)
                .ok_or(LearnerError::RowOutOfRange)?;
            for a in &symbols {
                let xa = concat(x, std::slice::from_ref(a));
                let row_xa = self.row(&xa);
                let target = *state_of_row
                    .get(&row_xa)
                    .ok_or(LearnerError::RowOutOfRange)?;
                let output = self.tail(x, std::slice::from_ref(a))[0].clone();
                mm.add_edge(source, a.clone(), output, target)?;
            }
        }
        Ok(mm)
    }

    /// Runs the learner to completion: alternates refining the table until
    /// it is closed and consistent, builds a hypothesis, and asks the
    /// oracle's equivalence query. Every prefix of a returned counterexample
    /// is added to `S` (Angluin's original strategy) and the cycle repeats
    /// until the oracle answers `Ok(())`.
    pub fn run(
        &mut self,
        options: &mut LearnerOptions<T::Symbol, T::Output>,
    ) -> Result<MealyMachine<T::Symbol, T::Output>, LearnerError<T::Symbol>> {
        let mut equivalence_queries = 0usize;
        loop {
            while !(self.closed() && self.consistent()) {
                if options.print_observation_table {
                    info!("\n{}", self.render_table());
                }
                self.step();
            }
            let hypothesis = self.build_hypothesis()?;
            if options.show_intermediate {
                debug!(states = hypothesis.size(), "constructed hypothesis");
            }
            options.report_hypothesis(&hypothesis);

            equivalence_queries += 1;
            if equivalence_queries > options.max_equivalence_queries {
                return Err(LearnerError::StaleCounterexample(Vec::new()));
            }

            match self.teacher.equivalence_query(&hypothesis) {
                Ok(()) => return Ok(hypothesis),
                Err(counterexample) => {
                    debug!(?counterexample, "integrating counterexample");
                    let before = self.s.len();
                    for prefix in automata_core::word::FiniteWord::prefixes(&counterexample) {
                        self.add_prefix(prefix);
                    }
                    if self.s.len() == before {
                        return Err(LearnerError::StaleCounterexample(counterexample));
                    }
                }
            }
        }
    }
}

impl<T: Oracle> LStar<T>
where
    T::Symbol: serde::Serialize + serde::de::DeserializeOwned,
    T::Output: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Snapshots `S`, `E` and every memoized membership answer.
    pub fn checkpoint(&self) -> Checkpoint<T::Symbol, T::Output> {
        Checkpoint {
            s: self.s.clone(),
            e: self.e.clone(),
            t: self.cache.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Restores `S`, `E` and the membership cache from a checkpoint,
    /// invalidating the closed/consistent memoization so it is recomputed
    /// against the restored state.
    pub fn restore(&mut self, checkpoint: Checkpoint<T::Symbol, T::Output>) {
        self.s = checkpoint.s;
        self.e = checkpoint.e;
        self.cache = checkpoint.t.into_iter().collect();
        self.s_counter += 1;
        self.e_counter += 1;
    }

    /// Serializes a checkpoint of this learner to JSON.
    pub fn save_to_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.checkpoint())
    }

    /// Restores this learner's state from a JSON checkpoint produced by
    /// [`Self::save_to_string`].
    pub fn load_from_string(&mut self, data: &str) -> Result<(), serde_json::Error> {
        let checkpoint = serde_json::from_str(data)?;
        self.restore(checkpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::active::oracle::SimulationOracle;
    use automata::MealyMachine;

    fn toggle() -> MealyMachine<char, u8> {
        MealyMachine::builder(SimpleAlphabet::new(['a']))
            .with_transitions([(0, 'a', 1, 1), (1, 'a', 0, 0)])
            .build(0)
            .unwrap()
    }

    fn mod3_counter() -> MealyMachine<char, u8> {
        MealyMachine::builder(SimpleAlphabet::new(['a']))
            .with_transitions([
                (0, 'a', 1, 0),
                (1, 'a', 2, 1),
                (2, 'a', 0, 2),
            ])
            .build(0)
            .unwrap()
    }

    #[test_log::test]
    fn learns_two_state_toggle() {
        let oracle = SimulationOracle::new(toggle());
        let mut learner = LStar::new(oracle);
        let mut options = LearnerOptions::default();
        let hypothesis = learner.run(&mut options).unwrap();
        assert_eq!(hypothesis.size(), 2);
        assert_eq!(hypothesis.transform(&vec!['a', 'a', 'a']).unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn learns_mod3_counter() {
        let oracle = SimulationOracle::new(mod3_counter());
        let mut learner = LStar::new(oracle);
        let mut options = LearnerOptions::default();
        let hypothesis = learner.run(&mut options).unwrap();
        assert_eq!(hypothesis.size(), 3);
        assert_eq!(
            hypothesis.transform(&vec!['a', 'a', 'a', 'a']).unwrap(),
            vec![0, 1, 2, 0]
        );
    }

    #[test]
    fn closed_and_consistent_hold_for_a_fresh_table() {
        let oracle = SimulationOracle::new(toggle());
        let mut learner = LStar::new(oracle);
        assert!(learner.consistent());
    }

    #[test]
    fn checkpoint_round_trips() {
        let oracle = SimulationOracle::new(mod3_counter());
        let mut learner = LStar::new(oracle);
        learner.step();
        learner.step();
        let saved = learner.save_to_string().unwrap();

        let oracle2 = SimulationOracle::new(mod3_counter());
        let mut restored = LStar::new(oracle2);
        restored.load_from_string(&saved).unwrap();

        assert_eq!(restored.access_sequences(), learner.access_sequences());
        assert_eq!(restored.suffixes(), learner.suffixes());
    }

    #[test]
    fn epsilon_is_always_in_s() {
        let learner = LStar::new(SimulationOracle::new(mod3_counter()));
        assert!(learner.access_sequences().contains(&Vec::new()));
    }

    #[test]
    fn every_singleton_symbol_is_in_e_from_the_start() {
        let learner = LStar::new(SimulationOracle::new(door_alphabet_only()));
        let alphabet: Vec<&str> = learner.alphabet.universe().cloned().collect();
        for a in alphabet {
            assert!(learner.suffixes().contains(&vec![a]));
        }
    }

    #[test]
    fn change_counters_are_monotonic_across_steps() {
        let oracle = SimulationOracle::new(mod3_counter());
        let mut learner = LStar::new(oracle);
        let mut last = (learner.s_counter, learner.e_counter);
        for _ in 0..10 {
            learner.step();
            let next = (learner.s_counter, learner.e_counter);
            assert!(next.0 >= last.0 && next.1 >= last.1);
            last = next;
        }
    }

    #[test]
    fn build_hypothesis_state_count_matches_distinct_row_count() {
        let oracle = SimulationOracle::new(mod3_counter());
        let mut learner = LStar::new(oracle);
        while !(learner.closed() && learner.consistent()) {
            learner.step();
        }
        let distinct_rows: std::collections::HashSet<_> =
            learner.s.clone().iter().map(|s| learner.row(s)).collect();
        let hypothesis = learner.build_hypothesis().unwrap();
        assert_eq!(hypothesis.size(), distinct_rows.len());
    }

    fn door_alphabet_only() -> MealyMachine<&'static str, &'static str> {
        MealyMachine::builder(SimpleAlphabet::new(["open", "close", "push"]))
            .with_transitions([
                (0, "open", 0, "x"),
                (0, "close", 0, "x"),
                (0, "push", 0, "x"),
            ])
            .build(0)
            .unwrap()
    }
}
