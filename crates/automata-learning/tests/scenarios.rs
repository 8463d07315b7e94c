use std::cell::Cell;
use std::rc::Rc;

use automata::MealyMachine;
use automata_core::alphabet::{CharAlphabet, SimpleAlphabet};
use automata_learning::active::{FunctionOracle, LStar, LearnerOptions, Oracle, SimulationOracle, Ttt};

/// Wraps an [`Oracle`] and counts how many membership queries pass through
/// it, so a test can assert a learner issues finitely many.
struct CountingOracle<O: Oracle> {
    inner: O,
    queries: Rc<Cell<usize>>,
}

impl<O: Oracle> CountingOracle<O> {
    fn new(inner: O) -> (Self, Rc<Cell<usize>>) {
        let queries = Rc::new(Cell::new(0));
        (
            Self {
                inner,
                queries: queries.clone(),
            },
            queries,
        )
    }
}

impl<O: Oracle> Oracle for CountingOracle<O> {
    type Symbol = O::Symbol;
    type Output = O::Output;

    fn alphabet(&self) -> &SimpleAlphabet<Self::Symbol> {
        self.inner.alphabet()
    }

    fn membership_query(&self, word: &[Self::Symbol]) -> Vec<Self::Output> {
        self.queries.set(self.queries.get() + 1);
        self.inner.membership_query(word)
    }

    fn equivalence_query(
        &self,
        hypothesis: &MealyMachine<Self::Symbol, Self::Output>,
    ) -> Result<(), Vec<Self::Symbol>> {
        self.inner.equivalence_query(hypothesis)
    }
}

fn identity_machine() -> MealyMachine<char, &'static str> {
    MealyMachine::builder(CharAlphabet::of_size(2).into())
        .with_transitions([(0, 'a', 0, "x"), (0, 'b', 0, "x")])
        .build(0)
        .unwrap()
}

fn toggle() -> MealyMachine<char, u8> {
    MealyMachine::builder(SimpleAlphabet::new(['a']))
        .with_transitions([(0, 'a', 1, 1), (1, 'a', 0, 0)])
        .build(0)
        .unwrap()
}

fn door() -> MealyMachine<&'static str, &'static str> {
    MealyMachine::builder(SimpleAlphabet::new(["open", "close", "push"]))
        .with_transitions([
            (0, "open", 1, "opened"),
            (0, "close", 0, "already_closed"),
            (0, "push", 0, "cant_push"),
            (1, "open", 1, "already_open"),
            (1, "close", 0, "closed"),
            (1, "push", 2, "broke"),
            (2, "open", 2, "broken"),
            (2, "close", 2, "broken"),
            (2, "push", 2, "broken"),
        ])
        .build(0)
        .unwrap()
}

/// A 5-state machine with no particular structure, used for the
/// membership-query minimality scenario.
fn five_state_machine() -> MealyMachine<char, u8> {
    MealyMachine::builder(CharAlphabet::of_size(2).into())
        .with_transitions([
            (0, 'a', 1, 0),
            (0, 'b', 2, 1),
            (1, 'a', 2, 1),
            (1, 'b', 3, 0),
            (2, 'a', 4, 0),
            (2, 'b', 0, 1),
            (3, 'a', 3, 1),
            (3, 'b', 4, 0),
            (4, 'a', 0, 0),
            (4, 'b', 1, 1),
        ])
        .build(0)
        .unwrap()
}

#[test]
fn lstar_learns_the_trivial_identity_machine() {
    let oracle = SimulationOracle::new(identity_machine());
    let mut learner = LStar::new(oracle);
    let hypothesis = learner.run(&mut LearnerOptions::default()).unwrap();
    assert_eq!(hypothesis.size(), 1);
    assert_eq!(hypothesis.transform(&vec!['a', 'b', 'a']).unwrap(), vec!["x", "x", "x"]);
}

#[test]
fn ttt_learns_the_trivial_identity_machine() {
    let oracle = SimulationOracle::new(identity_machine());
    let mut learner = Ttt::new(oracle);
    let hypothesis = learner.run(&mut LearnerOptions::default()).unwrap();
    assert_eq!(hypothesis.size(), 1);
}

#[test]
fn lstar_learns_the_two_state_toggle() {
    let oracle = SimulationOracle::new(toggle());
    let mut learner = LStar::new(oracle);
    let hypothesis = learner.run(&mut LearnerOptions::default()).unwrap();
    assert_eq!(hypothesis.size(), 2);
}

#[test]
fn lstar_learns_the_mod3_counter_via_a_function_oracle() {
    let alphabet = SimpleAlphabet::new(["inc"]);
    let oracle = FunctionOracle::new(
        alphabet,
        |word: &[&str]| (1..=word.len()).map(|n| (n % 3) as u8).collect(),
        |hypothesis: &MealyMachine<&str, u8>| {
            automata_learning::active::bounded_equivalence_search(
                hypothesis,
                |word: &[&str]| (1..=word.len()).map(|n| (n % 3) as u8).collect(),
                12,
            )
        },
    );
    let mut learner = LStar::new(oracle);
    let hypothesis = learner.run(&mut LearnerOptions::default()).unwrap();
    assert_eq!(hypothesis.size(), 3);
    assert_eq!(
        hypothesis.transform(&vec!["inc", "inc", "inc", "inc"]).unwrap(),
        vec![1, 2, 0, 1]
    );
}

#[test]
fn ttt_learns_the_mod3_counter_via_a_function_oracle() {
    let alphabet = SimpleAlphabet::new(["inc"]);
    let oracle = FunctionOracle::new(
        alphabet,
        |word: &[&str]| (1..=word.len()).map(|n| (n % 3) as u8).collect(),
        |hypothesis: &MealyMachine<&str, u8>| {
            automata_learning::active::bounded_equivalence_search(
                hypothesis,
                |word: &[&str]| (1..=word.len()).map(|n| (n % 3) as u8).collect(),
                12,
            )
        },
    );
    let mut learner = Ttt::new(oracle);
    let hypothesis = learner.run(&mut LearnerOptions::default()).unwrap();
    assert_eq!(hypothesis.size(), 3);
}

#[test]
fn lstar_learns_the_door_and_recovers_from_the_push_on_open_counterexample() {
    let oracle = SimulationOracle::new(door());
    let mut learner = LStar::new(oracle);
    let hypothesis = learner.run(&mut LearnerOptions::default()).unwrap();
    assert_eq!(hypothesis.size(), 3);
    assert_eq!(
        hypothesis.transform(&vec!["open", "push"]).unwrap(),
        vec!["opened", "broke"]
    );
    assert_eq!(
        hypothesis.transform(&vec!["open", "push", "push"]).unwrap(),
        vec!["opened", "broke", "broken"]
    );
}

#[test]
fn ttt_learns_the_door_and_recovers_from_the_push_on_open_counterexample() {
    let oracle = SimulationOracle::new(door());
    let mut learner = Ttt::new(oracle);
    let hypothesis = learner.run(&mut LearnerOptions::default()).unwrap();
    assert_eq!(hypothesis.size(), 3);
    assert_eq!(
        hypothesis.transform(&vec!["open", "push"]).unwrap(),
        vec!["opened", "broke"]
    );
}

#[test]
fn both_learners_agree_on_a_five_state_machine_with_finitely_many_queries() {
    let target = five_state_machine();

    let (oracle_a, counter_a) = CountingOracle::new(SimulationOracle::new(target.clone()));
    let mut lstar = LStar::new(oracle_a);
    let hyp_a = lstar.run(&mut LearnerOptions::default()).unwrap();

    let (oracle_b, counter_b) = CountingOracle::new(SimulationOracle::new(target.clone()));
    let mut ttt = Ttt::new(oracle_b);
    let hyp_b = ttt.run(&mut LearnerOptions::default()).unwrap();

    assert_eq!(hyp_a.size(), target.size());
    assert_eq!(hyp_b.size(), target.size());
    assert!(counter_a.get() > 0 && counter_a.get() < 100_000);
    assert!(counter_b.get() > 0 && counter_b.get() < 100_000);

    let words: Vec<Vec<char>> = vec![
        vec!['a', 'a', 'b', 'a'],
        vec!['b', 'b', 'a'],
        vec!['a', 'b', 'b', 'a', 'a'],
    ];
    for word in words {
        assert_eq!(hyp_a.transform(&word).unwrap(), hyp_b.transform(&word).unwrap());
    }
}

#[test]
fn counterexample_integration_adds_every_prefix_to_s() {
    let injected = Rc::new(Cell::new(false));
    let injected_for_closure = injected.clone();
    let alphabet = SimpleAlphabet::new(['a', 'b']);
    let real = toggle_like_three_symbols();
    let oracle = FunctionOracle::new(
        alphabet,
        move |word: &[char]| real.clone_transform(word),
        move |hypothesis: &MealyMachine<char, u8>| {
            if !injected_for_closure.get() {
                injected_for_closure.set(true);
                return Err(vec!['a', 'b', 'a']);
            }
            automata_learning::active::bounded_equivalence_search(
                hypothesis,
                |word: &[char]| toggle_like_three_symbols().clone_transform(word),
                8,
            )
        },
    );

    let mut learner = LStar::new(oracle);
    learner.run(&mut LearnerOptions::default()).unwrap();

    for prefix in [vec!['a'], vec!['a', 'b'], vec!['a', 'b', 'a']] {
        assert!(
            learner.access_sequences().contains(&prefix),
            "expected {prefix:?} to have been added to S"
        );
    }
}

#[derive(Clone)]
struct ToggleLikeThreeSymbols(MealyMachine<char, u8>);

impl ToggleLikeThreeSymbols {
    fn clone_transform(&self, word: &[char]) -> Vec<u8> {
        self.0.transform(word).unwrap()
    }
}

fn toggle_like_three_symbols() -> ToggleLikeThreeSymbols {
    ToggleLikeThreeSymbols(
        MealyMachine::builder(SimpleAlphabet::new(['a', 'b']))
            .with_transitions([
                (0, 'a', 1, 1),
                (0, 'b', 0, 0),
                (1, 'a', 0, 0),
                (1, 'b', 1, 1),
            ])
            .build(0)
            .unwrap(),
    )
}
