use std::collections::HashMap;

use bimap::BiMap;

use automata::{MealyMachine, StateId};
use automata_core::alphabet::{Alphabet, SimpleAlphabet};
use automata_core::math::Map;
use automata_core::word::concat;
use tracing::{debug, info, trace};

use crate::LearnerError;

use super::oracle::Oracle;
use super::options::LearnerOptions;

/// A node of the discrimination tree (spec §4.4). Inner nodes carry a
/// distinguishing suffix and branch on the *whole output word* produced by
/// that suffix (the uniform convention this learner settled on for both
/// sifting and counterexample processing — spec §9's DTree suffix-semantics
/// question, resolved in favor of the full vector since a single trailing
/// symbol is not guaranteed to separate two access sequences that a
/// multi-symbol discriminator does separate). Leaves carry a representative
/// access sequence — any word classified to the same leaf is assumed to
/// reach the same state of the SUL.
#[derive(Clone, Debug)]
enum DNode<S, O> {
    Leaf {
        access_sequence: Vec<S>,
    },
    Inner {
        discriminator: Vec<S>,
        children: Map<Vec<O>, usize>,
    },
}

/// The TTT discrimination-tree learner for Mealy machines (spec §4.4). Starts
/// from a single leaf for `ε` — the whole input space sifts to one state
/// until the first counterexample forces a split — and grows the tree one
/// split per counterexample, each split introducing the `(u, a, v)`
/// discriminator found by [`Ttt::process_counterexample`]'s breakpoint scan.
///
/// This learner rebuilds its hypothesis from the tree on every iteration of
/// [`Self::run`], rather than patching a previous hypothesis incrementally
/// via a maintained spanning tree — the classic TTT keeps the latter for
/// amortized efficiency, but sifting against the tree is already as cheap as
/// the rebuild here, and a fresh rebuild sidesteps a large amount of
/// incremental-maintenance bookkeeping for no change in what is learned.
pub struct Ttt<T: Oracle> {
    teacher: T,
    alphabet: SimpleAlphabet<T::Symbol>,
    cache: HashMap<Vec<T::Symbol>, Vec<T::Output>>,
    tree: Vec<DNode<T::Symbol, T::Output>>,
    /// The injective state-id ↔ access-sequence correspondence from the most
    /// recent [`Self::construct_hypothesis`] call.
    access_of_state: BiMap<StateId, Vec<T::Symbol>>,
}

impl<T: Oracle> Ttt<T> {
    /// Builds a learner over `teacher` with the minimal discrimination tree:
    /// a single leaf for the empty access sequence (spec §9's resolution of
    /// the initial-tree open question).
    pub fn new(teacher: T) -> Self {
        let alphabet = teacher.alphabet().clone();
        Self {
            teacher,
            alphabet,
            cache: HashMap::new(),
            tree: vec![DNode::Leaf {
                access_sequence: Vec::new(),
            }],
            access_of_state: BiMap::new(),
        }
    }

    fn symbols(&self) -> Vec<T::Symbol> {
        self.alphabet.universe().cloned().collect()
    }

    fn query(&mut self, word: &[T::Symbol]) -> Vec<T::Output> {
        if let Some(answer) = self.cache.get(word) {
            return answer.clone();
        }
        let answer = self.teacher.membership_query(word);
        self.cache.insert(word.to_vec(), answer.clone());
        answer
    }

    fn tail(&mut self, x: &[T::Symbol], e: &[T::Symbol]) -> Vec<T::Output> {
        let full = self.query(&concat(x, e));
        full[full.len() - e.len()..].to_vec()
    }

    fn leaf_access_sequence(&self, leaf: usize) -> &Vec<T::Symbol> {
        match &self.tree[leaf] {
            DNode::Leaf { access_sequence } => access_sequence,
            DNode::Inner { .. } => panic!("node {leaf} is not a leaf"),
        }
    }

    /// Classifies `word` by walking the tree from the root, branching at
    /// each inner node on the full tail output of that node's discriminator
    /// applied after `word`. If `word` produces a branch value never seen at
    /// some node, a fresh leaf is grown there on the spot — the tree only
    /// ever grows by sifting or by [`Self::split_leaf`].
    fn sift(&mut self, word: &[T::Symbol]) -> usize {
        let mut node = 0usize;
        loop {
            let (discriminator, children) = match &self.tree[node] {
                DNode::Leaf { .. } => return node,
                DNode::Inner {
                    discriminator,
                    children,
                } => (discriminator.clone(), children.clone()),
            };
            let key = self.tail(word, &discriminator);
            if let Some(&next) = children.get(&key) {
                node = next;
                continue;
            }
            let new_leaf = self.tree.len();
            trace!(?word, node, "sift grows a fresh leaf for an unseen branch");
            self.tree.push(DNode::Leaf {
                access_sequence: word.to_vec(),
            });
            if let DNode::Inner { children, .. } = &mut self.tree[node] {
                children.insert(key, new_leaf);
            }
            return new_leaf;
        }
    }

    /// Turns `leaf` into an inner node discriminated by `discriminator`,
    /// with two children: the leaf's previous access sequence under
    /// `key_old`, and `new_word` under `key_new`.
    fn split_leaf(
        &mut self,
        leaf: usize,
        discriminator: Vec<T::Symbol>,
        new_word: Vec<T::Symbol>,
        key_old: Vec<T::Output>,
        key_new: Vec<T::Output>,
    ) {
        let old_access = self.leaf_access_sequence(leaf).clone();
        let child_old = self.tree.len();
        self.tree.push(DNode::Leaf {
            access_sequence: old_access,
        });
        let child_new = self.tree.len();
        self.tree.push(DNode::Leaf {
            access_sequence: new_word,
        });

        let mut children = Map::new();
        children.insert(key_old, child_old);
        children.insert(key_new, child_new);
        self.tree[leaf] = DNode::Inner {
            discriminator,
            children,
        };
    }

    /// Constructs a hypothesis by sifting every state's one-symbol
    /// extensions, growing the state set outward from the initial state
    /// (spec §4.4). Rebuilt from scratch every call — see the type-level
    /// doc comment for why that's the right tradeoff here.
    pub fn construct_hypothesis(
        &mut self,
    ) -> Result<MealyMachine<T::Symbol, T::Output>, LearnerError<T::Symbol>> {
        let mut state_of_leaf: Map<usize, StateId> = Map::new();
        let mut access_of_state: Vec<Vec<T::Symbol>> = Vec::new();

        let initial_leaf = self.sift(&[]);
        state_of_leaf.insert(initial_leaf, 0);
        access_of_state.push(Vec::new());

        let symbols = self.symbols();
        let mut edges = Vec::new();
        let mut frontier = 0;
        while frontier < access_of_state.len() {
            let source_access = access_of_state[frontier].clone();
            for a in &symbols {
                let sa = concat(&source_access, std::slice::from_ref(a));
                let target_leaf = self.sift(&sa);
                let target = match state_of_leaf.get(&target_leaf) {
                    Some(&id) => id,
                    None => {
                        let id = access_of_state.len();
                        state_of_leaf.insert(target_leaf, id);
                        access_of_state.push(self.leaf_access_sequence(target_leaf).clone());
                        id
                    }
                };
                let output = self.tail(&source_access, std::slice::from_ref(a))[0].clone();
                edges.push((frontier, a.clone(), output, target));
            }
            frontier += 1;
        }

        let mut mm = MealyMachine::new(self.alphabet.clone());
        for _ in 1..access_of_state.len() {
            mm.add_state();
        }
        mm.set_initial(0);
        mm.reset();
        for (source, symbol, output, target) in edges {
            mm.add_edge_override(source, symbol, output, target)?;
        }

        self.access_of_state = access_of_state.into_iter().enumerate().collect();
        Ok(mm)
    }

    fn simulate(
        hypothesis: &MealyMachine<T::Symbol, T::Output>,
        word: &[T::Symbol],
    ) -> Result<StateId, LearnerError<T::Symbol>> {
        let mut state = hypothesis.initial();
        for symbol in word {
            let (next, _) =
                hypothesis
                    .edge(state, symbol)
                    .ok_or_else(|| automata::MealyError::Incomplete {
                        source: state,
                        symbol: symbol.clone(),
                    })?;
            state = next;
        }
        Ok(state)
    }

    /// The canonical access sequence of the hypothesis state reached by
    /// `prefix`, as recorded by the most recent [`Self::construct_hypothesis`]
    /// call.
    fn canonical_access(
        &self,
        hypothesis: &MealyMachine<T::Symbol, T::Output>,
        prefix: &[T::Symbol],
    ) -> Result<Vec<T::Symbol>, LearnerError<T::Symbol>> {
        let state = Self::simulate(hypothesis, prefix)?;
        Ok(self
            .access_of_state
            .get_by_left(&state)
            .cloned()
            .expect("construct_hypothesis always records every state's access sequence"))
    }

    /// Decomposes `counterexample` into `(u, a, v)` (spec §4.4) and splits
    /// the leaf of the canonical access sequence `u_old` that the
    /// counterexample's prefix `u·a` actually sifts to, using `v` as the new
    /// discriminator.
    ///
    /// The breakpoint `j` is the least index in `1..=counterexample.len()`
    /// such that replaying the canonical access of `hypothesis.run(w[..j])`
    /// followed by `w[j..]` against the SUL reproduces the hypothesis's own
    /// prediction for `w[j..]`. Index `0` never agrees (that's what makes
    /// `counterexample` a counterexample) and index `counterexample.len()`
    /// always agrees trivially (both sides are the empty word), so `j`
    /// always exists. `u = w[..j-1]`, `a = w[j-1]`, `v = w[j..]`; the new
    /// access sequence is `access(u)·a`, not the raw prefix `w[..j]`, since
    /// sifting the raw prefix is not guaranteed to land on the same leaf as
    /// the canonical access.
    ///
    /// `v` is never empty at the minimal `j`: every hypothesis edge's output
    /// is copied verbatim from a real membership query in
    /// [`Self::construct_hypothesis`], so index `counterexample.len() - 1`
    /// always agrees on its own (a one-symbol check against that same
    /// query), which caps the minimal breakpoint below `counterexample.len()`.
    pub fn process_counterexample(
        &mut self,
        hypothesis: &MealyMachine<T::Symbol, T::Output>,
        counterexample: &[T::Symbol],
    ) -> Result<(), LearnerError<T::Symbol>> {
        let hyp_full = hypothesis.transform(counterexample)?;
        let real_full = self.query(counterexample);
        if hyp_full == real_full {
            return Err(LearnerError::StaleCounterexample(counterexample.to_vec()));
        }

        let n = counterexample.len();
        let mut breakpoint = n;
        for j in 1..=n {
            let access = self.canonical_access(hypothesis, &counterexample[..j])?;
            let real_tail = self.tail(&access, &counterexample[j..]);
            if real_tail == hyp_full[j..] {
                breakpoint = j;
                break;
            }
        }

        let u = &counterexample[..breakpoint - 1];
        let a = counterexample[breakpoint - 1].clone();
        let v = counterexample[breakpoint..].to_vec();

        let alpha_before = self.canonical_access(hypothesis, u)?;
        let u_new = concat(&alpha_before, std::slice::from_ref(&a));
        let u_old = self.canonical_access(hypothesis, &counterexample[..breakpoint])?;

        let key_old = self.tail(&u_old, &v);
        let key_new = self.tail(&u_new, &v);
        debug_assert_ne!(
            key_old, key_new,
            "the breakpoint's distinguishing suffix must separate the two access sequences"
        );

        let leaf = self.sift(&u_old);
        debug!(?u_old, ?u_new, discriminator = ?v, "splitting leaf");
        self.split_leaf(leaf, v, u_new, key_old, key_new);
        Ok(())
    }

    fn render_tree(&self) -> String {
        fn go<S: std::fmt::Debug, O: std::fmt::Debug>(
            tree: &[DNode<S, O>],
            node: usize,
            depth: usize,
            out: &mut String,
        ) {
            let indent = "  ".repeat(depth);
            match &tree[node] {
                DNode::Leaf { access_sequence } => {
                    out.push_str(&format!("{indent}leaf[{node}] = {access_sequence:?}\n"));
                }
                DNode::Inner {
                    discriminator,
                    children,
                } => {
                    out.push_str(&format!("{indent}node[{node}] disc={discriminator:?}\n"));
                    for (key, child) in children {
                        out.push_str(&format!("{indent}  -{key:?}->\n"));
                        go(tree, *child, depth + 2, out);
                    }
                }
            }
        }
        let mut out = String::new();
        go(&self.tree, 0, 0, &mut out);
        out
    }

    /// Runs the learner to completion: builds a hypothesis, asks the
    /// oracle's equivalence query, and on a counterexample splits exactly
    /// one leaf before trying again.
    pub fn run(
        &mut self,
        options: &mut LearnerOptions<T::Symbol, T::Output>,
    ) -> Result<MealyMachine<T::Symbol, T::Output>, LearnerError<T::Symbol>> {
        let mut equivalence_queries = 0usize;
        loop {
            let hypothesis = self.construct_hypothesis()?;
            if options.print_observation_table {
                info!("\n{}", self.render_tree());
            }
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
                    self.process_counterexample(&hypothesis, &counterexample)?;
                }
            }
        }
    }
}
