use automata::MealyMachine;
use automata_core::Output;
use automata_core::alphabet::Symbol;

/// Knobs shared by [`super::lstar::LStar`] and [`super::ttt::Ttt`] (spec §6).
/// None of these affect what a learner converges to, only what it reports
/// along the way.
pub struct LearnerOptions<S: Symbol, O: Output> {
    /// Logs the observation table (L*) or discrimination tree (TTT) at
    /// `info` level before every refinement step.
    pub print_observation_table: bool,
    /// Calls [`Self::on_hypothesis`] every time a new hypothesis is built,
    /// before it is sent to the oracle's equivalence query.
    pub show_intermediate: bool,
    /// Invoked with every intermediate and final hypothesis, in construction
    /// order. Useful for rendering progress or collecting a learning curve.
    pub on_hypothesis: Option<Box<dyn FnMut(&MealyMachine<S, O>)>>,
    /// Hard cap on the number of equivalence queries a `run()` call will
    /// issue before giving up, guarding against a misbehaving oracle that
    /// never returns `Ok(())` (spec §7: "a learner must not loop forever").
    pub max_equivalence_queries: usize,
    /// Opaque configuration forwarded to a renderer (spec §6). No renderer
    /// lives in this workspace (Mealy machine rendering is out of scope per
    /// spec §1), so this is never read by the learners themselves — it only
    /// exists so a caller wiring a renderer on top of this crate has
    /// somewhere to put its options without the learner needing to know
    /// their shape.
    pub render_options: Option<serde_json::Value>,
}

impl<S: Symbol, O: Output> Default for LearnerOptions<S, O> {
    fn default() -> Self {
        Self {
            print_observation_table: false,
            show_intermediate: false,
            on_hypothesis: None,
            max_equivalence_queries: 10_000,
            render_options: None,
        }
    }
}

impl<S: Symbol, O: Output> LearnerOptions<S, O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_print_observation_table(mut self, value: bool) -> Self {
        self.print_observation_table = value;
        self
    }

    pub fn with_show_intermediate(mut self, value: bool) -> Self {
        self.show_intermediate = value;
        self
    }

    pub fn with_max_equivalence_queries(mut self, value: usize) -> Self {
        self.max_equivalence_queries = value;
        self
    }

    pub fn with_render_options(mut self, value: serde_json::Value) -> Self {
        self.render_options = Some(value);
        self
    }

    pub(crate) fn report_hypothesis(&mut self, hypothesis: &MealyMachine<S, O>) {
        if let Some(callback) = self.on_hypothesis.as_mut() {
            callback(hypothesis);
        }
    }
}
