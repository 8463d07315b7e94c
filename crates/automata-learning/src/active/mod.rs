//! Active automata learning: a learner drives a [`Oracle`] through
//! membership and equivalence queries until it converges on a hypothesis
//! Mealy machine indistinguishable from the system under learning.

pub mod checkpoint;
pub mod lstar;
pub mod options;
pub mod oracle;
pub mod ttt;

pub use checkpoint::Checkpoint;
pub use lstar::LStar;
pub use options::LearnerOptions;
pub use oracle::{FunctionOracle, Oracle, SimulationOracle, bounded_equivalence_search};
pub use ttt::Ttt;
