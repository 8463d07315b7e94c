//! The hypothesis data type produced by active automata learning: a
//! deterministic Mealy machine over a finite alphabet.

pub mod error;
mod mealy;

pub use error::MealyError;
pub use mealy::{MealyMachine, MealyMachineBuilder, StateId};

pub use automata_core as core;
