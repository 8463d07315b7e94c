use serde::{Deserialize, Serialize};

/// A serializable snapshot of an [`super::lstar::LStar`] learner's
/// observation table: the access sequences `S`, the distinguishing suffixes
/// `E`, and every membership query answered so far. Restoring from a
/// checkpoint resumes a learner exactly where it left off without
/// re-querying the teacher for anything already known (spec §4.3's
/// "checkpointing" note, modelled on the original's pickle-based
/// persistence).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, O: Serialize",
    deserialize = "S: serde::de::DeserializeOwned, O: serde::de::DeserializeOwned"
))]
pub struct Checkpoint<S, O> {
    pub s: Vec<Vec<S>>,
    pub e: Vec<Vec<S>>,
    pub t: Vec<(Vec<S>, Vec<O>)>,
}

impl<S: PartialEq, O: PartialEq> PartialEq for Checkpoint<S, O> {
    fn eq(&self, other: &Self) -> bool {
        self.s == other.s && self.e == other.e && self.t == other.t
    }
}
