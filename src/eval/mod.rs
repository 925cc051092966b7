//! Evaluation state: the current coordinate, savepoints and the evaluator.

mod context;
mod evaluator;
mod timings;

pub use context::{Context, Fingerprint, Savepoint};
pub use evaluator::Evaluator;
pub use timings::{TimingEntry, Timings};
