pub mod maps;
pub mod problem;

pub use problem::{ExportRow, ProblemRecord, ProblemRef, SolveOutcome, SolveResult};
