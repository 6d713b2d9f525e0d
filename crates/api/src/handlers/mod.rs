pub mod generation;
pub mod journal;
