//! Process execution helpers

pub mod subprocess;
