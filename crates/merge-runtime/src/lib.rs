//! Runtime layer for the observation merge.
//!
//! Sequences the table stages into a single run and reports what it wrote.

pub mod pipeline;

pub use merge_core as core;
pub use merge_data as data;
