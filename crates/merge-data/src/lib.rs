//! Table stages of the observation merge.
//!
//! Loads the header template and the data extract, reconciles the two,
//! derives `datetime_utc`, averages per day, splits by month and writes the
//! resulting tables as CSV.

pub mod aggregator;
pub mod partition;
pub mod reader;
pub mod reconciler;
pub mod temporal;
pub mod writer;

pub use merge_core as core;
