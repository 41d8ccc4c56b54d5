//! Core types for the observation merge pipeline.
//!
//! Holds the table model, column-label normalisation, the column-role
//! schema, UTC time helpers, configuration and the error taxonomy. Nothing
//! in this crate touches the filesystem except settings persistence.

pub mod columns;
pub mod error;
pub mod schema;
pub mod settings;
pub mod table;
pub mod time_utils;
