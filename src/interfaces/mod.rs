//! Batch input and output formats for the command-line checkout runner.

pub mod csv;
