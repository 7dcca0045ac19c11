//! ghostlog benchmarking suite
//!
//! Benchmarks for content hashing, the attachment store, configuration
//! parsing, event decoding and edit delta computation.

pub mod common;

pub use common::*;
