//! Headless batch runner for the ecosim engine.
//!
//! The engine itself lives in `ecosim_core`; the data model in
//! `ecosim_data`. Both are re-exported so downstream tools only need this
//! crate.

pub mod runner;

pub use ecosim_core;
pub use ecosim_data;
