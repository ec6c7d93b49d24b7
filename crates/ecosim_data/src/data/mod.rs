//! Core data structures for the ecosim simulation.

pub mod agent;
pub mod brain;
pub mod disease;
pub mod environment;
pub mod genome;
pub mod perception;
pub mod social;
