//! Heuristics module for the TSP.
//!
//! This module exports the construction heuristic and the ant colony metaheuristic.

pub mod construction;
pub mod aco;

pub use construction::*;
pub use aco::*;
