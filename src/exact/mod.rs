//! Exact solvers module.

mod branch_and_bound;

pub use branch_and_bound::*;

use crate::solution::Solution;

#[derive(Debug, Clone)]
pub struct BnBConfig {
    /// Time limit in seconds; the best tour so far is returned when it expires
    pub time_limit: Option<f64>,
    /// Discard children whose lower bound cannot beat the incumbent
    pub prune: bool,
}

impl Default for BnBConfig {
    fn default() -> Self {
        BnBConfig { time_limit: None, prune: true }
    }
}

#[derive(Debug, Clone)]
pub struct ExactResult {
    pub solution: Solution,
    /// Lower bound at the root of the search tree
    pub lower_bound: f64,
    /// False when the search was cancelled or hit its time limit
    pub optimal: bool,
    pub status: String,
    pub nodes_explored: u64,
    pub nodes_pruned: u64,
}
