//! Solution representation for the TSP.
//!
//! A solution carries a closed tour (first city repeated at the end), its
//! cost, and metadata about the run that produced it.

use serde::{Deserialize, Serialize};

/// Represents a solution to the TSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Closed tour: `n + 1` city indices, first == last
    pub tour: Vec<usize>,
    /// Total tour length
    pub cost: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: f64::INFINITY,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Check that the tour is closed and visits every city exactly once
    pub fn is_complete(&self, dimension: usize) -> bool {
        is_closed_tour(&self.tour, dimension)
    }

    /// Consume the solution into the `(tour, cost)` pair the engine entry points return
    pub fn into_pair(self) -> (Vec<usize>, f64) {
        (self.tour, self.cost)
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}

/// Whether `tour` is a closed cycle over exactly the cities `0..dimension`.
pub fn is_closed_tour(tour: &[usize], dimension: usize) -> bool {
    if dimension == 0 || tour.len() != dimension + 1 || tour[0] != tour[dimension] {
        return false;
    }

    let mut seen = vec![false; dimension];
    for &city in &tour[..dimension] {
        if city >= dimension || seen[city] {
            return false;
        }
        seen[city] = true;
    }
    true
}
