//! Error types for the TSP solver.
//!
//! Every fallible operation returns `TspResult<T>`. Input and feasibility
//! errors end a single solve; `DeadEnd` is only ever produced and consumed
//! inside the ant colony construction loop.

use thiserror::Error;

/// Result type alias for solver operations.
pub type TspResult<T> = Result<T, TspError>;

#[derive(Debug, Error)]
pub enum TspError {
    /// Rejected before any search starts (too few cities, bad shape, bad values).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Engine configuration out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No closed tour exists, or none could be found, because a required edge is absent.
    #[error("no feasible tour: {0}")]
    Infeasible(String),

    /// An ant reached a city with no reachable unvisited neighbour.
    #[error("ant stuck at city {city} after visiting {visited} cities")]
    DeadEnd {
        /// City where construction stopped.
        city: usize,
        /// Number of cities on the partial tour.
        visited: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

impl TspError {
    /// Whether this error means "no tour" rather than "bad request".
    pub fn is_infeasible(&self) -> bool {
        matches!(self, TspError::Infeasible(_) | TspError::DeadEnd { .. })
    }
}
