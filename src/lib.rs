//! TSP Solver Library
//!
//! Solves the symmetric Traveling Salesman Problem on dense distance matrices.
//!
//! # Features
//!
//! - Exact Branch-and-Bound depth-first search with an additive lower bound
//! - Ant Colony Optimization with a seeded, reproducible random source
//! - Nearest Neighbor construction (also the initial bound for the exact search)
//! - Matrix loading, writing and random generation
//! - Batch harness running many instances over a thread pool
//!
//! # Example
//!
//! ```no_run
//! use tsp_solver::instance::DistanceMatrix;
//! use tsp_solver::exact::solve_bnb;
//! use tsp_solver::heuristics::aco::solve_aco;
//!
//! let matrix = DistanceMatrix::from_file("instance.txt").unwrap();
//!
//! let (tour, cost) = solve_bnb(matrix.dimension, &matrix).unwrap();
//! println!("BnB: {:?} ({:.2})", tour, cost);
//!
//! let (tour, cost) = solve_aco(&matrix, 10, 100, 0.1, 1.0, 2.0).unwrap();
//! println!("ACO: {:?} ({:.2})", tour, cost);
//! ```

pub mod error;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod exact;
pub mod benchmark;

pub use error::{TspError, TspResult};
pub use instance::DistanceMatrix;
pub use solution::Solution;
