//! Exact Branch-and-Bound depth-first search for the TSP.
//!
//! The search space is the set of permutations starting at city 0. A node
//! fixes a prefix of the tour; its lower bound is the cost of the fixed edges
//! plus, for every city that still has to leave, its cheapest outgoing edge.
//! Nodes live on an explicit stack and each owns its own permutation.

use crate::error::{TspError, TspResult};
use crate::exact::{BnBConfig, ExactResult};
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::instance::DistanceMatrix;
use crate::solution::Solution;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// How many pops between two deadline checks
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// A partial tour on the search frontier
#[derive(Debug, Clone)]
struct SearchNode {
    /// `path[..=level]` is fixed, the rest is the pool of undecided cities
    path: Vec<usize>,
    level: usize,
    /// Cost of the fixed prefix edges
    current_cost: f64,
    /// Sum of cheapest outgoing edges of the cities that still have to leave
    rest_cost: f64,
}

impl SearchNode {
    fn root(n: usize, rest_cost: f64) -> Self {
        SearchNode {
            path: (0..n).collect(),
            level: 0,
            current_cost: 0.0,
            rest_cost,
        }
    }

    #[inline]
    fn lower_bound(&self) -> f64 {
        self.current_cost + self.rest_cost
    }

    #[inline]
    fn last_city(&self) -> usize {
        self.path[self.level]
    }

    /// Fix the city at position `i` as the next stop
    fn child(&self, i: usize, current_cost: f64, rest_cost: f64) -> Self {
        let mut path = self.path.clone();
        path.swap(self.level + 1, i);
        SearchNode {
            path,
            level: self.level + 1,
            current_cost,
            rest_cost,
        }
    }
}

/// Exact solver over permutations of cities, pruned by an additive lower bound
pub struct BranchAndBoundSolver<'a> {
    n: usize,
    matrix: &'a DistanceMatrix,
    config: BnBConfig,
    min_out: Vec<f64>,
    cancelled: Arc<AtomicBool>,
}

impl<'a> BranchAndBoundSolver<'a> {
    pub fn new(n: usize, matrix: &'a DistanceMatrix) -> TspResult<Self> {
        Self::with_config(n, matrix, BnBConfig::default())
    }

    pub fn with_config(n: usize, matrix: &'a DistanceMatrix, config: BnBConfig) -> TspResult<Self> {
        if n < 2 {
            return Err(TspError::InvalidInput(format!("need at least two cities, got {}", n)));
        }
        if n != matrix.dimension {
            return Err(TspError::InvalidInput(format!(
                "city count {} does not match matrix dimension {}",
                n, matrix.dimension
            )));
        }
        if let Some(limit) = config.time_limit {
            if !(limit > 0.0) {
                return Err(TspError::InvalidParameter(format!("time limit must be positive, got {}", limit)));
            }
        }

        let min_out = (0..n)
            .map(|city| {
                matrix
                    .min_outgoing(city)
                    .ok_or_else(|| TspError::Infeasible(format!("city {} has no edges", city)))
            })
            .collect::<TspResult<Vec<f64>>>()?;

        Ok(BranchAndBoundSolver {
            n,
            matrix,
            config,
            min_out,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the search at the next frontier pop when set
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Greedy tour used as the starting incumbent, if one exists
    fn initial_incumbent(&self) -> TspResult<Option<Solution>> {
        match NearestNeighborHeuristic::new().construct(self.matrix) {
            Ok(solution) => Ok(Some(solution)),
            Err(TspError::Infeasible(reason)) => {
                log::debug!("BnB starts without incumbent: {}", reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn solve(&self) -> TspResult<ExactResult> {
        let start = Instant::now();
        let n = self.n;

        let (mut best_path, mut best_cost) = match self.initial_incumbent()? {
            Some(greedy) => (greedy.tour, greedy.cost),
            None => (Vec::new(), f64::INFINITY),
        };
        log::info!(
            "BnB on {} ({} cities), initial upper bound {:.4}",
            self.matrix.name,
            n,
            best_cost
        );

        let root = SearchNode::root(n, self.min_out.iter().sum());
        let root_bound = root.lower_bound();
        let mut stack = vec![root];

        let mut nodes_explored: u64 = 0;
        let mut nodes_pruned: u64 = 0;
        let mut stopped = false;

        while let Some(node) = stack.pop() {
            if self.should_stop(nodes_explored, &start) {
                stopped = true;
                break;
            }
            nodes_explored += 1;

            if node.level == n - 1 {
                if let Some(closing) = self.matrix.edge(node.last_city(), node.path[0]) {
                    let total = node.current_cost + closing;
                    if total < best_cost {
                        log::debug!("BnB improved incumbent {:.4} -> {:.4}", best_cost, total);
                        best_cost = total;
                        best_path = node.path.clone();
                        best_path.push(node.path[0]);
                    }
                }
                continue;
            }

            let from = node.last_city();
            let rest_cost = node.rest_cost - self.min_out[from];

            for i in node.level + 1..n {
                let Some(edge) = self.matrix.edge(from, node.path[i]) else {
                    continue;
                };
                let current_cost = node.current_cost + edge;

                // prune if L(n) >= H(n)
                if self.config.prune && current_cost + rest_cost >= best_cost {
                    nodes_pruned += 1;
                    continue;
                }
                stack.push(node.child(i, current_cost, rest_cost));
            }
        }

        if stopped {
            log::warn!("BnB stopped early after {} nodes", nodes_explored);
        }

        if best_path.is_empty() {
            return Err(TspError::Infeasible(if stopped {
                format!("search on {} stopped before any tour was found", self.matrix.name)
            } else {
                format!("{} has no Hamiltonian cycle over present edges", self.matrix.name)
            }));
        }

        let solution = Solution {
            tour: best_path,
            cost: best_cost,
            algorithm: "BnB-DFS".to_string(),
            computation_time: start.elapsed().as_secs_f64(),
            iterations: Some(nodes_explored as usize),
        };
        log::info!(
            "BnB finished: cost {:.4}, {} nodes explored, {} pruned, {:.4}s",
            solution.cost,
            nodes_explored,
            nodes_pruned,
            solution.computation_time
        );

        Ok(ExactResult {
            solution,
            lower_bound: root_bound,
            optimal: !stopped,
            status: if stopped { "Stopped" } else { "Optimal" }.to_string(),
            nodes_explored,
            nodes_pruned,
        })
    }

    fn should_stop(&self, nodes_explored: u64, start: &Instant) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        match self.config.time_limit {
            Some(limit) if nodes_explored % DEADLINE_CHECK_INTERVAL == 0 => {
                start.elapsed().as_secs_f64() >= limit
            }
            _ => false,
        }
    }
}

/// Solve exactly with default settings.
pub fn solve_bnb(n: usize, matrix: &DistanceMatrix) -> TspResult<(Vec<usize>, f64)> {
    let result = BranchAndBoundSolver::new(n, matrix)?.solve()?;
    Ok(result.solution.into_pair())
}
