//! Batch harness for running the solvers over many instances.
//!
//! Every (instance, engine) pair becomes a self-contained task owning its own
//! copy of the matrix. Tasks run on a rayon thread pool and report back over
//! a channel; the harness only collects raw per-run records.

use crate::error::{TspError, TspResult};
use crate::exact::{BnBConfig, BranchAndBoundSolver};
use crate::heuristics::aco::{ACOConfig, AntColonyOptimization};
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::instance::DistanceMatrix;
use crate::solution::Solution;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Instant;

/// Solver engines the harness can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    BranchAndBound,
    AntColony,
    Greedy,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::BranchAndBound => "BnB-DFS",
            Engine::AntColony => "ACO",
            Engine::Greedy => "NearestNeighbor",
        }
    }
}

/// Result of running a single engine on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Instance name
    pub instance: String,
    /// Algorithm name
    pub algorithm: String,
    /// Number of cities
    pub dimension: usize,
    /// Tour length, `None` when no tour was found
    pub tour_length: Option<f64>,
    /// Wall-clock solve time in seconds
    pub wall_time_seconds: f64,
    /// Whether the engine returned a closed tour
    pub feasible: bool,
    /// Closed tour, empty when no tour was found
    pub tour: Vec<usize>,
    /// Failure reason for runs without a tour
    pub error: Option<String>,
}

/// Batch configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Worker threads, 0 lets rayon pick
    pub threads: usize,
    /// Engines to run on every instance
    pub engines: Vec<Engine>,
    pub aco: ACOConfig,
    pub bnb: BnBConfig,
    /// Show a progress bar while collecting results
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            threads: 0,
            engines: vec![Engine::AntColony, Engine::BranchAndBound],
            aco: ACOConfig::default(),
            bnb: BnBConfig::default(),
            show_progress: false,
        }
    }
}

/// One unit of work: an engine and the matrix it owns
#[derive(Debug, Clone)]
pub struct SolveTask {
    pub matrix: DistanceMatrix,
    pub engine: Engine,
}

impl SolveTask {
    pub fn run(&self, config: &BatchConfig) -> RunRecord {
        let start = Instant::now();
        let outcome = solve_with(&self.matrix, self.engine, config);
        let elapsed = start.elapsed().as_secs_f64();

        let (tour_length, tour, error) = match outcome {
            Ok(solution) => (Some(solution.cost), solution.tour, None),
            Err(e) => {
                log::warn!("{} on {} failed: {}", self.engine.name(), self.matrix.name, e);
                (None, Vec::new(), Some(e.to_string()))
            }
        };

        RunRecord {
            instance: self.matrix.name.clone(),
            algorithm: self.engine.name().to_string(),
            dimension: self.matrix.dimension,
            feasible: tour_length.is_some(),
            tour_length,
            wall_time_seconds: elapsed,
            tour,
            error,
        }
    }
}

/// Run one engine on one matrix
pub fn solve_with(matrix: &DistanceMatrix, engine: Engine, config: &BatchConfig) -> TspResult<Solution> {
    match engine {
        Engine::BranchAndBound => {
            BranchAndBoundSolver::with_config(matrix.dimension, matrix, config.bnb.clone())?
                .solve()
                .map(|result| result.solution)
        }
        Engine::AntColony => AntColonyOptimization::new(matrix, config.aco.clone())?.run(),
        Engine::Greedy => NearestNeighborHeuristic::new().construct(matrix),
    }
}

/// Batch engine
pub struct Benchmark {
    config: Arc<BatchConfig>,
    results: Vec<RunRecord>,
}

impl Benchmark {
    pub fn new(config: BatchConfig) -> Self {
        Benchmark {
            config: Arc::new(config),
            results: Vec::new(),
        }
    }

    /// Fan every configured engine out over the instances and collect the records
    pub fn run_on_instances(&mut self, instances: &[DistanceMatrix]) -> TspResult<()> {
        let tasks: Vec<SolveTask> = instances
            .iter()
            .flat_map(|matrix| {
                self.config.engines.iter().map(move |&engine| SolveTask {
                    matrix: matrix.clone(),
                    engine,
                })
            })
            .collect();

        if tasks.is_empty() {
            return Ok(());
        }
        log::info!("Running {} tasks on {} instances", tasks.len(), instances.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| TspError::InvalidParameter(format!("cannot build thread pool: {}", e)))?;

        let progress = if self.config.show_progress {
            ProgressBar::new(tasks.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
            progress.set_style(style);
        }

        let (sender, receiver) = mpsc::channel();
        for task in tasks {
            let sender = sender.clone();
            let config = Arc::clone(&self.config);
            pool.spawn(move || {
                let record = task.run(&config);
                // the receiver only goes away if collection was abandoned
                let _ = sender.send(record);
            });
        }
        drop(sender);

        let mut records = Vec::new();
        for record in receiver {
            progress.set_message(format!("{} {}", record.algorithm, record.instance));
            progress.inc(1);
            records.push(record);
        }
        progress.finish_and_clear();

        records.sort_by(|a, b| {
            (a.dimension, &a.instance, &a.algorithm).cmp(&(b.dimension, &b.instance, &b.algorithm))
        });
        self.results.extend(records);

        Ok(())
    }

    /// Export results as a JSON array
    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> TspResult<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self.results).map_err(std::io::Error::from)?;
        Ok(())
    }

    /// Get all results
    pub fn results(&self) -> &[RunRecord] {
        &self.results
    }
}

/// Load every `.txt` / `.out` instance in a directory, smallest first
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> TspResult<Vec<DistanceMatrix>> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_instance = path
            .extension()
            .map(|e| e == "txt" || e == "out")
            .unwrap_or(false);
        if !is_instance {
            continue;
        }
        match DistanceMatrix::from_file(&path) {
            Ok(matrix) => instances.push(matrix),
            Err(e) => log::warn!("Skipping {:?}: {}", path, e),
        }
    }

    instances.sort_by(|a, b| (a.dimension, &a.name).cmp(&(b.dimension, &b.name)));

    Ok(instances)
}
