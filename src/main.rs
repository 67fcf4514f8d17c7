//! TSP Solver - Command Line Interface
//!
//! Exact Branch-and-Bound and Ant Colony Optimization for the symmetric TSP.

use clap::{Args, Parser, Subcommand, ValueEnum};
use tsp_solver::benchmark::{load_instances_from_dir, BatchConfig, Benchmark, Engine};
use tsp_solver::exact::{BnBConfig, BranchAndBoundSolver};
use tsp_solver::heuristics::aco::{ACOConfig, AntColonyOptimization};
use tsp_solver::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use tsp_solver::instance::DistanceMatrix;
use tsp_solver::solution::Solution;
use tsp_solver::{TspError, TspResult};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "tsp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Branch-and-Bound and Ant Colony solvers for the symmetric TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "all")]
        algorithm: Algorithm,

        #[command(flatten)]
        aco: AcoArgs,

        /// Time limit in seconds for each engine
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Output solutions to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate a random instance with normally distributed distances
    Generate {
        /// Number of cities
        #[arg(short = 'n', long)]
        cities: usize,

        #[arg(short, long, default_value = "10.0")]
        mean: f64,

        #[arg(long, default_value = "3.0")]
        sigma: f64,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output instance file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run engines on every instance of a directory in parallel
    Batch {
        /// Directory containing instance files (.txt or .out)
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(short, long, value_enum, default_value = "all")]
        algorithm: Algorithm,

        #[command(flatten)]
        aco: AcoArgs,

        /// Worker threads (0 = one per core)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Time limit in seconds for each run
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Output JSON file for the run records
        #[arg(short, long, default_value = "results.json")]
        output: PathBuf,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

#[derive(Args, Clone)]
struct AcoArgs {
    /// Ants per iteration
    #[arg(long, default_value = "10")]
    ants: usize,

    /// ACO iterations
    #[arg(long, default_value = "100")]
    iterations: usize,

    /// Pheromone evaporation rate, in (0, 1)
    #[arg(long, default_value = "0.1")]
    decay: f64,

    /// Pheromone importance
    #[arg(long, default_value = "1.0")]
    alpha: f64,

    /// Distance importance
    #[arg(long, default_value = "2.0")]
    beta: f64,

    /// Random seed
    #[arg(short, long, default_value = "42")]
    seed: u64,
}

impl AcoArgs {
    fn to_config(&self, time_limit: Option<f64>) -> ACOConfig {
        ACOConfig {
            num_ants: self.ants,
            max_iterations: self.iterations,
            evaporation_rate: self.decay,
            alpha: self.alpha,
            beta: self.beta,
            seed: self.seed,
            time_limit,
            ..Default::default()
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Exact Branch-and-Bound depth-first search
    Bnb,
    /// Ant Colony Optimization
    Aco,
    /// Nearest Neighbor construction
    Greedy,
    /// BnB and ACO
    All,
}

impl Algorithm {
    fn engines(self) -> Vec<Engine> {
        match self {
            Algorithm::Bnb => vec![Engine::BranchAndBound],
            Algorithm::Aco => vec![Engine::AntColony],
            Algorithm::Greedy => vec![Engine::Greedy],
            Algorithm::All => vec![Engine::BranchAndBound, Engine::AntColony],
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve { instance, algorithm, aco, time_limit, output, verbose } => {
            solve_instance(&instance, algorithm, &aco, time_limit, output, verbose)
        }

        Commands::Generate { cities, mean, sigma, seed, output } => {
            generate_instance(cities, mean, sigma, seed, &output)
        }

        Commands::Batch { dir, algorithm, aco, threads, time_limit, output } => {
            run_batch(&dir, algorithm, &aco, threads, time_limit, &output)
        }

        Commands::Analyze { instance } => analyze_instance(&instance),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn solve_instance(
    path: &Path,
    algorithm: Algorithm,
    aco: &AcoArgs,
    time_limit: Option<f64>,
    output: Option<PathBuf>,
    verbose: bool,
) -> TspResult<()> {
    println!("Loading instance from {:?}...", path);
    let matrix = DistanceMatrix::from_file(path)?;

    if verbose {
        println!("{}", matrix.statistics());
    }

    let mut solutions: Vec<Solution> = Vec::new();

    for engine in algorithm.engines() {
        println!("Solving with {}...", engine.name());
        let solution = match engine {
            Engine::BranchAndBound => {
                let config = BnBConfig { time_limit, ..Default::default() };
                let result = BranchAndBoundSolver::with_config(matrix.dimension, &matrix, config)?.solve()?;
                println!("Status: {}", result.status);
                println!("Root lower bound: {:.2}", result.lower_bound);
                println!("Nodes explored: {} (pruned {})", result.nodes_explored, result.nodes_pruned);
                result.solution
            }
            Engine::AntColony => AntColonyOptimization::new(&matrix, aco.to_config(time_limit))?.run()?,
            Engine::Greedy => NearestNeighborHeuristic::new().construct(&matrix)?,
        };

        println!("\n========== Results ==========");
        println!("Algorithm: {}", solution.algorithm);
        println!("Cost: {:.2}", solution.cost);
        println!("Time: {:.4}s", solution.computation_time);
        if let Some(iter) = solution.iterations {
            println!("Iterations: {}", iter);
        }
        if verbose {
            println!("Tour: {:?}", solution.tour);
        }
        println!();

        solutions.push(solution);
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&solutions).map_err(std::io::Error::from)?;
        std::fs::write(&out_path, json)?;
        println!("Solutions saved to {:?}", out_path);
    }

    Ok(())
}

fn generate_instance(cities: usize, mean: f64, sigma: f64, seed: u64, output: &Path) -> TspResult<()> {
    let matrix = DistanceMatrix::generate(cities, mean, sigma, seed)?;
    matrix.write_to_file(output)?;
    println!("Generated {} cities (mean {}, sigma {}) into {:?}", cities, mean, sigma, output);
    Ok(())
}

fn run_batch(
    dir: &Path,
    algorithm: Algorithm,
    aco: &AcoArgs,
    threads: usize,
    time_limit: Option<f64>,
    output: &Path,
) -> TspResult<()> {
    println!("Loading instances from {:?}...", dir);

    let instances = load_instances_from_dir(dir)?;
    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        return Err(TspError::InvalidInput(format!("no instances found in {:?}", dir)));
    }

    let config = BatchConfig {
        threads,
        engines: algorithm.engines(),
        aco: aco.to_config(time_limit),
        bnb: BnBConfig { time_limit, ..Default::default() },
        show_progress: true,
    };

    let mut benchmark = Benchmark::new(config);
    benchmark.run_on_instances(&instances)?;

    println!("{:<25} {:<16} {:>12} {:>10}", "Instance", "Algorithm", "Length", "Time");
    println!("{}", "-".repeat(66));
    for record in benchmark.results() {
        let length = record
            .tour_length
            .map(|l| format!("{:.2}", l))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<25} {:<16} {:>12} {:>10.4}",
            record.instance, record.algorithm, length, record.wall_time_seconds
        );
    }

    benchmark.export_to_json(output)?;
    println!("\nResults exported to {:?}", output);

    Ok(())
}

fn analyze_instance(path: &Path) -> TspResult<()> {
    let matrix = DistanceMatrix::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", matrix.statistics());

    match NearestNeighborHeuristic::new().construct(&matrix) {
        Ok(sol) => println!("Nearest Neighbor estimate: {:.2}", sol.cost),
        Err(e) => println!("Nearest Neighbor estimate: none ({})", e),
    }

    Ok(())
}
