//! Ant Colony Optimization for the TSP.
//!
//! This module implements the classic Ant System: every ant builds a full
//! tour by roulette-wheel selection over `tau^alpha * eta^beta`, then the
//! pheromone field evaporates globally and each completed tour deposits
//! `q / cost` on the directed edges it traversed.

use crate::error::{TspError, TspResult};
use crate::instance::DistanceMatrix;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// ACO configuration parameters
#[derive(Debug, Clone)]
pub struct ACOConfig {
    /// Number of ants per iteration
    pub num_ants: usize,
    /// Number of iterations
    pub max_iterations: usize,
    /// Pheromone importance (alpha)
    pub alpha: f64,
    /// Heuristic importance (beta)
    pub beta: f64,
    /// Evaporation rate (decay), in (0, 1)
    pub evaporation_rate: f64,
    /// Initial pheromone level
    pub initial_pheromone: f64,
    /// Pheromone deposit factor
    pub q: f64,
    /// Fresh starts an ant gets after a dead end before it is discarded
    pub max_ant_retries: usize,
    /// Random seed
    pub seed: u64,
    /// Optional time limit in seconds, checked between iterations
    pub time_limit: Option<f64>,
}

impl Default for ACOConfig {
    fn default() -> Self {
        ACOConfig {
            num_ants: 10,
            max_iterations: 100,
            alpha: 1.0,
            beta: 2.0,
            evaporation_rate: 0.1,
            initial_pheromone: 1.0,
            q: 1.0,
            max_ant_retries: 3,
            seed: 42,
            time_limit: None,
        }
    }
}

impl ACOConfig {
    pub fn validate(&self) -> TspResult<()> {
        if self.num_ants == 0 {
            return Err(TspError::InvalidParameter("num_ants must be positive".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(TspError::InvalidParameter("max_iterations must be positive".to_string()));
        }
        if !(self.evaporation_rate > 0.0 && self.evaporation_rate < 1.0) {
            return Err(TspError::InvalidParameter(format!(
                "evaporation rate must be in (0, 1), got {}",
                self.evaporation_rate
            )));
        }
        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(TspError::InvalidParameter("alpha and beta must be finite".to_string()));
        }
        if !(self.initial_pheromone > 0.0 && self.initial_pheromone.is_finite()) {
            return Err(TspError::InvalidParameter("initial pheromone must be positive".to_string()));
        }
        if !(self.q > 0.0 && self.q.is_finite()) {
            return Err(TspError::InvalidParameter("q must be positive".to_string()));
        }
        if let Some(limit) = self.time_limit {
            if !(limit > 0.0) {
                return Err(TspError::InvalidParameter(format!("time limit must be positive, got {}", limit)));
            }
        }
        Ok(())
    }
}

/// Matrix of pheromone trails, one entry per directed edge.
#[derive(Debug, Clone)]
pub struct PheromoneField {
    trails: Vec<Vec<f64>>,
}

impl PheromoneField {
    /// An `n x n` field with every trail at 1.0
    pub fn new(n: usize) -> Self {
        Self::with_initial(n, 1.0)
    }

    pub fn with_initial(n: usize, value: f64) -> Self {
        PheromoneField {
            trails: vec![vec![value; n]; n],
        }
    }

    pub fn dimension(&self) -> usize {
        self.trails.len()
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.trails[from][to]
    }

    /// Multiply every trail by `1 - decay`. No lower floor is applied.
    pub fn evaporate(&mut self, decay: f64) {
        let keep = 1.0 - decay;
        for row in self.trails.iter_mut() {
            for trail in row.iter_mut() {
                *trail *= keep;
            }
        }
    }

    /// Add `quality` to each directed edge the tour traverses.
    ///
    /// Closed tours (`first == last`) and open tours both deposit on exactly
    /// `n` edges; only the traversed direction is reinforced.
    pub fn deposit(&mut self, tour: &[usize], quality: f64) {
        if tour.len() < 2 {
            return;
        }
        for pair in tour.windows(2) {
            self.trails[pair[0]][pair[1]] += quality;
        }
        let (first, last) = (tour[0], tour[tour.len() - 1]);
        if first != last {
            self.trails[last][first] += quality;
        }
    }

    pub fn min_trail(&self) -> f64 {
        self.trails
            .iter()
            .flat_map(|row| row.iter().cloned())
            .fold(f64::INFINITY, f64::min)
    }
}

/// Ant Colony Optimization solver
pub struct AntColonyOptimization<'a> {
    config: ACOConfig,
    matrix: &'a DistanceMatrix,
    pheromone: PheromoneField,
    /// `ln(1 / d)` per present edge
    log_heuristic: Vec<Vec<f64>>,
    best_tour: Vec<usize>,
    best_cost: f64,
    discarded_ants: usize,
    rng: ChaCha8Rng,
}

impl<'a> AntColonyOptimization<'a> {
    pub fn new(matrix: &'a DistanceMatrix, config: ACOConfig) -> TspResult<Self> {
        config.validate()?;
        let n = matrix.dimension;
        if n < 2 {
            return Err(TspError::InvalidInput(format!("need at least two cities, got {}", n)));
        }

        let pheromone = PheromoneField::with_initial(n, config.initial_pheromone);

        // Inverse distance in log space; zero-length edges count as distance 1,
        // absent edges are never read
        let mut log_heuristic = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if let Some(dist) = matrix.edge(i, j) {
                    log_heuristic[i][j] = if dist > 0.0 { -dist.ln() } else { 0.0 };
                }
            }
        }

        let rng = ChaCha8Rng::seed_from_u64(config.seed);

        Ok(AntColonyOptimization {
            config,
            matrix,
            pheromone,
            log_heuristic,
            best_tour: Vec::new(),
            best_cost: f64::INFINITY,
            discarded_ants: 0,
            rng,
        })
    }

    /// Construct a closed tour for one ant from a random start city
    fn construct_solution(&mut self) -> TspResult<Vec<usize>> {
        let n = self.matrix.dimension;
        let start = self.rng.gen_range(0..n);
        let mut tour = Vec::with_capacity(n + 1);
        tour.push(start);
        let mut visited = vec![false; n];
        visited[start] = true;

        let mut current = start;
        while tour.len() < n {
            let next = self.select_next_city(current, &visited).ok_or(TspError::DeadEnd {
                city: current,
                visited: tour.len(),
            })?;
            tour.push(next);
            visited[next] = true;
            current = next;
        }

        if !self.matrix.has_edge(current, start) {
            return Err(TspError::DeadEnd {
                city: current,
                visited: tour.len(),
            });
        }
        tour.push(start);

        Ok(tour)
    }

    /// Roulette-wheel selection over reachable unvisited cities.
    ///
    /// Weights `tau^alpha * eta^beta` are formed in log space and shifted by
    /// their maximum before exponentiation, so extreme distances or trails
    /// that decayed to zero never remove a reachable city from the wheel.
    /// Returns None only when no unvisited city is reachable.
    fn select_next_city(&mut self, current: usize, visited: &[bool]) -> Option<usize> {
        let n = self.matrix.dimension;

        let mut candidates: Vec<(usize, f64)> = Vec::new();
        for j in 0..n {
            if visited[j] || !self.matrix.has_edge(current, j) {
                continue;
            }
            let log_tau = self.pheromone.get(current, j).max(f64::MIN_POSITIVE).ln();
            let log_weight = self.config.alpha * log_tau + self.config.beta * self.log_heuristic[current][j];
            candidates.push((j, log_weight));
        }

        let max_log = candidates
            .iter()
            .map(|&(_, w)| OrderedFloat(w))
            .max()?
            .into_inner();
        for candidate in candidates.iter_mut() {
            candidate.1 = (candidate.1 - max_log).exp();
        }

        // the heaviest candidate contributes exactly 1
        let total: f64 = candidates.iter().map(|&(_, w)| w).sum();

        let r = self.rng.gen::<f64>();
        let mut cumulative = 0.0;
        for &(j, weight) in &candidates {
            cumulative += weight / total;
            if cumulative > r {
                return Some(j);
            }
        }

        // rounding can leave the cumulative sum just under r
        candidates.last().map(|&(j, _)| j)
    }

    /// Build one ant's tour, restarting from a new random city after a dead end
    fn construct_with_retries(&mut self) -> Option<(Vec<usize>, f64)> {
        for attempt in 0..=self.config.max_ant_retries {
            match self.construct_solution().and_then(|tour| {
                let cost = self.matrix.tour_cost(&tour)?;
                Ok((tour, cost))
            }) {
                Ok(result) => return Some(result),
                Err(e) => log::debug!("ACO ant attempt {} failed: {}", attempt + 1, e),
            }
        }
        None
    }

    /// Global pheromone update: evaporation, then one deposit per completed ant
    fn update_pheromone(&mut self, ant_tours: &[(Vec<usize>, f64)]) {
        self.pheromone.evaporate(self.config.evaporation_rate);

        for (tour, cost) in ant_tours {
            let quality = if *cost > 0.0 { self.config.q / cost } else { self.config.q };
            self.pheromone.deposit(tour, quality);
        }
    }

    /// Run ACO algorithm
    pub fn run(&mut self) -> TspResult<Solution> {
        let start = std::time::Instant::now();
        log::info!(
            "ACO on {} ({} cities): {} ants x {} iterations",
            self.matrix.name,
            self.matrix.dimension,
            self.config.num_ants,
            self.config.max_iterations
        );

        let mut iteration = 0;

        while iteration < self.config.max_iterations {
            if let Some(limit) = self.config.time_limit {
                if start.elapsed().as_secs_f64() >= limit {
                    log::warn!("ACO stopped by time limit after {} iterations", iteration);
                    break;
                }
            }

            let mut ant_tours = Vec::with_capacity(self.config.num_ants);
            for _ in 0..self.config.num_ants {
                match self.construct_with_retries() {
                    Some(result) => ant_tours.push(result),
                    None => self.discarded_ants += 1,
                }
            }

            // Update global best
            if let Some((tour, cost)) = ant_tours.iter().min_by_key(|(_, cost)| OrderedFloat(*cost)) {
                if *cost < self.best_cost {
                    log::debug!("ACO iteration {}: new best {:.4}", iteration, cost);
                    self.best_cost = *cost;
                    self.best_tour = tour.clone();
                }
            }

            self.update_pheromone(&ant_tours);

            iteration += 1;
        }

        if self.discarded_ants > 0 {
            log::warn!("ACO discarded {} ants that hit dead ends", self.discarded_ants);
        }

        if self.best_tour.is_empty() {
            return Err(TspError::Infeasible(format!(
                "no ant completed a tour on {} in {} iterations",
                self.matrix.name, iteration
            )));
        }

        let solution = Solution {
            tour: self.best_tour.clone(),
            cost: self.best_cost,
            algorithm: "ACO".to_string(),
            computation_time: start.elapsed().as_secs_f64(),
            iterations: Some(iteration),
        };
        log::info!("ACO finished: cost {:.4} in {:.4}s", solution.cost, solution.computation_time);

        Ok(solution)
    }

    pub fn pheromone(&self) -> &PheromoneField {
        &self.pheromone
    }

    /// Ants discarded after exhausting their retries
    pub fn discarded_ants(&self) -> usize {
        self.discarded_ants
    }
}

/// Run ACO with explicit parameters and the default seed.
pub fn solve_aco(
    matrix: &DistanceMatrix,
    num_ants: usize,
    num_iterations: usize,
    decay: f64,
    alpha: f64,
    beta: f64,
) -> TspResult<(Vec<usize>, f64)> {
    let config = ACOConfig {
        num_ants,
        max_iterations: num_iterations,
        evaporation_rate: decay,
        alpha,
        beta,
        ..Default::default()
    };
    AntColonyOptimization::new(matrix, config)?.run().map(Solution::into_pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_matrix() -> DistanceMatrix {
        DistanceMatrix::from_rows(
            "test",
            vec![
                vec![0.0, 10.0, 15.0, 20.0],
                vec![10.0, 0.0, 35.0, 25.0],
                vec![15.0, 35.0, 0.0, 30.0],
                vec![20.0, 25.0, 30.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pheromone_initialization() {
        let field = PheromoneField::new(3);
        assert_eq!(field.dimension(), 3);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(field.get(i, j), 1.0);
            }
        }
    }

    #[test]
    fn test_evaporation_decreases_but_stays_positive() {
        let mut field = PheromoneField::new(4);
        let mut previous = field.get(0, 1);
        for _ in 0..1000 {
            field.evaporate(0.5);
            let current = field.get(0, 1);
            assert!(current < previous);
            assert!(current > 0.0);
            previous = current;
        }
        assert!(field.min_trail() > 0.0);
    }

    #[test]
    fn test_deposit_touches_only_traversed_directions() {
        let mut field = PheromoneField::new(3);
        field.deposit(&[0, 1, 2, 0], 0.5);

        assert_eq!(field.get(0, 1), 1.5);
        assert_eq!(field.get(1, 2), 1.5);
        assert_eq!(field.get(2, 0), 1.5);
        assert_eq!(field.get(1, 0), 1.0);
        assert_eq!(field.get(0, 2), 1.0);

        // open tours are closed implicitly
        let mut open = PheromoneField::new(3);
        open.deposit(&[0, 1, 2], 0.5);
        assert_eq!(open.get(2, 0), 1.5);
    }

    #[test]
    fn test_aco() {
        let matrix = create_test_matrix();
        let config = ACOConfig {
            num_ants: 5,
            max_iterations: 10,
            ..Default::default()
        };

        let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
        let solution = aco.run().unwrap();

        assert!(solution.is_complete(4));
        assert_eq!(solution.iterations, Some(10));
        let recomputed = matrix.tour_cost(&solution.tour).unwrap();
        assert!((solution.cost - recomputed).abs() < 1e-9);
        assert!(aco.pheromone().min_trail() > 0.0);
    }

    #[test]
    fn test_aco_finds_optimum_on_small_instance() {
        let matrix = create_test_matrix();
        let (tour, cost) = solve_aco(&matrix, 10, 100, 0.1, 1.0, 2.0).unwrap();

        assert_eq!(tour.len(), 5);
        assert_eq!(tour[0], tour[4]);
        assert!((cost - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_aco_is_reproducible() {
        let matrix = DistanceMatrix::generate(12, 50.0, 15.0, 3).unwrap();
        let config = ACOConfig {
            max_iterations: 20,
            seed: 9,
            ..Default::default()
        };

        let a = AntColonyOptimization::new(&matrix, config.clone()).unwrap().run().unwrap();
        let b = AntColonyOptimization::new(&matrix, config).unwrap().run().unwrap();
        assert_eq!(a.tour, b.tour);
        assert_eq!(a.cost, b.cost);
    }

    #[test]
    fn test_aco_two_cities() {
        let matrix = DistanceMatrix::from_rows("pair", vec![vec![0.0, 4.0], vec![4.0, 0.0]]).unwrap();
        let (tour, cost) = solve_aco(&matrix, 3, 5, 0.1, 1.0, 2.0).unwrap();

        assert_eq!(tour.len(), 3);
        assert_eq!(tour[0], tour[2]);
        assert_ne!(tour[0], tour[1]);
        assert!((cost - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_aco_recovers_from_dead_ends() {
        // ring 0-1-2-3-0 plus chord 0-2; taking the chord first strands the ant
        let matrix = DistanceMatrix::from_rows(
            "ring",
            vec![
                vec![0.0, 1.0, 1.0, 1.0],
                vec![1.0, 0.0, 1.0, 0.0],
                vec![1.0, 1.0, 0.0, 1.0],
                vec![1.0, 0.0, 1.0, 0.0],
            ],
        )
        .unwrap();

        let config = ACOConfig {
            max_iterations: 20,
            max_ant_retries: 0,
            ..Default::default()
        };
        let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
        let solution = aco.run().unwrap();

        assert_eq!(solution.tour.len(), 5);
        assert!((solution.cost - 4.0).abs() < 1e-10);
        assert_eq!(matrix.tour_cost(&solution.tour).unwrap(), solution.cost);
        // without retries some ants take the chord and are dropped
        assert!(aco.discarded_ants() > 0);
        assert!(aco.discarded_ants() < 10 * 20);
    }

    #[test]
    fn test_aco_infeasible_instance() {
        let matrix = DistanceMatrix::from_rows(
            "path",
            vec![
                vec![0.0, 1.0, 0.0],
                vec![1.0, 0.0, 1.0],
                vec![0.0, 1.0, 0.0],
            ],
        )
        .unwrap();

        let config = ACOConfig {
            num_ants: 4,
            max_iterations: 5,
            ..Default::default()
        };
        let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
        let err = aco.run().unwrap_err();
        assert!(matches!(err, TspError::Infeasible(_)));
        assert_eq!(aco.discarded_ants(), 4 * 5);
    }

    #[test]
    fn test_aco_handles_extreme_distances() {
        for (name, d) in [("tiny", 1e-160), ("huge", 1e300)] {
            let matrix = DistanceMatrix::from_rows(
                name,
                vec![
                    vec![0.0, d, d],
                    vec![d, 0.0, d],
                    vec![d, d, 0.0],
                ],
            )
            .unwrap();

            let config = ACOConfig {
                num_ants: 5,
                max_iterations: 5,
                ..Default::default()
            };
            let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
            let solution = aco.run().unwrap();

            assert!(solution.is_complete(3));
            assert_eq!(aco.discarded_ants(), 0);
            assert!((solution.cost - 3.0 * d).abs() <= 1e-9 * 3.0 * d);
        }
    }

    #[test]
    fn test_aco_reaches_cities_with_vanished_trails() {
        // heavy decay underflows every trail to zero within a few hundred iterations
        let matrix = create_test_matrix();
        let config = ACOConfig {
            num_ants: 2,
            max_iterations: 1500,
            evaporation_rate: 0.9,
            ..Default::default()
        };
        let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
        let solution = aco.run().unwrap();

        assert!(solution.is_complete(4));
        assert_eq!(aco.discarded_ants(), 0);
    }

    #[test]
    fn test_invalid_parameters() {
        let matrix = create_test_matrix();
        for decay in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                solve_aco(&matrix, 5, 5, decay, 1.0, 2.0),
                Err(TspError::InvalidParameter(_))
            ));
        }
        assert!(matches!(
            solve_aco(&matrix, 0, 5, 0.1, 1.0, 2.0),
            Err(TspError::InvalidParameter(_))
        ));
    }
}
