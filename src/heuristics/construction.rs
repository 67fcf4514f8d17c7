use crate::error::{TspError, TspResult};
use crate::instance::DistanceMatrix;
use crate::solution::Solution;
use ordered_float::OrderedFloat;

pub trait ConstructionHeuristic {
    fn construct(&self, matrix: &DistanceMatrix) -> TspResult<Solution>;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the nearest unvisited city
/// reachable by a present edge, then returns to the start city.
/// Ties go to the lowest city index.
pub struct NearestNeighborHeuristic {
    pub start: usize,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic { start: 0 }
    }

    fn find_nearest(&self, matrix: &DistanceMatrix, current: usize, visited: &[bool]) -> Option<(usize, f64)> {
        (0..matrix.dimension)
            .filter(|&city| !visited[city])
            .filter_map(|city| matrix.edge(current, city).map(|d| (city, d)))
            .min_by_key(|&(_, d)| OrderedFloat(d))
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, matrix: &DistanceMatrix) -> TspResult<Solution> {
        let start_time = std::time::Instant::now();
        let n = matrix.dimension;
        if n < 2 {
            return Err(TspError::InvalidInput(format!("need at least two cities, got {}", n)));
        }
        if self.start >= n {
            return Err(TspError::InvalidInput(format!(
                "start city {} out of range for {} cities",
                self.start, n
            )));
        }

        let mut tour = Vec::with_capacity(n + 1);
        tour.push(self.start);
        let mut visited = vec![false; n];
        visited[self.start] = true;

        let mut current = self.start;
        let mut cost = 0.0;

        for _ in 1..n {
            let (next, distance) = self.find_nearest(matrix, current, &visited).ok_or_else(|| {
                TspError::Infeasible(format!(
                    "nearest neighbor stuck at city {} after {} cities",
                    current,
                    tour.len()
                ))
            })?;
            tour.push(next);
            visited[next] = true;
            cost += distance;
            current = next;
        }

        let closing = matrix.edge(current, self.start).ok_or_else(|| {
            TspError::Infeasible(format!("no edge back from city {} to {}", current, self.start))
        })?;
        cost += closing;
        tour.push(self.start);

        Ok(Solution {
            tour,
            cost,
            algorithm: self.name().to_string(),
            computation_time: start_time.elapsed().as_secs_f64(),
            iterations: None,
        })
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_neighbor_four_cities() {
        let m = DistanceMatrix::from_rows(
            "four",
            vec![
                vec![0.0, 10.0, 15.0, 20.0],
                vec![10.0, 0.0, 35.0, 25.0],
                vec![15.0, 35.0, 0.0, 30.0],
                vec![20.0, 25.0, 30.0, 0.0],
            ],
        )
        .unwrap();

        let sol = NearestNeighborHeuristic::new().construct(&m).unwrap();

        // 0 -> 1 (10) -> 3 (25) -> 2 (30) -> 0 (15)
        assert_eq!(sol.tour, vec![0, 1, 3, 2, 0]);
        assert!((sol.cost - 80.0).abs() < 1e-10);
        assert!(sol.is_complete(4));
        assert_eq!(sol.cost, m.tour_cost(&sol.tour).unwrap());
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let m = DistanceMatrix::from_rows(
            "ties",
            vec![
                vec![0.0, 5.0, 5.0, 5.0],
                vec![5.0, 0.0, 5.0, 5.0],
                vec![5.0, 5.0, 0.0, 5.0],
                vec![5.0, 5.0, 5.0, 0.0],
            ],
        )
        .unwrap();

        let sol = NearestNeighborHeuristic::new().construct(&m).unwrap();
        assert_eq!(sol.tour, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_two_cities() {
        let m = DistanceMatrix::from_rows("pair", vec![vec![0.0, 7.5], vec![7.5, 0.0]]).unwrap();
        let sol = NearestNeighborHeuristic::new().construct(&m).unwrap();
        assert_eq!(sol.tour, vec![0, 1, 0]);
        assert!((sol.cost - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_absent_closing_edge_is_infeasible() {
        // path graph 0 - 1 - 2, no edge between 2 and 0
        let m = DistanceMatrix::from_rows(
            "path",
            vec![
                vec![0.0, 1.0, 0.0],
                vec![1.0, 0.0, 1.0],
                vec![0.0, 1.0, 0.0],
            ],
        )
        .unwrap();

        let err = NearestNeighborHeuristic::new().construct(&m).unwrap_err();
        assert!(matches!(err, TspError::Infeasible(_)));
    }
}
