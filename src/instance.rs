//! Module for loading, generating and representing TSP instances.
//!
//! An instance is a dense, symmetric distance matrix. The file format is the
//! plain one used by the instance generator: the first token is the number of
//! cities `n`, followed by `n * n` whitespace-delimited distances.
//!
//! Edge presence is tagged explicitly. In raw input an off-diagonal value of
//! exactly `0` means "no edge"; internally that becomes `None`, so a missing
//! edge can never be mistaken for a free one.

use crate::error::{TspError, TspResult};
use rand::distributions::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const SYMMETRY_TOLERANCE: f64 = 1e-9;
const MAX_RESAMPLES: usize = 10_000;

/// Dense symmetric distance matrix with explicit absent edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    /// Name of the instance (file stem for loaded instances)
    pub name: String,
    /// Number of cities
    pub dimension: usize,
    /// Row-major edge weights, `None` for absent edges and the diagonal
    edges: Vec<Option<f64>>,
}

impl DistanceMatrix {
    /// Build a matrix from tagged rows. The diagonal is ignored.
    pub fn from_edges(name: &str, rows: Vec<Vec<Option<f64>>>) -> TspResult<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(TspError::InvalidInput(format!(
                "need at least two cities, got {}",
                n
            )));
        }

        let mut edges = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(TspError::InvalidInput(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            for (j, value) in row.into_iter().enumerate() {
                if i == j {
                    edges.push(None);
                    continue;
                }
                if let Some(d) = value {
                    if !d.is_finite() || d < 0.0 {
                        return Err(TspError::InvalidInput(format!(
                            "distance ({}, {}) = {} is not a finite non-negative number",
                            i, j, d
                        )));
                    }
                }
                edges.push(value);
            }
        }

        let matrix = DistanceMatrix {
            name: name.to_string(),
            dimension: n,
            edges,
        };
        matrix.check_symmetry()?;
        Ok(matrix)
    }

    /// Build a matrix from raw distances, where an off-diagonal `0` means "no edge".
    pub fn from_rows(name: &str, rows: Vec<Vec<f64>>) -> TspResult<Self> {
        let tagged = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|d| if d == 0.0 { None } else { Some(d) })
                    .collect()
            })
            .collect();
        Self::from_edges(name, tagged)
    }

    /// Parse an instance from a file in the `n` + matrix format
    pub fn from_file<P: AsRef<Path>>(path: P) -> TspResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::parse(&name, &content)
    }

    /// Parse an instance from text: `n` followed by `n * n` distances.
    pub fn parse(name: &str, content: &str) -> TspResult<Self> {
        let mut tokens = content.split_whitespace();

        let n: usize = tokens
            .next()
            .ok_or_else(|| TspError::Parse("empty instance".to_string()))?
            .parse()
            .map_err(|_| TspError::Parse("first token must be the number of cities".to_string()))?;

        let values = tokens
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| TspError::Parse(format!("invalid distance '{}'", t)))
            })
            .collect::<TspResult<Vec<f64>>>()?;

        let expected = n
            .checked_mul(n)
            .ok_or_else(|| TspError::InvalidInput(format!("dimension {} is too large", n)))?;
        if values.len() != expected {
            return Err(TspError::InvalidInput(format!(
                "expected {}x{} = {} distances, found {}",
                n,
                n,
                expected,
                values.len()
            )));
        }

        let rows = values.chunks(n.max(1)).map(|row| row.to_vec()).collect();
        Self::from_rows(name, rows)
    }

    /// Write the instance in the same format `from_file` reads. Absent edges become `0`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> TspResult<()> {
        fs::write(path, self.to_text()?)?;
        Ok(())
    }

    /// Render the instance as text.
    ///
    /// The format writes absent edges as `0`, so a present zero-length edge
    /// cannot be expressed and is rejected as `InvalidInput`.
    pub fn to_text(&self) -> TspResult<String> {
        let n = self.dimension;
        let mut out = String::new();
        let _ = writeln!(out, "{}", n);
        for i in 0..n {
            let mut row = Vec::with_capacity(n);
            for j in 0..n {
                let value = match self.edge(i, j) {
                    Some(d) if d == 0.0 => {
                        return Err(TspError::InvalidInput(format!(
                            "zero-length edge ({}, {}) would be read back as absent",
                            i, j
                        )))
                    }
                    Some(d) => d,
                    None => 0.0,
                };
                row.push(value.to_string());
            }
            let _ = writeln!(out, "{}", row.join(" "));
        }
        Ok(out)
    }

    /// Generate a complete symmetric instance with normally distributed distances.
    ///
    /// Non-positive draws are resampled, so every off-diagonal edge is present.
    pub fn generate(n: usize, mean: f64, sigma: f64, seed: u64) -> TspResult<Self> {
        if n < 2 {
            return Err(TspError::InvalidInput(format!(
                "need at least two cities, got {}",
                n
            )));
        }
        let normal = Normal::new(mean, sigma)
            .map_err(|e| TspError::InvalidParameter(format!("normal({}, {}): {}", mean, sigma, e)))?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut edges = vec![None; n * n];
        for i in 0..n {
            for j in i + 1..n {
                let mut distance = normal.sample(&mut rng);
                let mut attempts = 1;
                while distance <= 0.0 {
                    if attempts >= MAX_RESAMPLES {
                        return Err(TspError::InvalidParameter(format!(
                            "normal({}, {}) keeps producing non-positive distances",
                            mean, sigma
                        )));
                    }
                    distance = normal.sample(&mut rng);
                    attempts += 1;
                }
                edges[i * n + j] = Some(distance);
                edges[j * n + i] = Some(distance);
            }
        }

        Ok(DistanceMatrix {
            name: format!("{}_{}_{}", n, mean, sigma),
            dimension: n,
            edges,
        })
    }

    fn check_symmetry(&self) -> TspResult<()> {
        let n = self.dimension;
        for i in 0..n {
            for j in i + 1..n {
                let symmetric = match (self.edge(i, j), self.edge(j, i)) {
                    (None, None) => true,
                    (Some(a), Some(b)) => (a - b).abs() <= SYMMETRY_TOLERANCE * a.abs().max(1.0),
                    _ => false,
                };
                if !symmetric {
                    return Err(TspError::InvalidInput(format!(
                        "matrix is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }
        Ok(())
    }

    /// Weight of edge `(i, j)`, `None` if absent
    #[inline]
    pub fn edge(&self, i: usize, j: usize) -> Option<f64> {
        self.edges[i * self.dimension + j]
    }

    #[inline]
    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.edge(i, j).is_some()
    }

    /// Cheapest present outgoing edge of a city
    pub fn min_outgoing(&self, city: usize) -> Option<f64> {
        (0..self.dimension)
            .filter_map(|j| self.edge(city, j))
            .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))))
    }

    /// Total cost of a tour.
    ///
    /// Accepts closed tours (`first == last`) and open ones; an open tour is
    /// closed implicitly. Fails if any traversed edge is absent.
    pub fn tour_cost(&self, tour: &[usize]) -> TspResult<f64> {
        if let Some(&city) = tour.iter().find(|&&c| c >= self.dimension) {
            return Err(TspError::InvalidInput(format!(
                "city {} out of range for {} cities",
                city, self.dimension
            )));
        }
        if tour.len() < 2 {
            return Ok(0.0);
        }

        let mut cost = 0.0;
        for pair in tour.windows(2) {
            cost += self.traverse(pair[0], pair[1])?;
        }

        let (first, last) = (tour[0], tour[tour.len() - 1]);
        if first != last {
            cost += self.traverse(last, first)?;
        }

        Ok(cost)
    }

    fn traverse(&self, from: usize, to: usize) -> TspResult<f64> {
        self.edge(from, to)
            .ok_or_else(|| TspError::Infeasible(format!("edge ({}, {}) is absent", from, to)))
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> MatrixStatistics {
        let n = self.dimension;
        let mut distances = Vec::new();
        let mut absent_edges = 0;
        for i in 0..n {
            for j in i + 1..n {
                match self.edge(i, j) {
                    Some(d) => distances.push(d),
                    None => absent_edges += 1,
                }
            }
        }

        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let min_distance = distances.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        MatrixStatistics {
            name: self.name.clone(),
            dimension: n,
            present_edges: distances.len(),
            absent_edges,
            avg_distance,
            min_distance,
            max_distance,
        }
    }
}

/// Statistics about a distance matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixStatistics {
    pub name: String,
    pub dimension: usize,
    pub present_edges: usize,
    pub absent_edges: usize,
    pub avg_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for MatrixStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(f, "  Edges: {} present, {} absent", self.present_edges, self.absent_edges)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_cities() -> DistanceMatrix {
        DistanceMatrix::from_rows(
            "four",
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
    fn test_zero_is_absent_edge() {
        let m = DistanceMatrix::from_rows(
            "sparse",
            vec![
                vec![0.0, 1.0, 0.0],
                vec![1.0, 0.0, 2.0],
                vec![0.0, 2.0, 0.0],
            ],
        )
        .unwrap();

        assert_eq!(m.edge(0, 1), Some(1.0));
        assert_eq!(m.edge(0, 2), None);
        assert_eq!(m.edge(1, 1), None);
        assert_eq!(m.min_outgoing(1), Some(1.0));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            DistanceMatrix::from_rows("one", vec![vec![0.0]]),
            Err(TspError::InvalidInput(_))
        ));
        assert!(matches!(
            DistanceMatrix::from_rows("ragged", vec![vec![0.0, 1.0], vec![1.0]]),
            Err(TspError::InvalidInput(_))
        ));
        assert!(matches!(
            DistanceMatrix::from_rows("negative", vec![vec![0.0, -1.0], vec![-1.0, 0.0]]),
            Err(TspError::InvalidInput(_))
        ));
        assert!(matches!(
            DistanceMatrix::from_rows("asymmetric", vec![vec![0.0, 1.0], vec![2.0, 0.0]]),
            Err(TspError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tour_cost() {
        let m = four_cities();
        let closed = m.tour_cost(&[0, 1, 3, 2, 0]).unwrap();
        let open = m.tour_cost(&[0, 1, 3, 2]).unwrap();

        assert!((closed - 80.0).abs() < 1e-10);
        assert!((open - 80.0).abs() < 1e-10);
        assert_eq!(m.tour_cost(&[0, 1, 3, 2, 0]).unwrap(), closed);
    }

    #[test]
    fn test_tour_cost_absent_edge() {
        let m = DistanceMatrix::from_rows(
            "sparse",
            vec![
                vec![0.0, 1.0, 0.0],
                vec![1.0, 0.0, 2.0],
                vec![0.0, 2.0, 0.0],
            ],
        )
        .unwrap();

        assert!(matches!(m.tour_cost(&[0, 1, 2, 0]), Err(TspError::Infeasible(_))));
        assert!(matches!(m.tour_cost(&[0, 5]), Err(TspError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_and_text_round_trip() {
        let m = four_cities();
        let parsed = DistanceMatrix::parse("four", &m.to_text().unwrap()).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn test_zero_length_edge_is_not_written() {
        let m = DistanceMatrix::from_edges(
            "free",
            vec![
                vec![None, Some(0.0), Some(2.0)],
                vec![Some(0.0), None, Some(3.0)],
                vec![Some(2.0), Some(3.0), None],
            ],
        )
        .unwrap();
        assert!(matches!(m.to_text(), Err(TspError::InvalidInput(_))));

        let path = std::env::temp_dir().join(format!("tsp_solver_zero_edge_{}.txt", std::process::id()));
        assert!(matches!(m.write_to_file(&path), Err(TspError::InvalidInput(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_parse_malformed_dimension() {
        let err = DistanceMatrix::parse("bad", "3\n0 1 2\n1 0 3\n").unwrap_err();
        assert!(matches!(err, TspError::InvalidInput(_)));

        let err = DistanceMatrix::parse("bad", "three\n0 1\n1 0\n").unwrap_err();
        assert!(matches!(err, TspError::Parse(_)));

        for huge in ["4294967296".to_string(), usize::MAX.to_string()] {
            let err = DistanceMatrix::parse("bad", &format!("{}\n1 2", huge)).unwrap_err();
            assert!(matches!(err, TspError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_file_round_trip() {
        let m = DistanceMatrix::generate(6, 10.0, 3.0, 7).unwrap();
        let path = std::env::temp_dir().join(format!("tsp_solver_round_trip_{}.txt", std::process::id()));

        m.write_to_file(&path).unwrap();
        let loaded = DistanceMatrix::from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.dimension, 6);
        for i in 0..6 {
            for j in 0..6 {
                assert_eq!(loaded.edge(i, j), m.edge(i, j));
            }
        }
    }

    #[test]
    fn test_generate_is_complete_and_symmetric() {
        let m = DistanceMatrix::generate(8, 0.0, 10.0, 42).unwrap();
        for i in 0..8 {
            assert_eq!(m.edge(i, i), None);
            for j in 0..8 {
                if i != j {
                    let d = m.edge(i, j).unwrap();
                    assert!(d > 0.0);
                    assert_eq!(m.edge(j, i), Some(d));
                }
            }
        }

        let again = DistanceMatrix::generate(8, 0.0, 10.0, 42).unwrap();
        assert_eq!(m, again);
    }

    #[test]
    fn test_statistics() {
        let stats = four_cities().statistics();
        assert_eq!(stats.present_edges, 6);
        assert_eq!(stats.absent_edges, 0);
        assert!((stats.min_distance - 10.0).abs() < 1e-10);
        assert!((stats.max_distance - 35.0).abs() < 1e-10);
    }
}
