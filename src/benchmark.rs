use crate::config::{BenchmarkConfig, RandomMatrixConfig};
use crate::error::Result;
use crate::matrix::matrix::Matrix;
use crate::methods::method::{solve_system, MethodCounters, MethodKind};
use crate::utils::{generate_random_matrix, log_progression};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Averaged counters of every run of one method at one size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRecord {
    pub method: MethodKind,
    pub size: usize,
    pub runs: usize,
    pub average: AverageCounters,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageCounters {
    pub comparisons: f64,
    pub iterations: f64,
    pub elementary_operations: f64,
    pub back_substitution_operations: f64,
}

impl AverageCounters {
    pub fn of(runs: &[MethodCounters]) -> AverageCounters {
        if runs.is_empty() {
            return AverageCounters::default();
        }
        let total: MethodCounters = runs.iter().copied().sum();
        let n = runs.len() as f64;
        AverageCounters {
            comparisons: total.comparisons as f64 / n,
            iterations: total.iterations as f64 / n,
            elementary_operations: total.elementary_operations as f64 / n,
            back_substitution_operations: total.back_substitution_operations as f64 / n,
        }
    }
}

/// Solves `times` random systems of `size` equations with `kind`, one
/// counters entry per run. Runs are independent and spread over the rayon pool.
#[tracing::instrument(skip(generation), name = "benchmark::run_method")]
pub fn run_method(
    kind: MethodKind,
    size: usize,
    times: usize,
    generation: &RandomMatrixConfig,
) -> Result<Vec<MethodCounters>> {
    generation.validate()?;
    (0..times)
        .into_par_iter()
        .map(|_| {
            let lines = generate_random_matrix(
                size,
                size + 1,
                generation.low,
                generation.high,
                generation.precision,
            )?;
            let system = Matrix::linear_system(lines)?;
            solve_system(kind, &system).map(|(_, counters)| counters)
        })
        .collect()
}

pub fn compare_methods(config: &BenchmarkConfig) -> Result<Vec<BenchmarkRecord>> {
    config.validate()?;
    let total = config.methods.len() * config.sizes.len();
    let started = Instant::now();
    let mut records = Vec::with_capacity(total);

    for &method in &config.methods {
        for &size in &config.sizes {
            let runs = run_method(method, size, config.times_per_size, &config.generation)?;
            records.push(BenchmarkRecord {
                method,
                size,
                runs: runs.len(),
                average: AverageCounters::of(&runs),
            });
            log_progression(records.len(), total, started);
        }
    }

    Ok(records)
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_method() {
        let runs = run_method(MethodKind::Gauss, 4, 6, &RandomMatrixConfig::default()).unwrap();
        assert_eq!(runs.len(), 6);
        // 3 pivot searches scanning 3 + 2 + 1 rows
        assert!(runs.iter().all(|c| c.comparisons == 6));
        assert!(runs.iter().all(|c| c.elementary_operations > 0));
    }

    #[test]
    fn test_compare_methods() {
        let config = BenchmarkConfig {
            methods: vec![MethodKind::Gauss, MethodKind::GaussJordan],
            sizes: vec![2, 3],
            times_per_size: 3,
            generation: RandomMatrixConfig::default(),
        };
        let records = compare_methods(&config).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!((records[0].method, records[0].size), (MethodKind::Gauss, 2));
        assert_eq!((records[3].method, records[3].size), (MethodKind::GaussJordan, 3));
        assert!(records.iter().all(|r| r.runs == 3));

        // Gauss-Jordan also clears the rows above each pivot
        assert!(records[3].average.iterations > records[1].average.iterations);
    }

    #[test]
    fn test_average() {
        let a = MethodCounters {
            comparisons: 2,
            iterations: 4,
            elementary_operations: 1,
            back_substitution_operations: 0,
        };
        let b = MethodCounters::default();
        let average = AverageCounters::of(&[a, b]);
        assert_eq!(average.comparisons, 1.0);
        assert_eq!(average.iterations, 2.0);
        assert_eq!(AverageCounters::of(&[]), AverageCounters::default());
    }
}
