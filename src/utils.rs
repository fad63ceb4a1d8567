use crate::error::{Result, SolverError};
use rand::Rng;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// six digits after the dot, below that a value is treated as zero
pub const EPSILON: f64 = 1e-6;

#[inline(always)]
pub fn is_near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

pub fn round_to_precision(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    // avoid "-0" in generated input
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn generate_random_matrix(
    rows: usize,
    cols: usize,
    low: f64,
    high: f64,
    precision: u32,
) -> Result<Vec<Vec<f64>>> {
    generate_random_matrix_with(&mut rand::thread_rng(), rows, cols, low, high, precision)
}

/// Same as [`generate_random_matrix`], with a caller provided generator.
pub fn generate_random_matrix_with<R: Rng + ?Sized>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    low: f64,
    high: f64,
    precision: u32,
) -> Result<Vec<Vec<f64>>> {
    if rows == 0 || cols == 0 {
        return Err(SolverError::InvalidDimensions(format!(
            "cannot generate a {}x{} matrix",
            rows, cols
        )));
    }
    if !(low < high) {
        return Err(SolverError::InvalidRange { low, high });
    }

    Ok((0..rows)
        .map(|_| {
            (0..cols)
                .map(|_| round_to_precision(rng.gen_range(low..high), precision))
                .collect()
        })
        .collect())
}

/// Install a fmt subscriber for hosts that don't bring their own.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).map_err(|e| SolverError::Config(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| SolverError::Config(e.to_string()))
}

// show the progression of a long benchmark
#[inline(always)]
pub fn log_progression(done: usize, total: usize, started: Instant) {
    if done == 0 || total == 0 {
        return;
    }
    let percent = (done * 100) / total;
    let elapsed = started.elapsed().as_millis();
    let remaining = (elapsed * (total - done) as u128) / done as u128;

    tracing::info!(
        "Progression {}% - {}ms elapsed - ~{}ms left - {} / {}",
        percent,
        elapsed,
        remaining,
        done,
        total
    );
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------
