use crate::error::{Result, SolverError};
use crate::matrix::matrix::Matrix;
use crate::methods::method::MethodCounters;
use crate::utils::is_near_zero;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SolutionKind {
    Unique,
    Infinite,
    None,
    NoneOrInfinite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    Unique(Vec<f64>),
    Infinite,
    None,
    /// The inverse could not be built, the rank was not analysed further.
    NoneOrInfinite,
}

/// Serializable form of a [`Solution`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionReport {
    pub result: SolutionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Solution {
    pub fn kind(&self) -> SolutionKind {
        match self {
            Solution::Unique(_) => SolutionKind::Unique,
            Solution::Infinite => SolutionKind::Infinite,
            Solution::None => SolutionKind::None,
            Solution::NoneOrInfinite => SolutionKind::NoneOrInfinite,
        }
    }

    pub fn roots(&self) -> Option<&[f64]> {
        match self {
            Solution::Unique(roots) => Some(roots),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&'static str> {
        match self {
            Solution::Unique(_) => None,
            Solution::Infinite => Some("General solution exists"),
            Solution::None => Some("The system is inconsistent"),
            Solution::NoneOrInfinite => Some("Couldn't find inverse matrix. Cannot solve."),
        }
    }

    pub fn to_report(&self) -> SolutionReport {
        SolutionReport {
            result: self.kind(),
            roots: self.roots().map(|r| r.to_vec()),
            description: self.description().map(String::from),
        }
    }
}

/// Classifies a reduced augmented matrix by scanning its rows: a zero
/// coefficient row with a non zero right-hand side means no solution,
/// otherwise rank below the number of unknowns means infinitely many.
///
/// When the scan reports full rank while a diagonal entry is near zero (a
/// column was skipped as singular during elimination) the rows cannot be
/// trusted as echelon rows, and the ranks are recomputed on a scratch copy.
pub fn classify_echelon(matrix: &Matrix, counters: &mut MethodCounters) -> Result<SolutionKind> {
    let unknowns = matrix.cols().saturating_sub(1);
    let mut rank = 0;

    for row in 0..matrix.rows() {
        let is_zero_row = matrix.is_zero_row_coefficients(row)?;
        counters.back_substitution_operations += unknowns as u64;
        let rhs = matrix.get(row, unknowns)?;

        if is_zero_row && !is_near_zero(rhs) {
            return Ok(SolutionKind::None);
        }
        if !is_zero_row {
            rank += 1;
        }
    }

    if rank < unknowns {
        return Ok(SolutionKind::Infinite);
    }

    if (0..unknowns.min(matrix.rows())).any(|i| is_near_zero(matrix.at(i, i))) {
        tracing::warn!("singular diagonal in a full rank scan, running a rank analysis");
        counters.back_substitution_operations += (matrix.rows() * matrix.cols()) as u64;
        let profile = matrix.rank_profile();
        if profile.augmented > profile.coefficients {
            return Ok(SolutionKind::None);
        }
        if profile.coefficients < unknowns {
            return Ok(SolutionKind::Infinite);
        }
    }

    Ok(SolutionKind::Unique)
}

/// Solves an upper triangular augmented system from the last row upward.
pub fn back_substitute(matrix: &Matrix, counters: &mut MethodCounters) -> Result<Vec<f64>> {
    let n = matrix.rows();
    let rhs_col = matrix.cols().saturating_sub(1);
    let mut roots = vec![0.0; n];

    for row in (0..n).rev() {
        let mut rhs = matrix.get(row, rhs_col)?;

        for col in row + 1..rhs_col {
            rhs -= matrix.get(row, col)? * roots[col];
            counters.back_substitution_operations += 1;
        }

        let pivot = matrix.get(row, row)?;
        if is_near_zero(pivot) {
            return Err(SolverError::Degenerate { row });
        }

        roots[row] = rhs / pivot;
    }

    Ok(roots)
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(lines: Vec<Vec<f64>>) -> SolutionKind {
        let m = Matrix::from_list(lines).unwrap();
        classify_echelon(&m, &mut MethodCounters::default()).unwrap()
    }

    #[test]
    fn test_classify_echelon() {
        assert_eq!(
            classify(vec![vec![2.0, 1.0, 5.0], vec![0.0, 1.0, 1.0]]),
            SolutionKind::Unique
        );
        assert_eq!(
            classify(vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 0.0]]),
            SolutionKind::Infinite
        );
        assert_eq!(
            classify(vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 5.0]]),
            SolutionKind::None
        );
    }

    #[test]
    fn test_classify_skipped_column() {
        // column 0 is singular, row 1 was never eliminated
        assert_eq!(
            classify(vec![vec![0.0, 1.0, 1.0], vec![0.0, 2.0, 2.0]]),
            SolutionKind::Infinite
        );
        assert_eq!(
            classify(vec![vec![0.0, 1.0, 1.0], vec![0.0, 2.0, 3.0]]),
            SolutionKind::None
        );
    }

    #[test]
    fn test_back_substitute() {
        let m = Matrix::from_list(vec![vec![2.0, 1.0, 5.0], vec![0.0, 1.0, 1.0]]).unwrap();
        let mut counters = MethodCounters::default();
        assert_eq!(back_substitute(&m, &mut counters).unwrap(), vec![2.0, 1.0]);
        assert_eq!(counters.back_substitution_operations, 1);

        let singular = Matrix::from_list(vec![vec![2.0, 1.0, 5.0], vec![0.0, 0.0, 1.0]]).unwrap();
        assert_eq!(
            back_substitute(&singular, &mut counters),
            Err(SolverError::Degenerate { row: 1 })
        );
    }

    #[test]
    fn test_report() {
        let report = Solution::Unique(vec![1.0, 2.0]).to_report();
        assert_eq!(report.result, SolutionKind::Unique);
        assert_eq!(report.roots, Some(vec![1.0, 2.0]));
        assert_eq!(
            serde_json::to_string(&Solution::Infinite.to_report()).unwrap(),
            r#"{"result":"Infinite","description":"General solution exists"}"#
        );
    }
}
