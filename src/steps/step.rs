use crate::error::{Result, SolverError};
use crate::matrix::matrix::Matrix;
use crate::utils::is_near_zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepKind {
    Swap,
    Scale,
    Eliminate,
}

/// What a step exposes outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMetadata {
    pub kind: StepKind,
    pub source_row: usize,
    pub target_row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
}

impl fmt::Display for StepMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StepKind::Swap => write!(
                f,
                "Swapping rows {} and {}",
                self.source_row, self.target_row
            ),
            StepKind::Scale => match self.multiplier {
                Some(pivot) => write!(f, "Scaling row {} by a factor of {}", self.source_row, pivot),
                None => write!(f, "Scaling row {}", self.source_row),
            },
            StepKind::Eliminate => write!(
                f,
                "Eliminating row {} using row {}",
                self.target_row, self.source_row
            ),
        }
    }
}

/// A reversible elementary row operation.
///
/// Scale and Eliminate are created unrecorded (`None` factor). The first
/// [`Step::perform`] reads the factor off the matrix and fixes it, every later
/// perform, mirror or revert replays that recorded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Swap {
        source_row: usize,
        target_row: usize,
    },
    /// Divides `row` by `pivot`, the value found at `(row, row)`.
    Scale {
        row: usize,
        start_col: usize,
        pivot: Option<f64>,
    },
    /// Adds `multiplier * source_row` to `target_row`.
    Eliminate {
        source_row: usize,
        target_row: usize,
        start_col: usize,
        multiplier: Option<f64>,
    },
}

impl Step {
    pub fn swap(source_row: usize, target_row: usize) -> Step {
        Step::Swap {
            source_row,
            target_row,
        }
    }

    pub fn scale(row: usize, start_col: usize) -> Step {
        Step::Scale {
            row,
            start_col,
            pivot: None,
        }
    }

    pub fn eliminate(source_row: usize, target_row: usize, start_col: usize) -> Step {
        Step::Eliminate {
            source_row,
            target_row,
            start_col,
            multiplier: None,
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Step::Swap { .. } => StepKind::Swap,
            Step::Scale { .. } => StepKind::Scale,
            Step::Eliminate { .. } => StepKind::Eliminate,
        }
    }

    pub fn source_row(&self) -> usize {
        match self {
            Step::Swap { source_row, .. } | Step::Eliminate { source_row, .. } => *source_row,
            Step::Scale { row, .. } => *row,
        }
    }

    pub fn target_row(&self) -> usize {
        match self {
            Step::Swap { target_row, .. } | Step::Eliminate { target_row, .. } => *target_row,
            Step::Scale { row, .. } => *row,
        }
    }

    pub fn start_col(&self) -> usize {
        match self {
            Step::Swap { .. } => 0,
            Step::Scale { start_col, .. } | Step::Eliminate { start_col, .. } => *start_col,
        }
    }

    pub fn is_recorded(&self) -> bool {
        match self {
            Step::Swap { .. } => true,
            Step::Scale { pivot, .. } => pivot.is_some(),
            Step::Eliminate { multiplier, .. } => multiplier.is_some(),
        }
    }

    /// Applies the step to `matrix`.
    ///
    /// Returns `Ok(false)` without touching the matrix when the pivot is near
    /// zero on the first perform.
    pub fn perform(&mut self, matrix: &mut Matrix) -> Result<bool> {
        match self {
            Step::Swap { .. } => {}
            Step::Scale { row, pivot, .. } => {
                if pivot.is_none() {
                    let value = matrix.get(*row, *row)?;
                    if is_near_zero(value) {
                        return Ok(false);
                    }
                    *pivot = Some(value);
                }
            }
            Step::Eliminate {
                source_row,
                target_row,
                multiplier,
                ..
            } => {
                if multiplier.is_none() {
                    let pivot = matrix.get(*source_row, *source_row)?;
                    if is_near_zero(pivot) {
                        return Ok(false);
                    }
                    *multiplier = Some(-matrix.get(*target_row, *source_row)? / pivot);
                }
            }
        }
        let start_col = self.start_col();
        self.apply_from(matrix, start_col)?;
        Ok(true)
    }

    /// Replays a recorded step on another matrix over every column.
    pub fn mirror(&self, matrix: &mut Matrix) -> Result<usize> {
        self.apply_from(matrix, 0)
    }

    /// Undoes the step in place, over the same columns `perform` touched.
    pub fn revert(&self, matrix: &mut Matrix) -> Result<()> {
        self.revert_from(matrix, self.start_col())
    }

    /// Undoes a [`Step::mirror`].
    pub fn revert_mirror(&self, matrix: &mut Matrix) -> Result<()> {
        self.revert_from(matrix, 0)
    }

    /// Pure form of [`Step::revert`]: returns the grid as it was before the step.
    pub fn inverse(&self, matrix: &Matrix) -> Result<Matrix> {
        let mut previous = matrix.clone();
        self.revert(&mut previous)?;
        Ok(previous)
    }

    /// Number of cells rewritten when performed on a matrix of `cols` columns.
    pub fn iterations(&self, cols: usize) -> usize {
        match self {
            Step::Swap { .. } => 1,
            Step::Scale { start_col, .. } | Step::Eliminate { start_col, .. } => {
                cols.saturating_sub(*start_col)
            }
        }
    }

    pub fn to_metadata(&self) -> StepMetadata {
        StepMetadata {
            kind: self.kind(),
            source_row: self.source_row(),
            target_row: self.target_row(),
            multiplier: match self {
                Step::Swap { .. } => None,
                Step::Scale { pivot, .. } => *pivot,
                Step::Eliminate { multiplier, .. } => *multiplier,
            },
        }
    }

    fn apply_from(&self, matrix: &mut Matrix, start_col: usize) -> Result<usize> {
        match self {
            Step::Swap {
                source_row,
                target_row,
            } => {
                matrix.swap_rows(*source_row, *target_row)?;
                Ok(1)
            }
            Step::Scale { row, pivot, .. } => {
                let pivot = pivot.ok_or(SolverError::UnrecordedStep)?;
                matrix.row(*row)?;
                let cells = matrix.row_mut(*row);
                let start = start_col.min(cells.len());
                cells[start..].iter_mut().for_each(|x| *x /= pivot);
                Ok(cells.len() - start)
            }
            Step::Eliminate {
                source_row,
                target_row,
                multiplier,
                ..
            } => {
                let multiplier = multiplier.ok_or(SolverError::UnrecordedStep)?;
                matrix.add_scaled_row(*source_row, *target_row, multiplier, start_col)
            }
        }
    }

    fn revert_from(&self, matrix: &mut Matrix, start_col: usize) -> Result<()> {
        match self {
            Step::Swap {
                source_row,
                target_row,
            } => matrix.swap_rows(*source_row, *target_row),
            Step::Scale { row, pivot, .. } => {
                let pivot = pivot.ok_or(SolverError::UnrecordedStep)?;
                matrix.row(*row)?;
                let cells = matrix.row_mut(*row);
                let start = start_col.min(cells.len());
                cells[start..].iter_mut().for_each(|x| *x *= pivot);
                Ok(())
            }
            Step::Eliminate {
                source_row,
                target_row,
                multiplier,
                ..
            } => {
                let multiplier = multiplier.ok_or(SolverError::UnrecordedStep)?;
                matrix
                    .add_scaled_row(*source_row, *target_row, -multiplier, start_col)
                    .map(|_| ())
            }
        }
    }
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------
