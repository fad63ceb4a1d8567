use crate::error::{Result, SolverError};
use crate::matrix::matrix::Matrix;
use crate::methods::gauss::GaussMethod;
use crate::methods::gauss_jordan::GaussJordanMethod;
use crate::methods::inverse::InverseMethod;
use crate::solution::solution::Solution;
use crate::steps::step::Step;
use serde::{Deserialize, Serialize};
use std::ops;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum MethodKind {
    Gauss,
    GaussJordan,
    InverseMatrix,
}

/// Operation tallies of one method run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCounters {
    pub comparisons: u64,
    pub iterations: u64,
    pub elementary_operations: u64,
    pub back_substitution_operations: u64,
}

impl MethodCounters {
    pub(crate) fn record_step(&mut self, step: &Step, cols: usize) {
        self.elementary_operations += 1;
        self.iterations += step.iterations(cols) as u64;
    }
}

impl ops::Add for MethodCounters {
    type Output = MethodCounters;

    fn add(self, rhs: MethodCounters) -> MethodCounters {
        MethodCounters {
            comparisons: self.comparisons + rhs.comparisons,
            iterations: self.iterations + rhs.iterations,
            elementary_operations: self.elementary_operations + rhs.elementary_operations,
            back_substitution_operations: self.back_substitution_operations
                + rhs.back_substitution_operations,
        }
    }
}

impl std::iter::Sum<MethodCounters> for MethodCounters {
    fn sum<I: Iterator<Item = MethodCounters>>(iter: I) -> MethodCounters {
        iter.fold(MethodCounters::default(), |acc, c| acc + c)
    }
}

/// The matrices a method reduces. Owned by the session, lent to the method
/// for the duration of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Workspace {
    Standard(Matrix),
    /// Coefficient block reduced in place, the identity turning into its
    /// inverse, and the untouched right-hand side.
    Inverse {
        adjusted: Matrix,
        inverse: Matrix,
        rhs: Vec<f64>,
    },
}

impl Workspace {
    pub fn new(kind: MethodKind, system: &Matrix) -> Workspace {
        match kind {
            MethodKind::Gauss | MethodKind::GaussJordan => Workspace::Standard(system.clone()),
            MethodKind::InverseMatrix => Workspace::Inverse {
                adjusted: system.coefficients(),
                inverse: Matrix::identity(system.rows()),
                rhs: system.rhs(),
            },
        }
    }

    /// Replays an already recorded step.
    pub fn apply(&mut self, step: &Step) -> Result<()> {
        let mut step = step.clone();
        match self {
            Workspace::Standard(matrix) => {
                step.perform(matrix)?;
            }
            Workspace::Inverse {
                adjusted, inverse, ..
            } => {
                step.perform(adjusted)?;
                step.mirror(inverse)?;
            }
        }
        Ok(())
    }

    pub fn revert(&mut self, step: &Step) -> Result<()> {
        match self {
            Workspace::Standard(matrix) => step.revert(matrix),
            Workspace::Inverse {
                adjusted, inverse, ..
            } => {
                step.revert(adjusted)?;
                step.revert_mirror(inverse)
            }
        }
    }

    /// Writes one cell of the augmented system as currently reduced, `applied`
    /// being the steps that led here. For the inverse workspace the last
    /// column is the right-hand side, which is kept in original row order.
    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        value: f64,
        applied: &[Step],
    ) -> Result<()> {
        match self {
            Workspace::Standard(matrix) => matrix.set(row, col, value),
            Workspace::Inverse {
                adjusted,
                inverse,
                rhs,
            } => {
                let (rows, cols) = (adjusted.rows(), adjusted.cols() + 1);
                if row >= rows || col >= cols {
                    return Err(SolverError::OutOfRange {
                        row,
                        col,
                        rows,
                        cols,
                    });
                }
                if col == adjusted.cols() {
                    let mut current = inverse.mul_vector(rhs)?;
                    current[row] = value;
                    let mut column =
                        Matrix::from_list(current.into_iter().map(|v| vec![v]).collect())?;
                    for step in applied.iter().rev() {
                        step.revert_mirror(&mut column)?;
                    }
                    *rhs = column.rhs();
                    Ok(())
                } else {
                    adjusted.set(row, col, value)
                }
            }
        }
    }

    /// The augmented system this workspace started from, given the steps
    /// applied to it so far.
    pub fn unwind(&self, applied: &[Step]) -> Result<Matrix> {
        match self {
            Workspace::Standard(matrix) => {
                let mut system = matrix.clone();
                for step in applied.iter().rev() {
                    step.revert(&mut system)?;
                }
                Ok(system)
            }
            Workspace::Inverse { adjusted, rhs, .. } => {
                let mut coefficients = adjusted.clone();
                for step in applied.iter().rev() {
                    step.revert(&mut coefficients)?;
                }
                let lines = coefficients
                    .to_list()
                    .into_iter()
                    .zip(rhs)
                    .map(|(mut line, value)| {
                        line.push(*value);
                        line
                    })
                    .collect();
                Matrix::linear_system(lines)
            }
        }
    }

    pub(crate) fn standard_mut(&mut self, kind: MethodKind) -> Result<&mut Matrix> {
        match self {
            Workspace::Standard(matrix) => Ok(matrix),
            Workspace::Inverse { .. } => Err(SolverError::WorkspaceMismatch(kind)),
        }
    }

    pub(crate) fn standard(&self, kind: MethodKind) -> Result<&Matrix> {
        match self {
            Workspace::Standard(matrix) => Ok(matrix),
            Workspace::Inverse { .. } => Err(SolverError::WorkspaceMismatch(kind)),
        }
    }
}

/// A row reduction strategy, producing its steps one at a time.
pub trait Method: Send + Sync {
    fn kind(&self) -> MethodKind;

    /// Performs the next step on `workspace` and returns it, or `None` once the
    /// reduction is finished.
    fn next_step(&mut self, workspace: &mut Workspace) -> Result<Option<Step>>;

    fn is_finished(&self) -> bool;

    /// Classifies the system in its current state and computes the roots.
    fn solve(&mut self, workspace: &Workspace) -> Result<Solution>;

    fn counters(&self) -> &MethodCounters;

    /// Copy of the method in its current stage.
    fn boxed_clone(&self) -> Box<dyn Method>;
}

pub fn create_method(kind: MethodKind) -> Box<dyn Method> {
    match kind {
        MethodKind::Gauss => Box::new(GaussMethod::new()),
        MethodKind::GaussJordan => Box::new(GaussJordanMethod::new()),
        MethodKind::InverseMatrix => Box::new(InverseMethod::new()),
    }
}

/// Runs `kind` to completion on a copy of `system`.
pub fn solve_system(kind: MethodKind, system: &Matrix) -> Result<(Solution, MethodCounters)> {
    let mut workspace = Workspace::new(kind, system);
    let mut method = create_method(kind);
    while method.next_step(&mut workspace)?.is_some() {}
    let solution = method.solve(&workspace)?;
    Ok((solution, *method.counters()))
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------
