use crate::error::{Result, SolverError};
use crate::utils::is_near_zero;
use itertools::Itertools;
use std::fmt;
use std::ops;

/// Dense row-major grid of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    cols: usize,
    rows: usize,
    cells: Vec<f64>,
}

/// Ranks of the coefficient block and of the whole augmented matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankProfile {
    pub coefficients: usize,
    pub augmented: usize,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            cells: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Matrix {
        Matrix {
            rows: n,
            cols: n,
            cells: (0..n)
                .flat_map(|i| (0..n).map(move |j| if i == j { 1.0 } else { 0.0 }))
                .collect(),
        }
    }

    /// Builds a matrix from rows, all of which must have the same length.
    pub fn from_list(lines: Vec<Vec<f64>>) -> Result<Matrix> {
        let rows = lines.len();
        let cols = lines.first().map(|l| l.len()).unwrap_or(0);
        if let Some((index, line)) = lines.iter().find_position(|l| l.len() != cols) {
            return Err(SolverError::InvalidDimensions(format!(
                "row {} has {} cells, expected {}",
                index,
                line.len(),
                cols
            )));
        }

        Ok(Matrix {
            rows,
            cols,
            cells: lines.into_iter().flatten().collect(),
        })
    }

    /// Like [`Matrix::from_list`], additionally requiring `cols == rows + 1`.
    pub fn linear_system(lines: Vec<Vec<f64>>) -> Result<Matrix> {
        let matrix = Matrix::from_list(lines)?;
        if !matrix.is_linear_system() {
            return Err(SolverError::InvalidDimensions(format!(
                "a system of {} equations needs {} columns, got {}",
                matrix.rows,
                matrix.rows + 1,
                matrix.cols
            )));
        }
        Ok(matrix)
    }

    pub fn to_list(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![vec![]; self.rows];
        }
        self.cells
            .chunks(self.cols)
            .map(|line| line.to_vec())
            .collect()
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_linear_system(&self) -> bool {
        self.cols == self.rows + 1
    }

    fn check(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(SolverError::OutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows {
            return Err(SolverError::OutOfRange {
                row,
                col: 0,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.check(row, col)?;
        Ok(self.at(row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.check(row, col)?;
        self.cells[row * self.cols + col] = value;
        Ok(())
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_row(a)?;
        self.check_row(b)?;
        if a != b {
            for k in 0..self.cols {
                self.cells.swap(a * self.cols + k, b * self.cols + k);
            }
        }
        Ok(())
    }

    /// Unchecked read, callers guarantee the indices are in range.
    #[inline(always)]
    pub(crate) fn at(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    #[inline(always)]
    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row(&self, row: usize) -> Result<&[f64]> {
        self.check_row(row)?;
        Ok(&self.cells[row * self.cols..(row + 1) * self.cols])
    }

    /// `target[col] += factor * source[col]` for every `col >= start_col`.
    pub(crate) fn add_scaled_row(
        &mut self,
        source: usize,
        target: usize,
        factor: f64,
        start_col: usize,
    ) -> Result<usize> {
        self.check_row(source)?;
        self.check_row(target)?;
        let cols = self.cols;
        for col in start_col..cols {
            let value = self.cells[source * cols + col];
            self.cells[target * cols + col] += factor * value;
        }
        Ok(cols.saturating_sub(start_col))
    }

    /// Square block of the first `rows` columns (drops the right-hand side).
    pub fn coefficients(&self) -> Matrix {
        let n = self.rows.min(self.cols);
        Matrix {
            rows: self.rows,
            cols: n,
            cells: (0..self.rows)
                .flat_map(|r| (0..n).map(move |c| (r, c)))
                .map(|(r, c)| self.at(r, c))
                .collect(),
        }
    }

    /// Last column, the right-hand side of a linear system.
    pub fn rhs(&self) -> Vec<f64> {
        if self.cols == 0 {
            return vec![];
        }
        (0..self.rows).map(|r| self.at(r, self.cols - 1)).collect()
    }

    /// True when every coefficient of `row`, augmented column excluded, is near zero.
    pub fn is_zero_row_coefficients(&self, row: usize) -> Result<bool> {
        let coefficients = &self.row(row)?[..self.cols.saturating_sub(1)];
        Ok(coefficients.iter().all(|value| is_near_zero(*value)))
    }

    pub fn mul_vector(&self, vector: &[f64]) -> Result<Vec<f64>> {
        if vector.len() != self.cols {
            return Err(SolverError::InvalidDimensions(format!(
                "cannot multiply a {}x{} matrix by a vector of {}",
                self.rows,
                self.cols,
                vector.len()
            )));
        }
        if self.cols == 0 {
            return Ok(vec![0.0; self.rows]);
        }
        Ok(self
            .cells
            .chunks(self.cols)
            .map(|line| line.iter().zip(vector).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Reduced row echelon form within [`crate::utils::EPSILON`].
    pub fn is_rref(&self) -> bool {
        let mut lead = None;

        for i in 0..self.rows {
            let pivot_col_opt = (0..self.cols).find(|&c| !is_near_zero(self.at(i, c)));

            match pivot_col_opt {
                None => {
                    for r in i + 1..self.rows {
                        if (0..self.cols).any(|c| !is_near_zero(self.at(r, c))) {
                            return false;
                        }
                    }
                    break;
                }
                Some(pivot_col) => {
                    if let Some(prev_lead) = lead {
                        if pivot_col <= prev_lead {
                            return false;
                        }
                    }
                    lead = Some(pivot_col);

                    if !is_near_zero(self.at(i, pivot_col) - 1.0) {
                        return false;
                    }

                    for r in 0..self.rows {
                        if r != i && !is_near_zero(self.at(r, pivot_col)) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Rank of the coefficient block and of the augmented matrix, computed on a
    /// scratch copy with full column scanning. Does not touch `self`.
    pub fn rank_profile(&self) -> RankProfile {
        let mut mat = self.clone();
        let unknowns = self.cols.saturating_sub(1);
        let mut rank = 0;
        let mut coefficients = 0;

        for col in 0..mat.cols {
            if rank >= mat.rows {
                break;
            }
            let pivot_row = (rank..mat.rows)
                .max_by(|&a, &b| mat.at(a, col).abs().total_cmp(&mat.at(b, col).abs()))
                .filter(|&r| !is_near_zero(mat.at(r, col)));

            let pivot_row = match pivot_row {
                Some(r) => r,
                None => continue,
            };

            if pivot_row != rank {
                for k in 0..mat.cols {
                    mat.cells.swap(rank * mat.cols + k, pivot_row * mat.cols + k);
                }
            }

            let pivot_val = mat.at(rank, col);
            for r in rank + 1..mat.rows {
                let factor = -mat.at(r, col) / pivot_val;
                for k in col..mat.cols {
                    let value = mat.at(rank, k);
                    mat.cells[r * mat.cols + k] += factor * value;
                }
            }

            if col < unknowns {
                coefficients += 1;
            }
            rank += 1;
        }

        RankProfile {
            coefficients,
            augmented: rank,
        }
    }
}

impl ops::Mul<&Matrix> for &Matrix {
    type Output = Result<Matrix>;

    fn mul(self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(SolverError::InvalidDimensions(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }

        Ok(Matrix {
            rows: self.rows,
            cols: rhs.cols,
            cells: (0..self.rows)
                .flat_map(|i| {
                    (0..rhs.cols)
                        .map(move |j| (0..self.cols).map(|k| self.at(i, k) * rhs.at(k, j)).sum())
                })
                .collect(),
        })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            let line = (0..self.cols)
                .map(|c| format!("{:>10.4}", self.at(r, c)))
                .join(" ");
            writeln!(f, "[{}]", line)?;
        }
        Ok(())
    }
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------
