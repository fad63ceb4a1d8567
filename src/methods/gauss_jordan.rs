use crate::error::Result;
use crate::matrix::matrix::Matrix;
use crate::methods::gauss::find_pivot_row;
use crate::methods::method::{Method, MethodCounters, MethodKind, Workspace};
use crate::solution::solution::{classify_echelon, Solution, SolutionKind};
use crate::steps::step::Step;
use crate::utils::is_near_zero;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    PivotSwap,
    Scaling,
    EliminateBelow { target_row: usize },
    FinalScaling,
    EliminateAbove { target_row: usize },
    Done,
}

/// Produces the Gauss-Jordan steps for any matrix it is handed.
///
/// Forward pass per source row: pivot swap, scale the pivot row to 1, eliminate
/// every row below. The last row gets its own scale, then a backward pass walks
/// source rows from the bottom up and clears every row above them.
#[derive(Debug, Clone)]
pub struct GaussJordanStepper {
    source_row: usize,
    stage: Stage,
}

impl GaussJordanStepper {
    pub fn new() -> GaussJordanStepper {
        GaussJordanStepper {
            source_row: 0,
            stage: Stage::PivotSwap,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    pub fn next_step(
        &mut self,
        matrix: &mut Matrix,
        counters: &mut MethodCounters,
    ) -> Result<Option<Step>> {
        let rows = matrix.rows();
        loop {
            match self.stage {
                Stage::Done => return Ok(None),
                Stage::PivotSwap => {
                    if rows == 0 {
                        self.stage = Stage::Done;
                        continue;
                    }
                    if self.source_row + 1 >= rows {
                        self.stage = Stage::FinalScaling;
                        continue;
                    }
                    let source_row = self.source_row;
                    let pivot_row = find_pivot_row(matrix, source_row, source_row, counters);
                    self.stage = Stage::Scaling;

                    if !is_near_zero(matrix.at(pivot_row, source_row)) && pivot_row != source_row {
                        let mut step = Step::swap(source_row, pivot_row);
                        step.perform(matrix)?;
                        counters.record_step(&step, matrix.cols());
                        return Ok(Some(step));
                    }
                }
                Stage::Scaling => {
                    self.stage = Stage::EliminateBelow {
                        target_row: self.source_row + 1,
                    };
                    let mut step = Step::scale(self.source_row, self.source_row);
                    if step.perform(matrix)? {
                        counters.record_step(&step, matrix.cols());
                        return Ok(Some(step));
                    }
                }
                Stage::EliminateBelow { target_row } => {
                    if target_row >= rows {
                        self.source_row += 1;
                        self.stage = Stage::PivotSwap;
                        continue;
                    }
                    self.stage = Stage::EliminateBelow {
                        target_row: target_row + 1,
                    };
                    let mut step = Step::eliminate(self.source_row, target_row, self.source_row);
                    if step.perform(matrix)? {
                        counters.record_step(&step, matrix.cols());
                        return Ok(Some(step));
                    }
                }
                Stage::FinalScaling => {
                    self.source_row = rows - 1;
                    self.stage = Stage::EliminateAbove { target_row: 0 };
                    let mut step = Step::scale(self.source_row, self.source_row);
                    if step.perform(matrix)? {
                        counters.record_step(&step, matrix.cols());
                        return Ok(Some(step));
                    }
                }
                Stage::EliminateAbove { target_row } => {
                    if target_row >= self.source_row {
                        if self.source_row == 0 {
                            self.stage = Stage::Done;
                            continue;
                        }
                        self.source_row -= 1;
                        self.stage = Stage::EliminateAbove { target_row: 0 };
                        continue;
                    }
                    self.stage = Stage::EliminateAbove {
                        target_row: target_row + 1,
                    };
                    let mut step = Step::eliminate(self.source_row, target_row, 0);
                    if step.perform(matrix)? {
                        counters.record_step(&step, matrix.cols());
                        return Ok(Some(step));
                    }
                }
            }
        }
    }
}

impl Default for GaussJordanStepper {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduces the augmented matrix to reduced row echelon form, the roots are
/// read off the last column.
#[derive(Debug, Clone, Default)]
pub struct GaussJordanMethod {
    counters: MethodCounters,
    stepper: GaussJordanStepper,
}

impl GaussJordanMethod {
    pub fn new() -> GaussJordanMethod {
        GaussJordanMethod::default()
    }
}

impl Method for GaussJordanMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::GaussJordan
    }

    fn next_step(&mut self, workspace: &mut Workspace) -> Result<Option<Step>> {
        let matrix = workspace.standard_mut(MethodKind::GaussJordan)?;
        self.stepper.next_step(matrix, &mut self.counters)
    }

    fn is_finished(&self) -> bool {
        self.stepper.is_finished()
    }

    fn solve(&mut self, workspace: &Workspace) -> Result<Solution> {
        let matrix = workspace.standard(MethodKind::GaussJordan)?;
        match classify_echelon(matrix, &mut self.counters)? {
            SolutionKind::Unique => {
                let roots = matrix.rhs();
                self.counters.back_substitution_operations += roots.len() as u64;
                Ok(Solution::Unique(roots))
            }
            SolutionKind::Infinite => Ok(Solution::Infinite),
            SolutionKind::None | SolutionKind::NoneOrInfinite => Ok(Solution::None),
        }
    }

    fn counters(&self) -> &MethodCounters {
        &self.counters
    }

    fn boxed_clone(&self) -> Box<dyn Method> {
        Box::new(self.clone())
    }
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------
