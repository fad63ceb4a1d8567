use crate::error::Result;
use crate::matrix::matrix::Matrix;
use crate::methods::method::{Method, MethodCounters, MethodKind, Workspace};
use crate::solution::solution::{back_substitute, classify_echelon, Solution, SolutionKind};
use crate::steps::step::Step;
use crate::utils::is_near_zero;

/// Row with the strictly largest absolute value in `col`, scanning from
/// `from_row` down. Ties keep the earliest row.
pub(crate) fn find_pivot_row(
    matrix: &Matrix,
    from_row: usize,
    col: usize,
    counters: &mut MethodCounters,
) -> usize {
    let mut pivot_row = from_row;
    for row in from_row + 1..matrix.rows() {
        if matrix.at(row, col).abs() > matrix.at(pivot_row, col).abs() {
            pivot_row = row;
        }
        counters.comparisons += 1;
    }
    pivot_row
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    PivotSwap,
    RowElimination { target_row: usize },
    Done,
}

/// Forward elimination with partial pivoting, leaving an upper triangular
/// matrix that is solved by back-substitution.
#[derive(Debug, Clone)]
pub struct GaussMethod {
    counters: MethodCounters,
    source_row: usize,
    stage: Stage,
}

impl GaussMethod {
    pub fn new() -> GaussMethod {
        GaussMethod {
            counters: MethodCounters::default(),
            source_row: 0,
            stage: Stage::PivotSwap,
        }
    }

    fn forward(&mut self, matrix: &mut Matrix) -> Result<Option<Step>> {
        loop {
            match self.stage {
                Stage::Done => return Ok(None),
                Stage::PivotSwap => {
                    if self.source_row + 1 >= matrix.rows() {
                        self.stage = Stage::Done;
                        continue;
                    }
                    let source_row = self.source_row;
                    let pivot_row = find_pivot_row(matrix, source_row, source_row, &mut self.counters);

                    // singular column, nothing to eliminate with
                    if is_near_zero(matrix.at(pivot_row, source_row)) {
                        self.source_row += 1;
                        continue;
                    }

                    self.stage = Stage::RowElimination {
                        target_row: source_row + 1,
                    };
                    if pivot_row != source_row {
                        let mut step = Step::swap(source_row, pivot_row);
                        step.perform(matrix)?;
                        self.counters.record_step(&step, matrix.cols());
                        return Ok(Some(step));
                    }
                }
                Stage::RowElimination { target_row } => {
                    if target_row >= matrix.rows() {
                        self.source_row += 1;
                        self.stage = Stage::PivotSwap;
                        continue;
                    }
                    self.stage = Stage::RowElimination {
                        target_row: target_row + 1,
                    };

                    let mut step = Step::eliminate(self.source_row, target_row, self.source_row);
                    if step.perform(matrix)? {
                        self.counters.record_step(&step, matrix.cols());
                        return Ok(Some(step));
                    }
                }
            }
        }
    }
}

impl Default for GaussMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl Method for GaussMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Gauss
    }

    fn next_step(&mut self, workspace: &mut Workspace) -> Result<Option<Step>> {
        let matrix = workspace.standard_mut(MethodKind::Gauss)?;
        self.forward(matrix)
    }

    fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    fn solve(&mut self, workspace: &Workspace) -> Result<Solution> {
        let matrix = workspace.standard(MethodKind::Gauss)?;
        match classify_echelon(matrix, &mut self.counters)? {
            SolutionKind::Unique => Ok(Solution::Unique(back_substitute(
                matrix,
                &mut self.counters,
            )?)),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::step::{StepKind, StepMetadata};

    fn run(lines: Vec<Vec<f64>>) -> (Vec<StepMetadata>, Workspace, GaussMethod) {
        let mut workspace = Workspace::Standard(Matrix::linear_system(lines).unwrap());
        let mut method = GaussMethod::new();
        let mut steps = vec![];
        while let Some(step) = method.next_step(&mut workspace).unwrap() {
            steps.push(step.to_metadata());
        }
        (steps, workspace, method)
    }

    #[test]
    fn test_single_elimination() {
        let (steps, _, _) = run(vec![vec![1.0, 2.0, 5.0], vec![1.0, 1.0, 3.0]]);
        assert_eq!(
            steps,
            vec![StepMetadata {
                kind: StepKind::Eliminate,
                source_row: 0,
                target_row: 1,
                multiplier: Some(-1.0),
            }]
        );
    }

    #[test]
    fn test_already_echelon() {
        let (_, workspace, mut method) = run(vec![vec![2.0, 1.0, 5.0], vec![0.0, 1.0, 1.0]]);
        assert!(method.is_finished());
        assert_eq!(
            method.solve(&workspace).unwrap(),
            Solution::Unique(vec![2.0, 1.0])
        );
    }

    #[test]
    fn test_pivot_order() {
        let (steps, _, method) = run(vec![
            vec![0.0, 2.0, 1.0, 4.0],
            vec![3.0, 1.0, 5.0, 7.0],
            vec![1.0, 1.0, 1.0, 6.0],
        ]);
        let order: Vec<(StepKind, usize, usize)> = steps
            .iter()
            .map(|s| (s.kind, s.source_row, s.target_row))
            .collect();
        assert_eq!(
            order,
            vec![
                (StepKind::Swap, 0, 1),
                (StepKind::Eliminate, 0, 1),
                (StepKind::Eliminate, 0, 2),
                (StepKind::Eliminate, 1, 2),
            ]
        );
        assert_eq!(method.counters().elementary_operations, 4);
        assert_eq!(method.counters().comparisons, 3);
    }

    #[test]
    fn test_tie_keeps_earliest_row() {
        let (steps, _, _) = run(vec![vec![2.0, 1.0, 3.0], vec![-2.0, 1.0, 1.0]]);
        assert!(steps.iter().all(|s| s.kind != StepKind::Swap));
    }

    #[test]
    fn test_singular_column_is_skipped() {
        let (steps, workspace, mut method) = run(vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 2.0, 1.0, 3.0],
            vec![0.0, 4.0, 1.0, 5.0],
        ]);
        // column 0 produces nothing, column 1 pivots on row 2
        assert!(steps
            .iter()
            .all(|s| !(s.kind == StepKind::Eliminate && s.source_row == 0)));
        assert_eq!(steps[0].kind, StepKind::Swap);
        assert_eq!((steps[0].source_row, steps[0].target_row), (1, 2));
        assert!(matches!(
            method.solve(&workspace).unwrap(),
            Solution::Infinite | Solution::None
        ));
    }

    #[test]
    fn test_no_solution() {
        let (_, workspace, mut method) = run(vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 5.0]]);
        assert_eq!(method.solve(&workspace).unwrap(), Solution::None);
    }

    #[test]
    fn test_infinite_solutions() {
        let (_, workspace, mut method) = run(vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 0.0]]);
        assert_eq!(method.solve(&workspace).unwrap(), Solution::Infinite);
    }
}
