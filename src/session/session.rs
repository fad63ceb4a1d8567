use crate::config::SessionConfig;
use crate::error::{Result, SolverError};
use crate::matrix::matrix::Matrix;
use crate::methods::method::{create_method, Method, MethodCounters, MethodKind, Workspace};
use crate::solution::solution::{Solution, SolutionReport};
use crate::steps::step::{Step, StepMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Matrix or method missing.
    Uninitialized,
    AtStart,
    Stepping,
    /// The reduction is finished and every step is applied.
    AtEnd,
}

/// Copy of the matrices a session is working on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MatrixSnapshot {
    Standard {
        matrix: Vec<Vec<f64>>,
    },
    Inverse {
        adjusted: Vec<Vec<f64>>,
        inverse: Vec<Vec<f64>>,
    },
}

impl From<&Workspace> for MatrixSnapshot {
    fn from(workspace: &Workspace) -> Self {
        match workspace {
            Workspace::Standard(matrix) => MatrixSnapshot::Standard {
                matrix: matrix.to_list(),
            },
            Workspace::Inverse {
                adjusted, inverse, ..
            } => MatrixSnapshot::Inverse {
                adjusted: adjusted.to_list(),
                inverse: inverse.to_list(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub result: SolutionReport,
    pub steps: Vec<StepMetadata>,
    pub matrix: MatrixSnapshot,
}

struct Bound {
    method: Box<dyn Method>,
    workspace: Workspace,
}

/// Steps one system forward and backward through a row reduction.
///
/// The matrix state always equals the original matrix with
/// `history[..applied]` performed in order. Going backward keeps the undone
/// steps in `history`, going forward again replays them instead of asking the
/// method for new ones.
pub struct Session {
    config: SessionConfig,
    method_kind: Option<MethodKind>,
    original: Option<Matrix>,
    bound: Option<Bound>,
    history: Vec<Step>,
    /// Method as it was right after producing the matching `history` step.
    checkpoints: Vec<Box<dyn Method>>,
    applied: usize,
    /// Result of the current matrix state, computed once.
    solution: Option<Solution>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Session {
        Session {
            method_kind: config.default_method,
            config,
            original: None,
            bound: None,
            history: vec![],
            checkpoints: vec![],
            applied: 0,
            solution: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn method(&self) -> Option<MethodKind> {
        self.method_kind
    }

    pub fn set_method(&mut self, kind: MethodKind) {
        debug!("set method {}", kind);
        self.method_kind = Some(kind);
        self.rebind();
    }

    pub fn set_matrix(&mut self, lines: Vec<Vec<f64>>) -> Result<()> {
        let matrix = Matrix::linear_system(lines)?;
        if matrix.rows() > self.config.max_unknowns {
            return Err(SolverError::TooLarge {
                size: matrix.rows(),
                max: self.config.max_unknowns,
            });
        }
        debug!("set {}x{} matrix", matrix.rows(), matrix.cols());
        self.original = Some(matrix);
        self.rebind();
        Ok(())
    }

    /// Edits one cell of the matrix as currently reduced, outside the step
    /// history. Undone steps are dropped since they no longer follow from the
    /// edited matrix, and the original matrix is recomputed so that
    /// `skip_to_start` lands on the system the edited state derives from.
    pub fn set_cell(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if self.bound.is_none() {
            let original = self.original.as_mut().ok_or(SolverError::NotReady)?;
            original.set(row, col, value)?;
            debug!("set cell ({}, {}) to {}", row, col, value);
            return Ok(());
        }
        let Some(bound) = self.bound.as_mut() else {
            return Err(SolverError::NotReady);
        };
        let kind = bound.method.kind();

        let applied = &self.history[..self.applied];
        let mut workspace = bound.workspace.clone();
        workspace.set_cell(row, col, value, applied)?;
        let edited_original = workspace.unwind(applied)?;

        // a method that ran past the cursor goes back to its stage at the cursor
        if self.applied < self.history.len() {
            let checkpoint = self
                .applied
                .checked_sub(1)
                .and_then(|last| self.checkpoints.get(last));
            bound.method = match checkpoint {
                Some(method) => method.boxed_clone(),
                None => create_method(kind),
            };
        }

        bound.workspace = workspace;
        self.original = Some(edited_original);
        self.history.truncate(self.applied);
        self.checkpoints.truncate(self.applied);
        self.solution = None;
        debug!("set cell ({}, {}) to {} at step {}", row, col, value, self.applied);
        Ok(())
    }

    pub fn next_step(&mut self) -> Result<Option<StepMetadata>> {
        let bound = self.bound.as_mut().ok_or(SolverError::NotReady)?;

        if let Some(step) = self.history.get(self.applied) {
            bound.workspace.apply(step)?;
            self.applied += 1;
            self.solution = None;
            debug!("replayed step {}: {}", self.applied, step.to_metadata());
            return Ok(Some(step.to_metadata()));
        }

        match bound.method.next_step(&mut bound.workspace)? {
            Some(step) => {
                let metadata = step.to_metadata();
                self.history.push(step);
                self.checkpoints.push(bound.method.boxed_clone());
                self.applied += 1;
                self.solution = None;
                debug!("performed step {}: {}", self.applied, metadata);
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }

    pub fn previous_step(&mut self) -> Result<StepMetadata> {
        let bound = self.bound.as_mut().ok_or(SolverError::NotReady)?;
        if self.applied == 0 {
            return Err(SolverError::NoHistory);
        }

        let step = &self.history[self.applied - 1];
        bound.workspace.revert(step)?;
        self.applied -= 1;
        self.solution = None;
        debug!("reverted step {}: {}", self.applied + 1, step.to_metadata());
        Ok(step.to_metadata())
    }

    /// Moves to the state with `position` steps applied. When the reduction
    /// ends before `position` the session goes back to where it was.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if self.bound.is_none() {
            return Err(SolverError::NotReady);
        }
        let start = self.applied;
        while self.applied > position {
            self.previous_step()?;
        }
        while self.applied < position {
            if self.next_step()?.is_none() {
                while self.applied > start {
                    self.previous_step()?;
                }
                return Err(SolverError::NoMoreSteps);
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, name = "Session::skip_to_end")]
    pub fn skip_to_end(&mut self) -> Result<Completion> {
        if self.bound.is_none() {
            return Err(SolverError::NotReady);
        }
        while self.next_step()?.is_some() {}

        let solution = self.result()?;
        info!(
            "reduction finished after {} steps: {}",
            self.applied,
            solution.kind()
        );
        Ok(Completion {
            result: solution.to_report(),
            steps: self.steps(),
            matrix: self.current_matrix()?,
        })
    }

    /// Restores the original matrix with a fresh method, no inverse replay.
    pub fn skip_to_start(&mut self) -> Result<MatrixSnapshot> {
        if self.bound.is_none() {
            return Err(SolverError::NotReady);
        }
        self.rebind();
        self.current_matrix()
    }

    pub fn current_matrix(&self) -> Result<MatrixSnapshot> {
        match (&self.bound, &self.original) {
            (Some(bound), _) => Ok(MatrixSnapshot::from(&bound.workspace)),
            (None, Some(original)) => Ok(MatrixSnapshot::Standard {
                matrix: original.to_list(),
            }),
            (None, None) => Err(SolverError::NotReady),
        }
    }

    /// Solution of the matrix in its current state. Computed, and counted,
    /// once per state.
    pub fn result(&mut self) -> Result<Solution> {
        let bound = self.bound.as_mut().ok_or(SolverError::NotReady)?;
        if let Some(solution) = &self.solution {
            return Ok(solution.clone());
        }
        let solution = bound.method.solve(&bound.workspace)?;
        self.solution = Some(solution.clone());
        Ok(solution)
    }

    pub fn steps(&self) -> Vec<StepMetadata> {
        self.history[..self.applied]
            .iter()
            .map(|step| step.to_metadata())
            .collect()
    }

    /// Index of the last applied step, `None` at the start.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn counters(&self) -> Result<MethodCounters> {
        let bound = self.bound.as_ref().ok_or(SolverError::NotReady)?;
        Ok(*bound.method.counters())
    }

    pub fn state(&self) -> SessionState {
        match &self.bound {
            None => SessionState::Uninitialized,
            Some(bound) if bound.method.is_finished() && self.applied == self.history.len() => {
                SessionState::AtEnd
            }
            Some(_) if self.applied == 0 => SessionState::AtStart,
            Some(_) => SessionState::Stepping,
        }
    }

    pub fn reset(&mut self) {
        debug!("reset session");
        self.method_kind = None;
        self.original = None;
        self.bound = None;
        self.history.clear();
        self.checkpoints.clear();
        self.applied = 0;
        self.solution = None;
    }

    fn rebind(&mut self) {
        self.history.clear();
        self.checkpoints.clear();
        self.applied = 0;
        self.solution = None;
        self.bound = match (self.method_kind, &self.original) {
            (Some(kind), Some(original)) => Some(Bound {
                method: create_method(kind),
                workspace: Workspace::new(kind, original),
            }),
            _ => None,
        };
    }
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::step::StepKind;

    fn session(kind: MethodKind, lines: Vec<Vec<f64>>) -> Session {
        let mut session = Session::default();
        session.set_method(kind);
        session.set_matrix(lines).unwrap();
        session
    }

    fn sample() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 2.0, 1.0, 4.0],
            vec![3.0, 1.0, 5.0, 7.0],
            vec![1.0, 1.0, 1.0, 6.0],
        ]
    }

    fn assert_snapshot_close(a: &MatrixSnapshot, b: &MatrixSnapshot) {
        let flatten = |s: &MatrixSnapshot| -> Vec<f64> {
            match s {
                MatrixSnapshot::Standard { matrix } => matrix.iter().flatten().copied().collect(),
                MatrixSnapshot::Inverse { adjusted, inverse } => adjusted
                    .iter()
                    .chain(inverse.iter())
                    .flatten()
                    .copied()
                    .collect(),
            }
        };
        let (a, b) = (flatten(a), flatten(b));
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_not_ready() {
        let mut session = Session::default();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.next_step(), Err(SolverError::NotReady));
        assert_eq!(session.previous_step(), Err(SolverError::NotReady));
        assert_eq!(session.set_cell(0, 0, 1.0), Err(SolverError::NotReady));
        assert!(session.result().is_err());
        assert!(session.current_matrix().is_err());

        session.set_matrix(sample()).unwrap();
        assert_eq!(session.next_step(), Err(SolverError::NotReady));
        assert!(matches!(
            session.current_matrix().unwrap(),
            MatrixSnapshot::Standard { .. }
        ));

        session.set_method(MethodKind::Gauss);
        assert_eq!(session.state(), SessionState::AtStart);
    }

    #[test]
    fn test_forward_backward_round_trip() {
        for kind in [MethodKind::Gauss, MethodKind::GaussJordan, MethodKind::InverseMatrix] {
            let mut session = session(kind, sample());
            let start = session.current_matrix().unwrap();

            let mut forward = 0;
            while forward < 3 && session.next_step().unwrap().is_some() {
                forward += 1;
            }
            assert_eq!(session.cursor(), Some(forward - 1));
            for _ in 0..forward {
                session.previous_step().unwrap();
            }
            assert_eq!(session.cursor(), None);
            assert_snapshot_close(&session.current_matrix().unwrap(), &start);
            assert_eq!(session.previous_step(), Err(SolverError::NoHistory));
        }
    }

    #[test]
    fn test_redo_replays_recorded_steps() {
        let mut session = session(MethodKind::Gauss, sample());
        let first = session.next_step().unwrap().unwrap();
        let second = session.next_step().unwrap().unwrap();
        let after_two = session.current_matrix().unwrap();
        let elementary = session.counters().unwrap().elementary_operations;

        assert_eq!(session.previous_step().unwrap(), second);
        assert_eq!(session.previous_step().unwrap(), first);
        assert_eq!(session.next_step().unwrap().unwrap(), first);
        assert_eq!(session.next_step().unwrap().unwrap(), second);

        assert_snapshot_close(&session.current_matrix().unwrap(), &after_two);
        assert_eq!(session.counters().unwrap().elementary_operations, elementary);
        assert_eq!(session.steps(), vec![first, second]);
    }

    #[test]
    fn test_skip_to_end_and_start() {
        let mut session = session(MethodKind::Gauss, sample());
        let start = session.current_matrix().unwrap();
        let completion = session.skip_to_end().unwrap();

        assert_eq!(session.state(), SessionState::AtEnd);
        assert_eq!(completion.steps.len(), 4);
        assert_eq!(completion.steps[0].kind, StepKind::Swap);
        assert_eq!(completion.result.result, crate::solution::solution::SolutionKind::Unique);
        assert_eq!(session.next_step(), Ok(None));

        let snapshot = session.skip_to_start().unwrap();
        assert_eq!(snapshot, start);
        assert_eq!(session.state(), SessionState::AtStart);
        assert!(session.steps().is_empty());
        assert_eq!(session.counters().unwrap(), MethodCounters::default());
    }

    #[test]
    fn test_result_is_idempotent() {
        let mut session = session(MethodKind::GaussJordan, sample());
        session.skip_to_end().unwrap();
        let first = session.result().unwrap();
        let second = session.result().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_method_clears_history() {
        let mut session = session(MethodKind::Gauss, sample());
        session.next_step().unwrap();
        session.next_step().unwrap();

        session.set_method(MethodKind::InverseMatrix);
        assert_eq!(session.cursor(), None);
        assert!(session.steps().is_empty());
        match session.current_matrix().unwrap() {
            MatrixSnapshot::Inverse { adjusted, inverse } => {
                assert_eq!(adjusted[0], vec![0.0, 2.0, 1.0]);
                assert_eq!(inverse[0], vec![1.0, 0.0, 0.0]);
            }
            other => panic!("unexpected snapshot {:?}", other),
        }
    }

    #[test]
    fn test_set_cell_edits_working_matrix() {
        let mut session = session(MethodKind::Gauss, sample());
        session.seek(2).unwrap();
        session.previous_step().unwrap();
        assert_eq!(
            session.set_cell(3, 0, 1.0),
            Err(SolverError::OutOfRange {
                row: 3,
                col: 0,
                rows: 3,
                cols: 4
            })
        );
        assert_eq!(session.cursor(), Some(0));

        // rows 0 and 1 are swapped, row 2 is untouched
        session.set_cell(2, 3, 100.0).unwrap();
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.counters().unwrap().elementary_operations, 1);
        assert_eq!(
            session.current_matrix().unwrap(),
            MatrixSnapshot::Standard {
                matrix: vec![
                    vec![3.0, 1.0, 5.0, 7.0],
                    vec![0.0, 2.0, 1.0, 4.0],
                    vec![1.0, 1.0, 1.0, 100.0],
                ]
            }
        );

        // the undone elimination is generated again from the edited matrix
        let next = session.next_step().unwrap().unwrap();
        assert_eq!(
            (next.kind, next.source_row, next.target_row),
            (StepKind::Eliminate, 0, 1)
        );
        assert_eq!(session.steps().len(), 2);

        assert_eq!(
            session.skip_to_start().unwrap(),
            MatrixSnapshot::Standard {
                matrix: vec![
                    vec![0.0, 2.0, 1.0, 4.0],
                    vec![3.0, 1.0, 5.0, 7.0],
                    vec![1.0, 1.0, 1.0, 100.0],
                ]
            }
        );
    }

    #[test]
    fn test_set_cell_inverse_rhs() {
        let mut session = session(
            MethodKind::InverseMatrix,
            vec![vec![1.0, 1.0, 2.0], vec![1.0, -1.0, 0.0]],
        );
        session.next_step().unwrap();
        session.set_cell(1, 2, 4.0).unwrap();
        match session.skip_to_end().unwrap().result.roots {
            Some(roots) => {
                // x + y = 2, x - y = 4
                assert!((roots[0] - 3.0).abs() < 1e-9 && (roots[1] + 1.0).abs() < 1e-9);
            }
            None => panic!("expected roots"),
        }
    }

    #[test]
    fn test_seek() {
        let mut session = session(MethodKind::GaussJordan, sample());
        session.seek(3).unwrap();
        assert_eq!(session.cursor(), Some(2));
        session.seek(1).unwrap();
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.seek(1000), Err(SolverError::NoMoreSteps));
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.state(), SessionState::Stepping);
    }

    #[test]
    fn test_result_counted_once_per_state() {
        let mut session = session(MethodKind::Gauss, sample());
        session.skip_to_end().unwrap();
        let counters = session.counters().unwrap();
        session.result().unwrap();
        session.result().unwrap();
        assert_eq!(session.counters().unwrap(), counters);

        session.previous_step().unwrap();
        session.result().unwrap();
        assert!(
            session.counters().unwrap().back_substitution_operations
                > counters.back_substitution_operations
        );
    }

    #[test]
    fn test_invalid_matrix_keeps_session() {
        let mut session = session(MethodKind::Gauss, sample());
        session.next_step().unwrap();
        assert!(matches!(
            session.set_matrix(vec![vec![1.0, 2.0, 3.0]]),
            Err(SolverError::InvalidDimensions(_))
        ));
        assert_eq!(session.cursor(), Some(0));

        let mut small = Session::new(SessionConfig {
            max_unknowns: 1,
            default_method: Some(MethodKind::Gauss),
        });
        assert_eq!(
            small.set_matrix(sample()),
            Err(SolverError::TooLarge { size: 3, max: 1 })
        );
        small.set_matrix(vec![vec![2.0, 4.0]]).unwrap();
        assert_eq!(small.skip_to_end().unwrap().result.roots, Some(vec![2.0]));
    }

    #[test]
    fn test_reset() {
        let mut session = session(MethodKind::Gauss, sample());
        session.skip_to_end().unwrap();
        session.reset();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.method(), None);
        assert_eq!(session.skip_to_end(), Err(SolverError::NotReady));
    }
}
