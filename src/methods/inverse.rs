use crate::error::{Result, SolverError};
use crate::methods::gauss_jordan::GaussJordanStepper;
use crate::methods::method::{Method, MethodCounters, MethodKind, Workspace};
use crate::solution::solution::Solution;
use crate::steps::step::Step;
use crate::utils::is_near_zero;

/// Runs Gauss-Jordan on the coefficient block only, mirroring every step onto
/// an identity matrix. Once the block is reduced the mirror holds its inverse
/// and the roots are `inverse * rhs`.
#[derive(Debug, Clone, Default)]
pub struct InverseMethod {
    counters: MethodCounters,
    stepper: GaussJordanStepper,
}

impl InverseMethod {
    pub fn new() -> InverseMethod {
        InverseMethod::default()
    }
}

impl Method for InverseMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::InverseMatrix
    }

    fn next_step(&mut self, workspace: &mut Workspace) -> Result<Option<Step>> {
        let Workspace::Inverse {
            adjusted, inverse, ..
        } = workspace
        else {
            return Err(SolverError::WorkspaceMismatch(MethodKind::InverseMatrix));
        };

        let step = self.stepper.next_step(adjusted, &mut self.counters)?;
        if let Some(step) = &step {
            let iterations = step.mirror(inverse)?;
            self.counters.iterations += iterations as u64;
        }
        Ok(step)
    }

    fn is_finished(&self) -> bool {
        self.stepper.is_finished()
    }

    fn solve(&mut self, workspace: &Workspace) -> Result<Solution> {
        let Workspace::Inverse {
            adjusted,
            inverse,
            rhs,
        } = workspace
        else {
            return Err(SolverError::WorkspaceMismatch(MethodKind::InverseMatrix));
        };

        for row in 0..adjusted.rows() {
            self.counters.iterations += 1;
            if is_near_zero(adjusted.get(row, row)?) {
                return Ok(Solution::NoneOrInfinite);
            }
        }

        let roots = inverse.mul_vector(rhs)?;
        self.counters.back_substitution_operations += (inverse.rows() * inverse.cols()) as u64;
        Ok(Solution::Unique(roots))
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
