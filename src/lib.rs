pub mod matrix {
    pub mod matrix;
}
pub mod methods {
    pub mod gauss;
    pub mod gauss_jordan;
    pub mod inverse;
    pub mod method;
}
pub mod session {
    pub mod session;
}
pub mod solution {
    pub mod solution;
}
pub mod steps {
    pub mod step;
}

pub mod benchmark;
pub mod config;
pub mod error;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use error::{Result, SolverError};
pub use matrix::matrix::Matrix;
pub use methods::method::{create_method, solve_system, Method, MethodCounters, MethodKind};
pub use session::session::{MatrixSnapshot, Session, SessionState};
pub use solution::solution::{Solution, SolutionKind};
pub use steps::step::{Step, StepKind, StepMetadata};
