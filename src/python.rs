use crate::benchmark;
use crate::config::{BenchmarkConfig, SessionConfig};
use crate::error::SolverError;
use crate::methods::method::MethodKind;
use crate::session::session::Session;
use crate::utils;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use serde::Serialize;
use std::str::FromStr;

impl From<SolverError> for PyErr {
    fn from(err: SolverError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyValueError::new_err(e.to_string()))
}

fn parse_method(name: &str) -> PyResult<MethodKind> {
    MethodKind::from_str(name)
        .map_err(|_| PyValueError::new_err(format!("Unknown method {}", name)))
}

/// Structured values (steps, snapshots, results) are handed over as JSON.
#[pyclass(name = "SolverSession")]
pub struct PySolverSession {
    inner: Session,
}

#[pymethods]
impl PySolverSession {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => SessionConfig::from_json(json)?,
            None => SessionConfig::default(),
        };
        Ok(PySolverSession {
            inner: Session::new(config),
        })
    }

    #[getter]
    fn method(&self) -> Option<String> {
        self.inner.method().map(|kind| kind.to_string())
    }

    fn set_method(&mut self, name: &str) -> PyResult<()> {
        self.inner.set_method(parse_method(name)?);
        Ok(())
    }

    fn set_matrix(&mut self, lines: Vec<Vec<f64>>) -> PyResult<()> {
        Ok(self.inner.set_matrix(lines)?)
    }

    fn set_cell(&mut self, row: usize, col: usize, value: f64) -> PyResult<()> {
        Ok(self.inner.set_cell(row, col, value)?)
    }

    /// JSON of the step just applied, `None` once the reduction is over.
    fn next_step(&mut self) -> PyResult<Option<String>> {
        match self.inner.next_step()? {
            Some(step) => Ok(Some(to_json(&step)?)),
            None => Ok(None),
        }
    }

    fn previous_step(&mut self) -> PyResult<String> {
        to_json(&self.inner.previous_step()?)
    }

    fn skip_to_end(&mut self) -> PyResult<String> {
        to_json(&self.inner.skip_to_end()?)
    }

    fn skip_to_start(&mut self) -> PyResult<String> {
        to_json(&self.inner.skip_to_start()?)
    }

    fn current_matrix(&self) -> PyResult<String> {
        to_json(&self.inner.current_matrix()?)
    }

    fn result(&mut self) -> PyResult<String> {
        to_json(&self.inner.result()?.to_report())
    }

    fn steps(&self) -> PyResult<String> {
        to_json(&self.inner.steps())
    }

    #[getter]
    fn cursor(&self) -> Option<usize> {
        self.inner.cursor()
    }

    #[getter]
    fn state(&self) -> PyResult<String> {
        to_json(&self.inner.state())
    }

    fn seek(&mut self, position: usize) -> PyResult<()> {
        Ok(self.inner.seek(position)?)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn counters(&self) -> PyResult<String> {
        to_json(&self.inner.counters()?)
    }

    fn __repr__(&self) -> String {
        format!(
            "SolverSession(method={:?}, state={:?}, cursor={:?})",
            self.inner.method(),
            self.inner.state(),
            self.inner.cursor()
        )
    }
}

#[pyfunction]
#[pyo3(signature = (rows, cols, low=-10.0, high=10.0, precision=2))]
fn generate_random_matrix(
    rows: usize,
    cols: usize,
    low: f64,
    high: f64,
    precision: u32,
) -> PyResult<Vec<Vec<f64>>> {
    Ok(utils::generate_random_matrix(
        rows, cols, low, high, precision,
    )?)
}

/// Runs the benchmark described by `config_json`, releasing the GIL meanwhile.
#[pyfunction]
#[pyo3(signature = (config_json=None))]
fn compare_methods(py: Python, config_json: Option<&str>) -> PyResult<String> {
    let config = match config_json {
        Some(json) => BenchmarkConfig::from_json(json)?,
        None => BenchmarkConfig::default(),
    };
    let records = py.allow_threads(|| benchmark::compare_methods(&config))?;
    to_json(&records)
}

#[pyfunction]
#[pyo3(signature = (level="info"))]
fn init_logging(level: &str) -> PyResult<()> {
    Ok(utils::init_logging(level)?)
}

/// A Python module implemented in Rust.
#[pymodule]
fn slae_stepper(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySolverSession>()?;
    m.add_function(wrap_pyfunction!(generate_random_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(compare_methods, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    Ok(())
}
