use crate::error::{Result, SolverError};
use crate::methods::method::MethodKind;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::IntoEnumIterator;

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| SolverError::Config(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Largest system (number of equations) a session accepts.
    pub max_unknowns: usize,
    /// Bound as soon as a matrix arrives, unless a method was set explicitly.
    pub default_method: Option<MethodKind>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_unknowns: 64,
            default_method: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = from_json(json)?;
        if config.max_unknowns == 0 {
            return Err(SolverError::Config("maxUnknowns must be positive".into()));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomMatrixConfig {
    pub low: f64,
    pub high: f64,
    pub precision: u32,
}

impl Default for RandomMatrixConfig {
    fn default() -> Self {
        RandomMatrixConfig {
            low: -10.0,
            high: 10.0,
            precision: 2,
        }
    }
}

impl RandomMatrixConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.low < self.high) {
            return Err(SolverError::InvalidRange {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BenchmarkConfig {
    pub methods: Vec<MethodKind>,
    pub sizes: Vec<usize>,
    pub times_per_size: usize,
    pub generation: RandomMatrixConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            methods: MethodKind::iter().collect(),
            sizes: vec![2, 4, 8, 16],
            times_per_size: 10,
            generation: RandomMatrixConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BenchmarkConfig = from_json(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sizes.contains(&0) {
            return Err(SolverError::Config("sizes must be positive".into()));
        }
        if self.times_per_size == 0 {
            return Err(SolverError::Config("timesPerSize must be positive".into()));
        }
        self.generation.validate()
    }
}

// --------------------------------------------------
//                      TESTS
// --------------------------------------------------
