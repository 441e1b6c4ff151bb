//! Sweep specification: which parameters vary, over which values, and how
//! the combinations are enumerated.
//!
//! A [`SweepSpec`] is validated once at construction and read-only during
//! execution. Point enumeration is row-major with the last parameter
//! varying fastest, so cell `index` always maps to the same coordinates
//! and parameter values no matter which worker evaluates it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lat_core::{LatError, Params};

/// Errors from sweep specification validation
#[derive(Debug, Error)]
pub enum SweepSpecError {
    #[error("Sweep has no parameters")]
    NoParameters,

    #[error("Sweep parameter name cannot be blank")]
    BlankParameterName,

    #[error("Duplicate sweep parameter '{0}'")]
    DuplicateParameter(String),

    #[error("Sweep parameter '{0}' has no values")]
    EmptyValues(String),

    #[error(
        "Zipped sweep requires equal value counts: '{first_name}' has {first_len}, '{name}' has {len}"
    )]
    ZippedLengthMismatch {
        first_name: String,
        first_len: usize,
        name: String,
        len: usize,
    },
}

impl From<SweepSpecError> for LatError {
    fn from(err: SweepSpecError) -> Self {
        LatError::Config(err.to_string())
    }
}

/// One swept parameter and the values it takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepParameter {
    pub name: String,
    pub values: Vec<f64>,
}

impl SweepParameter {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        SweepParameter {
            name: name.into(),
            values,
        }
    }
}

/// How parameter value lists combine into sweep points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Full cross product of all value lists.
    Cartesian,
    /// Value lists advance in lockstep; all must have equal length.
    Zipped,
}

/// A validated set of sweep parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSpec {
    parameters: Vec<SweepParameter>,
    mode: SweepMode,
}

impl SweepSpec {
    /// Validate and freeze a sweep specification.
    pub fn new(parameters: Vec<SweepParameter>, mode: SweepMode) -> Result<Self, SweepSpecError> {
        if parameters.is_empty() {
            return Err(SweepSpecError::NoParameters);
        }
        for (i, p) in parameters.iter().enumerate() {
            if p.name.trim().is_empty() {
                return Err(SweepSpecError::BlankParameterName);
            }
            if p.values.is_empty() {
                return Err(SweepSpecError::EmptyValues(p.name.clone()));
            }
            if parameters[..i].iter().any(|q| q.name == p.name) {
                return Err(SweepSpecError::DuplicateParameter(p.name.clone()));
            }
        }
        if mode == SweepMode::Zipped {
            let first = &parameters[0];
            for p in &parameters[1..] {
                if p.values.len() != first.values.len() {
                    return Err(SweepSpecError::ZippedLengthMismatch {
                        first_name: first.name.clone(),
                        first_len: first.values.len(),
                        name: p.name.clone(),
                        len: p.values.len(),
                    });
                }
            }
        }
        Ok(SweepSpec { parameters, mode })
    }

    pub fn parameters(&self) -> &[SweepParameter] {
        &self.parameters
    }

    pub fn mode(&self) -> SweepMode {
        self.mode
    }

    /// Grid extent per axis: one axis per parameter under `Cartesian`, a
    /// single axis under `Zipped`.
    pub fn shape(&self) -> Vec<usize> {
        match self.mode {
            SweepMode::Cartesian => self.parameters.iter().map(|p| p.values.len()).collect(),
            SweepMode::Zipped => vec![self.parameters[0].values.len()],
        }
    }

    /// Total number of sweep points.
    pub fn num_points(&self) -> usize {
        self.shape().iter().product()
    }

    /// Decode a flat point index into grid coordinates and the parameter
    /// values at that point. Row-major: the last parameter varies fastest.
    pub fn point(&self, index: usize) -> (Vec<usize>, Params) {
        let mut params = Params::new();
        match self.mode {
            SweepMode::Cartesian => {
                let shape = self.shape();
                let mut coords = vec![0; shape.len()];
                let mut rest = index;
                for axis in (0..shape.len()).rev() {
                    coords[axis] = rest % shape[axis];
                    rest /= shape[axis];
                }
                for (p, &c) in self.parameters.iter().zip(&coords) {
                    params.insert(p.name.clone(), p.values[c]);
                }
                (coords, params)
            }
            SweepMode::Zipped => {
                for p in &self.parameters {
                    params.insert(p.name.clone(), p.values[index]);
                }
                (vec![index], params)
            }
        }
    }
}
