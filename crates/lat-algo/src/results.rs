//! Result containers handed across the binding boundary.
//!
//! All results are plain value objects: immutable once produced, owned by
//! the caller, built from flat numeric arrays so a foreign binding layer
//! can view them without copies.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Dense eigenvector matrix, column-major: column `k` is the eigenvector
/// belonging to `eigenvalues[k]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenVectors {
    pub dim: usize,
    pub columns: Vec<Complex64>,
}

impl EigenVectors {
    /// Eigenvector `k` as a slice.
    pub fn column(&self, k: usize) -> &[Complex64] {
        &self.columns[k * self.dim..(k + 1) * self.dim]
    }
}

/// Eigenvalues (ascending) and, optionally, orthonormal eigenvectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenResult {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Option<EigenVectors>,
}

impl EigenResult {
    /// Lorentzian-broadened spectral density over an energy grid:
    /// `ρ(E) = Σ_n (η/π) / ((E − ε_n)² + η²)`.
    ///
    /// This is exactly what `-Im Tr G(E + iη) / π` evaluates to, which
    /// makes it the dense-side reference for cross-validating the
    /// Green's-function solvers.
    pub fn dos(&self, energies: &[f64], broadening: f64) -> Series {
        let values = energies
            .iter()
            .map(|&e| {
                self.eigenvalues
                    .iter()
                    .map(|&ev| {
                        let d = e - ev;
                        broadening / std::f64::consts::PI / (d * d + broadening * broadening)
                    })
                    .sum()
            })
            .collect();
        Series {
            energies: energies.to_vec(),
            values,
            label: "dos".to_string(),
        }
    }
}

/// A scalar observable sampled over an energy grid (DOS, LDOS, and other
/// observable-versus-energy curves share this container).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub energies: Vec<f64>,
    pub values: Vec<f64>,
    pub label: String,
}

/// Local Green's function values `G_ii(E + iη)` for the requested matrix
/// indices, energy-major: `values[e * sites.len() + s]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreensResult {
    pub energies: Vec<f64>,
    /// Requested Hamiltonian (orbital) indices
    pub sites: Vec<usize>,
    pub values: Vec<Complex64>,
}

impl GreensResult {
    /// `G_ii(E)` for the `s`-th requested index, over all energies.
    pub fn site_values(&self, s: usize) -> impl Iterator<Item = Complex64> + '_ {
        let stride = self.sites.len();
        self.energies
            .iter()
            .enumerate()
            .map(move |(e, _)| self.values[e * stride + s])
    }

    /// Local density of states `-Im G_ii / π` for the `s`-th requested index.
    pub fn ldos(&self, s: usize) -> Series {
        Series {
            energies: self.energies.clone(),
            values: self
                .site_values(s)
                .map(|g| -g.im / std::f64::consts::PI)
                .collect(),
            label: format!("ldos[{}]", self.sites[s]),
        }
    }
}

/// Output of a solver strategy evaluation.
#[derive(Debug, Clone)]
pub enum Observable {
    Spectrum(EigenResult),
    Series(Series),
    Greens(GreensResult),
}

impl Observable {
    pub fn as_spectrum(&self) -> Option<&EigenResult> {
        match self {
            Observable::Spectrum(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Observable::Series(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_greens(&self) -> Option<&GreensResult> {
        match self {
            Observable::Greens(r) => Some(r),
            _ => None,
        }
    }
}

/// Evenly spaced energy grid, inclusive of both ends.
pub fn energy_grid(min: f64, max: f64, points: usize) -> Vec<f64> {
    if points <= 1 {
        return vec![min];
    }
    let step = (max - min) / (points - 1) as f64;
    (0..points).map(|i| min + step * i as f64).collect()
}
