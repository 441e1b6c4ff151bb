//! Kernel polynomial method for spectral densities.
//!
//! Expands the density of states in Chebyshev moments of the rescaled
//! Hamiltonian, built entirely from the sparse matvec:
//!
//! ```text
//! μ_n = Tr T_n(H̃),   H̃ = (H − b) / a
//! ```
//!
//! with `a`, `b` chosen from Gershgorin bounds so the spectrum fits in
//! (−1, 1). Gibbs oscillations are damped with the Jackson kernel. The
//! trace is taken exactly over unit vectors for small systems and
//! stochastically (seeded RNG, deterministic given the config) above the
//! cutoff. Resolution scales as spectral width over `num_moments`; no
//! linear solve or factorization is ever performed.

use std::f64::consts::PI;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lat_core::LatError;

use crate::results::Series;
use crate::sparse::Hamiltonian;

/// Safety margin keeping the rescaled spectrum strictly inside (−1, 1);
/// the Chebyshev expansion diverges at the interval edges.
const BOUND_PADDING: f64 = 0.01;

/// Errors from the kernel polynomial solver
#[derive(Debug, Error)]
pub enum KpmError {
    #[error("num_moments must be at least 2, got {0}")]
    TooFewMoments(usize),

    #[error("No energies requested")]
    EmptyEnergies,

    #[error("Requested orbital index {index} outside Hamiltonian of dimension {dim}")]
    IndexOutOfRange { index: usize, dim: usize },

    #[error("random_vectors must be at least 1 for the stochastic trace")]
    NoRandomVectors,
}

impl From<KpmError> for LatError {
    fn from(err: KpmError) -> Self {
        LatError::Config(err.to_string())
    }
}

/// Configuration for the kernel polynomial solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpmConfig {
    /// Expansion order; energy resolution is roughly spectral width / order
    pub num_moments: usize,
    /// Energies at which to reconstruct the density
    pub energies: Vec<f64>,
    /// Orbital indices for a local density; empty means the full trace
    pub sites: Vec<usize>,
    /// Below this dimension the trace runs exactly over all unit vectors
    pub exact_cutoff: usize,
    /// Number of stochastic trace vectors above the cutoff
    pub random_vectors: usize,
    /// RNG seed for the stochastic trace
    pub seed: u64,
}

impl KpmConfig {
    pub fn new(num_moments: usize, energies: Vec<f64>) -> Self {
        KpmConfig {
            num_moments,
            energies,
            sites: Vec::new(),
            exact_cutoff: 512,
            random_vectors: 8,
            seed: 0,
        }
    }
}

/// Spectral density over the configured energy grid.
///
/// With `sites` empty this is the total density of states; otherwise the
/// local density summed over the listed orbitals, computed deterministically
/// from unit start vectors.
pub fn solve(hamiltonian: &Hamiltonian, config: &KpmConfig) -> Result<Series, KpmError> {
    if config.num_moments < 2 {
        return Err(KpmError::TooFewMoments(config.num_moments));
    }
    if config.energies.is_empty() {
        return Err(KpmError::EmptyEnergies);
    }
    let dim = hamiltonian.dim();
    for &index in &config.sites {
        if index >= dim {
            return Err(KpmError::IndexOutOfRange { index, dim });
        }
    }

    let (scale, shift) = rescaling(hamiltonian);
    let moments = if !config.sites.is_empty() {
        local_moments(hamiltonian, config, scale, shift)
    } else if dim <= config.exact_cutoff {
        exact_trace_moments(hamiltonian, config, scale, shift)
    } else {
        stochastic_trace_moments(hamiltonian, config, scale, shift)?
    };

    let damped = jackson_damped(&moments);
    let values = config
        .energies
        .iter()
        .map(|&e| reconstruct(&damped, (e - shift) / scale) / scale)
        .collect();

    Ok(Series {
        energies: config.energies.clone(),
        values,
        label: if config.sites.is_empty() {
            "dos".to_string()
        } else {
            "ldos".to_string()
        },
    })
}

/// Gershgorin-disc spectral bounds, padded so the rescaled spectrum stays
/// strictly inside (−1, 1). Returns `(a, b)` with `H̃ = (H − b) / a`.
fn rescaling(hamiltonian: &Hamiltonian) -> (f64, f64) {
    let mut lower = f64::INFINITY;
    let mut upper = f64::NEG_INFINITY;
    for (row, row_vec) in hamiltonian.matrix().outer_iterator().enumerate() {
        let mut center = 0.0;
        let mut radius = 0.0;
        for (col, v) in row_vec.iter() {
            if col == row {
                center = v.re;
            } else {
                radius += v.norm();
            }
        }
        lower = lower.min(center - radius);
        upper = upper.max(center + radius);
    }
    let shift = 0.5 * (upper + lower);
    let mut half_width = 0.5 * (upper - lower);
    // A flat spectrum (all discs at one point) still needs a finite window.
    if half_width < 1e-12 {
        half_width = 1.0;
    }
    (half_width / (1.0 - BOUND_PADDING), shift)
}

/// Chebyshev moments `<start| T_n(H̃) |start>` for one start vector,
/// accumulated into `moments`.
fn accumulate_moments(
    hamiltonian: &Hamiltonian,
    start: &[Complex64],
    scale: f64,
    shift: f64,
    moments: &mut [f64],
) {
    let n = start.len();
    let mut t_prev = start.to_vec();
    let mut t_cur = vec![Complex64::new(0.0, 0.0); n];
    apply_rescaled(hamiltonian, &t_prev, scale, shift, &mut t_cur);

    moments[0] += dot(start, &t_prev).re;
    moments[1] += dot(start, &t_cur).re;

    let mut scratch = vec![Complex64::new(0.0, 0.0); n];
    for moment in moments.iter_mut().skip(2) {
        // T_{n+1} = 2 H̃ T_n − T_{n−1}
        apply_rescaled(hamiltonian, &t_cur, scale, shift, &mut scratch);
        for (next, &prev) in scratch.iter_mut().zip(&t_prev) {
            *next = 2.0 * *next - prev;
        }
        std::mem::swap(&mut t_prev, &mut t_cur);
        std::mem::swap(&mut t_cur, &mut scratch);
        *moment += dot(start, &t_cur).re;
    }
}

fn apply_rescaled(
    hamiltonian: &Hamiltonian,
    v: &[Complex64],
    scale: f64,
    shift: f64,
    out: &mut [Complex64],
) {
    hamiltonian.apply(v, out);
    let inv = 1.0 / scale;
    for (o, &vi) in out.iter_mut().zip(v) {
        *o = (*o - shift * vi) * inv;
    }
}

fn dot(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

fn unit_vector(dim: usize, index: usize) -> Vec<Complex64> {
    let mut v = vec![Complex64::new(0.0, 0.0); dim];
    v[index] = Complex64::new(1.0, 0.0);
    v
}

/// Local moments: unit start vectors at the requested orbitals, summed.
fn local_moments(
    hamiltonian: &Hamiltonian,
    config: &KpmConfig,
    scale: f64,
    shift: f64,
) -> Vec<f64> {
    let mut moments = vec![0.0; config.num_moments];
    for &site in &config.sites {
        let start = unit_vector(hamiltonian.dim(), site);
        accumulate_moments(hamiltonian, &start, scale, shift, &mut moments);
    }
    moments
}

/// Exact trace: one expansion per unit vector.
fn exact_trace_moments(
    hamiltonian: &Hamiltonian,
    config: &KpmConfig,
    scale: f64,
    shift: f64,
) -> Vec<f64> {
    let dim = hamiltonian.dim();
    let mut moments = vec![0.0; config.num_moments];
    for i in 0..dim {
        let start = unit_vector(dim, i);
        accumulate_moments(hamiltonian, &start, scale, shift, &mut moments);
    }
    moments
}

/// Stochastic trace over random-phase vectors: `E[r† A r] = Tr A` when each
/// component is a unit-modulus random phase. Deterministic given the seed.
fn stochastic_trace_moments(
    hamiltonian: &Hamiltonian,
    config: &KpmConfig,
    scale: f64,
    shift: f64,
) -> Result<Vec<f64>, KpmError> {
    if config.random_vectors == 0 {
        return Err(KpmError::NoRandomVectors);
    }
    let dim = hamiltonian.dim();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut moments = vec![0.0; config.num_moments];
    for _ in 0..config.random_vectors {
        let start: Vec<Complex64> = (0..dim)
            .map(|_| {
                let phase = rng.gen::<f64>() * 2.0 * PI;
                Complex64::new(phase.cos(), phase.sin())
            })
            .collect();
        accumulate_moments(hamiltonian, &start, scale, shift, &mut moments);
    }
    let inv = 1.0 / config.random_vectors as f64;
    for m in moments.iter_mut() {
        *m *= inv;
    }
    Ok(moments)
}

/// Jackson kernel coefficients applied to the raw moments.
fn jackson_damped(moments: &[f64]) -> Vec<f64> {
    let m = moments.len() as f64;
    moments
        .iter()
        .enumerate()
        .map(|(n, &mu)| {
            let x = PI * n as f64 / (m + 1.0);
            let g = ((m - n as f64 + 1.0) * x.cos() + x.sin() / (PI / (m + 1.0)).tan())
                / (m + 1.0);
            mu * g
        })
        .collect()
}

/// Chebyshev series reconstruction at a rescaled energy. Zero outside the
/// expansion interval.
fn reconstruct(damped: &[f64], x: f64) -> f64 {
    if x.abs() >= 1.0 {
        return 0.0;
    }
    let theta = x.acos();
    let mut sum = damped[0];
    for (n, &mu) in damped.iter().enumerate().skip(1) {
        sum += 2.0 * mu * (n as f64 * theta).cos();
    }
    sum / (PI * (1.0 - x * x).sqrt())
}
