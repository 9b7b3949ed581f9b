//! Noise injection and uniform box priors.
//!
//! Purpose
//! -------
//! Provide the two stochastic collaborators the inversion engine consumes:
//! Gaussian measurement-noise injection ([`GaussianNoise`]) and uniform
//! box sampling around a reference parameter vector ([`UniformBox`]). Both
//! draw from a caller-supplied RNG so the engine stays reproducible from a
//! single seed.
//!
//! Key behaviors
//! -------------
//! - [`GaussianNoise::perturb`] adds independent `Normal(0, noise_level)`
//!   draws elementwise to a mutable slice of values.
//! - [`UniformBox::around`] builds a per-parameter `[lo, hi]` box centered
//!   on a reference vector with difficulty-scaled half-widths, clipped to
//!   optional parameter bounds; [`UniformBox::sample`] draws a table of
//!   independent uniform rows from it.
//!
//! Invariants & assumptions
//! ------------------------
//! - Noise levels are strictly positive and finite; degenerate levels are
//!   rejected with [`SamplerError::NonPositiveNoise`] rather than panicking
//!   inside `statrs`.
//! - Box construction guarantees `lo < hi` per coordinate; clipping that
//!   inverts a coordinate's interval is rejected with
//!   [`SamplerError::DegenerateBox`].
//!
//! Conventions
//! -----------
//! - A zero-centered coordinate falls back to a half-width equal to the
//!   scale factor itself, so the box never collapses at the origin.
//! - Sample tables are row-major: one draw per row, one parameter per
//!   column.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::distributions::Distribution;
use statrs::distribution::{Normal, Uniform};

/// Result alias for sampler operations that may produce [`SamplerError`].
pub type SamplerResult<T> = Result<T, SamplerError>;

/// Error type for noise injection and box sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplerError {
    /// Noise level must be finite and strictly positive.
    NonPositiveNoise { value: f64 },

    /// A box coordinate collapsed or inverted after clipping.
    DegenerateBox { index: usize, lo: f64, hi: f64 },

    /// The reference vector for a box was empty.
    EmptyCenter,

    /// Clipping bounds do not span every box coordinate.
    BoundsLengthMismatch { expected: usize, actual: usize },
}

impl std::error::Error for SamplerError {}

impl std::fmt::Display for SamplerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerError::NonPositiveNoise { value } => {
                write!(f, "Sampler Error: noise level must be finite and > 0 (got {})", value)
            }
            SamplerError::DegenerateBox { index, lo, hi } => write!(
                f,
                "Sampler Error: box coordinate {} degenerate after clipping ([{}, {}])",
                index, lo, hi
            ),
            SamplerError::EmptyCenter => {
                write!(f, "Sampler Error: box center must contain at least one parameter")
            }
            SamplerError::BoundsLengthMismatch { expected, actual } => write!(
                f,
                "Sampler Error: clipping bounds of length {} do not span {} box coordinates",
                actual, expected
            ),
        }
    }
}

/// Gaussian measurement-noise injector.
///
/// Stateless; every call validates the noise level and draws from the
/// provided RNG. Mirrors the contract that `trajectory` values are
/// perturbed independently per element.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianNoise;

impl GaussianNoise {
    /// Add independent `Normal(0, noise_level)` draws to `values` in place.
    ///
    /// Parameters
    /// ----------
    /// - `values`: mutable slice of readings to perturb.
    /// - `noise_level`: standard deviation of the injected noise; must be
    ///   finite and strictly positive.
    /// - `rng`: RNG supplying the draws.
    ///
    /// Errors
    /// ------
    /// - `SamplerError::NonPositiveNoise` when `noise_level` is not finite
    ///   or not strictly positive.
    pub fn perturb<R: Rng + ?Sized>(
        values: &mut [f64],
        noise_level: f64,
        rng: &mut R,
    ) -> SamplerResult<()> {
        if !noise_level.is_finite() || noise_level <= 0.0 {
            return Err(SamplerError::NonPositiveNoise { value: noise_level });
        }
        let dist = Normal::new(0.0, noise_level)
            .map_err(|_| SamplerError::NonPositiveNoise { value: noise_level })?;
        for v in values.iter_mut() {
            *v += dist.sample(rng);
        }
        Ok(())
    }
}

/// Per-parameter uniform box prior.
///
/// Purpose
/// -------
/// Represent the difficulty-scaled uniform prior the controllers reset to
/// on initialization and on a suspected parameter shift: a box centered on
/// the reference (true) parameter vector whose half-widths scale with a
/// difficulty factor, optionally clipped to hard parameter bounds.
///
/// Fields
/// ------
/// - `lo`, `hi`: per-parameter interval endpoints with `lo[i] < hi[i]`.
///
/// Invariants
/// ----------
/// - `lo.len() == hi.len() > 0` and `lo[i] < hi[i]` for every coordinate,
///   enforced at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBox {
    /// Lower endpoint per parameter.
    pub lo: Array1<f64>,
    /// Upper endpoint per parameter.
    pub hi: Array1<f64>,
}

impl UniformBox {
    /// Build a box centered on `center` with half-width `scale * |center_i|`
    /// per coordinate (falling back to `scale` where `center_i == 0`),
    /// clipped to optional `(mins, maxs)` bounds.
    ///
    /// Errors
    /// ------
    /// - `SamplerError::EmptyCenter` when `center` has no entries.
    /// - `SamplerError::BoundsLengthMismatch` when `bounds` does not span
    ///   every coordinate of `center`.
    /// - `SamplerError::DegenerateBox` when clipping inverts or collapses a
    ///   coordinate's interval.
    pub fn around(
        center: &Array1<f64>,
        scale: f64,
        bounds: Option<(&Array1<f64>, &Array1<f64>)>,
    ) -> SamplerResult<Self> {
        if center.is_empty() {
            return Err(SamplerError::EmptyCenter);
        }
        let n = center.len();
        if let Some((mins, maxs)) = bounds {
            if mins.len() != n || maxs.len() != n {
                return Err(SamplerError::BoundsLengthMismatch {
                    expected: n,
                    actual: mins.len().min(maxs.len()),
                });
            }
        }
        let mut lo = Array1::zeros(n);
        let mut hi = Array1::zeros(n);
        for i in 0..n {
            let c = center[i];
            let half = if c == 0.0 { scale } else { scale * c.abs() };
            let mut l = c - half;
            let mut h = c + half;
            if let Some((mins, maxs)) = bounds {
                l = l.max(mins[i]);
                h = h.min(maxs[i]);
            }
            if !(l.is_finite() && h.is_finite()) || l >= h {
                return Err(SamplerError::DegenerateBox { index: i, lo: l, hi: h });
            }
            lo[i] = l;
            hi[i] = h;
        }
        Ok(UniformBox { lo, hi })
    }

    /// Number of parameters the box spans.
    pub fn n_params(&self) -> usize {
        self.lo.len()
    }

    /// Draw a `count x n_params` table of independent uniform rows.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> SamplerResult<Array2<f64>> {
        let n = self.n_params();
        let mut out = Array2::zeros((count, n));
        for j in 0..n {
            let dist = Uniform::new(self.lo[j], self.hi[j])
                .map_err(|_| SamplerError::DegenerateBox { index: j, lo: self.lo[j], hi: self.hi[j] })?;
            for i in 0..count {
                out[[i, j]] = dist.sample(rng);
            }
        }
        Ok(out)
    }
}
