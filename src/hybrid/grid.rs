//! Building new hybrid vertical grids
//!
//! These produce candidate `ak`/`bk` coefficients (or the sigma values and
//! transition factors used to design them). Feed the result to
//! [`HybridCoefficients::new`] to check it before use.

use std::f64::consts::FRAC_PI_2;

use log::debug;
use ndarray::{Array1, ArrayView1};

use crate::error::VerticalError;
use crate::hybrid::HybridCoefficients;

/// Sigma values for a grid that gets coarser with altitude.
///
/// Returns `num_levels + 1` values, from the top to the surface (which is
/// always 1). `n_scale_heights` is the number of scale heights to the model
/// top (12.5 is roughly 100 km with an 8 km scale height), `surf_res` is the
/// resolution at the surface, and a larger `exponent` thickens the upper
/// layers faster. With `zero_top`, the top value is forced to 0.
pub fn uneven_sigma(
    num_levels: usize,
    n_scale_heights: f64,
    surf_res: f64,
    exponent: f64,
    zero_top: bool,
) -> Array1<f64> {
    let mut sigma: Array1<f64> = (0..=num_levels)
        .map(|k| {
            let zeta = 1.0 - k as f64 / num_levels as f64;
            let z = surf_res * zeta + (1.0 - surf_res) * zeta.powf(exponent);
            f64::exp(-z * n_scale_heights)
        })
        .collect();

    sigma[num_levels] = 1.0;
    if zero_top {
        sigma[0] = 0.0;
    }
    sigma
}

/// Factor blending a sigma grid into a pure pressure grid.
///
/// For each pressure in `pfull`, this is 1 from `p_sigma` down to the surface
/// (pure sigma), 0 from `p_press` up to the top (pure pressure), and `sin²`
/// shaped in between.
/// Both bounds are in the same units as `pfull`; the usual choice is
/// [`DEFAULT_P_SIGMA`] and [`DEFAULT_P_PRESS`] applied to a normalized
/// pressure.
pub fn transition(pfull: ArrayView1<'_, f64>, p_sigma: f64, p_press: f64) -> Array1<f64> {
    pfull.mapv(|p| {
        if p <= p_press {
            0.0
        } else if p >= p_sigma {
            1.0
        } else {
            let x = (p - p_press) / (p_sigma - p_press);
            f64::sin(FRAC_PI_2 * x).powi(2)
        }
    })
}

/// Lower bound of the pure sigma region for [`transition`].
pub const DEFAULT_P_SIGMA: f64 = 0.1;

/// Upper bound of the pure pressure region for [`transition`].
pub const DEFAULT_P_PRESS: f64 = 0.05;

/// Coefficients built by [`swinbank`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwinbankLevels {
    /// Pressure coefficient in Pa at each half level.
    pub ak: Array1<f64>,
    /// Sigma coefficient at each half level.
    pub bk: Array1<f64>,
    /// Index of the first level with a nonzero `bk`. Every level above it is
    /// pure pressure.
    pub ks: usize,
}

impl SwinbankLevels {
    /// Validate the coefficients as a hybrid grid.
    pub fn to_coefficients(&self) -> Result<HybridCoefficients, VerticalError> {
        HybridCoefficients::new(&self.ak.to_vec(), &self.bk.to_vec())
    }
}

/// Hybrid coefficients with a smooth transition from pressure to sigma levels,
/// using Swinbank's formula.
///
/// `plev` are the target half-level pressures in Pa at a surface pressure
/// `psfc` in Pa, ordered from the top to the surface. Levels near and above
/// the transition pressure `ptrans` (Pa) are pure pressure.
pub fn swinbank(
    plev: ArrayView1<'_, f64>,
    psfc: f64,
    ptrans: f64,
) -> Result<SwinbankLevels, VerticalError> {
    let num_levels = plev.len();
    if num_levels < 2 {
        return Err(VerticalError::InvalidCoefficients(format!(
            "at least two pressure levels are needed, got {num_levels}"
        )));
    }
    let last = num_levels - 1;

    // Closest level to the transition pressure
    let ktrans = plev
        .iter()
        .map(|p| (p - ptrans).abs())
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_dist), (k, dist)| {
            if dist < best_dist {
                (k, dist)
            } else {
                (best, best_dist)
            }
        })
        .0;
    if ktrans + 1 > last {
        return Err(VerticalError::InvalidCoefficients(format!(
            "transition pressure {ptrans} Pa leaves no hybrid levels"
        )));
    }

    let eta = plev.mapv(|p| p / psfc);
    let ep = eta[ktrans + 1];
    let es = eta[last];
    let denom = (es - ep).powi(2);
    let alpha = (ep.powi(2) - 2.0 * ep * es) / denom;
    let beta = 2.0 * ep * es.powi(2) / denom;
    let gamma = -(ep * es).powi(2) / denom;

    let mut ak = eta.mapv(|eta| eta * psfc);
    let mut bk = Array1::zeros(num_levels);
    for k in ktrans + 1..last {
        ak[k] = (alpha * eta[k] + beta + gamma / eta[k]) * psfc;
        // Analytically 0 at the first hybrid level, keep rounding from going
        // negative there
        bk[k] = ((plev[k] - ak[k]) / psfc).max(0.0);
    }
    ak[last] = 0.0;
    bk[last] = 1.0;

    // bk[last] is 1, so this always finds something
    let ks = bk.iter().position(|&bk| bk != 0.0).unwrap_or(last);
    debug!("swinbank grid: {num_levels} levels, transition at {ktrans}, ks = {ks}");

    Ok(SwinbankLevels { ak, bk, ks })
}
