//! Meridional mass streamfunction
//!
//! ```text
//!                                Z_top
//!                               ⌠
//!  Psi = (2 pi a) cos(lat) p0 / (g H) ⎮ v exp(-Z/H) dZ
//!                               ⌡
//!                               Z
//! ```
//!
//! The integral runs in log-pressure pseudo-height `Z = H ln(p0 / p)`, or
//! directly in altitude when the winds are already on altitude levels. It is
//! evaluated with the trapezoidal rule from the top of the column down.

use std::f64::consts::PI;
use std::str::FromStr;

use log::debug;
use ndarray::{Array2, ArrayD, ArrayViewD, Zip};
use smallvec::SmallVec;

use crate::columns::{as_columns, into_field};
use crate::error::VerticalError;
use crate::log_pressure::pseudo_altitude;
use crate::planet::Planet;

/// Vertical coordinate the winds were interpolated onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalCoordinate {
    /// Standard pressure levels in Pa
    Pstd,
    /// Standard altitude levels in m
    Zstd,
    /// Altitude above ground level in m
    Zagl,
}

impl FromStr for VerticalCoordinate {
    type Err = VerticalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pstd" => Ok(Self::Pstd),
            "zstd" => Ok(Self::Zstd),
            "zagl" => Ok(Self::Zagl),
            _ => Err(VerticalError::InvalidLevelType(s.to_string())),
        }
    }
}

/// Parameters for [`mass_streamfunction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamfunctionParams {
    pub coordinate: VerticalCoordinate,
    /// Reference surface pressure in Pa.
    pub reference_pressure: f64,
    /// Reference scale height in m.
    pub scale_height: f64,
    /// Normalization of the result; 1 gives kg/s.
    pub factor: f64,
}

impl Default for StreamfunctionParams {
    fn default() -> Self {
        Self {
            coordinate: VerticalCoordinate::Pstd,
            reference_pressure: 700.,
            scale_height: 8000.,
            factor: 1.0e-8,
        }
    }
}

/// Compute the meridional mass streamfunction in `factor` kg/s.
///
/// `v_avg` is the (usually zonally and time averaged) meridional wind in m/s
/// with the vertical axis first and latitude second, e.g. `(lev, lat)` or
/// `(lev, lat, lon, time)`; the averaging may be done before or after this
/// call. `lat` is in degrees and `level` holds the coordinate of each level,
/// ordered from the surface (index 0) to the top.
///
/// The result has the same shape as `v_avg`. The first and last two levels
/// are 0, and it's NaN wherever `v_avg` is NaN. NaN winds count as 0 in the
/// integral.
pub fn mass_streamfunction(
    v_avg: ArrayViewD<'_, f64>,
    lat: &[f64],
    level: &[f64],
    params: &StreamfunctionParams,
    planet: &Planet,
) -> Result<ArrayD<f64>, VerticalError> {
    if v_avg.ndim() < 2 || v_avg.shape()[0] != level.len() || v_avg.shape()[1] != lat.len() {
        return Err(VerticalError::shape_mismatch(
            format!("winds shaped ({}, {}, ...)", level.len(), lat.len()),
            format!("{:?}", v_avg.shape()),
        ));
    }

    let num_levels = level.len();
    let scale_height = params.scale_height;
    let z: SmallVec<[f64; 64]> = match params.coordinate {
        VerticalCoordinate::Pstd => level
            .iter()
            .map(|&p| pseudo_altitude(p, scale_height, params.reference_pressure))
            .collect(),
        VerticalCoordinate::Zstd | VerticalCoordinate::Zagl => level.iter().copied().collect(),
    };

    let v_columns = as_columns(&v_avg)?;
    // Consecutive columns share a latitude
    let per_lat = v_columns.ncols() / lat.len().max(1);
    let norm = 2.0 * PI * planet.radius * params.reference_pressure
        / (planet.gravity * scale_height)
        * params.factor;
    debug!(
        "mass streamfunction on {:?}: {num_levels} levels, {} latitudes, {} columns",
        params.coordinate,
        lat.len(),
        v_columns.ncols()
    );

    let mut msf = Array2::zeros(v_columns.raw_dim());
    Zip::indexed(msf.columns_mut())
        .and(v_columns.columns())
        .par_for_each(|j, mut msf, v| {
            let weight = norm * lat[j / per_lat].to_radians().cos();
            let f: SmallVec<[f64; 64]> = v
                .iter()
                .zip(&z)
                .map(|(&v, &z)| {
                    let v = if v.is_nan() { 0.0 } else { v };
                    v * (-z / scale_height).exp()
                })
                .collect();

            // Running trapezoidal sum from the top, which is 0 at num_levels - 2
            let mut integral = 0.0;
            for k0 in (1..num_levels.saturating_sub(2)).rev() {
                let (k, kp1) = (k0 + 1, k0 + 2);
                integral += 0.5 * (z[kp1] - z[k]) * (f[kp1] + f[k]);
                msf[k0] = weight * integral;
            }

            for (msf, v) in msf.iter_mut().zip(&v) {
                if v.is_nan() {
                    *msf = f64::NAN;
                }
            }
        });

    into_field(msf, v_avg.shape())
}
