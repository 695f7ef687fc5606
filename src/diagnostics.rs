//! Diagnostics on fields that are already on standard levels
//!
//! Polar warming, zonal anomalies, and the Gaussian line shape used to build
//! idealized topography.

use std::f64::consts::{LN_2, PI};

use log::debug;
use ndarray::{s, Array2, ArrayD, ArrayView1, ArrayViewD, ArrayViewMut1, Axis, Zip};

use crate::columns::{as_columns, into_field};
use crate::error::VerticalError;

/// Gaussian line shape at `x`, centered on `x0` with half width at half
/// maximum `alpha`. The profile integrates to 1 over `x`.
#[inline]
pub fn gauss_profile(x: f64, alpha: f64, x0: f64) -> f64 {
    (LN_2 / PI).sqrt() / alpha * (-((x - x0) / alpha).powi(2) * LN_2).exp()
}

/// Subtract the zonal mean along the last axis, e.g. `(time, lev, lat, lon)`.
///
/// NaN values are left out of the mean and stay NaN. A row that is all NaN
/// (below the surface or above the top on interpolated levels) stays all NaN.
pub fn zonal_detrend(var: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, VerticalError> {
    let zonal = var
        .ndim()
        .checked_sub(1)
        .map(Axis)
        .ok_or_else(|| VerticalError::shape_mismatch("an array with a zonal axis", "a scalar"))?;

    let mut anomaly = var.to_owned();
    Zip::from(anomaly.lanes_mut(zonal)).par_for_each(|mut row| {
        let (sum, count) = row
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0_usize), |(sum, count), &v| (sum + v, count + 1));
        let mean = if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        };
        row.mapv_inplace(|v| v - mean);
    });
    Ok(anomaly)
}

/// Polar warming in K, following McDunn et al. (2013).
///
/// `t` is the temperature with latitude as the FIRST axis and `lat` the
/// latitudes in degrees, ordered from south to north. The first half of the
/// latitudes is treated as the southern hemisphere and the rest as the
/// northern one. Within each hemisphere and column, the warming is the
/// temperature above the hemisphere's minimum, and it's only defined between
/// the latitude of the minimum and the latitude of the maximum. Outside that
/// band the result is `outside_range` (NaN or 0 are the usual choices).
///
/// NaN temperatures are skipped when looking for the extremes. A hemisphere
/// column with no valid temperature is all NaN.
pub fn polar_warming(
    t: ArrayViewD<'_, f64>,
    lat: &[f64],
    outside_range: f64,
) -> Result<ArrayD<f64>, VerticalError> {
    if t.ndim() == 0 || t.shape()[0] != lat.len() {
        return Err(VerticalError::shape_mismatch(
            format!("temperature with {} latitudes first", lat.len()),
            format!("{:?}", t.shape()),
        ));
    }
    let t_columns = as_columns(&t)?;
    let equator = lat.len() / 2;
    debug!(
        "polar warming over {} latitudes, {} columns",
        lat.len(),
        t_columns.ncols()
    );

    let mut warming = Array2::zeros(t_columns.raw_dim());
    for (rows, lat) in [(0..equator, &lat[..equator]), (equator..lat.len(), &lat[equator..])] {
        Zip::from(warming.slice_mut(s![rows.clone(), ..]).columns_mut())
            .and(t_columns.slice(s![rows, ..]).columns())
            .par_for_each(|warming, t| hemisphere_warming(t, lat, outside_range, warming));
    }

    into_field(warming, t.shape())
}

fn hemisphere_warming(
    t: ArrayView1<'_, f64>,
    lat: &[f64],
    outside_range: f64,
    mut warming: ArrayViewMut1<'_, f64>,
) {
    // First index wins on a tie
    let extreme = |replaces: fn(f64, f64) -> bool| {
        t.iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
                Some((_, best_v)) if !replaces(v, best_v) => best,
                _ => Some((i, v)),
            })
    };
    let (Some((i_min, t_min)), Some((i_max, _))) = (extreme(|v, b| v < b), extreme(|v, b| v > b))
    else {
        warming.fill(f64::NAN);
        return;
    };

    let (lat_min, lat_max) = (lat[i_min].abs(), lat[i_max].abs());
    for ((warming, &temp), &lat) in warming.iter_mut().zip(&t).zip(lat) {
        *warming = if lat.abs() < lat_min || lat.abs() > lat_max {
            outside_range
        } else {
            temp - t_min
        };
    }
}
