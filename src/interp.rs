//! Interpolation onto new vertical levels
//!
//! Coordinates are expected to increase with the level index, i.e. from the
//! model top toward the surface for pressure. Data stored the other way
//! around (surface first, or altitude decreasing with index) is handled by
//! setting `reverse_input`.
//!
//! ```text
//!     ---  0  --- TOP    [0 Pa]  : [120 km] |  X_out = a Xn + (1 - a) Xn+1
//!     ---  n  ---  pn    [30 Pa] : [800 m]  |  Xn
//! >>> ---  k  --- target [100 Pa]: [500 m]  |  X_out
//!     --- n+1 --- pn+1  [200 Pa] : [200 m]  |  Xn+1
//!     --- SFC ---
//! ```
//!
//! with `a = ln(target / pn+1) / ln(pn / pn+1)` for log weighting and
//! `a = (target - zn+1) / (zn - zn+1)` for linear weighting.

use std::str::FromStr;

use log::{debug, log_enabled, trace, Level};
use ndarray::{s, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, Zip};
use rayon::prelude::*;

use crate::columns::{as_columns, into_field};
use crate::error::VerticalError;

/// How the weight between the two bracketing levels is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpKind {
    /// Logarithmic in the coordinate, typically for pressure
    Log,
    /// Linear in the coordinate, typically for altitude
    Lin,
}

impl FromStr for InterpKind {
    type Err = VerticalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(Self::Log),
            "lin" => Ok(Self::Lin),
            _ => Err(VerticalError::InvalidLevelType(s.to_string())),
        }
    }
}

/// Options for [`vertical_interpolate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpOptions {
    pub kind: InterpKind,
    /// Flip the vertical axis of the value and coordinate fields before use.
    pub reverse_input: bool,
    /// Return NaN for targets above the top of a column instead of
    /// extrapolating.
    pub masktop: bool,
}

impl Default for InterpOptions {
    fn default() -> Self {
        Self {
            kind: InterpKind::Log,
            reverse_input: false,
            masktop: true,
        }
    }
}

/// Find the level just above each target level.
///
/// `lfull` holds the coordinate at full levels, vertical axis first. For each
/// target and each column (the flattened trailing axes of `lfull`), this
/// returns `n` such that `lfull[n] <= target < lfull[n + 1]`. A target outside
/// the column's range gets the closest boundary index instead, so callers
/// need to check the bracket themselves.
///
/// The result is shaped `(targets.len(), num_columns)`.
pub fn find_level_index(
    lfull: ArrayViewD<'_, f64>,
    targets: &[f64],
    reverse_input: bool,
) -> Result<Array2<usize>, VerticalError> {
    let lfull = as_columns(&lfull)?;
    let lfull = if reverse_input {
        lfull.slice(s![..;-1, ..])
    } else {
        lfull.view()
    };
    if lfull.nrows() == 0 {
        return Err(VerticalError::shape_mismatch(
            "at least one level",
            "an empty vertical axis",
        ));
    }
    debug!(
        "locating {} target levels in {} columns of {} levels",
        targets.len(),
        lfull.ncols(),
        lfull.nrows()
    );

    Ok(locate_columns(lfull, targets))
}

/// Index of the level just above `target` in a single column.
fn locate(column: ArrayView1<'_, f64>, target: f64) -> usize {
    if target.is_nan() {
        return 0;
    }

    // Closest value, first one wins on a tie. NaN levels are skipped.
    let closest = column
        .iter()
        .enumerate()
        .filter(|(_, level)| !level.is_nan())
        .map(|(n, level)| (n, (level - target).abs()))
        .fold(None, |best: Option<(usize, f64)>, (n, dist)| match best {
            Some((_, best_dist)) if best_dist <= dist => best,
            _ => Some((n, dist)),
        })
        .map_or(0, |(n, _)| n);

    if column[closest] > target {
        closest.saturating_sub(1)
    } else {
        closest
    }
}

fn locate_columns(lfull: ArrayView2<'_, f64>, targets: &[f64]) -> Array2<usize> {
    let mut index = Array2::zeros((targets.len(), lfull.ncols()));
    Zip::from(index.columns_mut())
        .and(lfull.columns())
        .par_for_each(|mut index, column| {
            for (n, &target) in index.iter_mut().zip(targets) {
                *n = locate(column, target);
            }
        });
    index
}

/// Interpolate `var_in` onto the `targets` levels.
///
/// `var_in` and `lfull` both have the vertical axis first. `lfull` is either
/// the same shape as `var_in`, or a leading part of it (for example a single
/// 1-D profile shared by every column), in which case it is reused across the
/// remaining axes of `var_in`.
///
/// `index` optionally holds bracketing indices from [`find_level_index`] on
/// the same `lfull` and `targets`, to avoid searching again when several
/// fields share one coordinate.
///
/// The result has the vertical axis of `var_in` replaced by one entry per
/// target, in the order given. Columns that don't bracket a target are NaN;
/// with `masktop`, so are targets above the top of the column.
///
/// A target exactly on the bottom level returns the value there rather than
/// NaN, so every input level passes through unchanged.
pub fn vertical_interpolate(
    var_in: ArrayViewD<'_, f64>,
    lfull: ArrayViewD<'_, f64>,
    targets: &[f64],
    options: &InterpOptions,
    index: Option<ArrayView2<'_, usize>>,
) -> Result<ArrayD<f64>, VerticalError> {
    if var_in.ndim() == 0
        || lfull.ndim() == 0
        || lfull.ndim() > var_in.ndim()
        || lfull.shape() != &var_in.shape()[..lfull.ndim()]
    {
        return Err(VerticalError::shape_mismatch(
            format!("a coordinate shaped like the start of {:?}", var_in.shape()),
            format!("{:?}", lfull.shape()),
        ));
    }
    let num_levels = var_in.shape()[0];
    if num_levels == 0 {
        return Err(VerticalError::shape_mismatch(
            "at least one level",
            "an empty vertical axis",
        ));
    }

    let var_columns = as_columns(&var_in)?;
    let l_columns = as_columns(&lfull)?;
    let (var_columns, l_columns) = if options.reverse_input {
        (
            var_columns.slice(s![..;-1, ..]),
            l_columns.slice(s![..;-1, ..]),
        )
    } else {
        (var_columns.view(), l_columns.view())
    };
    // Each coordinate column is shared by this many consecutive value columns
    let repeat = var_columns.ncols() / l_columns.ncols().max(1);

    debug!(
        "{:?} interpolation of {} levels onto {} targets, {} columns ({} coordinate columns)",
        options.kind,
        num_levels,
        targets.len(),
        var_columns.ncols(),
        l_columns.ncols()
    );

    let index = match index {
        Some(index) => {
            if index.dim() != (targets.len(), l_columns.ncols()) {
                return Err(VerticalError::shape_mismatch(
                    format!("an index shaped {:?}", (targets.len(), l_columns.ncols())),
                    format!("{:?}", index.dim()),
                ));
            }
            if index.iter().any(|&n| n >= num_levels) {
                return Err(VerticalError::shape_mismatch(
                    format!("index values below {num_levels}"),
                    "an index past the last level",
                ));
            }
            index.into_owned()
        }
        None => locate_columns(l_columns, targets),
    };

    let mut var_out = Array2::zeros((targets.len(), var_columns.ncols()));
    Zip::indexed(var_out.columns_mut())
        .and(var_columns.columns())
        .par_for_each(|j, mut out, var| {
            let l_col = j / repeat;
            let levels = l_columns.column(l_col);
            for (k, (out, &target)) in out.iter_mut().zip(targets).enumerate() {
                *out = interpolate_column(var, levels, target, index[[k, l_col]], options);
            }
        });

    if log_enabled!(Level::Debug) {
        let num_nan = var_out.par_iter().filter(|v| v.is_nan()).count();
        if num_nan > 0 {
            debug!("{num_nan} of {} interpolated values are NaN", var_out.len());
        }
    }
    trace!("interpolated onto {targets:?}");

    let shape: Vec<usize> = std::iter::once(targets.len())
        .chain(var_in.shape()[1..].iter().copied())
        .collect();
    into_field(var_out, &shape)
}

/// Interpolate one column at one target, given the bracketing index `n`.
#[inline]
fn interpolate_column(
    var: ArrayView1<'_, f64>,
    levels: ArrayView1<'_, f64>,
    target: f64,
    n: usize,
    options: &InterpOptions,
) -> f64 {
    let last = levels.len() - 1;
    let (below, mut alpha) = if n < last {
        let alpha = match options.kind {
            InterpKind::Log => (target / levels[n + 1]).ln() / (levels[n] / levels[n + 1]).ln(),
            InterpKind::Lin => (target - levels[n + 1]) / (levels[n] - levels[n + 1]),
        };
        (n + 1, alpha)
    } else if target == levels[n] {
        // Exactly on the bottom level, nothing below is needed
        (n, 1.0)
    } else {
        // Not bracketed
        (n, f64::NAN)
    };

    if options.masktop && target < levels[n] {
        alpha = f64::NAN;
    }

    alpha * var[n] + (1.0 - alpha) * var[below]
}

/// Linear interpolation of a single value `x` in the table `x_ref`, `y_ref`.
///
/// `x_ref` must be strictly increasing, otherwise this is a `ShapeMismatch`.
/// Values of `x` outside the range of `x_ref` give NaN.
pub fn linear_interpolate(x: f64, x_ref: &[f64], y_ref: &[f64]) -> Result<f64, VerticalError> {
    if x_ref.len() != y_ref.len() || x_ref.len() < 2 {
        return Err(VerticalError::shape_mismatch(
            "two tables of equal length, at least 2",
            format!("lengths {} and {}", x_ref.len(), y_ref.len()),
        ));
    }
    // Also rejects NaN abscissae
    if x_ref.windows(2).any(|pair| !(pair[0] < pair[1])) {
        return Err(VerticalError::shape_mismatch(
            "a strictly increasing table",
            format!("{x_ref:?}"),
        ));
    }

    let min = x_ref.iter().copied().fold(f64::INFINITY, f64::min);
    let max = x_ref.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(min..=max).contains(&x) {
        return Ok(f64::NAN);
    }

    let x_ref = ArrayView1::from(x_ref);
    // Keep n + 1 in bounds when x is the last value
    let n = locate(x_ref, x).min(x_ref.len() - 2);
    let slope = (y_ref[n + 1] - y_ref[n]) / (x_ref[n + 1] - x_ref[n]);
    Ok(y_ref[n] + slope * (x - x_ref[n]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid::{HybridCoefficients, LevelType};
    use approx::assert_relative_eq;
    use ndarray::{arr0, arr1, arr2, Array, Array3, Axis};

    #[test]
    fn locate_in_three_level_column() {
        let lfull = arr1(&[175., 654.98]).into_dyn();
        let n = find_level_index(lfull.view(), &[400.], false).unwrap();
        assert_eq!(n, arr2(&[[0_usize]]));
    }

    #[test]
    fn locate_targets_and_boundaries() {
        let lfull = arr1(&[10., 20., 40., 80.]).into_dyn();
        let n = find_level_index(lfull.view(), &[10., 19., 21., 40., 79., 5., 100.], false).unwrap();
        assert_eq!(n.column(0).to_vec(), vec![0, 0, 1, 2, 2, 0, 3]);

        // Ties go to the first (upper) level
        let n = find_level_index(lfull.view(), &[30.], false).unwrap();
        assert_eq!(n[[0, 0]], 1);
    }

    #[test]
    fn locate_reversed_and_multi_column() {
        // Altitude stored from the top (largest) down
        let zfull = arr2(&[[300., 3000.], [200., 2000.], [100., 1000.]]).into_dyn();
        let n = find_level_index(zfull.view(), &[150., 2500.], true).unwrap();
        assert_eq!(n.dim(), (2, 2));
        // Reversed column 0 is [100, 200, 300]
        assert_eq!(n[[0, 0]], 0);
        assert_eq!(n[[1, 0]], 2);
        // Reversed column 1 is [1000, 2000, 3000]
        assert_eq!(n[[0, 1]], 0);
        assert_eq!(n[[1, 1]], 1);
    }

    #[test]
    fn locate_skips_nan_levels() {
        let lfull = arr1(&[f64::NAN, 20., 40.]).into_dyn();
        let n = find_level_index(lfull.view(), &[1., 30.], false).unwrap();
        assert_eq!(n.column(0).to_vec(), vec![0, 1]);
    }

    #[test]
    fn parse_kind() {
        assert_eq!("log".parse::<InterpKind>().unwrap(), InterpKind::Log);
        assert_eq!("lin".parse::<InterpKind>().unwrap(), InterpKind::Lin);
        assert!(matches!(
            "cubic".parse::<InterpKind>(),
            Err(VerticalError::InvalidLevelType(_))
        ));
    }

    #[test]
    fn exact_levels_pass_through() {
        let coef =
            HybridCoefficients::new(&[0., 20., 60., 100., 50., 0.], &[0., 0., 0.05, 0.3, 0.7, 1.])
                .unwrap();
        let psfc = arr1(&[450., 610., 800.]).into_dyn();
        let pfull = coef.pressure(psfc.view(), LevelType::Full).unwrap();
        let temperature = pfull.mapv(|p| 140. + 0.1 * p);

        for kind in [InterpKind::Log, InterpKind::Lin] {
            let options = InterpOptions {
                kind,
                ..Default::default()
            };
            for column in 0..3 {
                let levels: Vec<f64> = pfull.index_axis(Axis(1), column).iter().copied().collect();
                let out = vertical_interpolate(
                    temperature.view(),
                    pfull.view(),
                    &levels,
                    &options,
                    None,
                )
                .unwrap();
                assert_eq!(out.shape(), &[5, 3]);
                for k in 0..5 {
                    assert_relative_eq!(
                        out[[k, column]],
                        temperature[[k, column]],
                        max_relative = 1e-14
                    );
                }
            }
        }
    }

    #[test]
    fn log_and_linear_weights() {
        let pfull = arr1(&[100., 400.]).into_dyn();
        let var = arr1(&[1., 3.]).into_dyn();

        let log = vertical_interpolate(var.view(), pfull.view(), &[200.], &Default::default(), None)
            .unwrap();
        let alpha = f64::ln(200. / 400.) / f64::ln(100. / 400.);
        assert_relative_eq!(log[[0]], alpha * 1. + (1. - alpha) * 3.);
        assert_relative_eq!(log[[0]], 2.);

        let options = InterpOptions {
            kind: InterpKind::Lin,
            ..Default::default()
        };
        let lin = vertical_interpolate(var.view(), pfull.view(), &[200.], &options, None).unwrap();
        assert_relative_eq!(lin[[0]], 1. + 2. / 3.);
    }

    #[test]
    fn out_of_range_targets() {
        let pfull = arr2(&[[100., 150.], [200., 300.], [400., 600.]]).into_dyn();
        let var = arr2(&[[1., 10.], [2., 20.], [3., 30.]]).into_dyn();
        let targets = [50., 120., 500.];

        let masked =
            vertical_interpolate(var.view(), pfull.view(), &targets, &Default::default(), None)
                .unwrap();
        // Above the top of both columns
        assert!(masked[[0, 0]].is_nan());
        assert!(masked[[0, 1]].is_nan());
        // Above the top of column 1 only
        assert!(!masked[[1, 0]].is_nan());
        assert!(masked[[1, 1]].is_nan());
        // Below the bottom of column 0 only
        assert!(masked[[2, 0]].is_nan());
        assert!(!masked[[2, 1]].is_nan());

        let options = InterpOptions {
            masktop: false,
            ..Default::default()
        };
        let unmasked = vertical_interpolate(var.view(), pfull.view(), &targets, &options, None)
            .unwrap();
        // Extrapolated above the top
        let alpha = f64::ln(50. / 200.) / f64::ln(100. / 200.);
        assert_relative_eq!(unmasked[[0, 0]], alpha * 1. + (1. - alpha) * 2.);
        assert!(!unmasked[[1, 1]].is_nan());
        // Below the bottom is still not bracketed
        assert!(unmasked[[2, 0]].is_nan());
        assert_eq!(masked[[2, 1]], unmasked[[2, 1]]);
    }

    #[test]
    fn shared_profile_and_extra_axes() {
        // One coordinate column per (lat), reused over a trailing lon axis
        let pfull = arr2(&[[100., 120.], [200., 240.], [400., 480.]]).into_dyn();
        let var = Array3::from_shape_fn((3, 2, 4), |(k, i, j)| (k + 1) as f64 * (i * 4 + j) as f64)
            .into_dyn();
        let out =
            vertical_interpolate(var.view(), pfull.view(), &[200., 240.], &Default::default(), None)
                .unwrap();
        assert_eq!(out.shape(), &[2, 2, 4]);
        for j in 0..4 {
            // 200 is the second level of lat 0, 240 of lat 1
            assert_relative_eq!(out[[0, 0, j]], 2. * j as f64);
            assert_relative_eq!(out[[1, 1, j]], 2. * (4 + j) as f64);
        }

        // A 1-D profile is reused everywhere
        let profile = arr1(&[100., 200., 400.]).into_dyn();
        let out =
            vertical_interpolate(var.view(), profile.view(), &[400.], &Default::default(), None)
                .unwrap();
        assert_eq!(out.index_axis(Axis(0), 0), var.index_axis(Axis(0), 2));
    }

    #[test]
    fn reversed_altitude_input() {
        // Altitude decreasing with index, as stored by most models
        let zfull = arr1(&[3000., 2000., 1000.]).into_dyn();
        let var = arr1(&[30., 20., 10.]).into_dyn();
        let options = InterpOptions {
            kind: InterpKind::Lin,
            reverse_input: true,
            masktop: false,
        };
        let out = vertical_interpolate(var.view(), zfull.view(), &[1500., 2750.], &options, None)
            .unwrap();
        assert_relative_eq!(out[[0]], 15.);
        assert_relative_eq!(out[[1]], 27.5);
    }

    #[test]
    fn precomputed_index_matches() {
        let pfull = arr2(&[[100., 150.], [200., 300.], [400., 600.]]).into_dyn();
        let var = arr2(&[[1., 10.], [2., 20.], [3., 30.]]).into_dyn();
        let targets = [120., 250., 500.];

        let index = find_level_index(pfull.view(), &targets, false).unwrap();
        let with_index = vertical_interpolate(
            var.view(),
            pfull.view(),
            &targets,
            &Default::default(),
            Some(index.view()),
        )
        .unwrap();
        let without =
            vertical_interpolate(var.view(), pfull.view(), &targets, &Default::default(), None)
                .unwrap();

        for (a, b) in with_index.iter().zip(without.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }

        let wrong = Array::zeros((2, 2));
        assert!(matches!(
            vertical_interpolate(
                var.view(),
                pfull.view(),
                &targets,
                &Default::default(),
                Some(wrong.view())
            ),
            Err(VerticalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn incompatible_shapes() {
        let var = Array::zeros((3, 2)).into_dyn();
        let pfull = Array::zeros((3, 4)).into_dyn();
        assert!(matches!(
            vertical_interpolate(var.view(), pfull.view(), &[1.], &Default::default(), None),
            Err(VerticalError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            vertical_interpolate(
                arr0(1.).into_dyn().view(),
                pfull.view(),
                &[1.],
                &Default::default(),
                None
            ),
            Err(VerticalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn same_inputs_same_nans() {
        let pfull = arr2(&[[100., 150.], [200., f64::NAN], [400., 600.]]).into_dyn();
        let var = arr2(&[[1., 10.], [2., 20.], [3., 30.]]).into_dyn();
        let targets = [50., 170., 350., 700.];
        let first =
            vertical_interpolate(var.view(), pfull.view(), &targets, &Default::default(), None)
                .unwrap();
        let second =
            vertical_interpolate(var.view(), pfull.view(), &targets, &Default::default(), None)
                .unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.is_nan(), b.is_nan());
            if !a.is_nan() {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn one_dimensional_table() {
        let x = [0., 1., 3.];
        let y = [0., 10., 50.];
        assert_relative_eq!(linear_interpolate(0.5, &x, &y).unwrap(), 5.);
        assert_relative_eq!(linear_interpolate(2., &x, &y).unwrap(), 30.);
        assert_relative_eq!(linear_interpolate(3., &x, &y).unwrap(), 50.);
        assert_relative_eq!(linear_interpolate(0., &x, &y).unwrap(), 0.);
        assert!(linear_interpolate(-0.1, &x, &y).unwrap().is_nan());
        assert!(linear_interpolate(3.1, &x, &y).unwrap().is_nan());
        assert!(linear_interpolate(1., &x, &y[..2]).is_err());
    }

    #[test]
    fn repeated_table_values_are_rejected() {
        let y = [0., 1., 2., 3.];
        assert!(matches!(
            linear_interpolate(1., &[0., 1., 1., 2.], &y),
            Err(VerticalError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            linear_interpolate(1., &[2., 1., 0., -1.], &y),
            Err(VerticalError::ShapeMismatch { .. })
        ));
    }
}
