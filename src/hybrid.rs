//! Hybrid sigma-pressure vertical coordinate
//!
//! The pressure at a layer interface (a "half level") is `psfc * bk + ak`.
//! Layer centers (the "full levels") are derived from the two interfaces around
//! them. Index 0 is the model top and the last index is the surface.
//!
//! ```text
//!     --- 0 --- TOP      ========  half
//!                        --------  full
//!                        ========  half
//!    --- Nk-1 ---        --------  full
//!    --- Nk --- SFC      ========  half
//!                       / / / / /
//! ```

pub mod grid;

use std::cmp::Ordering;
use std::str::FromStr;

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayViewD, ArrayViewMut1, Zip};

use crate::columns::{flatten_surface, into_field, profile_shape};
use crate::error::VerticalError;
use crate::planet::Planet;

/// Which vertical levels to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelType {
    /// Layer centers, `Nk - 1` of them
    Full,
    /// Layer interfaces, `Nk` of them
    Half,
}

impl FromStr for LevelType {
    type Err = VerticalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "half" => Ok(Self::Half),
            _ => Err(VerticalError::InvalidLevelType(s.to_string())),
        }
    }
}

/// The `ak`/`bk` pair defining a hybrid vertical grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridCoefficients {
    /// Pressure coefficient in Pa, one per half level.
    ak: Array1<f64>,
    /// Sigma coefficient (dimensionless), one per half level. Non-decreasing
    /// from the top to 1 at the surface.
    bk: Array1<f64>,
}

impl HybridCoefficients {
    /// Validate and store the coefficients.
    ///
    /// `ak` and `bk` must have the same length (at least two half levels) and
    /// `bk` must not decrease from the model top to the surface.
    pub fn new(ak: &[f64], bk: &[f64]) -> Result<Self, VerticalError> {
        if ak.len() != bk.len() {
            return Err(VerticalError::InvalidCoefficients(format!(
                "ak has {} values but bk has {}",
                ak.len(),
                bk.len()
            )));
        }
        if ak.len() < 2 {
            return Err(VerticalError::InvalidCoefficients(format!(
                "at least two half levels are needed, got {}",
                ak.len()
            )));
        }
        // A NaN also fails here
        if bk
            .windows(2)
            .any(|pair| pair[0].partial_cmp(&pair[1]).map_or(true, Ordering::is_gt))
        {
            return Err(VerticalError::InvalidCoefficients(
                "bk must be non-decreasing from the model top to the surface".to_string(),
            ));
        }

        let bk_surface = bk[bk.len() - 1];
        if (bk_surface - 1.0).abs() > 1e-6 {
            warn!("bk at the surface is {bk_surface}, not 1");
        }

        Ok(Self {
            ak: Array1::from(ak.to_vec()),
            bk: Array1::from(bk.to_vec()),
        })
    }

    /// Pressure coefficients in Pa, from the model top to the surface.
    pub fn ak(&self) -> ArrayView1<'_, f64> {
        self.ak.view()
    }

    /// Sigma coefficients (dimensionless), from the model top to the surface.
    pub fn bk(&self) -> ArrayView1<'_, f64> {
        self.bk.view()
    }

    /// Number of layer interfaces, `Nk`.
    pub fn num_half_levels(&self) -> usize {
        self.ak.len()
    }

    /// Number of layer centers, `Nk - 1`.
    pub fn num_full_levels(&self) -> usize {
        self.ak.len() - 1
    }

    /// Whether the top interface sits at zero pressure.
    ///
    /// Exact comparison: only a top at exactly 0 Pa makes the log-mean
    /// pressure of the top layer singular.
    pub fn has_vacuum_top(&self) -> bool {
        self.ak[0] == 0.0 && self.bk[0] == 0.0
    }

    /// Compute the pressure field in Pa.
    ///
    /// `psfc` is the surface pressure in Pa, either a scalar (0-D array) or an
    /// array of any shape. The result has the vertical axis prepended to the
    /// shape of `psfc`, with the unit axes of `psfc` dropped.
    pub fn pressure(
        &self,
        psfc: ArrayViewD<'_, f64>,
        level_type: LevelType,
    ) -> Result<ArrayD<f64>, VerticalError> {
        let surface = flatten_surface(&psfc);
        debug!(
            "pressure at {level_type:?} levels: {} half levels, {} columns",
            self.num_half_levels(),
            surface.len()
        );

        let (half, full) = self.pressure_columns(surface.view());
        let columns = match level_type {
            LevelType::Full => full,
            LevelType::Half => half,
        };
        let shape = profile_shape(columns.nrows(), psfc.shape());
        into_field(columns, &shape)
    }

    /// Compute the geometric altitude in m by hydrostatic integration.
    ///
    /// `temperature` is in K at the full levels, shaped `(Nk - 1,)` followed by
    /// the shape of `psfc` (or anything with the same number of elements per
    /// level). `topo` is the surface elevation in m, either a single value or
    /// one per surface point; without it the result is the height above
    /// ground.
    ///
    /// With a zero-pressure top, the top half level is infinitely high.
    pub fn altitude(
        &self,
        psfc: ArrayViewD<'_, f64>,
        temperature: ArrayViewD<'_, f64>,
        topo: Option<ArrayViewD<'_, f64>>,
        level_type: LevelType,
        planet: &Planet,
    ) -> Result<ArrayD<f64>, VerticalError> {
        let num_half = self.num_half_levels();
        let num_full = self.num_full_levels();
        let surface = flatten_surface(&psfc);
        let num_columns = surface.len();
        debug!(
            "altitude at {level_type:?} levels: {num_half} half levels, {num_columns} columns"
        );

        if temperature.ndim() == 0
            || temperature.shape()[0] != num_full
            || temperature.len() != num_full * num_columns
        {
            return Err(VerticalError::shape_mismatch(
                format!("temperature with {num_full} full levels over {num_columns} columns"),
                format!("{:?}", temperature.shape()),
            ));
        }
        let temperature = temperature.to_shape((num_full, num_columns))?;

        let topo = match topo {
            None => Array1::zeros(num_columns),
            Some(topo) if topo.len() == 1 => Array1::from_elem(num_columns, flatten_surface(&topo)[0]),
            Some(topo) if topo.len() == num_columns => flatten_surface(&topo),
            Some(topo) => {
                return Err(VerticalError::shape_mismatch(
                    format!("a surface elevation with 1 or {num_columns} values"),
                    format!("{:?}", topo.shape()),
                ))
            }
        };

        let (p_half, p_full) = self.pressure_columns(surface.view());
        let mut z_half = Array2::zeros((num_half, num_columns));
        let mut z_full = Array2::zeros((num_full, num_columns));

        // dp/dz = -rho g and rho = p / (r T), so dz = (r T / g) d(-ln p).
        // Integrate from the surface upward.
        Zip::from(z_half.columns_mut())
            .and(z_full.columns_mut())
            .and(p_half.columns())
            .and(p_full.columns())
            .and(temperature.columns())
            .and(&topo)
            .par_for_each(|mut z_half, mut z_full, p_half, p_full, t, &z_surface| {
                z_half[num_half - 1] = z_surface;
                for k in (0..num_full).rev() {
                    let scale = planet.thickness_scale(t[k]);
                    z_half[k] = z_half[k + 1] + scale * (p_half[k + 1].ln() - p_half[k].ln());
                    z_full[k] = z_half[k + 1] + scale * (1.0 - p_half[k] / p_full[k]);
                }
            });

        let columns = match level_type {
            LevelType::Full => z_full,
            LevelType::Half => z_half,
        };
        let shape = profile_shape(columns.nrows(), psfc.shape());
        into_field(columns, &shape)
    }

    /// Half and full level pressures, each shaped `(levels, columns)`.
    fn pressure_columns(&self, psfc: ArrayView1<'_, f64>) -> (Array2<f64>, Array2<f64>) {
        let mut half = Array2::zeros((self.num_half_levels(), psfc.len()));
        let mut full = Array2::zeros((self.num_full_levels(), psfc.len()));

        Zip::from(half.columns_mut())
            .and(full.columns_mut())
            .and(&psfc)
            .par_for_each(|half, full, &psfc| self.fill_pressure_column(psfc, half, full));

        (half, full)
    }

    fn fill_pressure_column(
        &self,
        psfc: f64,
        mut half: ArrayViewMut1<'_, f64>,
        mut full: ArrayViewMut1<'_, f64>,
    ) {
        for ((p, &ak), &bk) in half.iter_mut().zip(&self.ak).zip(&self.bk) {
            *p = psfc * bk + ak;
        }

        let vacuum_top = self.has_vacuum_top();
        for (k, p) in full.iter_mut().enumerate() {
            *p = if k == 0 && vacuum_top {
                0.5 * (half[0] + half[1])
            } else {
                log_mean(half[k], half[k + 1])
            };
        }
    }
}

/// Logarithmic mean of the pressures at the top and bottom of a layer.
#[inline]
fn log_mean(upper: f64, lower: f64) -> f64 {
    (lower - upper) / (lower / upper).ln()
}
