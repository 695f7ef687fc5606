//! Log-pressure pseudo-altitude
//!
//! Approximate altitude for a pressure (and back) from an exponential
//! atmosphere, `p = p_ref exp(-z / H)`. The result is in the units of the
//! scale height `H`.

use ndarray::{ArrayD, ArrayViewD};

/// Scale height in km used for quick-look altitudes.
pub const DEFAULT_SCALE_HEIGHT_KM: f64 = 8.0;

/// Reference surface pressure in Pa used for quick-look altitudes.
pub const DEFAULT_REFERENCE_PRESSURE: f64 = 610.0;

/// Pseudo-altitude of the pressure `press`, in the units of `scale_height`.
#[inline]
pub fn pseudo_altitude(press: f64, scale_height: f64, reference_pressure: f64) -> f64 {
    -scale_height * (press / reference_pressure).ln()
}

/// Pressure at the pseudo-altitude `alt`, in the units of
/// `reference_pressure`.
#[inline]
pub fn pseudo_pressure(alt: f64, scale_height: f64, reference_pressure: f64) -> f64 {
    reference_pressure * (-alt / scale_height).exp()
}

/// [`pseudo_altitude`] for every element of `press`.
pub fn pseudo_altitude_field(
    press: ArrayViewD<'_, f64>,
    scale_height: f64,
    reference_pressure: f64,
) -> ArrayD<f64> {
    press.mapv(|p| pseudo_altitude(p, scale_height, reference_pressure))
}

/// [`pseudo_pressure`] for every element of `alt`.
pub fn pseudo_pressure_field(
    alt: ArrayViewD<'_, f64>,
    scale_height: f64,
    reference_pressure: f64,
) -> ArrayD<f64> {
    alt.mapv(|z| pseudo_pressure(z, scale_height, reference_pressure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn reference_pressure_is_ground() {
        assert_eq!(
            pseudo_altitude(
                DEFAULT_REFERENCE_PRESSURE,
                DEFAULT_SCALE_HEIGHT_KM,
                DEFAULT_REFERENCE_PRESSURE
            ),
            0.0
        );
        // One scale height up
        let p = DEFAULT_REFERENCE_PRESSURE / std::f64::consts::E;
        assert_relative_eq!(
            pseudo_altitude(p, DEFAULT_SCALE_HEIGHT_KM, DEFAULT_REFERENCE_PRESSURE),
            8.0
        );
    }

    #[test]
    fn altitude_and_pressure_are_inverses() {
        let press = arr1(&[610., 100., 1., 0.01]).into_dyn();
        let alt = pseudo_altitude_field(press.view(), 8.0, 610.);
        let back = pseudo_pressure_field(alt.view(), 8.0, 610.);
        for (p, back) in press.iter().zip(back.iter()) {
            assert_relative_eq!(p, back, max_relative = 1e-12);
        }
    }
}
