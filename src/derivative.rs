//! Derivative along the vertical axis

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};

use crate::error::VerticalError;

/// Differentiate `arr` along its first axis.
///
/// Interior levels use centered differences and the two end levels use
/// one-sided differences. `h` is the coordinate to differentiate against:
/// either 1-D with one value per level, or the same shape as `arr`. Without
/// `h`, only the differences of `arr` are returned.
pub fn vertical_derivative(
    arr: ArrayViewD<'_, f64>,
    h: Option<ArrayViewD<'_, f64>>,
) -> Result<ArrayD<f64>, VerticalError> {
    if arr.ndim() == 0 || arr.len_of(Axis(0)) < 2 {
        return Err(VerticalError::shape_mismatch(
            "at least two levels",
            format!("{:?}", arr.shape()),
        ));
    }
    let num_levels = arr.len_of(Axis(0));
    let d_arr = differences(&arr);

    let h = match h {
        None => return Ok(d_arr),
        Some(h) => h,
    };

    if h.shape() == arr.shape() {
        Ok(d_arr / differences(&h))
    } else if h.ndim() == 1 && h.len() == num_levels {
        // Spread the spacing over the trailing axes
        let mut shape = vec![1; arr.ndim()];
        shape[0] = num_levels;
        let d_h = differences(&h).into_shape(IxDyn(&shape))?;
        Ok(d_arr / &d_h)
    } else {
        Err(VerticalError::shape_mismatch(
            format!("a coordinate shaped {:?} or ({num_levels},)", arr.shape()),
            format!("{:?}", h.shape()),
        ))
    }
}

/// Levels `start..end` of `x`.
fn levels<'a>(x: &'a ArrayViewD<'_, f64>, start: usize, end: usize) -> ArrayViewD<'a, f64> {
    x.slice_axis(Axis(0), Slice::from(start..end))
}

/// One-sided differences at both ends, centered differences inside.
fn differences(x: &ArrayViewD<'_, f64>) -> ArrayD<f64> {
    let n = x.len_of(Axis(0));
    let mut d = ArrayD::zeros(x.raw_dim());

    d.slice_axis_mut(Axis(0), Slice::from(0..1))
        .assign(&(&levels(x, 1, 2) - &levels(x, 0, 1)));
    d.slice_axis_mut(Axis(0), Slice::from(n - 1..n))
        .assign(&(&levels(x, n - 1, n) - &levels(x, n - 2, n - 1)));
    if n > 2 {
        d.slice_axis_mut(Axis(0), Slice::from(1..n - 1))
            .assign(&(&levels(x, 2, n) - &levels(x, 0, n - 2)));
    }
    d
}
