//! Conversions between N-dimensional fields and `(vertical, column)` arrays
//!
//! Every routine in this crate works on one vertical column at a time, so the
//! trailing (horizontal/time) axes are flattened in row-major order into a
//! single column axis and restored afterwards.

use ndarray::{Array1, Array2, ArrayD, ArrayViewD, CowArray, Ix2, IxDyn};

use crate::error::VerticalError;

/// View `field` (vertical axis first) as a `(num_levels, num_columns)` array.
///
/// A 1-D field is a single column. This only copies when `field` isn't
/// already in standard layout.
pub(crate) fn as_columns<'a>(
    field: &'a ArrayViewD<'_, f64>,
) -> Result<CowArray<'a, f64, Ix2>, VerticalError> {
    let (&num_levels, horizontal) = field
        .shape()
        .split_first()
        .ok_or_else(|| VerticalError::shape_mismatch("an array with a vertical axis", "a scalar"))?;
    let num_columns = horizontal.iter().product::<usize>();
    Ok(field.to_shape((num_levels, num_columns))?)
}

/// Flatten a surface field (scalar or any shape) into a single column axis.
pub(crate) fn flatten_surface(field: &ArrayViewD<'_, f64>) -> Array1<f64> {
    field.iter().copied().collect()
}

/// Output shape for a profile of `num_levels` over a surface of shape
/// `surface`. Unit axes of the surface are dropped so that a scalar surface
/// value gives back a plain 1-D profile; the vertical axis is always kept.
pub(crate) fn profile_shape(num_levels: usize, surface: &[usize]) -> Vec<usize> {
    std::iter::once(num_levels)
        .chain(surface.iter().copied().filter(|&n| n != 1))
        .collect()
}

/// Restore a `(num_levels, num_columns)` array to the N-dimensional `shape`.
pub(crate) fn into_field(columns: Array2<f64>, shape: &[usize]) -> Result<ArrayD<f64>, VerticalError> {
    let columns = if columns.is_standard_layout() {
        columns
    } else {
        columns.as_standard_layout().into_owned()
    };
    Ok(columns.into_shape(IxDyn(shape))?)
}
