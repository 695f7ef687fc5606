//! Hybrid sigma-pressure vertical coordinate tools
//!
//! Derived fields for atmospheric model output on a hybrid vertical grid:
//! pressure and altitude from the surface pressure and `ak`/`bk`
//! coefficients, interpolation onto new vertical levels, and the meridional
//! mass streamfunction.
//!
//! Every per-level field has the vertical axis first, followed by any number
//! of horizontal/time axes. Columns are independent and are processed in
//! parallel.
//!
//! NOTE: the Python interface lives in the `python` module (behind the
//! `python` feature). The other modules do not use `pyo3`.

pub(crate) mod columns;
pub mod derivative;
pub mod diagnostics;
pub mod error;
pub mod hybrid;
pub mod interp;
pub mod log_pressure;
pub mod planet;
pub mod stream;

#[cfg(feature = "python")]
mod python;

pub use error::VerticalError;
pub use hybrid::{HybridCoefficients, LevelType};
pub use interp::{find_level_index, vertical_interpolate, InterpKind, InterpOptions};
pub use planet::Planet;
pub use stream::{mass_streamfunction, StreamfunctionParams, VerticalCoordinate};
