//! Python interface
//!
//! Thin wrappers that convert numpy arrays and keyword defaults into calls on
//! the library API. Errors come back to Python as `ValueError`. This is the
//! only module that depends on `pyo3` and `numpy`.

use ndarray::{arr0, ArrayD, ArrayView1};
use numpy::{
    IntoPyArray, PyArray1, PyArray2, PyArrayDyn, PyReadonlyArray1, PyReadonlyArray2,
    PyReadonlyArrayDyn,
};
use pyo3::prelude::*;

use crate::derivative::vertical_derivative;
use crate::diagnostics;
use crate::error::VerticalError;
use crate::hybrid::{grid, HybridCoefficients, LevelType};
use crate::interp::{find_level_index, vertical_interpolate, InterpKind, InterpOptions};
use crate::log_pressure::{pseudo_altitude_field, pseudo_pressure_field};
use crate::planet::Planet;
use crate::stream::{mass_streamfunction, StreamfunctionParams, VerticalCoordinate};

impl From<VerticalError> for PyErr {
    fn from(e: VerticalError) -> Self {
        use pyo3::exceptions::PyValueError;
        PyValueError::new_err(e.to_string())
    }
}

/// Accept either a float or a float64 numpy array.
fn extract_field(obj: &PyAny) -> PyResult<ArrayD<f64>> {
    if let Ok(array) = obj.extract::<PyReadonlyArrayDyn<'_, f64>>() {
        return Ok(array.as_array().to_owned());
    }
    Ok(arr0(obj.extract::<f64>()?).into_dyn())
}

/// Accept either a single level or a sequence of levels.
fn extract_levels(obj: &PyAny) -> PyResult<Vec<f64>> {
    Ok(extract_field(obj)?.iter().copied().collect())
}

/// Pressure in Pa at the full or half levels.
#[pyfunction]
#[pyo3(signature = (psfc, ak, bk, lev_type = "full"))]
fn press_calc<'py>(
    py: Python<'py>,
    psfc: &PyAny,
    ak: Vec<f64>,
    bk: Vec<f64>,
    lev_type: &str,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let level_type: LevelType = lev_type.parse()?;
    let coefficients = HybridCoefficients::new(&ak, &bk)?;
    let psfc = extract_field(psfc)?;

    let press = py.allow_threads(|| coefficients.pressure(psfc.view(), level_type))?;
    Ok(press.into_pyarray(py))
}

/// Altitude in m at the full or half levels, above ground unless `topo` is
/// given.
#[pyfunction]
#[pyo3(signature = (psfc, ak, bk, temperature, topo = None, lev_type = "full"))]
fn z_calc<'py>(
    py: Python<'py>,
    psfc: &PyAny,
    ak: Vec<f64>,
    bk: Vec<f64>,
    temperature: PyReadonlyArrayDyn<'py, f64>,
    topo: Option<&PyAny>,
    lev_type: &str,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let level_type: LevelType = lev_type.parse()?;
    let coefficients = HybridCoefficients::new(&ak, &bk)?;
    let psfc = extract_field(psfc)?;
    let topo = topo.map(extract_field).transpose()?;
    let temperature = temperature.as_array();

    let altitude = py.allow_threads(|| {
        coefficients.altitude(
            psfc.view(),
            temperature.view(),
            topo.as_ref().map(|topo| topo.view()),
            level_type,
            &Planet::MARS,
        )
    })?;
    Ok(altitude.into_pyarray(py))
}

/// Index of the level just above each requested level, shaped
/// `(levels, columns)`.
#[pyfunction]
#[pyo3(signature = (lfull, llev, reverse_input = false))]
fn find_n<'py>(
    py: Python<'py>,
    lfull: PyReadonlyArrayDyn<'py, f64>,
    llev: &PyAny,
    reverse_input: bool,
) -> PyResult<&'py PyArray2<usize>> {
    let targets = extract_levels(llev)?;
    let lfull = lfull.as_array();

    let index = py.allow_threads(|| find_level_index(lfull.view(), &targets, reverse_input))?;
    Ok(index.into_pyarray(py))
}

/// Interpolate onto new pressure or altitude levels.
#[pyfunction]
#[pyo3(signature = (var_in, lfull, llev, kind = "log", reverse_input = false, masktop = true, index = None))]
fn vinterp<'py>(
    py: Python<'py>,
    var_in: PyReadonlyArrayDyn<'py, f64>,
    lfull: PyReadonlyArrayDyn<'py, f64>,
    llev: &PyAny,
    kind: &str,
    reverse_input: bool,
    masktop: bool,
    index: Option<PyReadonlyArray2<'py, usize>>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let kind: InterpKind = kind.parse()?;
    let options = InterpOptions {
        kind,
        reverse_input,
        masktop,
    };
    let targets = extract_levels(llev)?;
    let var_in = var_in.as_array();
    let lfull = lfull.as_array();
    let index = index.as_ref().map(|index| index.as_array());

    let var_out = py.allow_threads(|| {
        vertical_interpolate(var_in.view(), lfull.view(), &targets, &options, index)
    })?;
    Ok(var_out.into_pyarray(py))
}

/// Meridional mass streamfunction in `factor` kg/s.
#[pyfunction]
#[pyo3(signature = (v_avg, lat, level, kind = "pstd", psfc = 700., scale_height = 8000., factor = 1.0e-8))]
fn mass_stream<'py>(
    py: Python<'py>,
    v_avg: PyReadonlyArrayDyn<'py, f64>,
    lat: Vec<f64>,
    level: Vec<f64>,
    kind: &str,
    psfc: f64,
    scale_height: f64,
    factor: f64,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let coordinate: VerticalCoordinate = kind.parse()?;
    let params = StreamfunctionParams {
        coordinate,
        reference_pressure: psfc,
        scale_height,
        factor,
    };
    let v_avg = v_avg.as_array();

    let msf = py.allow_threads(|| {
        mass_streamfunction(v_avg.view(), &lat, &level, &params, &Planet::MARS)
    })?;
    Ok(msf.into_pyarray(py))
}

/// Approximate altitude in km for a pressure in Pa.
#[pyfunction]
#[pyo3(signature = (press, scale_height_km = 8., reference_press = 610.))]
fn alt_km<'py>(
    py: Python<'py>,
    press: &PyAny,
    scale_height_km: f64,
    reference_press: f64,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let press = extract_field(press)?;
    Ok(pseudo_altitude_field(press.view(), scale_height_km, reference_press).into_pyarray(py))
}

/// Approximate pressure in Pa for an altitude in km.
#[pyfunction]
#[pyo3(signature = (alt_km, scale_height_km = 8., reference_press = 610.))]
fn press_pa<'py>(
    py: Python<'py>,
    alt_km: &PyAny,
    scale_height_km: f64,
    reference_press: f64,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let alt_km = extract_field(alt_km)?;
    Ok(pseudo_pressure_field(alt_km.view(), scale_height_km, reference_press).into_pyarray(py))
}

#[pyfunction]
fn compute_uneven_sigma(
    py: Python<'_>,
    num_levels: usize,
    n_scale_heights: f64,
    surf_res: f64,
    exponent: f64,
    zero_top: bool,
) -> &PyArray1<f64> {
    grid::uneven_sigma(num_levels, n_scale_heights, surf_res, exponent, zero_top).into_pyarray(py)
}

#[pyfunction]
#[pyo3(signature = (pfull, p_sigma = grid::DEFAULT_P_SIGMA, p_press = grid::DEFAULT_P_PRESS))]
fn transition<'py>(
    py: Python<'py>,
    pfull: PyReadonlyArray1<'py, f64>,
    p_sigma: f64,
    p_press: f64,
) -> &'py PyArray1<f64> {
    grid::transition(pfull.as_array(), p_sigma, p_press).into_pyarray(py)
}

/// Returns `(ak, bk, ks)`.
#[pyfunction]
#[pyo3(signature = (plev, psfc, ptrans = 1.))]
fn swinbank<'py>(
    py: Python<'py>,
    plev: PyReadonlyArray1<'py, f64>,
    psfc: f64,
    ptrans: f64,
) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>, usize)> {
    let plev: ArrayView1<'_, f64> = plev.as_array();
    let levels = grid::swinbank(plev, psfc, ptrans)?;
    Ok((
        levels.ak.into_pyarray(py),
        levels.bk.into_pyarray(py),
        levels.ks,
    ))
}

/// Derivative along the first axis, with respect to `h` if given.
#[pyfunction]
#[pyo3(signature = (arr, h = None))]
fn dvar_dh<'py>(
    py: Python<'py>,
    arr: PyReadonlyArrayDyn<'py, f64>,
    h: Option<PyReadonlyArrayDyn<'py, f64>>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let d_arr = vertical_derivative(arr.as_array(), h.as_ref().map(|h| h.as_array()))?;
    Ok(d_arr.into_pyarray(py))
}

/// Polar warming in K, with latitude as the first axis of `t`.
#[pyfunction]
#[pyo3(signature = (t, lat, outside_range = f64::NAN))]
fn polar_warming<'py>(
    py: Python<'py>,
    t: PyReadonlyArrayDyn<'py, f64>,
    lat: Vec<f64>,
    outside_range: f64,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let t = t.as_array();
    let warming = py.allow_threads(|| diagnostics::polar_warming(t.view(), &lat, outside_range))?;
    Ok(warming.into_pyarray(py))
}

/// Field minus its zonal (last axis) mean.
#[pyfunction]
fn zonal_detrend<'py>(
    py: Python<'py>,
    var: PyReadonlyArrayDyn<'py, f64>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let var = var.as_array();
    let anomaly = py.allow_threads(|| diagnostics::zonal_detrend(var.view()))?;
    Ok(anomaly.into_pyarray(py))
}

#[pyfunction]
#[pyo3(signature = (x, alpha, x0 = 0.))]
fn gauss_profile<'py>(
    py: Python<'py>,
    x: &PyAny,
    alpha: f64,
    x0: f64,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let x = extract_field(x)?;
    Ok(x.mapv(|x| diagnostics::gauss_profile(x, alpha, x0)).into_pyarray(py))
}

/// A Python module implemented in Rust.
#[pymodule]
fn hybrid_vertical(_py: Python, m: &PyModule) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(press_calc, m)?)?;
    m.add_function(wrap_pyfunction!(z_calc, m)?)?;
    m.add_function(wrap_pyfunction!(find_n, m)?)?;
    m.add_function(wrap_pyfunction!(vinterp, m)?)?;
    m.add_function(wrap_pyfunction!(mass_stream, m)?)?;
    m.add_function(wrap_pyfunction!(alt_km, m)?)?;
    m.add_function(wrap_pyfunction!(press_pa, m)?)?;
    m.add_function(wrap_pyfunction!(compute_uneven_sigma, m)?)?;
    m.add_function(wrap_pyfunction!(transition, m)?)?;
    m.add_function(wrap_pyfunction!(swinbank, m)?)?;
    m.add_function(wrap_pyfunction!(dvar_dh, m)?)?;
    m.add_function(wrap_pyfunction!(polar_warming, m)?)?;
    m.add_function(wrap_pyfunction!(zonal_detrend, m)?)?;
    m.add_function(wrap_pyfunction!(gauss_profile, m)?)?;
    Ok(())
}
