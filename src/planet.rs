//! Planetary constants used by the hydrostatic and mass transport calculations

/// Fixed physical constants for a planetary atmosphere.
///
/// These are read-only configuration: build one (or use [`Planet::MARS`]) and
/// pass it into the routines that need it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Planet {
    /// Gravitational acceleration in m/s^2.
    pub gravity: f64,
    /// Mean planetary radius in m.
    pub radius: f64,
    /// Specific gas constant of the atmosphere in J/kg/K.
    pub gas_constant: f64,
}

impl Planet {
    /// A CO2 atmosphere on Mars.
    pub const MARS: Planet = Planet {
        gravity: 3.72,
        radius: 3.4e6,
        gas_constant: 191.00,
    };

    /// Hydrostatic scale factor `r T / g` in m for a temperature `t` in K.
    #[inline]
    pub(crate) fn thickness_scale(&self, t: f64) -> f64 {
        self.gas_constant * t / self.gravity
    }
}

impl Default for Planet {
    fn default() -> Self {
        Self::MARS
    }
}
