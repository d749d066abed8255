//! Physical quantities carried by an atmosphere model.

use serde::{Deserialize, Serialize};

/// One physical quantity of the atmosphere, stored as a `(depth, y, x)` cube.
///
/// The declaration order is the argument order of the physics model entry
/// points and the index into per-quantity arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quantity {
    /// Temperature [K]
    #[serde(rename = "T")]
    Temperature,
    /// Gas pressure [dyn cm^-2]
    #[serde(rename = "P")]
    Pressure,
    /// Mass density [g cm^-3]
    #[serde(rename = "rho")]
    Density,
    /// Line-of-sight velocity, or momentum density (see `VelocityKind`)
    #[serde(rename = "vz")]
    Velocity,
    /// Magnetic field, x component [G]
    #[serde(rename = "Bx")]
    FieldX,
    /// Magnetic field, y component [G]
    #[serde(rename = "By")]
    FieldY,
    /// Magnetic field, z component [G]
    #[serde(rename = "Bz")]
    FieldZ,
    /// Optical depth at the reference wavelength (500 nm)
    #[serde(rename = "tau")]
    Tau,
    /// Electron density [cm^-3]
    #[serde(rename = "ne")]
    ElectronDensity,
}

impl Quantity {
    /// Number of quantities.
    pub const COUNT: usize = 9;

    /// All quantities, in argument order.
    pub const ALL: [Quantity; Self::COUNT] = [
        Quantity::Temperature,
        Quantity::Pressure,
        Quantity::Density,
        Quantity::Velocity,
        Quantity::FieldX,
        Quantity::FieldY,
        Quantity::FieldZ,
        Quantity::Tau,
        Quantity::ElectronDensity,
    ];

    /// Position in [`Quantity::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short name used in configuration files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "T",
            Self::Pressure => "P",
            Self::Density => "rho",
            Self::Velocity => "vz",
            Self::FieldX => "Bx",
            Self::FieldY => "By",
            Self::FieldZ => "Bz",
            Self::Tau => "tau",
            Self::ElectronDensity => "ne",
        }
    }

    /// Parse a short name (case-sensitive, `T` and `tau` differ only in case).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|q| q.as_str() == name)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
