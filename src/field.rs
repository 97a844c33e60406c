//! Solution fields and their finite element discretization.
use crate::error::AssemblyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A scalar solution field of the mixed velocity-pressure system.
///
/// The declaration order is the order of the fields in local and global systems: velocity
/// components first, pressure last.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    U,
    V,
    /// Only present in three dimensions.
    W,
    P,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Self::U => "U",
            Self::V => "V",
            Self::W => "W",
            Self::P => "P",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, AssemblyError> {
        match name {
            "U" => Ok(Self::U),
            "V" => Ok(Self::V),
            "W" => Ok(Self::W),
            "P" => Ok(Self::P),
            _ => Err(AssemblyError::UnknownField { name: name.to_string() }),
        }
    }

    pub fn is_velocity(&self) -> bool {
        !matches!(self, Self::P)
    }

    /// The velocity component fields of a problem in the given dimension.
    pub fn velocity_components(dim: usize) -> Result<&'static [Field], AssemblyError> {
        match dim {
            2 => Ok(&[Self::U, Self::V]),
            3 => Ok(&[Self::U, Self::V, Self::W]),
            _ => Err(AssemblyError::DimensionMismatch {
                expected: if dim < 2 { 2 } else { 3 },
                actual: dim,
            }),
        }
    }

    /// All fields of the problem, in system order.
    pub fn system_fields(dim: usize) -> Result<&'static [Field], AssemblyError> {
        match dim {
            2 => Ok(&[Self::U, Self::V, Self::P]),
            3 => Ok(&[Self::U, Self::V, Self::W, Self::P]),
            _ => Err(AssemblyError::DimensionMismatch {
                expected: if dim < 2 { 2 } else { 3 },
                actual: dim,
            }),
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeFamily {
    #[default]
    Lagrange,
}

/// Polynomial order of a Lagrange field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeOrder {
    Linear,
    Quadratic,
}

impl FeOrder {
    /// Parses the conventional names `"first"`/`"second"` as well as `"linear"`/`"quadratic"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "first" | "linear" => Some(Self::Linear),
            "second" | "quadratic" => Some(Self::Quadratic),
            _ => None,
        }
    }
}

/// Discretization orders of the velocity and pressure fields.
///
/// The geometry is always described by quadratic elements. Defaults to the Taylor-Hood pair with
/// quadratic velocity and linear pressure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLayout {
    pub family: FeFamily,
    pub velocity_order: FeOrder,
    pub pressure_order: FeOrder,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            family: FeFamily::Lagrange,
            velocity_order: FeOrder::Quadratic,
            pressure_order: FeOrder::Linear,
        }
    }
}

impl FieldLayout {
    pub fn order(&self, field: Field) -> FeOrder {
        if field.is_velocity() {
            self.velocity_order
        } else {
            self.pressure_order
        }
    }

    /// Whether velocity and pressure are both linear, the only case with a nonzero
    /// equal-order stabilization coefficient.
    pub fn is_equal_order_linear(&self) -> bool {
        self.velocity_order == FeOrder::Linear && self.pressure_order == FeOrder::Linear
    }
}
