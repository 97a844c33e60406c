//! Physical and numerical parameters of the flow problem.
use crate::error::AssemblyError;
use crate::field::FieldLayout;
use serde::{Deserialize, Serialize};

/// Reference scales used to nondimensionalize the problem.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub length_ref: f64,
    pub velocity_ref: f64,
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            length_ref: 1.0,
            velocity_ref: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluidModel {
    #[default]
    Newtonian,
}

/// Material properties of the fluid.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fluid {
    pub parameter: Parameter,
    pub viscosity: f64,
    pub density: f64,
    pub model: FluidModel,
}

impl Fluid {
    pub fn new(parameter: Parameter, viscosity: f64, density: f64, model: FluidModel) -> Self {
        Self {
            parameter,
            viscosity,
            density,
            model,
        }
    }

    pub fn reynolds_number(&self) -> f64 {
        self.density * self.parameter.velocity_ref * self.parameter.length_ref / self.viscosity
    }

    /// The inverse Reynolds number, i.e. the nondimensional viscosity.
    pub fn ireynolds_number(&self) -> f64 {
        self.viscosity / (self.density * self.parameter.velocity_ref * self.parameter.length_ref)
    }
}

impl Default for Fluid {
    fn default() -> Self {
        Self::new(Parameter::default(), 1.0, 1.0, FluidModel::Newtonian)
    }
}

/// Equal-order pressure stabilization.
///
/// The stabilization coefficient is `scale * hk^2 / (4 IRe) * alpha`, where `alpha` is only
/// nonzero for linear velocity and linear pressure. With the default `scale` of zero the
/// stabilization is disabled.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationSettings {
    pub scale: f64,
}

/// The equal-order stabilization parameter for linear velocity and pressure.
pub const EQUAL_ORDER_ALPHA: f64 = 0.013333;

/// Parameters of the element kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyParameters {
    /// Inverse Reynolds number (nondimensional viscosity).
    pub ireynolds: f64,
    /// Constant body force; only the first `dim` components are used.
    pub body_force: [f64; 3],
    /// Whether the pressure-pressure block is assembled at all.
    pub penalty: bool,
    pub stabilization: StabilizationSettings,
    /// Polynomial degree integrated exactly by the Gauss rule.
    pub quadrature_degree: usize,
}

impl Default for AssemblyParameters {
    fn default() -> Self {
        Self {
            ireynolds: 1.0,
            body_force: [0.0, 1.0, 0.0],
            penalty: true,
            stabilization: StabilizationSettings::default(),
            quadrature_degree: 7,
        }
    }
}

impl AssemblyParameters {
    pub fn from_fluid(fluid: &Fluid) -> Self {
        Self {
            ireynolds: fluid.ireynolds_number(),
            ..Self::default()
        }
    }

    /// Whether the equal-order pressure stabilization contributes for the given layout.
    pub fn is_stabilized(&self, layout: &FieldLayout) -> bool {
        self.penalty && self.stabilization.scale != 0.0 && layout.is_equal_order_linear()
    }

    /// Checks that the parameters can be assembled with the given layout.
    ///
    /// The inverse Reynolds number must be finite and non-negative. It may only vanish if the
    /// stabilization, whose coefficient divides by it, is inactive.
    pub fn validate(&self, layout: &FieldLayout) -> Result<(), AssemblyError> {
        let ireynolds = self.ireynolds;
        if !(ireynolds.is_finite() && ireynolds >= 0.0) || (ireynolds == 0.0 && self.is_stabilized(layout)) {
            return Err(AssemblyError::InvalidParameter {
                name: "ireynolds",
                value: ireynolds,
            });
        }
        Ok(())
    }
}
