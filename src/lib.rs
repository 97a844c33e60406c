//! Element assembly for mixed velocity-pressure finite element discretizations of
//! incompressible flow.
//!
//! The crate assembles the global residual and Jacobian of the (Navier-)Stokes equations
//! discretized with Lagrange elements on quadrilateral and hexahedral meshes. Two element
//! kernels are available, see [`assembly::LinearizationStrategy`]: a hand-linearized Picard
//! kernel and a kernel that records the residual on an automatic differentiation tape and
//! extracts the exact element Jacobian.
use nalgebra::RealField;

pub mod assembly;
pub mod boundary;
pub mod dofs;
pub mod element;
pub mod error;
pub mod field;
pub mod mesh;
pub mod parameters;
pub mod quadrature;
pub mod solution;
pub mod system;

pub extern crate fenris_autodiff;
pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

/// Scalar types usable for shape function evaluation.
///
/// Used as a trait alias for the traits needed by the generic basis routines.
pub trait Real: RealField + Copy {}

impl<T> Real for T where T: RealField + Copy {}
