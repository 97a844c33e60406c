//! Gauss quadrature and evaluation of shape functions at quadrature points.
//!
//! The assembly kernels only interact with shape functions through the [`QuadratureEvaluator`]
//! trait. [`LagrangeQuadratureEvaluator`] is the tabulated implementation for the reference
//! elements of [`crate::element`], and [`FiniteElementTable`] collects one evaluator per field
//! order so that all fields of an element share the same quadrature points.
use crate::element::{second_derivative_pairs, ElementType};
use crate::error::AssemblyError;
use crate::field::FeOrder;
use fenris_quadrature::{tensor, Rule};
use itertools::izip;
use log::debug;
use nalgebra::{DMatrix, DMatrixView, DVector};

/// Quadrature rule with three-dimensional points (equivalent to `fenris_quadrature::Rule<3>`).
type Rule3d = Rule<3>;

/// Number of Gauss points per direction needed to integrate polynomials of the given degree.
///
/// The conventional "seventh" order rule (degree 7) thus has 4 points per direction.
pub fn gauss_points_for_degree(degree: usize) -> usize {
    degree / 2 + 1
}

/// Tensor product Gauss rule on the reference domain of the element, with points padded to
/// three components.
pub fn reference_rule(element_type: ElementType, num_points_per_dim: usize) -> Rule3d {
    match element_type {
        ElementType::Quad4 | ElementType::Quad9 => {
            let (weights, points) = tensor::quadrilateral_gauss(num_points_per_dim);
            let points = points.into_iter().map(|[x, y]| [x, y, 0.0]).collect();
            (weights, points)
        }
        ElementType::Hex8 | ElementType::Hex27 => tensor::hexahedron_gauss(num_points_per_dim),
    }
}

/// Weight and shape function data in physical coordinates at a single quadrature point.
///
/// Gradients are stored as `num_nodes x dim`, second derivatives as
/// `num_nodes x num_second_derivatives` in the order of [`second_derivative_pairs`].
#[derive(Debug, Clone)]
pub struct QuadraturePointData {
    pub weight: f64,
    pub phi: DVector<f64>,
    pub phi_x: DMatrix<f64>,
    pub phi_xx: DMatrix<f64>,
}

impl Default for QuadraturePointData {
    fn default() -> Self {
        Self {
            weight: 0.0,
            phi: DVector::zeros(0),
            phi_x: DMatrix::zeros(0, 0),
            phi_xx: DMatrix::zeros(0, 0),
        }
    }
}

impl QuadraturePointData {
    fn resize(&mut self, num_nodes: usize, dim: usize, dim2: usize) {
        if self.phi.len() != num_nodes {
            self.phi = DVector::zeros(num_nodes);
        }
        if self.phi_x.shape() != (num_nodes, dim) {
            self.phi_x = DMatrix::zeros(num_nodes, dim);
        }
        if self.phi_xx.shape() != (num_nodes, dim2) {
            self.phi_xx = DMatrix::zeros(num_nodes, dim2);
        }
    }
}

/// Shape function evaluation at the quadrature points of a fixed rule.
pub trait QuadratureEvaluator: Send + Sync {
    fn element_type(&self) -> ElementType;

    fn gauss_point_count(&self) -> usize;

    /// Computes the weight and the physical shape function data at the given point.
    ///
    /// `coords` is a `dim x n` matrix holding the coordinates of the element's geometry nodes,
    /// with `n` at least the number of nodes of this element. The element is mapped
    /// isoparametrically through its own nodes, which are a prefix of the geometry nodes.
    ///
    /// Returns [`AssemblyError::DegenerateElement`] if the element map is not orientation
    /// preserving at the point.
    fn jacobian(
        &self,
        coords: DMatrixView<f64>,
        point: usize,
        data: &mut QuadraturePointData,
    ) -> Result<(), AssemblyError>;

    /// Shape function values at the given point, which do not depend on the geometry.
    fn shape_values(&self, point: usize) -> &[f64];
}

/// Tabulated Lagrange shape functions at the points of a tensor Gauss rule.
#[derive(Debug, Clone)]
pub struct LagrangeQuadratureEvaluator {
    element_type: ElementType,
    weights: Vec<f64>,
    values: Vec<Vec<f64>>,
    reference_gradients: Vec<DMatrix<f64>>,
    reference_hessians: Vec<DMatrix<f64>>,
}

impl LagrangeQuadratureEvaluator {
    pub fn new(element_type: ElementType, num_points_per_dim: usize) -> Self {
        let dim = element_type.dim();
        let n = element_type.num_nodes();
        let (weights, points) = reference_rule(element_type, num_points_per_dim);

        let mut values = Vec::with_capacity(weights.len());
        let mut reference_gradients = Vec::with_capacity(weights.len());
        let mut reference_hessians = Vec::with_capacity(weights.len());
        for point in &points {
            let xi = &point[..dim];
            let mut phi = vec![0.0; n];
            element_type.populate_basis(&mut phi, xi);
            let mut gradients = DMatrix::<f64>::zeros(n, dim);
            element_type.populate_basis_gradients((&mut gradients).into(), xi);
            let mut hessians = DMatrix::<f64>::zeros(n, element_type.num_second_derivatives());
            element_type.populate_basis_hessians((&mut hessians).into(), xi);

            values.push(phi);
            reference_gradients.push(gradients);
            reference_hessians.push(hessians);
        }

        Self {
            element_type,
            weights,
            values,
            reference_gradients,
            reference_hessians,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.element_type.num_nodes()
    }
}

impl QuadratureEvaluator for LagrangeQuadratureEvaluator {
    fn element_type(&self) -> ElementType {
        self.element_type
    }

    fn gauss_point_count(&self) -> usize {
        self.weights.len()
    }

    fn jacobian(
        &self,
        coords: DMatrixView<f64>,
        point: usize,
        data: &mut QuadraturePointData,
    ) -> Result<(), AssemblyError> {
        let dim = self.element_type.dim();
        let n = self.num_nodes();
        if coords.nrows() != dim {
            return Err(AssemblyError::DimensionMismatch {
                expected: dim,
                actual: coords.nrows(),
            });
        }
        assert!(coords.ncols() >= n, "Not enough geometry nodes for the element");

        let grad_ref = &self.reference_gradients[point];
        // J = dx/dxi, a dim x dim matrix
        let jacobian = coords.columns(0, n) * grad_ref;
        let determinant = jacobian.determinant();
        if determinant <= 0.0 {
            return Err(AssemblyError::DegenerateElement { point, determinant });
        }
        let jacobian_inv = jacobian
            .try_inverse()
            .ok_or(AssemblyError::DegenerateElement { point, determinant })?;

        data.resize(n, dim, self.element_type.num_second_derivatives());
        data.weight = self.weights[point] * determinant;
        data.phi.copy_from_slice(&self.values[point]);
        // dphi/dx_j = sum_l dphi/dxi_l (J^-1)_{lj}
        grad_ref.mul_to(&jacobian_inv, &mut data.phi_x);

        // Second derivatives neglect the curvature of the element map, which vanishes for
        // affine geometry: H_x = J^-T H_xi J^-1
        let pairs = second_derivative_pairs(dim);
        let hessians_ref = &self.reference_hessians[point];
        let mut hessian = DMatrix::<f64>::zeros(dim, dim);
        for node in 0..n {
            for (&(a, b), &value) in izip!(pairs, hessians_ref.row(node).iter()) {
                hessian[(a, b)] = value;
                hessian[(b, a)] = value;
            }
            let hessian_x = jacobian_inv.transpose() * &hessian * &jacobian_inv;
            for (col, &(a, b)) in pairs.iter().enumerate() {
                data.phi_xx[(node, col)] = hessian_x[(a, b)];
            }
        }

        Ok(())
    }

    fn shape_values(&self, point: usize) -> &[f64] {
        &self.values[point]
    }
}

/// Evaluators of all field orders for the element geometry of a given dimension.
///
/// All evaluators share the same quadrature rule, so that a quadrature point index refers to
/// the same physical point for every field.
#[derive(Debug, Clone)]
pub struct FiniteElementTable {
    dim: usize,
    linear: LagrangeQuadratureEvaluator,
    quadratic: LagrangeQuadratureEvaluator,
}

impl FiniteElementTable {
    /// Builds the table with a Gauss rule that is exact for polynomials of the given degree.
    pub fn new(dim: usize, quadrature_degree: usize) -> Result<Self, AssemblyError> {
        let (linear, quadratic) = match (
            ElementType::with_order(dim, FeOrder::Linear),
            ElementType::with_order(dim, FeOrder::Quadratic),
        ) {
            (Some(linear), Some(quadratic)) => (linear, quadratic),
            _ => {
                return Err(AssemblyError::DimensionMismatch {
                    expected: if dim < 2 { 2 } else { 3 },
                    actual: dim,
                })
            }
        };
        let num_points = gauss_points_for_degree(quadrature_degree);
        debug!(
            "Tabulating {:?}/{:?} shape functions with {} Gauss points per direction",
            linear, quadratic, num_points
        );
        Ok(Self {
            dim,
            linear: LagrangeQuadratureEvaluator::new(linear, num_points),
            quadratic: LagrangeQuadratureEvaluator::new(quadratic, num_points),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn geometry_type(&self) -> ElementType {
        self.quadratic.element_type()
    }

    pub fn evaluator(&self, order: FeOrder) -> &LagrangeQuadratureEvaluator {
        match order {
            FeOrder::Linear => &self.linear,
            FeOrder::Quadratic => &self.quadratic,
        }
    }
}

