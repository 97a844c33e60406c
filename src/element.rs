//! Reference Lagrange elements on quadrilaterals and hexahedra.
//!
//! All elements are tensor products of one-dimensional Lagrange polynomials on `[-1, 1]`. Nodes
//! are ordered with the vertices first, so that the nodes of a linear element are a prefix of
//! the nodes of the quadratic element with the same geometry.
use crate::field::FeOrder;
use crate::Real;
use nalgebra::DMatrixViewMut;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Quad4,
    Quad9,
    Hex8,
    Hex27,
}

#[rustfmt::skip]
const QUAD9_REFERENCE_COORDS: [[f64; 2]; 9] = [
    [-1.0, -1.0],
    [ 1.0, -1.0],
    [ 1.0,  1.0],
    [-1.0,  1.0],
    // Edge nodes
    [ 0.0, -1.0],
    [ 1.0,  0.0],
    [ 0.0,  1.0],
    [-1.0,  0.0],
    // Center node
    [ 0.0,  0.0],
];

#[rustfmt::skip]
const HEX27_REFERENCE_COORDS: [[f64; 3]; 27] = [
    [-1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0],
    [ 1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0],
    [-1.0, -1.0,  1.0],
    [ 1.0, -1.0,  1.0],
    [ 1.0,  1.0,  1.0],
    [-1.0,  1.0,  1.0],
    // Edge nodes
    [ 0.0, -1.0, -1.0],
    [-1.0,  0.0, -1.0],
    [-1.0, -1.0,  0.0],
    [ 1.0,  0.0, -1.0],
    [ 1.0, -1.0,  0.0],
    [ 0.0,  1.0, -1.0],
    [ 1.0,  1.0,  0.0],
    [-1.0,  1.0,  0.0],
    [ 0.0, -1.0,  1.0],
    [-1.0,  0.0,  1.0],
    [ 1.0,  0.0,  1.0],
    [ 0.0,  1.0,  1.0],
    // Face nodes
    [ 0.0,  0.0, -1.0],
    [ 0.0, -1.0,  0.0],
    [-1.0,  0.0,  0.0],
    [ 1.0,  0.0,  0.0],
    [ 0.0,  1.0,  0.0],
    [ 0.0,  0.0,  1.0],
    // Center node
    [ 0.0,  0.0,  0.0],
];

impl ElementType {
    /// The element of the given order on the quadrilateral (2D) or hexahedral (3D) geometry.
    pub fn with_order(dim: usize, order: FeOrder) -> Option<Self> {
        match (dim, order) {
            (2, FeOrder::Linear) => Some(Self::Quad4),
            (2, FeOrder::Quadratic) => Some(Self::Quad9),
            (3, FeOrder::Linear) => Some(Self::Hex8),
            (3, FeOrder::Quadratic) => Some(Self::Hex27),
            _ => None,
        }
    }

    /// The (quadratic) geometry element in the given dimension.
    pub fn geometry(dim: usize) -> Option<Self> {
        Self::with_order(dim, FeOrder::Quadratic)
    }

    pub fn dim(&self) -> usize {
        match self {
            Self::Quad4 | Self::Quad9 => 2,
            Self::Hex8 | Self::Hex27 => 3,
        }
    }

    pub fn order(&self) -> FeOrder {
        match self {
            Self::Quad4 | Self::Hex8 => FeOrder::Linear,
            Self::Quad9 | Self::Hex27 => FeOrder::Quadratic,
        }
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            Self::Quad4 => 4,
            Self::Quad9 => 9,
            Self::Hex8 => 8,
            Self::Hex27 => 27,
        }
    }

    pub fn num_vertices(&self) -> usize {
        match self.dim() {
            2 => 4,
            _ => 8,
        }
    }

    /// Number of independent second derivatives: 1 in 1D, 3 in 2D, 6 in 3D.
    pub fn num_second_derivatives(&self) -> usize {
        let d = self.dim();
        d * (d + 1) / 2
    }

    /// Reference coordinates of the given node, padded with zeros to three components.
    pub fn reference_coords(&self, node: usize) -> [f64; 3] {
        assert!(node < self.num_nodes(), "Node index out of bounds");
        match self.dim() {
            2 => {
                let [x, y] = QUAD9_REFERENCE_COORDS[node];
                [x, y, 0.0]
            }
            _ => HEX27_REFERENCE_COORDS[node],
        }
    }

    /// Evaluates all basis functions at the reference point `xi`.
    pub fn populate_basis<T: Real>(&self, basis: &mut [T], xi: &[T]) {
        assert_eq!(basis.len(), self.num_nodes());
        assert_eq!(xi.len(), self.dim());
        let order = self.order();
        for (node, phi) in basis.iter_mut().enumerate() {
            let alpha = self.reference_coords(node);
            *phi = (0..self.dim())
                .map(|d| phi_1d(order, from_f64::<T>(alpha[d]), xi[d]))
                .fold(T::one(), |acc, v| acc * v);
        }
    }

    /// Evaluates reference gradients into a `num_nodes x dim` matrix.
    pub fn populate_basis_gradients<T: Real>(&self, mut gradients: DMatrixViewMut<T>, xi: &[T]) {
        assert_eq!(gradients.nrows(), self.num_nodes());
        assert_eq!(gradients.ncols(), self.dim());
        assert_eq!(xi.len(), self.dim());
        let order = self.order();
        let dim = self.dim();
        for node in 0..self.num_nodes() {
            let alpha = self.reference_coords(node);
            for j in 0..dim {
                let mut product = T::one();
                for d in 0..dim {
                    let a = from_f64::<T>(alpha[d]);
                    product *= if d == j {
                        phi_1d_derivative(order, a, xi[d])
                    } else {
                        phi_1d(order, a, xi[d])
                    };
                }
                gradients[(node, j)] = product;
            }
        }
    }

    /// Evaluates reference second derivatives into a `num_nodes x num_second_derivatives` matrix.
    ///
    /// The columns are ordered `(xx, yy, xy)` in 2D and `(xx, yy, zz, xy, yz, xz)` in 3D.
    pub fn populate_basis_hessians<T: Real>(&self, mut hessians: DMatrixViewMut<T>, xi: &[T]) {
        assert_eq!(hessians.nrows(), self.num_nodes());
        assert_eq!(hessians.ncols(), self.num_second_derivatives());
        assert_eq!(xi.len(), self.dim());
        let order = self.order();
        let dim = self.dim();
        for node in 0..self.num_nodes() {
            let alpha = self.reference_coords(node);
            for (col, &(a, b)) in second_derivative_pairs(dim).iter().enumerate() {
                let mut product = T::one();
                for d in 0..dim {
                    let alpha_d = from_f64::<T>(alpha[d]);
                    let times_differentiated = (d == a) as usize + (d == b) as usize;
                    product *= match times_differentiated {
                        0 => phi_1d(order, alpha_d, xi[d]),
                        1 => phi_1d_derivative(order, alpha_d, xi[d]),
                        _ => phi_1d_second_derivative(order, alpha_d, xi[d]),
                    };
                }
                hessians[(node, col)] = product;
            }
        }
    }
}

/// Index pairs `(a, b)` of the second derivatives `d^2 / (dx_a dx_b)`, in storage order.
pub fn second_derivative_pairs(dim: usize) -> &'static [(usize, usize)] {
    match dim {
        1 => &[(0, 0)],
        2 => &[(0, 0), (1, 1), (0, 1)],
        _ => &[(0, 0), (1, 1), (2, 2), (0, 1), (1, 2), (0, 2)],
    }
}

fn from_f64<T: Real>(value: f64) -> T {
    T::from_f64(value).expect("Literal must fit in T")
}

fn phi_1d<T: Real>(order: FeOrder, alpha: T, xi: T) -> T {
    match order {
        FeOrder::Linear => phi_linear_1d(alpha, xi),
        FeOrder::Quadratic => phi_quadratic_1d(alpha, xi),
    }
}

fn phi_1d_derivative<T: Real>(order: FeOrder, alpha: T, xi: T) -> T {
    match order {
        FeOrder::Linear => phi_linear_1d_grad(alpha, xi),
        FeOrder::Quadratic => phi_quadratic_1d_grad(alpha, xi),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn phi_1d_second_derivative<T: Real>(order: FeOrder, alpha: T, _xi: T) -> T {
    match order {
        FeOrder::Linear => 0.0,
        FeOrder::Quadratic => 2.0 * ((3.0 / 2.0) * alpha * alpha - 1.0),
    }
}

/// The linear 1D basis function associated with the node `alpha` in `{-1, 1}`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn phi_linear_1d<T: Real>(alpha: T, xi: T) -> T {
    (1.0 + alpha * xi) / 2.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn phi_linear_1d_grad<T: Real>(alpha: T, _xi: T) -> T {
    alpha / 2.0
}

/// The quadratic 1D basis function associated with the node `alpha` in `{-1, 0, 1}`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn phi_quadratic_1d<T: Real>(alpha: T, xi: T) -> T {
    let alpha2 = alpha * alpha;
    let a = (3.0 / 2.0) * alpha2 - 1.0;
    let b = alpha / 2.0;
    let c = 1.0 - alpha2;
    a * xi * xi + b * xi + c
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn phi_quadratic_1d_grad<T: Real>(alpha: T, xi: T) -> T {
    let alpha2 = alpha * alpha;
    let a = (3.0 / 2.0) * alpha2 - 1.0;
    let b = alpha / 2.0;
    2.0 * a * xi + b
}
