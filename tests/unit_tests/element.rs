use fenris_fluid::element::{phi_quadratic_1d, phi_quadratic_1d_grad, ElementType};
use fenris_fluid::field::FeOrder;
use matrixcompare::{assert_scalar_eq, prop_assert_scalar_eq};
use nalgebra::DMatrix;
use proptest::prelude::*;

const ALL_ELEMENTS: [ElementType; 4] = [
    ElementType::Quad4,
    ElementType::Quad9,
    ElementType::Hex8,
    ElementType::Hex27,
];

fn reference_point(element: ElementType, node: usize) -> Vec<f64> {
    element.reference_coords(node)[..element.dim()].to_vec()
}

#[test]
fn element_type_from_dimension_and_order() {
    assert_eq!(ElementType::with_order(2, FeOrder::Linear), Some(ElementType::Quad4));
    assert_eq!(ElementType::with_order(3, FeOrder::Quadratic), Some(ElementType::Hex27));
    assert_eq!(ElementType::with_order(1, FeOrder::Linear), None);
    assert_eq!(ElementType::geometry(2), Some(ElementType::Quad9));
    assert_eq!(ElementType::geometry(3), Some(ElementType::Hex27));
    assert_eq!(ElementType::Hex8.num_second_derivatives(), 6);
    assert_eq!(ElementType::Quad9.num_vertices(), 4);
}

#[test]
fn linear_nodes_are_prefix_of_quadratic_nodes() {
    for (linear, quadratic) in [
        (ElementType::Quad4, ElementType::Quad9),
        (ElementType::Hex8, ElementType::Hex27),
    ] {
        for node in 0..linear.num_nodes() {
            assert_eq!(linear.reference_coords(node), quadratic.reference_coords(node));
        }
    }
}

#[test]
fn basis_functions_are_nodal() {
    for element in ALL_ELEMENTS {
        let n = element.num_nodes();
        let mut phi = vec![0.0; n];
        for j in 0..n {
            element.populate_basis(&mut phi, &reference_point(element, j));
            for (i, phi_i) in phi.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_scalar_eq!(*phi_i, expected, comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn quadratic_1d_basis_values() {
    assert_scalar_eq!(phi_quadratic_1d(-1.0, -1.0), 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(phi_quadratic_1d(0.0, 0.5), 0.75, comp = abs, tol = 1e-14);
    assert_scalar_eq!(phi_quadratic_1d(1.0, 0.5), 0.375, comp = abs, tol = 1e-14);
    assert_scalar_eq!(phi_quadratic_1d_grad(0.0, 0.5), -1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(phi_quadratic_1d_grad(1.0, 0.0), 0.5, comp = abs, tol = 1e-14);
}

fn element_and_point() -> impl Strategy<Value = (ElementType, Vec<f64>)> {
    proptest::sample::select(ALL_ELEMENTS.to_vec()).prop_flat_map(|element| {
        let point = proptest::collection::vec(-1.0..=1.0f64, element.dim());
        (Just(element), point)
    })
}

proptest! {
    #[test]
    fn basis_is_partition_of_unity((element, xi) in element_and_point()) {
        let n = element.num_nodes();
        let mut phi = vec![0.0; n];
        element.populate_basis(&mut phi, &xi);
        prop_assert_scalar_eq!(phi.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-12);

        let mut gradients = DMatrix::<f64>::zeros(n, element.dim());
        element.populate_basis_gradients(gradients.as_view_mut(), &xi);
        for j in 0..element.dim() {
            prop_assert_scalar_eq!(gradients.column(j).sum(), 0.0, comp = abs, tol = 1e-12);
        }

        let mut hessians = DMatrix::<f64>::zeros(n, element.num_second_derivatives());
        element.populate_basis_hessians(hessians.as_view_mut(), &xi);
        for j in 0..element.num_second_derivatives() {
            prop_assert_scalar_eq!(hessians.column(j).sum(), 0.0, comp = abs, tol = 1e-12);
        }
    }

    #[test]
    fn gradients_match_finite_differences((element, xi) in element_and_point()) {
        let n = element.num_nodes();
        let dim = element.dim();
        let h = 1e-6;
        let mut gradients = DMatrix::<f64>::zeros(n, dim);
        element.populate_basis_gradients(gradients.as_view_mut(), &xi);

        let mut phi_plus = vec![0.0; n];
        let mut phi_minus = vec![0.0; n];
        for j in 0..dim {
            let mut xi_plus = xi.clone();
            let mut xi_minus = xi.clone();
            xi_plus[j] += h;
            xi_minus[j] -= h;
            element.populate_basis(&mut phi_plus, &xi_plus);
            element.populate_basis(&mut phi_minus, &xi_minus);
            for i in 0..n {
                let fd = (phi_plus[i] - phi_minus[i]) / (2.0 * h);
                prop_assert_scalar_eq!(gradients[(i, j)], fd, comp = abs, tol = 1e-7);
            }
        }
    }

    #[test]
    fn mixed_second_derivatives_match_finite_differences((element, xi) in element_and_point()) {
        let n = element.num_nodes();
        let dim = element.dim();
        let h = 1e-6;
        let mut hessians = DMatrix::<f64>::zeros(n, element.num_second_derivatives());
        element.populate_basis_hessians(hessians.as_view_mut(), &xi);

        // d/dx_0 of the gradient column 1 is the mixed derivative xy, stored after the diagonal
        let mut xi_plus = xi.clone();
        let mut xi_minus = xi.clone();
        xi_plus[0] += h;
        xi_minus[0] -= h;
        let mut grad_plus = DMatrix::<f64>::zeros(n, dim);
        let mut grad_minus = DMatrix::<f64>::zeros(n, dim);
        element.populate_basis_gradients(grad_plus.as_view_mut(), &xi_plus);
        element.populate_basis_gradients(grad_minus.as_view_mut(), &xi_minus);
        for i in 0..n {
            let fd_xx = (grad_plus[(i, 0)] - grad_minus[(i, 0)]) / (2.0 * h);
            let fd_xy = (grad_plus[(i, 1)] - grad_minus[(i, 1)]) / (2.0 * h);
            prop_assert_scalar_eq!(hessians[(i, 0)], fd_xx, comp = abs, tol = 1e-6);
            prop_assert_scalar_eq!(hessians[(i, dim)], fd_xy, comp = abs, tol = 1e-6);
        }
    }
}
