//! Element residual and hand-linearized tangent of the Picard (Stokes) operator.
use crate::assembly::block::{FieldBlockMatrix, FieldBlockVector};
use crate::assembly::gather::LocalDofs;
use crate::assembly::ElementKernel;
use crate::error::AssemblyError;
use crate::parameters::EQUAL_ORDER_ALPHA;
use crate::quadrature::QuadraturePointData;
use nalgebra::DVectorView;

/// Equal-order stabilization coefficient `scale * hk^2 / (4 IRe) * alpha`.
///
/// `hk` is the distance between the geometry nodes 0 and 2, i.e. an element diagonal. The
/// coefficient is exactly zero whenever the stabilization is inactive, regardless of `IRe`.
pub fn stabilization_coefficient(kernel: &ElementKernel, local: &LocalDofs) -> f64 {
    if !kernel.parameters.is_stabilized(&kernel.layout) {
        return 0.0;
    }
    let hk = (local.coords.column(0) - local.coords.column(2)).norm();
    let ireynolds = kernel.parameters.ireynolds;
    kernel.parameters.stabilization.scale * hk * hk / (4.0 * ireynolds) * EQUAL_ORDER_ALPHA
}

/// Accumulates the element residual and, if requested, the element tangent.
///
/// The residual uses the plain gradient form of the diffusion and contains no convective
/// term. The tangent couples each velocity component only with itself.
pub fn assemble_element(
    kernel: &ElementKernel,
    local: &LocalDofs,
    point: &mut QuadraturePointData,
    residual: &mut FieldBlockVector,
    jacobian: Option<&mut FieldBlockMatrix>,
) -> Result<(), AssemblyError> {
    let dim = local.dim();
    let pressure_block = dim;
    let num_p = local.num_pressure_dofs();
    let ireynolds = kernel.parameters.ireynolds;
    let force = &kernel.parameters.body_force[..dim];
    let stabilization = stabilization_coefficient(kernel, local);
    let mut jacobian = jacobian;

    for ig in 0..kernel.velocity.gauss_point_count() {
        kernel.velocity.jacobian(local.coords.as_view(), ig, point)?;
        let psi = DVectorView::from_slice(kernel.pressure.shape_values(ig), num_p);
        let w = point.weight;
        let phi = &point.phi;
        let phi_x = &point.phi_x;

        // grad_u[(k, j)] = du_k / dx_j
        let grad_u = local.velocity.tr_mul(phi_x);
        let p = psi.dot(&local.pressure);
        let div_u = grad_u.trace();

        for k in 0..dim {
            let mut res_k = residual.block_mut(k);
            for (i, phi_i) in phi.iter().enumerate() {
                let lap = phi_x.row(i).dot(&grad_u.row(k));
                res_k[i] += (-ireynolds * lap - p * phi_x[(i, k)] + force[k] * phi_i) * w;
            }
        }

        let mut res_p = residual.block_mut(pressure_block);
        res_p.axpy(div_u * w, &psi, 1.0);
        if stabilization != 0.0 {
            // Equal order: pressure gradients use the velocity shape functions
            let phi_x_p = phi_x.rows(0, num_p);
            let grad_p = phi_x_p.tr_mul(&local.pressure);
            for (i, res_i) in res_p.iter_mut().enumerate() {
                *res_i += stabilization * phi_x_p.row(i).transpose().dot(&grad_p) * w;
            }
        }

        if let Some(jacobian) = jacobian.as_deref_mut() {
            for k in 0..dim {
                jacobian
                    .block_mut(k, k)
                    .gemm(ireynolds * w, phi_x, &phi_x.transpose(), 1.0);
                jacobian
                    .block_mut(k, pressure_block)
                    .ger(-w, &phi_x.column(k), &psi, 1.0);
                jacobian
                    .block_mut(pressure_block, k)
                    .ger(-w, &psi, &phi_x.column(k), 1.0);
            }
            if stabilization != 0.0 {
                let phi_x_p = phi_x.rows(0, num_p);
                jacobian.block_mut(pressure_block, pressure_block).gemm(
                    -stabilization * w,
                    &phi_x_p,
                    &phi_x_p.transpose(),
                    1.0,
                );
            }
        }
    }

    Ok(())
}
