//! Element residual recorded on a tape and its exact Jacobian by reverse sweeps.
use crate::assembly::block::{FieldBlockMatrix, FieldBlockVector};
use crate::assembly::gather::LocalDofs;
use crate::assembly::ElementKernel;
use crate::error::AssemblyError;
use crate::quadrature::QuadraturePointData;
use fenris_autodiff::{AReal, Recording, Tape};
use itertools::izip;

/// Accumulates the element residual and, if requested, its exact Jacobian.
///
/// The diffusion uses the symmetric strain-rate form `grad u + grad u^T`. The residual is
/// accumulated with an extra negation, `aRes = -NS(u, p)`, and stored negated once more, so that
/// `residual = NS(u, p)` while `jacobian = d aRes / d (u, p)`.
pub fn assemble_element(
    kernel: &ElementKernel,
    local: &LocalDofs,
    tape: &mut Tape,
    point: &mut QuadraturePointData,
    residual: &mut FieldBlockVector,
    jacobian: Option<&mut FieldBlockMatrix>,
) -> Result<(), AssemblyError> {
    let recording = tape.new_recording()?;

    let dim = local.dim();
    let velocity: Vec<Vec<AReal>> = (0..dim)
        .map(|k| {
            let values: Vec<f64> = local.velocity.column(k).iter().copied().collect();
            recording.variables(&values)
        })
        .collect();
    let pressure = recording.variables(local.pressure.as_slice());

    let (a_res_v, a_res_p) = accumulate_residual(kernel, local, &recording, &velocity, &pressure, point)?;

    let independents: Vec<AReal> = velocity.iter().flatten().chain(&pressure).copied().collect();
    let dependents: Vec<AReal> = a_res_v.iter().flatten().chain(&a_res_p).copied().collect();
    let registered = recording.independent(&independents);
    recording.dependent(&dependents);

    let extracted = match (registered, jacobian) {
        (Ok(()), Some(jacobian)) => recording.jacobian_into(jacobian.as_matrix_mut()),
        (registered, _) => registered,
    };
    // Registrations must not leak into the next element, even on failure
    recording.clear_independents();
    recording.clear_dependents();
    extracted?;

    for (k, a_res_k) in a_res_v.iter().enumerate() {
        for (r, a) in izip!(residual.block_mut(k).iter_mut(), a_res_k) {
            *r = -a.value();
        }
    }
    for (r, a) in izip!(residual.block_mut(dim).iter_mut(), &a_res_p) {
        *r = -a.value();
    }

    Ok(())
}

type ResidualBlocks<'r> = (Vec<Vec<AReal<'r>>>, Vec<AReal<'r>>);

fn accumulate_residual<'r>(
    kernel: &ElementKernel,
    local: &LocalDofs,
    recording: &Recording<'r>,
    velocity: &[Vec<AReal<'r>>],
    pressure: &[AReal<'r>],
    point: &mut QuadraturePointData,
) -> Result<ResidualBlocks<'r>, AssemblyError> {
    let dim = velocity.len();
    let num_v = velocity.first().map(Vec::len).unwrap_or(0);
    let ireynolds = kernel.parameters.ireynolds;
    let force = &kernel.parameters.body_force[..dim];

    let mut a_res_v = vec![vec![recording.zero(); num_v]; dim];
    let mut a_res_p = vec![recording.zero(); pressure.len()];
    let mut grad_u = vec![vec![recording.zero(); dim]; dim];

    for ig in 0..kernel.velocity.gauss_point_count() {
        kernel.velocity.jacobian(local.coords.as_view(), ig, point)?;
        let psi = kernel.pressure.shape_values(ig);
        let w = point.weight;
        let phi = &point.phi;
        let phi_x = &point.phi_x;

        for (k, grad_u_k) in grad_u.iter_mut().enumerate() {
            for (j, grad_u_kj) in grad_u_k.iter_mut().enumerate() {
                let mut sum = recording.zero();
                for (i, u_ki) in velocity[k].iter().enumerate() {
                    sum += *u_ki * phi_x[(i, j)];
                }
                *grad_u_kj = sum;
            }
        }
        let mut p = recording.zero();
        for (psi_i, p_i) in izip!(psi, pressure) {
            p += *p_i * *psi_i;
        }

        for i in 0..num_v {
            for k in 0..dim {
                let mut diffusion = recording.zero();
                for j in 0..dim {
                    diffusion += (grad_u[k][j] + grad_u[j][k]) * phi_x[(i, j)];
                }
                // The force term is outside the sum over j: it enters once per component
                let nsv = ireynolds * diffusion - force[k] * phi[i] - p * phi_x[(i, k)];
                a_res_v[k][i] += -nsv * w;
            }
        }

        let mut div_u = recording.zero();
        for (k, grad_u_k) in grad_u.iter().enumerate() {
            div_u += grad_u_k[k];
        }
        for (a_res_i, psi_i) in izip!(&mut a_res_p, psi) {
            *a_res_i += -div_u * *psi_i * w;
        }
    }

    Ok((a_res_v, a_res_p))
}
