//! Boundary conditions and their application to an assembled system.
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

/// The condition a boundary predicate prescribes for a field at a boundary node.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    /// The field value is prescribed.
    Dirichlet(f64),
    /// The natural (traction-free) condition of the weak form.
    Natural,
}

impl BoundaryCondition {
    pub fn is_dirichlet(&self) -> bool {
        matches!(self, Self::Dirichlet(_))
    }
}

/// Replaces the given rows of the linearized system `J dx = r` by `dx_i = 0`.
///
/// The Dirichlet values are expected to already be present in the solution, so the increment
/// vanishes on Dirichlet rows. Rows and columns are zeroed, the diagonal is set to a
/// representative scale of the matrix and the right-hand side entries are zeroed.
///
/// The matrix must have a structurally symmetric sparsity pattern, which holds for patterns
/// built from element couplings.
pub fn apply_dirichlet_rows(matrix: &mut CsrMatrix<f64>, rhs: &mut DVector<f64>, rows: &[usize]) {
    assert_eq!(matrix.nrows(), rhs.len());

    // Simply setting 1 would ignore the scaling of the entries of the matrix, leading to
    // potentially poor condition numbers. The first non-zero diagonal entry is used instead.
    let scale = matrix
        .diagonal_as_csr()
        .values()
        .iter()
        .copied()
        .find(|&x| x != 0.0)
        .map(f64::abs)
        .unwrap_or(1.0);

    let mut dirichlet_membership = vec![false; matrix.nrows()];
    let mut rows_to_visit = vec![false; matrix.nrows()];

    for &row_idx in rows {
        dirichlet_membership[row_idx] = true;
        rhs[row_idx] = 0.0;
        let mut row = matrix.row_mut(row_idx);
        let (cols, values) = row.cols_and_values_mut();
        for (&col_idx, val) in cols.iter().zip(values) {
            if col_idx == row_idx {
                *val = scale;
            } else {
                *val = 0.0;
                // Zeroing (r, c) requires zeroing (c, r) as well
                rows_to_visit[col_idx] = true;
            }
        }
    }

    let row_visit_iter = rows_to_visit
        .iter()
        .enumerate()
        .filter_map(|(index, &should_visit)| should_visit.then_some(index));
    for row_index in row_visit_iter {
        if !dirichlet_membership[row_index] {
            let mut row = matrix.row_mut(row_index);
            let (cols, values) = row.cols_and_values_mut();
            for (local_idx, &global_idx) in cols.iter().enumerate() {
                if dirichlet_membership[global_idx] {
                    values[local_idx] = 0.0;
                }
            }
        }
    }
}
