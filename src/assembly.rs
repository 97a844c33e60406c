//! Assembly of the global residual and Jacobian of the mixed velocity-pressure system.
//!
//! For every element owned by a partition the assembler gathers the local degrees of freedom,
//! evaluates one of the element kernels selected by [`LinearizationStrategy`] at the quadrature
//! points and scatters the element contributions additively into the partitioned global
//! system. Partitions are processed in parallel, elements within a partition sequentially.
use crate::assembly::block::{FieldBlockMatrix, FieldBlockVector};
use crate::assembly::gather::{gather_element, LocalDofs};
use crate::dofs::SystemDofMap;
use crate::error::AssemblyError;
use crate::field::FieldLayout;
use crate::mesh::{FluidMesh, MeshPartition};
use crate::parameters::AssemblyParameters;
use crate::quadrature::{FiniteElementTable, QuadratureEvaluator, QuadraturePointData};
use crate::solution::Solution;
use crate::system::{assemble_pattern, DistributedMatrix, DistributedVector};
use eyre::WrapErr;
use fenris_autodiff::Tape;
use log::{debug, trace};
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;
use thread_local::ThreadLocal;

pub mod block;
pub mod gather;

mod autodiff;
mod picard;

/// How the element residual is linearized.
///
/// The two kernels share gathering and scattering but differ in their diffusion term: the
/// Picard kernel uses the gradient form with a hand-derived tangent, while the automatic
/// differentiation kernel uses the symmetric strain-rate form with the exact Jacobian.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearizationStrategy {
    #[default]
    AnalyticPicard,
    AutomaticDifferentiation,
}

/// The assembled global system.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    pub residual: DVector<f64>,
    pub matrix: Option<CsrMatrix<f64>>,
}

/// Everything an element kernel needs besides the element's own data.
pub(crate) struct ElementKernel<'a> {
    pub velocity: &'a dyn QuadratureEvaluator,
    pub pressure: &'a dyn QuadratureEvaluator,
    pub parameters: &'a AssemblyParameters,
    pub layout: FieldLayout,
}

#[derive(Debug, Default)]
struct ElementWorkspace {
    local: LocalDofs,
    point: QuadraturePointData,
    residual: FieldBlockVector,
    jacobian: FieldBlockMatrix,
    block_sizes: Vec<usize>,
}

/// Assembles the Navier-Stokes system for the current state of a solution.
pub struct NavierStokesAssembler<'a> {
    mesh: &'a FluidMesh,
    partition: &'a MeshPartition,
    solution: &'a Solution,
    parameters: AssemblyParameters,
    strategy: LinearizationStrategy,
    table: FiniteElementTable,
    dof_map: SystemDofMap,
    pattern: Arc<SparsityPattern>,
    workspace: ThreadLocal<RefCell<ElementWorkspace>>,
    tapes: ThreadLocal<RefCell<Tape>>,
}

impl<'a> NavierStokesAssembler<'a> {
    /// Prepares assembly: tabulates shape functions, builds the row map and the sparsity
    /// pattern of the global system.
    pub fn new(
        mesh: &'a FluidMesh,
        partition: &'a MeshPartition,
        solution: &'a Solution,
        parameters: AssemblyParameters,
        strategy: LinearizationStrategy,
    ) -> eyre::Result<Self> {
        parameters
            .validate(solution.layout())
            .wrap_err("Invalid assembly parameters")?;
        let table = FiniteElementTable::new(mesh.dim(), parameters.quadrature_degree)
            .wrap_err("Failed to tabulate finite elements")?;
        let dof_map = solution.system_dof_map();
        if dof_map.layout().num_partitions() != partition.num_partitions() {
            return Err(AssemblyError::InvalidPartitioning {
                num_partitions: partition.num_partitions(),
                num_elements: mesh.num_elements(),
            })
            .wrap_err("Solution is distributed over a different number of partitions");
        }

        let mut local = LocalDofs::default();
        let mut element_rows = Vec::with_capacity(mesh.num_elements());
        for &element in partition.all_elements() {
            gather_element(mesh, solution, &dof_map, element, &mut local)
                .wrap_err_with(|| format!("Failed to gather dofs of element {}", element))?;
            element_rows.push(local.rows.clone());
        }
        let pattern = assemble_pattern(dof_map.num_rows(), element_rows)?;
        debug!(
            "Prepared {:?} assembly: {} rows, {} stored entries, {} partitions",
            strategy,
            dof_map.num_rows(),
            pattern.nnz(),
            partition.num_partitions()
        );

        Ok(Self {
            mesh,
            partition,
            solution,
            parameters,
            strategy,
            table,
            dof_map,
            pattern: Arc::new(pattern),
            workspace: ThreadLocal::new(),
            tapes: ThreadLocal::new(),
        })
    }

    pub fn dof_map(&self) -> &SystemDofMap {
        &self.dof_map
    }

    pub fn strategy(&self) -> LinearizationStrategy {
        self.strategy
    }

    pub fn parameters(&self) -> &AssemblyParameters {
        &self.parameters
    }

    pub fn pattern(&self) -> &Arc<SparsityPattern> {
        &self.pattern
    }

    /// Assembles the global residual and, if requested, the global Jacobian.
    ///
    /// The residual and Jacobian satisfy `J dx = r` for the increment `dx` of the solution.
    /// On failure nothing is returned: a partially assembled system is never exposed.
    pub fn assemble(&self, want_matrix: bool) -> eyre::Result<AssembledSystem> {
        let layout = self.dof_map.layout().clone();
        debug!(
            "Assembling {} with {:?} over {} elements in {} partitions",
            if want_matrix { "residual and Jacobian" } else { "residual" },
            self.strategy,
            self.mesh.num_elements(),
            self.partition.num_partitions()
        );

        let mut residual = DistributedVector::zeros(layout.clone());
        residual.zero();
        let mut matrix = want_matrix.then(|| {
            let mut matrix = DistributedMatrix::new(layout, self.pattern.clone());
            matrix.zero();
            matrix
        });

        (0..self.partition.num_partitions())
            .into_par_iter()
            .try_for_each(|p| {
                self.assemble_partition(p, &residual, matrix.as_ref())
                    .wrap_err_with(|| format!("Assembly failed on partition {}", p))
            })?;

        residual.close();
        if let Some(matrix) = matrix.as_mut() {
            matrix.close()?;
        }

        let residual = residual.to_dvector()?;
        let matrix = matrix.map(|matrix| matrix.to_csr()).transpose()?;
        debug!("Assembly finished");
        Ok(AssembledSystem { residual, matrix })
    }

    fn assemble_partition(
        &self,
        partition: usize,
        residual: &DistributedVector,
        matrix: Option<&DistributedMatrix>,
    ) -> eyre::Result<()> {
        let layout = *self.solution.layout();
        let kernel = ElementKernel {
            velocity: self.table.evaluator(layout.velocity_order),
            pressure: self.table.evaluator(layout.pressure_order),
            parameters: &self.parameters,
            layout,
        };
        let mut workspace = self.workspace.get_or_default().borrow_mut();
        let ElementWorkspace {
            local,
            point,
            residual: element_residual,
            jacobian: element_jacobian,
            block_sizes,
        } = &mut *workspace;

        let mut num_skipped = 0;
        for &element in self.partition.elements(partition) {
            gather_element(self.mesh, self.solution, &self.dof_map, element, local)
                .wrap_err_with(|| format!("Failed to gather dofs of element {}", element))?;

            *block_sizes = local.block_sizes();
            element_residual.reset(block_sizes);
            element_jacobian.reset(block_sizes);

            // Refined elements on coarse levels keep all-zero contributions, but are still
            // scattered so that their rows are defined
            if self.mesh.is_assembled(element) {
                let jacobian = matrix.is_some().then_some(&mut *element_jacobian);
                let result = match self.strategy {
                    LinearizationStrategy::AnalyticPicard => {
                        picard::assemble_element(&kernel, local, point, element_residual, jacobian)
                    }
                    LinearizationStrategy::AutomaticDifferentiation => {
                        let mut tape = self.tapes.get_or_default().borrow_mut();
                        autodiff::assemble_element(&kernel, local, &mut tape, point, element_residual, jacobian)
                    }
                };
                result.wrap_err_with(|| format!("Failed to assemble element {}", element))?;
            } else {
                num_skipped += 1;
            }

            residual.add_vector_blocked(partition, element_residual.as_slice(), &local.rows)?;
            if let Some(matrix) = matrix {
                matrix.add_matrix_blocked(partition, element_jacobian.as_matrix(), &local.rows, &local.rows)?;
            }
        }

        trace!(
            "Partition {} assembled {} elements ({} skipped as refined)",
            partition,
            self.partition.elements(partition).len(),
            num_skipped
        );
        Ok(())
    }
}
