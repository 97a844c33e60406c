use crate::dofs::SystemDofMap;
use crate::error::AssemblyError;
use crate::field::{FeOrder, Field};
use crate::mesh::FluidMesh;
use crate::solution::Solution;
use nalgebra::{DMatrix, DVector};

/// Local degrees of freedom of a single element.
///
/// `rows` holds the global system rows in local order: all velocity dofs block by component,
/// followed by the pressure dofs.
#[derive(Debug, Clone)]
pub struct LocalDofs {
    /// Coordinates of the geometry nodes, `dim x num_geometry_nodes`.
    pub coords: DMatrix<f64>,
    /// Velocity values, `num_velocity_nodes x dim`. Column `k` holds component `k`.
    pub velocity: DMatrix<f64>,
    pub pressure: DVector<f64>,
    pub rows: Vec<usize>,
}

impl Default for LocalDofs {
    fn default() -> Self {
        Self {
            coords: DMatrix::zeros(0, 0),
            velocity: DMatrix::zeros(0, 0),
            pressure: DVector::zeros(0),
            rows: Vec::new(),
        }
    }
}

impl LocalDofs {
    pub fn dim(&self) -> usize {
        self.coords.nrows()
    }

    pub fn num_velocity_dofs(&self) -> usize {
        self.velocity.nrows()
    }

    pub fn num_pressure_dofs(&self) -> usize {
        self.pressure.len()
    }

    /// Block sizes in system order: one velocity block per component, then pressure.
    pub fn block_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![self.num_velocity_dofs(); self.dim()];
        sizes.push(self.num_pressure_dofs());
        sizes
    }
}

fn num_nodes(mesh: &FluidMesh, order: FeOrder) -> usize {
    match order {
        FeOrder::Linear => mesh.element_type().num_vertices(),
        FeOrder::Quadratic => mesh.element_type().num_nodes(),
    }
}

/// Gathers coordinates, current field values and global rows of an element.
///
/// Values are translated node -> field dof -> (owning partition, storage slot) through the dof
/// numberings of the solution.
pub fn gather_element(
    mesh: &FluidMesh,
    solution: &Solution,
    dof_map: &SystemDofMap,
    element: usize,
    local: &mut LocalDofs,
) -> Result<(), AssemblyError> {
    let dim = mesh.dim();
    if solution.dim() != dim {
        return Err(AssemblyError::DimensionMismatch {
            expected: dim,
            actual: solution.dim(),
        });
    }
    let nodes = mesh.element_nodes(element);
    let layout = solution.layout();
    let num_x = nodes.len();
    let num_v = num_nodes(mesh, layout.velocity_order);
    let num_p = num_nodes(mesh, layout.pressure_order);

    if local.coords.shape() != (dim, num_x) {
        local.coords = DMatrix::zeros(dim, num_x);
    }
    if local.velocity.shape() != (num_v, dim) {
        local.velocity = DMatrix::zeros(num_v, dim);
    }
    if local.pressure.len() != num_p {
        local.pressure = DVector::zeros(num_p);
    }
    local.rows.clear();

    for (i, &node) in nodes.iter().enumerate() {
        for d in 0..dim {
            local.coords[(d, i)] = mesh.node_coordinate(node, d);
        }
    }

    let velocity_components = Field::velocity_components(dim)?;
    for (k, &field) in velocity_components.iter().enumerate() {
        let numbering = solution.numbering(field);
        for (i, &node) in nodes[..num_v].iter().enumerate() {
            let dof = numbering
                .node_dof(node)
                .ok_or(AssemblyError::MalformedDofMapping { field, index: node })?;
            local.velocity[(i, k)] = solution.field_value(field, dof)?;
            local.rows.push(dof_map.row(field, dof)?);
        }
    }

    let numbering = solution.numbering(Field::P);
    for (i, &node) in nodes[..num_p].iter().enumerate() {
        let dof = numbering.node_dof(node).ok_or(AssemblyError::MalformedDofMapping {
            field: Field::P,
            index: node,
        })?;
        local.pressure[i] = solution.field_value(Field::P, dof)?;
        local.rows.push(dof_map.row(Field::P, dof)?);
    }

    Ok(())
}
