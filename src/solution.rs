//! Storage of the discrete velocity and pressure fields.
use crate::boundary::BoundaryCondition;
use crate::dofs::{DofNumbering, SystemDofMap};
use crate::error::AssemblyError;
use crate::field::{Field, FieldLayout};
use crate::mesh::{FluidMesh, MeshPartition};
use crate::system::DistributedVector;
use log::info;
use nalgebra::DVector;
use std::sync::Arc;

/// Current values of all fields, distributed like their dof numberings, together with the
/// Dirichlet flags produced by a boundary predicate.
#[derive(Debug)]
pub struct Solution {
    dim: usize,
    layout: FieldLayout,
    fields: &'static [Field],
    velocity_dofs: Arc<DofNumbering>,
    pressure_dofs: Arc<DofNumbering>,
    values: Vec<DistributedVector>,
    dirichlet: Vec<Vec<bool>>,
}

impl Solution {
    /// Creates a zero solution for the fields of the mesh dimension.
    pub fn new(mesh: &FluidMesh, partition: &MeshPartition, layout: FieldLayout) -> Result<Self, AssemblyError> {
        let dim = mesh.dim();
        let fields = Field::system_fields(dim)?;
        let velocity_dofs = Arc::new(DofNumbering::new(mesh, partition, layout.velocity_order));
        let pressure_dofs = if layout.pressure_order == layout.velocity_order {
            velocity_dofs.clone()
        } else {
            Arc::new(DofNumbering::new(mesh, partition, layout.pressure_order))
        };

        let mut solution = Self {
            dim,
            layout,
            fields,
            velocity_dofs,
            pressure_dofs,
            values: Vec::with_capacity(fields.len()),
            dirichlet: Vec::with_capacity(fields.len()),
        };
        for &field in fields {
            let numbering = solution.numbering(field);
            let vector = DistributedVector::zeros(numbering.layout().clone());
            let flags = vec![false; numbering.num_dofs()];
            solution.values.push(vector);
            solution.dirichlet.push(flags);
        }
        Ok(solution)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// The fields of the solution in system order.
    pub fn fields(&self) -> &[Field] {
        self.fields
    }

    pub fn numbering(&self, field: Field) -> &Arc<DofNumbering> {
        if field.is_velocity() {
            &self.velocity_dofs
        } else {
            &self.pressure_dofs
        }
    }

    fn field_index(&self, field: Field) -> Result<usize, AssemblyError> {
        self.fields
            .iter()
            .position(|&f| f == field)
            .ok_or_else(|| AssemblyError::UnknownField {
                name: field.name().to_string(),
            })
    }

    /// Looks up a field of this solution by name.
    pub fn field_by_name(&self, name: &str) -> Result<Field, AssemblyError> {
        let field = Field::from_name(name)?;
        self.field_index(field)?;
        Ok(field)
    }

    /// The current value of a field dof.
    pub fn field_value(&self, field: Field, dof: usize) -> Result<f64, AssemblyError> {
        self.values[self.field_index(field)?]
            .get(dof)
            .map_err(|_| AssemblyError::MalformedDofMapping { field, index: dof })
    }

    pub fn set_field_value(&mut self, field: Field, dof: usize, value: f64) -> Result<(), AssemblyError> {
        let f = self.field_index(field)?;
        self.values[f]
            .set(dof, value)
            .map_err(|_| AssemblyError::MalformedDofMapping { field, index: dof })
    }

    /// All values of a field, in dof order.
    pub fn field_values(&self, field: Field) -> Result<DVector<f64>, AssemblyError> {
        self.values[self.field_index(field)?].to_dvector()
    }

    /// Sets every dof of the field to the function value at its node.
    pub fn initialize_with(
        &mut self,
        mesh: &FluidMesh,
        field: Field,
        f: impl Fn(&[f64]) -> f64,
    ) -> Result<(), AssemblyError> {
        let f_idx = self.field_index(field)?;
        let numbering = self.numbering(field).clone();
        for dof in 0..numbering.num_dofs() {
            let x = mesh.node_coordinates(numbering.dof_node(dof));
            self.values[f_idx].set(dof, f(x))?;
        }
        Ok(())
    }

    /// Evaluates the boundary predicate on all boundary nodes and stores the prescribed values.
    ///
    /// The predicate receives the node coordinates, the field name, the boundary face id and the
    /// time. A node shared by several boundary faces is Dirichlet if any of the faces prescribes
    /// a value. Previously generated conditions are discarded. Returns the number of Dirichlet
    /// dofs.
    pub fn generate_boundary_conditions<F>(
        &mut self,
        mesh: &FluidMesh,
        predicate: F,
        time: f64,
    ) -> Result<usize, AssemblyError>
    where
        F: Fn(&[f64], &str, u32, f64) -> BoundaryCondition,
    {
        for flags in &mut self.dirichlet {
            flags.fill(false);
        }

        for face in mesh.boundary_faces() {
            for (f_idx, &field) in self.fields.iter().enumerate() {
                let numbering = self.numbering(field).clone();
                for &node in &face.nodes {
                    let Some(dof) = numbering.node_dof(node) else {
                        // Non-vertex nodes do not carry linear dofs
                        continue;
                    };
                    if self.dirichlet[f_idx][dof] {
                        continue;
                    }
                    let x = mesh.node_coordinates(node);
                    if let BoundaryCondition::Dirichlet(value) = predicate(x, field.name(), face.face_id, time) {
                        self.dirichlet[f_idx][dof] = true;
                        self.values[f_idx].set(dof, value)?;
                    }
                }
            }
        }

        let num_dirichlet = self
            .dirichlet
            .iter()
            .map(|flags| flags.iter().filter(|&&flag| flag).count())
            .sum();
        info!(
            "Generated boundary conditions at t = {}: {} Dirichlet dofs",
            time, num_dirichlet
        );
        Ok(num_dirichlet)
    }

    pub fn is_dirichlet(&self, field: Field, dof: usize) -> Result<bool, AssemblyError> {
        let f = self.field_index(field)?;
        self.dirichlet[f]
            .get(dof)
            .copied()
            .ok_or(AssemblyError::MalformedDofMapping { field, index: dof })
    }

    /// The row map of the global system for this solution.
    pub fn system_dof_map(&self) -> SystemDofMap {
        let fields: Vec<_> = self
            .fields
            .iter()
            .map(|&field| (field, self.numbering(field).clone()))
            .collect();
        SystemDofMap::new(&fields)
    }

    /// Global rows of all Dirichlet dofs.
    pub fn dirichlet_rows(&self, map: &SystemDofMap) -> Result<Vec<usize>, AssemblyError> {
        let mut rows = Vec::new();
        for (f_idx, &field) in self.fields.iter().enumerate() {
            for (dof, _) in self.dirichlet[f_idx].iter().enumerate().filter(|(_, &flag)| flag) {
                rows.push(map.row(field, dof)?);
            }
        }
        rows.sort_unstable();
        Ok(rows)
    }

    /// Adds an increment given in global system rows, `x += dx`.
    pub fn apply_increment(&mut self, map: &SystemDofMap, dx: &DVector<f64>) -> eyre::Result<()> {
        if dx.len() != map.num_rows() {
            return Err(AssemblyError::DimensionMismatch {
                expected: map.num_rows(),
                actual: dx.len(),
            }
            .into());
        }
        for f_idx in 0..self.fields.len() {
            let field = self.fields[f_idx];
            let num_dofs = self.numbering(field).num_dofs();
            for dof in 0..num_dofs {
                let row = map.row(field, dof)?;
                let value = self.values[f_idx].get(dof)? + dx[row];
                self.values[f_idx].set(dof, value)?;
            }
        }
        Ok(())
    }
}
