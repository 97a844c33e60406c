//! Numbering of field degrees of freedom and their rows in the global system.
use crate::error::AssemblyError;
use crate::field::{FeOrder, Field};
use crate::mesh::{FluidMesh, MeshPartition};
use crate::system::RowLayout;
use std::sync::Arc;

/// Degrees of freedom of a Lagrange field of a given order.
///
/// Quadratic fields have one dof per mesh node, linear fields one per vertex node. Dofs are
/// numbered contiguously per partition: a node belongs to the first partition (in partition
/// order) owning an element that contains it.
#[derive(Debug, Clone)]
pub struct DofNumbering {
    order: FeOrder,
    node_to_dof: Vec<Option<usize>>,
    dof_to_node: Vec<usize>,
    layout: Arc<RowLayout>,
}

impl DofNumbering {
    pub fn new(mesh: &FluidMesh, partition: &MeshPartition, order: FeOrder) -> Self {
        let nodes_per_element = match order {
            FeOrder::Linear => mesh.element_type().num_vertices(),
            FeOrder::Quadratic => mesh.element_type().num_nodes(),
        };

        let mut node_to_dof = vec![None; mesh.num_nodes()];
        let mut dof_to_node = Vec::new();
        let mut offsets = vec![0];
        for p in 0..partition.num_partitions() {
            for &element in partition.elements(p) {
                for &node in &mesh.element_nodes(element)[..nodes_per_element] {
                    if node_to_dof[node].is_none() {
                        node_to_dof[node] = Some(dof_to_node.len());
                        dof_to_node.push(node);
                    }
                }
            }
            offsets.push(dof_to_node.len());
        }

        Self {
            order,
            node_to_dof,
            dof_to_node,
            layout: Arc::new(RowLayout::from_offsets(offsets)),
        }
    }

    pub fn order(&self) -> FeOrder {
        self.order
    }

    pub fn num_dofs(&self) -> usize {
        self.dof_to_node.len()
    }

    /// The dof of the given mesh node, if the node carries one.
    pub fn node_dof(&self, node: usize) -> Option<usize> {
        self.node_to_dof.get(node).copied().flatten()
    }

    pub fn dof_node(&self, dof: usize) -> usize {
        self.dof_to_node[dof]
    }

    /// Partition ownership of the dofs.
    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }
}

/// Rows of the global system for each field dof.
///
/// Within the rows owned by a partition, the fields are blocked in system order
/// (`U`, `V`, [`W`], `P`), each block holding the dofs of the field owned by that partition.
#[derive(Debug, Clone)]
pub struct SystemDofMap {
    fields: Vec<Field>,
    numberings: Vec<Arc<DofNumbering>>,
    // field_offsets[f][p]: first row of field f in partition p
    field_offsets: Vec<Vec<usize>>,
    layout: Arc<RowLayout>,
}

impl SystemDofMap {
    pub fn new(fields: &[(Field, Arc<DofNumbering>)]) -> Self {
        assert!(!fields.is_empty(), "System needs at least one field");
        let num_partitions = fields[0].1.layout().num_partitions();
        assert!(
            fields
                .iter()
                .all(|(_, n)| n.layout().num_partitions() == num_partitions),
            "All fields must be distributed over the same partitions"
        );

        let mut field_offsets = vec![Vec::with_capacity(num_partitions); fields.len()];
        let mut partition_offsets = Vec::with_capacity(num_partitions + 1);
        let mut row = 0;
        partition_offsets.push(row);
        for p in 0..num_partitions {
            for (f, (_, numbering)) in fields.iter().enumerate() {
                field_offsets[f].push(row);
                row += numbering.layout().owned_rows(p).len();
            }
            partition_offsets.push(row);
        }

        Self {
            fields: fields.iter().map(|(field, _)| *field).collect(),
            numberings: fields.iter().map(|(_, n)| n.clone()).collect(),
            field_offsets,
            layout: Arc::new(RowLayout::from_offsets(partition_offsets)),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }

    pub fn num_rows(&self) -> usize {
        self.layout.num_rows()
    }

    pub fn numbering(&self, field: Field) -> Result<&DofNumbering, AssemblyError> {
        Ok(&self.numberings[self.field_index(field)?])
    }

    fn field_index(&self, field: Field) -> Result<usize, AssemblyError> {
        self.fields
            .iter()
            .position(|&f| f == field)
            .ok_or_else(|| AssemblyError::UnknownField {
                name: field.name().to_string(),
            })
    }

    /// The global row of the given field dof.
    pub fn row(&self, field: Field, dof: usize) -> Result<usize, AssemblyError> {
        let f = self.field_index(field)?;
        let (owner, slot) = self.numberings[f]
            .layout()
            .locate(dof)
            .ok_or(AssemblyError::MalformedDofMapping { field, index: dof })?;
        Ok(self.field_offsets[f][owner] + slot)
    }

    /// The global row of the dof of the given field at a mesh node.
    pub fn node_row(&self, field: Field, node: usize) -> Result<usize, AssemblyError> {
        let dof = self
            .numbering(field)?
            .node_dof(node)
            .ok_or(AssemblyError::MalformedDofMapping { field, index: node })?;
        self.row(field, dof)
    }
}
