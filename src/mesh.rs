//! Meshes of quadratic quadrilaterals/hexahedra, mesh levels and partitions.
use crate::element::ElementType;
use crate::error::AssemblyError;
use log::debug;

pub mod procedural;

pub use procedural::BoxMeshDescription;

/// An element face lying on the domain boundary.
///
/// Face ids follow the box convention: 1 bottom (`y = min`), 2 right (`x = max`),
/// 3 top (`y = max`), 4 left (`x = min`), and in 3D 5 front (`z = min`), 6 back (`z = max`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryFace {
    pub element: usize,
    pub face_id: u32,
    pub nodes: Vec<usize>,
}

/// A single mesh level made of quadratic elements (Quad9 in 2D, Hex27 in 3D).
///
/// Elements store the indices of all their geometry nodes in the node order of the reference
/// element, so that the vertices come first.
#[derive(Debug, Clone)]
pub struct FluidMesh {
    description: BoxMeshDescription,
    element_type: ElementType,
    coordinates: Vec<[f64; 3]>,
    connectivity: Vec<Vec<usize>>,
    refined: Vec<bool>,
    vertex_nodes: Vec<bool>,
    boundary_faces: Vec<BoundaryFace>,
    level: usize,
    level_max: usize,
}

impl FluidMesh {
    pub(crate) fn from_parts(
        description: BoxMeshDescription,
        element_type: ElementType,
        coordinates: Vec<[f64; 3]>,
        connectivity: Vec<Vec<usize>>,
        boundary_faces: Vec<BoundaryFace>,
    ) -> Self {
        let mut vertex_nodes = vec![false; coordinates.len()];
        for element in &connectivity {
            for &node in &element[..element_type.num_vertices()] {
                vertex_nodes[node] = true;
            }
        }
        let num_elements = connectivity.len();
        Self {
            description,
            element_type,
            coordinates,
            connectivity,
            refined: vec![false; num_elements],
            vertex_nodes,
            boundary_faces,
            level: 0,
            level_max: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.element_type.dim()
    }

    /// The geometry element type.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn description(&self) -> &BoxMeshDescription {
        &self.description
    }

    pub fn num_nodes(&self) -> usize {
        self.coordinates.len()
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.len()
    }

    /// Coordinate `d` of the given node.
    pub fn node_coordinate(&self, node: usize, d: usize) -> f64 {
        assert!(d < self.dim(), "Coordinate index out of bounds");
        self.coordinates[node][d]
    }

    /// The coordinates of the given node, `dim` components.
    pub fn node_coordinates(&self, node: usize) -> &[f64] {
        &self.coordinates[node][..self.dim()]
    }

    /// The geometry nodes of the given element.
    pub fn element_nodes(&self, element: usize) -> &[usize] {
        &self.connectivity[element]
    }

    /// Whether the node is a vertex of at least one element, i.e. carries linear dofs.
    pub fn is_vertex(&self, node: usize) -> bool {
        self.vertex_nodes[node]
    }

    pub fn boundary_faces(&self) -> &[BoundaryFace] {
        &self.boundary_faces
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn level_max(&self) -> usize {
        self.level_max
    }

    pub fn is_refined(&self, element: usize) -> bool {
        self.refined[element]
    }

    /// Flags the element as refined on a finer level.
    pub fn mark_refined(&mut self, element: usize) {
        self.refined[element] = true;
    }

    /// Whether element contributions are assembled on this level.
    ///
    /// On the finest level all elements are assembled. On coarser levels, elements that have
    /// been refined are represented by their children and are skipped.
    pub fn is_assembled(&self, element: usize) -> bool {
        self.level == self.level_max || !self.is_refined(element)
    }
}

/// A hierarchy of uniformly refined mesh levels, coarsest first.
#[derive(Debug, Clone)]
pub struct MeshHierarchy {
    levels: Vec<FluidMesh>,
}

impl MeshHierarchy {
    /// Refines the coarse mesh uniformly `num_refinements` times.
    ///
    /// Every refinement splits each element into `2^dim` children. All elements on levels
    /// below the finest one are marked as refined.
    pub fn refine_uniformly(coarse: &FluidMesh, num_refinements: usize) -> Result<Self, AssemblyError> {
        let level_max = coarse.level + num_refinements;
        let mut levels = Vec::with_capacity(num_refinements + 1);
        for refinement in 0..=num_refinements {
            let factor = 1 << refinement;
            let mut description = coarse.description.clone();
            for divisions in description.divisions.iter_mut().take(coarse.dim()) {
                *divisions *= factor;
            }
            let mut mesh = procedural::create_box_mesh(&description)?;
            mesh.level = coarse.level + refinement;
            mesh.level_max = level_max;
            if mesh.level < level_max {
                mesh.refined.fill(true);
            }
            levels.push(mesh);
        }
        debug!(
            "Refined mesh with {} elements {} times, finest level has {} elements",
            coarse.num_elements(),
            num_refinements,
            levels.last().map(FluidMesh::num_elements).unwrap_or(0)
        );
        Ok(Self { levels })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> &FluidMesh {
        &self.levels[index]
    }

    pub fn finest(&self) -> &FluidMesh {
        self.levels.last().expect("Hierarchy always has at least one level")
    }

    /// Discards all but the `num_levels_to_keep` finest levels.
    pub fn erase_coarse_levels(&mut self, num_levels_to_keep: usize) {
        let keep = num_levels_to_keep.clamp(1, self.levels.len());
        let num_erased = self.levels.len() - keep;
        self.levels.drain(..num_erased);
    }

    pub fn into_finest(mut self) -> FluidMesh {
        self.levels.pop().expect("Hierarchy always has at least one level")
    }
}

/// Assignment of mesh elements to compute partitions.
///
/// Partition `p` owns the elements `elements(p)`, which are stored contiguously in a
/// partition-ordered permutation of the mesh elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshPartition {
    offsets: Vec<usize>,
    elements: Vec<usize>,
}

impl MeshPartition {
    /// Splits the elements into `num_partitions` contiguous ranges of nearly equal size.
    pub fn contiguous(mesh: &FluidMesh, num_partitions: usize) -> Result<Self, AssemblyError> {
        let num_elements = mesh.num_elements();
        if num_partitions == 0 || num_partitions > num_elements {
            return Err(AssemblyError::InvalidPartitioning {
                num_partitions,
                num_elements,
            });
        }
        let offsets = (0..=num_partitions)
            .map(|p| p * num_elements / num_partitions)
            .collect();
        Ok(Self {
            offsets,
            elements: (0..num_elements).collect(),
        })
    }

    /// Builds a partition from an explicit element-to-partition assignment.
    ///
    /// Elements keep their relative order within each partition. Every partition must own at
    /// least one element.
    pub fn from_assignment(
        mesh: &FluidMesh,
        assignment: &[usize],
        num_partitions: usize,
    ) -> Result<Self, AssemblyError> {
        let num_elements = mesh.num_elements();
        let invalid = AssemblyError::InvalidPartitioning {
            num_partitions,
            num_elements,
        };
        if assignment.len() != num_elements || num_partitions == 0 {
            return Err(invalid);
        }

        let mut counts = vec![0; num_partitions];
        for &p in assignment {
            if p >= num_partitions {
                return Err(invalid);
            }
            counts[p] += 1;
        }
        if counts.contains(&0) {
            return Err(invalid);
        }

        let mut offsets = Vec::with_capacity(num_partitions + 1);
        offsets.push(0);
        for count in &counts {
            offsets.push(offsets.last().copied().unwrap_or(0) + count);
        }
        let mut next = offsets[..num_partitions].to_vec();
        let mut elements = vec![0; num_elements];
        for (element, &p) in assignment.iter().enumerate() {
            elements[next[p]] = element;
            next[p] += 1;
        }
        Ok(Self { offsets, elements })
    }

    pub fn num_partitions(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Elements owned by the given partition.
    pub fn elements(&self, partition: usize) -> &[usize] {
        &self.elements[self.offsets[partition]..self.offsets[partition + 1]]
    }

    /// All elements, ordered by partition.
    pub fn all_elements(&self) -> &[usize] {
        &self.elements
    }
}
