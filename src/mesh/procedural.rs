//! Basic procedural mesh generation routines.
use crate::element::ElementType;
use crate::error::AssemblyError;
use crate::mesh::{BoundaryFace, FluidMesh};
use serde::{Deserialize, Serialize};

/// An axis-aligned box subdivided into a structured grid of elements.
///
/// Only the first `dim` entries of the bounds and divisions are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxMeshDescription {
    pub dim: usize,
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub divisions: [usize; 3],
}

impl BoxMeshDescription {
    pub fn unit_square(cells_per_dim: usize) -> Self {
        Self {
            dim: 2,
            min: [0.0; 3],
            max: [1.0, 1.0, 0.0],
            divisions: [cells_per_dim, cells_per_dim, 0],
        }
    }

    pub fn unit_cube(cells_per_dim: usize) -> Self {
        Self {
            dim: 3,
            min: [0.0; 3],
            max: [1.0; 3],
            divisions: [cells_per_dim; 3],
        }
    }
}

/// Creates a structured box mesh of quadratic elements.
///
/// Nodes live on the lattice of element vertices, edge midpoints, face centers and element
/// centers, numbered lexicographically with `x` running fastest.
///
/// # Errors
///
/// Returns [`AssemblyError::InvalidParameter`] if the number of cells in any of the `dim`
/// directions is zero.
pub fn create_box_mesh(description: &BoxMeshDescription) -> Result<FluidMesh, AssemblyError> {
    let dim = description.dim;
    let element_type = ElementType::geometry(dim).ok_or(AssemblyError::DimensionMismatch {
        expected: if dim < 2 { 2 } else { 3 },
        actual: dim,
    })?;
    let divisions = &description.divisions[..dim];
    if divisions.contains(&0) {
        return Err(AssemblyError::InvalidParameter {
            name: "divisions",
            value: 0.0,
        });
    }

    // Lattice extents in each direction (padded with a single layer in unused directions)
    let mut lattice = [1usize; 3];
    for (d, &n) in divisions.iter().enumerate() {
        lattice[d] = 2 * n + 1;
    }
    let node_index = |l: [usize; 3]| l[0] + lattice[0] * (l[1] + lattice[1] * l[2]);

    let num_nodes = lattice.iter().product();
    let mut coordinates = Vec::with_capacity(num_nodes);
    for k in 0..lattice[2] {
        for j in 0..lattice[1] {
            for i in 0..lattice[0] {
                let l = [i, j, k];
                let mut x = [0.0; 3];
                for d in 0..dim {
                    let t = l[d] as f64 / (2 * divisions[d]) as f64;
                    x[d] = description.min[d] + t * (description.max[d] - description.min[d]);
                }
                coordinates.push(x);
            }
        }
    }

    let mut cells = [1usize; 3];
    cells[..dim].copy_from_slice(divisions);

    let mut connectivity = Vec::with_capacity(cells.iter().product());
    let mut boundary_faces = Vec::new();
    for ck in 0..cells[2] {
        for cj in 0..cells[1] {
            for ci in 0..cells[0] {
                let cell = [ci, cj, ck];
                let element = connectivity.len();
                let nodes: Vec<usize> = (0..element_type.num_nodes())
                    .map(|local| {
                        let r = element_type.reference_coords(local);
                        let mut l = [0usize; 3];
                        for d in 0..dim {
                            l[d] = 2 * cell[d] + (r[d] + 1.0) as usize;
                        }
                        node_index(l)
                    })
                    .collect();

                for (d, (low_id, high_id)) in face_ids(dim).iter().enumerate() {
                    if cell[d] == 0 {
                        boundary_faces.push(boundary_face(element_type, element, &nodes, d, -1.0, *low_id));
                    }
                    if cell[d] + 1 == cells[d] {
                        boundary_faces.push(boundary_face(element_type, element, &nodes, d, 1.0, *high_id));
                    }
                }
                connectivity.push(nodes);
            }
        }
    }

    Ok(FluidMesh::from_parts(
        description.clone(),
        element_type,
        coordinates,
        connectivity,
        boundary_faces,
    ))
}

/// Face ids of the `(min, max)` sides of each coordinate direction.
fn face_ids(dim: usize) -> &'static [(u32, u32)] {
    match dim {
        2 => &[(4, 2), (1, 3)],
        _ => &[(4, 2), (1, 3), (5, 6)],
    }
}

fn boundary_face(
    element_type: ElementType,
    element: usize,
    element_nodes: &[usize],
    direction: usize,
    side: f64,
    face_id: u32,
) -> BoundaryFace {
    let nodes = element_nodes
        .iter()
        .enumerate()
        .filter(|(local, _)| element_type.reference_coords(*local)[direction] == side)
        .map(|(_, &node)| node)
        .collect();
    BoundaryFace {
        element,
        face_id,
        nodes,
    }
}
