//! Plane Poiseuille flow driven by a body force between two walls.
//!
//! On `[-0.5, 0.5]^2` with no-slip walls at `x = +-0.5`, a downward force `f = (0, -1)` and unit
//! viscosity, the Stokes solution is `u = 0`, `v = -(0.25 - x^2) / 2`, `p = 0`. The velocity is
//! quadratic, so a single linearized solve with Q2/Q1 elements recovers it exactly.
use fenris_fluid::assembly::{LinearizationStrategy, NavierStokesAssembler};
use fenris_fluid::boundary::{apply_dirichlet_rows, BoundaryCondition};
use fenris_fluid::field::{Field, FieldLayout};
use fenris_fluid::mesh::procedural::create_box_mesh;
use fenris_fluid::mesh::{BoxMeshDescription, FluidMesh, MeshHierarchy, MeshPartition};
use fenris_fluid::parameters::AssemblyParameters;
use fenris_fluid::solution::Solution;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DMatrix, DVector};

fn channel_mesh() -> FluidMesh {
    let description = BoxMeshDescription {
        dim: 2,
        min: [-0.5, -0.5, 0.0],
        max: [0.5, 0.5, 0.0],
        divisions: [1, 1, 0],
    };
    let coarse = create_box_mesh(&description).unwrap();
    MeshHierarchy::refine_uniformly(&coarse, 3)
        .unwrap()
        .into_finest()
}

fn channel_conditions(_x: &[f64], field: &str, face: u32, _time: f64) -> BoundaryCondition {
    match (field, face) {
        // Walls on the left and right, in- and outflow through the top and bottom
        ("U", _) => BoundaryCondition::Dirichlet(0.0),
        ("V", 2 | 4) => BoundaryCondition::Dirichlet(0.0),
        _ => BoundaryCondition::Natural,
    }
}

fn exact_v(x: &[f64]) -> f64 {
    -0.5 * (0.25 - x[0] * x[0])
}

/// Performs one linearized solve from the zero state and returns the updated solution.
fn solve_channel(mesh: &FluidMesh, num_partitions: usize, strategy: LinearizationStrategy) -> Solution {
    let partition = MeshPartition::contiguous(mesh, num_partitions).unwrap();
    let mut solution = Solution::new(mesh, &partition, FieldLayout::default()).unwrap();
    let num_dirichlet = solution
        .generate_boundary_conditions(mesh, channel_conditions, 0.0)
        .unwrap();
    assert!(num_dirichlet > 0);

    let parameters = AssemblyParameters {
        ireynolds: 1.0,
        body_force: [0.0, -1.0, 0.0],
        ..AssemblyParameters::default()
    };
    let assembler = NavierStokesAssembler::new(mesh, &partition, &solution, parameters, strategy).unwrap();
    let system = assembler.assemble(true).unwrap();
    let map = assembler.dof_map().clone();
    assert_eq!(map.num_rows(), 659);

    let mut rhs = system.residual;
    let mut matrix = system.matrix.unwrap();
    let dirichlet_rows = solution.dirichlet_rows(&map).unwrap();
    apply_dirichlet_rows(&mut matrix, &mut rhs, &dirichlet_rows);

    let dx = DMatrix::from(&matrix)
        .lu()
        .solve(&rhs)
        .expect("Linearized system must be nonsingular");
    drop(assembler);
    solution.apply_increment(&map, &dx).unwrap();
    solution
}

fn assert_poiseuille_profile(mesh: &FluidMesh, solution: &Solution) {
    let velocity = solution.numbering(Field::V).clone();
    for dof in 0..velocity.num_dofs() {
        let x = mesh.node_coordinates(velocity.dof_node(dof));
        assert_scalar_eq!(solution.field_value(Field::V, dof).unwrap(), exact_v(x), comp = abs, tol = 1e-9);
        assert_scalar_eq!(solution.field_value(Field::U, dof).unwrap(), 0.0, comp = abs, tol = 1e-9);
    }
    let pressure = solution.field_values(Field::P).unwrap();
    assert!(pressure.amax() < 1e-8, "Pressure should vanish, max |p| = {}", pressure.amax());

    let center = (0..mesh.num_nodes())
        .find(|&node| mesh.node_coordinates(node).iter().all(|x| x.abs() < 1e-12))
        .expect("Mesh has a node at the origin");
    let center_dof = velocity.node_dof(center).unwrap();
    assert_scalar_eq!(solution.field_value(Field::V, center_dof).unwrap(), -0.125, comp = abs, tol = 1e-9);
}

#[test]
fn picard_recovers_poiseuille_flow() {
    let mesh = channel_mesh();
    assert_eq!(mesh.num_elements(), 64);
    let solution = solve_channel(&mesh, 1, LinearizationStrategy::AnalyticPicard);
    assert_poiseuille_profile(&mesh, &solution);
}

#[test]
fn autodiff_recovers_poiseuille_flow() {
    let mesh = channel_mesh();
    let solution = solve_channel(&mesh, 4, LinearizationStrategy::AutomaticDifferentiation);
    assert_poiseuille_profile(&mesh, &solution);
}

#[test]
fn kernels_agree_on_channel_flow() {
    let mesh = channel_mesh();
    let picard = solve_channel(&mesh, 3, LinearizationStrategy::AnalyticPicard);
    let autodiff = solve_channel(&mesh, 3, LinearizationStrategy::AutomaticDifferentiation);
    for field in [Field::U, Field::V, Field::P] {
        let difference: DVector<f64> = picard.field_values(field).unwrap() - autodiff.field_values(field).unwrap();
        assert!(difference.amax() < 1e-9, "Field {} differs by {}", field, difference.amax());
    }
}

#[test]
fn converged_autodiff_state_has_vanishing_free_residual() {
    let mesh = channel_mesh();
    let solution = solve_channel(&mesh, 2, LinearizationStrategy::AutomaticDifferentiation);
    let partition = MeshPartition::contiguous(&mesh, 2).unwrap();
    let parameters = AssemblyParameters {
        body_force: [0.0, -1.0, 0.0],
        ..AssemblyParameters::default()
    };
    let assembler = NavierStokesAssembler::new(
        &mesh,
        &partition,
        &solution,
        parameters,
        LinearizationStrategy::AutomaticDifferentiation,
    )
    .unwrap();
    let mut residual = assembler.assemble(false).unwrap().residual;
    for row in solution.dirichlet_rows(assembler.dof_map()).unwrap() {
        residual[row] = 0.0;
    }
    assert!(residual.amax() < 1e-10, "Residual norm {}", residual.amax());
}
