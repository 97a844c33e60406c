use fenris_fluid::assembly::LinearizationStrategy;
use fenris_fluid::boundary::BoundaryCondition;
use fenris_fluid::error::AssemblyError;
use fenris_fluid::field::{FeOrder, Field, FieldLayout};
use fenris_fluid::mesh::BoxMeshDescription;
use fenris_fluid::parameters::{AssemblyParameters, Fluid, FluidModel, Parameter, StabilizationSettings};
use matrixcompare::assert_scalar_eq;

#[test]
fn assembly_parameters_fill_in_defaults() {
    let json = r#"{ "ireynolds": 0.01, "penalty": false, "stabilization": { "scale": 2.0 } }"#;
    let parameters: AssemblyParameters = serde_json::from_str(json).unwrap();
    assert_eq!(
        parameters,
        AssemblyParameters {
            ireynolds: 0.01,
            penalty: false,
            stabilization: StabilizationSettings { scale: 2.0 },
            ..AssemblyParameters::default()
        }
    );
    assert_eq!(parameters.quadrature_degree, 7);
    assert_eq!(parameters.body_force, [0.0, 1.0, 0.0]);

    let empty: AssemblyParameters = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, AssemblyParameters::default());
}

#[test]
fn strategy_and_layout_names() {
    let strategy: LinearizationStrategy = serde_json::from_str(r#""automatic_differentiation""#).unwrap();
    assert_eq!(strategy, LinearizationStrategy::AutomaticDifferentiation);
    assert_eq!(
        serde_json::to_string(&LinearizationStrategy::AnalyticPicard).unwrap(),
        r#""analytic_picard""#
    );
    assert_eq!(LinearizationStrategy::default(), LinearizationStrategy::AnalyticPicard);

    let layout: FieldLayout = serde_json::from_str(r#"{ "pressure_order": "quadratic" }"#).unwrap();
    assert_eq!(layout.velocity_order, FeOrder::Quadratic);
    assert_eq!(layout.pressure_order, FeOrder::Quadratic);
    assert_eq!(layout.order(Field::P), FeOrder::Quadratic);
    assert!(!FieldLayout::default().is_equal_order_linear());

    assert_eq!(FeOrder::from_name("first"), Some(FeOrder::Linear));
    assert_eq!(FeOrder::from_name("second"), Some(FeOrder::Quadratic));
    assert_eq!(FeOrder::from_name("third"), None);
}

#[test]
fn field_names() {
    assert_eq!(Field::from_name("V"), Ok(Field::V));
    assert_eq!(Field::from_name("X"), Err(AssemblyError::UnknownField { name: "X".to_string() }));
    assert_eq!(Field::system_fields(3).unwrap(), &[Field::U, Field::V, Field::W, Field::P]);
    assert_eq!(Field::velocity_components(2).unwrap(), &[Field::U, Field::V]);
    assert!(Field::system_fields(4).is_err());
    assert_eq!(Field::W.to_string(), "W");
}

#[test]
fn fluid_reynolds_numbers() {
    let fluid = Fluid::new(
        Parameter {
            length_ref: 2.0,
            velocity_ref: 0.5,
        },
        0.1,
        4.0,
        FluidModel::Newtonian,
    );
    assert_scalar_eq!(fluid.reynolds_number(), 40.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(fluid.ireynolds_number(), 0.025, comp = abs, tol = 1e-14);
    assert_scalar_eq!(AssemblyParameters::from_fluid(&fluid).ireynolds, 0.025, comp = abs, tol = 1e-14);
    assert_eq!(AssemblyParameters::from_fluid(&Fluid::default()), AssemblyParameters::default());
}

#[test]
fn descriptions_and_conditions_deserialize() {
    let json = r#"{ "dim": 2, "min": [-0.5, -0.5, 0.0], "max": [0.5, 0.5, 0.0], "divisions": [1, 1, 0] }"#;
    let description: BoxMeshDescription = serde_json::from_str(json).unwrap();
    assert_eq!(description.divisions, [1, 1, 0]);

    let condition: BoundaryCondition = serde_json::from_str(r#"{ "Dirichlet": 1.5 }"#).unwrap();
    assert_eq!(condition, BoundaryCondition::Dirichlet(1.5));
    let natural: BoundaryCondition = serde_json::from_str(r#""Natural""#).unwrap();
    assert_eq!(natural, BoundaryCondition::Natural);
}
