//! Test: Instance Passing - earlier estimates become fixed values

use crate::helpers::*;
use phaselink::core::{DatasetInfo, FitResult, ModelDeclaration, Reference, StepSelector};
use phaselink::linking::{resolve, ResolvedParameter};
use std::sync::Arc;

/// A back-reference yields exactly the stored value
#[test]
fn test_reference_yields_stored_value() {
    let phase_1 = FitResult::new("phase_1", DatasetInfo::default()).with_estimate(
        path("lens.mass.einstein_radius"),
        1.6,
        None,
    );

    let mut declaration = ModelDeclaration::new();
    declaration.reference(
        path("lens.mass.einstein_radius"),
        Reference::new(StepSelector::Index(0), path("lens.mass.einstein_radius")),
    );

    let model = resolve(&declaration, &[phase_1]).unwrap();
    assert_eq!(model.value_of(&path("lens.mass.einstein_radius")), Some(1.6));
    assert_eq!(model.free_parameter_count(), 0);
}

#[test]
fn test_fixed_literals_have_no_free_parameters() {
    let mut declaration = ModelDeclaration::new();
    declaration
        .fix(path("lens.mass.centre_0"), 0.0)
        .fix(path("lens.mass.centre_1"), 0.0);

    let model = resolve(&declaration, &[]).unwrap();
    assert_eq!(model.len(), 2);
    assert_eq!(model.free_parameter_count(), 0);
}

/// Fitted value of phase 1 reaches the fitter as a fixed value in phase 2
#[tokio::test]
async fn test_fitted_value_is_passed_on() {
    let yaml = r#"
name: pipeline_init
dataset: { name: lens_sie, mask_radius: 3.0 }
phases:
  - name: phase_1
    parameters:
      lens.mass.einstein_radius: { uniform: { lower: 0.5, upper: 2.5 } }
      lens.mass.axis_ratio: { gaussian: { mean: 0.8, sigma: 0.25 } }
  - name: phase_2
    parameters:
      lens.mass.einstein_radius:
        from: { step: 0 }
      lens.mass.axis_ratio:
        from: { step: phase_1 }
      source.light.intensity: { gaussian: { mean: 0.1, sigma: 0.05 } }
"#;

    let mut pipeline = pipeline_from_yaml(yaml);
    let fitter = Arc::new(
        MockFitter::new()
            .with_estimate("phase_1", "lens.mass.einstein_radius", 1.6, Some(0.02))
            .with_estimate("phase_1", "lens.mass.axis_ratio", 0.74, Some(0.03)),
    );

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(fitter.calls(), vec!["phase_1", "phase_2"]);
    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.einstein_radius"),
        ResolvedParameter::Fixed { value: 1.6 }
    );
    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.axis_ratio"),
        ResolvedParameter::Fixed { value: 0.74 }
    );

    let request = fitter.request("phase_2").unwrap();
    assert_eq!(request.model.free_parameter_count(), 1);
    assert_eq!(request.dataset.name, "lens_sie");
    assert_eq!(request.dataset.mask_radius, Some(3.0));

    assert_phase_completed(&pipeline, "phase_1", false);
    assert_phase_completed(&pipeline, "phase_2", false);
    let result = pipeline.result("phase_2").unwrap();
    assert_eq!(result.estimate(&path("lens.mass.einstein_radius")).unwrap().value, 1.6);
}

/// `last` always means the phase right before the one being resolved
#[tokio::test]
async fn test_last_follows_the_chain() {
    let yaml = r#"
name: pipeline_init
dataset: { name: lens_sie }
phases:
  - name: phase_1
    parameters:
      lens.mass.phi: { uniform: { lower: 0.0, upper: 180.0 } }
  - name: phase_2
    parameters:
      lens.mass.phi:
        from: { step: last }
  - name: phase_3
    parameters:
      lens.mass.phi:
        from: { step: last }
"#;

    let mut pipeline = pipeline_from_yaml(yaml);
    let fitter = Arc::new(
        MockFitter::new()
            .with_estimate("phase_1", "lens.mass.phi", 45.0, None)
            .with_estimate("phase_2", "lens.mass.phi", 47.5, None),
    );

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.phi"),
        ResolvedParameter::Fixed { value: 45.0 }
    );
    assert_eq!(
        requested(&fitter, "phase_3", "lens.mass.phi"),
        ResolvedParameter::Fixed { value: 47.5 }
    );
}

/// A component link carries a whole component; explicit parameters win
#[tokio::test]
async fn test_component_link_with_override() {
    let yaml = r#"
name: pipeline_source
dataset: { name: lens_sie__source_sersic }
phases:
  - name: phase_1
    parameters:
      lens.mass.einstein_radius: { uniform: { lower: 0.5, upper: 2.5 } }
      lens.mass.axis_ratio: { gaussian: { mean: 0.8, sigma: 0.25 } }
      source.light.intensity: { gaussian: { mean: 0.1, sigma: 0.05 } }
  - name: phase_2
    links:
      - { step: last, source: lens.mass }
    parameters:
      lens.mass.axis_ratio: { gaussian: { mean: 0.7, sigma: 0.1 } }
      source.light.intensity:
        from: { step: last }
"#;

    let mut pipeline = pipeline_from_yaml(yaml);
    let fitter = Arc::new(MockFitter::new());

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.einstein_radius"),
        ResolvedParameter::Fixed { value: 1.5 }
    );
    assert!(matches!(
        requested(&fitter, "phase_2", "lens.mass.axis_ratio"),
        ResolvedParameter::Prior { .. }
    ));
    assert_eq!(
        requested(&fitter, "phase_2", "source.light.intensity"),
        ResolvedParameter::Fixed { value: 0.1 }
    );
}

/// Aligned parameters share one root in the model handed to the fitter
#[tokio::test]
async fn test_alignment_reaches_fitter() {
    let yaml = r#"
name: pipeline_light
dataset: { name: lens_bulge_disk }
phases:
  - name: phase_1
    parameters:
      lens.disk.phi: { uniform: { lower: 0.0, upper: 180.0 } }
      lens.bulge.phi: { align: lens.disk.phi }
      lens.envelope.phi: { align: lens.bulge.phi }
"#;

    let mut pipeline = pipeline_from_yaml(yaml);
    let fitter = Arc::new(MockFitter::new());

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    let request = fitter.request("phase_1").unwrap();
    assert_eq!(request.model.free_parameter_count(), 1);
    assert_eq!(
        requested(&fitter, "phase_1", "lens.envelope.phi"),
        ResolvedParameter::Aligned { to: path("lens.disk.phi") }
    );

    let result = pipeline.result("phase_1").unwrap();
    assert_eq!(result.estimate(&path("lens.bulge.phi")).unwrap().value, 90.0);
}
