//! Test: Hyper Features - hyper references follow the general settings

use crate::helpers::*;
use phaselink::linking::{LinkError, ResolvedParameter};
use phaselink::execution::EngineError;
use std::sync::Arc;

fn hyper_pipeline(enabled: bool) -> String {
    format!(
        r#"
name: pipeline_hyper
settings:
  hyper_galaxies: {enabled}
  hyper_background_noise: {enabled}
dataset: {{ name: lens_sie__source_sersic, mask_radius: 3.0 }}
phases:
  - name: phase_1
    parameters:
      lens.mass.einstein_radius: {{ uniform: {{ lower: 0.5, upper: 2.5 }} }}
  - name: phase_2
    parameters:
      lens.mass.einstein_radius:
        from: {{ step: last }}
      lens.hyper_galaxy.noise_factor:
        from: {{ step: last, hyper: hyper_galaxies }}
      hyper.background_noise.noise_scale:
        from: {{ step: last, hyper: hyper_background_noise }}
"#
    )
}

#[tokio::test]
async fn test_hyper_references_use_hyper_estimates() {
    let mut pipeline = pipeline_from_yaml(&hyper_pipeline(true));
    let fitter = Arc::new(
        MockFitter::new()
            .with_hyper_estimate("phase_1", "lens.hyper_galaxy.noise_factor", 2.5)
            .with_hyper_estimate("phase_1", "hyper.background_noise.noise_scale", 0.4),
    );

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(
        requested(&fitter, "phase_2", "lens.hyper_galaxy.noise_factor"),
        ResolvedParameter::Fixed { value: 2.5 }
    );
    assert_eq!(
        requested(&fitter, "phase_2", "hyper.background_noise.noise_scale"),
        ResolvedParameter::Fixed { value: 0.4 }
    );
    assert_eq!(
        pipeline.settings_tag(),
        "general__hyper_galaxies_bg_noise"
    );
}

/// With the feature off the parameter is absent rather than an error
#[tokio::test]
async fn test_disabled_hyper_features_resolve_to_absent() {
    let mut pipeline = pipeline_from_yaml(&hyper_pipeline(false));
    let fitter = Arc::new(MockFitter::new());

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(
        requested(&fitter, "phase_2", "lens.hyper_galaxy.noise_factor"),
        ResolvedParameter::Absent
    );
    assert_eq!(
        requested(&fitter, "phase_2", "hyper.background_noise.noise_scale"),
        ResolvedParameter::Absent
    );
    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.einstein_radius"),
        ResolvedParameter::Fixed { value: 1.5 }
    );
    assert_eq!(pipeline.settings_tag(), "general");
}

/// An enabled feature whose hyper estimate is missing is still an error
#[tokio::test]
async fn test_enabled_hyper_feature_without_estimate() {
    let mut pipeline = pipeline_from_yaml(&hyper_pipeline(true));
    let fitter = Arc::new(
        MockFitter::new().with_hyper_estimate("phase_1", "lens.hyper_galaxy.noise_factor", 2.5),
    );

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Link {
            source: LinkError::UnresolvedReference { .. },
            ..
        }
    ));
    assert_eq!(fitter.calls(), vec!["phase_1"]);
}

/// Aligning onto a parameter dropped with its hyper feature is contradictory
#[tokio::test]
async fn test_alignment_onto_absent_parameter() {
    let yaml = r#"
name: pipeline_hyper
dataset: { name: lens_sie }
phases:
  - name: phase_1
    parameters:
      lens.mass.einstein_radius: { uniform: { lower: 0.5, upper: 2.5 } }
  - name: phase_2
    parameters:
      lens.hyper_galaxy.noise_factor:
        from: { step: last, hyper: hyper_galaxies }
      source.hyper_galaxy.noise_factor: { align: lens.hyper_galaxy.noise_factor }
"#;
    let mut pipeline = pipeline_from_yaml(yaml);
    let fitter = Arc::new(MockFitter::new());

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Link {
            source: LinkError::ContradictoryAlignment { .. },
            ..
        }
    ));
}

fn hyper_component_pipeline(enabled: bool) -> String {
    format!(
        r#"
name: pipeline_hyper
settings:
  hyper_galaxies: {enabled}
dataset: {{ name: lens_sie__source_sersic }}
phases:
  - name: phase_1
    parameters:
      lens.mass.einstein_radius: {{ uniform: {{ lower: 0.5, upper: 2.5 }} }}
  - name: phase_2
    links:
      - {{ step: last, source: lens.hyper_galaxy, hyper: hyper_galaxies }}
    parameters:
      lens.mass.einstein_radius:
        from: {{ step: last, pass: model }}
"#
    )
}

/// The whole hyper component is carried over when its feature is on
#[tokio::test]
async fn test_hyper_component_link_when_enabled() {
    let mut pipeline = pipeline_from_yaml(&hyper_component_pipeline(true));
    let fitter = Arc::new(
        MockFitter::new()
            .with_hyper_estimate("phase_1", "lens.hyper_galaxy.noise_factor", 2.5)
            .with_hyper_estimate("phase_1", "lens.hyper_galaxy.noise_power", 1.5),
    );

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(
        requested(&fitter, "phase_2", "lens.hyper_galaxy.noise_factor"),
        ResolvedParameter::Fixed { value: 2.5 }
    );
    assert_eq!(
        requested(&fitter, "phase_2", "lens.hyper_galaxy.noise_power"),
        ResolvedParameter::Fixed { value: 1.5 }
    );
}

/// With the feature off the component is dropped as a single absent entry
#[tokio::test]
async fn test_hyper_component_link_when_disabled() {
    let mut pipeline = pipeline_from_yaml(&hyper_component_pipeline(false));
    let fitter = Arc::new(MockFitter::new());

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(
        requested(&fitter, "phase_2", "lens.hyper_galaxy"),
        ResolvedParameter::Absent
    );
    let request = fitter.request("phase_2").unwrap();
    assert!(request
        .model
        .get(&path("lens.hyper_galaxy.noise_factor"))
        .is_none());
    assert_eq!(request.model.free_parameter_count(), 1);
}
