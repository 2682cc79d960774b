//! Test: Failure Handling - configuration errors and halted chains

use crate::helpers::*;
use phaselink::core::config::PipelineConfig;
use phaselink::core::{
    DatasetInfo, ExecutionStatus, ModelDeclaration, Pipeline, PipelineStep, Prior, Reference,
    StepSelector,
};
use phaselink::execution::EngineError;
use phaselink::fitter::FitError;
use phaselink::linking::LinkError;
use std::sync::Arc;

const THREE_PHASES: &str = r#"
name: pipeline_init
dataset: { name: lens_sie }
phases:
  - name: phase_1
    parameters:
      lens.mass.einstein_radius: { uniform: { lower: 0.5, upper: 2.5 } }
      lens.mass.axis_ratio: { gaussian: { mean: 0.8, sigma: 0.25 } }
  - name: phase_2
    parameters:
      lens.mass.einstein_radius:
        from: { step: last }
      lens.mass.axis_ratio:
        from: { step: last }
  - name: phase_3
    parameters:
      lens.mass.einstein_radius:
        from: { step: last, pass: model }
"#;

/// A failed fit halts the chain; later phases are never resolved
#[tokio::test]
async fn test_fit_failure_halts_chain() {
    let mut pipeline = pipeline_from_yaml(THREE_PHASES);
    let fitter = Arc::new(MockFitter::new().failing_at("phase_2", "no live points left"));

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    // The fitter's error is passed on unchanged
    match err {
        EngineError::Fit { phase, source } => {
            assert_eq!(phase, "phase_2");
            assert!(matches!(source, FitError::Numerical(msg) if msg == "no live points left"));
        }
        other => panic!("expected a fit error, got {:?}", other),
    }

    assert_eq!(fitter.calls(), vec!["phase_1", "phase_2"]);
    assert_phase_completed(&pipeline, "phase_1", false);
    assert_phase_failed(&pipeline, "phase_2", "no live points left");
    assert_phase_pending(&pipeline, "phase_3");
    assert_eq!(pipeline.state.status, ExecutionStatus::Failed);
    assert_eq!(pipeline.results().len(), 1);
}

/// A forward reference is rejected before any fit runs
#[tokio::test]
async fn test_forward_reference_rejected_before_fitting() {
    let mut early = ModelDeclaration::new();
    early.reference(
        path("lens.mass.einstein_radius"),
        Reference::new(StepSelector::Index(1), path("lens.mass.einstein_radius")),
    );
    let mut late = ModelDeclaration::new();
    late.prior(path("lens.mass.einstein_radius"), Prior::uniform(0.5, 2.5));

    let mut pipeline = Pipeline::new("pipeline_init", DatasetInfo::default())
        .with_step(PipelineStep::new("phase_1", early))
        .with_step(PipelineStep::new("phase_2", late));
    let fitter = Arc::new(MockFitter::new());

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Config(LinkError::ForwardReference { step: 0, .. })
    ));
    assert!(fitter.calls().is_empty());
    assert_phase_pending(&pipeline, "phase_1");
    assert!(pipeline.has_failed());
}

/// A reference to a parameter the earlier phase never declares is a
/// configuration error
#[tokio::test]
async fn test_undeclared_path_rejected_before_fitting() {
    let mut first = ModelDeclaration::new();
    first.prior(path("lens.mass.einstein_radius"), Prior::uniform(0.5, 2.5));
    let mut second = ModelDeclaration::new();
    second.reference(
        path("lens.mass.slope"),
        Reference::new(StepSelector::Last, path("lens.mass.slope")),
    );

    let mut pipeline = Pipeline::new("pipeline_power_law", DatasetInfo::default())
        .with_step(PipelineStep::new("phase_1", first))
        .with_step(PipelineStep::new("phase_2", second));
    let fitter = Arc::new(MockFitter::new());

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    match err {
        EngineError::Config(source) => assert!(source.is_unresolved_reference()),
        other => panic!("expected a configuration error, got {:?}", other),
    }
    assert!(fitter.calls().is_empty());
}

#[test]
fn test_config_errors_reported_at_load() {
    let cyclic = r#"
name: pipeline_light
dataset: { name: lens_bulge_disk }
phases:
  - name: phase_1
    parameters:
      lens.bulge.phi: { align: lens.disk.phi }
      lens.disk.phi: { align: lens.bulge.phi }
"#;
    let err = PipelineConfig::from_yaml(cyclic).unwrap_err();
    assert!(format!("{:#}", err).contains("forms a cycle"));

    let unknown_phase = r#"
name: pipeline_init
dataset: { name: lens_sie }
phases:
  - name: phase_1
    parameters:
      lens.mass.phi: 0.0
  - name: phase_2
    parameters:
      lens.mass.phi:
        from: { step: phase_0 }
"#;
    let err = PipelineConfig::from_yaml(unknown_phase).unwrap_err();
    assert!(format!("{:#}", err).contains("unknown phase 'phase_0'"));

    let malformed = r#"
name: pipeline_init
dataset: { name: lens_sie }
phases:
  - name: phase_1
    parameters:
      einstein_radius: 1.6
"#;
    let err = PipelineConfig::from_yaml(malformed).unwrap_err();
    assert!(format!("{:#}", err).contains("malformed parameter path 'einstein_radius'"));
}

/// A result missing a referenced estimate stops the chain at run time
#[tokio::test]
async fn test_missing_estimate_halts_chain() {
    let mut pipeline = pipeline_from_yaml(THREE_PHASES);
    let fitter = Arc::new(MockFitter::new().omitting("phase_1", "lens.mass.axis_ratio"));

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    match &err {
        EngineError::Link { phase, source } => {
            assert_eq!(phase, "phase_2");
            assert!(source.is_unresolved_reference());
        }
        other => panic!("expected a link error, got {:?}", other),
    }
    assert_eq!(fitter.calls(), vec!["phase_1"]);
    assert_phase_failed(&pipeline, "phase_2", "has no estimate for 'lens.mass.axis_ratio'");
    assert_phase_pending(&pipeline, "phase_3");
}
