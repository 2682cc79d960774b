//! Test: Prior Passing - earlier estimates become priors of later phases

use crate::helpers::*;
use phaselink::core::Prior;
use phaselink::execution::EngineError;
use phaselink::linking::{LinkError, ResolvedParameter};
use std::sync::Arc;

const CHAIN: &str = r#"
name: pipeline_mass
dataset: { name: lens_sie, mask_radius: 2.4 }
phases:
  - name: phase_1
    parameters:
      lens.mass.einstein_radius: { uniform: { lower: 0.5, upper: 2.5 } }
      lens.mass.axis_ratio: { gaussian: { mean: 0.8, sigma: 0.25 } }
      lens.mass.phi: { uniform: { lower: 0.0, upper: 180.0 } }
  - name: phase_2
    parameters:
      lens.mass.einstein_radius:
        from: { step: last, pass: model }
      lens.mass.axis_ratio:
        from: { step: last, pass: { absolute: 0.1 } }
      lens.mass.phi:
        from: { step: last, pass: { relative: 0.5 } }
"#;

#[tokio::test]
async fn test_passing_modes() {
    let mut pipeline = pipeline_from_yaml(CHAIN);
    let fitter = Arc::new(
        MockFitter::new()
            .with_estimate("phase_1", "lens.mass.einstein_radius", 1.6, Some(0.02))
            .with_estimate("phase_1", "lens.mass.axis_ratio", 0.75, Some(0.01))
            .with_estimate("phase_1", "lens.mass.phi", -50.0, Some(3.0)),
    );

    run_pipeline_with_mock(&mut pipeline, fitter.clone()).await.unwrap();

    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.einstein_radius"),
        ResolvedParameter::Prior {
            prior: Prior::gaussian(1.6, 0.02)
        }
    );
    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.axis_ratio"),
        ResolvedParameter::Prior {
            prior: Prior::gaussian(0.75, 0.1)
        }
    );
    // Relative widths scale with the magnitude of the estimate
    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.phi"),
        ResolvedParameter::Prior {
            prior: Prior::gaussian(-50.0, 25.0)
        }
    );

    let request = fitter.request("phase_2").unwrap();
    assert_eq!(request.model.free_parameter_count(), 3);
}

/// Posterior passing needs an uncertainty; the chain halts without one
#[tokio::test]
async fn test_model_passing_without_sigma_halts() {
    let mut pipeline = pipeline_from_yaml(CHAIN);
    let fitter = Arc::new(MockFitter::new().with_estimate(
        "phase_1",
        "lens.mass.einstein_radius",
        1.6,
        None,
    ));

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    match err {
        EngineError::Link { phase, source } => {
            assert_eq!(phase, "phase_2");
            assert!(matches!(source, LinkError::MissingUncertainty { .. }));
        }
        other => panic!("expected a link error, got {:?}", other),
    }
    assert_eq!(fitter.calls(), vec!["phase_1"]);
    assert_phase_failed(&pipeline, "phase_2", "no uncertainty");
    assert!(pipeline.has_failed());
}

/// A relative width of an estimate at zero would be a zero-width prior
#[tokio::test]
async fn test_relative_width_of_zero_estimate_is_rejected() {
    let mut pipeline = pipeline_from_yaml(CHAIN);
    let fitter = Arc::new(MockFitter::new().with_estimate("phase_1", "lens.mass.phi", 0.0, Some(1.0)));

    let err = run_pipeline_with_mock(&mut pipeline, fitter.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Link {
            source: LinkError::InvalidPrior { .. },
            ..
        }
    ));
    assert_eq!(fitter.calls(), vec!["phase_1"]);
}

#[test]
fn test_non_positive_width_is_a_config_error() {
    let yaml = r#"
name: pipeline_mass
dataset: { name: lens_sie }
phases:
  - name: phase_1
    parameters:
      lens.mass.phi: { uniform: { lower: 0.0, upper: 180.0 } }
  - name: phase_2
    parameters:
      lens.mass.phi:
        from: { step: last, pass: { absolute: 0.0 } }
"#;

    let err = phaselink::core::config::PipelineConfig::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("absolute width must be positive"));
}
