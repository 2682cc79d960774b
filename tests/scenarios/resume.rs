//! Test: Resume - stored results are reused instead of re-fitting

use crate::helpers::*;
use phaselink::core::ExecutionStatus;
use phaselink::execution::restore_results;
use phaselink::linking::ResolvedParameter;
use phaselink::persistence::{DirectoryResultStore, ResultKey, ResultStore};
use std::sync::Arc;

const CHAIN: &str = r#"
name: pipeline_init
settings:
  hyper_galaxies: true
dataset: { name: lens_sie, mask_radius: 3.0 }
phases:
  - name: phase_1
    settings:
      sub_size: 2
    parameters:
      lens.mass.einstein_radius: { uniform: { lower: 0.5, upper: 2.5 } }
  - name: phase_2
    parameters:
      lens.mass.einstein_radius:
        from: { step: last, pass: model }
"#;

#[tokio::test]
async fn test_results_written_to_tagged_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(DirectoryResultStore::new(dir.path()));
    let mut pipeline = pipeline_from_yaml(CHAIN);

    run_pipeline_with_store(&mut pipeline, Arc::new(MockFitter::new()), store)
        .await
        .unwrap();

    let root = dir.path().join("pipeline_init").join("general__hyper_galaxies");
    assert!(root.join("phase_1__sub_2").join("result.json").exists());
    assert!(root.join("phase_2").join("result.json").exists());
}

#[tokio::test]
async fn test_second_run_reuses_every_result() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(DirectoryResultStore::new(dir.path()));

    let mut first = pipeline_from_yaml(CHAIN);
    let first_fitter = Arc::new(
        MockFitter::new().with_estimate("phase_1", "lens.mass.einstein_radius", 1.6, Some(0.02)),
    );
    run_pipeline_with_store(&mut first, first_fitter.clone(), store.clone())
        .await
        .unwrap();
    assert_eq!(first_fitter.calls().len(), 2);

    let mut second = pipeline_from_yaml(CHAIN);
    let second_fitter = Arc::new(MockFitter::new());
    run_pipeline_with_store(&mut second, second_fitter.clone(), store)
        .await
        .unwrap();

    assert!(second_fitter.calls().is_empty());
    assert_phase_completed(&second, "phase_1", true);
    assert_phase_completed(&second, "phase_2", true);
    assert_eq!(second.state.status, ExecutionStatus::Completed);
    assert_eq!(second.state.resumed_steps, 2);
    assert_eq!(second.results(), first.results());
}

/// After a failure only the missing phases are fitted again
#[tokio::test]
async fn test_resume_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(DirectoryResultStore::new(dir.path()));

    let mut first = pipeline_from_yaml(CHAIN);
    let failing = Arc::new(
        MockFitter::new()
            .with_estimate("phase_1", "lens.mass.einstein_radius", 1.6, Some(0.02))
            .failing_at("phase_2", "sampler crashed"),
    );
    assert!(run_pipeline_with_store(&mut first, failing, store.clone())
        .await
        .is_err());

    let mut second = pipeline_from_yaml(CHAIN);
    let fitter = Arc::new(MockFitter::new());
    run_pipeline_with_store(&mut second, fitter.clone(), store)
        .await
        .unwrap();

    assert_eq!(fitter.calls(), vec!["phase_2"]);
    assert_phase_completed(&second, "phase_1", true);
    assert_phase_completed(&second, "phase_2", false);
    // The restored estimate feeds the next phase exactly as a fresh one would
    assert_eq!(
        requested(&fitter, "phase_2", "lens.mass.einstein_radius"),
        ResolvedParameter::Prior {
            prior: phaselink::core::Prior::gaussian(1.6, 0.02)
        }
    );
}

/// Phase settings are part of the phase directory, so a changed phase is refitted
#[tokio::test]
async fn test_changed_settings_refit() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(DirectoryResultStore::new(dir.path()));

    let mut first = pipeline_from_yaml(CHAIN);
    run_pipeline_with_store(&mut first, Arc::new(MockFitter::new()), store.clone())
        .await
        .unwrap();

    let mut changed = pipeline_from_yaml(&CHAIN.replace("sub_size: 2", "sub_size: 4"));
    let fitter = Arc::new(MockFitter::new());
    run_pipeline_with_store(&mut changed, fitter.clone(), store)
        .await
        .unwrap();

    // Only the phase whose tag changed misses its stored result
    assert_eq!(fitter.calls(), vec!["phase_1"]);
    assert_phase_completed(&changed, "phase_1", false);
    assert_phase_completed(&changed, "phase_2", true);
}

#[tokio::test]
async fn test_restore_results_for_inspection() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryResultStore::new(dir.path());

    let mut pipeline = pipeline_from_yaml(CHAIN);
    let key = ResultKey::for_step(&pipeline, 0);
    let stored = phaselink::core::FitResult::new("phase_1", pipeline.dataset.clone())
        .with_estimate(path("lens.mass.einstein_radius"), 1.2, Some(0.1));
    store.save(&key, &stored).await.unwrap();

    let restored = restore_results(&store, &mut pipeline).await.unwrap();
    assert_eq!(restored, 1);
    assert_eq!(pipeline.result("phase_1"), Some(&stored));
    assert!(pipeline.result("phase_2").is_none());
}
