//! Scenario-based tests for phaselink


mod failure_handling;
mod hyper_features;
mod instance_passing;
mod prior_passing;
mod resume;
