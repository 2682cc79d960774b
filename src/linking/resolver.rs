//! Resolves a declaration against the results of earlier phases

use crate::core::{
    parameter::{ComponentLink, ParameterSpec, Passing, Prior, Reference, StepSelector},
    path::ParamPath,
    result::{Estimate, FitResult},
    settings::GeneralSettings,
    declaration::ModelDeclaration,
};
use crate::linking::{ConcreteModel, LinkError, ResolvedParameter};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Resolve `declaration` as the phase right after `prior_results`, with
/// every hyper feature enabled
pub fn resolve(
    declaration: &ModelDeclaration,
    prior_results: &[FitResult],
) -> Result<ConcreteModel, LinkError> {
    Resolver::new(&GeneralSettings::all()).resolve(prior_results.len(), declaration, prior_results)
}

/// Turns declarations into concrete models
///
/// Resolution is pure: the same declaration and results always give the
/// same model.
pub struct Resolver<'a> {
    settings: &'a GeneralSettings,
}

impl<'a> Resolver<'a> {
    pub fn new(settings: &'a GeneralSettings) -> Self {
        Self { settings }
    }

    /// Resolve the declaration of phase `step_index`
    ///
    /// `prior_results[i]` must be the result of phase `i`. Only results
    /// before `step_index` are ever read.
    pub fn resolve(
        &self,
        step_index: usize,
        declaration: &ModelDeclaration,
        prior_results: &[FitResult],
    ) -> Result<ConcreteModel, LinkError> {
        let mut resolved = BTreeMap::new();

        for link in declaration.links() {
            self.expand_link(step_index, link, prior_results, &mut resolved)?;
        }

        let mut aligned = Vec::new();
        for (path, spec) in declaration.parameters() {
            let parameter = match spec {
                ParameterSpec::Fixed(value) => ResolvedParameter::Fixed { value: *value },
                ParameterSpec::Prior(prior) => {
                    prior.check().map_err(|reason| LinkError::InvalidPrior {
                        path: path.to_string(),
                        reason,
                    })?;
                    ResolvedParameter::Prior { prior: *prior }
                }
                ParameterSpec::Reference(reference) => {
                    self.resolve_reference(step_index, path, reference, prior_results)?
                }
                ParameterSpec::Aligned(_) => {
                    aligned.push(path);
                    continue;
                }
            };
            resolved.insert(path.clone(), parameter);
        }

        for path in aligned {
            let root = Self::alignment_root(path, declaration, &resolved)?;
            resolved.insert(path.clone(), ResolvedParameter::Aligned { to: root });
        }

        let model = ConcreteModel::from_parameters(resolved);
        debug!(
            "Resolved phase {}: {} parameters, {} free",
            step_index,
            model.len(),
            model.free_parameter_count()
        );
        Ok(model)
    }

    fn expand_link(
        &self,
        step_index: usize,
        link: &ComponentLink,
        prior_results: &[FitResult],
        resolved: &mut BTreeMap<ParamPath, ResolvedParameter>,
    ) -> Result<(), LinkError> {
        let result = select_result(step_index, &link.step, prior_results)?;

        let estimates: Vec<_> = match link.hyper {
            Some(feature) if !self.settings.is_enabled(feature) => {
                warn!("{} is disabled; '{}' resolves to absent", feature, link.target);
                // The whole component is dropped, so it stands as one absent entry
                let target = ParamPath::parse(link.target.as_str())?;
                resolved.insert(target, ResolvedParameter::Absent);
                return Ok(());
            }
            Some(_) => result.hyper_estimates_under(&link.source).collect(),
            None => result.estimates_under(&link.source).collect(),
        };

        if estimates.is_empty() {
            return Err(LinkError::UnresolvedReference {
                phase: result.phase().to_string(),
                path: link.source.to_string(),
            });
        }

        for (source_path, estimate) in estimates {
            let Some(target_path) = source_path.rebase(&link.source, &link.target)? else {
                continue;
            };
            let parameter = pass_estimate(&target_path, result, estimate, link.pass)?;
            resolved.insert(target_path, parameter);
        }
        Ok(())
    }

    fn resolve_reference(
        &self,
        step_index: usize,
        path: &ParamPath,
        reference: &Reference,
        prior_results: &[FitResult],
    ) -> Result<ResolvedParameter, LinkError> {
        let result = select_result(step_index, &reference.step, prior_results)?;

        let estimate = match reference.hyper {
            Some(feature) if !self.settings.is_enabled(feature) => {
                warn!(
                    "{} is disabled; '{}' resolves to absent",
                    feature, path
                );
                return Ok(ResolvedParameter::Absent);
            }
            Some(_) => result.hyper_estimate(&reference.path),
            None => result.estimate(&reference.path),
        };

        let estimate = estimate.ok_or_else(|| LinkError::UnresolvedReference {
            phase: result.phase().to_string(),
            path: reference.path.to_string(),
        })?;

        pass_estimate(path, result, estimate, reference.pass)
    }

    /// Follow an alignment chain to the first parameter that is not aligned
    fn alignment_root(
        path: &ParamPath,
        declaration: &ModelDeclaration,
        resolved: &BTreeMap<ParamPath, ResolvedParameter>,
    ) -> Result<ParamPath, LinkError> {
        let mut visited = HashSet::new();
        visited.insert(path);
        let mut current = path;

        loop {
            let target = match declaration.get(current) {
                Some(ParameterSpec::Aligned(target)) => target,
                _ => break,
            };
            if !visited.insert(target) {
                return Err(LinkError::CyclicAlignment(path.to_string()));
            }
            current = target;
        }

        let contradictory = || LinkError::ContradictoryAlignment {
            path: path.to_string(),
            target: current.to_string(),
        };
        match resolved.get(current) {
            Some(ResolvedParameter::Absent) => Err(contradictory()),
            Some(_) => Ok(current.clone()),
            None if resolved
                .iter()
                .any(|(dropped, parameter)| parameter.is_absent() && current.is_within(dropped)) =>
            {
                Err(contradictory())
            }
            None => Err(LinkError::UnknownAlignmentTarget {
                path: path.to_string(),
                target: current.to_string(),
            }),
        }
    }
}

/// Pick the result a selector points at, rejecting anything not strictly earlier
pub(crate) fn select_result<'r>(
    step_index: usize,
    selector: &StepSelector,
    prior_results: &'r [FitResult],
) -> Result<&'r FitResult, LinkError> {
    let index = match selector {
        StepSelector::Index(index) => {
            if *index >= step_index {
                return Err(LinkError::ForwardReference {
                    step: step_index,
                    target: selector.to_string(),
                });
            }
            *index
        }
        StepSelector::Last => {
            if step_index == 0 {
                return Err(LinkError::ForwardReference {
                    step: step_index,
                    target: selector.to_string(),
                });
            }
            step_index - 1
        }
        StepSelector::Name(name) => prior_results
            .iter()
            .take(step_index)
            .position(|result| result.phase() == name)
            .ok_or_else(|| LinkError::UnknownPhase(name.clone()))?,
    };

    prior_results.get(index).ok_or(LinkError::MissingResult(index))
}

fn pass_estimate(
    path: &ParamPath,
    result: &FitResult,
    estimate: &Estimate,
    pass: Passing,
) -> Result<ResolvedParameter, LinkError> {
    let invalid = |reason: String| LinkError::InvalidPrior {
        path: path.to_string(),
        reason,
    };
    pass.check().map_err(invalid)?;

    let sigma = match pass {
        Passing::Instance => return Ok(ResolvedParameter::Fixed { value: estimate.value }),
        Passing::Model => estimate.sigma.ok_or_else(|| LinkError::MissingUncertainty {
            phase: result.phase().to_string(),
            path: path.to_string(),
        })?,
        Passing::Absolute(width) => width,
        Passing::Relative(fraction) => fraction * estimate.value.abs(),
    };

    let prior = Prior::gaussian(estimate.value, sigma);
    prior.check().map_err(invalid)?;
    Ok(ResolvedParameter::Prior { prior })
}
