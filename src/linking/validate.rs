//! Whole-chain checks run before any phase is fitted

use crate::core::{
    parameter::{ParameterSpec, StepSelector},
    path::ParamPath,
    step::PipelineStep,
};
use crate::linking::LinkError;
use std::collections::HashSet;

/// Check every link of every phase against the phases it points at
///
/// Catches duplicate or reserved names, forward and self references, references to
/// parameters the target phase never declares, bad prior spreads and
/// broken alignments. Links into hyper estimates are only checked for
/// their target phase, since hyper parameters are not declared.
pub fn validate_chain(steps: &[PipelineStep]) -> Result<(), LinkError> {
    let mut names = HashSet::new();
    for step in steps {
        if step.name == "last" {
            return Err(LinkError::ReservedPhaseName(step.name.clone()));
        }
        if !names.insert(step.name.as_str()) {
            return Err(LinkError::DuplicatePhase(step.name.clone()));
        }
    }

    for (index, step) in steps.iter().enumerate() {
        let declaration = &step.declaration;

        for link in declaration.links() {
            let target = select_step(index, &link.step, steps)?;
            link.pass.check().map_err(|reason| LinkError::InvalidPrior {
                path: link.target.to_string(),
                reason,
            })?;
            if link.hyper.is_some() {
                // A dropped component resolves to a single absent entry
                ParamPath::parse(link.target.as_str())?;
            } else if !steps[target].declaration.may_declare_under(&link.source) {
                return Err(LinkError::UnresolvedReference {
                    phase: steps[target].name.clone(),
                    path: link.source.to_string(),
                });
            }
        }

        for (path, spec) in declaration.parameters() {
            match spec {
                ParameterSpec::Fixed(_) => {}
                ParameterSpec::Prior(prior) => {
                    prior.check().map_err(|reason| LinkError::InvalidPrior {
                        path: path.to_string(),
                        reason,
                    })?;
                }
                ParameterSpec::Reference(reference) => {
                    let target = select_step(index, &reference.step, steps)?;
                    reference.pass.check().map_err(|reason| LinkError::InvalidPrior {
                        path: path.to_string(),
                        reason,
                    })?;
                    if reference.hyper.is_none()
                        && !steps[target].declaration.may_declare(&reference.path)
                    {
                        return Err(LinkError::UnresolvedReference {
                            phase: steps[target].name.clone(),
                            path: reference.path.to_string(),
                        });
                    }
                }
                ParameterSpec::Aligned(_) => {
                    let mut visited = HashSet::new();
                    visited.insert(path);
                    let mut current = path;
                    while let Some(ParameterSpec::Aligned(next)) = declaration.get(current) {
                        if !visited.insert(next) {
                            return Err(LinkError::CyclicAlignment(path.to_string()));
                        }
                        current = next;
                    }
                    if !declaration.may_declare(current) {
                        return Err(LinkError::UnknownAlignmentTarget {
                            path: path.to_string(),
                            target: current.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(())
}

/// Position of the phase a selector names, as seen from phase `index`
fn select_step(index: usize, selector: &StepSelector, steps: &[PipelineStep]) -> Result<usize, LinkError> {
    let forward = || LinkError::ForwardReference {
        step: index,
        target: selector.to_string(),
    };

    match selector {
        StepSelector::Index(target) if *target < index => Ok(*target),
        StepSelector::Index(_) => Err(forward()),
        StepSelector::Last if index > 0 => Ok(index - 1),
        StepSelector::Last => Err(forward()),
        StepSelector::Name(name) => match steps.iter().position(|s| &s.name == name) {
            Some(target) if target < index => Ok(target),
            Some(_) => Err(forward()),
            None => Err(LinkError::UnknownPhase(name.clone())),
        },
    }
}
