//! Concrete models handed to the fitter

use crate::core::parameter::Prior;
use crate::core::path::ParamPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parameter after every link has been followed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedParameter {
    Fixed { value: f64 },
    Prior { prior: Prior },
    /// Shares the root parameter `to`, which is never itself aligned
    Aligned { to: ParamPath },
    /// Dropped because the hyper feature feeding it is disabled
    Absent,
}

impl ResolvedParameter {
    pub fn fixed_value(&self) -> Option<f64> {
        match self {
            ResolvedParameter::Fixed { value } => Some(*value),
            _ => None,
        }
    }

    pub fn prior(&self) -> Option<&Prior> {
        match self {
            ResolvedParameter::Prior { prior } => Some(prior),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ResolvedParameter::Absent)
    }
}

/// Declaration with every reference substituted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcreteModel {
    parameters: BTreeMap<ParamPath, ResolvedParameter>,
}

impl ConcreteModel {
    pub(crate) fn from_parameters(parameters: BTreeMap<ParamPath, ResolvedParameter>) -> Self {
        Self { parameters }
    }

    pub fn get(&self, path: &ParamPath) -> Option<&ResolvedParameter> {
        self.parameters.get(path)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&ParamPath, &ResolvedParameter)> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of priors the sampler has to explore
    pub fn free_parameter_count(&self) -> usize {
        self.parameters.values().filter(|p| p.prior().is_some()).count()
    }

    /// Fixed value of `path`, following an alignment to its root
    pub fn value_of(&self, path: &ParamPath) -> Option<f64> {
        match self.parameters.get(path)? {
            ResolvedParameter::Fixed { value } => Some(*value),
            ResolvedParameter::Aligned { to } => self.parameters.get(to)?.fixed_value(),
            _ => None,
        }
    }

    /// Every parameter whose value is fully determined
    pub fn fixed_instance(&self) -> BTreeMap<ParamPath, f64> {
        self.parameters
            .keys()
            .filter_map(|path| self.value_of(path).map(|value| (path.clone(), value)))
            .collect()
    }
}
