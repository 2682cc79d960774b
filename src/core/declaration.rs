//! Model declarations - what a phase fits, before links are resolved

use crate::core::parameter::{ComponentLink, ParameterSpec, Prior, Reference};
use crate::core::path::{ParamPath, PathPrefix};
use std::collections::BTreeMap;

/// Declared parameters of a phase, grouped by component through their paths
///
/// Built up with the setters, then handed by value to a [`PipelineStep`]
/// which never mutates it again.
///
/// [`PipelineStep`]: crate::core::PipelineStep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDeclaration {
    parameters: BTreeMap<ParamPath, ParameterSpec>,
    links: Vec<ComponentLink>,
}

impl ModelDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare or replace a parameter
    pub fn set(&mut self, path: ParamPath, spec: ParameterSpec) -> &mut Self {
        self.parameters.insert(path, spec);
        self
    }

    pub fn fix(&mut self, path: ParamPath, value: f64) -> &mut Self {
        self.set(path, ParameterSpec::Fixed(value))
    }

    pub fn prior(&mut self, path: ParamPath, prior: Prior) -> &mut Self {
        self.set(path, ParameterSpec::Prior(prior))
    }

    pub fn reference(&mut self, path: ParamPath, reference: Reference) -> &mut Self {
        self.set(path, ParameterSpec::Reference(reference))
    }

    pub fn align(&mut self, path: ParamPath, target: ParamPath) -> &mut Self {
        self.set(path, ParameterSpec::Aligned(target))
    }

    /// Add a whole-component link; explicit parameters win over it
    pub fn link(&mut self, link: ComponentLink) -> &mut Self {
        self.links.push(link);
        self
    }

    pub fn get(&self, path: &ParamPath) -> Option<&ParameterSpec> {
        self.parameters.get(path)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&ParamPath, &ParameterSpec)> {
        self.parameters.iter()
    }

    pub fn links(&self) -> &[ComponentLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.links.is_empty()
    }

    /// Whether a fit of this declaration can report an estimate for `path`
    ///
    /// True for explicit parameters and for anything under a link target,
    /// since link expansion depends on results not known yet.
    pub fn may_declare(&self, path: &ParamPath) -> bool {
        self.parameters.contains_key(path) || self.links.iter().any(|link| link.target.contains(path))
    }

    /// Whether a fit of this declaration can report anything under `prefix`
    pub fn may_declare_under(&self, prefix: &PathPrefix) -> bool {
        self.parameters.keys().any(|path| prefix.contains(path))
            || self.links.iter().any(|link| link.target.overlaps(prefix))
    }
}
