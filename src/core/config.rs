//! Pipeline configuration from YAML

use crate::core::{
    declaration::ModelDeclaration,
    parameter::{ComponentLink, Passing, Prior, Reference, StepSelector},
    path::{ParamPath, PathPrefix},
    pipeline::Pipeline,
    result::DatasetInfo,
    settings::{GeneralSettings, HyperFeature, PhaseSettings, SolverConfig},
    step::PipelineStep,
};
use crate::fitter::FitterConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Hyper features shared by every phase
    #[serde(default)]
    pub settings: GeneralSettings,

    /// Data the phases are fitted against
    pub dataset: DatasetInfo,

    /// External fitting program
    #[serde(default)]
    pub fitter: FitterConfig,

    /// Root directory for stored results (defaults to `./output`)
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Phases in execution order
    pub phases: Vec<PhaseConfig>,
}

/// Phase configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseConfig {
    /// Unique phase name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub settings: PhaseSettings,

    /// Parameter path -> specification
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterConfig>,

    /// Whole components carried over from earlier phases
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

/// A parameter entry: a bare number, a prior, or a tagged link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterConfig {
    /// `lens.mass.centre_0: 0.0`
    Literal(f64),
    /// `{ gaussian: { mean: 0.0, sigma: 0.1 } }` or `{ uniform: { lower, upper } }`
    Prior(Prior),
    Tagged(TaggedParameter),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaggedParameter {
    /// `{ fixed: 0.0 }`
    Fixed(f64),
    /// `{ from: { step: last, path: lens.mass.phi, pass: model } }`
    From(ReferenceConfig),
    /// `{ align: lens.disk.phi }`
    Align(String),
}

/// Back-reference as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceConfig {
    /// Phase index, phase name, or `last`
    pub step: StepSelector,

    /// Path in the referenced phase (defaults to the parameter's own path)
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub pass: Passing,

    /// Read from the hyper estimates when this feature is on
    #[serde(default)]
    pub hyper: Option<HyperFeature>,
}

/// Component link as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    pub step: StepSelector,

    /// Prefix in the referenced phase, e.g. `source` or `lens.mass`
    pub source: String,

    /// Prefix in this phase (defaults to `source`)
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub pass: Passing,

    /// Carry the hyper estimates when this feature is on
    #[serde(default)]
    pub hyper: Option<HyperFeature>,
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    ///
    /// Parses every path and checks every link of the chain, so a config
    /// that passes can be run without configuration errors until a phase
    /// result is missing a referenced estimate.
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            anyhow::bail!("Pipeline '{}' has no phases", self.name);
        }

        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(&phase.name) {
                anyhow::bail!("Duplicate phase name: {}", phase.name);
            }
        }

        if let Some(radius) = self.dataset.mask_radius {
            if !(radius.is_finite() && radius > 0.0) {
                anyhow::bail!("Mask radius must be positive, got {}", radius);
            }
        }

        let pipeline = self.to_pipeline()?;
        pipeline
            .validate()
            .with_context(|| format!("Invalid links in pipeline '{}'", self.name))?;
        Ok(())
    }

    /// Directory results are stored under
    pub fn output_root(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from("output"))
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(self.name.clone(), self.dataset.clone())
            .with_settings(self.settings.clone());

        for phase in &self.phases {
            let declaration = phase
                .to_declaration()
                .with_context(|| format!("Invalid declaration in phase '{}'", phase.name))?;
            let step = PipelineStep::new(phase.name.clone(), declaration)
                .with_solver(phase.solver.clone())
                .with_settings(phase.settings.clone());
            pipeline = pipeline.with_step(step);
        }

        Ok(pipeline)
    }
}

impl PhaseConfig {
    /// Build the model declaration, parsing every path
    pub fn to_declaration(&self) -> Result<ModelDeclaration> {
        let mut declaration = ModelDeclaration::new();

        for link in &self.links {
            let source = PathPrefix::parse(&link.source)?;
            let target = match &link.target {
                Some(target) => PathPrefix::parse(target)?,
                None => source.clone(),
            };
            let mut component = ComponentLink::new(link.step.clone(), source, target).passing(link.pass);
            if let Some(feature) = link.hyper {
                component = component.hyper(feature);
            }
            declaration.link(component);
        }

        for (raw_path, parameter) in &self.parameters {
            let path = ParamPath::parse(raw_path)?;
            match parameter {
                ParameterConfig::Literal(value) | ParameterConfig::Tagged(TaggedParameter::Fixed(value)) => {
                    declaration.fix(path, *value);
                }
                ParameterConfig::Prior(prior) => {
                    declaration.prior(path, *prior);
                }
                ParameterConfig::Tagged(TaggedParameter::From(reference)) => {
                    let source_path = match &reference.path {
                        Some(raw) => ParamPath::parse(raw)?,
                        None => path.clone(),
                    };
                    let mut linked = Reference::new(reference.step.clone(), source_path)
                        .passing(reference.pass);
                    if let Some(feature) = reference.hyper {
                        linked = linked.hyper(feature);
                    }
                    declaration.reference(path, linked);
                }
                ParameterConfig::Tagged(TaggedParameter::Align(target)) => {
                    declaration.align(path, ParamPath::parse(target)?);
                }
            }
        }

        Ok(declaration)
    }
}
