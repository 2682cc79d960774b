//! Parameter specifications: fixed values, priors and links to earlier results

use crate::core::path::{ParamPath, PathPrefix};
use crate::core::settings::HyperFeature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability distribution over a parameter before fitting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prior {
    Gaussian { mean: f64, sigma: f64 },
    Uniform { lower: f64, upper: f64 },
}

impl Prior {
    pub fn gaussian(mean: f64, sigma: f64) -> Self {
        Prior::Gaussian { mean, sigma }
    }

    pub fn uniform(lower: f64, upper: f64) -> Self {
        Prior::Uniform { lower, upper }
    }

    /// Check the distribution is well formed
    pub fn check(&self) -> Result<(), String> {
        match *self {
            Prior::Gaussian { mean, sigma } => {
                if !mean.is_finite() {
                    return Err(format!("gaussian mean {} is not finite", mean));
                }
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(format!("gaussian sigma must be positive, got {}", sigma));
                }
            }
            Prior::Uniform { lower, upper } => {
                if !(lower.is_finite() && upper.is_finite() && lower < upper) {
                    return Err(format!(
                        "uniform bounds must satisfy lower < upper, got [{}, {}]",
                        lower, upper
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Prior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prior::Gaussian { mean, sigma } => write!(f, "Gaussian(mean={}, sigma={})", mean, sigma),
            Prior::Uniform { lower, upper } => write!(f, "Uniform({}, {})", lower, upper),
        }
    }
}

/// Selects an earlier phase of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSelector", into = "RawSelector")]
pub enum StepSelector {
    /// Position in the chain, starting at zero
    Index(usize),
    /// Phase name
    Name(String),
    /// The phase immediately before the one being configured
    Last,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Index(usize),
    Name(String),
}

impl From<RawSelector> for StepSelector {
    fn from(raw: RawSelector) -> Self {
        match raw {
            RawSelector::Index(index) => StepSelector::Index(index),
            RawSelector::Name(name) if name == "last" => StepSelector::Last,
            RawSelector::Name(name) => StepSelector::Name(name),
        }
    }
}

impl From<StepSelector> for RawSelector {
    fn from(selector: StepSelector) -> Self {
        match selector {
            StepSelector::Index(index) => RawSelector::Index(index),
            StepSelector::Name(name) => RawSelector::Name(name),
            StepSelector::Last => RawSelector::Name("last".to_string()),
        }
    }
}

impl fmt::Display for StepSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepSelector::Index(index) => write!(f, "#{}", index),
            StepSelector::Name(name) => f.write_str(name),
            StepSelector::Last => f.write_str("last"),
        }
    }
}

/// How an earlier estimate is carried into the next phase
///
/// Written as `instance`, `model`, `{ absolute: 0.3 }` or `{ relative: 0.5 }`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawPassing", into = "RawPassing")]
pub enum Passing {
    /// The estimate becomes a fixed value
    #[default]
    Instance,
    /// Gaussian centred on the estimate with the reported uncertainty
    Model,
    /// Gaussian centred on the estimate with the given sigma
    Absolute(f64),
    /// Gaussian centred on the estimate, sigma = fraction * |estimate|
    Relative(f64),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPassing {
    Named(String),
    Absolute { absolute: f64 },
    Relative { relative: f64 },
}

impl TryFrom<RawPassing> for Passing {
    type Error = String;

    fn try_from(raw: RawPassing) -> Result<Self, Self::Error> {
        match raw {
            RawPassing::Named(name) => match name.as_str() {
                "instance" => Ok(Passing::Instance),
                "model" => Ok(Passing::Model),
                other => Err(format!(
                    "unknown passing mode '{}', expected instance, model, absolute or relative",
                    other
                )),
            },
            RawPassing::Absolute { absolute } => Ok(Passing::Absolute(absolute)),
            RawPassing::Relative { relative } => Ok(Passing::Relative(relative)),
        }
    }
}

impl From<Passing> for RawPassing {
    fn from(pass: Passing) -> Self {
        match pass {
            Passing::Instance => RawPassing::Named("instance".to_string()),
            Passing::Model => RawPassing::Named("model".to_string()),
            Passing::Absolute(absolute) => RawPassing::Absolute { absolute },
            Passing::Relative(relative) => RawPassing::Relative { relative },
        }
    }
}

impl Passing {
    /// Explicit widths and fractions must be positive
    pub fn check(&self) -> Result<(), String> {
        match *self {
            Passing::Absolute(width) if !(width.is_finite() && width > 0.0) => {
                Err(format!("absolute width must be positive, got {}", width))
            }
            Passing::Relative(fraction) if !(fraction.is_finite() && fraction > 0.0) => {
                Err(format!("relative fraction must be positive, got {}", fraction))
            }
            _ => Ok(()),
        }
    }
}

/// Back-reference to a parameter estimated by an earlier phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub step: StepSelector,
    pub path: ParamPath,

    #[serde(default)]
    pub pass: Passing,

    /// Read from the hyper estimates, gated on this feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyper: Option<HyperFeature>,
}

impl Reference {
    pub fn new(step: StepSelector, path: ParamPath) -> Self {
        Self {
            step,
            path,
            pass: Passing::Instance,
            hyper: None,
        }
    }

    pub fn passing(mut self, pass: Passing) -> Self {
        self.pass = pass;
        self
    }

    pub fn hyper(mut self, feature: HyperFeature) -> Self {
        self.hyper = Some(feature);
        self
    }
}

/// Carries every estimate under `source` of an earlier phase into `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLink {
    pub step: StepSelector,
    pub source: PathPrefix,
    pub target: PathPrefix,

    #[serde(default)]
    pub pass: Passing,

    /// Read from the hyper estimates, gated on this feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyper: Option<HyperFeature>,
}

impl ComponentLink {
    pub fn new(step: StepSelector, source: PathPrefix, target: PathPrefix) -> Self {
        Self {
            step,
            source,
            target,
            pass: Passing::Instance,
            hyper: None,
        }
    }

    pub fn passing(mut self, pass: Passing) -> Self {
        self.pass = pass;
        self
    }

    pub fn hyper(mut self, feature: HyperFeature) -> Self {
        self.hyper = Some(feature);
        self
    }
}

/// What a single declared parameter is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSpec {
    Fixed(f64),
    Prior(Prior),
    Reference(Reference),
    /// Shares whatever the named parameter of the same model resolves to
    Aligned(ParamPath),
}

impl ParameterSpec {
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            ParameterSpec::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}
