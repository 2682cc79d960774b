//! Dotted parameter paths such as `lens.mass.einstein_radius`

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// A path that does not follow the `component.parameter` shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed parameter path '{0}'")]
pub struct PathError(pub String);

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("segment pattern is a valid regex")
    })
}

/// Full path to a single model parameter
///
/// Always has at least two segments; the first one names the component
/// (`lens`, `source`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParamPath(String);

impl ParamPath {
    /// Parse and validate a parameter path
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if !segment_pattern().is_match(raw) || !raw.contains('.') {
            return Err(PathError(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the component this parameter belongs to
    pub fn component(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Whether this path is `other` or lives underneath it
    pub fn is_within(&self, other: &ParamPath) -> bool {
        let mut own = self.segments();
        other.segments().all(|segment| own.next() == Some(segment))
    }

    /// Move this path from under `from` to under `to`
    ///
    /// Returns `Ok(None)` when the path does not live under `from`.
    pub fn rebase(&self, from: &PathPrefix, to: &PathPrefix) -> Result<Option<ParamPath>, PathError> {
        let Some(suffix) = from.suffix_of(self) else {
            return Ok(None);
        };
        let rebased = if suffix.is_empty() {
            to.as_str().to_string()
        } else {
            format!("{}.{}", to.as_str(), suffix)
        };
        ParamPath::parse(&rebased).map(Some)
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ParamPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ParamPath::parse(&value)
    }
}

impl From<ParamPath> for String {
    fn from(path: ParamPath) -> Self {
        path.0
    }
}

/// Prefix selecting a whole component or profile (`source`, `lens.mass`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPrefix(String);

impl PathPrefix {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if !segment_pattern().is_match(raw) {
            return Err(PathError(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `path` is this prefix or lives underneath it
    pub fn contains(&self, path: &ParamPath) -> bool {
        self.suffix_of(path).is_some()
    }

    /// Whether one prefix lives under the other
    pub fn overlaps(&self, other: &PathPrefix) -> bool {
        let (shorter, longer) = if self.0.len() <= other.0.len() {
            (self.as_str(), other.as_str())
        } else {
            (other.as_str(), self.as_str())
        };
        match longer.strip_prefix(shorter) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }

    fn suffix_of<'p>(&self, path: &'p ParamPath) -> Option<&'p str> {
        let rest = path.as_str().strip_prefix(self.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('.')
        }
    }
}

impl fmt::Display for PathPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PathPrefix {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PathPrefix::parse(&value)
    }
}

impl From<PathPrefix> for String {
    fn from(prefix: PathPrefix) -> Self {
        prefix.0
    }
}
