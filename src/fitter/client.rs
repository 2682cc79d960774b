//! Fitter program configuration

use serde::{Deserialize, Serialize};

/// How to launch the external fitting program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitterConfig {
    /// Path to the fitting executable
    ///
    /// If not provided, defaults to "lens-fit" (assumes it's on PATH).
    #[serde(default)]
    pub command: Option<String>,

    /// Extra arguments passed before the request is piped in
    #[serde(default)]
    pub args: Vec<String>,
}

impl FitterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, command: String) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn command_or_default(&self) -> &str {
        self.command.as_deref().unwrap_or("lens-fit")
    }
}
