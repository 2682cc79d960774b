//! Subprocess fitter - pipes a JSON request into the fitting program

use crate::core::FitResult;
use crate::fitter::{FitError, FitRequest, FitResponse, Fitter, FitterConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Reply printed on the program's stdout
#[derive(Deserialize)]
#[serde(untagged)]
enum Reply {
    Failed { error: String },
    Fitted(FitResponse),
}

/// Runs the fitting program once per phase
///
/// The request is written to stdin as JSON; stdout must hold either a
/// [`FitResponse`] or `{"error": "..."}`.
#[derive(Debug, Clone)]
pub struct SubprocessFitter {
    command: String,
    args: Vec<String>,
}

impl SubprocessFitter {
    pub fn new(config: &FitterConfig) -> Self {
        Self {
            command: config.command_or_default().to_string(),
            args: config.args.clone(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Turn the program's stdout into a result for `request`
    pub fn parse_reply(stdout: &str, request: &FitRequest) -> Result<FitResult, FitError> {
        let reply: Reply =
            serde_json::from_str(stdout.trim()).map_err(|e| FitError::Protocol(e.to_string()))?;
        match reply {
            Reply::Failed { error } => Err(FitError::Numerical(error)),
            Reply::Fitted(response) => Ok(response.into_result(request)),
        }
    }
}

#[async_trait]
impl Fitter for SubprocessFitter {
    async fn fit(&self, request: &FitRequest) -> Result<FitResult, FitError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| FitError::Protocol(e.to_string()))?;
        debug!(
            "Spawning {} for phase {} ({} bytes of request)",
            self.command,
            request.phase,
            payload.len()
        );

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FitError::Launch(format!("{}: {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| FitError::Launch(format!("failed to send request: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| FitError::Launch(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", self.command, code, stderr);
            return Err(FitError::Exit { code, stderr });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| FitError::Protocol(format!("output is not UTF-8: {}", e)))?;
        debug!("{} returned {} bytes", self.command, stdout.len());

        Self::parse_reply(&stdout, request)
    }
}
