use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::config::Settings;
use crate::error::SentimentBridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentResult {
    pub text: String,
    pub label: String,
}

/// External text classifier. One request, one answer, nothing cached.
pub trait Classifier {
    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentBridgeError>;
}

/// Runs `program [script] <text>` per call and reads the label from stdout.
///
/// The text travels as its own argv entry; no shell is involved.
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    program: String,
    script: Option<String>,
    timeout: Duration,
}

impl ProcessBridge {
    pub fn new(program: impl Into<String>, script: Option<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            script: script.filter(|s| !s.is_empty()),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.sentiment_program.clone(),
            settings.sentiment_script.clone(),
            settings.sentiment_timeout(),
        )
    }

    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(script) = &self.script {
            cmd.arg(script);
        }
        cmd.arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Classifier for ProcessBridge {
    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentBridgeError> {
        let spawn_err = |source: std::io::Error| SentimentBridgeError::Spawn {
            program: self.program.clone(),
            source,
        };

        let child = self.command(text).spawn().map_err(spawn_err)?;
        // Dropping the pending future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SentimentBridgeError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(spawn_err)?;

        if !output.status.success() {
            return Err(SentimentBridgeError::ExitStatus {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|_| SentimentBridgeError::UnreadableOutput {
                program: self.program.clone(),
            })?;
        let label = stdout.trim();
        if label.is_empty() {
            return Err(SentimentBridgeError::EmptyOutput {
                program: self.program.clone(),
            });
        }

        debug!("Classified {:?} as {:?}", text, label);
        Ok(SentimentResult {
            text: text.to_string(),
            label: label.to_string(),
        })
    }
}
