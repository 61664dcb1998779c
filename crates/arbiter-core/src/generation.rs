//! Generation collaborator contract and reference implementations
//!
//! [`CommandGenerator`] pipes the prompt into a local command's stdin and
//! returns its stdout. [`RetryingGenerator`] wraps any generator with
//! exponential backoff for transient failures.

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Failures at the generation boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Command could not be started or fed
    #[error("generation command failed: {0}")]
    Command(String),

    /// Call did not finish in time
    #[error("generation timed out after {secs}s")]
    Timeout {
        /// Elapsed limit
        secs: u64,
    },

    /// Backend answered with an error
    #[error("generation backend error: {0}")]
    Backend(String),

    /// Backend answered with nothing usable
    #[error("generation returned an empty response")]
    EmptyResponse,

    /// Backend refused the request outright
    #[error("generation rejected the request: {0}")]
    Rejected(String),
}

impl GenerationError {
    /// Transient failures worth retrying
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Backend(_) | Self::EmptyResponse
        )
    }
}

/// Free-text generation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Response text for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Runs a shell-style command per prompt
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandGenerator {
    /// Parse `command` with shell quoting rules
    ///
    /// # Errors
    /// Returns [`GenerationError::Rejected`] if the command does not parse or
    /// is empty
    pub fn new(command: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let mut words = shell_words::split(command)
            .map_err(|e| GenerationError::Rejected(format!("parse command `{command}`: {e}")))?;
        if words.is_empty() {
            return Err(GenerationError::Rejected("command is empty".into()));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            timeout,
        })
    }

    /// Build from the `[generation]` section
    ///
    /// # Errors
    /// Returns [`PipelineError::Config`] if no command is configured or it
    /// does not parse
    pub fn from_config(config: &GenerationConfig) -> Result<Self, PipelineError> {
        let command = config
            .command
            .as_deref()
            .ok_or_else(|| PipelineError::Config("generation.command is not set".into()))?;
        Self::new(command, config.timeout()).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Program name
    #[inline]
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Program arguments
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    async fn invoke(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::Command(format!("spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // a command may exit without reading its input
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(GenerationError::Command(format!("write prompt to stdin: {e}")));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::Command(format!("wait for {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::Backend(format!(
                "command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| GenerationError::Backend(format!("decode stdout as UTF-8: {e}")))?;
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.invoke(prompt))
            .await
            .map_err(|_| GenerationError::Timeout {
                secs: self.timeout.as_secs(),
            })?;

        tracing::info!(
            program = %self.program,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            prompt_bytes = prompt.len(),
            ok = result.is_ok(),
            "generation command finished"
        );
        result
    }
}

/// Retries retryable failures of an inner generator
///
/// The delay before retry `n` (1-based) is `base * 2^(n-1)`, capped at
/// `max_delay`.
#[derive(Clone)]
pub struct RetryingGenerator {
    inner: Arc<dyn Generator>,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl std::fmt::Debug for RetryingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingGenerator")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl RetryingGenerator {
    /// Wrap `inner` with explicit retry settings
    #[must_use]
    pub fn new(
        inner: Arc<dyn Generator>,
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Wrap `inner` with the `[generation]` retry settings
    #[must_use]
    pub fn from_config(inner: Arc<dyn Generator>, config: &GenerationConfig) -> Self {
        Self::new(
            inner,
            config.max_retries,
            config.retry_delay(),
            config.max_retry_delay(),
        )
    }

    /// Delay before retry `attempt` (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

#[async_trait]
impl Generator for RetryingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
