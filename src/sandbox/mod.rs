//! Sandboxed execution environment.
//!
//! The session layer ([`SandboxSession`]) never executes anything itself.
//! It boots one instance through a [`SandboxBackend`] and forwards
//! command and filesystem calls to the resulting [`SandboxInstance`].
//!
//! Backends:
//!
//! 1. [`ProcessBackend`]: local processes rooted in a per-playground directory
//! 2. Test doubles: hand-written mocks in the session tests

pub mod process;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

pub use process::ProcessBackend;
pub use session::SandboxSession;

/// Errors surfaced by the sandbox layer.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The hosting environment lacks a primitive the backend needs.
    #[error("{0}")]
    HostUnsupported(String),
    /// An operation was issued before boot succeeded (or after it failed).
    #[error("Sandbox not initialized")]
    NotInitialized,
    #[error("Failed to boot sandbox: {0}")]
    BootFailed(String),
    #[error("No command given")]
    EmptyCommand,
    #[error("Path escapes the sandbox: {0}")]
    PathOutsideSandbox(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of one `run` call.
///
/// A non-zero exit is reported through `error`, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub output: String,
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: Some(error.into()),
        }
    }
}

/// A process spawned inside a sandbox instance.
///
/// `output` yields chunks of the merged output stream and closes when the
/// process stops writing. `exit` resolves to the exit code.
pub struct SpawnedProcess {
    pub output: mpsc::Receiver<String>,
    pub exit: BoxFuture<'static, Result<i32, SandboxError>>,
}

/// Factory for sandbox instances.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Verifies the hosting environment before any boot attempt.
    /// A failure here is final; `boot()` is never called afterwards.
    fn check_host(&self) -> Result<(), SandboxError> {
        Ok(())
    }

    /// Remediation text appended to boot failures.
    fn remediation(&self) -> &str {
        "The sandbox could not be started. Reload the workspace to try again."
    }

    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>, SandboxError>;
}

/// A booted sandbox: process spawning plus a virtual filesystem.
#[async_trait]
pub trait SandboxInstance: Send + Sync {
    async fn spawn(&self, program: &str, args: &[String]) -> Result<SpawnedProcess, SandboxError>;

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError>;

    async fn read_file(&self, path: &str) -> Result<String, SandboxError>;

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError>;
}
