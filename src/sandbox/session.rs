use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::{CommandResult, SandboxBackend, SandboxError, SandboxInstance};

/// Settled boot state: either a usable instance or a human-readable error.
type BootOutcome = Result<Arc<dyn SandboxInstance>, String>;

/// Owns exactly one sandbox instance for one workspace.
///
/// The boot sequence runs at most once per session object, no matter how
/// many times `boot()` is called or from how many tasks. Every other
/// operation fails fast with [`SandboxError::NotInitialized`] until boot
/// has succeeded; calls are never queued.
///
/// The instance handle is immutable after boot, so operations share it
/// without locking.
pub struct SandboxSession {
    backend: Arc<dyn SandboxBackend>,
    state: OnceCell<BootOutcome>,
}

impl SandboxSession {
    pub fn new(backend: Arc<dyn SandboxBackend>) -> Self {
        Self {
            backend,
            state: OnceCell::new(),
        }
    }

    /// Boots the sandbox if no attempt has been made yet.
    ///
    /// Concurrent callers wait on the same attempt. Once settled, further
    /// calls return immediately.
    pub async fn boot(&self) {
        self.state.get_or_init(|| self.attempt_boot()).await;
    }

    async fn attempt_boot(&self) -> BootOutcome {
        info!("Booting sandbox...");

        let result = match self.backend.check_host() {
            Ok(()) => self.backend.boot().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(instance) => {
                info!("✓ Sandbox ready");
                Ok(instance)
            }
            Err(e) => {
                error!("Failed to boot sandbox: {e}");
                Err(format!("{e}\n\nNote: {}", self.backend.remediation()))
            }
        }
    }

    /// True from construction until the boot attempt settles.
    pub fn is_booting(&self) -> bool {
        !self.state.initialized()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state.get(), Some(Ok(_)))
    }

    /// The boot failure message, including remediation guidance.
    pub fn error(&self) -> Option<&str> {
        match self.state.get() {
            Some(Err(message)) => Some(message.as_str()),
            _ => None,
        }
    }

    fn instance(&self) -> Result<&Arc<dyn SandboxInstance>, SandboxError> {
        match self.state.get() {
            Some(Ok(instance)) => Ok(instance),
            _ => Err(SandboxError::NotInitialized),
        }
    }

    /// Runs a command line inside the sandbox.
    ///
    /// Never fails: spawn errors and stream errors come back as
    /// `{ output: "", error }`, and a non-zero exit comes back as the
    /// collected output plus an exit-code error.
    pub async fn run(&self, command: &str) -> CommandResult {
        let instance = match self.instance() {
            Ok(instance) => instance,
            Err(e) => return CommandResult::failed("", e.to_string()),
        };

        match Self::execute(instance.as_ref(), command).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Command '{command}' failed: {e}");
                CommandResult::failed("", e.to_string())
            }
        }
    }

    async fn execute(
        instance: &dyn SandboxInstance,
        command: &str,
    ) -> Result<CommandResult, SandboxError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(SandboxError::EmptyCommand)?;
        let args: Vec<String> = parts.map(String::from).collect();

        debug!("Spawning {program} {args:?}");
        let mut process = instance.spawn(program, &args).await?;

        let mut output = String::new();
        while let Some(chunk) = process.output.recv().await {
            output.push_str(&chunk);
        }

        let code = process.exit.await?;
        info!("{program} exited with code {code}");

        if code != 0 {
            return Ok(CommandResult::failed(
                output,
                format!("Command exited with code {code}"),
            ));
        }
        Ok(CommandResult::ok(output))
    }

    pub async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        self.instance()?.read_file(path).await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        self.instance()?.write_file(path, content).await
    }

    /// Creates `path` and any missing ancestors. Succeeds if it already exists.
    pub async fn create_directory(&self, path: &str) -> Result<(), SandboxError> {
        self.instance()?.mkdir(path, true).await
    }
}
