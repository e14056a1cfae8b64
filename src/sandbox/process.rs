/// Local process sandbox.
///
/// Each playground gets its own directory under the configured sandbox
/// root. Virtual paths are resolved beneath that directory and commands
/// run with it as working directory and `HOME`, with a scrubbed
/// environment. stdout and stderr are merged line by line into a single
/// output stream.
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{SandboxBackend, SandboxError, SandboxInstance, SpawnedProcess};

/// Buffered output chunks per process before the reader tasks wait.
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

pub struct ProcessBackend {
    root: PathBuf,
}

impl ProcessBackend {
    /// `root` is the playground's own directory, created on boot.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SandboxBackend for ProcessBackend {
    fn check_host(&self) -> Result<(), SandboxError> {
        // Child process I/O is driven by the Tokio reactor.
        tokio::runtime::Handle::try_current()
            .map(|_| ())
            .map_err(|_| {
                SandboxError::HostUnsupported(
                    "No async runtime is available to drive sandbox processes".to_string(),
                )
            })
    }

    fn remediation(&self) -> &str {
        "The sandbox must be started from within a Tokio runtime with I/O and \
         process support enabled. Restart the workspace and try again."
    }

    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>, SandboxError> {
        let prepare = async {
            tokio::fs::create_dir_all(&self.root).await?;
            tokio::fs::canonicalize(&self.root).await
        };
        let root = prepare
            .await
            .map_err(|e| SandboxError::BootFailed(format!("{}: {e}", self.root.display())))?;
        info!("Sandbox directory: {}", root.display());
        Ok(Arc::new(ProcessInstance { root }))
    }
}

pub struct ProcessInstance {
    root: PathBuf,
}

impl ProcessInstance {
    /// Maps a virtual path (`/src/a.js` or `src/a.js`) onto the host.
    fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(SandboxError::PathOutsideSandbox(path.to_string()));
                }
            }
        }
        Ok(resolved)
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.root)
            .env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("HOME", &self.root)
            .env("TERM", "dumb")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl SandboxInstance for ProcessInstance {
    async fn spawn(&self, program: &str, args: &[String]) -> Result<SpawnedProcess, SandboxError> {
        let mut child = self.command(program, args).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SandboxError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{program}: command not found"),
                ))
            } else {
                SandboxError::Io(e)
            }
        })?;

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let exit = async move {
            let status = child.wait().await?;
            // Killed by a signal: no exit code.
            Ok::<_, SandboxError>(status.code().unwrap_or(-1))
        }
        .boxed();

        Ok(SpawnedProcess { output: rx, exit })
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        let target = self.resolve(path)?;
        tokio::fs::write(&target, content).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(&target).await?)
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError> {
        let target = self.resolve(path)?;
        if recursive {
            tokio::fs::create_dir_all(&target).await?;
        } else {
            tokio::fs::create_dir(&target).await?;
        }
        Ok(())
    }
}

/// Pumps one output pipe into the shared channel until EOF.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("Output stream closed: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::SandboxSession;

    async fn booted_instance(dir: &Path) -> Arc<dyn SandboxInstance> {
        ProcessBackend::new(dir.join("sandbox")).boot().await.unwrap()
    }

    fn instance_at(root: &str) -> ProcessInstance {
        ProcessInstance {
            root: PathBuf::from(root),
        }
    }

    #[test]
    fn test_resolve_absolute_and_relative() {
        let instance = instance_at("/srv/sandbox");
        assert_eq!(
            instance.resolve("/src/index.js").unwrap(),
            PathBuf::from("/srv/sandbox/src/index.js")
        );
        assert_eq!(
            instance.resolve("src/index.js").unwrap(),
            PathBuf::from("/srv/sandbox/src/index.js")
        );
        assert_eq!(
            instance.resolve("./a/./b").unwrap(),
            PathBuf::from("/srv/sandbox/a/b")
        );
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let instance = instance_at("/srv/sandbox");
        assert!(matches!(
            instance.resolve("../etc/passwd"),
            Err(SandboxError::PathOutsideSandbox(_))
        ));
        assert!(matches!(
            instance.resolve("/src/../../x"),
            Err(SandboxError::PathOutsideSandbox(_))
        ));
    }

    #[test]
    fn test_check_host_requires_runtime() {
        let backend = ProcessBackend::new("/tmp/unused");
        assert!(matches!(
            backend.check_host(),
            Err(SandboxError::HostUnsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_check_host_inside_runtime() {
        let backend = ProcessBackend::new("/tmp/unused");
        assert!(backend.check_host().is_ok());
    }

    #[tokio::test]
    async fn test_boot_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        booted_instance(dir.path()).await;
        assert!(dir.path().join("sandbox").is_dir());
    }

    #[tokio::test]
    async fn test_filesystem_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let instance = booted_instance(dir.path()).await;

        instance.mkdir("/src/lib", true).await.unwrap();
        instance.mkdir("/src/lib", true).await.unwrap();
        instance
            .write_file("/src/lib/a.js", "module.exports = 1;")
            .await
            .unwrap();

        assert_eq!(
            instance.read_file("src/lib/a.js").await.unwrap(),
            "module.exports = 1;"
        );
        assert!(dir.path().join("sandbox/src/lib/a.js").is_file());
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let instance = booted_instance(dir.path()).await;
        assert!(instance.read_file("/nope.txt").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_merges_output_and_reports_exit() {
        let dir = tempfile::tempdir().unwrap();
        let instance = booted_instance(dir.path()).await;

        let args = vec!["-c".to_string(), "echo out; echo err 1>&2; exit 3".to_string()];
        let mut process = instance.spawn("sh", &args).await.unwrap();

        let mut output = String::new();
        while let Some(chunk) = process.output.recv().await {
            output.push_str(&chunk);
        }
        assert!(output.contains("out\n"));
        assert!(output.contains("err\n"));
        assert_eq!(process.exit.await.unwrap(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_runs_in_sandbox_directory() {
        let dir = tempfile::tempdir().unwrap();
        let session = SandboxSession::new(Arc::new(ProcessBackend::new(dir.path().join("sb"))));
        session.boot().await;
        assert!(session.is_ready());

        session.write_file("/hello.txt", "hello\n").await.unwrap();
        let result = session.run("cat hello.txt").await;
        assert_eq!(result.output, "hello\n");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_spawn_unknown_program() {
        let dir = tempfile::tempdir().unwrap();
        let instance = booted_instance(dir.path()).await;
        let result = instance.spawn("definitely-not-a-real-program-xyz", &[]).await;
        match result {
            Err(e) => assert!(e.to_string().contains("command not found")),
            Ok(_) => panic!("spawn of a missing program should fail"),
        }
    }
}
