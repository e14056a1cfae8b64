pub mod editor;
pub mod file_tree;
pub mod terminal;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::dashboard::Playground;
use crate::sandbox::{SandboxBackend, SandboxError, SandboxSession};
use editor::EditorBuffer;
use file_tree::{FileExplorer, NodeKind};
use terminal::{CommandRunner, Dispatch, Terminal};

/// Outcome of the workspace "run" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunNotice {
    /// Sandbox not booted; nothing was run.
    NotReady,
    /// Files synced and the start command handed to the terminal.
    Started(Dispatch),
}

impl RunNotice {
    pub fn message(&self) -> &'static str {
        match self {
            RunNotice::NotReady => "Sandbox is not ready yet",
            RunNotice::Started(_) => "Running code...",
        }
    }
}

/// Full-screen error shown instead of the workspace when boot failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootFailurePanel {
    pub title: &'static str,
    pub message: String,
    pub steps: [&'static str; 3],
    pub action: &'static str,
}

/// One open playground: explorer, editor and terminal around a single
/// sandbox session.
///
/// File selection and editing are local state only. The sandbox is
/// touched by the terminal and by [`WorkspaceView::run`].
pub struct WorkspaceView {
    playground: Playground,
    session: Arc<SandboxSession>,
    terminal: Arc<Terminal>,
    explorer: FileExplorer,
    editor: EditorBuffer,
}

impl WorkspaceView {
    /// Creates the workspace and starts booting its sandbox in the
    /// background. Must be called from within a Tokio runtime.
    pub fn mount(
        playground: Playground,
        backend: Arc<dyn SandboxBackend>,
        forward_programs: Vec<String>,
    ) -> Self {
        let session = Arc::new(SandboxSession::new(backend));
        let runner: Arc<dyn CommandRunner> = session.clone();
        let terminal = Arc::new(Terminal::new(forward_programs, Some(runner)));

        info!("Mounting workspace for {} ({})", playground.title, playground.id);
        tokio::spawn({
            let session = session.clone();
            async move { session.boot().await }
        });

        Self {
            playground,
            session,
            terminal,
            explorer: FileExplorer::with_sample_project(),
            editor: EditorBuffer::default(),
        }
    }

    /// Waits for the background boot to settle.
    pub async fn ready(&self) {
        self.session.boot().await;
    }

    pub fn playground(&self) -> &Playground {
        &self.playground
    }

    pub fn session(&self) -> &Arc<SandboxSession> {
        &self.session
    }

    pub fn terminal(&self) -> &Arc<Terminal> {
        &self.terminal
    }

    pub fn explorer(&self) -> &FileExplorer {
        &self.explorer
    }

    pub fn explorer_mut(&mut self) -> &mut FileExplorer {
        &mut self.explorer
    }

    pub fn editor(&self) -> &EditorBuffer {
        &self.editor
    }

    pub fn boot_failure(&self) -> Option<BootFailurePanel> {
        self.session.error().map(|message| BootFailurePanel {
            title: "Failed to Initialize Sandbox",
            message: message.to_string(),
            steps: [
                "Stop the workspace (Ctrl+C)",
                "Check the [sandbox] section of your configuration",
                "Open the playground again",
            ],
            action: "Reload",
        })
    }

    /// Opens a file from the explorer in the editor.
    pub fn select_file(&mut self, path: &str) -> Result<()> {
        let (path, content) = self.explorer.select(path)?;
        self.editor.open(path, content);
        Ok(())
    }

    /// Replaces the open file's text, in the editor and the explorer.
    pub fn edit(&mut self, content: &str) -> Result<()> {
        let Some(path) = self.editor.selected_file().map(str::to_string) else {
            anyhow::bail!("No file is open");
        };
        self.explorer.set_content(&path, content)?;
        self.editor.edit(content);
        Ok(())
    }

    /// Deletes a node; closes the editor if it held that file or a child.
    pub fn delete(&mut self, path: &str) -> Result<()> {
        self.explorer.delete(path)?;
        let closed = self
            .editor
            .selected_file()
            .is_some_and(|open| self.explorer.find(open).is_none());
        if closed {
            self.editor.close();
        }
        Ok(())
    }

    /// Copies the explorer tree into the sandbox, parents first.
    pub async fn sync_files(&self) -> Result<usize, SandboxError> {
        let entries: Vec<(String, Option<String>)> = self
            .explorer
            .walk()
            .into_iter()
            .map(|(path, node)| match node.kind {
                NodeKind::File { ref content } => (path, Some(content.clone())),
                NodeKind::Folder { .. } => (path, None),
            })
            .collect();

        for (path, content) in &entries {
            let virtual_path = format!("/{path}");
            match content {
                Some(content) => self.session.write_file(&virtual_path, content).await?,
                None => self.session.create_directory(&virtual_path).await?,
            }
        }
        Ok(entries.len())
    }

    /// Syncs the project into the sandbox and starts it through the
    /// terminal, so the run obeys the terminal's single-flight lock.
    pub async fn run(&self) -> Result<RunNotice, SandboxError> {
        if !self.session.is_ready() {
            warn!("Run requested before the sandbox was ready");
            return Ok(RunNotice::NotReady);
        }

        let synced = self.sync_files().await?;
        info!("Synced {synced} entries into the sandbox");

        let dispatch = self
            .terminal
            .submit(self.playground.template.start_command())
            .await;
        Ok(RunNotice::Started(dispatch))
    }
}
