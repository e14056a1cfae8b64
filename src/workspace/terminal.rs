use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::sandbox::{CommandResult, SandboxSession};

/// Kind of a transcript line, which decides how it is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Input,
    Output,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLine {
    pub kind: LineKind,
    pub text: String,
}

impl TerminalLine {
    fn input(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Input,
            text: text.into(),
        }
    }

    fn output(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Output,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Error,
            text: text.into(),
        }
    }
}

/// Something that can run a command line and report `{output, error}`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandResult;
}

#[async_trait]
impl CommandRunner for SandboxSession {
    async fn run(&self, command: &str) -> CommandResult {
        SandboxSession::run(self, command).await
    }
}

/// How a submitted line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank input, nothing appended.
    Ignored,
    /// Another command is executing; input is disabled.
    Busy,
    /// Resolved locally (`help`, `clear`, `echo`).
    Builtin,
    /// Forwarded to the runner and settled.
    Forwarded,
    /// No runner attached yet; placeholder lines appended.
    Pending,
    NotFound,
}

const WELCOME: [&str; 2] = [
    "Welcome to DevForge Terminal",
    "Type 'help' for available commands",
];

/// Append-only transcript plus command dispatch.
///
/// At most one command executes at a time per terminal. While it does,
/// `input_enabled()` is false and further submissions return
/// [`Dispatch::Busy`]. Separate terminals do not share this lock.
pub struct Terminal {
    lines: Mutex<Vec<TerminalLine>>,
    executing: AtomicBool,
    forward_programs: Vec<String>,
    runner: Option<Arc<dyn CommandRunner>>,
}

/// Clears the executing flag when dropped, so a cancelled submission
/// does not leave the input disabled.
struct ExecutingGuard<'a>(&'a AtomicBool);

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Terminal {
    /// `forward_programs` are the program names sent to the runner
    /// (matched case-insensitively).
    pub fn new(forward_programs: Vec<String>, runner: Option<Arc<dyn CommandRunner>>) -> Self {
        Self {
            lines: Mutex::new(WELCOME.iter().map(|l| TerminalLine::output(*l)).collect()),
            executing: AtomicBool::new(false),
            forward_programs: forward_programs
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
            runner,
        }
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<TerminalLine>> {
        // A poisoned transcript is still a valid transcript.
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(&self, new_lines: impl IntoIterator<Item = TerminalLine>) {
        self.buffer().extend(new_lines);
    }

    /// Snapshot of the whole transcript.
    pub fn lines(&self) -> Vec<TerminalLine> {
        self.buffer().clone()
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    /// The newest `height` lines: the view always follows the tail.
    pub fn viewport(&self, height: usize) -> Vec<TerminalLine> {
        let lines = self.buffer();
        let start = lines.len().saturating_sub(height);
        lines[start..].to_vec()
    }

    pub fn input_enabled(&self) -> bool {
        !self.executing.load(Ordering::SeqCst)
    }

    pub fn help_lines(&self) -> Vec<String> {
        let mut help = vec![
            "Available commands:".to_string(),
            "  help - Show this help message".to_string(),
            "  clear - Clear the terminal".to_string(),
            "  echo - Echo text".to_string(),
        ];
        for program in &self.forward_programs {
            help.push(format!("  {program} - Run {program} commands (sandbox)"));
        }
        help
    }

    /// Dispatches one line of input. The first matching rule wins:
    /// blank, `help`, `clear`, `echo`, forwarded program, no runner,
    /// unknown command.
    pub async fn submit(&self, input: &str) -> Dispatch {
        if input.trim().is_empty() {
            return Dispatch::Ignored;
        }

        if self
            .executing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Terminal busy, ignoring input: {input}");
            return Dispatch::Busy;
        }
        let _guard = ExecutingGuard(&self.executing);

        self.append([TerminalLine::input(format!("$ {input}"))]);

        let mut tokens = input.split_whitespace();
        let command = tokens.next().unwrap_or_default().to_lowercase();

        match command.as_str() {
            "help" => {
                self.append(self.help_lines().into_iter().map(TerminalLine::output));
                Dispatch::Builtin
            }
            "clear" => {
                self.buffer().clear();
                Dispatch::Builtin
            }
            "echo" => {
                let text = tokens.collect::<Vec<_>>().join(" ");
                self.append([TerminalLine::output(text)]);
                Dispatch::Builtin
            }
            _ => match self.runner {
                Some(ref runner) if self.forward_programs.contains(&command) => {
                    info!("Forwarding to sandbox: {input}");
                    let result = runner.run(input).await;
                    let mut settled = Vec::new();
                    if !result.output.is_empty() {
                        settled.push(TerminalLine::output(result.output));
                    }
                    if let Some(error) = result.error {
                        settled.push(TerminalLine::error(error));
                    }
                    self.append(settled);
                    Dispatch::Forwarded
                }
                None => {
                    self.append([
                        TerminalLine::output(format!("Executing: {input}")),
                        TerminalLine::output("Sandbox is initializing..."),
                    ]);
                    Dispatch::Pending
                }
                Some(_) => {
                    self.append([
                        TerminalLine::error(format!("Command not found: {command}")),
                        TerminalLine::output(WELCOME[1]),
                    ]);
                    Dispatch::NotFound
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    struct FixedRunner {
        result: CommandResult,
        calls: AtomicUsize,
    }

    impl FixedRunner {
        fn new(result: CommandResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, _command: &str) -> CommandResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    /// Runner that blocks until the test releases it.
    struct GatedRunner {
        gate: tokio::sync::Mutex<Option<oneshot::Receiver<CommandResult>>>,
    }

    #[async_trait]
    impl CommandRunner for GatedRunner {
        async fn run(&self, _command: &str) -> CommandResult {
            let rx = self.gate.lock().await.take().unwrap();
            rx.await.unwrap()
        }
    }

    fn programs() -> Vec<String> {
        vec!["npm".to_string(), "node".to_string(), "npx".to_string()]
    }

    fn terminal_with(runner: Arc<dyn CommandRunner>) -> Terminal {
        Terminal::new(programs(), Some(runner))
    }

    fn texts(lines: &[TerminalLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_starts_with_welcome() {
        let terminal = Terminal::new(programs(), None);
        assert_eq!(texts(&terminal.lines()), WELCOME.to_vec());
        assert!(terminal.input_enabled());
    }

    #[tokio::test]
    async fn test_blank_input_is_noop() {
        let terminal = Terminal::new(programs(), None);
        let before = terminal.len();
        for input in ["", "   ", "\t \n"] {
            assert_eq!(terminal.submit(input).await, Dispatch::Ignored);
        }
        assert_eq!(terminal.len(), before);
    }

    #[tokio::test]
    async fn test_help_is_fixed_and_local() {
        let runner = FixedRunner::new(CommandResult::ok("x"));
        let terminal = terminal_with(runner.clone());

        terminal.submit("help").await;
        let first = terminal.lines();
        terminal.submit("HELP").await;
        let second = terminal.lines();

        let added_first = &first[WELCOME.len()..];
        let added_second = &second[first.len()..];
        assert_eq!(added_first[0], TerminalLine::input("$ help"));
        assert_eq!(&added_first[1..], &added_second[1..]);
        assert_eq!(added_first[1].text, "Available commands:");
        assert!(texts(added_first).contains(&"  npx - Run npx commands (sandbox)"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_transcript_without_runner() {
        let terminal = Terminal::new(programs(), None);
        terminal.submit("echo hi").await;
        assert_eq!(terminal.submit("clear").await, Dispatch::Builtin);
        assert!(terminal.lines().is_empty());
    }

    #[tokio::test]
    async fn test_echo_joins_arguments() {
        let terminal = Terminal::new(programs(), None);
        terminal.submit("echo a b c").await;
        let lines = terminal.lines();
        let added = &lines[WELCOME.len()..];
        assert_eq!(
            added,
            &[TerminalLine::input("$ echo a b c"), TerminalLine::output("a b c")]
        );
    }

    #[tokio::test]
    async fn test_forwarded_command_appends_output() {
        let runner = FixedRunner::new(CommandResult::ok("hello\n"));
        let terminal = terminal_with(runner.clone());

        assert_eq!(terminal.submit("node x.js").await, Dispatch::Forwarded);
        let lines = terminal.lines();
        assert_eq!(
            &lines[WELCOME.len()..],
            &[TerminalLine::input("$ node x.js"), TerminalLine::output("hello\n")]
        );
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forwarded_error_appends_error_line() {
        let runner = FixedRunner::new(CommandResult::failed(
            "",
            "Command exited with code 2",
        ));
        let terminal = terminal_with(runner);

        terminal.submit("npm test").await;
        let lines = terminal.lines();
        // Empty output is skipped, only the error line follows the echo.
        assert_eq!(
            &lines[WELCOME.len()..],
            &[
                TerminalLine::input("$ npm test"),
                TerminalLine::error("Command exited with code 2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_runner_appends_placeholder() {
        let terminal = Terminal::new(programs(), None);
        assert_eq!(terminal.submit("npm install").await, Dispatch::Pending);
        let lines = terminal.lines();
        assert_eq!(
            texts(&lines[WELCOME.len()..]),
            vec!["$ npm install", "Executing: npm install", "Sandbox is initializing..."]
        );
        assert!(terminal.input_enabled());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let runner = FixedRunner::new(CommandResult::ok(""));
        let terminal = terminal_with(runner.clone());

        assert_eq!(terminal.submit("ls -la").await, Dispatch::NotFound);
        let lines = terminal.lines();
        let added = &lines[WELCOME.len()..];
        assert_eq!(added[1], TerminalLine::error("Command not found: ls"));
        assert_eq!(added[2].text, "Type 'help' for available commands");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forward_list_is_configurable() {
        let runner = FixedRunner::new(CommandResult::ok("3.12\n"));
        let terminal = Terminal::new(vec!["Python".to_string()], Some(runner));
        assert_eq!(terminal.submit("python --version").await, Dispatch::Forwarded);
        assert_eq!(terminal.submit("node x.js").await, Dispatch::NotFound);
    }

    #[tokio::test]
    async fn test_single_flight_while_running() {
        let (tx, rx) = oneshot::channel();
        let runner = Arc::new(GatedRunner {
            gate: tokio::sync::Mutex::new(Some(rx)),
        });
        let terminal = Arc::new(terminal_with(runner));

        let pending = tokio::spawn({
            let terminal = terminal.clone();
            async move { terminal.submit("npm run build").await }
        });

        while terminal.input_enabled() {
            tokio::task::yield_now().await;
        }
        assert_eq!(terminal.submit("echo queued").await, Dispatch::Busy);

        tx.send(CommandResult::failed("", "Command exited with code 1"))
            .unwrap();
        assert_eq!(pending.await.unwrap(), Dispatch::Forwarded);
        assert!(terminal.input_enabled());
        assert!(!texts(&terminal.lines()).contains(&"$ echo queued"));
    }

    #[tokio::test]
    async fn test_viewport_follows_tail() {
        let terminal = Terminal::new(programs(), None);
        for i in 0..10 {
            terminal.submit(&format!("echo {i}")).await;
        }
        let view = terminal.viewport(2);
        assert_eq!(texts(&view), vec!["$ echo 9", "9"]);
        assert_eq!(terminal.viewport(1000).len(), terminal.len());
    }
}
