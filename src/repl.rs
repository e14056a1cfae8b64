/// Line-oriented front end for a workspace.
///
/// Lines starting with `:` drive the explorer and editor; everything
/// else is typed into the workspace terminal. The transcript is printed
/// incrementally after every command.
use std::io::Write;

use anyhow::Result;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use crate::workspace::terminal::{LineKind, TerminalLine};
use crate::workspace::{BootFailurePanel, WorkspaceView};

const WORKSPACE_HELP: &str = "\
Workspace commands:
  :tree                      Show the file tree
  :open <path>               Open a file in the editor
  :edit                      Replace the open file (end with a lone '.')
  :new-file [folder] <name>  Create a file
  :new-folder [folder] <name> Create a folder
  :rm <path>                 Delete a file or folder
  :toggle <path>             Expand or collapse a folder
  :run                       Sync files and start the project
  :quit                      Leave the workspace
Anything else is sent to the terminal (try 'help').";

/// Tracks how much of the transcript has been printed.
struct Transcript {
    shown: usize,
}

impl Transcript {
    fn flush(&mut self, workspace: &WorkspaceView) {
        let terminal = workspace.terminal();
        let total = terminal.len();
        if total < self.shown {
            // `clear` reset the buffer.
            self.shown = 0;
        }
        for line in terminal.viewport(total - self.shown) {
            print_line(&line);
        }
        self.shown = total;
    }
}

fn print_line(line: &TerminalLine) {
    let text = line.text.trim_end_matches('\n');
    match line.kind {
        // The tty already echoed what was typed.
        LineKind::Input => {}
        LineKind::Output => println!("{text}"),
        LineKind::Error => println!("{}", style(text).red()),
    }
}

fn print_boot_failure(panel: &BootFailurePanel) {
    println!("{}", style(panel.title).red().bold());
    println!("{}", panel.message);
    println!();
    println!("To fix this issue:");
    for (i, step) in panel.steps.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    println!();
    println!("[{}] Run 'devforge open' again.", panel.action);
}

fn prompt(workspace: &WorkspaceView) {
    let file = workspace.editor().selected_file().unwrap_or("-");
    print!("{} {} ", style(file).dim(), style("$").green());
    let _ = std::io::stdout().flush();
}

/// Splits `[folder] <name>` arguments.
fn parent_and_name(args: &str) -> Option<(Option<&str>, &str)> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        [name] => Some((None, *name)),
        [parent, name] => Some((Some(*parent), *name)),
        _ => None,
    }
}

async fn read_block(lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    let mut block = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line == "." {
            break;
        }
        block.push(line);
    }
    Ok(block.join("\n"))
}

/// Handles one `:` command. Returns false when the user wants to leave.
async fn workspace_command(
    workspace: &mut WorkspaceView,
    input: &str,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<bool> {
    let (command, args) = input.split_once(' ').unwrap_or((input, ""));
    let args = args.trim();

    match command {
        ":quit" | ":q" => return Ok(false),
        ":help" => println!("{WORKSPACE_HELP}"),
        ":tree" => {
            for line in workspace.explorer().render() {
                println!("{line}");
            }
        }
        ":open" => {
            workspace.select_file(args)?;
            let editor = workspace.editor();
            println!(
                "{}",
                style(format!(
                    "── {} ({})",
                    editor.selected_file().unwrap_or_default(),
                    editor.language()
                ))
                .dim()
            );
            println!("{}", editor.content());
        }
        ":edit" => {
            if workspace.editor().selected_file().is_none() {
                anyhow::bail!("No file is open");
            }
            println!("{}", style("Enter new content, finish with a lone '.'").dim());
            let content = read_block(lines).await?;
            workspace.edit(&content)?;
        }
        ":new-file" | ":new-folder" => {
            let (parent, name) = parent_and_name(args)
                .ok_or_else(|| anyhow::anyhow!("Usage: {command} [folder] <name>"))?;
            let explorer = workspace.explorer_mut();
            let path = if command == ":new-file" {
                explorer.create_file(parent, name)?
            } else {
                explorer.create_folder(parent, name)?
            };
            println!("Created {path}");
        }
        ":rm" => {
            workspace.delete(args)?;
            println!("Deleted {args}");
        }
        ":toggle" => {
            let expanded = workspace.explorer_mut().toggle(args)?;
            println!("{args} {}", if expanded { "expanded" } else { "collapsed" });
        }
        ":run" => {
            let notice = workspace.run().await?;
            println!("{}", style(notice.message()).cyan());
        }
        other => anyhow::bail!("Unknown workspace command: {other} (try :help)"),
    }
    Ok(true)
}

/// Runs the interactive workspace until `:quit` or end of input.
pub async fn run(workspace: &mut WorkspaceView) -> Result<()> {
    let playground = workspace.playground();
    println!(
        "{} {} ({})",
        style("▶").green(),
        style(&playground.title).bold(),
        playground.template.display_name()
    );

    if workspace.session().is_booting() {
        println!("{}", style("Booting sandbox...").dim());
    }
    workspace.ready().await;

    if let Some(panel) = workspace.boot_failure() {
        print_boot_failure(&panel);
        return Ok(());
    }
    println!("{}", style("Type :help for workspace commands.").dim());

    let mut transcript = Transcript { shown: 0 };
    transcript.flush(workspace);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(workspace);
        let Some(input) = lines.next_line().await? else {
            break;
        };
        let input = input.trim();
        debug!("Input: {input}");

        if input.starts_with(':') {
            match workspace_command(workspace, input, &mut lines).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => println!("{}", style(e).red()),
            }
        } else {
            workspace.terminal().submit(input).await;
        }
        transcript.flush(workspace);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent_and_name("a.js"), Some((None, "a.js")));
        assert_eq!(parent_and_name("src  a.js"), Some((Some("src"), "a.js")));
        assert_eq!(parent_and_name(""), None);
        assert_eq!(parent_and_name("a b c"), None);
    }
}
