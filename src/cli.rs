use anyhow::{anyhow, bail, Result};

use crate::dashboard::Template;

pub const DEFAULT_CONFIG_PATH: &str = "config/devforge.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    List,
    Templates,
    Create {
        template: Template,
        title: String,
        description: String,
    },
    Edit {
        id: String,
        title: String,
        description: String,
    },
    Delete { id: String },
    Duplicate { id: String },
    Star { id: String },
    Url { id: String },
    Open { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config_path: String,
    pub command: Command,
}

pub fn print_help() {
    println!(
        "\
devforge v{}

Manage playground projects and open them in a sandboxed workspace.

USAGE:
    devforge [OPTIONS] [COMMAND]

COMMANDS:
    list                                   List your playgrounds (default)
    templates                              List available templates
    create <TEMPLATE> <TITLE> [DESC]       Create a playground
    edit <ID> <TITLE> [DESC]               Change title and description
    delete <ID>                            Delete a playground
    duplicate <ID>                         Copy a playground
    star <ID>                              Star or unstar a playground
    url <ID>                               Print the share URL
    open <ID>                              Open the workspace terminal

OPTIONS:
    -c, --config <PATH>  Configuration file [default: {DEFAULT_CONFIG_PATH}]
    -h, --help           Print this help message and exit
    -V, --version        Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG              Log level filter for tracing
                          (e.g. debug, devforge=debug,warn)

EXAMPLES:
    devforge create react \"Todo app\"
    devforge -c /etc/devforge.toml list
    RUST_LOG=debug devforge open 5f0c…",
        env!("CARGO_PKG_VERSION"),
    );
}

fn required(args: &mut impl Iterator<Item = String>, what: &str) -> Result<String> {
    args.next().ok_or_else(|| anyhow!("Missing argument: <{what}>"))
}

impl Cli {
    /// Parses arguments (without the program name).
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut config_path = DEFAULT_CONFIG_PATH.to_string();
        let mut positional = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--version" | "-V" => {
                    return Ok(Self {
                        config_path,
                        command: Command::Version,
                    })
                }
                "--help" | "-h" => {
                    return Ok(Self {
                        config_path,
                        command: Command::Help,
                    })
                }
                "--config" | "-c" => config_path = required(&mut args, "PATH")?,
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    bail!("Unknown option: {flag}")
                }
                _ => positional.push(arg),
            }
        }

        let mut rest = positional.into_iter();
        let command = match rest.next().as_deref() {
            None | Some("list") => Command::List,
            Some("templates") => Command::Templates,
            Some("create") => Command::Create {
                template: required(&mut rest, "TEMPLATE")?.parse()?,
                title: required(&mut rest, "TITLE")?,
                description: rest.next().unwrap_or_default(),
            },
            Some("edit") => Command::Edit {
                id: required(&mut rest, "ID")?,
                title: required(&mut rest, "TITLE")?,
                description: rest.next().unwrap_or_default(),
            },
            Some("delete") => Command::Delete {
                id: required(&mut rest, "ID")?,
            },
            Some("duplicate") => Command::Duplicate {
                id: required(&mut rest, "ID")?,
            },
            Some("star") => Command::Star {
                id: required(&mut rest, "ID")?,
            },
            Some("url") => Command::Url {
                id: required(&mut rest, "ID")?,
            },
            Some("open") => Command::Open {
                id: required(&mut rest, "ID")?,
            },
            Some(other) => bail!("Unknown command: {other}\nRun 'devforge --help' for usage."),
        };

        if let Some(extra) = rest.next() {
            bail!("Unexpected argument: {extra}");
        }

        Ok(Self {
            config_path,
            command,
        })
    }
}
