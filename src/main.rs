mod cli;
mod config;
mod dashboard;
mod repl;
mod sandbox;
mod workspace;

use std::sync::Arc;

use anyhow::Result;
use console::style;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{print_help, Cli, Command};
use crate::config::Config;
use crate::dashboard::{share_url, Playground, PlaygroundStore, Template};
use crate::sandbox::ProcessBackend;
use crate::workspace::WorkspaceView;

fn print_playground(playground: &Playground) {
    let star = if playground.starred { "★" } else { " " };
    println!(
        "{star} {}  {:<8} {:<24} {}",
        style(playground.id).dim(),
        playground.template.id(),
        playground.title,
        playground.updated_at.format("%Y-%m-%d %H:%M"),
    );
    if !playground.description.is_empty() {
        println!("    {}", style(&playground.description).dim());
    }
}

fn print_templates() {
    for template in Template::ALL {
        println!(
            "{:<8} {:<8} {:<10} {}",
            template.id(),
            template.display_name(),
            template.icon().name(),
            template.description()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse(std::env::args().skip(1))?;

    // Handle --help / --version before anything else
    match cli.command {
        Command::Version => {
            println!("devforge v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Help => {
            print_help();
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging (RUST_LOG=debug for debug mode). stdout belongs
    // to the workspace terminal, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("devforge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Loading configuration from {}", cli.config_path);
    let config = Config::load(&cli.config_path)?;
    info!("User: {}", config.user_label());

    let mut store = PlaygroundStore::open(&config.store.path)?;
    let user = config.user.id.as_str();

    match cli.command {
        Command::Help | Command::Version => {}
        Command::List => {
            let playgrounds = store.list(user);
            if playgrounds.is_empty() {
                println!("No projects yet. Create your first playground!");
            }
            for playground in playgrounds {
                print_playground(playground);
            }

            let sidebar = store.sidebar(user);
            if !sidebar.starred.is_empty() {
                let names: Vec<&str> = sidebar.starred.iter().map(|e| e.name.as_str()).collect();
                println!();
                println!("Starred: {}", names.join(", "));
            }
        }
        Command::Templates => print_templates(),
        Command::Create {
            template,
            title,
            description,
        } => {
            let created = store.create(user, &title, &description, template)?;
            println!("Playground created successfully!");
            print_playground(&created);
        }
        Command::Edit {
            id,
            title,
            description,
        } => {
            let updated = store.update(user, &id, &title, &description)?;
            println!("Project updated successfully");
            print_playground(&updated);
        }
        Command::Delete { id } => {
            store.delete(user, &id)?;
            println!("Project deleted successfully");
        }
        Command::Duplicate { id } => {
            let copy = store.duplicate(user, &id)?;
            println!("Project duplicated successfully");
            print_playground(&copy);
        }
        Command::Star { id } => {
            let starred = store.toggle_star(user, &id)?;
            println!("{}", if starred { "Added to starred" } else { "Removed from starred" });
        }
        Command::Url { id } => {
            let playground = store.get(user, &id)?;
            println!("{}", share_url(&config.dashboard.base_url, &playground.id));
        }
        Command::Open { id } => {
            let playground = store.get(user, &id)?.clone();
            let backend = Arc::new(ProcessBackend::new(config.sandbox_dir(&playground.id)));
            let mut workspace = WorkspaceView::mount(
                playground,
                backend,
                config.sandbox.forward_programs.clone(),
            );

            tokio::select! {
                result = repl::run(&mut workspace) => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, exiting");
                }
            }
        }
    }

    Ok(())
}
