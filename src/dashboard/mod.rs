//! Playground records and their dashboard projections.

pub mod store;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use store::PlaygroundStore;

/// Starter template a playground is created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Template {
    React,
    NextJs,
    Express,
    Vue,
    Hono,
    Angular,
}

impl Template {
    pub const ALL: [Template; 6] = [
        Template::React,
        Template::NextJs,
        Template::Express,
        Template::Vue,
        Template::Hono,
        Template::Angular,
    ];

    /// Stored identifier, e.g. `NEXTJS`.
    pub fn id(&self) -> &'static str {
        match self {
            Template::React => "REACT",
            Template::NextJs => "NEXTJS",
            Template::Express => "EXPRESS",
            Template::Vue => "VUE",
            Template::Hono => "HONO",
            Template::Angular => "ANGULAR",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Template::React => "React",
            Template::NextJs => "Next.js",
            Template::Express => "Express",
            Template::Vue => "Vue",
            Template::Hono => "Hono",
            Template::Angular => "Angular",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Template::React => "Build interactive UIs with React",
            Template::NextJs => "Full-stack React framework",
            Template::Express => "Fast Node.js web framework",
            Template::Vue => "Progressive JavaScript framework",
            Template::Hono => "Ultrafast web framework",
            Template::Angular => "Platform for building web apps",
        }
    }

    pub fn icon(&self) -> IconKind {
        match self {
            Template::React => IconKind::Zap,
            Template::NextJs => IconKind::Lightbulb,
            Template::Express => IconKind::Database,
            Template::Vue => IconKind::Compass,
            Template::Hono => IconKind::Flame,
            Template::Angular => IconKind::Terminal,
        }
    }

    /// Command the workspace "run" action sends to the terminal.
    pub fn start_command(&self) -> &'static str {
        match self {
            Template::Express | Template::Angular => "npm start",
            _ => "npm run dev",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Template {
    type Err = anyhow::Error;

    /// Accepts the stored id or the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Template::ALL
            .into_iter()
            .find(|t| t.id().to_lowercase() == wanted || t.display_name().to_lowercase() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown template '{s}' (expected one of: {})",
                    Template::ALL.map(|t| t.id()).join(", ")
                )
            })
    }
}

/// Icons the dashboard knows how to draw. `Code2` is the generic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconKind {
    Zap,
    Lightbulb,
    Database,
    Compass,
    Flame,
    Terminal,
    Code2,
}

impl IconKind {
    /// Name ↔ icon table. Every variant appears exactly once.
    const TABLE: [(&'static str, IconKind); 7] = [
        ("Zap", IconKind::Zap),
        ("Lightbulb", IconKind::Lightbulb),
        ("Database", IconKind::Database),
        ("Compass", IconKind::Compass),
        ("FlameIcon", IconKind::Flame),
        ("Terminal", IconKind::Terminal),
        ("Code2", IconKind::Code2),
    ];

    pub fn name(&self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, icon)| icon == self)
            .map(|(name, _)| *name)
            .unwrap_or("Code2")
    }
}

impl FromStr for IconKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, icon)| *icon)
            .ok_or_else(|| anyhow::anyhow!("Unknown icon '{s}'"))
    }
}

/// A user-owned playground project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playground {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub template: Template,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub starred: bool,
}

/// One playground as listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub id: Uuid,
    pub name: String,
    pub icon: IconKind,
    pub starred: bool,
}

impl From<&Playground> for SidebarEntry {
    fn from(playground: &Playground) -> Self {
        Self {
            id: playground.id,
            name: playground.title.clone(),
            icon: playground.template.icon(),
            starred: playground.starred,
        }
    }
}

/// Sidebar sections: starred projects and all recent projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidebar {
    pub starred: Vec<SidebarEntry>,
    pub recent: Vec<SidebarEntry>,
}

impl Sidebar {
    /// Builds both sections, preserving the order of `playgrounds`.
    pub fn build<'a>(playgrounds: impl IntoIterator<Item = &'a Playground>) -> Self {
        let recent: Vec<SidebarEntry> = playgrounds.into_iter().map(SidebarEntry::from).collect();
        let starred = recent.iter().filter(|e| e.starred).cloned().collect();
        Self { starred, recent }
    }
}

/// Link that opens a playground workspace.
pub fn share_url(base_url: &str, id: &Uuid) -> String {
    format!("{}/playground/{id}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playground(title: &str, template: Template, starred: bool) -> Playground {
        let now = Utc::now();
        Playground {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            template,
            created_at: now,
            updated_at: now,
            user_id: "user-1".to_string(),
            starred,
        }
    }

    #[test]
    fn test_template_parse() {
        assert_eq!("REACT".parse::<Template>().unwrap(), Template::React);
        assert_eq!("nextjs".parse::<Template>().unwrap(), Template::NextJs);
        assert_eq!("Next.js".parse::<Template>().unwrap(), Template::NextJs);
        let err = "svelte".parse::<Template>().unwrap_err().to_string();
        assert!(err.contains("Unknown template 'svelte'"));
        assert!(err.contains("ANGULAR"));
    }

    #[test]
    fn test_template_serde_uses_ids() {
        for template in Template::ALL {
            let json = serde_json::to_string(&template).unwrap();
            assert_eq!(json, format!("\"{}\"", template.id()));
            assert_eq!(serde_json::from_str::<Template>(&json).unwrap(), template);
        }
    }

    #[test]
    fn test_template_icons() {
        assert_eq!(Template::React.icon(), IconKind::Zap);
        assert_eq!(Template::NextJs.icon(), IconKind::Lightbulb);
        assert_eq!(Template::Express.icon(), IconKind::Database);
        assert_eq!(Template::Vue.icon(), IconKind::Compass);
        assert_eq!(Template::Hono.icon(), IconKind::Flame);
        assert_eq!(Template::Angular.icon(), IconKind::Terminal);
    }

    #[test]
    fn test_icon_names_are_validated() {
        assert_eq!("FlameIcon".parse::<IconKind>().unwrap(), IconKind::Flame);
        assert_eq!(IconKind::Flame.name(), "FlameIcon");
        assert_eq!(IconKind::Code2.name(), "Code2");
        assert!("Rocket".parse::<IconKind>().is_err());
        assert!("zap".parse::<IconKind>().is_err());
    }

    #[test]
    fn test_sidebar_sections() {
        let items = vec![
            playground("One", Template::Vue, true),
            playground("Two", Template::Hono, false),
            playground("Three", Template::React, true),
        ];
        let sidebar = Sidebar::build(&items);
        assert_eq!(sidebar.recent.len(), 3);
        let starred: Vec<&str> = sidebar.starred.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(starred, vec!["One", "Three"]);
        assert_eq!(sidebar.recent[1].icon, IconKind::Flame);
    }

    #[test]
    fn test_share_url() {
        let id = Uuid::nil();
        assert_eq!(
            share_url("http://localhost:3000/", &id),
            "http://localhost:3000/playground/00000000-0000-0000-0000-000000000000"
        );
    }
}
