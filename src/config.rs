use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub user: UserConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// The signed-in user. Every store operation is scoped to `id`.
#[derive(Debug, Deserialize, Clone)]
pub struct UserConfig {
    /// Supports ${ENV_VAR} substitution
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// Each playground gets `{root}/{playground_id}`
    #[serde(default = "default_sandbox_root")]
    pub root: PathBuf,
    /// Programs the terminal forwards to the sandbox
    #[serde(default = "default_forward_programs")]
    pub forward_programs: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/playgrounds.json")
}

fn default_sandbox_root() -> PathBuf {
    PathBuf::from("./data/sandboxes")
}

fn default_forward_programs() -> Vec<String> {
    vec!["npm".to_string(), "node".to_string(), "npx".to_string()]
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: default_sandbox_root(),
            forward_programs: default_forward_programs(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {path}: {e}"))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        // Expand environment variables like ${DEVFORGE_USER_ID}
        let expanded = shellexpand::env(content)?;
        let config: Config = toml::from_str(&expanded)?;
        if config.user.id.trim().is_empty() {
            anyhow::bail!("user.id must not be empty");
        }
        Ok(config)
    }

    /// Host directory backing one playground's sandbox.
    pub fn sandbox_dir(&self, playground_id: &uuid::Uuid) -> PathBuf {
        self.sandbox.root.join(playground_id.to_string())
    }

    /// How the signed-in user is shown in status output.
    pub fn user_label(&self) -> String {
        match (&self.user.name, &self.user.email) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (Some(name), None) => name.clone(),
            (None, Some(email)) => email.clone(),
            (None, None) => self.user.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse("[user]\nid = \"u1\"\n").unwrap();
        assert_eq!(config.user.id, "u1");
        assert_eq!(config.store.path, PathBuf::from("./data/playgrounds.json"));
        assert_eq!(config.sandbox.root, PathBuf::from("./data/sandboxes"));
        assert_eq!(config.sandbox.forward_programs, vec!["npm", "node", "npx"]);
        assert_eq!(config.dashboard.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[user]
id = "u1"
name = "Ada"
email = "ada@example.com"

[store]
path = "/var/lib/devforge/playgrounds.json"

[sandbox]
root = "/var/lib/devforge/sandboxes"
forward_programs = ["npm", "node", "npx", "python"]

[dashboard]
base_url = "https://devforge.example.com"
"#,
        )
        .unwrap();
        assert_eq!(config.sandbox.forward_programs.len(), 4);
        assert_eq!(config.user_label(), "Ada <ada@example.com>");
        assert_eq!(config.dashboard.base_url, "https://devforge.example.com");
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("DEVFORGE_TEST_USER_ID", "from-env");
        let config = Config::parse("[user]\nid = \"${DEVFORGE_TEST_USER_ID}\"\n").unwrap();
        assert_eq!(config.user.id, "from-env");
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let result = Config::parse("[user]\nid = \"${DEVFORGE_TEST_UNSET_VARIABLE}\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let err = Config::parse("[user]\nid = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("user.id"));
    }

    #[test]
    fn test_missing_user_section_rejected() {
        assert!(Config::parse("[store]\npath = \"x.json\"\n").is_err());
    }

    #[test]
    fn test_sandbox_dir_and_label() {
        let config = Config::parse("[user]\nid = \"u1\"\n").unwrap();
        let id = uuid::Uuid::nil();
        assert_eq!(
            config.sandbox_dir(&id),
            PathBuf::from("./data/sandboxes/00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(config.user_label(), "u1");
    }
}
