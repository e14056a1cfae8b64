use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{Playground, Sidebar, Template};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Playground not found: {0}")]
    NotFound(String),
    #[error("Please enter a valid title")]
    InvalidTitle,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Corrupt playground store: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent playground records.
///
/// All records live in one JSON array at `path`, rewritten after every
/// mutation (temp file + rename). Every operation is scoped to a user:
/// another user's playground behaves exactly like a missing one.
pub struct PlaygroundStore {
    path: PathBuf,
    records: Vec<Playground>,
}

fn clean_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::InvalidTitle);
    }
    Ok(title.to_string())
}

impl PlaygroundStore {
    /// Opens the store, starting empty if the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let records = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        info!(
            "Playground store opened at {} ({} records)",
            path.display(),
            records.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.records)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn position(&self, user_id: &str, id: &str) -> Result<usize, StoreError> {
        let not_found = || StoreError::NotFound(id.to_string());
        let uuid = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
        self.records
            .iter()
            .position(|p| p.id == uuid && p.user_id == user_id)
            .ok_or_else(not_found)
    }

    /// The user's playgrounds, most recently updated first.
    pub fn list(&self, user_id: &str) -> Vec<&Playground> {
        let mut owned: Vec<&Playground> =
            self.records.iter().filter(|p| p.user_id == user_id).collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        owned
    }

    pub fn sidebar(&self, user_id: &str) -> Sidebar {
        Sidebar::build(self.list(user_id))
    }

    /// Ownership-checked lookup.
    pub fn get(&self, user_id: &str, id: &str) -> Result<&Playground, StoreError> {
        let index = self.position(user_id, id)?;
        Ok(&self.records[index])
    }

    pub fn create(
        &mut self,
        user_id: &str,
        title: &str,
        description: &str,
        template: Template,
    ) -> Result<Playground, StoreError> {
        let now = Utc::now();
        let playground = Playground {
            id: Uuid::new_v4(),
            title: clean_title(title)?,
            description: description.trim().to_string(),
            template,
            created_at: now,
            updated_at: now,
            user_id: user_id.to_string(),
            starred: false,
        };
        self.records.push(playground.clone());
        self.persist()?;
        info!("Created playground {} ({})", playground.id, playground.title);
        Ok(playground)
    }

    pub fn update(
        &mut self,
        user_id: &str,
        id: &str,
        title: &str,
        description: &str,
    ) -> Result<Playground, StoreError> {
        let title = clean_title(title)?;
        let index = self.position(user_id, id)?;
        let record = &mut self.records[index];
        record.title = title;
        record.description = description.trim().to_string();
        record.updated_at = Utc::now();
        let updated = record.clone();
        self.persist()?;
        info!("Updated playground {}", updated.id);
        Ok(updated)
    }

    pub fn delete(&mut self, user_id: &str, id: &str) -> Result<Playground, StoreError> {
        let index = self.position(user_id, id)?;
        let removed = self.records.remove(index);
        self.persist()?;
        info!("Deleted playground {}", removed.id);
        Ok(removed)
    }

    /// Copies a playground under a new id, titled `"<title> (Copy)"`.
    pub fn duplicate(&mut self, user_id: &str, id: &str) -> Result<Playground, StoreError> {
        let original = self.get(user_id, id)?;
        let now = Utc::now();
        let copy = Playground {
            id: Uuid::new_v4(),
            title: format!("{} (Copy)", original.title),
            description: original.description.clone(),
            template: original.template,
            created_at: now,
            updated_at: now,
            user_id: user_id.to_string(),
            starred: false,
        };
        self.records.push(copy.clone());
        self.persist()?;
        info!("Duplicated playground {id} as {}", copy.id);
        Ok(copy)
    }

    /// Flips the starred flag. Returns the new state.
    pub fn toggle_star(&mut self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let index = self.position(user_id, id)?;
        let record = &mut self.records[index];
        record.starred = !record.starred;
        let starred = record.starred;
        self.persist()?;
        info!(
            "{} playground {id}",
            if starred { "Starred" } else { "Unstarred" }
        );
        Ok(starred)
    }
}
