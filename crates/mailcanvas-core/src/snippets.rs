use crate::blocks::Block;
use crate::ids::{generate_id, regenerate_ids};
use chrono::Utc;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug)]
pub enum SnippetError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    NotFound(String),
    ProjectDir,
}

impl From<std::io::Error> for SnippetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SnippetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err)
    }
}

/// Persistence hook for starring blocks. The canvas flips `isStarred` only
/// after the call succeeds.
pub trait SnippetPersistence {
    fn save_snippet(&mut self, block: &Block) -> Result<(), SnippetError>;
    fn remove_snippet(&mut self, block_id: &str) -> Result<(), SnippetError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnippetRecord {
    pub id: String,
    pub source_block_id: String,
    pub name: String,
    pub created_at: i64,
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SnippetLibrary {
    pub snippets: Vec<SnippetRecord>,
}

pub struct SnippetStore {
    library_path: PathBuf,
}

impl SnippetStore {
    pub fn new(library_path: PathBuf) -> Self {
        Self { library_path }
    }

    pub fn default_store() -> Result<Self, SnippetError> {
        let project_dirs = ProjectDirs::from("app", "mailcanvas", "MailCanvas")
            .ok_or(SnippetError::ProjectDir)?;
        Ok(Self::new(project_dirs.data_dir().join("snippets.json")))
    }

    pub fn load(&self) -> Result<SnippetLibrary, SnippetError> {
        if !self.library_path.exists() {
            return Ok(SnippetLibrary::default());
        }
        let raw = fs::read_to_string(&self.library_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, library: &SnippetLibrary) -> Result<(), SnippetError> {
        if let Some(parent) = self.library_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(library)?;
        fs::write(&self.library_path, data)?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<SnippetRecord>, SnippetError> {
        Ok(self.load()?.snippets)
    }

    /// A fresh, unstarred copy of a stored snippet, ready to insert.
    pub fn instantiate(&self, snippet_id: &str) -> Result<Block, SnippetError> {
        let library = self.load()?;
        let record = library
            .snippets
            .iter()
            .find(|record| record.id == snippet_id)
            .ok_or_else(|| SnippetError::NotFound(snippet_id.to_string()))?;
        let mut block = regenerate_ids(&record.block);
        block.is_starred = false;
        Ok(block)
    }
}

impl SnippetPersistence for SnippetStore {
    fn save_snippet(&mut self, block: &Block) -> Result<(), SnippetError> {
        let mut library = self.load()?;
        library
            .snippets
            .retain(|record| record.source_block_id != block.id);
        let mut stored = block.clone();
        stored.is_starred = true;
        library.snippets.push(SnippetRecord {
            id: generate_id("snippet"),
            source_block_id: block.id.clone(),
            name: format!("{} snippet", block.block_type.as_str()),
            created_at: Utc::now().timestamp(),
            block: stored,
        });
        self.save(&library)?;
        tracing::debug!(block_id = %block.id, "snippet saved");
        Ok(())
    }

    fn remove_snippet(&mut self, block_id: &str) -> Result<(), SnippetError> {
        let mut library = self.load()?;
        let before = library.snippets.len();
        library
            .snippets
            .retain(|record| record.source_block_id != block_id);
        if library.snippets.len() == before {
            return Err(SnippetError::NotFound(block_id.to_string()));
        }
        self.save(&library)?;
        tracing::debug!(block_id, "snippet removed");
        Ok(())
    }
}
