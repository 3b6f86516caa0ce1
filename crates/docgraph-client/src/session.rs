use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the client reopens on the next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub workspace_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
}

/// `<config dir>/docgraph`, created on demand.
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("Could not find config directory")?
        .join("docgraph");

    fs::create_dir_all(&dir).context("Could not create config directory")?;

    Ok(dir)
}

impl SessionState {
    pub fn new(workspace_id: Uuid) -> Self {
        Self {
            workspace_id,
            document_id: None,
        }
    }

    fn state_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("session.json"))
    }

    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::state_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::state_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path).context("Could not read session file")?;

        let state: Self =
            serde_json::from_str(&contents).context("Could not parse session file")?;

        Ok(Some(state))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(self).context("Could not serialize session")?;

        fs::write(path, contents).context("Could not write session file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(SessionState::load_from(&dir.path().join("session.json")).unwrap(), None);
    }

    #[test]
    fn saved_session_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let state = SessionState {
            workspace_id: Uuid::new_v4(),
            document_id: Some(Uuid::new_v4()),
        };

        state.save_to(&path).unwrap();

        assert_eq!(SessionState::load_from(&path).unwrap(), Some(state));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(SessionState::load_from(&path).is_err());
    }
}
