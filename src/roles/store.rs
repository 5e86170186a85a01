//! JSON persistence for the role board's message binding.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

use super::RoleError;
use crate::serenity;

/// The persisted part of the role board: where its message lives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBoardData {
    pub channel_id: Option<serenity::ChannelId>,
    pub message_id: Option<serenity::MessageId>,
}

/// A small JSON file holding [RoleBoardData], rewritten on every change.
pub struct DataFile {
    path: PathBuf,
    data: Mutex<RoleBoardData>,
}

impl DataFile {
    /// Reads the data file, creating a default one if it is missing.
    /// An unreadable or malformed file is an error; silently starting
    /// over would lose the binding.
    pub fn load(path: PathBuf) -> Result<Self, RoleError> {
        let data = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Role board data file is missing, creating a new one.");
                let data = RoleBoardData::default();
                write_file(&path, &data)?;
                data
            }
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Updates the stored message binding, writing through to disk only
    /// when something actually changed.
    pub fn remember(
        &self,
        channel: serenity::ChannelId,
        message: serenity::MessageId,
    ) -> Result<(), RoleError> {
        let mut data = self.data.lock().expect("role board data poisoned");
        if data.channel_id == Some(channel) && data.message_id == Some(message) {
            return Ok(());
        }
        data.channel_id = Some(channel);
        data.message_id = Some(message);
        write_file(&self.path, &data)
    }

    pub fn data(&self) -> RoleBoardData {
        *self.data.lock().expect("role board data poisoned")
    }
}

fn write_file(path: &Path, data: &RoleBoardData) -> Result<(), RoleError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(data)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> serenity::ChannelId {
        serenity::ChannelId::new(n)
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");

        let file = DataFile::load(path.clone()).unwrap();
        assert_eq!(file.data(), RoleBoardData::default());
        assert!(path.exists());
    }

    #[test]
    fn remember_writes_through_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");

        let file = DataFile::load(path.clone()).unwrap();
        file.remember(id(12), serenity::MessageId::new(34)).unwrap();

        let reloaded = DataFile::load(path).unwrap();
        assert_eq!(reloaded.data().channel_id, Some(id(12)));
        assert_eq!(reloaded.data().message_id, Some(serenity::MessageId::new(34)));
    }

    #[test]
    fn malformed_data_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            DataFile::load(path),
            Err(RoleError::InvalidData(_))
        ));
    }
}
