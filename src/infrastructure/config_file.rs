//! JSON file persistence for suppression snapshots.
//!
//! ## Format
//!
//! Entries are grouped by channel. Expiry times are RFC 3339 in UTC so the
//! file does not depend on the locale or time zone of the machine that
//! wrote it.
//!
//! ```json
//! {
//!   "channels": [
//!     {
//!       "name": "cpu",
//!       "sources": [
//!         { "type": "Double", "name": "core0", "typeName": "Temperature",
//!           "until": "2024-05-20T10:15:00Z" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A missing file is treated as an empty snapshot. Saves write a temporary
//! sibling file and rename it over the target.

use crate::application::ports::{ConfigReadError, ConfigWriteError, PersistenceGateway};
use crate::domain::entry::SnapshotEntry;
use crate::domain::key::{SourceType, SuppressionKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    channels: Vec<ChannelRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChannelRecord {
    name: String,
    #[serde(default)]
    sources: Vec<SourceRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SourceRecord {
    #[serde(rename = "type")]
    source_type: SourceType,
    name: String,
    type_name: String,
    until: DateTime<Utc>,
}

impl ConfigFile {
    fn from_entries(entries: &[SnapshotEntry]) -> Self {
        let mut grouped: BTreeMap<&str, Vec<SourceRecord>> = BTreeMap::new();
        for entry in entries {
            grouped
                .entry(entry.channel.as_str())
                .or_default()
                .push(SourceRecord {
                    source_type: entry.key.source_type(),
                    name: entry.key.name().to_string(),
                    type_name: entry.key.type_name().to_string(),
                    until: entry.expires_at,
                });
        }

        Self {
            channels: grouped
                .into_iter()
                .map(|(name, sources)| ChannelRecord {
                    name: name.to_string(),
                    sources,
                })
                .collect(),
        }
    }

    fn into_entries(self) -> Result<Vec<SnapshotEntry>, String> {
        let mut entries = Vec::new();
        for channel in self.channels {
            if channel.name.is_empty() {
                return Err("channel name must not be empty".to_string());
            }
            for source in channel.sources {
                let key = SuppressionKey::new(source.source_type, source.name, source.type_name);
                entries.push(SnapshotEntry::new(channel.name.clone(), key, source.until));
            }
        }
        Ok(entries)
    }
}

/// Persistence gateway storing snapshots in a UTF-8 JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    /// Create a gateway for the file at `path`. Nothing is read or created yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_err(&self, path: &Path, source: io::Error) -> ConfigWriteError {
        ConfigWriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl PersistenceGateway for JsonFileGateway {
    fn load(&self) -> Result<Vec<SnapshotEntry>, ConfigReadError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ConfigReadError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let malformed = |reason: String| ConfigReadError::Malformed {
            path: self.path.clone(),
            reason,
        };

        let file: ConfigFile =
            serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;
        file.into_entries().map_err(malformed)
    }

    fn save(&self, entries: &[SnapshotEntry]) -> Result<(), ConfigWriteError> {
        let file = ConfigFile::from_entries(entries);
        let mut text = serde_json::to_string_pretty(&file)
            .map_err(|e| ConfigWriteError::Encode(e.to_string()))?;
        text.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_err(parent, e))?;
        }

        let temp = self.temp_path();
        fs::write(&temp, text).map_err(|e| self.write_err(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            self.write_err(&self.path, e)
        })
    }
}
