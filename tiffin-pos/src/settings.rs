//! Persisted printer selection
//!
//! The only setting owned by the printing side is the id of the last
//! connected printer, stored as `last_printer_id` in `settings.json`. Unknown
//! keys written by other parts of the app are preserved.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tiffin_printer::{DeviceId, DeviceStore};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_printer_id: Option<String>,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// JSON file backed [`DeviceStore`]
pub struct FileSettings {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read(&self) -> io::Result<SettingsFile> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(io::Error::other),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SettingsFile::default()),
            Err(e) => Err(e),
        }
    }

    /// Write through a temp file so a crash never leaves a truncated file
    async fn write(&self, settings: &SettingsFile) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(settings).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }
}

#[async_trait]
impl DeviceStore for FileSettings {
    async fn load_last_device(&self) -> io::Result<Option<DeviceId>> {
        let settings = self.read().await?;
        Ok(settings
            .last_printer_id
            .filter(|id| !id.trim().is_empty())
            .map(DeviceId::new))
    }

    async fn save_last_device(&self, id: &DeviceId) -> io::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.read().await?;
        settings.last_printer_id = Some(id.as_str().to_string());
        self.write(&settings).await?;
        debug!(device_id = %id, path = %self.path.display(), "Saved last printer");
        Ok(())
    }
}
