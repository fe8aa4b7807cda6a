use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub email_notifications: bool,
    pub autoplay: bool,
    pub dark_mode: bool,
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            autoplay: true,
            dark_mode: true,
            language: "ru".to_string(),
        }
    }
}

/// Display preferences per user id, persisted as one JSON file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    entries: Arc<Mutex<HashMap<String, UserSettings>>>,
}

impl SettingsStore {
    /// A missing file starts empty; an unreadable one is logged and ignored.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<HashMap<String, UserSettings>>(&text) {
                Ok(map) => {
                    info!(path = %path.display(), users = map.len(), "Loaded user settings");
                    map
                }
                Err(err) => {
                    warn!(path = %path.display(), "Ignoring malformed settings file: {}", err);
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file yet");
                HashMap::new()
            }
            Err(err) => {
                warn!(path = %path.display(), "Could not read settings file: {}", err);
                HashMap::new()
            }
        };
        Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub async fn get(&self, user_id: &str) -> UserSettings {
        self.entries
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn save(&self, user_id: &str, settings: UserSettings) -> Result<UserSettings> {
        let mut entries = self.entries.lock().await;
        entries.insert(user_id.to_string(), settings.clone());
        let text = serde_json::to_string_pretty(&*entries).context("Failed to encode settings")?;
        write_atomic(&self.path, &text).await?;
        debug!(user_id, "Saved user settings");
        Ok(settings)
    }
}

async fn write_atomic(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, text)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("cinemax-settings-{}-{}", name, std::process::id()))
            .join("user_settings.json")
    }

    #[tokio::test]
    async fn unknown_user_gets_defaults() {
        let store = SettingsStore::load(scratch_path("defaults")).await;
        let settings = store.get("nobody").await;
        assert_eq!(settings, UserSettings::default());
        assert_eq!(settings.language, "ru");
    }

    #[tokio::test]
    async fn saved_settings_survive_reload() {
        let path = scratch_path("reload");
        let store = SettingsStore::load(&path).await;
        let wanted = UserSettings {
            autoplay: false,
            language: "en".to_string(),
            ..UserSettings::default()
        };
        store.save("u1", wanted.clone()).await.expect("settings save");

        let reloaded = SettingsStore::load(&path).await;
        assert_eq!(reloaded.get("u1").await, wanted);
        let _ = std::fs::remove_dir_all(path.parent().expect("has parent"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: UserSettings =
            serde_json::from_str(r#"{"darkMode": false}"#).expect("settings decode");
        assert!(!settings.dark_mode);
        assert!(settings.autoplay);
    }
}
