//! Room configuration, read from `<project_dir>/.looproom/room.json`.
//!
//! Every field is optional. With no `samples` listed, the registry is every
//! audio file in the project directory, in name order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::loader::index_audio_in_dir;
use crate::shared::NUM_NODES;

pub const CONFIG_DIR: &str = ".looproom";
const CONFIG_FILE: &str = "room.json";
const RELAY_URL_ENV: &str = "LOOPROOM_RELAY_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// WebSocket address of the room relay
    pub relay_url: String,
    /// Fixed wait between reconnect attempts
    pub reconnect_delay_ms: u64,
    /// How long one attempt may take to connect and finish the handshake
    pub connect_timeout_ms: u64,
    /// Channel volume with nobody else in the room
    pub base_volume_db: f32,
    pub samples: Vec<SampleEntry>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            relay_url: "wss://localhost:8081".to_string(),
            reconnect_delay_ms: 3000,
            connect_timeout_ms: 10_000,
            base_volume_db: -12.0,
            samples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleEntry {
    pub path: PathBuf, // relative paths resolve against the project dir
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of the sample registry. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub index: usize,
    pub path: PathBuf,
    pub display_name: String,
}

pub fn config_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
}

impl RoomConfig {
    /// File config plus environment overrides; anything broken falls back to defaults.
    pub fn load(project_dir: &Path) -> Self {
        let mut config = match Self::load_from(project_dir) {
            Ok(Some(config)) => {
                info!("loaded {}", config_file_path(project_dir).display());
                config
            }
            Ok(None) => RoomConfig::default(),
            Err(e) => {
                warn!("{e:#}; using defaults");
                RoomConfig::default()
            }
        };
        if let Ok(url) = std::env::var(RELAY_URL_ENV) {
            config.relay_url = url;
        }
        config
    }

    /// Ok(None) when there's simply no config file.
    pub fn load_from(project_dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = config_file_path(project_dir);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("bad config in {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    /// The sample list: one per node, at most eight.
    pub fn registry(&self, project_dir: &Path) -> Vec<Sample> {
        let entries: Vec<(PathBuf, Option<String>)> = if self.samples.is_empty() {
            index_audio_in_dir(project_dir)
                .unwrap_or_else(|e| {
                    warn!("{e:#}");
                    Vec::new()
                })
                .into_iter()
                .map(|p| (p, None))
                .collect()
        } else {
            self.samples
                .iter()
                .map(|s| (project_dir.join(&s.path), s.name.clone()))
                .collect()
        };

        if entries.len() > NUM_NODES {
            warn!(
                "{} samples configured, only the first {NUM_NODES} get a node",
                entries.len()
            );
        }

        entries
            .into_iter()
            .take(NUM_NODES)
            .enumerate()
            .map(|(index, (path, name))| {
                let display_name = name.unwrap_or_else(|| default_name(&path, index));
                Sample { index, path, display_name }
            })
            .collect()
    }
}

fn default_name(path: &Path, index: usize) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| format!("SAMPLE {}", index + 1))
}
