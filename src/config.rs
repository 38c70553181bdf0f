use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};
use tracing::warn;

use crate::{
    core::StudioError,
    languages::LanguagePair,
    persistence,
};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Realtime endpoint carrying the connect/table/convert namespaces.
    pub server_url: String,
    /// Base URL of the language metadata API.
    pub api_base: String,
    /// Language pair requested as soon as the transport connects. `None` keeps
    /// the seeded default rule-set until the user picks a language.
    pub default_language_pair: Option<LanguagePair>,
    pub recompute_on_focus: bool,
    pub discard_stale_responses: bool,
    pub export_dir: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:5000/ws".to_string(),
            api_base: "http://127.0.0.1:5000".to_string(),
            default_language_pair: None,
            recompute_on_focus: true,
            discard_stale_responses: true,
            export_dir: None,
        }
    }
}

impl StudioConfig {
    /// Loads the persisted config, writing the defaults out on first run.
    pub fn load() -> Self {
        if !persistence::data_file_exists(CONFIG_FILE) {
            let config = Self::default();
            if let Err(e) = config.save() {
                warn!("Failed to write default config: {}", e);
            }
            return config;
        }
        persistence::load_json_or_default(CONFIG_FILE)
    }

    pub fn save(&self) -> Result<(), StudioError> {
        persistence::save_json(self, CONFIG_FILE)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
