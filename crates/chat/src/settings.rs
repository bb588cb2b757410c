use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use pantry_client::{BackendConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;

pub const SETTINGS_DIRECTORY_NAME: &str = "pantry";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEFAULT_GREETING: &str =
    "Welcome! I can help with questions and food spoilage detection.";

const DEFAULT_TRIGGER_PHRASES: [&str; 6] = [
    "food is spoiled",
    "my vegetables are rotten",
    "the food looks rotten",
    "my apple are rotten",
    "my banana are rotten",
    "my mango are rotten",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_greeting")]
    pub greeting: Option<String>,
    /// Inputs that skip the chat endpoint and ask for a photo instead.
    #[serde(default = "default_trigger_phrases")]
    pub trigger_phrases: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            greeting: default_greeting(),
            trigger_phrases: default_trigger_phrases(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl SessionSettings {
    pub fn normalized(mut self) -> Self {
        self.base_url = if self.base_url.trim().is_empty() {
            default_base_url()
        } else {
            self.base_url.trim().to_string()
        };
        self.greeting = self
            .greeting
            .map(|greeting| greeting.trim().to_string())
            .filter(|greeting| !greeting.is_empty());

        // Matching compares lowercased input, so phrases are stored lowercased once here.
        let mut phrases: Vec<String> = Vec::with_capacity(self.trigger_phrases.len());
        for phrase in self.trigger_phrases {
            let phrase = phrase.trim().to_lowercase();
            if !phrase.is_empty() && !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }
        self.trigger_phrases = phrases;

        if self.max_upload_bytes == 0 {
            self.max_upload_bytes = default_max_upload_bytes();
        }

        self
    }

    /// Exact, case-insensitive match of already-trimmed input.
    pub fn is_trigger_phrase(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.trigger_phrases
            .iter()
            .any(|phrase| phrase.to_lowercase() == lowered)
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        BackendConfig::new(&self.base_url)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("settings file {path:?} does not exist"))]
    MissingFile { stage: &'static str, path: PathBuf },
    #[snafu(display("failed to read settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
}

/// Read-only settings source backed by a JSON file in the user's config directory.
pub struct SettingsStore {
    settings: SessionSettings,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".pantry"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = match Self::read(&config_path) {
            Ok(settings) => settings,
            Err(SettingsError::MissingFile { path, .. }) => {
                tracing::info!("settings file not found at {:?}, using defaults", path);
                SessionSettings::default()
            }
            Err(error) => {
                tracing::warn!("{error}. using defaults");
                SessionSettings::default()
            }
        };

        Self {
            settings,
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Reads and normalizes settings, reporting a missing or malformed file.
    pub fn read(path: &Path) -> Result<SessionSettings, SettingsError> {
        if !path.exists() {
            return MissingFileSnafu {
                stage: "check-settings-file",
                path,
            }
            .fail();
        }

        let settings = Figment::from(Serialized::defaults(SessionSettings::default()))
            .merge(Json::file(path))
            .extract::<SessionSettings>()
            .context(ExtractSnafu {
                stage: "extract-settings-json",
                path,
            })?;

        Ok(settings.normalized())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_greeting() -> Option<String> {
    Some(DEFAULT_GREETING.to_string())
}

fn default_trigger_phrases() -> Vec<String> {
    DEFAULT_TRIGGER_PHRASES
        .iter()
        .map(|phrase| phrase.to_string())
        .collect()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}
