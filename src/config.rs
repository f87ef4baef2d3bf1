//! Gate configuration.
//!
//! Plain structs with defaults, optionally overridden by a JSON file named
//! through `GAITGATE_CONFIG`.

use crate::classifier::ModelSource;
use crate::error::{AccessError, Result};
use crate::session::SessionConfig;
use crate::verifier::VerifierConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GAITGATE_CONFIG";

/// Milliseconds-on-the-wire serde helper for `Duration` fields
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Identity model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub source: ModelSource,
    /// Class labels in model output order
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::Local {
                path: PathBuf::from("models/resnet18_identity.onnx"),
                sha256: None,
            },
            labels: default_labels(),
        }
    }
}

/// The shipped identity model predicts over ten enrolled subjects
pub fn default_labels() -> Vec<String> {
    (1..=10).map(|n| format!("ID_{}", n)).collect()
}

/// Top-level configuration for the access gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Step-pattern dataset root for the fixture image source
    #[serde(default = "default_dataset_root")]
    pub dataset_root: PathBuf,
    /// Enrollment data for the in-memory personnel directory
    #[serde(default = "default_personnel_file")]
    pub personnel_file: PathBuf,
    /// Append-only JSONL activity log
    #[serde(default = "default_activity_log")]
    pub activity_log: PathBuf,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            verifier: VerifierConfig::default(),
            session: SessionConfig::default(),
            dataset_root: default_dataset_root(),
            personnel_file: default_personnel_file(),
            activity_log: default_activity_log(),
        }
    }
}

fn default_dataset_root() -> PathBuf {
    PathBuf::from("dataset")
}

fn default_personnel_file() -> PathBuf {
    PathBuf::from("personnel.json")
}

fn default_activity_log() -> PathBuf {
    PathBuf::from("activity.jsonl")
}

impl GateConfig {
    /// Read configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| AccessError::Config(format!("config file {}: {}", path.display(), e)))?;
        let config = serde_json::from_reader(file)
            .map_err(|e| AccessError::Config(format!("config parse: {}", e)))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from `GAITGATE_CONFIG` if set, defaults otherwise.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }
}
