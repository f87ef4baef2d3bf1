//! Model lifecycle management.
//!
//! The identity model loads exactly once per manager and is shared as a
//! read-only resource. Concurrent first-callers await the same in-flight
//! load; a failed load leaves the slot empty so a later call can retry.

use super::resnet::ResNetClassifier;
use crate::error::ClassifierError;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Where the model weights come from
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    /// An ONNX file on disk, optionally pinned to a sha256 digest
    Local {
        path: PathBuf,
        #[serde(default)]
        sha256: Option<String>,
    },
    /// A file in a Hugging Face model repo (content-addressed local cache)
    HuggingFace {
        repo: String,
        revision: String,
        file: String,
    },
}

/// Coarse model-load progress for UI feedback
#[derive(Debug, Clone)]
pub struct LoadProgress {
    pub percent: f32,
    pub status: String,
}

type LoadCallback = Arc<dyn Fn(LoadProgress) + Send + Sync>;

/// Owns the classifier instance and guards its one-time initialization.
///
/// Injected into the session controller at construction time; there is no
/// global singleton.
pub struct ModelManager {
    source: ModelSource,
    labels: Vec<String>,
    cell: OnceCell<Arc<ResNetClassifier>>,
    callbacks: RwLock<Vec<LoadCallback>>,
}

impl ModelManager {
    pub fn new(source: ModelSource, labels: Vec<String>) -> Self {
        Self {
            source,
            labels,
            cell: OnceCell::new(),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Register a load-progress listener. Fires immediately if the model is
    /// already resident.
    pub fn add_progress_callback(&self, callback: LoadCallback) {
        if self.cell.initialized() {
            callback(LoadProgress {
                percent: 100.0,
                status: "model ready".to_string(),
            });
        }
        self.callbacks.write().unwrap().push(callback);
    }

    fn emit(&self, percent: f32, status: &str) {
        let callbacks = self.callbacks.read().unwrap();
        for cb in callbacks.iter() {
            cb(LoadProgress {
                percent,
                status: status.to_string(),
            });
        }
    }

    /// Whether the model has finished loading
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Get the classifier without waiting for a load.
    pub fn try_get(&self) -> Result<Arc<ResNetClassifier>, ClassifierError> {
        self.cell
            .get()
            .cloned()
            .ok_or(ClassifierError::ModelNotLoaded)
    }

    /// Get the classifier, loading the model on first use.
    ///
    /// Idempotent and safe to await from multiple callers: a caller arriving
    /// mid-load waits on the same in-flight load rather than starting a
    /// second one.
    pub async fn classifier(&self) -> Result<Arc<ResNetClassifier>, ClassifierError> {
        self.cell
            .get_or_try_init(|| self.load())
            .await
            .cloned()
            .map_err(|e| {
                warn!("Model load failed: {}", e);
                self.emit(0.0, "model load failed");
                e
            })
    }

    async fn load(&self) -> Result<Arc<ResNetClassifier>, ClassifierError> {
        self.emit(0.0, "resolving model artifact");
        let path = self.resolve_artifact().await?;

        self.emit(80.0, "creating inference session");
        let labels = self.labels.clone();
        let classifier = tokio::task::spawn_blocking(move || {
            ResNetClassifier::from_file(&path, labels)
        })
        .await
        .map_err(|e| ClassifierError::Artifact(format!("load task aborted: {}", e)))??;

        self.emit(100.0, "model ready");
        Ok(Arc::new(classifier))
    }

    /// Resolve the model source to a local file path.
    async fn resolve_artifact(&self) -> Result<PathBuf, ClassifierError> {
        match self.source.clone() {
            ModelSource::Local { path, sha256 } => {
                if !path.exists() {
                    return Err(ClassifierError::Artifact(format!(
                        "model file not found: {}",
                        path.display()
                    )));
                }
                if let Some(expected) = sha256 {
                    let pinned = path.clone();
                    tokio::task::spawn_blocking(move || verify_checksum(&pinned, &expected))
                        .await
                        .map_err(|e| {
                            ClassifierError::Artifact(format!("checksum task aborted: {}", e))
                        })??;
                }
                Ok(path)
            }
            ModelSource::HuggingFace {
                repo,
                revision,
                file,
            } => {
                info!("Fetching model {}@{} :: {}", repo, revision, file);
                tokio::task::spawn_blocking(move || {
                    use hf_hub::{api::sync::ApiBuilder, Repo};
                    let api = ApiBuilder::new()
                        .with_progress(true)
                        .build()
                        .map_err(|e| ClassifierError::Artifact(format!("hub api: {}", e)))?;
                    let repo = api.repo(Repo::with_revision(repo, hf_hub::RepoType::Model, revision));
                    repo.get(&file)
                        .map_err(|e| ClassifierError::Artifact(format!("hub fetch: {}", e)))
                })
                .await
                .map_err(|e| ClassifierError::Artifact(format!("fetch task aborted: {}", e)))?
            }
        }
    }
}

#[async_trait::async_trait]
impl super::ClassifierProvider for ModelManager {
    async fn resolve(&self) -> Result<Arc<dyn super::Classifier>, ClassifierError> {
        let classifier = self.classifier().await?;
        Ok(classifier as Arc<dyn super::Classifier>)
    }
}

fn verify_checksum(path: &PathBuf, expected: &str) -> Result<(), ClassifierError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ClassifierError::Artifact(format!("read for checksum: {}", e)))?;
    let digest = hex::encode(Sha256::digest(&bytes));
    if digest.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ClassifierError::Artifact(format!(
            "model checksum mismatch: expected {}, got {}",
            expected, digest
        )))
    }
}
