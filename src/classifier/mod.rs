//! Image Classifier Stage
//!
//! Wraps a pretrained step-pattern identity model behind a seam trait so the
//! verifier can run against the real ONNX session or a test double.

mod manager;
mod preprocess;
mod resnet;

pub use manager::{LoadProgress, ModelManager, ModelSource};
pub use preprocess::{preprocess, InputTensor, MODEL_INPUT_SIZE};
pub use resnet::ResNetClassifier;

use crate::error::ClassifierError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sentinel label recorded for a batch slot whose classification failed.
/// Never matches an enrolled identity, so a degraded slot can never satisfy
/// the unanimity rule.
pub const UNKNOWN_IDENTITY: &str = "UNKNOWN";

/// Result of classifying one image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    /// Position of the image within its verification batch
    pub image_index: usize,
    /// Predicted identity label (or [`UNKNOWN_IDENTITY`] for a failed slot)
    pub label: String,
    /// Softmax probability of the predicted class, in [0, 1]
    pub confidence: f32,
}

impl Prediction {
    /// Degraded slot: classification failed, confidence zero, sentinel label.
    pub fn failed(image_index: usize) -> Self {
        Self {
            image_index,
            label: UNKNOWN_IDENTITY.to_string(),
            confidence: 0.0,
        }
    }

    /// Whether this slot carries the failed-classification sentinel
    pub fn is_failed(&self) -> bool {
        self.label == UNKNOWN_IDENTITY
    }
}

/// Trait for identity classifiers.
///
/// `predict` must be a pure function of the model weights and the input:
/// no state mutation observable to callers across invocations.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one preprocessed image
    async fn predict(
        &self,
        input: &InputTensor,
        image_index: usize,
    ) -> std::result::Result<Prediction, ClassifierError>;
}

/// Hands the session controller a classifier when one is needed.
///
/// [`ModelManager`] is the production implementation (lazy one-time load);
/// tests inject fakes through the same seam.
#[async_trait]
pub trait ClassifierProvider: Send + Sync {
    /// Resolve a ready-to-use classifier, loading it if necessary
    async fn resolve(
        &self,
    ) -> std::result::Result<std::sync::Arc<dyn Classifier>, ClassifierError>;
}
