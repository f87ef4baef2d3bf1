//! ResNet-18 identity classifier backed by ONNX Runtime.

use super::{InputTensor, Prediction};
use crate::error::ClassifierError;
use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// ONNX-backed step-pattern identity classifier.
///
/// The session is a read-only shared resource; concurrent `predict` calls
/// contend over nothing but the immutable weights.
#[derive(Debug)]
pub struct ResNetClassifier {
    session: Arc<Session>,
    input_name: String,
    output_name: String,
    labels: Arc<Vec<String>>,
}

impl ResNetClassifier {
    /// Build a classifier from an ONNX file on disk.
    pub fn from_file(path: &Path, labels: Vec<String>) -> Result<Self, ClassifierError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| ClassifierError::Artifact(format!("session build failed: {}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.to_string())
            .ok_or_else(|| ClassifierError::Artifact("model declares no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.to_string())
            .ok_or_else(|| ClassifierError::Artifact("model declares no outputs".to_string()))?;

        info!(
            "Identity model ready: {} -> {} ({} classes)",
            input_name,
            output_name,
            labels.len()
        );

        Ok(Self {
            session: Arc::new(session),
            input_name,
            output_name,
            labels: Arc::new(labels),
        })
    }

    /// Class labels this model predicts over, in output order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Numerically stable softmax over raw logits.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&v| v / sum).collect()
}

#[async_trait]
impl super::Classifier for ResNetClassifier {
    async fn predict(
        &self,
        input: &InputTensor,
        image_index: usize,
    ) -> Result<Prediction, ClassifierError> {
        let session = self.session.clone();
        let input_name = self.input_name.clone();
        let output_name = self.output_name.clone();
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = input.iter().copied().collect();

        // The session's compute is CPU-bound; keep it off the async runtime.
        let (best, confidence) = tokio::task::spawn_blocking(move || {
            let value = ort::value::Value::from_array((shape, data))
                .map_err(|e| ClassifierError::Inference(format!("input tensor: {}", e)))?;
            let inputs = ort::inputs![input_name.as_str() => value]
                .map_err(|e| ClassifierError::Inference(format!("input binding: {}", e)))?;
            let outputs = session
                .run(inputs)
                .map_err(|e| ClassifierError::Inference(format!("session run: {}", e)))?;
            let (_, logits) = outputs[output_name.as_str()]
                .try_extract_raw_tensor::<f32>()
                .map_err(|e| ClassifierError::Inference(format!("output tensor: {}", e)))?;

            if logits.is_empty() {
                return Err(ClassifierError::Inference("empty model output".to_string()));
            }

            let probs = softmax(logits);
            let (best, confidence) = probs
                .iter()
                .copied()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |acc, (i, p)| {
                    if p > acc.1 {
                        (i, p)
                    } else {
                        acc
                    }
                });
            Ok::<_, ClassifierError>((best, confidence))
        })
        .await
        .map_err(|e| ClassifierError::Inference(format!("inference task aborted: {}", e)))??;

        let label = self
            .labels
            .get(best)
            .cloned()
            .ok_or_else(|| {
                ClassifierError::Inference(format!(
                    "class index {} outside label table of {}",
                    best,
                    self.labels.len()
                ))
            })?;

        debug!(
            "Image {} classified as {} ({:.1}%)",
            image_index,
            label,
            confidence * 100.0
        );

        Ok(Prediction {
            image_index,
            label,
            confidence,
        })
    }
}
