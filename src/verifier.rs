//! Multi-Image Identity Verifier
//!
//! Decides, from a fixed-size batch of independent step-pattern observations
//! of one access event, whether they represent a single consistent identity.
//! The rule is strict unanimity: one dissenting image invalidates the whole
//! attempt. Majority vote is not used.

use crate::classifier::{Classifier, InputTensor, Prediction};
use crate::error::{AccessError, ClassifierError};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of images per verification attempt
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// One batch slot: a preprocessed image, or the preprocessing failure that
/// took its place. Failed slots flow through as degraded predictions rather
/// than aborting the batch.
pub type BatchSlot = Result<InputTensor, ClassifierError>;

/// Verifier tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Images per verification attempt
    pub batch_size: usize,
    /// Per-image classification deadline; a timeout degrades that slot
    #[serde(with = "crate::config::duration_millis")]
    pub call_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of one multi-image verification attempt.
///
/// `success == true` implies every prediction in the batch carries the same
/// label and `identified_label` equals that common label. `confidence` is
/// the batch mean, clamped to [0, 1], and is reported on failures too so
/// rejected attempts still carry a meaningful figure for the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub identified_label: Option<String>,
    pub confidence: f32,
    pub predictions: Vec<Prediction>,
}

impl VerificationOutcome {
    /// Outcome for a batch where no slot produced a usable classification
    pub fn all_failed(batch_size: usize) -> Self {
        Self {
            success: false,
            identified_label: None,
            confidence: 0.0,
            predictions: (0..batch_size).map(Prediction::failed).collect(),
        }
    }
}

/// Runs the classifier over a batch and applies the unanimity rule.
pub struct IdentityVerifier {
    classifier: Arc<dyn Classifier>,
    config: VerifierConfig,
}

impl IdentityVerifier {
    pub fn new(classifier: Arc<dyn Classifier>, config: VerifierConfig) -> Self {
        Self { classifier, config }
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Verify one batch of images.
    ///
    /// The per-image classifications are independent and run concurrently;
    /// there is no ordering dependency between them. Classifier failures and
    /// timeouts are absorbed into degraded slots - the only error this
    /// returns is the batch-size contract violation.
    pub async fn verify(&self, slots: Vec<BatchSlot>) -> Result<VerificationOutcome, AccessError> {
        if slots.len() != self.config.batch_size {
            return Err(AccessError::InvalidBatchSize {
                expected: self.config.batch_size,
                actual: slots.len(),
            });
        }

        let mut tasks = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            let classifier = self.classifier.clone();
            let call_timeout = self.config.call_timeout;
            tasks.push(tokio::spawn(async move {
                let tensor = match slot {
                    Ok(tensor) => tensor,
                    Err(e) => {
                        warn!("Image {} unusable, degrading slot: {}", index, e);
                        return Prediction::failed(index);
                    }
                };
                match tokio::time::timeout(call_timeout, classifier.predict(&tensor, index)).await
                {
                    Ok(Ok(prediction)) => prediction,
                    Ok(Err(e)) => {
                        warn!("Image {} classification failed, degrading slot: {}", index, e);
                        Prediction::failed(index)
                    }
                    Err(_) => {
                        let e = ClassifierError::Timeout(call_timeout);
                        warn!("Image {} classification failed, degrading slot: {}", index, e);
                        Prediction::failed(index)
                    }
                }
            }));
        }

        let predictions: Vec<Prediction> = join_all(tasks)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| {
                joined.unwrap_or_else(|e| {
                    warn!("Classification task {} panicked: {}", index, e);
                    Prediction::failed(index)
                })
            })
            .collect();

        Ok(Self::resolve(predictions))
    }

    /// Apply the unanimity rule to a completed batch of predictions.
    fn resolve(predictions: Vec<Prediction>) -> VerificationOutcome {
        let mean = if predictions.is_empty() {
            0.0
        } else {
            predictions.iter().map(|p| p.confidence).sum::<f32>() / predictions.len() as f32
        };
        let confidence = mean.clamp(0.0, 1.0);

        // The sentinel never counts towards consistency: a batch of three
        // failed slots must not "agree".
        let unanimous = !predictions.is_empty()
            && predictions
                .iter()
                .all(|p| !p.is_failed() && p.label == predictions[0].label);

        let identified_label = if unanimous {
            Some(predictions[0].label.clone())
        } else {
            None
        };

        debug!(
            "Batch resolved: unanimous={} labels=[{}] mean_confidence={:.3}",
            unanimous,
            predictions
                .iter()
                .map(|p| p.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            confidence
        );

        VerificationOutcome {
            success: unanimous,
            identified_label,
            confidence,
            predictions,
        }
    }
}
