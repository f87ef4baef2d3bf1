//! Verifier logic suite: unanimity rule, confidence aggregation, and
//! degraded-slot behavior.

use async_trait::async_trait;
use gaitgate::classifier::{Classifier, InputTensor, Prediction, UNKNOWN_IDENTITY};
use gaitgate::error::{AccessError, ClassifierError};
use gaitgate::verifier::{BatchSlot, IdentityVerifier, VerifierConfig};
use ndarray::Array4;
use std::sync::Arc;
use std::time::Duration;

/// Classifier scripted per image index, so concurrent invocation order
/// cannot change the outcome.
struct ScriptedClassifier {
    script: Vec<(&'static str, f32)>,
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn predict(
        &self,
        _input: &InputTensor,
        image_index: usize,
    ) -> Result<Prediction, ClassifierError> {
        let (label, confidence) = self.script[image_index];
        Ok(Prediction {
            image_index,
            label: label.to_string(),
            confidence,
        })
    }
}

/// Classifier that always fails at inference time
struct BrokenClassifier;

#[async_trait]
impl Classifier for BrokenClassifier {
    async fn predict(
        &self,
        _input: &InputTensor,
        _image_index: usize,
    ) -> Result<Prediction, ClassifierError> {
        Err(ClassifierError::Inference("numerical failure".to_string()))
    }
}

/// Classifier that never answers inside any reasonable deadline
struct StalledClassifier;

#[async_trait]
impl Classifier for StalledClassifier {
    async fn predict(
        &self,
        _input: &InputTensor,
        image_index: usize,
    ) -> Result<Prediction, ClassifierError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Prediction {
            image_index,
            label: "ID_1".to_string(),
            confidence: 0.99,
        })
    }
}

fn tensor() -> InputTensor {
    Array4::zeros((1, 3, 224, 224))
}

fn slots(n: usize) -> Vec<BatchSlot> {
    (0..n).map(|_| Ok(tensor())).collect()
}

fn verifier(classifier: Arc<dyn Classifier>) -> IdentityVerifier {
    IdentityVerifier::new(classifier, VerifierConfig::default())
}

#[tokio::test]
async fn test_unanimous_batch_verifies() {
    let v = verifier(Arc::new(ScriptedClassifier {
        script: vec![("ID_1", 0.97), ("ID_1", 0.98), ("ID_1", 0.96)],
    }));
    let outcome = v.verify(slots(3)).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.identified_label.as_deref(), Some("ID_1"));
    assert!((outcome.confidence - 0.97).abs() < 1e-6);
    assert_eq!(outcome.predictions.len(), 3);
}

#[tokio::test]
async fn test_single_dissent_rejects_despite_high_confidence() {
    let v = verifier(Arc::new(ScriptedClassifier {
        script: vec![("ID_1", 0.99), ("ID_1", 0.99), ("ID_2", 0.99)],
    }));
    let outcome = v.verify(slots(3)).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.identified_label, None);
    // Confidence never overrides unanimity, but the mean is still reported
    assert!((outcome.confidence - 0.99).abs() < 1e-6);
}

#[tokio::test]
async fn test_mean_confidence_clamped() {
    // A miscalibrated classifier reporting out-of-range confidences must
    // not leak past [0, 1] in the aggregate.
    let v = verifier(Arc::new(ScriptedClassifier {
        script: vec![("ID_3", 1.4), ("ID_3", 1.2), ("ID_3", 1.3)],
    }));
    let outcome = v.verify(slots(3)).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.confidence, 1.0);
}

#[tokio::test]
async fn test_wrong_batch_size_is_contract_violation() {
    let v = verifier(Arc::new(ScriptedClassifier {
        script: vec![("ID_1", 0.9); 4],
    }));

    let err = v.verify(slots(2)).await.unwrap_err();
    assert!(matches!(
        err,
        AccessError::InvalidBatchSize {
            expected: 3,
            actual: 2
        }
    ));

    let err = v.verify(slots(4)).await.unwrap_err();
    assert!(matches!(
        err,
        AccessError::InvalidBatchSize {
            expected: 3,
            actual: 4
        }
    ));
}

#[tokio::test]
async fn test_classifier_failure_degrades_to_definite_rejection() {
    let v = verifier(Arc::new(BrokenClassifier));
    let outcome = v.verify(slots(3)).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.identified_label, None);
    assert_eq!(outcome.confidence, 0.0);
    // Every slot carries the sentinel - and three sentinels never "agree"
    assert!(outcome.predictions.iter().all(|p| p.label == UNKNOWN_IDENTITY));
}

#[tokio::test]
async fn test_timeout_treated_as_slot_failure() {
    let v = IdentityVerifier::new(
        Arc::new(StalledClassifier),
        VerifierConfig {
            batch_size: 3,
            call_timeout: Duration::from_millis(50),
        },
    );
    let outcome = v.verify(slots(3)).await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.predictions.iter().all(|p| p.is_failed()));
}

#[tokio::test]
async fn test_undecodable_slot_spoils_otherwise_unanimous_batch() {
    let v = verifier(Arc::new(ScriptedClassifier {
        script: vec![("ID_5", 0.95), ("ID_5", 0.94), ("ID_5", 0.96)],
    }));
    let batch = vec![
        Ok(tensor()),
        Err(ClassifierError::InvalidImage("truncated file".to_string())),
        Ok(tensor()),
    ];
    let outcome = v.verify(batch).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.identified_label, None);
    assert_eq!(outcome.predictions[1].label, UNKNOWN_IDENTITY);
    assert_eq!(outcome.predictions[1].confidence, 0.0);
    // The two healthy slots still report their classifications
    assert_eq!(outcome.predictions[0].label, "ID_5");
    assert_eq!(outcome.predictions[2].label, "ID_5");
}

#[tokio::test]
async fn test_predictions_keep_batch_order() {
    let v = verifier(Arc::new(ScriptedClassifier {
        script: vec![("ID_1", 0.1), ("ID_2", 0.2), ("ID_3", 0.3)],
    }));
    let outcome = v.verify(slots(3)).await.unwrap();
    for (i, p) in outcome.predictions.iter().enumerate() {
        assert_eq!(p.image_index, i);
    }
    assert_eq!(outcome.predictions[0].label, "ID_1");
    assert_eq!(outcome.predictions[2].label, "ID_3");
}
