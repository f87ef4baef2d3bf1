//! Verification Session Controller
//!
//! Drives one detection cycle through its phases, invokes the verifier and
//! the time-of-day policy, and emits the final outcome to the caller and the
//! activity log. One session in flight per controller; parallelism lives
//! only inside the verifier's batch.

mod types;

pub use types::{
    ProgressObserver, ProgressUpdate, SessionConfig, SessionOutcome, SessionPhase,
};

use crate::activity::{ActivityLog, ActivityRecord};
use crate::classifier::{preprocess, ClassifierProvider};
use crate::error::{AccessError, Result};
use crate::personnel::PersonnelDirectory;
use crate::policy;
use crate::source::ImageSource;
use crate::verifier::{BatchSlot, IdentityVerifier, VerificationOutcome, VerifierConfig};
use chrono::NaiveTime;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

type Clock = Arc<dyn Fn() -> NaiveTime + Send + Sync>;

/// Stateful orchestrator for verification sessions.
///
/// All collaborators are injected at construction; demo and test setups
/// swap the image source and classifier provider behind the same seams.
pub struct SessionController {
    models: Arc<dyn ClassifierProvider>,
    directory: Arc<dyn PersonnelDirectory>,
    source: Arc<dyn ImageSource>,
    log: Arc<dyn ActivityLog>,
    verifier_config: VerifierConfig,
    config: SessionConfig,
    observers: RwLock<Vec<Arc<dyn ProgressObserver>>>,
    phase: Mutex<SessionPhase>,
    busy: AtomicBool,
    /// Bumped by reset(); in-flight work from an older generation discards
    /// its results instead of applying them to a stale session.
    generation: AtomicU64,
    clock: Clock,
}

impl SessionController {
    pub fn new(
        models: Arc<dyn ClassifierProvider>,
        directory: Arc<dyn PersonnelDirectory>,
        source: Arc<dyn ImageSource>,
        log: Arc<dyn ActivityLog>,
        verifier_config: VerifierConfig,
        config: SessionConfig,
    ) -> Self {
        Self {
            models,
            directory,
            source,
            log,
            verifier_config,
            config,
            observers: RwLock::new(Vec::new()),
            phase: Mutex::new(SessionPhase::Idle),
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            clock: Arc::new(|| chrono::Local::now().time()),
        }
    }

    /// Override the wall clock used for policy evaluation
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Register a progress observer
    pub fn add_observer(&self, observer: Arc<dyn ProgressObserver>) {
        self.observers.write().unwrap().push(observer);
    }

    /// Current phase of the controller
    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap()
    }

    /// Force the controller back to Idle and discard any in-flight work.
    ///
    /// Safe to call at any time; a subsequent session starts from a clean
    /// slate.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.phase.lock().unwrap() = SessionPhase::Idle;
        self.busy.store(false, Ordering::SeqCst);
        info!("Session controller reset");
    }

    /// Run one full detection cycle and return its outcome.
    ///
    /// Errors only on contract violations: `SessionBusy` when a session is
    /// already in flight, `SessionCancelled` when `reset()` discarded this
    /// run, `InvalidBatchSize` on verifier misuse. Everything else resolves
    /// to a completed outcome.
    pub async fn start(&self) -> Result<SessionOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AccessError::SessionBusy);
        }

        let session_id = Uuid::new_v4();
        let generation = self.generation.load(Ordering::SeqCst);
        info!("Session {} started", session_id);

        let result = self.run(generation).await;

        if self.cancelled(generation) {
            // reset() already restored Idle; whatever we computed is stale.
            info!("Session {} cancelled, result discarded", session_id);
            return Err(AccessError::SessionCancelled);
        }

        *self.phase.lock().unwrap() = SessionPhase::Idle;
        self.busy.store(false, Ordering::SeqCst);

        let outcome = result?;
        self.emit_activity(session_id, &outcome);
        info!("Session {} completed", session_id);
        Ok(outcome)
    }

    fn cancelled(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn set_phase(&self, generation: u64, phase: SessionPhase) -> Result<()> {
        if self.cancelled(generation) {
            return Err(AccessError::SessionCancelled);
        }
        *self.phase.lock().unwrap() = phase;
        Ok(())
    }

    fn emit_progress(&self, generation: u64, phase: SessionPhase, percent: f32, message: &str) {
        if self.cancelled(generation) {
            return;
        }
        let update = ProgressUpdate {
            phase,
            percent,
            message: message.to_string(),
        };
        let observers = self.observers.read().unwrap();
        for observer in observers.iter() {
            observer.on_progress(update.clone());
        }
    }

    async fn run(&self, generation: u64) -> Result<SessionOutcome> {
        let batch_size = self.verifier_config.batch_size;

        // Detecting: wait for a subject to be present. With a real sensor
        // this would be a presence signal; the duration is configuration.
        self.set_phase(generation, SessionPhase::Detecting)?;
        tokio::time::sleep(self.config.detect_duration).await;

        // Collecting: acquire and preprocess exactly N images.
        self.set_phase(generation, SessionPhase::Collecting)?;
        let images = match self.source.acquire(batch_size).await {
            Ok(images) if images.len() == batch_size => images,
            Ok(images) => {
                warn!(
                    "Image source supplied {} images, expected {}",
                    images.len(),
                    batch_size
                );
                return Ok(SessionOutcome::Rejected {
                    verification: VerificationOutcome::all_failed(batch_size),
                    reason: "image acquisition incomplete".to_string(),
                });
            }
            Err(e) => {
                warn!("Image acquisition failed: {}", e);
                return Ok(SessionOutcome::Rejected {
                    verification: VerificationOutcome::all_failed(batch_size),
                    reason: "image acquisition failed".to_string(),
                });
            }
        };

        let mut slots: Vec<BatchSlot> = Vec::with_capacity(batch_size);
        for (index, image) in images.into_iter().enumerate() {
            // An undecodable image degrades its slot; the batch continues.
            let slot = preprocess(&image.bytes);
            if let Err(ref e) = slot {
                warn!("Image {} ({}) rejected: {}", index, image.origin, e);
            }
            slots.push(slot);

            let percent = (index + 1) as f32 * 100.0 / batch_size as f32;
            self.emit_progress(
                generation,
                SessionPhase::Collecting,
                percent,
                &format!("collected image {}/{}", index + 1, batch_size),
            );
            if index + 1 < batch_size && !self.config.collect_interval.is_zero() {
                tokio::time::sleep(self.config.collect_interval).await;
            }
        }

        // Analyzing: run the batch through the classifier and the
        // unanimity check.
        self.set_phase(generation, SessionPhase::Analyzing)?;
        self.emit_progress(generation, SessionPhase::Analyzing, 0.0, "analyzing batch");
        let verification = match self.models.resolve().await {
            Ok(classifier) => {
                let verifier = IdentityVerifier::new(classifier, self.verifier_config.clone());
                verifier.verify(slots).await?
            }
            Err(e) => {
                // No classifier, no usable slots - resolve to a definite
                // rejection rather than escaping as an error.
                warn!("Classifier unavailable: {}", e);
                return Ok(SessionOutcome::Rejected {
                    verification: VerificationOutcome::all_failed(batch_size),
                    reason: "classifier unavailable".to_string(),
                });
            }
        };
        self.emit_progress(generation, SessionPhase::Analyzing, 100.0, "batch analyzed");

        // Identifying: map the verified label to an enrolled person and
        // apply the time-of-day policy.
        self.set_phase(generation, SessionPhase::Identifying)?;
        let outcome = match &verification.identified_label {
            Some(label) if verification.success => {
                match self.directory.lookup(label).await {
                    Some(person) => {
                        let decision = policy::evaluate(person.role, (self.clock)());
                        info!(
                            "Identity {} verified as {} ({}): allowed={}",
                            label, person.name, person.role, decision.allowed
                        );
                        SessionOutcome::Verified {
                            person,
                            verification,
                            decision,
                        }
                    }
                    None => {
                        warn!("Identity {} verified but not enrolled", label);
                        SessionOutcome::UnknownPerson {
                            label: label.clone(),
                            verification,
                        }
                    }
                }
            }
            _ => SessionOutcome::Rejected {
                verification,
                reason: "step-pattern images do not agree on one identity".to_string(),
            },
        };

        Ok(outcome)
    }

    /// Record the session on the activity log, fire-and-forget.
    fn emit_activity(&self, session_id: Uuid, outcome: &SessionOutcome) {
        let record = match outcome {
            SessionOutcome::Verified {
                person,
                verification,
                decision,
            } => ActivityRecord {
                timestamp: chrono::Utc::now(),
                session_id,
                identity_label: Some(person.id.clone()),
                success: true,
                confidence: verification.confidence,
                access_allowed: Some(decision.allowed),
                reason: decision.reason.clone(),
            },
            SessionOutcome::Rejected {
                verification,
                reason,
            } => ActivityRecord {
                timestamp: chrono::Utc::now(),
                session_id,
                identity_label: None,
                success: false,
                confidence: verification.confidence,
                access_allowed: None,
                reason: reason.clone(),
            },
            SessionOutcome::UnknownPerson {
                label,
                verification,
            } => ActivityRecord {
                timestamp: chrono::Utc::now(),
                session_id,
                identity_label: Some(label.clone()),
                success: false,
                confidence: verification.confidence,
                access_allowed: None,
                reason: "identity not enrolled".to_string(),
            },
        };

        let log = self.log.clone();
        tokio::spawn(async move {
            log.record(record).await;
        });
    }
}
