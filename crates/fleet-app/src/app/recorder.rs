//! Violation Recorder - persist violation events and trigger rescoring

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fleet_domain::repository::{DeadLetterRepository, InsertOutcome, ViolationRepository};
use fleet_domain::service::{fingerprint, points_for};
use fleet_types::{DeadLetter, DriverScore, FailureStage, Violation, ViolationEvent};

use super::aggregator::ScoreAggregator;
use super::retry::{run_blocking, RetryFailure, RetryPolicy};
use crate::repository::Repositories;

/// What happened to one violation event
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Stored and the driver rescored
    Recorded {
        violation: Violation,
        score: DriverScore,
    },
    /// Fingerprint already stored by an earlier delivery. Nothing written,
    /// but the driver is rescored so a rescore lost earlier catches up.
    Duplicate {
        fingerprint: String,
        score: DriverScore,
    },
    /// Gave up at `stage`. `violation` is set when the insert landed but the
    /// rescore did not.
    DeadLettered {
        stage: FailureStage,
        violation: Option<Violation>,
    },
}

pub struct ViolationRecorder {
    violations: Arc<dyn ViolationRepository>,
    dead_letters: Arc<dyn DeadLetterRepository>,
    aggregator: Arc<ScoreAggregator>,
    retry: RetryPolicy,
}

impl ViolationRecorder {
    pub fn new(repos: &Repositories, aggregator: Arc<ScoreAggregator>, retry: RetryPolicy) -> Self {
        Self {
            violations: Arc::clone(&repos.violations),
            dead_letters: Arc::clone(&repos.dead_letters),
            aggregator,
            retry,
        }
    }

    pub async fn record(&self, event: ViolationEvent) -> RecordOutcome {
        self.record_at(event, Utc::now()).await
    }

    /// Persist one event as a violation, then recompute the driver's score.
    pub async fn record_at(&self, event: ViolationEvent, now: DateTime<Utc>) -> RecordOutcome {
        let violation = Violation {
            id: Uuid::new_v4(),
            violation_id: event.violation_id,
            fingerprint: fingerprint(&event),
            truck_id: event.truck_id.clone(),
            driver_id: event.driver_id.clone(),
            violation_type: event.violation_type,
            severity: event.severity,
            subject: event.subject,
            message: event.message.clone(),
            original_data: event.original_data.clone(),
            detected_at: event.detected_at,
            points_deducted: points_for(event.violation_type, event.severity),
            recorded_at: now,
        };

        let repo = Arc::clone(&self.violations);
        let to_insert = violation.clone();
        let inserted = run_blocking(&self.retry, "violation insert", move || {
            repo.insert(&to_insert)
        })
        .await;

        let (outcome, attempts) = match inserted {
            Ok(done) => done,
            Err(failure) => {
                self.dead_letter(FailureStage::RecordViolation, &event, failure, now)
                    .await;
                return RecordOutcome::DeadLettered {
                    stage: FailureStage::RecordViolation,
                    violation: None,
                };
            }
        };

        let landed = match outcome {
            InsertOutcome::Inserted => true,
            // After a failed attempt the stored row may be our own write
            InsertOutcome::Duplicate if attempts > 1 => self.is_own_write(&violation).await,
            InsertOutcome::Duplicate => false,
        };

        if landed {
            log::debug!(
                "recorded {} {} for driver {} (-{} points)",
                violation.severity,
                violation.violation_type,
                violation.driver_id,
                violation.points_deducted
            );
        } else {
            log::warn!(
                "duplicate {} for driver {} skipped",
                violation.fingerprint,
                violation.driver_id
            );
        }

        let rescored = self.aggregator.recompute_at(&violation.driver_id, now).await;
        match rescored {
            Ok(score) if landed => RecordOutcome::Recorded { violation, score },
            Ok(score) => RecordOutcome::Duplicate {
                fingerprint: violation.fingerprint,
                score,
            },
            Err(failure) => {
                self.dead_letter(FailureStage::RecomputeScore, &event, failure, now)
                    .await;
                RecordOutcome::DeadLettered {
                    stage: FailureStage::RecomputeScore,
                    violation: landed.then_some(violation),
                }
            }
        }
    }

    /// Whether the row stored under `violation`'s fingerprint is this write
    async fn is_own_write(&self, violation: &Violation) -> bool {
        let repo = Arc::clone(&self.violations);
        let fingerprint = violation.fingerprint.clone();
        let stored = run_blocking(&self.retry, "violation lookup", move || {
            repo.find_by_fingerprint(&fingerprint)
        })
        .await;

        match stored {
            Ok((Some(stored), _)) => stored.id == violation.id,
            Ok((None, _)) => false,
            Err(e) => {
                log::warn!(
                    "could not confirm owner of {}, treating as duplicate: {}",
                    violation.fingerprint,
                    e
                );
                false
            }
        }
    }

    async fn dead_letter(
        &self,
        stage: FailureStage,
        event: &ViolationEvent,
        failure: RetryFailure,
        now: DateTime<Utc>,
    ) {
        log::error!(
            "{:?} failed for driver {}: {}",
            stage,
            event.driver_id,
            failure
        );

        let letter = DeadLetter {
            id: Uuid::new_v4(),
            stage,
            driver_id: event.driver_id.clone(),
            event: Some(event.clone()),
            error: failure.error.to_string(),
            attempts: failure.attempts,
            failed_at: now,
        };
        let repo = Arc::clone(&self.dead_letters);
        let pushed = run_blocking(&self.retry, "dead letter push", move || repo.push(&letter)).await;
        if let Err(e) = pushed {
            log::error!(
                "dead letter for driver {} lost: {}",
                event.driver_id,
                e
            );
        }
    }
}
