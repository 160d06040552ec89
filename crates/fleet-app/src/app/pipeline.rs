//! Telemetry pipeline - readings in, violations and scores out
//!
//! Work is sharded by driver id onto bounded channels, one worker task per
//! shard. All events of one driver therefore go through the same worker in
//! submission order, while different drivers proceed in parallel. A full
//! channel makes the submitter wait.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use fleet_domain::service::evaluate;
use fleet_types::{Error, TelemetryReading, ViolationEvent};

use super::recorder::{RecordOutcome, ViolationRecorder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub workers: usize,
    pub channel_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            channel_capacity: 1024,
        }
    }
}

/// Errors raised to pipeline callers
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Pipeline is shut down")]
    Closed,

    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

impl From<Error> for PipelineError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidReading(msg) => PipelineError::InvalidReading(msg),
            _ => PipelineError::WorkerFailed(err.to_string()),
        }
    }
}

/// A unit of work for a shard
#[derive(Debug)]
pub enum Work {
    Reading(TelemetryReading),
    Event(ViolationEvent),
}

impl Work {
    fn driver_id(&self) -> &str {
        match self {
            Work::Reading(r) => &r.driver_id,
            Work::Event(e) => &e.driver_id,
        }
    }
}

/// Counters accumulated since the pipeline started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub readings_processed: u64,
    pub events_detected: u64,
    pub violations_recorded: u64,
    pub duplicates: u64,
    pub dead_lettered: u64,
    pub scores_updated: u64,
}

#[derive(Default)]
struct Counters {
    readings_processed: AtomicU64,
    events_detected: AtomicU64,
    violations_recorded: AtomicU64,
    duplicates: AtomicU64,
    dead_lettered: AtomicU64,
    scores_updated: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            readings_processed: self.readings_processed.load(Ordering::Relaxed),
            events_detected: self.events_detected.load(Ordering::Relaxed),
            violations_recorded: self.violations_recorded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            scores_updated: self.scores_updated.load(Ordering::Relaxed),
        }
    }
}

pub struct Pipeline {
    senders: Vec<mpsc::Sender<Work>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl Pipeline {
    /// Spawn the shard workers. Must be called inside a tokio runtime.
    pub fn start(recorder: Arc<ViolationRecorder>, settings: PipelineSettings) -> Self {
        let shards = settings.workers.max(1);
        let capacity = settings.channel_capacity.max(1);
        let counters = Arc::new(Counters::default());

        let mut senders = Vec::with_capacity(shards);
        let mut workers = Vec::with_capacity(shards);
        for shard in 0..shards {
            let (tx, rx) = mpsc::channel(capacity);
            senders.push(tx);
            workers.push(tokio::spawn(run_shard(
                shard,
                rx,
                Arc::clone(&recorder),
                Arc::clone(&counters),
            )));
        }

        log::info!("pipeline started: {} shards, capacity {}", shards, capacity);
        Self {
            senders,
            workers,
            counters,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.senders.len()
    }

    /// Shard that owns a driver
    pub fn shard_for(&self, driver_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        driver_id.hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    /// Validate a reading and queue it for evaluation
    pub async fn submit(&self, reading: TelemetryReading) -> Result<(), PipelineError> {
        reading.validate()?;
        self.dispatch(Work::Reading(reading)).await
    }

    /// Queue an already-detected event for recording
    pub async fn submit_event(&self, event: ViolationEvent) -> Result<(), PipelineError> {
        self.dispatch(Work::Event(event)).await
    }

    async fn dispatch(&self, work: Work) -> Result<(), PipelineError> {
        let shard = self.shard_for(work.driver_id());
        self.senders[shard]
            .send(work)
            .await
            .map_err(|_| PipelineError::Closed)
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Close the queues, wait for every worker to drain, and return the final counters
    pub async fn shutdown(self) -> Result<PipelineStats, PipelineError> {
        drop(self.senders);

        let mut failed = Vec::new();
        for (shard, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                failed.push(format!("shard {}: {}", shard, e));
            }
        }

        let stats = self.counters.snapshot();
        log::info!(
            "pipeline stopped: {} readings, {} violations, {} duplicates, {} dead-lettered",
            stats.readings_processed,
            stats.violations_recorded,
            stats.duplicates,
            stats.dead_lettered
        );

        if failed.is_empty() {
            Ok(stats)
        } else {
            Err(PipelineError::WorkerFailed(failed.join("; ")))
        }
    }
}

async fn run_shard(
    shard: usize,
    mut rx: mpsc::Receiver<Work>,
    recorder: Arc<ViolationRecorder>,
    counters: Arc<Counters>,
) {
    while let Some(work) = rx.recv().await {
        match work {
            Work::Reading(reading) => {
                Counters::bump(&counters.readings_processed, 1);
                let events = evaluate(&reading);
                Counters::bump(&counters.events_detected, events.len() as u64);
                for event in events {
                    record(&recorder, &counters, event).await;
                }
            }
            Work::Event(event) => record(&recorder, &counters, event).await,
        }
    }
    log::debug!("shard {} drained", shard);
}

async fn record(recorder: &ViolationRecorder, counters: &Counters, event: ViolationEvent) {
    match recorder.record(event).await {
        RecordOutcome::Recorded { .. } => {
            Counters::bump(&counters.violations_recorded, 1);
            Counters::bump(&counters.scores_updated, 1);
        }
        RecordOutcome::Duplicate { .. } => {
            Counters::bump(&counters.duplicates, 1);
            Counters::bump(&counters.scores_updated, 1);
        }
        RecordOutcome::DeadLettered { violation, .. } => {
            if violation.is_some() {
                Counters::bump(&counters.violations_recorded, 1);
            }
            Counters::bump(&counters.dead_lettered, 1);
        }
    }
}
