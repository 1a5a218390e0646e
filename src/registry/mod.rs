// Process-wide training job registry
use crate::models::{JobSnapshot, TrainingConfig, TrainingJob, TrainingMethod};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Buffered snapshots per job before slow subscribers start lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_MAX_RETAINED_JOBS: usize = 100;

struct JobEntry {
    job: TrainingJob,
    events: broadcast::Sender<JobSnapshot>,
}

/// A subscription to one job: the state at subscription time plus a stream
/// of every later snapshot.
pub struct JobSubscription {
    pub snapshot: JobSnapshot,
    pub updates: broadcast::Receiver<JobSnapshot>,
}

/// Mapping from job identifier to job record.
///
/// An explicit, injectable object: each engine (and each test) owns a fresh
/// instance instead of sharing process-global state. Structural changes and
/// field mutation go through one mutex, so readers always observe a
/// consistent snapshot. Each job is mutated only by the single pipeline
/// worker that owns it.
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, JobEntry>>,
    max_retained: usize,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_MAX_RETAINED_JOBS)
    }

    /// A registry that keeps at most `max_retained` jobs: once the cap is
    /// exceeded, the oldest terminal jobs are evicted at creation time.
    /// In-flight jobs are never evicted.
    pub fn with_retention(max_retained: usize) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            max_retained,
        }
    }

    /// Register a new job in status `pending` and return its initial
    /// snapshot.
    pub fn create(
        &self,
        wake_word: &str,
        method: TrainingMethod,
        config: TrainingConfig,
        author: &str,
        website: &str,
    ) -> JobSnapshot {
        let job = TrainingJob::new(wake_word, method, config, author, website);
        let snapshot = job.snapshot();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut jobs = self.jobs.lock();
        jobs.insert(job.id.clone(), JobEntry { job, events });
        self.evict_over_cap(&mut jobs);

        snapshot
    }

    pub fn get(&self, job_id: &str) -> Option<JobSnapshot> {
        let jobs = self.jobs.lock();
        jobs.get(job_id).map(|entry| entry.job.snapshot())
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.lock();
        let mut snapshots: Vec<JobSnapshot> =
            jobs.values().map(|entry| entry.job.snapshot()).collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    /// Current snapshot plus a stream of subsequent updates. Late
    /// subscribers get the latest state, not a replay of history.
    pub fn subscribe(&self, job_id: &str) -> Option<JobSubscription> {
        let jobs = self.jobs.lock();
        jobs.get(job_id).map(|entry| JobSubscription {
            snapshot: entry.job.snapshot(),
            updates: entry.events.subscribe(),
        })
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Apply a mutation, then broadcast the post-update snapshot built under
    /// the same lock. Only the progress reporter calls this.
    pub(crate) fn update<F>(&self, job_id: &str, mutate: F) -> Option<JobSnapshot>
    where
        F: FnOnce(&mut TrainingJob),
    {
        let mut jobs = self.jobs.lock();
        let entry = jobs.get_mut(job_id)?;
        mutate(&mut entry.job);
        let snapshot = entry.job.snapshot();
        // Nobody listening is fine.
        let _ = entry.events.send(snapshot.clone());
        Some(snapshot)
    }

    fn evict_over_cap(&self, jobs: &mut HashMap<String, JobEntry>) {
        while jobs.len() > self.max_retained {
            let oldest_terminal = jobs
                .values()
                .filter(|entry| entry.job.status.is_terminal())
                .min_by_key(|entry| entry.job.created_at)
                .map(|entry| entry.job.id.clone());

            match oldest_terminal {
                Some(id) => {
                    log::debug!("Evicting retained job {} past cap", id);
                    jobs.remove(&id);
                }
                // Every job over the cap is still in flight; never evict
                // those.
                None => break,
            }
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
