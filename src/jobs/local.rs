//! In-process job executor on tokio timers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::{debug, info, Instrument, info_span};
use uuid::Uuid;

use crate::jobs::sink::NotificationSink;
use crate::jobs::{ExistingJobPolicy, JobError, JobExecutor, JobRequest, NotificationJob};

#[derive(Debug)]
struct ActiveJob {
    job: NotificationJob,
    abort: AbortHandle,
}

/// Runs each job as a tokio task that sleeps for the requested delay.
///
/// Jobs live in a `DashMap` keyed by job key. Submitting under an existing
/// key aborts the old task and installs the new one while holding the map
/// entry, so observers never see zero or two jobs for the key. A firing task
/// removes its own entry only if the entry still belongs to its `run_id`, then
/// hands the job to the [`NotificationSink`].
///
/// Timers follow tokio's clock, so tests can drive them with
/// `tokio::time::pause` and `advance`.
#[derive(Debug)]
pub struct LocalJobExecutor {
    jobs: Arc<DashMap<String, ActiveJob>>,
    sink: Arc<dyn NotificationSink>,
    shut_down: AtomicBool,
}

impl LocalJobExecutor {
    /// Creates an executor that delivers fired jobs to `sink`.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            sink,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Number of active jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` when no job is active.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Aborts every active job and refuses further submissions.
    ///
    /// Returns the number of jobs aborted.
    pub fn shutdown(&self) -> usize {
        self.shut_down.store(true, Ordering::SeqCst);
        let keys: Vec<String> = self.jobs.iter().map(|entry| entry.key().clone()).collect();
        let mut aborted = 0;
        for key in keys {
            if let Some((_, active)) = self.jobs.remove(&key) {
                active.abort.abort();
                aborted += 1;
            }
        }
        info!(aborted, "job executor shut down");
        aborted
    }

    fn spawn(&self, job: NotificationJob, delay: std::time::Duration) -> AbortHandle {
        let jobs = Arc::clone(&self.jobs);
        let sink = Arc::clone(&self.sink);
        let span = info_span!("notification_job", key = %job.key, run_id = %job.run_id);
        let task = tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;
                let still_current = jobs
                    .remove_if(&job.key, |_, active| active.job.run_id == job.run_id)
                    .is_some();
                if still_current {
                    debug!("job fired");
                    sink.deliver(job).await;
                } else {
                    debug!("job superseded before firing");
                }
            }
            .instrument(span),
        );
        task.abort_handle()
    }
}

#[async_trait]
impl JobExecutor for LocalJobExecutor {
    async fn submit(&self, request: JobRequest) -> Result<NotificationJob, JobError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(JobError::ShutDown);
        }
        if request.key.is_empty() {
            return Err(JobError::Rejected {
                key: request.key,
                message: "empty job key".to_string(),
            });
        }

        let JobRequest {
            key,
            tag,
            fire_at,
            delay,
            payload,
            policy,
        } = request;
        let job = NotificationJob {
            key: key.clone(),
            tag,
            fire_at,
            payload,
            run_id: Uuid::new_v4(),
        };

        match self.jobs.entry(key) {
            Entry::Occupied(mut entry) => {
                if policy == ExistingJobPolicy::Keep {
                    return Ok(entry.get().job.clone());
                }
                entry.get().abort.abort();
                let abort = self.spawn(job.clone(), delay);
                debug!(key = %job.key, fire_at = %job.fire_at, "job replaced");
                entry.insert(ActiveJob {
                    job: job.clone(),
                    abort,
                });
            },
            Entry::Vacant(entry) => {
                let abort = self.spawn(job.clone(), delay);
                debug!(key = %job.key, fire_at = %job.fire_at, "job enqueued");
                entry.insert(ActiveJob {
                    job: job.clone(),
                    abort,
                });
            },
        }
        Ok(job)
    }

    async fn cancel_by_key(&self, key: &str) -> Result<bool, JobError> {
        match self.jobs.remove(key) {
            Some((_, active)) => {
                active.abort.abort();
                debug!(key, "job cancelled");
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn cancel_by_tag(&self, tag: &str) -> Result<usize, JobError> {
        let keys: Vec<String> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().job.tag == tag)
            .map(|entry| entry.key().clone())
            .collect();
        let mut cancelled = 0;
        for key in keys {
            if let Some((_, active)) = self.jobs.remove_if(&key, |_, active| active.job.tag == tag) {
                active.abort.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(tag, cancelled, "jobs cancelled by tag");
        }
        Ok(cancelled)
    }

    async fn active(&self, key: &str) -> Option<NotificationJob> {
        self.jobs.get(key).map(|entry| entry.value().job.clone())
    }

    async fn active_jobs(&self) -> Vec<NotificationJob> {
        self.jobs
            .iter()
            .map(|entry| entry.value().job.clone())
            .collect()
    }

    fn supports_atomic_replace(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PetId;
    use crate::jobs::sink::ChannelSink;
    use crate::jobs::NotificationPayload;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn request(key: &str, delay_secs: u64) -> JobRequest {
        JobRequest {
            key: key.to_string(),
            tag: format!("{key}-tag"),
            fire_at: Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap(),
            delay: Duration::from_secs(delay_secs),
            payload: NotificationPayload {
                title: "Walk".to_string(),
                body: String::new(),
                pet_id: PetId::new("P1"),
            },
            policy: ExistingJobPolicy::Replace,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_fires_after_delay_and_leaves_the_map() {
        let (sink, mut fired) = ChannelSink::new();
        let executor = LocalJobExecutor::new(Arc::new(sink));
        let job = executor.submit(request("reminder:1", 60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        tokio::task::yield_now().await;
        assert!(fired.try_recv().is_err());
        assert_eq!(executor.len(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let delivered = fired.recv().await.unwrap();
        assert_eq!(delivered.run_id, job.run_id);
        assert!(executor.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn replace_keeps_one_job_and_only_the_latest_fires() {
        let (sink, mut fired) = ChannelSink::new();
        let executor = LocalJobExecutor::new(Arc::new(sink));
        executor.submit(request("reminder:1", 10)).await.unwrap();
        let latest = executor.submit(request("reminder:1", 20)).await.unwrap();
        assert_eq!(executor.active_jobs().await.len(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        let delivered = fired.recv().await.unwrap();
        assert_eq!(delivered.run_id, latest.run_id);
        tokio::task::yield_now().await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn keep_policy_preserves_existing_job() {
        let executor = LocalJobExecutor::new(Arc::new(ChannelSink::new().0));
        let first = executor.submit(request("reminder:1", 10)).await.unwrap();
        let mut second = request("reminder:1", 99);
        second.policy = ExistingJobPolicy::Keep;
        assert_eq!(executor.submit(second).await.unwrap().run_id, first.run_id);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_by_key_and_tag() {
        let (sink, mut fired) = ChannelSink::new();
        let executor = LocalJobExecutor::new(Arc::new(sink));
        executor.submit(request("reminder:1", 10)).await.unwrap();
        executor.submit(request("reminder:2", 10)).await.unwrap();

        assert!(executor.cancel_by_key("reminder:1").await.unwrap());
        assert!(!executor.cancel_by_key("reminder:1").await.unwrap());
        assert_eq!(executor.cancel_by_tag("reminder:2-tag").await.unwrap(), 1);
        assert!(executor.is_empty());

        tokio::time::advance(Duration::from_secs(20)).await;
        tokio::task::yield_now().await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_aborts_and_refuses_work() {
        let executor = LocalJobExecutor::new(Arc::new(ChannelSink::new().0));
        executor.submit(request("reminder:1", 3600)).await.unwrap();
        assert_eq!(executor.shutdown(), 1);
        assert_eq!(
            executor.submit(request("reminder:2", 1)).await,
            Err(JobError::ShutDown)
        );
    }

    #[tokio::test]
    async fn empty_keys_are_rejected() {
        let executor = LocalJobExecutor::new(Arc::new(ChannelSink::new().0));
        assert!(matches!(
            executor.submit(request("", 1)).await,
            Err(JobError::Rejected { .. })
        ));
    }
}
