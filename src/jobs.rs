//! Background rendering jobs keyed by request id.
//!
//! A submitted job runs on the tokio runtime while callers poll [`JobRegistry::status`].
//! Finished records stay until their result is taken or [`JobRegistry::purge_finished`] drops
//! them; nothing expires on its own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::foundation::error::{INTERNAL_ERROR, ReelError, ReelResult};
use crate::pipeline::{DialogueRenderer, DialogueRequest, RenderedVideo, new_request_id};

/// Lifecycle of a background job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, not started yet.
    Queued,
    /// In progress.
    Running,
    /// Finished with a result.
    Succeeded,
    /// Finished with an error, or panicked.
    Failed,
}

impl JobState {
    /// Whether the job reached a terminal state.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Pollable view of a job.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct JobStatus {
    /// Job id.
    pub id: String,
    /// Current state.
    pub state: JobState,
    /// Caller-safe failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether a result is waiting to be taken.
    pub has_result: bool,
}

struct JobRecord<T> {
    state: JobState,
    error: Option<String>,
    result: Option<T>,
    finished_at: Option<Instant>,
}

/// Registry of background jobs producing `T`.
pub struct JobRegistry<T> {
    jobs: Arc<Mutex<HashMap<String, JobRecord<T>>>>,
}

impl<T> Clone for JobRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
        }
    }
}

impl<T> Default for JobRegistry<T> {
    fn default() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Send + 'static> JobRegistry<T> {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JobRecord<T>>> {
        lock(&self.jobs)
    }

    /// Queue `job` under `id` and spawn it. Ids must be unique among live records.
    pub fn submit<F>(&self, id: impl Into<String>, job: F) -> ReelResult<()>
    where
        F: Future<Output = ReelResult<T>> + Send + 'static,
    {
        let id = id.into();
        {
            let mut jobs = self.lock();
            if jobs.contains_key(&id) {
                return Err(ReelError::validation(format!("job '{id}' already exists")));
            }
            jobs.insert(
                id.clone(),
                JobRecord {
                    state: JobState::Queued,
                    error: None,
                    result: None,
                    finished_at: None,
                },
            );
        }
        tracing::info!(job = %id, state = ?JobState::Queued, "job transition");

        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            transition(&jobs, &id, JobState::Running, |_| {});
            // The job runs in its own task so a panic is observed here as a JoinError.
            match tokio::spawn(job).await {
                Ok(Ok(value)) => transition(&jobs, &id, JobState::Succeeded, |r| {
                    r.result = Some(value);
                }),
                Ok(Err(err)) => {
                    tracing::warn!(job = %id, error = %err, "job failed");
                    let message = err.public_message();
                    transition(&jobs, &id, JobState::Failed, |r| r.error = Some(message));
                }
                Err(join) => {
                    tracing::error!(job = %id, error = %join, "job aborted");
                    transition(&jobs, &id, JobState::Failed, |r| {
                        r.error = Some(INTERNAL_ERROR.to_string());
                    });
                }
            }
        });
        Ok(())
    }

    /// Current view of job `id`, if it is known.
    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.lock().get(id).map(|r| JobStatus {
            id: id.to_string(),
            state: r.state,
            error: r.error.clone(),
            has_result: r.result.is_some(),
        })
    }

    /// Remove a succeeded job and hand out its result.
    pub fn take_result(&self, id: &str) -> Option<T> {
        let mut jobs = self.lock();
        if jobs.get(id)?.state != JobState::Succeeded {
            return None;
        }
        jobs.remove(id).and_then(|r| r.result)
    }

    /// Drop finished records older than `max_age`. Returns how many were removed.
    pub fn purge_finished(&self, max_age: Duration) -> usize {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, r| match r.finished_at {
            Some(at) => at.elapsed() < max_age,
            None => true,
        });
        let purged = before - jobs.len();
        if purged > 0 {
            tracing::info!(purged, remaining = jobs.len(), "purged finished jobs");
        }
        purged
    }

    /// Number of records, finished or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobRegistry<RenderedVideo> {
    /// Render `req` in the background under a fresh request id, which is returned.
    pub fn submit_render(
        &self,
        renderer: Arc<DialogueRenderer>,
        req: DialogueRequest,
    ) -> ReelResult<String> {
        req.validate()?;
        let id = new_request_id();
        let job_id = id.clone();
        self.submit(id.clone(), async move { renderer.render(&req, &job_id).await })?;
        Ok(id)
    }
}

fn lock<T>(jobs: &Mutex<HashMap<String, JobRecord<T>>>) -> MutexGuard<'_, HashMap<String, JobRecord<T>>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transition<T>(
    jobs: &Mutex<HashMap<String, JobRecord<T>>>,
    id: &str,
    state: JobState,
    update: impl FnOnce(&mut JobRecord<T>),
) {
    let mut jobs = lock(jobs);
    // Purged while running: nothing left to update.
    let Some(record) = jobs.get_mut(id) else {
        return;
    };
    record.state = state;
    if state.is_finished() {
        record.finished_at = Some(Instant::now());
    }
    update(record);
    tracing::info!(job = %id, ?state, "job transition");
}

#[cfg(test)]
#[path = "../tests/unit/jobs.rs"]
mod tests;
