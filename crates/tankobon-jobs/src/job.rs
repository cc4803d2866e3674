//! Registered jobs and their point-in-time views.

use crate::key::{JobId, JobKey, JobKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tankobon_connectors::Connector;
use tankobon_types::{Chapter, Manga, ProgressToken, TokenState};
use tokio::time::Instant;

/// The work a job performs.
#[derive(Debug, Clone, PartialEq)]
pub enum JobTask {
    /// Download one chapter into its archive.
    DownloadChapter {
        /// The chapter to download.
        chapter: Chapter,
    },
    /// List the manga's chapters and queue a [`JobTask::DownloadChapter`] for each new one.
    DownloadNewChapters {
        /// The manga to check.
        manga: Manga,
    },
    /// Run [`JobTask::DownloadNewChapters`] every `interval` until removed.
    MonitorManga {
        /// The manga to monitor.
        manga: Manga,
        /// Time between the starts of two runs.
        interval: Duration,
    },
}

impl JobTask {
    /// Returns the job kind.
    #[must_use]
    pub const fn kind(&self) -> JobKind {
        match self {
            Self::DownloadChapter { .. } => JobKind::DownloadChapter,
            Self::DownloadNewChapters { .. } => JobKind::DownloadNewChapters,
            Self::MonitorManga { .. } => JobKind::MonitorManga,
        }
    }

    /// Returns the manga the job targets.
    #[must_use]
    pub const fn manga(&self) -> &Manga {
        match self {
            Self::DownloadChapter { chapter } => &chapter.manga,
            Self::DownloadNewChapters { manga } | Self::MonitorManga { manga, .. } => manga,
        }
    }

    /// Returns the recurrence interval of recurring tasks.
    #[must_use]
    pub const fn interval(&self) -> Option<Duration> {
        match self {
            Self::MonitorManga { interval, .. } => Some(*interval),
            _ => None,
        }
    }

    /// Returns the dedup key.
    #[must_use]
    pub fn key(&self) -> JobKey {
        match self {
            Self::DownloadChapter { chapter } => {
                JobKey::chapter(&chapter.manga.id, chapter.number.clone())
            }
            _ => JobKey::manga(self.kind(), &self.manga().id),
        }
    }

    /// Short human-readable description.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::DownloadChapter { chapter } => chapter.to_string(),
            Self::DownloadNewChapters { manga } | Self::MonitorManga { manga, .. } => {
                manga.title.clone()
            }
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of preparing a job for one scheduled run.
#[derive(Debug)]
pub(crate) enum Tick {
    /// Run with this token.
    Run(Arc<ProgressToken>),
    /// The previous run is still going.
    Busy,
    /// The job was removed or disabled.
    Skip,
}

/// A job registered with [`JobBoss`](crate::JobBoss).
///
/// One-shot jobs own a single [`ProgressToken`]. Recurring jobs get a fresh
/// token for every run; [`token`](Self::token) always returns the current one.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    key: JobKey,
    task: JobTask,
    connector: Arc<dyn Connector>,
    token: Mutex<Arc<ProgressToken>>,
    enabled: AtomicBool,
    removed: AtomicBool,
    created_at: DateTime<Utc>,
    last_run: Mutex<Option<DateTime<Utc>>>,
    next_run: Mutex<Option<Instant>>,
}

impl Job {
    pub(crate) fn new(task: JobTask, connector: Arc<dyn Connector>) -> Self {
        let key = task.key();
        Self {
            id: key.id(),
            key,
            task,
            connector,
            token: Mutex::new(Arc::new(ProgressToken::new())),
            enabled: AtomicBool::new(true),
            removed: AtomicBool::new(false),
            created_at: Utc::now(),
            last_run: Mutex::new(None),
            next_run: Mutex::new(None),
        }
    }

    /// Returns the job id.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the dedup key.
    #[must_use]
    pub const fn key(&self) -> &JobKey {
        &self.key
    }

    /// Returns the task.
    #[must_use]
    pub const fn task(&self) -> &JobTask {
        &self.task
    }

    /// Returns the job kind.
    #[must_use]
    pub const fn kind(&self) -> JobKind {
        self.key.kind
    }

    /// Returns the connector the job runs against.
    #[must_use]
    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    /// Returns the token of the current or most recent run.
    #[must_use]
    pub fn token(&self) -> Arc<ProgressToken> {
        Arc::clone(&lock(&self.token))
    }

    /// Returns the recurrence interval of recurring jobs.
    #[must_use]
    pub const fn interval(&self) -> Option<Duration> {
        self.task.interval()
    }

    /// Returns false if scheduled runs are skipped.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns true once the job has been removed from its registry.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Returns true while the job blocks equivalent jobs from being added.
    ///
    /// Recurring jobs stay active until removed; one-shot jobs until their
    /// token reaches a terminal state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        if self.is_removed() {
            return false;
        }
        self.kind().is_recurring() || self.token().state().is_active()
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the start time of the most recent run.
    #[must_use]
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_run)
    }

    /// Returns when the job is next due, if it is scheduled.
    #[must_use]
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        let at = (*lock(&self.next_run))?;
        let remaining = at.saturating_duration_since(Instant::now());
        chrono::Duration::from_std(remaining)
            .ok()
            .map(|remaining| Utc::now() + remaining)
    }

    /// Returns a point-in-time view for listings.
    #[must_use]
    pub fn snapshot(&self) -> JobSnapshot {
        let progress = self.token().snapshot();
        JobSnapshot {
            id: self.id,
            key: self.key.clone(),
            title: self.task.title(),
            state: progress.state,
            progress: progress.progress,
            cancellation_requested: progress.cancellation_requested,
            interval_secs: self.interval().map(|i| i.as_secs()),
            enabled: self.is_enabled(),
            created_at: self.created_at,
            last_run: self.last_run(),
            next_run: self.next_run(),
        }
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn set_next_run(&self, at: Option<Instant>) {
        *lock(&self.next_run) = at;
    }

    pub(crate) fn record_start(&self) {
        *lock(&self.last_run) = Some(Utc::now());
    }

    /// Marks the job removed and requests cancellation of the current run.
    ///
    /// A run that has not started yet is cancelled outright.
    ///
    /// Serialized with [`begin_tick`](Self::begin_tick) through the token lock,
    /// so no run can start on a fresh token after removal.
    pub(crate) fn mark_removed(&self) {
        let token = lock(&self.token);
        self.removed.store(true, Ordering::Release);
        token.request_cancel();
        token.cancel_pending();
        drop(token);
        self.set_next_run(None);
    }

    /// Prepares the token for the next run.
    pub(crate) fn begin_tick(&self) -> Tick {
        let mut token = lock(&self.token);
        if self.is_removed() {
            return Tick::Skip;
        }
        if !self.kind().is_recurring() {
            return Tick::Run(Arc::clone(&token));
        }
        if !self.is_enabled() {
            return Tick::Skip;
        }
        match token.state() {
            TokenState::Running => Tick::Busy,
            TokenState::Standby => Tick::Run(Arc::clone(&token)),
            TokenState::Complete | TokenState::Cancelled => {
                *token = Arc::new(ProgressToken::new());
                Tick::Run(Arc::clone(&token))
            }
        }
    }
}

/// Point-in-time view of a [`Job`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    /// Job id.
    pub id: JobId,
    /// Dedup key.
    pub key: JobKey,
    /// Human-readable description.
    pub title: String,
    /// State of the current or most recent run.
    pub state: TokenState,
    /// Progress of the current or most recent run.
    pub progress: f64,
    /// Whether cancellation of the current run was requested.
    pub cancellation_requested: bool,
    /// Recurrence interval in seconds, for recurring jobs.
    pub interval_secs: Option<u64>,
    /// Whether scheduled runs execute.
    pub enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Start time of the most recent run.
    pub last_run: Option<DateTime<Utc>>,
    /// Next due time, if scheduled.
    pub next_run: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, chapter, manga};

    fn monitor() -> Job {
        Job::new(
            JobTask::MonitorManga {
                manga: manga(),
                interval: Duration::from_secs(60),
            },
            Arc::new(FakeConnector::default()),
        )
    }

    #[test]
    fn test_task_key_and_kind() {
        let task = JobTask::DownloadChapter {
            chapter: chapter("10.5"),
        };
        assert_eq!(task.kind(), JobKind::DownloadChapter);
        assert_eq!(task.key().chapter.unwrap().to_string(), "10.5");
        assert_eq!(task.interval(), None);
        assert_eq!(task.manga().publication_id(), "t-1");
    }

    #[test]
    fn test_recurring_job_gets_fresh_token_after_run() {
        let job = monitor();
        let Tick::Run(first) = job.begin_tick() else {
            panic!("expected run");
        };
        assert!(first.start());
        assert!(matches!(job.begin_tick(), Tick::Busy));

        first.complete();
        let Tick::Run(second) = job.begin_tick() else {
            panic!("expected run");
        };
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.state(), TokenState::Standby);
        assert!(job.is_active());
    }

    #[test]
    fn test_removed_job_never_runs() {
        let job = monitor();
        let token = job.token();
        job.mark_removed();

        assert!(token.is_cancellation_requested());
        assert_eq!(token.state(), TokenState::Cancelled);
        assert!(matches!(job.begin_tick(), Tick::Skip));
        assert!(!job.is_active());
    }

    #[test]
    fn test_disabled_recurring_job_skips() {
        let job = monitor();
        job.set_enabled(false);
        assert!(matches!(job.begin_tick(), Tick::Skip));
        job.set_enabled(true);
        assert!(matches!(job.begin_tick(), Tick::Run(_)));
    }

    #[test]
    fn test_one_shot_inactive_once_finished() {
        let job = Job::new(
            JobTask::DownloadChapter {
                chapter: chapter("1"),
            },
            Arc::new(FakeConnector::default()),
        );
        assert!(job.is_active());
        job.token().cancel();
        assert!(!job.is_active());
    }

    #[test]
    fn test_snapshot_serializes() {
        let job = monitor();
        let snapshot = job.snapshot();
        assert_eq!(snapshot.interval_secs, Some(60));
        assert_eq!(snapshot.state, TokenState::Standby);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["key"]["kind"], "monitor_manga");
        assert_eq!(json["state"], "standby");
    }
}
