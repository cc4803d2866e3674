//! The job registry.

use crate::error::{JobError, Result};
use crate::job::{Job, JobSnapshot, JobTask, lock};
use crate::key::{JobFilter, JobId, JobKey};
use crate::scheduler::Scheduled;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};
use tankobon_connectors::{ConnectorRegistry, Sinks};
use tankobon_types::{Chapter, ChapterNumber, MangaId, Settings, TokenState};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Registry and scheduler for jobs.
///
/// Cloning is cheap; clones share the same registry. Jobs added before
/// [`start`](Self::start) wait in the schedule until the scheduler runs.
///
/// Every lock guards a single map or heap and is released before any
/// connector call, so a slow download never blocks scheduling.
#[derive(Debug, Clone)]
pub struct JobBoss {
    pub(crate) shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) settings: Arc<Settings>,
    pub(crate) connectors: ConnectorRegistry,
    pub(crate) sinks: Sinks,
    pub(crate) jobs: Mutex<HashMap<JobKey, Arc<Job>>>,
    pub(crate) schedule: Mutex<BinaryHeap<Reverse<Scheduled>>>,
    pub(crate) sequence: AtomicU64,
    pub(crate) wake: Notify,
    pub(crate) shutdown: CancellationToken,
    pub(crate) started: AtomicBool,
    /// Chapters whose download completed in this process.
    pub(crate) seen: Mutex<HashMap<MangaId, HashSet<ChapterNumber>>>,
}

impl JobBoss {
    /// Creates an idle registry using `settings` and the given connectors.
    #[must_use]
    pub fn new(settings: Arc<Settings>, connectors: ConnectorRegistry) -> Self {
        Self::with_sinks(settings, connectors, Sinks::default())
    }

    /// Creates an idle registry that reports every downloaded chapter to `sinks`.
    #[must_use]
    pub fn with_sinks(
        settings: Arc<Settings>,
        connectors: ConnectorRegistry,
        sinks: Sinks,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                connectors,
                sinks,
                jobs: Mutex::new(HashMap::new()),
                schedule: Mutex::new(BinaryHeap::new()),
                sequence: AtomicU64::new(0),
                wake: Notify::new(),
                shutdown: CancellationToken::new(),
                started: AtomicBool::new(false),
                seen: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the application settings.
    #[must_use]
    pub fn settings(&self) -> &Arc<Settings> {
        &self.shared.settings
    }

    /// Returns the connector registry.
    #[must_use]
    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.shared.connectors
    }

    /// Registers a job and schedules its first run immediately.
    ///
    /// The connector is resolved from the target manga's connector name. A
    /// terminal job with the same key is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::ShutDown`] once [`shutdown`](Self::shutdown) was
    /// called, [`JobError::AlreadyActive`] if an equivalent job is standing by
    /// or running, and [`JobError::UnknownConnector`] if no connector matches.
    pub fn add_job(&self, task: JobTask) -> Result<JobId> {
        let connector_name = task.manga().connector();
        let connector = self
            .shared
            .connectors
            .get(connector_name)
            .ok_or_else(|| JobError::UnknownConnector(connector_name.to_string()))?;

        let job = Arc::new(Job::new(task, connector));
        {
            let mut jobs = lock(&self.shared.jobs);
            if self.shared.shutdown.is_cancelled() {
                tracing::debug!(key = %job.key(), "rejected job after shutdown");
                return Err(JobError::ShutDown);
            }
            if let Some(existing) = jobs.get(job.key())
                && existing.is_active()
            {
                tracing::debug!(job = %existing.id(), key = %job.key(), "rejected duplicate job");
                return Err(JobError::AlreadyActive {
                    id: existing.id(),
                    key: job.key().clone(),
                });
            }
            jobs.insert(job.key().clone(), Arc::clone(&job));
        }

        tracing::info!(job = %job.id(), key = %job.key(), "job added");
        let id = job.id();
        self.schedule_at(job, Instant::now());
        Ok(id)
    }

    /// Returns the registered job with `id`.
    #[must_use]
    pub fn get(&self, id: JobId) -> Option<Arc<Job>> {
        lock(&self.shared.jobs)
            .values()
            .find(|job| job.id() == id)
            .cloned()
    }

    /// Returns every registered job whose key matches `filter`.
    #[must_use]
    pub fn jobs_like(&self, filter: &JobFilter) -> Vec<Arc<Job>> {
        let mut jobs: Vec<_> = lock(&self.shared.jobs)
            .values()
            .filter(|job| filter.matches(job.key()))
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.created_at());
        jobs
    }

    /// Returns a view of every registered job, oldest first.
    #[must_use]
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.jobs_like(&JobFilter::new())
            .iter()
            .map(|job| job.snapshot())
            .collect()
    }

    /// Returns a view of the jobs whose current run is executing.
    #[must_use]
    pub fn running_jobs(&self) -> Vec<JobSnapshot> {
        self.jobs_in(TokenState::Running)
    }

    /// Returns a view of the jobs waiting for their run to start.
    #[must_use]
    pub fn standby_jobs(&self) -> Vec<JobSnapshot> {
        self.jobs_in(TokenState::Standby)
    }

    fn jobs_in(&self, state: TokenState) -> Vec<JobSnapshot> {
        self.jobs()
            .into_iter()
            .filter(|job| job.state == state)
            .collect()
    }

    /// Removes the job with `id`, requesting cancellation of its current run.
    ///
    /// Returns false if no such job is registered.
    pub fn remove_job(&self, id: JobId) -> bool {
        !self.remove_jobs_where(|job| job.id() == id).is_empty()
    }

    /// Removes every job whose key matches `filter`.
    ///
    /// Returns the ids of the removed jobs.
    pub fn remove_jobs(&self, filter: &JobFilter) -> Vec<JobId> {
        self.remove_jobs_where(|job| filter.matches(job.key()))
    }

    /// Removes every job matching `predicate`, whatever its state.
    ///
    /// Running executions are asked to cancel and stop at their next
    /// checkpoint; recurring jobs are not scheduled again. Removing jobs that
    /// are not registered is a no-op.
    pub fn remove_jobs_where(&self, predicate: impl Fn(&Job) -> bool) -> Vec<JobId> {
        let removed: Vec<Arc<Job>> = {
            let mut jobs = lock(&self.shared.jobs);
            let keys: Vec<JobKey> = jobs
                .iter()
                .filter(|(_, job)| predicate(job))
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| jobs.remove(key)).collect()
        };

        for job in &removed {
            job.mark_removed();
            tracing::info!(job = %job.id(), key = %job.key(), "job removed");
        }
        removed.iter().map(|job| job.id()).collect()
    }

    /// Enables or disables the scheduled runs of a recurring job.
    ///
    /// Returns false if no such job is registered.
    pub fn set_enabled(&self, id: JobId, enabled: bool) -> bool {
        let Some(job) = self.get(id) else {
            return false;
        };
        job.set_enabled(enabled);
        tracing::info!(job = %id, enabled, "job toggled");
        true
    }

    /// Returns true if `chapter` was downloaded by this process or exists on disk.
    pub async fn is_seen(&self, chapter: &Chapter) -> bool {
        if self.is_recorded(chapter) {
            return true;
        }
        let path = chapter.archive_path(&self.shared.settings.download_location);
        tokio::fs::metadata(&path)
            .await
            .is_ok_and(|metadata| metadata.is_file())
    }

    fn is_recorded(&self, chapter: &Chapter) -> bool {
        lock(&self.shared.seen)
            .get(&chapter.manga.id)
            .is_some_and(|numbers| numbers.contains(&chapter.number))
    }

    pub(crate) fn record_seen(&self, chapter: &Chapter) {
        lock(&self.shared.seen)
            .entry(chapter.manga.id.clone())
            .or_default()
            .insert(chapter.number.clone());
    }

    /// Drops a finished one-shot job, unless the key was already reused.
    pub(crate) fn retire(&self, job: &Arc<Job>) {
        let mut jobs = lock(&self.shared.jobs);
        if jobs
            .get(job.key())
            .is_some_and(|current| Arc::ptr_eq(current, job))
        {
            jobs.remove(job.key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::JobKind;
    use crate::testing::{FAKE, FakeConnector, chapter, manga};
    use std::time::Duration;
    use tempfile::TempDir;

    fn boss_with(fake: Arc<FakeConnector>, dir: &TempDir) -> JobBoss {
        let mut connectors = ConnectorRegistry::new();
        connectors.register(fake);
        let settings = Settings::default().with_download_location(dir.path());
        JobBoss::new(Arc::new(settings), connectors)
    }

    fn monitor(interval: Duration) -> JobTask {
        JobTask::MonitorManga {
            manga: manga(),
            interval,
        }
    }

    #[test]
    fn test_monitor_add_reject_remove() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);

        let id = boss.add_job(monitor(Duration::from_secs(3600))).unwrap();
        let token = boss.get(id).unwrap().token();

        match boss.add_job(monitor(Duration::from_secs(3600))) {
            Err(JobError::AlreadyActive { id: existing, .. }) => assert_eq!(existing, id),
            other => panic!("expected conflict, got {other:?}"),
        }

        let filter = JobFilter::new().connector(FAKE).target("t-1");
        assert_eq!(boss.jobs_like(&filter).len(), 1);

        assert_eq!(boss.remove_jobs(&filter), vec![id]);
        assert!(token.is_cancellation_requested());
        assert!(boss.jobs_like(&filter).is_empty());

        assert!(boss.remove_jobs(&filter).is_empty());
        assert!(!boss.remove_job(id));
    }

    #[test]
    fn test_removed_key_can_be_added_again() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);

        let id = boss.add_job(monitor(Duration::from_secs(60))).unwrap();
        assert!(boss.remove_job(id));
        assert_eq!(boss.add_job(monitor(Duration::from_secs(60))).unwrap(), id);
    }

    #[test]
    fn test_equivalent_chapter_numbers_collide() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);

        boss.add_job(JobTask::DownloadChapter {
            chapter: chapter("10.50"),
        })
        .unwrap();
        let duplicate = boss.add_job(JobTask::DownloadChapter {
            chapter: chapter("10.5"),
        });
        assert!(matches!(duplicate, Err(JobError::AlreadyActive { .. })));

        boss.add_job(JobTask::DownloadChapter {
            chapter: chapter("11"),
        })
        .unwrap();
        assert_eq!(boss.standby_jobs().len(), 2);
        assert!(boss.running_jobs().is_empty());
    }

    #[test]
    fn test_terminal_one_shot_is_replaced() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);
        let task = JobTask::DownloadChapter {
            chapter: chapter("1"),
        };

        let id = boss.add_job(task.clone()).unwrap();
        let first = boss.get(id).unwrap();
        first.token().cancel();

        assert_eq!(boss.add_job(task).unwrap(), id);
        let second = boss.get(id).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        boss.retire(&first);
        assert!(boss.get(id).is_some());
    }

    #[test]
    fn test_unknown_connector() {
        let dir = TempDir::new().unwrap();
        let boss = JobBoss::new(
            Arc::new(Settings::default().with_download_location(dir.path())),
            ConnectorRegistry::new(),
        );
        let result = boss.add_job(monitor(Duration::from_secs(60)));
        assert!(matches!(result, Err(JobError::UnknownConnector(name)) if name == FAKE));
    }

    #[test]
    fn test_set_enabled() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);
        let id = boss.add_job(monitor(Duration::from_secs(60))).unwrap();

        assert!(boss.set_enabled(id, false));
        assert!(!boss.jobs()[0].enabled);
        assert!(!boss.set_enabled(JobKey::manga(JobKind::DownloadNewChapters, &manga().id).id(), true));
    }

    #[tokio::test]
    async fn test_seen_from_ledger_and_disk() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);

        let one = chapter("1");
        let two = chapter("2");
        assert!(!boss.is_seen(&one).await);

        boss.record_seen(&one);
        assert!(boss.is_seen(&one).await);

        let path = two.archive_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"cbz").unwrap();
        assert!(boss.is_seen(&two).await);

        // A directory in the archive's place does not count.
        let three = chapter("3");
        std::fs::create_dir_all(three.archive_path(dir.path())).unwrap();
        assert!(!boss.is_seen(&three).await);
    }
}
