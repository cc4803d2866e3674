//! Min-heap scheduling of job runs.

use crate::boss::JobBoss;
use crate::job::{Job, Tick, lock};
use std::cmp::{Ordering, Reverse};
use std::sync::Arc;
use std::sync::atomic::Ordering as AtomicOrdering;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A job due at `at`. Ties run in insertion order.
#[derive(Debug)]
pub(crate) struct Scheduled {
    at: Instant,
    sequence: u64,
    job: Arc<Job>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl JobBoss {
    /// Starts the scheduler loop on the current runtime.
    ///
    /// Returns `None` if the scheduler is already running.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.shared.started.swap(true, AtomicOrdering::AcqRel) {
            return None;
        }
        let boss = self.clone();
        Some(tokio::spawn(async move { boss.run_scheduler().await }))
    }

    /// Stops the scheduler and requests cancellation of every registered job.
    ///
    /// Jobs stay registered; executions already in flight stop at their next
    /// checkpoint, and runs still waiting in `Standby` are cancelled outright.
    ///
    /// After shutdown [`add_job`](Self::add_job) rejects every new job.
    pub fn shutdown(&self) {
        // Flipped under the jobs lock so add_job either sees the flag or
        // inserts a job this loop then cancels.
        let jobs = lock(&self.shared.jobs);
        self.shared.shutdown.cancel();
        for job in jobs.values() {
            let token = job.token();
            token.request_cancel();
            token.cancel_pending();
        }
        drop(jobs);
        tracing::info!("scheduler shutting down");
    }

    /// Returns true once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub(crate) fn schedule_at(&self, job: Arc<Job>, at: Instant) {
        job.set_next_run(Some(at));
        let sequence = self.shared.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        lock(&self.shared.schedule).push(Reverse(Scheduled { at, sequence, job }));
        self.shared.wake.notify_one();
    }

    async fn run_scheduler(self) {
        tracing::debug!("scheduler started");
        loop {
            let next = self.dispatch_due();
            tokio::select! {
                () = self.shared.shutdown.cancelled() => break,
                () = self.shared.wake.notified() => {}
                () = sleep_until(next) => {}
            }
        }
        tracing::debug!("scheduler stopped");
    }

    /// Dispatches every due entry and returns when the next one is due.
    fn dispatch_due(&self) -> Option<Instant> {
        let now = Instant::now();
        let mut due = Vec::new();
        {
            let mut schedule = lock(&self.shared.schedule);
            while schedule.peek().is_some_and(|Reverse(entry)| entry.at <= now) {
                if let Some(Reverse(entry)) = schedule.pop() {
                    due.push(entry);
                }
            }
        }

        for entry in due {
            self.dispatch(entry.job);
        }

        // Read after dispatching so re-armed recurring jobs are included.
        lock(&self.shared.schedule)
            .peek()
            .map(|Reverse(entry)| entry.at)
    }

    fn dispatch(&self, job: Arc<Job>) {
        if job.is_removed() || self.is_shut_down() {
            return;
        }

        if let Some(interval) = job.interval() {
            self.schedule_at(Arc::clone(&job), Instant::now() + interval);
        } else {
            job.set_next_run(None);
        }

        let token = match job.begin_tick() {
            Tick::Run(token) => token,
            Tick::Busy => {
                tracing::debug!(job = %job.id(), "previous run still active, skipping tick");
                return;
            }
            Tick::Skip => {
                tracing::debug!(job = %job.id(), "job disabled or removed, skipping tick");
                return;
            }
        };

        let boss = self.clone();
        tokio::spawn(async move { boss.execute(job, token).await });
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobTask;
    use crate::testing::{FakeConnector, manga};
    use std::time::Duration;
    use tankobon_connectors::ConnectorRegistry;
    use tankobon_types::Settings;
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
    fn test_scheduled_orders_by_time_then_sequence() {
        let job = Arc::new(Job::new(
            monitor(Duration::from_secs(1)),
            Arc::new(FakeConnector::default()),
        ));
        let now = Instant::now();
        let early = Scheduled {
            at: now,
            sequence: 5,
            job: Arc::clone(&job),
        };
        let tie = Scheduled {
            at: now,
            sequence: 6,
            job: Arc::clone(&job),
        };
        let late = Scheduled {
            at: now + Duration::from_secs(1),
            sequence: 0,
            job,
        };
        assert!(early < tie);
        assert!(tie < late);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_reruns_from_start_of_previous_run() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeConnector::default());
        let boss = boss_with(Arc::clone(&fake), &dir);
        boss.start().unwrap();

        boss.add_job(monitor(Duration::from_secs(10))).unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(fake.list_calls(), 3);

        boss.remove_jobs_where(|_| true);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fake.list_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_tick_is_skipped() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeConnector {
            list_delay: Duration::from_secs(15),
            ..FakeConnector::default()
        });
        let boss = boss_with(Arc::clone(&fake), &dir);
        boss.start().unwrap();

        boss.add_job(monitor(Duration::from_secs(10))).unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;
        // Runs at 0s and 20s; the 10s tick found the first run still going.
        assert_eq!(fake.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_monitor_skips_ticks() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeConnector::default());
        let boss = boss_with(Arc::clone(&fake), &dir);
        boss.start().unwrap();

        let id = boss.add_job(monitor(Duration::from_secs(10))).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fake.list_calls(), 1);

        boss.set_enabled(id, false);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fake.list_calls(), 1);
        assert!(boss.get(id).unwrap().next_run().is_some());

        boss.set_enabled(id, true);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fake.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);

        let handle = boss.start().unwrap();
        assert!(boss.start().is_none());

        boss.shutdown();
        handle.await.unwrap();
        assert!(boss.is_shut_down());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_queued_runs() {
        let dir = TempDir::new().unwrap();
        let boss = boss_with(Arc::new(FakeConnector::default()), &dir);

        let id = boss
            .add_job(JobTask::DownloadNewChapters { manga: manga() })
            .unwrap();
        let token = boss.get(id).unwrap().token();

        boss.shutdown();
        assert_eq!(token.state(), tankobon_types::TokenState::Cancelled);
        assert!(boss.get(id).is_some());
    }

    #[tokio::test]
    async fn test_add_after_shutdown_is_rejected() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeConnector::default());
        let boss = boss_with(Arc::clone(&fake), &dir);
        let handle = boss.start().unwrap();

        boss.shutdown();
        handle.await.unwrap();

        let result = boss.add_job(JobTask::DownloadNewChapters { manga: manga() });
        assert!(matches!(result, Err(crate::JobError::ShutDown)));
        assert!(boss.jobs().is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fake.list_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_during_shutdown_never_run() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeConnector::default());
        let boss = boss_with(Arc::clone(&fake), &dir);

        let adders: Vec<_> = (1..=8)
            .map(|n| {
                let boss = boss.clone();
                tokio::spawn(async move {
                    let task = JobTask::DownloadChapter {
                        chapter: crate::testing::chapter(&n.to_string()),
                    };
                    boss.add_job(task)
                })
            })
            .collect();
        boss.shutdown();

        for adder in adders {
            match adder.await.unwrap() {
                Ok(id) => {
                    // Accepted before the flag flipped, so shutdown cancelled it.
                    let token = boss.get(id).unwrap().token();
                    assert_eq!(token.state(), tankobon_types::TokenState::Cancelled);
                }
                Err(e) => assert!(matches!(e, crate::JobError::ShutDown)),
            }
        }

        boss.start().unwrap().await.unwrap();
        assert_eq!(fake.downloads(), 0);
    }
}
