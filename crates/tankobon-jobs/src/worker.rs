//! Job execution bodies and the execution boundary.

use crate::boss::JobBoss;
use crate::error::{JobError, Result};
use crate::job::{Job, JobTask};
use crate::key::JobId;
use std::sync::Arc;
use tankobon_connectors::Connector;
use tankobon_fetch::StatusCode;
use tankobon_types::{Manga, ProgressToken, TokenState};

impl JobBoss {
    /// Runs one execution of `job` on `token`.
    ///
    /// Failures and panics of the task are contained here: they are logged
    /// and move the token to `Cancelled`.
    pub(crate) async fn execute(&self, job: Arc<Job>, token: Arc<ProgressToken>) {
        // Fails if the run was cancelled while queued or another dispatch of
        // the same token already started it.
        if !token.start() {
            tracing::debug!(job = %job.id(), state = %token.state(), "run not started");
            return;
        }

        job.record_start();
        tracing::info!(job = %job.id(), kind = %job.kind(), title = %job.task().title(), "job started");

        let boss = self.clone();
        let worker_job = Arc::clone(&job);
        let worker_token = Arc::clone(&token);
        let outcome =
            tokio::spawn(async move { boss.run_task(&worker_job, &worker_token).await }).await;

        match outcome {
            Ok(Ok(())) => {
                token.complete();
            }
            Ok(Err(JobError::Cancelled)) => {
                token.cancel();
                tracing::info!(job = %job.id(), "job cancelled");
            }
            Ok(Err(e)) => {
                token.cancel();
                tracing::warn!(job = %job.id(), error = %e, "job failed");
            }
            Err(e) => {
                token.cancel();
                tracing::error!(job = %job.id(), error = %e, "job panicked");
            }
        }

        self.finish(&job, &token).await;
    }

    async fn finish(&self, job: &Arc<Job>, token: &ProgressToken) {
        let state = token.state();
        tracing::info!(job = %job.id(), state = %state, progress = token.progress(), "job finished");

        if job.kind().is_recurring() || state != TokenState::Complete {
            return;
        }
        let JobTask::DownloadChapter { chapter } = job.task() else {
            self.retire(job);
            return;
        };
        self.record_seen(chapter);
        self.retire(job);
        // Sink failures are logged inside and never touch the job.
        self.shared.sinks.chapter_downloaded(chapter).await;
    }

    async fn run_task(&self, job: &Job, token: &ProgressToken) -> Result<()> {
        match job.task() {
            JobTask::DownloadChapter { chapter } => {
                token.checkpoint()?;
                let status = job.connector().download_chapter(chapter, token).await;
                if status.is_success() {
                    Ok(())
                } else if status == StatusCode::REQUEST_TIMEOUT && token.is_cancellation_requested()
                {
                    Err(JobError::Cancelled)
                } else {
                    Err(JobError::Download {
                        chapter: chapter.to_string(),
                        status,
                    })
                }
            }
            JobTask::DownloadNewChapters { manga } | JobTask::MonitorManga { manga, .. } => self
                .download_new_chapters(job.connector().as_ref(), manga, token)
                .await
                .map(|_| ()),
        }
    }

    /// Queues a chapter download for every chapter of `manga` not seen before.
    ///
    /// Chapters whose download is already active are skipped by dedup.
    /// Returns the ids of the queued jobs.
    pub(crate) async fn download_new_chapters(
        &self,
        connector: &dyn Connector,
        manga: &Manga,
        token: &ProgressToken,
    ) -> Result<Vec<JobId>> {
        token.checkpoint()?;
        let chapters = connector.list_chapters(manga).await;
        token.checkpoint()?;

        let mut new = Vec::with_capacity(chapters.len());
        for chapter in chapters {
            if !self.is_seen(&chapter).await {
                new.push(chapter);
            }
        }
        token.set_steps(new.len() as u64);

        let mut queued = Vec::new();
        for chapter in new {
            match self.add_job(JobTask::DownloadChapter { chapter }) {
                Ok(id) => queued.push(id),
                Err(JobError::AlreadyActive { id, .. }) => {
                    tracing::debug!(job = %id, "chapter download already active");
                }
                Err(JobError::ShutDown) => return Err(JobError::Cancelled),
                Err(e) => tracing::warn!(manga = %manga, error = %e, "failed to queue chapter"),
            }
            token.increment();
        }

        tracing::info!(manga = %manga, queued = queued.len(), "checked for new chapters");
        Ok(queued)
    }
}
