//! Download command implementation.
//!
//! Queues one chapter download job per selected chapter on a local
//! [`JobBoss`] and follows the jobs' progress tokens until every job is
//! complete or cancelled.

use super::{App, fetch_manga};
use crate::display::{PROGRESS_SCALE, chapter_style};
use anyhow::{Context, Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::sync::Arc;
use std::time::Duration;
use tankobon_lib::prelude::*;

const REFRESH: Duration = Duration::from_millis(200);

struct Tracked {
    label: String,
    token: Arc<ProgressToken>,
    bar: ProgressBar,
}

/// Download the selected chapters of the manga at `url`.
///
/// With no selection, every chapter that is not yet on disk is downloaded.
pub(crate) async fn download(
    app: &App,
    connector_name: &str,
    url: &str,
    selected: &[String],
    force: bool,
) -> Result<()> {
    let boss = app.job_boss()?;
    let connector = boss
        .connectors()
        .get(connector_name)
        .with_context(|| format!("Unknown connector: {connector_name}"))?;

    let wanted = selected
        .iter()
        .map(|s| ChapterNumber::parse(s).with_context(|| format!("Invalid chapter number: {s}")))
        .collect::<Result<Vec<_>>>()?;

    let manga = fetch_manga(connector.as_ref(), url).await?;
    let chapters = connector.list_chapters(&manga).await;

    for number in &wanted {
        if !chapters.iter().any(|c| &c.number == number) {
            eprintln!("Chapter {number} not found for {}", manga.title);
        }
    }

    let mut pending = Vec::new();
    for chapter in chapters {
        if !wanted.is_empty() && !wanted.contains(&chapter.number) {
            continue;
        }
        if force || !boss.is_seen(&chapter).await {
            pending.push(chapter);
        }
    }
    let chapters = pending;

    if chapters.is_empty() {
        if !app.quiet {
            println!("Nothing to download for {}.", manga.title);
        }
        return Ok(());
    }

    let multi = if app.quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };

    // Jobs are registered before the scheduler starts so each token can be
    // picked up before a finished job leaves the registry.
    let mut tracked = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        let label = chapter.to_string();
        let id = match boss.add_job(JobTask::DownloadChapter { chapter }) {
            Ok(id) => id,
            Err(JobError::AlreadyActive { key, .. }) => {
                tracing::debug!(%key, "duplicate chapter in listing, skipping");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let job = boss.get(id).context("Job disappeared before the scheduler started")?;

        let bar = multi.add(ProgressBar::new(PROGRESS_SCALE));
        bar.set_style(chapter_style());
        bar.set_message(label.clone());
        tracked.push(Tracked {
            label,
            token: job.token(),
            bar,
        });
    }

    let scheduler = boss.start();
    let interrupted = follow(&boss, &tracked).await;

    boss.shutdown();
    if let Some(handle) = scheduler {
        handle.await.context("Scheduler task failed")?;
    }

    let failed = tracked
        .iter()
        .filter(|t| t.token.state() != TokenState::Complete)
        .count();

    if !app.quiet {
        println!(
            "Downloaded {} of {} chapters to: {}",
            tracked.len() - failed,
            tracked.len(),
            app.settings.download_location.join(manga.folder_name()).display()
        );
    }

    if interrupted {
        bail!("Interrupted");
    }
    if failed > 0 {
        bail!("{failed} chapter downloads failed; run with -v for details");
    }
    Ok(())
}

/// Redraws the bars until every token is terminal. Returns true on Ctrl-C.
async fn follow(boss: &JobBoss, tracked: &[Tracked]) -> bool {
    let mut ticker = tokio::time::interval(REFRESH);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut listening = true;
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut ctrl_c, if listening => {
                listening = false;
                match result {
                    Ok(()) => {
                        interrupted = true;
                        boss.shutdown();
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to listen for Ctrl-C"),
                }
            }
        }

        if refresh(tracked) {
            return interrupted;
        }
    }
}

/// Updates every unfinished bar. Returns true once all tokens are terminal.
fn refresh(tracked: &[Tracked]) -> bool {
    let mut done = true;
    for t in tracked {
        if t.bar.is_finished() {
            continue;
        }
        t.bar
            .set_position((t.token.progress() * PROGRESS_SCALE as f64).round() as u64);
        match t.token.state() {
            TokenState::Complete => t.bar.finish_with_message(format!("{} done", t.label)),
            TokenState::Cancelled => t.bar.abandon_with_message(format!("{} failed", t.label)),
            TokenState::Standby | TokenState::Running => done = false,
        }
    }
    done
}
