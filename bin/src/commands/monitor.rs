//! Monitor command implementation.

use super::{App, fetch_manga};
use crate::display::{format_duration, print_jobs};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::time::Duration;
use tankobon_lib::prelude::*;
use tokio::time::{Instant, Interval, interval_at};

/// How long in-flight downloads get to reach a checkpoint after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Monitor every manga in `urls` until Ctrl-C.
pub(crate) async fn monitor(
    app: &App,
    connector_name: &str,
    urls: &[String],
    interval: Option<Duration>,
    report: Option<Duration>,
) -> Result<()> {
    let boss = app.job_boss()?;
    let connector = boss
        .connectors()
        .get(connector_name)
        .with_context(|| format!("Unknown connector: {connector_name}"))?;
    let interval = interval.unwrap_or_else(|| app.settings.default_monitor_interval());

    for url in urls {
        let manga = fetch_manga(connector.as_ref(), url).await?;
        let title = manga.title.clone();
        match boss.add_job(JobTask::MonitorManga { manga, interval }) {
            Ok(id) => {
                tracing::info!(job = %id, manga = %title, interval_secs = interval.as_secs(), "monitoring");
                if !app.quiet {
                    println!("Monitoring {title} every {}", format_duration(interval));
                }
            }
            Err(JobError::AlreadyActive { .. }) => {
                eprintln!("{title} is already monitored, skipping {url}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let scheduler = boss.start().context("Scheduler already running")?;
    if !app.quiet {
        println!("Press Ctrl-C to stop.");
    }

    let mut reporter = report.map(|period| interval_at(Instant::now() + period, period));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            () = next_report(reporter.as_mut()) => {
                if !app.quiet {
                    print_jobs(&boss.jobs());
                }
            }
        }
    }

    if !app.quiet {
        println!("Stopping...");
    }
    let tokens: Vec<_> = boss
        .jobs_like(&JobFilter::new())
        .iter()
        .map(|job| job.token())
        .collect();
    boss.shutdown();
    scheduler.await.context("Scheduler task failed")?;

    let drained =
        tokio::time::timeout(SHUTDOWN_GRACE, join_all(tokens.iter().map(|t| t.finished()))).await;
    if drained.is_err() {
        tracing::warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "some downloads did not stop in time"
        );
    }

    if !app.quiet {
        print_jobs(&boss.jobs());
    }
    Ok(())
}

async fn next_report(reporter: Option<&mut Interval>) {
    match reporter {
        Some(reporter) => {
            reporter.tick().await;
        }
        None => std::future::pending().await,
    }
}
