//! Display utilities and table output for the tankobon CLI.

use chrono::{DateTime, Local, Utc};
use indicatif::ProgressStyle;
use std::path::Path;
use std::time::Duration;
use tankobon_lib::prelude::*;

/// Progress bar resolution; token progress is a fraction in `0.0..=1.0`.
pub(crate) const PROGRESS_SCALE: u64 = 1000;

/// Style for one chapter download bar.
pub(crate) fn chapter_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Print search results.
pub(crate) fn print_manga(results: &[Manga]) {
    if results.is_empty() {
        println!("No manga found.");
        return;
    }

    println!("{:<30} {:<40} {:<25}", "ID", "TITLE", "AUTHORS");
    println!("{}", "-".repeat(97));

    for manga in results {
        println!(
            "{:<30} {:<40} {:<25}",
            truncate(&manga.id.to_string(), 30),
            truncate(&manga.title, 40),
            truncate(&manga.authors.join(", "), 25)
        );
        println!("  {}", manga.url);
    }

    println!("\nTotal: {} manga", results.len());
}

/// Print a manga header followed by its chapters, marking downloaded ones.
pub(crate) fn print_chapters(manga: &Manga, chapters: &[Chapter], download_location: &Path) {
    println!("{manga}");
    if let Some(status) = &manga.status {
        println!("Status: {status}");
    }
    if !manga.tags.is_empty() {
        println!("Tags: {}", manga.tags.join(", "));
    }
    println!();

    if chapters.is_empty() {
        println!("No chapters found.");
        return;
    }

    println!("{:<10} {:<8} {:<50} {}", "CHAPTER", "VOLUME", "NAME", "ON DISK");
    println!("{}", "-".repeat(80));

    let mut downloaded = 0;
    for chapter in chapters {
        let on_disk = chapter.is_downloaded(download_location);
        if on_disk {
            downloaded += 1;
        }
        println!(
            "{:<10} {:<8} {:<50} {}",
            chapter.number.to_string(),
            chapter.volume.as_deref().unwrap_or("-"),
            truncate(chapter.name.as_deref().unwrap_or(""), 50),
            if on_disk { "yes" } else { "" }
        );
    }

    println!("\nTotal: {} chapters ({downloaded} downloaded)", chapters.len());
}

/// Print the job table.
pub(crate) fn print_jobs(jobs: &[JobSnapshot]) {
    if jobs.is_empty() {
        println!("No jobs.");
        return;
    }

    println!(
        "{:<38} {:<22} {:<30} {:<10} {:>6} {:<10} {:<19}",
        "ID", "KIND", "TARGET", "STATE", "PROG", "EVERY", "NEXT RUN"
    );
    println!("{}", "-".repeat(141));

    for job in jobs {
        let state = if job.enabled {
            job.state.to_string()
        } else {
            format!("{} (off)", job.state)
        };
        println!(
            "{:<38} {:<22} {:<30} {:<10} {:>5.1}% {:<10} {:<19}",
            job.id.to_string(),
            job.key.kind.as_str(),
            truncate(&job.title, 30),
            state,
            job.progress * 100.0,
            job.interval_secs
                .map_or_else(|| "-".to_string(), |s| format_duration(Duration::from_secs(s))),
            job.next_run.map_or_else(|| "-".to_string(), format_time),
        );
    }
}

/// Compact duration such as `1h30m` or `45s`.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        (total % 86_400) / 3600,
        (total % 3600) / 60,
        total % 60,
    );

    let mut out = String::new();
    for (value, unit) in [(days, "d"), (hours, "h"), (minutes, "m"), (seconds, "s")] {
        if value > 0 {
            out.push_str(&format!("{value}{unit}"));
        }
    }
    if out.is_empty() {
        out.push_str("0s");
    }
    out
}

fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
