//! In-memory connector for scheduler tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tankobon_connectors::Connector;
use tankobon_fetch::StatusCode;
use tankobon_types::{Chapter, ChapterNumber, Manga, MangaId, ProgressToken, sort_chapters};

pub(crate) const FAKE: &str = "Fake";

pub(crate) fn manga() -> Manga {
    Manga::new(MangaId::new(FAKE, "t-1"), "Test Title", "https://fake.test/t-1")
}

pub(crate) fn chapter(number: &str) -> Chapter {
    Chapter::new(
        manga(),
        None,
        None,
        ChapterNumber::parse(number).unwrap(),
        format!("https://fake.test/t-1/{number}"),
    )
}

#[derive(Debug, Default)]
pub(crate) struct FakeConnector {
    pub(crate) chapters: Mutex<Vec<Chapter>>,
    pub(crate) list_delay: Duration,
    pub(crate) list_calls: AtomicUsize,
    pub(crate) downloads: AtomicUsize,
    pub(crate) fail_downloads: AtomicBool,
}

impl FakeConnector {
    pub(crate) fn with_chapters(numbers: &[&str]) -> Self {
        let fake = Self::default();
        *fake.chapters.lock().unwrap() = numbers.iter().map(|n| chapter(n)).collect();
        fake
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    fn name(&self) -> &str {
        FAKE
    }

    async fn search_manga(&self, _title: &str) -> Vec<Manga> {
        vec![manga()]
    }

    async fn fetch_manga(&self, _url: &str) -> Option<Manga> {
        Some(manga())
    }

    async fn list_chapters(&self, _manga: &Manga) -> Vec<Chapter> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        let mut chapters = self.chapters.lock().unwrap().clone();
        sort_chapters(&mut chapters);
        chapters
    }

    async fn download_chapter(&self, _chapter: &Chapter, token: &ProgressToken) -> StatusCode {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if token.checkpoint().is_err() {
            return StatusCode::REQUEST_TIMEOUT;
        }
        if self.fail_downloads.load(Ordering::SeqCst) {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        token.set_steps(1);
        token.increment();
        StatusCode::OK
    }
}
