//! Connector for bato.to.

use crate::connector::{ChapterImages, Connector};
use crate::covers::cache_cover;
use crate::download::download_chapter_images;
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::{Arc, LazyLock};
use tankobon_fetch::{ClientConfig, RateLimitConfig, RateLimitedClient, RequestClass, StatusCode};
use tankobon_types::{Chapter, ChapterNumber, Manga, MangaId, ProgressToken, Settings, sort_chapters};

const BASE_URL: &str = "https://bato.to";

/// All Bato requests share one class.
const PAGE: RequestClass = RequestClass(1);

/// Connector for [bato.to](https://bato.to).
#[derive(Debug, Clone)]
pub struct Bato {
    client: RateLimitedClient,
    settings: Arc<Settings>,
    base_url: String,
}

impl Bato {
    /// Connector name.
    pub const NAME: &'static str = "Bato";

    /// Creates the connector with its default limits of 60 requests per minute.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: Arc<Settings>) -> Result<Self, reqwest::Error> {
        let client = RateLimitedClient::new(ClientConfig::from(settings.as_ref()), Self::rate_limits())?;
        Ok(Self::with_client(settings, client, BASE_URL))
    }

    /// Creates the connector with an explicit client and site root.
    #[must_use]
    pub fn with_client(
        settings: Arc<Settings>,
        client: RateLimitedClient,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            settings,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Default rate limits for the site.
    #[must_use]
    pub fn rate_limits() -> RateLimitConfig {
        RateLimitConfig::new().per_minute(PAGE, 60)
    }

    /// Returns the site root requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the image list of `chapter`.
    ///
    /// # Errors
    ///
    /// Returns the failing status if the chapter page cannot be retrieved.
    pub async fn chapter_images(&self, chapter: &Chapter) -> Result<ChapterImages, StatusCode> {
        let result = self.client.request(&chapter.url, PAGE).await;
        if !result.is_success() {
            return Err(result.status());
        }

        let urls = result
            .document()
            .and_then(|document| parse_image_urls(&document))
            .unwrap_or_else(|| {
                tracing::warn!(connector = Self::NAME, chapter = %chapter, "no image list on chapter page");
                Vec::new()
            });

        Ok(ChapterImages::new(urls, PAGE).with_referer(format!("{}/", self.base_url)))
    }
}

#[async_trait]
impl Connector for Bato {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search_manga(&self, title: &str) -> Vec<Manga> {
        let Some(word) = search_term(title) else {
            return Vec::new();
        };
        tracing::info!(connector = Self::NAME, term = %word, "searching publications");

        let url = format!("{}/v3x-search?word={word}&lang=en", self.base_url);
        let result = self.client.request(&url, PAGE).await;
        if !result.is_success() {
            return Vec::new();
        }

        let Some(urls) = result
            .document()
            .and_then(|document| parse_search_results(&document, &self.base_url))
        else {
            tracing::warn!(connector = Self::NAME, term = %word, "unexpected search page structure");
            return Vec::new();
        };

        let mut found: Vec<Manga> = Vec::with_capacity(urls.len());
        for url in urls {
            if let Some(manga) = self.fetch_manga(&url).await
                && !found.iter().any(|m| m.id == manga.id)
            {
                found.push(manga);
            }
        }

        tracing::info!(connector = Self::NAME, term = %word, count = found.len(), "retrieved publications");
        found
    }

    async fn fetch_manga(&self, url: &str) -> Option<Manga> {
        let publication_id = publication_id_from_url(url)?;
        let result = self.client.request(url, PAGE).await;
        if !result.is_success() {
            return None;
        }

        let id = MangaId::new(Self::NAME, publication_id);
        let Some(manga) = result
            .document()
            .and_then(|document| parse_manga(&document, id, url))
        else {
            tracing::warn!(connector = Self::NAME, url, "unexpected title page structure");
            return None;
        };

        cache_cover(&self.client, &manga, &self.settings.cover_cache, PAGE).await;
        Some(manga)
    }

    async fn list_chapters(&self, manga: &Manga) -> Vec<Chapter> {
        tracing::info!(connector = Self::NAME, manga = %manga, "getting chapters");
        let url = format!("{}/title/{}", self.base_url, manga.publication_id());
        let result = self.client.request(&url, PAGE).await;
        if !result.is_success() {
            return Vec::new();
        }

        let Some(mut chapters) = result
            .document()
            .and_then(|document| parse_chapters(&document, manga, &self.base_url))
        else {
            tracing::warn!(connector = Self::NAME, manga = %manga, "unexpected chapter list structure");
            return Vec::new();
        };

        sort_chapters(&mut chapters);
        tracing::info!(connector = Self::NAME, manga = %manga, count = chapters.len(), "got chapters");
        chapters
    }

    async fn download_chapter(&self, chapter: &Chapter, token: &ProgressToken) -> StatusCode {
        if token.checkpoint().is_err() {
            return StatusCode::REQUEST_TIMEOUT;
        }

        tracing::info!(connector = Self::NAME, chapter = %chapter, "retrieving chapter info");
        let images = match self.chapter_images(chapter).await {
            Ok(images) => images,
            Err(status) => return status,
        };

        download_chapter_images(
            &self.client,
            chapter,
            &images,
            &self.settings.download_location,
            token,
        )
        .await
    }
}

static SEARCH_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[A-Za-z]+").expect("valid search word pattern"));
static CHAPTER_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Chapter|Ch\.)\s*([0-9]+(?:[.,][0-9]+)?)")
        .expect("valid chapter number pattern")
});
static VOLUME_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Vol(?:ume)?\.?\s*([0-9]+)").expect("valid volume pattern")
});
static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[A-Za-z0-9\-._~%/?&=;:+]+").expect("valid image url pattern")
});

/// Lowercased letter-only words of `title`, or `None` if there are none.
fn search_term(title: &str) -> Option<String> {
    let term = SEARCH_WORD
        .find_iter(title)
        .map(|m| m.as_str().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    (!term.is_empty()).then_some(term)
}

fn publication_id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Parent of the first `tag` element whose text is exactly `label`.
fn labelled<'a>(document: &'a Html, tag: &str, label: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(tag).ok()?;
    document
        .select(&selector)
        .find(|element| text_of(*element) == label)
        .and_then(|element| element.parent())
        .and_then(ElementRef::wrap)
}

fn parse_search_results(document: &Html, base_url: &str) -> Option<Vec<String>> {
    let list = Selector::parse("div[data-hk='0-0-2']").ok()?;
    let link = Selector::parse("a[href]").ok()?;
    let list = document.select(&list).next()?;

    Some(
        child_elements(list)
            .filter(|entry| entry.value().name() == "div")
            .filter_map(|entry| entry.select(&link).next())
            .filter_map(|a| a.value().attr("href"))
            .map(|href| format!("{base_url}{href}"))
            .collect(),
    )
}

fn parse_manga(document: &Html, id: MangaId, url: &str) -> Option<Manga> {
    let info = Selector::parse("main > div:nth-of-type(1) > div:nth-of-type(2)").ok()?;
    let heading = Selector::parse("h3").ok()?;
    let alt_titles = Selector::parse("h3 + div").ok()?;
    let authors = Selector::parse("h3 + div + div a").ok()?;
    let description = Selector::parse("div.prose").ok()?;
    let cover = Selector::parse("img[data-hk='0-1-0']").ok()?;

    let info = document.select(&info).next()?;
    let title = text_of(info.select(&heading).next()?);
    if title.is_empty() {
        return None;
    }

    let mut manga = Manga::new(id, title, url);
    manga.alt_titles = info
        .select(&alt_titles)
        .next()
        .map(|element| {
            text_of(element)
                .split('/')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    manga.authors = info.select(&authors).map(text_of).filter(|a| !a.is_empty()).collect();
    manga.description = document.select(&description).next().map(text_of).unwrap_or_default();
    manga.cover_url = document
        .select(&cover)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    if let Some(genres) = labelled(document, "b", "Genres:") {
        manga.tags = child_elements(genres)
            .filter(|e| e.value().name() == "span")
            .map(text_of)
            .filter(|t| !t.is_empty())
            .collect();
    }

    manga.original_language = labelled(document, "span", "Tr From")
        .and_then(|parent| child_elements(parent).last())
        .map(text_of)
        .filter(|l| !l.is_empty() && l != "Tr From");

    if let Some(publication) = labelled(document, "span", "Original Publication:") {
        let values: Vec<String> = child_elements(publication)
            .map(text_of)
            .filter(|t| t != "Original Publication:")
            .collect();
        manga.status = values.first().cloned();
        manga.year = values
            .last()
            .and_then(|v| v.split('-').next())
            .and_then(|y| y.trim().parse().ok());
    }

    Some(manga)
}

fn parse_chapters(document: &Html, manga: &Manga, base_url: &str) -> Option<Vec<Chapter>> {
    let rows = Selector::parse("main astro-slot > div").ok()?;
    let link = Selector::parse("a[href]").ok()?;

    let mut chapters = Vec::new();
    for row in document.select(&rows) {
        let Some(a) = row.select(&link).next() else {
            continue;
        };
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let label = text_of(a);

        let Some(captures) = CHAPTER_NUMBER.captures(&label) else {
            tracing::debug!(connector = Bato::NAME, label = %label, "chapter without number");
            continue;
        };
        let Ok(chapter_number) = ChapterNumber::parse(&captures[1]) else {
            continue;
        };
        let chapter_volume = VOLUME_NUMBER.captures(&label).map(|c| c[1].to_string());
        let name = captures
            .get(0)
            .and_then(|m| label[m.end()..].split_once(':'))
            .map(|(_, name)| name.trim().to_string())
            .filter(|name| !name.is_empty());

        chapters.push(Chapter::new(
            manga.clone(),
            name,
            chapter_volume,
            chapter_number,
            format!("{base_url}{href}?load=2"),
        ));
    }
    Some(chapters)
}

fn parse_image_urls(document: &Html) -> Option<Vec<String>> {
    let islands = Selector::parse("astro-island[component-url]").ok()?;

    let props = document
        .select(&islands)
        .find(|island| {
            island
                .value()
                .attr("component-url")
                .is_some_and(|c| c.contains("/_astro/ImageList."))
        })?
        .value()
        .attr("props")?;

    Some(IMAGE_URL.find_iter(props).map(|m| m.as_str().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://bato.to";

    const SEARCH_PAGE: &str = r#"<html><body><div><main>
        <div data-hk="0-0-2">
            <div><div><a href="/title/86663-one-piece"><img src="x.jpg"></a></div><div>One Piece</div></div>
            <div><div><a href="/title/112-one-punch-man"><img src="y.jpg"></a></div><div>One Punch-Man</div></div>
        </div>
    </main></div></body></html>"#;

    const EMPTY_SEARCH_PAGE: &str = r#"<html><body><div><main>
        <div data-hk="0-0-2"><span>No results</span></div>
    </main></div></body></html>"#;

    const TITLE_PAGE: &str = r#"<html><body><div><main>
        <div>
            <div><img data-hk="0-1-0" src="https://xfs-n01.example/cover.jpg?x=1&amp;y=2"></div>
            <div>
                <h3>One Piece</h3>
                <div>ワンピース / Ван Пис / 원피스</div>
                <div><a href="/author/1">Oda Eiichiro</a> <a href="/author/2">Oda &amp; Co</a></div>
                <div><b>Genres:</b><span><span>Action</span></span><span><span>Adventure</span></span></div>
                <div><span>Tr From</span><span>Japanese</span></div>
                <div><span>Original Publication:</span><span>Ongoing</span><span>1997-</span></div>
            </div>
        </div>
        <div><div class="limit-html prose">Gol D. Roger was known as the Pirate King.</div></div>
    </main></div></body></html>"#;

    const CHAPTER_PAGE: &str = r#"<html><body><div><main>
        <div></div><div></div>
        <div><astro-island><div><div></div><div><div><div><astro-slot>
            <div><div><a href="/title/86663-one-piece/200-ch_10">Chapter 10</a></div></div>
            <div><div><a href="/title/86663-one-piece/100-ch_2">Volume 1 Chapter 2: Romance Dawn</a></div></div>
            <div><div><a href="/title/86663-one-piece/300-ch_10.5">Chapter 10.5</a></div></div>
            <div><div><a href="/title/86663-one-piece/50-ch_1">Chapter 1</a></div></div>
            <div><div><a href="/title/86663-one-piece/999-notice">Announcement</a></div></div>
        </astro-slot></div></div></div></div></astro-island></div>
    </main></div></body></html>"#;

    const READER_PAGE: &str = r#"<html><body>
        <astro-island component-url="/_astro/Other.abc.js" props="{&quot;x&quot;:&quot;https://nope.example/a.png&quot;}"></astro-island>
        <astro-island component-url="/_astro/ImageList.c3f1.js" props="{&quot;imageFiles&quot;:[1,&quot;[[0,\&quot;https://xfs-n03.example/media/1.webp\&quot;],[0,\&quot;https://xfs-n03.example/media/2.webp?a=1&amp;b=2\&quot;]]&quot;]}"></astro-island>
    </body></html>"#;

    fn manga() -> Manga {
        Manga::new(
            MangaId::new(Bato::NAME, "86663-one-piece"),
            "One Piece",
            "https://bato.to/title/86663-one-piece",
        )
    }

    #[test]
    fn test_patterns_compile() {
        for pattern in [&SEARCH_WORD, &CHAPTER_NUMBER, &VOLUME_NUMBER, &IMAGE_URL] {
            assert!(!LazyLock::force(pattern).as_str().is_empty());
        }
        assert_eq!(&CHAPTER_NUMBER.captures("Vol.2 Ch.10,5: Finale").unwrap()[1], "10,5");
        assert_eq!(&VOLUME_NUMBER.captures("Volume 3 Chapter 1").unwrap()[1], "3");
    }

    #[test]
    fn test_search_term() {
        assert_eq!(search_term("One-Punch Man 2!").as_deref(), Some("one punch man"));
        assert_eq!(search_term("  123 "), None);
    }

    #[test]
    fn test_publication_id_from_url() {
        assert_eq!(
            publication_id_from_url("https://bato.to/title/86663-one-piece/").as_deref(),
            Some("86663-one-piece")
        );
        assert_eq!(
            publication_id_from_url("https://bato.to/title/86663-one-piece?lang=en").as_deref(),
            Some("86663-one-piece")
        );
    }

    #[test]
    fn test_parse_search_results() {
        let urls = parse_search_results(&Html::parse_document(SEARCH_PAGE), BASE).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://bato.to/title/86663-one-piece",
                "https://bato.to/title/112-one-punch-man",
            ]
        );
    }

    #[test]
    fn test_parse_search_results_empty() {
        let urls = parse_search_results(&Html::parse_document(EMPTY_SEARCH_PAGE), BASE).unwrap();
        assert!(urls.is_empty());
        assert!(parse_search_results(&Html::parse_document("<html></html>"), BASE).is_none());
    }

    #[test]
    fn test_parse_manga() {
        let manga = parse_manga(
            &Html::parse_document(TITLE_PAGE),
            MangaId::new(Bato::NAME, "86663-one-piece"),
            "https://bato.to/title/86663-one-piece",
        )
        .unwrap();

        assert_eq!(manga.title, "One Piece");
        assert_eq!(manga.alt_titles, vec!["ワンピース", "Ван Пис", "원피스"]);
        assert_eq!(manga.authors, vec!["Oda Eiichiro", "Oda & Co"]);
        assert_eq!(manga.tags, vec!["Action", "Adventure"]);
        assert_eq!(manga.description, "Gol D. Roger was known as the Pirate King.");
        assert_eq!(
            manga.cover_url.as_deref(),
            Some("https://xfs-n01.example/cover.jpg?x=1&y=2")
        );
        assert_eq!(manga.original_language.as_deref(), Some("Japanese"));
        assert_eq!(manga.status.as_deref(), Some("Ongoing"));
        assert_eq!(manga.year, Some(1997));
    }

    #[test]
    fn test_parse_manga_rejects_unrelated_page() {
        let document = Html::parse_document("<html><body><p>Cloudflare</p></body></html>");
        assert!(parse_manga(&document, MangaId::new(Bato::NAME, "x"), "https://bato.to/title/x").is_none());
    }

    #[test]
    fn test_parse_chapters() {
        let mut chapters =
            parse_chapters(&Html::parse_document(CHAPTER_PAGE), &manga(), BASE).unwrap();
        assert_eq!(chapters.len(), 4);

        sort_chapters(&mut chapters);
        let numbers: Vec<_> = chapters.iter().map(|c| c.number.to_string()).collect();
        assert_eq!(numbers, vec!["1", "2", "10", "10.5"]);

        let second = &chapters[1];
        assert_eq!(second.volume.as_deref(), Some("1"));
        assert_eq!(second.name.as_deref(), Some("Romance Dawn"));
        assert_eq!(
            second.url,
            "https://bato.to/title/86663-one-piece/100-ch_2?load=2"
        );
        assert!(chapters[0].name.is_none());
    }

    #[test]
    fn test_parse_image_urls() {
        let urls = parse_image_urls(&Html::parse_document(READER_PAGE)).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://xfs-n03.example/media/1.webp",
                "https://xfs-n03.example/media/2.webp?a=1&b=2",
            ]
        );
    }

    #[test]
    fn test_parse_image_urls_missing_island() {
        let document = Html::parse_document("<html><body></body></html>");
        assert!(parse_image_urls(&document).is_none());
    }
}
