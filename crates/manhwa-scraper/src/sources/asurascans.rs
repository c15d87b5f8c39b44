//! Asura Scans, a WordPress site on the "MangaReader" theme.

use super::{degrade, referer_headers, MangaSource};
use crate::extract::{self, Document};
use crate::fetcher::PageFetcher;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use shared::{
    Chapter, ChapterPages, FetchError, MangaDetails, MangaStatus, ParseError, PopularEntry,
    SearchResult, SourceDescriptor, SourceError,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://asuracomic.net";

static MANGA_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/manga/([^/]+)").expect("manga id pattern"));

pub struct AsuraScans {
    descriptor: SourceDescriptor,
    fetcher: Arc<dyn PageFetcher>,
}

impl AsuraScans {
    pub const ID: &'static str = "asurascans";

    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_base_url(fetcher, DEFAULT_BASE_URL)
    }

    /// Point the adapter at another domain; the site moves now and then
    pub fn with_base_url(fetcher: Arc<dyn PageFetcher>, base_url: &str) -> Self {
        let descriptor = SourceDescriptor::new(Self::ID, "Asura Scans", base_url);
        let icon = format!("{}/favicon.ico", descriptor.base_url);
        Self {
            descriptor: descriptor.with_icon(icon).with_language("en"),
            fetcher,
        }
    }

    /// Leave the source out of multi-source searches
    pub fn inactive(mut self) -> Self {
        self.descriptor = self.descriptor.inactive();
        self
    }

    fn base_url(&self) -> &str {
        &self.descriptor.base_url
    }

    fn search_url(&self, query: &str, page: u32) -> String {
        let query = urlencoding::encode(query);
        if page <= 1 {
            format!("{}/?s={}", self.base_url(), query)
        } else {
            format!("{}/page/{}/?s={}", self.base_url(), page, query)
        }
    }

    fn details_url(&self, manga_id: &str) -> String {
        format!("{}/manga/{}/", self.base_url(), manga_id)
    }

    fn chapter_url(&self, chapter_id: &str) -> String {
        format!("{}/{}/", self.base_url(), chapter_id.trim_matches('/'))
    }

    fn listing_url(&self, page: u32, order: &str) -> String {
        format!("{}/manga/?page={}&order={}", self.base_url(), page.max(1), order)
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(source = Self::ID, url = %url, "Fetching");
        self.fetcher.fetch(url, &referer_headers(&self.descriptor)).await
    }

    async fn fetch_cards(&self, url: &str) -> Result<Vec<Card>, SourceError> {
        let markup = self.fetch(url).await?;
        Ok(parse_cards(&markup)?)
    }
}

#[async_trait]
impl MangaSource for AsuraScans {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn search(&self, query: &str, page: u32) -> Vec<SearchResult> {
        let result = self.fetch_cards(&self.search_url(query, page)).await;
        degrade(&self.descriptor, "search", result)
            .into_iter()
            .map(Card::into_search_result)
            .collect()
    }

    async fn manga_details(&self, manga_id: &str) -> Result<MangaDetails, SourceError> {
        let url = self.details_url(manga_id);
        let markup = self.fetch(&url).await?;
        Ok(parse_details(&markup, manga_id, &url)?)
    }

    async fn chapter_pages(&self, chapter_id: &str) -> Result<ChapterPages, SourceError> {
        let markup = self.fetch(&self.chapter_url(chapter_id)).await?;
        Ok(parse_chapter_pages(&markup, chapter_id)?)
    }

    async fn popular(&self, page: u32) -> Vec<PopularEntry> {
        let result = self.fetch_cards(&self.listing_url(page, "popular")).await;
        degrade(&self.descriptor, "popular", result)
            .into_iter()
            .map(Card::into_popular)
            .collect()
    }

    async fn latest(&self, page: u32) -> Vec<SearchResult> {
        let result = self.fetch_cards(&self.listing_url(page, "update")).await;
        degrade(&self.descriptor, "latest", result)
            .into_iter()
            .map(Card::into_search_result)
            .collect()
    }
}

/// Series card as rendered in every listing of the theme
#[derive(Debug)]
struct Card {
    id: String,
    title: String,
    cover: Option<String>,
    url: String,
    latest_chapter: Option<String>,
    rating: Option<f64>,
}

impl Card {
    fn into_search_result(self) -> SearchResult {
        SearchResult {
            id: self.id,
            title: self.title,
            cover: self.cover,
            url: self.url,
            source: AsuraScans::ID.to_string(),
            latest_chapter: self.latest_chapter,
        }
    }

    fn into_popular(self) -> PopularEntry {
        PopularEntry {
            id: self.id,
            title: self.title,
            cover: self.cover.unwrap_or_default(),
            url: self.url,
            source: AsuraScans::ID.to_string(),
            rating: self.rating,
            views: None,
        }
    }
}

fn parse_cards(markup: &str) -> Result<Vec<Card>, ParseError> {
    let document = Document::parse(markup);
    let mut cards = Vec::new();

    for item in document.select_all(".listupd .bs")? {
        let Some(url) = item.select_one("a")?.and_then(|link| link.attr("href")) else {
            continue;
        };
        let Some(title) = extract::text_of(&item, ".tt")? else {
            continue;
        };

        cards.push(Card {
            id: extract::extract_identifier_from_url(&url, &MANGA_ID),
            title,
            cover: item
                .select_one("img")?
                .and_then(|img| img.first_attr(&["src", "data-src"])),
            latest_chapter: extract::text_of(&item, ".epxs")?,
            rating: extract::text_of(&item, ".rating .num")?
                .as_deref()
                .and_then(extract::parse_decimal),
            url,
        });
    }

    Ok(cards)
}

/// Chapter ids are the last path segment of the chapter URL
fn chapter_id_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(url)
        .to_string()
}

fn parse_details(markup: &str, manga_id: &str, url: &str) -> Result<MangaDetails, ParseError> {
    let document = Document::parse(markup);

    let title = document
        .select_one(".entry-title")?
        .and_then(|node| node.text_opt());
    let chapter_items = document.select_all("#chapterlist li")?;
    if title.is_none() && document.select_one("#chapterlist")?.is_none() {
        return Err(ParseError::new(
            format!("asurascans manga {}", manga_id),
            "page has neither a title nor a chapter list",
        ));
    }

    let mut author = None;
    let mut artist = None;
    let mut status = MangaStatus::default();
    for row in document.select_all(".infox .fmed")? {
        let (Some(label), Some(value)) = (extract::text_of(&row, "b")?, extract::text_of(&row, "span")?)
        else {
            continue;
        };
        let label = label.to_lowercase();
        if label.contains("author") {
            author = Some(value);
        } else if label.contains("artist") {
            artist = Some(value);
        } else if label.contains("status") {
            status = extract::normalize_status(&value);
        }
    }

    let alternative_titles: BTreeSet<String> = document
        .select_one(".seriestualt")?
        .map(|node| extract::split_titles(&node.text()).collect())
        .unwrap_or_default();

    let genres = document
        .select_all(".mgen a")?
        .iter()
        .filter_map(|node| node.text_opt())
        .collect();

    let mut chapters = Vec::with_capacity(chapter_items.len());
    for item in chapter_items {
        let Some(chapter_url) = item.select_one("a")?.and_then(|link| link.attr("href")) else {
            continue;
        };
        let id = chapter_id_from_url(&chapter_url);
        let label = extract::text_of(&item, ".chapternum")?;

        chapters.push(Chapter {
            number: extract::chapter_number_or(label.as_deref(), &id),
            id,
            title: label,
            url: chapter_url,
            release_date: extract::text_of(&item, ".chapterdate")?,
            scanlator: None,
        });
    }

    Ok(MangaDetails {
        id: manga_id.to_string(),
        title: title.unwrap_or_else(|| manga_id.to_string()),
        alternative_titles,
        cover: document
            .select_one(".thumb img")?
            .and_then(|img| img.first_attr(&["src", "data-src"])),
        banner: document
            .select_one(".bigcover img")?
            .and_then(|img| img.first_attr(&["src", "data-src"])),
        description: document
            .select_one(".entry-content[itemprop='description']")?
            .and_then(|node| node.text_opt()),
        author,
        artist,
        status,
        genres,
        tags: Vec::new(),
        rating: document
            .select_one(".rating .num")?
            .and_then(|node| node.text_opt())
            .as_deref()
            .and_then(extract::parse_decimal),
        views: None,
        source: AsuraScans::ID.to_string(),
        url: url.to_string(),
        chapters,
    })
}

fn parse_chapter_pages(markup: &str, chapter_id: &str) -> Result<ChapterPages, ParseError> {
    let document = Document::parse(markup);
    let reader = extract::require(
        document.select_one("#readerarea")?,
        &format!("asurascans chapter {} reader area", chapter_id),
    )?;

    let pages = reader
        .select_all("img")?
        .iter()
        .filter_map(|img| img.first_attr(&["src", "data-src"]))
        .filter(|src| !src.to_lowercase().contains("logo"))
        .collect();

    let title = document
        .select_one(".entry-title")?
        .and_then(|node| node.text_opt());

    Ok(ChapterPages {
        chapter_id: chapter_id.to_string(),
        chapter_number: extract::chapter_number_or(title.as_deref(), chapter_id),
        title,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StaticFetcher;

    const LISTING: &str = r#"
        <div class="listupd">
          <div class="bs"><div class="bsx">
            <a href="https://asuracomic.net/manga/solo-leveling/" title="Solo Leveling">
              <div class="limit"><img src="https://cdn.asura/solo.webp"></div>
              <div class="bigor">
                <div class="tt"> Solo Leveling </div>
                <div class="adds"><div class="epxs">Chapter 200</div>
                  <div class="rating"><div class="num">9.8</div></div></div>
              </div>
            </a>
          </div></div>
          <div class="bs"><div class="bsx">
            <a href="https://asuracomic.net/manga/omniscient-reader/">
              <div class="tt">Omniscient Reader</div>
            </a>
          </div></div>
          <div class="bs"><div class="bsx"><div class="tt">No link</div></div></div>
        </div>
    "#;

    const DETAILS: &str = r#"
        <div class="bigcover"><img src="https://cdn.asura/banner.webp"></div>
        <div class="thumb"><img src="https://cdn.asura/cover.webp"></div>
        <div class="rating"><div class="num">9.5</div></div>
        <div class="infox">
          <h1 class="entry-title">Solo Leveling</h1>
          <span class="seriestualt">Na Honjaman Level-Up, 나 혼자만 레벨업</span>
          <div class="fmed"><b>Author</b><span>Chugong</span></div>
          <div class="fmed"><b>Artist</b><span>DUBU (REDICE STUDIO)</span></div>
          <div class="fmed"><b>Status</b><span>Completed</span></div>
          <div class="mgen"><a>Action</a><a>Fantasy</a></div>
        </div>
        <div class="entry-content" itemprop="description"><p>10 years ago, after the Gate...</p></div>
        <div id="chapterlist"><ul>
          <li><a href="https://asuracomic.net/solo-leveling-chapter-201/">
            <span class="chapternum">Epilogue</span><span class="chapterdate">March 2, 2024</span></a></li>
          <li><a href="https://asuracomic.net/solo-leveling-chapter-200/">
            <span class="chapternum">Chapter 200</span><span class="chapterdate">January 1, 2022</span></a></li>
          <li><span class="chapternum">Locked</span></li>
        </ul></div>
    "#;

    const CHAPTER: &str = r#"
        <h1 class="entry-title">Solo Leveling Chapter 200</h1>
        <div id="readerarea">
          <p><img src="https://cdn.asura/200/01.jpg"></p>
          <p><img src="https://cdn.asura/LOGO-banner.png"></p>
          <p><img src="" data-src="https://cdn.asura/200/02.jpg"></p>
          <p><img src="https://cdn.asura/200/03.jpg"></p>
        </div>
    "#;

    fn source_with(fetcher: StaticFetcher) -> (Arc<StaticFetcher>, AsuraScans) {
        let fetcher = Arc::new(fetcher);
        let source = AsuraScans::new(Arc::clone(&fetcher) as Arc<dyn PageFetcher>);
        (fetcher, source)
    }

    #[test]
    fn test_descriptor() {
        let (_, source) = source_with(StaticFetcher::new());
        let descriptor = source.descriptor();
        assert_eq!(descriptor.id, "asurascans");
        assert_eq!(descriptor.name, "Asura Scans");
        assert_eq!(descriptor.icon.as_deref(), Some("https://asuracomic.net/favicon.ico"));
    }

    #[tokio::test]
    async fn test_search_parses_cards() {
        let (fetcher, source) = source_with(
            StaticFetcher::new().with_page("https://asuracomic.net/?s=solo%20leveling", LISTING),
        );

        let results = source.search("solo leveling", 1).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "solo-leveling");
        assert_eq!(results[0].title, "Solo Leveling");
        assert_eq!(results[0].cover.as_deref(), Some("https://cdn.asura/solo.webp"));
        assert_eq!(results[0].latest_chapter.as_deref(), Some("Chapter 200"));
        assert_eq!(results[0].source, "asurascans");
        assert_eq!(results[1].id, "omniscient-reader");
        assert!(results[1].cover.is_none());
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_search_second_page_url() {
        let (fetcher, source) = source_with(StaticFetcher::new());

        source.search("one piece", 2).await;

        assert_eq!(
            fetcher.requests(),
            vec!["https://asuracomic.net/page/2/?s=one%20piece"]
        );
    }

    #[tokio::test]
    async fn test_search_degrades_to_empty_on_fetch_failure() {
        let (_, source) = source_with(StaticFetcher::new());
        assert!(source.search("one piece", 1).await.is_empty());
    }

    #[tokio::test]
    async fn test_popular_and_latest() {
        let (fetcher, source) = source_with(
            StaticFetcher::new()
                .with_page("https://asuracomic.net/manga/?page=1&order=popular", LISTING)
                .with_page("https://asuracomic.net/manga/?page=3&order=update", LISTING),
        );

        let popular = source.popular(1).await;
        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].rating, Some(9.8));
        assert_eq!(popular[1].rating, None);
        assert_eq!(popular[1].cover, "");

        let latest = source.latest(3).await;
        assert_eq!(latest.len(), 2);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_manga_details() {
        let (_, source) = source_with(
            StaticFetcher::new().with_page("https://asuracomic.net/manga/solo-leveling/", DETAILS),
        );

        let details = source.manga_details("solo-leveling").await.unwrap();

        assert_eq!(details.title, "Solo Leveling");
        assert_eq!(details.author.as_deref(), Some("Chugong"));
        assert_eq!(details.artist.as_deref(), Some("DUBU (REDICE STUDIO)"));
        assert_eq!(details.status, MangaStatus::Completed);
        assert_eq!(details.genres, vec!["Action", "Fantasy"]);
        assert!(details.alternative_titles.contains("Na Honjaman Level-Up"));
        assert_eq!(details.cover.as_deref(), Some("https://cdn.asura/cover.webp"));
        assert_eq!(details.banner.as_deref(), Some("https://cdn.asura/banner.webp"));
        assert_eq!(details.description.as_deref(), Some("10 years ago, after the Gate..."));
        assert_eq!(details.rating, Some(9.5));
        assert_eq!(details.url, "https://asuracomic.net/manga/solo-leveling/");

        assert_eq!(details.total_chapters(), 2);
        assert_eq!(details.chapters[0].id, "solo-leveling-chapter-201");
        assert_eq!(details.chapters[0].number, 201.0);
        assert_eq!(details.chapters[0].title.as_deref(), Some("Epilogue"));
        assert_eq!(details.chapters[1].number, 200.0);
        assert_eq!(details.chapters[1].release_date.as_deref(), Some("January 1, 2022"));
    }

    #[tokio::test]
    async fn test_manga_details_propagates_fetch_failure() {
        let (_, source) = source_with(StaticFetcher::new());

        let err = source.manga_details("abc123").await.unwrap_err();
        assert!(matches!(err, SourceError::Fetch(ref e) if e.status == Some(404)));
    }

    #[tokio::test]
    async fn test_manga_details_rejects_unrelated_page() {
        let (_, source) = source_with(
            StaticFetcher::new().with_page("https://asuracomic.net/manga/gone/", "<p>Page not found</p>"),
        );

        let err = source.manga_details("gone").await.unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }

    #[tokio::test]
    async fn test_chapter_pages_keep_reading_order() {
        let (_, source) = source_with(
            StaticFetcher::new().with_page("https://asuracomic.net/solo-leveling-chapter-200/", CHAPTER),
        );

        let first = source.chapter_pages("solo-leveling-chapter-200").await.unwrap();
        assert_eq!(
            first.pages,
            vec![
                "https://cdn.asura/200/01.jpg",
                "https://cdn.asura/200/02.jpg",
                "https://cdn.asura/200/03.jpg",
            ]
        );
        assert_eq!(first.total_pages(), 3);
        assert_eq!(first.chapter_number, 200.0);
        assert_eq!(first.title.as_deref(), Some("Solo Leveling Chapter 200"));

        let second = source.chapter_pages("solo-leveling-chapter-200").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_chapter_pages_without_reader_is_parse_error() {
        let (_, source) = source_with(
            StaticFetcher::new().with_page("https://asuracomic.net/x-chapter-1/", "<h1 class=\"entry-title\">x</h1>"),
        );

        let err = source.chapter_pages("x-chapter-1").await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_chapter_pages_propagates_fetch_failure() {
        let (fetcher, source) = source_with(StaticFetcher::new());

        let err = source.chapter_pages("x-chapter-1").await.unwrap_err();
        assert!(matches!(err, SourceError::Fetch(ref e) if e.status == Some(404)));
        assert_eq!(err.kind(), "fetch_error");
        assert_eq!(fetcher.requests(), vec!["https://asuracomic.net/x-chapter-1/"]);
    }

    #[test]
    fn test_chapter_id_from_url() {
        assert_eq!(
            chapter_id_from_url("https://asuracomic.net/solo-leveling-chapter-45/"),
            "solo-leveling-chapter-45"
        );
        assert_eq!(chapter_id_from_url("chapter-1"), "chapter-1");
    }

    #[tokio::test]
    async fn test_base_url_override() {
        let fetcher = Arc::new(StaticFetcher::new());
        let source = AsuraScans::with_base_url(
            Arc::clone(&fetcher) as Arc<dyn PageFetcher>,
            "https://asura.example/",
        );

        source.latest(1).await;
        assert_eq!(
            fetcher.requests(),
            vec!["https://asura.example/manga/?page=1&order=update"]
        );
    }
}
