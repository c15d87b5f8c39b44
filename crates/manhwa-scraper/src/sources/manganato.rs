//! Manganato. Listings live on the main domain, series and chapter pages on a
//! separate chapter host.

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

pub const DEFAULT_BASE_URL: &str = "https://manganato.com";
pub const DEFAULT_CHAPTER_HOST: &str = "https://chapmanganato.to";

static MANGA_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"manga-(\w+)").expect("manga id pattern"));

/// Locators of one kind of series listing
struct CardLocators {
    item: &'static str,
    link: &'static str,
    title: &'static str,
    latest_chapter: &'static str,
    views: Option<&'static str>,
}

const SEARCH_CARDS: CardLocators = CardLocators {
    item: ".search-story-item",
    link: "a.item-img",
    title: "a.item-title",
    latest_chapter: ".item-chapter a",
    views: None,
};

const GENRE_CARDS: CardLocators = CardLocators {
    item: ".content-genres-item",
    link: "a.genres-item-img",
    title: "a.genres-item-name",
    latest_chapter: ".genres-item-chap",
    views: Some(".genres-item-view"),
};

pub struct Manganato {
    descriptor: SourceDescriptor,
    chapter_host: String,
    fetcher: Arc<dyn PageFetcher>,
}

impl Manganato {
    pub const ID: &'static str = "manganato";

    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_base_url(fetcher, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(fetcher: Arc<dyn PageFetcher>, base_url: &str) -> Self {
        let descriptor = SourceDescriptor::new(Self::ID, "Manganato", base_url);
        let icon = format!("{}/favicon.ico", descriptor.base_url);
        Self {
            descriptor: descriptor.with_icon(icon).with_language("en"),
            chapter_host: DEFAULT_CHAPTER_HOST.to_string(),
            fetcher,
        }
    }

    /// Serve series and chapter pages from another host
    pub fn with_chapter_host(mut self, chapter_host: &str) -> Self {
        self.chapter_host = chapter_host.trim_end_matches('/').to_string();
        self
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
        format!(
            "{}/search/story/{}?page={}",
            self.base_url(),
            urlencoding::encode(&query.replace(' ', "_")),
            page.max(1)
        )
    }

    fn details_url(&self, manga_id: &str) -> String {
        format!("{}/manga-{}", self.chapter_host, manga_id)
    }

    /// Chapter ids are full URLs; a bare path is resolved against the chapter host
    fn chapter_url(&self, chapter_id: &str) -> String {
        if chapter_id.starts_with("http") {
            chapter_id.to_string()
        } else {
            format!("{}/{}", self.chapter_host, chapter_id.trim_start_matches('/'))
        }
    }

    fn popular_url(&self, page: u32) -> String {
        format!("{}/genre-all/{}?type=topview", self.base_url(), page.max(1))
    }

    fn latest_url(&self, page: u32) -> String {
        format!("{}/genre-all/{}", self.base_url(), page.max(1))
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(source = Self::ID, url = %url, "Fetching");
        self.fetcher.fetch(url, &referer_headers(&self.descriptor)).await
    }

    async fn fetch_cards(&self, url: &str, locators: &CardLocators) -> Result<Vec<Card>, SourceError> {
        let markup = self.fetch(url).await?;
        Ok(parse_cards(&markup, locators)?)
    }
}

#[async_trait]
impl MangaSource for Manganato {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn search(&self, query: &str, page: u32) -> Vec<SearchResult> {
        let result = self.fetch_cards(&self.search_url(query, page), &SEARCH_CARDS).await;
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
        let result = self.fetch_cards(&self.popular_url(page), &GENRE_CARDS).await;
        degrade(&self.descriptor, "popular", result)
            .into_iter()
            .map(Card::into_popular)
            .collect()
    }

    async fn latest(&self, page: u32) -> Vec<SearchResult> {
        let result = self.fetch_cards(&self.latest_url(page), &GENRE_CARDS).await;
        degrade(&self.descriptor, "latest", result)
            .into_iter()
            .map(Card::into_search_result)
            .collect()
    }
}

#[derive(Debug)]
struct Card {
    id: String,
    title: String,
    cover: Option<String>,
    url: String,
    latest_chapter: Option<String>,
    views: Option<u64>,
}

impl Card {
    fn into_search_result(self) -> SearchResult {
        SearchResult {
            id: self.id,
            title: self.title,
            cover: self.cover,
            url: self.url,
            source: Manganato::ID.to_string(),
            latest_chapter: self.latest_chapter,
        }
    }

    fn into_popular(self) -> PopularEntry {
        PopularEntry {
            id: self.id,
            title: self.title,
            cover: self.cover.unwrap_or_default(),
            url: self.url,
            source: Manganato::ID.to_string(),
            rating: None,
            views: self.views,
        }
    }
}

fn parse_cards(markup: &str, locators: &CardLocators) -> Result<Vec<Card>, ParseError> {
    let document = Document::parse(markup);
    let mut cards = Vec::new();

    for item in document.select_all(locators.item)? {
        let Some(url) = item.select_one(locators.link)?.and_then(|link| link.attr("href")) else {
            continue;
        };
        let Some(title) = extract::text_of(&item, locators.title)? else {
            continue;
        };

        let views = match locators.views {
            Some(locator) => extract::text_of(&item, locator)?
                .as_deref()
                .and_then(extract::parse_count),
            None => None,
        };

        cards.push(Card {
            id: extract::extract_identifier_from_url(&url, &MANGA_ID),
            title,
            cover: item.select_one("img")?.and_then(|img| img.attr("src")),
            latest_chapter: extract::text_of(&item, locators.latest_chapter)?,
            views,
            url,
        });
    }

    Ok(cards)
}

fn parse_details(markup: &str, manga_id: &str, url: &str) -> Result<MangaDetails, ParseError> {
    let document = Document::parse(markup);

    let title = document.select_one("h1")?.and_then(|node| node.text_opt());
    let chapter_items = document.select_all(".row-content-chapter li")?;
    if title.is_none() && document.select_one(".row-content-chapter")?.is_none() {
        return Err(ParseError::new(
            format!("manganato manga {}", manga_id),
            "page has neither a title nor a chapter list",
        ));
    }

    let mut alternative_titles = BTreeSet::new();
    let mut author = None;
    let mut status = MangaStatus::default();
    let mut genres = Vec::new();
    for row in document.select_all(".variations-tableInfo tr")? {
        let (Some(label), Some(value)) = (row.select_one(".table-label")?, row.select_one(".table-value")?)
        else {
            continue;
        };
        let label = label.text().to_lowercase();
        if label.contains("alternative") {
            alternative_titles.extend(extract::split_titles(&value.text()));
        } else if label.contains("author") {
            author = value.text_opt();
        } else if label.contains("status") {
            status = extract::normalize_status(&value.text());
        } else if label.contains("genres") {
            genres = value
                .select_all("a")?
                .iter()
                .filter_map(|node| node.text_opt())
                .collect();
        }
    }

    let mut views = None;
    for row in document.select_all(".story-info-right-extent p")? {
        let label = extract::text_of(&row, ".stre-label")?.unwrap_or_default();
        if label.to_lowercase().contains("view") {
            views = extract::text_of(&row, ".stre-value")?
                .as_deref()
                .and_then(extract::parse_count);
        }
    }

    let mut chapters = Vec::with_capacity(chapter_items.len());
    for item in chapter_items {
        let Some(link) = item.select_one("a")? else {
            continue;
        };
        let Some(chapter_url) = link.attr("href") else {
            continue;
        };
        let label = link.text_opt();

        chapters.push(Chapter {
            id: chapter_url.clone(),
            number: extract::chapter_number_or(label.as_deref(), &chapter_url),
            title: label,
            release_date: item
                .select_one(".chapter-time")?
                .and_then(|node| node.attr("title")),
            url: chapter_url,
            scanlator: None,
        });
    }

    Ok(MangaDetails {
        id: manga_id.to_string(),
        title: title.unwrap_or_else(|| manga_id.to_string()),
        alternative_titles,
        cover: document
            .select_one(".info-image img")?
            .and_then(|img| img.attr("src")),
        banner: None,
        description: document
            .select_one("#panel-story-info-description")?
            .and_then(|node| node.text_opt()),
        author,
        artist: None,
        status,
        genres,
        tags: Vec::new(),
        rating: document
            .select_one("em#rate_row_cmd")?
            .and_then(|node| node.text_opt())
            .as_deref()
            .and_then(extract::parse_decimal),
        views,
        source: Manganato::ID.to_string(),
        url: url.to_string(),
        chapters,
    })
}

fn parse_chapter_pages(markup: &str, chapter_id: &str) -> Result<ChapterPages, ParseError> {
    let document = Document::parse(markup);
    let reader = extract::require(
        document.select_one(".container-chapter-reader")?,
        &format!("manganato chapter {} reader", chapter_id),
    )?;

    let pages = reader
        .select_all("img")?
        .iter()
        .filter_map(|img| img.attr("src"))
        .collect();

    let title = document
        .select_one(".panel-chapter-info-top h1")?
        .and_then(|node| node.text_opt());

    Ok(ChapterPages {
        chapter_id: chapter_id.to_string(),
        chapter_number: extract::chapter_number_or(title.as_deref(), chapter_id),
        title,
        pages,
    })
}
