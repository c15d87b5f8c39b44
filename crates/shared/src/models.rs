//! Canonical data model.
//!
//! Every source adapter maps its site's markup into these shapes. Values are
//! built once per query and never mutated afterwards.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

/// Static description of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Registry key, always lowercase
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub icon: Option<String>,
    pub language: String,
    pub is_active: bool,
}

impl SourceDescriptor {
    /// Create a descriptor. The id is lowercased so it always matches the registry key.
    pub fn new(id: &str, name: &str, base_url: &str) -> Self {
        Self {
            id: id.to_lowercase(),
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            icon: None,
            language: "en".to_string(),
            is_active: true,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Keep the source queryable by id but out of multi-source fan-out
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Publication status of a series
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MangaStatus {
    #[default]
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
}

impl std::fmt::Display for MangaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MangaStatus::Ongoing => write!(f, "ongoing"),
            MangaStatus::Completed => write!(f, "completed"),
            MangaStatus::Hiatus => write!(f, "hiatus"),
            MangaStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for MangaStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ongoing" => Ok(MangaStatus::Ongoing),
            "completed" => Ok(MangaStatus::Completed),
            "hiatus" => Ok(MangaStatus::Hiatus),
            "cancelled" => Ok(MangaStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid manga status: {}", s)),
        }
    }
}

/// One entry of a search or latest-updates listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Unique only within `source`
    pub id: String,
    pub title: String,
    pub cover: Option<String>,
    pub url: String,
    pub source: String,
    /// Free text as shown by the site, e.g. "Chapter 112"
    pub latest_chapter: Option<String>,
}

impl SearchResult {
    /// `source:id`, unique across sources
    pub fn scoped_key(&self) -> String {
        scoped_key(&self.source, &self.id)
    }
}

/// One entry of a popular listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularEntry {
    pub id: String,
    pub title: String,
    pub cover: String,
    pub url: String,
    pub source: String,
    pub rating: Option<f64>,
    pub views: Option<u64>,
}

impl PopularEntry {
    pub fn scoped_key(&self) -> String {
        scoped_key(&self.source, &self.id)
    }
}

/// Chapter as listed on a manga page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Opaque token accepted by the source's chapter-pages query
    pub id: String,
    /// Fractional chapters (12.5) are valid; 0.0 when the site gives no number
    pub number: f64,
    pub title: Option<String>,
    pub url: String,
    /// Verbatim, the format differs per site
    pub release_date: Option<String>,
    pub scanlator: Option<String>,
}

/// Image list of a single chapter, in reading order
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterPages {
    pub chapter_id: String,
    pub chapter_number: f64,
    pub title: Option<String>,
    pub pages: Vec<String>,
}

impl ChapterPages {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }
}

impl Serialize for ChapterPages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChapterPages", 5)?;
        state.serialize_field("chapter_id", &self.chapter_id)?;
        state.serialize_field("chapter_number", &self.chapter_number)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("pages", &self.pages)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.end()
    }
}

/// Full series page, chapters embedded in the order the site lists them
#[derive(Debug, Clone, PartialEq)]
pub struct MangaDetails {
    pub id: String,
    pub title: String,
    pub alternative_titles: BTreeSet<String>,
    pub cover: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub status: MangaStatus,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub rating: Option<f64>,
    pub views: Option<u64>,
    pub source: String,
    pub url: String,
    pub chapters: Vec<Chapter>,
}

impl MangaDetails {
    pub fn total_chapters(&self) -> usize {
        self.chapters.len()
    }

    pub fn scoped_key(&self) -> String {
        scoped_key(&self.source, &self.id)
    }
}

impl Serialize for MangaDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MangaDetails", 17)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("alternative_titles", &self.alternative_titles)?;
        state.serialize_field("cover", &self.cover)?;
        state.serialize_field("banner", &self.banner)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("author", &self.author)?;
        state.serialize_field("artist", &self.artist)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("genres", &self.genres)?;
        state.serialize_field("tags", &self.tags)?;
        state.serialize_field("rating", &self.rating)?;
        state.serialize_field("views", &self.views)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("url", &self.url)?;
        state.serialize_field("chapters", &self.chapters)?;
        state.serialize_field("total_chapters", &self.total_chapters())?;
        state.end()
    }
}

fn scoped_key(source: &str, id: &str) -> String {
    format!("{}:{}", source, id)
}
