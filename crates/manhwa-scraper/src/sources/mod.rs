//! Source adapters.
//!
//! Every site gets one [`MangaSource`] implementation. An adapter builds a URL,
//! fetches it through the shared [`PageFetcher`], runs its own locators over
//! the markup and maps the result into the canonical model. Locators are kept
//! private to each adapter so a site redesign only breaks that site.

pub mod asurascans;
pub mod manganato;
pub mod registry;

use crate::fetcher::{Headers, PageFetcher};
use async_trait::async_trait;
use shared::config::SourcesConfig;
use shared::{ChapterPages, MangaDetails, PopularEntry, SearchResult, SourceDescriptor, SourceError};
use std::sync::Arc;
use tracing::warn;

pub use asurascans::AsuraScans;
pub use manganato::Manganato;
pub use registry::{RegistryBuilder, SourceRegistry};

/// Ids of the adapters shipped with this crate
pub const BUILTIN_SOURCES: &[&str] = &[AsuraScans::ID, Manganato::ID];

/// Capability set of one manga site.
///
/// Listing operations are best effort and degrade to an empty vector on
/// failure; detail operations return the failure to the caller.
#[async_trait]
pub trait MangaSource: Send + Sync {
    fn descriptor(&self) -> &SourceDescriptor;

    /// Search by free text; `page` is 1-based
    async fn search(&self, query: &str, page: u32) -> Vec<SearchResult>;

    async fn manga_details(&self, manga_id: &str) -> Result<MangaDetails, SourceError>;

    async fn chapter_pages(&self, chapter_id: &str) -> Result<ChapterPages, SourceError>;

    async fn popular(&self, page: u32) -> Vec<PopularEntry>;

    /// Recently updated series
    async fn latest(&self, page: u32) -> Vec<SearchResult>;
}

/// Swallow a listing failure, leaving only a log line behind
pub fn degrade<T>(
    descriptor: &SourceDescriptor,
    operation: &str,
    result: Result<Vec<T>, SourceError>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(
                source = %descriptor.id,
                operation = operation,
                kind = e.kind(),
                error = %e,
                "Listing failed, returning no results"
            );
            Vec::new()
        }
    }
}

/// Headers every adapter sends: the site itself as referer
pub(crate) fn referer_headers(descriptor: &SourceDescriptor) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Referer".to_string(), format!("{}/", descriptor.base_url));
    headers
}

/// Instantiate a built-in adapter by id with the overrides `config` holds for it
pub fn builtin(
    id: &str,
    fetcher: Arc<dyn PageFetcher>,
    config: &SourcesConfig,
) -> Option<Arc<dyn MangaSource>> {
    let base_url = config.base_url(id);
    let inactive = config.is_inactive(id);

    let source: Arc<dyn MangaSource> = match id.to_lowercase().as_str() {
        AsuraScans::ID => {
            let base_url = base_url.unwrap_or(asurascans::DEFAULT_BASE_URL);
            let source = AsuraScans::with_base_url(fetcher, base_url);
            Arc::new(if inactive { source.inactive() } else { source })
        }
        Manganato::ID => {
            let base_url = base_url.unwrap_or(manganato::DEFAULT_BASE_URL);
            let chapter_host = config.chapter_host(id).unwrap_or(manganato::DEFAULT_CHAPTER_HOST);
            let source = Manganato::with_base_url(fetcher, base_url).with_chapter_host(chapter_host);
            Arc::new(if inactive { source.inactive() } else { source })
        }
        _ => return None,
    };
    Some(source)
}
