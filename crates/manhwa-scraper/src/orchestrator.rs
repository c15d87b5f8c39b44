//! Query orchestrator: validates the source id and dispatches to its adapter.

use crate::sources::{MangaSource, SourceRegistry};
use futures::future::join_all;
use serde::Serialize;
use shared::{
    ChapterPages, MangaDetails, PopularEntry, SearchResult, SourceDescriptor, SourceError,
};
use std::sync::Arc;
use tracing::debug;

/// Uniform envelope for every query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    /// Error kind such as `unknown_source`, absent on success
    pub error: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "Success".to_string(),
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(error: &SourceError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error: Some(error.kind().to_string()),
            data: None,
        }
    }

    pub fn from_result(result: Result<T, SourceError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}

pub struct QueryOrchestrator {
    registry: Arc<SourceRegistry>,
}

impl QueryOrchestrator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    fn source(&self, id: &str) -> Result<Arc<dyn MangaSource>, SourceError> {
        self.registry
            .get(id)
            .ok_or_else(|| SourceError::UnknownSource(id.to_string()))
    }

    pub fn sources(&self) -> Vec<SourceDescriptor> {
        self.registry.descriptors()
    }

    pub async fn search(
        &self,
        source: &str,
        query: &str,
        page: u32,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let adapter = self.source(source)?;
        debug!(source = %source, query = %query, page, "Search");
        Ok(adapter.search(query, page).await)
    }

    pub async fn manga_details(
        &self,
        source: &str,
        manga_id: &str,
    ) -> Result<MangaDetails, SourceError> {
        let adapter = self.source(source)?;
        debug!(source = %source, manga_id = %manga_id, "Manga details");
        adapter.manga_details(manga_id).await
    }

    pub async fn chapter_pages(
        &self,
        source: &str,
        chapter_id: &str,
    ) -> Result<ChapterPages, SourceError> {
        let adapter = self.source(source)?;
        debug!(source = %source, chapter_id = %chapter_id, "Chapter pages");
        adapter.chapter_pages(chapter_id).await
    }

    pub async fn popular(&self, source: &str, page: u32) -> Result<Vec<PopularEntry>, SourceError> {
        let adapter = self.source(source)?;
        Ok(adapter.popular(page).await)
    }

    pub async fn latest(&self, source: &str, page: u32) -> Result<Vec<SearchResult>, SourceError> {
        let adapter = self.source(source)?;
        Ok(adapter.latest(page).await)
    }

    /// Search every active source concurrently, results concatenated in registry order.
    ///
    /// A failing source contributes nothing. Inactive sources are skipped here but still
    /// answer queries addressed to them by id.
    pub async fn search_all(&self, query: &str, page: u32) -> Vec<SearchResult> {
        let active: Vec<_> = self
            .registry
            .all()
            .values()
            .filter(|adapter| {
                let descriptor = adapter.descriptor();
                if !descriptor.is_active {
                    debug!(source = %descriptor.id, "Skipping inactive source");
                }
                descriptor.is_active
            })
            .collect();

        let searches = active.iter().map(|adapter| adapter.search(query, page));
        let results: Vec<SearchResult> = join_all(searches).await.into_iter().flatten().collect();
        debug!(query = %query, sources = active.len(), results = results.len(), "Searched all sources");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{PageFetcher, StaticFetcher};
    use shared::config::SourcesConfig;

    const ASURA_SEARCH: &str = r#"
        <div class="listupd"><div class="bs">
          <a href="https://asuracomic.net/manga/solo-leveling/"><div class="tt">Solo Leveling</div></a>
        </div></div>
    "#;

    fn orchestrator(fetcher: StaticFetcher) -> (Arc<StaticFetcher>, QueryOrchestrator) {
        let fetcher = Arc::new(fetcher);
        let registry = SourceRegistry::from_config(
            &SourcesConfig::default(),
            Arc::clone(&fetcher) as Arc<dyn PageFetcher>,
        );
        (fetcher, QueryOrchestrator::new(Arc::new(registry)))
    }

    #[tokio::test]
    async fn test_unknown_source_never_fetches() {
        let (fetcher, orchestrator) = orchestrator(StaticFetcher::new());

        let err = orchestrator.search("mangadex", "one piece", 1).await.unwrap_err();
        assert_eq!(err, SourceError::UnknownSource("mangadex".to_string()));

        let err = orchestrator.manga_details("mangadex", "abc").await.unwrap_err();
        assert_eq!(err.kind(), "unknown_source");

        assert!(orchestrator.chapter_pages("mangadex", "c").await.is_err());
        assert!(orchestrator.popular("mangadex", 1).await.is_err());
        assert!(orchestrator.latest("mangadex", 1).await.is_err());

        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_is_case_insensitive() {
        let (_, orchestrator) = orchestrator(
            StaticFetcher::new().with_page("https://asuracomic.net/?s=solo", ASURA_SEARCH),
        );

        let results = orchestrator.search("AsuraScans", "solo", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scoped_key(), "asurascans:solo-leveling");
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_empty_success() {
        let (_, orchestrator) = orchestrator(StaticFetcher::new());

        let results = orchestrator.popular("manganato", 1).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_details_failure_is_forwarded() {
        let (_, orchestrator) = orchestrator(StaticFetcher::new());

        let err = orchestrator.manga_details("manganato", "abc123").await.unwrap_err();
        assert!(matches!(err, SourceError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_search_all_survives_a_failing_source() {
        // Only asurascans answers; manganato gets a 404
        let (fetcher, orchestrator) = orchestrator(
            StaticFetcher::new().with_page("https://asuracomic.net/?s=solo", ASURA_SEARCH),
        );

        let results = orchestrator.search_all("solo", 1).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "asurascans");
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_search_all_skips_inactive_sources() {
        let fetcher = Arc::new(
            StaticFetcher::new().with_page("https://asuracomic.net/?s=solo", ASURA_SEARCH),
        );
        let config = SourcesConfig {
            inactive: vec!["manganato".to_string()],
            ..SourcesConfig::default()
        };
        let registry = SourceRegistry::from_config(&config, Arc::clone(&fetcher) as Arc<dyn PageFetcher>);
        let orchestrator = QueryOrchestrator::new(Arc::new(registry));

        let results = orchestrator.search_all("solo", 1).await;

        assert_eq!(results.len(), 1);
        assert_eq!(fetcher.requests(), vec!["https://asuracomic.net/?s=solo"]);

        // Still reachable by id
        orchestrator.search("manganato", "solo", 1).await.unwrap();
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[test]
    fn test_sources_lists_descriptors() {
        let (_, orchestrator) = orchestrator(StaticFetcher::new());

        let ids: Vec<_> = orchestrator.sources().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["asurascans", "manganato"]);
    }

    #[test]
    fn test_response_envelope() {
        let ok = ApiResponse::from_result(Ok::<_, SourceError>(vec![1, 2]));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Success");
        assert!(json["error"].is_null());
        assert_eq!(json["data"], serde_json::json!([1, 2]));

        let failed: ApiResponse<Vec<u8>> =
            ApiResponse::from_result(Err(SourceError::UnknownSource("mangadex".to_string())));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "unknown source: mangadex");
        assert_eq!(json["error"], "unknown_source");
        assert!(json["data"].is_null());
    }
}
