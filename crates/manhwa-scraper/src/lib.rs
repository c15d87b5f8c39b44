//! Manhwa scraper library: one canonical catalog over several manga sites.
//!
//! Each supported site is a [`MangaSource`] adapter that turns the site's HTML
//! into the shared model. Adapters live in a read-only [`SourceRegistry`] and are
//! queried through the [`QueryOrchestrator`]. All network access goes through a
//! [`PageFetcher`], which owns throttling, retries and Cloudflare handling.

pub mod extract;
pub mod fetcher;
pub mod orchestrator;
pub mod sources;

pub use fetcher::{HttpFetcher, PageFetcher, StaticFetcher};
pub use orchestrator::{ApiResponse, QueryOrchestrator};
pub use sources::{AsuraScans, MangaSource, Manganato, RegistryBuilder, SourceRegistry};
