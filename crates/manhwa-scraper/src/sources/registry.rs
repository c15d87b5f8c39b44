//! Source registry: lowercase id to adapter, built once at startup.

use super::{builtin, MangaSource};
use crate::fetcher::PageFetcher;
use shared::config::SourcesConfig;
use shared::SourceDescriptor;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Collects adapters before the registry is frozen
#[derive(Default)]
pub struct RegistryBuilder {
    sources: BTreeMap<String, Arc<dyn MangaSource>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under its descriptor id. A second source with the same id replaces the first.
    ///
    /// Ids must be lowercase so that the key and `descriptor().id` agree; other sources are skipped.
    pub fn register(mut self, source: Arc<dyn MangaSource>) -> Self {
        let id = source.descriptor().id.clone();
        if id != id.to_lowercase() {
            warn!(source = %id, "Source id is not lowercase, skipping");
            return self;
        }
        if self.sources.insert(id.clone(), source).is_some() {
            warn!(source = %id, "Source registered twice, keeping the latest");
        }
        self
    }

    pub fn build(self) -> SourceRegistry {
        SourceRegistry {
            sources: self.sources,
        }
    }
}

/// Read-only mapping from source id to adapter. Safe to share between tasks.
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn MangaSource>>,
}

impl SourceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Register the built-in adapters named in the configuration
    pub fn from_config(config: &SourcesConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let mut builder = RegistryBuilder::new();

        for id in &config.enabled {
            let id = id.to_lowercase();
            match builtin(&id, Arc::clone(&fetcher), config) {
                Some(source) => {
                    info!(
                        source = %id,
                        base_url = %source.descriptor().base_url,
                        active = source.descriptor().is_active,
                        "Registered source"
                    );
                    builder = builder.register(source);
                }
                None => warn!(source = %id, "Unknown source in configuration, skipping"),
            }
        }

        builder.build()
    }

    /// Case-insensitive lookup
    pub fn get(&self, id: &str) -> Option<Arc<dyn MangaSource>> {
        self.sources.get(&id.to_lowercase()).cloned()
    }

    pub fn all(&self) -> &BTreeMap<String, Arc<dyn MangaSource>> {
        &self.sources
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        self.sources
            .values()
            .map(|source| source.descriptor().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
