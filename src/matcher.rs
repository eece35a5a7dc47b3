//! Provider matching — filters and ranks catalog entries for a
//! (service, location) pair.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Provider, ProviderCatalog};
use crate::error::CatalogError;

/// Matches clients with providers.
///
/// Pure over the catalog: ranked subsets are copied out, catalog data is
/// never mutated.
pub struct ProviderMatcher {
    catalog: Arc<dyn ProviderCatalog>,
    /// Maximum number of ranked providers returned.
    limit: usize,
}

impl ProviderMatcher {
    pub fn new(catalog: Arc<dyn ProviderCatalog>, limit: usize) -> Self {
        Self { catalog, limit }
    }

    /// Find up to `limit` providers for a service in a location.
    ///
    /// Providers listing the location as a served area are preferred; when
    /// none do, the full category is used instead (providers may travel,
    /// and an empty result is worse than unranked results). Ranking is
    /// rating descending, then distance magnitude ascending, then catalog
    /// insertion order (the sort is stable).
    pub async fn find_providers(
        &self,
        service: &str,
        location: &str,
    ) -> Result<Vec<Provider>, CatalogError> {
        let candidates = self.catalog.list_by_category(service).await?;
        if candidates.is_empty() {
            debug!(service, "no providers in category");
            return Ok(Vec::new());
        }

        let mut matched: Vec<Provider> = candidates
            .iter()
            .filter(|p| p.serves(location))
            .cloned()
            .collect();
        if matched.is_empty() {
            debug!(service, location, "no provider serves the location; using full category");
            matched = candidates;
        }

        matched.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then(a.distance.magnitude.total_cmp(&b.distance.magnitude))
        });
        matched.truncate(self.limit);
        Ok(matched)
    }
}
