//! Service categories and the provider catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// A bookable service category.
///
/// The set is fixed and declaration-ordered; keyword classification walks
/// it front to back, so earlier categories win trigger-word ties.
#[derive(Debug)]
pub struct ServiceCategory {
    /// Menu digit the user can reply with.
    pub key: &'static str,
    /// Display name, also the catalog category key (lower-cased).
    pub name: &'static str,
    pub emoji: &'static str,
    /// Trigger substrings for free-form classification.
    pub triggers: &'static [&'static str],
}

/// The service menu, in declaration (and menu) order.
pub const SERVICES: &[ServiceCategory] = &[
    ServiceCategory {
        key: "1",
        name: "Plumbing",
        emoji: "🔧",
        triggers: &["plumb", "pipe", "tap", "water"],
    },
    ServiceCategory {
        key: "2",
        name: "Electrical",
        emoji: "⚡",
        triggers: &["electric", "wire", "power", "light"],
    },
    ServiceCategory {
        key: "3",
        name: "Cleaning",
        emoji: "🧹",
        triggers: &["clean", "house", "tidy"],
    },
    ServiceCategory {
        key: "4",
        name: "Tutoring",
        emoji: "📚",
        triggers: &["tutor", "teach", "lesson", "study"],
    },
    ServiceCategory {
        key: "5",
        name: "Car Repair",
        emoji: "🚗",
        triggers: &["car", "vehicle", "mechanic"],
    },
    ServiceCategory {
        key: "6",
        name: "Painting",
        emoji: "🎨",
        triggers: &["paint", "color", "wall"],
    },
];

/// Distance of a provider from the client, magnitude plus unit.
///
/// Magnitudes are compared raw during ranking; all catalog entries are
/// assumed to share one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub magnitude: f64,
    pub unit: String,
}

impl Distance {
    pub fn km(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: "km".to_string(),
        }
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// A catalog entry — read-only reference data, never mutated by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    /// Phone number (or equivalent) the provider is reachable on.
    pub contact: String,
    /// 0.0–5.0.
    pub rating: f32,
    pub review_count: u32,
    /// Hourly rate in minor currency units.
    pub hourly_rate: u32,
    pub distance: Distance,
    /// Areas the provider lists as served; matched case-insensitively.
    pub service_areas: Vec<String>,
}

impl Provider {
    /// Whether this provider lists `location` as a served area.
    pub fn serves(&self, location: &str) -> bool {
        self.service_areas
            .iter()
            .any(|area| area.eq_ignore_ascii_case(location))
    }
}

/// Read access to the provider catalog.
#[async_trait]
pub trait ProviderCatalog: Send + Sync {
    /// List providers for a category name (case-insensitive). Unknown
    /// categories yield an empty list, not an error.
    async fn list_by_category(&self, service: &str) -> Result<Vec<Provider>, CatalogError>;
}

/// In-memory catalog, keyed by lower-cased category name.
pub struct InMemoryCatalog {
    providers: HashMap<String, Vec<Provider>>,
}

impl InMemoryCatalog {
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register providers under a category, replacing any existing list.
    pub fn insert(&mut self, category: &str, providers: Vec<Provider>) {
        self.providers.insert(category.to_lowercase(), providers);
    }

    /// Demo catalog with sample providers across all six categories.
    pub fn with_sample_providers() -> Self {
        fn provider(
            id: &str,
            name: &str,
            contact: &str,
            rating: f32,
            review_count: u32,
            hourly_rate: u32,
            distance_km: f64,
            areas: &[&str],
        ) -> Provider {
            Provider {
                id: id.to_string(),
                name: name.to_string(),
                contact: contact.to_string(),
                rating,
                review_count,
                hourly_rate,
                distance: Distance::km(distance_km),
                service_areas: areas.iter().map(|a| a.to_string()).collect(),
            }
        }

        let mut catalog = Self::empty();
        catalog.insert(
            "plumbing",
            vec![
                provider("p1", "Mike Johnson", "+254700123456", 4.9, 245, 1200, 2.1,
                    &["westlands", "kilimani", "parklands"]),
                provider("p2", "Grace Wanjiku", "+254700123457", 4.8, 189, 1000, 3.5,
                    &["westlands", "karen", "lavington"]),
                provider("p3", "Peter Kamau", "+254700123458", 4.7, 156, 1500, 4.2,
                    &["westlands", "upperhill", "cbd"]),
            ],
        );
        catalog.insert(
            "electrical",
            vec![
                provider("e1", "John Mwangi", "+254700123459", 4.8, 198, 1300, 1.8,
                    &["westlands", "kilimani", "parklands"]),
                provider("e2", "Sarah Njeri", "+254700123460", 4.9, 234, 1400, 2.9,
                    &["karen", "lavington", "runda"]),
            ],
        );
        catalog.insert(
            "cleaning",
            vec![
                provider("c1", "Anne Muthoni", "+254700123461", 4.6, 167, 800, 1.5,
                    &["westlands", "kilimani", "parklands"]),
                provider("c2", "Mary Wanjiru", "+254700123462", 4.7, 203, 900, 3.1,
                    &["karen", "lavington", "upperhill"]),
            ],
        );
        catalog.insert(
            "tutoring",
            vec![
                provider("t1", "David Kiprotich", "+254700123463", 4.9, 312, 600, 2.3,
                    &["westlands", "kilimani", "lavington"]),
                provider("t2", "Lucy Akinyi", "+254700123464", 4.8, 278, 700, 3.7,
                    &["karen", "runda", "muthaiga"]),
            ],
        );
        catalog.insert(
            "car repair",
            vec![provider("cr1", "James Ochieng", "+254700123465", 4.7, 189, 1500, 4.1,
                &["westlands", "parklands", "kasarani"])],
        );
        catalog.insert(
            "painting",
            vec![provider("pt1", "Robert Mutua", "+254700123466", 4.5, 145, 700, 2.8,
                &["westlands", "kilimani", "upperhill"])],
        );
        catalog
    }
}

#[async_trait]
impl ProviderCatalog for InMemoryCatalog {
    async fn list_by_category(&self, service: &str) -> Result<Vec<Provider>, CatalogError> {
        Ok(self
            .providers
            .get(&service.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}
