//! Location directory: distinct states, districts and villages from the
//! catalog, cached per lookup for a fixed time.
//!
//! Only lookups that match something are cached, so the cache never
//! holds more keys than the catalog has states and districts.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fixmyarea_core::clock::Clock;
use fixmyarea_core::error::FixMyAreaResult;
use fixmyarea_core::models::location::LocationEntry;
use fixmyarea_core::repository::LocationRepository;
use tracing::debug;

/// Default cache lifetime (five minutes).
pub const DEFAULT_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Lookup {
    States,
    Districts { state: String },
    Villages { state: String, district: String },
}

impl Lookup {
    /// Sorted distinct values for this lookup.
    fn project(&self, entries: &[LocationEntry]) -> Vec<String> {
        let values: BTreeSet<&str> = match self {
            Lookup::States => entries.iter().map(|e| e.state.as_str()).collect(),
            Lookup::Districts { state } => entries
                .iter()
                .filter(|e| &e.state == state)
                .map(|e| e.district.as_str())
                .collect(),
            Lookup::Villages { state, district } => entries
                .iter()
                .filter(|e| &e.state == state && &e.district == district)
                .map(|e| e.village.as_str())
                .collect(),
        };
        values.into_iter().map(str::to_string).collect()
    }
}

#[derive(Debug, Clone)]
struct Cached {
    values: Vec<String>,
    loaded_at: DateTime<Utc>,
}

/// Injected cache over a [`LocationRepository`]. Clones share the cache.
#[derive(Clone)]
pub struct LocationDirectory<L: LocationRepository> {
    repo: L,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: Arc<DashMap<Lookup, Cached>>,
}

impl<L: LocationRepository> LocationDirectory<L> {
    pub fn new(repo: L, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            repo,
            clock,
            ttl,
            cache: Arc::new(DashMap::new()),
        }
    }

    pub fn with_default_ttl(repo: L, clock: Arc<dyn Clock>) -> Self {
        Self::new(repo, clock, Duration::seconds(DEFAULT_TTL_SECS))
    }

    pub async fn states(&self) -> FixMyAreaResult<Vec<String>> {
        self.lookup(Lookup::States).await
    }

    pub async fn districts(&self, state: &str) -> FixMyAreaResult<Vec<String>> {
        self.lookup(Lookup::Districts {
            state: state.to_string(),
        })
        .await
    }

    pub async fn villages(&self, state: &str, district: &str) -> FixMyAreaResult<Vec<String>> {
        self.lookup(Lookup::Villages {
            state: state.to_string(),
            district: district.to_string(),
        })
        .await
    }

    /// Drop every cached lookup.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Number of lookups currently held.
    pub fn cached_lookups(&self) -> usize {
        self.cache.len()
    }

    async fn lookup(&self, key: Lookup) -> FixMyAreaResult<Vec<String>> {
        let now = self.clock.now();
        if let Some(hit) = self.cache.get(&key) {
            if now - hit.loaded_at < self.ttl {
                return Ok(hit.values.clone());
            }
        }

        let entries = self.repo.list().await?;
        let values = key.project(&entries);
        debug!(lookup = ?key, count = values.len(), "Location lookup loaded");
        if values.is_empty() {
            return Ok(values);
        }

        let ttl = self.ttl;
        self.cache.retain(|_, cached| now - cached.loaded_at < ttl);
        self.cache.insert(
            key,
            Cached {
                values: values.clone(),
                loaded_at: now,
            },
        );
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<LocationEntry> {
        vec![
            LocationEntry::new("Kerala", "Ernakulam", "Kakkanad"),
            LocationEntry::new("Kerala", "Ernakulam", "Aluva"),
            LocationEntry::new("Kerala", "Thrissur", "Chalakudy"),
            LocationEntry::new("Karnataka", "Mysuru", "Hunsur"),
        ]
    }

    #[test]
    fn projections_are_sorted_and_distinct() {
        let entries = catalog();
        assert_eq!(Lookup::States.project(&entries), vec!["Karnataka", "Kerala"]);
        assert_eq!(
            Lookup::Districts { state: "Kerala".into() }.project(&entries),
            vec!["Ernakulam", "Thrissur"]
        );
        assert_eq!(
            Lookup::Villages {
                state: "Kerala".into(),
                district: "Ernakulam".into()
            }
            .project(&entries),
            vec!["Aluva", "Kakkanad"]
        );
        assert!(Lookup::Districts { state: "Goa".into() }.project(&entries).is_empty());
    }
}
