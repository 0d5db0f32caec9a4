use anyhow::{Context, Result};
use async_trait::async_trait;
use ce_core::{normalize_listing, Catalog, Event};
use ce_storage::{keys, read_json, DurableStorage};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of the current event catalog.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn fetch(&self) -> Result<Catalog>;
}

/// Reads the events fixture and puts admin-entered events in front of it.
pub struct FixtureEventRepository {
    fixture: PathBuf,
    storage: Arc<dyn DurableStorage>,
}

impl FixtureEventRepository {
    pub fn new(fixture: impl Into<PathBuf>, storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            fixture: fixture.into(),
            storage,
        }
    }

}

/// Decode a stored listing element by element. A missing or unparsable key reads as
/// empty; malformed elements are dropped without losing the rest.
pub fn read_listing<T: DeserializeOwned>(storage: &dyn DurableStorage, key: &str, field: &str) -> Vec<T> {
    match read_json::<Value>(storage, key) {
        Ok(Some(value)) => normalize_listing(&value, field),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "stored listing unreadable, treating as empty");
            Vec::new()
        }
    }
}

/// Admin-entered events in entry order.
pub fn admin_events(storage: &dyn DurableStorage) -> Vec<Event> {
    read_listing(storage, keys::ADMIN_EVENTS, "events")
}

#[async_trait]
impl EventRepository for FixtureEventRepository {
    async fn fetch(&self) -> Result<Catalog> {
        let raw = tokio::fs::read_to_string(&self.fixture)
            .await
            .with_context(|| format!("failed to read events fixture {}", self.fixture.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("events fixture {} is not valid JSON", self.fixture.display()))?;
        let fixture_events: Vec<Event> = normalize_listing(&value, "events");

        let mut events = admin_events(self.storage.as_ref());
        let admin_count = events.len();
        events.extend(fixture_events);
        debug!(admin = admin_count, total = events.len(), "fetched event catalog");

        // No clubs fixture exists; keep the shape stable.
        Ok(Catalog {
            events,
            clubs: Vec::new(),
        })
    }
}

/// Fixed catalog, for tests and demos.
#[derive(Default)]
pub struct StaticEventRepository {
    catalog: Catalog,
}

impl StaticEventRepository {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl EventRepository for StaticEventRepository {
    async fn fetch(&self) -> Result<Catalog> {
        Ok(self.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ce_storage::MemoryStorage;

    #[tokio::test]
    async fn admin_events_come_first() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fixture = dir.path().join("events.json");
        std::fs::write(&fixture, r#"{"events":[{"id":"f1","title":"Fixture","date":"2025-11-15"}]}"#)?;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::ADMIN_EVENTS, r#"[{"id":"a1","title":"Admin","date":"TBA"}]"#)?;

        let repo = FixtureEventRepository::new(&fixture, storage);
        let catalog = repo.fetch().await?;
        let ids: Vec<_> = catalog.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a1", "f1"]);
        assert!(catalog.clubs.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_admin_key_is_ignored() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fixture = dir.path().join("events.json");
        std::fs::write(&fixture, r#"[{"id":"f1","title":"Fixture"}]"#)?;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::ADMIN_EVENTS, "not json")?;

        let catalog = FixtureEventRepository::new(&fixture, storage).fetch().await?;
        assert_eq!(catalog.events.len(), 1);
        Ok(())
    }

    #[test]
    fn stored_listing_keeps_good_entries() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.set(keys::ADMIN_EVENTS, r#"[{"id":"a1","title":"Kept"},{"title":"no id"},{"id":"a2","title":"Also kept"}]"#)?;
        let ids: Vec<_> = admin_events(&storage).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ["a1", "a2"]);
        assert!(read_listing::<Event>(&storage, "campus:missing", "events").is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_fixture_is_an_error() {
        let repo = FixtureEventRepository::new("/nonexistent/events.json", ce_storage::memory());
        assert!(repo.fetch().await.is_err());
    }
}
