use anyhow::Result;
use ce_adapters::EventRepository;
use ce_store::{AdminEvents, BookingStore, Listener};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use utoipa::ToSchema;

/// Payload of one change-stream message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChangeNotice {
    pub bookings: usize,
    pub events: usize,
}

impl ChangeNotice {
    fn of(store: &BookingStore) -> Self {
        Self {
            bookings: store.bookings().len(),
            events: store.events().len(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BookingStore>,
    pub admin: Arc<AdminEvents>,
    pub repository: Arc<dyn EventRepository>,
    pub changes: broadcast::Sender<ChangeNotice>,
    pub admin_enabled: bool,
}

impl AppState {
    /// Wires the store's change notifications into a broadcast channel for stream clients.
    pub fn new(
        store: Arc<BookingStore>,
        admin: Arc<AdminEvents>,
        repository: Arc<dyn EventRepository>,
        admin_enabled: bool,
    ) -> Self {
        let (changes, _) = broadcast::channel(64);
        let tx = changes.clone();
        let listener: Listener = Arc::new(move |store: &BookingStore| {
            // No receivers is fine.
            let _ = tx.send(ChangeNotice::of(store));
        });
        store.subscribe(&listener);

        Self {
            store,
            admin,
            repository,
            changes,
            admin_enabled,
        }
    }

    /// Re-fetch the catalog and hand it to the store.
    pub async fn refresh(&self) -> Result<usize> {
        let catalog = self.repository.fetch().await?;
        let count = catalog.events.len();
        self.store.replace_catalog(catalog);
        info!(events = count, "event catalog refreshed");
        Ok(count)
    }
}
