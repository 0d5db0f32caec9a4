//! Booking store with optimistic updates.
//!
//! A booking goes through two phases. [`BookingStore::begin_booking`] appends it under a
//! provisional id, persists and notifies, all synchronously. [`PendingBooking::settle`]
//! then takes the booking service's answer: success swaps in the confirmed id in place,
//! failure removes the entry again. [`BookingStore::book`] runs both phases around the
//! service call, which is its only suspension point.
//!
//! All mutations happen inside one short critical section and are mirrored to durable
//! storage before the lock is released. Listeners run afterwards, outside the lock.

use ce_adapters::{read_listing, BookingService, SimulatedBookingService};
use ce_core::{normalize_listing, Booking, BookingId, BookingReceipt, Catalog, Club, Event, ServiceError};
use ce_storage::{keys, write_json, DurableStorage};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Change callback. Identity is the `Arc` allocation, so subscribing a clone of the same
/// listener twice registers it once.
pub type Listener = Arc<dyn Fn(&BookingStore) + Send + Sync>;

#[derive(Debug, Error)]
pub enum BookingError {
    /// The booking service refused; its error is passed through untouched.
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("booking service confirmed id {0}, which another booking already holds")]
    DuplicateId(BookingId),
}

impl BookingError {
    pub fn service(&self) -> Option<&ServiceError> {
        match self {
            BookingError::Service(e) => Some(e),
            BookingError::DuplicateId(_) => None,
        }
    }
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    clubs: Vec<Club>,
    bookings: Vec<Booking>,
}

pub struct BookingStore {
    state: Mutex<State>,
    listeners: Mutex<Vec<Listener>>,
    storage: Arc<dyn DurableStorage>,
    service: Arc<dyn BookingService>,
}

impl BookingStore {
    /// Store backed by the simulated booking service.
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_service(storage, Arc::new(SimulatedBookingService::default()))
    }

    pub fn with_service(storage: Arc<dyn DurableStorage>, service: Arc<dyn BookingService>) -> Self {
        let bookings = load_bookings(storage.as_ref());
        debug!(count = bookings.len(), "loaded bookings");
        Self {
            state: Mutex::new(State {
                bookings,
                ..State::default()
            }),
            listeners: Mutex::new(Vec::new()),
            storage,
            service,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn clubs(&self) -> Vec<Club> {
        self.state().clubs.clone()
    }

    /// Bookings in the order they were made.
    pub fn bookings(&self) -> Vec<Booking> {
        self.state().bookings.clone()
    }

    pub fn bookings_for_event(&self, event_id: &str) -> Vec<Booking> {
        self.state()
            .bookings
            .iter()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect()
    }

    /// Returns `true` if the listener was not already registered.
    pub fn subscribe(&self, listener: &Listener) -> bool {
        let mut listeners = self.listeners();
        if listeners.iter().any(|l| Arc::ptr_eq(l, listener)) {
            return false;
        }
        listeners.push(Arc::clone(listener));
        true
    }

    /// Returns `true` if the listener was registered.
    pub fn unsubscribe(&self, listener: &Listener) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    fn notify(&self) {
        let listeners = self.listeners().clone();
        for listener in listeners {
            listener(self);
        }
    }

    /// Full overwrite of the bookings key. Failures are logged; memory stays authoritative.
    fn persist(&self, bookings: &[Booking]) {
        if let Err(e) = write_json(self.storage.as_ref(), keys::BOOKINGS, bookings) {
            warn!(error = %e, count = bookings.len(), "failed to persist bookings");
        }
    }

    /// Replace the cached events and clubs. Each value may be a bare array or an object
    /// wrapping it under `events` / `clubs`; anything else becomes empty.
    pub fn set_data(&self, events: &Value, clubs: &Value) {
        let events: Vec<Event> = normalize_listing(events, "events");
        let clubs: Vec<Club> = normalize_listing(clubs, "clubs");
        self.replace_catalog(Catalog { events, clubs });
    }

    pub fn replace_catalog(&self, catalog: Catalog) {
        {
            let mut state = self.state();
            debug!(events = catalog.events.len(), clubs = catalog.clubs.len(), "catalog replaced");
            state.events = catalog.events;
            state.clubs = catalog.clubs;
        }
        self.notify();
    }

    /// Drop an event from the cached catalog. Bookings for it are kept.
    pub fn remove_event(&self, event_id: &str) -> bool {
        let removed = {
            let mut state = self.state();
            let before = state.events.len();
            state.events.retain(|e| e.id != event_id);
            state.events.len() != before
        };
        if removed {
            self.notify();
        }
        removed
    }

    /// Optimistic phase: append a provisional booking, persist, notify.
    pub fn begin_booking(&self, event_id: impl Into<String>, user: impl Into<String>) -> PendingBooking<'_> {
        let booking = Booking::provisional(event_id, user);
        {
            let mut state = self.state();
            state.bookings.push(booking.clone());
            self.persist(&state.bookings);
        }
        debug!(id = %booking.id, event_id = %booking.event_id, "provisional booking added");
        self.notify();
        PendingBooking {
            store: self,
            booking,
            settled: false,
        }
    }

    /// Book an event. The provisional entry is visible as soon as the returned future is
    /// first polled; it is confirmed or rolled back before the future completes.
    pub async fn book(
        &self,
        event_id: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<BookingReceipt, BookingError> {
        let pending = self.begin_booking(event_id, user);
        let outcome = self.service.post(pending.booking()).await;
        pending.settle(outcome)
    }

    /// Remove a booking by id. Persists and notifies only when something was removed.
    pub fn remove_booking(&self, id: &BookingId) -> bool {
        if id.is_empty() {
            return false;
        }
        let removed = {
            let mut state = self.state();
            let before = state.bookings.len();
            state.bookings.retain(|b| b.id != *id);
            let removed = state.bookings.len() != before;
            if removed {
                self.persist(&state.bookings);
            }
            removed
        };
        if removed {
            info!(id = %id, "booking removed");
            self.notify();
        }
        removed
    }

    fn confirm(&self, provisional: &BookingId, receipt: BookingReceipt) -> Result<BookingReceipt, BookingError> {
        let outcome = {
            let mut state = self.state();
            let taken = state
                .bookings
                .iter()
                .any(|b| b.id == receipt.id && b.id != *provisional);
            if taken {
                state.bookings.retain(|b| b.id != *provisional);
                self.persist(&state.bookings);
                Err(BookingError::DuplicateId(receipt.id.clone()))
            } else {
                match state.bookings.iter_mut().find(|b| b.id == *provisional) {
                    Some(b) => b.id = receipt.id.clone(),
                    None => debug!(id = %provisional, "provisional booking removed before confirmation"),
                }
                self.persist(&state.bookings);
                Ok(receipt)
            }
        };
        match &outcome {
            Ok(receipt) => info!(provisional = %provisional, id = %receipt.id, "booking confirmed"),
            Err(e) => warn!(provisional = %provisional, error = %e, "booking rolled back"),
        }
        self.notify();
        outcome
    }

    /// Remove the provisional entry. A no-op if it is already gone.
    fn roll_back(&self, provisional: &BookingId) -> bool {
        let removed = {
            let mut state = self.state();
            let before = state.bookings.len();
            state.bookings.retain(|b| b.id != *provisional);
            self.persist(&state.bookings);
            state.bookings.len() != before
        };
        self.notify();
        removed
    }
}

/// Records that fail to decode are skipped, so one bad entry cannot take the rest with it.
fn load_bookings(storage: &dyn DurableStorage) -> Vec<Booking> {
    read_listing(storage, keys::BOOKINGS, "bookings")
}

/// A booking between its optimistic append and the service's answer.
///
/// Settling consumes the token. Dropping it unsettled rolls the booking back.
#[must_use = "an unsettled booking is rolled back when dropped"]
pub struct PendingBooking<'a> {
    store: &'a BookingStore,
    booking: Booking,
    settled: bool,
}

impl PendingBooking<'_> {
    pub fn booking(&self) -> &Booking {
        &self.booking
    }

    pub fn id(&self) -> &BookingId {
        &self.booking.id
    }

    /// Pending → Confirmed on `Ok`, Pending → RolledBack on `Err`.
    pub fn settle(mut self, outcome: Result<BookingReceipt, ServiceError>) -> Result<BookingReceipt, BookingError> {
        self.settled = true;
        match outcome {
            Ok(receipt) => self.store.confirm(&self.booking.id, receipt),
            Err(err) => {
                let removed = self.store.roll_back(&self.booking.id);
                warn!(
                    provisional = %self.booking.id,
                    code = err.code,
                    error = %err,
                    removed,
                    "booking failed, rolled back"
                );
                Err(err.into())
            }
        }
    }
}

impl Drop for PendingBooking<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(provisional = %self.booking.id, "pending booking abandoned, rolling back");
            self.store.roll_back(&self.booking.id);
        }
    }
}
