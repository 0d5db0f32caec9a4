pub mod repository;

use async_trait::async_trait;
use ce_core::{Booking, BookingId, BookingReceipt, ServiceError};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};

pub use repository::{admin_events, read_listing, EventRepository, FixtureEventRepository, StaticEventRepository};

/// Remote side of the booking flow: accepts a booking and assigns it a permanent id, or
/// fails transiently.
#[async_trait]
pub trait BookingService: Send + Sync {
    async fn post(&self, booking: &Booking) -> Result<BookingReceipt, ServiceError>;
}

/// Stand-in for the network booking endpoint: sleeps, then fails with probability
/// `failure_rate` or confirms with a millisecond-clock id.
pub struct SimulatedBookingService {
    latency: Duration,
    failure_rate: f64,
    last_id: AtomicU64,
}

impl SimulatedBookingService {
    pub fn new(latency: Duration, failure_rate: f64) -> Self {
        Self {
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            last_id: AtomicU64::new(0),
        }
    }

    /// Millisecond clock, bumped so ids stay strictly increasing.
    fn next_id(&self) -> u64 {
        let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
        let prev = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or(now);
        now.max(prev + 1)
    }
}

impl Default for SimulatedBookingService {
    fn default() -> Self {
        Self::new(Duration::from_millis(400), 0.12)
    }
}

#[async_trait]
impl BookingService for SimulatedBookingService {
    async fn post(&self, booking: &Booking) -> Result<BookingReceipt, ServiceError> {
        tokio::time::sleep(self.latency).await;
        let roll: f64 = rand::thread_rng().gen();
        if roll < self.failure_rate {
            warn!(event_id = %booking.event_id, "simulated booking failure");
            return Err(ServiceError::unavailable("Booking service unavailable"));
        }
        let id = BookingId::from(self.next_id());
        debug!(event_id = %booking.event_id, id = %id, "simulated booking confirmed");
        Ok(BookingReceipt::confirmed(booking, id))
    }
}

/// Replays a fixed script of outcomes, then falls back to a repeated one. Records every
/// booking it was asked to post.
pub struct ScriptedBookingService {
    script: Mutex<VecDeque<Result<BookingId, ServiceError>>>,
    fallback: Option<Result<BookingId, ServiceError>>,
    delay: Duration,
    calls: Mutex<Vec<Booking>>,
}

impl ScriptedBookingService {
    pub fn sequence(outcomes: Vec<Result<BookingId, ServiceError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            fallback: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(outcome: Result<BookingId, ServiceError>) -> Self {
        Self {
            fallback: Some(outcome),
            ..Self::sequence(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Booking> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BookingService for ScriptedBookingService {
    async fn post(&self, booking: &Booking) -> Result<BookingReceipt, ServiceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(booking.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let outcome = next
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(ServiceError::unavailable("no scripted outcome left")));
        outcome.map(|id| BookingReceipt::confirmed(booking, id))
    }
}

/// Bounds the inner service call; an elapsed timer is reported as a 504 failure.
pub struct TimeoutBookingService {
    inner: Arc<dyn BookingService>,
    timeout: Duration,
}

impl TimeoutBookingService {
    pub fn new(inner: Arc<dyn BookingService>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl BookingService for TimeoutBookingService {
    async fn post(&self, booking: &Booking) -> Result<BookingReceipt, ServiceError> {
        match tokio::time::timeout(self.timeout, self.inner.post(booking)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    event_id = %booking.event_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "booking service call timed out"
                );
                Err(ServiceError::timed_out())
            }
        }
    }
}

/// Smart constructor for the simulated service, optionally bounded by a timeout.
pub fn simulated_service(latency: Duration, failure_rate: f64, timeout: Option<Duration>) -> Arc<dyn BookingService> {
    let service: Arc<dyn BookingService> = Arc::new(SimulatedBookingService::new(latency, failure_rate));
    match timeout {
        Some(t) if !t.is_zero() => Arc::new(TimeoutBookingService::new(service, t)),
        _ => service,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_without_failures_confirms_with_numeric_ids() {
        let service = SimulatedBookingService::new(Duration::ZERO, 0.0);
        let booking = Booking::provisional("e1", "Alice");
        let a = service.post(&booking).await.unwrap();
        let b = service.post(&booking).await.unwrap();

        assert_eq!(a.status, "ok");
        assert_eq!(a.event_id, "e1");
        assert!(!a.id.is_provisional());
        assert!(a.id.as_str().parse::<u64>().is_ok());
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn simulated_with_certain_failure_reports_503() {
        let service = SimulatedBookingService::new(Duration::ZERO, 1.0);
        let err = service.post(&Booking::provisional("e1", "Bob")).await.unwrap_err();
        assert_eq!(err.code, 503);
        assert_eq!(err.to_string(), "Booking service unavailable");
    }

    #[tokio::test]
    async fn scripted_replays_then_falls_back() {
        let service = ScriptedBookingService::sequence(vec![
            Ok(BookingId::from(1u64)),
            Err(ServiceError::unavailable("network")),
        ]);
        let booking = Booking::provisional("e1", "Alice");
        assert_eq!(service.post(&booking).await.unwrap().id, BookingId::from(1u64));
        assert_eq!(service.post(&booking).await.unwrap_err().message, "network");
        assert!(service.post(&booking).await.is_err());
        assert_eq!(service.calls().len(), 3);

        let always = ScriptedBookingService::always(Ok(BookingId::from(777u64)));
        assert_eq!(always.post(&booking).await.unwrap().id.as_str(), "777");
        assert_eq!(always.post(&booking).await.unwrap().id.as_str(), "777");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_turns_a_hung_call_into_a_failure() {
        let slow = Arc::new(ScriptedBookingService::always(Ok(BookingId::from(1u64))).with_delay(Duration::from_secs(60)));
        let service = TimeoutBookingService::new(slow, Duration::from_millis(100));
        let err = service.post(&Booking::provisional("e1", "Carol")).await.unwrap_err();
        assert_eq!(err.code, 504);
    }
}
