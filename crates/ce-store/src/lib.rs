pub mod admin;
pub mod booking;

pub use admin::{AdminError, AdminEvents, EventDraft};
pub use booking::{BookingError, BookingStore, Listener, PendingBooking};
