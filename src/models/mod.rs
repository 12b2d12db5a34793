//! Domain models for the Courtside backend.
//!
//! Venues own courts, courts are booked slot by slot, and confirmed
//! revenue is rolled up into monthly owner settlements.

pub mod booking;
pub mod evidence;
pub mod settlement;
pub mod venue;

// Re-export all models for convenient access
pub use booking::{Booking, BookingAction, BookingStatus, NewBooking, NewRefund, RefundRecord};
pub use evidence::EvidenceUpload;
pub use settlement::{CashSettlement, NewPayoutTransfer, NewSettlement, PayoutStatus, PayoutTransfer};
pub use venue::{Court, CourtHours, CourtSchedule, Venue};
