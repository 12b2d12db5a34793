pub mod lifecycle;
pub mod reservation;
pub mod scheduler;
pub mod settlement;

pub use lifecycle::{BookingLifecycle, RefundRequest};
pub use reservation::{AvailableSlot, ReservationGuard, ReservationRequest};
pub use scheduler::SettlementScheduler;
pub use settlement::{
    OwnerPayoutSummary, PayoutCompletion, PayoutRequest, PeriodPayout, SettlementReport,
    SettlementService,
};
