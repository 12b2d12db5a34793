use crate::clients::{BlobStorage, REFUND_EVIDENCE_BUCKET};
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{Booking, BookingAction, BookingStatus, EvidenceUpload, NewRefund, RefundRecord};
use crate::repositories::BookingStore;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Bank details and proof submitted by an admin when approving a refund
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub account_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub reason: String,
    pub evidence: EvidenceUpload,
}

impl RefundRequest {
    fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("Account name", &self.account_name),
            ("Bank name", &self.bank_name),
            ("Reason", &self.reason),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
        }

        if self.account_number.is_empty() || !self.account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation(
                "Account number must contain digits only".into(),
            ));
        }

        self.evidence.validate("Refund evidence")
    }
}

/// Cancellation and refund transitions of admitted bookings
pub struct BookingLifecycle {
    bookings: Arc<dyn BookingStore>,
    storage: Arc<dyn BlobStorage>,
}

impl BookingLifecycle {
    pub fn new(bookings: Arc<dyn BookingStore>, storage: Arc<dyn BlobStorage>) -> Self {
        Self { bookings, storage }
    }

    async fn load(&self, booking_id: Uuid) -> AppResult<Booking> {
        self.bookings
            .find_by_id(booking_id)
            .await
            .map_err(AppError::store(format!("load booking {}", booking_id)))?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_id)))
    }

    /// Customer asks to cancel a confirmed booking
    pub async fn request_cancellation(&self, booking_id: Uuid) -> AppResult<Booking> {
        let booking = self.load(booking_id).await?;
        let next = booking.status.apply(BookingAction::RequestCancellation)?;

        let updated = self
            .bookings
            .update_status(booking_id, booking.status, next)
            .await
            .map_err(|e| transition_error(e, BookingAction::RequestCancellation, booking_id))?;

        info!("Booking {} cancellation requested", booking_id);
        Ok(updated)
    }

    /// Admin approves the refund: the booking is cancelled, its slots are
    /// released and the refund record is stored.
    pub async fn approve_refund(
        &self,
        booking_id: Uuid,
        request: RefundRequest,
    ) -> AppResult<(Booking, RefundRecord)> {
        request.validate()?;

        let booking = self.load(booking_id).await?;
        // Fail before uploading when the booking is not awaiting a refund
        booking.status.apply(BookingAction::ApproveRefund)?;

        // A stale transition below leaves this object unreferenced
        let evidence_url = self
            .storage
            .put(REFUND_EVIDENCE_BUCKET, &request.evidence)
            .await?;

        let (cancelled, refund) = self
            .bookings
            .cancel_with_refund(
                booking_id,
                booking.status,
                NewRefund {
                    account_name: request.account_name.trim().to_string(),
                    bank_name: request.bank_name.trim().to_string(),
                    account_number: request.account_number,
                    reason: request.reason.trim().to_string(),
                    evidence_url,
                },
            )
            .await
            .map_err(|e| transition_error(e, BookingAction::ApproveRefund, booking_id))?;

        info!(
            "Booking {} cancelled, refund {} recorded, slots {:?} released",
            booking_id, refund.id, cancelled.slot_labels
        );
        Ok((cancelled, refund))
    }

    /// A customer's bookings, newest first
    pub async fn customer_bookings(&self, customer_id: Uuid) -> AppResult<Vec<Booking>> {
        self.bookings
            .find_by_customer(customer_id)
            .await
            .map_err(AppError::store(format!("list bookings of customer {}", customer_id)))
    }
}

/// A lost compare-and-set means another request moved the booking first
fn transition_error(err: RepositoryError, action: BookingAction, booking_id: Uuid) -> AppError {
    match err {
        RepositoryError::StaleState(current) => AppError::InvalidTransition {
            from: current,
            action: action.as_str().to_string(),
        },
        RepositoryError::Duplicate(_) if action == BookingAction::ApproveRefund => {
            AppError::InvalidTransition {
                from: BookingStatus::Cancelled.to_string(),
                action: action.as_str().to_string(),
            }
        }
        other => AppError::store(format!("{} booking {}", action.as_str(), booking_id))(other),
    }
}
