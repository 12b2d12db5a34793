mod helpers;

use chrono::{TimeZone, Utc};
use courtside_backend::clients::{SlipVerification, PAYMENT_SLIP_BUCKET, PAYOUT_SLIP_BUCKET, REFUND_EVIDENCE_BUCKET};
use courtside_backend::error::AppError;
use courtside_backend::models::*;
use courtside_backend::repositories::*;
use courtside_backend::services::*;
use helpers::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn reservation(stack: &TestStack, slots: &[&str]) -> ReservationRequest {
    ReservationRequest {
        court_id: stack.court.id,
        play_date: play_day(),
        slot_labels: labels(slots),
        customer_id: Uuid::new_v4(),
        payment_evidence: slip_image(),
    }
}

fn refund_request() -> RefundRequest {
    RefundRequest {
        account_name: "Somchai Jaidee".to_string(),
        bank_name: "Kasikorn".to_string(),
        account_number: "0123456789".to_string(),
        reason: "Court flooded".to_string(),
        evidence: EvidenceUpload::new("bookbank.jpg", "image/jpeg", vec![1, 2, 3]),
    }
}

// ============================================================================
// Reservation Guard
// ============================================================================

#[tokio::test]
async fn test_reserve_admits_confirmed_booking() {
    let stack = TestStack::new().await;

    let booking = assert_ok!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["11:00-12:00", "10:00-11:00"]))
            .await
    );

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(booking.admitted);
    assert_eq!(booking.slot_labels, vec!["10:00-11:00", "11:00-12:00"]);
    assert_eq!(booking.total_price, Decimal::new(1000, 0));
    assert_eq!(booking.court_number, 5);
    assert_eq!(booking.venue_id, stack.venue.id);
    assert_eq!(
        booking.payment_evidence_url.as_deref(),
        Some("memory://payment-slips/slip.png")
    );
    assert_eq!(stack.storage.puts(), vec![(PAYMENT_SLIP_BUCKET.to_string(), "slip.png".to_string())]);
}

#[tokio::test]
async fn test_concurrent_reservations_admit_exactly_one() {
    let stack = TestStack::new().await;
    let guard = &stack.state.reservations;

    let (first, second) = tokio::join!(
        guard.try_reserve(reservation(&stack, &["14:00-15:00"])),
        guard.try_reserve(reservation(&stack, &["14:00-15:00"])),
    );

    let results = [first, second];
    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1);

    let conflict = results.into_iter().find_map(|r| r.err()).unwrap();
    match conflict {
        AppError::SlotConflict { conflicting } => assert_eq!(conflicting, vec!["14:00-15:00"]),
        other => panic!("expected SlotConflict, got {other:?}"),
    }
    assert_eq!(stack.store.bookings().await.len(), 1);
}

#[tokio::test]
async fn test_many_concurrent_overlapping_requests() {
    let stack = Arc::new(TestStack::new().await);

    let attempts = (0..8).map(|i| {
        let stack = stack.clone();
        async move {
            // Every request shares 16:00-17:00
            let slots: &[&str] = if i % 2 == 0 {
                &["15:00-16:00", "16:00-17:00"]
            } else {
                &["16:00-17:00", "17:00-18:00"]
            };
            stack.state.reservations.try_reserve(reservation(&stack, slots)).await
        }
    });
    let results = futures::future::join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::SlotConflict { .. })));
}

#[tokio::test]
async fn test_conflict_names_overlap_and_writes_nothing() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, play_day(), &["14:00-15:00"], 500)
        .await;

    let err = assert_err!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["13:00-14:00", "14:00-15:00"]))
            .await
    );

    assert!(matches!(err, AppError::SlotConflict { ref conflicting } if conflicting == &vec!["14:00-15:00".to_string()]));
    assert_eq!(stack.store.bookings().await.len(), 1);
    assert_eq!(stack.verifier.calls(), 0);
    assert!(stack.storage.puts().is_empty());
}

#[tokio::test]
async fn test_same_slot_on_other_day_is_free() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, play_day().pred_opt().unwrap(), &["14:00-15:00"], 500)
        .await;

    assert_ok!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["14:00-15:00"]))
            .await
    );
}

#[tokio::test]
async fn test_unknown_slot_is_validation_error_before_conflict_check() {
    let stack = TestStack::new().await;
    // 12:30-13:00 is a gap between the two intervals
    stack
        .seed_booking(stack.venue.id, stack.court.id, play_day(), &["12:00-12:30"], 500)
        .await;

    let err = assert_err!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["12:00-12:30", "12:30-13:30"]))
            .await
    );

    assert_eq!(err.kind(), "ValidationError");
    assert_eq!(stack.verifier.calls(), 0);
}

#[tokio::test]
async fn test_past_play_date_is_rejected() {
    let stack = TestStack::new().await;
    let mut request = reservation(&stack, &["09:00-10:00"]);
    request.play_date = date(2024, 5, 31);
    // 2024-06-01 00:05 in Bangkok, 2024-05-31 in UTC
    let now = Utc.with_ymd_and_hms(2024, 5, 31, 17, 5, 0).unwrap();

    let err = assert_err!(stack.state.reservations.try_reserve_at(request.clone(), now).await);
    assert_eq!(err.kind(), "ValidationError");
    assert_eq!(stack.verifier.calls(), 0);
    assert!(stack.store.bookings().await.is_empty());

    request.play_date = date(2024, 6, 1);
    let booking = assert_ok!(stack.state.reservations.try_reserve_at(request, now).await);
    assert_eq!(booking.play_date, date(2024, 6, 1));
}

#[tokio::test]
async fn test_settled_month_stays_closed_to_new_bookings() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["09:00-10:00"], 500)
        .await;
    stack.state.settlement.settle_month(2024, 5).await.unwrap();

    let mut late = reservation(&stack, &["10:00-11:00"]);
    late.play_date = date(2024, 5, 20);
    let err = assert_err!(stack.state.reservations.try_reserve(late).await);
    assert_eq!(err.kind(), "ValidationError");

    let settled: Decimal = stack.store.settlements().await.iter().map(|s| s.total_amount).sum();
    let confirmed: Decimal = stack
        .store
        .bookings()
        .await
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .map(|b| b.total_price)
        .sum();
    assert_eq!(settled, confirmed);
}

#[tokio::test]
async fn test_empty_and_duplicate_requests_rejected() {
    let stack = TestStack::new().await;
    let guard = &stack.state.reservations;

    let empty = guard.try_reserve(reservation(&stack, &[])).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let dup = guard
        .try_reserve(reservation(&stack, &["09:00-10:00", "09:00-10:00"]))
        .await;
    assert!(matches!(dup, Err(AppError::Validation(_))));

    let mut no_image = reservation(&stack, &["09:00-10:00"]);
    no_image.payment_evidence = EvidenceUpload::new("slip.png", "image/png", Vec::new());
    assert!(matches!(guard.try_reserve(no_image).await, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_unknown_court_is_not_found() {
    let stack = TestStack::new().await;
    let mut request = reservation(&stack, &["09:00-10:00"]);
    request.court_id = Uuid::new_v4();

    let err = assert_err!(stack.state.reservations.try_reserve(request).await);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_failed_verification_persists_nothing() {
    let stack = TestStack::new().await;
    stack
        .verifier
        .answer_with(SlipVerification::rejected("slip already used"));

    let err = assert_err!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["09:00-10:00"]))
            .await
    );

    assert!(matches!(err, AppError::PaymentVerificationFailed { ref details } if details == "slip already used"));
    assert!(stack.store.bookings().await.is_empty());
    assert!(stack.storage.puts().is_empty());
}

#[tokio::test]
async fn test_wrong_amount_or_payee_fails_verification() {
    let stack = TestStack::new().await;

    stack.verifier.answer_with(SlipVerification {
        success: true,
        amount: Some(Decimal::new(400, 0)),
        payee_name: Some(PAYEE.to_string()),
        message: None,
    });
    let err = assert_err!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["09:00-10:00"]))
            .await
    );
    assert_eq!(err.kind(), "PaymentVerificationFailed");

    stack.verifier.answer_with(SlipVerification {
        success: true,
        amount: Some(Decimal::new(500, 0)),
        payee_name: Some("Someone Else".to_string()),
        message: None,
    });
    let err = assert_err!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["09:00-10:00"]))
            .await
    );
    assert_eq!(err.kind(), "PaymentVerificationFailed");
    assert!(stack.store.bookings().await.is_empty());
}

#[tokio::test]
async fn test_upload_failure_is_upstream_error() {
    let stack = TestStack::new().await;
    stack.storage.fail_uploads(true);

    let err = assert_err!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["09:00-10:00"]))
            .await
    );

    assert_eq!(err.kind(), "UpstreamStoreError");
    assert!(err.status_code() >= 500);
    assert!(stack.store.bookings().await.is_empty());
}

#[tokio::test]
async fn test_availability_marks_occupied_slots() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, play_day(), &["10:00-11:00"], 500)
        .await;

    let slots = assert_ok!(
        stack
            .state
            .reservations
            .list_availability(stack.court.id, play_day())
            .await
    );

    assert_eq!(slots.len(), 4 + 9);
    assert_eq!(slots[0].slot_label, "09:00-10:00");
    assert!(!slots[0].occupied);
    assert!(slots[1].occupied);
    assert_eq!(slots[3].slot_label, "12:00-12:30");
    assert_eq!(slots[4].slot_label, "13:00-14:00");
}

#[tokio::test]
async fn test_availability_follows_current_hours() {
    let stack = TestStack::new().await;
    stack
        .store
        .set_hours(stack.court.id, vec![CourtHours::new(t(18, 0), t(19, 30))])
        .await;

    let slots = stack
        .state
        .reservations
        .list_availability(stack.court.id, play_day())
        .await
        .unwrap();
    let labels: Vec<&str> = slots.iter().map(|s| s.slot_label.as_str()).collect();
    assert_eq!(labels, vec!["18:00-19:00", "19:00-19:30"]);

    let err = stack
        .state
        .reservations
        .try_reserve(reservation(&stack, &["09:00-10:00"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
}

// ============================================================================
// Booking Lifecycle
// ============================================================================

#[tokio::test]
async fn test_cancellation_and_refund_release_slots() {
    let stack = TestStack::new().await;
    let lifecycle = &stack.state.lifecycle;
    let booking = stack
        .state
        .reservations
        .try_reserve(reservation(&stack, &["14:00-15:00"]))
        .await
        .unwrap();

    let requested = assert_ok!(lifecycle.request_cancellation(booking.id).await);
    assert_eq!(requested.status, BookingStatus::CancellationRequested);
    // Still held until the refund is approved
    assert!(requested.admitted);
    let again = reservation(&stack, &["14:00-15:00"]);
    assert!(matches!(
        stack.state.reservations.try_reserve(again).await,
        Err(AppError::SlotConflict { .. })
    ));

    let (cancelled, refund) = assert_ok!(lifecycle.approve_refund(booking.id, refund_request()).await);
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(!cancelled.admitted);
    assert_eq!(refund.booking_id, booking.id);
    assert_eq!(refund.account_number, "0123456789");
    assert_eq!(refund.evidence_url, "memory://refund-evidence/bookbank.jpg");
    assert!(stack
        .storage
        .puts()
        .contains(&(REFUND_EVIDENCE_BUCKET.to_string(), "bookbank.jpg".to_string())));
    assert_eq!(stack.store.refunds().await.len(), 1);

    assert_ok!(
        stack
            .state
            .reservations
            .try_reserve(reservation(&stack, &["14:00-15:00"]))
            .await
    );
}

#[tokio::test]
async fn test_second_cancellation_request_is_invalid_transition() {
    let stack = TestStack::new().await;
    let booking = stack
        .seed_booking(stack.venue.id, stack.court.id, play_day(), &["09:00-10:00"], 500)
        .await;

    stack.state.lifecycle.request_cancellation(booking.id).await.unwrap();
    let err = assert_err!(stack.state.lifecycle.request_cancellation(booking.id).await);

    assert!(matches!(err, AppError::InvalidTransition { ref from, .. } if from == "cancellation_requested"));
    let stored = stack.store.find_by_id(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::CancellationRequested);
}

#[tokio::test]
async fn test_refund_requires_cancellation_request() {
    let stack = TestStack::new().await;
    let booking = stack
        .seed_booking(stack.venue.id, stack.court.id, play_day(), &["09:00-10:00"], 500)
        .await;

    let err = assert_err!(stack.state.lifecycle.approve_refund(booking.id, refund_request()).await);

    assert_eq!(err.kind(), "InvalidTransition");
    assert!(stack.storage.puts().is_empty());
    assert!(stack.store.refunds().await.is_empty());
}

#[tokio::test]
async fn test_refund_twice_is_rejected() {
    let stack = TestStack::new().await;
    let booking = stack
        .seed_booking(stack.venue.id, stack.court.id, play_day(), &["09:00-10:00"], 500)
        .await;
    stack.state.lifecycle.request_cancellation(booking.id).await.unwrap();
    stack
        .state
        .lifecycle
        .approve_refund(booking.id, refund_request())
        .await
        .unwrap();

    let err = assert_err!(stack.state.lifecycle.approve_refund(booking.id, refund_request()).await);
    assert_eq!(err.kind(), "InvalidTransition");
    assert_eq!(stack.store.refunds().await.len(), 1);
}

#[tokio::test]
async fn test_refund_account_number_must_be_digits() {
    let stack = TestStack::new().await;
    let booking = stack
        .seed_booking(stack.venue.id, stack.court.id, play_day(), &["09:00-10:00"], 500)
        .await;
    stack.state.lifecycle.request_cancellation(booking.id).await.unwrap();

    let mut request = refund_request();
    request.account_number = "012-3-45678-9".to_string();
    let err = assert_err!(stack.state.lifecycle.approve_refund(booking.id, request).await);
    assert_eq!(err.kind(), "ValidationError");
}

#[tokio::test]
async fn test_unknown_booking_is_not_found() {
    let stack = TestStack::new().await;
    let err = assert_err!(stack.state.lifecycle.request_cancellation(Uuid::new_v4()).await);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_customer_bookings_newest_first() {
    let stack = TestStack::new().await;
    let customer_id = Uuid::new_v4();
    for slot in ["09:00-10:00", "10:00-11:00", "11:00-12:00"] {
        let mut request = reservation(&stack, &[slot]);
        request.customer_id = customer_id;
        stack.state.reservations.try_reserve(request).await.unwrap();
    }
    stack
        .state
        .reservations
        .try_reserve(reservation(&stack, &["13:00-14:00"]))
        .await
        .unwrap();

    let history = stack.state.lifecycle.customer_bookings(customer_id).await.unwrap();

    assert_eq!(history.len(), 3);
    assert_eq!(history[0].slot_labels, vec!["11:00-12:00"]);
    assert_eq!(history[2].slot_labels, vec!["09:00-10:00"]);
}

// ============================================================================
// Settlement
// ============================================================================

#[tokio::test]
async fn test_monthly_sweep_and_payout_summary() {
    let stack = TestStack::new().await;
    let venue = stack.venue.id;
    let court = stack.court.id;
    stack.seed_booking(venue, court, date(2024, 5, 3), &["09:00-10:00"], 500).await;
    stack.seed_booking(venue, court, date(2024, 5, 17), &["10:00-11:00"], 300).await;
    stack.seed_booking(venue, court, date(2024, 5, 31), &["20:00-21:00"], 700).await;
    // Outside May
    stack.seed_booking(venue, court, date(2024, 6, 1), &["09:00-10:00"], 900).await;
    stack.seed_booking(venue, court, date(2024, 4, 30), &["09:00-10:00"], 900).await;

    // 2024-06-01 00:05 in Bangkok
    let now = Utc.with_ymd_and_hms(2024, 5, 31, 17, 5, 0).unwrap();
    let report = assert_ok!(stack.state.settlement.run_monthly_settlement_at(now).await);

    assert_eq!(report.period, date(2024, 5, 31));
    assert_eq!(report.settlements_created, 1);
    assert_eq!(report.total_amount, Decimal::new(1500, 0));

    let rows = stack.store.settlements().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].owner_id, stack.owner_id);
    assert_eq!(rows[0].venue_id, venue);
    assert_eq!(rows[0].status, PayoutStatus::Pending);

    let summary = stack.state.settlement.owner_payout_summary(stack.owner_id).await.unwrap();
    assert_eq!(summary.total_before_fee, Decimal::new(1500, 0));
    assert_eq!(summary.total_after_fee, Decimal::new(1350, 0));
    assert_eq!(summary.per_period.len(), 1);
    assert_eq!(summary.per_period[0].status, PayoutStatus::Pending);
}

#[tokio::test]
async fn test_sweep_rerun_does_not_duplicate() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["09:00-10:00"], 500)
        .await;

    let first = stack.state.settlement.settle_month(2024, 5).await.unwrap();
    let second = stack.state.settlement.settle_month(2024, 5).await.unwrap();

    assert_eq!(first.settlements_created, 1);
    assert_eq!(second.settlements_created, 0);
    assert_eq!(second.skipped_existing, 1);
    assert_eq!(stack.store.settlements().await.len(), 1);
}

#[tokio::test]
async fn test_sweep_ignores_cancelled_and_pending_cancellation() {
    let stack = TestStack::new().await;
    let kept = stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["09:00-10:00"], 500)
        .await;
    let requested = stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["10:00-11:00"], 300)
        .await;
    stack.state.lifecycle.request_cancellation(requested.id).await.unwrap();

    let report = stack.state.settlement.settle_month(2024, 5).await.unwrap();

    assert_eq!(report.total_amount, kept.total_price);
}

#[tokio::test]
async fn test_sweep_groups_per_venue_for_same_owner() {
    let stack = TestStack::new().await;
    let (second_venue, second_court) = stack.add_venue(stack.owner_id).await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["09:00-10:00"], 500)
        .await;
    stack
        .seed_booking(second_venue.id, second_court.id, date(2024, 5, 4), &["08:00-09:00"], 800)
        .await;

    let report = stack.state.settlement.settle_month(2024, 5).await.unwrap();
    assert_eq!(report.settlements_created, 2);

    let summary = stack.state.settlement.owner_payout_summary(stack.owner_id).await.unwrap();
    assert_eq!(summary.per_period.len(), 1);
    assert_eq!(summary.per_period[0].venue_count, 2);
    assert_eq!(summary.per_period[0].total_before_fee, Decimal::new(1300, 0));
    assert_eq!(summary.per_period[0].total_after_fee, Decimal::new(1170, 0));
}

#[tokio::test]
async fn test_sweep_with_no_bookings_creates_nothing() {
    let stack = TestStack::new().await;
    let report = stack.state.settlement.settle_month(2024, 2).await.unwrap();
    assert_eq!(report.period, date(2024, 2, 29));
    assert_eq!(report.settlements_created, 0);
    assert!(stack.store.settlements().await.is_empty());
}

#[tokio::test]
async fn test_sweep_failure_reports_venues_and_writes_nothing() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["09:00-10:00"], 500)
        .await;
    stack.store.fail_settlement_inserts(true).await;

    let err = assert_err!(stack.state.settlement.settle_month(2024, 5).await);

    match err {
        AppError::SettlementPartialFailure { period, failed_venues, .. } => {
            assert_eq!(period, date(2024, 5, 31));
            assert_eq!(failed_venues, vec![stack.venue.id]);
        }
        other => panic!("expected SettlementPartialFailure, got {other:?}"),
    }
    assert!(stack.store.settlements().await.is_empty());

    stack.store.fail_settlement_inserts(false).await;
    let report = stack.state.settlement.settle_month(2024, 5).await.unwrap();
    assert_eq!(report.settlements_created, 1);
}

#[tokio::test]
async fn test_complete_payout_marks_period_paid() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["09:00-10:00"], 500)
        .await;
    stack.state.settlement.settle_month(2024, 5).await.unwrap();

    let request = PayoutRequest {
        owner_id: stack.owner_id,
        period: date(2024, 5, 31),
        admin_name: "Admin Jane".to_string(),
        paid_on: date(2024, 6, 5),
        slip: EvidenceUpload::new("transfer.png", "image/png", vec![7, 7]),
    };
    let completion = assert_ok!(stack.state.settlement.complete_payout(request.clone()).await);

    assert_eq!(completion.settlements_paid, 1);
    assert_eq!(completion.transfer.slip_url, "memory://payout-slips/transfer.png");
    assert!(stack
        .storage
        .puts()
        .contains(&(PAYOUT_SLIP_BUCKET.to_string(), "transfer.png".to_string())));

    let summary = stack.state.settlement.owner_payout_summary(stack.owner_id).await.unwrap();
    assert_eq!(summary.per_period[0].status, PayoutStatus::Paid);
    assert_eq!(
        summary.per_period[0].slip_url.as_deref(),
        Some("memory://payout-slips/transfer.png")
    );

    let err = assert_err!(stack.state.settlement.complete_payout(request).await);
    assert_eq!(err.kind(), "InvalidTransition");
}

#[tokio::test]
async fn test_period_paid_again_after_late_settlement_row() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 5, 3), &["09:00-10:00"], 500)
        .await;
    stack.state.settlement.settle_month(2024, 5).await.unwrap();

    let payout = |slip: &str| PayoutRequest {
        owner_id: stack.owner_id,
        period: date(2024, 5, 31),
        admin_name: "Admin Jane".to_string(),
        paid_on: date(2024, 6, 5),
        slip: EvidenceUpload::new(slip, "image/png", vec![7, 7]),
    };
    assert_ok!(stack.state.settlement.complete_payout(payout("first.png")).await);

    // A venue that was not yet owned at the first sweep
    let (venue, court) = stack.add_venue(stack.owner_id).await;
    stack
        .seed_booking(venue.id, court.id, date(2024, 5, 20), &["08:00-09:00"], 800)
        .await;
    let report = stack.state.settlement.settle_month(2024, 5).await.unwrap();
    assert_eq!(report.settlements_created, 1);

    let summary = stack.state.settlement.owner_payout_summary(stack.owner_id).await.unwrap();
    assert_eq!(summary.per_period[0].status, PayoutStatus::Pending);

    let completion = assert_ok!(stack.state.settlement.complete_payout(payout("second.png")).await);
    assert_eq!(completion.settlements_paid, 1);

    let summary = stack.state.settlement.owner_payout_summary(stack.owner_id).await.unwrap();
    assert_eq!(summary.per_period[0].status, PayoutStatus::Paid);
    assert_eq!(summary.per_period[0].total_before_fee, Decimal::new(1300, 0));
    assert_eq!(
        summary.per_period[0].slip_url.as_deref(),
        Some("memory://payout-slips/second.png")
    );
    assert!(stack
        .store
        .settlements()
        .await
        .iter()
        .all(|s| s.status == PayoutStatus::Paid));
}

#[tokio::test]
async fn test_unfinished_month_cannot_be_settled() {
    let stack = TestStack::new().await;
    stack
        .seed_booking(stack.venue.id, stack.court.id, date(2024, 6, 3), &["09:00-10:00"], 500)
        .await;
    // 2024-06-30 23:00 in Bangkok
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 16, 0, 0).unwrap();

    let err = assert_err!(stack.state.settlement.settle_month_at(2024, 6, now).await);
    assert_eq!(err.kind(), "ValidationError");
    assert!(stack.store.settlements().await.is_empty());

    // 2024-07-01 00:00 in Bangkok
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 17, 0, 0).unwrap();
    let report = assert_ok!(stack.state.settlement.settle_month_at(2024, 6, now).await);
    assert_eq!(report.settlements_created, 1);
}

#[tokio::test]
async fn test_complete_payout_without_settlement_is_rejected() {
    let stack = TestStack::new().await;
    let err = assert_err!(
        stack
            .state
            .settlement
            .complete_payout(PayoutRequest {
                owner_id: Uuid::new_v4(),
                period: date(2024, 5, 31),
                admin_name: "Admin Jane".to_string(),
                paid_on: date(2024, 6, 5),
                slip: EvidenceUpload::new("transfer.png", "image/png", vec![7]),
            })
            .await
    );
    assert_eq!(err.kind(), "InvalidTransition");
    assert!(stack.storage.puts().is_empty());
}

#[tokio::test]
async fn test_invalid_month_is_validation_error() {
    let stack = TestStack::new().await;
    let err = assert_err!(stack.state.settlement.settle_month(2024, 13).await);
    assert_eq!(err.kind(), "ValidationError");
}
