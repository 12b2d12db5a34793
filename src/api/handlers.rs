use super::dto::{
    AvailabilityQuery, BookingResponse, HealthResponse, PayoutCompleteBody, PayoutSummaryResponse,
    RefundBody, RefundResponse, ReserveBody, SettlementRunQuery,
};
use crate::error::{AppError, AppResult};
use crate::labels::Locale;
use crate::services::{
    AvailableSlot, PayoutCompletion, PayoutRequest, RefundRequest, ReservationRequest,
    SettlementReport,
};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

fn locale(headers: &HeaderMap) -> Locale {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(Locale::from_tag)
        .unwrap_or_default()
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.health.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse { status: "ok", database: "up" }),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "degraded", database: "down" }),
            )
        }
    }
}

pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    court_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> AppResult<Json<Vec<AvailableSlot>>> {
    let Path(court_id) = court_id?;
    let Query(query) = query?;
    let slots = state.reservations.list_availability(court_id, query.date).await?;
    Ok(Json(slots))
}

pub async fn reserve(
    State(state): State<Arc<AppState>>,
    court_id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    body: Result<Json<ReserveBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let Path(court_id) = court_id?;
    let Json(body) = body?;
    let payment_evidence = body.payment_evidence.decode("Payment slip")?;
    let booking = state
        .reservations
        .try_reserve(ReservationRequest {
            court_id,
            play_date: body.date,
            slot_labels: body.slot_labels,
            customer_id: body.customer_id,
            payment_evidence,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::new(booking, locale(&headers)))))
}

pub async fn customer_bookings(
    State(state): State<Arc<AppState>>,
    customer_id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let Path(customer_id) = customer_id?;
    let locale = locale(&headers);
    let bookings = state.lifecycle.customer_bookings(customer_id).await?;
    Ok(Json(
        bookings
            .into_iter()
            .map(|b| BookingResponse::new(b, locale))
            .collect(),
    ))
}

pub async fn request_cancellation(
    State(state): State<Arc<AppState>>,
    booking_id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
) -> AppResult<Json<BookingResponse>> {
    let Path(booking_id) = booking_id?;
    let booking = state.lifecycle.request_cancellation(booking_id).await?;
    Ok(Json(BookingResponse::new(booking, locale(&headers))))
}

pub async fn approve_refund(
    State(state): State<Arc<AppState>>,
    booking_id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    body: Result<Json<RefundBody>, JsonRejection>,
) -> AppResult<Json<RefundResponse>> {
    let Path(booking_id) = booking_id?;
    let Json(body) = body?;
    let evidence = body.evidence.decode("Refund evidence")?;
    let (booking, refund) = state
        .lifecycle
        .approve_refund(
            booking_id,
            RefundRequest {
                account_name: body.account_name,
                bank_name: body.bank_name,
                account_number: body.account_number,
                reason: body.reason,
                evidence,
            },
        )
        .await?;

    Ok(Json(RefundResponse::new(booking, refund, locale(&headers))))
}

pub async fn run_settlement(
    State(state): State<Arc<AppState>>,
    period: Result<Query<SettlementRunQuery>, QueryRejection>,
) -> AppResult<Json<SettlementReport>> {
    let Query(period) = period?;
    let report = match (period.year, period.month) {
        (Some(year), Some(month)) => state.settlement.settle_month(year, month).await?,
        (None, None) => state.settlement.run_monthly_settlement().await?,
        _ => {
            return Err(AppError::Validation(
                "Provide both year and month, or neither".into(),
            ))
        }
    };
    Ok(Json(report))
}

pub async fn owner_payouts(
    State(state): State<Arc<AppState>>,
    owner_id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
) -> AppResult<Json<PayoutSummaryResponse>> {
    let Path(owner_id) = owner_id?;
    let summary = state.settlement.owner_payout_summary(owner_id).await?;
    Ok(Json(PayoutSummaryResponse::new(summary, locale(&headers))))
}

pub async fn complete_payout(
    State(state): State<Arc<AppState>>,
    owner_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<PayoutCompleteBody>, JsonRejection>,
) -> AppResult<Json<PayoutCompletion>> {
    let Path(owner_id) = owner_id?;
    let Json(body) = body?;
    let slip = body.slip.decode("Transfer slip")?;
    let completion = state
        .settlement
        .complete_payout(PayoutRequest {
            owner_id,
            period: body.period,
            admin_name: body.admin_name,
            paid_on: body.paid_on,
            slip,
        })
        .await?;
    Ok(Json(completion))
}
