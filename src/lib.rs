//! Courtside backend library
//!
//! Booking, cancellation and monthly owner settlement for a sports-venue
//! platform. Exposed as a library for the binary and the integration tests.

pub mod api;
pub mod availability;
pub mod clients;
pub mod config;
pub mod database;
pub mod error;
pub mod labels;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use clients::{BlobStorage, DirectoryBlobStorage, DisabledSlipVerifier, HttpBlobStorage, HttpSlipVerifier, SlipVerifier};
use config::SettlementConfig;
use database::Database;
use repositories::{
    BookingRepository, BookingStore, CourtRepository, CourtStore, HealthCheck, SettlementRepository,
    SettlementStore,
};
use services::{BookingLifecycle, ReservationGuard, SettlementService};
use std::sync::Arc;
use tracing::warn;

/// Directory used for uploads when no blob storage service is configured
pub const LOCAL_UPLOAD_DIR: &str = "./uploads";

/// Services shared by every request handler
pub struct AppState {
    pub reservations: ReservationGuard,
    pub lifecycle: BookingLifecycle,
    pub settlement: Arc<SettlementService>,
    pub health: Arc<dyn HealthCheck>,
}

impl AppState {
    /// Wire Postgres repositories and the configured external clients
    pub fn new(pool: sqlx::PgPool, config: &AppConfig) -> AppResult<Self> {
        let verifier: Arc<dyn SlipVerifier> = match HttpSlipVerifier::from_config(&config.slip_verify) {
            Some(verifier) => Arc::new(verifier),
            None if config.is_production() => {
                return Err(AppError::Config("SLIP_VERIFY_URL is required in production".into()))
            }
            None => {
                warn!("SLIP_VERIFY_URL not set, payment slips will not be verified");
                Arc::new(DisabledSlipVerifier)
            }
        };

        let storage: Arc<dyn BlobStorage> = match HttpBlobStorage::from_config(&config.storage) {
            Some(storage) => Arc::new(storage),
            None if config.is_production() => {
                return Err(AppError::Config("STORAGE_URL is required in production".into()))
            }
            None => {
                warn!("STORAGE_URL not set, uploads are written to {}", LOCAL_UPLOAD_DIR);
                Arc::new(DirectoryBlobStorage::new(
                    LOCAL_UPLOAD_DIR,
                    format!("http://localhost:{}/uploads", config.http_port),
                ))
            }
        };

        Ok(Self::with_stores(
            Arc::new(CourtRepository::new(pool.clone())),
            Arc::new(BookingRepository::new(pool.clone())),
            Arc::new(SettlementRepository::new(pool.clone())),
            Arc::new(Database::new(pool)),
            verifier,
            storage,
            config.settlement.clone(),
        ))
    }

    /// Build from any store implementation, e.g. [`repositories::MemoryStore`]
    pub fn with_stores(
        courts: Arc<dyn CourtStore>,
        bookings: Arc<dyn BookingStore>,
        settlements: Arc<dyn SettlementStore>,
        health: Arc<dyn HealthCheck>,
        verifier: Arc<dyn SlipVerifier>,
        storage: Arc<dyn BlobStorage>,
        settlement_config: SettlementConfig,
    ) -> Self {
        Self {
            reservations: ReservationGuard::new(
                courts.clone(),
                bookings.clone(),
                verifier,
                storage.clone(),
                settlement_config.offset(),
            ),
            lifecycle: BookingLifecycle::new(bookings.clone(), storage.clone()),
            settlement: Arc::new(SettlementService::new(
                courts,
                bookings,
                settlements,
                storage,
                settlement_config,
            )),
            health,
        }
    }
}
