//! Outbound collaborators: slip verification and blob storage.

pub mod blob_storage;
pub mod slip_verifier;

pub use blob_storage::{object_name, BlobStorage, DirectoryBlobStorage, HttpBlobStorage};
pub use slip_verifier::{DisabledSlipVerifier, HttpSlipVerifier, SlipVerification, SlipVerifier};

/// Bucket for customer payment slips
pub const PAYMENT_SLIP_BUCKET: &str = "payment-slips";
/// Bucket for refund bank-book evidence
pub const REFUND_EVIDENCE_BUCKET: &str = "refund-evidence";
/// Bucket for admin payout transfer slips
pub const PAYOUT_SLIP_BUCKET: &str = "payout-slips";
