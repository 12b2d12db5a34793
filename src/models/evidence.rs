use crate::error::{AppError, AppResult};

/// Largest accepted image upload
pub const MAX_EVIDENCE_BYTES: usize = 5 * 1024 * 1024;

/// An uploaded proof image (payment slip, refund or payout transfer slip)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl EvidenceUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reject empty, oversized or non-image uploads
    pub fn validate(&self, field: &str) -> AppResult<()> {
        if self.bytes.is_empty() {
            return Err(AppError::Validation(format!("{} image is required", field)));
        }
        if self.bytes.len() > MAX_EVIDENCE_BYTES {
            return Err(AppError::Validation(format!(
                "{} image exceeds {} bytes",
                field, MAX_EVIDENCE_BYTES
            )));
        }
        if !self.content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "{} must be an image, got {}",
                field, self.content_type
            )));
        }
        Ok(())
    }

    /// Lower-cased file extension, if the name has a usable one
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .then_some(ext)
    }
}
