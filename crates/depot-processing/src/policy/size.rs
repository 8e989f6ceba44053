use depot_core::UploadSettings;

use crate::error::UploadError;

/// Which limit an upload is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCategory {
    Image,
    Attachment,
}

impl SizeCategory {
    pub fn for_content(is_image: bool) -> Self {
        if is_image {
            SizeCategory::Image
        } else {
            SizeCategory::Attachment
        }
    }
}

/// Per-category byte limits, configured in kilobytes.
#[derive(Debug, Clone, Copy)]
pub struct SizePolicy {
    max_image_kb: u64,
    max_attachment_kb: u64,
}

impl SizePolicy {
    pub fn new(max_image_kb: u64, max_attachment_kb: u64) -> Self {
        Self {
            max_image_kb,
            max_attachment_kb,
        }
    }

    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self::new(settings.max_image_size_kb, settings.max_attachment_size_kb)
    }

    pub fn limit_kb(&self, category: SizeCategory) -> u64 {
        match category {
            SizeCategory::Image => self.max_image_kb,
            SizeCategory::Attachment => self.max_attachment_kb,
        }
    }

    /// Passes when `byte_size` is at most the category limit times 1024.
    pub fn check(&self, byte_size: u64, category: SizeCategory) -> Result<(), UploadError> {
        let limit_kb = self.limit_kb(category);
        if byte_size > limit_kb.saturating_mul(1024) {
            tracing::debug!(
                size_bytes = byte_size,
                limit_kb,
                category = ?category,
                "Upload exceeds size limit"
            );
            return Err(UploadError::TooLarge { limit_kb });
        }
        Ok(())
    }
}
