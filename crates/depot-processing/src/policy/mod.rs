//! Acceptance policies consulted by the upload pipeline.

mod extension;
mod size;

pub use extension::{ExtensionPolicy, ExtensionRule};
pub use size::{SizeCategory, SizePolicy};

use depot_core::models::{Role, UploadPurpose, UploadRequest};

/// Facts about one upload that the policies decide on.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext {
    pub role: Role,
    pub purpose: UploadPurpose,
    pub for_private_message: bool,
    pub for_site_setting: bool,
    pub is_image: bool,
}

impl PolicyContext {
    pub fn for_request(request: &UploadRequest, is_image: bool) -> Self {
        Self {
            role: request.caller.role,
            purpose: request.purpose,
            for_private_message: request.for_private_message,
            for_site_setting: request.for_site_setting,
            is_image,
        }
    }
}
