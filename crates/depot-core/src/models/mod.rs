//! Data models for uploads, upload requests and callers.

mod caller;
mod request;
mod upload;

pub use caller::{Caller, Role};
pub use request::{UploadPurpose, UploadRequest, UploadSource};
pub use upload::{Upload, UploadMetadata};
