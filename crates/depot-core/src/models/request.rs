use bytes::Bytes;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::Caller;

/// Declared intent of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPurpose {
    Avatar,
    ProfileBackground,
    CardBackground,
    Composer,
    SiteSetting,
}

impl UploadPurpose {
    /// Purposes whose success triggers avatar thumbnail generation.
    pub fn is_avatar(self) -> bool {
        self == UploadPurpose::Avatar
    }

    /// Purposes that only ever accept raster images.
    pub fn requires_image(self) -> bool {
        matches!(
            self,
            UploadPurpose::Avatar
                | UploadPurpose::ProfileBackground
                | UploadPurpose::CardBackground
                | UploadPurpose::SiteSetting
        )
    }
}

impl FromStr for UploadPurpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "avatar" => Ok(UploadPurpose::Avatar),
            "profile_background" => Ok(UploadPurpose::ProfileBackground),
            "card_background" => Ok(UploadPurpose::CardBackground),
            "composer" | "" => Ok(UploadPurpose::Composer),
            "site_setting" => Ok(UploadPurpose::SiteSetting),
            other => Err(anyhow::anyhow!("Invalid upload type: {}", other)),
        }
    }
}

impl Display for UploadPurpose {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadPurpose::Avatar => write!(f, "avatar"),
            UploadPurpose::ProfileBackground => write!(f, "profile_background"),
            UploadPurpose::CardBackground => write!(f, "card_background"),
            UploadPurpose::Composer => write!(f, "composer"),
            UploadPurpose::SiteSetting => write!(f, "site_setting"),
        }
    }
}

/// Where the upload's bytes come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes { filename: String, data: Bytes },
    Url(String),
}

/// A single upload attempt, before any validation.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub source: Option<UploadSource>,
    pub purpose: UploadPurpose,
    pub for_private_message: bool,
    pub for_site_setting: bool,
    pub retain_hours: Option<i32>,
    pub caller: Caller,
}

impl UploadRequest {
    pub fn new(source: Option<UploadSource>, purpose: UploadPurpose, caller: Caller) -> Self {
        Self {
            source,
            purpose,
            for_private_message: false,
            for_site_setting: false,
            retain_hours: None,
            caller,
        }
    }

    pub fn bytes(filename: impl Into<String>, data: impl Into<Bytes>, caller: Caller) -> Self {
        Self::new(
            Some(UploadSource::Bytes {
                filename: filename.into(),
                data: data.into(),
            }),
            UploadPurpose::Composer,
            caller,
        )
    }

    pub fn with_purpose(mut self, purpose: UploadPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn for_private_message(mut self, value: bool) -> Self {
        self.for_private_message = value;
        self
    }

    pub fn for_site_setting(mut self, value: bool) -> Self {
        self.for_site_setting = value;
        self
    }

    pub fn with_retain_hours(mut self, hours: Option<i32>) -> Self {
        self.retain_hours = hours;
        self
    }
}
