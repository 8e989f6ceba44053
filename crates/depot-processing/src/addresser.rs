//! Content addressing: SHA-1 digests and their reversible short identifiers.

use sha1::{Digest, Sha1};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// 160-bit content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha1Digest([u8; 20]);

impl Sha1Digest {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex, 40 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Sha1Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Sha1Digest {
    type Err = hex::FromHexError;

    /// Accepts exactly 40 hex characters, either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Sha1Digest(bytes))
    }
}

/// Computes content hashes and short identifiers.
///
/// Short identifiers are base58 over the raw 20 digest bytes. Base58 keeps leading
/// zero bytes as leading `1`s, so the encoding is a bijection on fixed-width digests:
/// two different digests can never share a short id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentAddresser;

impl ContentAddresser {
    pub fn hash(bytes: &[u8]) -> Sha1Digest {
        let digest = Sha1::digest(bytes);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest);
        Sha1Digest(out)
    }

    pub fn short_id(digest: &Sha1Digest) -> String {
        bs58::encode(digest.as_bytes()).into_string()
    }

    /// Decode a short id. Anything that is not exactly 20 bytes of base58 is rejected.
    pub fn from_short_id(short_id: &str) -> Option<Sha1Digest> {
        let mut bytes = [0u8; 20];
        match bs58::decode(short_id).onto(&mut bytes[..]) {
            Ok(20) => Some(Sha1Digest(bytes)),
            _ => None,
        }
    }

    /// `upload://<short_id>[.<ext>]`
    pub fn short_url(digest: &Sha1Digest, extension: Option<&str>) -> String {
        format!("upload://{}", Self::with_extension(digest, extension))
    }

    /// `/uploads/short-url/<short_id>[.<ext>]`
    pub fn short_path(digest: &Sha1Digest, extension: Option<&str>) -> String {
        format!("/uploads/short-url/{}", Self::with_extension(digest, extension))
    }

    fn with_extension(digest: &Sha1Digest, extension: Option<&str>) -> String {
        let short_id = Self::short_id(digest);
        match extension.filter(|ext| !ext.is_empty()) {
            Some(ext) => format!("{}.{}", short_id, ext),
            None => short_id,
        }
    }
}
