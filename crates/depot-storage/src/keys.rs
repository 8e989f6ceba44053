//! Shared key generation for storage backends.

/// Storage key for a file with the given content hash and extension.
///
/// Produces `original/{sha1[0..2]}/{sha1}.{ext}`, or no extension suffix when the
/// extension is unknown. Callers must pass a validated lowercase hex digest.
pub fn storage_key(sha1: &str, extension: Option<&str>) -> String {
    let shard = sha1.get(0..2).unwrap_or("_");
    match extension.filter(|ext| !ext.is_empty()) {
        Some(ext) => format!("original/{}/{}.{}", shard, sha1, ext),
        None => format!("original/{}/{}", shard, sha1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_sharded_by_hash_prefix() {
        let sha1 = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        assert_eq!(
            storage_key(sha1, Some("png")),
            "original/da/da39a3ee5e6b4b0d3255bfef95601890afd80709.png"
        );
        assert_eq!(
            storage_key(sha1, None),
            "original/da/da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(storage_key(sha1, Some("")), storage_key(sha1, None));
    }
}
