//! Filename helpers shared by the pipeline and the resolver.

const MAX_FILENAME_LENGTH: usize = 255;

/// Keep only the final path component, replace unsafe characters with `_`, cap the
/// length. Returns `"file"` when nothing usable remains.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    if base.is_empty() || base.contains("..") {
        return "file".to_string();
    }

    let sanitized: String = base
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(['.', '_', ' ']).is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Lowercased extension after the last dot, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Name used in `Content-Disposition` when serving an upload.
///
/// Falls back to `<sha1>.<ext>` when the original name is empty and appends `ext`
/// when the original name carries no extension of its own.
pub fn disposition_filename(original_filename: &str, sha1: &str, extension: &str) -> String {
    let original = original_filename.trim();
    if original.is_empty() {
        return format!("{}.{}", sha1, extension);
    }
    if extension_of(original).is_some() {
        original.to_string()
    } else {
        format!("{}.{}", original, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\cat.png"), "cat.png");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my photo _1_.jpg");
    }

    #[test]
    fn test_sanitize_falls_back_to_file() {
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("dir/"), "file");
        assert_eq!(sanitize_filename("..."), "file");
        assert_eq!(sanitize_filename("a..b"), "file");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("logo.PNG").as_deref(), Some("png"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("image_file"), None);
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("weird.p n g"), None);
    }

    #[test]
    fn test_disposition_filename() {
        let sha1 = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        assert_eq!(disposition_filename("logo.png", sha1, "png"), "logo.png");
        assert_eq!(disposition_filename("image_file", sha1, "png"), "image_file.png");
        assert_eq!(disposition_filename("", sha1, "bin"), format!("{}.bin", sha1));
    }
}
