use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
];

/// MIME type for a filename, judged by extension only.
pub fn guess(filename: &str) -> &'static str {
    let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|&(_, mime)| mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(guess("notes.txt"), "text/plain");
        assert_eq!(guess("scan.JPEG"), "image/jpeg");
        assert_eq!(guess("dir/report.pdf"), "application/pdf");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(guess("Makefile"), DEFAULT_CONTENT_TYPE);
        assert_eq!(guess("archive.tar.xz"), DEFAULT_CONTENT_TYPE);
        assert_eq!(guess(".bashrc"), DEFAULT_CONTENT_TYPE);
    }
}
