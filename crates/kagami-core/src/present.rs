//! Small helpers for presenting jobs to a user.

/// MIME types a file picker should admit.
///
/// `image/svg+xml` is listed because users drop SVGs next to bitmaps; the
/// pipeline reports them as decode failures rather than hiding them.
pub const ACCEPTED_INPUT_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/svg+xml",
];

/// File-picker `accept` string matching [`ACCEPTED_INPUT_MIME_TYPES`].
pub const ACCEPTED_EXTENSIONS: &str = ".jpg,.jpeg,.png,.webp,.gif,.bmp,.svg";

pub fn is_accepted_mime_type(mime_type: &str) -> bool {
    ACCEPTED_INPUT_MIME_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(mime_type.trim()))
}

/// Relative size change in percent; negative means the output is smaller.
///
/// An empty source reports 0 rather than dividing by zero.
pub fn size_change_percent(original: usize, converted: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (converted as f64 - original as f64) / original as f64 * 100.0
}

/// Human-readable size: bytes below 1 KiB, then KB and MB with one decimal.
pub fn format_file_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_mime_types() {
        assert!(is_accepted_mime_type("image/png"));
        assert!(is_accepted_mime_type("IMAGE/JPEG"));
        assert!(is_accepted_mime_type("image/svg+xml"));
        assert!(!is_accepted_mime_type("image/tiff"));
        assert!(!is_accepted_mime_type("application/pdf"));
    }

    #[test]
    fn test_size_change_percent() {
        assert_eq!(size_change_percent(1000, 250), -75.0);
        assert_eq!(size_change_percent(100, 150), 50.0);
        assert_eq!(size_change_percent(0, 10), 0.0);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }
}
