//! Output formats and their codec properties.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A format the pipeline can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[default]
    Webp,
}

impl OutputFormat {
    /// File extension used for downloads (`jpeg` is written as `jpg`).
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Whether encoded output can carry transparency.
    pub fn has_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Whether the encoder takes a lossy quality parameter.
    pub fn is_lossy(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }

    /// Quality as the 0.0-1.0 factor handed to lossy encoders.
    ///
    /// Returns `None` for PNG: the parameter is omitted rather than defaulted.
    /// Out-of-range values are clamped into 1-100 first.
    pub fn quality_factor(self, quality: u8) -> Option<f32> {
        self.is_lossy()
            .then(|| f32::from(quality.clamp(1, 100)) / 100.0)
    }

    /// Parse a short format name (`jpeg`, `jpg`, `png`, `webp`), case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Webp => "WebP",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Webp.extension(), "webp");
    }

    #[test]
    fn test_quality_factor() {
        assert_eq!(OutputFormat::Jpeg.quality_factor(80), Some(0.8));
        assert_eq!(OutputFormat::Webp.quality_factor(100), Some(1.0));
        assert_eq!(OutputFormat::Webp.quality_factor(0), Some(0.01));
        assert_eq!(OutputFormat::Png.quality_factor(80), None);
    }

    #[test]
    fn test_alpha_support() {
        assert!(!OutputFormat::Jpeg.has_alpha());
        assert!(OutputFormat::Png.has_alpha());
        assert!(OutputFormat::Webp.has_alpha());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(OutputFormat::from_name("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_name("webp"), Some(OutputFormat::Webp));
        assert_eq!(OutputFormat::from_name("gif"), None);
    }

    #[test]
    fn test_deserialize_lowercase_names() {
        use serde::de::value::{Error, StrDeserializer};
        use serde::de::IntoDeserializer;

        let de: StrDeserializer<'_, Error> = "jpeg".into_deserializer();
        assert_eq!(OutputFormat::deserialize(de).unwrap(), OutputFormat::Jpeg);

        let de: StrDeserializer<'_, Error> = "jpg".into_deserializer();
        assert!(OutputFormat::deserialize(de).is_err());
    }
}
