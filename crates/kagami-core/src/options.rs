//! Conversion options supplied by the caller.
//!
//! These are plain serde types so the browser side can hand over a JS object
//! (`{ format: "webp", quality: 80, resize: null }`) without a hand-written
//! parser. Missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::FilterType;
use crate::dimensions::resolve_dimensions;
use crate::encode::OutputFormat;

/// Default lossy quality.
pub const DEFAULT_QUALITY: u8 = 80;

/// Options rejected before a batch starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Quality must be between 1 and 100, got {0}")]
    QualityOutOfRange(u8),
}

/// How to resize during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResizeIntent {
    /// Target width in pixels; `None` (or 0) derives it from the height.
    pub width: Option<u32>,
    /// Target height in pixels; `None` (or 0) derives it from the width.
    pub height: Option<u32>,
    /// Fit inside the box instead of stretching when both sides are given.
    pub maintain_aspect_ratio: bool,
}

impl ResizeIntent {
    pub fn fit_width(width: u32) -> Self {
        Self {
            width: Some(width),
            height: None,
            maintain_aspect_ratio: true,
        }
    }

    pub fn fit_height(height: u32) -> Self {
        Self {
            width: None,
            height: Some(height),
            maintain_aspect_ratio: true,
        }
    }

    pub fn fit(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            maintain_aspect_ratio: true,
        }
    }

    pub fn exact(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            maintain_aspect_ratio: false,
        }
    }

    /// Output size for a source of `width` x `height`.
    pub fn resolve(&self, width: u32, height: u32) -> (u32, u32) {
        resolve_dimensions(
            width,
            height,
            self.width,
            self.height,
            self.maintain_aspect_ratio,
        )
    }
}

/// Everything a single conversion needs besides the source bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    pub format: OutputFormat,
    /// 1-100; ignored for PNG.
    pub quality: u8,
    pub resize: Option<ResizeIntent>,
    pub filter: FilterType,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webp,
            quality: DEFAULT_QUALITY,
            resize: None,
            filter: FilterType::default(),
        }
    }
}

impl ConversionOptions {
    pub fn new(format: OutputFormat, quality: u8) -> Self {
        Self {
            format,
            quality,
            ..Self::default()
        }
    }

    pub fn with_resize(mut self, resize: ResizeIntent) -> Self {
        self.resize = Some(resize);
        self
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Output size for a source of `width` x `height`.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match &self.resize {
            Some(resize) => resize.resolve(width, height),
            None => (width.max(1), height.max(1)),
        }
    }

    /// Check the ranges a UI is expected to enforce.
    ///
    /// The pipeline itself clamps quality instead of failing, so calling this
    /// is optional.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(1..=100).contains(&self.quality) {
            return Err(OptionsError::QualityOutOfRange(self.quality));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ConversionOptions::default();
        assert_eq!(opts.format, OutputFormat::Webp);
        assert_eq!(opts.quality, 80);
        assert!(opts.resize.is_none());
        assert_eq!(opts.filter, FilterType::Lanczos3);
    }

    #[test]
    fn test_target_dimensions_without_resize() {
        let opts = ConversionOptions::default();
        assert_eq!(opts.target_dimensions(640, 480), (640, 480));
    }

    #[test]
    fn test_target_dimensions_with_resize() {
        let opts = ConversionOptions::new(OutputFormat::Jpeg, 90).with_resize(ResizeIntent::fit_width(400));
        assert_eq!(opts.target_dimensions(800, 600), (400, 300));

        let opts = opts.with_resize(ResizeIntent::exact(10, 10));
        assert_eq!(opts.target_dimensions(800, 600), (10, 10));
    }

    #[test]
    fn test_validate_quality() {
        assert!(ConversionOptions::new(OutputFormat::Jpeg, 1).validate().is_ok());
        assert!(ConversionOptions::new(OutputFormat::Jpeg, 100).validate().is_ok());
        assert_eq!(
            ConversionOptions::new(OutputFormat::Jpeg, 0).validate(),
            Err(OptionsError::QualityOutOfRange(0))
        );
        assert_eq!(
            ConversionOptions::new(OutputFormat::Png, 101).validate(),
            Err(OptionsError::QualityOutOfRange(101))
        );
    }

    #[test]
    fn test_resize_constructors() {
        assert_eq!(ResizeIntent::fit(4, 5).resolve(10, 10), (4, 4));
        assert_eq!(ResizeIntent::fit_height(50).resolve(200, 100), (100, 50));
    }
}
