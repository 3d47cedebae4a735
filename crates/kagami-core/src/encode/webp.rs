//! Lossy WebP encoding through libwebp.
//!
//! The `image` crate can only write lossless WebP, which ignores the quality
//! setting entirely. libwebp's lossy mode keeps the alpha plane.

use super::{check_buffer, EncodeError, OutputFormat};

/// Encode RGBA pixel data to lossy WebP.
///
/// `quality` is the 0.0-1.0 lossy factor; libwebp expects 0-100.
pub fn encode_webp(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: f32,
) -> Result<Vec<u8>, EncodeError> {
    check_buffer(pixels, width, height, 4)?;

    let mut config = ::webp::WebPConfig::new().map_err(|_| EncodeError::EncodingFailed {
        format: OutputFormat::Webp,
        message: "failed to initialise encoder config".to_string(),
    })?;
    config.lossless = 0;
    config.quality = (quality.clamp(0.0, 1.0) * 100.0).round();
    config.alpha_quality = 100;

    let encoded = ::webp::Encoder::from_rgba(pixels, width, height)
        .encode_advanced(&config)
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::Webp,
            message: format!("{e:?}"),
        })?;

    Ok(encoded.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let v = (i.wrapping_mul(2654435761) >> 24) as u8;
                [v, v.wrapping_add(40), v.wrapping_mul(3), 255]
            })
            .collect()
    }

    #[test]
    fn test_encode_webp_riff_header() {
        let out = encode_webp(&vec![90u8; 16 * 16 * 4], 16, 16, 0.8).unwrap();
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
    }

    #[test]
    fn test_encode_webp_quality_affects_size() {
        let pixels = noisy(64, 64);
        let low = encode_webp(&pixels, 64, 64, 0.05).unwrap();
        let high = encode_webp(&pixels, 64, 64, 1.0).unwrap();
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_encode_webp_decodes_to_same_size() {
        let out = encode_webp(&noisy(30, 20), 30, 20, 0.8).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 20));
    }

    #[test]
    fn test_encode_webp_zero_dimensions() {
        assert!(matches!(
            encode_webp(&[], 0, 0, 0.8),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }
}
