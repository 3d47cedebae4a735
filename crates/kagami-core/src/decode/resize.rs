//! Resampling of decoded rasters.
//!
//! This is the hot loop of a conversion. Sources that are already the target
//! size skip the filter entirely; everything else goes through the `image`
//! crate's separable convolution resampler.
//!
//! Rasters with transparency are filtered with premultiplied alpha, so the
//! colour hidden under fully transparent pixels never bleeds into visible
//! edges. Premultiplied samples are held as 16-bit `c * a` products, which
//! keeps the round trip exact for 8-bit input.

use image::{imageops, ImageBuffer, Rgba, RgbaImage};

use super::{DecodeError, DecodedImage, FilterType};

/// Resample an image to exact dimensions.
///
/// Aspect ratio is not preserved here; callers resolve the target size first
/// (see [`crate::dimensions::resolve_dimensions`]).
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if either target dimension is zero and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the
/// declared dimensions.
pub fn resample(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidFormat);
    }

    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let view = image
        .as_rgba_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Pixel buffer size mismatch".to_string()))?;

    let filter = filter.to_image_filter();
    let resized = if image.has_transparency() {
        let premultiplied = imageops::resize(&premultiply(&view), width, height, filter);
        unpremultiply(&premultiplied)
    } else {
        imageops::resize(&view, width, height, filter)
    };

    Ok(DecodedImage::from_rgba_image(resized))
}

/// Colour channels scaled by alpha; alpha scaled by 255 to match.
type Premultiplied = ImageBuffer<Rgba<u16>, Vec<u16>>;

fn premultiply(image: &ImageBuffer<Rgba<u8>, &[u8]>) -> Premultiplied {
    ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0.map(u16::from);
        Rgba([r * a, g * a, b * a, a * 255])
    })
}

fn unpremultiply(image: &Premultiplied) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0.map(u32::from);
        let alpha = ((a + 127) / 255).min(255);
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let straight = |c: u32| ((c * 255 + a / 2) / a).min(255) as u8;
        Rgba([straight(r), straight(g), straight(b), alpha as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x * 255) / width.max(1)) as u8);
                pixels.push(((y * 255) / height.max(1)) as u8);
                pixels.push(128);
                pixels.push(255);
            }
        }
        DecodedImage::new(width, height, pixels)
    }

    #[test]
    fn test_resample_downscale() {
        let img = create_test_image(100, 50);
        let resized = resample(&img, 50, 25, FilterType::Bilinear).unwrap();

        assert_eq!(resized.width, 50);
        assert_eq!(resized.height, 25);
        assert_eq!(resized.pixels.len(), 50 * 25 * 4);
    }

    #[test]
    fn test_resample_same_dimensions() {
        let img = create_test_image(100, 50);
        let resized = resample(&img, 100, 50, FilterType::Lanczos3).unwrap();

        assert_eq!(resized.pixels, img.pixels);
    }

    #[test]
    fn test_resample_upscale() {
        let img = create_test_image(50, 25);
        let resized = resample(&img, 100, 50, FilterType::Lanczos3).unwrap();

        assert_eq!((resized.width, resized.height), (100, 50));
    }

    #[test]
    fn test_resample_distorting() {
        let img = create_test_image(80, 60);
        let resized = resample(&img, 10, 90, FilterType::CatmullRom).unwrap();

        assert_eq!((resized.width, resized.height), (10, 90));
    }

    #[test]
    fn test_resample_zero_dimensions_error() {
        let img = create_test_image(100, 50);

        assert!(resample(&img, 0, 50, FilterType::Bilinear).is_err());
        assert!(resample(&img, 50, 0, FilterType::Bilinear).is_err());
    }

    #[test]
    fn test_resample_mismatched_buffer_error() {
        let img = DecodedImage {
            width: 10,
            height: 10,
            pixels: vec![0u8; 12],
        };
        assert!(matches!(
            resample(&img, 5, 5, FilterType::Bilinear),
            Err(DecodeError::CorruptedFile(_))
        ));
    }

    #[test]
    fn test_resample_keeps_alpha() {
        let img = DecodedImage::new(4, 4, vec![0u8; 4 * 4 * 4]);
        let resized = resample(&img, 2, 2, FilterType::Bilinear).unwrap();

        assert!(resized.pixels.chunks_exact(4).all(|px| px[3] == 0));
    }

    /// Transparent black on the left, opaque red on the right.
    fn half_transparent(width: u32) -> DecodedImage {
        let pixels = (0..width)
            .flat_map(|x| {
                if x < width / 2 {
                    [0, 0, 0, 0]
                } else {
                    [200, 30, 30, 255]
                }
            })
            .collect();
        DecodedImage::new(width, 1, pixels)
    }

    #[test]
    fn test_transparent_colour_does_not_bleed_into_edge() {
        let img = half_transparent(16);
        let resized = resample(&img, 4, 1, FilterType::Bilinear).unwrap();
        let px: Vec<&[u8]> = resized.pixels.chunks_exact(4).collect();

        assert_eq!(px[0], &[0, 0, 0, 0]);

        let edge = px[1];
        assert!(edge[3] > 0 && edge[3] < 255, "expected partial alpha, got {edge:?}");
        assert!(edge[0] >= 190, "edge darkened: {edge:?}");
        assert!(edge[1] <= 40 && edge[2] <= 40, "edge tinted: {edge:?}");

        for red in &px[2..] {
            assert!(red[0].abs_diff(200) <= 2 && red[1].abs_diff(30) <= 2, "{red:?}");
        }
        assert_eq!(px[3][3], 255);
    }

    #[test]
    fn test_premultiply_round_trip_is_exact() {
        let img = DecodedImage::new(
            3,
            1,
            vec![200, 30, 30, 255, 17, 250, 3, 1, 90, 91, 92, 128],
        );
        let view = img.as_rgba_image().unwrap();
        let back = unpremultiply(&premultiply(&view));

        assert_eq!(back.into_raw(), img.pixels);
    }

    #[test]
    fn test_all_filter_types() {
        let img = create_test_image(100, 50);

        for filter in [
            FilterType::Bilinear,
            FilterType::CatmullRom,
            FilterType::Lanczos3,
        ] {
            let resized = resample(&img, 50, 25, filter).unwrap();
            assert_eq!(resized.width, 50);
            assert_eq!(resized.height, 25);
        }
    }
}
