//! Image decoding with content-based format detection, and encoding back
//! into the source format.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use std::io::{Cursor, Write};

use crate::config::EncodingConfig;
use crate::error::{PipelineError, PipelineResult};

/// Decode an image from bytes, detecting the format from its content.
pub fn decode(task: &str, bytes: Vec<u8>) -> PipelineResult<(DynamicImage, ImageFormat)> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode {
            task: task.to_string(),
            message: format!("Cannot detect image format: {}", e),
        })?;
    let format = reader.format().ok_or_else(|| PipelineError::Decode {
        task: task.to_string(),
        message: "Unrecognized image format".to_string(),
    })?;
    let image = reader.decode().map_err(|e| PipelineError::Decode {
        task: task.to_string(),
        message: e.to_string(),
    })?;
    Ok((image, format))
}

/// Encode `image` in `format`.
///
/// PNG keeps the alpha channel. JPEG has none, so it is dropped.
pub fn encode(
    task: &str,
    image: RgbaImage,
    format: ImageFormat,
    options: &EncodingConfig,
    output: &mut dyn Write,
) -> PipelineResult<()> {
    let (width, height) = image.dimensions();
    let result = match format {
        ImageFormat::Png => PngEncoder::new(output).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).into_rgb8();
            JpegEncoder::new_with_quality(output, options.jpeg_quality).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        other => {
            return Err(PipelineError::UnsupportedFormat {
                task: task.to_string(),
                format: format_to_string(other),
            })
        }
    };
    result.map_err(|e| PipelineError::Encode {
        task: task.to_string(),
        message: e.to_string(),
    })
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, y| Rgba([x as u8 * 30, y as u8 * 60, 7, 200]))
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_png_keeps_pixels_and_alpha() {
        let mut bytes = Vec::new();
        encode("s", sample(), ImageFormat::Png, &EncodingConfig::default(), &mut bytes).unwrap();

        let (decoded, format) = decode("s", bytes).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(decoded.to_rgba8(), sample());
    }

    #[test]
    fn test_jpeg_is_detected_by_content() {
        let mut bytes = Vec::new();
        encode("s", sample(), ImageFormat::Jpeg, &EncodingConfig::default(), &mut bytes).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

        let (decoded, format) = decode("s.png", bytes).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decode("junk", b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_unsupported_output_format() {
        let mut bytes = Vec::new();
        let err = encode("g", sample(), ImageFormat::Gif, &EncodingConfig::default(), &mut bytes)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
        assert!(bytes.is_empty());
    }
}
