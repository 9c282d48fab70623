//! Color inversion transform.

use image::RgbaImage;
use std::io::{Read, Write};

use crate::config::{Config, EncodingConfig, LimitsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::TaskContext;

use super::codec::{self, format_to_string};
use super::transform::Transform;

/// Inverts every color channel, keeping alpha, and re-encodes the image in
/// its source format.
#[derive(Debug, Clone, Default)]
pub struct InvertTransform {
    limits: LimitsConfig,
    encoding: EncodingConfig,
}

impl InvertTransform {
    pub fn new(limits: LimitsConfig, encoding: EncodingConfig) -> Self {
        Self { limits, encoding }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.limits.clone(), config.encoding.clone())
    }
}

impl Transform for InvertTransform {
    fn apply(
        &self,
        ctx: &TaskContext,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> PipelineResult<()> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        ctx.check_cancelled()?;

        let (image, format) = codec::decode(&ctx.task, bytes)?;
        let (width, height) = (image.width(), image.height());
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                task: ctx.task.clone(),
                width,
                height,
                max_dim,
            });
        }

        tracing::debug!(
            worker = %ctx.worker,
            task = %ctx.task,
            format = %format_to_string(format),
            width,
            height,
            "Processing image"
        );

        let mut pixels = image.into_rgba8();
        invert_in_place(&mut pixels, ctx)?;

        tracing::debug!(worker = %ctx.worker, task = %ctx.task, "Inverting done, encoding");
        codec::encode(&ctx.task, pixels, format, &self.encoding, output)
    }
}

/// Invert RGB channels row by row, checking for cancellation before each row.
pub fn invert_in_place(image: &mut RgbaImage, ctx: &TaskContext) -> PipelineResult<()> {
    for row in image.rows_mut() {
        ctx.check_cancelled()?;
        for pixel in row {
            let [r, g, b, a] = pixel.0;
            pixel.0 = [255 - r, 255 - g, 255 - b, a];
        }
    }
    Ok(())
}
