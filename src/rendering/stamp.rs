//! Electronic seal compositing.
//!
//! Seals are drawn after the page content into a multiply layer, so white
//! paper behind red ink stays untouched and the text under the seal shows
//! through.

use log::debug;

use super::context::RenderContext;
use super::device::{ClipRegion, Device};
use super::graphics_state::{BlendMode, FillRule};
use super::path::Path;
use crate::core::error::{RenderError, RenderResult};
use crate::core::image::{DecodedImage, ImageDecoder};
use crate::core::matrix::Matrix;
use crate::core::model::{Boundary, Document, StampAnnotation, StampAppearance};

/// Luma weights in 16.16 fixed point.
const GRAY_R: u32 = 19595;
const GRAY_G: u32 = 38469;
const GRAY_B: u32 = 7472;

/// Gray level of an RGB pixel.
pub fn gray_level(r: u8, g: u8, b: u8) -> u32 {
    (r as u32 * GRAY_R + g as u32 * GRAY_G + b as u32 * GRAY_B) >> 16
}

/// Make every pixel whose gray level is at least `threshold` fully
/// transparent. Returns the number of cleared pixels.
pub fn clear_background(image: &mut DecodedImage, threshold: u16) -> usize {
    let threshold = u32::from(threshold);
    let mut cleared = 0;
    for px in image.data.chunks_exact_mut(4) {
        if gray_level(px[0], px[1], px[2]) >= threshold {
            px[3] = 0;
            cleared += 1;
        }
    }
    cleared
}

/// Draws stamp annotations onto a page.
pub struct StampCompositor;

impl StampCompositor {
    /// Draw one stamp. `root` maps page space to device space.
    pub fn render<D: Device + ?Sized>(
        ctx: &mut RenderContext<'_, D>,
        stamp: &StampAnnotation,
        root: &Matrix,
    ) -> RenderResult<()> {
        let boundary = stamp.boundary;
        if boundary.is_empty() {
            return Err(RenderError::InvalidBoundary(format!(
                "stamp {:?} has boundary {:?}",
                stamp.id, boundary
            )));
        }
        let placement = boundary.origin_transform().then(root);

        let clipped = match &stamp.clip {
            Some(clip) => {
                let rect = Path::from_rect(clip.x, clip.y, clip.width, clip.height);
                ctx.device().push_clip(&ClipRegion {
                    path: rect.transform(&placement),
                    rule: FillRule::NonZero,
                })?;
                true
            }
            None => false,
        };

        let opacity = ctx.config().stamp_opacity;
        let result = ctx.with_group(BlendMode::Multiply, opacity, |ctx| match &stamp.appearance {
            StampAppearance::Raster(bytes) => Self::draw_raster(ctx, bytes, &boundary, &placement),
            StampAppearance::Document(document) => {
                Self::draw_document(ctx, document, &boundary, &placement)
            }
        });

        if clipped {
            ctx.device().pop_clip();
        }
        result
    }

    fn draw_raster<D: Device + ?Sized>(
        ctx: &mut RenderContext<'_, D>,
        bytes: &[u8],
        boundary: &Boundary,
        placement: &Matrix,
    ) -> RenderResult<()> {
        let mut image = ImageDecoder::decode(bytes)?;
        let config = ctx.config();
        if config.clear_stamp_background {
            let cleared = clear_background(&mut image, config.stamp_background_gray);
            debug!("Cleared {} background pixels of stamp", cleared);
        }

        let transform = Matrix::scale(
            boundary.width / image.width as f64,
            boundary.height / image.height as f64,
        )
        .then(placement);
        ctx.device().draw_image(&image, &transform, 1.0)
    }

    fn draw_document<D: Device + ?Sized>(
        ctx: &mut RenderContext<'_, D>,
        document: &Document,
        boundary: &Boundary,
        placement: &Matrix,
    ) -> RenderResult<()> {
        let page = document
            .pages
            .first()
            .ok_or_else(|| RenderError::missing("stamp page", "0"))?;
        let size = page.physical_box;
        if size.is_empty() {
            return Err(RenderError::InvalidBoundary(format!(
                "stamp page has physical box {:?}",
                size
            )));
        }

        let transform =
            Matrix::scale(boundary.width / size.width, boundary.height / size.height).then(placement);
        let fonts = ctx.fonts().scoped();
        let mut nested = ctx.nested(document.resources.as_ref(), &fonts);
        for layer in &page.layers {
            nested.walk_root(&layer.blocks, layer.draw_param.as_deref(), &transform)?;
        }
        let report = nested.into_report();
        ctx.report_mut().merge(report);
        Ok(())
    }
}
