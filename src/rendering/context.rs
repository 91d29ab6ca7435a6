//! Rendering context for walking a page's object tree.
//!
//! The [`RenderContext`] owns everything that lives for exactly one page
//! render: the borrowed device, the decoded-image cache and the diagnostics.
//! Transforms and the DrawParam cascade are passed down the recursion by
//! value, so a child can never change what its siblings see.

use std::num::NonZeroUsize;
use std::sync::Arc;

use log::{debug, trace, warn};
use lru::LruCache;

use super::color::ColorResolver;
use super::config::RenderConfig;
use super::device::{ClipRegion, Device, Glyph, GlyphStyle, Paint};
use super::draw_param::{DrawParamResolver, EffectiveParams, LocalParams, ParamCascade};
use super::font::FontCache;
use super::graphics_state::{BlendMode, Color, FillRule, StrokeProps};
use super::path::{Path, decode_abbreviated};
use super::text::TextShaper;
use crate::core::error::{RenderError, RenderResult};
use crate::core::image::{DecodedImage, ImageDecoder};
use crate::core::matrix::Matrix;
use crate::core::model::{
    Block, BlockKind, ColorSpec, CompositeObject, GraphicUnit, GroupBlock, ImageObject, PathObject,
    TextObject,
};
use crate::core::resources::{DrawParam, ResourceLookup};

/// Width of the debug boundary outline.
const BOUNDARY_LINE_WIDTH: f64 = 0.1;

/// A block that failed to render.
#[derive(Debug)]
pub struct Diagnostic {
    pub block: BlockKind,
    pub id: Option<u32>,
    pub error: RenderError,
}

/// Outcome of rendering one page.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Primitives that produced device calls
    pub blocks_drawn: usize,
    /// Primitives that failed or had nothing visible to draw
    pub blocks_skipped: usize,
}

impl RenderReport {
    /// Whether every block rendered without error.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: RenderReport) {
        self.diagnostics.extend(other.diagnostics);
        self.blocks_drawn += other.blocks_drawn;
        self.blocks_skipped += other.blocks_skipped;
    }

    pub(crate) fn record(&mut self, block: BlockKind, id: Option<u32>, error: RenderError) {
        warn!("Failed to render {:?} block {:?}: {}", block, id, error);
        self.blocks_skipped += 1;
        self.diagnostics.push(Diagnostic { block, id, error });
    }
}

/// What a block amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Drawn,
    Skipped,
    /// Containers only forward to their children
    Walked,
}

/// Per-page rendering state.
pub struct RenderContext<'r, D: Device + ?Sized> {
    device: &'r mut D,
    resources: &'r dyn ResourceLookup,
    fonts: &'r FontCache,
    config: &'r RenderConfig,
    images: LruCache<String, Arc<DecodedImage>>,
    composite_depth: usize,
    report: RenderReport,
}

impl<'r, D: Device + ?Sized> RenderContext<'r, D> {
    /// Create a context drawing onto `device`.
    pub fn new(
        device: &'r mut D,
        resources: &'r dyn ResourceLookup,
        fonts: &'r FontCache,
        config: &'r RenderConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.image_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        RenderContext {
            device,
            resources,
            fonts,
            config,
            images: LruCache::new(capacity),
            composite_depth: 0,
            report: RenderReport::default(),
        }
    }

    /// A context over another document's resources and font cache, sharing
    /// this context's device and options. Its report must be merged back by
    /// the caller.
    pub fn nested<'n>(
        &'n mut self,
        resources: &'n dyn ResourceLookup,
        fonts: &'n FontCache,
    ) -> RenderContext<'n, D> {
        RenderContext::new(&mut *self.device, resources, fonts, self.config)
    }

    pub fn fonts(&self) -> &'r FontCache {
        self.fonts
    }

    /// Get the device.
    pub fn device(&mut self) -> &mut D {
        &mut *self.device
    }

    pub fn config(&self) -> &RenderConfig {
        self.config
    }

    pub fn resources(&self) -> &'r dyn ResourceLookup {
        self.resources
    }

    /// Report accumulated so far.
    pub fn report(&self) -> &RenderReport {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut RenderReport {
        &mut self.report
    }

    /// Finish the render and hand back its report.
    pub fn into_report(self) -> RenderReport {
        self.report
    }

    /// Look up a DrawParam by reference. Unknown references are ignored.
    pub fn draw_param(&self, id: Option<&str>) -> Option<&'r DrawParam> {
        let resources: &'r dyn ResourceLookup = self.resources;
        let id = id?;
        let param = resources.draw_param(id);
        if param.is_none() {
            debug!("Ignoring unknown DrawParam reference {}", id);
        }
        param
    }

    /// Walk blocks in order.
    ///
    /// Block errors are recorded and the walk continues with the next
    /// sibling; only fatal errors are returned.
    pub fn walk(
        &mut self,
        blocks: &[Block],
        transform: &Matrix,
        cascade: &ParamCascade<'_>,
    ) -> RenderResult<()> {
        for block in blocks {
            match self.draw_block(block, transform, cascade) {
                Ok(Outcome::Drawn) => self.report.blocks_drawn += 1,
                Ok(Outcome::Skipped) => self.report.blocks_skipped += 1,
                Ok(Outcome::Walked) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => self.report.record(block.kind(), block.id(), e),
            }
        }
        Ok(())
    }

    /// Walk top-level blocks (a layer, an annotation appearance) with a fresh
    /// cascade holding only `draw_param`.
    pub fn walk_root(
        &mut self,
        blocks: &[Block],
        draw_param: Option<&str>,
        transform: &Matrix,
    ) -> RenderResult<()> {
        let root = ParamCascade::Root;
        let node;
        let cascade = match self.draw_param(draw_param) {
            Some(param) => {
                node = root.push(param);
                &node
            }
            None => &root,
        };
        self.walk(blocks, transform, cascade)
    }

    fn draw_block(
        &mut self,
        block: &Block,
        transform: &Matrix,
        cascade: &ParamCascade<'_>,
    ) -> RenderResult<Outcome> {
        let param_ref = match block {
            Block::Group(group) => group.draw_param.as_deref(),
            Block::Text(text) => text.unit.draw_param.as_deref(),
            Block::Image(image) => image.unit.draw_param.as_deref(),
            Block::Path(path) => path.unit.draw_param.as_deref(),
            Block::Composite(composite) => composite.unit.draw_param.as_deref(),
        };
        let node;
        let cascade = match self.draw_param(param_ref) {
            Some(param) => {
                node = cascade.push(param);
                &node
            }
            None => cascade,
        };

        match block {
            Block::Group(group) => self.draw_group(group, transform, cascade),
            Block::Text(text) => self.draw_text(text, transform, cascade),
            Block::Image(image) => self.draw_image(image, transform),
            Block::Path(path) => self.draw_path(path, transform, cascade),
            Block::Composite(composite) => self.draw_composite(composite, transform, cascade),
        }
    }

    fn draw_group(
        &mut self,
        group: &GroupBlock,
        transform: &Matrix,
        cascade: &ParamCascade<'_>,
    ) -> RenderResult<Outcome> {
        let transform = match &group.boundary {
            Some(boundary) => boundary.origin_transform().then(transform),
            None => *transform,
        };
        self.walk(&group.blocks, &transform, cascade)?;
        Ok(Outcome::Walked)
    }

    fn draw_text(
        &mut self,
        text: &TextObject,
        transform: &Matrix,
        cascade: &ParamCascade<'_>,
    ) -> RenderResult<Outcome> {
        let unit = &text.unit;
        if !unit.visible || unit.boundary.is_empty() {
            return Ok(Outcome::Skipped);
        }

        let font = match self.resources.font(&text.font) {
            Some(descriptor) => self.fonts.resolve(descriptor, self.resources),
            None => {
                debug!("Unknown font reference {}, using default font", text.font);
                self.fonts.fallback()
            }
        };
        let params = self.effective(unit, text.stroke_color.as_ref(), text.fill_color.as_ref(), cascade)?;

        let local = local_transform(unit, transform);
        let base = unit.ctm.unwrap_or_default().then(&local);
        let styles = text
            .codes
            .iter()
            .map(|code| {
                self.glyph_style(
                    text,
                    &params,
                    code.stroke_color.as_ref(),
                    code.fill_color.as_ref(),
                    &base,
                )
            })
            .collect::<RenderResult<Vec<_>>>()?;

        let glyphs = TextShaper::new(text, &font).shape(&base);

        self.with_opacity(unit.opacity(), |ctx| {
            ctx.with_clips(unit, &local, false, |ctx| {
                for placed in &glyphs {
                    let Some(outline) = font.program.outline(placed.glyph_id) else {
                        trace!("Glyph {} has no outline", placed.glyph_id);
                        continue;
                    };
                    let glyph = Glyph {
                        id: placed.glyph_id,
                        outline,
                    };
                    ctx.device
                        .draw_glyph(&glyph, &placed.transform, &styles[placed.code_index])?;
                }
                Ok(())
            })
        })?;
        self.stroke_boundary(unit, &local)?;

        Ok(if glyphs.is_empty() { Outcome::Skipped } else { Outcome::Drawn })
    }

    fn glyph_style(
        &self,
        text: &TextObject,
        params: &EffectiveParams,
        stroke_color: Option<&ColorSpec>,
        fill_color: Option<&ColorSpec>,
        paint_space: &Matrix,
    ) -> RenderResult<GlyphStyle> {
        let colors = ColorResolver::new(self.resources);
        let stroke = if text.stroke {
            let paint = match stroke_color.or(params.stroke_color.as_ref()) {
                Some(spec) => colors.resolve(spec)?,
                None => None,
            };
            Some((paint.unwrap_or_default(), params.stroke.clone()))
        } else {
            None
        };
        let fill = if text.fill {
            let paint = match fill_color.or(params.fill_color.as_ref()) {
                Some(spec) => colors.resolve(spec)?,
                None => None,
            };
            Some(paint.unwrap_or_default())
        } else {
            None
        };
        Ok(GlyphStyle {
            stroke,
            fill,
            paint_space: *paint_space,
        })
    }

    fn draw_image(&mut self, image: &ImageObject, transform: &Matrix) -> RenderResult<Outcome> {
        let unit = &image.unit;
        if !unit.visible {
            return Ok(Outcome::Skipped);
        }
        let boundary = unit.boundary;
        if boundary.is_empty() {
            return Err(RenderError::InvalidBoundary(format!(
                "image {} has boundary {:?}",
                image.resource, boundary
            )));
        }

        let decoded = match image.image_mask.as_deref() {
            Some(mask) => self.load_masked_image(&image.resource, mask)?,
            None => self.load_image(&image.resource)?,
        };
        if decoded.width == 0 || decoded.height == 0 {
            return Ok(Outcome::Skipped);
        }

        let local = local_transform(unit, transform);
        let placement = unit
            .ctm
            .unwrap_or(Matrix::scale(boundary.width, boundary.height))
            .then(&local);
        let pixel_transform =
            Matrix::scale(1.0 / decoded.width as f64, 1.0 / decoded.height as f64).then(&placement);

        let clip_boundary = self.config.clip_to_boundary;
        self.with_clips(unit, &local, clip_boundary, |ctx| {
            ctx.device.draw_image(&decoded, &pixel_transform, unit.opacity())
        })?;
        self.stroke_boundary(unit, &local)?;
        Ok(Outcome::Drawn)
    }

    /// Decode a media resource, reusing earlier decodes.
    pub fn load_image(&mut self, id: &str) -> RenderResult<Arc<DecodedImage>> {
        if let Some(image) = self.images.get(id) {
            return Ok(image.clone());
        }
        let media = self
            .resources
            .media(id)
            .ok_or_else(|| RenderError::missing("media", id))?;
        let image = Arc::new(ImageDecoder::decode(&media.data)?);
        debug!("Decoded image {} ({}x{})", id, image.width, image.height);
        self.images.put(id.to_string(), image.clone());
        Ok(image)
    }

    /// Decode an image and cut it with its mask.
    ///
    /// A mask that fails to load or differs in size from the image is
    /// ignored; only the image itself can fail the block.
    pub fn load_masked_image(&mut self, id: &str, mask: &str) -> RenderResult<Arc<DecodedImage>> {
        let key = format!("{}\u{0}{}", id, mask);
        if let Some(image) = self.images.get(&key) {
            return Ok(image.clone());
        }
        let image = self.load_image(id)?;
        let masked = match self.load_image(mask) {
            Ok(mask_image) => {
                let mut masked = (*image).clone();
                if masked.apply_mask(&mask_image) {
                    Arc::new(masked)
                } else {
                    debug!("Mask {} does not match the size of image {}, ignoring it", mask, id);
                    image
                }
            }
            Err(e) => {
                debug!("Ignoring mask {} of image {}: {}", mask, id, e);
                image
            }
        };
        self.images.put(key, masked.clone());
        Ok(masked)
    }

    fn draw_path(
        &mut self,
        object: &PathObject,
        transform: &Matrix,
        cascade: &ParamCascade<'_>,
    ) -> RenderResult<Outcome> {
        let unit = &object.unit;
        if !unit.visible || unit.boundary.is_empty() {
            return Ok(Outcome::Skipped);
        }
        let path = decode_abbreviated(&object.data);
        if path.is_empty() {
            debug!("Path {:?} has nothing to draw", unit.id);
            return Ok(Outcome::Skipped);
        }

        let params = self.effective(
            unit,
            object.stroke_color.as_ref(),
            object.fill_color.as_ref(),
            cascade,
        )?;
        let colors = ColorResolver::new(self.resources);
        let fill = match (object.fill, &params.fill_color) {
            (true, Some(spec)) => colors.resolve(spec)?,
            _ => None,
        };
        let stroke = if object.stroke {
            let paint = match &params.stroke_color {
                Some(spec) => colors.resolve(spec)?,
                None => None,
            };
            Some(paint.unwrap_or_default())
        } else {
            None
        };
        if fill.is_none() && stroke.is_none() {
            return Ok(Outcome::Skipped);
        }

        let local = local_transform(unit, transform);
        let path_transform = unit.ctm.unwrap_or_default().then(&local);
        let clip_boundary = self.config.clip_to_boundary;

        self.with_opacity(unit.opacity(), |ctx| {
            ctx.with_clips(unit, &local, clip_boundary, |ctx| {
                if let Some(paint) = &fill {
                    ctx.device.fill_path(&path, &path_transform, paint, object.rule)?;
                }
                if let Some(paint) = &stroke {
                    ctx.device.stroke_path(&path, &path_transform, &params.stroke, paint)?;
                }
                Ok(())
            })
        })?;
        self.stroke_boundary(unit, &local)?;
        Ok(Outcome::Drawn)
    }

    fn draw_composite(
        &mut self,
        object: &CompositeObject,
        transform: &Matrix,
        cascade: &ParamCascade<'_>,
    ) -> RenderResult<Outcome> {
        let unit = &object.unit;
        if !unit.visible || unit.boundary.is_empty() {
            return Ok(Outcome::Skipped);
        }
        if self.composite_depth >= self.config.max_composite_depth {
            return Err(RenderError::CompositeTooDeep(self.config.max_composite_depth));
        }
        let resources: &'r dyn ResourceLookup = self.resources;
        let composite = resources
            .composite(&object.resource)
            .ok_or_else(|| RenderError::missing("composite graphic", &object.resource))?;

        let local = local_transform(unit, transform);
        let content_transform = unit.ctm.unwrap_or_default().then(&local);

        self.composite_depth += 1;
        let result = self.with_opacity(unit.opacity(), |ctx| {
            ctx.with_clips(unit, &local, false, |ctx| {
                ctx.walk(&composite.content, &content_transform, cascade)
            })
        });
        self.composite_depth -= 1;
        result?;

        self.stroke_boundary(unit, &local)?;
        Ok(Outcome::Walked)
    }

    fn effective(
        &self,
        unit: &GraphicUnit,
        stroke_color: Option<&ColorSpec>,
        fill_color: Option<&ColorSpec>,
        cascade: &ParamCascade<'_>,
    ) -> RenderResult<EffectiveParams> {
        let resolver = DrawParamResolver::new(self.resources, self.config.max_cascade_depth);
        resolver.resolve(&LocalParams::from_unit(unit, stroke_color, fill_color), cascade)
    }

    /// Run `draw` inside an opacity group when `opacity` is below one.
    pub fn with_opacity(
        &mut self,
        opacity: f64,
        draw: impl FnOnce(&mut Self) -> RenderResult<()>,
    ) -> RenderResult<()> {
        if opacity >= 1.0 {
            return draw(self);
        }
        self.with_group(BlendMode::Normal, opacity, draw)
    }

    /// Run `draw` inside a device group; the group is closed even on error.
    pub fn with_group(
        &mut self,
        blend: BlendMode,
        alpha: f64,
        draw: impl FnOnce(&mut Self) -> RenderResult<()>,
    ) -> RenderResult<()> {
        self.device.begin_group(blend, alpha)?;
        let result = draw(self);
        let closed = self.device.end_group();
        result.and(closed)
    }

    /// Run `draw` with the unit's clips (and optionally its boundary) pushed.
    fn with_clips(
        &mut self,
        unit: &GraphicUnit,
        local: &Matrix,
        clip_boundary: bool,
        draw: impl FnOnce(&mut Self) -> RenderResult<()>,
    ) -> RenderResult<()> {
        let mut pushed = 0;
        let result = self
            .push_clips(unit, local, clip_boundary, &mut pushed)
            .and_then(|_| draw(self));
        for _ in 0..pushed {
            self.device.pop_clip();
        }
        result
    }

    fn push_clips(
        &mut self,
        unit: &GraphicUnit,
        local: &Matrix,
        clip_boundary: bool,
        pushed: &mut usize,
    ) -> RenderResult<()> {
        if clip_boundary {
            let rect = Path::from_rect(0.0, 0.0, unit.boundary.width, unit.boundary.height);
            self.device.push_clip(&ClipRegion {
                path: rect.transform(local),
                rule: FillRule::NonZero,
            })?;
            *pushed += 1;
        }

        for clip in &unit.clips {
            let mut union = Path::new();
            for area in &clip.areas {
                let offset = area
                    .boundary
                    .map(|b| b.origin_transform())
                    .unwrap_or_default();
                let area_transform = area.ctm.unwrap_or_default().then(&offset).then(local);
                union.append(&decode_abbreviated(&area.data).transform(&area_transform));
            }
            if union.is_empty() {
                trace!("Skipping empty clip on {:?}", unit.id);
                continue;
            }
            let rule = clip.areas.first().map(|a| a.rule).unwrap_or_default();
            self.device.push_clip(&ClipRegion { path: union, rule })?;
            *pushed += 1;
        }
        Ok(())
    }

    fn stroke_boundary(&mut self, unit: &GraphicUnit, local: &Matrix) -> RenderResult<()> {
        if !self.config.draw_boundary {
            return Ok(());
        }
        let rect = Path::from_rect(0.0, 0.0, unit.boundary.width, unit.boundary.height);
        self.device.stroke_path(
            &rect,
            local,
            &StrokeProps::with_width(BOUNDARY_LINE_WIDTH),
            &Paint::Solid(Color::red()),
        )
    }
}

/// `translate(boundary) ∘ parent`: the unit's boundary space.
fn local_transform(unit: &GraphicUnit, parent: &Matrix) -> Matrix {
    unit.boundary.origin_transform().then(parent)
}
