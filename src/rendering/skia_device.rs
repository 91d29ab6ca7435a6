//! A tiny-skia based rendering device.

use tiny_skia::{
    BlendMode as SkiaBlendMode, FillRule as SkiaFillRule, FilterQuality, GradientStop as SkiaStop,
    IntSize, LineCap as SkiaLineCap, LineJoin as SkiaLineJoin, LinearGradient, Mask,
    Paint as SkiaPaint, PathBuilder, Pixmap, PixmapPaint, Point, RadialGradient,
    SpreadMode as SkiaSpreadMode, Stroke, StrokeDash, Transform,
};

use super::device::{ClipRegion, Device, Glyph, GlyphStyle, GradientStop, Paint, SpreadMode};
use super::graphics_state::{BlendMode, Color, FillRule, LineCap, LineJoin, StrokeProps};
use super::path::{Path, PathElement};
use crate::core::error::{RenderError, RenderResult};
use crate::core::image::DecodedImage;
use crate::core::matrix::Matrix;

// --- Conversion helpers ---

fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn to_skia_spread(spread: SpreadMode) -> SkiaSpreadMode {
    match spread {
        SpreadMode::Pad => SkiaSpreadMode::Pad,
        SpreadMode::Repeat => SkiaSpreadMode::Repeat,
        SpreadMode::Reflect => SkiaSpreadMode::Reflect,
    }
}

fn to_skia_stops(stops: &[GradientStop]) -> Vec<SkiaStop> {
    stops
        .iter()
        .map(|s| SkiaStop::new(s.offset as f32, to_skia_color(s.color)))
        .collect()
}

fn point(p: (f64, f64)) -> Point {
    Point::from_xy(p.0 as f32, p.1 as f32)
}

/// Gradients that tiny-skia rejects (no stops, coincident points) paint
/// nothing. `shader_space` maps gradient geometry to the space the path is
/// drawn in.
fn to_skia_paint(paint: &Paint, shader_space: Transform) -> Option<SkiaPaint<'static>> {
    let mut sk_paint = SkiaPaint::default();
    match paint {
        Paint::Solid(color) => {
            sk_paint.set_color(to_skia_color(*color));
        }
        Paint::Axial(gradient) => {
            sk_paint.shader = LinearGradient::new(
                point(gradient.start),
                point(gradient.end),
                to_skia_stops(&gradient.stops),
                to_skia_spread(gradient.spread),
                shader_space,
            )?;
        }
        Paint::Radial(gradient) => {
            sk_paint.shader = RadialGradient::new(
                point(gradient.start),
                point(gradient.end),
                gradient.end_radius as f32,
                to_skia_stops(&gradient.stops),
                to_skia_spread(gradient.spread),
                shader_space,
            )?;
        }
    }
    sk_paint.anti_alias = true;
    Some(sk_paint)
}

fn to_skia_line_cap(line_cap: LineCap) -> SkiaLineCap {
    match line_cap {
        LineCap::Butt => SkiaLineCap::Butt,
        LineCap::Round => SkiaLineCap::Round,
        LineCap::Square => SkiaLineCap::Square,
    }
}

fn to_skia_line_join(line_join: LineJoin) -> SkiaLineJoin {
    match line_join {
        LineJoin::Miter => SkiaLineJoin::Miter,
        LineJoin::Round => SkiaLineJoin::Round,
        LineJoin::Bevel => SkiaLineJoin::Bevel,
    }
}

fn to_skia_fill_rule(fill_rule: FillRule) -> SkiaFillRule {
    match fill_rule {
        FillRule::NonZero => SkiaFillRule::Winding,
        FillRule::EvenOdd => SkiaFillRule::EvenOdd,
    }
}

fn to_skia_blend(blend: BlendMode) -> SkiaBlendMode {
    match blend {
        BlendMode::Normal => SkiaBlendMode::SourceOver,
        BlendMode::Multiply => SkiaBlendMode::Multiply,
    }
}

fn to_skia_stroke(stroke_props: &StrokeProps) -> Stroke {
    to_scaled_stroke(stroke_props, 1.0)
}

/// Stroke with lengths multiplied by `factor`.
fn to_scaled_stroke(stroke_props: &StrokeProps, factor: f64) -> Stroke {
    let dash = if stroke_props.dash_array.is_empty() {
        None
    } else {
        StrokeDash::new(
            stroke_props.dash_array.iter().map(|v| (*v * factor) as f32).collect(),
            (stroke_props.dash_offset * factor) as f32,
        )
    };
    Stroke {
        width: (stroke_props.line_width * factor) as f32,
        miter_limit: stroke_props.miter_limit as f32,
        line_cap: to_skia_line_cap(stroke_props.line_cap),
        line_join: to_skia_line_join(stroke_props.line_join),
        dash,
    }
}

fn to_skia_transform(m: &Matrix) -> Transform {
    Transform::from_row(
        m.a as f32, m.b as f32, m.c as f32, m.d as f32, m.e as f32, m.f as f32,
    )
}

fn to_skia_path(path: &Path) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for element in path.elements() {
        match *element {
            PathElement::MoveTo(x, y) => builder.move_to(x as f32, y as f32),
            PathElement::LineTo(x, y) => builder.line_to(x as f32, y as f32),
            PathElement::QuadTo(x1, y1, x, y) => {
                builder.quad_to(x1 as f32, y1 as f32, x as f32, y as f32)
            }
            PathElement::CurveTo(x1, y1, x2, y2, x, y) => builder.cubic_to(
                x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
            ),
            PathElement::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

/// RGBA with straight alpha to a premultiplied pixmap.
fn to_pixmap(image: &DecodedImage) -> RenderResult<Pixmap> {
    let mut data = image.data.clone();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    let size = IntSize::from_wh(image.width, image.height)
        .ok_or_else(|| RenderError::Device("Empty image".into()))?;
    Pixmap::from_vec(data, size).ok_or_else(|| RenderError::Device("Failed to create image pixmap".into()))
}

/// An isolated group being drawn.
struct Layer {
    pixmap: Pixmap,
    blend: BlendMode,
    alpha: f32,
}

/// The pixmap drawing currently goes to.
fn target<'p>(base: &'p mut Pixmap, layers: &'p mut [Layer]) -> &'p mut Pixmap {
    match layers.last_mut() {
        Some(layer) => &mut layer.pixmap,
        None => base,
    }
}

/// Rasterizes onto an owned pixmap.
///
/// Clips are kept as a stack of masks, each the intersection of its
/// predecessors. Groups draw into a fresh transparent pixmap that is
/// composited onto the parent with the group's blend mode when it ends.
pub struct SkiaDevice {
    pixmap: Pixmap,
    clips: Vec<Mask>,
    layers: Vec<Layer>,
}

impl SkiaDevice {
    /// Create a transparent device of `width`×`height` pixels.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Device(format!("Invalid pixmap size {}x{}", width, height)))?;
        Ok(SkiaDevice {
            pixmap,
            clips: Vec::new(),
            layers: Vec::new(),
        })
    }

    /// Fill the whole surface with a color.
    pub fn clear(&mut self, color: Color) {
        self.pixmap.fill(to_skia_color(color));
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Encode the surface as PNG.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| RenderError::Device(format!("PNG encoding failed: {}", e)))
    }

    fn fill(
        &mut self,
        path: &tiny_skia::Path,
        paint: &Paint,
        rule: SkiaFillRule,
        transform: Transform,
        shader_space: Transform,
    ) {
        let Some(sk_paint) = to_skia_paint(paint, shader_space) else {
            return;
        };
        let mask = self.clips.last();
        target(&mut self.pixmap, &mut self.layers).fill_path(path, &sk_paint, rule, transform, mask);
    }

    fn stroke(
        &mut self,
        path: &tiny_skia::Path,
        paint: &Paint,
        stroke: &Stroke,
        transform: Transform,
        shader_space: Transform,
    ) {
        let Some(sk_paint) = to_skia_paint(paint, shader_space) else {
            return;
        };
        let mask = self.clips.last();
        target(&mut self.pixmap, &mut self.layers).stroke_path(path, &sk_paint, stroke, transform, mask);
    }
}

impl Device for SkiaDevice {
    fn stroke_path(
        &mut self,
        path: &Path,
        transform: &Matrix,
        stroke: &StrokeProps,
        paint: &Paint,
    ) -> RenderResult<()> {
        if let Some(path) = to_skia_path(path) {
            self.stroke(
                &path,
                paint,
                &to_skia_stroke(stroke),
                to_skia_transform(transform),
                Transform::identity(),
            );
        }
        Ok(())
    }

    fn fill_path(
        &mut self,
        path: &Path,
        transform: &Matrix,
        paint: &Paint,
        rule: FillRule,
    ) -> RenderResult<()> {
        if let Some(path) = to_skia_path(path) {
            self.fill(
                &path,
                paint,
                to_skia_fill_rule(rule),
                to_skia_transform(transform),
                Transform::identity(),
            );
        }
        Ok(())
    }

    fn draw_image(&mut self, image: &DecodedImage, transform: &Matrix, alpha: f64) -> RenderResult<()> {
        let image_pixmap = to_pixmap(image)?;
        let paint = PixmapPaint {
            opacity: alpha.clamp(0.0, 1.0) as f32,
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        let mask = self.clips.last();
        target(&mut self.pixmap, &mut self.layers).draw_pixmap(
            0,
            0,
            image_pixmap.as_ref(),
            &paint,
            to_skia_transform(transform),
            mask,
        );
        Ok(())
    }

    fn draw_glyph(&mut self, glyph: &Glyph, transform: &Matrix, style: &GlyphStyle) -> RenderResult<()> {
        // The outline is painted in device space; paints and stroke widths
        // come from the text object's space.
        let Some(device_path) = to_skia_path(&glyph.outline.transform(transform)) else {
            return Ok(());
        };
        let shader_space = to_skia_transform(&style.paint_space);
        if let Some((paint, stroke)) = &style.stroke {
            let factor = style.paint_space.determinant().abs().sqrt();
            self.stroke(
                &device_path,
                paint,
                &to_scaled_stroke(stroke, factor),
                Transform::identity(),
                shader_space,
            );
        }
        if let Some(paint) = &style.fill {
            self.fill(
                &device_path,
                paint,
                SkiaFillRule::Winding,
                Transform::identity(),
                shader_space,
            );
        }
        Ok(())
    }

    fn push_clip(&mut self, region: &ClipRegion) -> RenderResult<()> {
        let rule = to_skia_fill_rule(region.rule);
        let path = to_skia_path(&region.path);
        let mask = match (self.clips.last(), path) {
            (Some(current), Some(path)) => {
                let mut mask = current.clone();
                mask.intersect_path(&path, rule, true, Transform::identity());
                mask
            }
            (None, Some(path)) => {
                let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())
                    .ok_or_else(|| RenderError::Device("Failed to allocate clip mask".into()))?;
                mask.fill_path(&path, rule, true, Transform::identity());
                mask
            }
            // an empty clip path hides everything
            (_, None) => Mask::new(self.pixmap.width(), self.pixmap.height())
                .ok_or_else(|| RenderError::Device("Failed to allocate clip mask".into()))?,
        };
        self.clips.push(mask);
        Ok(())
    }

    fn pop_clip(&mut self) {
        self.clips.pop();
    }

    fn begin_group(&mut self, blend: BlendMode, alpha: f64) -> RenderResult<()> {
        let pixmap = Pixmap::new(self.pixmap.width(), self.pixmap.height())
            .ok_or_else(|| RenderError::Device("Failed to allocate group layer".into()))?;
        self.layers.push(Layer {
            pixmap,
            blend,
            alpha: alpha.clamp(0.0, 1.0) as f32,
        });
        Ok(())
    }

    fn end_group(&mut self) -> RenderResult<()> {
        let Some(layer) = self.layers.pop() else {
            return Err(RenderError::Device("end_group without begin_group".into()));
        };
        let paint = PixmapPaint {
            opacity: layer.alpha,
            blend_mode: to_skia_blend(layer.blend),
            quality: FilterQuality::Nearest,
        };
        target(&mut self.pixmap, &mut self.layers).draw_pixmap(
            0,
            0,
            layer.pixmap.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn page_bounds(&self) -> (f64, f64) {
        (self.pixmap.width() as f64, self.pixmap.height() as f64)
    }
}
