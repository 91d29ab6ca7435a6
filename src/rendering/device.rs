//! Device trait for rendering backend abstraction.
//!
//! The content walker resolves geometry, transforms, colors and glyphs, then
//! emits primitive calls on a `Device`. Raster, vector, print and HTML
//! backends differ only in how they realize these calls.

use super::graphics_state::{BlendMode, Color, FillRule, StrokeProps};
use super::path::Path;
use crate::core::error::RenderResult;
use crate::core::image::DecodedImage;
use crate::core::matrix::Matrix;

/// How a gradient behaves outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadMode {
    #[default]
    Pad,
    Repeat,
    Reflect,
}

/// A gradient color stop. Offsets are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

/// Linear gradient between two points in the object's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct AxialGradient {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub stops: Vec<GradientStop>,
    pub spread: SpreadMode,
    pub extend_start: bool,
    pub extend_end: bool,
}

/// Two-circle gradient in the object's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub start: (f64, f64),
    pub start_radius: f64,
    pub end: (f64, f64),
    pub end_radius: f64,
    pub stops: Vec<GradientStop>,
    pub spread: SpreadMode,
    pub extend_start: bool,
    pub extend_end: bool,
}

/// Paint for drawing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    /// Solid color
    Solid(Color),
    /// Axial (linear) gradient
    Axial(AxialGradient),
    /// Radial gradient
    Radial(RadialGradient),
}

impl Paint {
    /// Create a solid black paint.
    pub fn black() -> Self {
        Paint::Solid(Color::black())
    }

    /// Create a solid paint from a color.
    pub fn from_color(color: Color) -> Self {
        Paint::Solid(color)
    }

    /// The color of a solid paint.
    pub fn solid_color(&self) -> Option<Color> {
        match self {
            Paint::Solid(color) => Some(*color),
            _ => None,
        }
    }
}

impl Default for Paint {
    fn default() -> Self {
        Paint::black()
    }
}

/// A glyph outline in font units (y-up), plus its glyph index.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub id: u16,
    pub outline: Path,
}

/// How to paint one glyph. Stroke is drawn first, then fill.
#[derive(Debug, Clone, Default)]
pub struct GlyphStyle {
    pub stroke: Option<(Paint, StrokeProps)>,
    pub fill: Option<Paint>,
    /// Maps the text object's space, where gradient geometry and stroke
    /// widths are given, to device space
    pub paint_space: Matrix,
}

/// A clip region in device space.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRegion {
    pub path: Path,
    pub rule: FillRule,
}

/// A surface that can realize primitive draw calls.
///
/// Transforms map the geometry's local space to device space. Clips are a
/// stack: every `push_clip` is balanced by a `pop_clip`, and likewise for
/// groups.
pub trait Device {
    /// Stroke a path.
    fn stroke_path(
        &mut self,
        path: &Path,
        transform: &Matrix,
        stroke: &StrokeProps,
        paint: &Paint,
    ) -> RenderResult<()>;

    /// Fill a path.
    fn fill_path(
        &mut self,
        path: &Path,
        transform: &Matrix,
        paint: &Paint,
        rule: FillRule,
    ) -> RenderResult<()>;

    /// Draw an image whose pixel grid is mapped through `transform`.
    ///
    /// # Arguments
    /// * `image` - Decoded RGBA pixels
    /// * `transform` - Maps pixel space to device space
    /// * `alpha` - Opacity in [0, 1]
    fn draw_image(&mut self, image: &DecodedImage, transform: &Matrix, alpha: f64) -> RenderResult<()>;

    /// Draw one glyph outline.
    fn draw_glyph(&mut self, glyph: &Glyph, transform: &Matrix, style: &GlyphStyle) -> RenderResult<()>;

    /// Intersect the current clip with `region`.
    fn push_clip(&mut self, region: &ClipRegion) -> RenderResult<()>;

    /// Restore the clip in effect before the matching `push_clip`.
    fn pop_clip(&mut self);

    /// Start an isolated group composited with `blend` and `alpha` on `end_group`.
    ///
    /// Devices without layer support may ignore groups, which degrades the
    /// blend to plain source-over painting.
    fn begin_group(&mut self, blend: BlendMode, alpha: f64) -> RenderResult<()> {
        let _ = (blend, alpha);
        Ok(())
    }

    /// Composite the innermost group.
    fn end_group(&mut self) -> RenderResult<()> {
        Ok(())
    }

    /// Device size in device units.
    fn page_bounds(&self) -> (f64, f64);
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    StrokePath {
        path: Path,
        transform: Matrix,
        stroke: StrokeProps,
        paint: Paint,
    },
    FillPath {
        path: Path,
        transform: Matrix,
        paint: Paint,
        rule: FillRule,
    },
    DrawImage {
        width: u32,
        height: u32,
        transform: Matrix,
        alpha: f64,
    },
    DrawGlyph {
        glyph_id: u16,
        transform: Matrix,
        stroke: Option<Paint>,
        fill: Option<Paint>,
    },
    PushClip(ClipRegion),
    PopClip,
    BeginGroup {
        blend: BlendMode,
        alpha: f64,
    },
    EndGroup,
}

/// A device that records drawing operations instead of producing output.
///
/// Useful for testing and for hosts that translate the call stream to their
/// own surface.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    /// Page width in device units
    page_width: f64,
    /// Page height in device units
    page_height: f64,
    /// Recorded operations
    calls: Vec<DrawCall>,
    clip_depth: usize,
    group_depth: usize,
}

impl RecordingDevice {
    /// Create a new recording device with the given page dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        RecordingDevice {
            page_width: width,
            page_height: height,
            ..Default::default()
        }
    }

    /// Get the recorded calls.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the device empty.
    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// Only the glyph calls.
    pub fn glyph_calls(&self) -> Vec<&DrawCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::DrawGlyph { .. }))
            .collect()
    }

    /// Open clips and groups; both are zero once a render completes.
    pub fn open_depths(&self) -> (usize, usize) {
        (self.clip_depth, self.group_depth)
    }
}

impl Device for RecordingDevice {
    fn stroke_path(
        &mut self,
        path: &Path,
        transform: &Matrix,
        stroke: &StrokeProps,
        paint: &Paint,
    ) -> RenderResult<()> {
        self.calls.push(DrawCall::StrokePath {
            path: path.clone(),
            transform: *transform,
            stroke: stroke.clone(),
            paint: paint.clone(),
        });
        Ok(())
    }

    fn fill_path(
        &mut self,
        path: &Path,
        transform: &Matrix,
        paint: &Paint,
        rule: FillRule,
    ) -> RenderResult<()> {
        self.calls.push(DrawCall::FillPath {
            path: path.clone(),
            transform: *transform,
            paint: paint.clone(),
            rule,
        });
        Ok(())
    }

    fn draw_image(&mut self, image: &DecodedImage, transform: &Matrix, alpha: f64) -> RenderResult<()> {
        self.calls.push(DrawCall::DrawImage {
            width: image.width,
            height: image.height,
            transform: *transform,
            alpha,
        });
        Ok(())
    }

    fn draw_glyph(&mut self, glyph: &Glyph, transform: &Matrix, style: &GlyphStyle) -> RenderResult<()> {
        self.calls.push(DrawCall::DrawGlyph {
            glyph_id: glyph.id,
            transform: *transform,
            stroke: style.stroke.as_ref().map(|(paint, _)| paint.clone()),
            fill: style.fill.clone(),
        });
        Ok(())
    }

    fn push_clip(&mut self, region: &ClipRegion) -> RenderResult<()> {
        self.clip_depth += 1;
        self.calls.push(DrawCall::PushClip(region.clone()));
        Ok(())
    }

    fn pop_clip(&mut self) {
        self.clip_depth = self.clip_depth.saturating_sub(1);
        self.calls.push(DrawCall::PopClip);
    }

    fn begin_group(&mut self, blend: BlendMode, alpha: f64) -> RenderResult<()> {
        self.group_depth += 1;
        self.calls.push(DrawCall::BeginGroup { blend, alpha });
        Ok(())
    }

    fn end_group(&mut self) -> RenderResult<()> {
        self.group_depth = self.group_depth.saturating_sub(1);
        self.calls.push(DrawCall::EndGroup);
        Ok(())
    }

    fn page_bounds(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::path::decode_abbreviated;

    #[test]
    fn test_recording_device_operations() {
        let mut device = RecordingDevice::new(210.0, 297.0);
        let path = decode_abbreviated("M 0 0 L 10 10");

        device
            .stroke_path(&path, &Matrix::identity(), &StrokeProps::default(), &Paint::black())
            .unwrap();
        device
            .fill_path(&path, &Matrix::identity(), &Paint::black(), FillRule::EvenOdd)
            .unwrap();

        let calls = device.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], DrawCall::StrokePath { .. }));
        assert!(matches!(calls[1], DrawCall::FillPath { rule: FillRule::EvenOdd, .. }));
        assert_eq!(device.page_bounds(), (210.0, 297.0));
    }

    #[test]
    fn test_clip_and_group_balance() {
        let mut device = RecordingDevice::new(10.0, 10.0);
        let region = ClipRegion {
            path: Path::from_rect(0.0, 0.0, 5.0, 5.0),
            rule: FillRule::NonZero,
        };

        device.begin_group(BlendMode::Multiply, 1.0).unwrap();
        device.push_clip(&region).unwrap();
        assert_eq!(device.open_depths(), (1, 1));
        device.pop_clip();
        device.end_group().unwrap();
        assert_eq!(device.open_depths(), (0, 0));

        let calls = device.take_calls();
        assert_eq!(calls.last(), Some(&DrawCall::EndGroup));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_paint_solid_color() {
        assert_eq!(Paint::default().solid_color(), Some(Color::black()));
        let axial = Paint::Axial(AxialGradient {
            start: (0.0, 0.0),
            end: (1.0, 0.0),
            stops: Vec::new(),
            spread: SpreadMode::Pad,
            extend_start: false,
            extend_end: false,
        });
        assert_eq!(axial.solid_color(), None);
    }
}
