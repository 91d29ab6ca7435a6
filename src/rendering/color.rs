//! Color resolution: literal components, palette entries and gradients.

use log::debug;

use super::device::{AxialGradient, GradientStop, Paint, RadialGradient, SpreadMode};
use super::graphics_state::Color;
use crate::core::error::{RenderError, RenderResult};
use crate::core::model::{ColorSpec, MapType, Segment, Shading};
use crate::core::resources::{ColorSpaceKind, ResourceLookup};

/// Parse component tokens. `#`-prefixed tokens are hexadecimal.
///
/// Unparsable tokens count as 0 so later components keep their position.
pub fn parse_components(value: &str) -> Vec<i64> {
    value
        .split_whitespace()
        .map(|token| {
            let parsed = match token.strip_prefix('#') {
                Some(hex) => i64::from_str_radix(hex, 16).ok(),
                None => token.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64),
            };
            parsed.unwrap_or_else(|| {
                debug!("Unparsable color component '{}', using 0", token);
                0
            })
        })
        .collect()
}

/// Convert components in a color space to RGB. Missing components are 0.
pub fn convert(kind: ColorSpaceKind, components: &[i64]) -> Color {
    let c = |i: usize| components.get(i).copied().unwrap_or(0);
    let channel = |v: i64| v.clamp(0, 255) as u8;

    match kind {
        ColorSpaceKind::Gray => {
            let g = channel(c(0));
            Color::rgb(g, g, g)
        }
        ColorSpaceKind::Cmyk => {
            let pct = |i: usize| c(i).clamp(0, 100);
            let k = pct(3);
            let ink = |v: i64| channel(255 * (100 - v) * (100 - k) / 10000);
            Color::rgb(ink(pct(0)), ink(pct(1)), ink(pct(2)))
        }
        ColorSpaceKind::Rgb => Color::rgb(channel(c(0)), channel(c(1)), channel(c(2))),
    }
}

fn spread_mode(map_type: MapType) -> SpreadMode {
    match map_type {
        MapType::Direct => SpreadMode::Pad,
        MapType::Repeat => SpreadMode::Repeat,
        MapType::Reflect => SpreadMode::Reflect,
    }
}

/// Resolves [`ColorSpec`]s against the document's color spaces.
pub struct ColorResolver<'a> {
    resources: &'a dyn ResourceLookup,
}

impl<'a> ColorResolver<'a> {
    /// Create a resolver over a resource table.
    pub fn new(resources: &'a dyn ResourceLookup) -> Self {
        ColorResolver { resources }
    }

    /// Resolve a color specification to a paint.
    ///
    /// A spec naming no color space uses the document default, else RGB.
    ///
    /// Returns `Ok(None)` when nothing can be resolved; callers then fall back
    /// to the cascaded DrawParam color or a hard default. The only error is a
    /// palette index outside a resolved palette.
    pub fn resolve(&self, spec: &ColorSpec) -> RenderResult<Option<Paint>> {
        let space = match spec.color_space.as_deref() {
            Some(id) => self.resources.color_space(id),
            None => self.resources.default_color_space(),
        };
        let kind = space.map(|s| s.kind).unwrap_or_default();
        let alpha = spec.alpha.unwrap_or(255);

        if let Some(value) = &spec.value {
            let color = convert(kind, &parse_components(value));
            return Ok(Some(Paint::Solid(color.with_alpha(alpha))));
        }

        if let Some(index) = spec.index {
            let Some(space) = space else {
                debug!(
                    "Palette index {} without a resolvable color space {:?}",
                    index, spec.color_space
                );
                return Ok(None);
            };
            let entry = space.palette.get(index).ok_or(RenderError::PaletteIndex {
                index,
                len: space.palette.len(),
            })?;
            let color = convert(kind, &parse_components(entry));
            return Ok(Some(Paint::Solid(color.with_alpha(alpha))));
        }

        match &spec.shading {
            Some(Shading::Axial(axial)) => Ok(Some(Paint::Axial(AxialGradient {
                start: axial.start,
                end: axial.end,
                stops: self.stops(&axial.segments)?,
                spread: spread_mode(axial.map_type),
                extend_start: axial.extend & 1 != 0,
                extend_end: axial.extend & 2 != 0,
            }))),
            Some(Shading::Radial(radial)) => Ok(Some(Paint::Radial(RadialGradient {
                start: radial.start,
                start_radius: radial.start_radius,
                end: radial.end,
                end_radius: radial.end_radius,
                stops: self.stops(&radial.segments)?,
                spread: spread_mode(radial.map_type),
                extend_start: radial.extend & 1 != 0,
                extend_end: radial.extend & 2 != 0,
            }))),
            None => Ok(None),
        }
    }

    /// Resolve to a solid color, if the paint is one.
    pub fn resolve_solid(&self, spec: &ColorSpec) -> RenderResult<Option<Color>> {
        Ok(self.resolve(spec)?.and_then(|paint| paint.solid_color()))
    }

    fn stops(&self, segments: &[Segment]) -> RenderResult<Vec<GradientStop>> {
        let n = segments.len();
        let mut stops = Vec::with_capacity(n);
        for (i, segment) in segments.iter().enumerate() {
            let spread = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let offset = segment.position.unwrap_or(spread).clamp(0.0, 1.0);
            let Some(color) = self.resolve_solid(&segment.color)? else {
                debug!("Skipping gradient stop {} without a solid color", i);
                continue;
            };
            stops.push(GradientStop { offset, color });
        }
        Ok(stops)
    }
}
