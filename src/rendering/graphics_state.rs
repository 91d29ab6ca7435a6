//! Value types shared by the content walker and devices: line styles,
//! colors, fill rules and blend modes.

/// Line cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Butt cap (default) - stroke is squared off at the endpoint
    #[default]
    Butt,
    /// Round cap - semicircular arc with center at endpoint
    Round,
    /// Square cap - stroke continues half a line width beyond the endpoint
    Square,
}

impl LineCap {
    /// Parse the document attribute value (`Butt`, `Round`, `Square`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Butt" => Some(LineCap::Butt),
            "Round" => Some(LineCap::Round),
            "Square" => Some(LineCap::Square),
            _ => None,
        }
    }
}

/// Line join style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    /// Miter join (default) - outer edges meet at a sharp point
    #[default]
    Miter,
    /// Round join - circular arc between the edges
    Round,
    /// Bevel join - outer edges meet at a beveled edge
    Bevel,
}

impl LineJoin {
    /// Parse the document attribute value (`Miter`, `Round`, `Bevel`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Miter" => Some(LineJoin::Miter),
            "Round" => Some(LineJoin::Round),
            "Bevel" => Some(LineJoin::Bevel),
            _ => None,
        }
    }
}

/// Default line width in millimetres.
pub const DEFAULT_LINE_WIDTH: f64 = 0.353;

/// Default miter limit.
pub const DEFAULT_MITER_LIMIT: f64 = 3.528;

/// Stroke properties for path rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeProps {
    /// Line width in document units (default: 0.353)
    pub line_width: f64,

    /// Line cap style (default: Butt)
    pub line_cap: LineCap,

    /// Line join style (default: Miter)
    pub line_join: LineJoin,

    /// Miter limit (default: 3.528)
    pub miter_limit: f64,

    /// Dash pattern - array of dash lengths alternating on/off
    pub dash_array: Vec<f64>,

    /// Dash phase - offset into the dash pattern (default: 0)
    pub dash_offset: f64,
}

impl Default for StrokeProps {
    fn default() -> Self {
        StrokeProps {
            line_width: DEFAULT_LINE_WIDTH,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: DEFAULT_MITER_LIMIT,
            dash_array: Vec::new(),
            dash_offset: 0.0,
        }
    }
}

impl StrokeProps {
    /// A hairline of the given width with default cap and join.
    pub fn with_width(line_width: f64) -> Self {
        StrokeProps {
            line_width,
            ..Default::default()
        }
    }
}

/// A resolved 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// Create a color with explicit alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Create a black color (default stroke color)
    pub const fn black() -> Self {
        Color::rgb(0, 0, 0)
    }

    /// Create a white color
    pub const fn white() -> Self {
        Color::rgb(255, 255, 255)
    }

    /// Create a red color
    pub const fn red() -> Self {
        Color::rgb(255, 0, 0)
    }

    /// Replace the alpha channel.
    pub const fn with_alpha(self, a: u8) -> Self {
        Color { a, ..self }
    }

    /// Get RGBA components.
    pub fn components(&self) -> (u8, u8, u8, u8) {
        (self.r, self.g, self.b, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::black()
    }
}

/// Fill rule for path filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Nonzero winding number rule (default)
    #[default]
    NonZero,
    /// Even-odd rule
    EvenOdd,
}

/// How a group layer is composited onto what is below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source-over
    #[default]
    Normal,
    /// Multiply; used for stamps so the seal ink darkens the page
    Multiply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_props_default() {
        let props = StrokeProps::default();
        assert_eq!(props.line_width, 0.353);
        assert_eq!(props.line_cap, LineCap::Butt);
        assert_eq!(props.line_join, LineJoin::Miter);
        assert_eq!(props.miter_limit, 3.528);
        assert!(props.dash_array.is_empty());
        assert_eq!(props.dash_offset, 0.0);
    }

    #[test]
    fn test_parse_styles() {
        assert_eq!(LineCap::parse("Round"), Some(LineCap::Round));
        assert_eq!(LineCap::parse("round"), None);
        assert_eq!(LineJoin::parse("Bevel"), Some(LineJoin::Bevel));
        assert_eq!(LineJoin::parse(""), None);
    }

    #[test]
    fn test_color_helpers() {
        assert_eq!(Color::default(), Color::black());
        assert_eq!(Color::white().with_alpha(10).components(), (255, 255, 255, 10));
    }
}
