//! In-memory page tree.
//!
//! These types are produced by the document reader (container and XML binding
//! live outside this crate) and are read-only while rendering. Identifiers that
//! point into the resource tables are plain strings.

use std::sync::Arc;

use super::matrix::Matrix;
use super::resources::ResourceLookup;
use crate::rendering::graphics_state::{FillRule, LineCap, LineJoin};

/// Axis-aligned rectangle in document units (millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Boundary {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Boundary {
    /// Create a boundary from its top-left corner and size.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Boundary {
            x,
            y,
            width,
            height,
        }
    }

    /// Parse a `"x y w h"` string.
    pub fn parse(text: &str) -> Option<Self> {
        let values: Vec<f64> = text
            .split_whitespace()
            .map(|t| t.parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            [x, y, w, h] => Some(Boundary::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    /// All components are finite and the size is non-negative.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// Zero (or invalid) area: nothing inside can be seen.
    pub fn is_empty(&self) -> bool {
        !self.is_valid() || self.width <= 0.0 || self.height <= 0.0
    }

    /// Translation to this boundary's origin.
    pub fn origin_transform(&self) -> Matrix {
        Matrix::translate(self.x, self.y)
    }
}

/// One page of a document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page id, matched against stamp and annotation page references
    pub id: String,
    /// Physical box of the page
    pub physical_box: Boundary,
    /// Template layers followed by content layers, in z-order
    pub layers: Vec<Layer>,
}

/// An ordered list of blocks with an optional inherited DrawParam.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub id: Option<u32>,
    pub draw_param: Option<String>,
    pub blocks: Vec<Block>,
}

/// A node of the page tree.
#[derive(Debug, Clone)]
pub enum Block {
    Group(GroupBlock),
    Text(TextObject),
    Image(ImageObject),
    Path(PathObject),
    Composite(CompositeObject),
}

/// Discriminant of [`Block`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Group,
    Text,
    Image,
    Path,
    Composite,
    Stamp,
    Annotation,
}

impl Block {
    /// The kind of this block.
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Group(_) => BlockKind::Group,
            Block::Text(_) => BlockKind::Text,
            Block::Image(_) => BlockKind::Image,
            Block::Path(_) => BlockKind::Path,
            Block::Composite(_) => BlockKind::Composite,
        }
    }

    /// Object id, if the producer assigned one.
    pub fn id(&self) -> Option<u32> {
        match self {
            Block::Group(g) => g.id,
            Block::Text(t) => t.unit.id,
            Block::Image(i) => i.unit.id,
            Block::Path(p) => p.unit.id,
            Block::Composite(c) => c.unit.id,
        }
    }
}

/// A nested list of blocks.
#[derive(Debug, Clone, Default)]
pub struct GroupBlock {
    pub id: Option<u32>,
    pub boundary: Option<Boundary>,
    pub draw_param: Option<String>,
    pub blocks: Vec<Block>,
}

/// Attributes shared by every graphic primitive.
#[derive(Debug, Clone)]
pub struct GraphicUnit {
    pub id: Option<u32>,
    pub boundary: Boundary,
    pub ctm: Option<Matrix>,
    pub draw_param: Option<String>,
    pub line_width: Option<f64>,
    pub cap: Option<LineCap>,
    pub join: Option<LineJoin>,
    pub miter_limit: Option<f64>,
    pub dash_offset: Option<f64>,
    pub dash_pattern: Option<Vec<f64>>,
    /// 0-255; absent means opaque
    pub alpha: Option<u8>,
    pub visible: bool,
    pub clips: Vec<Clip>,
}

impl Default for GraphicUnit {
    fn default() -> Self {
        GraphicUnit {
            id: None,
            boundary: Boundary::default(),
            ctm: None,
            draw_param: None,
            line_width: None,
            cap: None,
            join: None,
            miter_limit: None,
            dash_offset: None,
            dash_pattern: None,
            alpha: None,
            visible: true,
            clips: Vec::new(),
        }
    }
}

impl GraphicUnit {
    /// Create a unit covering `boundary` with every other attribute unset.
    pub fn with_boundary(boundary: Boundary) -> Self {
        GraphicUnit {
            boundary,
            ..Default::default()
        }
    }

    /// Opacity in [0, 1].
    pub fn opacity(&self) -> f64 {
        self.alpha.map_or(1.0, |a| a as f64 / 255.0)
    }
}

/// A clip: the union of its areas. Multiple clips on one object intersect.
#[derive(Debug, Clone, Default)]
pub struct Clip {
    pub areas: Vec<ClipArea>,
}

/// One clip area, expressed in the owning object's boundary space.
#[derive(Debug, Clone, Default)]
pub struct ClipArea {
    pub ctm: Option<Matrix>,
    /// Offset of the area's own boundary, if any
    pub boundary: Option<Boundary>,
    /// Abbreviated path data
    pub data: String,
    pub rule: FillRule,
}

/// Literal, indexed or gradient color.
#[derive(Debug, Clone, Default)]
pub struct ColorSpec {
    /// Literal component tokens, e.g. `"255 0 0"` or `"#FF 0 0"`
    pub value: Option<String>,
    /// Palette index into the referenced color space
    pub index: Option<usize>,
    /// Color space resource id
    pub color_space: Option<String>,
    /// 0-255; absent means opaque
    pub alpha: Option<u8>,
    pub shading: Option<Shading>,
}

impl ColorSpec {
    /// A literal color in the default (RGB) space.
    pub fn literal(value: impl Into<String>) -> Self {
        ColorSpec {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// A palette entry of the given color space.
    pub fn indexed(color_space: impl Into<String>, index: usize) -> Self {
        ColorSpec {
            index: Some(index),
            color_space: Some(color_space.into()),
            ..Default::default()
        }
    }
}

/// Gradient fill.
#[derive(Debug, Clone)]
pub enum Shading {
    Axial(AxialShading),
    Radial(RadialShading),
}

/// How a gradient continues past its last segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapType {
    #[default]
    Direct,
    Repeat,
    Reflect,
}

/// A color stop. A missing position is spread evenly.
#[derive(Debug, Clone)]
pub struct Segment {
    pub position: Option<f64>,
    pub color: ColorSpec,
}

#[derive(Debug, Clone)]
pub struct AxialShading {
    pub map_type: MapType,
    pub map_unit: Option<f64>,
    /// 0: none, 1: before start, 2: after end, 3: both
    pub extend: u8,
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub struct RadialShading {
    pub map_type: MapType,
    pub map_unit: Option<f64>,
    pub extend: u8,
    pub start: (f64, f64),
    pub start_radius: f64,
    pub end: (f64, f64),
    pub end_radius: f64,
    pub segments: Vec<Segment>,
}

/// A run of text sharing one font and size.
#[derive(Debug, Clone)]
pub struct TextObject {
    pub unit: GraphicUnit,
    /// Font resource id
    pub font: String,
    pub size: f64,
    pub hscale: Option<f64>,
    pub stroke: bool,
    pub fill: bool,
    pub stroke_color: Option<ColorSpec>,
    pub fill_color: Option<ColorSpec>,
    pub codes: Vec<TextCode>,
    pub glyph_overrides: Vec<GlyphOverride>,
}

impl TextObject {
    /// Create a filled, unstroked text object.
    pub fn new(unit: GraphicUnit, font: impl Into<String>, size: f64) -> Self {
        TextObject {
            unit,
            font: font.into(),
            size,
            hscale: None,
            stroke: false,
            fill: true,
            stroke_color: None,
            fill_color: None,
            codes: Vec::new(),
            glyph_overrides: Vec::new(),
        }
    }
}

/// Characters placed from one starting point.
#[derive(Debug, Clone, Default)]
pub struct TextCode {
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Delta array source, e.g. `"g 3 1.5 2.0"`
    pub delta_x: Option<String>,
    pub delta_y: Option<String>,
    pub content: String,
    pub stroke_color: Option<ColorSpec>,
    pub fill_color: Option<ColorSpec>,
}

impl TextCode {
    /// Create a code at an explicit position.
    pub fn at(x: f64, y: f64, content: impl Into<String>) -> Self {
        TextCode {
            x: Some(x),
            y: Some(y),
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Explicit character-offset to glyph-index mapping.
#[derive(Debug, Clone)]
pub struct GlyphOverride {
    /// Offset of the first covered character within the text object; absent means 0
    pub code_position: Option<usize>,
    /// Characters consumed
    pub code_count: usize,
    /// Glyphs used from `glyphs`; absent means all
    pub glyph_count: Option<usize>,
    pub glyphs: Vec<u16>,
}

/// Raster image primitive.
#[derive(Debug, Clone)]
pub struct ImageObject {
    pub unit: GraphicUnit,
    /// Multimedia resource id
    pub resource: String,
    /// Multimedia resource id of a mask; white mask pixels keep the image
    pub image_mask: Option<String>,
}

impl ImageObject {
    pub fn new(unit: GraphicUnit, resource: impl Into<String>) -> Self {
        ImageObject {
            unit,
            resource: resource.into(),
            image_mask: None,
        }
    }
}

/// Vector path primitive.
#[derive(Debug, Clone)]
pub struct PathObject {
    pub unit: GraphicUnit,
    pub stroke: bool,
    pub fill: bool,
    pub rule: FillRule,
    pub stroke_color: Option<ColorSpec>,
    pub fill_color: Option<ColorSpec>,
    /// Abbreviated path data
    pub data: String,
}

impl PathObject {
    /// Create a stroked, unfilled path.
    pub fn new(unit: GraphicUnit, data: impl Into<String>) -> Self {
        PathObject {
            unit,
            stroke: true,
            fill: false,
            rule: FillRule::NonZero,
            stroke_color: None,
            fill_color: None,
            data: data.into(),
        }
    }
}

/// Reference to a reusable vector group.
#[derive(Debug, Clone)]
pub struct CompositeObject {
    pub unit: GraphicUnit,
    /// Composite graphic resource id
    pub resource: String,
}

/// A complete document: pages, resources, stamps and annotations.
#[derive(Clone)]
pub struct Document {
    pub pages: Vec<Page>,
    pub resources: Arc<dyn ResourceLookup>,
    pub stamps: Vec<StampAnnotation>,
    pub annotations: Vec<PageAnnotation>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("pages", &self.pages.len())
            .field("stamps", &self.stamps.len())
            .field("annotations", &self.annotations.len())
            .finish()
    }
}

impl Document {
    /// Create a document with no stamps or annotations.
    pub fn new(pages: Vec<Page>, resources: Arc<dyn ResourceLookup>) -> Self {
        Document {
            pages,
            resources,
            stamps: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Seal appearance: a flat image or a nested fixed-layout document.
#[derive(Debug, Clone)]
pub enum StampAppearance {
    Raster(Arc<[u8]>),
    Document(Arc<Document>),
}

/// A stamp placed on a page.
#[derive(Debug, Clone)]
pub struct StampAnnotation {
    pub id: Option<String>,
    pub page_ref: String,
    pub boundary: Boundary,
    /// Visible sub-rectangle, relative to `boundary`
    pub clip: Option<Boundary>,
    pub appearance: StampAppearance,
}

/// A page annotation with its appearance sub-tree.
#[derive(Debug, Clone)]
pub struct PageAnnotation {
    pub id: Option<u32>,
    pub page_ref: String,
    pub visible: bool,
    pub appearance: GroupBlock,
}
