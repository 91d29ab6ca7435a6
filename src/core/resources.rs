//! Shared resources referenced from the page tree by id.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::model::{Block, ColorSpec};
use crate::rendering::graphics_state::{LineCap, LineJoin};

/// A cascadable bundle of stroke and fill defaults.
#[derive(Debug, Clone, Default)]
pub struct DrawParam {
    pub id: String,
    /// Parent DrawParam consulted for attributes this one leaves unset
    pub relative: Option<String>,
    pub line_width: Option<f64>,
    pub cap: Option<LineCap>,
    pub join: Option<LineJoin>,
    pub miter_limit: Option<f64>,
    pub dash_offset: Option<f64>,
    pub dash_pattern: Option<Vec<f64>>,
    pub stroke_color: Option<ColorSpec>,
    pub fill_color: Option<ColorSpec>,
}

impl DrawParam {
    /// Create an empty DrawParam with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        DrawParam {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Color model of a color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceKind {
    Gray,
    #[default]
    Rgb,
    Cmyk,
}

/// A color space with an optional palette.
#[derive(Debug, Clone, Default)]
pub struct ColorSpace {
    pub id: String,
    pub kind: ColorSpaceKind,
    /// Palette entries as component token strings
    pub palette: Vec<String>,
}

/// Font resource description.
#[derive(Debug, Clone, Default)]
pub struct FontDescriptor {
    pub id: String,
    pub font_name: String,
    pub family_name: Option<String>,
    /// Path of an embedded font file inside the container
    pub font_file: Option<String>,
}

impl FontDescriptor {
    /// Cache key `family_name_file`.
    pub fn cache_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.family_name.as_deref().unwrap_or(""),
            self.font_name,
            self.font_file.as_deref().unwrap_or("")
        )
    }
}

/// A reusable vector group.
#[derive(Debug, Clone, Default)]
pub struct CompositeGraphic {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub content: Vec<Block>,
}

/// Kind of a multimedia resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// Multimedia resource with its raw bytes.
#[derive(Debug, Clone)]
pub struct MediaResource {
    pub id: String,
    pub kind: MediaKind,
    pub data: Arc<[u8]>,
}

/// Resource lookup keyed by string id.
///
/// Implemented by the document reader. Lookups must be cheap and free of
/// blocking I/O except `embedded_file`, which may read from the container.
pub trait ResourceLookup: Send + Sync {
    fn font(&self, id: &str) -> Option<&FontDescriptor>;
    fn draw_param(&self, id: &str) -> Option<&DrawParam>;
    fn color_space(&self, id: &str) -> Option<&ColorSpace>;
    fn composite(&self, id: &str) -> Option<&CompositeGraphic>;
    fn media(&self, id: &str) -> Option<&MediaResource>;

    /// The document's default color space, used by colors that name none.
    fn default_color_space(&self) -> Option<&ColorSpace> {
        None
    }

    /// Raw bytes of an embedded file such as a font program.
    fn embedded_file(&self, path: &str) -> Option<Arc<[u8]>>;
}

/// In-memory resource tables.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    fonts: FxHashMap<String, FontDescriptor>,
    draw_params: FxHashMap<String, DrawParam>,
    color_spaces: FxHashMap<String, ColorSpace>,
    composites: FxHashMap<String, CompositeGraphic>,
    media: FxHashMap<String, MediaResource>,
    files: FxHashMap<String, Arc<[u8]>>,
    default_color_space: Option<String>,
}

impl Resources {
    /// Create empty resource tables.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_font(&mut self, font: FontDescriptor) -> &mut Self {
        self.fonts.insert(font.id.clone(), font);
        self
    }

    pub fn add_draw_param(&mut self, param: DrawParam) -> &mut Self {
        self.draw_params.insert(param.id.clone(), param);
        self
    }

    pub fn add_color_space(&mut self, space: ColorSpace) -> &mut Self {
        self.color_spaces.insert(space.id.clone(), space);
        self
    }

    pub fn add_composite(&mut self, composite: CompositeGraphic) -> &mut Self {
        self.composites.insert(composite.id.clone(), composite);
        self
    }

    pub fn add_media(&mut self, media: MediaResource) -> &mut Self {
        self.media.insert(media.id.clone(), media);
        self
    }

    /// Make a registered color space the document default.
    pub fn set_default_color_space(&mut self, id: impl Into<String>) -> &mut Self {
        self.default_color_space = Some(id.into());
        self
    }

    pub fn add_file(&mut self, path: impl Into<String>, data: impl Into<Arc<[u8]>>) -> &mut Self {
        self.files.insert(path.into(), data.into());
        self
    }
}

impl ResourceLookup for Resources {
    fn font(&self, id: &str) -> Option<&FontDescriptor> {
        self.fonts.get(id)
    }

    fn draw_param(&self, id: &str) -> Option<&DrawParam> {
        self.draw_params.get(id)
    }

    fn color_space(&self, id: &str) -> Option<&ColorSpace> {
        self.color_spaces.get(id)
    }

    fn composite(&self, id: &str) -> Option<&CompositeGraphic> {
        self.composites.get(id)
    }

    fn media(&self, id: &str) -> Option<&MediaResource> {
        self.media.get(id)
    }

    fn default_color_space(&self) -> Option<&ColorSpace> {
        self.color_spaces.get(self.default_color_space.as_deref()?)
    }

    fn embedded_file(&self, path: &str) -> Option<Arc<[u8]>> {
        self.files.get(path).cloned()
    }
}
