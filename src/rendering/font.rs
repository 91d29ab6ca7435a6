//! Font loading and the process-wide font cache.
//!
//! A [`FontCache`] resolves a document's font descriptors to parsed font
//! programs: embedded file first, then an installed face, then a face with a
//! similar name, then the default font. Resolved handles are immutable and
//! shared between pages.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use rustc_hash::FxHashMap;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::path::Path;
use super::system_fonts::{FontLocation, SystemFontIndex, similar_font_name};
use crate::core::error::{RenderError, RenderResult};
use crate::core::resources::{FontDescriptor, ResourceLookup};

/// Substitution targets tried, in order, when picking a default from the
/// system index.
const DEFAULT_CANDIDATES: [&str; 4] = ["SimSun", "SimHei", "KaiTi", "FangSong"];

/// A parsed font: a character map and glyph outlines in font units (y-up).
pub trait FontProgram: Send + Sync + fmt::Debug {
    /// Design units per em.
    fn units_per_em(&self) -> u16;

    /// Glyph index for a character, if the cmap has one.
    fn glyph_index(&self, ch: char) -> Option<u16>;

    /// Outline of a glyph; `None` for empty or unknown glyphs.
    fn outline(&self, glyph: u16) -> Option<Path>;
}

/// Collects a ttf-parser outline into a [`Path`].
struct OutlineCollector(Path);

impl OutlineBuilder for OutlineCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x as f64, y as f64);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x as f64, y as f64);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1 as f64, y1 as f64, x as f64, y as f64);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0
            .curve_to(x1 as f64, y1 as f64, x2 as f64, y2 as f64, x as f64, y as f64);
    }

    fn close(&mut self) {
        self.0.close_path();
    }
}

/// A TrueType/OpenType face backed by shared font bytes.
#[derive(Clone)]
pub struct TrueTypeProgram {
    data: Arc<[u8]>,
    index: u32,
    units_per_em: u16,
}

impl fmt::Debug for TrueTypeProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeProgram")
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl TrueTypeProgram {
    /// Parse face `index` of a font file.
    pub fn parse(data: impl Into<Arc<[u8]>>, index: u32) -> RenderResult<Self> {
        let data = data.into();
        let face = Face::parse(&data, index)
            .map_err(|e| RenderError::Font(format!("Failed to parse font face {}: {}", index, e)))?;
        let units_per_em = face.units_per_em();
        Ok(TrueTypeProgram {
            data,
            index,
            units_per_em,
        })
    }

    /// Parse a font file, choosing the collection member whose family, full
    /// or PostScript name equals `name`. Plain files and collections without
    /// a match use face 0.
    pub fn parse_matching(data: impl Into<Arc<[u8]>>, name: &str) -> RenderResult<Self> {
        let data = data.into();
        let index = match ttf_parser::fonts_in_collection(&data) {
            Some(count) => (0..count)
                .find(|&i| {
                    Face::parse(&data, i)
                        .map(|face| face_has_name(&face, name))
                        .unwrap_or(false)
                })
                .unwrap_or_else(|| {
                    debug!("No face named '{}' among {} in collection, using face 0", name, count);
                    0
                }),
            None => 0,
        };
        Self::parse(data, index)
    }

    /// Face index inside the file.
    pub fn index(&self) -> u32 {
        self.index
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }
}

fn face_has_name(face: &Face<'_>, wanted: &str) -> bool {
    use ttf_parser::name_id;

    face.names()
        .into_iter()
        .filter(|n| {
            matches!(
                n.name_id,
                name_id::FAMILY | name_id::FULL_NAME | name_id::POST_SCRIPT_NAME
            )
        })
        .filter_map(|n| n.to_string())
        .any(|n| n.eq_ignore_ascii_case(wanted))
}

impl FontProgram for TrueTypeProgram {
    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn glyph_index(&self, ch: char) -> Option<u16> {
        self.face()?.glyph_index(ch).map(|g| g.0)
    }

    fn outline(&self, glyph: u16) -> Option<Path> {
        let face = self.face()?;
        let mut collector = OutlineCollector(Path::new());
        face.outline_glyph(GlyphId(glyph), &mut collector)?;
        Some(collector.0)
    }
}

/// A resolved font.
#[derive(Debug, Clone)]
pub struct FontHandle {
    pub program: Arc<dyn FontProgram>,
    /// The requested face was not available and another one stands in.
    /// Glyph overrides index the requested face, so they are ignored.
    pub substituted: bool,
}

impl FontHandle {
    fn exact(program: Arc<dyn FontProgram>) -> Self {
        FontHandle {
            program,
            substituted: false,
        }
    }

    fn substitute(program: Arc<dyn FontProgram>) -> Self {
        FontHandle {
            program,
            substituted: true,
        }
    }
}

/// Shared cache of resolved fonts.
///
/// Cache keys only name a descriptor, and embedded file paths are relative to
/// one document. A stamp's sub-document therefore resolves through a
/// [`FontCache::scoped`] cache of its own.
pub struct FontCache {
    entries: RwLock<FxHashMap<String, FontHandle>>,
    system: Arc<SystemFontIndex>,
    default: Arc<dyn FontProgram>,
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCache")
            .field("entries", &self.len())
            .field("system_keys", &self.system.len())
            .field("default", &self.default)
            .finish()
    }
}

impl FontCache {
    /// Start configuring a cache.
    pub fn builder() -> FontCacheBuilder {
        FontCacheBuilder::default()
    }

    /// Resolve a font descriptor. Never fails: every lookup degrades to the
    /// default font.
    pub fn resolve(&self, descriptor: &FontDescriptor, resources: &dyn ResourceLookup) -> FontHandle {
        let key = descriptor.cache_key();
        if let Some(handle) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return handle.clone();
        }

        let handle = self.load(descriptor, resources);
        // Concurrent loads of one key race; the last insert wins.
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, handle.clone());
        handle
    }

    /// Resolve descriptors ahead of rendering so page walks only hit the cache.
    pub fn warm<'d>(
        &self,
        descriptors: impl IntoIterator<Item = &'d FontDescriptor>,
        resources: &dyn ResourceLookup,
    ) {
        for descriptor in descriptors {
            self.resolve(descriptor, resources);
        }
    }

    /// An empty cache for another document, sharing the system index and the
    /// default font.
    pub fn scoped(&self) -> FontCache {
        FontCache {
            entries: RwLock::new(FxHashMap::default()),
            system: self.system.clone(),
            default: self.default.clone(),
        }
    }

    /// The default font, marked substituted.
    pub fn fallback(&self) -> FontHandle {
        FontHandle::substitute(self.default.clone())
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, descriptor: &FontDescriptor, resources: &dyn ResourceLookup) -> FontHandle {
        let name = descriptor.font_name.as_str();
        let family = descriptor.family_name.as_deref();

        if let Some(file) = descriptor.font_file.as_deref() {
            match resources.embedded_file(file) {
                Some(bytes) => match TrueTypeProgram::parse_matching(bytes, name) {
                    Ok(program) => {
                        debug!("Loaded embedded font '{}' from {}", name, file);
                        return FontHandle::exact(Arc::new(program));
                    }
                    Err(e) => info!("Embedded font {} for '{}' unusable: {}", file, name, e),
                },
                None => info!("Embedded font file {} for '{}' not found", file, name),
            }
        }

        if let Some(location) = self.system.find(family, name) {
            match load_location(location, name) {
                Ok(program) => {
                    debug!("Loaded system font '{}' from {}", name, location.path.display());
                    return FontHandle::exact(program);
                }
                Err(e) => info!("System font {} unusable: {}", location.path.display(), e),
            }
        }

        for requested in std::iter::once(name).chain(family) {
            let similar = similar_font_name(requested);
            if let Some(location) = self.system.find(None, similar) {
                if let Ok(program) = load_location(location, similar) {
                    info!("Font '{}' substituted by similar font {}", requested, similar);
                    return FontHandle::substitute(program);
                }
            }
        }

        info!("Font '{}' ({:?}) not found, using default font", name, family);
        self.fallback()
    }
}

fn load_location(location: &FontLocation, name: &str) -> RenderResult<Arc<dyn FontProgram>> {
    let data: Arc<[u8]> = std::fs::read(&location.path)?.into();
    let program = match location.index {
        Some(index) => TrueTypeProgram::parse(data, index)?,
        None => TrueTypeProgram::parse_matching(data, name)?,
    };
    Ok(Arc::new(program))
}

/// Builder for [`FontCache`].
#[derive(Default)]
pub struct FontCacheBuilder {
    default_program: Option<Arc<dyn FontProgram>>,
    default_bytes: Option<Arc<[u8]>>,
    system: Option<SystemFontIndex>,
}

impl FontCacheBuilder {
    /// Use these font bytes (face 0) as the default font.
    pub fn with_default_font_bytes(mut self, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.default_bytes = Some(bytes.into());
        self
    }

    /// Use an already parsed program as the default font.
    pub fn with_default_program(mut self, program: Arc<dyn FontProgram>) -> Self {
        self.default_program = Some(program);
        self
    }

    /// Use a prepared system font index.
    pub fn with_system_index(mut self, index: SystemFontIndex) -> Self {
        self.system = Some(index);
        self
    }

    /// Scan the host's installed fonts.
    #[cfg(feature = "system-fonts")]
    pub fn with_system_fonts(self) -> Self {
        self.with_system_index(SystemFontIndex::load_system())
    }

    /// Build the cache.
    ///
    /// # Errors
    /// `NoDefaultFont` if no default was supplied and none of the indexed
    /// system faces can be loaded; invalid default bytes are a `Font` error.
    pub fn build(self) -> RenderResult<FontCache> {
        let system = self.system.unwrap_or_default();

        let default = match (self.default_program, self.default_bytes) {
            (Some(program), _) => program,
            (None, Some(bytes)) => Arc::new(TrueTypeProgram::parse(bytes, 0)?) as Arc<dyn FontProgram>,
            (None, None) => system_default(&system)?,
        };

        Ok(FontCache {
            entries: RwLock::new(FxHashMap::default()),
            system: Arc::new(system),
            default,
        })
    }
}

fn system_default(system: &SystemFontIndex) -> RenderResult<Arc<dyn FontProgram>> {
    let candidates = DEFAULT_CANDIDATES
        .iter()
        .filter_map(|name| system.find(None, name).map(|loc| (*name, loc)))
        .chain(system.any().map(|loc| ("", loc)));

    for (name, location) in candidates {
        match load_location(location, name) {
            Ok(program) => {
                info!("Default font loaded from {}", location.path.display());
                return Ok(program);
            }
            Err(e) => debug!("Default candidate {} unusable: {}", location.path.display(), e),
        }
    }
    Err(RenderError::NoDefaultFont)
}
