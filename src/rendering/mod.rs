//! Rendering layer.
//!
//! Interprets a page tree and drives a [`Device`]:
//! - Path decoding and DrawParam cascading
//! - Color, gradient and font resolution
//! - Text placement with glyph overrides
//! - Stamp compositing and page ordering

pub mod color;
pub mod config;
pub mod context;
pub mod device;
pub mod draw_param;
pub mod font;
pub mod graphics_state;
pub mod page;
pub mod path;
pub mod stamp;
pub mod system_fonts;
pub mod text;

// Re-export key types
pub use color::ColorResolver;
pub use config::RenderConfig;
pub use context::{Diagnostic, RenderContext, RenderReport};
pub use device::{
    AxialGradient, ClipRegion, Device, DrawCall, Glyph, GlyphStyle, GradientStop, Paint,
    RadialGradient, RecordingDevice, SpreadMode,
};
pub use draw_param::{DrawParamResolver, EffectiveParams, LocalParams, ParamCascade};
pub use font::{FontCache, FontCacheBuilder, FontHandle, FontProgram, TrueTypeProgram};
pub use graphics_state::{BlendMode, Color, FillRule, LineCap, LineJoin, StrokeProps};
pub use page::{PageRenderer, device_size};
pub use path::{Path, PathElement, decode_abbreviated};
pub use stamp::{StampCompositor, clear_background};
pub use system_fonts::{FontLocation, SystemFontIndex, similar_font_name};
pub use text::{PlacedGlyph, TextShaper, parse_delta};

#[cfg(feature = "rendering")]
pub mod skia_device;

#[cfg(feature = "rendering")]
pub use skia_device::SkiaDevice;
