pub mod error;
pub mod image;
pub mod matrix;
pub mod model;
pub mod resources;

pub use error::{RenderError, RenderResult};
pub use image::{DecodedImage, ImageDecoder, ImageFormat};
pub use matrix::Matrix;
pub use model::{
    AxialShading, Block, BlockKind, Boundary, Clip, ClipArea, ColorSpec, CompositeObject,
    Document, GlyphOverride, GraphicUnit, GroupBlock, ImageObject, Layer, MapType, Page,
    PageAnnotation, PathObject, RadialShading, Segment, Shading, StampAnnotation,
    StampAppearance, TextCode, TextObject,
};
pub use resources::{
    ColorSpace, ColorSpaceKind, CompositeGraphic, DrawParam, FontDescriptor, MediaKind,
    MediaResource, ResourceLookup, Resources,
};
