//! Rendering core for OFD fixed-layout documents.
//!
//! The caller supplies a parsed page tree ([`core::model`]) and a resource
//! table; [`rendering::PageRenderer`] walks it and emits primitive calls on a
//! [`rendering::Device`].

pub mod core;
pub mod rendering;

// Re-export main types for convenience
pub use self::core::{Boundary, Document, Matrix, RenderError, RenderResult, Resources};
pub use rendering::{
    Device, FontCache, PageRenderer, RecordingDevice, RenderConfig, RenderReport,
};

#[cfg(feature = "rendering")]
pub use rendering::SkiaDevice;
