use thiserror::Error;

/// Universal error type for rendering operations.
///
/// Most variants are block-scoped: the content walker catches them, records a
/// diagnostic and continues with the next sibling. Only `NoDefaultFont` and
/// `InvalidPageTree` are meant to escape a page render.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Reading a font or asset from disk failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A resource id could not be resolved
    #[error("Unresolved {kind} resource '{id}'")]
    MissingResource { kind: &'static str, id: String },

    /// Palette index outside the palette of a resolved color space
    #[error("Palette index {index} out of range (palette has {len} entries)")]
    PaletteIndex { index: usize, len: usize },

    /// DrawParam chain longer than the configured bound (usually a cycle)
    #[error("DrawParam cascade exceeds depth {0}")]
    CascadeTooDeep(usize),

    /// Composite graphics nested deeper than the configured bound
    #[error("Composite nesting exceeds depth {0}")]
    CompositeTooDeep(usize),

    /// Boundary with non-finite or degenerate geometry where one is required
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    /// Font program could not be parsed
    #[error("Font error: {0}")]
    Font(String),

    /// No default font is available; text cannot be rendered at all
    #[error("No usable default font")]
    NoDefaultFont,

    /// Image bytes could not be decoded
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Unsupported feature or format
    #[error("Unsupported: {feature}")]
    Unsupported { feature: String },

    /// The page tree handed in by the caller cannot be rendered
    #[error("Invalid page tree: {0}")]
    InvalidPageTree(String),

    /// The drawing surface rejected an operation
    #[error("Device error: {0}")]
    Device(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RenderError {
    /// Create a missing-resource error.
    pub fn missing(kind: &'static str, id: impl Into<String>) -> Self {
        RenderError::MissingResource {
            kind,
            id: id.into(),
        }
    }

    /// Whether this error must abort the whole page instead of a single block.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::NoDefaultFont | RenderError::InvalidPageTree(_)
        )
    }
}

/// Result type alias for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = RenderError::missing("font", "F3");
        assert_eq!(err.to_string(), "Unresolved font resource 'F3'");

        let err = RenderError::PaletteIndex { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "Palette index 4 out of range (palette has 2 entries)"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(RenderError::NoDefaultFont.is_fatal());
        assert!(RenderError::InvalidPageTree("no pages".into()).is_fatal());
        assert!(!RenderError::CascadeTooDeep(16).is_fatal());
        assert!(!RenderError::ImageDecode("bad".into()).is_fatal());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RenderError = io.into();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
