//! Rendering options.

use crate::core::error::{RenderError, RenderResult};

/// Options shared by every page rendered with one renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Device units per document unit (millimetres). Defaults to `1.0`.
    pub scale: f64,
    /// Make near-white pixels of raster stamps transparent before compositing.
    pub clear_stamp_background: bool,
    /// Pixels whose gray level is at least this value count as background.
    /// Defaults to `255` (only pure white).
    pub stamp_background_gray: u16,
    /// Opacity of the multiply layer stamps are drawn into. Defaults to `1.0`.
    pub stamp_opacity: f64,
    /// Outline every primitive's boundary in red.
    pub draw_boundary: bool,
    /// Clip path and image primitives to their boundary. Defaults to `true`.
    pub clip_to_boundary: bool,
    /// Longest `relative` chain followed from one DrawParam.
    pub max_cascade_depth: usize,
    /// Nesting limit for composite graphics.
    pub max_composite_depth: usize,
    /// Decoded images kept per page renderer.
    pub image_cache_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            clear_stamp_background: true,
            stamp_background_gray: 255,
            stamp_opacity: 1.0,
            draw_boundary: false,
            clip_to_boundary: true,
            max_cascade_depth: 16,
            max_composite_depth: 32,
            image_cache_capacity: 64,
        }
    }
}

impl RenderConfig {
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_stamp_background(mut self, clear: bool, gray: u16) -> Self {
        self.clear_stamp_background = clear;
        self.stamp_background_gray = gray;
        self
    }

    /// Stamp layer opacity, clamped to [0, 1].
    pub fn with_stamp_opacity(mut self, opacity: f64) -> Self {
        self.stamp_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_draw_boundary(mut self, draw: bool) -> Self {
        self.draw_boundary = draw;
        self
    }

    pub fn with_clip_to_boundary(mut self, clip: bool) -> Self {
        self.clip_to_boundary = clip;
        self
    }

    pub fn with_max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    pub fn with_max_composite_depth(mut self, depth: usize) -> Self {
        self.max_composite_depth = depth;
        self
    }

    pub fn with_image_cache_capacity(mut self, capacity: usize) -> Self {
        self.image_cache_capacity = capacity;
        self
    }

    /// Check that the options are usable.
    pub fn validate(&self) -> RenderResult<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(RenderError::Config(format!("scale must be positive, got {}", self.scale)));
        }
        if self.stamp_background_gray > 255 {
            return Err(RenderError::Config(format!(
                "stamp background gray must be in 0..=255, got {}",
                self.stamp_background_gray
            )));
        }
        if !(0.0..=1.0).contains(&self.stamp_opacity) {
            return Err(RenderError::Config(format!(
                "stamp opacity must be in [0, 1], got {}",
                self.stamp_opacity
            )));
        }
        if self.max_cascade_depth == 0 || self.max_composite_depth == 0 {
            return Err(RenderError::Config("depth limits must be non-zero".into()));
        }
        if self.image_cache_capacity == 0 {
            return Err(RenderError::Config("image cache capacity must be non-zero".into()));
        }
        Ok(())
    }
}
