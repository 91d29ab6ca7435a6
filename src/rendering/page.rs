//! Page compositing: content layers, then stamps, then annotations.

use std::sync::Arc;

use log::{debug, info};

use super::config::RenderConfig;
use super::context::{RenderContext, RenderReport};
use super::device::Device;
use super::font::FontCache;
use super::stamp::StampCompositor;
use crate::core::error::{RenderError, RenderResult};
use crate::core::matrix::Matrix;
use crate::core::model::{BlockKind, Document, Page};

/// Renders document pages onto devices.
///
/// A renderer is cheap to share: it holds the font cache and options, while
/// everything page-specific lives in a [`RenderContext`] created per call.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    fonts: Arc<FontCache>,
    config: RenderConfig,
}

impl PageRenderer {
    /// Create a renderer, validating the options.
    pub fn new(fonts: Arc<FontCache>, config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        Ok(PageRenderer { fonts, config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn fonts(&self) -> &Arc<FontCache> {
        &self.fonts
    }

    /// Page space to device space.
    pub fn root_transform(&self) -> Matrix {
        Matrix::scale(self.config.scale, self.config.scale)
    }

    /// Render page `index` of `document`.
    ///
    /// # Errors
    /// Only an out-of-range page index or another fatal error; block failures
    /// are reported in the returned [`RenderReport`].
    pub fn render_page<D: Device + ?Sized>(
        &self,
        document: &Document,
        index: usize,
        device: &mut D,
    ) -> RenderResult<RenderReport> {
        let page = document.pages.get(index).ok_or_else(|| {
            RenderError::InvalidPageTree(format!(
                "page index {} out of range ({} pages)",
                index,
                document.page_count()
            ))
        })?;
        debug!("Rendering page {} ({})", index, page.id);

        let root = self.root_transform();
        let mut ctx = RenderContext::new(device, document.resources.as_ref(), &self.fonts, &self.config);

        for layer in &page.layers {
            ctx.walk_root(&layer.blocks, layer.draw_param.as_deref(), &root)?;
        }

        for stamp in document.stamps.iter().filter(|s| s.page_ref == page.id) {
            match StampCompositor::render(&mut ctx, stamp, &root) {
                Ok(()) => ctx.report_mut().blocks_drawn += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let id = stamp.id.as_deref().and_then(|id| id.parse().ok());
                    ctx.report_mut().record(BlockKind::Stamp, id, e);
                }
            }
        }

        for annotation in document.annotations.iter().filter(|a| a.page_ref == page.id) {
            if !annotation.visible {
                continue;
            }
            let appearance = &annotation.appearance;
            let transform = match &appearance.boundary {
                Some(boundary) => boundary.origin_transform().then(&root),
                None => root,
            };
            ctx.walk_root(&appearance.blocks, appearance.draw_param.as_deref(), &transform)?;
        }

        let report = ctx.into_report();
        if !report.is_clean() {
            info!(
                "Page {} rendered with {} failed blocks",
                index,
                report.diagnostics.len()
            );
        }
        Ok(report)
    }

    /// Render several pages concurrently, one device per page.
    ///
    /// Results come back in the order of `indices`.
    #[cfg(feature = "parallel")]
    pub fn render_pages_parallel<D, F>(
        &self,
        document: &Document,
        indices: &[usize],
        make_device: F,
    ) -> Vec<RenderResult<(D, RenderReport)>>
    where
        D: Device + Send,
        F: Fn(&Page) -> D + Sync,
    {
        use rayon::prelude::*;

        indices
            .par_iter()
            .map(|&index| -> RenderResult<(D, RenderReport)> {
                let page = document.pages.get(index).ok_or_else(|| {
                    RenderError::InvalidPageTree(format!("page index {} out of range", index))
                })?;
                let mut device = make_device(page);
                let report = self.render_page(document, index, &mut device)?;
                Ok((device, report))
            })
            .collect()
    }
}

/// Device size for a page at `scale` device units per millimetre.
pub fn device_size(page: &Page, scale: f64) -> (f64, f64) {
    (page.physical_box.width * scale, page.physical_box.height * scale)
}
