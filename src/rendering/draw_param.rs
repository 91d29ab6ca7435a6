//! DrawParam cascading.
//!
//! Layers, groups and primitives may each reference a DrawParam; a primitive
//! inherits every attribute it leaves unset from the nearest enclosing
//! reference that defines it. Each DrawParam may in turn name a `relative`
//! parent, which is consulted before moving outward.

use log::trace;

use super::graphics_state::{LineCap, LineJoin, StrokeProps, DEFAULT_LINE_WIDTH, DEFAULT_MITER_LIMIT};
use crate::core::error::{RenderError, RenderResult};
use crate::core::model::{ColorSpec, GraphicUnit};
use crate::core::resources::{DrawParam, ResourceLookup};

/// Immutable cascade of DrawParams, nearest first.
///
/// Pushing borrows the parent cascade, so a child's additions vanish when the
/// recursion returns and siblings never see each other's params.
#[derive(Debug, Clone, Copy, Default)]
pub enum ParamCascade<'a> {
    #[default]
    Root,
    Node {
        param: &'a DrawParam,
        parent: &'a ParamCascade<'a>,
    },
}

impl<'a> ParamCascade<'a> {
    /// A cascade with `param` in front of `self`.
    pub fn push(&'a self, param: &'a DrawParam) -> ParamCascade<'a> {
        ParamCascade::Node {
            param,
            parent: self,
        }
    }

    /// Iterate the cascade nearest first.
    pub fn iter(&self) -> impl Iterator<Item = &'a DrawParam> + '_ {
        let mut cursor = self;
        std::iter::from_fn(move || match cursor {
            ParamCascade::Root => None,
            ParamCascade::Node { param, parent } => {
                cursor = *parent;
                Some(*param)
            }
        })
    }

    /// Number of params in the cascade.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the cascade is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, ParamCascade::Root)
    }
}

/// Attributes a primitive may set locally.
#[derive(Debug, Clone, Default)]
pub struct LocalParams<'a> {
    pub line_width: Option<f64>,
    pub cap: Option<LineCap>,
    pub join: Option<LineJoin>,
    pub miter_limit: Option<f64>,
    pub dash_offset: Option<f64>,
    pub dash_pattern: Option<&'a [f64]>,
    pub stroke_color: Option<&'a ColorSpec>,
    pub fill_color: Option<&'a ColorSpec>,
}

impl<'a> LocalParams<'a> {
    /// Line attributes of a graphic unit, with the object's own colors.
    pub fn from_unit(
        unit: &'a GraphicUnit,
        stroke_color: Option<&'a ColorSpec>,
        fill_color: Option<&'a ColorSpec>,
    ) -> Self {
        LocalParams {
            line_width: unit.line_width,
            cap: unit.cap,
            join: unit.join,
            miter_limit: unit.miter_limit,
            dash_offset: unit.dash_offset,
            dash_pattern: unit.dash_pattern.as_deref(),
            stroke_color,
            fill_color,
        }
    }
}

/// Fully resolved parameters for one primitive.
///
/// Colors stay unresolved specs; `None` means no level of the cascade set one
/// and the call site picks its own default.
#[derive(Debug, Clone, Default)]
pub struct EffectiveParams {
    pub stroke: StrokeProps,
    pub stroke_color: Option<ColorSpec>,
    pub fill_color: Option<ColorSpec>,
}

/// Resolves [`LocalParams`] against a [`ParamCascade`].
pub struct DrawParamResolver<'a> {
    resources: &'a dyn ResourceLookup,
    max_depth: usize,
}

impl<'a> DrawParamResolver<'a> {
    /// Create a resolver; `max_depth` bounds the length of each `relative`
    /// chain. Nesting depth of the cascade itself is unbounded.
    pub fn new(resources: &'a dyn ResourceLookup, max_depth: usize) -> Self {
        DrawParamResolver {
            resources,
            max_depth,
        }
    }

    /// Resolve every attribute independently: local value, then the cascade
    /// nearest first, then the hard default.
    pub fn resolve(&self, local: &LocalParams<'_>, cascade: &ParamCascade<'_>) -> RenderResult<EffectiveParams> {
        let line_width = match local.line_width {
            Some(v) => v,
            None => self.lookup(cascade, |p| p.line_width)?.unwrap_or(DEFAULT_LINE_WIDTH),
        };
        let line_cap = match local.cap {
            Some(v) => v,
            None => self.lookup(cascade, |p| p.cap)?.unwrap_or_default(),
        };
        let line_join = match local.join {
            Some(v) => v,
            None => self.lookup(cascade, |p| p.join)?.unwrap_or_default(),
        };
        let miter_limit = match local.miter_limit {
            Some(v) => v,
            None => self.lookup(cascade, |p| p.miter_limit)?.unwrap_or(DEFAULT_MITER_LIMIT),
        };
        let dash_offset = match local.dash_offset {
            Some(v) => v,
            None => self.lookup(cascade, |p| p.dash_offset)?.unwrap_or(0.0),
        };
        let dash_array = match local.dash_pattern {
            Some(v) => v.to_vec(),
            None => self
                .lookup(cascade, |p| p.dash_pattern.clone())?
                .unwrap_or_default(),
        };
        let stroke_color = match local.stroke_color {
            Some(c) => Some(c.clone()),
            None => self.lookup(cascade, |p| p.stroke_color.clone())?,
        };
        let fill_color = match local.fill_color {
            Some(c) => Some(c.clone()),
            None => self.lookup(cascade, |p| p.fill_color.clone())?,
        };

        Ok(EffectiveParams {
            stroke: StrokeProps {
                line_width,
                line_cap,
                line_join,
                miter_limit,
                dash_array,
                dash_offset,
            },
            stroke_color,
            fill_color,
        })
    }

    /// Find the first DrawParam in the cascade, following `relative` chains,
    /// that defines an attribute.
    ///
    /// # Errors
    /// `CascadeTooDeep` when one entry's `relative` chain is longer than the
    /// configured bound, which is how reference cycles surface.
    pub fn lookup<T>(
        &self,
        cascade: &ParamCascade<'_>,
        get: impl Fn(&DrawParam) -> Option<T>,
    ) -> RenderResult<Option<T>> {
        for entry in cascade.iter() {
            let mut visited = 0;
            let mut current = Some(entry);
            while let Some(param) = current {
                visited += 1;
                if visited > self.max_depth {
                    return Err(RenderError::CascadeTooDeep(self.max_depth));
                }
                if let Some(value) = get(param) {
                    return Ok(Some(value));
                }
                current = param.relative.as_deref().and_then(|id| {
                    let parent = self.resources.draw_param(id);
                    if parent.is_none() {
                        trace!("DrawParam {} names unknown relative {}", param.id, id);
                    }
                    parent
                });
            }
        }
        Ok(None)
    }
}
