//! Path geometry and the abbreviated path grammar.
//!
//! Paths are stored in the object's own coordinate space and handed to the
//! device together with a transform. The abbreviated grammar is a whitespace
//! separated token stream:
//!
//! ```text
//! S x y | M x y        move
//! L x y                line
//! Q x1 y1 x y          quadratic Bézier
//! B x1 y1 x2 y2 x y    cubic Bézier
//! C                    close
//! A rx ry rot large sweep x y   arc, recognized and ignored
//! ```

use std::fmt;

use log::{debug, trace};
use smallvec::SmallVec;

use crate::core::matrix::Matrix;

/// A path element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathElement {
    /// Move to a new point (starts a new subpath)
    MoveTo(f64, f64),
    /// Line to a point
    LineTo(f64, f64),
    /// Quadratic Bézier curve (cpx, cpy, x, y)
    QuadTo(f64, f64, f64, f64),
    /// Cubic Bézier curve (cp1x, cp1y, cp2x, cp2y, x, y)
    CurveTo(f64, f64, f64, f64, f64, f64),
    /// Close the current subpath
    ClosePath,
}

impl PathElement {
    fn map_points(&self, m: &Matrix) -> PathElement {
        let p = |x: f64, y: f64| m.transform_point(x, y);
        match *self {
            PathElement::MoveTo(x, y) => {
                let (x, y) = p(x, y);
                PathElement::MoveTo(x, y)
            }
            PathElement::LineTo(x, y) => {
                let (x, y) = p(x, y);
                PathElement::LineTo(x, y)
            }
            PathElement::QuadTo(cx, cy, x, y) => {
                let (cx, cy) = p(cx, cy);
                let (x, y) = p(x, y);
                PathElement::QuadTo(cx, cy, x, y)
            }
            PathElement::CurveTo(c1x, c1y, c2x, c2y, x, y) => {
                let (c1x, c1y) = p(c1x, c1y);
                let (c2x, c2y) = p(c2x, c2y);
                let (x, y) = p(x, y);
                PathElement::CurveTo(c1x, c1y, c2x, c2y, x, y)
            }
            PathElement::ClosePath => PathElement::ClosePath,
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::MoveTo(x, y) => write!(f, "M {} {}", x, y),
            PathElement::LineTo(x, y) => write!(f, "L {} {}", x, y),
            PathElement::QuadTo(cx, cy, x, y) => write!(f, "Q {} {} {} {}", cx, cy, x, y),
            PathElement::CurveTo(cp1x, cp1y, cp2x, cp2y, x, y) => {
                write!(f, "B {} {} {} {} {} {}", cp1x, cp1y, cp2x, cp2y, x, y)
            }
            PathElement::ClosePath => write!(f, "C"),
        }
    }
}

/// A path for rendering.
///
/// Paths are composed of a sequence of path elements (move, line, quad, curve, close).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    /// The path elements
    elements: Vec<PathElement>,

    /// Current point (if any)
    current_point: Option<(f64, f64)>,

    /// Start of the current subpath (for close operations)
    subpath_start: Option<(f64, f64)>,

    /// Whether a subpath has been started and not yet closed
    has_open_subpath: bool,
}

impl Path {
    /// Create a new empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// A closed rectangle.
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        let mut path = Path::new();
        path.rect(x, y, width, height);
        path
    }

    /// Move to a new point, starting a new subpath.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.elements.push(PathElement::MoveTo(x, y));
        self.current_point = Some((x, y));
        self.subpath_start = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Segments drawn before any move start at the origin.
    fn ensure_current_point(&mut self) {
        if self.current_point.is_none() {
            self.move_to(0.0, 0.0);
        }
    }

    /// Add a line segment from the current point to (x, y).
    pub fn line_to(&mut self, x: f64, y: f64) {
        self.ensure_current_point();
        self.elements.push(PathElement::LineTo(x, y));
        self.current_point = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Add a quadratic Bézier curve.
    pub fn quad_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.ensure_current_point();
        self.elements.push(PathElement::QuadTo(cpx, cpy, x, y));
        self.current_point = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Add a cubic Bézier curve.
    ///
    /// # Arguments
    /// * `cp1x, cp1y` - First control point
    /// * `cp2x, cp2y` - Second control point
    /// * `x, y` - End point
    pub fn curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.ensure_current_point();
        self.elements
            .push(PathElement::CurveTo(cp1x, cp1y, cp2x, cp2y, x, y));
        self.current_point = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Add a closed rectangle to the path.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    /// Close the current subpath.
    ///
    /// This adds a line from the current point back to the start of the subpath.
    /// A subpath holding only its move is closed too; closing twice is a no-op.
    pub fn close_path(&mut self) {
        if self.has_open_subpath {
            self.elements.push(PathElement::ClosePath);
            if let Some(start) = self.subpath_start {
                self.current_point = Some(start);
            }
            self.has_open_subpath = false;
        }
    }

    /// Append every element of `other`, as used for clip area unions.
    pub fn append(&mut self, other: &Path) {
        self.elements.extend_from_slice(&other.elements);
        self.current_point = other.current_point;
        self.subpath_start = other.subpath_start;
        self.has_open_subpath = other.has_open_subpath;
    }

    /// A copy with every point mapped through `m`.
    pub fn transform(&self, m: &Matrix) -> Path {
        let map = |p: Option<(f64, f64)>| p.map(|(x, y)| m.transform_point(x, y));
        Path {
            elements: self.elements.iter().map(|el| el.map_points(m)).collect(),
            current_point: map(self.current_point),
            subpath_start: map(self.subpath_start),
            has_open_subpath: self.has_open_subpath,
        }
    }

    /// Get the current point.
    pub fn current_point(&self) -> Option<(f64, f64)> {
        self.current_point
    }

    /// Get the path elements.
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get the number of elements in the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Rough bounding box `(min_x, min_y, max_x, max_y)` over all points,
    /// control points included.
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.elements.iter().flat_map(|el| -> SmallVec<[(f64, f64); 3]> {
            match *el {
                PathElement::MoveTo(x, y) | PathElement::LineTo(x, y) => smallvec::smallvec![(x, y)],
                PathElement::QuadTo(cx, cy, x, y) => smallvec::smallvec![(cx, cy), (x, y)],
                PathElement::CurveTo(c1x, c1y, c2x, c2y, x, y) => {
                    smallvec::smallvec![(c1x, c1y), (c2x, c2y), (x, y)]
                }
                PathElement::ClosePath => SmallVec::new(),
            }
        });

        let (x0, y0) = points.next()?;
        Some(points.fold((x0, y0, x0, y0), |(min_x, min_y, max_x, max_y), (x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        }))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, el) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", el)?;
        }
        Ok(())
    }
}

/// Operators of the abbreviated grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathOp {
    Move,
    Line,
    Quad,
    Cubic,
    Close,
    Arc,
}

impl PathOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "S" | "M" => Some(PathOp::Move),
            "L" => Some(PathOp::Line),
            "Q" => Some(PathOp::Quad),
            "B" => Some(PathOp::Cubic),
            "C" => Some(PathOp::Close),
            "A" => Some(PathOp::Arc),
            _ => None,
        }
    }

    fn arity(self) -> usize {
        match self {
            PathOp::Move | PathOp::Line => 2,
            PathOp::Quad => 4,
            PathOp::Cubic => 6,
            PathOp::Close => 0,
            PathOp::Arc => 7,
        }
    }
}

/// Parse operand tokens, zero-filling up to `arity`.
///
/// Returns `None` if any token is not a finite number.
fn parse_operands(tokens: &[&str], arity: usize) -> Option<SmallVec<[f64; 8]>> {
    let mut values: SmallVec<[f64; 8]> = SmallVec::with_capacity(arity);
    for token in tokens {
        let value: f64 = token.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        values.push(value);
    }
    values.resize(arity, 0.0);
    Some(values)
}

/// Decode abbreviated path data into a [`Path`].
///
/// Never fails: unknown tokens and stray operands are skipped, a command whose
/// operands are not numbers is dropped, and a command with too few operands
/// is zero-filled. An empty result means there is nothing to draw.
pub fn decode_abbreviated(data: &str) -> Path {
    let mut path = Path::new();
    let mut tokens = data.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        let Some(op) = PathOp::from_token(token) else {
            trace!("Skipping stray path token '{}'", token);
            continue;
        };

        let mut operands: SmallVec<[&str; 8]> = SmallVec::new();
        while operands.len() < op.arity() {
            match tokens.peek() {
                Some(next) if PathOp::from_token(next).is_none() => {
                    operands.push(*next);
                    tokens.next();
                }
                _ => break,
            }
        }

        let Some(v) = parse_operands(&operands, op.arity()) else {
            debug!("Dropping malformed path command {} {:?}", token, operands);
            continue;
        };

        match op {
            PathOp::Move => path.move_to(v[0], v[1]),
            PathOp::Line => path.line_to(v[0], v[1]),
            PathOp::Quad => path.quad_to(v[0], v[1], v[2], v[3]),
            PathOp::Cubic => path.curve_to(v[0], v[1], v[2], v[3], v[4], v[5]),
            PathOp::Close => path.close_path(),
            PathOp::Arc => trace!("Ignoring arc command"),
        }
    }

    path
}
