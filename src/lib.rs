//! bit2bez: binary bitmap → vector outlines.
//!
//! Traces a bit-packed binary raster into a tree of closed curves, each
//! built from straight corners and cubic Beziers, following Selinger's
//! polygon-based tracing algorithm: contour extraction with configurable
//! diagonal disambiguation, optimal polygon approximation by dynamic
//! programming, sub-pixel vertex refinement, corner-aware smoothing, and
//! an optional curve-merging pass.
//!
//! # Example
//!
//! ```no_run
//! use bit2bez::{trace, Bitmap, TraceParams};
//!
//! let mut bitmap = Bitmap::new(64, 64)?;
//! for y in 16..48 {
//!     for x in 16..48 {
//!         bitmap.set(x, y);
//!     }
//! }
//! let result = trace(&bitmap, &TraceParams::default())?;
//! for path in result.iter() {
//!     println!("{} segments", path.curve().segments().len());
//! }
//! # Ok::<(), bit2bez::TraceError>(())
//! ```

#![forbid(unsafe_code)]

mod bitmap;
mod config;
mod geom;
mod progress;
mod vectorize;

pub mod error;
pub mod svg;

// Re-export kurbo so downstream users get the same version used by
// Segment and Curve coordinates.
pub use kurbo;

pub use bitmap::Bitmap;
pub use config::{TraceParams, TurnPolicy};
pub use error::TraceError;
pub use progress::{CancelToken, Monitor, ProgressSink, ProgressStage};
pub use vectorize::curve::{Curve, Segment};

/// One node of the traced path tree.
///
/// Owns the raw contour it was traced from, its final curve, and every
/// path nested directly inside it. The final curve is the optimized one
/// when the optimization stage ran, the smoothed one otherwise.
#[derive(Debug, Clone)]
pub struct TracedPath {
    pub(crate) points: Vec<(i32, i32)>,
    pub(crate) area: i64,
    pub(crate) sign: bool,
    pub(crate) curve: Curve,
    pub(crate) children: Vec<TracedPath>,
}

impl TracedPath {
    /// The raw closed contour on the pixel-corner grid.
    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    /// Signed enclosed area: positive for foreground contours, negative
    /// for holes.
    pub fn area(&self) -> i64 {
        self.area
    }

    /// `true` if this contour encloses foreground pixels.
    pub fn sign(&self) -> bool {
        self.sign
    }

    /// The final curve.
    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    /// Paths nested directly inside this one.
    pub fn children(&self) -> &[TracedPath] {
        &self.children
    }
}

/// The result of tracing: the roots of the nesting tree.
///
/// An empty trace (no foreground after despeckling) is a valid result,
/// not an error.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub(crate) roots: Vec<TracedPath>,
}

impl Trace {
    /// Top-level paths, in raster discovery order.
    pub fn roots(&self) -> &[TracedPath] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first traversal over all paths, children before later
    /// siblings.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.roots.iter().rev().collect(),
        }
    }
}

/// Depth-first iterator over a path tree.
pub struct Iter<'a> {
    stack: Vec<&'a TracedPath>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TracedPath;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Trace a bitmap with the given parameters.
///
/// Returns an empty [`Trace`] when the raster has no foreground left
/// after despeckling.
pub fn trace(bitmap: &Bitmap, params: &TraceParams) -> Result<Trace, TraceError> {
    trace_with(bitmap, params, &Monitor::new())
}

/// Trace a bitmap, reporting progress and honoring cancellation through
/// the given monitor.
pub fn trace_with(
    bitmap: &Bitmap,
    params: &TraceParams,
    monitor: &Monitor<'_>,
) -> Result<Trace, TraceError> {
    vectorize::trace(bitmap, params, monitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_params_fail_before_tracing() {
        let bitmap = Bitmap::new(8, 8).unwrap();
        let params = TraceParams {
            alphamax: 2.0,
            ..TraceParams::default()
        };
        assert!(matches!(
            trace(&bitmap, &params),
            Err(TraceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn iter_walks_children_before_later_siblings() {
        // Frame with a hole next to a separate square: the hole is
        // visited between its parent and the sibling.
        let mut bitmap = Bitmap::new(64, 32).unwrap();
        for y in 8..24 {
            for x in 8..24 {
                if !(10..22).contains(&x) || !(10..22).contains(&y) {
                    bitmap.set(x, y);
                }
            }
            for x in 40..56 {
                bitmap.set(x, y);
            }
        }
        let result = trace(&bitmap, &TraceParams::default()).unwrap();
        assert_eq!(result.roots().len(), 2);
        let signs: Vec<bool> = result.iter().map(TracedPath::sign).collect();
        assert_eq!(signs, vec![true, false, true]);
    }
}
