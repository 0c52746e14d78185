//! SVG export serializer.
//!
//! Converts a [`Trace`] into an SVG string: one `<path>` element per
//! root of the path tree, each carrying its whole subtree so holes and
//! nested islands render correctly under the even-odd fill rule.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use kurbo::{Affine, BezPath};

use crate::{Trace, TracedPath};

/// Serialize a trace to an SVG document.
///
/// `width` and `height` are the source raster dimensions; the y-up
/// curve coordinates are flipped into SVG's y-down viewBox.
pub fn to_svg(trace: &Trace, width: u32, height: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#,
    );

    let flip = Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, f64::from(height)]);
    for root in trace.roots() {
        let mut path = BezPath::new();
        append_subtree(root, &mut path);
        path.apply_affine(flip);
        let _ = writeln!(
            out,
            r#"  <path d="{}" fill="black" fill-rule="evenodd"/>"#,
            path.to_svg(),
        );
    }

    let _ = writeln!(out, "</svg>");
    out
}

/// Collect the curves of a path and all its descendants into one
/// BezPath, so even-odd filling carves the holes out.
fn append_subtree(node: &TracedPath, path: &mut BezPath) {
    path.extend(node.curve().to_bezpath().elements().iter().copied());
    for child in node.children() {
        append_subtree(child, path);
    }
}
