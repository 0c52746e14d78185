//! Tracing pipeline: bitmap -> contours -> nesting tree -> curves.
//!
//! 1. Contour extraction with turn-policy disambiguation (decompose)
//! 2. Nesting resolution by xor-fill insideness tests (tree)
//! 3. Per-path analysis, parallel across paths (polygon, curve, optimize)

pub mod curve;

pub(crate) mod decompose;
pub(crate) mod polygon;
pub(crate) mod tree;

mod optimize;

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::bitmap::Bitmap;
use crate::config::TraceParams;
use crate::error::TraceError;
use crate::progress::{Monitor, ProgressStage};
use crate::{Trace, TracedPath};

use curve::Curve;
use decompose::WorkPath;
use tree::TreeNode;

pub(crate) use curve::smooth;

/// Run the full pipeline.
///
/// The input bitmap is never mutated: all pixel work happens on a
/// disposable clone, which the nesting resolver afterwards reuses as its
/// scratch. Per-path analysis runs in parallel with one path per work
/// item; the only shared state is the progress counter.
pub(crate) fn trace(
    bitmap: &Bitmap,
    params: &TraceParams,
    monitor: &Monitor<'_>,
) -> Result<Trace, TraceError> {
    params.validate()?;

    let mut work = bitmap.clone();
    work.clear_excess();

    let paths = decompose::decompose(&mut work, bitmap, params, monitor)?;
    if paths.is_empty() {
        return Ok(Trace::default());
    }
    let forest = tree::resolve(&paths, &mut work, monitor)?;
    drop(work);

    let total = paths.len();
    let done = AtomicUsize::new(0);
    let curves = paths
        .par_iter()
        .map(|path| {
            let curve = analyze_path(path, params, monitor)?;
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            monitor.report(ProgressStage::Tracing, finished as f64 / total as f64);
            Ok(curve)
        })
        .collect::<Result<Vec<_>, TraceError>>()?;

    let mut paths: Vec<Option<WorkPath>> = paths.into_iter().map(Some).collect();
    let mut curves: Vec<Option<Curve>> = curves.into_iter().map(Some).collect();
    let roots = forest
        .into_iter()
        .map(|node| assemble(node, &mut paths, &mut curves))
        .collect();
    Ok(Trace { roots })
}

/// The five analysis stages for one path, with a cancellation
/// checkpoint between each.
fn analyze_path(
    path: &WorkPath,
    params: &TraceParams,
    monitor: &Monitor<'_>,
) -> Result<Curve, TraceError> {
    monitor.check()?;
    let sums = polygon::calc_sums(&path.points);
    monitor.check()?;
    let lon = polygon::calc_lon(&path.points);
    monitor.check()?;
    let po = polygon::best_polygon(&path.points, &lon, &sums);
    drop(lon);
    monitor.check()?;
    let vertices = polygon::adjust_vertices(&path.points, &po, &sums, path.sign);
    drop(sums);
    monitor.check()?;
    let smoothed = smooth(vertices, params.alphamax);
    monitor.check()?;
    if params.opttolerance > 0.0 {
        Ok(optimize::opticurve(&smoothed, params.opttolerance))
    } else {
        Ok(smoothed)
    }
}

/// Move a path and its curve out of the flat stores into an owned node.
fn assemble(
    node: TreeNode,
    paths: &mut [Option<WorkPath>],
    curves: &mut [Option<Curve>],
) -> TracedPath {
    let path = paths[node.path].take().expect("each path is assembled once");
    let curve = curves[node.path].take().expect("each curve is assembled once");
    TracedPath {
        points: path.points,
        area: path.area,
        sign: path.sign,
        curve,
        children: node
            .children
            .into_iter()
            .map(|child| assemble(child, paths, curves))
            .collect(),
    }
}
