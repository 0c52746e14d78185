//! Nesting resolver: arrange the flat contour list into a tree.
//!
//! Contours are discovered in raster order, so an outer contour always
//! precedes everything nested inside it. For each group head, its
//! interior is XOR-filled into a scratch bitmap; a later path is a child
//! exactly when the pixel just below its point 0 lands inside that fill.
//! Because point 0 is each contour's upper-left corner, this single
//! probe decides insideness.

use std::collections::VecDeque;

use crate::bitmap::{BBox, Bitmap};
use crate::error::TraceError;
use crate::progress::Monitor;

use super::decompose::{xor_path, WorkPath};

/// Tree of indices into the flat path list.
#[derive(Debug)]
pub(crate) struct TreeNode {
    pub path: usize,
    pub children: Vec<TreeNode>,
}

/// Build the nesting forest for `paths` (in discovery order), using
/// `scratch` as working storage. The scratch contents are destroyed.
pub(crate) fn resolve(
    paths: &[WorkPath],
    scratch: &mut Bitmap,
    monitor: &Monitor<'_>,
) -> Result<Vec<TreeNode>, TraceError> {
    scratch.clear_all();
    let list: VecDeque<usize> = (0..paths.len()).collect();
    build_group(paths, list, scratch, monitor)
}

/// Process one group of paths known to share a parent (or be roots).
///
/// The head of the list is rendered into the scratch; the remaining
/// paths are partitioned into those inside it (its children, resolved
/// recursively) and its later siblings. A path whose top row is at or
/// below the head's bounding box can no longer be inside it, and
/// neither can anything after it, so the partition short-circuits
/// there. The scratch is cleaned with the head's bounding box only.
fn build_group(
    paths: &[WorkPath],
    mut list: VecDeque<usize>,
    scratch: &mut Bitmap,
    monitor: &Monitor<'_>,
) -> Result<Vec<TreeNode>, TraceError> {
    let mut group = Vec::new();

    while let Some(head) = list.pop_front() {
        monitor.check()?;
        xor_path(scratch, &paths[head].points);
        let bbox = BBox::of_points(&paths[head].points);

        let mut inner = VecDeque::new();
        let mut outer = VecDeque::new();
        let mut past_bbox = false;
        while let Some(p) = list.pop_front() {
            monitor.check()?;
            let (x0, y0) = paths[p].points[0];
            if past_bbox || y0 <= bbox.y0 {
                past_bbox = true;
                outer.push_back(p);
            } else if scratch.get(x0, y0 - 1) {
                inner.push_back(p);
            } else {
                outer.push_back(p);
            }
        }

        scratch.clear_region(&bbox);

        let children = build_group(paths, inner, scratch, monitor)?;
        group.push(TreeNode {
            path: head,
            children,
        });
        list = outer;
    }

    Ok(group)
}
