use super::tree::{NodeId, Rect, Row, TreeMapTree};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Target aspect ratio of squarify rows.
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutAlgorithm {
    #[default]
    Squarify,
    BinaryTree,
    Slice,
    Dice,
    SliceDice,
}

impl LayoutAlgorithm {
    /// Lays out the children of `parent` inside its bounds.
    pub fn apply(self, tree: &mut TreeMapTree, parent: NodeId) {
        match self {
            LayoutAlgorithm::Squarify => squarify(tree, parent),
            LayoutAlgorithm::BinaryTree => binary_tree(tree, parent),
            LayoutAlgorithm::Slice => slice(tree, parent),
            LayoutAlgorithm::Dice => dice(tree, parent),
            LayoutAlgorithm::SliceDice => slice_dice(tree, parent),
        }
    }
}

impl FromStr for LayoutAlgorithm {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "squarify" => Ok(LayoutAlgorithm::Squarify),
            "binaryTree" => Ok(LayoutAlgorithm::BinaryTree),
            "slice" => Ok(LayoutAlgorithm::Slice),
            "dice" => Ok(LayoutAlgorithm::Dice),
            "sliceDice" => Ok(LayoutAlgorithm::SliceDice),
            other => Err(eyre!("unknown layout algorithm '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sorting {
    None,
    Ascending,
    #[default]
    Descending,
}

impl FromStr for Sorting {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Sorting::None),
            "ascending" => Ok(Sorting::Ascending),
            "descending" => Ok(Sorting::Descending),
            other => Err(eyre!("unknown sorting '{other}'")),
        }
    }
}

fn value_of(tree: &TreeMapTree, id: NodeId) -> f64 {
    tree.node(id).value()
}

/// Vertical strips, left to right, widths proportional to value.
fn dice_range(tree: &mut TreeMapTree, ids: &[NodeId], rect: Rect, value: f64) {
    let k = if value != 0.0 { rect.width() / value } else { 0.0 };
    let mut x = rect.x0;
    for &id in ids {
        let w = value_of(tree, id) * k;
        tree.node_mut(id).bounds = Rect::new(x, rect.y0, x + w, rect.y1);
        x += w;
    }
}

/// Horizontal strips, top to bottom, heights proportional to value.
fn slice_range(tree: &mut TreeMapTree, ids: &[NodeId], rect: Rect, value: f64) {
    let k = if value != 0.0 { rect.height() / value } else { 0.0 };
    let mut y = rect.y0;
    for &id in ids {
        let h = value_of(tree, id) * k;
        tree.node_mut(id).bounds = Rect::new(rect.x0, y, rect.x1, y + h);
        y += h;
    }
}

pub fn dice(tree: &mut TreeMapTree, parent: NodeId) {
    let ids = tree.children(parent).to_vec();
    let node = tree.node(parent);
    let (rect, value) = (node.bounds, node.value());
    dice_range(tree, &ids, rect, value);
}

pub fn slice(tree: &mut TreeMapTree, parent: NodeId) {
    let ids = tree.children(parent).to_vec();
    let node = tree.node(parent);
    let (rect, value) = (node.bounds, node.value());
    slice_range(tree, &ids, rect, value);
}

/// `slice` on odd levels, `dice` on even ones.
pub fn slice_dice(tree: &mut TreeMapTree, parent: NodeId) {
    if tree.node(parent).level() % 2 == 1 {
        slice(tree, parent)
    } else {
        dice(tree, parent)
    }
}

/// Recursive bisection of the children at the value midpoint, cutting the
/// longer side each time.
pub fn binary_tree(tree: &mut TreeMapTree, parent: NodeId) {
    let ids = tree.children(parent).to_vec();
    if ids.is_empty() {
        return;
    }
    let mut sums = Vec::with_capacity(ids.len() + 1);
    sums.push(0.0);
    for &id in &ids {
        let last = sums[sums.len() - 1];
        sums.push(last + value_of(tree, id));
    }
    let node = tree.node(parent);
    let (rect, value) = (node.bounds, node.value());
    partition(tree, &ids, &sums, 0, ids.len(), value, rect);
}

fn partition(tree: &mut TreeMapTree, ids: &[NodeId], sums: &[f64], i: usize, j: usize, value: f64, rect: Rect) {
    if i + 1 >= j {
        tree.node_mut(ids[i]).bounds = rect;
        return;
    }
    if value == 0.0 {
        for &id in &ids[i..j] {
            tree.node_mut(id).bounds = Rect::point(rect.x0, rect.y0);
        }
        return;
    }

    let value_offset = sums[i];
    let value_target = value / 2.0 + value_offset;
    let mut k = i + 1;
    let mut hi = j - 1;
    while k < hi {
        let mid = (k + hi) / 2;
        if sums[mid] < value_target {
            k = mid + 1;
        } else {
            hi = mid;
        }
    }
    if value_target - sums[k - 1] <= sums[k] - value_target && i + 1 < k {
        k -= 1;
    }

    let value_left = sums[k] - value_offset;
    let value_right = value - value_left;
    let Rect { x0, y0, x1, y1 } = rect;

    if rect.width() > rect.height() {
        let xk = (x0 * value_right + x1 * value_left) / value;
        partition(tree, ids, sums, i, k, value_left, Rect::new(x0, y0, xk, y1));
        partition(tree, ids, sums, k, j, value_right, Rect::new(xk, y0, x1, y1));
    } else {
        let yk = (y0 * value_right + y1 * value_left) / value;
        partition(tree, ids, sums, i, k, value_left, Rect::new(x0, y0, x1, yk));
        partition(tree, ids, sums, k, j, value_right, Rect::new(x0, yk, x1, y1));
    }
}

/// Greedy rows whose aspect ratios approach [`GOLDEN_RATIO`]. The rows are
/// kept on the parent.
pub fn squarify(tree: &mut TreeMapTree, parent: NodeId) {
    let ids = tree.children(parent).to_vec();
    let node = tree.node(parent);
    let bounds = node.bounds;
    let mut value = node.value();

    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        tree.node_mut(parent).rows.clear();
        if bounds.width() <= 0.0 {
            slice_range(tree, &ids, bounds, value);
        } else {
            dice_range(tree, &ids, bounds, value);
        }
        return;
    }

    let Rect { mut x0, mut y0, x1, y1 } = bounds;
    let n = ids.len();
    let mut rows = Vec::new();
    let mut i0 = 0;
    let mut i1 = 0;

    while i1 < n {
        let dx = x1 - x0;
        let dy = y1 - y0;

        // Leading zero values join the row without affecting its ratio.
        let mut sum_value;
        loop {
            sum_value = value_of(tree, ids[i1]);
            i1 += 1;
            if sum_value != 0.0 || i1 >= n {
                break;
            }
        }
        let mut min_value = sum_value;
        let mut max_value = sum_value;
        let alpha = (dy / dx).max(dx / dy) / (value * GOLDEN_RATIO);
        let mut beta = sum_value * sum_value * alpha;
        let mut min_ratio = (max_value / beta).max(beta / min_value);

        while i1 < n {
            let node_value = value_of(tree, ids[i1]);
            sum_value += node_value;
            min_value = min_value.min(node_value);
            max_value = max_value.max(node_value);
            beta = sum_value * sum_value * alpha;
            let new_ratio = (max_value / beta).max(beta / min_value);
            if new_ratio > min_ratio {
                sum_value -= node_value;
                break;
            }
            min_ratio = new_ratio;
            i1 += 1;
        }

        let row_ids = &ids[i0..i1];
        let dice_row = dx < dy;
        let row_bounds = if dice_row {
            let y = if value != 0.0 { y0 + dy * sum_value / value } else { y1 };
            let rect = Rect::new(x0, y0, x1, y);
            dice_range(tree, row_ids, rect, sum_value);
            y0 = y;
            rect
        } else {
            let x = if value != 0.0 { x0 + dx * sum_value / value } else { x1 };
            let rect = Rect::new(x0, y0, x, y1);
            slice_range(tree, row_ids, rect, sum_value);
            x0 = x;
            rect
        };

        rows.push(Row {
            value: sum_value,
            dice: dice_row,
            children: i0..i1,
            bounds: row_bounds,
        });
        value -= sum_value;
        i0 = i1;
    }

    tree.node_mut(parent).rows = rows;
}

/// Stable sort of the children of `parent` by value.
pub fn sort_children(tree: &mut TreeMapTree, parent: NodeId, sorting: Sorting) {
    let mut order = tree.children(parent).to_vec();
    match sorting {
        Sorting::None => {}
        Sorting::Ascending => order.sort_by(|a, b| value_of(tree, *a).total_cmp(&value_of(tree, *b))),
        Sorting::Descending => order.sort_by(|a, b| value_of(tree, *b).total_cmp(&value_of(tree, *a))),
    }
    tree.set_children_order(parent, order);
}

/// Gives every descendant of `parent` a zero-area rectangle at its origin.
fn collapse_descendants(tree: &mut TreeMapTree, parent: NodeId) {
    let origin = tree.node(parent).bounds;
    tree.node_mut(parent).rows.clear();
    for id in tree.subtree(parent).into_iter().skip(1) {
        let node = tree.node_mut(id);
        node.bounds = Rect::point(origin.x0, origin.y0);
        node.rows.clear();
    }
}

/// Sorts and lays out the children of `parent`, then recurses depth-first
/// into every child that has children of its own.
pub fn layout_items(tree: &mut TreeMapTree, parent: NodeId, algorithm: LayoutAlgorithm, sorting: Sorting) {
    if !tree.node(parent).has_children() {
        return;
    }
    sort_children(tree, parent, sorting);

    let value = tree.node(parent).value();
    if !(value.is_finite() && value > 0.0) {
        collapse_descendants(tree, parent);
        return;
    }

    algorithm.apply(tree, parent);

    for child in tree.children(parent).to_vec() {
        if tree.node(child).has_children() {
            layout_items(tree, child, algorithm, sorting);
        }
    }
}
