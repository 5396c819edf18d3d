use crate::theme::{Color, ColorSet};
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Axis-aligned rectangle, `(x0, y0)` top-left, `(x1, y1)` bottom-right.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Zero-area rectangle at `(x, y)`.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let w = self.x1.min(other.x1) - self.x0.max(other.x0);
        let h = self.y1.min(other.y1) - self.y0.max(other.y0);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Whether `other` lies inside this rectangle, within `epsilon`.
    pub fn contains(&self, other: &Rect, epsilon: f64) -> bool {
        other.x0 >= self.x0 - epsilon
            && other.y0 >= self.y0 - epsilon
            && other.x1 <= self.x1 + epsilon
            && other.y1 <= self.y1 + epsilon
    }
}

/// One row produced by squarify: a run of siblings laid out together.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub value: f64,
    /// Laid out left to right (`true`) or top to bottom.
    pub dice: bool,
    /// Positions in the parent's child list.
    pub children: Range<usize>,
    pub bounds: Rect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeMapNode {
    pub name: Option<String>,
    own_value: Option<f64>,
    value: f64,
    pub color: Option<Color>,
    pub bounds: Rect,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    index: usize,
    level: usize,
    /// Squarify rows of the last layout pass.
    pub rows: Vec<Row>,
}

impl TreeMapNode {
    fn new(name: Option<String>, own_value: Option<f64>, parent: Option<NodeId>, level: usize, index: usize) -> Self {
        Self {
            name,
            own_value,
            value: own_value.filter(|v| v.is_finite()).unwrap_or(0.0),
            color: None,
            bounds: Rect::default(),
            parent,
            children: Vec::new(),
            index,
            level,
            rows: Vec::new(),
        }
    }

    /// Own value if set, otherwise the sum of the children
    /// (as of the last [`TreeMapTree::refresh_values`]).
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn own_value(&self) -> Option<f64> {
        self.own_value
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Position among the siblings, after sorting.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn level(&self) -> usize {
        self.level
    }
}

/// Arena of treemap nodes. Node 0 is the root.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeMapTree {
    nodes: Vec<TreeMapNode>,
}

impl TreeMapTree {
    pub fn new(root_name: Option<String>, bounds: Rect) -> Self {
        let mut root = TreeMapNode::new(root_name, None, None, 0, 0);
        root.bounds = bounds;
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_child(&mut self, parent: NodeId, name: Option<String>, value: Option<f64>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let (level, index) = {
            let parent = &self.nodes[parent.0];
            (parent.level + 1, parent.children.len())
        };
        self.nodes.push(TreeMapNode::new(name, value, Some(parent), level, index));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeMapNode> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> &TreeMapNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeMapNode {
        &mut self.nodes[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Reorders the children of `parent` and renumbers their sibling index.
    pub fn set_children_order(&mut self, parent: NodeId, order: Vec<NodeId>) {
        for (i, child) in order.iter().enumerate() {
            self.nodes[child.0].index = i;
        }
        self.nodes[parent.0].children = order;
    }

    /// Recomputes cached values bottom-up: own value when finite, else the
    /// sum of the children.
    pub fn refresh_values(&mut self) {
        // Children always have a larger id than their parent.
        for i in (0..self.nodes.len()).rev() {
            let value = match self.nodes[i].own_value.filter(|v| v.is_finite()) {
                Some(v) => v,
                None => self.nodes[i].children.iter().map(|c| self.nodes[c.0].value).sum(),
            };
            self.nodes[i].value = value;
        }
    }

    /// Path from the root down to `id`, both included.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// `id` and everything below it, depth-first.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev());
        }
        out
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(|id| !self.node(*id).has_children())
    }

    /// Own color, else the nearest colored ancestor below the root, else
    /// the palette entry of the top-level ancestor's sibling index.
    ///
    /// A descendant never indexes the palette by its own sibling position,
    /// so a whole top-level branch shares one palette color.
    pub fn resolve_color(&self, id: NodeId, palette: &ColorSet) -> Color {
        let mut current = id;
        loop {
            let node = &self.nodes[current.0];
            if let Some(color) = node.color {
                return color;
            }
            match node.parent {
                Some(parent) if self.nodes[parent.0].parent.is_some() => current = parent,
                _ => return palette.get_index(node.index),
            }
        }
    }
}
