//! Treemap partitioning.
//!
//! [`layout`] holds the pure partitioning algorithms over a [`TreeMapTree`];
//! [`TreeMap`] is the chart strategy that builds the tree from parsed data
//! items and keeps the drill-down state.

pub mod layout;
pub mod tree;

pub use layout::{layout_items, LayoutAlgorithm, Sorting, GOLDEN_RATIO};
pub use tree::{NodeId, Rect, Row, TreeMapNode, TreeMapTree};

use crate::data_types::{ComponentConfig, DataItem, TreeMapConfig};
use crate::strategy::ChartStrategy;
use crate::theme::Color;
use std::any::Any;

pub const VALUE_FIELD: &str = "value";
pub const NAME_FIELD: &str = "name";
pub const CHILDREN_FIELD: &str = "children";
pub const COLOR_PROPERTY: &str = "color";

#[derive(Clone, Debug, Default)]
pub struct TreeMap {
    config: TreeMapConfig,
    tree: Option<TreeMapTree>,
    current_level: usize,
    focus: Option<NodeId>,
}

impl TreeMap {
    pub fn new(config: TreeMapConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &TreeMapConfig {
        &self.config
    }

    pub fn tree(&self) -> Option<&TreeMapTree> {
        self.tree.as_ref()
    }

    pub fn current_level(&self) -> usize {
        self.current_level
    }

    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    pub fn set_sorting(&mut self, sorting: Sorting) {
        self.config.sorting = sorting;
        self.relayout();
    }

    pub fn set_layout_algorithm(&mut self, algorithm: LayoutAlgorithm) {
        self.config.layout_algorithm = algorithm;
        self.relayout();
    }

    pub fn set_max_levels(&mut self, max_levels: usize) {
        self.config.max_levels = max_levels;
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.config.width = width;
        self.config.height = height;
        self.relayout();
    }

    /// Rebuilds the tree from top-level data items and lays it out.
    pub fn build(&mut self, items: &[DataItem]) {
        let mut tree = TreeMapTree::new(
            Some(self.config.home_text.clone()),
            Rect::new(0.0, 0.0, self.config.width, self.config.height),
        );
        let root = tree.root();
        for item in items {
            add_item(&mut tree, root, item);
        }
        tree.refresh_values();
        tracing::debug!(nodes = tree.len(), value = tree.node(root).value(), "treemap built");

        self.tree = Some(tree);
        self.current_level = 0;
        self.focus = Some(root);
        self.relayout();
    }

    fn relayout(&mut self) {
        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        let root = tree.root();
        tree.node_mut(root).bounds = Rect::new(0.0, 0.0, self.config.width, self.config.height);
        layout_items(tree, root, self.config.layout_algorithm, self.config.sorting);
    }

    /// Drills down into `id`. Only nodes with children can be zoomed to.
    pub fn zoom_to_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.tree.as_ref().and_then(|tree| tree.get(id)) else {
            return false;
        };
        if !node.has_children() {
            return false;
        }
        self.current_level = node.level();
        self.focus = Some(id);
        true
    }

    /// Drills up one level. Returns `false` at the root.
    pub fn zoom_out(&mut self) -> bool {
        let parent = self
            .focus
            .zip(self.tree.as_ref())
            .and_then(|(focus, tree)| tree.node(focus).parent());
        match parent {
            Some(parent) => self.zoom_to_node(parent),
            None => false,
        }
    }

    /// Nodes with children whose series is shown: those in the focused
    /// subtree less than `max_levels` below the current level, plus the
    /// ancestors of the focus.
    pub fn visible_series(&self) -> Vec<NodeId> {
        let (Some(tree), Some(focus)) = (self.tree.as_ref(), self.focus) else {
            return Vec::new();
        };
        let limit = self.current_level + self.config.max_levels;
        let mut visible: Vec<NodeId> = tree
            .subtree(focus)
            .into_iter()
            .filter(|id| {
                let node = tree.node(*id);
                node.has_children() && node.level() < limit
            })
            .collect();
        visible.extend(tree.ancestors(focus).into_iter().filter(|id| *id != focus));
        visible.sort();
        visible.dedup();
        visible
    }

    /// Breadcrumb from the home node to the focus.
    pub fn navigation_path(&self) -> Vec<NodeId> {
        match (self.tree.as_ref(), self.focus) {
            (Some(tree), Some(focus)) => tree.ancestors(focus),
            _ => Vec::new(),
        }
    }

    pub fn focus_bounds(&self) -> Option<Rect> {
        Some(self.tree.as_ref()?.node(self.focus?).bounds)
    }

    pub fn color_of(&self, id: NodeId) -> Option<Color> {
        let tree = self.tree.as_ref()?;
        tree.get(id)?;
        Some(tree.resolve_color(id, &self.config.colors))
    }
}

fn add_item(tree: &mut TreeMapTree, parent: NodeId, item: &DataItem) {
    let id = tree.add_child(
        parent,
        item.text(NAME_FIELD).map(str::to_string),
        item.number(VALUE_FIELD),
    );
    if let Some(raw) = item.property(COLOR_PROPERTY).and_then(|v| v.as_str()) {
        match Color::parse_hex(raw) {
            Ok(color) => tree.node_mut(id).color = Some(color),
            Err(err) => tracing::warn!(index = item.index(), error = %err, "ignoring node color"),
        }
    }
    for child in item.children(CHILDREN_FIELD).unwrap_or_default() {
        add_item(tree, id, child);
    }
}

impl ChartStrategy for TreeMap {
    fn name(&self) -> &'static str {
        "TreeMap"
    }

    fn configure(&mut self, config: &mut ComponentConfig) {
        for field in [VALUE_FIELD, NAME_FIELD, CHILDREN_FIELD] {
            config
                .data_fields
                .entry(field.to_string())
                .or_insert_with(|| field.to_string());
        }
        config.children_fields.insert(CHILDREN_FIELD.to_string());
        config
            .property_fields
            .entry(COLOR_PROPERTY.to_string())
            .or_insert_with(|| COLOR_PROPERTY.to_string());
    }

    fn on_data_validated(&mut self, items: &[DataItem]) {
        self.build(items);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
