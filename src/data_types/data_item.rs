use super::record::DataContext;
use super::value::FieldValue;
use serde_json::Value;
use std::collections::BTreeMap;

/// One parsed record: field values bound from its data context.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataItem {
    index: usize,
    level: usize,
    data_context: DataContext,
    values: BTreeMap<String, FieldValue>,
    properties: BTreeMap<String, Value>,
    children: BTreeMap<String, Vec<DataItem>>,
}

impl DataItem {
    pub fn new(index: usize, level: usize) -> Self {
        Self {
            index,
            level,
            ..Default::default()
        }
    }

    /// Position in the owning list (top-level items: position in the data).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Nesting depth; 0 for items bound straight from the data array.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn data_context(&self) -> &DataContext {
        &self.data_context
    }

    pub fn set_data_context(&mut self, context: DataContext) {
        self.data_context = context;
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.values.get(field).and_then(FieldValue::as_number)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(FieldValue::as_str)
    }

    pub fn date(&self, field: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.values.get(field).and_then(FieldValue::as_date)
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    /// Sets a field value. Returns `true` if the stored value changed.
    pub fn set_value(&mut self, field: &str, value: FieldValue) -> bool {
        if self.values.get(field) == Some(&value) {
            return false;
        }
        self.values.insert(field.to_string(), value);
        true
    }

    /// Removes a field value. Returns `true` if one was present.
    pub fn remove_value(&mut self, field: &str) -> bool {
        self.values.remove(field).is_some()
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Sets a property. Returns `true` if the stored property changed.
    pub fn set_property(&mut self, name: &str, value: Value) -> bool {
        if self.properties.get(name) == Some(&value) {
            return false;
        }
        self.properties.insert(name.to_string(), value);
        true
    }

    /// Child items bound from the has-children field `field`.
    pub fn children(&self, field: &str) -> Option<&[DataItem]> {
        self.children.get(field).map(Vec::as_slice)
    }

    pub fn children_mut(&mut self, field: &str) -> Option<&mut Vec<DataItem>> {
        self.children.get_mut(field)
    }

    pub fn set_children(&mut self, field: &str, children: Vec<DataItem>) {
        self.children.insert(field.to_string(), children);
    }

    pub fn child_lists(&self) -> &BTreeMap<String, Vec<DataItem>> {
        &self.children
    }

    /// Drops every bound value, property and child list, keeping identity
    /// (index, level, context).
    pub fn clear_bindings(&mut self) {
        self.values.clear();
        self.properties.clear();
        self.children.clear();
    }
}
