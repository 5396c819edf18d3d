use eyre::{eyre, Result, WrapErr};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::{Arc, Weak};

/// An untyped input record, as supplied by the caller.
pub type RawRecord = serde_json::Map<String, Value>;

/// A record shared between a component, its data users and the caller.
///
/// Callers may edit a record in place and then invalidate the raw data of
/// the owning component so existing items re-bind.
pub type SharedRecord = Arc<RwLock<RawRecord>>;

pub fn shared(record: RawRecord) -> SharedRecord {
    Arc::new(RwLock::new(record))
}

/// Wraps JSON values as records. Non-object values become empty records.
pub fn records_from_values(values: Vec<Value>) -> Vec<SharedRecord> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            Value::Object(map) => shared(map),
            other => {
                tracing::warn!(index = i, kind = %json_kind(&other), "non-object record replaced by an empty one");
                shared(RawRecord::new())
            }
        })
        .collect()
}

/// Parses a JSON array of objects into records.
pub fn records_from_json(json: &str) -> Result<Vec<SharedRecord>> {
    let value: Value = serde_json::from_str(json).wrap_err("invalid JSON data")?;
    match value {
        Value::Array(values) => Ok(records_from_values(values)),
        other => Err(eyre!("expected a JSON array of records, got {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step from a record into a nested child record: `record[field][index]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextStep {
    pub field: String,
    pub index: usize,
}

/// Weak back-reference from a data item to the record it was bound from.
///
/// Nested items (children of a has-children field) point at their top-level
/// record plus the path leading to their own object inside it.
#[derive(Clone, Debug, Default)]
pub struct DataContext {
    record: Weak<RwLock<RawRecord>>,
    path: Vec<ContextStep>,
}

impl DataContext {
    pub fn new(record: &SharedRecord) -> Self {
        Self {
            record: Arc::downgrade(record),
            path: Vec::new(),
        }
    }

    /// Context of the `index`-th entry of the has-children field `field`.
    pub fn child(&self, field: &str, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(ContextStep {
            field: field.to_string(),
            index,
        });
        Self {
            record: self.record.clone(),
            path,
        }
    }

    pub fn path(&self) -> &[ContextStep] {
        &self.path
    }

    /// True while the originating record is still alive.
    pub fn is_alive(&self) -> bool {
        self.record.strong_count() > 0
    }

    /// Whether this context was taken from `record`.
    pub fn points_to(&self, record: &SharedRecord) -> bool {
        std::ptr::eq(self.record.as_ptr(), Arc::as_ptr(record))
    }

    /// Runs `f` against the record this context resolves to.
    ///
    /// Returns `None` when the record was dropped or the path no longer
    /// leads to an object.
    pub fn with_record<R>(&self, f: impl FnOnce(&RawRecord) -> R) -> Option<R> {
        let record = self.record.upgrade()?;
        let guard = record.read();
        let mut current: &RawRecord = &guard;
        for step in &self.path {
            current = current
                .get(&step.field)?
                .as_array()?
                .get(step.index)?
                .as_object()?;
        }
        Some(f(current))
    }

    /// Owned copy of the resolved record, for lookup or display.
    pub fn snapshot(&self) -> Option<RawRecord> {
        self.with_record(|record| record.clone())
    }
}

impl PartialEq for DataContext {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.record, &other.record) && self.path == other.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_context_resolves() {
        let records = records_from_values(vec![json!({
            "name": "root",
            "children": [{ "name": "a" }, { "name": "b" }]
        })]);
        let ctx = DataContext::new(&records[0]).child("children", 1);
        let name = ctx.with_record(|r| r["name"].clone()).unwrap();
        assert_eq!(name, json!("b"));
        assert!(ctx.points_to(&records[0]));
    }

    #[test]
    fn test_dropped_record_is_dead() {
        let records = records_from_values(vec![json!({ "value": 1 })]);
        let ctx = DataContext::new(&records[0]);
        drop(records);
        assert!(!ctx.is_alive());
        assert!(ctx.snapshot().is_none());
    }

    #[test]
    fn test_records_from_json_rejects_objects() {
        assert!(records_from_json(r#"{"value": 1}"#).is_err());
        assert_eq!(records_from_json(r#"[{"value": 1}, 3]"#).unwrap().len(), 2);
    }
}
