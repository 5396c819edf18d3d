use super::record::{records_from_json, records_from_values, SharedRecord};
use eyre::Result;
use serde_json::Value;

/// Trait for sources that provide raw records to a component.
pub trait RecordSource {
    /// Produces the full record set.
    fn records(&self) -> Result<Vec<SharedRecord>>;

    /// Number of records the source holds, if known without loading.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// Records held in memory as JSON values.
#[derive(Clone, Debug, Default)]
pub struct VecRecordSource {
    values: Vec<Value>,
}

impl VecRecordSource {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }
}

impl RecordSource for VecRecordSource {
    fn records(&self) -> Result<Vec<SharedRecord>> {
        Ok(records_from_values(self.values.clone()))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.values.len())
    }
}

/// Records parsed from a JSON array document.
#[derive(Clone, Debug)]
pub struct JsonRecordSource {
    json: String,
}

impl JsonRecordSource {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl RecordSource for JsonRecordSource {
    fn records(&self) -> Result<Vec<SharedRecord>> {
        records_from_json(&self.json)
    }
}
