use crate::data_types::{ComponentConfig, DataContext, DataItem, FieldValue, RawRecord};
use crate::utils::date_parser::DateParser;
use eyre::{eyre, Result};
use serde_json::Value;
use std::sync::Arc;

/// Hook applied to every raw value before coercion: `(logical field, raw value)`.
/// Returning `None` leaves the field unset.
pub type ValueAdapter = Arc<dyn Fn(&str, Option<Value>) -> Option<Value> + Send + Sync>;

/// Binds raw record fields onto data items according to a configuration.
pub struct FieldBinder<'a> {
    config: &'a ComponentConfig,
    dates: &'a DateParser,
    adapter: Option<&'a ValueAdapter>,
}

impl<'a> FieldBinder<'a> {
    pub fn new(config: &'a ComponentConfig, dates: &'a DateParser, adapter: Option<&'a ValueAdapter>) -> Self {
        Self {
            config,
            dates,
            adapter,
        }
    }

    /// Re-binds `item` from its data context.
    ///
    /// Previous bindings are dropped first, so binding twice from the same
    /// record yields an equal item. Returns the number of fields that could
    /// not be bound.
    pub fn bind(&self, item: &mut DataItem) -> usize {
        item.clear_bindings();
        let context = item.data_context().clone();
        match context.with_record(|record| self.bind_from(item, &context, record)) {
            Some(failures) => failures,
            None => {
                tracing::debug!(index = item.index(), level = item.level(), "data context no longer resolves");
                0
            }
        }
    }

    fn bind_from(&self, item: &mut DataItem, context: &DataContext, record: &RawRecord) -> usize {
        let mut failures = 0;

        for (logical, raw) in &self.config.data_fields {
            if self.config.children_fields.contains(logical) {
                match record.get(raw) {
                    Some(Value::Array(entries)) => {
                        let mut children = Vec::with_capacity(entries.len());
                        for (i, entry) in entries.iter().enumerate() {
                            let child_context = context.child(raw, i);
                            let mut child = DataItem::new(i, item.level() + 1);
                            child.set_data_context(child_context.clone());
                            match entry {
                                Value::Object(child_record) => {
                                    failures += self.bind_from(&mut child, &child_context, child_record);
                                }
                                _ => {
                                    tracing::warn!(field = %logical, index = i, "child entry is not an object");
                                    failures += 1;
                                }
                            }
                            children.push(child);
                        }
                        item.set_children(logical, children);
                    }
                    None | Some(Value::Null) => {}
                    Some(_) => {
                        tracing::warn!(field = %logical, index = item.index(), "children field is not an array");
                        failures += 1;
                    }
                }
                continue;
            }

            let value = record.get(raw).cloned();
            let value = match self.adapter {
                Some(adapter) => adapter(logical, value),
                None => value,
            };
            let Some(value) = value.filter(|v| !v.is_null()) else {
                continue;
            };

            match self.coerce(logical, value) {
                Ok(value) => {
                    item.set_value(logical, value);
                }
                Err(err) => {
                    tracing::warn!(
                        field = %logical,
                        index = item.index(),
                        level = item.level(),
                        error = %err,
                        "field binding failed"
                    );
                    failures += 1;
                }
            }
        }

        for (name, raw) in &self.config.property_fields {
            if let Some(value) = record.get(raw).filter(|v| !v.is_null()) {
                item.set_property(name, value.clone());
            }
        }

        failures
    }

    fn coerce(&self, field: &str, value: Value) -> Result<FieldValue> {
        if self.config.date_fields.contains(field) {
            return match value {
                Value::String(s) => Ok(FieldValue::Date(self.dates.parse_str(&s)?)),
                Value::Number(n) => {
                    let n = n.as_f64().ok_or_else(|| eyre!("unrepresentable number"))?;
                    Ok(FieldValue::Date(self.dates.from_timestamp(n)?))
                }
                other => Err(eyre!("cannot read a date from {other}")),
            };
        }

        match value {
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .ok_or_else(|| eyre!("unrepresentable number")),
            Value::String(s) if self.config.number_fields.contains(field) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Number)
                .map_err(|_| eyre!("'{s}' is not a number")),
            Value::String(s) => Ok(FieldValue::Text(s)),
            Value::Bool(b) => Ok(FieldValue::Bool(b)),
            other => Err(eyre!("unsupported value {other}")),
        }
    }
}
