use crate::theme::ColorSet;
use crate::treemap::{LayoutAlgorithm, Sorting};
use crate::utils::date_parser::DateParser;
use chrono_tz::Tz;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    #[default]
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

/// Data binding and zoom settings of a component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    /// Logical field name -> raw record key.
    pub data_fields: BTreeMap<String, String>,
    /// Property name -> raw record key. Copied as raw JSON.
    pub property_fields: BTreeMap<String, String>,
    /// Logical fields holding nested child records.
    pub children_fields: BTreeSet<String>,
    /// Logical fields parsed as dates.
    pub date_fields: BTreeSet<String>,
    /// Logical fields whose numeric strings are parsed as numbers.
    pub number_fields: BTreeSet<String>,
    /// chrono format string for date fields; ISO layouts when unset.
    pub data_date_format: Option<String>,
    /// Timezone for dates without an offset (UTC when unset).
    pub data_timezone: Option<Tz>,
    /// Unit of numeric timestamps in date fields.
    pub date_unit: TimeUnit,
    /// Time budget of one parsing step before yielding.
    pub parsing_step_duration_ms: u64,
    /// Upper bound of `1 / (end - start)`. Unbounded when unset.
    pub max_zoom_factor: Option<f64>,
    /// Duration of animated zoom transitions; 0 applies zooms immediately.
    pub range_change_duration_ms: u64,
    /// Reset the zoom window to the full range after every full reparse.
    pub reset_zoom_on_data_update: bool,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            data_fields: BTreeMap::new(),
            property_fields: BTreeMap::new(),
            children_fields: BTreeSet::new(),
            date_fields: BTreeSet::new(),
            number_fields: BTreeSet::new(),
            data_date_format: None,
            data_timezone: None,
            date_unit: TimeUnit::Milliseconds,
            parsing_step_duration_ms: 100,
            max_zoom_factor: None,
            range_change_duration_ms: 0,
            reset_zoom_on_data_update: false,
        }
    }
}

impl ComponentConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid component configuration")
    }

    /// Binds `logical` to the raw key `raw`.
    pub fn with_field(mut self, logical: &str, raw: &str) -> Self {
        self.data_fields.insert(logical.to_string(), raw.to_string());
        self
    }

    pub fn with_property(mut self, name: &str, raw: &str) -> Self {
        self.property_fields.insert(name.to_string(), raw.to_string());
        self
    }

    pub fn with_date_field(mut self, logical: &str) -> Self {
        self.date_fields.insert(logical.to_string());
        self
    }

    pub fn with_number_field(mut self, logical: &str) -> Self {
        self.number_fields.insert(logical.to_string());
        self
    }

    pub fn parsing_step_duration(&self) -> Duration {
        Duration::from_millis(self.parsing_step_duration_ms)
    }

    pub fn range_change_duration(&self) -> Duration {
        Duration::from_millis(self.range_change_duration_ms)
    }

    pub fn max_zoom_factor(&self) -> f64 {
        match self.max_zoom_factor {
            Some(f) if f > 0.0 => f,
            _ => f64::INFINITY,
        }
    }

    pub fn date_parser(&self) -> DateParser {
        DateParser::new(
            self.data_date_format.clone(),
            self.data_timezone.unwrap_or(Tz::UTC),
            self.date_unit,
        )
    }
}

/// Settings of the treemap chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeMapConfig {
    pub sorting: Sorting,
    pub layout_algorithm: LayoutAlgorithm,
    /// Number of levels shown below the current drill-down level.
    pub max_levels: usize,
    /// Name of the synthetic root node.
    pub home_text: String,
    pub width: f64,
    pub height: f64,
    pub colors: ColorSet,
}

impl Default for TreeMapConfig {
    fn default() -> Self {
        Self {
            sorting: Sorting::Descending,
            layout_algorithm: LayoutAlgorithm::Squarify,
            max_levels: 2,
            home_text: "Home".to_string(),
            width: 100.0,
            height: 100.0,
            colors: ColorSet::default(),
        }
    }
}

impl TreeMapConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid treemap configuration")
    }
}
