use serde::{Deserialize, Serialize};

/// Dirty flags, one per validation stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InvalidFlags {
    pub raw_data: bool,
    pub data: bool,
    pub data_items: bool,
    pub data_range: bool,
}

impl InvalidFlags {
    pub fn any(&self) -> bool {
        self.raw_data || self.data || self.data_items || self.data_range
    }
}

/// Validation stages, in the order a scheduler must run them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    RawData,
    Data,
    DataItems,
    DataRange,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [Stage::RawData, Stage::Data, Stage::DataItems, Stage::DataRange];
}

/// Resumable state of the chunked parser.
///
/// `offset` is the next record to parse; `generation` is the data
/// generation the offset belongs to. An offset saved under an older
/// generation is stale and must not be resumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseTask {
    pub offset: usize,
    pub generation: u64,
}

impl ParseTask {
    pub fn new(offset: usize, generation: u64) -> Self {
        Self { offset, generation }
    }
}

/// Outcome of one `validate_data` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValidationProgress {
    /// Every record is parsed.
    Complete,
    /// The step budget ran out; parsing resumes on a later tick.
    Yielded { progress: f64 },
}

impl ValidationProgress {
    pub fn is_complete(&self) -> bool {
        matches!(self, ValidationProgress::Complete)
    }
}

/// Which handle a zoom gesture originates from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomPriority {
    /// Dragging the start handle: adjustments go to `end`.
    Start,
    /// Anything else: adjustments go to `start`.
    #[default]
    End,
}

/// Fractional window over the data items.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub priority: ZoomPriority,
}

impl ZoomRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            priority: ZoomPriority::End,
        }
    }

    pub fn with_priority(mut self, priority: ZoomPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}
