//! chart_pipeline crate: data binding pipeline and treemap layout for charting

pub mod animation;
pub mod binding;
pub mod component;
pub mod data_types;
pub mod disposer;
pub mod events;
#[cfg(feature = "polars")]
pub mod polars_source;
pub mod scheduler;
pub mod strategy;
pub mod theme;
pub mod treemap;
pub mod utils;
pub mod view_controller;

pub use component::{Component, ComponentHandle, DataUser, DataUserId};
pub use data_types::{ComponentConfig, DataItem, FieldValue, TreeMapConfig, ZoomPriority, ZoomRange};
pub use events::{ComponentEvent, ListenerId, Subscription};
pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock};
pub use strategy::{ChartRegistry, ChartStrategy, GenericStrategy};
pub use treemap::TreeMap;
