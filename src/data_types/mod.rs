pub mod configs;
pub mod data_item;
pub mod datasource;
pub mod record;
pub mod state;
pub mod value;

// Re-export everything for compatibility
pub use configs::*;
pub use data_item::*;
pub use datasource::*;
pub use record::*;
pub use state::*;
pub use value::*;
