pub mod config;
pub mod error;
pub mod db;
pub mod store;
pub mod registry;
pub mod hierarchy;
pub mod http;

pub use config::Config;
pub use error::{RecordTreeError, Result};
pub use hierarchy::{get_hierarchy_data, get_hierarchy_data_with_report, BuildReport, HierarchyBuilder, Node};
pub use registry::RelationshipRegistry;
pub use store::{MemoryStore, Record, RecordStore, SqliteStore};
