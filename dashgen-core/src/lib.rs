//! Core functionality for dashgen
//!
//! This crate contains the metadata engine behind the dashboard: extracting
//! `// Key: value` comments from source files, writing edited values back into
//! those comments, and rendering the collected records.

pub mod config;
pub mod dashboard;
pub mod lock;
pub mod metadata;
pub mod publish;
pub mod render;
pub mod schema;

pub use config::{DashConfig, PublishSettings, ServerSettings};
pub use dashboard::{ApplyResult, Dashboard};
pub use metadata::{
    BatchDriver, BatchReport, MetadataError, MetadataReader, MetadataWriter, Record, UpdateOutcome,
    UpdateRequest,
};
pub use publish::PublishOutcome;
pub use render::RenderFormat;
pub use schema::{FieldDef, FieldSchema};
