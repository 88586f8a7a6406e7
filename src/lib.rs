//! tuberename library

pub mod app;
pub mod audit;
pub mod extractor;
pub mod notifier;
pub mod pipeline;
pub mod utils;

// Re-export main types for easier use
pub use audit::{AuditEntry, AuditLog, Outcome};
pub use extractor::{MetadataResolver, MetadataSource, SourceFile, VideoIdentifier, VideoMetadata};
pub use pipeline::{PipelineDriver, RunSummary};
pub use utils::{PipelineConfig, RenameError};
