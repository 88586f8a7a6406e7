//! Utility modules for configuration, errors, naming and file placement

pub mod config;
pub mod error;
pub mod organizer;
pub mod pattern;
pub mod platform;

// Re-export for convenience
pub use config::{CollisionPolicy, PipelineConfig, TransferMode};
pub use error::RenameError;
pub use organizer::{FileOrganizer, OrganizationSettings, Placement, PlannedAction};
pub use pattern::{sanitize_filename, PatternRenderer, RenderedName};
pub use platform::{default_config_path, default_log_path};
