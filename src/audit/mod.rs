pub mod log;

pub use log::{AuditEntry, AuditLog, Outcome};
