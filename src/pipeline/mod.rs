pub mod driver;
pub mod prompt;
pub mod scanner;

pub use driver::{PipelineDriver, RunSummary};
pub use prompt::{Confirmer, StdinConfirmer};
pub use scanner::scan_directory;
