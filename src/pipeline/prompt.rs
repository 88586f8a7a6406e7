//! Interactive confirmation before each write

use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Returns true when the user accepts the planned source → destination write
    async fn confirm(&self, source: &Path, destination: &Path) -> bool;
}

/// Reads `y`/`n` answers from stdin
pub struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, source: &Path, destination: &Path) -> bool {
        let question = format!("Rename '{}' to '{}'? (y/n): ", source.display(), destination.display());
        tokio::task::spawn_blocking(move || ask(&question))
            .await
            .unwrap_or(false)
    }
}

/// Prompt on stdout and read one line from stdin; anything but `y`/`yes` is a no
pub fn ask(question: &str) -> bool {
    print!("{}", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
