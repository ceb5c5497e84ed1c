//! Terminal input and colored output.

use std::io::{self, Write as _};

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line-oriented stdin reader.
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    /// Read from the process stdin.
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `prompt` and read one trimmed line.
    ///
    /// Closed input is reported as [`io::ErrorKind::UnexpectedEof`].
    pub async fn question(&mut self, prompt: &str) -> io::Result<String> {
        if !prompt.is_empty() {
            print!("{} ", prompt.cyan());
            io::stdout().flush()?;
        }
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed")),
        }
    }

    /// Ask a yes/no question; anything other than `y` is no.
    pub async fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        Ok(self.question(prompt).await?.eq_ignore_ascii_case("y"))
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Status line.
pub fn green(text: &str) {
    println!("{}", text.green());
}

/// Progress or hint line.
pub fn yellow(text: &str) {
    println!("{}", text.yellow());
}

/// Error line.
pub fn red(text: &str) {
    println!("{}", text.red());
}

/// Plain text.
pub fn normal(text: &str) {
    println!("{text}");
}

/// Empty line.
pub fn blank() {
    println!();
}

/// Highlighted banner.
pub fn banner(text: &str) {
    println!("{}", format!(" {text} ").black().on_green().bold());
}
