//! Human-facing terminal output.
//!
//! Messages fall into four colour-tagged categories: prompts (cyan), info
//! (green), warnings (yellow) and errors (red). The [`Console`] handle is
//! created once in `main` and passed to the components that talk to the
//! user; diagnostic logging goes through `tracing` instead.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Colour-tagged message formatting and printing.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    colored: bool,
    quiet: bool,
}

impl Console {
    pub fn new(colored: bool) -> Self {
        Self { colored, quiet: false }
    }

    /// Colours when the terminal supports them.
    pub fn detect() -> Self {
        Self::new(console::colors_enabled())
    }

    /// A console that formats but never prints.
    pub fn silent() -> Self {
        Self { colored: false, quiet: true }
    }

    /// Cyan `message> `.
    pub fn format_prompt(&self, message: &str) -> String {
        style(format!("{}> ", message))
            .cyan()
            .force_styling(self.colored)
            .to_string()
    }

    /// Green `message`.
    pub fn format_info(&self, message: &str) -> String {
        style(message).green().force_styling(self.colored).to_string()
    }

    /// Yellow `Warning: message`.
    pub fn format_warning(&self, message: &str) -> String {
        style(format!("Warning: {}", message))
            .yellow()
            .force_styling(self.colored)
            .to_string()
    }

    /// Red `Error: message`.
    pub fn format_error(&self, message: &str) -> String {
        style(format!("Error: {}", message))
            .red()
            .force_styling(self.colored)
            .to_string()
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{}", self.format_info(message));
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{}", self.format_warning(message));
        }
    }

    pub fn error(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", self.format_error(message));
        }
    }

    /// Uncoloured line.
    pub fn line(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    /// Spinner counting processed chunks; hidden on a silent console.
    pub fn progress(&self, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({pos} chunks, {elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

/// Source of interactive answers.
pub trait Prompter {
    /// Show `question` and wait for one line. `None` means the input ended.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// Reads answers from standard input.
pub struct StdinPrompter {
    console: Console,
}

impl StdinPrompter {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", self.console.format_prompt(question))?;
        stdout.flush()?;
        drop(stdout);

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
