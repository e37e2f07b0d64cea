//! Output formatting: plain lines or JSON.
//!
//! Plain output is meant for people (optionally colored); JSON output
//! emits serde documents, one per line in `json-compact` mode.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;

use ferrywatch_core::{CacheKey, SessionState, WatchAction};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            enabled: should_color(mode),
        }
    }

    pub fn action(self, action: WatchAction) -> String {
        let label = format!("{:<7}", action.as_str());
        if !self.enabled {
            return label;
        }
        match action {
            WatchAction::Created => label.green().to_string(),
            WatchAction::Updated => label.yellow().to_string(),
            WatchAction::Deleted => label.red().to_string(),
            WatchAction::All => label.dimmed().to_string(),
        }
    }

    pub fn key(self, key: &CacheKey) -> String {
        if self.enabled {
            key.cyan().to_string()
        } else {
            key.to_string()
        }
    }

    pub fn heading(self, text: &str) -> String {
        if self.enabled {
            text.bold().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn state(self, state: SessionState) -> String {
        if !self.enabled {
            return state.to_string();
        }
        match state {
            SessionState::Open => state.green().to_string(),
            SessionState::Connecting { .. } => state.yellow().to_string(),
            SessionState::Closed => state.red().to_string(),
        }
    }
}

// ── Renderers ────────────────────────────────────────────────────────

/// Render a serde value in a JSON format; `None` for plain output.
pub fn render_structured<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<Option<String>, CliError> {
    match format {
        OutputFormat::Plain => Ok(None),
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(data)?)),
        OutputFormat::JsonCompact => Ok(Some(serde_json::to_string(data)?)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Status line on stderr, respecting quiet mode.
pub fn print_status(line: &str, quiet: bool) {
    if quiet {
        return;
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{line}");
}
