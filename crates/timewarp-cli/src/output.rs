use std::io;

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::args::OutputFormat;

/// Whether stdout is a TTY (colors and headings are suppressed otherwise,
/// so piping to `jq`/`less` gets clean output).
pub fn color_enabled() -> bool {
    io::stdout().is_terminal()
}

pub fn heading(text: &str) -> String {
    if color_enabled() {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn dim(text: &str) -> String {
    if color_enabled() {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

pub fn good(text: &str) -> String {
    if color_enabled() {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

pub fn bad(text: &str) -> String {
    if color_enabled() {
        text.red().to_string()
    } else {
        text.to_string()
    }
}

/// Print `value` as pretty JSON if `format == Json`, else run `plain` for
/// human-readable text.
pub fn render<T: serde::Serialize>(format: OutputFormat, value: &T, plain: impl FnOnce()) {
    match format {
        OutputFormat::Json => {
            match serde_json::to_string_pretty(value) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("failed to serialize output: {e}"),
            }
        }
        OutputFormat::Plain => plain(),
    }
}
