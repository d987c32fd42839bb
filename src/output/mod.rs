use crate::models::AuthLog;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

/// Errors that can occur while rendering
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// Renders a filtered auth log
pub struct OutputHandler {
    format: OutputFormat,
    threshold: usize,
}

impl OutputHandler {
    /// `threshold` is re-applied by the text renderer; JSON output is not
    /// affected by it.
    pub fn new(format: OutputFormat, threshold: usize) -> Self {
        OutputHandler { format, threshold }
    }

    pub fn write_log<W: Write>(&self, log: &AuthLog, out: &mut W) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => write_json(log, out)?,
            OutputFormat::Text => write_text(log, self.threshold, out)?,
        }
        out.flush()?;
        Ok(())
    }
}

fn write_text<W: Write>(log: &AuthLog, threshold: usize, out: &mut W) -> std::io::Result<()> {
    for day in log.days() {
        writeln!(out, "{}", format!("Date: {}", day.date).green().bold())?;
        for entry in day.entries.iter().filter(|e| e.count >= threshold) {
            writeln!(out, "{}", format!("IP: {}", entry.ip).blue().bold())?;
            writeln!(out, "{} {}", "Location:".yellow(), entry.composed_location())?;
            writeln!(out, "{} {}", "Attempts:".yellow(), entry.count)?;
            writeln!(out, "{} {}", "Usernames:".yellow(), entry.usernames.join(", "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Pretty JSON with four-space indentation
fn write_json<W: Write>(log: &AuthLog, out: &mut W) -> Result<(), OutputError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut *out, formatter);
    log.serialize(&mut ser)?;
    writeln!(out)?;
    Ok(())
}
