//! Result printing for script commands.
//!
//! Every command reports through [`OutputWriter`], either as a human line or
//! as one pretty-printed JSON object per command.

use anyhow::Result;
use chrono::DateTime;
use memfs_core::{Attributes, DirEntry, FileId, FileKind, FsConfig, FsckReport, WalkEntry};
use serde::Serialize;
use std::io::{self, Write};

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Prints command results to stdout and failures to stderr.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        let format = if json { OutputFormat::Json } else { OutputFormat::Text };
        Self {
            format,
            stdout: io::stdout(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Print one command result.
    ///
    /// JSON mode serializes `data` (a DTO carrying `success` and
    /// `result_code`). Text mode prints whatever `text_fn` renders, and
    /// nothing at all for an empty string, so quiet commands stay quiet.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        let mut out = self.stdout.lock();
        match self.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(data)?)?,
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(out, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Report a failed command on stderr.
    ///
    /// The message is the whole context chain joined with ": ", outermost
    /// first (for example `line 3: Failed to link /a to /b: File exists: b`).
    /// JSON mode wraps it in an [`ErrorOutput`] with `success: false`.
    /// Failures while printing are ignored.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        let message = format!("{:#}", error);
        let mut err = io::stderr().lock();
        match self.format {
            OutputFormat::Json => {
                let output = ErrorOutput {
                    success: false,
                    result_code,
                    error: message,
                };
                if let Ok(json) = serde_json::to_string_pretty(&output) {
                    let _ = writeln!(err, "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(err, "Error: {}", message);
            }
        }
    }
}

/// Render epoch seconds as RFC 3339, or the raw number when out of range.
pub fn human_time(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

/// One-letter kind marker used in listings.
pub fn kind_char(kind: FileKind) -> char {
    match kind {
        FileKind::Directory => 'd',
        FileKind::RegularFile => '-',
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `mkdir` and `touch`.
#[derive(Debug, Serialize)]
pub struct CreateOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub id: FileId,
    pub kind: FileKind,
}

/// Output for `write`.
#[derive(Debug, Serialize)]
pub struct WriteOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub offset: u64,
    pub bytes_written: usize,
    pub size: u64,
}

/// Output for `cat`.
#[derive(Debug, Serialize)]
pub struct CatOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub offset: u64,
    pub bytes_read: usize,
    pub content: String,
}

/// Output for `ls`.
#[derive(Debug, Serialize)]
pub struct LsOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub entries: Vec<DirEntry>,
}

/// Output for `stat`.
#[derive(Debug, Serialize)]
pub struct StatOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    #[serde(flatten)]
    pub attrs: Attributes,
    pub atime_human: String,
    pub mtime_human: String,
    pub ctime_human: String,
}

impl StatOutput {
    pub fn new(path: String, attrs: Attributes) -> Self {
        Self {
            success: true,
            result_code: 0,
            atime_human: human_time(attrs.atime),
            mtime_human: human_time(attrs.mtime),
            ctime_human: human_time(attrs.ctime),
            path,
            attrs,
        }
    }
}

/// Output for `ln`.
#[derive(Debug, Serialize)]
pub struct LinkOutput {
    pub success: bool,
    pub result_code: u8,
    pub from: String,
    pub to: String,
    pub id: FileId,
    pub nlink: u64,
}

/// Output for `rm` and `rmdir`.
#[derive(Debug, Serialize)]
pub struct RemoveOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
}

/// Output for `truncate`.
#[derive(Debug, Serialize)]
pub struct TruncateOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub size: u64,
}

/// Output for `utime`.
#[derive(Debug, Serialize)]
pub struct UtimeOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub atime: i64,
    pub mtime: i64,
}

/// Output for `tree`.
#[derive(Debug, Serialize)]
pub struct TreeOutput {
    pub success: bool,
    pub result_code: u8,
    pub entries: Vec<WalkEntry>,
}

/// Output for `fsck`.
#[derive(Debug, Serialize)]
pub struct FsckOutput {
    pub success: bool,
    pub result_code: u8,
    pub objects: usize,
    #[serde(flatten)]
    pub report: FsckReport,
}

/// Output for the `config` command.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub success: bool,
    pub result_code: u8,
    pub config: FsConfig,
}
