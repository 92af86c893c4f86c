//! Line-level hunks.
//!
//! Hunks are either split out of unified diff text produced by the VCS, or
//! synthesised directly from whole file bodies for additions, deletions and
//! unchanged files. The corpus keeps every line exactly as it will be shown,
//! including the leading `+`/`-`/` ` marker and the line terminator.

use crate::error::{PhabError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Marker line emitted after a line lacking a terminating newline.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file\n";

static HUNK_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("Invalid hunk header regex")
});

/// Offsets and lengths from a `@@ -a,b +c,d @@` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_offset: usize,
    pub new_offset: usize,
    pub old_length: usize,
    pub new_length: usize,
}

/// A contiguous block of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_offset: usize,
    pub old_length: usize,
    pub new_offset: usize,
    pub new_length: usize,
    /// All lines of the hunk concatenated, markers included.
    pub corpus: String,
    pub old_eof_newline: bool,
    pub new_eof_newline: bool,
    /// Number of lines starting with `+`.
    pub added: usize,
    /// Number of lines starting with `-`.
    pub deleted: usize,
}

impl Hunk {
    /// Build a hunk from its header values and body lines.
    ///
    /// Counts and end-of-file newline flags are derived from the lines.
    pub fn from_lines<S: AsRef<str>>(header: HunkHeader, lines: &[S]) -> Self {
        let lines: Vec<&str> = lines.iter().map(<S as AsRef<str>>::as_ref).collect();
        let (old_eof_newline, new_eof_newline) = newline_flags(&lines);
        let count = |marker: char| lines.iter().filter(|line| line.starts_with(marker)).count();

        Self {
            old_offset: header.old_offset,
            old_length: header.old_length,
            new_offset: header.new_offset,
            new_length: header.new_length,
            corpus: lines.concat(),
            old_eof_newline,
            new_eof_newline,
            added: count('+'),
            deleted: count('-'),
        }
    }
}

/// Parse a `@@ -a[,b] +c[,d] @@` hunk header. Omitted lengths default to 1.
pub fn parse_hunk_header(line: &str) -> Result<HunkHeader> {
    let caps = HUNK_HEADER_REGEX
        .captures(line)
        .ok_or_else(|| PhabError::ParseError(format!("invalid hunk header: '{}'", line.trim_end())))?;

    let number = |index: usize, default: Option<usize>| -> Result<usize> {
        match caps.get(index) {
            Some(m) => m.as_str().parse().map_err(|e| {
                PhabError::ParseError(format!(
                    "invalid number '{}' in hunk header: {}",
                    m.as_str(),
                    e
                ))
            }),
            None => default.ok_or_else(|| {
                PhabError::ParseError(format!("invalid hunk header: '{}'", line.trim_end()))
            }),
        }
    };

    Ok(HunkHeader {
        old_offset: number(1, None)?,
        old_length: number(2, Some(1))?,
        new_offset: number(3, None)?,
        new_length: number(4, Some(1))?,
    })
}

/// Split unified diff text into hunks.
///
/// The file header before the first `@@` is discarded. A header followed by
/// no body lines does not produce a hunk.
pub fn build_hunks_from_unified_text(text: &str) -> Result<Vec<Hunk>> {
    let mut hunks = Vec::new();
    let mut pending: Option<(HunkHeader, Vec<&str>)> = None;

    for line in text.split_inclusive('\n') {
        if line.starts_with("@@") {
            flush(pending.take(), &mut hunks);
            pending = Some((parse_hunk_header(line)?, Vec::new()));
        } else if let Some((_, lines)) = pending.as_mut() {
            lines.push(line);
        }
    }
    flush(pending, &mut hunks);

    Ok(hunks)
}

fn flush(pending: Option<(HunkHeader, Vec<&str>)>, hunks: &mut Vec<Hunk>) {
    if let Some((header, lines)) = pending {
        if !lines.is_empty() {
            hunks.push(Hunk::from_lines(header, &lines));
        }
    }
}

/// End-of-file newline flags `(old, new)` for a hunk body.
///
/// A marker line clears the flag of each side the preceding line belongs to:
/// the old side unless it was an addition, the new side unless it was a
/// deletion.
pub fn newline_flags(lines: &[&str]) -> (bool, bool) {
    let mut old_eof_newline = true;
    let mut new_eof_newline = true;
    let mut previous = " ";

    for &line in lines {
        if is_no_newline_marker(line) {
            if !previous.starts_with('+') {
                old_eof_newline = false;
            }
            if !previous.starts_with('-') {
                new_eof_newline = false;
            }
        }
        previous = line;
    }

    (old_eof_newline, new_eof_newline)
}

fn is_no_newline_marker(line: &str) -> bool {
    line.starts_with('\\') && line.trim_end().ends_with("No newline at end of file")
}

/// Prefix every line of `body` with `prefix`, keeping `\n`/`\r\n` terminators.
///
/// Returns the lines and whether the body lacked a final newline. With
/// `check_eof`, a missing final newline is terminated and followed by
/// [`NO_NEWLINE_MARKER`]; without it the last line is kept as is.
pub fn hunk_lines(body: &str, prefix: char, check_eof: bool) -> (Vec<String>, bool) {
    if body.is_empty() {
        return (Vec::new(), false);
    }

    let mut lines: Vec<String> = body
        .split_inclusive('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect();
    let eof_missing_newline = !body.ends_with('\n');

    if eof_missing_newline && check_eof {
        if let Some(last) = lines.last_mut() {
            last.push('\n');
        }
        lines.push(NO_NEWLINE_MARKER.to_string());
    }

    (lines, eof_missing_newline)
}

/// Hunk showing a whole file as context, used when content did not change.
pub fn unchanged_hunk(body: &str) -> Option<Hunk> {
    let (lines, _) = hunk_lines(body, ' ', false);
    if lines.is_empty() {
        return None;
    }
    let header = HunkHeader {
        old_offset: 1,
        new_offset: 1,
        old_length: lines.len(),
        new_length: lines.len(),
    };
    Some(Hunk::from_lines(header, &lines))
}

/// Hunk adding the whole of `body`.
pub fn added_hunk(body: &str) -> Option<Hunk> {
    let (lines, eof_missing_newline) = hunk_lines(body, '+', true);
    if lines.is_empty() {
        return None;
    }
    let header = HunkHeader {
        old_offset: 0,
        new_offset: 1,
        old_length: 0,
        new_length: content_length(&lines, eof_missing_newline),
    };
    Some(Hunk::from_lines(header, &lines))
}

/// Hunk deleting the whole of `body`.
pub fn deleted_hunk(body: &str) -> Option<Hunk> {
    let (lines, eof_missing_newline) = hunk_lines(body, '-', true);
    if lines.is_empty() {
        return None;
    }
    let header = HunkHeader {
        old_offset: 1,
        new_offset: 0,
        old_length: content_length(&lines, eof_missing_newline),
        new_length: 0,
    };
    Some(Hunk::from_lines(header, &lines))
}

// The marker line is not part of the file.
fn content_length(lines: &[String], eof_missing_newline: bool) -> usize {
    if eof_missing_newline {
        lines.len() - 1
    } else {
        lines.len()
    }
}
