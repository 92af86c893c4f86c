//! Raw per-path status records as reported by `git diff-tree --raw -z`.

use crate::error::{PhabError, Result};

/// Blob id git uses for "no content on this side".
pub const NULL_BLOB: &str = "0000000000000000000000000000000000000000";

/// Operation letter of a raw status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
}

impl ChangeStatus {
    /// Parse the status field (`A`, `D`, `M`, `R100`, `C075`, ...).
    ///
    /// Only the first letter is significant; rename/copy scores are ignored.
    pub fn from_field(field: &str) -> Result<Self> {
        match field.chars().next() {
            Some('A') => Ok(Self::Added),
            Some('D') => Ok(Self::Deleted),
            Some('M') => Ok(Self::Modified),
            Some('R') => Ok(Self::Renamed),
            Some('C') => Ok(Self::Copied),
            _ => Err(PhabError::ParseError(format!(
                "unsupported change type '{}'",
                field
            ))),
        }
    }

    /// Whether the record carries both a source and a destination path.
    pub fn has_two_paths(self) -> bool {
        matches!(self, Self::Renamed | Self::Copied)
    }
}

/// One affected path of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub status: ChangeStatus,
    pub old_mode: String,
    pub new_mode: String,
    /// `None` when the old side does not exist (null blob).
    pub old_blob: Option<String>,
    /// `None` when the new side does not exist (null blob).
    pub new_blob: Option<String>,
    pub old_path: String,
    pub new_path: String,
}

impl RawChange {
    /// Build a record for tests and non-git collaborators.
    pub fn new(
        status: ChangeStatus,
        old_path: impl Into<String>,
        new_path: impl Into<String>,
    ) -> Self {
        Self {
            status,
            old_mode: String::new(),
            new_mode: String::new(),
            old_blob: None,
            new_blob: None,
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }

    pub fn with_modes(mut self, old_mode: &str, new_mode: &str) -> Self {
        self.old_mode = old_mode.to_string();
        self.new_mode = new_mode.to_string();
        self
    }

    pub fn with_blobs(mut self, old_blob: Option<&str>, new_blob: Option<&str>) -> Self {
        self.old_blob = old_blob.map(str::to_string);
        self.new_blob = new_blob.map(str::to_string);
        self
    }
}

fn blob_id(field: &str) -> Option<String> {
    if field.chars().all(|c| c == '0') {
        None
    } else {
        Some(field.to_string())
    }
}

/// Parse NUL-separated `diff-tree --raw -z` output.
///
/// Records keep the order git reports them in. Anything before the first
/// `:`-prefixed header (the commit id line) is skipped.
///
/// Format per record: `:<old_mode> <new_mode> <old_blob> <new_blob> <status>\0<path>\0`
/// with a second path for renames and copies.
pub fn parse_raw_records(raw: &str) -> Result<Vec<RawChange>> {
    let mut tokens = raw.split('\0').filter(|token| !token.is_empty());
    let mut records = Vec::new();

    while let Some(token) = tokens.next() {
        let Some(header) = token.trim_start_matches('\n').strip_prefix(':') else {
            if records.is_empty() {
                continue;
            }
            return Err(PhabError::ParseError(format!(
                "unexpected token in raw diff output: '{}'",
                token
            )));
        };

        let fields: Vec<&str> = header.split_whitespace().collect();
        let &[old_mode, new_mode, old_blob, new_blob, status] = fields.as_slice() else {
            return Err(PhabError::ParseError(format!(
                "malformed raw status record: '{}'",
                header
            )));
        };
        let status = ChangeStatus::from_field(status)?;

        let mut next_path = || {
            tokens.next().map(str::to_string).ok_or_else(|| {
                PhabError::ParseError(format!("raw status record without path: '{}'", header))
            })
        };
        let old_path = next_path()?;
        let new_path = if status.has_two_paths() {
            next_path()?
        } else {
            old_path.clone()
        };

        records.push(RawChange {
            status,
            old_mode: old_mode.to_string(),
            new_mode: new_mode.to_string(),
            old_blob: blob_id(old_blob),
            new_blob: blob_id(new_blob),
            old_path,
            new_path,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn test_parse_modify_record() {
        let raw = format!("deadbeef\0:100644 100755 {A} {B} M\0src/lib.rs\0");
        let records = parse_raw_records(&raw).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.status, ChangeStatus::Modified);
        assert_eq!(record.old_mode, "100644");
        assert_eq!(record.new_mode, "100755");
        assert_eq!(record.old_blob.as_deref(), Some(A));
        assert_eq!(record.new_blob.as_deref(), Some(B));
        assert_eq!(record.old_path, "src/lib.rs");
        assert_eq!(record.new_path, "src/lib.rs");
    }

    #[test]
    fn test_parse_add_uses_null_old_blob() {
        let raw = format!(":000000 100644 {NULL_BLOB} {B} A\0new.txt\0");
        let records = parse_raw_records(&raw).unwrap();
        assert_eq!(records[0].status, ChangeStatus::Added);
        assert_eq!(records[0].old_blob, None);
        assert_eq!(records[0].new_blob.as_deref(), Some(B));
    }

    #[test]
    fn test_parse_rename_and_copy_take_two_paths_in_order() {
        let raw = format!(
            ":100644 100644 {A} {A} R100\0old.txt\0moved.txt\0\
             :100644 100644 {A} {A} C075\0old.txt\0copy.txt\0\
             :100644 000000 {B} {NULL_BLOB} D\0gone.txt\0"
        );
        let records = parse_raw_records(&raw).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, ChangeStatus::Renamed);
        assert_eq!(records[0].old_path, "old.txt");
        assert_eq!(records[0].new_path, "moved.txt");
        assert_eq!(records[1].status, ChangeStatus::Copied);
        assert_eq!(records[1].new_path, "copy.txt");
        assert_eq!(records[2].status, ChangeStatus::Deleted);
        assert_eq!(records[2].new_blob, None);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_raw_records("").unwrap().is_empty());
        assert!(parse_raw_records("deadbeef\0").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_status_is_parse_error() {
        let raw = format!(":100644 100644 {A} {B} T\0file\0");
        let err = parse_raw_records(&raw).unwrap_err();
        assert!(matches!(err, PhabError::ParseError(_)));
    }

    #[test]
    fn test_truncated_record_is_parse_error() {
        let raw = format!(":100644 100644 {A} M\0file\0");
        assert!(matches!(
            parse_raw_records(&raw).unwrap_err(),
            PhabError::ParseError(_)
        ));

        let raw = format!(":100644 100644 {A} {A} R100\0only-source\0");
        assert!(matches!(
            parse_raw_records(&raw).unwrap_err(),
            PhabError::ParseError(_)
        ));
    }
}
