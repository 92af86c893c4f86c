//! Per-path change model and its wire payload.

use super::classify::binary_file_type;
use super::hunk::Hunk;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Operation applied to a path. Integer codes are the review system's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kind {
    Add,
    #[default]
    Change,
    Delete,
    MoveAway,
    CopyAway,
    MoveHere,
    CopyHere,
    Multicopy,
}

impl Kind {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            Kind::Add => 1,
            Kind::Change => 2,
            Kind::Delete => 3,
            Kind::MoveAway => 4,
            Kind::CopyAway => 5,
            Kind::MoveHere => 6,
            Kind::CopyHere => 7,
            Kind::Multicopy => 8,
        }
    }
}

/// Content category of a path. Integer codes are the review system's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    Text,
    Image,
    Binary,
    Directory,
    Symlink,
    Deleted,
    Normal,
}

impl FileType {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            FileType::Text => 1,
            FileType::Image => 2,
            FileType::Binary => 3,
            FileType::Directory => 4,
            FileType::Symlink => 5,
            FileType::Deleted => 6,
            FileType::Normal => 7,
        }
    }
}

/// Side of a change an upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSlot {
    Old,
    New,
}

impl UploadSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadSlot::Old => "old",
            UploadSlot::New => "new",
        }
    }
}

/// Opaque content of one side of a binary change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub slot: UploadSlot,
    pub bytes: Vec<u8>,
    pub mime: String,
    /// Remote file PHID, set once uploaded.
    pub phid: Option<String>,
}

/// Everything that happened to one path in a commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Change {
    pub cur_path: String,
    pub old_path: Option<String>,
    /// Destinations of a move or copy away from this path.
    pub away_paths: Vec<String>,
    pub old_mode: Option<String>,
    pub cur_mode: Option<String>,
    pub kind: Kind,
    pub file_type: FileType,
    pub binary: bool,
    pub hunks: Vec<Hunk>,
    pub uploads: Vec<Upload>,
}

impl Change {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            cur_path: path.into(),
            ..Self::default()
        }
    }

    /// Lines added over all hunks.
    pub fn added(&self) -> usize {
        self.hunks.iter().map(|hunk| hunk.added).sum()
    }

    /// Lines deleted over all hunks.
    pub fn deleted(&self) -> usize {
        self.hunks.iter().map(|hunk| hunk.deleted).sum()
    }

    /// Mark the change as binary and queue both sides for upload.
    pub fn set_as_binary(&mut self, old_body: Vec<u8>, old_mime: &str, new_body: Vec<u8>, new_mime: &str) {
        self.binary = true;
        self.hunks.clear();
        self.file_type = binary_file_type(old_mime, new_mime);
        self.uploads = vec![
            Upload {
                slot: UploadSlot::Old,
                bytes: old_body,
                mime: old_mime.to_string(),
                phid: None,
            },
            Upload {
                slot: UploadSlot::New,
                bytes: new_body,
                mime: new_mime.to_string(),
                phid: None,
            },
        ];
    }

    /// Path an upload slot refers to, for naming the remote file.
    pub fn path_for(&self, slot: UploadSlot) -> &str {
        match slot {
            UploadSlot::New => &self.cur_path,
            UploadSlot::Old => self.old_path.as_deref().unwrap_or(&self.cur_path),
        }
    }

    /// Wire representation for `differential.creatediff`.
    pub fn to_payload(&self, commit_hash: &str) -> ChangePayload {
        let mut metadata = BTreeMap::new();
        for upload in &self.uploads {
            let slot = upload.slot.as_str();
            if let Some(phid) = &upload.phid {
                metadata.insert(format!("{}:binary-phid", slot), json!(phid));
            }
            metadata.insert(format!("{}:file:size", slot), json!(upload.bytes.len()));
            metadata.insert(format!("{}:file:mime-type", slot), json!(upload.mime));
        }

        ChangePayload {
            metadata,
            old_path: self.old_path.clone(),
            current_path: self.cur_path.clone(),
            away_paths: self.away_paths.clone(),
            old_properties: file_mode_properties(&self.old_mode),
            new_properties: file_mode_properties(&self.cur_mode),
            commit_hash: commit_hash.to_string(),
            kind: self.kind.code(),
            file_type: self.file_type.code(),
            hunks: self.hunks.iter().map(HunkPayload::from).collect(),
        }
    }
}

fn file_mode_properties(mode: &Option<String>) -> BTreeMap<String, String> {
    mode.iter()
        .map(|mode| ("unix:filemode".to_string(), mode.clone()))
        .collect()
}

/// One entry of the `changes` array sent to the review system.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePayload {
    pub metadata: BTreeMap<String, Value>,
    pub old_path: Option<String>,
    pub current_path: String,
    pub away_paths: Vec<String>,
    pub old_properties: BTreeMap<String, String>,
    pub new_properties: BTreeMap<String, String>,
    pub commit_hash: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub file_type: u8,
    pub hunks: Vec<HunkPayload>,
}

/// Wire representation of a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkPayload {
    pub old_offset: usize,
    pub old_length: usize,
    pub new_offset: usize,
    pub new_length: usize,
    pub add_lines: usize,
    pub del_lines: usize,
    pub is_missing_old_newline: bool,
    pub is_missing_new_newline: bool,
    pub corpus: String,
}

impl From<&Hunk> for HunkPayload {
    fn from(hunk: &Hunk) -> Self {
        Self {
            old_offset: hunk.old_offset,
            old_length: hunk.old_length,
            new_offset: hunk.new_offset,
            new_length: hunk.new_length,
            add_lines: hunk.added,
            del_lines: hunk.deleted,
            is_missing_old_newline: !hunk.old_eof_newline,
            is_missing_new_newline: !hunk.new_eof_newline,
            corpus: hunk.corpus.clone(),
        }
    }
}
