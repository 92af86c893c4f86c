//! Typed Conduit calls used by the commands.

use super::cache::{LookupCache, MemoryCache};
use super::ConduitApi;
use crate::error::{PhabError, Result};
use crate::stack::{EditTransaction, RevisionEdit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Id and PHID of a freshly created diff.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedDiff {
    #[serde(rename = "diffid")]
    pub id: u64,
    pub phid: String,
}

/// Id and PHID of an edited revision.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionHandle {
    pub id: u64,
    pub phid: String,
}

/// A revision as returned by `differential.revision.search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: u64,
    pub phid: String,
    pub title: String,
    /// Status value, e.g. `needs-review` or `abandoned`.
    pub status: String,
    /// Revision PHID to the PHIDs of its parents.
    pub stack_graph: BTreeMap<String, Vec<String>>,
}

impl Revision {
    pub fn is_abandoned(&self) -> bool {
        self.status == "abandoned"
    }

    /// `D<id>` display name.
    pub fn name(&self) -> String {
        format!("D{}", self.id)
    }
}

#[derive(Deserialize)]
struct RawRevision {
    id: u64,
    phid: String,
    fields: RawRevisionFields,
}

#[derive(Deserialize)]
struct RawRevisionFields {
    #[serde(default)]
    title: String,
    status: RawStatus,
    #[serde(rename = "stackGraph", default)]
    stack_graph: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct RawStatus {
    value: String,
}

impl From<RawRevision> for Revision {
    fn from(raw: RawRevision) -> Self {
        Self {
            id: raw.id,
            phid: raw.phid,
            title: raw.fields.title,
            status: raw.fields.status.value,
            stack_graph: raw.fields.stack_graph,
        }
    }
}

#[derive(Deserialize)]
struct SearchResult {
    data: Vec<RawRevision>,
}

#[derive(Deserialize)]
struct EditResult {
    object: RevisionHandle,
}

#[derive(Deserialize)]
struct Allocation {
    upload: bool,
    #[serde(rename = "filePHID")]
    file_phid: Option<String>,
}

#[derive(Deserialize)]
struct Chunk {
    complete: bool,
    #[serde(rename = "byteStart", deserialize_with = "number_or_string")]
    byte_start: usize,
    #[serde(rename = "byteEnd", deserialize_with = "number_or_string")]
    byte_end: usize,
}

// Chunk offsets arrive as strings from some server versions.
fn number_or_string<'de, D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<usize, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| serde::de::Error::custom("offset out of range")),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid offset {}", other))),
    }
}

/// High-level Phabricator client over a [`ConduitApi`] transport.
pub struct Phabricator<C: ConduitApi, K: LookupCache = MemoryCache> {
    conduit: C,
    cache: K,
}

impl<C: ConduitApi> Phabricator<C, MemoryCache> {
    pub fn new(conduit: C) -> Self {
        Self::with_cache(conduit, MemoryCache::new())
    }
}

impl<C: ConduitApi, K: LookupCache> Phabricator<C, K> {
    pub fn with_cache(conduit: C, cache: K) -> Self {
        Self { conduit, cache }
    }

    /// Raw method call.
    pub fn call(&self, method: &str, args: Value) -> Result<Value> {
        debug!(method, "conduit call");
        self.conduit.call(method, args)
    }

    fn call_as<T: DeserializeOwned>(&self, method: &str, args: Value) -> Result<T> {
        let value = self.call(method, args)?;
        serde_json::from_value(value).map_err(|e| {
            PhabError::TransportError(format!("unexpected {} response: {}", method, e))
        })
    }

    /// `differential.creatediff`.
    pub fn create_diff(&self, args: Value) -> Result<CreatedDiff> {
        self.call_as("differential.creatediff", args)
    }

    /// `differential.setdiffproperty`. `data` is sent JSON-encoded.
    pub fn set_diff_property(&self, diff_id: u64, name: &str, data: &Value) -> Result<()> {
        self.call(
            "differential.setdiffproperty",
            json!({
                "diff_id": diff_id,
                "name": name,
                "data": data.to_string(),
            }),
        )?;
        Ok(())
    }

    /// Create a revision, or edit the one named by `revision`.
    pub fn edit_revision(
        &self,
        revision: Option<&str>,
        transactions: &[EditTransaction],
    ) -> Result<RevisionHandle> {
        let mut args = json!({ "transactions": transactions });
        if let Some(revision) = revision {
            args["objectIdentifier"] = json!(revision);
        }
        let result: EditResult = self.call_as("differential.revision.edit", args)?;
        self.cache
            .set(&format!("rev-id-{}", result.object.id), &result.object.phid);
        Ok(result.object)
    }

    /// Apply one reconciliation edit.
    pub fn apply_transactions(&self, edit: &RevisionEdit) -> Result<()> {
        let args = serde_json::to_value(edit)
            .map_err(|e| PhabError::TransportError(format!("cannot encode transactions: {}", e)))?;
        self.call("differential.revision.edit", args)?;
        Ok(())
    }

    /// Revisions with the given ids.
    pub fn search_revisions_by_ids(&self, ids: &[u64]) -> Result<Vec<Revision>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        self.search_revisions(json!({ "ids": ids }))
    }

    /// Revisions with the given PHIDs.
    pub fn search_revisions_by_phids(&self, phids: &[String]) -> Result<Vec<Revision>> {
        let mut phids = phids.to_vec();
        phids.sort();
        phids.dedup();
        self.search_revisions(json!({ "phids": phids }))
    }

    fn search_revisions(&self, constraints: Value) -> Result<Vec<Revision>> {
        let result: SearchResult = self.call_as(
            "differential.revision.search",
            json!({ "constraints": constraints }),
        )?;
        let revisions: Vec<Revision> = result.data.into_iter().map(Revision::from).collect();
        for revision in &revisions {
            self.cache
                .set(&format!("rev-id-{}", revision.id), &revision.phid);
        }
        Ok(revisions)
    }

    /// PHIDs of the revisions `ids`, in the same order.
    ///
    /// Cached lookups are not repeated. An unknown id is a user error.
    pub fn ids_to_phids(&self, ids: &[u64]) -> Result<Vec<String>> {
        let missing: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| self.cache.get(&format!("rev-id-{}", id)).is_none())
            .collect();
        if !missing.is_empty() {
            self.search_revisions_by_ids(&missing)?;
        }

        ids.iter()
            .map(|id| {
                self.cache
                    .get(&format!("rev-id-{}", id))
                    .ok_or_else(|| PhabError::UserError(format!("revision D{} not found", id)))
            })
            .collect()
    }

    /// Upload `data` as a file named `name`, returning its PHID.
    ///
    /// Empty buffers are not uploaded and yield `None`. Files the server
    /// wants chunked are sent chunk by chunk.
    pub fn upload_file(&self, data: &[u8], name: &str) -> Result<Option<String>> {
        if data.is_empty() {
            return Ok(None);
        }

        let hash = Sha256::digest(data)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>();
        let allocation: Allocation = self.call_as(
            "file.allocate",
            json!({
                "name": name,
                "contentLength": data.len(),
                "contentHash": hash,
            }),
        )?;

        if !allocation.upload {
            return Ok(allocation.file_phid);
        }

        match allocation.file_phid {
            None => {
                let phid: String = self.call_as(
                    "file.upload",
                    json!({ "data_base64": BASE64.encode(data), "name": name }),
                )?;
                Ok(Some(phid))
            }
            Some(phid) => {
                let chunks: Vec<Chunk> =
                    self.call_as("file.querychunks", json!({ "filePHID": phid }))?;
                for chunk in chunks.iter().filter(|chunk| !chunk.complete) {
                    let end = chunk.byte_end.min(data.len());
                    let start = chunk.byte_start.min(end);
                    self.call(
                        "file.uploadchunk",
                        json!({
                            "filePHID": phid,
                            "byteStart": chunk.byte_start,
                            "data": BASE64.encode(&data[start..end]),
                            "dataEncoding": "base64",
                        }),
                    )?;
                }
                Ok(Some(phid))
            }
        }
    }
}

/// Last component of `path`, used as the uploaded file's name.
pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeConduit;

    #[test]
    fn test_ids_to_phids_uses_cache() {
        let conduit = FakeConduit::new(|method, args| match method {
            "differential.revision.search" => {
                let ids = args["constraints"]["ids"].as_array().unwrap().clone();
                let data: Vec<Value> = ids
                    .iter()
                    .map(|id| {
                        json!({
                            "id": id,
                            "phid": format!("PHID-DREV-{}", id),
                            "fields": {"title": "t", "status": {"value": "needs-review"}},
                        })
                    })
                    .collect();
                Ok(json!({ "data": data }))
            }
            other => panic!("unexpected {}", other),
        });
        let phab = Phabricator::new(&conduit);

        assert_eq!(
            phab.ids_to_phids(&[2, 1]).unwrap(),
            vec!["PHID-DREV-2", "PHID-DREV-1"]
        );
        assert_eq!(phab.ids_to_phids(&[1]).unwrap(), vec!["PHID-DREV-1"]);
        assert_eq!(conduit.calls_to("differential.revision.search").len(), 1);
    }

    #[test]
    fn test_ids_to_phids_unknown_revision() {
        let conduit = FakeConduit::new(|_, _| Ok(json!({ "data": [] })));
        let phab = Phabricator::new(&conduit);
        assert!(matches!(
            phab.ids_to_phids(&[9]),
            Err(PhabError::UserError(msg)) if msg.contains("D9")
        ));
    }

    #[test]
    fn test_search_parses_stack_graph_and_status() {
        let conduit = FakeConduit::new(|_, _| {
            Ok(json!({ "data": [{
                "id": 5,
                "phid": "PHID-DREV-5",
                "fields": {
                    "title": "Fix parser",
                    "status": {"value": "abandoned"},
                    "stackGraph": {"PHID-DREV-5": ["PHID-DREV-4"], "PHID-DREV-4": []},
                },
            }]}))
        });
        let phab = Phabricator::new(&conduit);
        let revisions = phab.search_revisions_by_ids(&[5]).unwrap();

        assert_eq!(revisions.len(), 1);
        assert!(revisions[0].is_abandoned());
        assert_eq!(revisions[0].name(), "D5");
        assert_eq!(revisions[0].stack_graph["PHID-DREV-5"], vec!["PHID-DREV-4"]);
    }

    #[test]
    fn test_upload_small_file_in_one_call() {
        let conduit = FakeConduit::new(|method, args| match method {
            "file.allocate" => {
                assert_eq!(args["contentLength"], 3);
                assert_eq!(
                    args["contentHash"],
                    "039058c6f2c0cb492c533b0a4d14ef77cc0f78abccced5287d84a1a2011cfb81"
                );
                Ok(json!({ "upload": true, "filePHID": null }))
            }
            "file.upload" => {
                assert_eq!(args["data_base64"], "AQID");
                Ok(json!("PHID-FILE-1"))
            }
            other => panic!("unexpected {}", other),
        });
        let phab = Phabricator::new(&conduit);

        let phid = phab.upload_file(&[1, 2, 3], "logo.png").unwrap();
        assert_eq!(phid.as_deref(), Some("PHID-FILE-1"));
    }

    #[test]
    fn test_upload_sends_incomplete_chunks_only() {
        let conduit = FakeConduit::new(|method, _| match method {
            "file.allocate" => Ok(json!({ "upload": true, "filePHID": "PHID-FILE-big" })),
            "file.querychunks" => Ok(json!([
                {"complete": true, "byteStart": "0", "byteEnd": "2"},
                {"complete": false, "byteStart": "2", "byteEnd": "4"},
            ])),
            "file.uploadchunk" => Ok(Value::Null),
            other => panic!("unexpected {}", other),
        });
        let phab = Phabricator::new(&conduit);

        let phid = phab.upload_file(b"abcd", "blob.bin").unwrap();
        assert_eq!(phid.as_deref(), Some("PHID-FILE-big"));

        let chunks = conduit.calls_to("file.uploadchunk");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0]["byteStart"], 2);
        assert_eq!(chunks[0]["data"], "Y2Q=");
    }

    #[test]
    fn test_upload_skips_empty_and_already_known_files() {
        let conduit = FakeConduit::new(|_, _| Ok(json!({ "upload": false, "filePHID": "PHID-FILE-known" })));
        let phab = Phabricator::new(&conduit);

        assert_eq!(phab.upload_file(&[], "empty.bin").unwrap(), None);
        assert!(conduit.calls().is_empty());
        assert_eq!(
            phab.upload_file(b"x", "x.bin").unwrap().as_deref(),
            Some("PHID-FILE-known")
        );
    }

    #[test]
    fn test_edit_revision_passes_object_identifier() {
        let conduit = FakeConduit::new(|_, _| {
            Ok(json!({ "object": {"id": 12, "phid": "PHID-DREV-12"}, "transactions": [] }))
        });
        let phab = Phabricator::new(&conduit);

        let handle = phab
            .edit_revision(Some("D12"), &[EditTransaction::Title("New title".to_string())])
            .unwrap();
        assert_eq!(handle.id, 12);

        let calls = conduit.calls_to("differential.revision.edit");
        assert_eq!(calls[0]["objectIdentifier"], "D12");
        assert_eq!(calls[0]["transactions"][0]["type"], "title");
    }

    #[test]
    fn test_file_name_takes_last_component() {
        assert_eq!(file_name("assets/img/logo.png"), "logo.png");
        assert_eq!(file_name("top.bin"), "top.bin");
    }
}
