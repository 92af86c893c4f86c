//! Creating the remote diff object.

use super::builder::Diff;
use crate::conduit::{ConduitApi, CreatedDiff, LookupCache, Phabricator};
use crate::error::Result;
use crate::vcs::Commit;
use serde_json::json;

/// Creation method reported to the review system.
pub const CREATION_METHOD: &str = "phabstack-git";

/// Repository facts sent along with every diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitContext {
    pub repository_phid: Option<String>,
    /// Local repository path.
    pub source_path: String,
}

impl Diff {
    /// Create the diff remotely and attach the local commit metadata.
    ///
    /// Changes are sent sorted by current path. On success the remote id and
    /// PHID are stored on the diff.
    pub fn submit<C: ConduitApi, K: LookupCache>(
        &mut self,
        phab: &Phabricator<C, K>,
        commit: &Commit,
        message: &str,
        context: &SubmitContext,
    ) -> Result<CreatedDiff> {
        let mut args = json!({
            "changes": self.payload(&commit.node),
            "sourceControlSystem": "git",
            "sourceControlPath": "/",
            "sourceControlBaseRevision": commit.parent,
            "creationMethod": CREATION_METHOD,
            "lintStatus": "none",
            "unitStatus": "none",
            "sourcePath": context.source_path,
            "branch": "HEAD",
        });
        if let Some(phid) = &context.repository_phid {
            args["repositoryPHID"] = json!(phid);
        }

        let created = phab.create_diff(args)?;
        self.id = Some(created.id);
        self.phid = Some(created.phid.clone());

        phab.set_diff_property(created.id, "local:commits", &local_commits(commit, message))?;

        Ok(created)
    }
}

fn local_commits(commit: &Commit, message: &str) -> serde_json::Value {
    let mut entry = json!({
        "author": commit.author_name,
        "authorEmail": commit.author_email,
        "time": commit.author_date_epoch,
        "summary": commit.title,
        "message": message,
        "commit": commit.node,
        "parents": [commit.parent],
    });
    if let Some(tree) = &commit.tree_hash {
        entry["tree"] = json!(tree);
    }

    let mut data = serde_json::Map::new();
    data.insert(commit.node.clone(), entry);
    serde_json::Value::Object(data)
}
