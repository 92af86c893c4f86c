//! Local commit model.

use crate::error::{PhabError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Matches the trailer linking a commit to its remote revision.
static REVISION_TRAILER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Differential Revision:\s*(?:\S*/)?D(\d+)\s*$")
        .expect("Invalid revision trailer regex")
});

/// Field separator used in the `git show` format string.
pub(crate) const FIELD_SEPARATOR: char = '\u{1f}';

/// `git show --format` producing the fields [`Commit::from_show_output`] expects.
pub(crate) const SHOW_FORMAT: &str = "%H%x1f%P%x1f%T%x1f%an%x1f%ae%x1f%at%x1f%B";

/// One local commit of the stack being submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub node: String,
    pub parent: String,
    pub tree_hash: Option<String>,
    pub author_name: String,
    pub author_email: String,
    /// Author date, seconds since the epoch.
    pub author_date_epoch: i64,
    pub title: String,
    pub body: String,
    /// Numeric revision id from the `Differential Revision:` trailer.
    pub rev_id: Option<u64>,
}

impl Commit {
    /// Parse one record produced with [`SHOW_FORMAT`].
    pub fn from_show_output(output: &str) -> Result<Self> {
        let fields: Vec<&str> = output.splitn(7, FIELD_SEPARATOR).collect();
        let &[node, parents, tree, author_name, author_email, date, message] = fields.as_slice()
        else {
            return Err(PhabError::ParseError(format!(
                "unexpected commit description: '{}'",
                output.trim()
            )));
        };

        let parents: Vec<&str> = parents.split_whitespace().collect();
        let parent = match parents.as_slice() {
            [parent] => parent.to_string(),
            [] => {
                return Err(PhabError::UserError(format!(
                    "commit {} is a root commit and has no base to diff against",
                    short_node(node)
                )));
            }
            _ => {
                return Err(PhabError::UserError(format!(
                    "commit {} is a merge commit. Only linear stacks can be submitted.",
                    short_node(node)
                )));
            }
        };

        let author_date_epoch = date.trim().parse::<i64>().map_err(|e| {
            PhabError::ParseError(format!("invalid author date '{}': {}", date.trim(), e))
        })?;

        let message = message.trim();
        let (title, body) = match message.split_once('\n') {
            Some((title, body)) => (title.trim().to_string(), body.trim().to_string()),
            None => (message.to_string(), String::new()),
        };

        Ok(Self {
            node: node.trim().to_string(),
            parent,
            tree_hash: Some(tree.to_string()).filter(|t| !t.is_empty()),
            author_name: author_name.to_string(),
            author_email: author_email.to_string(),
            author_date_epoch,
            rev_id: parse_revision_id(message),
            title,
            body,
        })
    }

    /// Full commit message (title, blank line, body).
    pub fn message(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n\n{}", self.title, self.body)
        }
    }

    /// Display name: short hash plus title.
    pub fn name(&self) -> String {
        format!("{} {}", short_node(&self.node), self.title)
    }
}

/// Extract the revision id from a `Differential Revision:` trailer.
pub fn parse_revision_id(message: &str) -> Option<u64> {
    REVISION_TRAILER_REGEX
        .captures_iter(message)
        .last()
        .and_then(|caps| caps[1].parse().ok())
}

/// Shorten a full 40-character hex hash to 12 characters.
pub fn short_node(node: &str) -> &str {
    if node.len() == 40 && node.chars().all(|c| c.is_ascii_hexdigit()) {
        &node[..12]
    } else {
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(parents: &str, message: &str) -> String {
        [
            "a".repeat(40).as_str(),
            parents,
            "treehash",
            "Jo Doe",
            "jo@example.com",
            "1700000000",
            message,
        ]
        .join("\u{1f}")
    }

    #[test]
    fn test_parse_commit_with_revision_trailer() {
        let output = record(
            &"b".repeat(40),
            "Bug 1 - Fix it\n\nLonger body.\n\nDifferential Revision: https://phab.example.com/D42\n",
        );
        let commit = Commit::from_show_output(&output).unwrap();

        assert_eq!(commit.parent, "b".repeat(40));
        assert_eq!(commit.title, "Bug 1 - Fix it");
        assert_eq!(
            commit.body,
            "Longer body.\n\nDifferential Revision: https://phab.example.com/D42"
        );
        assert_eq!(commit.rev_id, Some(42));
        assert_eq!(commit.author_date_epoch, 1_700_000_000);
        assert_eq!(commit.tree_hash.as_deref(), Some("treehash"));
    }

    #[test]
    fn test_parse_commit_without_body() {
        let commit = Commit::from_show_output(&record("c0ffee", "Just a title\n")).unwrap();
        assert_eq!(commit.title, "Just a title");
        assert!(commit.body.is_empty());
        assert_eq!(commit.rev_id, None);
        assert_eq!(commit.message(), "Just a title");
    }

    #[test]
    fn test_merge_commit_is_rejected() {
        let err = Commit::from_show_output(&record("aaa bbb", "Merge")).unwrap_err();
        assert!(matches!(err, PhabError::UserError(_)));
        assert!(err.to_string().contains("merge commit"));
    }

    #[test]
    fn test_truncated_record_is_parse_error() {
        let err = Commit::from_show_output("abc\u{1f}def").unwrap_err();
        assert!(matches!(err, PhabError::ParseError(_)));
    }

    #[test]
    fn test_parse_revision_id_variants() {
        assert_eq!(parse_revision_id("Differential Revision: D7"), Some(7));
        assert_eq!(
            parse_revision_id("x\nDifferential Revision: https://a.b/c/D123\n"),
            Some(123)
        );
        assert_eq!(parse_revision_id("Mentions D5 inline only"), None);
    }

    #[test]
    fn test_short_node() {
        let node = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(short_node(node), "0123456789ab");
        assert_eq!(short_node("HEAD"), "HEAD");
    }
}
