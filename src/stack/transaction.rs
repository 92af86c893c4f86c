//! `differential.revision.edit` transactions.

use serde::Serialize;

/// One edit applied to a revision.
///
/// Serialises as `{"type": "...", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum EditTransaction {
    #[serde(rename = "children.set")]
    ChildrenSet(Vec<String>),
    #[serde(rename = "children.remove")]
    ChildrenRemove(Vec<String>),
    #[serde(rename = "parents.set")]
    ParentsSet(Vec<String>),
    #[serde(rename = "abandon")]
    Abandon(bool),
    #[serde(rename = "update")]
    Update(String),
    #[serde(rename = "title")]
    Title(String),
    #[serde(rename = "summary")]
    Summary(String),
}

impl EditTransaction {
    pub fn kind(&self) -> &'static str {
        match self {
            EditTransaction::ChildrenSet(_) => "children.set",
            EditTransaction::ChildrenRemove(_) => "children.remove",
            EditTransaction::ParentsSet(_) => "parents.set",
            EditTransaction::Abandon(_) => "abandon",
            EditTransaction::Update(_) => "update",
            EditTransaction::Title(_) => "title",
            EditTransaction::Summary(_) => "summary",
        }
    }
}

/// Ordered transactions for one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionEdit {
    /// Revision PHID or `D<id>`.
    #[serde(rename = "objectIdentifier")]
    pub revision: String,
    pub transactions: Vec<EditTransaction>,
}

impl RevisionEdit {
    pub fn is_abandon(&self) -> bool {
        self.transactions
            .iter()
            .any(|t| matches!(t, EditTransaction::Abandon(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transactions_serialise_as_type_value_pairs() {
        let edit = RevisionEdit {
            revision: "PHID-DREV-a".to_string(),
            transactions: vec![
                EditTransaction::ChildrenRemove(vec!["PHID-DREV-b".to_string()]),
                EditTransaction::Abandon(true),
                EditTransaction::ChildrenSet(vec![]),
            ],
        };

        assert_eq!(
            serde_json::to_value(&edit).unwrap(),
            json!({
                "objectIdentifier": "PHID-DREV-a",
                "transactions": [
                    {"type": "children.remove", "value": ["PHID-DREV-b"]},
                    {"type": "abandon", "value": true},
                    {"type": "children.set", "value": []},
                ]
            })
        );
        assert!(edit.is_abandon());
    }

    #[test]
    fn test_kind_matches_wire_name() {
        let update = EditTransaction::Update("PHID-DIFF-1".to_string());
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["type"], update.kind());
    }
}
