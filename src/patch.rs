// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Edit records describing one committed change to the values document.

use crate::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of an [`EditRecord`].
///
/// There is deliberately no removal kind: a removal is a [`EditOp::Replace`] whose value is
/// absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOp {
    Add,
    Replace,
}

/// One unit of structural change between two snapshots.
///
/// Records only live for the duration of a single values commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    pub op: EditOp,
    pub path: FieldPath,
    /// The new value at `path`; `None` when the path no longer holds anything.
    pub value: Option<Value>,
}

impl EditRecord {
    pub fn add(path: FieldPath, value: Value) -> Self {
        Self {
            op: EditOp::Add,
            path,
            value: Some(value),
        }
    }

    pub fn replace(path: FieldPath, value: Option<Value>) -> Self {
        Self {
            op: EditOp::Replace,
            path,
            value,
        }
    }

    /// True if this record clears whatever was at its path.
    pub fn is_removal(&self) -> bool {
        self.op == EditOp::Replace && self.value.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removal_is_a_replace_without_value() {
        let path = FieldPath::parse("a.b").unwrap();
        assert!(EditRecord::replace(path.clone(), None).is_removal());
        assert!(!EditRecord::replace(path.clone(), Some(json!(null))).is_removal());
        assert!(!EditRecord::add(path, json!(1)).is_removal());
    }

    #[test]
    fn records_serialize_with_dotted_paths() {
        let record = EditRecord::add(FieldPath::parse("a.0").unwrap(), json!("x"));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "op": "add", "path": "a.0", "value": "x" })
        );
    }
}
