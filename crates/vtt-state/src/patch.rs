//! Ordered operation batches.

use crate::Op;
use serde::{Deserialize, Serialize};

/// An ordered batch of operations applied atomically.
///
/// Ordering is significant: later operations may address locations created
/// by earlier ones. On the wire a batch is a plain JSON array of operations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    ops: Vec<Op>,
}

impl Patch {
    /// Create an empty batch.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch with the given operations.
    #[inline]
    pub fn with_ops(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// Add an operation to this batch (builder pattern).
    #[inline]
    pub fn with_op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    /// Push an operation onto this batch.
    #[inline]
    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Get the operations in this batch.
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Check if this batch is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Get the number of operations in this batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Iterate over the operations.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter()
    }
}

impl FromIterator<Op> for Patch {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Patch {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl From<Vec<Op>> for Patch {
    fn from(ops: Vec<Op>) -> Self {
        Self { ops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn builder_preserves_order() {
        let patch = Patch::new()
            .with_op(Op::set(path!("a"), json!(1)))
            .with_op(Op::unset(path!("b")));

        assert_eq!(patch.len(), 2);
        assert_eq!(patch.ops()[0].name(), "set");
        assert_eq!(patch.ops()[1].name(), "unset");
    }

    #[test]
    fn serde_is_a_plain_array() {
        let patch = Patch::with_ops(vec![
            Op::set(path!("name"), json!("Mira")),
            Op::inc(path!("round"), json!(1)),
        ]);

        let encoded = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            encoded,
            json!([
                {"operation": "set", "path": "name", "value": "Mira"},
                {"operation": "inc", "path": "round", "value": 1}
            ])
        );
        let decoded: Patch = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, patch);
    }
}
