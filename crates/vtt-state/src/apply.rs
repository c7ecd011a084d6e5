//! Batch application of patch operations.
//!
//! `apply_ops` is a pure function: it clones the input document once, folds
//! the batch over the clone in order, and returns the new document only if
//! every operation succeeds. A failure anywhere discards the partial clone,
//! so the previously committed document is never observable in a half-mutated
//! state.

use crate::error::{value_type_name, StateError, StateResult};
use crate::{Op, Path, Seg};
use serde_json::{Map, Value};

/// Apply a batch of operations to a document (pure function).
///
/// Operations are applied strictly in batch order, so later operations may
/// address locations created by earlier ones. The first failing operation
/// aborts the batch with [`StateError::OperationFailed`] naming the
/// operation, its index, and its path.
///
/// # Examples
///
/// ```
/// use vtt_state::{apply_ops, Op, path};
/// use serde_json::json;
///
/// let doc = json!({"characters": [], "actors": [], "items": []});
/// let ops = vec![
///     Op::push(path!("characters"), json!({"name": "Mira", "hp": 10})),
///     Op::inc(path!("characters", 0, "hp"), json!(-3)),
/// ];
///
/// let next = apply_ops(&doc, &ops).unwrap();
/// assert_eq!(next["characters"][0]["hp"], 7);
/// assert_eq!(doc["characters"], json!([])); // input untouched
/// ```
pub fn apply_ops(doc: &Value, ops: &[Op]) -> StateResult<Value> {
    let mut result = doc.clone();

    for (index, op) in ops.iter().enumerate() {
        apply_op(&mut result, op).map_err(|source| StateError::OperationFailed {
            index,
            op: op.name(),
            path: op.path().clone(),
            source: Box::new(source),
        })?;
    }

    Ok(result)
}

/// Apply a single operation to a document in place.
pub fn apply_op(doc: &mut Value, op: &Op) -> StateResult<()> {
    match op {
        Op::Set { path, value } => apply_set(doc, path, value.clone()),
        Op::Unset { path } => apply_unset(doc, path),
        Op::Inc { path, value } => apply_inc(doc, path, value),
        Op::Push { path, value } => apply_push(doc, path, value.clone()),
        Op::Pull { path, value } => apply_pull(doc, path, value),
    }
}

/// The resolved parent container and final key of a path.
enum Slot<'a> {
    Object(&'a mut Map<String, Value>, String),
    Array(&'a mut Vec<Value>, usize),
}

/// Walk all but the last segment of `path`, synthesizing missing
/// intermediates, and return the parent container plus the final key.
///
/// A missing or null intermediate becomes an array when the next segment is
/// an index and an object otherwise. An index segment applied to an existing
/// object falls back to the stringified key, and an array is padded with
/// nulls up to a not-yet-existing index. The only failure mode is an
/// existing scalar occupying a slot where a container is required.
fn resolve_slot<'a>(doc: &'a mut Value, path: &Path) -> StateResult<Slot<'a>> {
    let segs = path.segments();
    let (last, parents) = segs
        .split_last()
        .ok_or_else(|| StateError::invalid_operation("operation path is empty"))?;

    let mut current = doc;
    for (depth, seg) in parents.iter().enumerate() {
        current = descend(current, seg, &segs[depth + 1], path, depth)?;
    }

    let parent_path = || path.prefix(segs.len() - 1);
    match last {
        Seg::Key(key) => {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            match current {
                Value::Object(map) => Ok(Slot::Object(map, key.clone())),
                other => Err(StateError::type_mismatch(
                    parent_path(),
                    "object",
                    value_type_name(other),
                )),
            }
        }
        Seg::Index(idx) => {
            if current.is_null() {
                *current = Value::Array(Vec::new());
            }
            match current {
                Value::Object(map) => Ok(Slot::Object(map, idx.to_string())),
                Value::Array(arr) => Ok(Slot::Array(arr, *idx)),
                other => Err(StateError::type_mismatch(
                    parent_path(),
                    "array",
                    value_type_name(other),
                )),
            }
        }
    }
}

/// Move one level down from `current` through `seg`, creating the slot if it
/// does not exist yet. `next` decides the shape of a synthesized container.
fn descend<'a>(
    current: &'a mut Value,
    seg: &Seg,
    next: &Seg,
    full: &Path,
    depth: usize,
) -> StateResult<&'a mut Value> {
    match seg {
        Seg::Key(key) => {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            match current {
                Value::Object(map) => {
                    let entry = map.entry(key.clone()).or_insert(Value::Null);
                    if entry.is_null() {
                        *entry = empty_container_for(next);
                    }
                    Ok(entry)
                }
                other => Err(StateError::type_mismatch(
                    full.prefix(depth),
                    "object",
                    value_type_name(other),
                )),
            }
        }
        Seg::Index(idx) => {
            if current.is_null() {
                *current = Value::Array(Vec::new());
            }
            match current {
                Value::Object(map) => {
                    let entry = map.entry(idx.to_string()).or_insert(Value::Null);
                    if entry.is_null() {
                        *entry = empty_container_for(next);
                    }
                    Ok(entry)
                }
                Value::Array(arr) => {
                    if *idx >= arr.len() {
                        arr.resize(*idx + 1, Value::Null);
                    }
                    let slot = &mut arr[*idx];
                    if slot.is_null() {
                        *slot = empty_container_for(next);
                    }
                    Ok(slot)
                }
                other => Err(StateError::type_mismatch(
                    full.prefix(depth),
                    "array",
                    value_type_name(other),
                )),
            }
        }
    }
}

fn empty_container_for(next: &Seg) -> Value {
    match next {
        Seg::Index(_) => Value::Array(Vec::new()),
        Seg::Key(_) => Value::Object(Map::new()),
    }
}

fn apply_set(doc: &mut Value, path: &Path, value: Value) -> StateResult<()> {
    let slot = resolve_slot(doc, path)?;
    assign(slot, value);
    Ok(())
}

/// Assign into a resolved slot. Array assignment beyond the end pads the
/// array with nulls, matching the dynamic-index semantics of the wire format.
fn assign(slot: Slot<'_>, value: Value) {
    match slot {
        Slot::Object(map, key) => {
            map.insert(key, value);
        }
        Slot::Array(arr, idx) => {
            if idx >= arr.len() {
                arr.resize(idx + 1, Value::Null);
            }
            arr[idx] = value;
        }
    }
}

fn apply_unset(doc: &mut Value, path: &Path) -> StateResult<()> {
    match resolve_slot(doc, path)? {
        Slot::Object(map, key) => {
            map.remove(&key);
        }
        Slot::Array(arr, idx) => {
            if idx < arr.len() {
                arr.remove(idx);
            }
        }
    }
    Ok(())
}

fn apply_inc(doc: &mut Value, path: &Path, delta: &Value) -> StateResult<()> {
    let slot = resolve_slot(doc, path)?;

    let base = match &slot {
        Slot::Object(map, key) => map.get(key.as_str()),
        Slot::Array(arr, idx) => arr.get(*idx),
    }
    .and_then(as_number)
    .cloned()
    .unwrap_or_else(|| 0.into());
    let delta = as_number(delta).cloned().unwrap_or_else(|| 1.into());

    let sum = add_numbers(path, &base, &delta)?;
    assign(slot, sum);
    Ok(())
}

fn apply_push(doc: &mut Value, path: &Path, value: Value) -> StateResult<()> {
    let slot = resolve_slot(doc, path)?;
    let entry = match slot {
        Slot::Object(map, key) => map.entry(key).or_insert(Value::Null),
        Slot::Array(arr, idx) => {
            if idx >= arr.len() {
                arr.resize(idx + 1, Value::Null);
            }
            &mut arr[idx]
        }
    };

    match entry {
        Value::Array(arr) => arr.push(value),
        other => *other = Value::Array(vec![value]),
    }
    Ok(())
}

fn apply_pull(doc: &mut Value, path: &Path, value: &Value) -> StateResult<()> {
    let entry = match resolve_slot(doc, path)? {
        Slot::Object(map, key) => map.get_mut(&key),
        Slot::Array(arr, idx) => arr.get_mut(idx),
    };

    // serde_json equality is structural, so nested values match by shape.
    if let Some(Value::Array(arr)) = entry {
        if let Some(pos) = arr.iter().position(|v| v == value) {
            arr.remove(pos);
        }
    }
    Ok(())
}

fn as_number(v: &Value) -> Option<&serde_json::Number> {
    match v {
        Value::Number(n) => Some(n),
        _ => None,
    }
}

/// Add two JSON numbers, staying in integer arithmetic when both sides are
/// integers and falling back to finite-checked floats otherwise.
fn add_numbers(
    path: &Path,
    base: &serde_json::Number,
    delta: &serde_json::Number,
) -> StateResult<Value> {
    if let (Some(a), Some(b)) = (base.as_i64(), delta.as_i64()) {
        let sum = a.checked_add(b).ok_or_else(|| {
            StateError::arithmetic(path.clone(), format!("integer overflow: {a} + {b}"))
        })?;
        return Ok(Value::from(sum));
    }

    let sum = base.as_f64().unwrap_or(0.0) + delta.as_f64().unwrap_or(0.0);
    if !sum.is_finite() {
        return Err(StateError::arithmetic(
            path.clone(),
            "sum is not a finite number".to_string(),
        ));
    }
    serde_json::Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| {
            StateError::arithmetic(path.clone(), "sum is not representable".to_string())
        })
}

/// Get a reference to the value at a path, or `None` if any segment is
/// missing. Index segments fall back to stringified keys on objects, the
/// same way navigation does during writes.
pub fn get_at_path<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = doc;
    for seg in path.segments() {
        current = match seg {
            Seg::Key(key) => current.get(key)?,
            Seg::Index(idx) => match current {
                Value::Object(map) => map.get(&idx.to_string())?,
                other => other.get(idx)?,
            },
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn set_overwrites() {
        let doc = json!({"name": "old"});
        let next = apply_ops(&doc, &[Op::set(path!("name"), json!("new"))]).unwrap();
        assert_eq!(next, json!({"name": "new"}));
    }

    #[test]
    fn set_synthesizes_intermediate_chain() {
        let doc = json!({"actors": [{}, {}, {"name": "Gark"}]});
        let ops = [Op::set(path!("actors", 2, "state", "conditions", 0), json!("stunned"))];
        let next = apply_ops(&doc, &ops).unwrap();
        assert_eq!(
            next["actors"][2],
            json!({"name": "Gark", "state": {"conditions": ["stunned"]}})
        );
    }

    #[test]
    fn set_pads_sparse_array_with_nulls() {
        let doc = json!({"actors": []});
        let ops = [Op::set(path!("actors", 2, "hp"), json!(5))];
        let next = apply_ops(&doc, &ops).unwrap();
        assert_eq!(next["actors"], json!([null, null, {"hp": 5}]));
    }

    #[test]
    fn set_index_on_object_uses_string_key() {
        let doc = json!({"pluginData": {"0": "zero"}});
        let next = apply_ops(&doc, &[Op::set(path!("pluginData", 0), json!("replaced"))]).unwrap();
        assert_eq!(next["pluginData"]["0"], "replaced");
    }

    #[test]
    fn set_through_scalar_is_structural_error() {
        let doc = json!({"turnManager": "not-a-container"});
        let err = apply_ops(&doc, &[Op::set(path!("turnManager", "round"), json!(1))]).unwrap_err();
        match err {
            StateError::OperationFailed { op, source, .. } => {
                assert_eq!(op, "set");
                assert!(matches!(*source, StateError::TypeMismatch { .. }));
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn set_root_is_invalid() {
        let doc = json!({});
        let err = apply_ops(&doc, &[Op::set(Path::root(), json!({}))]).unwrap_err();
        assert!(matches!(
            err,
            StateError::OperationFailed { source, .. } if matches!(*source, StateError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn unset_object_key_and_missing_key() {
        let doc = json!({"a": 1, "b": 2});
        let next = apply_ops(
            &doc,
            &[Op::unset(path!("a")), Op::unset(path!("missing"))],
        )
        .unwrap();
        assert_eq!(next, json!({"b": 2}));
    }

    #[test]
    fn unset_array_index_shifts() {
        let doc = json!({"items": ["a", "b", "c"]});
        let next = apply_ops(&doc, &[Op::unset(path!("items", 1))]).unwrap();
        assert_eq!(next["items"], json!(["a", "c"]));

        // Out-of-range index is a no-op.
        let next = apply_ops(&doc, &[Op::unset(path!("items", 9))]).unwrap();
        assert_eq!(next["items"], json!(["a", "b", "c"]));
    }

    #[test]
    fn inc_missing_value_counts_as_zero() {
        let doc = json!({});
        let next = apply_ops(&doc, &[Op::inc(path!("round"), json!(3))]).unwrap();
        assert_eq!(next["round"], 3);
    }

    #[test]
    fn inc_non_numeric_current_counts_as_zero() {
        let doc = json!({"hp": "full"});
        let next = apply_ops(&doc, &[Op::inc(path!("hp"), json!(4))]).unwrap();
        assert_eq!(next["hp"], 4);
    }

    #[test]
    fn inc_non_numeric_delta_defaults_to_one() {
        let doc = json!({"round": 2});
        let next = apply_ops(&doc, &[Op::inc(path!("round"), Value::Null)]).unwrap();
        assert_eq!(next["round"], 3);
    }

    #[test]
    fn inc_negative_delta_decrements() {
        let doc = json!({"hp": 10});
        let next = apply_ops(&doc, &[Op::inc(path!("hp"), json!(-4))]).unwrap();
        assert_eq!(next["hp"], 6);
    }

    #[test]
    fn inc_zero_is_identity_and_inverse_restores() {
        let doc = json!({"hp": 10});
        let unchanged = apply_ops(&doc, &[Op::inc(path!("hp"), json!(0))]).unwrap();
        assert_eq!(unchanged, doc);

        let round_trip = apply_ops(
            &doc,
            &[Op::inc(path!("hp"), json!(7)), Op::inc(path!("hp"), json!(-7))],
        )
        .unwrap();
        assert_eq!(round_trip, doc);
    }

    #[test]
    fn inc_float_arithmetic() {
        let doc = json!({"weight": 1.5});
        let next = apply_ops(&doc, &[Op::inc(path!("weight"), json!(0.25))]).unwrap();
        assert!((next["weight"].as_f64().unwrap() - 1.75).abs() < 1e-9);
    }

    #[test]
    fn inc_integer_overflow_is_an_error() {
        let doc = json!({"n": i64::MAX});
        let err = apply_ops(&doc, &[Op::inc(path!("n"), json!(1))]).unwrap_err();
        assert!(matches!(
            err,
            StateError::OperationFailed { source, .. } if matches!(*source, StateError::Arithmetic { .. })
        ));
    }

    #[test]
    fn push_appends_in_order() {
        let doc = json!({"log": ["first"]});
        let next = apply_ops(
            &doc,
            &[Op::push(path!("log"), json!("second")), Op::push(path!("log"), json!("third"))],
        )
        .unwrap();
        assert_eq!(next["log"], json!(["first", "second", "third"]));
    }

    #[test]
    fn push_initializes_missing_slot() {
        let doc = json!({});
        let next = apply_ops(&doc, &[Op::push(path!("conditions"), json!("prone"))]).unwrap();
        assert_eq!(next["conditions"], json!(["prone"]));
    }

    #[test]
    fn push_resets_non_array_slot() {
        let doc = json!({"conditions": "oops"});
        let next = apply_ops(&doc, &[Op::push(path!("conditions"), json!("prone"))]).unwrap();
        assert_eq!(next["conditions"], json!(["prone"]));
    }

    #[test]
    fn pull_removes_first_structural_match() {
        let doc = json!({"effects": [{"id": "e1", "tag": "x"}, {"id": "e2"}, {"id": "e1", "tag": "x"}]});
        let next = apply_ops(
            &doc,
            &[Op::pull(path!("effects"), json!({"tag": "x", "id": "e1"}))],
        )
        .unwrap();
        // Key order differs from the stored element; equality is structural.
        assert_eq!(next["effects"], json!([{"id": "e2"}, {"id": "e1", "tag": "x"}]));
    }

    #[test]
    fn pull_is_noop_on_missing_or_non_array() {
        let doc = json!({"name": "Mira"});
        let next = apply_ops(
            &doc,
            &[Op::pull(path!("missing"), json!(1)), Op::pull(path!("name"), json!("Mira"))],
        )
        .unwrap();
        assert_eq!(next["name"], "Mira");
    }

    #[test]
    fn push_then_pull_round_trips() {
        let doc = json!({"items": [{"id": "sword"}]});
        let value = json!({"id": "potion", "qty": 2});
        let ops = [
            Op::push(path!("items"), value.clone()),
            Op::pull(path!("items"), value),
        ];
        let next = apply_ops(&doc, &ops).unwrap();
        assert_eq!(next, doc);
    }

    #[test]
    fn batch_is_atomic_on_failure() {
        let doc = json!({"a": 1, "blocker": "scalar"});
        let ops = [
            Op::set(path!("a"), json!(2)),
            Op::set(path!("blocker", "nested"), json!(true)),
        ];
        let err = apply_ops(&doc, &ops).unwrap_err();
        match err {
            StateError::OperationFailed { index, .. } => assert_eq!(index, 1),
            other => panic!("expected OperationFailed, got {other:?}"),
        }
        // The input document is untouched regardless of the partial clone.
        assert_eq!(doc, json!({"a": 1, "blocker": "scalar"}));
    }

    #[test]
    fn later_ops_see_earlier_results() {
        let doc = json!({});
        let ops = [
            Op::set(path!("encounter"), json!({"round": 0})),
            Op::inc(path!("encounter", "round"), json!(1)),
        ];
        let next = apply_ops(&doc, &ops).unwrap();
        assert_eq!(next["encounter"]["round"], 1);
    }

    #[test]
    fn get_at_path_reads() {
        let doc = json!({"a": {"b": [{"c": 42}]}});
        assert_eq!(get_at_path(&doc, &path!("a", "b", 0, "c")), Some(&json!(42)));
        assert_eq!(get_at_path(&doc, &path!("a", "x")), None);
    }
}
