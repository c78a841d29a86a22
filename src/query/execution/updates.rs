use std::cmp::Ordering;
use bson::{Bson, Document};
use crate::error::{Error, Result};
use crate::options::PathConflictPolicy;
use crate::query::update::{EachOrSingle, UpdateExpr, UpdateOp, UpdatePath};
use crate::util::bson_utils::{add_numeric, compare_numeric, type_name, BsonArithmeticError};

/// Applies `update` to `doc` in place.
///
/// Operations run stage by stage (`$set`, increments, `$max`, `$push`) so that operations
/// on overlapping paths compose in a fixed order. If an operation fails, the operations
/// that ran before it have already been applied: callers wanting all-or-nothing
/// semantics must apply the update to a copy (see [`apply_update_atomically`]).
pub fn apply_update(doc: &mut Document, update: &UpdateExpr, policy: PathConflictPolicy) -> Result<()> {
    let mut ops: Vec<&UpdateOp> = update.ops().iter().collect();
    // sort_by_key is stable: declaration order is kept within a stage
    ops.sort_by_key(|op| op.stage());

    for op in ops {
        apply_operation(doc, op, policy)?;
    }
    Ok(())
}

/// Applies `update` to a copy of `doc` and returns it, leaving `doc` untouched.
pub fn apply_update_atomically(doc: &Document, update: &UpdateExpr, policy: PathConflictPolicy) -> Result<Document> {
    let mut updated = doc.clone();
    apply_update(&mut updated, update, policy)?;
    Ok(updated)
}

fn apply_operation(doc: &mut Document, op: &UpdateOp, policy: PathConflictPolicy) -> Result<()> {
    let path = op.path();
    let parent = traverse_create_missing(doc, path, policy)?;
    let leaf = path.leaf();

    match op {
        UpdateOp::Set { value, .. } => {
            parent.insert(leaf, value.clone());
        }
        UpdateOp::Inc { amount, .. } => {
            let new_value = increment(parent.get(leaf), amount, path)?;
            parent.insert(leaf, new_value);
        }
        UpdateOp::IncCapped { amount, cap, .. } => {
            let mut new_value = increment(parent.get(leaf), amount, path)?;
            if compare_numeric(&new_value, cap) == Some(Ordering::Greater) {
                new_value = cap.clone();
            }
            parent.insert(leaf, new_value);
        }
        UpdateOp::Max { value, .. } => {
            let replace = match parent.get(leaf) {
                None => true,
                Some(existing) => match compare_numeric(existing, value) {
                    Some(ordering) => ordering == Ordering::Less,
                    None => {
                        return Err(Error::TypeMismatch {
                            path: path.to_string(),
                            expected: "number",
                            found: type_name(existing),
                        })
                    }
                },
            };
            if replace {
                parent.insert(leaf, value.clone());
            }
        }
        UpdateOp::Push { values, .. } => {
            if !parent.contains_key(leaf) {
                parent.insert(leaf, Bson::Array(Vec::new()));
            }
            match parent.get_mut(leaf) {
                Some(Bson::Array(array)) => match values {
                    EachOrSingle::Single(value) => array.push(value.clone()),
                    EachOrSingle::Each(values) => array.extend(values.iter().cloned()),
                },
                Some(other) => {
                    return Err(Error::TypeMismatch {
                        path: path.to_string(),
                        expected: "array",
                        found: type_name(other),
                    })
                }
                None => {
                    return Err(Error::UnexpectedError(format!(
                        "Field {} vanished while applying $push",
                        path
                    )))
                }
            }
        }
    }
    Ok(())
}

fn increment(existing: Option<&Bson>, amount: &Bson, path: &UpdatePath) -> Result<Bson> {
    add_numeric(existing, amount).map_err(|e| match e {
        BsonArithmeticError::LhsNotNumeric => Error::TypeMismatch {
            path: path.to_string(),
            expected: "number",
            found: existing.map(type_name).unwrap_or("missing"),
        },
        BsonArithmeticError::RhsNotNumeric => {
            Error::InvalidRequest("Invalid $inc amount; must be a number".to_string())
        }
        BsonArithmeticError::Overflow => {
            Error::InvalidRequest(format!("integer overflow in $inc on {}", path))
        }
    })
}

/// Walks down to the document holding the leaf of `path`, creating empty documents for
/// missing segments. A segment holding a non-document value is handled according to
/// `policy`.
fn traverse_create_missing<'a>(
    doc: &'a mut Document,
    path: &UpdatePath,
    policy: PathConflictPolicy,
) -> Result<&'a mut Document> {
    let mut current = doc;

    for (depth, segment) in path.parents().iter().enumerate() {
        let reset = match current.get(segment) {
            Some(Bson::Document(_)) => false,
            None => true,
            Some(other) => match policy {
                PathConflictPolicy::Replace => true,
                PathConflictPolicy::Reject => {
                    return Err(Error::TypeMismatch {
                        path: path.prefix(depth + 1),
                        expected: "document",
                        found: type_name(other),
                    })
                }
            },
        };
        if reset {
            current.insert(segment.clone(), Document::new());
        }

        let parent = current;
        current = match parent.get_mut(segment) {
            Some(Bson::Document(child)) => child,
            _ => {
                return Err(Error::UnexpectedError(format!(
                    "Failed to traverse '{}'",
                    path.prefix(depth + 1)
                )))
            }
        };
    }
    Ok(current)
}
