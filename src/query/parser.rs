use bson::{Bson, Document};
use crate::error::{Error, Result};
use crate::query::update::{numeric_operand, EachOrSingle, UpdateExpr, UpdateOp, UpdatePath};
use crate::query::Filter;

/// Parses an exact-match filter such as `{ "email": "kid@example.com" }`.
pub fn parse_filter(doc: &Document) -> Result<Filter> {
    for key in doc.keys() {
        if key.starts_with('$') {
            return Err(Error::InvalidRequest(format!(
                "Query operators are not supported: {}",
                key
            )));
        }
    }
    Ok(Filter::new(doc.clone()))
}

/// Parses a MongoDB style update document (`$set`, `$inc`, `$max`, `$push`).
pub fn parse_update(update: &Document) -> Result<UpdateExpr> {
    let mut expr = UpdateExpr::new();

    for (key, value) in update.iter() {
        if !key.starts_with('$') {
            return Err(Error::InvalidRequest(format!(
                "Update operator must start with '$': {}",
                key
            )));
        }

        let sub_doc = match key.as_str() {
            "$set" | "$inc" | "$max" | "$push" => value.as_document().ok_or_else(|| {
                Error::InvalidRequest(format!("{} value must be a document", key))
            })?,
            _ => return Err(Error::InvalidRequest(format!("Unknown update operator: {}", key))),
        };

        for (path, val) in sub_doc {
            let path = UpdatePath::parse(path)?;
            let op = match key.as_str() {
                "$set" => UpdateOp::Set { path, value: val.clone() },
                "$inc" => UpdateOp::Inc { path, amount: numeric_operand("$inc", val.clone())? },
                "$max" => UpdateOp::Max { path, value: numeric_operand("$max", val.clone())? },
                _ => UpdateOp::Push { path, values: parse_each_or_single(val)? },
            };
            expr.add(op);
        }
    }

    expr.validate()?;
    Ok(expr)
}

fn parse_each_or_single(value: &Bson) -> Result<EachOrSingle<Bson>> {
    if let Some(doc) = value.as_document() {
        if let Some(each) = doc.get("$each") {
            if doc.len() != 1 {
                return Err(Error::InvalidRequest(
                    "$push only supports the $each modifier".to_string(),
                ));
            }
            return match each.as_array() {
                Some(values) => Ok(EachOrSingle::Each(values.clone())),
                None => Err(Error::InvalidRequest(
                    "$push with $each must have an array value".to_string(),
                )),
            };
        }
    }
    Ok(EachOrSingle::Single(value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_parse_update_all_operators() {
        let update = parse_update(&doc! {
            "$push": { "completed_works": "Counting" },
            "$inc": { "progress.Mathematics": 5 },
            "$set": { "last_activity": "today" },
            "$max": { "history_progress": 3 }
        })
        .unwrap();

        let ops = update.ops();
        assert_eq!(ops.len(), 4);
        assert!(matches!(&ops[0], UpdateOp::Push { values: EachOrSingle::Single(v), .. } if v.as_str() == Some("Counting")));
        assert!(matches!(&ops[1], UpdateOp::Inc { path, .. } if path.to_string() == "progress.Mathematics"));
        assert!(matches!(&ops[2], UpdateOp::Set { .. }));
        assert!(matches!(&ops[3], UpdateOp::Max { .. }));
    }

    #[test]
    fn test_parse_push_each() {
        let update = parse_update(&doc! {
            "$push": { "achievements": { "$each": ["First Steps", "Learning Explorer"] } }
        })
        .unwrap();

        match &update.ops()[0] {
            UpdateOp::Push { values: EachOrSingle::Each(values), .. } => {
                assert_eq!(values, &vec![Bson::from("First Steps"), Bson::from("Learning Explorer")]);
            }
            op => panic!("Unexpected op {:?}", op),
        }
    }

    #[test]
    fn test_parse_push_document_without_each_is_single() {
        let update = parse_update(&doc! {
            "$push": { "feedback": { "message": "Great job", "date": "2025-11-04" } }
        })
        .unwrap();

        assert!(matches!(&update.ops()[0], UpdateOp::Push { values: EachOrSingle::Single(Bson::Document(_)), .. }));
    }

    #[test]
    fn test_parse_push_invalid_each() {
        let err = parse_update(&doc! { "$push": { "a": { "$each": 1 } } }).unwrap_err();
        assert_eq!(err.to_string(), "$push with $each must have an array value");

        let err = parse_update(&doc! { "$push": { "a": { "$each": [1], "$slice": 2 } } }).unwrap_err();
        assert_eq!(err.to_string(), "$push only supports the $each modifier");
    }

    #[test]
    fn test_parse_update_errors() {
        let cases = vec![
            (doc! { "name": "x" }, "Update operator must start with '$': name"),
            (doc! { "$unset": { "a": "" } }, "Unknown update operator: $unset"),
            (doc! { "$set": 1 }, "$set value must be a document"),
            (doc! { "$set": {} }, "Update document cannot be empty"),
            (doc! {}, "Update document cannot be empty"),
            (doc! { "$set": { "a..b": 1 } }, "Update path 'a..b' contains an empty field name"),
            (doc! { "$set": { "": 1 } }, "Update path cannot be empty"),
        ];

        for (update, expected) in cases {
            let err = parse_update(&update).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_parse_inc_requires_number() {
        let err = parse_update(&doc! { "$inc": { "login_count": "1" } }).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_parse_filter_rejects_operators() {
        assert!(parse_filter(&doc! { "email": "a@b.c" }).is_ok());
        assert!(parse_filter(&doc! {}).is_ok());
        let err = parse_filter(&doc! { "$or": [] }).unwrap_err();
        assert_eq!(err.to_string(), "Query operators are not supported: $or");
    }
}
